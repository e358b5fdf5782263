use std::{error::Error, path::PathBuf};

use clap::{Parser, Subcommand};
use lorenz::{AppConfig, gui, init_tracing, render::render_to_file, simulate};

#[derive(Parser)]
#[command(version, about = "Integrates the Lorenz system and plots the attractor")]
struct Cli {
    /// RON config file. Defaults to lorenz/config.ron in the user config directory.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Starting sigma, clamped to the slider range
    #[arg(long, global = true)]
    sigma: Option<f64>,
    /// Starting rho, clamped to the slider range
    #[arg(long, global = true)]
    rho: Option<f64>,
    /// Starting beta, clamped to the slider range
    #[arg(long, global = true)]
    beta: Option<f64>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the interactive viewer (default)
    Gui,
    /// Integrate once and save the plot as png or svg
    Render {
        output: PathBuf,
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        width: Option<u32>,
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        height: Option<u32>,
    },
    /// Print the effective config as RON
    Config {
        /// Save it to the user config directory instead
        #[arg(long)]
        write: bool,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    init_tracing();
    let cli = Cli::parse();

    let config = AppConfig::resolve(cli.config.as_deref())?;
    let parameters = config.sliders.with_overrides(
        config.sliders.initial_parameters(),
        cli.sigma,
        cli.rho,
        cli.beta,
    );

    match cli.command.unwrap_or(Commands::Gui) {
        Commands::Gui => gui::run(config, parameters)?,
        Commands::Render {
            output,
            width,
            height,
        } => {
            let mut view = config.view;
            view.width = width.unwrap_or(view.width);
            view.height = height.unwrap_or(view.height);
            let trajectory = simulate(&parameters, &config.simulation)?;
            render_to_file(&output, &trajectory, &parameters, &view)?;
        }
        Commands::Config { write: true } => {
            let path = AppConfig::default_path().ok_or("no config directory on this platform")?;
            config.save(&path)?;
            println!("{}", path.display());
        }
        Commands::Config { write: false } => println!("{}", config.to_ron_string()?),
    }
    Ok(())
}
