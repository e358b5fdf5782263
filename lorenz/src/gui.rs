use iced::{
    Alignment, Element, Length, Size, Task,
    widget::{button, column, row, slider, text},
};
use plotters_iced::{Chart, ChartBuilder, ChartWidget, DrawingBackend};
use tracing::{error, info};
use utilities::format_number;

use crate::{
    config::{AppConfig, SliderRange, ViewConfig},
    model::LorenzParameters,
    render::draw_trajectory,
    simulation::{Trajectory, simulate},
};

/// Room below the plot for the sliders and status line.
const CONTROLS_HEIGHT: f32 = 240.0;
const LABEL_WIDTH: f32 = 120.0;

pub fn run(config: AppConfig, parameters: LorenzParameters) -> iced::Result {
    let window_size = Size::new(
        config.view.width as f32,
        config.view.height as f32 + CONTROLS_HEIGHT,
    );
    info!("opening viewer with {parameters:?}");

    iced::application(LorenzApp::title, LorenzApp::update, LorenzApp::view)
        .antialiasing(true)
        .centered()
        .window_size(window_size)
        .run_with(move || (LorenzApp::new(config, parameters), Task::none()))
}

#[derive(Debug, Clone, Copy)]
pub enum Message {
    SigmaChanged(f64),
    RhoChanged(f64),
    BetaChanged(f64),
    YawChanged(f64),
    PitchChanged(f64),
    Reset,
}

/// The chart widget's view of the latest run.
#[derive(Debug)]
struct TrajectoryPlot {
    trajectory: Option<Trajectory>,
    parameters: LorenzParameters,
    view: ViewConfig,
}

impl Chart<Message> for TrajectoryPlot {
    type State = ();

    fn build_chart<DB: DrawingBackend>(&self, _state: &Self::State, mut builder: ChartBuilder<DB>) {
        let Some(trajectory) = &self.trajectory else {
            return;
        };
        if let Err(e) = draw_trajectory(&mut builder, trajectory, &self.parameters, &self.view) {
            error!("failed to draw trajectory: {e}");
        }
    }
}

pub struct LorenzApp {
    config: AppConfig,
    plot: TrajectoryPlot,
    status: String,
}

impl LorenzApp {
    pub fn new(config: AppConfig, parameters: LorenzParameters) -> Self {
        let mut app = Self {
            plot: TrajectoryPlot {
                trajectory: None,
                parameters,
                view: config.view,
            },
            config,
            status: String::new(),
        };
        app.resimulate();
        app
    }

    pub fn parameters(&self) -> &LorenzParameters {
        &self.plot.parameters
    }

    pub fn trajectory(&self) -> Option<&Trajectory> {
        self.plot.trajectory.as_ref()
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    fn title(&self) -> String {
        self.plot.parameters.title()
    }

    pub fn update(&mut self, message: Message) {
        match message {
            Message::SigmaChanged(sigma) => {
                self.plot.parameters.sigma = sigma;
                self.resimulate();
            }
            Message::RhoChanged(rho) => {
                self.plot.parameters.rho = rho;
                self.resimulate();
            }
            Message::BetaChanged(beta) => {
                self.plot.parameters.beta = beta;
                self.resimulate();
            }
            Message::YawChanged(yaw) => self.plot.view.yaw = yaw,
            Message::PitchChanged(pitch) => self.plot.view.pitch = pitch,
            Message::Reset => {
                self.plot.parameters = self.config.sliders.initial_parameters();
                self.plot.view = self.config.view;
                self.resimulate();
            }
        }
    }

    fn resimulate(&mut self) {
        match simulate(&self.plot.parameters, &self.config.simulation) {
            Ok(trajectory) => {
                let stats = &trajectory.stats;
                self.status = format!(
                    "{} samples, {} accepted steps, {} rejected, {} evaluations",
                    trajectory.len(),
                    stats.accepted_steps,
                    stats.rejected_steps,
                    stats.function_evaluations
                );
                self.plot.trajectory = Some(trajectory);
            }
            Err(e) => {
                error!("simulation failed for {:?}: {e}", self.plot.parameters);
                self.status = format!("simulation failed: {e}");
                self.plot.trajectory = None;
            }
        }
    }

    pub fn view(&self) -> Element<'_, Message> {
        let sliders = &self.config.sliders;
        let parameters = &self.plot.parameters;
        let view = &self.plot.view;

        let chart = ChartWidget::new(&self.plot)
            .width(Length::Fill)
            .height(Length::Fill);

        let controls = column![
            labelled_slider("σ", parameters.sigma, sliders.sigma, Message::SigmaChanged),
            labelled_slider("ρ", parameters.rho, sliders.rho, Message::RhoChanged),
            labelled_slider("β", parameters.beta, sliders.beta, Message::BetaChanged),
            labelled_slider(
                "yaw",
                view.yaw,
                SliderRange::new(-180.0, 180.0, 1.0, self.config.view.yaw),
                Message::YawChanged
            ),
            labelled_slider(
                "pitch",
                view.pitch,
                SliderRange::new(-90.0, 90.0, 1.0, self.config.view.pitch),
                Message::PitchChanged
            ),
            row![
                button("Reset").on_press(Message::Reset),
                text(&self.status).size(14),
            ]
            .spacing(20)
            .align_y(Alignment::Center),
        ]
        .spacing(6)
        .padding(10)
        .height(Length::Fixed(CONTROLS_HEIGHT));

        column![chart, controls].into()
    }
}

fn labelled_slider<'a>(
    label: &str,
    value: f64,
    range: SliderRange,
    on_change: fn(f64) -> Message,
) -> Element<'a, Message> {
    row![
        text(format!("{label} = {}", format_number(value))).width(Length::Fixed(LABEL_WIDTH)),
        slider(range.min..=range.max, value, on_change).step(range.step),
    ]
    .spacing(10)
    .align_y(Alignment::Center)
    .into()
}
