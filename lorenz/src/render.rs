use std::path::Path;

use plotters::{coord::Shift, prelude::*};
use tracing::info;

use crate::{
    LorenzErrors,
    config::ViewConfig,
    model::LorenzParameters,
    simulation::{Bounds, Trajectory},
};

const AXIS_LABEL_FONT: (&str, u32) = ("sans-serif", 16);
const CAPTION_FONT: (&str, u32) = ("sans-serif", 22);

/// Draws the trajectory as a 3-D line chart.
///
/// Plotters treats its second axis as vertical, so the chart is built as (x, z, y) to keep the
/// Lorenz z axis pointing up.
pub fn draw_trajectory<DB: DrawingBackend>(
    builder: &mut ChartBuilder<'_, '_, DB>,
    trajectory: &Trajectory,
    parameters: &LorenzParameters,
    view: &ViewConfig,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let bounds = plot_bounds(trajectory, parameters, view);
    let (x, y, z) = (bounds.x.clone(), bounds.y.clone(), bounds.z.clone());

    let mut chart = builder
        .caption(parameters.title(), CAPTION_FONT)
        .margin(20)
        .build_cartesian_3d(x.clone(), z.clone(), y.clone())?;

    chart.with_projection(|mut pb| {
        pb.yaw = view.yaw.to_radians();
        pb.pitch = view.pitch.to_radians();
        pb.scale = view.scale;
        pb.into_matrix()
    });

    chart
        .configure_axes()
        .light_grid_style(BLACK.mix(0.1))
        .max_light_lines(3)
        .draw()?;

    let [r, g, b] = view.line_color;
    let line_style = ShapeStyle::from(&RGBColor(r, g, b)).stroke_width(view.line_width);
    chart.draw_series(LineSeries::new(
        trajectory.points().map(|(px, py, pz)| (px, pz, py)),
        line_style,
    ))?;

    let label_style = TextStyle::from(AXIS_LABEL_FONT.into_font()).color(&BLACK);
    chart.draw_series([
        Text::new("X", (x.end, z.start, y.start), label_style.clone()),
        Text::new("Y", (x.start, z.start, y.end), label_style.clone()),
        Text::new("Z", (x.start, z.end, y.start), label_style),
    ])?;

    if view.show_equilibria {
        chart.draw_series(
            parameters
                .equilibria()
                .into_iter()
                .map(|[ex, ey, ez]| Circle::new((ex, ez, ey), 4, RED.filled())),
        )?;
    }

    Ok(())
}

/// Axis ranges for the chart. Shown equilibria are always inside them.
pub fn plot_bounds(
    trajectory: &Trajectory,
    parameters: &LorenzParameters,
    view: &ViewConfig,
) -> Bounds {
    let mut bounds = trajectory.bounds();
    if view.show_equilibria {
        for point in parameters.equilibria() {
            bounds.include(&point);
        }
    }
    bounds
}

fn draw_on<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    trajectory: &Trajectory,
    parameters: &LorenzParameters,
    view: &ViewConfig,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    root.fill(&WHITE)?;
    let mut builder = ChartBuilder::on(root);
    draw_trajectory(&mut builder, trajectory, parameters, view)?;
    root.present()
}

/// Writes the plot to `path`. The extension picks the format: `png` or `svg`.
pub fn render_to_file(
    path: &Path,
    trajectory: &Trajectory,
    parameters: &LorenzParameters,
    view: &ViewConfig,
) -> Result<(), LorenzErrors> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let size = (view.width, view.height);

    match extension.as_str() {
        "png" => {
            let root = BitMapBackend::new(path, size).into_drawing_area();
            draw_on(&root, trajectory, parameters, view)
                .map_err(|e| LorenzErrors::Render(e.to_string()))?;
        }
        "svg" => {
            let root = SVGBackend::new(path, size).into_drawing_area();
            draw_on(&root, trajectory, parameters, view)
                .map_err(|e| LorenzErrors::Render(e.to_string()))?;
        }
        _ => return Err(LorenzErrors::UnsupportedFormat(extension)),
    }

    info!("wrote {}x{} plot to {}", view.width, view.height, path.display());
    Ok(())
}

/// Renders into an RGB buffer of `view.width * view.height * 3` bytes.
pub fn render_to_buffer(
    trajectory: &Trajectory,
    parameters: &LorenzParameters,
    view: &ViewConfig,
) -> Result<Vec<u8>, LorenzErrors> {
    let mut buffer = vec![0u8; view.width as usize * view.height as usize * 3];
    {
        let root =
            BitMapBackend::with_buffer(&mut buffer, (view.width, view.height)).into_drawing_area();
        draw_on(&root, trajectory, parameters, view)
            .map_err(|e| LorenzErrors::Render(e.to_string()))?;
    }
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::{SimulationConfig, simulate};

    fn short_run() -> (Trajectory, LorenzParameters) {
        let parameters = LorenzParameters::default();
        let config = SimulationConfig {
            t_span: (0.0, 10.0),
            samples: 1_000,
            ..Default::default()
        };
        (simulate(&parameters, &config).unwrap(), parameters)
    }

    fn small_view() -> ViewConfig {
        ViewConfig {
            width: 320,
            height: 240,
            show_equilibria: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_render_to_buffer_draws_line() {
        let (trajectory, parameters) = short_run();
        let view = small_view();
        let buffer = render_to_buffer(&trajectory, &parameters, &view).unwrap();
        assert_eq!(buffer.len(), 320 * 240 * 3);

        // the default line colour is blue; axes and text are grey or black
        let line_pixels = buffer
            .chunks_exact(3)
            .filter(|px| px[2] as i32 > px[0] as i32 + 30)
            .count();
        assert!(line_pixels > 100, "only {line_pixels} line pixels drawn");
    }

    #[test]
    fn test_equilibria_extend_axes() {
        // for rho just above 1 the trajectory settles on C+ and never visits the origin or C-
        let parameters = LorenzParameters::new(10.0, 1.5, 8.0 / 3.0);
        let trajectory = simulate(&parameters, &SimulationConfig::default()).unwrap();
        let view = small_view();

        let bounds = plot_bounds(&trajectory, &parameters, &view);
        for [x, y, z] in parameters.equilibria() {
            assert!(bounds.x.start <= x && x <= bounds.x.end, "x = {x} outside {:?}", bounds.x);
            assert!(bounds.y.start <= y && y <= bounds.y.end, "y = {y} outside {:?}", bounds.y);
            assert!(bounds.z.start <= z && z <= bounds.z.end, "z = {z} outside {:?}", bounds.z);
        }

        let hidden = ViewConfig {
            show_equilibria: false,
            ..view
        };
        assert_eq!(plot_bounds(&trajectory, &parameters, &hidden), trajectory.bounds());
    }

    #[test]
    fn test_render_svg_file() {
        let (trajectory, parameters) = short_run();
        let path = std::env::temp_dir().join(format!("lorenz-render-{}.svg", std::process::id()));
        render_to_file(&path, &trajectory, &parameters, &small_view()).unwrap();
        let svg = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert!(svg.contains("<svg"));
        assert!(svg.contains("polyline"));
    }

    #[test]
    fn test_unknown_extension_is_rejected() {
        let (trajectory, parameters) = short_run();
        let result = render_to_file(
            Path::new("plot.gif"),
            &trajectory,
            &parameters,
            &small_view(),
        );
        assert!(matches!(result, Err(LorenzErrors::UnsupportedFormat(ext)) if ext == "gif"));
    }
}
