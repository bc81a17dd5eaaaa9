//! Constraint-history chart.
//!
//! One PNG per run summarizing how the normalized Hamiltonian and momentum
//! violations evolved, rendered at the end so a long run's health is
//! visible at a glance without post-processing the data streams.

use std::path::Path;

use plotters::prelude::*;

/// One sample of the constraint history.
#[derive(Debug, Clone, Copy)]
pub struct ConstraintSample {
    pub step: usize,
    pub h_mean_norm: f64,
    pub m_mean_norm: f64,
}

/// Render the history to `path`. Values are plotted on a log axis;
/// non-positive samples are clamped to the axis floor.
pub fn render_constraint_history(
    path: &Path,
    history: &[ConstraintSample],
) -> Result<(), Box<dyn std::error::Error>> {
    if history.is_empty() {
        return Ok(());
    }

    let floor = 1e-18_f64;
    let max_step = history.last().map(|s| s.step).unwrap_or(1).max(1);
    let y_max = history
        .iter()
        .flat_map(|s| [s.h_mean_norm, s.m_mean_norm])
        .fold(floor, f64::max)
        * 10.0;

    let root = BitMapBackend::new(path, (900, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Constraint violations", ("sans-serif", 24))
        .margin(12)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d(0..max_step, (floor..y_max).log_scale())?;

    chart
        .configure_mesh()
        .x_desc("step")
        .y_desc("mean |violation| / scale")
        .y_label_formatter(&|v| format!("{v:.0e}"))
        .draw()?;

    chart
        .draw_series(LineSeries::new(
            history.iter().map(|s| (s.step, s.h_mean_norm.max(floor))),
            &RED,
        ))?
        .label("Hamiltonian")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 18, y)], RED));

    chart
        .draw_series(LineSeries::new(
            history.iter().map(|s| (s.step, s.m_mean_norm.max(floor))),
            &BLUE,
        ))?
        .label("momentum")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 18, y)], BLUE));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_a_png_for_a_short_history() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("constraints.png");
        let history: Vec<ConstraintSample> = (0..20)
            .map(|s| ConstraintSample {
                step: s * 10,
                h_mean_norm: 1e-8 * (1.0 + s as f64),
                m_mean_norm: 1e-9,
            })
            .collect();
        render_constraint_history(&path, &history).unwrap();
        let meta = std::fs::metadata(&path).unwrap();
        assert!(meta.len() > 0);
    }

    #[test]
    fn empty_history_is_a_no_op() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("constraints.png");
        render_constraint_history(&path, &[]).unwrap();
        assert!(!path.exists());
    }
}
