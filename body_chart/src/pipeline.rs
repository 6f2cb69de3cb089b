use log::info;
use metrics_common::{ChartError, DerivedSeries, Series};
use panel_renderer::PanelSpec;
use std::path::PathBuf;

use crate::config::RunConfig;

/// Load, compute, render. Every series is computed before the image is
/// touched, so a bad series never leaves a partial chart behind.
pub fn run(config: &RunConfig) -> Result<PathBuf, ChartError> {
    let records = series_loader::load_records(&config.input_path)?;

    let mut computed: Vec<(Series, DerivedSeries)> = Vec::with_capacity(config.panels.len());
    for panel in &config.panels {
        let series = Series::from_records(&records, &panel.metric)?;
        let derived = rolling_stats::compute(&series, &config.rolling)?;
        computed.push((series, derived));
    }

    let specs: Vec<PanelSpec> = computed
        .iter()
        .zip(config.panels.iter())
        .map(|((series, derived), panel)| {
            PanelSpec::new(series, derived, panel.label.as_str(), panel.y_label.as_str())
        })
        .collect();

    panel_renderer::render(&specs, &config.output_path, &config.render)?;
    info!(
        "{} records charted into {}",
        records.len(),
        config.output_path.display()
    );
    Ok(config.output_path.clone())
}
