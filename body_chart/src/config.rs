use metrics_common::ChartError;
use panel_renderer::RenderConfig;
use rolling_stats::RollingParams;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Optional config file looked up in the working directory.
pub const CONFIG_FILE: &str = "body_chart.json";

/// Which metric a panel plots and how it is labelled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelConfig {
    pub metric: String, // `weight`, `fat`, or any extra CSV column
    pub label: String,
    pub y_label: String,
}

impl PanelConfig {
    pub fn new(metric: &str, label: &str) -> Self {
        PanelConfig {
            metric: metric.to_string(),
            label: label.to_string(),
            y_label: label.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub rolling: RollingParams,
    pub render: RenderConfig,
    pub panels: Vec<PanelConfig>,
}

impl Default for RunConfig {
    fn default() -> Self {
        RunConfig {
            input_path: PathBuf::from("Record.csv"),
            output_path: PathBuf::from("weight_graph.png"),
            rolling: RollingParams::default(),
            render: RenderConfig::default(),
            panels: vec![
                PanelConfig::new("weight", "Weight (kg)"),
                PanelConfig::new("fat", "Body Fat (%)"),
            ],
        }
    }
}

impl RunConfig {
    pub fn from_json(text: &str) -> Result<Self, ChartError> {
        serde_json::from_str(text)
            .map_err(|e| ChartError::InvalidParameter(format!("bad config: {}", e)))
    }

    /// Reads `path` if it exists, otherwise returns the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self, ChartError> {
        if !path.exists() {
            return Ok(RunConfig::default());
        }
        let text = fs::read_to_string(path)
            .map_err(|e| ChartError::Io(format!("failed to read {}: {}", path.display(), e)))?;
        RunConfig::from_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = RunConfig::default();
        assert_eq!(cfg.rolling.window_short, 7);
        assert_eq!(cfg.rolling.window_long, 21);
        assert_eq!(cfg.rolling.num_std_dev, 2.0);
        assert_eq!(cfg.panels.len(), 2);
        assert_eq!(cfg.panels[1].metric, "fat");
        assert_eq!(cfg.output_path, PathBuf::from("weight_graph.png"));
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let cfg = RunConfig::from_json(
            r#"{ "rolling": { "window_long": 14 },
                 "render": { "colors": { "ma_short": [0, 0, 255] } } }"#,
        )
        .unwrap();
        assert_eq!(cfg.rolling.window_short, 7);
        assert_eq!(cfg.rolling.window_long, 14);
        assert_eq!(cfg.render.colors.ma_short, panel_renderer::Rgb(0, 0, 255));
        assert_eq!(cfg.render.colors.ma_long, panel_renderer::Rgb(148, 103, 189));
        assert_eq!(cfg.panels, RunConfig::default().panels);
    }

    #[test]
    fn test_bad_json() {
        assert!(matches!(
            RunConfig::from_json("{ not json"),
            Err(ChartError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let path = std::env::temp_dir().join(format!("body_chart_absent_{}.json", std::process::id()));
        assert_eq!(RunConfig::load_or_default(&path).unwrap(), RunConfig::default());
    }
}
