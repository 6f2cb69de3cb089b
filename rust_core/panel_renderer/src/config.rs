use plotters::style::RGBColor;
use serde::{Deserialize, Serialize};

/// An opaque RGB color, serialized as `[r, g, b]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgb(pub u8, pub u8, pub u8);

impl Rgb {
    pub fn color(self) -> RGBColor {
        RGBColor(self.0, self.1, self.2)
    }
}

/// Colors assigned to each drawn layer of a panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorRoles {
    pub actual: Rgb,   // raw observations, kept muted
    pub ma_short: Rgb, // short moving average
    pub ma_long: Rgb,  // long moving average
    pub band: Rgb,     // band fill, drawn with `RenderConfig::band_alpha`
}

impl Default for ColorRoles {
    fn default() -> Self {
        ColorRoles {
            actual: Rgb(211, 211, 211),
            ma_short: Rgb(255, 127, 14),
            ma_long: Rgb(148, 103, 189),
            band: Rgb(128, 128, 128),
        }
    }
}

/// Layout and styling of the rendered figure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub title: String,
    pub width: u32,
    /// Height given to each stacked panel.
    pub panel_height: u32,
    /// Extra height reserved above the panels for the figure title.
    pub title_height: u32,
    /// Date tick labels under the bottom panel, added on top of its
    /// `panel_height` so every panel keeps the same plotting height.
    pub x_axis_height: u32,
    pub band_alpha: f64,
    pub marker_size: u32,
    pub colors: ColorRoles,
}

impl Default for RenderConfig {
    fn default() -> Self {
        RenderConfig {
            title: "Full Analysis: Weight & Body Fat".to_string(),
            width: 1400,
            panel_height: 560,
            title_height: 80,
            x_axis_height: 60,
            band_alpha: 0.2,
            marker_size: 2,
            colors: ColorRoles::default(),
        }
    }
}

impl RenderConfig {
    pub fn image_size(&self, panels: usize) -> (u32, u32) {
        (
            self.width,
            self.title_height + self.panel_height * panels as u32 + self.x_axis_height,
        )
    }
}
