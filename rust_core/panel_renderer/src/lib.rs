//! panel_renderer
//!
//! Draws one stacked panel per series onto a single PNG. Every panel shares the
//! same date range so the panels line up vertically; only the bottom panel
//! carries date tick labels.
//!
//! Layers per panel, back to front: raw observations (muted line with
//! markers), the band fill, the short average, the dashed long average. The
//! band sits under both averages so it never hides them. Undefined statistics
//! split lines and fills into separate runs instead of being drawn through.

pub mod config;

pub use config::{ColorRoles, RenderConfig, Rgb};

use chrono::{Duration, NaiveDate};
use log::{debug, info};
use metrics_common::{ChartError, DerivedSeries, Series};
use plotters::coord::types::RangedDate;
use plotters::coord::Shift;
use plotters::prelude::*;
use std::ops::Range;
use std::path::Path;

/// One panel: a series, its rolling statistics, and how to label them.
#[derive(Debug, Clone)]
pub struct PanelSpec<'a> {
    pub series: &'a Series,
    pub derived: &'a DerivedSeries,
    /// Legend entry for the raw series, e.g. `Weight (kg)`.
    pub label: String,
    pub y_label: String,
}

impl<'a> PanelSpec<'a> {
    pub fn new(
        series: &'a Series,
        derived: &'a DerivedSeries,
        label: impl Into<String>,
        y_label: impl Into<String>,
    ) -> Self {
        PanelSpec {
            series,
            derived,
            label: label.into(),
            y_label: y_label.into(),
        }
    }

    fn check(&self) -> Result<(), ChartError> {
        let n = self.series.len();
        let d = &self.derived;
        let aligned = [&d.ma_short, &d.ma_long, &d.std_long, &d.upper, &d.lower]
            .iter()
            .all(|col| col.len() == n);
        if !aligned {
            return Err(ChartError::InvalidParameter(format!(
                "derived series for '{}' is not aligned with its {} points",
                self.series.name, n
            )));
        }
        Ok(())
    }
}

const LEGEND_SAMPLE_WIDTH: i32 = 20;

/// Marker shown at the middle of the raw series' legend line, relative to
/// the legend anchor.
fn legend_marker(color: RGBColor, size: u32) -> Circle<(i32, i32), u32> {
    Circle::new((LEGEND_SAMPLE_WIDTH / 2, 0), size.max(1), color.filled())
}

/// Vertical breakpoints splitting `body_height` into `panels` rows of equal
/// plotting height, with `x_axis_height` extra given to the last row.
fn panel_breakpoints(body_height: i32, panels: usize, x_axis_height: i32) -> Vec<i32> {
    let n = panels.max(1) as i32;
    let row = ((body_height - x_axis_height) / n).max(1);
    (1..n).map(|i| i * row).collect()
}

fn draw_error<E: std::fmt::Display>(e: E) -> ChartError {
    ChartError::Unexpected(format!("plotting error: {}", e))
}

/// Splits aligned values into contiguous runs of defined points.
fn defined_runs(dates: &[NaiveDate], values: &[Option<f64>]) -> Vec<Vec<(NaiveDate, f64)>> {
    let mut runs = Vec::new();
    let mut current = Vec::new();
    for (d, v) in dates.iter().zip(values.iter()) {
        match v {
            Some(v) if v.is_finite() => current.push((*d, *v)),
            _ => {
                if !current.is_empty() {
                    runs.push(std::mem::take(&mut current));
                }
            }
        }
    }
    if !current.is_empty() {
        runs.push(current);
    }
    runs
}

fn close_outline(run: &[(NaiveDate, f64, f64)]) -> Vec<(NaiveDate, f64)> {
    let mut outline: Vec<(NaiveDate, f64)> = run.iter().map(|(d, u, _)| (*d, *u)).collect();
    outline.extend(run.iter().rev().map(|(d, _, l)| (*d, *l)));
    outline
}

/// Closed outlines (upper edge forward, lower edge back) for each run where
/// both band edges are defined.
fn band_outlines(
    dates: &[NaiveDate],
    upper: &[Option<f64>],
    lower: &[Option<f64>],
) -> Vec<Vec<(NaiveDate, f64)>> {
    let mut outlines = Vec::new();
    let mut run: Vec<(NaiveDate, f64, f64)> = Vec::new();
    for (d, (u, l)) in dates.iter().zip(upper.iter().zip(lower.iter())) {
        match (u, l) {
            (Some(u), Some(l)) if u.is_finite() && l.is_finite() => run.push((*d, *u, *l)),
            _ => {
                if !run.is_empty() {
                    outlines.push(close_outline(&run));
                    run.clear();
                }
            }
        }
    }
    if !run.is_empty() {
        outlines.push(close_outline(&run));
    }
    outlines
}

/// Shared x-range over every panel, widened by a day on each side when all
/// observations fall on one date.
fn date_range(panels: &[PanelSpec]) -> Result<Range<NaiveDate>, ChartError> {
    let start = panels.iter().filter_map(|p| p.series.first_date()).min();
    let end = panels.iter().filter_map(|p| p.series.last_date()).max();
    match (start, end) {
        (Some(s), Some(e)) if s < e => Ok(s..e),
        (Some(s), Some(e)) => Ok(s - Duration::days(1)..e + Duration::days(1)),
        _ => Err(ChartError::InvalidParameter(
            "panels carry no observations".to_string(),
        )),
    }
}

fn value_range(spec: &PanelSpec) -> Range<f64> {
    let d = spec.derived;
    let overlays = d
        .ma_short
        .iter()
        .chain(&d.ma_long)
        .chain(&d.upper)
        .chain(&d.lower)
        .filter_map(|v| *v);
    let (lo, hi) = spec
        .series
        .points()
        .iter()
        .map(|(_, v)| *v)
        .chain(overlays)
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    if !lo.is_finite() || !hi.is_finite() {
        return 0.0..1.0;
    }
    let pad = if hi > lo { (hi - lo) * 0.05 } else { 1.0 };
    (lo - pad)..(hi + pad)
}

fn check_output_path(path: &Path) -> Result<(), ChartError> {
    if path.is_dir() {
        return Err(ChartError::Io(format!(
            "{} is a directory",
            path.display()
        )));
    }
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if !parent.is_dir() {
        return Err(ChartError::Io(format!(
            "output directory {} does not exist",
            parent.display()
        )));
    }
    Ok(())
}

fn draw_panel<DB>(
    area: &DrawingArea<DB, Shift>,
    spec: &PanelSpec,
    dates: Range<NaiveDate>,
    bottom: bool,
    config: &RenderConfig,
) -> Result<(), ChartError>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let date_fmt = |d: &NaiveDate| d.format("%Y-%m-%d").to_string();
    let blank = |_: &NaiveDate| String::new();
    let y_fmt = |v: &f64| format!("{:.1}", v);

    let mut chart = ChartBuilder::on(area)
        .margin(15)
        .x_label_area_size(if bottom { config.x_axis_height } else { 0 })
        .y_label_area_size(70)
        .build_cartesian_2d(RangedDate::from(dates), value_range(spec))
        .map_err(draw_error)?;

    let mut mesh = chart.configure_mesh();
    mesh.y_desc(spec.y_label.as_str())
        .y_label_formatter(&y_fmt)
        .light_line_style(BLACK.mix(0.04))
        .bold_line_style(BLACK.mix(0.15))
        .label_style(("sans-serif", 16));
    if bottom {
        mesh.x_desc("Date").x_labels(10).x_label_formatter(&date_fmt);
    } else {
        mesh.x_label_formatter(&blank);
    }
    mesh.draw().map_err(draw_error)?;

    let colors = &config.colors;
    let dates_vec = spec.series.dates();

    let actual = colors.actual.color();
    let marker = config.marker_size;
    chart
        .draw_series(
            LineSeries::new(spec.series.points().to_vec(), actual.stroke_width(1))
                .point_size(config.marker_size),
        )
        .map_err(draw_error)?
        .label(spec.label.as_str())
        .legend(move |(x, y)| {
            EmptyElement::at((x, y))
                + PathElement::new(vec![(0, 0), (LEGEND_SAMPLE_WIDTH, 0)], actual)
                + legend_marker(actual, marker)
        });

    let band_style = colors.band.color().mix(config.band_alpha).filled();
    chart
        .draw_series(
            band_outlines(&dates_vec, &spec.derived.upper, &spec.derived.lower)
                .into_iter()
                .map(|outline| Polygon::new(outline, band_style)),
        )
        .map_err(draw_error)?
        .label("Bollinger Bands")
        .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + LEGEND_SAMPLE_WIDTH, y + 5)], band_style));

    let short_style = colors.ma_short.color().stroke_width(2);
    chart
        .draw_series(
            defined_runs(&dates_vec, &spec.derived.ma_short)
                .into_iter()
                .map(|run| PathElement::new(run, short_style)),
        )
        .map_err(draw_error)?
        .label(format!("{}-Day MA", spec.derived.window_short))
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + LEGEND_SAMPLE_WIDTH, y)], short_style));

    let long_style = colors.ma_long.color().stroke_width(2);
    for run in defined_runs(&dates_vec, &spec.derived.ma_long) {
        chart
            .draw_series(DashedLineSeries::new(run, 8, 5, long_style))
            .map_err(draw_error)?;
    }
    // dashed runs are drawn one series each; the legend entry hangs off an empty one
    chart
        .draw_series(std::iter::empty::<PathElement<(NaiveDate, f64)>>())
        .map_err(draw_error)?
        .label(format!("{}-Day MA", spec.derived.window_long))
        .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + LEGEND_SAMPLE_WIDTH, y)], long_style));

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(WHITE.mix(0.85))
        .border_style(BLACK.mix(0.3))
        .label_font(("sans-serif", 16))
        .draw()
        .map_err(draw_error)?;

    Ok(())
}

fn draw_figure<DB>(
    root: &DrawingArea<DB, Shift>,
    panels: &[PanelSpec],
    dates: Range<NaiveDate>,
    config: &RenderConfig,
) -> Result<(), ChartError>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE).map_err(draw_error)?;
    let body = root
        .titled(&config.title, ("sans-serif", 36))
        .map_err(draw_error)?;
    let (_, body_height) = body.dim_in_pixel();
    let breaks = panel_breakpoints(body_height as i32, panels.len(), config.x_axis_height as i32);
    let areas = body.split_by_breakpoints(Vec::<i32>::new(), breaks);
    let last = panels.len() - 1;
    for (i, (area, spec)) in areas.iter().zip(panels.iter()).enumerate() {
        debug!("drawing panel {} ('{}', {} points)", i, spec.series.name, spec.series.len());
        draw_panel(area, spec, dates.clone(), i == last, config)?;
    }
    Ok(())
}

/// Renders `panels` top to bottom into a PNG at `output_path`.
///
/// Nothing is created when `panels` is empty or the output location is not
/// usable. The bitmap is flushed when it leaves scope, on success or failure.
pub fn render(
    panels: &[PanelSpec],
    output_path: &Path,
    config: &RenderConfig,
) -> Result<(), ChartError> {
    if panels.is_empty() {
        return Err(ChartError::InvalidParameter("no panels to render".to_string()));
    }
    for p in panels {
        p.check()?;
    }
    let dates = date_range(panels)?;
    check_output_path(output_path)?;

    let size = config.image_size(panels.len());
    {
        let root = BitMapBackend::new(output_path, size).into_drawing_area();
        draw_figure(&root, panels, dates, config)?;
        root.present().map_err(|e| {
            ChartError::Io(format!("failed to write {}: {}", output_path.display(), e))
        })?;
    }
    info!(
        "rendered {} panel(s) at {}x{} to {}",
        panels.len(),
        size.0,
        size.1,
        output_path.display()
    );
    Ok(())
}
