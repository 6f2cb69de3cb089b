//! rolling_stats
//!
//! Trailing-window statistics over a dated series: short and long simple moving
//! averages, sample standard deviation over the long window, and Bollinger-style
//! bands around the long average.
//!
//! Positions where the trailing window is not yet full carry `None`. Nothing is
//! back-filled or interpolated, so consumers can render them as gaps.

use log::{debug, info, warn};
use metrics_common::{ChartError, DerivedSeries, Series};
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// Window and band parameters.
///
/// `window_short` is expected to be no larger than `window_long`. This is not
/// enforced: each window is computed independently and an inverted pair only
/// produces a warning, since the bands then track the slower average.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RollingParams {
    pub window_short: usize, // short moving average period
    pub window_long: usize,  // long moving average and band period
    pub num_std_dev: f64,    // band width in standard deviations
}

impl Default for RollingParams {
    fn default() -> Self {
        RollingParams {
            window_short: 7,
            window_long: 21,
            num_std_dev: 2.0,
        }
    }
}

impl RollingParams {
    pub fn validate(&self) -> Result<(), ChartError> {
        if self.window_short == 0 || self.window_long == 0 {
            return Err(ChartError::InvalidParameter(format!(
                "windows must be positive (short={}, long={})",
                self.window_short, self.window_long
            )));
        }
        if !self.num_std_dev.is_finite() || self.num_std_dev < 0.0 {
            return Err(ChartError::InvalidParameter(format!(
                "num_std_dev must be a non-negative number, got {}",
                self.num_std_dev
            )));
        }
        if self.window_short > self.window_long {
            warn!(
                "short window ({}) is longer than long window ({}); computing both as given",
                self.window_short, self.window_long
            );
        }
        Ok(())
    }
}

fn check_window(window: usize) -> Result<(), ChartError> {
    if window == 0 {
        return Err(ChartError::InvalidParameter("window must be positive".to_string()));
    }
    Ok(())
}

/// Fills the aligned output: `None` for the first `window - 1` positions, then
/// one value per full trailing window.
fn rolling_apply<F>(values: &[f64], window: usize, f: F) -> Vec<Option<f64>>
where
    F: Fn(ArrayView1<f64>) -> Option<f64>,
{
    let mut out: Vec<Option<f64>> = vec![None; values.len()];
    if window > values.len() {
        return out;
    }
    let view = ArrayView1::from(values);
    for (i, w) in view.windows(window).into_iter().enumerate() {
        out[i + window - 1] = f(w);
    }
    out
}

/// Simple moving average over the trailing `window` observations.
pub fn rolling_mean(values: &[f64], window: usize) -> Result<Vec<Option<f64>>, ChartError> {
    check_window(window)?;
    Ok(rolling_apply(values, window, |w| w.mean()))
}

/// Sample standard deviation (ddof = 1) over the trailing `window`
/// observations. A window of one has no degrees of freedom and is `None`
/// everywhere.
pub fn rolling_std(values: &[f64], window: usize) -> Result<Vec<Option<f64>>, ChartError> {
    check_window(window)?;
    if window == 1 {
        return Ok(vec![None; values.len()]);
    }
    Ok(rolling_apply(values, window, |w| Some(w.std(1.0))))
}

/// `ma ± k * std`, defined only where both operands are.
pub fn bollinger_bands(
    ma: &[Option<f64>],
    std: &[Option<f64>],
    num_std_dev: f64,
) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
    ma.iter()
        .zip(std.iter())
        .map(|(m, s)| match (m, s) {
            (Some(m), Some(s)) => (Some(m + num_std_dev * s), Some(m - num_std_dev * s)),
            _ => (None, None),
        })
        .unzip()
}

/// Computes every derived series for `series` under `params`.
pub fn compute(series: &Series, params: &RollingParams) -> Result<DerivedSeries, ChartError> {
    if series.is_empty() {
        return Err(ChartError::InvalidParameter(format!(
            "series '{}' is empty",
            series.name
        )));
    }
    params.validate()?;

    let values = series.values();
    if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
        return Err(ChartError::InvalidParameter(format!(
            "series '{}' has a non-finite value at position {}",
            series.name, pos
        )));
    }
    let ma_short = rolling_mean(&values, params.window_short)?;
    let ma_long = rolling_mean(&values, params.window_long)?;
    let std_long = rolling_std(&values, params.window_long)?;
    let (upper, lower) = bollinger_bands(&ma_long, &std_long, params.num_std_dev);

    let defined = ma_long.iter().filter(|v| v.is_some()).count();
    debug!(
        "series '{}': {} points, {} with a full {}-point window",
        series.name,
        values.len(),
        defined,
        params.window_long
    );
    info!(
        "computed rolling statistics for '{}' (short={}, long={}, k={})",
        series.name, params.window_short, params.window_long, params.num_std_dev
    );

    Ok(DerivedSeries {
        window_short: params.window_short,
        window_long: params.window_long,
        num_std_dev: params.num_std_dev,
        ma_short,
        ma_long,
        std_long,
        upper,
        lower,
    })
}
