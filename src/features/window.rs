//! Lag and trailing rolling-window features

use super::frame::FeatureFrame;
use super::FeatureConfig;

/// Windowed statistic over a trailing span
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollingStat {
    Mean,
    /// Sample standard deviation (n - 1 denominator)
    Std,
    Max,
    Min,
}

impl RollingStat {
    pub const ALL: [RollingStat; 4] = [
        RollingStat::Mean,
        RollingStat::Std,
        RollingStat::Max,
        RollingStat::Min,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            RollingStat::Mean => "mean",
            RollingStat::Std => "std",
            RollingStat::Max => "max",
            RollingStat::Min => "min",
        }
    }

    fn apply(&self, window: &[f64]) -> Option<f64> {
        if window.is_empty() {
            return None;
        }
        let n = window.len() as f64;
        match self {
            RollingStat::Mean => Some(window.iter().sum::<f64>() / n),
            RollingStat::Std => {
                if window.len() < 2 {
                    return None;
                }
                let mean = window.iter().sum::<f64>() / n;
                let var = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
                Some(var.sqrt())
            }
            RollingStat::Max => window.iter().copied().reduce(f64::max),
            RollingStat::Min => window.iter().copied().reduce(f64::min),
        }
    }
}

/// Values shifted back by `lag` rows; the first `lag` rows are undefined
pub fn lagged(values: &[Option<f64>], lag: usize) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|idx| if idx >= lag { values[idx - lag] } else { None })
        .collect()
}

/// Trailing window statistic including the current row
pub fn rolling(values: &[Option<f64>], window: usize, stat: RollingStat) -> Vec<Option<f64>> {
    (0..values.len())
        .map(|end| trailing(values, end, window).and_then(|w| stat.apply(&w)))
        .collect()
}

fn trailing(values: &[Option<f64>], end: usize, window: usize) -> Option<Vec<f64>> {
    if window == 0 || end + 1 < window {
        return None;
    }
    values[end + 1 - window..=end].iter().copied().collect()
}

/// Columns of `config.weather_columns` present in the frame, with their values
fn source_columns(frame: &FeatureFrame, config: &FeatureConfig) -> Vec<(String, Vec<Option<f64>>)> {
    config
        .weather_columns
        .iter()
        .filter_map(|name| frame.column(name).map(|v| (name.clone(), v.to_vec())))
        .collect()
}

pub(crate) fn add_lag_features(frame: &mut FeatureFrame, config: &FeatureConfig) {
    for (name, values) in source_columns(frame, config) {
        for &lag in &config.lags {
            frame.insert_column(format!("{}_lag_{}", name, lag), lagged(&values, lag));
        }
    }
}

pub(crate) fn add_rolling_features(frame: &mut FeatureFrame, config: &FeatureConfig) {
    for (name, values) in source_columns(frame, config) {
        for &window in &config.rolling_windows {
            for stat in RollingStat::ALL {
                frame.insert_column(
                    format!("{}_roll_{}_{}", name, stat.name(), window),
                    rolling(&values, window, stat),
                );
            }
        }
    }
}
