//! Core weather types shared across the pipeline

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// One day of observed (or forecast) weather at a location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub date: NaiveDate,
    pub latitude: f64,
    pub longitude: f64,
    /// Daily maximum temperature (°C)
    pub temp_max: f64,
    /// Daily minimum temperature (°C)
    pub temp_min: f64,
    /// Relative humidity (%)
    pub humidity: f64,
    /// Sea-level pressure (hPa)
    pub pressure: f64,
    /// Wind speed (km/h)
    pub wind_speed: f64,
    /// Cloud cover (%)
    pub cloud_cover: f64,
    /// Precipitation (mm)
    pub precipitation: f64,
}

impl WeatherRecord {
    /// Numeric columns in frame order, paired with their names
    pub fn columns(&self) -> [(&'static str, f64); 9] {
        [
            ("latitude", self.latitude),
            ("longitude", self.longitude),
            ("temp_max", self.temp_max),
            ("temp_min", self.temp_min),
            ("humidity", self.humidity),
            ("pressure", self.pressure),
            ("wind_speed", self.wind_speed),
            ("cloud_cover", self.cloud_cover),
            ("precipitation", self.precipitation),
        ]
    }
}

/// Weather variable predicted by the ensemble
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Target {
    TempMax,
    TempMin,
    Precipitation,
    Humidity,
    WindSpeed,
}

impl Target {
    pub const ALL: [Target; 5] = [
        Target::TempMax,
        Target::TempMin,
        Target::Precipitation,
        Target::Humidity,
        Target::WindSpeed,
    ];

    /// Column name of this target in a feature frame
    pub fn column(&self) -> &'static str {
        match self {
            Target::TempMax => "temp_max",
            Target::TempMin => "temp_min",
            Target::Precipitation => "precipitation",
            Target::Humidity => "humidity",
            Target::WindSpeed => "wind_speed",
        }
    }

    /// Whether a frame column holds one of the predicted variables
    pub fn is_target_column(name: &str) -> bool {
        Self::ALL.iter().any(|t| t.column() == name)
    }

    pub fn value(&self, record: &WeatherRecord) -> f64 {
        match self {
            Target::TempMax => record.temp_max,
            Target::TempMin => record.temp_min,
            Target::Precipitation => record.precipitation,
            Target::Humidity => record.humidity,
            Target::WindSpeed => record.wind_speed,
        }
    }

    pub fn assign(&self, record: &mut WeatherRecord, value: f64) {
        match self {
            Target::TempMax => record.temp_max = value,
            Target::TempMin => record.temp_min = value,
            Target::Precipitation => record.precipitation = value,
            Target::Humidity => record.humidity = value,
            Target::WindSpeed => record.wind_speed = value,
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.column())
    }
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.column() == s)
            .ok_or_else(|| format!("unknown target '{}'", s))
    }
}

/// Predicted values for one forecast day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub predictions: BTreeMap<Target, f64>,
}

impl ForecastDay {
    pub fn get(&self, target: Target) -> Option<f64> {
        self.predictions.get(&target).copied()
    }
}
