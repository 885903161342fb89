//! Seeded synthetic daily history with seasonal structure

use crate::error::{ForecastError, Result};
use crate::types::WeatherRecord;
use chrono::{Datelike, Days, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Exp, Normal};
use std::f64::consts::PI;
use tracing::info;

/// New York City
pub const DEFAULT_LATITUDE: f64 = 40.7128;
pub const DEFAULT_LONGITUDE: f64 = -74.0060;

fn normal(mean: f64, std_dev: f64) -> Result<Normal<f64>> {
    Normal::new(mean, std_dev).map_err(|e| ForecastError::InvalidParameter(e.to_string()))
}

/// `days` consecutive days ending at `end`, reproducible for a given seed
pub fn synthetic_history(days: usize, end: NaiveDate, seed: u64) -> Result<Vec<WeatherRecord>> {
    if days == 0 {
        return Err(ForecastError::InvalidParameter(
            "synthetic history needs at least one day".to_string(),
        ));
    }
    let start = end
        .checked_sub_days(Days::new(days as u64 - 1))
        .ok_or_else(|| ForecastError::InvalidParameter(format!("{} days before {} is out of range", days, end)))?;

    info!(days, %start, %end, seed, "Generating synthetic weather history");

    let temp_max_noise = normal(0.0, 3.0)?;
    let temp_min_noise = normal(0.0, 2.0)?;
    let humidity_noise = normal(0.0, 10.0)?;
    let pressure_noise = normal(0.0, 8.0)?;
    let wind_noise = normal(0.0, 8.0)?;
    let cloud = normal(50.0, 25.0)?;
    let rain = Exp::new(0.5).map_err(|e| ForecastError::InvalidParameter(e.to_string()))?;

    let mut rng = StdRng::seed_from_u64(seed);

    Ok(start
        .iter_days()
        .take(days)
        .map(|date| {
            let doy = date.ordinal() as f64;
            let seasonal_temp = 15.0 * (2.0 * PI * (doy - 80.0) / 365.0).sin();
            let seasonal_precip = 3.0 + 2.0 * (2.0 * PI * (doy - 30.0) / 365.0).sin();

            let hi = seasonal_temp + 20.0 + rng.sample(temp_max_noise);
            let lo = seasonal_temp + 10.0 + rng.sample(temp_min_noise);
            let humidity = (60.0 + seasonal_precip * 5.0 + rng.sample(humidity_noise)).clamp(20.0, 100.0);
            let pressure = 1013.0 + rng.sample(pressure_noise);
            let wind_speed = (15.0 + rng.sample(wind_noise)).abs();
            let precipitation = (seasonal_precip + rng.sample(rain)).abs();
            let cloud_cover = rng.sample(cloud).clamp(0.0, 100.0);

            WeatherRecord {
                date,
                latitude: DEFAULT_LATITUDE,
                longitude: DEFAULT_LONGITUDE,
                temp_max: hi.max(lo),
                temp_min: hi.min(lo),
                humidity,
                pressure,
                wind_speed,
                cloud_cover,
                precipitation: if precipitation < 1.0 { 0.0 } else { precipitation },
            }
        })
        .collect())
}
