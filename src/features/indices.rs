//! Derived weather indices

use super::frame::FeatureFrame;

/// Heat index approximation from temperature and relative humidity
pub fn heat_index(temp: f64, humidity: f64) -> f64 {
    -8.78469475556 + 1.61139411 * temp + 2.33854883889 * humidity
        - 0.14611605 * temp * humidity
        - 0.012308094 * temp.powi(2)
        - 0.0164248277778 * humidity.powi(2)
        + 0.002211732 * temp.powi(2) * humidity
        + 0.00072546 * temp * humidity.powi(2)
        - 0.000003582 * temp.powi(2) * humidity.powi(2)
}

/// Wind chill from temperature (°C) and wind speed (km/h)
pub fn wind_chill(temp: f64, wind_speed: f64) -> f64 {
    let wind = wind_speed.powf(0.16);
    13.12 + 0.6215 * temp - 11.37 * wind + 0.3965 * temp * wind
}

/// Combine two columns cell by cell; `None` if either column is absent
fn combine(
    frame: &FeatureFrame,
    a: &str,
    b: &str,
    f: impl Fn(f64, f64) -> f64,
) -> Option<Vec<Option<f64>>> {
    let a = frame.column(a)?;
    let b = frame.column(b)?;
    Some(
        a.iter()
            .zip(b)
            .map(|(x, y)| match (x, y) {
                (Some(x), Some(y)) => Some(f(*x, *y)).filter(|v| v.is_finite()),
                _ => None,
            })
            .collect(),
    )
}

pub(crate) fn add_weather_indices(frame: &mut FeatureFrame) {
    let derived = [
        ("heat_index", combine(frame, "temp_max", "humidity", heat_index)),
        ("temp_range", combine(frame, "temp_max", "temp_min", |hi, lo| hi - lo)),
        ("temp_avg", combine(frame, "temp_max", "temp_min", |hi, lo| (hi + lo) / 2.0)),
        ("wind_chill", combine(frame, "temp_min", "wind_speed", wind_chill)),
    ];

    for (name, values) in derived {
        if let Some(values) = values {
            frame.insert_column(name, values);
        }
    }
}
