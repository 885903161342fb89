//! Calendar features and their cyclical encodings

use super::frame::FeatureFrame;
use chrono::{Datelike, NaiveDate};
use std::f64::consts::PI;

/// Calendar fields of a single date
#[derive(Debug, Clone, Copy)]
struct Calendar {
    day_of_year: f64,
    /// Monday = 0
    day_of_week: f64,
    month: f64,
    quarter: f64,
    /// ISO week number
    week_of_year: f64,
    is_weekend: f64,
}

impl Calendar {
    fn of(date: NaiveDate) -> Self {
        let day_of_week = date.weekday().num_days_from_monday();
        Self {
            day_of_year: date.ordinal() as f64,
            day_of_week: day_of_week as f64,
            month: date.month() as f64,
            quarter: ((date.month() - 1) / 3 + 1) as f64,
            week_of_year: date.iso_week().week() as f64,
            is_weekend: if day_of_week >= 5 { 1.0 } else { 0.0 },
        }
    }
}

fn column_of(calendar: &[Calendar], f: impl Fn(&Calendar) -> f64) -> Vec<Option<f64>> {
    calendar.iter().map(|c| Some(f(c))).collect()
}

pub(crate) fn add_temporal_features(frame: &mut FeatureFrame) {
    let calendar: Vec<Calendar> = frame.dates().iter().map(|d| Calendar::of(*d)).collect();

    let plain = [
        ("day_of_year", column_of(&calendar, |c| c.day_of_year)),
        ("day_of_week", column_of(&calendar, |c| c.day_of_week)),
        ("month", column_of(&calendar, |c| c.month)),
        ("quarter", column_of(&calendar, |c| c.quarter)),
        ("week_of_year", column_of(&calendar, |c| c.week_of_year)),
        ("is_weekend", column_of(&calendar, |c| c.is_weekend)),
    ];

    let cyclical: [(&str, &str, f64, Vec<f64>); 3] = [
        ("sin_day", "cos_day", 365.0, calendar.iter().map(|c| c.day_of_year).collect()),
        ("sin_month", "cos_month", 12.0, calendar.iter().map(|c| c.month).collect()),
        ("sin_dow", "cos_dow", 7.0, calendar.iter().map(|c| c.day_of_week).collect()),
    ];

    for (name, values) in plain {
        frame.insert_column(name, values);
    }

    for (sin_name, cos_name, period, values) in cyclical {
        let angles: Vec<f64> = values.iter().map(|v| 2.0 * PI * v / period).collect();
        frame.insert_column(sin_name, angles.iter().map(|a| Some(a.sin())).collect());
        frame.insert_column(cos_name, angles.iter().map(|a| Some(a.cos())).collect());
    }
}
