//! Tests for core types

#[cfg(test)]
mod tests {
    use super::super::types::*;
    use crate::test_fixtures::{date, new_year_seed};
    use std::collections::BTreeMap;

    #[test]
    fn test_target_names() {
        let names: Vec<_> = Target::ALL.iter().map(|t| t.column()).collect();
        assert_eq!(
            names,
            vec!["temp_max", "temp_min", "precipitation", "humidity", "wind_speed"]
        );
        assert_eq!(Target::WindSpeed.to_string(), "wind_speed");
        assert_eq!(format!("{:<12}|", Target::Humidity), "humidity    |");
    }

    #[test]
    fn test_target_parsing() {
        assert_eq!("temp_min".parse::<Target>().unwrap(), Target::TempMin);
        assert!("pressure".parse::<Target>().is_err());
    }

    #[test]
    fn test_target_serialization() {
        assert_eq!(serde_json::to_string(&Target::TempMax).unwrap(), "\"temp_max\"");
        let parsed: Target = serde_json::from_str("\"precipitation\"").unwrap();
        assert_eq!(parsed, Target::Precipitation);
    }

    #[test]
    fn test_target_column_detection() {
        assert!(Target::is_target_column("humidity"));
        assert!(!Target::is_target_column("pressure"));
        assert!(!Target::is_target_column("humidity_lag_1"));
    }

    #[test]
    fn test_target_value_and_assign() {
        let mut record = new_year_seed();
        assert_eq!(Target::TempMax.value(&record), 10.0);
        assert_eq!(Target::Precipitation.value(&record), 1.0);

        Target::WindSpeed.assign(&mut record, 25.5);
        assert_eq!(record.wind_speed, 25.5);
        assert_eq!(record.pressure, 1015.0);
    }

    #[test]
    fn test_record_columns_order() {
        let record = new_year_seed();
        let columns = record.columns();
        assert_eq!(columns[0], ("latitude", 40.7128));
        assert_eq!(columns[2], ("temp_max", 10.0));
        assert_eq!(columns[8], ("precipitation", 1.0));
    }

    #[test]
    fn test_forecast_day_flattens_predictions() {
        let mut predictions = BTreeMap::new();
        predictions.insert(Target::TempMax, 12.5);
        predictions.insert(Target::Humidity, 64.0);
        let day = ForecastDay {
            date: date(2024, 1, 2),
            predictions,
        };

        let json = serde_json::to_value(&day).unwrap();
        assert_eq!(json["date"], "2024-01-02");
        assert_eq!(json["temp_max"], 12.5);
        assert_eq!(json["humidity"], 64.0);

        let parsed: ForecastDay = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, day);
        assert_eq!(parsed.get(Target::TempMax), Some(12.5));
        assert_eq!(parsed.get(Target::WindSpeed), None);
    }
}
