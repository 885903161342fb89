//! Unit tests for recursive forecasting and the serving facade

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::registry::{ModelRegistry, RegistryConfig, Stage};
    use crate::test_fixtures::{date, history, new_year_seed, trained};
    use tempfile::tempdir;

    fn artifact() -> &'static ForecastArtifact {
        &trained().artifact
    }

    fn is_two_decimals(value: f64) -> bool {
        let scaled = value * 100.0;
        (scaled - scaled.round()).abs() < 1e-6
    }

    #[test]
    fn test_three_day_forecast_from_seed() {
        let days = forecast(artifact(), &new_year_seed(), 3).unwrap();

        assert_eq!(days.len(), 3);
        assert_eq!(
            days.iter().map(|d| d.date).collect::<Vec<_>>(),
            vec![date(2024, 1, 2), date(2024, 1, 3), date(2024, 1, 4)]
        );
        for day in &days {
            assert_eq!(day.predictions.len(), Target::ALL.len());
            for target in Target::ALL {
                let value = day.get(target).unwrap();
                assert!(value.is_finite());
                assert!(is_two_decimals(value), "{} = {} is not rounded", target, value);
            }
        }
    }

    #[test]
    fn test_forecast_is_repeatable() {
        let first = forecast(artifact(), &new_year_seed(), 7).unwrap();
        let second = forecast(artifact(), &new_year_seed(), 7).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_concurrent_forecasts_match_sequential() {
        let expected = forecast(artifact(), &new_year_seed(), 5).unwrap();

        let results: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| forecast(artifact(), &new_year_seed(), 5).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        for result in results {
            assert_eq!(result, expected);
        }
    }

    #[test]
    fn test_longer_horizon_extends_shorter() {
        let short = forecast(artifact(), &new_year_seed(), 2).unwrap();
        let long = forecast(artifact(), &new_year_seed(), MAX_HORIZON).unwrap();

        assert_eq!(long.len(), MAX_HORIZON);
        assert_eq!(&long[..2], &short[..]);
        assert_eq!(long.last().unwrap().date, date(2024, 1, 15));
    }

    #[test]
    fn test_horizon_bounds() {
        assert!(matches!(
            forecast(artifact(), &new_year_seed(), 0),
            Err(ForecastError::InvalidHorizon(0))
        ));
        assert!(matches!(
            forecast(artifact(), &new_year_seed(), MAX_HORIZON + 1),
            Err(ForecastError::InvalidHorizon(15))
        ));
    }

    #[test]
    fn test_incomplete_artifact_is_not_trained() {
        let mut partial = artifact().clone();
        partial.models.remove(&Target::WindSpeed);

        let err = forecast(&partial, &new_year_seed(), 3).unwrap_err();
        assert!(matches!(err, ForecastError::ModelNotTrained(_)));
    }

    #[test]
    fn test_history_forecast_starts_after_last_record() {
        let records = history();
        let days = forecast_from_history(artifact(), &records, 2).unwrap();

        assert_eq!(days[0].date, date(2024, 1, 1));
        assert_eq!(days[1].date, date(2024, 1, 2));
    }

    #[test]
    fn test_only_trailing_window_matters() {
        let records = history();
        let lookback = artifact().feature_config.lookback();
        let trailing = &records[records.len() - (lookback + 1)..];

        let full = forecast_from_history(artifact(), &records, 4).unwrap();
        let windowed = forecast_from_history(artifact(), trailing, 4).unwrap();
        assert_eq!(full, windowed);
    }

    #[test]
    fn test_empty_history_rejected() {
        let err = forecast_from_history(artifact(), &[], 3).unwrap_err();
        assert!(matches!(
            err,
            ForecastError::InsufficientData { required: 1, actual: 0 }
        ));
    }

    #[test]
    fn test_round_prediction_half_to_even() {
        assert_eq!(round_prediction(0.125).unwrap(), 0.12);
        assert_eq!(round_prediction(0.375).unwrap(), 0.38);
        assert_eq!(round_prediction(-0.125).unwrap(), -0.12);
        assert_eq!(round_prediction(21.4).unwrap(), 21.4);
        // 2.675 and 1.005 sit just below the midpoint in binary
        assert_eq!(round_prediction(2.675).unwrap(), 2.67);
        assert_eq!(round_prediction(1.005).unwrap(), 1.0);
        assert_eq!(round_prediction(-2.675).unwrap(), -2.67);
        assert!(round_prediction(f64::NAN).is_err());
    }

    #[test]
    fn test_persistence_forecast_carries_seed() {
        let seed = new_year_seed();
        let days = persistence_forecast(&seed, 3).unwrap();

        assert_eq!(days.len(), 3);
        assert_eq!(days[2].date, date(2024, 1, 4));
        for day in &days {
            assert_eq!(day.get(Target::TempMax), Some(10.0));
            assert_eq!(day.get(Target::TempMin), Some(2.0));
            assert_eq!(day.get(Target::Humidity), Some(70.0));
            assert_eq!(day.get(Target::WindSpeed), Some(12.0));
            assert_eq!(day.get(Target::Precipitation), Some(1.0));
        }

        assert!(matches!(
            persistence_forecast(&seed, 0),
            Err(ForecastError::InvalidHorizon(0))
        ));
    }

    #[test]
    fn test_degraded_service_serves_fallback() {
        let service = ForecastService::degraded();
        assert!(!service.is_ready());
        assert_eq!(service.model_version(), None);

        let served = service.forecast(&new_year_seed(), 2).unwrap();
        assert_eq!(served.source, ForecastSource::Fallback);
        assert_eq!(served.days, persistence_forecast(&new_year_seed(), 2).unwrap());

        assert!(matches!(
            service.forecast_from_history(&[], 2),
            Err(ForecastError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_service_without_registered_model_degrades() {
        let dir = tempdir().unwrap();
        let registry = ModelRegistry::open(&RegistryConfig {
            root: dir.path().display().to_string(),
            ..Default::default()
        })
        .unwrap();

        let service = ForecastService::from_registry(&registry, Stage::Production);
        assert!(!service.is_ready());
    }

    #[test]
    fn test_service_serves_promoted_model() {
        let dir = tempdir().unwrap();
        let registry = ModelRegistry::open(&RegistryConfig {
            root: dir.path().display().to_string(),
            ..Default::default()
        })
        .unwrap();
        let entry = registry.persist(artifact()).unwrap();
        registry.promote(entry.version, Stage::Production).unwrap();

        let service = ForecastService::from_registry(&registry, Stage::Production);
        assert!(service.is_ready());
        assert_eq!(service.model_version(), Some(1));

        let served = service.forecast(&new_year_seed(), 3).unwrap();
        assert_eq!(
            served.source,
            ForecastSource::Model {
                version: 1,
                run_id: artifact().run_id,
            }
        );
        assert_eq!(served.days, forecast(artifact(), &new_year_seed(), 3).unwrap());

        assert!(matches!(
            service.forecast(&new_year_seed(), 0),
            Err(ForecastError::InvalidHorizon(0))
        ));
    }

    #[test]
    fn test_served_forecast_json_shape() {
        let served = ForecastService::degraded().forecast(&new_year_seed(), 1).unwrap();
        let json = serde_json::to_value(&served).unwrap();

        assert_eq!(json["source"]["kind"], "fallback");
        assert_eq!(json["days"][0]["date"], "2024-01-02");
        assert_eq!(json["days"][0]["temp_max"], 10.0);
    }
}
