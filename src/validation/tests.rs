//! Unit tests for the validation gate

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::data::write_records;
    use crate::error::ForecastError;
    use crate::registry::ForecastArtifact;
    use crate::test_fixtures::{history, tiny_config};
    use tempfile::tempdir;

    fn thresholds() -> ValidationThresholds {
        ValidationThresholds::default()
    }

    #[test]
    fn test_default_thresholds() {
        assert_eq!(thresholds().min_r2, 0.85);
        assert_eq!(thresholds().max_rmse, 3.0);
    }

    #[test]
    fn test_evaluate_passes_good_metrics() {
        let report = evaluate(0.90, 2.0, &thresholds(), "./model");
        assert!(report.passed);
        assert!(report.failures.is_empty());
        assert_eq!(report.metrics, ReportMetrics { r2: 0.90, rmse: 2.0 });
        assert_eq!(report.artifact_path, "./model");
    }

    #[test]
    fn test_evaluate_flags_low_r2() {
        let report = evaluate(0.80, 2.0, &thresholds(), "./model");
        assert!(!report.passed);
        assert_eq!(report.failures.len(), 1);
        assert!(report.failures[0].contains("R²"));
        assert!(report.failures[0].contains("0.8000"));
    }

    #[test]
    fn test_evaluate_flags_high_rmse() {
        let report = evaluate(0.95, 3.5, &thresholds(), "./model");
        assert!(!report.passed);
        assert_eq!(report.failures, vec!["RMSE 3.5000 exceeds threshold 3".to_string()]);
    }

    #[test]
    fn test_evaluate_boundaries_pass() {
        let report = evaluate(0.85, 3.0, &thresholds(), "./model");
        assert!(report.passed);
    }

    #[test]
    fn test_evaluate_rejects_nan_metrics() {
        let report = evaluate(f64::NAN, f64::NAN, &thresholds(), "./model");
        assert!(!report.passed);
        assert_eq!(report.failures.len(), 2);
    }

    #[test]
    fn test_exit_codes() {
        let passed = ValidationOutcome::Passed(evaluate(0.9, 1.0, &thresholds(), "m"));
        let failed = ValidationOutcome::BelowThreshold(evaluate(0.1, 9.0, &thresholds(), "m"));
        let skipped = ValidationOutcome::Skipped {
            reason: "no data".to_string(),
        };
        let errored = ValidationOutcome::Errored {
            message: "boom".to_string(),
        };

        assert_eq!(passed.exit_code(), 0);
        assert_eq!(failed.exit_code(), 1);
        assert_eq!(skipped.exit_code(), 0);
        assert_eq!(errored.exit_code(), 2);

        assert!(passed.report().is_some());
        assert!(failed.report().is_some());
        assert!(skipped.report().is_none());
    }

    #[test]
    fn test_outcome_classification() {
        let report = evaluate(0.9, 1.0, &thresholds(), "m");
        assert!(matches!(
            ValidationOutcome::from_result(Ok(report)),
            ValidationOutcome::Passed(_)
        ));

        let report = evaluate(0.2, 1.0, &thresholds(), "m");
        assert!(matches!(
            ValidationOutcome::from_result(Ok(report)),
            ValidationOutcome::BelowThreshold(_)
        ));

        let missing = ForecastError::InputUnavailable("data.csv".to_string());
        assert!(matches!(
            ValidationOutcome::from_result(Err(missing)),
            ValidationOutcome::Skipped { .. }
        ));

        let unregistered = ForecastError::StageNotFound(Stage::Production);
        assert!(matches!(
            ValidationOutcome::from_result(Err(unregistered)),
            ValidationOutcome::Skipped { .. }
        ));

        let broken = ForecastError::InsufficientData { required: 15, actual: 3 };
        assert!(matches!(
            ValidationOutcome::from_result(Err(broken)),
            ValidationOutcome::Errored { .. }
        ));
    }

    #[test]
    fn test_report_file_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("validation_report.json");
        let report = evaluate(0.80, 3.5, &thresholds(), "./model");

        report.write(&path).unwrap();
        let loaded = ValidationReport::load(&path).unwrap();
        assert_eq!(loaded, report);

        let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["passed"], false);
        assert_eq!(json["metrics"]["r2"], 0.8);
        assert_eq!(json["thresholds"]["max_rmse"], 3.0);
        assert_eq!(json["failures"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_summary_mentions_result() {
        let summary = evaluate(0.9, 1.0, &thresholds(), "m").summary();
        assert!(summary.contains("MODEL VALIDATION REPORT"));
        assert!(summary.contains("PASSED"));
        assert!(summary.contains("R²   = 0.9000"));
    }

    #[test]
    fn test_run_skips_without_registered_model() {
        let dir = tempdir().unwrap();
        let config = tiny_config(&dir.path().join("registry"));
        let request = ValidationRequest {
            thresholds: thresholds(),
            source: ValidationSource::Registered {
                stage: Stage::Production,
            },
            model_path: dir.path().join("model").display().to_string(),
            report_path: dir.path().join("report.json"),
        };

        let outcome = run(&config, &request);
        assert!(matches!(outcome, ValidationOutcome::Skipped { .. }));
        assert_eq!(outcome.exit_code(), 0);
        assert!(!request.report_path.exists());
    }

    #[test]
    fn test_run_skips_missing_dataset() {
        let dir = tempdir().unwrap();
        let config = tiny_config(&dir.path().join("registry"));
        let request = ValidationRequest {
            thresholds: thresholds(),
            source: ValidationSource::Train {
                data: Some(dir.path().join("absent.csv")),
            },
            model_path: dir.path().join("model").display().to_string(),
            report_path: dir.path().join("report.json"),
        };

        assert!(matches!(run(&config, &request), ValidationOutcome::Skipped { .. }));
    }

    #[test]
    fn test_run_errors_on_short_dataset() {
        let dir = tempdir().unwrap();
        let data = dir.path().join("short.csv");
        write_records(&data, &history()[..10]).unwrap();

        let config = tiny_config(&dir.path().join("registry"));
        let request = ValidationRequest {
            thresholds: thresholds(),
            source: ValidationSource::Train { data: Some(data) },
            model_path: dir.path().join("model").display().to_string(),
            report_path: dir.path().join("report.json"),
        };

        let outcome = run(&config, &request);
        assert!(matches!(outcome, ValidationOutcome::Errored { .. }));
        assert_eq!(outcome.exit_code(), 2);
    }

    #[test]
    fn test_run_trains_and_writes_report() {
        let dir = tempdir().unwrap();
        let data = dir.path().join("history.csv");
        write_records(&data, &history()).unwrap();

        let config = tiny_config(&dir.path().join("registry"));
        let request = ValidationRequest {
            thresholds: ValidationThresholds {
                min_r2: -1e9,
                max_rmse: 1e9,
            },
            source: ValidationSource::Train { data: Some(data) },
            model_path: dir.path().join("model").display().to_string(),
            report_path: dir.path().join("out").join("report.json"),
        };

        let outcome = run(&config, &request);
        let report = match &outcome {
            ValidationOutcome::Passed(report) => report,
            other => panic!("expected a pass, got {:?}", other),
        };
        assert_eq!(ValidationReport::load(&request.report_path).unwrap(), *report);

        // The report points at the artifact that was measured
        let artifact_path = std::path::Path::new(&report.artifact_path);
        assert!(artifact_path.starts_with(dir.path().join("model")));
        let artifact = ForecastArtifact::load(artifact_path).unwrap();
        assert!(artifact.ensure_complete().is_ok());
        assert_eq!(artifact.avg_r2, report.metrics.r2);
        assert_eq!(artifact.avg_rmse, report.metrics.rmse);
    }

    #[test]
    fn test_run_uses_registered_metrics() {
        let dir = tempdir().unwrap();
        let config = tiny_config(&dir.path().join("registry"));
        let registry = crate::registry::ModelRegistry::open(&config.registry).unwrap();
        let artifact = &crate::test_fixtures::trained().artifact;
        let entry = registry.persist(artifact).unwrap();

        let request = ValidationRequest {
            thresholds: ValidationThresholds {
                min_r2: 2.0,
                max_rmse: 3.0,
            },
            source: ValidationSource::Registered {
                stage: Stage::Staging,
            },
            model_path: dir.path().join("model").display().to_string(),
            report_path: dir.path().join("report.json"),
        };

        let outcome = run(&config, &request);
        assert_eq!(outcome.exit_code(), 1);
        let report = outcome.report().unwrap();
        assert_eq!(report.metrics.r2, artifact.avg_r2);
        assert_eq!(report.metrics.rmse, artifact.avg_rmse);
        assert_eq!(report.artifact_path, registry.artifact_path(&entry).display().to_string());
    }
}
