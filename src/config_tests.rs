//! Tests for configuration

#[cfg(test)]
mod tests {
    use super::super::config::*;
    use crate::registry::Stage;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        assert_eq!(config.training.test_fraction, 0.2);
        assert_eq!(config.training.min_rows, 20);
        assert_eq!(config.training.synthetic_days, 3650);
        assert_eq!(config.validation.min_r2, 0.85);
        assert_eq!(config.validation.max_rmse, 3.0);
        assert_eq!(config.registry.serving_stage, Stage::Production);
        assert_eq!(config.registry.initial_stage, Stage::Staging);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.features.lookback(), 14);
        assert_eq!(config.ensemble.depth_wise.n_estimators, 500);
        assert_eq!(config.ensemble.leaf_wise.num_leaves, Some(31));
        assert_eq!(config.ensemble.forest.n_estimators, 200);
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let toml_str = r#"
[training]
test_fraction = 0.25

[ensemble.depth_wise]
n_estimators = 100
max_depth = 4

[registry]
root = "/var/lib/forecast"
serving_stage = "Staging"

[logging]
format = "json"
"#;
        fs::write(&path, toml_str).unwrap();

        // Partial ensemble sections merge over the layered defaults
        let config = Config::load(&path).unwrap();
        assert_eq!(config.training.test_fraction, 0.25);
        assert_eq!(config.training.min_rows, 20);
        assert_eq!(config.ensemble.depth_wise.n_estimators, 100);
        assert_eq!(config.ensemble.depth_wise.max_depth, 4);
        assert_eq!(config.ensemble.depth_wise.learning_rate, 0.05);
        assert_eq!(config.ensemble.leaf_wise.n_estimators, 500);
        assert_eq!(config.registry.root, "/var/lib/forecast");
        assert_eq!(config.registry.serving_stage, Stage::Staging);
        assert_eq!(config.registry.model_name, "weather-forecast");
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_registry_root_expands_home() {
        let config: Config = toml::from_str("[registry]\nroot = \"~/models\"\n").unwrap();
        let root = config.registry.root_path();
        assert!(!root.to_string_lossy().starts_with('~'));
        assert!(root.ends_with("models"));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = Config::load(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.ensemble, Config::default().ensemble);
        assert_eq!(config.registry, Config::default().registry);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
[features]
lags = [1, 2, 5, 7]

[ensemble.forest]
n_estimators = 50
max_features = 6

[registry]
model_name = "nyc"
"#,
        )
        .unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(config.features.lags, vec![1, 2, 5, 7]);
        assert_eq!(config.ensemble.forest.n_estimators, 50);
        assert_eq!(config.ensemble.forest.max_features, Some(6));
        assert_eq!(config.ensemble.forest.min_samples_leaf, 2);
        assert_eq!(config.registry.model_name, "nyc");
        assert_eq!(config.registry.initial_stage, Stage::Staging);
    }

    #[test]
    fn test_environment_overrides() {
        let dir = tempdir().unwrap();
        std::env::set_var("WEATHER__VALIDATION__MAX_RMSE", "2.5");
        let config = Config::load(dir.path().join("absent.toml"));
        std::env::remove_var("WEATHER__VALIDATION__MAX_RMSE");

        assert_eq!(config.unwrap().validation.max_rmse, 2.5);
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[training]\nmin_rows = \"many\"\n").unwrap();

        assert!(matches!(
            Config::load(&path),
            Err(crate::error::ForecastError::Config(_))
        ));
    }
}
