use std::{env, fmt};

use super::database_url;

/// Application runtime environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    fn from_str(value: &str) -> Result<Self, ConfigError> {
        match value {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            "test" => Ok(Self::Test),
            other => Err(ConfigError::InvalidEnvironment(other.to_string())),
        }
    }

    /// Returns the canonical name used for logging labels.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
            Self::Test => "test",
        }
    }
}

/// Runtime configuration resolved from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub environment: Environment,
    /// Loads the demo organization, volunteer and shift after migrating.
    pub seed_demo_data: bool,
    /// Installs the Prometheus recorder so counters are kept and rendered.
    pub metrics_enabled: bool,
}

impl AppConfig {
    /// Constructs the configuration by reading and validating environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let env_value = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());
        let environment = Environment::from_str(&env_value)?;
        let seed_demo_data = read_flag("APP_SEED")?;
        let metrics_enabled = read_flag("APP_METRICS")?;

        Ok(Self {
            database_url: database_url(),
            environment,
            seed_demo_data,
            metrics_enabled,
        })
    }
}

/// Unset flags read as `false`.
fn read_flag(name: &'static str) -> Result<bool, ConfigError> {
    match env::var(name) {
        Ok(value) => parse_flag(name, &value),
        Err(_) => Ok(false),
    }
}

fn parse_flag(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            name,
            value: value.to_string(),
        }),
    }
}

/// Errors that can occur during configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    InvalidEnvironment(String),
    InvalidFlag { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidEnvironment(value) => write!(
                f,
                "APP_ENV must be one of 'development', 'production', or 'test' (got {value})"
            ),
            Self::InvalidFlag { name, value } => {
                write!(f, "{name} must be a boolean flag (got {value})")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ENV_GUARD;
    use crate::DEFAULT_DATABASE_URL;

    fn clear() {
        env::remove_var("APP_ENV");
        env::remove_var("APP_SEED");
        env::remove_var("APP_METRICS");
        env::remove_var("DATABASE_URL");
    }

    #[test]
    fn loads_defaults_in_development() {
        let _guard = ENV_GUARD.lock().expect("env guard poisoned");
        clear();

        let config = AppConfig::from_env().expect("config should load with defaults");
        assert_eq!(config.environment, Environment::Development);
        assert_eq!(config.database_url, DEFAULT_DATABASE_URL);
        assert!(!config.seed_demo_data);
        assert!(!config.metrics_enabled);
    }

    #[test]
    fn rejects_invalid_environment() {
        let _guard = ENV_GUARD.lock().expect("env guard poisoned");
        clear();
        env::set_var("APP_ENV", "invalid");

        let err = AppConfig::from_env().expect_err("invalid env should error");
        assert!(matches!(err, ConfigError::InvalidEnvironment(value) if value == "invalid"));

        clear();
    }

    #[test]
    fn parses_production_environment_with_seed() {
        let _guard = ENV_GUARD.lock().expect("env guard poisoned");
        clear();
        env::set_var("APP_ENV", "prod");
        env::set_var("APP_SEED", "Yes");
        env::set_var("DATABASE_URL", "sqlite://prod.db");

        let config = AppConfig::from_env().expect("config should load");
        assert_eq!(config.environment, Environment::Production);
        assert!(config.seed_demo_data);
        assert_eq!(config.database_url, "sqlite://prod.db");

        clear();
    }

    #[test]
    fn rejects_unparseable_seed_flag() {
        let _guard = ENV_GUARD.lock().expect("env guard poisoned");
        clear();
        env::set_var("APP_SEED", "sometimes");

        let err = AppConfig::from_env().expect_err("bad flag should error");
        assert_eq!(err.to_string(), "APP_SEED must be a boolean flag (got sometimes)");

        clear();
    }

    #[test]
    fn enables_metrics_from_flag() {
        let _guard = ENV_GUARD.lock().expect("env guard poisoned");
        clear();
        env::set_var("APP_METRICS", "1");

        let config = AppConfig::from_env().expect("config should load");
        assert!(config.metrics_enabled);
        assert!(!config.seed_demo_data);

        clear();
    }

    #[test]
    fn invalid_metrics_flag_names_its_variable() {
        let _guard = ENV_GUARD.lock().expect("env guard poisoned");
        clear();
        env::set_var("APP_METRICS", "on-ish");

        let err = AppConfig::from_env().expect_err("bad flag should error");
        assert!(matches!(
            err,
            ConfigError::InvalidFlag { name: "APP_METRICS", ref value } if value == "on-ish"
        ));

        clear();
    }
}
