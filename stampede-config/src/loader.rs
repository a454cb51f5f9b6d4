//! Configuration loading and environment variable handling

use crate::domains::logging::LoggingConfig;
use crate::domains::target::TargetConfig;
use crate::domains::StampedeConfig;
use crate::error::{ConfigError, ConfigResult};
use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

/// Reads YAML configuration, then lets `<PREFIX>_*` environment variables
/// override target and logging settings before validation
pub struct ConfigLoader {
    prefix: String,
}

impl ConfigLoader {
    /// Loader reading `STAMPEDE_*` overrides
    pub fn new() -> Self {
        Self::with_prefix("STAMPEDE")
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn from_file(&self, path: impl AsRef<Path>) -> ConfigResult<StampedeConfig> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Loaded configuration file {:?}", path);
        self.from_yaml_str(&content)
    }

    pub fn from_yaml_str(&self, content: &str) -> ConfigResult<StampedeConfig> {
        let config: StampedeConfig = serde_yaml::from_str(content)?;
        self.finish(config)
    }

    /// Defaults plus environment overrides, without any scenario
    pub fn from_env(&self) -> ConfigResult<StampedeConfig> {
        self.finish(StampedeConfig::default())
    }

    /// Read `config_path` when given, otherwise fall back to the environment
    pub fn load(&self, config_path: Option<impl AsRef<Path>>) -> ConfigResult<StampedeConfig> {
        match config_path {
            Some(path) => self.from_file(path),
            None => self.from_env(),
        }
    }

    fn finish(&self, mut config: StampedeConfig) -> ConfigResult<StampedeConfig> {
        self.apply_target_overrides(&mut config.target)?;
        self.apply_logging_overrides(&mut config.logging)?;
        config.validate_all()?;
        Ok(config)
    }

    fn apply_target_overrides(&self, target: &mut TargetConfig) -> ConfigResult<()> {
        if let Some(base_url) = self.get_env_var("BASE_URL") {
            target.base_url = base_url;
        }
        // Whole seconds, matching the k6 style `HTTP_TIMEOUT=30`
        if let Some(seconds) = self.parse_env_var::<u64>("HTTP_TIMEOUT")? {
            target.timeout = Duration::from_secs(seconds);
        }
        if let Some(user_agent) = self.get_env_var("USER_AGENT") {
            target.user_agent = user_agent;
        }
        if let Some(verify_ssl) = self.parse_env_var("VERIFY_SSL")? {
            target.verify_ssl = verify_ssl;
        }
        Ok(())
    }

    fn apply_logging_overrides(&self, logging: &mut LoggingConfig) -> ConfigResult<()> {
        if let Some(level) = self.parse_env_var("LOG_LEVEL")? {
            logging.level = level;
        }
        if let Some(format) = self.parse_env_var("LOG_FORMAT")? {
            logging.format = format;
        }
        Ok(())
    }

    fn env_name(&self, name: &str) -> String {
        format!("{}_{}", self.prefix, name)
    }

    fn get_env_var(&self, name: &str) -> Option<String> {
        std::env::var(self.env_name(name)).ok()
    }

    fn parse_env_var<T>(&self, name: &str) -> ConfigResult<Option<T>>
    where
        T: FromStr,
        T::Err: Display,
    {
        let Some(raw) = self.get_env_var(name) else {
            return Ok(None);
        };
        let var = self.env_name(name);
        log::debug!("Applying override {}", var);
        raw.trim()
            .parse()
            .map(Some)
            .map_err(|e: T::Err| ConfigError::Env {
                var,
                message: e.to_string(),
            })
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::logging::{LogFormat, LogLevel};
    use std::io::Write;
    use std::time::Duration;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r#"
target:
  base_url: http://localhost:3000
scenarios:
  smoke:
    profile: {kind: fixed, vus: 2, duration: 5s}
    operation: read
"#;

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(MINIMAL.as_bytes()).unwrap();

        let config = temp_env::with_vars_unset(
            ["STAMPEDE_BASE_URL", "STAMPEDE_HTTP_TIMEOUT", "STAMPEDE_LOG_LEVEL"],
            || ConfigLoader::new().from_file(file.path()).unwrap(),
        );

        assert_eq!(config.target.base_url, "http://localhost:3000");
        assert_eq!(config.target.timeout, Duration::from_secs(30));
        assert!(config.scenarios.contains_key("smoke"));
    }

    #[test]
    fn test_env_overrides() {
        let config = temp_env::with_vars(
            [
                ("STAMPEDE_BASE_URL", Some("http://api.internal:8080")),
                ("STAMPEDE_HTTP_TIMEOUT", Some("5")),
                ("STAMPEDE_USER_AGENT", Some("bench/1")),
                ("STAMPEDE_VERIFY_SSL", Some("false")),
                ("STAMPEDE_LOG_LEVEL", Some("debug")),
                ("STAMPEDE_LOG_FORMAT", Some("json")),
            ],
            || ConfigLoader::new().from_yaml_str(MINIMAL).unwrap(),
        );

        assert_eq!(config.target.base_url, "http://api.internal:8080");
        assert_eq!(config.target.timeout, Duration::from_secs(5));
        assert_eq!(config.target.user_agent, "bench/1");
        assert!(!config.target.verify_ssl);
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_invalid_env_value() {
        let result = temp_env::with_var("STAMPEDE_HTTP_TIMEOUT", Some("soon"), || {
            ConfigLoader::new().from_yaml_str(MINIMAL)
        });
        match result {
            Err(ConfigError::Env { var, .. }) => assert_eq!(var, "STAMPEDE_HTTP_TIMEOUT"),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_overridden_url_is_validated() {
        let result = temp_env::with_var("STAMPEDE_BASE_URL", Some("not a url"), || {
            ConfigLoader::new().from_yaml_str(MINIMAL)
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_custom_prefix() {
        let config = temp_env::with_var("LOADTEST_BASE_URL", Some("http://other:9000"), || {
            ConfigLoader::with_prefix("LOADTEST")
                .from_yaml_str(MINIMAL)
                .unwrap()
        });
        assert_eq!(config.target.base_url, "http://other:9000");
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = temp_env::with_vars_unset(["STAMPEDE_BASE_URL"], || {
            ConfigLoader::new().load(None::<&str>).unwrap()
        });
        assert!(config.scenarios.is_empty());
        assert_eq!(config.target.base_url, "http://localhost:3000");
    }

    #[test]
    fn test_missing_file() {
        let result = ConfigLoader::new().from_file("/definitely/not/here.yaml");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
