//! Validation shared by every configuration domain

use crate::error::{ConfigError, ConfigResult};
use std::fmt::Display;

/// A configuration section that can check itself
///
/// Errors carry [`domain_name`](Validatable::domain_name) so a message
/// points at the offending section.
pub trait Validatable {
    fn validate(&self) -> ConfigResult<()>;

    fn domain_name(&self) -> &'static str;

    fn validation_error(&self, message: impl Into<String>) -> ConfigError {
        ConfigError::Domain {
            domain: self.domain_name().to_string(),
            message: message.into(),
        }
    }

    fn require(&self, condition: bool, message: impl FnOnce() -> String) -> ConfigResult<()> {
        if condition {
            Ok(())
        } else {
            Err(self.validation_error(message()))
        }
    }

    fn require_positive<T>(&self, value: T, field: &str) -> ConfigResult<()>
    where
        T: PartialOrd + Default + Display,
    {
        self.require(value > T::default(), || {
            format!("{} must be greater than 0, got {}", field, value)
        })
    }

    fn require_non_empty(&self, value: &str, field: &str) -> ConfigResult<()> {
        self.require(!value.trim().is_empty(), || format!("{} cannot be empty", field))
    }

    /// Absolute http(s) URL usable as a base for `/users`
    fn require_http_url(&self, value: &str, field: &str) -> ConfigResult<()> {
        self.require_non_empty(value, field)?;
        let parsed = url::Url::parse(value)
            .map_err(|e| self.validation_error(format!("{} is not a valid URL: {}", field, e)))?;
        self.require(matches!(parsed.scheme(), "http" | "https"), || {
            format!("{} scheme '{}' not supported (only http/https)", field, parsed.scheme())
        })
    }
}
