//! Engine error types

use stampede_config::ConfigError;
use stampede_core::{MetricsError, ProfileError};
use std::time::Duration;
use thiserror::Error;

/// Fatal failures of the setup phase; scheduling never starts after one
#[derive(Debug, Error)]
pub enum SetupError {
    /// A setup create got a non-200/201 status or no response at all
    #[error("setup create #{index} failed: {detail}")]
    CreateFailed {
        index: usize,
        status: Option<u16>,
        detail: String,
    },

    /// A setup create succeeded but neither body nor `Location` held an id
    #[error("setup create #{index} returned no resource id")]
    MissingId { index: usize },

    #[error("setup created {created} of {requested} resources")]
    Incomplete { created: usize, requested: usize },

    #[error("setup did not finish within {0:?}")]
    Timeout(Duration),
}

impl SetupError {
    pub(crate) fn create_status(index: usize, status: u16) -> Self {
        SetupError::CreateFailed {
            index,
            status: Some(status),
            detail: format!("status {}", status),
        }
    }

    pub(crate) fn create_transport(index: usize, error: impl std::fmt::Display) -> Self {
        SetupError::CreateFailed {
            index,
            status: None,
            detail: error.to_string(),
        }
    }

    /// Zero-based index of the setup request that failed, if any
    pub fn index(&self) -> Option<usize> {
        match self {
            SetupError::CreateFailed { index, .. } | SetupError::MissingId { index } => {
                Some(*index)
            }
            _ => None,
        }
    }
}

/// Errors raised while configuring a run
#[derive(Debug, Error)]
pub enum RunError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Invalid load profile: {0}")]
    Profile(#[from] ProfileError),

    #[error("Metrics error: {0}")]
    Metrics(#[from] MetricsError),
}
