//! Tracing initialisation for Stampede
//!
//! Every crate logs through `tracing`; this crate installs the global
//! subscriber once, driven by the `logging` section of the configuration.

pub mod init;

pub use init::{env_filter_for, init_logging_from_config, init_simple_tracing};
