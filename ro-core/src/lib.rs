//! ReachOut Core - Foundation types, error handling, configuration, and logging.
//!
//! This crate provides the shared foundation used by all other ReachOut crates:
//! - Application configuration (storage location, logging, notification defaults)
//! - Global error types covering all error categories
//! - Structured logging with tracing
//! - Platform detection utilities
//! - Storage keys and limits shared by the stores

pub mod config;
pub mod error;
pub mod logging;
pub mod platform;
pub mod constants;

// Re-export commonly used items at the crate root
pub use config::{AppConfig, ConfigHandle};
pub use error::{FieldError, RoError, RoResult};
pub use logging::init_logging;
pub use platform::Platform;
