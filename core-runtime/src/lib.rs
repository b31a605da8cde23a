//! # Core Runtime Module
//!
//! Provides process-wide runtime infrastructure for the sound core:
//! - Logging and tracing infrastructure
//! - Runtime error types
//!
//! ## Overview
//!
//! This crate establishes the logging conventions used throughout the
//! workspace, including how verbose the external codec library is allowed to
//! be. Decoder crates install it from their thread initialization hook.

pub mod error;
pub mod logging;

pub use error::{Error, Result};
pub use logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
