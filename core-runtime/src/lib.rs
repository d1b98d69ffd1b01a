//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the storage client:
//! - Logging and tracing infrastructure
//! - Client configuration with fail-fast validation
//! - The runtime error type shared by builders
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that other modules depend on.
//! It establishes the configuration defaults and logging conventions used
//! throughout the workspace.

pub mod config;
pub mod error;
pub mod logging;

pub use config::{ClientConfig, ClientConfigBuilder};
pub use error::{Error, Result};
