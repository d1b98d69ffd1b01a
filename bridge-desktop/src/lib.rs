//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! This crate provides production-ready implementations of the bridge traits
//! using desktop-appropriate libraries:
//! - `HttpClient` using `reqwest` with streamed request and response bodies
//! - `DataSource` / `DataSink` over local files using `tokio::fs`
//! - `CallbackExecutor` backed by a dedicated named thread
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{FileDataSource, ReqwestHttpClient, ThreadCallbackExecutor};
//!
//! #[tokio::main]
//! async fn main() -> bridge_traits::error::Result<()> {
//!     let http_client = ReqwestHttpClient::new()?;
//!     let callbacks = ThreadCallbackExecutor::new()?;
//!     let upload = FileDataSource::new("report.pdf").await?;
//!
//!     // Hand these to the storage client builder
//!     Ok(())
//! }
//! ```

mod background;
mod filesystem;
mod http;

pub use background::ThreadCallbackExecutor;
pub use filesystem::{FileDataSink, FileDataSource};
pub use http::ReqwestHttpClient;
