//! # Host Bridge Traits
//!
//! Platform abstraction traits consumed by the call layer and the storage
//! client.
//!
//! ## Overview
//!
//! This crate defines the contract between the core crates and
//! platform-specific implementations. Each trait represents a capability the
//! core requires but that can be implemented differently per host (desktop
//! reqwest transport, test doubles, embedded HTTP stacks).
//!
//! ## Traits
//!
//! ### Networking
//! - [`HttpClient`](http::HttpClient) - Async HTTP exchange with streaming bodies
//!
//! ### Data transfer
//! - [`DataSource`](storage::DataSource) - Re-openable upload payload
//! - [`DataSink`](storage::DataSink) - Re-openable download destination
//!
//! ### Scheduling
//! - [`CallbackExecutor`](background::CallbackExecutor) - Where user callbacks run
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Platform
//! implementations should:
//!
//! - Convert platform-specific errors to `BridgeError`
//! - Distinguish timeouts and connection faults from other failures
//! - Include error context (e.g., URLs, file paths)
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` bounds so implementations can be
//! shared across runtime worker threads.
//!
//! ## Examples
//!
//! ### Implementing HttpClient
//!
//! ```ignore
//! use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
//! use bridge_traits::error::Result;
//! use async_trait::async_trait;
//!
//! pub struct MyHttpClient {
//!     client: reqwest::Client,
//! }
//!
//! #[async_trait]
//! impl HttpClient for MyHttpClient {
//!     async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
//!         // Implementation
//!         todo!()
//!     }
//! }
//! ```

pub mod background;
pub mod error;
pub mod http;
pub mod platform;
pub mod storage;

pub use error::BridgeError;

// Re-export commonly used types
pub use background::{CallbackExecutor, ImmediateExecutor, Job};
pub use http::{
    ByteStream, HttpClient, HttpMethod, HttpRequest, HttpResponse, MultipartFile, RequestBody,
    ResponseBody,
};
pub use platform::{DynAsyncRead, DynAsyncWrite};
pub use storage::{BytesSource, DataSink, DataSource, MemorySink};
