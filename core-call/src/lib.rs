//! # Remote Call Layer
//!
//! Represents every remote operation as a [`Call`]: a one-shot, cloneable,
//! cancelable unit of work that can be awaited or enqueued with a
//! [`Callback`].
//!
//! ## Building blocks
//!
//! - [`HttpCall`] - transport exchange plus [`ResponseAdapter`], with an
//!   atomic lifecycle and a cancellation token per instance
//! - [`ScheduledCall`] - moves `enqueue` callbacks onto a
//!   [`CallbackExecutor`](bridge_traits::CallbackExecutor)
//! - [`ApiAdapter`], [`DownloadAdapter`], [`StreamAdapter`] - turn responses
//!   into a [`ClassifiedOutcome`]
//! - [`ProgressCountingReader`] / [`ProgressCountingWriter`] - threshold-gated
//!   byte counting for uploads and downloads
//!
//! ## Example
//!
//! ```ignore
//! use core_call::{ApiAdapter, Call, CallContext};
//! use std::sync::Arc;
//!
//! let context = CallContext::new(transport, tokio::runtime::Handle::current());
//! let call = context.call(request, Arc::new(ApiAdapter::unit()));
//! call.execute().await?;
//! ```

pub mod adapter;
pub mod call;
pub mod error;
pub mod progress;
pub mod scheduled;

pub use adapter::{
    check_envelope, ApiAdapter, ClassifiedOutcome, DownloadAdapter, ResponseAdapter,
    StreamAdapter, DOWNLOAD_NOT_FOUND,
};
pub use call::{BoxCall, Call, CallContext, CallLifecycle, Callback, HttpCall};
pub use error::{CallError, Result, TransportError};
pub use progress::{
    ExecutorProgressListener, ProgressCountingReader, ProgressCountingWriter, ProgressDataSource,
    ProgressListener, ProgressState,
};
pub use scheduled::ScheduledCall;
