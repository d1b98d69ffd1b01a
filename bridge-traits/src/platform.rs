//! Boxed async I/O aliases shared by the bridge contracts.
//!
//! Every reader and writer handed across a bridge boundary must be movable
//! between runtime worker threads, so the aliases carry `Send + Unpin`.

/// Dynamic async reader type.
pub type DynAsyncRead = dyn tokio::io::AsyncRead + Send + Unpin;

/// Dynamic async writer type.
pub type DynAsyncWrite = dyn tokio::io::AsyncWrite + Send + Unpin;
