//! Data Sources and Sinks
//!
//! Upload payloads and download destinations are described by re-openable
//! handles rather than open streams: a request may be cloned or replayed
//! (authentication retry, `Call::clone`), and every send needs a fresh stream.

use async_trait::async_trait;
use bytes::Bytes;
use std::io::Cursor;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use crate::error::Result;
use crate::platform::{DynAsyncRead, DynAsyncWrite};

/// Origin of an upload payload.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::{BytesSource, DataSource};
///
/// let source = BytesSource::new("hello");
/// assert_eq!(source.content_length(), Some(5));
/// let reader = source.open().await?;
/// ```
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Exact payload size, when known up front
    fn content_length(&self) -> Option<u64>;

    /// Open a new reader positioned at the start of the payload
    async fn open(&self) -> Result<Box<DynAsyncRead>>;
}

/// Destination of a download.
#[async_trait]
pub trait DataSink: Send + Sync {
    /// Open a new writer; previously written content is discarded
    async fn open(&self) -> Result<Box<DynAsyncWrite>>;
}

/// In-memory upload payload
#[derive(Debug, Clone)]
pub struct BytesSource {
    data: Bytes,
}

impl BytesSource {
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }
}

#[async_trait]
impl DataSource for BytesSource {
    fn content_length(&self) -> Option<u64> {
        Some(self.data.len() as u64)
    }

    async fn open(&self) -> Result<Box<DynAsyncRead>> {
        Ok(Box::new(Cursor::new(self.data.clone())))
    }
}

/// In-memory download destination, readable after the transfer
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    data: Arc<Mutex<Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything written by the latest writer
    pub fn contents(&self) -> Vec<u8> {
        self.data.lock().map(|d| d.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl DataSink for MemorySink {
    async fn open(&self) -> Result<Box<DynAsyncWrite>> {
        if let Ok(mut data) = self.data.lock() {
            data.clear();
        }
        Ok(Box::new(MemoryWriter {
            data: self.data.clone(),
        }))
    }
}

struct MemoryWriter {
    data: Arc<Mutex<Vec<u8>>>,
}

impl tokio::io::AsyncWrite for MemoryWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<std::io::Result<usize>> {
        let mut data = self
            .data
            .lock()
            .map_err(|_| std::io::Error::other("memory sink poisoned"))?;
        data.extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}
