//! Byte-counting stream decorators
//!
//! [`ProgressCountingReader`] and [`ProgressCountingWriter`] wrap an upload
//! source or a download sink, count the bytes that pass through and notify a
//! [`ProgressListener`] once at least `threshold` bytes moved since the
//! previous notification. Listeners run synchronously on the I/O task;
//! [`ExecutorProgressListener`] moves them onto a callback executor.

use async_trait::async_trait;
use bridge_traits::background::CallbackExecutor;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::platform::DynAsyncRead;
use bridge_traits::storage::DataSource;
use std::fmt;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Receives `(bytes_transferred, total_bytes)` notifications.
///
/// `total_bytes` is `None` when the size is not known up front.
pub trait ProgressListener: Send + Sync {
    fn on_progress(&self, transferred: u64, total: Option<u64>);
}

impl<F> ProgressListener for F
where
    F: Fn(u64, Option<u64>) + Send + Sync,
{
    fn on_progress(&self, transferred: u64, total: Option<u64>) {
        self(transferred, total)
    }
}

/// Threshold-gated byte counter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressState {
    transferred: u64,
    total: Option<u64>,
    last_notified: u64,
    threshold: u64,
}

impl ProgressState {
    /// A zero threshold is treated as one byte.
    pub fn new(total: Option<u64>, threshold: u64) -> Self {
        Self {
            transferred: 0,
            total,
            last_notified: 0,
            threshold: threshold.max(1),
        }
    }

    /// Count `n` more bytes; returns the running total when a notification is
    /// due, moving the baseline to it.
    pub fn advance(&mut self, n: u64) -> Option<u64> {
        self.transferred = self.transferred.saturating_add(n);
        if self.transferred - self.last_notified >= self.threshold {
            self.last_notified = self.transferred;
            Some(self.transferred)
        } else {
            None
        }
    }

    pub fn transferred(&self) -> u64 {
        self.transferred
    }

    pub fn total(&self) -> Option<u64> {
        self.total
    }
}

/// Counting decorator over an [`AsyncRead`]
pub struct ProgressCountingReader<R> {
    inner: R,
    state: ProgressState,
    listener: Arc<dyn ProgressListener>,
}

impl<R> ProgressCountingReader<R> {
    pub fn new(inner: R, total: Option<u64>, threshold: u64, listener: Arc<dyn ProgressListener>) -> Self {
        Self {
            inner,
            state: ProgressState::new(total, threshold),
            listener,
        }
    }

    pub fn state(&self) -> &ProgressState {
        &self.state
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for ProgressCountingReader<R> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let before = buf.filled().len();
        let this = &mut *self;
        match Pin::new(&mut this.inner).poll_read(cx, buf) {
            Poll::Ready(Ok(())) => {
                let n = (buf.filled().len() - before) as u64;
                if let Some(done) = this.state.advance(n) {
                    this.listener.on_progress(done, this.state.total());
                }
                Poll::Ready(Ok(()))
            }
            other => other,
        }
    }
}

/// Counting decorator over an [`AsyncWrite`]
pub struct ProgressCountingWriter<W> {
    inner: W,
    state: ProgressState,
    listener: Arc<dyn ProgressListener>,
}

impl<W> ProgressCountingWriter<W> {
    pub fn new(inner: W, total: Option<u64>, threshold: u64, listener: Arc<dyn ProgressListener>) -> Self {
        Self {
            inner,
            state: ProgressState::new(total, threshold),
            listener,
        }
    }

    pub fn state(&self) -> &ProgressState {
        &self.state
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

impl<W: AsyncWrite + Unpin> AsyncWrite for ProgressCountingWriter<W> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = &mut *self;
        match Pin::new(&mut this.inner).poll_write(cx, buf) {
            Poll::Ready(Ok(n)) => {
                if let Some(done) = this.state.advance(n as u64) {
                    this.listener.on_progress(done, this.state.total());
                }
                Poll::Ready(Ok(n))
            }
            other => other,
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

/// Delivers progress notifications through a [`CallbackExecutor`]
pub struct ExecutorProgressListener {
    listener: Arc<dyn ProgressListener>,
    executor: Arc<dyn CallbackExecutor>,
}

impl ExecutorProgressListener {
    pub fn new(listener: Arc<dyn ProgressListener>, executor: Arc<dyn CallbackExecutor>) -> Self {
        Self { listener, executor }
    }
}

impl ProgressListener for ExecutorProgressListener {
    fn on_progress(&self, transferred: u64, total: Option<u64>) {
        let listener = self.listener.clone();
        self.executor
            .execute(Box::new(move || listener.on_progress(transferred, total)));
    }
}

/// Upload source whose readers report progress.
///
/// Each [`open`](DataSource::open) starts counting from zero, so a replayed
/// upload reports its progress again from the start.
pub struct ProgressDataSource {
    inner: Arc<dyn DataSource>,
    listener: Arc<dyn ProgressListener>,
    threshold: u64,
}

impl ProgressDataSource {
    pub fn new(inner: Arc<dyn DataSource>, listener: Arc<dyn ProgressListener>, threshold: u64) -> Self {
        Self {
            inner,
            listener,
            threshold,
        }
    }
}

impl fmt::Debug for ProgressDataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressDataSource")
            .field("content_length", &self.inner.content_length())
            .field("threshold", &self.threshold)
            .finish()
    }
}

#[async_trait]
impl DataSource for ProgressDataSource {
    fn content_length(&self) -> Option<u64> {
        self.inner.content_length()
    }

    async fn open(&self) -> BridgeResult<Box<DynAsyncRead>> {
        let reader = self.inner.open().await?;
        Ok(Box::new(ProgressCountingReader::new(
            reader,
            self.inner.content_length(),
            self.threshold,
            self.listener.clone(),
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::background::{ImmediateExecutor, Job};
    use bridge_traits::storage::BytesSource;
    use std::sync::Mutex;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<(u64, Option<u64>)>>,
    }

    impl ProgressListener for Recorder {
        fn on_progress(&self, transferred: u64, total: Option<u64>) {
            self.events.lock().unwrap().push((transferred, total));
        }
    }

    /// Yields the payload in fixed-size chunks
    struct Chunked {
        data: Vec<u8>,
        pos: usize,
        chunk: usize,
    }

    impl AsyncRead for Chunked {
        fn poll_read(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            let end = (self.pos + self.chunk).min(self.data.len()).min(self.pos + buf.remaining());
            let start = self.pos;
            buf.put_slice(&self.data[start..end]);
            self.pos = end;
            Poll::Ready(Ok(()))
        }
    }

    #[test]
    fn test_state_notifies_on_threshold() {
        let mut state = ProgressState::new(Some(250), 100);
        assert_eq!(state.advance(60), None);
        assert_eq!(state.advance(40), Some(100));
        assert_eq!(state.advance(0), None);
        assert_eq!(state.advance(150), Some(250));
        assert_eq!(state.transferred(), 250);
    }

    #[test]
    fn test_zero_threshold_counts_every_byte() {
        let mut state = ProgressState::new(None, 0);
        assert_eq!(state.advance(1), Some(1));
    }

    #[tokio::test]
    async fn test_writer_hundred_byte_writes() {
        let recorder = Arc::new(Recorder::default());
        let mut writer =
            ProgressCountingWriter::new(Vec::new(), Some(1000), 100, recorder.clone());

        for _ in 0..10 {
            writer.write_all(&[7u8; 100]).await.unwrap();
        }

        let events = recorder.events.lock().unwrap().clone();
        let expected: Vec<_> = (1..=10).map(|i| (i * 100, Some(1000))).collect();
        assert_eq!(events, expected);
        assert_eq!(writer.into_inner().len(), 1000);
    }

    #[tokio::test]
    async fn test_reader_small_chunks_notify_at_threshold_multiples() {
        let recorder = Arc::new(Recorder::default());
        let source = Chunked {
            data: vec![1u8; 1000],
            pos: 0,
            chunk: 10,
        };
        let mut reader = ProgressCountingReader::new(source, None, 100, recorder.clone());

        let mut buf = [0u8; 64];
        let mut total = 0;
        loop {
            let n = reader.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            assert_eq!(n, 10);
            total += n;
        }

        let events = recorder.events.lock().unwrap().clone();
        let expected: Vec<_> = (1..=10).map(|i| (i * 100, None)).collect();
        assert_eq!(total, 1000);
        assert_eq!(events, expected);
    }

    #[tokio::test]
    async fn test_reader_eof_does_not_notify_below_threshold() {
        let recorder = Arc::new(Recorder::default());
        let mut reader =
            ProgressCountingReader::new(&b"abc"[..], Some(3), 100, recorder.clone());

        let mut out = Vec::new();
        reader.read_to_end(&mut out).await.unwrap();

        assert!(recorder.events.lock().unwrap().is_empty());
        assert_eq!(reader.state().transferred(), 3);
    }

    #[test]
    fn test_executor_listener_routes_through_executor() {
        let recorder = Arc::new(Recorder::default());
        let submitted = Arc::new(Mutex::new(0));
        let s = submitted.clone();
        let executor = move |job: Job| {
            *s.lock().unwrap() += 1;
            ImmediateExecutor.execute(job);
        };

        let listener = ExecutorProgressListener::new(recorder.clone(), Arc::new(executor));
        listener.on_progress(10, Some(20));

        assert_eq!(*submitted.lock().unwrap(), 1);
        assert_eq!(*recorder.events.lock().unwrap(), vec![(10, Some(20))]);
    }

    #[tokio::test]
    async fn test_progress_source_restarts_count_on_reopen() {
        let recorder = Arc::new(Recorder::default());
        let source = ProgressDataSource::new(
            Arc::new(BytesSource::new(vec![0u8; 300])),
            recorder.clone(),
            300,
        );
        assert_eq!(source.content_length(), Some(300));

        for _ in 0..2 {
            let mut reader = source.open().await.unwrap();
            let mut out = Vec::new();
            reader.read_to_end(&mut out).await.unwrap();
        }

        assert_eq!(
            *recorder.events.lock().unwrap(),
            vec![(300, Some(300)), (300, Some(300))]
        );
    }
}
