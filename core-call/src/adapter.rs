//! Response classification
//!
//! Every exchange ends in exactly one [`ClassifiedOutcome`]. The adapters here
//! are the only place that decides between a successful reply, an API error
//! carried in a successful reply, an undecodable reply and a transport fault.

use async_trait::async_trait;
use bridge_traits::http::{HttpResponse, ResponseBody};
use bridge_traits::platform::DynAsyncWrite;
use bridge_traits::storage::DataSink;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::Deserialize;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{CallError, Result, TransportError};
use crate::progress::{ProgressCountingWriter, ProgressListener};

/// Message reported for a 404 from a download host
pub const DOWNLOAD_NOT_FOUND: &str =
    "The requested file cannot be found or the file link has expired.";

/// Result of adapting one response
#[derive(Debug)]
pub enum ClassifiedOutcome<T> {
    Success(T),
    ApiFailure { code: u64, message: String },
    TransportFailure(TransportError),
    MalformedResponse(String),
}

impl<T> ClassifiedOutcome<T> {
    pub fn is_success(&self) -> bool {
        matches!(self, ClassifiedOutcome::Success(_))
    }

    pub fn into_result(self) -> Result<T> {
        match self {
            ClassifiedOutcome::Success(value) => Ok(value),
            ClassifiedOutcome::ApiFailure { code, message } => Err(CallError::Api { code, message }),
            ClassifiedOutcome::TransportFailure(err) => Err(CallError::Transport(err)),
            ClassifiedOutcome::MalformedResponse(msg) => Err(CallError::MalformedResponse(msg)),
        }
    }

    /// Unwrap a success, or re-type a failure for a different output
    pub fn into_success<U>(self) -> std::result::Result<T, ClassifiedOutcome<U>> {
        match self {
            ClassifiedOutcome::Success(value) => Ok(value),
            ClassifiedOutcome::ApiFailure { code, message } => {
                Err(ClassifiedOutcome::ApiFailure { code, message })
            }
            ClassifiedOutcome::TransportFailure(err) => Err(ClassifiedOutcome::TransportFailure(err)),
            ClassifiedOutcome::MalformedResponse(msg) => Err(ClassifiedOutcome::MalformedResponse(msg)),
        }
    }

    fn http_status(code: u16, reason: &str) -> Self {
        let message = if reason.is_empty() {
            "HTTP error".to_string()
        } else {
            reason.to_string()
        };
        ClassifiedOutcome::TransportFailure(TransportError::HttpStatus { code, message })
    }

    fn io(err: std::io::Error) -> Self {
        ClassifiedOutcome::TransportFailure(TransportError::Bridge(err.into()))
    }
}

/// Turns a raw response into a typed outcome.
#[async_trait]
pub trait ResponseAdapter<T: Send>: Send + Sync {
    async fn adapt(&self, response: HttpResponse) -> ClassifiedOutcome<T>;
}

/// `{"result": <code>, "error": "<message>"}` header shared by every API reply
#[derive(Debug, Deserialize)]
struct Envelope {
    result: u64,
    #[serde(default)]
    error: Option<String>,
}

/// Classify the envelope of a fully read reply.
///
/// Returns `None` when the reply is a 2xx with `result == 0`, meaning the
/// payload itself may be decoded.
pub fn check_envelope<T>(status: u16, reason: &str, body: &[u8]) -> Option<ClassifiedOutcome<T>> {
    let envelope = serde_json::from_slice::<Envelope>(body);

    if !(200..300).contains(&status) {
        return Some(match envelope {
            Ok(Envelope { result, error }) if result != 0 => ClassifiedOutcome::ApiFailure {
                code: result,
                message: error.unwrap_or_default(),
            },
            _ => ClassifiedOutcome::http_status(status, reason),
        });
    }

    match envelope {
        Err(e) => Some(ClassifiedOutcome::MalformedResponse(format!(
            "invalid response envelope: {}",
            e
        ))),
        Ok(Envelope { result, error }) if result != 0 => Some(ClassifiedOutcome::ApiFailure {
            code: result,
            message: error.unwrap_or_default(),
        }),
        Ok(_) => None,
    }
}

type MapFn<B, T> = dyn Fn(B) -> std::result::Result<T, String> + Send + Sync;

/// Adapter for JSON API replies.
///
/// The body is decoded as `B` once the envelope reports success, then mapped
/// to `T`. A mapping error is reported as a malformed response.
pub struct ApiAdapter<B, T> {
    map: Arc<MapFn<B, T>>,
    _body: PhantomData<fn() -> B>,
}

impl<B, T> ApiAdapter<B, T>
where
    B: DeserializeOwned + Send + 'static,
    T: Send + 'static,
{
    pub fn new<F>(map: F) -> Self
    where
        F: Fn(B) -> std::result::Result<T, String> + Send + Sync + 'static,
    {
        Self {
            map: Arc::new(map),
            _body: PhantomData,
        }
    }
}

impl<T> ApiAdapter<T, T>
where
    T: DeserializeOwned + Send + 'static,
{
    /// Decode the body straight into `T`
    pub fn direct() -> Self {
        Self::new(Ok)
    }
}

impl ApiAdapter<IgnoredAny, ()> {
    /// Success carries no payload
    pub fn unit() -> Self {
        Self::new(|_| Ok(()))
    }
}

impl<B, T> Clone for ApiAdapter<B, T> {
    fn clone(&self) -> Self {
        Self {
            map: self.map.clone(),
            _body: PhantomData,
        }
    }
}

impl<B, T> fmt::Debug for ApiAdapter<B, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiAdapter")
            .field("body", &std::any::type_name::<B>())
            .field("output", &std::any::type_name::<T>())
            .finish()
    }
}

#[async_trait]
impl<B, T> ResponseAdapter<T> for ApiAdapter<B, T>
where
    B: DeserializeOwned + Send + 'static,
    T: Send + 'static,
{
    async fn adapt(&self, response: HttpResponse) -> ClassifiedOutcome<T> {
        let HttpResponse {
            status,
            reason,
            body,
            ..
        } = response;

        let bytes = match body.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => return ClassifiedOutcome::io(e),
        };

        if let Some(failure) = check_envelope(status, &reason, &bytes) {
            return failure;
        }

        let decoded: B = match serde_json::from_slice(&bytes) {
            Ok(decoded) => decoded,
            Err(e) => {
                return ClassifiedOutcome::MalformedResponse(format!(
                    "failed to decode {}: {}",
                    std::any::type_name::<B>(),
                    e
                ))
            }
        };

        match (self.map)(decoded) {
            Ok(value) => ClassifiedOutcome::Success(value),
            Err(msg) => ClassifiedOutcome::MalformedResponse(msg),
        }
    }
}

fn download_failure<T>(response: &HttpResponse) -> Option<ClassifiedOutcome<T>> {
    match response.status {
        200..=299 => None,
        404 => Some(ClassifiedOutcome::TransportFailure(TransportError::HttpStatus {
            code: 404,
            message: DOWNLOAD_NOT_FOUND.to_string(),
        })),
        status => Some(ClassifiedOutcome::http_status(status, &response.reason)),
    }
}

/// Streams a download body into a [`DataSink`].
///
/// The sink is only opened once the reply is known to be a success, so a
/// failed download leaves the destination untouched.
pub struct DownloadAdapter {
    sink: Arc<dyn DataSink>,
    listener: Option<Arc<dyn ProgressListener>>,
    threshold: u64,
}

impl DownloadAdapter {
    pub fn new(sink: Arc<dyn DataSink>) -> Self {
        Self {
            sink,
            listener: None,
            threshold: 1,
        }
    }

    pub fn with_progress(mut self, listener: Arc<dyn ProgressListener>, threshold: u64) -> Self {
        self.listener = Some(listener);
        self.threshold = threshold;
        self
    }
}

#[async_trait]
impl ResponseAdapter<()> for DownloadAdapter {
    async fn adapt(&self, response: HttpResponse) -> ClassifiedOutcome<()> {
        if let Some(failure) = download_failure(&response) {
            return failure;
        }

        let total = response.body.content_length();
        let writer = match self.sink.open().await {
            Ok(writer) => writer,
            Err(e) => return ClassifiedOutcome::TransportFailure(e.into()),
        };
        let mut writer: Box<DynAsyncWrite> = match &self.listener {
            Some(listener) => Box::new(ProgressCountingWriter::new(
                writer,
                total,
                self.threshold,
                listener.clone(),
            )),
            None => writer,
        };

        let mut reader = response.body.into_async_read();
        let copied = match tokio::io::copy(&mut reader, &mut writer).await {
            Ok(copied) => copied,
            Err(e) => return ClassifiedOutcome::io(e),
        };
        if let Err(e) = writer.shutdown().await {
            return ClassifiedOutcome::io(e);
        }

        debug!(bytes = copied, "Download written to sink");
        ClassifiedOutcome::Success(())
    }
}

/// Hands the still-streaming body of a successful download to the caller
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamAdapter;

#[async_trait]
impl ResponseAdapter<ResponseBody> for StreamAdapter {
    async fn adapt(&self, response: HttpResponse) -> ClassifiedOutcome<ResponseBody> {
        if let Some(failure) = download_failure(&response) {
            return failure;
        }
        ClassifiedOutcome::Success(response.body)
    }
}
