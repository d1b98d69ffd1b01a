//! HTTP Client Abstraction
//!
//! Provides the transport contract used by the call layer: cloneable request
//! templates, streaming response bodies that can be peeked without being
//! consumed, and an async client trait whose futures abort the exchange when
//! dropped.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream, StreamExt};
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::io::StreamReader;

use crate::error::{BridgeError, Result};
use crate::storage::DataSource;

/// Boxed stream of body chunks.
pub type ByteStream = BoxStream<'static, std::io::Result<Bytes>>;

/// HTTP method types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
}

/// A file part streamed as `multipart/form-data`.
///
/// The source is re-opened for every send, so a request carrying this part
/// can be cloned and replayed without buffering the file.
#[derive(Clone)]
pub struct MultipartFile {
    pub field_name: String,
    pub file_name: String,
    pub mime_type: String,
    pub source: Arc<dyn DataSource>,
}

impl fmt::Debug for MultipartFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MultipartFile")
            .field("field_name", &self.field_name)
            .field("file_name", &self.file_name)
            .field("mime_type", &self.mime_type)
            .field("content_length", &self.source.content_length())
            .finish()
    }
}

/// Request payload
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Bytes(Bytes),
    /// `application/x-www-form-urlencoded` pairs, in order
    Form(Vec<(String, String)>),
    Multipart(MultipartFile),
}

/// HTTP request builder
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HashMap<String, String>,
    pub body: RequestBody,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HashMap::new(),
            body: RequestBody::Empty,
            timeout: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn bearer_token(self, token: impl Into<String>) -> Self {
        self.header("Authorization", format!("Bearer {}", token.into()))
    }

    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        let json = serde_json::to_vec(body).map_err(|e| {
            BridgeError::OperationFailed(format!("JSON serialization failed: {}", e))
        })?;
        self.body = RequestBody::Bytes(Bytes::from(json));
        self.headers
            .insert("Content-Type".to_string(), "application/json".to_string());
        Ok(self)
    }

    pub fn body(mut self, body: Bytes) -> Self {
        self.body = RequestBody::Bytes(body);
        self
    }

    pub fn form<K, V>(mut self, pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.body = RequestBody::Form(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    pub fn multipart(mut self, file: MultipartFile) -> Self {
        self.body = RequestBody::Multipart(file);
        self
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Value of the `Authorization` header, if one is attached
    pub fn authorization(&self) -> Option<&str> {
        self.headers.get("Authorization").map(String::as_str)
    }
}

/// Streaming response body.
///
/// Bytes pulled by [`peek`](Self::peek) stay buffered and are replayed ahead
/// of the remaining stream, so inspecting a prefix never consumes the body.
pub struct ResponseBody {
    buffered: BytesMut,
    stream: Option<ByteStream>,
    content_length: Option<u64>,
}

impl ResponseBody {
    pub fn empty() -> Self {
        Self {
            buffered: BytesMut::new(),
            stream: None,
            content_length: Some(0),
        }
    }

    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        let bytes = bytes.into();
        Self {
            content_length: Some(bytes.len() as u64),
            buffered: BytesMut::from(&bytes[..]),
            stream: None,
        }
    }

    pub fn from_stream(stream: ByteStream, content_length: Option<u64>) -> Self {
        Self {
            buffered: BytesMut::new(),
            stream: Some(stream),
            content_length,
        }
    }

    /// Length announced by the server, if any
    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }

    /// Read ahead until `limit` bytes are buffered or the stream ends, and
    /// return the buffered prefix (at most `limit` bytes).
    pub async fn peek(&mut self, limit: usize) -> std::io::Result<&[u8]> {
        while self.buffered.len() < limit {
            let Some(stream) = self.stream.as_mut() else {
                break;
            };
            match stream.next().await {
                Some(chunk) => self.buffered.extend_from_slice(&chunk?),
                None => self.stream = None,
            }
        }
        let end = self.buffered.len().min(limit);
        Ok(&self.buffered[..end])
    }

    /// Next chunk of the body, `None` at the end
    pub async fn next_chunk(&mut self) -> std::io::Result<Option<Bytes>> {
        if !self.buffered.is_empty() {
            return Ok(Some(self.buffered.split().freeze()));
        }
        match self.stream.as_mut() {
            Some(stream) => match stream.next().await {
                Some(chunk) => chunk.map(Some),
                None => {
                    self.stream = None;
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    /// Collect the whole body into memory
    pub async fn bytes(mut self) -> std::io::Result<Bytes> {
        let mut out = BytesMut::new();
        while let Some(chunk) = self.next_chunk().await? {
            out.extend_from_slice(&chunk);
        }
        Ok(out.freeze())
    }

    pub fn into_stream(self) -> ByteStream {
        let head: Option<std::io::Result<Bytes>> =
            (!self.buffered.is_empty()).then(|| Ok(self.buffered.freeze()));
        let head = stream::iter(head);
        match self.stream {
            Some(rest) => head.chain(rest).boxed(),
            None => head.boxed(),
        }
    }

    pub fn into_async_read(self) -> StreamReader<ByteStream, Bytes> {
        StreamReader::new(self.into_stream())
    }
}

impl Default for ResponseBody {
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseBody")
            .field("buffered", &self.buffered.len())
            .field("streaming", &self.stream.is_some())
            .field("content_length", &self.content_length)
            .finish()
    }
}

/// HTTP response
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub reason: String,
    pub headers: HashMap<String, String>,
    pub body: ResponseBody,
}

impl HttpResponse {
    pub fn new(status: u16, body: ResponseBody) -> Self {
        Self {
            status,
            reason: String::new(),
            headers: HashMap::new(),
            body,
        }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }

    /// Parse the whole response body as JSON
    pub async fn json<T: DeserializeOwned>(self) -> Result<T> {
        let body = self.body.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| {
            BridgeError::OperationFailed(format!("JSON deserialization failed: {}", e))
        })
    }

    /// Get response body as UTF-8 string
    pub async fn text(self) -> Result<String> {
        let body = self.body.bytes().await?;
        String::from_utf8(body.to_vec())
            .map_err(|e| BridgeError::OperationFailed(format!("Invalid UTF-8: {}", e)))
    }

    /// Check if response status is successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Check if response status indicates a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    /// Check if response status indicates a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }
}

/// Async HTTP client trait
///
/// This trait abstracts the transport so that the call layer, interceptors
/// and tests can be composed freely. Implementations must:
/// - stream response bodies instead of buffering them
/// - abort the exchange when the returned future is dropped
/// - surface timeouts and connection faults as [`BridgeError`]
///
/// Interceptors are themselves `HttpClient`s wrapping an inner client.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::http::{HttpClient, HttpRequest};
///
/// async fn fetch_data(client: &dyn HttpClient) -> Result<String> {
///     let request = HttpRequest::get("https://api.example.com/userinfo")
///         .bearer_token("token");
///
///     let response = client.execute(request).await?;
///     response.text().await
/// }
/// ```
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Execute an HTTP request
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Network connection fails
    /// - TLS validation fails
    /// - Request times out
    /// - The request body source cannot be opened
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}
