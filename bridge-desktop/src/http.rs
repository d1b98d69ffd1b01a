//! HTTP Client Implementation using Reqwest

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RequestBody, ResponseBody},
    storage::DataSource,
};
use futures_util::{StreamExt, TryStreamExt};
use reqwest::multipart::{Form, Part};
use reqwest::{Body, Client};
use std::collections::HashMap;
use std::time::Duration;
use tokio_util::io::ReaderStream;
use tracing::{debug, warn};

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_USER_AGENT: &str = concat!("cloud-sdk/", env!("CARGO_PKG_VERSION"));

/// Reqwest-based HTTP client implementation
///
/// Provides HTTP operations with:
/// - Connection pooling via reqwest
/// - Streaming request and response bodies
/// - TLS support by default
///
/// Dropping the future returned by [`HttpClient::execute`] aborts the
/// exchange, including any body still being streamed.
#[derive(Clone)]
pub struct ReqwestHttpClient {
    client: Client,
}

impl ReqwestHttpClient {
    /// Create a new HTTP client with default timeouts
    pub fn new() -> Result<Self> {
        Self::with_timeouts(DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT)
    }

    /// Create a new HTTP client with custom connect and read timeouts
    pub fn with_timeouts(connect: Duration, read: Duration) -> Result<Self> {
        Self::with_settings(connect, read, DEFAULT_USER_AGENT)
    }

    /// Create a new HTTP client with custom timeouts and user agent
    pub fn with_settings(connect: Duration, read: Duration, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(connect)
            .read_timeout(read)
            .pool_max_idle_per_host(10)
            .user_agent(user_agent)
            .build()
            .map_err(|e| {
                BridgeError::NotAvailable(format!("failed to build HTTP client: {}", e))
            })?;

        Ok(Self { client })
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Convert bridge HttpMethod to reqwest Method
    fn convert_method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Head => reqwest::Method::HEAD,
        }
    }

    /// Build reqwest request from bridge request
    async fn build_request(&self, request: HttpRequest) -> Result<reqwest::RequestBuilder> {
        let method = Self::convert_method(request.method);
        let mut req = self.client.request(method, &request.url);

        for (key, value) in request.headers {
            req = req.header(key, value);
        }

        req = match request.body {
            RequestBody::Empty => req,
            RequestBody::Bytes(bytes) => req.body(bytes),
            RequestBody::Form(pairs) => req.form(&pairs),
            RequestBody::Multipart(file) => {
                let part = Self::stream_part(file.source.as_ref()).await?;
                let part = part
                    .file_name(file.file_name)
                    .mime_str(&file.mime_type)
                    .map_err(|e| {
                        BridgeError::OperationFailed(format!("invalid content type: {}", e))
                    })?;
                req.multipart(Form::new().part(file.field_name, part))
            }
        };

        if let Some(timeout) = request.timeout {
            req = req.timeout(timeout);
        }

        Ok(req)
    }

    /// Open the source and wrap it as a streamed multipart part
    async fn stream_part(source: &dyn DataSource) -> Result<Part> {
        let reader = source.open().await?;
        let body = Body::wrap_stream(ReaderStream::new(reader));
        Ok(match source.content_length() {
            Some(len) => Part::stream_with_length(body, len),
            None => Part::stream(body),
        })
    }

    fn map_error(e: reqwest::Error) -> BridgeError {
        if e.is_timeout() {
            BridgeError::Timeout(e.to_string())
        } else if e.is_connect() {
            BridgeError::Connection(e.to_string())
        } else {
            BridgeError::OperationFailed(e.to_string())
        }
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        debug!(method = ?request.method, url = %request.url, "Executing HTTP request");

        let req_builder = self.build_request(request).await?;
        let response = req_builder.send().await.map_err(|e| {
            warn!(error = %e, "HTTP request failed");
            Self::map_error(e)
        })?;

        let status = response.status();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect();
        let content_length = response.content_length();

        let stream = response
            .bytes_stream()
            .map_err(std::io::Error::other)
            .boxed();

        Ok(HttpResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body: ResponseBody::from_stream(stream, content_length),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::http::MultipartFile;
    use bridge_traits::storage::BytesSource;
    use std::sync::Arc;

    #[test]
    fn test_http_client_creation() {
        assert!(ReqwestHttpClient::new().is_ok());
        assert!(ReqwestHttpClient::with_timeouts(
            Duration::from_secs(1),
            Duration::from_secs(2)
        )
        .is_ok());
    }

    #[test]
    fn test_method_conversion() {
        assert_eq!(
            ReqwestHttpClient::convert_method(HttpMethod::Get),
            reqwest::Method::GET
        );
        assert_eq!(
            ReqwestHttpClient::convert_method(HttpMethod::Post),
            reqwest::Method::POST
        );
    }

    #[tokio::test]
    async fn test_build_form_request() {
        let client = ReqwestHttpClient::new().unwrap();
        let request = HttpRequest::post("https://api.example.com/createfolder")
            .form([("folderid", "0"), ("name", "docs")])
            .timeout(Duration::from_secs(5));

        let built = client.build_request(request).await.unwrap().build().unwrap();
        assert_eq!(built.method(), reqwest::Method::POST);
        assert_eq!(
            built.headers().get("content-type").unwrap(),
            "application/x-www-form-urlencoded"
        );
        assert_eq!(built.timeout(), Some(&Duration::from_secs(5)));
    }

    #[tokio::test]
    async fn test_build_multipart_request() {
        let client = ReqwestHttpClient::new().unwrap();
        let request = HttpRequest::post("https://api.example.com/uploadfile").multipart(
            MultipartFile {
                field_name: "file".to_string(),
                file_name: "a.txt".to_string(),
                mime_type: "text/plain".to_string(),
                source: Arc::new(BytesSource::new("hello")),
            },
        );

        let built = client.build_request(request).await.unwrap().build().unwrap();
        let content_type = built
            .headers()
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap();
        assert!(content_type.starts_with("multipart/form-data; boundary="));
    }

    #[tokio::test]
    async fn test_invalid_mime_type_is_rejected() {
        let client = ReqwestHttpClient::new().unwrap();
        let request = HttpRequest::post("https://api.example.com/uploadfile").multipart(
            MultipartFile {
                field_name: "file".to_string(),
                file_name: "a.txt".to_string(),
                mime_type: "not a mime".to_string(),
                source: Arc::new(BytesSource::new("hello")),
            },
        );

        assert!(matches!(
            client.build_request(request).await,
            Err(BridgeError::OperationFailed(_))
        ));
    }
}
