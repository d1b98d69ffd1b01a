//! pCloud API client
//!
//! [`PCloudClient`] is the composition root: it owns the transport stack
//! (global parameters, bearer authentication, the host transport), the
//! runtime that runs enqueued calls and the optional callback executor, and
//! turns every API operation into a [`BoxCall`].

use async_trait::async_trait;
use bridge_traits::background::CallbackExecutor;
use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse, MultipartFile, ResponseBody};
use bridge_traits::storage::{DataSink, DataSource};
use chrono::{DateTime, Utc};
use core_auth::{AuthInterceptor, CredentialProvider, NoCredentials, StaticTokenProvider};
use core_call::{
    ApiAdapter, BoxCall, CallContext, CallError, ClassifiedOutcome, DownloadAdapter,
    ExecutorProgressListener, ProgressDataSource, ProgressListener, ResponseAdapter,
    ScheduledCall, StreamAdapter,
};
use core_runtime::ClientConfig;
use serde::Deserialize;
use std::fmt;
use std::sync::Arc;
use tokio::runtime::Handle;
use tracing::{debug, info};
use url::Url;

use crate::error::{PCloudError, Result};
use crate::interceptor::GlobalParamsInterceptor;
use crate::types::{
    timestamp, AsEntryId, DownloadOptions, EntryId, FileLink, RemoteEntry, RemoteFile,
    RemoteFolder, UploadOptions, UserInfo,
};

type CallResult<T> = std::result::Result<BoxCall<T>, CallError>;

#[derive(Deserialize)]
struct FolderReply {
    metadata: RemoteFolder,
}

#[derive(Deserialize)]
struct FileReply {
    metadata: RemoteFile,
}

#[derive(Deserialize)]
struct UploadReply {
    #[serde(default)]
    metadata: Vec<RemoteFile>,
}

#[derive(Deserialize)]
struct LinkReply {
    path: String,
    #[serde(deserialize_with = "timestamp::deserialize")]
    expires: DateTime<Utc>,
    #[serde(default)]
    hosts: Vec<String>,
}

impl LinkReply {
    fn into_link(self) -> std::result::Result<FileLink, String> {
        if self.hosts.is_empty() {
            return Err("link reply carried no download hosts".to_string());
        }
        let urls = self
            .hosts
            .iter()
            .map(|host| Url::parse(&format!("https://{}{}", host, self.path)))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| format!("invalid download link: {}", e))?;
        Ok(FileLink {
            expires: self.expires,
            urls,
        })
    }
}

fn folder_adapter() -> Arc<dyn ResponseAdapter<RemoteFolder>> {
    Arc::new(ApiAdapter::new(|reply: FolderReply| Ok(reply.metadata)))
}

fn file_adapter() -> Arc<dyn ResponseAdapter<RemoteFile>> {
    Arc::new(ApiAdapter::new(|reply: FileReply| Ok(reply.metadata)))
}

fn entry_adapter(id: EntryId) -> Arc<dyn ResponseAdapter<RemoteEntry>> {
    match id {
        EntryId::File(_) => Arc::new(ApiAdapter::new(|reply: FileReply| {
            Ok(RemoteEntry::File(reply.metadata))
        })),
        EntryId::Folder(_) => Arc::new(ApiAdapter::new(|reply: FolderReply| {
            Ok(RemoteEntry::Folder(reply.metadata))
        })),
    }
}

fn link_adapter() -> ApiAdapter<LinkReply, FileLink> {
    ApiAdapter::new(LinkReply::into_link)
}

fn require_name(name: &str, what: &str) -> std::result::Result<(), CallError> {
    if name.trim().is_empty() {
        return Err(PCloudError::InvalidArgument(format!("{} must not be empty", what)).into());
    }
    Ok(())
}

fn flag(on: bool) -> String {
    let value = if on { "1" } else { "0" };
    value.to_string()
}

/// Resolves a file link and opens its best URL in one call
struct LinkDownloadAdapter {
    transport: Arc<dyn HttpClient>,
    link: ApiAdapter<LinkReply, FileLink>,
}

#[async_trait]
impl ResponseAdapter<ResponseBody> for LinkDownloadAdapter {
    async fn adapt(&self, response: HttpResponse) -> ClassifiedOutcome<ResponseBody> {
        let link = match self.link.adapt(response).await.into_success() {
            Ok(link) => link,
            Err(failure) => return failure,
        };
        let Some(url) = link.best_url() else {
            return ClassifiedOutcome::MalformedResponse("file link has no URL".to_string());
        };

        debug!(host = ?url.host_str(), "Opening download link");
        match self.transport.execute(HttpRequest::get(url.as_str())).await {
            Ok(download) => StreamAdapter.adapt(download).await,
            Err(e) => ClassifiedOutcome::TransportFailure(e.into()),
        }
    }
}

/// File to upload with [`PCloudClient::upload_file`]
#[derive(Clone)]
pub struct FileUpload {
    folder_id: u64,
    file_name: String,
    source: Arc<dyn DataSource>,
    modified: Option<DateTime<Utc>>,
    options: UploadOptions,
    listener: Option<Arc<dyn ProgressListener>>,
}

impl FileUpload {
    pub fn new(folder_id: u64, file_name: impl Into<String>, source: Arc<dyn DataSource>) -> Self {
        Self {
            folder_id,
            file_name: file_name.into(),
            source,
            modified: None,
            options: UploadOptions::DEFAULT,
            listener: None,
        }
    }

    /// Modification time recorded for the uploaded file
    pub fn modified(mut self, modified: DateTime<Utc>) -> Self {
        self.modified = Some(modified);
        self
    }

    pub fn options(mut self, options: UploadOptions) -> Self {
        self.options = options;
        self
    }

    pub fn progress(mut self, listener: Arc<dyn ProgressListener>) -> Self {
        self.listener = Some(listener);
        self
    }
}

impl fmt::Debug for FileUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileUpload")
            .field("folder_id", &self.folder_id)
            .field("file_name", &self.file_name)
            .field("content_length", &self.source.content_length())
            .field("modified", &self.modified)
            .field("options", &self.options)
            .field("progress", &self.listener.is_some())
            .finish()
    }
}

/// pCloud API client
///
/// Every operation returns an idle [`BoxCall`]; nothing is sent until the
/// call is executed or enqueued. Operations that validate their arguments
/// return `Err(CallError::InvalidArgument)` instead of a call.
///
/// # Example
///
/// ```ignore
/// use provider_pcloud::PCloudClient;
/// use core_call::Call;
///
/// let client = PCloudClient::builder().access_token(token).build()?;
/// let root = client.list_folder(0, false).execute().await?;
/// for entry in root.children() {
///     println!("{}", entry.name());
/// }
/// client.shutdown();
/// ```
pub struct PCloudClient {
    context: CallContext,
    http_client: Arc<dyn HttpClient>,
    credentials: Arc<dyn CredentialProvider>,
    callback_executor: Option<Arc<dyn CallbackExecutor>>,
    config: ClientConfig,
    base_url: Url,
}

impl PCloudClient {
    pub fn builder() -> PCloudClientBuilder {
        PCloudClientBuilder::default()
    }

    /// Builder pre-filled with this client's transport, credentials,
    /// executor, runtime and configuration
    pub fn new_builder(&self) -> PCloudClientBuilder {
        PCloudClientBuilder {
            http_client: Some(self.http_client.clone()),
            credentials: Some(self.credentials.clone()),
            callback_executor: self.callback_executor.clone(),
            runtime: Some(self.context.runtime().clone()),
            config: Some(self.config.clone()),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn callback_executor(&self) -> Option<&Arc<dyn CallbackExecutor>> {
        self.callback_executor.as_ref()
    }

    /// Cancel every call created by this client, including ones created
    /// later
    pub fn shutdown(&self) {
        info!("Shutting down pCloud client");
        self.context.cancel_root().cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.context.cancel_root().is_cancelled()
    }

    fn url(&self, method: &str, query: &[(&str, String)]) -> String {
        let mut url = self.base_url.clone();
        url.set_path(method);
        if !query.is_empty() {
            url.query_pairs_mut()
                .extend_pairs(query.iter().map(|(k, v)| (*k, v.as_str())));
        }
        url.to_string()
    }

    fn get(&self, method: &str, query: &[(&str, String)]) -> HttpRequest {
        HttpRequest::get(self.url(method, query))
    }

    fn post(&self, method: &str, form: Vec<(&str, String)>) -> HttpRequest {
        HttpRequest::post(self.url(method, &[])).form(form)
    }

    fn new_call<T: Send + 'static>(
        &self,
        request: HttpRequest,
        adapter: Arc<dyn ResponseAdapter<T>>,
    ) -> BoxCall<T> {
        debug!(method = ?request.method, url = %request.url, "New call");
        let call: BoxCall<T> = Box::new(self.context.call(request, adapter));
        match &self.callback_executor {
            Some(executor) => Box::new(ScheduledCall::new(call, executor.clone())),
            None => call,
        }
    }

    fn progress_listener(&self, listener: Arc<dyn ProgressListener>) -> Arc<dyn ProgressListener> {
        match &self.callback_executor {
            Some(executor) => Arc::new(ExecutorProgressListener::new(listener, executor.clone())),
            None => listener,
        }
    }

    // Folders

    pub fn list_folder(&self, folder_id: u64, recursive: bool) -> BoxCall<RemoteFolder> {
        let mut query = vec![("folderid", folder_id.to_string()), ("noshares", flag(true))];
        if recursive {
            query.push(("recursive", flag(true)));
        }
        self.new_call(self.get("listfolder", &query), folder_adapter())
    }

    pub fn list_folder_by_path(&self, path: &str, recursive: bool) -> CallResult<RemoteFolder> {
        if !path.starts_with('/') {
            return Err(PCloudError::InvalidArgument(format!(
                "folder path must be absolute, got '{}'",
                path
            ))
            .into());
        }
        let mut query = vec![("path", path.to_string()), ("noshares", flag(true))];
        if recursive {
            query.push(("recursive", flag(true)));
        }
        Ok(self.new_call(self.get("listfolder", &query), folder_adapter()))
    }

    pub fn create_folder(&self, parent_folder_id: u64, name: &str) -> CallResult<RemoteFolder> {
        require_name(name, "folder name")?;
        let form = vec![
            ("folderid", parent_folder_id.to_string()),
            ("name", name.to_string()),
        ];
        Ok(self.new_call(self.post("createfolder", form), folder_adapter()))
    }

    pub fn delete_folder(&self, folder_id: u64, recursive: bool) -> BoxCall<()> {
        let method = if recursive {
            "deletefolderrecursive"
        } else {
            "deletefolder"
        };
        let form = vec![("folderid", folder_id.to_string())];
        self.new_call(self.post(method, form), Arc::new(ApiAdapter::unit()))
    }

    fn rename_folder_request(&self, folder_id: u64, new_name: &str) -> HttpRequest {
        let form = vec![
            ("folderid", folder_id.to_string()),
            ("toname", new_name.to_string()),
        ];
        self.post("renamefolder", form)
    }

    pub fn rename_folder(&self, folder_id: u64, new_name: &str) -> CallResult<RemoteFolder> {
        require_name(new_name, "folder name")?;
        Ok(self.new_call(self.rename_folder_request(folder_id, new_name), folder_adapter()))
    }

    fn move_folder_request(&self, folder_id: u64, to_folder_id: u64) -> HttpRequest {
        let form = vec![
            ("folderid", folder_id.to_string()),
            ("tofolderid", to_folder_id.to_string()),
        ];
        self.post("renamefolder", form)
    }

    pub fn move_folder(&self, folder_id: u64, to_folder_id: u64) -> BoxCall<RemoteFolder> {
        self.new_call(self.move_folder_request(folder_id, to_folder_id), folder_adapter())
    }

    fn copy_folder_request(&self, folder_id: u64, to_folder_id: u64, overwrite: bool) -> HttpRequest {
        let mut form = vec![
            ("folderid", folder_id.to_string()),
            ("tofolderid", to_folder_id.to_string()),
        ];
        if !overwrite {
            form.push(("noover", flag(true)));
            form.push(("skipexisting", flag(true)));
        }
        self.post("copyfolder", form)
    }

    /// Copy a folder's contents into another folder. Without `overwrite`,
    /// files that already exist at the destination are skipped.
    pub fn copy_folder(
        &self,
        folder_id: u64,
        to_folder_id: u64,
        overwrite: bool,
    ) -> BoxCall<RemoteFolder> {
        self.new_call(
            self.copy_folder_request(folder_id, to_folder_id, overwrite),
            folder_adapter(),
        )
    }

    // Files

    pub fn stat_file(&self, file_id: u64) -> BoxCall<RemoteFile> {
        self.new_call(self.get("stat", &[("fileid", file_id.to_string())]), file_adapter())
    }

    pub fn stat_file_by_path(&self, path: &str) -> CallResult<RemoteFile> {
        if !path.starts_with('/') {
            return Err(PCloudError::InvalidArgument(format!(
                "file path must be absolute, got '{}'",
                path
            ))
            .into());
        }
        Ok(self.new_call(self.get("stat", &[("path", path.to_string())]), file_adapter()))
    }

    /// Upload a file, streaming it from its [`DataSource`].
    ///
    /// The source is reopened if the request has to be sent again, e.g. after
    /// a login-required retry.
    pub fn upload_file(&self, upload: FileUpload) -> CallResult<RemoteFile> {
        require_name(&upload.file_name, "file name")?;

        let source: Arc<dyn DataSource> = match upload.listener {
            Some(listener) => Arc::new(ProgressDataSource::new(
                upload.source,
                self.progress_listener(listener),
                self.config.progress_threshold(),
            )),
            None => upload.source,
        };

        let mut query = vec![
            ("folderid", upload.folder_id.to_string()),
            ("renameifexists", flag(!upload.options.overwrite_existing)),
            ("nopartial", flag(!upload.options.keep_partial)),
        ];
        if let Some(modified) = upload.modified {
            query.push(("mtime", modified.timestamp().to_string()));
        }

        let request = HttpRequest::post(self.url("uploadfile", &query)).multipart(MultipartFile {
            field_name: "file".to_string(),
            file_name: upload.file_name,
            mime_type: "application/octet-stream".to_string(),
            source,
        });
        let adapter = ApiAdapter::new(|reply: UploadReply| {
            reply
                .metadata
                .into_iter()
                .next()
                .ok_or_else(|| "API uploaded file but did not return remote file data".to_string())
        });

        Ok(self.new_call(request, Arc::new(adapter)))
    }

    pub fn delete_file(&self, file_id: u64) -> BoxCall<()> {
        let form = vec![("fileid", file_id.to_string())];
        self.new_call(self.post("deletefile", form), Arc::new(ApiAdapter::unit()))
    }

    fn rename_file_request(&self, file_id: u64, new_name: &str) -> HttpRequest {
        let form = vec![
            ("fileid", file_id.to_string()),
            ("toname", new_name.to_string()),
        ];
        self.post("renamefile", form)
    }

    pub fn rename_file(&self, file_id: u64, new_name: &str) -> CallResult<RemoteFile> {
        require_name(new_name, "file name")?;
        Ok(self.new_call(self.rename_file_request(file_id, new_name), file_adapter()))
    }

    fn move_file_request(&self, file_id: u64, to_folder_id: u64) -> HttpRequest {
        let form = vec![
            ("fileid", file_id.to_string()),
            ("tofolderid", to_folder_id.to_string()),
        ];
        self.post("renamefile", form)
    }

    pub fn move_file(&self, file_id: u64, to_folder_id: u64) -> BoxCall<RemoteFile> {
        self.new_call(self.move_file_request(file_id, to_folder_id), file_adapter())
    }

    fn copy_file_request(&self, file_id: u64, to_folder_id: u64, overwrite: bool) -> HttpRequest {
        let mut form = vec![
            ("fileid", file_id.to_string()),
            ("tofolderid", to_folder_id.to_string()),
        ];
        if !overwrite {
            form.push(("noover", flag(true)));
        }
        self.post("copyfile", form)
    }

    pub fn copy_file(&self, file_id: u64, to_folder_id: u64, overwrite: bool) -> BoxCall<RemoteFile> {
        self.new_call(
            self.copy_file_request(file_id, to_folder_id, overwrite),
            file_adapter(),
        )
    }

    // Links and downloads

    fn file_link_request(&self, file_id: u64, options: &DownloadOptions) -> Result<HttpRequest> {
        options.validate()?;
        let mut query = vec![("fileid", file_id.to_string())];
        if options.force_download {
            query.push(("forcedownload", flag(true)));
        }
        if options.skip_filename {
            query.push(("skipfilename", flag(true)));
        }
        if let Some(content_type) = &options.content_type {
            query.push(("contenttype", content_type.clone()));
        }
        Ok(self.get("getfilelink", &query))
    }

    pub fn create_file_link(&self, file_id: u64, options: &DownloadOptions) -> CallResult<FileLink> {
        let request = self.file_link_request(file_id, options)?;
        Ok(self.new_call(request, Arc::new(link_adapter())))
    }

    fn link_request(link: &FileLink) -> std::result::Result<HttpRequest, CallError> {
        link.best_url()
            .map(|url| HttpRequest::get(url.as_str()))
            .ok_or_else(|| PCloudError::InvalidArgument("file link has no URL".to_string()).into())
    }

    /// Download a link into `sink`, optionally reporting progress
    pub fn download_link_to(
        &self,
        link: &FileLink,
        sink: Arc<dyn DataSink>,
        listener: Option<Arc<dyn ProgressListener>>,
    ) -> CallResult<()> {
        let request = Self::link_request(link)?;
        let mut adapter = DownloadAdapter::new(sink);
        if let Some(listener) = listener {
            adapter = adapter.with_progress(
                self.progress_listener(listener),
                self.config.progress_threshold(),
            );
        }
        Ok(self.new_call(request, Arc::new(adapter)))
    }

    /// Open a link as a byte stream; the body is not read until the caller
    /// consumes it
    pub fn download_link(&self, link: &FileLink) -> CallResult<ResponseBody> {
        let request = Self::link_request(link)?;
        Ok(self.new_call(request, Arc::new(StreamAdapter)))
    }

    /// Resolve a download link for `file_id` and open it as a byte stream,
    /// all within one call
    pub fn download_file(&self, file_id: u64) -> BoxCall<ResponseBody> {
        let request = self.get("getfilelink", &[("fileid", file_id.to_string())]);
        self.new_call(request, self.link_download_adapter())
    }

    /// Like [`download_file`](Self::download_file), served with the file's
    /// own content type
    pub fn download_remote_file(&self, file: &RemoteFile) -> CallResult<ResponseBody> {
        let mut options = DownloadOptions::DEFAULT;
        if !file.content_type.is_empty() {
            options = options.content_type(file.content_type.clone());
        }
        let request = self.file_link_request(file.file_id, &options)?;
        Ok(self.new_call(request, self.link_download_adapter()))
    }

    fn link_download_adapter(&self) -> Arc<dyn ResponseAdapter<ResponseBody>> {
        Arc::new(LinkDownloadAdapter {
            transport: self.context.transport().clone(),
            link: link_adapter(),
        })
    }

    // Account

    pub fn user_info(&self) -> BoxCall<UserInfo> {
        self.new_call(self.get("userinfo", &[]), Arc::new(ApiAdapter::direct()))
    }

    // Entries

    pub fn copy_entry<E: AsEntryId + ?Sized>(
        &self,
        entry: &E,
        to_folder_id: u64,
        overwrite: bool,
    ) -> CallResult<RemoteEntry> {
        let id = entry.as_entry_id()?;
        let request = match id {
            EntryId::File(file_id) => self.copy_file_request(file_id, to_folder_id, overwrite),
            EntryId::Folder(folder_id) => {
                self.copy_folder_request(folder_id, to_folder_id, overwrite)
            }
        };
        Ok(self.new_call(request, entry_adapter(id)))
    }

    pub fn move_entry<E: AsEntryId + ?Sized>(
        &self,
        entry: &E,
        to_folder_id: u64,
    ) -> CallResult<RemoteEntry> {
        let id = entry.as_entry_id()?;
        let request = match id {
            EntryId::File(file_id) => self.move_file_request(file_id, to_folder_id),
            EntryId::Folder(folder_id) => self.move_folder_request(folder_id, to_folder_id),
        };
        Ok(self.new_call(request, entry_adapter(id)))
    }

    pub fn rename_entry<E: AsEntryId + ?Sized>(
        &self,
        entry: &E,
        new_name: &str,
    ) -> CallResult<RemoteEntry> {
        let id = entry.as_entry_id()?;
        require_name(new_name, "entry name")?;
        let request = match id {
            EntryId::File(file_id) => self.rename_file_request(file_id, new_name),
            EntryId::Folder(folder_id) => self.rename_folder_request(folder_id, new_name),
        };
        Ok(self.new_call(request, entry_adapter(id)))
    }

    /// Delete a file, or an empty folder
    pub fn delete_entry<E: AsEntryId + ?Sized>(&self, entry: &E) -> CallResult<()> {
        Ok(match entry.as_entry_id()? {
            EntryId::File(file_id) => self.delete_file(file_id),
            EntryId::Folder(folder_id) => self.delete_folder(folder_id, false),
        })
    }
}

impl fmt::Debug for PCloudClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PCloudClient")
            .field("api_host", &self.config.api_host())
            .field("callback_executor", &self.callback_executor.is_some())
            .field("shut_down", &self.is_shut_down())
            .finish()
    }
}

/// Builder for [`PCloudClient`].
///
/// Only the runtime is required when the `desktop` feature is off and no
/// transport is given; everything else has a default:
///
/// - transport: reqwest, configured from the [`ClientConfig`] timeouts
/// - credentials: none (anonymous requests)
/// - callback executor: none (callbacks run on runtime worker threads)
/// - runtime: the runtime the builder is called from
/// - config: [`ClientConfig::default`]
#[derive(Default)]
pub struct PCloudClientBuilder {
    http_client: Option<Arc<dyn HttpClient>>,
    credentials: Option<Arc<dyn CredentialProvider>>,
    callback_executor: Option<Arc<dyn CallbackExecutor>>,
    runtime: Option<Handle>,
    config: Option<ClientConfig>,
}

impl PCloudClientBuilder {
    pub fn http_client(mut self, http_client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(http_client);
        self
    }

    pub fn credentials(mut self, credentials: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Authenticate every request with a fixed bearer token
    pub fn access_token(self, token: impl Into<String>) -> Self {
        self.credentials(Arc::new(StaticTokenProvider::new(token)))
    }

    pub fn callback_executor(mut self, executor: Arc<dyn CallbackExecutor>) -> Self {
        self.callback_executor = Some(executor);
        self
    }

    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// # Errors
    ///
    /// - [`PCloudError::Config`] for an invalid configuration, a missing
    ///   runtime, or a missing transport without the `desktop` feature
    /// - [`PCloudError::BridgeError`] if the default transport cannot be
    ///   created
    pub fn build(self) -> Result<PCloudClient> {
        let config = match self.config {
            Some(config) => config,
            None => ClientConfig::builder().build()?,
        };
        let base_url = config.api_base_url()?;

        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current().map_err(|_| {
                core_runtime::Error::capability_missing(
                    "runtime",
                    "no tokio runtime handle was given and none is running",
                )
            })?,
        };

        let http_client = match self.http_client {
            Some(http_client) => http_client,
            None => default_http_client(&config)?,
        };
        let credentials: Arc<dyn CredentialProvider> = match self.credentials {
            Some(credentials) => credentials,
            None => Arc::new(NoCredentials),
        };

        let transport: Arc<dyn HttpClient> = Arc::new(AuthInterceptor::new(
            Arc::new(GlobalParamsInterceptor::new(http_client.clone(), &config)),
            credentials.clone(),
        ));

        info!(
            api_host = config.api_host(),
            scheduled = self.callback_executor.is_some(),
            "pCloud client ready"
        );

        Ok(PCloudClient {
            context: CallContext::new(transport, runtime),
            http_client,
            credentials,
            callback_executor: self.callback_executor,
            config,
            base_url,
        })
    }
}

#[cfg(feature = "desktop")]
fn default_http_client(config: &ClientConfig) -> Result<Arc<dyn HttpClient>> {
    let client = bridge_desktop::ReqwestHttpClient::with_settings(
        config.connect_timeout(),
        config.read_timeout(),
        config.user_agent(),
    )?;
    Ok(Arc::new(client))
}

#[cfg(not(feature = "desktop"))]
fn default_http_client(_config: &ClientConfig) -> Result<Arc<dyn HttpClient>> {
    Err(core_runtime::Error::capability_missing(
        "http_client",
        "no HTTP transport was given and the desktop transport is disabled",
    )
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::http::{HttpMethod, RequestBody};
    use bridge_traits::storage::BytesSource;
    use core_call::Call;
    use mockall::mock;

    mock! {
        HttpClient {}

        #[async_trait]
        impl HttpClient for HttpClient {
            async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse>;
        }
    }

    fn json(body: &'static str) -> BridgeResult<HttpResponse> {
        Ok(HttpResponse::new(200, ResponseBody::from_bytes(body)))
    }

    fn client(transport: MockHttpClient) -> PCloudClient {
        PCloudClient::builder()
            .http_client(Arc::new(transport))
            .access_token("token")
            .runtime(Handle::current())
            .build()
            .unwrap()
    }

    fn form_value<'a>(request: &'a HttpRequest, key: &str) -> Option<&'a str> {
        match &request.body {
            RequestBody::Form(pairs) => pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    const FOLDER: &str = r#"{"result": 0, "metadata": {"id": "d5", "name": "Docs",
        "isfolder": true, "parentfolderid": 0, "created": 1500000000,
        "modified": 1500000000, "folderid": 5}}"#;

    const FILE: &str = r#"{"result": 0, "metadata": {"id": "f9", "name": "a.txt",
        "isfolder": false, "parentfolderid": 5, "created": 1500000000,
        "modified": 1500000000, "fileid": 9, "contenttype": "text/plain", "size": 3}}"#;

    #[tokio::test]
    async fn test_list_folder_request() {
        let mut transport = MockHttpClient::new();
        transport
            .expect_execute()
            .withf(|req| {
                req.method == HttpMethod::Get
                    && req.url
                        == "https://api.pcloud.com/listfolder?folderid=5&noshares=1&recursive=1"
                    && req.authorization() == Some("Bearer token")
            })
            .times(1)
            .returning(|_| json(FOLDER));

        let folder = client(transport).list_folder(5, true).execute().await.unwrap();
        assert_eq!(folder.folder_id, 5);
        assert_eq!(folder.name, "Docs");
    }

    #[tokio::test]
    async fn test_list_folder_by_relative_path_is_rejected() {
        let transport = MockHttpClient::new();
        let result = client(transport).list_folder_by_path("Docs", false);
        assert!(matches!(result, Err(CallError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_copy_folder_without_overwrite_skips_existing() {
        let mut transport = MockHttpClient::new();
        transport
            .expect_execute()
            .withf(|req| {
                req.url == "https://api.pcloud.com/copyfolder"
                    && form_value(req, "noover") == Some("1")
                    && form_value(req, "skipexisting") == Some("1")
                    && form_value(req, "tofolderid") == Some("8")
            })
            .times(1)
            .returning(|_| json(FOLDER));

        client(transport).copy_folder(5, 8, false).execute().await.unwrap();
    }

    #[tokio::test]
    async fn test_recursive_folder_delete_uses_recursive_method() {
        let mut transport = MockHttpClient::new();
        transport
            .expect_execute()
            .withf(|req| {
                req.url == "https://api.pcloud.com/deletefolderrecursive"
                    && form_value(req, "folderid") == Some("5")
            })
            .times(1)
            .returning(|_| json(r#"{"result": 0, "deletedfiles": 3, "deletedfolders": 1}"#));

        client(transport).delete_folder(5, true).execute().await.unwrap();
    }

    #[tokio::test]
    async fn test_upload_maps_options_and_metadata() {
        let mut transport = MockHttpClient::new();
        transport
            .expect_execute()
            .withf(|req| {
                let url = Url::parse(&req.url).unwrap();
                let query: Vec<(String, String)> = url.query_pairs().into_owned().collect();
                url.path() == "/uploadfile"
                    && query.contains(&("folderid".into(), "5".into()))
                    && query.contains(&("renameifexists".into(), "0".into()))
                    && query.contains(&("nopartial".into(), "1".into()))
                    && query.contains(&("mtime".into(), "1500000000".into()))
                    && matches!(&req.body, RequestBody::Multipart(file)
                        if file.field_name == "file" && file.file_name == "a.txt")
            })
            .times(1)
            .returning(|_| {
                json(
                    r#"{"result": 0, "fileids": [9], "metadata": [{"id": "f9", "name": "a.txt",
                    "isfolder": false, "created": 1500000000, "modified": 1500000000,
                    "fileid": 9}]}"#,
                )
            });

        let upload = FileUpload::new(5, "a.txt", Arc::new(BytesSource::new("abc")))
            .modified(DateTime::from_timestamp(1_500_000_000, 0).unwrap())
            .options(UploadOptions::OVERWRITE_FILE);
        let file = client(transport)
            .upload_file(upload)
            .unwrap()
            .execute()
            .await
            .unwrap();
        assert_eq!(file.file_id, 9);
    }

    #[tokio::test]
    async fn test_upload_without_metadata_is_malformed() {
        let mut transport = MockHttpClient::new();
        transport
            .expect_execute()
            .times(1)
            .returning(|_| json(r#"{"result": 0, "fileids": [], "metadata": []}"#));

        let upload = FileUpload::new(0, "a.txt", Arc::new(BytesSource::new("abc")));
        let err = client(transport)
            .upload_file(upload)
            .unwrap()
            .execute()
            .await
            .unwrap_err();
        assert!(matches!(err, CallError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_invalid_content_type_is_rejected() {
        let transport = MockHttpClient::new();
        let options = DownloadOptions::default().content_type("nonsense");
        let result = client(transport).create_file_link(9, &options);
        assert!(matches!(result, Err(CallError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_create_file_link_builds_urls() {
        let mut transport = MockHttpClient::new();
        transport
            .expect_execute()
            .withf(|req| {
                req.url
                    == "https://api.pcloud.com/getfilelink?fileid=9&forcedownload=1&contenttype=text%2Fplain"
            })
            .times(1)
            .returning(|_| {
                json(
                    r#"{"result": 0, "path": "/cBZ/a.txt", "expires": 1700000000,
                    "hosts": ["c1.pcloud.com", "c2.pcloud.com"]}"#,
                )
            });

        let options = DownloadOptions::default()
            .force_download(true)
            .content_type("text/plain");
        let link = client(transport)
            .create_file_link(9, &options)
            .unwrap()
            .execute()
            .await
            .unwrap();

        assert_eq!(link.urls.len(), 2);
        assert_eq!(link.best_url().unwrap().as_str(), "https://c1.pcloud.com/cBZ/a.txt");
        assert_eq!(link.expires.timestamp(), 1_700_000_000);
    }

    #[tokio::test]
    async fn test_folder_entry_operations_use_folder_methods() {
        let mut transport = MockHttpClient::new();
        transport
            .expect_execute()
            .withf(|req| {
                req.url == "https://api.pcloud.com/copyfolder" && form_value(req, "folderid") == Some("5")
            })
            .times(1)
            .returning(|_| json(FOLDER));
        transport
            .expect_execute()
            .withf(|req| {
                req.url == "https://api.pcloud.com/deletefolder" && form_value(req, "folderid") == Some("5")
            })
            .times(1)
            .returning(|_| json(r#"{"result": 0}"#));

        let client = client(transport);
        let copied = client.copy_entry("d5", 8, true).unwrap().execute().await.unwrap();
        assert!(copied.is_folder());
        client.delete_entry("d5").unwrap().execute().await.unwrap();
    }

    #[tokio::test]
    async fn test_file_entry_rename() {
        let mut transport = MockHttpClient::new();
        transport
            .expect_execute()
            .withf(|req| {
                req.url == "https://api.pcloud.com/renamefile"
                    && form_value(req, "fileid") == Some("9")
                    && form_value(req, "toname") == Some("b.txt")
            })
            .times(1)
            .returning(|_| json(FILE));

        let renamed = client(transport)
            .rename_entry(&EntryId::File(9), "b.txt")
            .unwrap()
            .execute()
            .await
            .unwrap();
        assert_eq!(renamed.entry_id(), EntryId::File(9));
    }

    #[tokio::test]
    async fn test_bad_entry_id_is_invalid_argument() {
        let transport = MockHttpClient::new();
        let result = client(transport).move_entry("x5", 0);
        assert!(matches!(result, Err(CallError::InvalidArgument(_))));
    }

    #[tokio::test]
    async fn test_shutdown_cancels_calls() {
        let mut transport = MockHttpClient::new();
        transport.expect_execute().times(0);
        let client = client(transport);

        let pending = client.user_info();
        client.shutdown();

        assert!(client.is_shut_down());
        assert!(pending.is_canceled());
        assert!(pending.execute().await.unwrap_err().is_canceled());
        assert!(client.stat_file(1).execute().await.unwrap_err().is_canceled());
    }

    #[tokio::test]
    async fn test_new_builder_shares_settings() {
        let transport = MockHttpClient::new();
        let config = ClientConfig::builder().api_host("eapi.pcloud.com").build().unwrap();
        let client = PCloudClient::builder()
            .http_client(Arc::new(transport))
            .config(config)
            .runtime(Handle::current())
            .build()
            .unwrap();

        let derived = client.new_builder().build().unwrap();
        assert_eq!(derived.config().api_host(), "eapi.pcloud.com");
        assert!(derived.callback_executor().is_none());
    }
}
