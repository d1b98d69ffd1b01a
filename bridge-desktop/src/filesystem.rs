//! File-backed upload sources and download sinks using Tokio

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    platform::{DynAsyncRead, DynAsyncWrite},
    storage::{DataSink, DataSource},
};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Upload payload read from a local file
///
/// The length is captured when the source is created so multipart bodies can
/// announce it; every [`open`](DataSource::open) starts a fresh read.
#[derive(Debug, Clone)]
pub struct FileDataSource {
    path: PathBuf,
    len: u64,
}

impl FileDataSource {
    pub async fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let metadata = fs::metadata(&path).await.map_err(Self::map_io_error)?;
        if !metadata.is_file() {
            return Err(BridgeError::OperationFailed(format!(
                "not a regular file: {}",
                path.display()
            )));
        }
        Ok(Self {
            path,
            len: metadata.len(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Convert std::io::Error to BridgeError
    fn map_io_error(e: std::io::Error) -> BridgeError {
        BridgeError::Io(e)
    }
}

#[async_trait]
impl DataSource for FileDataSource {
    fn content_length(&self) -> Option<u64> {
        Some(self.len)
    }

    async fn open(&self) -> Result<Box<DynAsyncRead>> {
        let file = fs::File::open(&self.path)
            .await
            .map_err(Self::map_io_error)?;
        debug!(path = ?self.path, len = self.len, "Opened upload source");
        Ok(Box::new(file))
    }
}

/// Download destination written to a local file
///
/// Opening truncates the file and creates missing parent directories.
#[derive(Debug, Clone)]
pub struct FileDataSink {
    path: PathBuf,
}

impl FileDataSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl DataSink for FileDataSink {
    async fn open(&self) -> Result<Box<DynAsyncWrite>> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).await?;
                debug!(path = ?parent, "Created download directory");
            }
        }
        let file = fs::File::create(&self.path).await?;
        Ok(Box::new(file))
    }
}
