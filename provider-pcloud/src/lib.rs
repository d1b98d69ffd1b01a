//! # pCloud Provider
//!
//! Client for the pCloud storage API built on the [`core_call`] call layer.
//!
//! ## Overview
//!
//! This module provides:
//! - Folder listing, creation, renaming, moving, copying and deletion
//! - File metadata, streamed uploads with progress, and downloads through
//!   time-limited file links
//! - Entry operations addressed by `f<id>` / `d<id>` identifiers
//! - Account information
//!
//! Every operation returns a [`core_call::BoxCall`] that is executed
//! synchronously on the current task or enqueued with a callback.

pub mod client;
pub mod error;
pub mod interceptor;
pub mod types;

pub use client::{FileUpload, PCloudClient, PCloudClientBuilder};
pub use error::{PCloudError, Result};
pub use interceptor::GlobalParamsInterceptor;
pub use types::{
    AsEntryId, DownloadOptions, EntryId, FileLink, RemoteEntry, RemoteFile, RemoteFolder,
    UploadOptions, UserInfo,
};
