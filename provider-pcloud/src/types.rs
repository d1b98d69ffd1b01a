//! pCloud entities and request options
//!
//! Entities are decoded from the `metadata` objects of API replies. Dates are
//! unix timestamps when the client sends `timeformat=timestamp` (the default
//! global parameter) and RFC 2822 strings otherwise; both are accepted.

use chrono::{DateTime, Utc};
use serde::de::{self, Deserializer};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::error::{PCloudError, Result};

pub(crate) mod timestamp {
    use chrono::{DateTime, TimeZone, Utc};
    use serde::de::{self, Deserializer};
    use serde::Deserialize;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Seconds(i64),
        Text(String),
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<DateTime<Utc>, D::Error> {
        match Raw::deserialize(d)? {
            Raw::Seconds(secs) => Utc
                .timestamp_opt(secs, 0)
                .single()
                .ok_or_else(|| de::Error::custom(format!("timestamp out of range: {}", secs))),
            Raw::Text(text) => DateTime::parse_from_rfc2822(&text)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| de::Error::custom(format!("invalid date '{}': {}", text, e))),
        }
    }
}

/// A file stored in the account
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteFile {
    /// Entry identifier, `f<fileid>`
    pub id: String,
    pub name: String,
    #[serde(rename = "parentfolderid", default)]
    pub parent_folder_id: u64,
    #[serde(with = "timestamp")]
    pub created: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub modified: DateTime<Utc>,
    #[serde(rename = "fileid")]
    pub file_id: u64,
    #[serde(rename = "contenttype", default)]
    pub content_type: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub hash: Option<u64>,
    #[serde(rename = "thumb", default)]
    pub has_thumbnail: bool,
}

/// A folder stored in the account
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RemoteFolder {
    /// Entry identifier, `d<folderid>`
    pub id: String,
    pub name: String,
    #[serde(rename = "parentfolderid", default)]
    pub parent_folder_id: u64,
    #[serde(with = "timestamp")]
    pub created: DateTime<Utc>,
    #[serde(with = "timestamp")]
    pub modified: DateTime<Utc>,
    #[serde(rename = "folderid")]
    pub folder_id: u64,
    /// Direct children, `None` when the reply did not list them
    #[serde(rename = "contents", default)]
    pub children: Option<Vec<RemoteEntry>>,
}

impl RemoteFolder {
    /// Children, empty when unknown
    pub fn children(&self) -> &[RemoteEntry] {
        self.children.as_deref().unwrap_or(&[])
    }
}

/// File or folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteEntry {
    File(RemoteFile),
    Folder(RemoteFolder),
}

impl RemoteEntry {
    pub fn id(&self) -> &str {
        match self {
            RemoteEntry::File(f) => &f.id,
            RemoteEntry::Folder(f) => &f.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            RemoteEntry::File(f) => &f.name,
            RemoteEntry::Folder(f) => &f.name,
        }
    }

    pub fn parent_folder_id(&self) -> u64 {
        match self {
            RemoteEntry::File(f) => f.parent_folder_id,
            RemoteEntry::Folder(f) => f.parent_folder_id,
        }
    }

    pub fn created(&self) -> DateTime<Utc> {
        match self {
            RemoteEntry::File(f) => f.created,
            RemoteEntry::Folder(f) => f.created,
        }
    }

    pub fn modified(&self) -> DateTime<Utc> {
        match self {
            RemoteEntry::File(f) => f.modified,
            RemoteEntry::Folder(f) => f.modified,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self, RemoteEntry::File(_))
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, RemoteEntry::Folder(_))
    }

    pub fn as_file(&self) -> Option<&RemoteFile> {
        match self {
            RemoteEntry::File(f) => Some(f),
            RemoteEntry::Folder(_) => None,
        }
    }

    pub fn as_folder(&self) -> Option<&RemoteFolder> {
        match self {
            RemoteEntry::Folder(f) => Some(f),
            RemoteEntry::File(_) => None,
        }
    }

    pub fn entry_id(&self) -> EntryId {
        match self {
            RemoteEntry::File(f) => EntryId::File(f.file_id),
            RemoteEntry::Folder(f) => EntryId::Folder(f.folder_id),
        }
    }
}

impl From<RemoteFile> for RemoteEntry {
    fn from(file: RemoteFile) -> Self {
        RemoteEntry::File(file)
    }
}

impl From<RemoteFolder> for RemoteEntry {
    fn from(folder: RemoteFolder) -> Self {
        RemoteEntry::Folder(folder)
    }
}

impl<'de> Deserialize<'de> for RemoteEntry {
    fn deserialize<D: Deserializer<'de>>(d: D) -> std::result::Result<Self, D::Error> {
        let value = serde_json::Value::deserialize(d)?;
        let is_folder = value
            .get("isfolder")
            .and_then(serde_json::Value::as_bool)
            .ok_or_else(|| de::Error::missing_field("isfolder"))?;

        if is_folder {
            RemoteFolder::deserialize(value)
                .map(RemoteEntry::Folder)
                .map_err(de::Error::custom)
        } else {
            RemoteFile::deserialize(value)
                .map(RemoteEntry::File)
                .map_err(de::Error::custom)
        }
    }
}

/// Entry identifier in its `f<id>` / `d<id>` text form
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryId {
    File(u64),
    Folder(u64),
}

impl EntryId {
    pub const FILE_PREFIX: char = 'f';
    pub const FOLDER_PREFIX: char = 'd';

    pub fn is_file(&self) -> bool {
        matches!(self, EntryId::File(_))
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, EntryId::Folder(_))
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryId::File(id) => write!(f, "{}{}", Self::FILE_PREFIX, id),
            EntryId::Folder(id) => write!(f, "{}{}", Self::FOLDER_PREFIX, id),
        }
    }
}

impl FromStr for EntryId {
    type Err = PCloudError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || PCloudError::InvalidEntryId(s.to_string());
        let mut chars = s.chars();
        let prefix = chars.next().ok_or_else(invalid)?;
        let id: u64 = chars.as_str().parse().map_err(|_| invalid())?;

        match prefix {
            Self::FILE_PREFIX => Ok(EntryId::File(id)),
            Self::FOLDER_PREFIX => Ok(EntryId::Folder(id)),
            _ => Err(invalid()),
        }
    }
}

/// Anything that names a file or folder
pub trait AsEntryId {
    fn as_entry_id(&self) -> Result<EntryId>;
}

impl AsEntryId for EntryId {
    fn as_entry_id(&self) -> Result<EntryId> {
        Ok(*self)
    }
}

impl AsEntryId for RemoteEntry {
    fn as_entry_id(&self) -> Result<EntryId> {
        Ok(self.entry_id())
    }
}

impl AsEntryId for RemoteFile {
    fn as_entry_id(&self) -> Result<EntryId> {
        Ok(EntryId::File(self.file_id))
    }
}

impl AsEntryId for RemoteFolder {
    fn as_entry_id(&self) -> Result<EntryId> {
        Ok(EntryId::Folder(self.folder_id))
    }
}

impl AsEntryId for str {
    fn as_entry_id(&self) -> Result<EntryId> {
        self.parse()
    }
}

impl AsEntryId for String {
    fn as_entry_id(&self) -> Result<EntryId> {
        self.parse()
    }
}

/// Time-limited download link for a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileLink {
    pub expires: DateTime<Utc>,
    /// Mirrors serving the file, best first
    pub urls: Vec<Url>,
}

impl FileLink {
    pub fn best_url(&self) -> Option<&Url> {
        self.urls.first()
    }
}

impl fmt::Display for FileLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.best_url() {
            Some(url) => write!(f, "{} | Valid until: {}", url, self.expires),
            None => write!(f, "<no url> | Valid until: {}", self.expires),
        }
    }
}

/// Account details
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserInfo {
    #[serde(rename = "userid")]
    pub user_id: u64,
    pub email: String,
    #[serde(rename = "emailverified", default)]
    pub email_verified: bool,
    #[serde(rename = "quota", default)]
    pub total_quota: u64,
    #[serde(rename = "usedquota", default)]
    pub used_quota: u64,
}

/// Conflict and interruption handling for uploads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct UploadOptions {
    /// Replace a same-named file instead of letting the server rename the
    /// upload
    pub overwrite_existing: bool,
    /// Keep partially uploaded data when the transfer is interrupted
    pub keep_partial: bool,
}

impl UploadOptions {
    pub const DEFAULT: UploadOptions = UploadOptions {
        overwrite_existing: false,
        keep_partial: false,
    };

    pub const OVERWRITE_FILE: UploadOptions = UploadOptions {
        overwrite_existing: true,
        keep_partial: false,
    };

    pub const PARTIAL_UPLOAD: UploadOptions = UploadOptions {
        overwrite_existing: false,
        keep_partial: true,
    };

    pub fn overwrite_existing(mut self, overwrite: bool) -> Self {
        self.overwrite_existing = overwrite;
        self
    }

    pub fn keep_partial(mut self, keep: bool) -> Self {
        self.keep_partial = keep;
        self
    }
}

/// How a download link should serve the file
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct DownloadOptions {
    /// Serve from a URL without the file name
    pub skip_filename: bool,
    /// Ask the host to send `Content-Disposition: attachment`
    pub force_download: bool,
    /// Override the `Content-Type` the host serves
    pub content_type: Option<String>,
}

impl DownloadOptions {
    pub const DEFAULT: DownloadOptions = DownloadOptions {
        skip_filename: false,
        force_download: false,
        content_type: None,
    };

    pub fn skip_filename(mut self, skip: bool) -> Self {
        self.skip_filename = skip;
        self
    }

    pub fn force_download(mut self, force: bool) -> Self {
        self.force_download = force;
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Reject a content type that is not `type/subtype`
    pub fn validate(&self) -> Result<()> {
        let Some(content_type) = &self.content_type else {
            return Ok(());
        };
        let essence = content_type.split(';').next().unwrap_or_default().trim();
        let well_formed = essence.split_once('/').is_some_and(|(kind, sub)| {
            let token = |s: &str| {
                !s.is_empty() && s.chars().all(|c| c.is_ascii_graphic() && c != '/')
            };
            token(kind) && token(sub)
        });

        if well_formed {
            Ok(())
        } else {
            Err(PCloudError::InvalidArgument(format!(
                "invalid content type '{}'",
                content_type
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const FILE_JSON: &str = r#"{
        "id": "f42", "name": "report.pdf", "isfolder": false,
        "parentfolderid": 7, "created": 1500000000, "modified": 1500000600,
        "fileid": 42, "contenttype": "application/pdf", "size": 1024,
        "hash": 9876543210, "thumb": false
    }"#;

    #[test]
    fn test_entry_dispatches_on_isfolder() {
        let json = r#"{
            "id": "d7", "name": "Docs", "isfolder": true, "parentfolderid": 0,
            "created": "Thu, 21 Mar 2013 18:31:35 +0000",
            "modified": "Thu, 21 Mar 2013 18:31:35 +0000",
            "folderid": 7,
            "contents": [REPLACE]
        }"#
        .replace("[REPLACE]", &format!("[{}]", FILE_JSON));

        let entry: RemoteEntry = serde_json::from_str(&json).unwrap();
        let folder = entry.as_folder().unwrap();
        assert!(entry.as_file().is_none());
        assert_eq!(folder.folder_id, 7);
        assert_eq!(
            folder.created,
            Utc.with_ymd_and_hms(2013, 3, 21, 18, 31, 35).unwrap()
        );

        let child = &folder.children()[0];
        let file = child.as_file().unwrap();
        assert_eq!(file.file_id, 42);
        assert_eq!(file.content_type, "application/pdf");
        assert_eq!(file.created.timestamp(), 1_500_000_000);
        assert_eq!(child.entry_id(), EntryId::File(42));
    }

    #[test]
    fn test_folder_without_contents_has_unknown_children() {
        let json = r#"{"id": "d0", "name": "/", "isfolder": true, "created": 0,
            "modified": 0, "folderid": 0}"#;
        let folder: RemoteFolder = serde_json::from_str(json).unwrap();
        assert!(folder.children.is_none());
        assert!(folder.children().is_empty());
    }

    #[test]
    fn test_entry_without_isfolder_is_rejected() {
        let err = serde_json::from_str::<RemoteEntry>(r#"{"id": "f1"}"#).unwrap_err();
        assert!(err.to_string().contains("isfolder"));
    }

    #[test]
    fn test_entry_id_parsing() {
        assert_eq!("f123".parse::<EntryId>().unwrap(), EntryId::File(123));
        assert_eq!("d0".parse::<EntryId>().unwrap(), EntryId::Folder(0));
        assert_eq!(EntryId::Folder(9).to_string(), "d9");

        for bad in ["", "x12", "f", "d-1", "f12a"] {
            assert!(matches!(
                bad.parse::<EntryId>(),
                Err(PCloudError::InvalidEntryId(_))
            ));
        }
    }

    #[test]
    fn test_upload_presets() {
        assert_eq!(UploadOptions::default(), UploadOptions::DEFAULT);
        assert!(UploadOptions::OVERWRITE_FILE.overwrite_existing);
        assert!(!UploadOptions::OVERWRITE_FILE.keep_partial);
        assert!(UploadOptions::PARTIAL_UPLOAD.keep_partial);
        assert_eq!(
            UploadOptions::DEFAULT.overwrite_existing(true),
            UploadOptions::OVERWRITE_FILE
        );
    }

    #[test]
    fn test_download_content_type_validation() {
        assert!(DownloadOptions::DEFAULT.validate().is_ok());
        assert!(DownloadOptions::default()
            .content_type("audio/mpeg")
            .validate()
            .is_ok());
        assert!(DownloadOptions::default()
            .content_type("text/plain; charset=utf-8")
            .validate()
            .is_ok());
        assert!(DownloadOptions::default()
            .content_type("not a type")
            .validate()
            .is_err());
        assert!(DownloadOptions::default()
            .content_type("text/")
            .validate()
            .is_err());
    }

    #[test]
    fn test_best_url_is_first_mirror() {
        let link = FileLink {
            expires: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            urls: vec![
                Url::parse("https://c1.pcloud.com/x/a.txt").unwrap(),
                Url::parse("https://c2.pcloud.com/x/a.txt").unwrap(),
            ],
        };
        assert_eq!(link.best_url().unwrap().host_str(), Some("c1.pcloud.com"));
        assert!(link.to_string().starts_with("https://c1.pcloud.com/x/a.txt"));
    }
}
