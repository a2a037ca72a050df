//! Entry and image persistence.
//!
//! Two interchangeable backends implement [`Storage`]: [`LocalFileStorage`]
//! keeps files under a data directory, [`BlobStorage`] keeps them in a
//! remote blob store. Entries are plain text files named `<id>.txt`; images
//! are named `<id>.<ext>`. Listings are linear and ordered newest first by
//! the numeric timestamp in the name.

pub mod blob;
pub mod entry;
pub mod local;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::StorageConfig;

pub use blob::BlobStorage;
pub use local::LocalFileStorage;

pub const ENTRY_CONTENT_TYPE: &str = "text/plain; charset=utf-8";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{0}")]
    NotFound(String),

    #[error("Invalid file name: {0}")]
    InvalidName(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Blob API returned {status}: {body}")]
    Upstream { status: u16, body: String },
}

pub struct NewEntry {
    pub id: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

pub struct NewImage {
    pub id: String,
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
    pub extension: Option<String>,
}

/// Name under which an object was stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedObject {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryContent {
    pub content: String,
    pub content_type: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub id: String,
    pub url: String,
}

#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub limit: Option<usize>,
    pub prefix: Option<String>,
}

#[async_trait]
pub trait Storage: Send + Sync {
    /// `local` or `blob`
    fn kind(&self) -> &'static str;

    async fn save_entry(&self, entry: NewEntry) -> Result<SavedObject, StorageError>;

    async fn get_entry(&self, id: &str) -> Result<EntryContent, StorageError>;

    async fn list_entries(&self, query: ListQuery) -> Result<Vec<Entry>, StorageError>;

    async fn save_image(&self, image: NewImage) -> Result<SavedObject, StorageError>;

    async fn get_image_url(&self, id: &str) -> Result<String, StorageError>;

    async fn list_images(&self, query: ListQuery) -> Result<Vec<ImageRef>, StorageError>;

    /// Removes the entry and the image referenced by its metadata block.
    /// Absent entries or images are not an error.
    async fn delete_entry(&self, id: &str) -> Result<(), StorageError>;
}

/// Builds the backend selected by configuration.
pub fn from_config(config: &StorageConfig) -> Result<Arc<dyn Storage>, StorageError> {
    match config {
        StorageConfig::Local { data_dir } => Ok(Arc::new(LocalFileStorage::new(data_dir)?)),
        StorageConfig::Blob { token, prefix, api_url } => Ok(Arc::new(BlobStorage::new(
            token.clone(),
            prefix.clone(),
            api_url.clone(),
        ))),
    }
}
