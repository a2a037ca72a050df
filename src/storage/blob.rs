use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use super::entry::{
    entry_filename, extract_image_url, image_filename, image_filename_from_url, sort_entry_names,
    sort_image_names,
};
use super::{
    Entry, EntryContent, ImageRef, ListQuery, NewEntry, NewImage, SavedObject, Storage, StorageError,
    ENTRY_CONTENT_TYPE,
};

const API_VERSION: &str = "7";

/// Remote blob-store backend. Keys are `<prefix><entries|images>/<filename>`.
pub struct BlobStorage {
    client: Client,
    token: String,
    prefix: String,
    api_url: String,
}

#[derive(Debug, Clone, Deserialize)]
struct BlobObject {
    url: String,
    pathname: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListResponse {
    #[serde(default)]
    blobs: Vec<BlobObject>,
    cursor: Option<String>,
    #[serde(default)]
    has_more: bool,
}

#[derive(Clone, Copy)]
enum Kind {
    Entries,
    Images,
}

impl Kind {
    fn as_str(self) -> &'static str {
        match self {
            Kind::Entries => "entries",
            Kind::Images => "images",
        }
    }
}

impl BlobStorage {
    pub fn new(token: String, prefix: String, api_url: String) -> Self {
        Self {
            client: Client::new(),
            token,
            prefix: crate::config::normalize_prefix(&prefix),
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    fn build_key(&self, kind: Kind, filename: &str) -> String {
        format!("{}{}/{}", self.prefix, kind.as_str(), filename)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, StorageError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(StorageError::Upstream {
            status: status.as_u16(),
            body,
        })
    }

    async fn put(&self, key: &str, body: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
        let response = self
            .client
            .put(format!("{}/{}", self.api_url, key))
            .bearer_auth(&self.token)
            .header("x-api-version", API_VERSION)
            .header("x-content-type", content_type)
            .header("x-add-random-suffix", "0")
            .header("x-allow-overwrite", "1")
            .body(body)
            .send()
            .await?;
        Self::check(response).await?;
        debug!("Uploaded blob {}", key);
        Ok(())
    }

    /// Lists every blob under `prefix`, following pagination cursors.
    async fn list(&self, prefix: &str) -> Result<Vec<BlobObject>, StorageError> {
        let mut blobs = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(&self.api_url)
                .bearer_auth(&self.token)
                .header("x-api-version", API_VERSION)
                .query(&[("prefix", prefix)]);
            if let Some(c) = &cursor {
                request = request.query(&[("cursor", c.as_str())]);
            }

            let page: ListResponse = Self::check(request.send().await?).await?.json().await?;
            blobs.extend(page.blobs);

            match page.cursor {
                Some(next) if page.has_more => cursor = Some(next),
                _ => break,
            }
        }

        Ok(blobs)
    }

    async fn del(&self, urls: Vec<String>) -> Result<(), StorageError> {
        let response = self
            .client
            .post(format!("{}/delete", self.api_url))
            .bearer_auth(&self.token)
            .header("x-api-version", API_VERSION)
            .json(&json!({ "urls": urls }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn fetch_text(&self, url: &str) -> Result<String, StorageError> {
        let response = Self::check(self.client.get(url).send().await?).await?;
        Ok(response.text().await?)
    }

    /// The blob stored under exactly `key`, else the first one sharing the prefix.
    async fn find(&self, key: &str) -> Result<Option<BlobObject>, StorageError> {
        let blobs = self.list(key).await?;
        let exact = blobs.iter().find(|b| b.pathname == key).cloned();
        Ok(exact.or_else(|| blobs.into_iter().next()))
    }

    fn filename_of(blob: &BlobObject) -> String {
        blob.pathname.rsplit('/').next().unwrap_or_default().to_string()
    }

    async fn delete_image_by_url(&self, image_url: &str) -> Result<(), StorageError> {
        if image_url.starts_with("http://") || image_url.starts_with("https://") {
            return self.del(vec![image_url.to_string()]).await;
        }

        if let Some(filename) = image_filename_from_url(image_url) {
            if let Some(blob) = self.find(&self.build_key(Kind::Images, &filename)).await? {
                self.del(vec![blob.url]).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Storage for BlobStorage {
    fn kind(&self) -> &'static str {
        "blob"
    }

    async fn save_entry(&self, entry: NewEntry) -> Result<SavedObject, StorageError> {
        let filename = entry_filename(&entry.id);
        let key = self.build_key(Kind::Entries, &filename);
        self.put(&key, entry.content.into_bytes(), ENTRY_CONTENT_TYPE).await?;
        Ok(SavedObject { id: filename })
    }

    async fn get_entry(&self, id: &str) -> Result<EntryContent, StorageError> {
        let filename = entry_filename(id);
        let blob = self
            .find(&self.build_key(Kind::Entries, &filename))
            .await?
            .ok_or_else(|| StorageError::NotFound(format!("Entry not found: {}", filename)))?;

        Ok(EntryContent {
            content: self.fetch_text(&blob.url).await?,
            content_type: ENTRY_CONTENT_TYPE,
        })
    }

    async fn list_entries(&self, query: ListQuery) -> Result<Vec<Entry>, StorageError> {
        let prefix = self.build_key(Kind::Entries, query.prefix.as_deref().unwrap_or(""));
        let mut items: Vec<(String, String)> = self
            .list(&prefix)
            .await?
            .iter()
            .map(|b| (Self::filename_of(b), b.url.clone()))
            .collect();
        sort_entry_names(&mut items, |(name, _)| name.as_str());
        if let Some(limit) = query.limit {
            items.truncate(limit);
        }

        // Bodies are loaded so both backends return the same shape.
        let mut entries = Vec::with_capacity(items.len());
        for (id, url) in items {
            let content = self.fetch_text(&url).await?;
            entries.push(Entry { id, content });
        }
        Ok(entries)
    }

    async fn save_image(&self, image: NewImage) -> Result<SavedObject, StorageError> {
        let filename = image_filename(&image.id, None, image.extension.as_deref());
        let key = self.build_key(Kind::Images, &filename);
        let content_type = image
            .content_type
            .unwrap_or_else(|| "application/octet-stream".to_string());
        self.put(&key, image.bytes, &content_type).await?;
        Ok(SavedObject { id: filename })
    }

    async fn get_image_url(&self, id: &str) -> Result<String, StorageError> {
        let filename = if id.contains('.') {
            id.to_string()
        } else {
            format!("{}.png", id)
        };
        self.find(&self.build_key(Kind::Images, &filename))
            .await?
            .map(|blob| blob.url)
            .ok_or_else(|| StorageError::NotFound(format!("Image not found: {}", filename)))
    }

    async fn list_images(&self, query: ListQuery) -> Result<Vec<ImageRef>, StorageError> {
        let prefix = self.build_key(Kind::Images, query.prefix.as_deref().unwrap_or(""));
        let mut images: Vec<ImageRef> = self
            .list(&prefix)
            .await?
            .iter()
            .map(|b| ImageRef {
                id: Self::filename_of(b),
                url: b.url.clone(),
            })
            .collect();
        sort_image_names(&mut images, |img| img.id.as_str());
        if let Some(limit) = query.limit {
            images.truncate(limit);
        }
        Ok(images)
    }

    /// Best-effort: failures along the way are logged, never returned.
    async fn delete_entry(&self, id: &str) -> Result<(), StorageError> {
        let filename = entry_filename(id);
        let key = self.build_key(Kind::Entries, &filename);

        let entry_blob = match self.find(&key).await {
            Ok(found) => found,
            Err(e) => {
                warn!("Listing entry {} for delete failed: {}", filename, e);
                None
            }
        };

        let mut image_url = None;
        if let Some(blob) = &entry_blob {
            match self.fetch_text(&blob.url).await {
                Ok(content) => image_url = extract_image_url(&content),
                Err(e) => warn!("Reading entry {} before delete failed: {}", filename, e),
            }
            match self.del(vec![blob.url.clone()]).await {
                Ok(()) => info!("Deleted entry blob {}", key),
                Err(e) => warn!("Deleting entry blob {} failed: {}", key, e),
            }
        }

        if let Some(url) = image_url {
            if let Err(e) = self.delete_image_by_url(&url).await {
                warn!("Deleting image {} of entry {} failed: {}", url, filename, e);
            }
        }

        Ok(())
    }
}
