use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, info, warn};

use super::entry::{
    entry_filename, extract_image_url, image_filename, image_filename_from_url, is_contained_name,
    serve_url, sort_entry_names, sort_image_names,
};
use super::{
    Entry, EntryContent, ImageRef, ListQuery, NewEntry, NewImage, SavedObject, Storage, StorageError,
    ENTRY_CONTENT_TYPE,
};

/// Filesystem backend rooted at a data directory with `entries/` and `images/` inside.
pub struct LocalFileStorage {
    data_dir: PathBuf,
    entries_dir: PathBuf,
    images_dir: PathBuf,
}

impl LocalFileStorage {
    /// Creates the directory layout if it does not exist yet.
    pub fn new(data_dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let data_dir = data_dir.as_ref().to_path_buf();
        let entries_dir = data_dir.join("entries");
        let images_dir = data_dir.join("images");

        std::fs::create_dir_all(&entries_dir)?;
        std::fs::create_dir_all(&images_dir)?;

        info!("Local storage ready at {}", data_dir.display());
        Ok(Self {
            data_dir,
            entries_dir,
            images_dir,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }

    fn entry_path(&self, id: &str) -> Result<(String, PathBuf), StorageError> {
        let filename = entry_filename(id);
        if !is_contained_name(&filename) {
            return Err(StorageError::InvalidName(filename));
        }
        let path = self.entries_dir.join(&filename);
        Ok((filename, path))
    }

    /// Path of an image inside `images/`; names escaping the directory are refused.
    pub fn image_path(&self, filename: &str) -> Result<PathBuf, StorageError> {
        if !is_contained_name(filename) {
            return Err(StorageError::InvalidName(filename.to_string()));
        }
        Ok(self.images_dir.join(filename))
    }

    async fn file_names(dir: &Path) -> Result<Vec<String>, StorageError> {
        let mut names = Vec::new();
        let mut reader = fs::read_dir(dir).await?;
        while let Some(item) = reader.next_entry().await? {
            if let Ok(name) = item.file_name().into_string() {
                names.push(name);
            }
        }
        Ok(names)
    }
}

/// Reads an entry body, replacing invalid UTF-8 rather than failing.
async fn read_text(path: &Path) -> std::io::Result<String> {
    let bytes = fs::read(path).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Writes through a sibling `.tmp` file so readers never see a partial file.
async fn write_atomic(target: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let mut tmp = target.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    fs::write(&tmp, bytes).await?;
    fs::rename(&tmp, target).await?;
    Ok(())
}

#[async_trait]
impl Storage for LocalFileStorage {
    fn kind(&self) -> &'static str {
        "local"
    }

    async fn save_entry(&self, entry: NewEntry) -> Result<SavedObject, StorageError> {
        let (filename, path) = self.entry_path(&entry.id)?;
        write_atomic(&path, entry.content.as_bytes()).await?;
        debug!("Saved entry {} (created {})", filename, entry.created_at);
        Ok(SavedObject { id: filename })
    }

    async fn get_entry(&self, id: &str) -> Result<EntryContent, StorageError> {
        let (filename, path) = self.entry_path(id)?;
        match read_text(&path).await {
            Ok(content) => Ok(EntryContent {
                content,
                content_type: ENTRY_CONTENT_TYPE,
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(StorageError::NotFound(format!("Entry not found: {}", filename)))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn list_entries(&self, query: ListQuery) -> Result<Vec<Entry>, StorageError> {
        let mut names: Vec<String> = Self::file_names(&self.entries_dir)
            .await?
            .into_iter()
            .filter(|name| name.ends_with(".txt"))
            .filter(|name| query.prefix.as_deref().map_or(true, |p| name.starts_with(p)))
            .collect();
        sort_entry_names(&mut names, |n| n.as_str());
        if let Some(limit) = query.limit {
            names.truncate(limit);
        }

        let mut entries = Vec::with_capacity(names.len());
        for name in names {
            let content = read_text(&self.entries_dir.join(&name)).await?;
            entries.push(Entry { id: name, content });
        }
        Ok(entries)
    }

    async fn save_image(&self, image: NewImage) -> Result<SavedObject, StorageError> {
        let filename = image_filename(&image.id, image.content_type.as_deref(), image.extension.as_deref());
        let path = self.image_path(&filename)?;
        write_atomic(&path, &image.bytes).await?;
        debug!("Saved image {} ({} bytes)", filename, image.bytes.len());
        Ok(SavedObject { id: filename })
    }

    async fn get_image_url(&self, id: &str) -> Result<String, StorageError> {
        if id.contains('.') {
            return Ok(serve_url(id));
        }

        let stem = format!("{}.", id);
        let found = Self::file_names(&self.images_dir)
            .await?
            .into_iter()
            .find(|name| name.starts_with(&stem) && !name.ends_with(".tmp"));

        Ok(match found {
            Some(name) => serve_url(&name),
            None => serve_url(&format!("{}.png", id)),
        })
    }

    async fn list_images(&self, query: ListQuery) -> Result<Vec<ImageRef>, StorageError> {
        let mut names: Vec<String> = Self::file_names(&self.images_dir)
            .await?
            .into_iter()
            .filter(|name| query.prefix.as_deref().map_or(true, |p| name.starts_with(p)))
            .collect();
        sort_image_names(&mut names, |n| n.as_str());
        if let Some(limit) = query.limit {
            names.truncate(limit);
        }

        Ok(names
            .into_iter()
            .map(|name| ImageRef {
                url: format!("/images/{}", name),
                id: name,
            })
            .collect())
    }

    async fn delete_entry(&self, id: &str) -> Result<(), StorageError> {
        let (filename, path) = self.entry_path(id)?;

        // A missing or unreadable entry still proceeds to the unlink.
        let image_url = match read_text(&path).await {
            Ok(content) => extract_image_url(&content),
            Err(e) => {
                if e.kind() != ErrorKind::NotFound {
                    warn!("Could not read entry {} before delete: {}", filename, e);
                }
                None
            }
        };

        match fs::remove_file(&path).await {
            Ok(()) => info!("Deleted entry {}", filename),
            Err(e) if e.kind() == ErrorKind::NotFound => debug!("Entry {} already absent", filename),
            Err(e) => return Err(e.into()),
        }

        let Some(image_name) = image_url.as_deref().and_then(image_filename_from_url) else {
            return Ok(());
        };
        match self.image_path(&image_name) {
            Ok(image_path) => match fs::remove_file(&image_path).await {
                Ok(()) => info!("Deleted image {} of entry {}", image_name, filename),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!("Could not delete image {}: {}", image_name, e),
            },
            Err(_) => warn!("Entry {} references image outside images dir: {}", filename, image_name),
        }

        Ok(())
    }
}
