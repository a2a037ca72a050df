use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::{LangfuseClient, PromptError, PromptId, PromptTemplate};
use crate::config::{PromptConfig, PromptSourceKind};

#[async_trait]
pub trait PromptSource: Send + Sync {
    async fn get(&self, id: PromptId) -> Result<PromptTemplate, PromptError>;
}

/// Reads templates from a directory, one `.txt` file per catalog entry.
pub struct FilePromptSource {
    dir: PathBuf,
}

impl FilePromptSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_of(&self, id: PromptId) -> PathBuf {
        self.dir.join(id.file_name())
    }
}

#[async_trait]
impl PromptSource for FilePromptSource {
    async fn get(&self, id: PromptId) -> Result<PromptTemplate, PromptError> {
        let path = self.path_of(id);
        match tokio::fs::read_to_string(&path).await {
            Ok(text) => Ok(PromptTemplate::new(id.name(), text)),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(PromptError::NotFound(format!("{} ({})", id.name(), path.display())))
            }
            Err(source) => Err(PromptError::Io { name: id.name(), source }),
        }
    }
}

/// Keeps fetched templates for `ttl` before asking the inner source again.
pub struct CachedPromptSource {
    inner: Arc<dyn PromptSource>,
    ttl: Duration,
    entries: RwLock<HashMap<PromptId, (Instant, PromptTemplate)>>,
}

impl CachedPromptSource {
    pub fn new(inner: Arc<dyn PromptSource>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl PromptSource for CachedPromptSource {
    async fn get(&self, id: PromptId) -> Result<PromptTemplate, PromptError> {
        // Fast path: try read lock
        {
            let entries = self.entries.read().await;
            if let Some((fetched_at, template)) = entries.get(&id) {
                if fetched_at.elapsed() < self.ttl {
                    return Ok(template.clone());
                }
            }
        }

        let template = self.inner.get(id).await?;
        debug!("Cached prompt {}", template.name);

        {
            let mut entries = self.entries.write().await;
            entries.insert(id, (Instant::now(), template.clone()));
        }

        Ok(template)
    }
}

/// Builds the prompt source selected by configuration.
pub fn source_from_config(config: &PromptConfig) -> Result<Arc<dyn PromptSource>, PromptError> {
    match config.source {
        PromptSourceKind::File => {
            info!("Loading prompts from {}", config.dir.display());
            Ok(Arc::new(FilePromptSource::new(config.dir.clone())))
        }
        PromptSourceKind::Langfuse => {
            info!("Loading prompts from Langfuse at {}", config.langfuse.host);
            let client = LangfuseClient::from_config(&config.langfuse)?;
            Ok(Arc::new(CachedPromptSource::new(
                Arc::new(client),
                Duration::from_secs(config.cache_ttl_secs),
            )))
        }
    }
}
