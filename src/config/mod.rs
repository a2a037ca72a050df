use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("BLOB_OR_LOCAL env var must be set to \"local\" or \"blob\".")]
    StorageModeMissing,

    #[error("Unknown storage provider: {0}. Expected \"local\" or \"blob\".")]
    UnknownStorageMode(String),

    #[error("Unsupported IMAGE_GENERATION_SERVICE: {0}. Expected \"OPENAI\" or \"RECRAFT\".")]
    UnknownImageService(String),

    #[error("Invalid value for {var}: {value}")]
    Invalid { var: &'static str, value: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub security: SecurityConfig,
    pub storage: StorageConfig,
    pub llm: LlmConfig,
    pub images: ImageConfig,
    pub prompts: PromptConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(skip_serializing)]
    pub jwt_secret: String,
    #[serde(skip_serializing)]
    pub auth_password: String,
    pub jwt_expiry_hours: u64,
    /// `*` alone means any origin.
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum StorageConfig {
    Local {
        data_dir: PathBuf,
    },
    Blob {
        #[serde(skip_serializing)]
        token: String,
        prefix: String,
        api_url: String,
    },
}

impl StorageConfig {
    pub fn mode(&self) -> &'static str {
        match self {
            StorageConfig::Local { .. } => "local",
            StorageConfig::Blob { .. } => "blob",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(skip_serializing)]
    pub openrouter_api_key: Option<String>,
    pub openrouter_base_url: String,
    pub question_model: String,
    pub image_idea_model: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ImageServiceKind {
    OpenAi,
    Recraft,
}

impl ImageServiceKind {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "OPENAI" => Some(ImageServiceKind::OpenAi),
            "RECRAFT" => Some(ImageServiceKind::Recraft),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    /// Raw `IMAGE_GENERATION_SERVICE` value; validated when an image is requested.
    pub service: Option<String>,
    #[serde(skip_serializing)]
    pub openai_api_key: Option<String>,
    pub openai_image_model: Option<String>,
    pub openai_base_url: String,
    #[serde(skip_serializing)]
    pub recraft_api_key: Option<String>,
    pub recraft_image_model: Option<String>,
    pub recraft_base_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptSourceKind {
    File,
    Langfuse,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    pub source: PromptSourceKind,
    pub dir: PathBuf,
    pub langfuse: LangfuseConfig,
    pub cache_ttl_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LangfuseConfig {
    pub host: String,
    pub public_key: Option<String>,
    #[serde(skip_serializing)]
    pub secret_key: Option<String>,
}

pub const DEFAULT_QUESTION_MODEL: &str = "google/gemini-2.5-flash-lite-preview-06-17";
pub const DEFAULT_BLOB_API_URL: &str = "https://blob.vercel-storage.com";
pub const DEFAULT_OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_RECRAFT_BASE_URL: &str = "https://external.api.recraft.ai/v1";
pub const DEFAULT_LANGFUSE_HOST: &str = "https://cloud.langfuse.com";

/// Reads a variable, treating empty strings as unset.
fn var(name: &str) -> Option<String> {
    env::var(name).ok().map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    var(name).ok_or(ConfigError::Missing(name))
}

fn parse_var<T: std::str::FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match var(name) {
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::Invalid { var: name, value: raw }),
        None => Ok(None),
    }
}

/// Longest accepted token lifetime: ten years.
pub const MAX_JWT_EXPIRY_HOURS: u64 = 24 * 365 * 10;

fn checked_expiry_hours(hours: u64) -> Result<u64, ConfigError> {
    if hours == 0 || hours > MAX_JWT_EXPIRY_HOURS {
        return Err(ConfigError::Invalid {
            var: "JWT_EXPIRY_HOURS",
            value: hours.to_string(),
        });
    }
    Ok(hours)
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let environment = match var("APP_ENV").as_deref() {
            Some("production") | Some("prod") => Environment::Production,
            Some("staging") | Some("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        let storage = StorageConfig::from_env()?;
        let security = SecurityConfig {
            jwt_secret: required("JWT_SECRET")?,
            auth_password: required("AUTH_PASSWORD")?,
            ..SecurityConfig::preset(environment)
        };

        Self {
            environment,
            server: ServerConfig { port: 3000 },
            security,
            storage,
            llm: LlmConfig {
                openrouter_api_key: None,
                openrouter_base_url: DEFAULT_OPENROUTER_BASE_URL.to_string(),
                question_model: DEFAULT_QUESTION_MODEL.to_string(),
                image_idea_model: None,
            },
            images: ImageConfig {
                service: None,
                openai_api_key: None,
                openai_image_model: None,
                openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
                recraft_api_key: None,
                recraft_image_model: None,
                recraft_base_url: DEFAULT_RECRAFT_BASE_URL.to_string(),
            },
            prompts: PromptConfig::from_env()?,
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        // Server
        if let Some(port) = parse_var::<u16>("JOURNAL_API_PORT")? {
            self.server.port = port;
        } else if let Some(port) = parse_var::<u16>("PORT")? {
            self.server.port = port;
        }

        // Security
        if let Some(hours) = parse_var("JWT_EXPIRY_HOURS")? {
            self.security.jwt_expiry_hours = checked_expiry_hours(hours)?;
        }
        if let Some(v) = var("CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        // LLM
        self.llm.openrouter_api_key = var("OPENROUTER_API_KEY");
        self.llm.image_idea_model = var("IMAGE_IDEA_MODEL");
        if let Some(v) = var("OPENROUTER_BASE_URL") {
            self.llm.openrouter_base_url = v;
        }
        if let Some(v) = var("QUESTION_MODEL") {
            self.llm.question_model = v;
        }

        // Images
        self.images.service = var("IMAGE_GENERATION_SERVICE");
        self.images.openai_api_key = var("OPENAI_API_KEY");
        self.images.openai_image_model = var("OPENAI_IMAGE_MODEL");
        self.images.recraft_api_key = var("RECRAFT_API_KEY");
        self.images.recraft_image_model = var("RECRAFT_IMAGE_MODEL");
        if let Some(v) = var("OPENAI_BASE_URL") {
            self.images.openai_base_url = v;
        }
        if let Some(v) = var("RECRAFT_BASE_URL") {
            self.images.recraft_base_url = v;
        }

        Ok(self)
    }
}

impl PromptConfig {
    /// Prompt settings alone; the `prompts` CLI needs nothing else.
    pub fn from_env() -> Result<Self, ConfigError> {
        let source = match var("PROMPT_SOURCE") {
            None => PromptSourceKind::File,
            Some(v) => match v.to_lowercase().as_str() {
                "file" | "files" => PromptSourceKind::File,
                "langfuse" => PromptSourceKind::Langfuse,
                _ => return Err(ConfigError::Invalid { var: "PROMPT_SOURCE", value: v }),
            },
        };

        Ok(Self {
            source,
            dir: var("PROMPTS_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("prompts")),
            langfuse: LangfuseConfig {
                host: var("LANGFUSE_HOST").unwrap_or_else(|| DEFAULT_LANGFUSE_HOST.to_string()),
                public_key: var("LANGFUSE_PUBLIC_KEY"),
                secret_key: var("LANGFUSE_SECRET_KEY"),
            },
            cache_ttl_secs: parse_var("LANGFUSE_CACHE_TTL_SECS")?.unwrap_or(60),
        })
    }
}

impl SecurityConfig {
    fn preset(environment: Environment) -> Self {
        let cors_origins = match environment {
            Environment::Development => vec!["*".to_string()],
            Environment::Staging | Environment::Production => Vec::new(),
        };

        Self {
            jwt_secret: String::new(),
            auth_password: String::new(),
            jwt_expiry_hours: 24,
            cors_origins,
        }
    }
}

impl StorageConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let mode = var("BLOB_OR_LOCAL").ok_or(ConfigError::StorageModeMissing)?;
        match mode.to_lowercase().as_str() {
            "local" => {
                let data_dir = required("DATA_DIR")?;
                let cwd = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
                Ok(StorageConfig::Local { data_dir: cwd.join(data_dir) })
            }
            "blob" => Ok(StorageConfig::Blob {
                token: required("BLOB_READ_WRITE_TOKEN")?,
                prefix: normalize_prefix(&required("BLOB_PREFIX")?),
                api_url: var("BLOB_API_URL").unwrap_or_else(|| DEFAULT_BLOB_API_URL.to_string()),
            }),
            other => Err(ConfigError::UnknownStorageMode(other.to_string())),
        }
    }
}

/// Blob key prefixes always end with a single `/`.
pub fn normalize_prefix(prefix: &str) -> String {
    if prefix.ends_with('/') {
        prefix.to_string()
    } else {
        format!("{}/", prefix)
    }
}
