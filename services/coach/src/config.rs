use async_openai::config::OpenAIConfig;
use englishly_core::{
    SessionSettings,
    prompts::StagePrompts,
    session::{DEFAULT_REPORT_BUCKET, DEFAULT_REPORT_KEY_PREFIX},
    storage::{HttpReportStore, LocalReportStore, ReportStore},
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Defines the supported OpenAI-compatible chat providers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Provider {
    OpenAI,
    Gemini,
}

/// Where finished reports are written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReportStoreKind {
    /// A directory on the local filesystem.
    Local,
    /// An S3-compatible object store reached over HTTP.
    Http,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub provider: Provider,
    pub openai_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
    pub chat_model: String,
    pub log_level: Level,
    pub prompts_path: Option<PathBuf>,
    pub report_bucket: String,
    pub report_key_prefix: String,
    pub report_store: ReportStoreKind,
    pub report_dir: PathBuf,
    pub report_store_url: Option<String>,
    pub report_store_token: Option<String>,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let provider_str =
            std::env::var("REALTIME_PROVIDER").unwrap_or_else(|_| "openai".to_string());
        let provider = match provider_str.to_lowercase().as_str() {
            "gemini" => Provider::Gemini,
            _ => Provider::OpenAI,
        };

        let openai_api_key = std::env::var("OPENAI_API_KEY").ok();
        let gemini_api_key = std::env::var("GEMINI_API_KEY").ok();

        let chat_model =
            std::env::var("CHAT_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let prompts_path = std::env::var("PROMPTS_PATH").ok().map(PathBuf::from);

        let report_bucket =
            std::env::var("REPORT_BUCKET").unwrap_or_else(|_| DEFAULT_REPORT_BUCKET.to_string());
        let report_key_prefix = std::env::var("REPORT_KEY_PREFIX")
            .unwrap_or_else(|_| DEFAULT_REPORT_KEY_PREFIX.to_string());

        let report_store_str =
            std::env::var("REPORT_STORE").unwrap_or_else(|_| "local".to_string());
        let report_store = match report_store_str.to_lowercase().as_str() {
            "local" => ReportStoreKind::Local,
            "http" => ReportStoreKind::Http,
            other => {
                return Err(ConfigError::InvalidValue(
                    "REPORT_STORE".to_string(),
                    format!("'{}' is not one of 'local' or 'http'", other),
                ));
            }
        };
        let report_dir = std::env::var("REPORT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./reports"));
        let report_store_url = std::env::var("REPORT_STORE_URL").ok();
        let report_store_token = std::env::var("REPORT_STORE_TOKEN").ok();

        if report_store == ReportStoreKind::Http && report_store_url.is_none() {
            return Err(ConfigError::MissingVar(
                "REPORT_STORE_URL must be set for the 'http' report store".to_string(),
            ));
        }

        match provider {
            Provider::OpenAI => {
                if openai_api_key.is_none() {
                    return Err(ConfigError::MissingVar(
                        "OPENAI_API_KEY must be set for 'openai' provider".to_string(),
                    ));
                }
            }
            Provider::Gemini => {
                if gemini_api_key.is_none() {
                    return Err(ConfigError::MissingVar(
                        "GEMINI_API_KEY must be set for 'gemini' provider".to_string(),
                    ));
                }
            }
        }

        Ok(Self {
            provider,
            openai_api_key,
            gemini_api_key,
            chat_model,
            log_level,
            prompts_path,
            report_bucket,
            report_key_prefix,
            report_store,
            report_dir,
            report_store_url,
            report_store_token,
        })
    }

    /// The client configuration for the selected provider's OpenAI-compatible endpoint.
    pub fn openai_config(&self) -> OpenAIConfig {
        match self.provider {
            Provider::OpenAI => OpenAIConfig::new()
                .with_api_key(self.openai_api_key.clone().unwrap_or_default())
                .with_api_base("https://api.openai.com/v1"),
            Provider::Gemini => OpenAIConfig::new()
                .with_api_key(self.gemini_api_key.clone().unwrap_or_default())
                .with_api_base("https://generativelanguage.googleapis.com/v1beta/openai"),
        }
    }

    pub fn report_store(&self) -> Arc<dyn ReportStore> {
        match (&self.report_store, &self.report_store_url) {
            (ReportStoreKind::Http, Some(url)) => Arc::new(HttpReportStore::new(
                url.clone(),
                self.report_store_token.clone(),
            )),
            _ => Arc::new(LocalReportStore::new(self.report_dir.clone())),
        }
    }

    /// Session settings, with stage prompts loaded from `prompts_path` when set.
    pub fn session_settings(&self) -> anyhow::Result<SessionSettings> {
        let prompts = match &self.prompts_path {
            Some(path) => StagePrompts::from_dir(path)?,
            None => StagePrompts::default(),
        };
        Ok(SessionSettings {
            prompts: Arc::new(prompts),
            report_bucket: self.report_bucket.clone(),
            report_key_prefix: self.report_key_prefix.clone(),
        })
    }
}
