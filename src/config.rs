// src/config.rs

//! Configuration loading for the binaries.
//!
//! Settings are read once at startup: the TOML configuration, the
//! `TELEGRAM_BOT_TOKEN` override and the optional locale file it names.

use std::path::Path;

use crate::error::{AppError, Result};
use crate::locale::Locales;
use crate::models::Config;

#[cfg(feature = "s3")]
use crate::storage::S3Storage;

/// Everything a run reads before it starts.
#[derive(Debug, Clone)]
pub struct Settings {
    pub config: Config,
    pub locales: Locales,
}

impl Settings {
    /// Validate configuration and locales together.
    pub fn validate(&self) -> Result<()> {
        self.config.validate()?;
        self.locales.validate()
    }
}

/// Load settings from a storage directory.
///
/// `config_path` defaults to `{storage_dir}/config.toml`. An explicitly given
/// file must exist; a missing default file falls back to built-in defaults.
/// The locale file is resolved relative to the storage directory.
pub fn load_local(storage_dir: &Path, config_path: Option<&Path>) -> Result<Settings> {
    let mut config = match config_path {
        Some(path) => Config::load(path)
            .map_err(|e| AppError::config(format!("Failed to load {}: {e}", path.display())))?,
        None => Config::load_or_default(storage_dir.join("config.toml")),
    };
    config.apply_env();

    let locale_path = config
        .notify
        .locale_file
        .as_deref()
        .map(|file| storage_dir.join(file));
    let locales = Locales::load_or_builtin(locale_path.as_deref(), &config.notify.default_language);

    Ok(Settings { config, locales })
}

/// Config loader for Lambda environment.
#[cfg(feature = "s3")]
pub struct S3ConfigLoader {
    storage: S3Storage,
    prefix: String,
}

#[cfg(feature = "s3")]
impl S3ConfigLoader {
    pub fn new(storage: S3Storage, config_prefix: &str) -> Self {
        Self {
            storage,
            prefix: config_prefix.trim_end_matches('/').to_string(),
        }
    }

    async fn read_text(&self, file_name: &str) -> Result<Option<String>> {
        let key = format!("{}/{}", self.prefix, file_name);
        log::info!("Loading config file from S3: {key}");
        let Some(bytes) = self.storage.read_bytes_optional(&key).await? else {
            return Ok(None);
        };
        String::from_utf8(bytes)
            .map(Some)
            .map_err(|e| AppError::config(format!("Config file {key} is not valid UTF-8: {e}")))
    }

    /// `config.toml` is required; the locale file is optional.
    pub async fn load(&self) -> Result<Settings> {
        let content = self.read_text("config.toml").await?.ok_or_else(|| {
            AppError::config(format!(
                "Config file not found in S3: {}/config.toml",
                self.prefix
            ))
        })?;
        let mut config = Config::from_toml(&content)?;
        config.apply_env();

        let default_language = config.notify.default_language.clone();
        let locales = match config.notify.locale_file.as_deref() {
            Some(file) => match self.read_text(file).await {
                Ok(Some(content)) => Locales::from_toml(&content, &default_language)?,
                Ok(None) => {
                    log::warn!("Locale file {file} not found in S3, using built-in templates");
                    Locales::builtin(&default_language)
                }
                Err(e) => return Err(e),
            },
            None => Locales::builtin(&default_language),
        };

        Ok(Settings { config, locales })
    }
}
