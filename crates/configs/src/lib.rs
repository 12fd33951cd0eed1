//! # configs
//!
//! Layered runtime settings, lowest precedence first:
//!
//! 1. built-in defaults
//! 2. optional `config/wayfarer.toml`
//! 3. `.env` (loaded into the process environment by `dotenvy`)
//! 4. `WAYFARER__SECTION__KEY` environment variables
//!
//! API keys are held as [`SecretString`] so they never show up in `Debug`
//! output or logs.

use std::path::Path;

use config::{Config, Environment, File};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

#[cfg(feature = "telemetry")]
pub mod telemetry;

pub const DEFAULT_CONFIG_FILE: &str = "config/wayfarer.toml";
const ENV_PREFIX: &str = "WAYFARER";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid settings: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-process fakes; nothing leaves the machine.
    Memory,
    /// REST document store and OpenWeather.
    Http,
}

#[derive(Debug, Deserialize)]
pub struct AppSettings {
    /// Default `EnvFilter` directive; `RUST_LOG` overrides it.
    pub log_level: String,
    pub log_format: LogFormat,
}

#[derive(Debug, Deserialize)]
pub struct BackendSettings {
    pub kind: BackendKind,
    pub documents_url: Option<String>,
    pub api_key: Option<SecretString>,
}

#[derive(Debug, Deserialize)]
pub struct StorageSettings {
    /// Where `LocalObjectStore` writes images.
    pub root_dir: String,
    /// URL prefix handed out as download URLs.
    pub public_url: String,
}

#[derive(Debug, Deserialize)]
pub struct WeatherSettings {
    pub base_url: String,
    pub api_key: Option<SecretString>,
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: AppSettings,
    pub backend: BackendSettings,
    pub storage: StorageSettings,
    pub weather: WeatherSettings,
}

impl Settings {
    /// Loads `.env`, then the default file and environment.
    pub fn load() -> Result<Self, ConfigError> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env");
        }
        Self::load_from(Path::new(DEFAULT_CONFIG_FILE), None)
    }

    /// Loads from an explicit file (skipped if missing). `env` replaces the
    /// process environment when given, which keeps tests hermetic.
    pub fn load_from(
        file: &Path,
        env: Option<config::Map<String, String>>,
    ) -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder()
            .set_default("app.log_level", "info")?
            .set_default("app.log_format", "pretty")?
            .set_default("backend.kind", "memory")?
            .set_default("storage.root_dir", "./data/uploads")?
            .set_default("storage.public_url", "/static/uploads")?
            .set_default("weather.base_url", "https://api.openweathermap.org")?
            .add_source(File::from(file).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .source(env),
            )
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backend.kind == BackendKind::Http {
            let url = self.backend.documents_url.as_deref().unwrap_or("").trim();
            if url.is_empty() {
                return Err(ConfigError::Invalid(
                    "backend.documents_url is required when backend.kind = \"http\"".into(),
                ));
            }
        }
        if self.storage.root_dir.trim().is_empty() {
            return Err(ConfigError::Invalid("storage.root_dir must not be empty".into()));
        }
        Ok(())
    }

    /// The weather API key, treating an empty value as unset.
    pub fn weather_api_key(&self) -> Option<&str> {
        self.weather
            .api_key
            .as_ref()
            .map(|key| key.expose_secret())
            .filter(|key| !key.trim().is_empty())
    }

    pub fn backend_api_key(&self) -> Option<&str> {
        self.backend
            .api_key
            .as_ref()
            .map(|key| key.expose_secret())
            .filter(|key| !key.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> Option<config::Map<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn defaults_select_memory_backend() {
        let settings = Settings::load_from(Path::new("does/not/exist.toml"), env(&[])).unwrap();
        assert_eq!(settings.backend.kind, BackendKind::Memory);
        assert_eq!(settings.app.log_format, LogFormat::Pretty);
        assert_eq!(settings.app.log_level, "info");
        assert_eq!(settings.storage.public_url, "/static/uploads");
        assert!(settings.weather_api_key().is_none());
    }

    #[test]
    fn file_values_override_defaults() {
        let dir = tempfile::TempDir::new().expect("failed to create temp dir");
        let path = dir.path().join("wayfarer.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[app]\nlog_format = \"json\"\n\n[weather]\napi_key = \"abc123\"\n"
        )
        .unwrap();

        let settings = Settings::load_from(&path, env(&[])).unwrap();
        assert_eq!(settings.app.log_format, LogFormat::Json);
        assert_eq!(settings.weather_api_key(), Some("abc123"));
    }

    #[test]
    fn environment_overrides_file() {
        let settings = Settings::load_from(
            Path::new("does/not/exist.toml"),
            env(&[
                ("WAYFARER__BACKEND__KIND", "http"),
                ("WAYFARER__BACKEND__DOCUMENTS_URL", "https://db.test/v1"),
                ("WAYFARER__APP__LOG_LEVEL", "debug"),
            ]),
        )
        .unwrap();
        assert_eq!(settings.backend.kind, BackendKind::Http);
        assert_eq!(settings.backend.documents_url.as_deref(), Some("https://db.test/v1"));
        assert_eq!(settings.app.log_level, "debug");
    }

    #[test]
    fn http_backend_requires_url() {
        let err = Settings::load_from(
            Path::new("does/not/exist.toml"),
            env(&[("WAYFARER__BACKEND__KIND", "http")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("documents_url")));
    }

    #[test]
    fn secrets_are_redacted_in_debug_output() {
        let settings = Settings::load_from(
            Path::new("does/not/exist.toml"),
            env(&[("WAYFARER__BACKEND__API_KEY", "super-secret")]),
        )
        .unwrap();
        assert_eq!(settings.backend_api_key(), Some("super-secret"));
        assert!(!format!("{settings:?}").contains("super-secret"));
    }
}
