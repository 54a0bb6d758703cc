//! Configuration management for CityScope.
//!
//! Settings are read from `config.toml` in the data directory, with
//! environment overrides for credentials. The resulting [`Settings`] value
//! is constructed once at process start and passed by reference to the
//! components that need it.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::llm::GeminiConfig;

/// Default database filename inside the data directory.
pub const DEFAULT_DATABASE_FILENAME: &str = "cityscope.db";

/// Base URL of the City of London eScribe portal.
pub const DEFAULT_PORTAL_BASE_URL: &str = "https://pub-london.escribemeetings.com";

/// Config filename inside the data directory.
const CONFIG_FILENAME: &str = "config.toml";

fn default_portal_base_url() -> String {
    DEFAULT_PORTAL_BASE_URL.to_string()
}

fn default_meeting_pages() -> Vec<String> {
    vec![format!("{}/?MeetingViewId=1", DEFAULT_PORTAL_BASE_URL)]
}

fn default_database_filename() -> String {
    DEFAULT_DATABASE_FILENAME.to_string()
}

fn default_request_timeout() -> u64 {
    60
}

fn default_head_timeout() -> u64 {
    10
}

fn default_request_delay_ms() -> u64 {
    1000
}

/// Application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Base data directory.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Database filename inside the data directory.
    #[serde(default = "default_database_filename")]
    pub database_filename: String,
    /// Base URL of the meeting portal.
    #[serde(default = "default_portal_base_url")]
    pub portal_base_url: String,
    /// Portal pages scanned for document links.
    #[serde(default = "default_meeting_pages")]
    pub meeting_pages: Vec<String>,
    /// Document download timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    /// Filename (HEAD) request timeout in seconds.
    #[serde(default = "default_head_timeout")]
    pub head_timeout: u64,
    /// Delay between model calls in milliseconds.
    #[serde(default = "default_request_delay_ms")]
    pub request_delay_ms: u64,
    /// Generative model configuration.
    #[serde(default)]
    pub llm: GeminiConfig,
}

fn default_data_dir() -> PathBuf {
    // Falls back gracefully: Documents dir -> Home dir -> Current dir
    dirs::document_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("cityscope")
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            database_filename: default_database_filename(),
            portal_base_url: default_portal_base_url(),
            meeting_pages: default_meeting_pages(),
            request_timeout: default_request_timeout(),
            head_timeout: default_head_timeout(),
            request_delay_ms: default_request_delay_ms(),
            llm: GeminiConfig::default(),
        }
    }
}

impl Settings {
    /// Create settings with a custom data directory.
    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            data_dir,
            ..Default::default()
        }
    }

    /// Path to the SQLite database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(&self.database_filename)
    }

    /// File-stream URL for a document identifier.
    pub fn file_stream_url(&self, document_id: &str) -> String {
        file_stream_url(&self.portal_base_url, document_id)
    }
}

/// Build the portal file-stream URL for a document identifier.
pub fn file_stream_url(portal_base_url: &str, document_id: &str) -> String {
    format!(
        "{}/FileStream.ashx?DocumentId={}",
        portal_base_url.trim_end_matches('/'),
        document_id
    )
}

/// Load settings from the data directory's config file.
///
/// A missing config file yields defaults; the `GEMINI_API_KEY` environment
/// variable always overrides the configured key so credentials can stay out
/// of the file.
pub fn load_settings(data_dir: Option<PathBuf>) -> anyhow::Result<Settings> {
    let mut settings = match &data_dir {
        Some(dir) => Settings::with_data_dir(dir.clone()),
        None => Settings::default(),
    };

    let config_path = settings.data_dir.join(CONFIG_FILENAME);
    if config_path.exists() {
        let content = fs::read_to_string(&config_path)?;
        settings = toml::from_str(&content)?;
        // The command line wins over the file for the data dir itself.
        if let Some(dir) = data_dir {
            settings.data_dir = dir;
        }
    }

    if let Ok(key) = std::env::var("GEMINI_API_KEY") {
        if !key.is_empty() {
            settings.llm.api_key = key;
        }
    }

    Ok(settings)
}

/// Write a default config file if none exists yet. Returns the path.
pub fn write_default_config(data_dir: &Path) -> anyhow::Result<PathBuf> {
    let config_path = data_dir.join(CONFIG_FILENAME);
    if !config_path.exists() {
        let settings = Settings::with_data_dir(data_dir.to_path_buf());
        fs::write(&config_path, toml::to_string_pretty(&settings)?)?;
    }
    Ok(config_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.database_filename, "cityscope.db");
        assert!(settings.portal_base_url.contains("escribemeetings"));
        assert_eq!(settings.meeting_pages.len(), 1);
    }

    #[test]
    fn test_file_stream_url() {
        assert_eq!(
            file_stream_url("https://pub-london.escribemeetings.com", "12345"),
            "https://pub-london.escribemeetings.com/FileStream.ashx?DocumentId=12345"
        );
        // Trailing slash is normalized away
        assert_eq!(
            file_stream_url("https://pub-london.escribemeetings.com/", "7"),
            "https://pub-london.escribemeetings.com/FileStream.ashx?DocumentId=7"
        );
    }

    #[test]
    fn test_settings_roundtrip() {
        let settings = Settings::default();
        let serialized = toml::to_string_pretty(&settings).unwrap();
        let parsed: Settings = toml::from_str(&serialized).unwrap();
        assert_eq!(parsed.portal_base_url, settings.portal_base_url);
        assert_eq!(parsed.request_timeout, settings.request_timeout);
    }
}
