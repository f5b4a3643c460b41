//! Configuration management for evharvest using the prefer crate.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

pub use crate::extract::ExtractionConfig;
pub use crate::render::BrowserConfig;
use crate::storage::FilenameEncoding;

/// Default store directory, relative to the config file or the working directory.
pub const DEFAULT_STORE_DIR: &str = ".";

/// Document naming options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingConfig {
    /// Extension appended to every document name, without the dot.
    #[serde(default = "default_extension")]
    pub extension: String,
    /// Character repertoire document names are reduced to.
    #[serde(default)]
    pub encoding: FilenameEncoding,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            extension: default_extension(),
            encoding: FilenameEncoding::default(),
        }
    }
}

fn default_extension() -> String {
    "md".to_string()
}

/// Configuration file structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding `new/`, `updated/` and `archive/`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_dir: Option<String>,
    #[serde(default)]
    pub browser: BrowserConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub naming: NamingConfig,
    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from `explicit`, or discover it with prefer.
    ///
    /// An explicit path must load. A discovered file that fails to parse is
    /// reported and defaults are used instead.
    pub async fn load(explicit: Option<&Path>) -> Result<Self, String> {
        if let Some(path) = explicit {
            return Self::load_from_path(path).await;
        }

        match prefer::load("evharvest").await {
            Ok(pref_config) => match pref_config.source_path() {
                Some(path) => match Self::load_from_path(path).await {
                    Ok(config) => Ok(config),
                    Err(e) => {
                        warn!("Ignoring {}: {}", path.display(), e);
                        Ok(Self::default())
                    }
                },
                None => Ok(Self::default()),
            },
            Err(e) => {
                debug!("No config file found: {}", e);
                Ok(Self::default())
            }
        }
    }

    /// Load configuration from a specific file path.
    /// Supports JSON, TOML and YAML based on file extension.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file {}: {}", path.display(), e))?;

        let mut config = Self::parse(&contents, path)?;
        config.source_path = Some(path.to_path_buf());
        Ok(config)
    }

    fn parse(contents: &str, path: &Path) -> Result<Self, String> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

        match ext {
            "toml" => {
                toml::from_str(contents).map_err(|e| format!("Failed to parse TOML config: {}", e))
            }
            "yaml" | "yml" => serde_yaml::from_str(contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e)),
            _ => serde_json::from_str(contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e)),
        }
    }

    /// Get the base directory for resolving relative paths.
    /// Returns the config file's parent directory if available, otherwise None.
    pub fn base_dir(&self) -> Option<PathBuf> {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    /// Resolve a path that may be relative to the config file.
    /// - Absolute paths are returned as-is
    /// - Paths starting with ~ are expanded
    /// - Relative paths are resolved relative to `base_dir`
    pub fn resolve_path(&self, path_str: &str, base_dir: &Path) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            base_dir.join(path)
        }
    }

    /// Store root: `store_dir` resolved against the config file's directory,
    /// or against `cwd` when no file was loaded.
    pub fn store_root(&self, cwd: &Path) -> PathBuf {
        let base = self.base_dir().unwrap_or_else(|| cwd.to_path_buf());
        self.resolve_path(
            self.store_dir.as_deref().unwrap_or(DEFAULT_STORE_DIR),
            &base,
        )
    }

    /// Chrome path from the file, resolved like any other path.
    pub fn resolved_browser(&self, cwd: &Path) -> BrowserConfig {
        let mut browser = self.browser.clone();
        if let Some(ref chrome) = browser.chrome_path {
            let base = self.base_dir().unwrap_or_else(|| cwd.to_path_buf());
            browser.chrome_path = Some(self.resolve_path(&chrome.to_string_lossy(), &base));
        }
        browser
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.naming.extension, "md");
        assert_eq!(config.naming.encoding, FilenameEncoding::Latin1);
        assert!(config.browser.headless);
        assert_eq!(config.browser.timeout, 30);
        assert_eq!(config.extraction.listing_marker, "actions_renderer");
        assert_eq!(config.store_root(Path::new("/work")), PathBuf::from("/work/."));
    }

    #[tokio::test]
    async fn test_load_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("evharvest.toml");
        std::fs::write(
            &path,
            r#"
store_dir = "site/content/events"

[browser]
headless = false
remote_url = "ws://localhost:9222"

[extraction]
marker_timeout_secs = 10

[naming]
encoding = "ascii"
"#,
        )
        .unwrap();

        let config = Config::load(Some(&path)).await.unwrap();
        assert!(!config.browser.headless);
        assert_eq!(config.browser.remote_url.as_deref(), Some("ws://localhost:9222"));
        assert_eq!(config.browser.timeout, 30);
        assert_eq!(config.extraction.marker_timeout_secs, 10);
        assert_eq!(config.extraction.title_property, "og:title");
        assert_eq!(config.naming.encoding, FilenameEncoding::Ascii);
        assert_eq!(config.naming.extension, "md");
        assert_eq!(
            config.store_root(Path::new("/elsewhere")),
            dir.path().join("site/content/events")
        );
    }

    #[tokio::test]
    async fn test_load_yaml_and_json() {
        let dir = tempdir().unwrap();

        let yaml = dir.path().join("evharvest.yaml");
        std::fs::write(&yaml, "naming:\n  extension: markdown\n").unwrap();
        let config = Config::load_from_path(&yaml).await.unwrap();
        assert_eq!(config.naming.extension, "markdown");

        let json = dir.path().join("evharvest.json");
        std::fs::write(&json, r#"{"store_dir": "/srv/events"}"#).unwrap();
        let config = Config::load_from_path(&json).await.unwrap();
        assert_eq!(config.store_root(Path::new("/work")), PathBuf::from("/srv/events"));
    }

    #[tokio::test]
    async fn test_explicit_missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("nope.toml")))
            .await
            .unwrap_err();
        assert!(err.contains("Failed to read config file"));
    }

    #[test]
    fn test_invalid_path_is_a_parse_error() {
        let err = Config::parse(
            "[extraction]\nedges_path = \"require..edges\"\n",
            Path::new("evharvest.toml"),
        )
        .unwrap_err();
        assert!(err.starts_with("Failed to parse TOML config"));
    }
}
