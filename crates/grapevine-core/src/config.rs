use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::models::{Category, Source};
use crate::registry::SourceRegistry;

/// Main configuration structure
///
/// Loaded from the config file, then env vars, then CLI flags.
/// Priority: CLI > Env > File > Defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub github: GitHubConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub analytics: AnalyticsConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub geocode: GeocodeConfig,
    #[serde(default = "default_categories")]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub sources: Vec<Source>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            github: GitHubConfig::default(),
            storage: StorageConfig::default(),
            feed: FeedConfig::default(),
            analytics: AnalyticsConfig::default(),
            auth: AuthConfig::default(),
            geocode: GeocodeConfig::default(),
            categories: default_categories(),
            sources: Vec::new(),
        }
    }
}

impl Config {
    /// Read `path`. A missing file is not an error.
    pub fn load_from(path: &Path) -> crate::Result<Self> {
        if path.exists() {
            debug!("Loading config from {}", path.display());
            let contents = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&contents)
                .map_err(|e| crate::Error::ConfigError(format!("Failed to parse config: {}", e)))?;
            Ok(config)
        } else {
            // No config file? Use defaults
            Ok(Self::default())
        }
    }

    pub fn save_to(&self, path: &Path) -> crate::Result<()> {
        // Create config directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| crate::Error::ConfigError(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, contents)?;
        Ok(())
    }

    /// `GITHUB_TOKEN` wins over the file
    pub fn apply_env_overrides(&mut self) {
        if let Ok(token) = std::env::var("GITHUB_TOKEN") {
            if !token.trim().is_empty() {
                self.github.token = Some(token);
            }
        }
    }

    /// Get the config file path
    /// Uses XDG on Linux/macOS, AppData on Windows
    pub fn config_path() -> crate::Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| crate::Error::ConfigError("Could not find config directory".into()))?
            .join("grapevine");

        Ok(config_dir.join("config.toml"))
    }

    /// SQLite file for analytics and session state
    pub fn database_path(&self) -> crate::Result<PathBuf> {
        if let Some(path) = &self.storage.path {
            return Ok(path.clone());
        }
        let data_dir = dirs::data_dir()
            .ok_or_else(|| crate::Error::ConfigError("Could not find data directory".into()))?;
        Ok(data_dir.join("grapevine").join("grapevine.db"))
    }

    pub fn registry(&self) -> SourceRegistry {
        SourceRegistry::new(self.sources.clone(), self.categories.clone())
    }

    /// Copy registry edits back so they can be saved
    pub fn store_registry(&mut self, registry: &SourceRegistry) {
        self.sources = registry.sources().to_vec();
        self.categories = registry.categories().into_iter().cloned().collect();
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GitHubConfig {
    /// Personal access token. Optional, but unauthenticated requests hit
    /// the rate limit quickly.
    pub token: Option<String>,

    /// API URL (for GitHub Enterprise)
    #[serde(default = "default_github_url")]
    pub api_url: String,

    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// Automatic retries on network errors and 5xx. Off unless set.
    #[serde(default)]
    pub max_retries: u32,
}

fn default_github_url() -> String {
    "https://api.github.com".to_string()
}

fn default_per_page() -> u32 {
    10
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: default_github_url(),
            per_page: default_per_page(),
            max_retries: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StorageConfig {
    /// Database file; defaults to `<data_dir>/grapevine/grapevine.db`
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Keep loading pages while fewer filtered issues than this are visible
    #[serde(default = "default_min_visible")]
    pub min_visible: usize,

    /// Upper bound on pages loaded by one auto-expand run
    #[serde(default = "default_max_auto_pages")]
    pub max_auto_pages: u32,

    /// Show the sources that answered when others fail
    #[serde(default)]
    pub partial_results: bool,
}

fn default_min_visible() -> usize {
    5
}

fn default_max_auto_pages() -> u32 {
    10
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            min_visible: default_min_visible(),
            max_auto_pages: default_max_auto_pages(),
            partial_results: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    #[serde(default = "default_max_view_history")]
    pub max_view_history: usize,

    #[serde(default = "default_max_tracked_repos")]
    pub max_tracked_repos: usize,

    /// Owner whose repositories make up the personal dashboard
    pub target_author: Option<String>,
}

fn default_max_view_history() -> usize {
    100
}

fn default_max_tracked_repos() -> usize {
    200
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            max_view_history: default_max_view_history(),
            max_tracked_repos: default_max_tracked_repos(),
            target_author: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// OAuth app client id
    pub client_id: Option<String>,

    /// Token exchange endpoint that holds the client secret
    pub proxy_url: Option<String>,

    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,

    #[serde(default = "default_scope")]
    pub scope: String,
}

fn default_redirect_uri() -> String {
    "http://localhost:3000/callback".to_string()
}

fn default_scope() -> String {
    "public_repo read:user".to_string()
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            proxy_url: None,
            redirect_uri: default_redirect_uri(),
            scope: default_scope(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeocodeConfig {
    #[serde(default = "default_geocode_url")]
    pub base_url: String,

    #[serde(default = "default_geocode_timeout")]
    pub timeout_secs: u64,
}

fn default_geocode_url() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}

fn default_geocode_timeout() -> u64 {
    5
}

impl Default for GeocodeConfig {
    fn default() -> Self {
        Self {
            base_url: default_geocode_url(),
            timeout_secs: default_geocode_timeout(),
        }
    }
}

fn default_categories() -> Vec<Category> {
    vec![
        Category::all(),
        Category::new("community", "Community", 1),
        Category::new("jobs", "Jobs", 2),
        Category::new("newsletter", "Newsletter", 3),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ALL_CATEGORY;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.github.api_url, "https://api.github.com");
        assert_eq!(config.feed.min_visible, 5);
        assert!(!config.feed.partial_results);
        assert_eq!(config.analytics.max_view_history, 100);
        assert_eq!(config.geocode.timeout_secs, 5);
        assert!(config.sources.is_empty());

        let ids: Vec<_> = config.categories.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec![ALL_CATEGORY, "community", "jobs", "newsletter"]);
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let config: Config = toml::from_str(
            r#"
            [github]
            token = "ghp_x"

            [feed]
            partial_results = true

            [[sources]]
            id = "forum"
            name = "Forum"
            owner = "acme"
            repo = "forum"
            category = "community"
            "#,
        )
        .unwrap();

        assert_eq!(config.github.token.as_deref(), Some("ghp_x"));
        assert_eq!(config.github.per_page, 10);
        assert!(config.feed.partial_results);
        assert_eq!(config.feed.max_auto_pages, 10);
        assert_eq!(config.categories.len(), 4);
        assert!(config.sources[0].is_active);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        let mut registry = config.registry();
        registry.add_source(Source::new("jobs", "acme", "jobs").with_category("jobs"));
        config.store_registry(&registry);
        config.save_to(&path).unwrap();

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded, config);
        assert_eq!(reloaded.registry().active_sources_for("jobs").len(), 1);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml = toml::to_string(&config).unwrap();
        assert!(toml.contains("[github]"));
        assert!(toml.contains("[[categories]]"));
    }
}
