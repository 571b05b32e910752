//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (OFFGRID_*)
//! 2. TOML config file (if OFFGRID_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (OFFGRID_*)
/// 2. TOML config file (if OFFGRID_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version tag naming the current store generation.
    ///
    /// Changing it is what retires the previous generation on activation.
    /// Set via OFFGRID_VERSION_TAG environment variable.
    #[serde(default = "default_version_tag")]
    pub version_tag: String,

    /// Application origin that relative resource identifiers resolve against.
    ///
    /// Set via OFFGRID_ORIGIN environment variable.
    #[serde(default = "default_origin")]
    pub origin: String,

    /// Resources preloaded into the store at install, in order.
    ///
    /// Set via OFFGRID_MANIFEST environment variable (`["a", "b"]`).
    #[serde(default = "default_manifest")]
    pub manifest: Vec<String>,

    /// First fallback for failed document requests.
    #[serde(default = "default_root_document")]
    pub root_document: String,

    /// Last fallback for failed document requests.
    #[serde(default = "default_offline_document")]
    pub offline_document: String,

    /// Trailing path of the application bundle served network-first.
    #[serde(default = "default_app_bundle")]
    pub app_bundle: String,

    /// Path to SQLite store database.
    ///
    /// Set via OFFGRID_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via OFFGRID_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via OFFGRID_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via OFFGRID_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Request immediate activation as soon as install completes.
    ///
    /// Set via OFFGRID_SKIP_WAITING_ON_INSTALL environment variable.
    #[serde(default = "default_true")]
    pub skip_waiting_on_install: bool,

    /// Per-generation cap on stored body bytes. Unbounded when unset.
    ///
    /// Set via OFFGRID_STORE_QUOTA_BYTES environment variable.
    #[serde(default)]
    pub store_quota_bytes: Option<u64>,
}

fn default_version_tag() -> String {
    "fpl-v5-3-4".into()
}

fn default_origin() -> String {
    "http://localhost:8080/".into()
}

fn default_manifest() -> Vec<String> {
    ["index.html", "app.js", "manifest.json", "icon-192.png", "icon-512.png", "Parts.csv", "offline.html"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_root_document() -> String {
    "index.html".into()
}

fn default_offline_document() -> String {
    "offline.html".into()
}

fn default_app_bundle() -> String {
    "app.js".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./offgrid-store.sqlite")
}

fn default_user_agent() -> String {
    "offgrid/0.1".into()
}

fn default_max_bytes() -> usize {
    5_242_880 // 5MB
}

fn default_timeout_ms() -> u64 {
    20_000
}

fn default_true() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version_tag: default_version_tag(),
            origin: default_origin(),
            manifest: default_manifest(),
            root_document: default_root_document(),
            offline_document: default_offline_document(),
            app_bundle: default_app_bundle(),
            db_path: default_db_path(),
            user_agent: default_user_agent(),
            max_bytes: default_max_bytes(),
            timeout_ms: default_timeout_ms(),
            skip_waiting_on_install: true,
            store_quota_bytes: None,
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Parsed application origin.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the origin is not an absolute
    /// http(s) URL.
    pub fn origin_url(&self) -> Result<url::Url, ConfigError> {
        let parsed = url::Url::parse(&self.origin)
            .map_err(|e| ConfigError::Invalid { field: "origin".into(), reason: e.to_string() })?;
        match parsed.scheme() {
            "http" | "https" => Ok(parsed),
            scheme => Err(ConfigError::Invalid { field: "origin".into(), reason: format!("unsupported scheme {scheme}") }),
        }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `OFFGRID_`
    /// 2. TOML file from `OFFGRID_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("OFFGRID_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("OFFGRID_")
                .ignore(&["CONFIG_FILE"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.version_tag, "fpl-v5-3-4");
        assert_eq!(config.db_path, PathBuf::from("./offgrid-store.sqlite"));
        assert_eq!(config.user_agent, "offgrid/0.1");
        assert_eq!(config.manifest.len(), 7);
        assert_eq!(config.manifest.first().map(String::as_str), Some("index.html"));
        assert_eq!(config.root_document, "index.html");
        assert_eq!(config.offline_document, "offline.html");
        assert_eq!(config.app_bundle, "app.js");
        assert!(config.skip_waiting_on_install);
        assert!(config.store_quota_bytes.is_none());
    }

    #[test]
    fn test_timeout_duration() {
        let config = AppConfig::default();
        assert_eq!(config.timeout(), Duration::from_millis(20_000));
    }

    #[test]
    fn test_origin_url() {
        let config = AppConfig { origin: "https://parts.example/app/".into(), ..Default::default() };
        let origin = config.origin_url().unwrap();
        assert_eq!(origin.join("index.html").unwrap().as_str(), "https://parts.example/app/index.html");
    }

    #[test]
    fn test_origin_url_rejects_other_schemes() {
        let config = AppConfig { origin: "ftp://parts.example/".into(), ..Default::default() };
        assert!(matches!(config.origin_url(), Err(ConfigError::Invalid { field, .. }) if field == "origin"));
    }

    #[test]
    fn test_load_layers_file_and_env() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "offgrid.toml",
                r#"
                version_tag = "from-file"
                origin = "https://parts.example/"
                manifest = ["index.html", "offline.html"]
                "#,
            )?;
            jail.set_env("OFFGRID_CONFIG_FILE", "offgrid.toml");
            jail.set_env("OFFGRID_VERSION_TAG", "from-env");
            jail.set_env("OFFGRID_STORE_QUOTA_BYTES", "4096");

            let config = AppConfig::load().map_err(|e| e.to_string())?;
            assert_eq!(config.version_tag, "from-env");
            assert_eq!(config.origin, "https://parts.example/");
            assert_eq!(config.manifest, vec!["index.html".to_string(), "offline.html".to_string()]);
            assert_eq!(config.store_quota_bytes, Some(4096));
            Ok(())
        });
    }
}
