use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// External catalog API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
    /// Bearer token sent with every request
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_image_base_url")]
    pub image_base_url: String,
    /// Locale attached to every call
    #[serde(default = "default_language")]
    pub language: String,
    /// Region attached to movie lists and searches
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default)]
    pub include_adult: bool,
    /// Outbound request ceiling; the throttle spaces dispatches by 1/rate
    #[serde(default = "default_requests_per_second")]
    pub requests_per_second: u32,
    /// Per-request HTTP timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

impl CatalogConfig {
    /// Minimal config for the given token with every other field defaulted.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: default_base_url(),
            image_base_url: default_image_base_url(),
            language: default_language(),
            region: default_region(),
            include_adult: false,
            requests_per_second: default_requests_per_second(),
            timeout_secs: default_timeout(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_base_url() -> String {
    "https://api.themoviedb.org/3".to_string()
}

fn default_image_base_url() -> String {
    "https://image.tmdb.org/t/p".to_string()
}

fn default_language() -> String {
    "en-US".to_string()
}

fn default_region() -> String {
    "US".to_string()
}

fn default_requests_per_second() -> u32 {
    4
}

fn default_timeout() -> u64 {
    30
}

/// Freshness windows and retry policy for cached catalog responses
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default = "default_list_ttl")]
    pub list_ttl_secs: u64,
    #[serde(default = "default_detail_ttl")]
    pub detail_ttl_secs: u64,
    #[serde(default = "default_search_ttl")]
    pub search_ttl_secs: u64,
    #[serde(default = "default_search_ttl")]
    pub default_ttl_secs: u64,
    /// Retries after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_base_delay")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay")]
    pub retry_max_delay_ms: u64,
    /// Entries older than `retention_factor` windows are pruned
    #[serde(default = "default_retention_factor")]
    pub retention_factor: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            list_ttl_secs: default_list_ttl(),
            detail_ttl_secs: default_detail_ttl(),
            search_ttl_secs: default_search_ttl(),
            default_ttl_secs: default_search_ttl(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay(),
            retry_max_delay_ms: default_retry_max_delay(),
            retention_factor: default_retention_factor(),
        }
    }
}

fn default_list_ttl() -> u64 {
    60 * 60
}

fn default_detail_ttl() -> u64 {
    24 * 60 * 60
}

fn default_search_ttl() -> u64 {
    5 * 60
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_base_delay() -> u64 {
    1_000
}

fn default_retry_max_delay() -> u64 {
    30_000
}

fn default_retention_factor() -> u32 {
    5
}

/// Local persistence configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("marquee.db")
}

/// Playback progress synchronization
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PlaybackConfig {
    /// Minimum spacing between throttled progress writes
    #[serde(default = "default_save_interval")]
    pub save_interval_secs: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            save_interval_secs: default_save_interval(),
        }
    }
}

impl PlaybackConfig {
    pub fn save_interval(&self) -> Duration {
        Duration::from_secs(self.save_interval_secs)
    }
}

fn default_save_interval() -> u64 {
    10
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub catalog: SanitizedCatalogConfig,
    pub cache: CacheConfig,
    pub storage: StorageConfig,
    pub playback: PlaybackConfig,
    pub server: ServerConfig,
}

/// Sanitized catalog config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedCatalogConfig {
    pub base_url: String,
    pub image_base_url: String,
    pub language: String,
    pub region: String,
    pub include_adult: bool,
    pub requests_per_second: u32,
    pub timeout_secs: u64,
    pub api_key_configured: bool,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        let catalog = &config.catalog;
        Self {
            catalog: SanitizedCatalogConfig {
                base_url: catalog.base_url.clone(),
                image_base_url: catalog.image_base_url.clone(),
                language: catalog.language.clone(),
                region: catalog.region.clone(),
                include_adult: catalog.include_adult,
                requests_per_second: catalog.requests_per_second,
                timeout_secs: catalog.timeout_secs,
                api_key_configured: !catalog.api_key.is_empty(),
            },
            cache: config.cache.clone(),
            storage: config.storage.clone(),
            playback: config.playback.clone(),
            server: config.server.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_with_defaults() {
        let toml = r#"
[catalog]
api_key = "secret"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert_eq!(config.catalog.base_url, "https://api.themoviedb.org/3");
        assert_eq!(config.catalog.language, "en-US");
        assert_eq!(config.catalog.region, "US");
        assert!(!config.catalog.include_adult);
        assert_eq!(config.catalog.requests_per_second, 4);
        assert_eq!(config.cache.list_ttl_secs, 3600);
        assert_eq!(config.cache.detail_ttl_secs, 86400);
        assert_eq!(config.cache.search_ttl_secs, 300);
        assert_eq!(config.cache.max_retries, 3);
        assert_eq!(config.playback.save_interval(), Duration::from_secs(10));
        assert_eq!(config.storage.path.to_str().unwrap(), "marquee.db");
    }

    #[test]
    fn test_deserialize_missing_catalog_fails() {
        let toml = r#"
[server]
port = 8080
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_overrides() {
        let toml = r#"
[catalog]
api_key = "secret"
language = "it-IT"
requests_per_second = 10

[cache]
list_ttl_secs = 120

[storage]
path = "/data/watch.sqlite"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.catalog.language, "it-IT");
        assert_eq!(config.catalog.requests_per_second, 10);
        assert_eq!(config.cache.list_ttl_secs, 120);
        assert_eq!(config.cache.detail_ttl_secs, 86400);
        assert_eq!(config.storage.path.to_str().unwrap(), "/data/watch.sqlite");
    }

    #[test]
    fn test_sanitized_config_hides_api_key() {
        let config = Config {
            catalog: CatalogConfig::with_api_key("super-secret"),
            cache: CacheConfig::default(),
            storage: StorageConfig::default(),
            playback: PlaybackConfig::default(),
            server: ServerConfig::default(),
        };
        let sanitized = SanitizedConfig::from(&config);
        assert!(sanitized.catalog.api_key_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("super-secret"));
    }
}
