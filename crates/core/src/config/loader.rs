use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::{Path, PathBuf};

use super::{types::Config, ConfigError};

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "MARQUEE_";
/// Environment variable naming the configuration file.
pub const CONFIG_PATH_VAR: &str = "MARQUEE_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Path of the configuration file: `MARQUEE_CONFIG`, or `config.toml`.
pub fn config_path() -> PathBuf {
    std::env::var_os(CONFIG_PATH_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

/// Load configuration from file with environment variable overrides.
///
/// Sections and keys are separated by a double underscore so keys keep
/// their own underscores, e.g. `MARQUEE_CACHE__LIST_TTL_SECS=60`.
/// `MARQUEE_CONFIG` itself is not a setting and is ignored.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(
            Env::prefixed(ENV_PREFIX)
                .ignore(&["CONFIG"])
                .split("__"),
        )
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const MINIMAL: &str = r#"
[catalog]
api_key = "token"
"#;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[catalog]
api_key = "token"

[server]
port = 9000
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.catalog.api_key, "token");
    }

    #[test]
    fn test_load_config_from_str_missing_catalog() {
        let toml = r#"
[server]
port = 8080
"#;
        let result = load_config_from_str(toml);
        assert!(matches!(result.unwrap_err(), ConfigError::ParseError(_)));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/config.toml"));
        assert!(matches!(result.unwrap_err(), ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[catalog]
api_key = "token"
region = "IT"

[server]
host = "127.0.0.1"
port = 3000
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host.to_string(), "127.0.0.1");
        assert_eq!(config.catalog.region, "IT");
        assert_eq!(config.catalog.language, "en-US");
    }

    #[test]
    fn test_env_overrides_keys_with_underscores() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", MINIMAL)?;
            jail.set_env("MARQUEE_CACHE__LIST_TTL_SECS", "60");
            jail.set_env("MARQUEE_CATALOG__REQUESTS_PER_SECOND", "2");
            jail.set_env("MARQUEE_CATALOG__INCLUDE_ADULT", "true");
            jail.set_env("MARQUEE_PLAYBACK__SAVE_INTERVAL_SECS", "5");

            let config = load_config(Path::new("config.toml")).map_err(|e| e.to_string())?;
            assert_eq!(config.cache.list_ttl_secs, 60);
            assert_eq!(config.cache.detail_ttl_secs, 86400);
            assert_eq!(config.catalog.requests_per_second, 2);
            assert!(config.catalog.include_adult);
            assert_eq!(config.playback.save_interval_secs, 5);
            Ok(())
        });
    }

    #[test]
    fn test_env_supplies_api_key_and_beats_file() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.toml",
                r#"
[server]
port = 3000
"#,
            )?;
            jail.set_env("MARQUEE_CATALOG__API_KEY", "from-env");
            jail.set_env("MARQUEE_SERVER__PORT", "4000");

            let config = load_config(Path::new("config.toml")).map_err(|e| e.to_string())?;
            assert_eq!(config.catalog.api_key, "from-env");
            assert_eq!(config.server.port, 4000);
            Ok(())
        });
    }

    #[test]
    fn test_config_path_variable() {
        Jail::expect_with(|jail| {
            jail.create_file("custom.toml", MINIMAL)?;
            jail.set_env(CONFIG_PATH_VAR, "custom.toml");

            assert_eq!(config_path(), PathBuf::from("custom.toml"));
            let config = load_config(&config_path()).map_err(|e| e.to_string())?;
            assert_eq!(config.catalog.api_key, "token");
            Ok(())
        });
    }

    #[test]
    fn test_config_path_default() {
        Jail::expect_with(|_| {
            std::env::remove_var(CONFIG_PATH_VAR);
            assert_eq!(config_path(), PathBuf::from("config.toml"));
            Ok(())
        });
    }
}
