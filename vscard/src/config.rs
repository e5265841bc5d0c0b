//! Startup configuration

use std::path::{Path, PathBuf};

use figment::providers::{Format, Toml};
use figment::Figment;
use serde::Deserialize;

/// Bridge configuration
///
/// Loaded from a TOML file naming the reader driver endpoint:
///
/// ```toml
/// host = "127.0.0.1"
/// port = 35963
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Reader driver host
    pub host: String,

    /// Reader driver port
    pub port: u16,
}

impl Config {
    /// Load configuration from a file
    ///
    /// # Errors
    ///
    /// An unreadable file, unparsable contents, or an absent `host`/`port`
    /// key is an error; the bridge refuses to start without a complete
    /// driver endpoint.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Figment::new().merge(Toml::string(&raw)).extract()?)
    }
}

/// Configuration errors; the only fatal kind in the bridge
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Unable to load configuration {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] figment::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn write_temp(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("vscard-{}-{}", std::process::id(), name));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_load() {
        let path = write_temp("ok.toml", "host = \"127.0.0.1\"\nport = 35963\n");
        let config = Config::load(&path).unwrap();

        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 35963);
    }

    #[test]
    fn test_extra_keys_ignored() {
        let path = write_temp(
            "extra.toml",
            "host = \"localhost\"\nport = 4001\nverbosity = \"debug\"\n",
        );
        let config = Config::load(&path).unwrap();

        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 4001);
    }

    #[test]
    fn test_missing_key() {
        let path = write_temp("nokey.toml", "host = \"localhost\"\n");
        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let path = std::env::temp_dir().join("vscard-does-not-exist.toml");
        assert!(matches!(Config::load(&path), Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_malformed_file() {
        let path = write_temp("bad.toml", "host = \"localhost\nport=\n");
        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::Invalid(_))
        ));
    }
}
