use crate::error::ConfigError;
use crate::models::Config;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Load configuration from file or use defaults
///
/// Search order:
/// 1. Custom path if provided via --config
/// 2. .patchfinderrc in current directory
/// 3. ~/.patchfinderrc in home directory
/// 4. Built-in defaults
pub fn load_config(custom_path: Option<&Path>) -> Result<Config> {
    // If custom path provided, use it exclusively
    if let Some(path) = custom_path {
        return load_config_from_file(path)
            .with_context(|| format!("Failed to load config from {}", path.display()));
    }

    let current_config = PathBuf::from(".patchfinderrc");
    if current_config.exists() {
        if let Ok(config) = load_config_from_file(&current_config) {
            return Ok(config);
        }
    }

    if let Some(home_config) = get_home_config_path() {
        if home_config.exists() {
            if let Ok(config) = load_config_from_file(&home_config) {
                return Ok(config);
            }
        }
    }

    Ok(Config::default())
}

/// Load config from a specific file
fn load_config_from_file(path: &Path) -> Result<Config> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

    Ok(config)
}

fn get_home_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".patchfinderrc"))
}

/// Parse the configured per-request timeout
pub fn request_timeout(config: &Config) -> Result<Duration, ConfigError> {
    humantime::parse_duration(config.timeout.trim()).map_err(|e| ConfigError::InvalidTimeout {
        value: config.timeout.clone(),
        detail: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_custom_config() {
        let mut temp_file = NamedTempFile::new().unwrap();
        let config_content = r#"
api_url = "https://ghe.example.com/api/v3"
per_page = 50
max_attempts = 6
include_forks = false
timeout = "1m"
"#;
        temp_file.write_all(config_content.as_bytes()).unwrap();

        let config = load_config(Some(temp_file.path())).unwrap();
        assert_eq!(config.api_url, "https://ghe.example.com/api/v3");
        assert_eq!(config.per_page, 50);
        assert_eq!(config.max_attempts, 6);
        assert!(!config.include_forks);
        // unspecified keys keep their defaults
        assert_eq!(config.base_delay_ms, 500);
        assert_eq!(request_timeout(&config).unwrap(), Duration::from_secs(60));
    }

    #[test]
    fn test_missing_custom_config_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(load_config(Some(&missing)).is_err());
    }

    #[test]
    fn test_invalid_config_is_an_error() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(b"per_page = \"lots\"").unwrap();
        assert!(load_config(Some(temp_file.path())).is_err());
    }

    #[test]
    fn test_request_timeout() {
        let config = Config::default();
        assert_eq!(request_timeout(&config).unwrap(), Duration::from_secs(30));

        let config = Config {
            timeout: "soon".to_string(),
            ..Config::default()
        };
        assert!(matches!(
            request_timeout(&config),
            Err(ConfigError::InvalidTimeout { .. })
        ));
    }
}
