//! Service configuration.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! environment variables.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

pub const ENV_HOST: &str = "INSTAGATE_HOST";
pub const ENV_PORT: &str = "INSTAGATE_PORT";
pub const ENV_CLIENT_HOST: &str = "INSTAGATE_CLIENT_HOST";
pub const ENV_STORAGE_URL: &str = "SUPABASE_URL";
pub const ENV_STORAGE_KEY: &str = "SUPABASE_SERVICE_KEY";
pub const ENV_STORAGE_BUCKET: &str = "SUPABASE_BUCKET";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub client: ClientSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl ServerSettings {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Remote object storage used to materialize media that is not on local disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    pub url: Option<String>,
    pub service_key: Option<String>,
    pub bucket: Option<String>,
}

/// Fully specified remote storage endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteStorage {
    pub base_url: String,
    pub service_key: String,
    pub bucket: String,
}

impl StorageSettings {
    /// Returns the remote endpoint only when url, key and bucket are all set.
    pub fn remote(&self) -> Option<RemoteStorage> {
        let non_empty = |v: &Option<String>| {
            v.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        };

        Some(RemoteStorage {
            base_url: non_empty(&self.url)?.trim_end_matches('/').to_string(),
            service_key: non_empty(&self.service_key)?,
            bucket: non_empty(&self.bucket)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Scheme and host of the platform's private API.
    pub host: String,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            host: "https://i.instagram.com".to_string(),
            user_agent: "Instagram 269.0.0.18.75 Android (26/8.0.0; 480dpi; 1080x1920; \
                         OnePlus; 6T Dev; devitron; qcom; en_US; 314665256)"
                .to_string(),
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    pub filter: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: "instagate=info,http_api=info,insta_client=info,media_storage=info,tower_http=info"
                .to_string(),
        }
    }
}

impl AppConfig {
    /// Loads configuration from an optional TOML file and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    pub fn load_with_env<F>(path: Option<&Path>, env: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(env)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;
        let config: AppConfig = toml::from_str(&contents)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    fn apply_env<F>(&mut self, env: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = env(ENV_HOST) {
            self.server.host = host;
        }
        if let Some(port) = env(ENV_PORT) {
            self.server.port = port.trim().parse().map_err(|_| ConfigError::InvalidValue {
                field: ENV_PORT.to_string(),
                value: port.clone(),
            })?;
        }
        if let Some(host) = env(ENV_CLIENT_HOST) {
            self.client.host = host;
        }
        if let Some(url) = env(ENV_STORAGE_URL) {
            self.storage.url = Some(url);
        }
        if let Some(key) = env(ENV_STORAGE_KEY) {
            self.storage.service_key = Some(key);
        }
        if let Some(bucket) = env(ENV_STORAGE_BUCKET) {
            self.storage.bucket = Some(bucket);
        }
        Ok(())
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if let Some(remote) = self.storage.remote() {
            url::Url::parse(&remote.base_url).map_err(|_| ConfigError::InvalidValue {
                field: "storage.url".to_string(),
                value: remote.base_url.clone(),
            })?;
        } else {
            debug!("Remote storage not configured, media resolution is local-only");
        }

        url::Url::parse(&self.client.host).map_err(|_| ConfigError::InvalidValue {
            field: "client.host".to_string(),
            value: self.client.host.clone(),
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::load_with_env(None, env_from(&[])).unwrap();
        assert_eq!(config.server.bind_address(), "0.0.0.0:8000");
        assert_eq!(config.client.host, "https://i.instagram.com");
        assert_eq!(config.storage.remote(), None);
    }

    #[test]
    fn test_env_overrides() {
        let config = AppConfig::load_with_env(
            None,
            env_from(&[
                (ENV_PORT, "9100"),
                (ENV_STORAGE_URL, "https://proj.supabase.co/"),
                (ENV_STORAGE_KEY, "secret"),
                (ENV_STORAGE_BUCKET, "media"),
            ]),
        )
        .unwrap();

        assert_eq!(config.server.port, 9100);
        assert_eq!(
            config.storage.remote(),
            Some(RemoteStorage {
                base_url: "https://proj.supabase.co".to_string(),
                service_key: "secret".to_string(),
                bucket: "media".to_string(),
            })
        );
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let result = AppConfig::load_with_env(None, env_from(&[(ENV_PORT, "eighty")]));
        assert!(matches!(result, Err(ConfigError::InvalidValue { field, .. }) if field == ENV_PORT));
    }

    #[test]
    fn test_remote_storage_requires_all_three_values() {
        let partial = StorageSettings {
            url: Some("https://proj.supabase.co".to_string()),
            service_key: Some("secret".to_string()),
            bucket: None,
        };
        assert_eq!(partial.remote(), None);

        let blank_key = StorageSettings {
            service_key: Some("  ".to_string()),
            bucket: Some("media".to_string()),
            ..partial
        };
        assert_eq!(blank_key.remote(), None);
    }

    #[test]
    fn test_load_from_toml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[server]
port = 7000

[storage]
url = "https://files.example.com"
service_key = "k"
bucket = "b"

[log]
filter = "debug"
"#
        )
        .unwrap();

        let config = AppConfig::load_with_env(Some(file.path()), env_from(&[])).unwrap();
        assert_eq!(config.server.port, 7000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.log.filter, "debug");
        assert!(config.storage.remote().is_some());
    }

    #[test]
    fn test_missing_file() {
        let result = AppConfig::load_with_env(
            Some(Path::new("/definitely/not/here.toml")),
            env_from(&[]),
        );
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn test_invalid_storage_url() {
        let result = AppConfig::load_with_env(
            None,
            env_from(&[
                (ENV_STORAGE_URL, "not a url"),
                (ENV_STORAGE_KEY, "k"),
                (ENV_STORAGE_BUCKET, "b"),
            ]),
        );
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }
}
