//! Connection settings shared by backends that talk to a server.
//!
//! Settings can be built in code, parsed from TOML or read from the environment:
//!
//! ```toml
//! servers = "db1:27017,db2:27017"
//! database = "app"
//! app_name = "billing"
//! max_pool_size = 20
//! ```

use serde::{Deserialize, Serialize};
use std::env;

use crate::error::{RecordStoreError, RecordStoreResult};

pub const ENV_SERVERS: &str = "MONGOREPO_SERVERS";
pub const ENV_DATABASE: &str = "MONGOREPO_DATABASE";
pub const ENV_APP_NAME: &str = "MONGOREPO_APP_NAME";
pub const ENV_MAX_POOL_SIZE: &str = "MONGOREPO_MAX_POOL_SIZE";

const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 10_000;

fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

/// Where to connect and how.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// A host list (`"h1:27017,h2:27017"`) or a full `mongodb://` / `mongodb+srv://` URI.
    pub servers: String,
    pub database: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_pool_size: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_pool_size: Option<u32>,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl ConnectionConfig {
    pub fn new(servers: impl Into<String>, database: impl Into<String>) -> Self {
        Self {
            servers: servers.into(),
            database: database.into(),
            app_name: None,
            max_pool_size: None,
            min_pool_size: None,
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
        }
    }

    pub fn with_app_name(mut self, app_name: impl Into<String>) -> Self {
        self.app_name = Some(app_name.into());
        self
    }

    pub fn with_max_pool_size(mut self, size: u32) -> Self {
        self.max_pool_size = Some(size);
        self
    }

    pub fn with_min_pool_size(mut self, size: u32) -> Self {
        self.min_pool_size = Some(size);
        self
    }

    pub fn with_connect_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.connect_timeout_ms = timeout_ms;
        self
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(text: &str) -> RecordStoreResult<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| RecordStoreError::Configuration(format!("invalid TOML: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Reads `MONGOREPO_SERVERS` and `MONGOREPO_DATABASE`, plus the optional
    /// `MONGOREPO_APP_NAME` and `MONGOREPO_MAX_POOL_SIZE`.
    pub fn from_env() -> RecordStoreResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> RecordStoreResult<Self> {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| {
                RecordStoreError::Configuration(format!("environment variable {key} is not set"))
            })
        };

        let mut config = Self::new(required(ENV_SERVERS)?, required(ENV_DATABASE)?);
        config.app_name = lookup(ENV_APP_NAME);

        if let Some(size) = lookup(ENV_MAX_POOL_SIZE) {
            config.max_pool_size = Some(size.parse().map_err(|_| {
                RecordStoreError::Configuration(format!(
                    "{ENV_MAX_POOL_SIZE} must be a positive integer, got {size:?}"
                ))
            })?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Checks that the settings can describe a connection.
    pub fn validate(&self) -> RecordStoreResult<()> {
        if self.servers.trim().is_empty() {
            return Err(RecordStoreError::Configuration("servers must not be empty".into()));
        }
        if self.database.trim().is_empty() {
            return Err(RecordStoreError::Configuration("database must not be empty".into()));
        }
        if let (Some(min), Some(max)) = (self.min_pool_size, self.max_pool_size) {
            if min > max {
                return Err(RecordStoreError::Configuration(format!(
                    "min_pool_size ({min}) exceeds max_pool_size ({max})"
                )));
            }
        }

        Ok(())
    }

    /// The driver connection string for `servers`.
    ///
    /// Full URIs are passed through; bare host lists get the `mongodb://` scheme.
    pub fn connection_uri(&self) -> String {
        let servers = self.servers.trim();

        if servers.starts_with("mongodb://") || servers.starts_with("mongodb+srv://") {
            servers.to_string()
        } else {
            format!("mongodb://{servers}")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn host_lists_get_a_scheme() {
        assert_eq!(
            ConnectionConfig::new("h1:27017,h2:27017", "app").connection_uri(),
            "mongodb://h1:27017,h2:27017"
        );
        assert_eq!(
            ConnectionConfig::new("mongodb+srv://cluster.example.net", "app").connection_uri(),
            "mongodb+srv://cluster.example.net"
        );
    }

    #[test]
    fn toml_fills_defaults() {
        let config = ConnectionConfig::from_toml_str(
            r#"
            servers = "localhost"
            database = "app"
            max_pool_size = 8
            "#,
        )
        .unwrap();

        assert_eq!(config.max_pool_size, Some(8));
        assert_eq!(config.app_name, None);
        assert_eq!(config.connect_timeout_ms, 10_000);
    }

    #[test]
    fn invalid_settings_are_configuration_errors() {
        for text in ["servers = 1", "servers = \"\"\ndatabase = \"app\""] {
            assert!(matches!(
                ConnectionConfig::from_toml_str(text),
                Err(RecordStoreError::Configuration(_))
            ));
        }

        let inverted = ConnectionConfig::new("localhost", "app")
            .with_min_pool_size(10)
            .with_max_pool_size(2);
        assert!(inverted.validate().is_err());
    }

    #[test]
    fn environment_lookup() {
        let vars: HashMap<&str, &str> = HashMap::from([
            (ENV_SERVERS, "localhost:27017"),
            (ENV_DATABASE, "app"),
            (ENV_MAX_POOL_SIZE, "4"),
        ]);

        let config =
            ConnectionConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config.servers, "localhost:27017");
        assert_eq!(config.max_pool_size, Some(4));

        let missing = ConnectionConfig::from_lookup(|_| None).unwrap_err();
        assert!(missing.to_string().contains(ENV_SERVERS));

        let bad_pool = ConnectionConfig::from_lookup(|key| match key {
            ENV_MAX_POOL_SIZE => Some("many".into()),
            _ => Some("x".into()),
        });
        assert!(matches!(bad_pool, Err(RecordStoreError::Configuration(_))));
    }
}
