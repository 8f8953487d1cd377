use mappings::MappingTable;
use serde::Deserialize;
use std::path::PathBuf;
use thiserror::Error;

pub const MAPPINGS_PATH: &str = "/mappings";

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Register path must start with '/': {0}")]
    InvalidRegisterPath(String),

    #[error("Register path cannot be /mappings")]
    ReservedRegisterPath,

    #[error("Sink timeout cannot be 0")]
    InvalidSinkTimeout,

    #[error("Sink buffer cannot be 0 chunks")]
    InvalidSinkBuffer,
}

/// Gateway configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Main listener for incoming requests
    #[serde(default)]
    pub listener: Listener,
    /// Optional listener for the health and readiness endpoints
    pub admin_listener: Option<Listener>,
    /// Redis connection string. When set, mappings are synchronized through
    /// Redis and the static `mappings` table is ignored.
    pub redis_url: Option<String>,
    /// Path that accepts registration requests
    #[serde(default = "default_register_path")]
    pub register_path: String,
    /// Static path to sinks table, used when no Redis store is configured
    #[serde(default)]
    pub mappings: MappingTable,
    /// Deadline for connecting to a sink, for each chunk written to it and for
    /// its response once the whole body has been sent
    #[serde(default = "default_sink_timeout_secs")]
    pub sink_timeout_secs: u64,
    /// Number of chunks buffered per sink before the inbound stream waits
    #[serde(default = "default_sink_buffer_chunks")]
    pub sink_buffer_chunks: usize,
    /// Maximum number of sinks tracked in the error cache
    #[serde(default = "default_error_cache_capacity")]
    pub error_cache_capacity: u64,
}

fn default_register_path() -> String {
    "/subscribe".to_string()
}

fn default_sink_timeout_secs() -> u64 {
    30
}

fn default_sink_buffer_chunks() -> usize {
    16
}

fn default_error_cache_capacity() -> u64 {
    10_000
}

impl Default for Config {
    fn default() -> Self {
        Config {
            listener: Listener::default(),
            admin_listener: None,
            redis_url: None,
            register_path: default_register_path(),
            mappings: MappingTable::new(),
            sink_timeout_secs: default_sink_timeout_secs(),
            sink_buffer_chunks: default_sink_buffer_chunks(),
            error_cache_capacity: default_error_cache_capacity(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        if let Some(admin_listener) = &self.admin_listener {
            admin_listener.validate()?;
        }

        if !self.register_path.starts_with('/') {
            return Err(ValidationError::InvalidRegisterPath(
                self.register_path.clone(),
            ));
        }
        if self.register_path == MAPPINGS_PATH {
            return Err(ValidationError::ReservedRegisterPath);
        }

        if self.sink_timeout_secs == 0 {
            return Err(ValidationError::InvalidSinkTimeout);
        }
        if self.sink_buffer_chunks == 0 {
            return Err(ValidationError::InvalidSinkBuffer);
        }

        Ok(())
    }
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Serve HTTPS with this certificate instead of plain HTTP
    pub tls: Option<TlsConfig>,
}

/// PEM files for a TLS listener
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct TlsConfig {
    /// Certificate chain, leaf first
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for Listener {
    fn default() -> Self {
        Listener {
            host: default_host(),
            port: default_port(),
            tls: None,
        }
    }
}

impl Listener {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_config() {
        let yaml = r#"
listener:
    host: "127.0.0.1"
    port: 9000
admin_listener:
    port: 9001
register_path: /register
sink_timeout_secs: 5
mappings:
    /a:
        - http://sink1/x
        - http://sink2/y
    /b:
        - https://sink3:8443/z
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_ok());

        assert_eq!(config.listener.port, 9000);
        assert_eq!(config.admin_listener.as_ref().unwrap().host, "0.0.0.0");
        assert_eq!(config.register_path, "/register");
        assert_eq!(config.sink_timeout_secs, 5);
        assert_eq!(config.sink_buffer_chunks, 16);
        assert!(config.redis_url.is_none());

        // insertion order is preserved
        let paths: Vec<&String> = config.mappings.keys().collect();
        assert_eq!(paths, ["/a", "/b"]);
        assert_eq!(config.mappings["/a"], ["http://sink1/x", "http://sink2/y"]);
    }

    #[test]
    fn test_parse_tls_listener() {
        let yaml = r#"
listener:
    port: 8443
    tls:
        cert_path: /etc/giver/cert.pem
        key_path: /etc/giver/key.pem
admin_listener:
    port: 8081
"#;

        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_ok());

        let tls = config.listener.tls.as_ref().unwrap();
        assert_eq!(tls.cert_path, PathBuf::from("/etc/giver/cert.pem"));
        assert_eq!(tls.key_path, PathBuf::from("/etc/giver/key.pem"));
        assert!(config.admin_listener.unwrap().tls.is_none());

        // both files are required
        let yaml = "listener:\n    tls:\n        cert_path: /etc/giver/cert.pem\n";
        assert!(serde_yaml::from_str::<Config>(yaml).is_err());
    }

    #[test]
    fn test_defaults() {
        let config: Config = serde_yaml::from_str("redis_url: redis://127.0.0.1/").unwrap();
        assert_eq!(config.listener, Listener::default());
        assert_eq!(config.listener.port, 8080);
        assert_eq!(config.register_path, "/subscribe");
        assert!(config.mappings.is_empty());
        assert_eq!(config.redis_url.as_deref(), Some("redis://127.0.0.1/"));
    }

    #[test]
    fn test_validation_errors() {
        let base_config = Config::default();
        assert!(base_config.validate().is_ok());

        let mut config = base_config.clone();
        config.listener.port = 0;
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidPort)
        ));

        let mut config = base_config.clone();
        config.register_path = "subscribe".into();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidRegisterPath(_))
        ));

        let mut config = base_config.clone();
        config.register_path = MAPPINGS_PATH.into();
        assert!(matches!(
            config.validate(),
            Err(ValidationError::ReservedRegisterPath)
        ));

        let mut config = base_config.clone();
        config.sink_timeout_secs = 0;
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidSinkTimeout)
        ));

        let mut config = base_config;
        config.sink_buffer_chunks = 0;
        assert!(matches!(
            config.validate(),
            Err(ValidationError::InvalidSinkBuffer)
        ));
    }
}
