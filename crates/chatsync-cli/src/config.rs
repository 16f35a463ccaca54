use chatsync_types::{Identity, SyncConfig};
use ::config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub backend: BackendConfig,
    pub sync: SyncSection,
    pub logging: LoggingConfig,
    /// Signed in automatically at startup when present
    #[serde(default)]
    pub identity: Option<IdentityConfig>,

    // Secret (from ENV only)
    #[serde(default)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Rest,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    pub kind: BackendKind,
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyncSection {
    pub thread_poll_secs: u64,
    pub message_poll_secs: u64,
    pub message_page_limit: u32,
    pub signature_tolerance_secs: u64,
    pub event_capacity: usize,
}

impl From<&SyncSection> for SyncConfig {
    fn from(section: &SyncSection) -> Self {
        SyncConfig::default()
            .with_thread_poll_interval(Duration::from_secs(section.thread_poll_secs))
            .with_message_poll_interval(Duration::from_secs(section.message_poll_secs))
            .with_message_page_limit(section.message_page_limit)
            .with_signature_tolerance(Duration::from_secs(section.signature_tolerance_secs))
            .with_event_capacity(section.event_capacity)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    pub uid: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl IdentityConfig {
    pub fn to_identity(&self) -> Identity {
        let mut identity = Identity::new(&self.uid);
        if let Some(name) = &self.display_name {
            identity = identity.with_display_name(name);
        }
        if let Some(email) = &self.email {
            identity = identity.with_email(email);
        }
        identity
    }
}

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. config/default.toml
    /// 2. config/{ENV}.toml (if ENV is set)
    /// 3. Environment variables such as CHATSYNC_BACKEND__BASE_URL
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());

        let builder = ConfigLoader::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix("CHATSYNC")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        let mut cfg: Config = builder.build()?.try_deserialize()?;

        cfg.token = std::env::var("CHATSYNC_TOKEN").ok().filter(|token| !token.is_empty());
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load config from a specific path (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let cfg: Config = ConfigLoader::builder()
            .add_source(File::from(path.as_ref()))
            .build()?
            .try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.backend.kind == BackendKind::Rest && self.backend.base_url.trim().is_empty() {
            return Err(ConfigError::Message("backend.base_url is required for the rest backend".to_string()));
        }
        if self.sync.message_page_limit == 0 {
            return Err(ConfigError::Message("sync.message_page_limit must be positive".to_string()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [backend]
        kind = "rest"
        base_url = "http://localhost:8000"
        timeout_secs = 30

        [sync]
        thread_poll_secs = 5
        message_poll_secs = 2
        message_page_limit = 50
        signature_tolerance_secs = 10
        event_capacity = 64

        [logging]
        level = "debug"
        format = "json"

        [identity]
        uid = "u1"
        display_name = "Ada"
    "#;

    #[test]
    fn test_config_structure() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        assert_eq!(config.backend.kind, BackendKind::Rest);
        assert_eq!(config.backend.timeout_secs, 30);
        assert_eq!(config.logging.format, "json");
        assert!(config.token.is_none());

        let identity = config.identity.unwrap().to_identity();
        assert_eq!(identity.uid, "u1");
        assert_eq!(identity.label(), "Ada");
    }

    #[test]
    fn test_sync_section_maps_to_sync_config() {
        let config: Config = toml::from_str(SAMPLE).unwrap();
        let sync = SyncConfig::from(&config.sync);
        assert_eq!(sync.thread_poll_interval, Duration::from_secs(5));
        assert_eq!(sync.message_poll_interval, Duration::from_secs(2));
        assert_eq!(sync.message_page_limit, 50);
        assert_eq!(sync.event_capacity, 64);
        assert_eq!(sync.tolerance(), chrono::Duration::seconds(10));
    }

    #[test]
    fn test_memory_backend_needs_no_url() {
        let memory = SAMPLE
            .replace(r#"kind = "rest""#, r#"kind = "memory""#)
            .replace(r#"base_url = "http://localhost:8000""#, r#"base_url = """#);
        let config: Config = toml::from_str(&memory).unwrap();
        assert!(config.validate().is_ok());

        let rest = memory.replace(r#"kind = "memory""#, r#"kind = "rest""#);
        let config: Config = toml::from_str(&rest).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_reads_shipped_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../config/default.toml");
        let config = Config::from_file(path).unwrap();
        assert_eq!(config.backend.kind, BackendKind::Rest);
        assert_eq!(config.sync.thread_poll_secs, 5);
        assert!(config.identity.is_none());
    }
}
