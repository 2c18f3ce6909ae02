use crate::constants::{DEFAULT_USER_AGENT, HUBSPOT_MAX_LIMIT};
use crate::error::{ContactMapError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Process-wide configuration, built once at startup and handed to
/// collaborators. Core logic never reads the environment directly.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub hubspot: HubSpotConfig,
    pub geocoder: GeocoderConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    /// Origin of the map frontend allowed by CORS
    pub allowed_origin: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            allowed_origin: "http://localhost:5173".to_string(),
        }
    }
}

#[derive(Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct HubSpotConfig {
    pub base_url: String,
    pub token: Option<String>,
    pub limit: u32,
    pub timeout_seconds: u64,
}

impl Default for HubSpotConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.hubapi.com".to_string(),
            token: None,
            limit: HUBSPOT_MAX_LIMIT,
            timeout_seconds: 30,
        }
    }
}

// Hand-written so the token never lands in logs
impl std::fmt::Debug for HubSpotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubSpotConfig")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("limit", &self.limit)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeocoderConfig {
    pub base_url: String,
    pub user_agent: String,
    pub min_interval_ms: u64,
    pub timeout_seconds: u64,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: "https://nominatim.openstreetmap.org".to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            min_interval_ms: 1000,
            timeout_seconds: 10,
        }
    }
}

impl GeocoderConfig {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Publish a snapshot after this many enriched contacts
    pub publish_every: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { publish_every: 5 }
    }
}

impl Config {
    /// Load defaults, then the TOML file if present, then environment overrides.
    ///
    /// An explicitly requested path must exist; the default `config.toml` is
    /// optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?
            }
            None => Self::default(),
        };
        let env: HashMap<String, String> = std::env::vars().collect();
        config.apply_env(&env)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            ContactMapError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Apply the recognised environment variables on top of file values
    pub fn apply_env(&mut self, env: &HashMap<String, String>) -> Result<()> {
        let get = |key: &str| env.get(key).map(|v| v.trim()).filter(|v| !v.is_empty());

        if let Some(token) = get("HUBSPOT_TOKEN") {
            self.hubspot.token = Some(token.to_string());
        }
        if let Some(url) = get("HUBSPOT_BASE_URL") {
            self.hubspot.base_url = url.to_string();
        }
        if let Some(port) = get("PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| ContactMapError::Config(format!("PORT is not a valid port: {port}")))?;
        }
        if let Some(origin) = get("ALLOWED_ORIGIN") {
            self.server.allowed_origin = origin.to_string();
        }
        if let Some(url) = get("GEOCODER_BASE_URL") {
            self.geocoder.base_url = url.to_string();
        }
        if let Some(agent) = get("GEOCODER_USER_AGENT") {
            self.geocoder.user_agent = agent.to_string();
        }
        if let Some(ms) = get("GEOCODER_MIN_INTERVAL_MS") {
            self.geocoder.min_interval_ms = ms.parse().map_err(|_| {
                ContactMapError::Config(format!("GEOCODER_MIN_INTERVAL_MS is not a number: {ms}"))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.pipeline.publish_every == 0 {
            return Err(ContactMapError::Config(
                "pipeline.publish_every must be greater than zero".into(),
            ));
        }
        if self.hubspot.limit == 0 || self.hubspot.limit > HUBSPOT_MAX_LIMIT {
            return Err(ContactMapError::Config(format!(
                "hubspot.limit must be between 1 and {HUBSPOT_MAX_LIMIT}"
            )));
        }
        if self.geocoder.user_agent.trim().is_empty() {
            return Err(ContactMapError::Config(
                "geocoder.user_agent must identify the application".into(),
            ));
        }
        self.server
            .allowed_origin
            .parse::<axum::http::HeaderValue>()
            .map_err(|e| ContactMapError::Config(format!("invalid allowed_origin: {e}")))?;
        Ok(())
    }
}
