//! Configuration loading and management
//!
//! Settings come from an optional YAML file and are then overridden by
//! environment variables. Every field has a default, so an empty
//! environment yields a working development configuration.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming the YAML configuration file
pub const CONFIG_PATH_ENV: &str = "SHELFKEEP_CONFIG";

/// Secret used when none is configured in development mode
const DEVELOPMENT_JWT_SECRET: &str = "shelfkeep-development-secret";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    #[default]
    Development,
    Production,
}

/// Which total the pagination links are computed against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaginationTotal {
    /// Size of the whole collection, regardless of filters
    #[default]
    Collection,
    /// Number of records matching the filter
    Filtered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeocoderProvider {
    MapQuest,
    /// Offline geocoder echoing the address back
    #[default]
    Echo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub run_mode: RunMode,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            run_mode: RunMode::Development,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// MongoDB connection string; the in-memory store is used when absent
    pub uri: Option<String>,
    pub name: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            uri: None,
            name: "shelfkeep".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Largest accepted photo, in bytes
    pub max_file_upload: usize,
    /// Directory photos are written to
    pub path: PathBuf,
    /// Directory served as static files at `/`
    pub public_dir: PathBuf,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_upload: 1_000_000,
            path: PathBuf::from("./public/uploads"),
            public_dir: PathBuf::from("./public"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub jwt_secret: Option<String>,
    pub expire_days: i64,
    pub cookie_name: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: None,
            expire_days: 30,
            cookie_name: "token".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeocoderConfig {
    pub provider: GeocoderProvider,
    pub api_key: Option<String>,
    /// Replaces the provider's public endpoint (proxies, mirrors)
    pub endpoint: Option<String>,
}

/// Complete service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub uploads: UploadConfig,
    pub auth: AuthConfig,
    pub geocoder: GeocoderConfig,
    pub pagination_total: PaginationTotal,
}

impl AppConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        Self::from_yaml_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// YAML file from `SHELFKEEP_CONFIG` (if set), then process environment
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_yaml_file(path)?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply variables found through `lookup` on top of the current values
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(v) = get("HOST") {
            self.server.host = v;
        }
        if let Some(v) = get("PORT") {
            self.server.port = v.parse().with_context(|| format!("PORT={}", v))?;
        }
        if let Some(v) = get("RUN_MODE") {
            self.server.run_mode = parse_enum("RUN_MODE", &v)?;
        }
        if let Some(v) = get("MONGO_URI") {
            self.database.uri = Some(v);
        }
        if let Some(v) = get("DATABASE_NAME") {
            self.database.name = v;
        }
        if let Some(v) = get("MAX_FILE_UPLOAD") {
            self.uploads.max_file_upload =
                v.parse().with_context(|| format!("MAX_FILE_UPLOAD={}", v))?;
        }
        if let Some(v) = get("FILE_UPLOAD_PATH") {
            self.uploads.path = PathBuf::from(v);
        }
        if let Some(v) = get("PUBLIC_DIR") {
            self.uploads.public_dir = PathBuf::from(v);
        }
        if let Some(v) = get("JWT_SECRET") {
            self.auth.jwt_secret = Some(v);
        }
        if let Some(v) = get("JWT_EXPIRE_DAYS") {
            self.auth.expire_days = v.parse().with_context(|| format!("JWT_EXPIRE_DAYS={}", v))?;
        }
        if let Some(v) = get("JWT_COOKIE") {
            self.auth.cookie_name = v;
        }
        if let Some(v) = get("GEOCODER_PROVIDER") {
            self.geocoder.provider = parse_enum("GEOCODER_PROVIDER", &v)?;
        }
        if let Some(v) = get("GEOCODER_API_KEY") {
            self.geocoder.api_key = Some(v);
        }
        if let Some(v) = get("GEOCODER_ENDPOINT") {
            self.geocoder.endpoint = Some(v);
        }
        if let Some(v) = get("PAGINATION_TOTAL") {
            self.pagination_total = parse_enum("PAGINATION_TOTAL", &v)?;
        }
        Ok(())
    }

    /// Reject combinations the server cannot start with
    pub fn validate(&self) -> Result<()> {
        if self.server.run_mode == RunMode::Production && self.auth.jwt_secret.is_none() {
            bail!("JWT_SECRET must be set in production");
        }
        if self.geocoder.provider == GeocoderProvider::MapQuest && self.geocoder.api_key.is_none()
        {
            bail!("GEOCODER_API_KEY is required for the mapquest geocoder");
        }
        if self.uploads.max_file_upload == 0 {
            bail!("MAX_FILE_UPLOAD must be positive");
        }
        Ok(())
    }

    /// Signing secret, falling back to a fixed value outside production
    pub fn jwt_secret(&self) -> &str {
        self.auth
            .jwt_secret
            .as_deref()
            .unwrap_or(DEVELOPMENT_JWT_SECRET)
    }

    pub fn is_development(&self) -> bool {
        self.server.run_mode == RunMode::Development
    }

    /// `host:port` the listener binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// Parse a lowercase enum name using its serde representation
fn parse_enum<T: serde::de::DeserializeOwned>(key: &str, raw: &str) -> Result<T> {
    serde_yaml::from_str(&raw.trim().to_lowercase())
        .with_context(|| format!("unsupported value for {}: {}", key, raw))
}
