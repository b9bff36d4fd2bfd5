use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};

use playground_geo::api_adresse::DEFAULT_BASE_URL;

/// Secrets that ship in examples and must never sign real sessions.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
    "secret",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Sqlite,
    Json,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub addr: SocketAddr,
    pub jwt_secret: String,
    pub store: StoreKind,
    pub db_path: PathBuf,
    pub json_path: PathBuf,
    pub seed_file: Option<PathBuf>,
    pub geocoder_url: String,
    pub geocoder_timeout: Duration,
    pub dev_login: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key → value source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let jwt_secret = lookup("PLAYGROUND_JWT_SECRET").unwrap_or_default();
        if jwt_secret.trim().is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("PLAYGROUND_JWT_SECRET is unset or still a placeholder");
        }

        let host = var("PLAYGROUND_HOST", "0.0.0.0");
        let port: u16 = var("PLAYGROUND_PORT", "5000")
            .parse()
            .context("PLAYGROUND_PORT must be a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port)
            .parse()
            .with_context(|| format!("Invalid listen address {}:{}", host, port))?;

        let store = match var("PLAYGROUND_STORE", "sqlite").to_ascii_lowercase().as_str() {
            "sqlite" => StoreKind::Sqlite,
            "json" => StoreKind::Json,
            "memory" => StoreKind::Memory,
            other => bail!("PLAYGROUND_STORE must be sqlite, json or memory, got '{}'", other),
        };

        let timeout_secs: u64 = var("PLAYGROUND_GEOCODER_TIMEOUT_SECS", "5")
            .parse()
            .context("PLAYGROUND_GEOCODER_TIMEOUT_SECS must be a number of seconds")?;

        let dev_login = matches!(
            var("PLAYGROUND_DEV_LOGIN", "false").to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        );

        Ok(Self {
            addr,
            jwt_secret,
            store,
            db_path: var("PLAYGROUND_DB_PATH", "playgrounds.db").into(),
            json_path: var("PLAYGROUND_JSON_PATH", "playgrounds.json").into(),
            seed_file: lookup("PLAYGROUND_SEED_FILE")
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from),
            geocoder_url: var("PLAYGROUND_GEOCODER_URL", DEFAULT_BASE_URL),
            geocoder_timeout: Duration::from_secs(timeout_secs),
            dev_login,
        })
    }
}
