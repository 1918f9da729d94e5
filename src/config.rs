//! Startup configuration.
//!
//! All tunables live in one explicit `Config` value built in `main` and
//! passed by reference into the components that need them. Nothing in here
//! is stashed in process-wide statics. Sources, in order of precedence:
//! built-in defaults, an optional JSON config file, then environment
//! overrides (`ROSTRUM_HTTP_PORT`, `ROSTRUM_DB_FOLDER`, `ROSTRUM_PSK`).

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

const DEFAULT_NETPORT: u16 = 2586;
const DEFAULT_PSK: &str = "484dd6d1-9262-4975-a707-4238e08ed266";
const DEFAULT_PASSWORD_PEPPER: &str = "0a486beb-d953-4620-95c7-c99689fb228b";
const DEFAULT_DB_ROOT: &str = "data";
const DEFAULT_SESSION_TTL_SECS: u64 = 60 * 15;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetConfig {
    pub port: u16,
    /// Preshared key presented by clients to bootstrap a session.
    pub psk: String,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self { port: DEFAULT_NETPORT, psk: DEFAULT_PSK.to_string() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Server-wide pepper appended to passwords before hashing.
    pub pepper: String,
    /// Inactivity window, in seconds, before a session expires.
    pub session_ttl_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { pepper: DEFAULT_PASSWORD_PEPPER.to_string(), session_ttl_secs: DEFAULT_SESSION_TTL_SECS }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DbConfig {
    /// Root folder for the JSON document store.
    pub root: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self { root: DEFAULT_DB_ROOT.to_string() }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub net: NetConfig,
    pub auth: AuthConfig,
    pub db: DbConfig,
}

impl Config {
    /// Load configuration from an optional JSON file, then apply env overrides.
    ///
    /// Pointing `--config` at a missing file writes a default config there and
    /// fails, so the operator can edit it and start again.
    pub fn load(path: Option<&str>) -> Result<Config> {
        let mut config = match path {
            Some(p) if Path::new(p).exists() => {
                let raw = std::fs::read_to_string(p)
                    .with_context(|| format!("failed to read config file: {p}"))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("failed to parse config file: {p}"))?
            }
            Some(p) => {
                let default = Config::default();
                std::fs::write(p, serde_json::to_string_pretty(&default)?)
                    .with_context(|| format!("failed to write default config to: {p}"))?;
                bail!("new config generated at '{p}'; edit it and try again");
            }
            None => Config::default(),
        };
        config.apply_env();
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Some(port) = std::env::var("ROSTRUM_HTTP_PORT").ok().and_then(|v| v.parse::<u16>().ok()) {
            self.net.port = port;
        }
        if let Ok(psk) = std::env::var("ROSTRUM_PSK") {
            self.net.psk = psk;
        }
        if let Ok(root) = std::env::var("ROSTRUM_DB_FOLDER") {
            self.db.root = root;
        }
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.auth.session_ttl_secs)
    }
}
