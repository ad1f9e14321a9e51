use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

pub const ENV_HTTP_ADDR: &str = "ITEMKV_HTTP_ADDR";
pub const ENV_API_KEYS: &str = "ITEMKV_API_KEYS";
pub const ENV_KEY_PREFIX: &str = "ITEMKV_KEY_PREFIX";
pub const ENV_REDIS_ADDR: &str = "ITEMKV_REDIS_ADDR";

/// Server settings.
///
/// Resolution order: defaults, then the TOML file (missing fields keep their
/// defaults), then environment overrides.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Bearer tokens accepted for mutating requests.
    pub api_keys: Vec<String>,
    pub allow_anonymous_read: bool,
    /// Namespace for every store key this server writes.
    pub key_prefix: String,
    /// Redis server, as `host:port` or a `redis://` URL. Unset means the
    /// in-memory store.
    pub redis_addr: Option<String>,
    pub max_body_bytes: usize,
    /// Upper bound on handling one request, body read included.
    pub request_timeout_secs: u64,
    pub shutdown_grace_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 9090)),
            api_keys: Vec::new(),
            allow_anonymous_read: true,
            key_prefix: String::new(),
            redis_addr: None,
            max_body_bytes: 1024 * 1024,
            request_timeout_secs: 10,
            shutdown_grace_secs: 5,
        }
    }
}

impl ServerConfig {
    pub fn from_toml_str(text: &str) -> ServerResult<Self> {
        toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Defaults, overlaid with `path` when given, then the process
    /// environment. The result is validated.
    pub fn load(path: Option<&Path>) -> ServerResult<Self> {
        let config = Self::load_with_env(path, |name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults, overlaid with `path` when given, then `lookup`. Not
    /// validated, so callers can apply further overrides first.
    pub fn load_with_env<F>(path: Option<&Path>, lookup: F) -> ServerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    ServerError::Config(format!("cannot read {}: {e}", path.display()))
                })?;
                Self::from_toml_str(&text)?
            }
            None => Self::default(),
        };
        config.apply_env(lookup)?;
        Ok(config)
    }

    /// Apply overrides from an environment lookup. Unset or blank variables
    /// leave the current value alone.
    pub fn apply_env<F>(&mut self, lookup: F) -> ServerResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(addr) = var(ENV_HTTP_ADDR) {
            self.bind_addr = addr
                .trim()
                .parse()
                .map_err(|e| ServerError::Config(format!("{ENV_HTTP_ADDR}={addr}: {e}")))?;
        }
        if let Some(keys) = var(ENV_API_KEYS) {
            self.api_keys = parse_api_keys(&keys);
        }
        if let Some(prefix) = var(ENV_KEY_PREFIX) {
            self.key_prefix = prefix.trim().to_string();
        }
        if let Some(addr) = var(ENV_REDIS_ADDR) {
            self.redis_addr = Some(addr.trim().to_string());
        }
        Ok(())
    }

    pub fn validate(&self) -> ServerResult<()> {
        if self.max_body_bytes == 0 {
            return Err(ServerError::Config("max_body_bytes must be positive".into()));
        }
        if self.request_timeout_secs == 0 {
            return Err(ServerError::Config("request_timeout_secs must be positive".into()));
        }
        if self.api_keys.iter().any(|k| k.trim().is_empty()) {
            return Err(ServerError::Config("api_keys must not contain blank keys".into()));
        }
        if self.redis_addr.as_deref().is_some_and(|a| a.trim().is_empty()) {
            return Err(ServerError::Config("redis_addr must not be blank".into()));
        }
        if self.api_keys.is_empty() {
            tracing::warn!("no API keys configured; every write request will be rejected");
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Connection URL for `redis_addr`. A bare `host:port` gets the
    /// `redis://` scheme.
    pub fn redis_url(&self) -> Option<String> {
        self.redis_addr.as_deref().map(|addr| {
            if addr.contains("://") {
                addr.to_string()
            } else {
                format!("redis://{addr}")
            }
        })
    }

    /// The configuration as TOML, with API keys and any Redis password
    /// masked.
    pub fn to_redacted_toml(&self) -> ServerResult<String> {
        let mut redacted = self.clone();
        redacted.api_keys = self.api_keys.iter().map(|_| "********".to_string()).collect();
        redacted.redis_addr = self.redis_addr.as_deref().map(redact_userinfo);
        toml::to_string(&redacted).map_err(|e| ServerError::Config(e.to_string()))
    }
}

fn redact_userinfo(addr: &str) -> String {
    match (addr.find("://"), addr.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://********{}", &addr[..scheme_end], &addr[at..])
        }
        _ => addr.to_string(),
    }
}

/// Split a comma-separated key list, dropping blanks and duplicates.
pub fn parse_api_keys(list: &str) -> Vec<String> {
    let mut keys: Vec<String> = Vec::new();
    for key in list.split(',').map(str::trim).filter(|k| !k.is_empty()) {
        if !keys.iter().any(|k| k == key) {
            keys.push(key.to_string());
        }
    }
    keys
}
