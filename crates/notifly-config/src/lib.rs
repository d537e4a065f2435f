//! Configuration for the notifly CLI.
//!
//! TOML profiles merged with `NOTIFLY_` environment overrides, bearer token
//! resolution (env var, then keyring, then plaintext), and translation to
//! `notifly_core::NotiflyConfig`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use notifly_core::{ChannelConfig, HistoryConfig, NotiflyConfig, TlsVerification};

/// Keyring service name; entries are keyed `{profile}/token`.
pub const KEYRING_SERVICE: &str = "notifly";

/// Fallback token variable when a profile names none.
pub const TOKEN_ENV: &str = "NOTIFLY_TOKEN";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no token configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{profile}' not found")]
    UnknownProfile {
        profile: String,
        /// Configured profile names, sorted.
        available: Vec<String>,
    },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level `config.toml`.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when `--profile` is not given.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named console profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Name of the profile to use, honoring an explicit override.
    pub fn profile_name(&self, requested: Option<&str>) -> String {
        requested
            .map(str::to_owned)
            .or_else(|| self.default_profile.clone())
            .unwrap_or_else(|| "default".into())
    }

    /// Look up a configured profile by name.
    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles.get(name).ok_or_else(|| {
            let mut available: Vec<_> = self.profiles.keys().cloned().collect();
            available.sort();
            ConfigError::UnknownProfile {
                profile: name.into(),
                available,
            }
        })
    }
}

/// Settings shared by every profile.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Automatic reconnects after an abnormal close.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Linear backoff unit in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// Delay before a displayed page is marked read, in milliseconds.
    #[serde(default = "default_view_delay_ms")]
    pub view_delay_ms: u64,

    /// Unread-count resync period in seconds; `0` disables it.
    #[serde(default)]
    pub unread_poll_secs: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            timeout: default_timeout(),
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            page_size: default_page_size(),
            view_delay_ms: default_view_delay_ms(),
            unread_poll_secs: 0,
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_max_attempts() -> u32 {
    5
}
fn default_base_delay_ms() -> u64 {
    3000
}
fn default_page_size() -> u32 {
    20
}
fn default_view_delay_ms() -> u64 {
    500
}

/// One console the CLI can talk to.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct Profile {
    /// History API root (e.g., "https://console.example.com/api/").
    pub api_url: String,

    /// Push channel host. Derived from `api_url` when omitted.
    pub ws_url: Option<String>,

    /// Bearer token (plaintext; prefer keyring or env var).
    pub token: Option<String>,

    /// Environment variable holding the bearer token.
    pub token_env: Option<String>,

    /// Path to a custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Skip TLS verification.
    pub insecure: Option<bool>,

    /// Override timeout.
    pub timeout: Option<u64>,

    /// Override page size.
    pub page_size: Option<u32>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("dev", "notifly", "notifly").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("notifly");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the config from the canonical path plus environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the config from `path` plus environment.
///
/// A missing file is not an error. Environment keys nest on `__`, e.g.
/// `NOTIFLY_DEFAULTS__PAGE_SIZE=50`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("NOTIFLY_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if it can't be read.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Token resolution ────────────────────────────────────────────────

/// Resolve the bearer token for a profile.
///
/// Order: the profile's `token_env` (or `NOTIFLY_TOKEN`), the system
/// keyring, then the plaintext `token` field.
pub fn resolve_token(profile: &Profile, profile_name: &str) -> Result<SecretString, ConfigError> {
    let env_name = profile.token_env.as_deref().unwrap_or(TOKEN_ENV);
    if let Ok(val) = std::env::var(env_name) {
        if !val.is_empty() {
            return Ok(SecretString::from(val));
        }
    }

    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/token")) {
        if let Ok(secret) = entry.get_password() {
            return Ok(SecretString::from(secret));
        }
    }

    if let Some(ref token) = profile.token {
        return Ok(SecretString::from(token.clone()));
    }

    Err(ConfigError::NoCredentials {
        profile: profile_name.into(),
    })
}

/// Store a token in the system keyring for `profile_name`.
pub fn store_token(profile_name: &str, token: &str) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &format!("{profile_name}/token")).map_err(
        |e| ConfigError::Validation {
            field: "keyring".into(),
            reason: e.to_string(),
        },
    )?;
    entry
        .set_password(token)
        .map_err(|e| ConfigError::Validation {
            field: "keyring".into(),
            reason: e.to_string(),
        })
}

// ── Translation ─────────────────────────────────────────────────────

fn parse_url(field: &str, raw: &str) -> Result<Url, ConfigError> {
    raw.parse().map_err(|e: url::ParseError| ConfigError::Validation {
        field: field.into(),
        reason: format!("invalid URL '{raw}': {e}"),
    })
}

/// Push host for an API root: same host, `ws`/`wss` scheme, root path.
pub fn derive_ws_url(api_url: &Url) -> Result<Url, ConfigError> {
    let scheme = match api_url.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => {
            return Err(ConfigError::Validation {
                field: "api_url".into(),
                reason: format!("unsupported scheme '{other}'"),
            });
        }
    };
    let host = api_url.host_str().ok_or_else(|| ConfigError::Validation {
        field: "api_url".into(),
        reason: "missing host".into(),
    })?;
    let raw = match api_url.port() {
        Some(port) => format!("{scheme}://{host}:{port}/"),
        None => format!("{scheme}://{host}/"),
    };
    parse_url("ws_url", &raw)
}

/// Build the runtime config for a profile.
pub fn profile_to_config(profile: &Profile, defaults: &Defaults) -> Result<NotiflyConfig, ConfigError> {
    let api_url = parse_url("api_url", &profile.api_url)?;
    let ws_url = match profile.ws_url.as_deref() {
        Some(raw) => parse_url("ws_url", raw)?,
        None => derive_ws_url(&api_url)?,
    };

    let tls = if profile.insecure.unwrap_or(false) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    let page_size = profile.page_size.unwrap_or(defaults.page_size);
    if page_size == 0 {
        return Err(ConfigError::Validation {
            field: "page_size".into(),
            reason: "must be at least 1".into(),
        });
    }

    Ok(NotiflyConfig {
        api_url,
        ws_url,
        tls,
        timeout: Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout)),
        channel: ChannelConfig {
            max_attempts: defaults.max_attempts,
            base_delay: Duration::from_millis(defaults.base_delay_ms),
        },
        history: HistoryConfig {
            page_size,
            view_delay: Duration::from_millis(defaults.view_delay_ms),
            unread_poll_interval: Duration::from_secs(defaults.unread_poll_secs),
        },
    })
}
