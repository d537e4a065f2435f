//! Profile resolution: config file, active profile, and CLI flag overrides.
//!
//! Thin layer over `notifly-config`; the result is a ready-to-use
//! `NotiflyConfig` plus the bearer token for the session.

use secrecy::SecretString;

pub use notifly_config::{Config, Profile, config_path, load_config_or_default};
use notifly_core::NotiflyConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Everything a command needs to talk to the console.
#[derive(Debug)]
pub struct Resolved {
    pub profile: String,
    pub config: NotiflyConfig,
    pub token: SecretString,
}

/// Determine the active profile name: `--profile` flag, then config default.
pub fn active_profile_name(global: &GlobalOpts, cfg: &Config) -> String {
    cfg.profile_name(global.profile.as_deref())
}

/// Resolve the active profile with flag overrides applied.
///
/// Without a matching profile the endpoint must come from `--api-url`
/// (or `NOTIFLY_API_URL`) and the token from `--token`.
pub fn resolve(global: &GlobalOpts, cfg: &Config) -> Result<Resolved, CliError> {
    let profile_name = active_profile_name(global, cfg);

    let (profile, from_file) = match cfg.profile(&profile_name) {
        Ok(p) => (apply_overrides(p.clone(), global), true),
        Err(err) => {
            if global.profile.is_some() && !cfg.profiles.is_empty() {
                return Err(err.into());
            }
            let api_url = global.api_url.clone().ok_or_else(|| CliError::NoConfig {
                path: config_path().display().to_string(),
            })?;
            let seed = Profile {
                api_url,
                ..Profile::default()
            };
            (apply_overrides(seed, global), false)
        }
    };

    let config = notifly_config::profile_to_config(&profile, &cfg.defaults)?;

    let token = match global.token.as_deref() {
        Some(t) if !t.is_empty() => SecretString::from(t.to_owned()),
        _ if from_file => notifly_config::resolve_token(&profile, &profile_name)?,
        _ => {
            return Err(CliError::NoCredentials {
                profile: profile_name,
            });
        }
    };

    Ok(Resolved {
        profile: profile_name,
        config,
        token,
    })
}

fn apply_overrides(mut profile: Profile, global: &GlobalOpts) -> Profile {
    if let Some(ref url) = global.api_url {
        profile.api_url.clone_from(url);
    }
    if let Some(ref ws) = global.ws_url {
        profile.ws_url = Some(ws.clone());
    }
    if global.insecure {
        profile.insecure = Some(true);
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }
    profile
}
