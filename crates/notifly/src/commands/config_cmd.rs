//! Config subcommand handlers.

use std::fmt::Write;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config};
use crate::error::CliError;
use crate::output;

/// Format config for display, masking tokens.
fn format_config_redacted(cfg: &Config) -> String {
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let d = &cfg.defaults;
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", d.output);
    let _ = writeln!(out, "color = \"{}\"", d.color);
    let _ = writeln!(out, "timeout = {}", d.timeout);
    let _ = writeln!(out, "max_attempts = {}", d.max_attempts);
    let _ = writeln!(out, "base_delay_ms = {}", d.base_delay_ms);
    let _ = writeln!(out, "page_size = {}", d.page_size);
    let _ = writeln!(out, "view_delay_ms = {}", d.view_delay_ms);
    let _ = writeln!(out, "unread_poll_secs = {}", d.unread_poll_secs);

    let mut names: Vec<_> = cfg.profiles.keys().collect();
    names.sort();
    for name in names {
        let p = &cfg.profiles[name];
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        let _ = writeln!(out, "api_url = \"{}\"", p.api_url);
        if let Some(ref ws) = p.ws_url {
            let _ = writeln!(out, "ws_url = \"{ws}\"");
        }
        if p.token.is_some() {
            let _ = writeln!(out, "token = \"****\"");
        }
        if let Some(ref env) = p.token_env {
            let _ = writeln!(out, "token_env = \"{env}\"");
        }
        if let Some(ref ca) = p.ca_cert {
            let _ = writeln!(out, "ca_cert = \"{}\"", ca.display());
        }
        if let Some(insecure) = p.insecure {
            let _ = writeln!(out, "insecure = {insecure}");
        }
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
        if let Some(page_size) = p.page_size {
            let _ = writeln!(out, "page_size = {page_size}");
        }
    }

    out
}

pub fn handle(args: &ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = notifly_config::load_config()?;
            output::print_output(format_config_redacted(&cfg).trim_end(), global.quiet);
            Ok(())
        }

        ConfigCommand::SetToken { ref token } => {
            let cfg = config::load_config_or_default();
            let profile = config::active_profile_name(global, &cfg);
            notifly_config::store_token(&profile, token)?;
            if !global.quiet {
                eprintln!("Token stored in keyring for profile '{profile}'");
            }
            Ok(())
        }
    }
}
