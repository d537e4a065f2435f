//! Shared helpers for command handlers.

use std::io::IsTerminal;

use notifly_core::Confirm;
use tokio::runtime::{Handle, RuntimeFlavor};

use crate::error::CliError;

/// Interactive confirmation via dialoguer, auto-approving with `--yes`.
#[derive(Debug, Clone, Copy)]
pub struct TerminalConfirm {
    pub yes: bool,
}

impl Confirm for TerminalConfirm {
    fn confirm(&self, prompt: &str) -> bool {
        if self.yes {
            return true;
        }
        // The prompt blocks on stdin; keep other tasks on this worker moving.
        match Handle::try_current().map(|h| h.runtime_flavor()) {
            Ok(RuntimeFlavor::MultiThread) => tokio::task::block_in_place(|| ask(prompt)),
            _ => ask(prompt),
        }
    }
}

fn ask(prompt: &str) -> bool {
    match dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
    {
        Ok(answer) => answer,
        Err(e) => {
            tracing::warn!(error = %e, "confirmation prompt failed; treating as declined");
            false
        }
    }
}

/// Refuse a destructive action when nobody can answer the prompt.
pub fn require_interactive_or_yes(action: &str, yes: bool) -> Result<(), CliError> {
    if yes || std::io::stdin().is_terminal() {
        return Ok(());
    }
    Err(CliError::NonInteractiveRequiresYes {
        action: action.into(),
    })
}

/// Truncate `text` to `max` characters with a trailing ellipsis.
pub fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_owned();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yes_flag_skips_prompt() {
        assert!(TerminalConfirm { yes: true }.confirm("Really?"));
        assert!(require_interactive_or_yes("clear-all", true).is_ok());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn yes_flag_skips_prompt_inside_runtime() {
        let confirm: &dyn Confirm = &TerminalConfirm { yes: true };
        assert!(confirm.confirm("Clear all notifications?"));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("héllo wörld", 6), "héllo…");
    }
}
