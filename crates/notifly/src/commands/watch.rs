//! `notifly watch`: stream push notifications until interrupted.

use owo_colors::OwoColorize;
use secrecy::SecretString;
use tokio::sync::watch;

use notifly_core::{
    ConnectionState, ConnectionStatus, FrameType, NotificationKind, NotificationService, PushFrame,
};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

use super::notifications::is_urgent;

pub async fn handle(
    service: &NotificationService,
    token: SecretString,
    args: &WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let (listener, mut frames) = service.bus().subscribe_channel();
    let (_session, session_rx) = watch::channel(Some(token));
    service.bind_session(session_rx);

    let color = output::should_color(&global.color);
    let mut received = 0usize;

    let result = loop {
        tokio::select! {
            biased;
            _ = tokio::signal::ctrl_c() => {
                tracing::debug!("interrupted");
                break Ok(());
            }
            frame = frames.recv() => {
                let Some(frame) = frame else { break Ok(()) };
                match frame.frame_type {
                    FrameType::Notification => {
                        print_notification(&frame, global, color)?;
                        received += 1;
                        if args.count.is_some_and(|n| received >= n) {
                            break Ok(());
                        }
                    }
                    FrameType::Connection => {
                        if let Some(done) = on_connection(service, frame.status, global) {
                            break done;
                        }
                    }
                    FrameType::Error => {
                        let message = frame.message.as_deref().unwrap_or("unknown error");
                        tracing::warn!(%message, "push channel error");
                        if exhausted(service) {
                            break Err(CliError::ConnectionFailed {
                                url: service.config().ws_url.to_string(),
                                reason: message.to_owned(),
                            });
                        }
                    }
                    FrameType::Unknown => tracing::debug!("ignoring unknown frame"),
                }
            }
        }
    };

    service.bus().unsubscribe(listener);
    service.dispose().await;
    result
}

/// React to a connection status frame. `Some` ends the watch.
fn on_connection(
    service: &NotificationService,
    status: Option<ConnectionStatus>,
    global: &GlobalOpts,
) -> Option<Result<(), CliError>> {
    match status {
        Some(ConnectionStatus::Connected) => {
            if !global.quiet {
                eprintln!("Connected to {}", service.config().ws_url);
            }
            None
        }
        Some(ConnectionStatus::Disconnected) => {
            let retry = service.connection().retry_state();
            // After the last retry the error frame that follows ends the watch.
            if service.connection().state() == ConnectionState::Disconnected && !exhausted(service)
            {
                if !global.quiet {
                    eprintln!("Push channel closed by server");
                }
                return Some(Ok(()));
            }
            tracing::info!(attempt = retry.attempt, "push channel dropped, reconnecting");
            None
        }
        _ => None,
    }
}

fn exhausted(service: &NotificationService) -> bool {
    service.connection().state() == ConnectionState::Disconnected
        && service.connection().retry_state().attempt >= service.config().channel.max_attempts
}

fn print_notification(frame: &PushFrame, global: &GlobalOpts, color: bool) -> Result<(), CliError> {
    let line = match global.output {
        OutputFormat::Json | OutputFormat::JsonCompact => serde_json::to_string(frame)?,
        OutputFormat::Plain => match frame.id {
            Some(serde_json::Value::String(ref id)) => id.clone(),
            Some(ref id) => id.to_string(),
            None => String::new(),
        },
        OutputFormat::Table => {
            let kind = frame
                .notification_type
                .as_deref()
                .map_or(NotificationKind::Other, NotificationKind::from_wire);
            let title = frame.title.as_deref().unwrap_or_default();
            let message = frame.message.as_deref().unwrap_or_default();
            if color && is_urgent(kind) {
                format!("{} {} {}", kind.red().bold(), title.bold(), message)
            } else if color {
                format!("{} {} {}", kind.cyan(), title.bold(), message)
            } else {
                format!("[{kind}] {title} {message}")
            }
        }
    };
    output::print_output(&line, global.quiet);
    Ok(())
}
