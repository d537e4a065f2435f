//! Command dispatch: routes each subcommand to its handler.

pub mod config_cmd;
pub mod notifications;
pub mod util;
pub mod watch;

use notifly_core::NotificationService;
use secrecy::SecretString;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Dispatch a console command. History commands only authorize the sync
/// side; `watch` also opens the push channel.
pub async fn dispatch(
    cmd: Command,
    service: &NotificationService,
    token: SecretString,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    if let Command::Watch(ref args) = cmd {
        return watch::handle(service, token, args, global).await;
    }

    service.sync().authorize(&token)?;
    let sync = service.sync();

    let result = match cmd {
        Command::List(args) => notifications::list(sync, &args, global).await,
        Command::Get { id } => notifications::get(sync, id, global).await,
        Command::MarkRead { ids } => notifications::mark_read(sync, &ids, global).await,
        Command::MarkAllRead => notifications::mark_all_read(sync, global).await,
        Command::ClearAll => notifications::clear_all(sync, global).await,
        Command::UnreadCount => notifications::unread_count(sync, global).await,
        Command::Watch(_) | Command::Config(_) => Err(CliError::Internal(
            "command dispatched to the wrong handler".into(),
        )),
    };

    service.dispose().await;
    result
}
