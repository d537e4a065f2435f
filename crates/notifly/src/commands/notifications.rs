//! History command handlers: list, get, mark-read, clear.

use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::Tabled;

use notifly_core::{HistoryFilters, Notification, NotificationKind, SyncController};

use crate::cli::{GlobalOpts, ListArgs, OutputFormat};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct NotificationRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Read")]
    read: String,
    #[tabled(rename = "Created")]
    created: String,
}

impl NotificationRow {
    fn from_notification(n: &Notification, color: bool) -> Self {
        let kind = n.kind.to_string();
        Self {
            id: n.id.to_string(),
            kind: if color && is_urgent(n.kind) {
                kind.red().bold().to_string()
            } else {
                kind
            },
            title: util::truncate(&n.title, 48),
            read: if n.is_read { "yes".into() } else { "no".into() },
            created: n
                .created_at
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default(),
        }
    }
}

pub(super) fn is_urgent(kind: NotificationKind) -> bool {
    matches!(
        kind,
        NotificationKind::CriticalFinding | NotificationKind::AccessRequest
    )
}

pub(super) fn detail(n: &Notification) -> String {
    let mut lines = vec![
        format!("ID:       {}", n.id),
        format!("Type:     {}", n.kind),
        format!("Title:    {}", n.title),
        format!("Message:  {}", n.message),
        format!("Read:     {}", if n.is_read { "yes" } else { "no" }),
    ];
    if let Some(at) = n.created_at {
        lines.push(format!("Created:  {}", at.to_rfc3339()));
    }
    if !n.payload.is_null() {
        lines.push(format!("Payload:  {}", n.payload));
    }
    lines.join("\n")
}

#[derive(Serialize)]
struct UnreadCount {
    unread_count: u64,
}

// ── Handlers ────────────────────────────────────────────────────────

pub async fn list(sync: &SyncController, args: &ListArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let filters = HistoryFilters {
        is_read: args.is_read(),
        kind: args.kind.clone(),
    };

    let page = if args.mark_viewed {
        sync.open_page(&filters, args.page).await?.finish().await
    } else {
        sync.list(&filters, args.page).await?
    };

    let color = output::should_color(&global.color);
    let rendered = match global.output {
        OutputFormat::Json => serde_json::to_string_pretty(&page)?,
        OutputFormat::JsonCompact => serde_json::to_string(&page)?,
        _ => output::render_list(
            &global.output,
            &page.items,
            |n| NotificationRow::from_notification(n, color),
            |n| n.id.to_string(),
        )?,
    };
    output::print_output(&rendered, global.quiet);

    if matches!(global.output, OutputFormat::Table) && !global.quiet {
        eprintln!(
            "page {} of {} ({} total)",
            page.page,
            page.total_pages.max(1),
            page.count
        );
    }
    Ok(())
}

pub async fn get(sync: &SyncController, id: u64, global: &GlobalOpts) -> Result<(), CliError> {
    let notification = sync.get(id).await?;
    let rendered = output::render_single(&global.output, &notification, detail, |n| {
        n.id.to_string()
    })?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}

pub async fn mark_read(sync: &SyncController, ids: &[u64], global: &GlobalOpts) -> Result<(), CliError> {
    sync.mark_read(ids).await?;
    if !global.quiet {
        eprintln!("Marked {} notification(s) read", ids.len());
    }
    Ok(())
}

pub async fn mark_all_read(sync: &SyncController, global: &GlobalOpts) -> Result<(), CliError> {
    sync.mark_all_read().await?;
    if !global.quiet {
        eprintln!("All notifications marked read");
    }
    Ok(())
}

pub async fn clear_all(sync: &SyncController, global: &GlobalOpts) -> Result<(), CliError> {
    util::require_interactive_or_yes("clear-all", global.yes)?;
    let cleared = sync.clear_all().await?;
    if !global.quiet {
        if cleared {
            eprintln!("All notifications cleared");
        } else {
            eprintln!("Aborted");
        }
    }
    Ok(())
}

pub async fn unread_count(sync: &SyncController, global: &GlobalOpts) -> Result<(), CliError> {
    let count = UnreadCount {
        unread_count: sync.unread_count().await?,
    };
    let rendered = output::render_single(
        &global.output,
        &count,
        |c| format!("Unread: {}", c.unread_count),
        |c| c.unread_count.to_string(),
    )?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}
