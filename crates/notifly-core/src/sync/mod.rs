// ── History sync ──

mod confirm;
mod controller;
mod page_view;

pub use confirm::{AssumeYes, Confirm};
pub use controller::{HistoryFilters, HistoryPage, SyncController};
pub use page_view::PageView;
