//! 记忆层：会话历史、历史压缩、诊断转储

pub mod compactor;
pub mod conversation;
pub mod persistence;

pub use compactor::{CompactionReport, HistoryCompactor, DEFAULT_KEEP_SNAPSHOTS};
pub use conversation::{
    redact_snapshot, Entry, History, Message, REDACTED_PLACEHOLDER, SNAPSHOT_CLOSE,
    SNAPSHOT_OPEN,
};
pub use persistence::HistoryDump;
