//! 核心层：顶层错误、优雅关闭

pub mod error;
pub mod shutdown;

pub use error::AgentError;
pub use shutdown::{close_all_sessions, ShutdownManager, ShutdownReason};
