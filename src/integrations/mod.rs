//! 外部接入：HTTP 服务前端（需 feature `web`）

#[cfg(feature = "web")]
pub mod http;

#[cfg(feature = "web")]
pub use http::{create_router, HttpState};
