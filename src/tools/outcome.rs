//! 动作结果
//!
//! `ActionOutcome` 是执行器对调用方的唯一返回形态：成功带消息与可选快照，失败带 `ActionError`。
//! `render` 生成写入历史的文本，成功时快照放在 `<page_content>` 标记之间。

use serde::Serialize;
use thiserror::Error;

use crate::memory::{SNAPSHOT_CLOSE, SNAPSHOT_OPEN};
use crate::tools::PageSnapshot;

/// 单步动作错误；全部被吸收进对话历史，交互继续
#[derive(Error, Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum ActionError {
    /// 参数缺失、类型不对、URL 非法、未知工具
    #[error("{0}")]
    InvalidArgument(String),

    #[error("Browser not started. Please call start_browser first.")]
    NotStarted,

    #[error("Browser already started")]
    AlreadyStarted,

    /// 浏览器侧失败或超时
    #[error("{0}")]
    ActuatorFailure(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionOutcome {
    pub status: OutcomeStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<PageSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ActionError>,
}

impl ActionOutcome {
    pub fn success(message: impl Into<String>, snapshot: Option<PageSnapshot>) -> Self {
        Self {
            status: OutcomeStatus::Ok,
            message: message.into(),
            snapshot,
            error: None,
        }
    }

    pub fn failure(error: ActionError) -> Self {
        Self {
            status: OutcomeStatus::Error,
            message: error.to_string(),
            snapshot: None,
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == OutcomeStatus::Ok
    }

    /// 写入历史的文本
    pub fn render(&self) -> String {
        match self.status {
            OutcomeStatus::Ok => {
                let content = match &self.snapshot {
                    Some(snapshot) => snapshot.to_content(),
                    None => serde_json::Value::String("No content available".to_string()),
                };
                format!(
                    "Status: Success. Message: {}\n{SNAPSHOT_OPEN}\n{}\n{SNAPSHOT_CLOSE}",
                    self.message, content
                )
            }
            OutcomeStatus::Error => format!("Status: Error. Error Message: {}", self.message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Message;

    #[test]
    fn test_render_success_has_markers() {
        let snap = PageSnapshot {
            url: "https://a.com/".into(),
            title: "A".into(),
            elements: vec![],
        };
        let text = ActionOutcome::success("Navigated to https://a.com/", Some(snap)).render();
        assert!(text.starts_with("Status: Success. Message: Navigated to https://a.com/\n<page_content>\n"));
        assert!(text.ends_with("\n</page_content>"));
        assert!(text.contains("\"title\":\"A\""));
        assert!(Message::action_outcome("c", text).has_snapshot());
    }

    #[test]
    fn test_render_error_has_no_markers() {
        let outcome = ActionOutcome::failure(ActionError::NotStarted);
        assert!(!outcome.is_ok());
        assert_eq!(
            outcome.render(),
            "Status: Error. Error Message: Browser not started. Please call start_browser first."
        );
    }

    #[test]
    fn test_error_serialization() {
        let json = serde_json::to_value(ActionOutcome::failure(ActionError::InvalidArgument(
            "bad".into(),
        )))
        .unwrap();
        assert_eq!(json["status"], "error");
        assert_eq!(json["error"]["kind"], "invalid_argument");
        assert_eq!(json["error"]["detail"], "bad");
    }
}
