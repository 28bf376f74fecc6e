//! 会话历史
//!
//! `Message` 是五种条目的封闭枚举；`History` 把条目存成只追加的数组，每条附带一个可变的
//! 「已脱敏」标记。压缩器只翻转标记，条目本身从不修改，因此位置与 call_id 对应关系不会被破坏；
//! 发给 Planner 时再按标记渲染（页面快照段替换为占位文本）。

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// 页面快照在动作结果文本中的起始标记
pub const SNAPSHOT_OPEN: &str = "<page_content>";
/// 页面快照在动作结果文本中的结束标记
pub const SNAPSHOT_CLOSE: &str = "</page_content>";
/// 脱敏后快照段的占位文本
pub const REDACTED_PLACEHOLDER: &str = "Cleared to reduce tokens";

/// 单条历史消息
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Message {
    System {
        content: String,
    },
    User {
        content: String,
    },
    /// Planner 的自由文本（思考 / 解释 / 最终回复）
    Assistant {
        content: String,
    },
    /// Planner 请求的一次工具调用（原样保存参数字符串）
    ActionRequest {
        call_id: String,
        name: String,
        arguments: String,
    },
    /// 与 ActionRequest 一一对应的执行结果
    ActionOutcome {
        call_id: String,
        output: String,
    },
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Message::System {
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Message::User {
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Message::Assistant {
            content: content.into(),
        }
    }

    pub fn action_request(
        call_id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Message::ActionRequest {
            call_id: call_id.into(),
            name: name.into(),
            arguments: arguments.into(),
        }
    }

    pub fn action_outcome(call_id: impl Into<String>, output: impl Into<String>) -> Self {
        Message::ActionOutcome {
            call_id: call_id.into(),
            output: output.into(),
        }
    }

    pub fn is_system(&self) -> bool {
        matches!(self, Message::System { .. })
    }

    /// 是否为带页面快照标记的动作结果
    pub fn has_snapshot(&self) -> bool {
        match self {
            Message::ActionOutcome { output, .. } => snapshot_span(output).is_some(),
            _ => false,
        }
    }
}

/// 快照段（两个标记之间的内容）在文本中的字节范围
fn snapshot_span(output: &str) -> Option<(usize, usize)> {
    let start = output.find(SNAPSHOT_OPEN)? + SNAPSHOT_OPEN.len();
    let end = start + output[start..].find(SNAPSHOT_CLOSE)?;
    Some((start, end))
}

/// 将快照段替换为占位文本，保留标记与前后的状态描述；无标记时返回 None
pub fn redact_snapshot(output: &str) -> Option<String> {
    let (start, end) = snapshot_span(output)?;
    Some(format!(
        "{}{}{}",
        &output[..start],
        REDACTED_PLACEHOLDER,
        &output[end..]
    ))
}

/// 历史中的一条：不可变消息 + 脱敏标记
#[derive(Clone, Debug, Serialize)]
pub struct Entry {
    message: Message,
    redacted: bool,
}

impl Entry {
    pub fn message(&self) -> &Message {
        &self.message
    }

    pub fn is_redacted(&self) -> bool {
        self.redacted
    }

    /// 发给 Planner 的视图：已脱敏的动作结果替换快照段
    pub fn rendered(&self) -> Cow<'_, Message> {
        match (&self.message, self.redacted) {
            (Message::ActionOutcome { call_id, output }, true) => match redact_snapshot(output) {
                Some(output) => Cow::Owned(Message::ActionOutcome {
                    call_id: call_id.clone(),
                    output,
                }),
                None => Cow::Borrowed(&self.message),
            },
            _ => Cow::Borrowed(&self.message),
        }
    }
}

/// 会话历史：只追加；唯一的原地修改是脱敏标记
#[derive(Clone, Debug, Default, Serialize)]
pub struct History {
    entries: Vec<Entry>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    /// 以一条 system prompt 作为基线创建
    pub fn with_system(prompt: impl Into<String>) -> Self {
        let mut history = Self::new();
        history.push(Message::system(prompt));
        history
    }

    /// 追加一条消息；若与上一条是内容相同的 assistant 文本则丢弃并返回 false
    pub fn push(&mut self, message: Message) -> bool {
        if let (Message::Assistant { content }, Some(Message::Assistant { content: last })) =
            (&message, self.last())
        {
            if content == last {
                return false;
            }
        }
        self.entries.push(Entry {
            message,
            redacted: false,
        });
        true
    }

    pub fn last(&self) -> Option<&Message> {
        self.entries.last().map(|e| &e.message)
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 渲染后的消息列表（供 Planner）
    pub fn messages(&self) -> Vec<Message> {
        self.entries.iter().map(|e| e.rendered().into_owned()).collect()
    }

    /// 带快照标记的动作结果所在位置（按顺序）
    pub fn snapshot_positions(&self) -> Vec<usize> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.message.has_snapshot())
            .map(|(i, _)| i)
            .collect()
    }

    /// 设置某条的脱敏标记，返回之前的值
    pub(crate) fn set_redacted(&mut self, index: usize, redacted: bool) -> bool {
        match self.entries.get_mut(index) {
            Some(entry) => std::mem::replace(&mut entry.redacted, redacted),
            None => false,
        }
    }

    /// 清空到基线：只保留开头连续的 system 条目
    pub fn reset_to_baseline(&mut self) {
        let keep = self
            .entries
            .iter()
            .take_while(|e| e.message.is_system())
            .count();
        self.entries.truncate(keep);
        for entry in &mut self.entries {
            entry.redacted = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome_with_snapshot(id: &str, body: &str) -> Message {
        Message::action_outcome(
            id,
            format!("Status: Success. Message: ok\n{SNAPSHOT_OPEN}\n{body}\n{SNAPSHOT_CLOSE}"),
        )
    }

    #[test]
    fn test_assistant_dedup_on_append() {
        let mut h = History::with_system("sys");
        assert!(h.push(Message::assistant("thinking")));
        assert!(!h.push(Message::assistant("thinking")));
        assert_eq!(h.len(), 2);
        // 非相邻的重复文本允许
        h.push(Message::user("go on"));
        assert!(h.push(Message::assistant("thinking")));
        assert_eq!(h.len(), 4);
    }

    #[test]
    fn test_redact_keeps_markers_and_header() {
        let msg = outcome_with_snapshot("c1", "{\"url\":\"https://a.com\"}");
        let Message::ActionOutcome { output, .. } = &msg else {
            panic!("expected outcome");
        };
        let redacted = redact_snapshot(output).unwrap();
        assert!(redacted.starts_with("Status: Success. Message: ok\n"));
        assert!(redacted.contains(&format!("{SNAPSHOT_OPEN}{REDACTED_PLACEHOLDER}{SNAPSHOT_CLOSE}")));
        assert!(!redacted.contains("https://a.com"));
    }

    #[test]
    fn test_error_outcome_has_no_snapshot() {
        let msg = Message::action_outcome("c1", "Status: Error. Error Message: Browser not started");
        assert!(!msg.has_snapshot());
        assert!(!Message::user(SNAPSHOT_OPEN).has_snapshot());
    }

    #[test]
    fn test_rendered_view_applies_flag_only() {
        let mut h = History::with_system("sys");
        h.push(outcome_with_snapshot("c1", "page-1"));
        h.set_redacted(1, true);
        assert!(h.entries()[1].is_redacted());
        // 原始消息不变
        assert_eq!(h.entries()[1].message(), &outcome_with_snapshot("c1", "page-1"));
        let view = h.messages();
        match &view[1] {
            Message::ActionOutcome { call_id, output } => {
                assert_eq!(call_id, "c1");
                assert!(output.contains(REDACTED_PLACEHOLDER));
                assert!(!output.contains("page-1"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_reset_to_baseline_keeps_system_prompt() {
        let mut h = History::with_system("sys");
        h.push(Message::user("a"));
        h.push(Message::assistant("b"));
        h.push(Message::action_request("c1", "refresh_content", "{}"));
        h.push(outcome_with_snapshot("c1", "x"));
        assert_eq!(h.len(), 5);
        h.reset_to_baseline();
        assert_eq!(h.len(), 1);
        assert!(h.entries()[0].message().is_system());
    }

    #[test]
    fn test_message_serde_tag() {
        let json = serde_json::to_value(Message::action_request("c9", "go_to_website", "{}")).unwrap();
        assert_eq!(json["role"], "action_request");
        assert_eq!(json["call_id"], "c9");
    }
}
