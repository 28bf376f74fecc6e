//! 浏览器动作
//!
//! 七种动作的封闭枚举，以及从 Planner 工具调用（名称 + 原始 JSON 参数）到 `ActionRequest` 的解析。
//! 解析只检查形状（JSON 合法、是对象、数值可转换、工具名已知）；缺失的必填参数保留为 None，
//! 由 ActionExecutor 按状态优先的顺序报告。

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::llm::ToolInvocation;
use crate::tools::ActionError;

/// 动作种类；`tool_name` 为工具目录中的函数名
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Start,
    Navigate,
    Click,
    Type,
    Scroll,
    Observe,
    Stop,
}

impl ActionKind {
    pub const ALL: [ActionKind; 7] = [
        ActionKind::Start,
        ActionKind::Navigate,
        ActionKind::Click,
        ActionKind::Type,
        ActionKind::Scroll,
        ActionKind::Observe,
        ActionKind::Stop,
    ];

    pub fn tool_name(self) -> &'static str {
        match self {
            ActionKind::Start => "start_browser",
            ActionKind::Navigate => "go_to_website",
            ActionKind::Click => "click_at_coordinates",
            ActionKind::Type => "input_text_at_coordinates",
            ActionKind::Scroll => "scroll_page",
            ActionKind::Observe => "refresh_content",
            ActionKind::Stop => "close_browser",
        }
    }

    pub fn from_tool_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.tool_name() == name)
    }
}

/// 解析后的动作及其参数
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    Start,
    Navigate {
        url: Option<String>,
    },
    Click {
        x: Option<f64>,
        y: Option<f64>,
    },
    Type {
        x: Option<f64>,
        y: Option<f64>,
        text: String,
    },
    /// 缺省 (0, 500)，由执行器补齐
    Scroll {
        x: Option<f64>,
        y: Option<f64>,
    },
    Observe,
    Stop,
}

impl Action {
    pub fn kind(&self) -> ActionKind {
        match self {
            Action::Start => ActionKind::Start,
            Action::Navigate { .. } => ActionKind::Navigate,
            Action::Click { .. } => ActionKind::Click,
            Action::Type { .. } => ActionKind::Type,
            Action::Scroll { .. } => ActionKind::Scroll,
            Action::Observe => ActionKind::Observe,
            Action::Stop => ActionKind::Stop,
        }
    }
}

/// 带关联 id 的一次动作请求
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionRequest {
    pub call_id: String,
    pub action: Action,
}

impl ActionRequest {
    pub fn new(call_id: impl Into<String>, action: Action) -> Self {
        Self {
            call_id: call_id.into(),
            action,
        }
    }

    /// 解析一次工具调用；空参数字符串视为 `{}`
    pub fn from_invocation(invocation: &ToolInvocation) -> Result<Self, ActionError> {
        let kind = ActionKind::from_tool_name(&invocation.name).ok_or_else(|| {
            ActionError::InvalidArgument(format!("Unknown function: {}", invocation.name))
        })?;

        let raw = invocation.arguments.trim();
        let args: Value = if raw.is_empty() {
            Value::Object(Default::default())
        } else {
            serde_json::from_str(raw).map_err(|_| {
                ActionError::InvalidArgument(format!(
                    "Invalid arguments format from LLM: {}",
                    invocation.arguments
                ))
            })?
        };
        if !args.is_object() {
            return Err(ActionError::InvalidArgument(format!(
                "Arguments for {} must be a JSON object",
                invocation.name
            )));
        }

        let action = match kind {
            ActionKind::Start => Action::Start,
            ActionKind::Navigate => Action::Navigate {
                url: string_arg(&args, "url")?,
            },
            ActionKind::Click => Action::Click {
                x: number_arg(&args, "x")?,
                y: number_arg(&args, "y")?,
            },
            ActionKind::Type => Action::Type {
                x: number_arg(&args, "x")?,
                y: number_arg(&args, "y")?,
                text: string_arg(&args, "text")?.unwrap_or_default(),
            },
            ActionKind::Scroll => Action::Scroll {
                x: number_arg(&args, "x")?,
                y: number_arg(&args, "y")?,
            },
            ActionKind::Observe => Action::Observe,
            ActionKind::Stop => Action::Stop,
        };
        Ok(Self::new(invocation.call_id.clone(), action))
    }
}

/// 数值参数：接受 number 或可解析为数字的字符串；null / 缺失为 None
fn number_arg(args: &Value, key: &str) -> Result<Option<f64>, ActionError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .map(Some)
            .ok_or_else(|| {
                ActionError::InvalidArgument(format!("Argument '{key}' must be a number, got '{s}'"))
            }),
        Some(other) => Err(ActionError::InvalidArgument(format!(
            "Argument '{key}' must be a number, got {other}"
        ))),
    }
}

fn string_arg(args: &Value, key: &str) -> Result<Option<String>, ActionError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(ActionError::InvalidArgument(format!(
            "Argument '{key}' must be a string, got {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inv(name: &str, args: &str) -> ToolInvocation {
        ToolInvocation {
            call_id: "call_1".into(),
            name: name.into(),
            arguments: args.into(),
        }
    }

    #[test]
    fn test_tool_names_round_trip() {
        for kind in ActionKind::ALL {
            assert_eq!(ActionKind::from_tool_name(kind.tool_name()), Some(kind));
        }
        assert_eq!(ActionKind::from_tool_name("rm_rf"), None);
    }

    #[test]
    fn test_parse_click_with_string_coordinates() {
        let req = ActionRequest::from_invocation(&inv("click_at_coordinates", r#"{"x":"12.5","y":40}"#)).unwrap();
        assert_eq!(req.call_id, "call_1");
        assert_eq!(
            req.action,
            Action::Click {
                x: Some(12.5),
                y: Some(40.0)
            }
        );
    }

    #[test]
    fn test_missing_fields_left_for_executor() {
        let req = ActionRequest::from_invocation(&inv("click_at_coordinates", r#"{"x":1}"#)).unwrap();
        assert_eq!(req.action, Action::Click { x: Some(1.0), y: None });
        let nav = ActionRequest::from_invocation(&inv("go_to_website", "")).unwrap();
        assert_eq!(nav.action, Action::Navigate { url: None });
        let ty = ActionRequest::from_invocation(&inv("input_text_at_coordinates", r#"{"x":1,"y":2}"#)).unwrap();
        assert_eq!(
            ty.action,
            Action::Type {
                x: Some(1.0),
                y: Some(2.0),
                text: String::new()
            }
        );
    }

    #[test]
    fn test_malformed_arguments() {
        for (name, args) in [
            ("click_at_coordinates", "{not json"),
            ("click_at_coordinates", "[1,2]"),
            ("click_at_coordinates", r#"{"x":"left","y":2}"#),
            ("click_at_coordinates", r#"{"x":true,"y":2}"#),
            ("go_to_website", r#"{"url":42}"#),
            ("teleport", "{}"),
        ] {
            let err = ActionRequest::from_invocation(&inv(name, args)).unwrap_err();
            assert!(
                matches!(err, ActionError::InvalidArgument(_)),
                "{name} {args} -> {err:?}"
            );
        }
    }

    #[test]
    fn test_unknown_tool_message() {
        let err = ActionRequest::from_invocation(&inv("teleport", "{}")).unwrap_err();
        assert_eq!(err.to_string(), "Unknown function: teleport");
    }
}
