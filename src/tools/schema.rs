//! 动作目录：七个浏览器工具的 function calling 定义
//!
//! 参数 Schema 由 schemars 从下面的参数结构体自动生成（仅用于 Schema 生成，不参与解析）。

use schemars::{schema_for, JsonSchema};

use crate::llm::ToolSpec;
use crate::tools::ActionKind;

#[allow(dead_code)]
#[derive(JsonSchema)]
struct NoArgs {}

#[allow(dead_code)]
#[derive(JsonSchema)]
struct NavigateArgs {
    /// The full URL to navigate to (including http:// or https://)
    url: String,
}

#[allow(dead_code)]
#[derive(JsonSchema)]
struct ClickArgs {
    /// X coordinate (horizontal position from left) obtained from page content
    x: f64,
    /// Y coordinate (vertical position from top) obtained from page content
    y: f64,
}

#[allow(dead_code)]
#[derive(JsonSchema)]
struct TypeArgs {
    /// X coordinate (horizontal position from left) of the input element, obtained from page content
    x: f64,
    /// Y coordinate (vertical position from top) of the input element, obtained from page content
    y: f64,
    /// The text to input
    text: String,
}

#[allow(dead_code)]
#[derive(JsonSchema)]
struct ScrollArgs {
    /// Horizontal scroll amount in pixels (positive scrolls right, negative scrolls left). Default is 0.
    #[serde(default)]
    x: f64,
    /// Vertical scroll amount in pixels (positive scrolls down, negative scrolls up). Default is 500 (scroll down).
    #[serde(default = "default_scroll_y")]
    y: f64,
}

fn default_scroll_y() -> f64 {
    500.0
}

fn description(kind: ActionKind) -> &'static str {
    match kind {
        ActionKind::Start => {
            "Launch a new Chrome browser window. Should be the first step if the browser isn't open."
        }
        ActionKind::Navigate => "Navigate the browser to a specific URL.",
        ActionKind::Click => {
            "Click at specific coordinates (x, y) on the page. Find coordinates from the latest page content."
        }
        ActionKind::Type => {
            "Input text into an element at specific coordinates (x, y) on the page. Find coordinates from the latest page content."
        }
        ActionKind::Scroll => {
            "Scroll the page vertically or horizontally by a specified number of pixels."
        }
        ActionKind::Observe => {
            "Retrieve the current visible interactive elements and page state without performing any navigation or interaction. Use this after user intervention (like solving a CAPTCHA) before resuming."
        }
        ActionKind::Stop => "Close the browser window and end the session.",
    }
}

/// 生成参数 Schema，去掉 `$schema` / `title`，并保证存在 `properties`
fn parameters(kind: ActionKind) -> serde_json::Value {
    let root = match kind {
        ActionKind::Start | ActionKind::Observe | ActionKind::Stop => schema_for!(NoArgs),
        ActionKind::Navigate => schema_for!(NavigateArgs),
        ActionKind::Click => schema_for!(ClickArgs),
        ActionKind::Type => schema_for!(TypeArgs),
        ActionKind::Scroll => schema_for!(ScrollArgs),
    };
    let mut value = serde_json::to_value(root).unwrap_or_else(|_| serde_json::json!({}));
    if let Some(obj) = value.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
        obj.entry("type").or_insert_with(|| "object".into());
        obj.entry("properties")
            .or_insert_with(|| serde_json::Value::Object(Default::default()));
    }
    value
}

/// 静态的七项工具目录（顺序固定）
pub fn action_catalog() -> Vec<ToolSpec> {
    ActionKind::ALL
        .into_iter()
        .map(|kind| ToolSpec {
            name: kind.tool_name().to_string(),
            description: description(kind).to_string(),
            parameters: parameters(kind),
        })
        .collect()
}
