//! 页面快照
//!
//! Actuator 在动作完成后抓取的可见交互元素列表。字段名与注入页面的提取脚本输出（camelCase）一致，
//! 可直接反序列化；发给 Planner 时每个元素渲染为一行
//! `[i] <tag role='..' id='..' name='..' class='..'> text (at x:.., y:..)`。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// 元素在视口中的位置（左上角）与尺寸，单位 CSS 像素
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ElementBox {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub width: f64,
    #[serde(default)]
    pub height: f64,
}

/// 一个可见的交互元素
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageElement {
    pub highlight_index: usize,
    pub tag_name: String,
    /// role 属性，缺省为标签名
    #[serde(rename = "type")]
    pub role: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    pub coordinates: ElementBox,
}

impl PageElement {
    /// 单行描述；只带 id / name / class 三个属性，role 与标签名相同时省略
    pub fn describe(&self) -> String {
        let mut line = format!("[{}] <{}", self.highlight_index, self.tag_name);
        if self.role != self.tag_name {
            line.push_str(&format!(" role='{}'", self.role));
        }
        for attr in ["id", "name", "class"] {
            if let Some(value) = self.attributes.get(attr) {
                line.push_str(&format!(" {attr}='{value}'"));
            }
        }
        line.push_str(&format!(
            "> {} (at x:{}, y:{})",
            self.text, self.coordinates.x, self.coordinates.y
        ));
        line
    }
}

/// 页面快照：URL、标题、按出现顺序排列的可见交互元素
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub url: String,
    pub title: String,
    #[serde(rename = "interactiveElements", default)]
    pub elements: Vec<PageElement>,
}

impl PageSnapshot {
    /// 元素描述行；每次调用重新迭代
    pub fn element_lines(&self) -> impl Iterator<Item = String> + '_ {
        self.elements.iter().map(PageElement::describe)
    }

    /// 写入 `<page_content>` 段的 JSON 形态
    pub fn to_content(&self) -> serde_json::Value {
        serde_json::json!({
            "url": self.url,
            "title": self.title,
            "elements": self.element_lines().collect::<Vec<_>>(),
            "element_count": self.elements.len(),
        })
    }
}
