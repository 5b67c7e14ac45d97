//! 从生成文本中提取 JSON 对象
//!
//! 生成服务的回复可能夹杂说明文字，只取第一个 `{` 到最后一个 `}` 之间的内容。

use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;

/// 取出第一个 `{` 与最后一个 `}` 之间的子串
pub fn json_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&text[start..=end])
}

/// 解析为 JSON 对象，失败（无花括号、语法错误、不是对象）时返回 None
pub fn parse_json_object(text: &str) -> Option<JsonValue> {
    let span = json_object_span(text)?;
    match serde_json::from_str::<JsonValue>(span) {
        Ok(value @ JsonValue::Object(_)) => Some(value),
        _ => None,
    }
}

/// 解析为指定类型
pub fn parse_json_as<T: DeserializeOwned>(text: &str) -> Option<T> {
    let value = parse_json_object(text)?;
    serde_json::from_value(value).ok()
}
