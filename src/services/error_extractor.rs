//! 服务端错误详情的解读

use crate::infrastructure::ApiResponse;
use serde_json::Value;
use std::collections::BTreeMap;

/// 兜底提示
pub const GENERIC_SUBMIT_ERROR: &str = "An error occurred while submitting the form.";

/// 错误树中找到的第一条错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorLeaf {
    /// 形如 `options -> 0 -> option_text`
    pub path: String,
    pub message: String,
}

impl std::fmt::Display for ErrorLeaf {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// 深度优先（按文档键序）找第一条字符串错误
///
/// 对象的键和数组下标都作为路径的一段；
/// 直接挂在数组里的字符串使用数组所在的路径。
pub fn first_error_leaf(details: &Value) -> Option<ErrorLeaf> {
    walk(details, "")
}

fn walk(node: &Value, path: &str) -> Option<ErrorLeaf> {
    let children: Vec<(String, &Value)> = match node {
        Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
        Value::Array(items) => items.iter().enumerate().map(|(i, v)| (i.to_string(), v)).collect(),
        _ => return None,
    };

    for (key, child) in children {
        let current = if path.is_empty() {
            key
        } else {
            format!("{} -> {}", path, key)
        };

        match child {
            Value::String(message) => return Some(leaf(current, message)),
            Value::Array(items) => {
                for item in items {
                    match item {
                        Value::String(message) => return Some(leaf(current, message)),
                        Value::Object(_) | Value::Array(_) => {
                            if let Some(found) = walk(item, &current) {
                                return Some(found);
                            }
                        }
                        _ => {}
                    }
                }
            }
            Value::Object(_) => {
                if let Some(found) = walk(child, &current) {
                    return Some(found);
                }
            }
            _ => {}
        }
    }
    None
}

fn leaf(path: String, message: &str) -> ErrorLeaf {
    ErrorLeaf {
        path,
        message: message.to_string(),
    }
}

/// 服务端字段错误 → 每个字段一条信息
pub fn field_errors(details: &Value) -> BTreeMap<String, String> {
    let Value::Object(map) = details else {
        return BTreeMap::new();
    };
    map.iter()
        .filter_map(|(field, value)| {
            let message = match value {
                Value::String(s) => Some(s.clone()),
                other => first_error_leaf(other).map(|l| l.message),
            }?;
            Some((field.clone(), message))
        })
        .collect()
}

/// 失败响应的整体提示：嵌套字段错误 → 顶层错误信息 → 兜底文字
pub fn global_message(response: &ApiResponse) -> String {
    if let Some(leaf) = response.details.as_ref().and_then(first_error_leaf) {
        return leaf.to_string();
    }
    top_level_message(response).unwrap_or_else(|| GENERIC_SUBMIT_ERROR.to_string())
}

/// 批量导入中第 `index` 条（从 0 开始）失败时的提示
pub fn import_failure_message(index: usize, response: Option<&ApiResponse>) -> String {
    let number = index + 1;
    if let Some(leaf) = response
        .and_then(|r| r.details.as_ref())
        .and_then(first_error_leaf)
    {
        return format!("Error in Question {}: {}", number, leaf);
    }
    response
        .and_then(top_level_message)
        .unwrap_or_else(|| format!("Error in Question {}: {}", number, GENERIC_SUBMIT_ERROR))
}

fn top_level_message(response: &ApiResponse) -> Option<String> {
    response
        .message
        .clone()
        .filter(|m| !m.trim().is_empty())
        .or_else(|| {
            response
                .data
                .get("error")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
}
