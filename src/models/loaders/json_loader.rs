use crate::error::{AppError, AppResult, FileError, ImportError};
use serde_json::{Map, Value};
use std::path::Path;
use tokio::fs;

/// 解析导出的题目文件内容
///
/// 文件必须是 JSON 数组，每个元素是一个对象。任何一项不合法都会让整批失败，
/// 不做部分解析。
pub fn parse_import_document(content: &str) -> AppResult<Vec<Map<String, Value>>> {
    let root: Value = serde_json::from_str(content).map_err(|e| ImportError::ParseFailed {
        reason: e.to_string(),
    })?;

    let Value::Array(items) = root else {
        return Err(ImportError::ParseFailed {
            reason: "顶层必须是数组".to_string(),
        }
        .into());
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(map) => Ok(map),
            other => Err(ImportError::ParseFailed {
                reason: format!("第 {} 项不是对象: {}", index + 1, other),
            }
            .into()),
        })
        .collect()
}

/// 从文件加载导出的题目
pub async fn load_import_file(path: &Path) -> AppResult<Vec<Map<String, Value>>> {
    if !path.exists() {
        return Err(AppError::File(FileError::NotFound {
            path: path.display().to_string(),
        }));
    }

    let content = fs::read_to_string(path)
        .await
        .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;

    let items = parse_import_document(&content)?;
    tracing::info!(
        "成功加载 {} 个题目: {}",
        items.len(),
        path.file_name().unwrap_or_default().to_string_lossy()
    );
    Ok(items)
}
