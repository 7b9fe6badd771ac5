//! 视图模型转换
//!
//! 持久化记录 ⇄ 可编辑表单 ⇄ 提交载荷

use crate::error::{AppError, AppResult};
use crate::models::{ExplanationLevel, QuestionForm, QuestionRecord, QuestionType, WirePayload};
use serde_json::{json, Value};

/// 记录 → 可编辑表单
///
/// - 字符串选项包装成 `{option_text}`，已是对象的保留，其他值变成空选项
/// - 解析按规范等级排序（未知/缺失等级稳定地排在最后）
/// - `correct_answer` 原样保留
///
/// 题型标识不认识时返回配置错误
pub fn to_view_model(record: &QuestionRecord) -> AppResult<QuestionForm> {
    let mut details = record.details.clone();
    let embedded_type = details.remove("question_type");

    let discriminator = if record.question_type.trim().is_empty() {
        embedded_type
            .as_ref()
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    } else {
        record.question_type.clone()
    };
    let question_type = QuestionType::parse(&discriminator)?;

    if let Some(Value::Array(options)) = details.get_mut("options") {
        for option in options.iter_mut() {
            *option = wrap_option(option.take());
        }
    }

    let mut form: QuestionForm = serde_json::from_value(Value::Object(details))?;
    form.question_type = Some(question_type);
    form.explanations.sort_by_key(|e| e.rank());
    Ok(form)
}

fn wrap_option(option: Value) -> Value {
    match option {
        Value::String(text) => json!({ "option_text": text }),
        Value::Object(map) => Value::Object(map),
        _ => json!({ "option_text": "" }),
    }
}

/// 可编辑表单 → 提交载荷
///
/// - 选项拆回纯字符串
/// - 第 i 条解析按位置标成第 i 个等级（超出等级数的保留自身等级）
/// - 题型从请求体中去掉，单独作为查询参数
pub fn to_wire_format(form: &QuestionForm) -> AppResult<WirePayload> {
    let question_type = form
        .question_type
        .ok_or_else(|| AppError::unknown_question_type("(缺失)"))?;

    let Value::Object(mut body) = serde_json::to_value(form)? else {
        return Err(AppError::Other("表单没有序列化成对象".to_string()));
    };
    body.remove("question_type");

    if let Some(Value::Array(options)) = body.get_mut("options") {
        for option in options.iter_mut() {
            let text = option
                .get("option_text")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            *option = Value::String(text);
        }
    }

    if let Some(Value::Array(explanations)) = body.get_mut("explanations") {
        for (level, explanation) in ExplanationLevel::ORDERED.iter().zip(explanations.iter_mut()) {
            if let Value::Object(map) = explanation {
                map.insert("level".to_string(), json!(level.label()));
            }
        }
    }

    Ok(WirePayload { question_type, body })
}

/// 原始记录直接整理成提交载荷（批量导入用）
pub fn reshape(record: &QuestionRecord) -> AppResult<WirePayload> {
    to_wire_format(&to_view_model(record)?)
}

/// 提交载荷还原成记录（用于比较与日志）
pub fn record_from_wire(id: Option<i64>, payload: &WirePayload) -> QuestionRecord {
    QuestionRecord {
        id,
        question_type: payload.question_type.code().to_string(),
        details: payload.body.clone(),
    }
}
