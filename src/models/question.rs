use crate::models::question_type::QuestionType;
use crate::models::taxonomy::as_id;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// 解析等级（规范顺序）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ExplanationLevel {
    Preliminary,
    Intermediate,
    Advanced,
}

impl ExplanationLevel {
    /// 按规范顺序排列的全部等级
    pub const ORDERED: [ExplanationLevel; 3] = [
        ExplanationLevel::Preliminary,
        ExplanationLevel::Intermediate,
        ExplanationLevel::Advanced,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ExplanationLevel::Preliminary => "Preliminary",
            ExplanationLevel::Intermediate => "Intermediate",
            ExplanationLevel::Advanced => "Advanced",
        }
    }

    /// 等级名称对应的排序位置，未知名称返回 None
    pub fn rank_of(label: &str) -> Option<usize> {
        Self::ORDERED.iter().position(|l| l.label() == label)
    }
}

/// 选择题选项（编辑视图中的包装形式）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionEntry {
    #[serde(default)]
    pub option_text: String,
}

impl OptionEntry {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            option_text: text.into(),
        }
    }
}

/// 题目解析
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Explanation {
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// 规范排序位置；未知或缺失的等级排在最后
    pub fn rank(&self) -> usize {
        self.level
            .as_deref()
            .and_then(ExplanationLevel::rank_of)
            .unwrap_or(usize::MAX)
    }
}

/// 可编辑的题目视图
///
/// 分类字段存 id；`correct_answer` 原样保留（形态由题型决定，校验时再解读）；
/// 不认识的字段进入 `extra`，提交时原样带回。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionForm {
    #[serde(default, deserialize_with = "de_opt_id", skip_serializing_if = "Option::is_none")]
    pub target_organization: Option<i64>,
    #[serde(default, deserialize_with = "de_opt_id", skip_serializing_if = "Option::is_none")]
    pub question_level: Option<i64>,
    #[serde(default, deserialize_with = "de_opt_id", skip_serializing_if = "Option::is_none")]
    pub target_group: Option<i64>,
    #[serde(default, deserialize_with = "de_opt_id", skip_serializing_if = "Option::is_none")]
    pub target_subject: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_type: Option<QuestionType>,
    #[serde(default, deserialize_with = "de_opt_id", skip_serializing_if = "Option::is_none")]
    pub topic: Option<i64>,
    #[serde(default, deserialize_with = "de_opt_id", skip_serializing_if = "Option::is_none")]
    pub sub_topic: Option<i64>,
    #[serde(default, deserialize_with = "de_id_list", skip_serializing_if = "Vec::is_empty")]
    pub sub_sub_topic: Vec<i64>,
    #[serde(default, deserialize_with = "de_opt_id", skip_serializing_if = "Option::is_none")]
    pub difficulty_level: Option<i64>,
    #[serde(default, deserialize_with = "de_id_list", skip_serializing_if = "Vec::is_empty")]
    pub exam_references: Vec<i64>,
    #[serde(default, deserialize_with = "de_text", skip_serializing_if = "String::is_empty")]
    pub question_text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<OptionEntry>,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub correct_answer: Value,
    #[serde(default, deserialize_with = "de_string_list", skip_serializing_if = "Vec::is_empty")]
    pub ordering_sequence: Vec<String>,
    #[serde(default, deserialize_with = "de_string_list", skip_serializing_if = "Vec::is_empty")]
    pub options_column_a: Vec<String>,
    #[serde(default, deserialize_with = "de_string_list", skip_serializing_if = "Vec::is_empty")]
    pub options_column_b: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagram_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub explanations: Vec<Explanation>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl QuestionForm {
    /// 读取单值分类字段
    pub fn taxonomy_id(&self, field: &str) -> Option<i64> {
        match field {
            "target_organization" => self.target_organization,
            "question_level" => self.question_level,
            "target_group" => self.target_group,
            "target_subject" => self.target_subject,
            "topic" => self.topic,
            "sub_topic" => self.sub_topic,
            "difficulty_level" => self.difficulty_level,
            _ => None,
        }
    }

    /// 写入分类字段；多值字段（`sub_sub_topic`、`exam_references`）被替换为单个值
    ///
    /// 返回字段是否存在
    pub fn set_taxonomy_id(&mut self, field: &str, id: Option<i64>) -> bool {
        let slot = match field {
            "target_organization" => &mut self.target_organization,
            "question_level" => &mut self.question_level,
            "target_group" => &mut self.target_group,
            "target_subject" => &mut self.target_subject,
            "topic" => &mut self.topic,
            "sub_topic" => &mut self.sub_topic,
            "difficulty_level" => &mut self.difficulty_level,
            "sub_sub_topic" => {
                self.sub_sub_topic = id.into_iter().collect();
                return true;
            }
            "exam_references" => {
                self.exam_references = id.into_iter().collect();
                return true;
            }
            _ => return false,
        };
        *slot = id;
        true
    }

    /// 媒体地址字段的值
    pub fn media_url(&self, field: &str) -> Option<&str> {
        match field {
            "image_url" => self.image_url.as_deref(),
            "diagram_url" => self.diagram_url.as_deref(),
            "audio_url" => self.audio_url.as_deref(),
            "video_url" => self.video_url.as_deref(),
            _ => None,
        }
    }

    /// 去掉表单和每条解析里带过来的 `id`
    pub fn strip_ids(&mut self) {
        self.extra.remove("id");
        for explanation in &mut self.explanations {
            explanation.extra.remove("id");
        }
    }

    /// 设置媒体地址字段，返回字段是否存在
    pub fn set_media_url(&mut self, field: &str, url: Option<String>) -> bool {
        match field {
            "image_url" => self.image_url = url,
            "diagram_url" => self.diagram_url = url,
            "audio_url" => self.audio_url = url,
            "video_url" => self.video_url = url,
            _ => return false,
        }
        true
    }
}

/// 已持久化（或从导出文件读出）的题目记录
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionRecord {
    #[serde(default, deserialize_with = "de_opt_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub question_type: String,
    #[serde(default)]
    pub details: Map<String, Value>,
}

impl QuestionRecord {
    /// 把扁平记录拆成 `(id, question_type, details)`
    pub fn from_flat(mut item: Map<String, Value>) -> Self {
        let id = item.remove("id").as_ref().and_then(as_id);
        let question_type = match item.remove("question_type") {
            Some(Value::String(s)) => s,
            Some(other) if !other.is_null() => other.to_string(),
            _ => String::new(),
        };
        Self {
            id,
            question_type,
            details: item,
        }
    }

    /// 兼容列表接口的两种形态：带 `details` 的嵌套记录，或扁平记录
    pub fn from_api(value: Value) -> Option<Self> {
        let Value::Object(map) = value else {
            return None;
        };
        if map.get("details").map(Value::is_object).unwrap_or(false) {
            serde_json::from_value(Value::Object(map)).ok()
        } else {
            Some(Self::from_flat(map))
        }
    }
}

/// 提交给后端的载荷：题型单独走查询参数，不在请求体中
#[derive(Debug, Clone, PartialEq)]
pub struct WirePayload {
    pub question_type: QuestionType,
    pub body: Map<String, Value>,
}

// ========== 宽松反序列化 ==========

fn de_opt_id<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match &value {
        Value::Null => Ok(None),
        Value::String(s) if s.trim().is_empty() => Ok(None),
        other => as_id(other)
            .map(Some)
            .ok_or_else(|| serde::de::Error::custom(format!("无效的分类 id: {}", other))),
    }
}

fn de_id_list<'de, D>(deserializer: D) -> Result<Vec<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match &value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items
            .iter()
            .map(|item| {
                as_id(item).ok_or_else(|| serde::de::Error::custom(format!("无效的分类 id: {}", item)))
            })
            .collect(),
        Value::String(s) if s.trim().is_empty() => Ok(Vec::new()),
        other => as_id(other)
            .map(|id| vec![id])
            .ok_or_else(|| serde::de::Error::custom(format!("无效的分类 id: {}", other))),
    }
}

fn de_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

/// 数组，或逗号分隔的字符串（逐项去空白、丢弃空项）
fn de_string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => Vec::new(),
        Value::String(s) => split_comma_list(&s),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => s,
                Value::Null => String::new(),
                other => other.to_string(),
            })
            .collect(),
        other => vec![other.to_string()],
    })
}

/// 拆分逗号分隔的输入
pub fn split_comma_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
