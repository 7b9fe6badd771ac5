use serde::{Deserialize, Serialize};
use serde_json::Value;

/// 分类体系的种类
///
/// 每一种对应一个下拉框列表
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TaxonomyKind {
    Organization,
    QuestionLevel,
    TargetGroup,
    Subject,
    QuestionType,
    Topic,
    SubTopic,
    SubSubTopic,
    DifficultyLevel,
    ExamReference,
    QuestionStatus,
    Country,
    State,
    Category,
}

impl TaxonomyKind {
    /// 全部种类
    pub const ALL: [TaxonomyKind; 14] = [
        TaxonomyKind::Organization,
        TaxonomyKind::QuestionLevel,
        TaxonomyKind::TargetGroup,
        TaxonomyKind::Subject,
        TaxonomyKind::QuestionType,
        TaxonomyKind::Topic,
        TaxonomyKind::SubTopic,
        TaxonomyKind::SubSubTopic,
        TaxonomyKind::DifficultyLevel,
        TaxonomyKind::ExamReference,
        TaxonomyKind::QuestionStatus,
        TaxonomyKind::Country,
        TaxonomyKind::State,
        TaxonomyKind::Category,
    ];

    /// 上游种类（级联父级）
    pub fn parent(self) -> Option<TaxonomyKind> {
        match self {
            TaxonomyKind::SubTopic => Some(TaxonomyKind::Topic),
            TaxonomyKind::SubSubTopic => Some(TaxonomyKind::SubTopic),
            TaxonomyKind::State => Some(TaxonomyKind::Country),
            _ => None,
        }
    }

    /// 直接下游种类
    pub fn children(self) -> Vec<TaxonomyKind> {
        Self::ALL
            .iter()
            .copied()
            .filter(|k| k.parent() == Some(self))
            .collect()
    }

    /// 所有传递下游种类（按层级顺序）
    pub fn descendants(self) -> Vec<TaxonomyKind> {
        let mut out = Vec::new();
        let mut frontier = self.children();
        while let Some(kind) = frontier.first().copied() {
            frontier.remove(0);
            out.push(kind);
            frontier.extend(kind.children());
        }
        out
    }

    /// 题目表单中对应的字段名
    pub fn form_field(self) -> Option<&'static str> {
        match self {
            TaxonomyKind::Organization => Some("target_organization"),
            TaxonomyKind::QuestionLevel => Some("question_level"),
            TaxonomyKind::TargetGroup => Some("target_group"),
            TaxonomyKind::Subject => Some("target_subject"),
            TaxonomyKind::Topic => Some("topic"),
            TaxonomyKind::SubTopic => Some("sub_topic"),
            TaxonomyKind::SubSubTopic => Some("sub_sub_topic"),
            TaxonomyKind::DifficultyLevel => Some("difficulty_level"),
            TaxonomyKind::ExamReference => Some("exam_references"),
            TaxonomyKind::QuestionType
            | TaxonomyKind::QuestionStatus
            | TaxonomyKind::Country
            | TaxonomyKind::State
            | TaxonomyKind::Category => None,
        }
    }

    /// 题目列表接口中的端点（国家/州/分类走单独配置的端点）
    pub fn endpoint(self) -> Option<&'static str> {
        match self {
            TaxonomyKind::Organization => Some("/api/organizations/"),
            TaxonomyKind::QuestionLevel => Some("/api/question-levels/"),
            TaxonomyKind::TargetGroup => Some("/api/target-groups/"),
            TaxonomyKind::Subject => Some("/api/subjects/"),
            TaxonomyKind::QuestionType => Some("/api/question-types/"),
            TaxonomyKind::Topic => Some("/api/topics/"),
            TaxonomyKind::SubTopic => Some("/api/subtopics/"),
            TaxonomyKind::SubSubTopic => Some("/api/subsubtopics/"),
            TaxonomyKind::DifficultyLevel => Some("/api/difficulty-levels/"),
            TaxonomyKind::ExamReference => Some("/api/exam-references/"),
            TaxonomyKind::QuestionStatus => Some("/api/question-statuses/"),
            TaxonomyKind::Country | TaxonomyKind::State | TaxonomyKind::Category => None,
        }
    }

    /// 父级 id 在接口数据中的字段名，也用作按父级过滤的查询参数
    pub fn parent_key(self) -> Option<&'static str> {
        match self {
            TaxonomyKind::SubTopic => Some("topic"),
            TaxonomyKind::SubSubTopic => Some("sub_topic"),
            TaxonomyKind::State => Some("country"),
            _ => None,
        }
    }
}

/// 分类节点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxonomyNode {
    pub id: i64,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<i64>,
}

impl TaxonomyNode {
    pub fn new(id: i64, label: impl Into<String>, parent_id: Option<i64>) -> Self {
        Self {
            id,
            label: label.into(),
            parent_id,
        }
    }

    /// 从接口返回的一条记录构建节点
    ///
    /// 显示名依次取 `name`、`reference_name`、`title`、`country_name`；
    /// 没有数字 id 的记录返回 None
    pub fn from_api(kind: TaxonomyKind, item: &Value) -> Option<Self> {
        let id = as_id(item.get("id")?)?;
        let label = ["name", "reference_name", "title", "country_name"]
            .iter()
            .find_map(|key| item.get(*key).and_then(|v| v.as_str()).filter(|s| !s.is_empty()))
            .unwrap_or_default()
            .to_string();
        let parent_id = kind
            .parent_key()
            .and_then(|key| item.get(key))
            .or_else(|| item.get("parent_id"))
            .and_then(as_id);

        Some(Self { id, label, parent_id })
    }
}

/// 把数字或数字字符串解析为 id
pub fn as_id(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
