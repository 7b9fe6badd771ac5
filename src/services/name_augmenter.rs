//! 导入数据的显示名补全
//!
//! 按分类字段的 id 在当前下拉框列表里查显示名，写到 `<字段>_name`。
//! 数组字段得到名称数组；查不到的 id 记为 "N/A"。原始数据不被修改。

use crate::models::TaxonomyKind;
use crate::services::dropdown_resolver::DropdownResolver;
use phf::phf_map;
use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;

/// 没有匹配项时的显示名
pub const UNRESOLVED: &str = "N/A";

/// 需要补全显示名的字段 → 分类种类
static NAMED_FIELDS: phf::Map<&'static str, TaxonomyKind> = phf_map! {
    "target_organization" => TaxonomyKind::Organization,
    "question_level" => TaxonomyKind::QuestionLevel,
    "target_subject" => TaxonomyKind::Subject,
    "exam_references" => TaxonomyKind::ExamReference,
    "topic" => TaxonomyKind::Topic,
    "sub_topic" => TaxonomyKind::SubTopic,
    "sub_sub_topic" => TaxonomyKind::SubSubTopic,
    "difficulty_level" => TaxonomyKind::DifficultyLevel,
    "target_group" => TaxonomyKind::TargetGroup,
};

/// 补全显示名，返回新的详情
pub fn augment_names(details: &Map<String, Value>, resolver: &DropdownResolver) -> Map<String, Value> {
    let mut augmented = details.clone();

    for (field, kind) in NAMED_FIELDS.entries() {
        let Some(value) = details.get(*field) else {
            continue;
        };
        if is_falsy(value) {
            continue;
        }

        let name = match value {
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|item| Value::String(resolve(resolver, *kind, item)))
                    .collect(),
            ),
            single => Value::String(resolve(resolver, *kind, single)),
        };
        augmented.insert(format!("{}_name", field), name);
    }

    augmented
}

fn resolve(resolver: &DropdownResolver, kind: TaxonomyKind, value: &Value) -> String {
    leading_int(value)
        .and_then(|id| resolver.label_of(kind, id))
        .unwrap_or(UNRESOLVED)
        .to_string()
}

/// 取值开头的整数部分（"12abc" → 12，"abc" → None，3.9 → 3）
pub fn leading_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let caps = leading_digits()?.captures(s)?;
            caps.get(1)?.as_str().parse().ok()
        }
        _ => None,
    }
}

fn leading_digits() -> Option<&'static Regex> {
    static LEADING: OnceLock<Option<Regex>> = OnceLock::new();
    LEADING
        .get_or_init(|| Regex::new(r"^\s*([+-]?\d+)").ok())
        .as_ref()
}

/// null、false、0、空串不参与补全；空数组照常补全为空名称数组
fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().map(|f| f == 0.0 || f.is_nan()).unwrap_or(false),
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaxonomyNode;
    use serde_json::json;

    fn resolver() -> DropdownResolver {
        let mut r = DropdownResolver::new();
        r.set_list(TaxonomyKind::Topic, vec![TaxonomyNode::new(3, "Kinematics", None)]);
        r.set_list(
            TaxonomyKind::ExamReference,
            vec![TaxonomyNode::new(1, "SSC 2019", None), TaxonomyNode::new(2, "HSC 2020", None)],
        );
        r
    }

    fn map(value: Value) -> Map<String, Value> {
        let Value::Object(map) = value else { unreachable!() };
        map
    }

    #[test]
    fn single_and_array_fields_get_names() {
        let details = map(json!({"topic": "3", "exam_references": [2, "9"], "sub_topic": 44}));
        let out = augment_names(&details, &resolver());
        assert_eq!(out["topic_name"], json!("Kinematics"));
        assert_eq!(out["exam_references_name"], json!(["HSC 2020", "N/A"]));
        assert_eq!(out["sub_topic_name"], json!("N/A"));
        assert!(!details.contains_key("topic_name"));
    }

    #[test]
    fn falsy_values_are_skipped() {
        let details = map(json!({"topic": 0, "target_subject": "", "question_level": null}));
        let out = augment_names(&details, &resolver());
        assert_eq!(out, details);
    }

    #[test]
    fn leading_int_mimics_loose_parsing() {
        assert_eq!(leading_int(&json!(" 12abc")), Some(12));
        assert_eq!(leading_int(&json!("abc")), None);
        assert_eq!(leading_int(&json!(3.9)), Some(3));
        assert_eq!(leading_int(&json!(true)), None);
    }

    #[test]
    fn augmenting_twice_changes_nothing() {
        let details = map(json!({"topic": 3, "exam_references": [1]}));
        let once = augment_names(&details, &resolver());
        let twice = augment_names(&once, &resolver());
        assert_eq!(once, twice);
    }
}
