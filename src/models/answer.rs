//! 正确答案
//!
//! 表单里 `correct_answer` 保存原始 JSON 值，这里按题型声明的形态解读它。

use crate::models::question_type::AnswerShape;
use regex::Regex;
use serde_json::{json, Value};
use std::sync::OnceLock;

/// 判断题答案
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TruthValue {
    True,
    False,
    NotGiven,
}

impl TruthValue {
    pub fn label(self) -> &'static str {
        match self {
            TruthValue::True => "True",
            TruthValue::False => "False",
            TruthValue::NotGiven => "Not-given",
        }
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(true) => Some(TruthValue::True),
            Value::Bool(false) => Some(TruthValue::False),
            Value::String(s) => match s.as_str() {
                "True" => Some(TruthValue::True),
                "False" => Some(TruthValue::False),
                "Not-given" => Some(TruthValue::NotGiven),
                _ => None,
            },
            _ => None,
        }
    }
}

/// 按形态解读后的正确答案
#[derive(Debug, Clone, PartialEq)]
pub enum CorrectAnswer {
    Index(usize),
    Indices(Vec<usize>),
    Text(String),
    Number(f64),
    Truth(TruthValue),
    /// 排序题的答案就是 `ordering_sequence` 本身
    Sequence,
    /// 连线配对（两列中的位置，从 1 开始）
    Pairs(Vec<(usize, usize)>),
}

/// 答案解读失败的原因（直接作为字段错误信息）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerProblem {
    Missing,
    WrongShape,
}

impl CorrectAnswer {
    /// 按形态解读原始值
    pub fn interpret(shape: AnswerShape, value: &Value) -> Result<CorrectAnswer, AnswerProblem> {
        if shape == AnswerShape::Sequence {
            return Ok(CorrectAnswer::Sequence);
        }
        if is_blank(value) {
            return Err(AnswerProblem::Missing);
        }

        match shape {
            AnswerShape::SingleIndex => as_index(value)
                .map(CorrectAnswer::Index)
                .ok_or(AnswerProblem::WrongShape),
            AnswerShape::IndexSet => match value {
                Value::Array(items) => items
                    .iter()
                    .map(as_index)
                    .collect::<Option<Vec<_>>>()
                    .map(CorrectAnswer::Indices)
                    .ok_or(AnswerProblem::WrongShape),
                _ => Err(AnswerProblem::WrongShape),
            },
            AnswerShape::FreeText => match value {
                Value::String(s) => Ok(CorrectAnswer::Text(s.clone())),
                _ => Err(AnswerProblem::WrongShape),
            },
            AnswerShape::Number => as_number(value)
                .map(CorrectAnswer::Number)
                .ok_or(AnswerProblem::WrongShape),
            AnswerShape::TruthValue => TruthValue::from_value(value)
                .map(CorrectAnswer::Truth)
                .ok_or(AnswerProblem::WrongShape),
            AnswerShape::PairMapping => parse_pairs(value)
                .map(CorrectAnswer::Pairs)
                .ok_or(AnswerProblem::WrongShape),
            AnswerShape::Sequence => Ok(CorrectAnswer::Sequence),
        }
    }

    /// 转回表单中存放的 JSON 值
    pub fn to_value(&self) -> Value {
        match self {
            CorrectAnswer::Index(i) => json!(i),
            CorrectAnswer::Indices(items) => json!(items),
            CorrectAnswer::Text(s) => json!(s),
            CorrectAnswer::Number(n) => json!(n),
            CorrectAnswer::Truth(t) => json!(t.label()),
            CorrectAnswer::Sequence => Value::Null,
            CorrectAnswer::Pairs(pairs) => {
                let text = pairs
                    .iter()
                    .map(|(a, b)| format!("[{}, {}]", a, b))
                    .collect::<Vec<_>>()
                    .join(", ");
                json!(text)
            }
        }
    }
}

/// 空值：null、空串、空数组
pub fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

/// 非负整数下标（允许数字字符串，下拉框回传的是字符串）
pub fn as_index(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n.as_u64().map(|v| v as usize),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn pair_regex() -> Option<&'static Regex> {
    static PAIR: OnceLock<Option<Regex>> = OnceLock::new();
    PAIR.get_or_init(|| Regex::new(r"\[\s*(\d+)\s*,\s*(\d+)\s*\]").ok())
        .as_ref()
}

/// 解析配对：`"[1, 2], [3, 4]"` 或 `[[1, 2], [3, 4]]`
pub fn parse_pairs(value: &Value) -> Option<Vec<(usize, usize)>> {
    match value {
        Value::String(s) => {
            let re = pair_regex()?;
            let mut pairs = Vec::new();
            for caps in re.captures_iter(s) {
                let a = caps.get(1)?.as_str().parse().ok()?;
                let b = caps.get(2)?.as_str().parse().ok()?;
                pairs.push((a, b));
            }
            // 去掉所有配对后只允许剩下逗号和空白
            let leftover = re.replace_all(s, "");
            let clean = leftover.chars().all(|c| c == ',' || c.is_whitespace());
            (!pairs.is_empty() && clean).then_some(pairs)
        }
        Value::Array(items) => {
            let pairs = items
                .iter()
                .map(|item| match item.as_array().map(Vec::as_slice) {
                    Some([a, b]) => Some((as_index(a)?, as_index(b)?)),
                    _ => None,
                })
                .collect::<Option<Vec<_>>>()?;
            (!pairs.is_empty()).then_some(pairs)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pairs_parse_from_text() {
        assert_eq!(
            parse_pairs(&json!("[1, 2], [3, 4]")),
            Some(vec![(1, 2), (3, 4)])
        );
        assert_eq!(parse_pairs(&json!("[1, 2] and more")), None);
        assert_eq!(parse_pairs(&json!([[1, 1], [2, 3]])), Some(vec![(1, 1), (2, 3)]));
    }

    #[test]
    fn index_set_rejects_non_numbers() {
        assert_eq!(
            CorrectAnswer::interpret(AnswerShape::IndexSet, &json!([0, "x"])),
            Err(AnswerProblem::WrongShape)
        );
        assert_eq!(
            CorrectAnswer::interpret(AnswerShape::IndexSet, &json!([0, 2])),
            Ok(CorrectAnswer::Indices(vec![0, 2]))
        );
    }

    #[test]
    fn truth_value_accepts_not_given() {
        assert_eq!(
            CorrectAnswer::interpret(AnswerShape::TruthValue, &json!("Not-given")),
            Ok(CorrectAnswer::Truth(TruthValue::NotGiven))
        );
        assert_eq!(
            CorrectAnswer::interpret(AnswerShape::TruthValue, &json!("maybe")),
            Err(AnswerProblem::WrongShape)
        );
    }

    #[test]
    fn blank_answer_is_missing() {
        assert_eq!(
            CorrectAnswer::interpret(AnswerShape::SingleIndex, &Value::Null),
            Err(AnswerProblem::Missing)
        );
        assert_eq!(
            CorrectAnswer::interpret(AnswerShape::Sequence, &Value::Null),
            Ok(CorrectAnswer::Sequence)
        );
    }
}
