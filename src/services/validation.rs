//! 校验引擎
//!
//! 基础规则总是生效；题型规则只在题型可识别时叠加。
//! 校验结果是数据（字段路径 → 错误信息列表），从不返回 `Err`。

use crate::models::answer::{is_blank, AnswerProblem};
use crate::models::{AnswerShape, CorrectAnswer, QuestionForm, QuestionType};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::warn;

/// 校验结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub errors: BTreeMap<String, Vec<String>>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.entry(path.into()).or_default().push(message.into());
    }

    /// 字段的第一条错误
    pub fn first(&self, path: &str) -> Option<&str> {
        self.errors
            .get(path)
            .and_then(|messages| messages.first())
            .map(String::as_str)
    }

    pub fn has(&self, path: &str) -> bool {
        self.errors.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.errors.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

/// 基础必填字段
const REQUIRED_BASE: [(&str, &str); 5] = [
    ("target_organization", "Organization is required"),
    ("question_level", "Question Level is required"),
    ("target_group", "Target Group is required"),
    ("target_subject", "Subject is required"),
    ("topic", "Topic is required"),
];

/// 校验器
#[derive(Debug, Clone, Copy)]
pub struct Validator {
    max_options: usize,
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(8)
    }
}

impl Validator {
    /// 选择题最少选项数
    pub const MIN_OPTIONS: usize = 2;

    pub fn new(max_options: usize) -> Self {
        Self {
            max_options: max_options.max(Self::MIN_OPTIONS),
        }
    }

    pub fn max_options(&self) -> usize {
        self.max_options
    }

    /// 按表单自带的题型校验
    pub fn validate_form(&self, form: &QuestionForm) -> ValidationReport {
        let code = form.question_type.map(QuestionType::code);
        self.validate(form, code)
    }

    /// 校验一条记录
    ///
    /// # 参数
    /// - `form`: 待校验的表单
    /// - `discriminator`: 题型标识；缺失或不认识时只报告基础错误
    pub fn validate(&self, form: &QuestionForm, discriminator: Option<&str>) -> ValidationReport {
        let mut report = ValidationReport::default();

        for (field, message) in REQUIRED_BASE {
            if form.taxonomy_id(field).is_none() {
                report.add(field, message);
            }
        }

        let discriminator = discriminator.map(str::trim).filter(|d| !d.is_empty());
        let Some(discriminator) = discriminator else {
            report.add("question_type", "Question Type is required");
            return report;
        };
        let Some(question_type) = QuestionType::lookup(discriminator) else {
            warn!("⚠️ 未知的题型标识 {}，跳过题型规则", discriminator);
            return report;
        };

        self.check_type_rules(form, question_type, &mut report);
        report
    }

    fn check_type_rules(
        &self,
        form: &QuestionForm,
        question_type: QuestionType,
        report: &mut ValidationReport,
    ) {
        let descriptor = question_type.describe();

        if descriptor.needs_text && form.question_text.trim().is_empty() {
            report.add("question_text", "Question Text is required");
        }

        if descriptor.has_options {
            self.check_options(form, report);
        }

        match descriptor.answer_shape {
            AnswerShape::Sequence => {
                check_list(
                    &form.ordering_sequence,
                    "ordering_sequence",
                    2,
                    "At least two items are required",
                    "Ordering items cannot be empty",
                    report,
                );
            }
            AnswerShape::PairMapping => {
                let columns = [
                    ("options_column_a", &form.options_column_a),
                    ("options_column_b", &form.options_column_b),
                ];
                for (column, items) in columns {
                    check_list(
                        items,
                        column,
                        1,
                        "At least one option required",
                        "Option text cannot be empty",
                        report,
                    );
                }
                check_answer(form, descriptor.answer_shape, report);
            }
            shape => check_answer(form, shape, report),
        }

        if let Some(media_field) = descriptor.media_field {
            let missing = form
                .media_url(media_field)
                .map(|url| url.trim().is_empty())
                .unwrap_or(true);
            if missing {
                report.add(media_field, media_required_message(question_type));
            }
        }

        let (min, max) = descriptor.explanation_bounds;
        let count = form.explanations.len();
        if count < min {
            report.add("explanations", format!("At least {} explanations are required", min));
        }
        if count > max {
            report.add("explanations", format!("At most {} explanations are allowed", max));
        }
    }

    fn check_options(&self, form: &QuestionForm, report: &mut ValidationReport) {
        let count = form.options.len();
        if count < Self::MIN_OPTIONS {
            report.add("options", "At least two options are required");
        }
        if count > self.max_options {
            report.add(
                "options",
                format!("At most {} options are allowed", self.max_options),
            );
        }
        for (i, option) in form.options.iter().enumerate() {
            if option.option_text.trim().is_empty() {
                report.add(format!("options.{}.option_text", i), "Option text cannot be empty");
            }
        }
    }
}

fn check_list(
    items: &[String],
    path: &str,
    min: usize,
    too_few: &str,
    empty_item: &str,
    report: &mut ValidationReport,
) {
    let filled = items.iter().filter(|item| !item.trim().is_empty()).count();
    if filled < min {
        report.add(path, too_few);
    }
    for (i, item) in items.iter().enumerate() {
        if item.trim().is_empty() {
            report.add(format!("{}.{}", path, i), empty_item);
        }
    }
}

fn check_answer(form: &QuestionForm, shape: AnswerShape, report: &mut ValidationReport) {
    const FIELD: &str = "correct_answer";

    // 自由文本答案可以不填
    if shape == AnswerShape::FreeText && is_blank(&form.correct_answer) {
        return;
    }

    match CorrectAnswer::interpret(shape, &form.correct_answer) {
        Ok(CorrectAnswer::Index(i)) if i >= form.options.len() => {
            report.add(FIELD, "Select a valid answer");
        }
        Ok(CorrectAnswer::Indices(indices)) => {
            if indices.is_empty() {
                report.add(FIELD, "Select at least one correct answer");
            } else if indices.iter().any(|&i| i >= form.options.len()) {
                report.add(FIELD, "Select a valid answer");
            }
        }
        Ok(CorrectAnswer::Pairs(pairs)) => {
            let a = form.options_column_a.len();
            let b = form.options_column_b.len();
            let in_range = pairs
                .iter()
                .all(|&(left, right)| (1..=a).contains(&left) && (1..=b).contains(&right));
            if !in_range {
                report.add(FIELD, "Correct answer mapping refers to a missing item");
            }
        }
        Ok(_) => {}
        Err(problem) => report.add(FIELD, answer_message(shape, problem)),
    }
}

fn answer_message(shape: AnswerShape, problem: AnswerProblem) -> &'static str {
    match (shape, problem) {
        (AnswerShape::SingleIndex, AnswerProblem::Missing) => "Select one correct answer",
        (AnswerShape::SingleIndex, AnswerProblem::WrongShape) => "Select a valid answer",
        (AnswerShape::IndexSet, AnswerProblem::Missing) => "Select at least one correct answer",
        (AnswerShape::IndexSet, AnswerProblem::WrongShape) => "Each answer must be a number",
        (AnswerShape::Number, AnswerProblem::Missing) => "Correct Answer is required",
        (AnswerShape::Number, AnswerProblem::WrongShape) => "Correct Answer must be a number",
        (AnswerShape::TruthValue, AnswerProblem::Missing) => "Correct Answer is required",
        (AnswerShape::TruthValue, AnswerProblem::WrongShape) => {
            "Correct Answer must be True, False or Not-given"
        }
        (AnswerShape::PairMapping, AnswerProblem::Missing) => "Correct answer mapping is required",
        (AnswerShape::PairMapping, AnswerProblem::WrongShape) => {
            "Correct answer mapping must look like [1, 2], [3, 4]"
        }
        (AnswerShape::FreeText, _) => "Correct Answer must be text",
        (AnswerShape::Sequence, _) => "At least two items are required",
    }
}

fn media_required_message(question_type: QuestionType) -> &'static str {
    match question_type {
        QuestionType::Image => "Image upload is required",
        QuestionType::Diagram => "Diagram upload is required",
        _ => "Audio upload is required",
    }
}
