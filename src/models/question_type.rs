//! 题型注册表
//!
//! 每种题型（判别标识）对应的字段要求、正确答案形态与解析数量上下限。
//! 题型集合是封闭的：未知标识属于配置错误，而不是校验失败。

use crate::error::{AppError, AppResult};
use phf::phf_map;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// 题型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuestionType {
    /// 单选题
    McqSingle,
    /// 多选题
    McqMulti,
    /// 判断题
    TrueFalse,
    /// 填空题
    FillBlank,
    /// 计算题
    Numerical,
    /// 问答题
    Descriptive,
    /// 编程题
    Code,
    /// 排序题
    Ordering,
    /// 连线题
    Matching,
    /// 图示标注题
    Diagram,
    /// 看图题
    Image,
    /// 音视频题
    AudioVideo,
    /// 断言-理由题
    AssertionReason,
    /// 案例分析题
    CaseStudy,
}

/// 线上标识 → 题型
static QUESTION_TYPES: phf::Map<&'static str, QuestionType> = phf_map! {
    "MCQ_SINGLE" => QuestionType::McqSingle,
    "MCQ_MULTI" => QuestionType::McqMulti,
    "TRUE_FALSE" => QuestionType::TrueFalse,
    "FILL_BLANK" => QuestionType::FillBlank,
    "NUMERICAL" => QuestionType::Numerical,
    "DESCRIPTIVE" => QuestionType::Descriptive,
    "CODE" => QuestionType::Code,
    "ORDERING" => QuestionType::Ordering,
    "MATCHING" => QuestionType::Matching,
    "DIAGRAM" => QuestionType::Diagram,
    "IMAGE" => QuestionType::Image,
    "AUDIO_VIDEO" => QuestionType::AudioVideo,
    "ASSERTION_REASON" => QuestionType::AssertionReason,
    "CASE_STUDY" => QuestionType::CaseStudy,
};

/// 正确答案的形态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerShape {
    /// 单个选项下标
    SingleIndex,
    /// 选项下标集合
    IndexSet,
    /// 自由文本
    FreeText,
    /// 数值
    Number,
    /// True / False / Not-given
    TruthValue,
    /// 有序序列（存放在 `ordering_sequence`）
    Sequence,
    /// 两列之间的配对
    PairMapping,
}

/// 题型描述
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeDescriptor {
    /// 是否必须填写题干
    pub needs_text: bool,
    /// 是否带选项
    pub has_options: bool,
    /// 正确答案形态
    pub answer_shape: AnswerShape,
    /// 解析数量下限、上限（含）
    pub explanation_bounds: (usize, usize),
    /// 媒体地址字段（为空表示不需要媒体）
    pub media_field: Option<&'static str>,
}

/// 三个解析等级，所以解析最多 3 条
const EXPLANATION_BOUNDS: (usize, usize) = (0, 3);

/// 所有题型共用的字段
pub const BASE_FIELDS: &[&str] = &[
    "target_organization",
    "question_level",
    "target_group",
    "target_subject",
    "question_type",
    "topic",
    "sub_topic",
    "sub_sub_topic",
    "difficulty_level",
    "exam_references",
    "explanations",
];

impl QuestionType {
    /// 全部题型（按管理端下拉框顺序）
    pub const ALL: [QuestionType; 14] = [
        QuestionType::McqSingle,
        QuestionType::McqMulti,
        QuestionType::Descriptive,
        QuestionType::TrueFalse,
        QuestionType::FillBlank,
        QuestionType::Matching,
        QuestionType::Ordering,
        QuestionType::Numerical,
        QuestionType::Image,
        QuestionType::AudioVideo,
        QuestionType::CaseStudy,
        QuestionType::Diagram,
        QuestionType::Code,
        QuestionType::AssertionReason,
    ];

    /// 从线上标识解析题型
    ///
    /// 未知标识返回配置错误
    pub fn parse(discriminator: &str) -> AppResult<Self> {
        Self::lookup(discriminator).ok_or_else(|| AppError::unknown_question_type(discriminator))
    }

    /// 查找题型，未知时返回 None
    pub fn lookup(discriminator: &str) -> Option<Self> {
        QUESTION_TYPES.get(discriminator.trim()).copied()
    }

    /// 线上标识
    pub fn code(self) -> &'static str {
        match self {
            QuestionType::McqSingle => "MCQ_SINGLE",
            QuestionType::McqMulti => "MCQ_MULTI",
            QuestionType::TrueFalse => "TRUE_FALSE",
            QuestionType::FillBlank => "FILL_BLANK",
            QuestionType::Numerical => "NUMERICAL",
            QuestionType::Descriptive => "DESCRIPTIVE",
            QuestionType::Code => "CODE",
            QuestionType::Ordering => "ORDERING",
            QuestionType::Matching => "MATCHING",
            QuestionType::Diagram => "DIAGRAM",
            QuestionType::Image => "IMAGE",
            QuestionType::AudioVideo => "AUDIO_VIDEO",
            QuestionType::AssertionReason => "ASSERTION_REASON",
            QuestionType::CaseStudy => "CASE_STUDY",
        }
    }

    /// 显示名称
    pub fn label(self) -> &'static str {
        match self {
            QuestionType::McqSingle => "Multiple Choice (Single Answer)",
            QuestionType::McqMulti => "Multiple Choice (Multiple Answers)",
            QuestionType::TrueFalse => "True or False",
            QuestionType::FillBlank => "Fill in the Blank",
            QuestionType::Numerical => "Numerical",
            QuestionType::Descriptive => "Descriptive",
            QuestionType::Code => "Code/Programming",
            QuestionType::Ordering => "Ordering/Sequence",
            QuestionType::Matching => "Matching",
            QuestionType::Diagram => "Diagram Labeling",
            QuestionType::Image => "Image-Based",
            QuestionType::AudioVideo => "Audio/Video-Based",
            QuestionType::AssertionReason => "Assertion and Reason",
            QuestionType::CaseStudy => "Case Study",
        }
    }

    /// 注册表查询
    pub fn describe(self) -> TypeDescriptor {
        let (needs_text, has_options, answer_shape, media_field) = match self {
            QuestionType::McqSingle => (true, true, AnswerShape::SingleIndex, None),
            QuestionType::McqMulti => (true, true, AnswerShape::IndexSet, None),
            QuestionType::TrueFalse => (true, false, AnswerShape::TruthValue, None),
            QuestionType::Numerical => (true, false, AnswerShape::Number, None),
            QuestionType::Ordering => (true, false, AnswerShape::Sequence, None),
            QuestionType::FillBlank
            | QuestionType::Descriptive
            | QuestionType::Code
            | QuestionType::AssertionReason
            | QuestionType::CaseStudy => (true, false, AnswerShape::FreeText, None),
            QuestionType::Matching => (false, false, AnswerShape::PairMapping, None),
            QuestionType::Diagram => (false, false, AnswerShape::FreeText, Some("diagram_url")),
            QuestionType::Image => (false, false, AnswerShape::FreeText, Some("image_url")),
            QuestionType::AudioVideo => (false, false, AnswerShape::FreeText, Some("audio_url")),
        };

        TypeDescriptor {
            needs_text,
            has_options,
            answer_shape,
            explanation_bounds: EXPLANATION_BOUNDS,
            media_field,
        }
    }

    /// 是否为选择题
    pub fn is_mcq(self) -> bool {
        self.describe().has_options
    }

    /// 该题型在表单中可见的字段
    pub fn visible_fields(self) -> Vec<&'static str> {
        let descriptor = self.describe();
        let mut fields: Vec<&'static str> = BASE_FIELDS.to_vec();

        if descriptor.needs_text || self == QuestionType::Matching || descriptor.media_field.is_some() {
            fields.push("question_text");
        }
        if descriptor.has_options {
            fields.push("options");
        }
        match descriptor.answer_shape {
            AnswerShape::Sequence => fields.push("ordering_sequence"),
            AnswerShape::PairMapping => {
                fields.push("options_column_a");
                fields.push("options_column_b");
                fields.push("correct_answer");
            }
            _ => fields.push("correct_answer"),
        }
        if let Some(media) = descriptor.media_field {
            fields.push(media);
        }
        fields
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl Serialize for QuestionType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}

impl<'de> Deserialize<'de> for QuestionType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        QuestionType::lookup(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("未知的题型标识: {}", raw)))
    }
}
