//! 题目处理上下文
//!
//! 封装"我正在导入第几题、什么题型"这一信息，只用于日志

use std::fmt::Display;

/// 题目处理上下文
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionCtx {
    /// 本次导入中的位置（从1开始）
    pub question_index: usize,

    /// 导出文件中的原始 id
    pub source_id: Option<i64>,

    /// 题型标识
    pub question_type: String,
}

impl QuestionCtx {
    /// 创建新的题目上下文
    pub fn new(question_index: usize, source_id: Option<i64>, question_type: impl Into<String>) -> Self {
        Self {
            question_index,
            source_id,
            question_type: question_type.into(),
        }
    }
}

impl Display for QuestionCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.source_id {
            Some(id) => write!(
                f,
                "[题目#{} 原ID#{} 题型#{}]",
                self.question_index, id, self.question_type
            ),
            None => write!(f, "[题目#{} 题型#{}]", self.question_index, self.question_type),
        }
    }
}
