//! 批量导入器 - 编排层
//!
//! ## 职责
//!
//! 把导出的题目文件重新导入到后端。
//!
//! ## 核心流程
//!
//! 1. **解析**：整份 JSON 一次解析，任何错误都让整批失败
//! 2. **拆分**：每一项拆成 `(id, question_type, details)`
//! 3. **补全**：按当前下拉框数据写入 `<字段>_name` 显示名
//! 4. **提交**：全部候选题目同时发出，全部返回后再汇总
//! 5. **对账**：成功的移出待导入列表；下标最小的失败给出一条提示；
//!    列表清空后通知宿主刷新
//!
//! 导入前可以查看、在导入模式编辑器中修改、或删除候选题目。

use crate::clients::QuestionClient;
use crate::error::{AppResult, ImportError};
use crate::infrastructure::ApiResponse;
use crate::models::{load_import_file, parse_import_document, QuestionRecord};
use crate::services::{
    augment_names, first_error_leaf, import_failure_message, reshape, DropdownResolver, ErrorLeaf,
};
use crate::utils::logging;
use crate::workflow::editor::{EditorDeps, FormMode, QuestionEditor, SilentHost};
use crate::workflow::QuestionCtx;
use futures::future::join_all;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// 宿主（题目列表页）提供的回调
pub trait ImportHost: Send + Sync {
    /// 待导入列表清空后刷新题目列表
    fn reload_list(&self);
}

/// 一道待导入的题目
#[derive(Debug, Clone, PartialEq)]
pub struct ImportCandidate {
    /// 导出文件中的原始 id
    pub source_id: Option<i64>,
    pub question_type: String,
    /// 原始详情（提交用）
    pub raw: Map<String, Value>,
    /// 补全了显示名的详情（展示用）
    pub display: Map<String, Value>,
}

impl ImportCandidate {
    fn new(record: QuestionRecord, resolver: &DropdownResolver) -> Self {
        let display = augment_names(&record.details, resolver);
        Self {
            source_id: record.id,
            question_type: record.question_type,
            raw: record.details,
            display,
        }
    }

    /// 提交用的记录
    pub fn record(&self) -> QuestionRecord {
        QuestionRecord {
            id: self.source_id,
            question_type: self.question_type.clone(),
            details: self.raw.clone(),
        }
    }
}

/// 单题提交结果
#[derive(Debug, Clone, PartialEq)]
enum SubmitResult {
    Accepted,
    /// 被拒绝；拿不到响应时为 None
    Failed(Option<ApiResponse>),
}

/// 一次导入的汇总
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportReport {
    /// 本次提交的题目数
    pub attempted: usize,
    /// 成功的下标（本次提交中的位置，从 0 开始）
    pub succeeded: Vec<usize>,
    /// 失败的下标（升序）
    pub failed: Vec<usize>,
    /// 给用户看的提示（来自下标最小的失败）
    pub error: Option<String>,
    /// 该失败在错误详情中找到的第一条错误
    pub error_leaf: Option<ErrorLeaf>,
    /// 是否已通知宿主刷新列表
    pub reloaded: bool,
}

impl ImportReport {
    pub fn remaining(&self) -> usize {
        self.failed.len()
    }
}

/// 批量导入器
pub struct BatchImporter {
    deps: EditorDeps,
    host: Arc<dyn ImportHost>,
    pending: Vec<ImportCandidate>,
}

impl BatchImporter {
    pub fn new(deps: EditorDeps, host: Arc<dyn ImportHost>) -> Self {
        Self {
            deps,
            host,
            pending: Vec::new(),
        }
    }

    fn questions(&self) -> &QuestionClient {
        &self.deps.questions
    }

    pub fn candidates(&self) -> &[ImportCandidate] {
        &self.pending
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    // ========== 加载 ==========

    /// 解析导出文件内容，替换待导入列表
    ///
    /// 解析失败时原列表保持不变
    pub fn load_str(&mut self, content: &str) -> AppResult<usize> {
        let items = parse_import_document(content).map_err(|e| {
            error!("[导入] ❌ {}", e);
            e
        })?;
        Ok(self.set_items(items))
    }

    /// 读取并解析导出文件
    pub async fn load_file(&mut self, path: &Path) -> AppResult<usize> {
        let items = load_import_file(path).await.map_err(|e| {
            error!("[导入] ❌ {}", e);
            e
        })?;
        Ok(self.set_items(items))
    }

    fn set_items(&mut self, items: Vec<Map<String, Value>>) -> usize {
        let resolver = &self.deps.resolver;
        self.pending = items
            .into_iter()
            .map(|item| ImportCandidate::new(QuestionRecord::from_flat(item), resolver))
            .collect();
        info!("[导入] 📋 待导入题目 {} 个", self.pending.len());
        self.pending.len()
    }

    // ========== 导入前操作 ==========

    fn candidate(&self, index: usize) -> Result<&ImportCandidate, ImportError> {
        self.pending.get(index).ok_or(ImportError::CandidateOutOfRange {
            index,
            len: self.pending.len(),
        })
    }

    /// 查看候选题目
    pub fn view_candidate(&self, index: usize) -> AppResult<&ImportCandidate> {
        Ok(self.candidate(index)?)
    }

    /// 删除候选题目
    pub fn delete_candidate(&mut self, index: usize) -> AppResult<ImportCandidate> {
        self.candidate(index)?;
        let removed = self.pending.remove(index);
        debug!("[导入] 删除候选题目 {}", index + 1);
        Ok(removed)
    }

    /// 在导入模式编辑器中打开候选题目
    ///
    /// 编辑器提交得到 `SubmitOutcome::Local`，再交给 `apply_edit`
    pub fn open_candidate_editor(&self, index: usize) -> AppResult<QuestionEditor> {
        let record = self.candidate(index)?.record();
        QuestionEditor::open(
            FormMode::Import,
            Some(&record),
            self.deps.clone(),
            Arc::new(SilentHost),
        )
    }

    /// 用编辑结果替换候选题目的详情，并重新补全显示名
    pub fn apply_edit(&mut self, index: usize, record: QuestionRecord) -> AppResult<()> {
        self.candidate(index)?;
        let resolver = &self.deps.resolver;
        let source_id = self.pending[index].source_id;
        let mut updated = ImportCandidate::new(record, resolver);
        updated.source_id = updated.source_id.or(source_id);
        self.pending[index] = updated;
        debug!("[导入] 候选题目 {} 已更新", index + 1);
        Ok(())
    }

    // ========== 导入 ==========

    /// 提交全部待导入题目
    ///
    /// 单题失败不影响其他题目；只有待导入列表为空时返回 `Err`
    pub async fn import_all(&mut self) -> AppResult<ImportReport> {
        if self.pending.is_empty() {
            return Err(ImportError::NothingPending.into());
        }

        let total = self.pending.len();
        logging::log_import_start(total);

        let questions = self.questions();
        let submissions = self
            .pending
            .iter()
            .enumerate()
            .map(|(index, candidate)| async move {
                (index, submit_one(questions, index, candidate).await)
            });
        let results = join_all(submissions).await;

        let mut report = ImportReport {
            attempted: total,
            ..Default::default()
        };
        let mut first_failure: Option<(usize, Option<ApiResponse>)> = None;
        for (index, result) in results {
            match result {
                SubmitResult::Accepted => report.succeeded.push(index),
                SubmitResult::Failed(response) => {
                    report.failed.push(index);
                    if first_failure.as_ref().map(|(i, _)| index < *i).unwrap_or(true) {
                        first_failure = Some((index, response));
                    }
                }
            }
        }
        report.succeeded.sort_unstable();
        report.failed.sort_unstable();

        if let Some((index, response)) = first_failure {
            let message = import_failure_message(index, response.as_ref());
            warn!("[导入] ⚠️ {}", message);
            report.error_leaf = response
                .as_ref()
                .and_then(|r| r.details.as_ref())
                .and_then(first_error_leaf);
            report.error = Some(message);
        }

        let mut position = 0;
        self.pending.retain(|_| {
            let keep = report.failed.binary_search(&position).is_ok();
            position += 1;
            keep
        });

        logging::log_import_complete(report.succeeded.len(), total);

        if self.pending.is_empty() {
            info!("[导入] ✓ 全部导入完成，刷新题目列表");
            self.host.reload_list();
            report.reloaded = true;
        }
        Ok(report)
    }
}

async fn submit_one(questions: &QuestionClient, index: usize, candidate: &ImportCandidate) -> SubmitResult {
    let ctx = QuestionCtx::new(index + 1, candidate.source_id, candidate.question_type.as_str());

    let payload = match reshape(&candidate.record()) {
        Ok(payload) => payload,
        Err(e) => {
            error!("{} ❌ 无法整理成提交格式: {}", ctx, e);
            return SubmitResult::Failed(Some(ApiResponse {
                message: Some(format!("Error in Question {}: {}", index + 1, e)),
                ..Default::default()
            }));
        }
    };

    match questions.create(&payload).await {
        Ok(response) if questions.is_success(&response) => {
            let text = candidate
                .raw
                .get("question_text")
                .and_then(Value::as_str)
                .unwrap_or_default();
            info!("{} ✓ 导入成功: {}", ctx, logging::truncate_text(text, 30));
            SubmitResult::Accepted
        }
        Ok(response) => {
            warn!(
                "{} ⚠️ 服务端拒绝: status={:?} message={:?}",
                ctx, response.status, response.message
            );
            SubmitResult::Failed(Some(response))
        }
        Err(e) => {
            error!("{} ❌ 提交请求失败: {}", ctx, e);
            SubmitResult::Failed(None)
        }
    }
}
