//! 单题编辑器 - 流程层
//!
//! 核心职责：一道题从打开到提交/取消的完整生命周期
//!
//! 状态：
//! 1. Empty（新建）→ Editing（第一次修改后）
//! 2. Editing → Submitting → Submitted，或失败后回到 Editing（带字段错误）
//! 3. 任意非终止状态都可以 cancel → Discarded
//!
//! 编辑/克隆/查看/导入直接从 Editing 开始；查看模式下所有修改都被拒绝。

use crate::clients::{QuestionClient, TaxonomyClient};
use crate::error::{AppError, AppResult, ConfigError, EditorError};
use crate::models::answer::as_index;
use crate::models::question::split_comma_list;
use crate::models::question_type::BASE_FIELDS;
use crate::models::{
    Explanation, ExplanationLevel, OptionEntry, QuestionForm, QuestionRecord, QuestionType,
    TaxonomyKind, TaxonomyNode,
};
use crate::services::error_extractor::{field_errors, GENERIC_SUBMIT_ERROR};
use crate::services::hydrator::record_from_wire;
use crate::services::{
    global_message, to_view_model, to_wire_format, DropdownResolver, ValidationReport, Validator,
};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// 表单模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormMode {
    Create,
    Edit,
    Clone,
    View,
    /// 编辑导入候选项：提交时只把结果交回调用方，不请求服务端
    Import,
}

impl FormMode {
    pub fn label(self) -> &'static str {
        match self {
            FormMode::Create => "新建",
            FormMode::Edit => "编辑",
            FormMode::Clone => "克隆",
            FormMode::View => "查看",
            FormMode::Import => "导入编辑",
        }
    }
}

/// 编辑器状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorState {
    Empty,
    Editing,
    Submitting,
    Submitted,
    Discarded,
}

impl EditorState {
    pub fn is_terminal(self) -> bool {
        matches!(self, EditorState::Submitted | EditorState::Discarded)
    }
}

/// 宿主（题目列表页）提供的回调
pub trait EditorHost: Send + Sync {
    fn on_submit(&self, _message: &str, _success: bool) {}
    fn on_cancel(&self) {}
    fn add_row(&self, _record: &QuestionRecord) {}
    fn delete_row(&self, _id: i64) {}
}

/// 不关心回调的宿主
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentHost;

impl EditorHost for SilentHost {}

/// 提交结果
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// 本地校验未通过
    Invalid(ValidationReport),
    /// 服务端拒绝或请求失败
    Rejected { message: String },
    /// 已保存
    Saved(QuestionRecord),
    /// 导入模式：编辑结果交回调用方
    Local(QuestionRecord),
}

/// 编辑器依赖
#[derive(Clone)]
pub struct EditorDeps {
    pub questions: QuestionClient,
    pub taxonomy: TaxonomyClient,
    /// 编辑器自己的一份下拉框状态（级联拉取只影响本编辑器）
    pub resolver: DropdownResolver,
    pub validator: Validator,
}

/// 用记录里的值恢复选择的单值分类
const RESTORED_KINDS: [TaxonomyKind; 7] = [
    TaxonomyKind::Organization,
    TaxonomyKind::QuestionLevel,
    TaxonomyKind::TargetGroup,
    TaxonomyKind::Subject,
    TaxonomyKind::Topic,
    TaxonomyKind::SubTopic,
    TaxonomyKind::DifficultyLevel,
];

/// 单题编辑器
pub struct QuestionEditor {
    mode: FormMode,
    state: EditorState,
    id: Option<i64>,
    initial: QuestionForm,
    form: QuestionForm,
    errors: ValidationReport,
    global_error: Option<String>,
    /// 第一次提交失败后，每次修改都重新校验
    revalidate: bool,
    deps: EditorDeps,
    host: Arc<dyn EditorHost>,
}

impl QuestionEditor {
    /// 打开编辑器
    ///
    /// # 参数
    /// - `mode`: 表单模式；除新建外都需要 `record`
    /// - `record`: 已有记录（克隆时丢弃 id）
    pub fn open(
        mode: FormMode,
        record: Option<&QuestionRecord>,
        deps: EditorDeps,
        host: Arc<dyn EditorHost>,
    ) -> AppResult<Self> {
        let (id, form, state) = match (mode, record) {
            (FormMode::Create, _) => (None, QuestionForm::default(), EditorState::Empty),
            (_, Some(record)) => {
                let mut form = to_view_model(record)?;
                let id = if mode == FormMode::Clone {
                    form.strip_ids();
                    None
                } else {
                    record.id
                };
                (id, form, EditorState::Editing)
            }
            (_, None) => {
                return Err(EditorError::MissingRecord {
                    mode: mode.label().to_string(),
                }
                .into())
            }
        };

        let mut editor = Self {
            mode,
            state,
            id,
            initial: form.clone(),
            form,
            errors: ValidationReport::default(),
            global_error: None,
            revalidate: false,
            deps,
            host,
        };
        editor.restore_selections();
        debug!("[{}] 打开编辑器: id={:?}", mode.label(), editor.id);
        Ok(editor)
    }

    fn restore_selections(&mut self) {
        for kind in RESTORED_KINDS {
            let id = kind.form_field().and_then(|field| self.form.taxonomy_id(field));
            self.deps.resolver.restore_selection(kind, id);
        }
    }

    // ========== 只读访问 ==========

    pub fn mode(&self) -> FormMode {
        self.mode
    }

    pub fn state(&self) -> EditorState {
        self.state
    }

    pub fn id(&self) -> Option<i64> {
        self.id
    }

    pub fn form(&self) -> &QuestionForm {
        &self.form
    }

    pub fn errors(&self) -> &ValidationReport {
        &self.errors
    }

    pub fn global_error(&self) -> Option<&str> {
        self.global_error.as_deref()
    }

    pub fn is_read_only(&self) -> bool {
        self.mode == FormMode::View
    }

    pub fn resolver(&self) -> &DropdownResolver {
        &self.deps.resolver
    }

    /// 某一下拉框当前的可选项
    pub fn options_for(&self, kind: TaxonomyKind) -> Vec<&TaxonomyNode> {
        self.deps.resolver.options_for(kind)
    }

    /// 当前题型下可见的字段；未选题型时只有公共字段
    pub fn visible_fields(&self) -> Vec<&'static str> {
        match self.form.question_type {
            Some(question_type) => question_type.visible_fields(),
            None => BASE_FIELDS.to_vec(),
        }
    }

    // ========== 状态守卫 ==========

    fn ensure_mutable(&self) -> Result<(), EditorError> {
        if self.mode == FormMode::View {
            return Err(EditorError::ReadOnly);
        }
        if self.state.is_terminal() {
            return Err(EditorError::Finished {
                state: format!("{:?}", self.state),
            });
        }
        Ok(())
    }

    /// 修改完成：进入 Editing，必要时重新校验
    fn touch(&mut self) {
        if self.state == EditorState::Empty {
            self.state = EditorState::Editing;
        }
        if self.revalidate {
            self.errors = self.deps.validator.validate_form(&self.form);
        }
    }

    fn type_name(&self) -> String {
        self.form
            .question_type
            .map(|t| t.code().to_string())
            .unwrap_or_else(|| "(未选择)".to_string())
    }

    fn require_mcq(&self, operation: &str) -> Result<QuestionType, EditorError> {
        match self.form.question_type {
            Some(question_type) if question_type.is_mcq() => Ok(question_type),
            _ => Err(EditorError::UnsupportedForType {
                question_type: self.type_name(),
                operation: operation.to_string(),
            }),
        }
    }

    // ========== 题型 ==========

    /// 切换题型
    ///
    /// 已填写的值全部保留（切回原题型时不丢失）；切到选择题时补足最少选项
    pub fn set_question_type(&mut self, question_type: Option<QuestionType>) -> Result<(), EditorError> {
        self.ensure_mutable()?;
        self.form.question_type = question_type;
        if question_type.map(QuestionType::is_mcq).unwrap_or(false) {
            while self.form.options.len() < Validator::MIN_OPTIONS {
                self.form.options.push(OptionEntry::default());
            }
        }
        debug!("题型切换为 {}，可见字段: {:?}", self.type_name(), self.visible_fields());
        self.touch();
        Ok(())
    }

    /// 按线上标识切换题型，未知标识属于配置错误
    pub fn set_question_type_code(&mut self, discriminator: &str) -> AppResult<()> {
        let question_type = QuestionType::parse(discriminator)?;
        self.set_question_type(Some(question_type))?;
        Ok(())
    }

    // ========== 分类 ==========

    /// 选择一个分类
    ///
    /// 同步清空下游字段，然后拉取直接下游的可选项
    pub async fn select_taxonomy(&mut self, kind: TaxonomyKind, id: Option<i64>) -> AppResult<()> {
        self.ensure_mutable()?;
        let previous = self.deps.resolver.selection(kind);
        let fetch = self.deps.resolver.select(kind, id)?;

        if let Some(field) = kind.form_field() {
            self.form.set_taxonomy_id(field, id);
        }
        if previous != id {
            for cleared in kind.descendants() {
                if let Some(field) = cleared.form_field() {
                    self.form.set_taxonomy_id(field, None);
                }
            }
        }
        self.touch();

        if let Some(fetch) = fetch {
            debug!("级联拉取 {:?} (parent={})", fetch.kind, fetch.parent_id);
            self.deps.resolver.load(&self.deps.taxonomy, fetch).await?;
        }
        Ok(())
    }

    /// 多选分类（考试来源、三级知识点）
    pub fn set_taxonomy_ids(&mut self, kind: TaxonomyKind, ids: Vec<i64>) -> AppResult<()> {
        self.ensure_mutable()?;
        let options = self.deps.resolver.options_for(kind);
        if let Some(missing) = ids.iter().find(|id| !options.iter().any(|n| n.id == **id)) {
            return Err(ConfigError::ResolverMisuse {
                reason: format!("{:?} 的可选项中没有 id {}", kind, missing),
            }
            .into());
        }
        match kind {
            TaxonomyKind::ExamReference => self.form.exam_references = ids,
            TaxonomyKind::SubSubTopic => self.form.sub_sub_topic = ids,
            other => {
                return Err(ConfigError::ResolverMisuse {
                    reason: format!("{:?} 不是多选字段", other),
                }
                .into())
            }
        }
        self.touch();
        Ok(())
    }

    /// 内联新建分类节点，立即出现在本编辑器的可选项中
    ///
    /// 只改动编辑器自己的副本；要让会话也看到，走 `AuthoringSession::create_taxonomy_entry`
    pub async fn create_taxonomy_entry(
        &mut self,
        kind: TaxonomyKind,
        label: &str,
    ) -> AppResult<TaxonomyNode> {
        self.ensure_mutable()?;
        match self
            .deps
            .resolver
            .create_entry(&self.deps.taxonomy, kind, label)
            .await
        {
            Ok(node) => {
                info!("✓ 新建 {:?}: {} (id={})", kind, node.label, node.id);
                Ok(node)
            }
            Err(e) => {
                self.global_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    // ========== 文本 ==========

    pub fn set_question_text(&mut self, text: impl Into<String>) -> Result<(), EditorError> {
        self.ensure_mutable()?;
        self.form.question_text = text.into();
        self.touch();
        Ok(())
    }

    // ========== 选项 ==========

    pub fn add_option(&mut self) -> Result<(), EditorError> {
        self.ensure_mutable()?;
        self.require_mcq("add_option")?;
        let max = self.deps.validator.max_options();
        if self.form.options.len() >= max {
            return Err(EditorError::OptionLimitReached { max });
        }
        self.form.options.push(OptionEntry::default());
        self.touch();
        Ok(())
    }

    pub fn set_option_text(&mut self, index: usize, text: impl Into<String>) -> Result<(), EditorError> {
        self.ensure_mutable()?;
        self.require_mcq("set_option_text")?;
        let len = self.form.options.len();
        let option = self
            .form
            .options
            .get_mut(index)
            .ok_or(EditorError::IndexOutOfRange { index, len })?;
        option.option_text = text.into();
        self.touch();
        Ok(())
    }

    /// 删除选项，并同步调整正确答案中的下标
    ///
    /// 单选：删掉的正是答案则清空，答案在其后则前移一位。
    /// 多选：去掉该下标，其后的下标各减一。
    pub fn remove_option(&mut self, index: usize) -> Result<(), EditorError> {
        self.ensure_mutable()?;
        let question_type = self.require_mcq("remove_option")?;
        let len = self.form.options.len();
        if index >= len {
            return Err(EditorError::IndexOutOfRange { index, len });
        }
        if len <= Validator::MIN_OPTIONS {
            return Err(EditorError::TooFewOptions {
                min: Validator::MIN_OPTIONS,
            });
        }

        self.form.options.remove(index);
        self.form.correct_answer = match question_type {
            QuestionType::McqMulti => {
                let shifted: Vec<usize> = selected_indices(&self.form.correct_answer)
                    .into_iter()
                    .filter(|&i| i != index)
                    .map(|i| if i > index { i - 1 } else { i })
                    .collect();
                json!(shifted)
            }
            _ => match as_index(&self.form.correct_answer) {
                Some(current) if current == index => Value::Null,
                Some(current) if current > index => json!(current - 1),
                _ => self.form.correct_answer.take(),
            },
        };
        self.touch();
        Ok(())
    }

    /// 勾选/取消正确选项
    ///
    /// 单选直接设为该下标；多选切换该下标，结果保持升序
    pub fn toggle_correct_option(&mut self, index: usize) -> Result<(), EditorError> {
        self.ensure_mutable()?;
        let question_type = self.require_mcq("toggle_correct_option")?;
        let len = self.form.options.len();
        if index >= len {
            return Err(EditorError::IndexOutOfRange { index, len });
        }

        self.form.correct_answer = match question_type {
            QuestionType::McqMulti => {
                let mut selected = selected_indices(&self.form.correct_answer);
                if let Some(pos) = selected.iter().position(|&i| i == index) {
                    selected.remove(pos);
                } else {
                    selected.push(index);
                    selected.sort_unstable();
                }
                json!(selected)
            }
            _ => json!(index),
        };
        self.touch();
        Ok(())
    }

    // ========== 答案 ==========

    /// 直接设置正确答案（形态在校验时按题型解读）
    pub fn set_correct_answer(&mut self, answer: Value) -> Result<(), EditorError> {
        self.ensure_mutable()?;
        self.form.correct_answer = answer;
        self.touch();
        Ok(())
    }

    pub fn set_ordering_sequence(&mut self, items: Vec<String>) -> Result<(), EditorError> {
        self.ensure_mutable()?;
        self.form.ordering_sequence = items;
        self.touch();
        Ok(())
    }

    /// 逗号分隔输入的排序序列
    pub fn set_ordering_text(&mut self, raw: &str) -> Result<(), EditorError> {
        self.set_ordering_sequence(split_comma_list(raw))
    }

    pub fn set_matching_columns(
        &mut self,
        column_a: Vec<String>,
        column_b: Vec<String>,
    ) -> Result<(), EditorError> {
        self.ensure_mutable()?;
        self.form.options_column_a = column_a;
        self.form.options_column_b = column_b;
        self.touch();
        Ok(())
    }

    // ========== 解析 ==========

    /// 追加一条解析，数量不超过等级数
    pub fn add_explanation(&mut self) -> Result<(), EditorError> {
        self.ensure_mutable()?;
        let max = self
            .form
            .question_type
            .map(|t| t.describe().explanation_bounds.1)
            .unwrap_or(ExplanationLevel::ORDERED.len());
        if self.form.explanations.len() >= max {
            return Err(EditorError::ExplanationLimitReached { max });
        }
        self.form.explanations.push(Explanation::default());
        self.touch();
        Ok(())
    }

    pub fn remove_explanation(&mut self, index: usize) -> Result<(), EditorError> {
        self.ensure_mutable()?;
        let len = self.form.explanations.len();
        if index >= len {
            return Err(EditorError::IndexOutOfRange { index, len });
        }
        self.form.explanations.remove(index);
        self.touch();
        Ok(())
    }

    pub fn set_explanation_text(&mut self, index: usize, text: impl Into<String>) -> Result<(), EditorError> {
        self.ensure_mutable()?;
        let len = self.form.explanations.len();
        let explanation = self
            .form
            .explanations
            .get_mut(index)
            .ok_or(EditorError::IndexOutOfRange { index, len })?;
        explanation.text = Some(text.into());
        self.touch();
        Ok(())
    }

    // ========== 媒体 ==========

    /// 上传题型要求的媒体（图示/图片/音视频），成功后写入对应地址字段
    pub async fn upload_media(
        &mut self,
        filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> AppResult<String> {
        self.ensure_mutable()?;
        let field = self
            .form
            .question_type
            .and_then(|t| t.describe().media_field)
            .ok_or_else(|| EditorError::UnsupportedForType {
                question_type: self.type_name(),
                operation: "upload_media".to_string(),
            })?;

        let url = self.upload(filename, content_type, bytes).await?;
        self.form.set_media_url(field, Some(url.clone()));
        self.touch();
        Ok(url)
    }

    /// 上传解析视频
    pub async fn upload_explanation_video(
        &mut self,
        index: usize,
        filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> AppResult<String> {
        self.ensure_mutable()?;
        let len = self.form.explanations.len();
        if index >= len {
            return Err(EditorError::IndexOutOfRange { index, len }.into());
        }

        let url = self.upload(filename, content_type, bytes).await?;
        if let Some(explanation) = self.form.explanations.get_mut(index) {
            explanation.video_url = Some(url.clone());
            explanation.filename = Some(filename.to_string());
        }
        self.touch();
        Ok(url)
    }

    async fn upload(&mut self, filename: &str, content_type: &str, bytes: Vec<u8>) -> AppResult<String> {
        info!("📤 上传媒体文件: {} ({} 字节)", filename, bytes.len());
        match self
            .deps
            .questions
            .upload_media(filename, content_type, bytes)
            .await
        {
            Ok(url) => Ok(url),
            Err(e) => {
                error!("❌ 媒体上传失败: {}", e);
                self.global_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    // ========== 生命周期 ==========

    /// 恢复到打开时的内容，清空所有错误
    pub fn reset_form(&mut self) {
        self.form = self.initial.clone();
        self.errors = ValidationReport::default();
        self.global_error = None;
        self.revalidate = false;
        self.state = if self.mode == FormMode::Create {
            EditorState::Empty
        } else {
            EditorState::Editing
        };
        self.restore_selections();
    }

    /// 取消编辑
    pub fn cancel(&mut self) -> Result<(), EditorError> {
        if self.state.is_terminal() {
            return Err(EditorError::Finished {
                state: format!("{:?}", self.state),
            });
        }
        self.state = EditorState::Discarded;
        self.host.on_cancel();
        debug!("[{}] 已取消", self.mode.label());
        Ok(())
    }

    /// 提交
    ///
    /// 校验失败、服务端拒绝、网络失败都作为 `Ok` 的结果返回并回到 Editing；
    /// 只有状态/配置错误返回 `Err`
    pub async fn submit(&mut self) -> AppResult<SubmitOutcome> {
        self.ensure_mutable()?;
        self.global_error = None;

        let report = self.deps.validator.validate_form(&self.form);
        if !report.is_valid() {
            warn!("[{}] ⚠️ 校验未通过: {} 处错误", self.mode.label(), report.len());
            self.revalidate = true;
            self.errors = report.clone();
            self.state = EditorState::Editing;
            return Ok(SubmitOutcome::Invalid(report));
        }
        self.errors = ValidationReport::default();

        if self.mode == FormMode::Import {
            let record = QuestionRecord {
                id: self.id,
                question_type: self.type_name(),
                details: self.form_details()?,
            };
            self.state = EditorState::Submitted;
            return Ok(SubmitOutcome::Local(record));
        }

        let payload = to_wire_format(&self.form)?;
        self.state = EditorState::Submitting;
        info!("[{}] 📤 正在提交题目 (type={})...", self.mode.label(), payload.question_type);

        let result = match (self.mode, self.id) {
            (FormMode::Edit, Some(id)) => self.deps.questions.update(id, &payload).await,
            _ => self.deps.questions.create(&payload).await,
        };

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                error!("[{}] ❌ 提交请求失败: {}", self.mode.label(), e);
                return Ok(self.reject(GENERIC_SUBMIT_ERROR.to_string()));
            }
        };

        if !self.deps.questions.is_success(&response) {
            warn!(
                "[{}] ⚠️ 服务端拒绝: status={:?} message={:?}",
                self.mode.label(),
                response.status,
                response.message
            );
            if let Some(details) = &response.details {
                for (field, message) in field_errors(details) {
                    self.errors.add(field, message);
                }
            }
            return Ok(self.reject(global_message(&response)));
        }

        let mut record = QuestionRecord::from_api(response.data.clone())
            .filter(|r| r.id.is_some())
            .unwrap_or_else(|| record_from_wire(self.id, &payload));
        if record.question_type.is_empty() {
            record.question_type = payload.question_type.code().to_string();
        }

        self.state = EditorState::Submitted;
        let message = match (self.mode, self.id) {
            (FormMode::Edit, Some(id)) => {
                self.host.delete_row(id);
                self.host.add_row(&record);
                "Question updated successfully"
            }
            _ => {
                self.host.add_row(&record);
                "Question created successfully"
            }
        };
        info!("[{}] ✓ {} (id={:?})", self.mode.label(), message, record.id);
        self.host.on_submit(message, true);
        Ok(SubmitOutcome::Saved(record))
    }

    fn reject(&mut self, message: String) -> SubmitOutcome {
        self.revalidate = true;
        self.state = EditorState::Editing;
        self.global_error = Some(message.clone());
        self.host.on_submit(&message, false);
        SubmitOutcome::Rejected { message }
    }

    /// 表单内容（不含题型），导入模式交回调用方
    fn form_details(&self) -> AppResult<Map<String, Value>> {
        match serde_json::to_value(&self.form)? {
            Value::Object(mut map) => {
                map.remove("question_type");
                Ok(map)
            }
            _ => Err(AppError::Other("表单没有序列化成对象".to_string())),
        }
    }
}

/// 多选答案中的下标（忽略无法解读的项）
fn selected_indices(answer: &Value) -> Vec<usize> {
    match answer {
        Value::Array(items) => items.iter().filter_map(as_index).collect(),
        other => as_index(other).into_iter().collect(),
    }
}
