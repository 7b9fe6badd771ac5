//! 题目列表
//!
//! 分页、搜索、按权限打开编辑器、删除。
//! 编辑器通过 `ListRows`（实现 `EditorHost`）回写新增/删除的行。

use crate::clients::ListQuery;
use crate::error::{AppError, AppResult, EditorError};
use crate::models::{QuestionRecord, QuestionType};
use crate::workflow::editor::{EditorHost, FormMode, QuestionEditor};
use crate::workflow::session::AuthoringSession;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::{info, warn};

/// 列表页上可以出现的操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Affordance {
    Create,
    Edit,
    Clone,
    View,
    Delete,
    Import,
}

impl Affordance {
    pub fn for_mode(mode: FormMode) -> Self {
        match mode {
            FormMode::Create => Affordance::Create,
            FormMode::Edit => Affordance::Edit,
            FormMode::Clone => Affordance::Clone,
            FormMode::View => Affordance::View,
            FormMode::Import => Affordance::Import,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Affordance::Create => "create",
            Affordance::Edit => "edit",
            Affordance::Clone => "clone",
            Affordance::View => "view",
            Affordance::Delete => "delete",
            Affordance::Import => "import",
        }
    }
}

/// 权限表
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionMap {
    granted: HashSet<Affordance>,
}

impl PermissionMap {
    pub fn all() -> Self {
        [
            Affordance::Create,
            Affordance::Edit,
            Affordance::Clone,
            Affordance::View,
            Affordance::Delete,
            Affordance::Import,
        ]
        .into_iter()
        .collect()
    }

    pub fn grant(mut self, affordance: Affordance) -> Self {
        self.granted.insert(affordance);
        self
    }

    pub fn allows(&self, affordance: Affordance) -> bool {
        self.granted.contains(&affordance)
    }

    pub fn check(&self, affordance: Affordance) -> Result<(), EditorError> {
        if self.allows(affordance) {
            Ok(())
        } else {
            Err(EditorError::PermissionDenied {
                affordance: affordance.label().to_string(),
            })
        }
    }
}

impl FromIterator<Affordance> for PermissionMap {
    fn from_iter<I: IntoIterator<Item = Affordance>>(iter: I) -> Self {
        Self {
            granted: iter.into_iter().collect(),
        }
    }
}

/// 列表当前页的行，编辑器提交后通过回调增删
#[derive(Debug, Default)]
pub struct ListRows {
    rows: Mutex<Vec<QuestionRecord>>,
    last_message: Mutex<Option<(String, bool)>>,
}

impl ListRows {
    pub fn snapshot(&self) -> Vec<QuestionRecord> {
        self.rows.lock().map(|rows| rows.clone()).unwrap_or_default()
    }

    fn replace(&self, records: Vec<QuestionRecord>) {
        if let Ok(mut rows) = self.rows.lock() {
            *rows = records;
        }
    }

    fn get(&self, index: usize) -> Option<QuestionRecord> {
        self.rows.lock().ok().and_then(|rows| rows.get(index).cloned())
    }

    /// 最近一次提交的提示与结果
    pub fn last_message(&self) -> Option<(String, bool)> {
        self.last_message.lock().ok().and_then(|m| m.clone())
    }
}

impl EditorHost for ListRows {
    fn on_submit(&self, message: &str, success: bool) {
        if let Ok(mut last) = self.last_message.lock() {
            *last = Some((message.to_string(), success));
        }
    }

    fn add_row(&self, record: &QuestionRecord) {
        if let Ok(mut rows) = self.rows.lock() {
            rows.insert(0, record.clone());
        }
    }

    fn delete_row(&self, id: i64) {
        if let Ok(mut rows) = self.rows.lock() {
            rows.retain(|row| row.id != Some(id));
        }
    }
}

/// 题目列表控制器
pub struct QuestionList {
    question_type: Option<QuestionType>,
    permissions: PermissionMap,
    per_page: usize,
    page: usize,
    search: String,
    total: usize,
    rows: Arc<ListRows>,
}

impl QuestionList {
    pub fn new(question_type: Option<QuestionType>, permissions: PermissionMap, per_page: usize) -> Self {
        Self {
            question_type,
            permissions,
            per_page: per_page.max(1),
            page: 0,
            search: String::new(),
            total: 0,
            rows: Arc::new(ListRows::default()),
        }
    }

    pub fn permissions(&self) -> &PermissionMap {
        &self.permissions
    }

    pub fn rows(&self) -> Vec<QuestionRecord> {
        self.rows.snapshot()
    }

    /// 给编辑器用的宿主句柄
    pub fn host(&self) -> Arc<ListRows> {
        self.rows.clone()
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn page_count(&self) -> usize {
        self.total.div_ceil(self.per_page)
    }

    /// 重新拉取当前页
    pub async fn refresh(&mut self, session: &AuthoringSession) -> AppResult<()> {
        let query = ListQuery {
            question_type: self.question_type,
            offset: self.page * self.per_page,
            limit: self.per_page,
            search: self.search.clone(),
        };
        let page = session.questions().list(&query).await?;
        info!(
            "✓ 题目列表第 {} 页: {} 条 / 共 {} 条",
            self.page + 1,
            page.records.len(),
            page.count
        );
        self.total = page.count;
        self.rows.replace(page.records);
        Ok(())
    }

    /// 跳到第 `page` 页（从 0 开始）
    pub async fn goto_page(&mut self, session: &AuthoringSession, page: usize) -> AppResult<()> {
        self.page = page;
        self.refresh(session).await
    }

    /// 搜索，回到第一页
    pub async fn search(&mut self, session: &AuthoringSession, term: &str) -> AppResult<()> {
        self.search = term.trim().to_string();
        self.page = 0;
        self.refresh(session).await
    }

    /// 按权限打开编辑器
    ///
    /// 新建不需要行；其余模式打开第 `row` 行
    pub fn open_editor(
        &self,
        session: &AuthoringSession,
        mode: FormMode,
        row: Option<usize>,
    ) -> AppResult<QuestionEditor> {
        self.permissions.check(Affordance::for_mode(mode))?;
        let record = match (mode, row) {
            (FormMode::Create, _) => None,
            (_, Some(index)) => Some(self.row(index)?),
            (_, None) => None,
        };
        session.open_editor(mode, record.as_ref(), self.rows.clone())
    }

    /// 删除第 `row` 行
    pub async fn delete(&mut self, session: &AuthoringSession, row: usize) -> AppResult<()> {
        self.permissions.check(Affordance::Delete)?;
        let record = self.row(row)?;
        let question_type = QuestionType::parse(&record.question_type)?;
        let id = record.id.ok_or_else(|| EditorError::MissingRecord {
            mode: "delete".to_string(),
        })?;

        let response = session.questions().delete(id, question_type).await?;
        if !session.questions().is_success(&response) {
            warn!("⚠️ 删除题目 {} 失败: {:?}", id, response.message);
            return Err(AppError::bad_response(
                format!("delete {}", id),
                response.status,
                response.message,
            ));
        }

        self.rows.delete_row(id);
        self.total = self.total.saturating_sub(1);
        self.rows.on_submit("Question deleted successfully", true);
        info!("✓ 已删除题目 {}", id);
        Ok(())
    }

    fn row(&self, index: usize) -> AppResult<QuestionRecord> {
        self.rows.get(index).ok_or_else(|| {
            EditorError::IndexOutOfRange {
                index,
                len: self.rows.snapshot().len(),
            }
            .into()
        })
    }
}
