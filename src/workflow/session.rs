//! 出题会话
//!
//! 持有客户端和一份完整的下拉框数据，显式初始化、显式销毁。
//! 编辑器和批量导入各自拿到下拉框数据的副本。

use crate::clients::{ApiContext, QuestionClient, TaxonomyClient};
use crate::config::Config;
use crate::error::AppResult;
use crate::infrastructure::{CredentialProvider, HttpExecutor, RequestExecutor, StaticCredentials};
use crate::models::{QuestionRecord, QuestionType, TaxonomyKind, TaxonomyNode};
use crate::orchestrator::{BatchImporter, ImportHost};
use crate::services::{DropdownResolver, Validator};
use crate::workflow::editor::{EditorDeps, EditorHost, FormMode, QuestionEditor};
use crate::workflow::list::{PermissionMap, QuestionList};
use std::sync::Arc;
use tracing::{info, warn};

/// 会话初始化时加载的下拉框
///
/// 省/州按国家级联加载，不在此列
pub const INITIAL_KINDS: [TaxonomyKind; 13] = [
    TaxonomyKind::QuestionLevel,
    TaxonomyKind::Organization,
    TaxonomyKind::TargetGroup,
    TaxonomyKind::Subject,
    TaxonomyKind::QuestionType,
    TaxonomyKind::Topic,
    TaxonomyKind::ExamReference,
    TaxonomyKind::QuestionStatus,
    TaxonomyKind::DifficultyLevel,
    TaxonomyKind::SubTopic,
    TaxonomyKind::SubSubTopic,
    TaxonomyKind::Country,
    TaxonomyKind::Category,
];

/// 出题会话
pub struct AuthoringSession {
    questions: QuestionClient,
    taxonomy: TaxonomyClient,
    resolver: DropdownResolver,
    validator: Validator,
    items_per_page: usize,
    has_credentials: bool,
    initialized: bool,
}

impl AuthoringSession {
    /// 用给定的执行器和凭证创建会话（尚未初始化）
    pub fn new(
        config: &Config,
        executor: Arc<dyn RequestExecutor>,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Self {
        let has_credentials = credentials.token().is_some();
        let ctx = ApiContext::new(executor, credentials, config);
        Self {
            questions: QuestionClient::new(ctx.clone(), config),
            taxonomy: TaxonomyClient::new(ctx, config),
            resolver: DropdownResolver::new(),
            validator: Validator::new(config.max_options),
            items_per_page: config.items_per_page,
            has_credentials,
            initialized: false,
        }
    }

    /// 按配置创建走 HTTP 的会话
    pub fn from_config(config: &Config) -> AppResult<Self> {
        let executor = Arc::new(HttpExecutor::new(config)?);
        let credentials = Arc::new(StaticCredentials::new(config.api_token.clone()));
        Ok(Self::new(config, executor, credentials))
    }

    /// 初始化：并发加载全部下拉框
    ///
    /// 单个种类失败只记警告，该列表为空
    pub async fn init(&mut self) -> AppResult<()> {
        if !self.has_credentials {
            warn!("⚠️ 未配置登录凭证，下拉框数据可能无法加载");
        }
        info!("📚 正在加载下拉框数据...");

        let lists = self.taxonomy.fetch_all(&INITIAL_KINDS).await;
        let total: usize = lists.values().map(Vec::len).sum();
        let empty = lists.values().filter(|nodes| nodes.is_empty()).count();
        self.resolver = DropdownResolver::with_lists(lists);
        self.initialized = true;

        info!(
            "✓ 下拉框数据加载完成: {} 类 共 {} 条 ({} 类为空)",
            INITIAL_KINDS.len(),
            total,
            empty
        );
        Ok(())
    }

    /// 销毁：丢弃全部缓存的下拉框数据
    pub fn teardown(&mut self) {
        self.resolver = DropdownResolver::new();
        self.initialized = false;
        info!("会话已结束，下拉框数据已清空");
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn resolver(&self) -> &DropdownResolver {
        &self.resolver
    }

    pub fn resolver_mut(&mut self) -> &mut DropdownResolver {
        &mut self.resolver
    }

    pub fn questions(&self) -> &QuestionClient {
        &self.questions
    }

    pub fn taxonomy(&self) -> &TaxonomyClient {
        &self.taxonomy
    }

    pub fn validator(&self) -> Validator {
        self.validator
    }

    /// 编辑器依赖（下拉框数据是副本）
    pub fn editor_deps(&self) -> EditorDeps {
        EditorDeps {
            questions: self.questions.clone(),
            taxonomy: self.taxonomy.clone(),
            resolver: self.resolver.clone(),
            validator: self.validator,
        }
    }

    /// 打开一个编辑器
    pub fn open_editor(
        &self,
        mode: FormMode,
        record: Option<&QuestionRecord>,
        host: Arc<dyn EditorHost>,
    ) -> AppResult<QuestionEditor> {
        QuestionEditor::open(mode, record, self.editor_deps(), host)
    }

    /// 创建批量导入器
    pub fn importer(&self, host: Arc<dyn ImportHost>) -> BatchImporter {
        BatchImporter::new(self.editor_deps(), host)
    }

    /// 创建题目列表，每页条数取自配置
    pub fn list(&self, question_type: Option<QuestionType>, permissions: PermissionMap) -> QuestionList {
        QuestionList::new(question_type, permissions, self.items_per_page)
    }

    /// 在编辑器里内联新建分类节点，并同步到会话的下拉框数据
    ///
    /// 之后打开的编辑器和导入器都能看到新节点
    pub async fn create_taxonomy_entry(
        &mut self,
        editor: &mut QuestionEditor,
        kind: TaxonomyKind,
        label: &str,
    ) -> AppResult<TaxonomyNode> {
        let node = editor.create_taxonomy_entry(kind, label).await?;
        self.resolver.append_created(kind, node.clone());
        Ok(node)
    }
}
