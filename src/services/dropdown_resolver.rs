//! 级联下拉框
//!
//! 每种分类一个列表，另记每种分类当前选中的 id。
//! 依赖列表的可选项 = 父级 id 等于上游当前选择的节点（上游未选时为空）。
//!
//! 级联拉取不取消：上游连续切换时，先发出的请求如果后返回，会覆盖后发出的结果
//! （以最后"返回"的为准）。`apply_loaded` 在这种情况下记一条 debug 日志。

use crate::clients::TaxonomyClient;
use crate::error::{AppResult, ConfigError};
use crate::models::{TaxonomyKind, TaxonomyNode};
use std::collections::HashMap;
use tracing::debug;

/// 一次待执行的级联拉取
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CascadeFetch {
    /// 要刷新的依赖种类
    pub kind: TaxonomyKind,
    /// 上游选中的 id
    pub parent_id: i64,
}

/// 级联下拉框状态
#[derive(Debug, Clone, Default)]
pub struct DropdownResolver {
    lists: HashMap<TaxonomyKind, Vec<TaxonomyNode>>,
    selections: HashMap<TaxonomyKind, i64>,
}

impl DropdownResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_lists(lists: HashMap<TaxonomyKind, Vec<TaxonomyNode>>) -> Self {
        Self {
            lists,
            selections: HashMap::new(),
        }
    }

    /// 替换某一种类的完整列表
    pub fn set_list(&mut self, kind: TaxonomyKind, nodes: Vec<TaxonomyNode>) {
        self.lists.insert(kind, nodes);
    }

    pub fn list(&self, kind: TaxonomyKind) -> &[TaxonomyNode] {
        self.lists.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn lists(&self) -> &HashMap<TaxonomyKind, Vec<TaxonomyNode>> {
        &self.lists
    }

    /// 父级 id 等于给定值的节点；未给父级时为空
    pub fn filter_by_parent(
        &self,
        kind: TaxonomyKind,
        parent_id: Option<i64>,
    ) -> Vec<&TaxonomyNode> {
        let Some(parent_id) = parent_id else {
            return Vec::new();
        };
        self.list(kind)
            .iter()
            .filter(|node| node.parent_id == Some(parent_id))
            .collect()
    }

    /// 当前可选项：根种类是完整列表，依赖种类按上游选择过滤
    pub fn options_for(&self, kind: TaxonomyKind) -> Vec<&TaxonomyNode> {
        match kind.parent() {
            None => self.list(kind).iter().collect(),
            Some(parent) => self.filter_by_parent(kind, self.selection(parent)),
        }
    }

    pub fn selection(&self, kind: TaxonomyKind) -> Option<i64> {
        self.selections.get(&kind).copied()
    }

    /// 按已有记录恢复选择，不检查可选项、不触发级联
    pub fn restore_selection(&mut self, kind: TaxonomyKind, id: Option<i64>) {
        match id {
            Some(id) => self.selections.insert(kind, id),
            None => self.selections.remove(&kind),
        };
    }

    /// 上游变化：同步清空所有传递下游的选择
    ///
    /// # 返回
    /// 被清空的种类（按层级顺序）
    pub fn on_upstream_change(&mut self, kind: TaxonomyKind) -> Vec<TaxonomyKind> {
        let cleared = kind.descendants();
        for child in &cleared {
            self.selections.remove(child);
        }
        cleared
    }

    /// 选择（或清空）某一种类
    ///
    /// 选择值必须在当前可选项中，否则属于使用错误。
    /// 选择发生变化时清空下游，并返回直接下游需要的级联拉取。
    pub fn select(
        &mut self,
        kind: TaxonomyKind,
        id: Option<i64>,
    ) -> AppResult<Option<CascadeFetch>> {
        if let Some(id) = id {
            if !self.options_for(kind).iter().any(|node| node.id == id) {
                return Err(ConfigError::ResolverMisuse {
                    reason: format!("{:?} 的可选项中没有 id {}", kind, id),
                }
                .into());
            }
        }

        if self.selection(kind) == id {
            return Ok(None);
        }

        match id {
            Some(id) => self.selections.insert(kind, id),
            None => self.selections.remove(&kind),
        };
        self.on_upstream_change(kind);

        Ok(id.and_then(|parent_id| {
            kind.children()
                .first()
                .map(|&child| CascadeFetch { kind: child, parent_id })
        }))
    }

    /// 应用一次级联拉取的结果
    ///
    /// 无论该拉取是否已被更新的选择取代，都直接覆盖列表
    pub fn apply_loaded(&mut self, fetch: CascadeFetch, nodes: Vec<TaxonomyNode>) {
        let current = fetch.kind.parent().and_then(|p| self.selection(p));
        if current != Some(fetch.parent_id) {
            debug!(
                "{:?}: 应用了过期的级联结果 (parent={}, 当前={:?})",
                fetch.kind, fetch.parent_id, current
            );
        }
        let nodes = nodes
            .into_iter()
            .map(|mut node| {
                node.parent_id.get_or_insert(fetch.parent_id);
                node
            })
            .collect();
        self.lists.insert(fetch.kind, nodes);
    }

    /// 拉取并应用级联结果
    pub async fn load(&mut self, client: &TaxonomyClient, fetch: CascadeFetch) -> AppResult<()> {
        let nodes = client.fetch_children(fetch.kind, fetch.parent_id).await?;
        self.apply_loaded(fetch, nodes);
        Ok(())
    }

    /// 内联新建的节点直接追加到内存列表，不重新拉取
    pub fn append_created(&mut self, kind: TaxonomyKind, node: TaxonomyNode) {
        self.lists.entry(kind).or_default().push(node);
    }

    /// 在服务端新建节点并追加；父级取上游当前选择
    pub async fn create_entry(
        &mut self,
        client: &TaxonomyClient,
        kind: TaxonomyKind,
        label: &str,
    ) -> AppResult<TaxonomyNode> {
        let parent_id = kind.parent().and_then(|p| self.selection(p));
        if kind.parent().is_some() && parent_id.is_none() {
            return Err(ConfigError::ResolverMisuse {
                reason: format!("新建 {:?} 之前必须先选择上游", kind),
            }
            .into());
        }
        let node = client.create_entry(kind, label, parent_id).await?;
        self.append_created(kind, node.clone());
        Ok(node)
    }

    /// 按 id 查显示名
    pub fn label_of(&self, kind: TaxonomyKind, id: i64) -> Option<&str> {
        self.list(kind)
            .iter()
            .find(|node| node.id == id)
            .map(|node| node.label.as_str())
    }
}
