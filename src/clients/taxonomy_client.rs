/// 分类体系 API 客户端
///
/// 下拉框数据的拉取、按父级拉取子级、以及内联新建
use crate::clients::api_context::ApiContext;
use crate::config::Config;
use crate::error::{AppError, AppResult, ConfigError};
use crate::infrastructure::HttpMethod;
use crate::models::{TaxonomyKind, TaxonomyNode};
use futures::future::join_all;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use tracing::{debug, warn};

/// 分类体系客户端
#[derive(Clone)]
pub struct TaxonomyClient {
    ctx: ApiContext,
    country_endpoint: String,
    state_endpoint: String,
    category_endpoint: String,
}

impl TaxonomyClient {
    pub fn new(ctx: ApiContext, config: &Config) -> Self {
        Self {
            ctx,
            country_endpoint: config.country_endpoint.clone(),
            state_endpoint: config.state_endpoint.clone(),
            category_endpoint: config.category_endpoint.clone(),
        }
    }

    /// 种类对应的端点
    pub fn endpoint(&self, kind: TaxonomyKind) -> String {
        match kind {
            TaxonomyKind::Country => self.country_endpoint.clone(),
            TaxonomyKind::State => self.state_endpoint.clone(),
            TaxonomyKind::Category => self.category_endpoint.clone(),
            other => other.endpoint().unwrap_or_default().to_string(),
        }
    }

    /// 拉取某一种类的全部节点
    pub async fn fetch(&self, kind: TaxonomyKind) -> AppResult<Vec<TaxonomyNode>> {
        let request = self.ctx.request(HttpMethod::Get, self.endpoint(kind));
        let response = self.ctx.send_checked(request).await?;
        let nodes = parse_nodes(kind, &response.data);
        debug!("{:?}: 拉取到 {} 条", kind, nodes.len());
        Ok(nodes)
    }

    /// 按父级 id 拉取依赖种类的节点
    ///
    /// 例如按国家拉取省/州：`GET {state_endpoint}?country={id}`
    pub async fn fetch_children(
        &self,
        kind: TaxonomyKind,
        parent_id: i64,
    ) -> AppResult<Vec<TaxonomyNode>> {
        let Some(parent_key) = kind.parent_key() else {
            return Err(ConfigError::ResolverMisuse {
                reason: format!("{:?} 不是依赖种类，不能按父级拉取", kind),
            }
            .into());
        };
        let request = self
            .ctx
            .request(HttpMethod::Get, self.endpoint(kind))
            .query(parent_key, parent_id);
        let response = self.ctx.send_checked(request).await?;

        // 服务端未必按参数过滤，缺少父级字段的记录补上请求的父级
        let nodes = parse_nodes(kind, &response.data)
            .into_iter()
            .map(|mut node| {
                node.parent_id.get_or_insert(parent_id);
                node
            })
            .collect();
        Ok(nodes)
    }

    /// 并发拉取多个种类
    ///
    /// 某一种类失败时记一条警告，列表按空处理，不影响其余种类
    pub async fn fetch_all(&self, kinds: &[TaxonomyKind]) -> HashMap<TaxonomyKind, Vec<TaxonomyNode>> {
        let results = join_all(kinds.iter().map(|&kind| async move { (kind, self.fetch(kind).await) })).await;

        results
            .into_iter()
            .map(|(kind, result)| match result {
                Ok(nodes) => (kind, nodes),
                Err(e) => {
                    warn!("⚠️ 下拉框数据加载失败 {:?}: {}", kind, e);
                    (kind, Vec::new())
                }
            })
            .collect()
    }

    /// 内联新建一个分类节点
    ///
    /// 重复项由服务端拒绝，错误原样返回给调用方
    pub async fn create_entry(
        &self,
        kind: TaxonomyKind,
        label: &str,
        parent_id: Option<i64>,
    ) -> AppResult<TaxonomyNode> {
        let mut body = Map::new();
        body.insert("name".to_string(), json!(label));
        if let (Some(key), Some(parent)) = (kind.parent_key(), parent_id) {
            body.insert(key.to_string(), json!(parent));
        }

        let endpoint = self.endpoint(kind);
        let request = self
            .ctx
            .request(HttpMethod::Post, endpoint.clone())
            .json(Value::Object(body));
        let response = self.ctx.send_checked(request).await?;

        let mut node = TaxonomyNode::from_api(kind, &response.data).ok_or_else(|| {
            AppError::bad_response(endpoint, response.status, Some("新建结果缺少 id".to_string()))
        })?;
        if node.label.is_empty() {
            node.label = label.to_string();
        }
        if node.parent_id.is_none() {
            node.parent_id = parent_id;
        }
        Ok(node)
    }
}

/// 兼容裸数组与 `{results: [...]}` 两种列表响应
fn parse_nodes(kind: TaxonomyKind, data: &Value) -> Vec<TaxonomyNode> {
    let items: &[Value] = match data {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => match map.get("results") {
            Some(Value::Array(items)) => items.as_slice(),
            _ => &[],
        },
        _ => &[],
    };
    items
        .iter()
        .filter_map(|item| TaxonomyNode::from_api(kind, item))
        .collect()
}
