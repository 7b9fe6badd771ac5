/// 题目 API 客户端
///
/// 封装题目增删改查与媒体上传
use crate::clients::api_context::ApiContext;
use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::{ApiResponse, HttpMethod};
use crate::models::{QuestionRecord, QuestionType, WirePayload};
use serde_json::{Map, Value};
use tracing::debug;

/// 列表查询条件
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    pub question_type: Option<QuestionType>,
    pub offset: usize,
    pub limit: usize,
    pub search: String,
}

/// 一页题目
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuestionPage {
    /// 服务端记录总数
    pub count: usize,
    pub records: Vec<QuestionRecord>,
}

/// 题目 API 客户端
#[derive(Clone)]
pub struct QuestionClient {
    ctx: ApiContext,
    endpoint: String,
    upload_endpoint: String,
}

impl QuestionClient {
    /// 创建新的题目客户端
    pub fn new(ctx: ApiContext, config: &Config) -> Self {
        Self {
            ctx,
            endpoint: config.question_endpoint.clone(),
            upload_endpoint: config.upload_endpoint.clone(),
        }
    }

    /// 响应是否算成功（success 字段或状态码区间）
    pub fn is_success(&self, response: &ApiResponse) -> bool {
        self.ctx.is_success(response)
    }

    /// 新建题目
    ///
    /// 题型走 `type` 查询参数，请求体里不带题型。
    /// 返回原始响应，由调用方判断成功与否并解读错误详情
    pub async fn create(&self, payload: &WirePayload) -> AppResult<ApiResponse> {
        let request = self
            .ctx
            .request(HttpMethod::Post, self.endpoint.clone())
            .query("type", payload.question_type.code())
            .json(Value::Object(payload.body.clone()));
        debug!("新建题目: type={}", payload.question_type);
        self.ctx.send(request).await
    }

    /// 更新题目
    pub async fn update(&self, id: i64, payload: &WirePayload) -> AppResult<ApiResponse> {
        let request = self
            .ctx
            .request(HttpMethod::Put, format!("{}{}/", self.endpoint, id))
            .query("type", payload.question_type.code())
            .json(Value::Object(payload.body.clone()));
        debug!("更新题目 {}: type={}", id, payload.question_type);
        self.ctx.send(request).await
    }

    /// 删除题目
    pub async fn delete(&self, id: i64, question_type: QuestionType) -> AppResult<ApiResponse> {
        let request = self
            .ctx
            .request(HttpMethod::Delete, format!("{}{}/", self.endpoint, id))
            .query("type", question_type.code());
        self.ctx.send(request).await
    }

    /// 分页查询题目列表
    ///
    /// # 返回
    /// 兼容 `{count, results}` 分页结构和裸数组两种响应
    pub async fn list(&self, query: &ListQuery) -> AppResult<QuestionPage> {
        let mut request = self
            .ctx
            .request(HttpMethod::Get, self.endpoint.clone())
            .query("offset", query.offset)
            .query("limit", query.limit);
        if let Some(qt) = query.question_type {
            request = request.query("type", qt.code());
        }
        if !query.search.trim().is_empty() {
            request = request.query("search", query.search.trim());
        }

        let response = self.ctx.send_checked(request).await?;
        Ok(parse_page(response.data))
    }

    /// 上传媒体文件
    ///
    /// # 参数
    /// - `filename`: 文件名（作为查询参数）
    /// - `content_type`: MIME 类型
    /// - `bytes`: 文件内容
    ///
    /// # 返回
    /// 存储后的持久地址（`media_link`）
    pub async fn upload_media(
        &self,
        filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> AppResult<String> {
        let request = self
            .ctx
            .authorized(HttpMethod::Put, self.upload_endpoint.clone())?
            .query("filename", filename)
            .bytes(content_type, bytes);

        let response = self.ctx.send_checked(request).await?;
        response
            .data
            .get("media_link")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| {
                AppError::bad_response(
                    self.upload_endpoint.clone(),
                    response.status,
                    Some("响应中没有 media_link".to_string()),
                )
            })
    }
}

fn parse_page(data: Value) -> QuestionPage {
    let (count, items) = match data {
        Value::Array(items) => (items.len(), items),
        Value::Object(mut map) => {
            let items = match map.remove("results") {
                Some(Value::Array(items)) => items,
                _ => Vec::new(),
            };
            let count = count_of(&map).unwrap_or(items.len());
            (count, items)
        }
        _ => (0, Vec::new()),
    };

    QuestionPage {
        count,
        records: items.into_iter().filter_map(QuestionRecord::from_api).collect(),
    }
}

fn count_of(map: &Map<String, Value>) -> Option<usize> {
    map.get("count").and_then(Value::as_u64).map(|c| c as usize)
}
