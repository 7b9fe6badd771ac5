//! 请求执行器 - 基础设施层
//!
//! 唯一接触传输层的地方：只暴露"发一个请求、拿回一个响应"的能力。
//! HTTP 错误状态码作为数据返回，只有拿不到响应时才返回 `Err`。

use crate::error::AppResult;
use async_trait::async_trait;
use serde_json::Value;

/// HTTP 方法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// 请求体
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Bytes { content_type: String, bytes: Vec<u8> },
}

/// 一次 API 请求
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// 相对于 API 根地址的路径（可带查询参数）
    pub url: String,
    pub method: HttpMethod,
    /// 查询参数（由执行器负责编码）
    pub query: Vec<(String, String)>,
    pub data: RequestBody,
    pub token: Option<String>,
    pub locale: Option<String>,
}

impl ApiRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            query: Vec::new(),
            data: RequestBody::Empty,
            token: None,
            locale: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// 查询参数的值
    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn json(mut self, data: Value) -> Self {
        self.data = RequestBody::Json(data);
        self
    }

    pub fn bytes(mut self, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.data = RequestBody::Bytes {
            content_type: content_type.into(),
            bytes,
        };
        self
    }

    pub fn token(mut self, token: Option<String>) -> Self {
        self.token = token;
        self
    }

    pub fn locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = Some(locale.into());
        self
    }
}

/// 成功状态码区间 `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuccessRange {
    pub start: u16,
    pub end: u16,
}

impl SuccessRange {
    pub fn new(start: u16, end: u16) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, status: u16) -> bool {
        status >= self.start && status < self.end
    }
}

impl Default for SuccessRange {
    fn default() -> Self {
        Self::new(200, 300)
    }
}

/// 一次 API 响应
///
/// 后端有两种成功约定：布尔 `success` 字段，或状态码落在成功区间。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApiResponse {
    pub status: Option<u16>,
    pub success: Option<bool>,
    pub data: Value,
    pub message: Option<String>,
    pub details: Option<Value>,
}

impl ApiResponse {
    /// 成功响应
    pub fn ok(status: u16, data: Value) -> Self {
        Self {
            status: Some(status),
            data,
            ..Default::default()
        }
    }

    /// 失败响应
    pub fn failed(status: u16, message: impl Into<String>, details: Option<Value>) -> Self {
        Self {
            status: Some(status),
            message: Some(message.into()),
            details,
            ..Default::default()
        }
    }

    /// 显式的 `success` 字段优先，否则看状态码
    pub fn is_success(&self, range: SuccessRange) -> bool {
        match self.success {
            Some(flag) => flag,
            None => self.status.map(|s| range.contains(s)).unwrap_or(false),
        }
    }
}

/// 请求执行器
#[async_trait]
pub trait RequestExecutor: Send + Sync {
    async fn execute(&self, request: ApiRequest) -> AppResult<ApiResponse>;
}

/// 登录凭证提供者
pub trait CredentialProvider: Send + Sync {
    fn token(&self) -> Option<String>;
}

/// 固定凭证
#[derive(Debug, Clone, Default)]
pub struct StaticCredentials {
    token: Option<String>,
}

impl StaticCredentials {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }
}

impl CredentialProvider for StaticCredentials {
    fn token(&self) -> Option<String> {
        self.token.clone()
    }
}
