//! 基于 reqwest 的请求执行器

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::infrastructure::request_executor::{
    ApiRequest, ApiResponse, HttpMethod, RequestBody, RequestExecutor,
};
use async_trait::async_trait;
use reqwest::header::{ACCEPT_LANGUAGE, AUTHORIZATION, CONTENT_TYPE};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// HTTP 执行器
///
/// 职责：
/// - 持有唯一的 reqwest::Client
/// - 拼接根地址、附加 Token 与语言头
/// - 不认识 Question / Import
pub struct HttpExecutor {
    client: reqwest::Client,
    base_url: String,
}

impl HttpExecutor {
    /// 创建新的 HTTP 执行器
    pub fn new(config: &Config) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

#[async_trait]
impl RequestExecutor for HttpExecutor {
    async fn execute(&self, request: ApiRequest) -> AppResult<ApiResponse> {
        let url = format!("{}{}", self.base_url, request.url);
        debug!("{} {}", request.method.as_str(), url);

        let mut builder = self
            .client
            .request(Self::method(request.method), &url)
            .header(ACCEPT_LANGUAGE, request.locale.as_deref().unwrap_or("en"));

        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }

        if let Some(token) = &request.token {
            builder = builder.header(AUTHORIZATION, format!("Token {}", token));
        }

        builder = match request.data {
            RequestBody::Empty => builder,
            RequestBody::Json(data) => builder.json(&data),
            RequestBody::Bytes {
                content_type,
                bytes,
            } => builder.header(CONTENT_TYPE, content_type).body(bytes),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| AppError::api_request_failed(url.clone(), e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| AppError::api_request_failed(url.clone(), e))?;
        let body: Value = if text.trim().is_empty() {
            Value::Null
        } else {
            serde_json::from_str(&text).unwrap_or(Value::String(text))
        };

        debug!("{} {} -> {}", request.method.as_str(), url, status.as_u16());

        if status.is_success() {
            return Ok(ApiResponse::ok(status.as_u16(), body));
        }

        // 错误响应：优先取 error / detail 作为整体信息，details 缺省时整个响应体就是字段错误
        let message = ["error", "detail"]
            .iter()
            .find_map(|key| body.get(*key).and_then(Value::as_str))
            .unwrap_or("Server error")
            .to_string();
        let details = match body.get("details") {
            Some(details) if !details.is_null() => Some(details.clone()),
            _ if body.is_null() => None,
            _ => Some(body.clone()),
        };

        Ok(ApiResponse {
            status: Some(status.as_u16()),
            success: None,
            data: body,
            message: Some(message),
            details,
        })
    }
}
