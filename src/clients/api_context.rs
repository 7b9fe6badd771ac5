use crate::config::Config;
use crate::error::{ApiError, AppError, AppResult};
use crate::infrastructure::{
    ApiRequest, ApiResponse, CredentialProvider, HttpMethod, RequestExecutor, SuccessRange,
};
use std::sync::Arc;

/// 客户端共享的请求上下文
///
/// 执行器、凭证与语言在会话内只有一份，各客户端按引用计数共享
#[derive(Clone)]
pub struct ApiContext {
    executor: Arc<dyn RequestExecutor>,
    credentials: Arc<dyn CredentialProvider>,
    locale: String,
    success: SuccessRange,
}

impl ApiContext {
    pub fn new(
        executor: Arc<dyn RequestExecutor>,
        credentials: Arc<dyn CredentialProvider>,
        config: &Config,
    ) -> Self {
        Self {
            executor,
            credentials,
            locale: config.locale.clone(),
            success: config.success_range(),
        }
    }

    /// 构造带凭证与语言的请求
    pub fn request(&self, method: HttpMethod, url: impl Into<String>) -> ApiRequest {
        ApiRequest::new(method, url)
            .token(self.credentials.token())
            .locale(self.locale.clone())
    }

    /// 构造请求，缺少凭证时直接失败
    pub fn authorized(&self, method: HttpMethod, url: impl Into<String>) -> AppResult<ApiRequest> {
        let url = url.into();
        if self.credentials.token().is_none() {
            return Err(ApiError::MissingCredential { endpoint: url }.into());
        }
        Ok(self.request(method, url))
    }

    /// 发送请求，HTTP 错误状态原样作为数据返回
    pub async fn send(&self, request: ApiRequest) -> AppResult<ApiResponse> {
        self.executor.execute(request).await
    }

    /// 发送请求，非成功响应转成 `Err`
    pub async fn send_checked(&self, request: ApiRequest) -> AppResult<ApiResponse> {
        let endpoint = request.url.clone();
        let response = self.send(request).await?;
        if self.is_success(&response) {
            Ok(response)
        } else {
            Err(AppError::bad_response(
                endpoint,
                response.status,
                response.message.clone(),
            ))
        }
    }

    pub fn is_success(&self, response: &ApiResponse) -> bool {
        response.is_success(self.success)
    }

    pub fn success_range(&self) -> SuccessRange {
        self.success
    }
}
