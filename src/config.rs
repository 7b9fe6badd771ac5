use crate::error::{AppError, AppResult, FileError};
use crate::infrastructure::SuccessRange;
use serde::Deserialize;
use std::path::Path;

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 后端 API 根地址
    pub api_base_url: String,
    /// 登录凭证（Token 认证）
    pub api_token: Option<String>,
    /// 请求语言（Accept-Language）
    pub locale: String,
    // --- 端点配置 ---
    /// 题目 CRUD 端点
    pub question_endpoint: String,
    /// 媒体上传端点
    pub upload_endpoint: String,
    /// 省/州列表端点（按国家过滤）
    pub state_endpoint: String,
    /// 国家列表端点
    pub country_endpoint: String,
    /// 机构分类端点
    pub category_endpoint: String,
    // --- 业务配置 ---
    /// 成功状态码区间起点（含）
    pub http_success_start: u16,
    /// 成功状态码区间终点（不含）
    pub http_success_end: u16,
    /// 单题最多选项数
    pub max_options: usize,
    /// 列表每页条数
    pub items_per_page: usize,
    /// 待导入的 JSON 文件
    pub import_file: Option<String>,
    /// 单次请求超时（秒）
    pub request_timeout_secs: u64,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8000".to_string(),
            api_token: None,
            locale: "en".to_string(),
            question_endpoint: "/api/questions/".to_string(),
            upload_endpoint: "/api/upload/".to_string(),
            state_endpoint: "/api/geo-admin-1/".to_string(),
            country_endpoint: "/api/countries/".to_string(),
            category_endpoint: "/api/educational-organization-categories/".to_string(),
            http_success_start: 200,
            http_success_end: 300,
            max_options: 8,
            items_per_page: 20,
            import_file: None,
            request_timeout_secs: 30,
            verbose_logging: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 从 TOML 文件加载配置，环境变量优先
    pub fn from_toml_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
        let config: Config = toml::from_str(&content).map_err(|e| {
            AppError::File(FileError::TomlParseFailed {
                path: path.display().to_string(),
                source: Box::new(e),
            })
        })?;
        Ok(config.with_env_overrides())
    }

    /// 状态码是否落在成功区间内
    pub fn is_success_status(&self, status: u16) -> bool {
        self.success_range().contains(status)
    }

    pub fn success_range(&self) -> SuccessRange {
        SuccessRange::new(self.http_success_start, self.http_success_end)
    }

    fn with_env_overrides(self) -> Self {
        let base = self;
        Self {
            api_base_url: std::env::var("API_BASE_URL").unwrap_or(base.api_base_url),
            api_token: std::env::var("API_TOKEN").ok().or(base.api_token),
            locale: std::env::var("API_LOCALE").unwrap_or(base.locale),
            question_endpoint: std::env::var("QUESTION_ENDPOINT").unwrap_or(base.question_endpoint),
            upload_endpoint: std::env::var("UPLOAD_ENDPOINT").unwrap_or(base.upload_endpoint),
            state_endpoint: std::env::var("STATE_ENDPOINT").unwrap_or(base.state_endpoint),
            country_endpoint: std::env::var("COUNTRY_ENDPOINT").unwrap_or(base.country_endpoint),
            category_endpoint: std::env::var("CATEGORY_ENDPOINT").unwrap_or(base.category_endpoint),
            http_success_start: std::env::var("HTTP_SUCCESS_START").ok().and_then(|v| v.parse().ok()).unwrap_or(base.http_success_start),
            http_success_end: std::env::var("HTTP_SUCCESS_END").ok().and_then(|v| v.parse().ok()).unwrap_or(base.http_success_end),
            max_options: std::env::var("MAX_OPTIONS").ok().and_then(|v| v.parse().ok()).unwrap_or(base.max_options),
            items_per_page: std::env::var("ITEMS_PER_PAGE").ok().and_then(|v| v.parse().ok()).unwrap_or(base.items_per_page),
            import_file: std::env::var("IMPORT_FILE").ok().or(base.import_file),
            request_timeout_secs: std::env::var("REQUEST_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(base.request_timeout_secs),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(base.verbose_logging),
        }
    }
}
