use thiserror::Error;

/// 应用程序错误类型
///
/// 校验失败不走这里：校验结果以 `ValidationReport` 作为数据返回。
/// 这里只承载传输/鉴权失败以及配置/逻辑错误。
#[derive(Debug, Error)]
pub enum AppError {
    /// API 调用错误
    #[error("API错误: {0}")]
    Api(#[from] ApiError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
    /// 批量导入错误
    #[error("导入错误: {0}")]
    Import(#[from] ImportError),
    /// 编辑器操作错误
    #[error("编辑器错误: {0}")]
    Editor(#[from] EditorError),
    /// 配置错误（致命，不自动重试）
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 其他错误（用于包装第三方库错误）
    #[error("错误: {0}")]
    Other(String),
}

/// API 调用错误
#[derive(Debug, Error)]
pub enum ApiError {
    /// 网络请求失败（请求没有拿到任何响应）
    #[error("API请求失败 ({endpoint}): {source}")]
    RequestFailed {
        endpoint: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// API 返回错误响应
    #[error("API返回错误响应 ({endpoint}): status={status:?}, message={message:?}")]
    BadResponse {
        endpoint: String,
        status: Option<u16>,
        message: Option<String>,
    },
    /// 缺少登录凭证
    #[error("缺少登录凭证，无法访问 {endpoint}")]
    MissingCredential { endpoint: String },
    /// JSON 解析失败
    #[error("JSON解析失败: {source}")]
    JsonParseFailed {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 文件不存在
    #[error("文件不存在: {path}")]
    NotFound { path: String },
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({path}): {source}")]
    TomlParseFailed {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// 批量导入错误
#[derive(Debug, Error)]
pub enum ImportError {
    /// 导入文件解析失败，整批放弃
    #[error("导入文件解析失败，请确认是合法的 JSON 文件: {reason}")]
    ParseFailed { reason: String },
    /// 没有待导入的题目
    #[error("没有待导入的题目")]
    NothingPending,
    /// 候选题目索引越界
    #[error("候选题目索引 {index} 超出范围 (共 {len} 个)")]
    CandidateOutOfRange { index: usize, len: usize },
}

/// 编辑器操作错误
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EditorError {
    /// 查看模式下禁止修改
    #[error("查看模式下不能修改题目")]
    ReadOnly,
    /// 编辑器已结束（已提交或已取消）
    #[error("编辑器已处于终止状态: {state}")]
    Finished { state: String },
    /// 选项数量达到上限
    #[error("选项数量已达上限 {max}")]
    OptionLimitReached { max: usize },
    /// 选项数量不能少于下限
    #[error("选项数量不能少于 {min}")]
    TooFewOptions { min: usize },
    /// 解析数量达到上限
    #[error("解析数量已达上限 {max}")]
    ExplanationLimitReached { max: usize },
    /// 索引越界
    #[error("索引 {index} 超出范围 (长度 {len})")]
    IndexOutOfRange { index: usize, len: usize },
    /// 当前题型不支持该操作
    #[error("题型 {question_type} 不支持该操作: {operation}")]
    UnsupportedForType {
        question_type: String,
        operation: String,
    },
    /// 该模式需要一条已有记录
    #[error("{mode} 模式需要一条已有题目")]
    MissingRecord { mode: String },
    /// 没有权限
    #[error("没有 {affordance} 权限")]
    PermissionDenied { affordance: String },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 未知的题型标识
    #[error("未知的题型标识: {discriminator}")]
    UnknownQuestionType { discriminator: String },
    /// 下拉框解析器使用错误
    #[error("下拉框解析器使用错误: {reason}")]
    ResolverMisuse { reason: String },
}

// ========== 从常见错误类型转换 ==========

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Api(ApiError::JsonParseFailed {
            source: Box::new(err),
        })
    }
}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        AppError::File(FileError::TomlParseFailed {
            path: String::new(), // TOML错误通常不包含路径信息
            source: Box::new(err),
        })
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: String::new(),
            source: Box::new(err),
        })
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        let endpoint = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_default();
        AppError::Api(ApiError::RequestFailed {
            endpoint,
            source: Box::new(err),
        })
    }
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建API请求失败错误
    pub fn api_request_failed(
        endpoint: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::Api(ApiError::RequestFailed {
            endpoint: endpoint.into(),
            source: Box::new(source),
        })
    }

    /// 创建API错误响应
    pub fn bad_response(
        endpoint: impl Into<String>,
        status: Option<u16>,
        message: Option<String>,
    ) -> Self {
        AppError::Api(ApiError::BadResponse {
            endpoint: endpoint.into(),
            status,
            message,
        })
    }

    /// 创建文件读取错误
    pub fn file_read_failed(
        path: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source: Box::new(source),
        })
    }

    /// 创建未知题型错误
    pub fn unknown_question_type(discriminator: impl Into<String>) -> Self {
        AppError::Config(ConfigError::UnknownQuestionType {
            discriminator: discriminator.into(),
        })
    }

    /// 是否属于配置/逻辑类的致命错误
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::Config(_))
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;
