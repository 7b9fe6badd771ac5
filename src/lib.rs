//! # Question Authoring
//!
//! 题目编辑与批量导入引擎
//!
//! ## 架构设计
//!
//! 本系统采用分层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 唯一接触传输层的地方，只暴露能力
//! - `RequestExecutor` - "发一个请求、拿回一个响应"，`HttpExecutor` 是 reqwest 实现
//!
//! ### ② 客户端（Clients）
//! - `QuestionClient` - 题目增删改查、媒体上传
//! - `TaxonomyClient` - 分类下拉框的拉取与新建
//!
//! ### ③ 业务能力层（Services）
//! - `Validator` - 按题型校验表单，结果作为数据返回
//! - `DropdownResolver` - 级联下拉框
//! - `hydrator` - 记录 ⇄ 表单 ⇄ 提交载荷
//! - `augment_names` / `error_extractor` - 导入显示名、服务端错误解读
//!
//! ### ④ 流程层（Workflow）
//! - `AuthoringSession` - 显式初始化/销毁的会话
//! - `QuestionEditor` - 单题编辑器（新建/编辑/克隆/查看/导入编辑）
//! - `QuestionList` - 列表页（分页、搜索、权限）
//!
//! ### ⑤ 编排层（Orchestration）
//! - `BatchImporter` - 批量导入：解析、补全、并发提交、对账
//!
//! ## 模块结构

pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use infrastructure::{ApiRequest, ApiResponse, CredentialProvider, HttpExecutor, RequestExecutor};
pub use models::{QuestionForm, QuestionRecord, QuestionType, TaxonomyKind, TaxonomyNode};
pub use orchestrator::{BatchImporter, ImportCandidate, ImportHost, ImportReport};
pub use services::{DropdownResolver, ValidationReport, Validator};
pub use workflow::{AuthoringSession, FormMode, PermissionMap, QuestionEditor, QuestionList, SubmitOutcome};
