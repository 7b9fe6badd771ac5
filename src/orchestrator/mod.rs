//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 批量导入：加载导出文件、并发提交、汇总结果。
//!
//! ## 层次关系
//!
//! ```text
//! orchestrator::BatchImporter (处理 Vec<ImportCandidate>)
//!     ↓
//! workflow (会话 / 单题编辑器，导入前修改候选题目)
//!     ↓
//! services (能力层：校验 / 下拉框 / 视图模型 / 错误解读)
//!     ↓
//! clients → infrastructure (RequestExecutor)
//! ```

pub mod batch_importer;

pub use batch_importer::{BatchImporter, ImportCandidate, ImportHost, ImportReport};
