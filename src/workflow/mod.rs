//! 流程层
//!
//! - `session`: 会话（客户端 + 下拉框数据，显式初始化/销毁）
//! - `editor`: 单题编辑器
//! - `list`: 题目列表（分页、搜索、权限）

pub mod editor;
pub mod list;
pub mod question_ctx;
pub mod session;

pub use editor::{EditorDeps, EditorHost, EditorState, FormMode, QuestionEditor, SilentHost, SubmitOutcome};
pub use list::{Affordance, ListRows, PermissionMap, QuestionList};
pub use question_ctx::QuestionCtx;
pub use session::{AuthoringSession, INITIAL_KINDS};
