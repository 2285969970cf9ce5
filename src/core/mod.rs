//! 核心编排层：错误分类、重试驱动、请求阶段、对话编排器

pub mod classify;
pub mod error;
pub mod orchestrator;
pub mod retry;
pub mod state;

pub use classify::{classify, classify_llm_error, Classification};
pub use error::{ChatError, ErrorKind};
pub use orchestrator::ChatOrchestrator;
pub use retry::{submit_with_retry, RetryPolicy};
pub use state::{ConversationSnapshot, RequestPhase};
