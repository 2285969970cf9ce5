//! Parley - Rust 对话核心
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 对话编排、单飞状态、失败分类与重试驱动
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock / Scripted）、凭据校验与来源
//! - **memory**: 对话轮次存储、键值持久化、保存的产物
//! - **observability**: 日志初始化
//! - **prompt**: 提示模板
//! - **runtime**: 按配置装配上述组件

pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod prompt;
pub mod runtime;

pub use crate::core::{ChatError, ChatOrchestrator, ErrorKind};
pub use crate::memory::{Turn, TurnStore};
