//! 提示层：模板插值

pub mod template;

pub use template::{PromptTemplate, TemplateError};
