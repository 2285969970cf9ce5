//! LLM 层：客户端抽象、凭据与实现（OpenAI 兼容 / Mock / Scripted）

pub mod credential;
pub mod mock;
pub mod openai;
pub mod traits;

pub use credential::{
    Credential, CredentialError, CredentialRules, CredentialSource, EnvCredentialSource,
    LayeredCredentialSource, StaticCredentialSource, StoredCredentialSource,
};
pub use mock::{MockLlmClient, ScriptedLlmClient};
pub use openai::{OpenAiClient, TokenUsage};
pub use traits::{GenerationOptions, LlmClient, LlmError};
