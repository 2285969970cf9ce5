//! 运行时装配
//!
//! 根据配置创建 LLM 后端、对话编排器、键值存储、凭据来源与保存的产物，
//! 供终端前端或其它宿主（HTTP、桌面 UI）共用同一套组件。

use std::sync::Arc;

use crate::config::AppConfig;
use crate::core::{ChatOrchestrator, RetryPolicy};
use crate::llm::{
    EnvCredentialSource, LayeredCredentialSource, LlmClient, MockLlmClient, OpenAiClient,
    StoredCredentialSource,
};
use crate::memory::{JsonFileStore, KeyValueStore, MemoryStore, SavedArtifacts};

/// 根据配置选择 LLM 后端（OpenAI 兼容 / Mock）
pub fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    match cfg.llm.provider.to_lowercase().as_str() {
        "mock" => {
            tracing::info!("Using Mock LLM");
            Arc::new(MockLlmClient)
        }
        "openai" => {
            tracing::info!("Using OpenAI-compatible LLM ({})", cfg.llm.model);
            Arc::new(OpenAiClient::new(cfg.llm.base_url.as_deref()))
        }
        other => {
            tracing::warn!("Unknown provider '{}', falling back to OpenAI-compatible LLM", other);
            Arc::new(OpenAiClient::new(cfg.llm.base_url.as_deref()))
        }
    }
}

pub fn create_orchestrator(cfg: &AppConfig, llm: Arc<dyn LlmClient>) -> ChatOrchestrator {
    let orchestrator = ChatOrchestrator::new(llm)
        .with_retention(cfg.app.retention_exchanges)
        .with_options(cfg.llm.generation_options())
        .with_credential_rules(cfg.credential.rules());
    match &cfg.app.system_prompt {
        Some(prompt) => orchestrator.with_system_prompt(prompt.clone()),
        None => orchestrator,
    }
}

/// 配置了 storage.path 时使用 JSON 文件，否则使用内存存储
pub fn open_store(cfg: &AppConfig) -> anyhow::Result<Arc<dyn KeyValueStore>> {
    match &cfg.storage.path {
        Some(path) => {
            tracing::info!("Using file store at {}", path.display());
            Ok(Arc::new(JsonFileStore::open(path)?))
        }
        None => Ok(Arc::new(MemoryStore::new())),
    }
}

/// 装配好的组件
pub struct Runtime {
    pub orchestrator: ChatOrchestrator,
    /// 环境变量优先，其次是用户输入并缓存的 Key
    pub credentials: LayeredCredentialSource,
    pub stored_credential: StoredCredentialSource,
    pub artifacts: SavedArtifacts,
    pub retry: RetryPolicy,
}

pub fn build_runtime(cfg: &AppConfig) -> anyhow::Result<Runtime> {
    let store = open_store(cfg)?;
    let stored_credential = StoredCredentialSource::new(store.clone());
    let credentials = LayeredCredentialSource::new()
        .with(EnvCredentialSource::new(cfg.llm.api_key_env.clone()))
        .with(stored_credential.clone());

    Ok(Runtime {
        orchestrator: create_orchestrator(cfg, create_llm_from_config(cfg)),
        credentials,
        stored_credential,
        artifacts: SavedArtifacts::new(store),
        retry: cfg.retry.policy(),
    })
}
