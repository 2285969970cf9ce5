//! 对话编排器：「发送消息并获得回复」的唯一入口
//!
//! submit 的流程：
//! 1. 前置校验（空输入 -> 凭据缺失/格式 -> 会话忙），任何一项失败都不会发起网络调用
//! 2. 取 TurnStore 的历史窗口，拼成 [system?, ...history, user]
//! 3. 调用一次 LlmClient
//! 4. 成功：整对追加到 TurnStore 并返回回复；失败：分类后返回，TurnStore 不变
//!
//! 同一会话同一时刻至多一个在途 submit；阶段通过 watch 通道发布，UI 可据此显示加载状态。

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{watch, RwLock};

use crate::core::classify::classify_llm_error;
use crate::core::{ChatError, ConversationSnapshot, RequestPhase};
use crate::llm::{Credential, CredentialRules, CredentialSource, GenerationOptions, LlmClient, LlmError};
use crate::memory::{Message, Turn, TurnStore, DEFAULT_RETENTION_EXCHANGES};
use crate::prompt::PromptTemplate;

/// 在途标记：离开作用域（包括 submit 的 future 被丢弃）时阶段回到 Idle
struct InFlight<'a> {
    phase: &'a watch::Sender<RequestPhase>,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.phase.send_replace(RequestPhase::Idle);
    }
}

/// 单个会话的编排器，独占其 TurnStore
pub struct ChatOrchestrator {
    llm: Arc<dyn LlmClient>,
    options: GenerationOptions,
    rules: CredentialRules,
    system_prompt: Option<String>,
    store: RwLock<TurnStore>,
    phase: watch::Sender<RequestPhase>,
}

impl ChatOrchestrator {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        let (phase, _) = watch::channel(RequestPhase::Idle);
        Self {
            llm,
            options: GenerationOptions::default(),
            rules: CredentialRules::default(),
            system_prompt: None,
            store: RwLock::new(TurnStore::new(DEFAULT_RETENTION_EXCHANGES)),
            phase,
        }
    }

    /// 设置保留的交换数（会替换为一个新的空 TurnStore）
    pub fn with_retention(mut self, retention_exchanges: usize) -> Self {
        self.store = RwLock::new(TurnStore::new(retention_exchanges));
        self
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_credential_rules(mut self, rules: CredentialRules) -> Self {
        self.rules = rules;
        self
    }

    /// 系统提示词：每次请求置于最前，不写入 TurnStore
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        let prompt = prompt.into();
        self.system_prompt = (!prompt.trim().is_empty()).then_some(prompt);
        self
    }

    pub fn options(&self) -> &GenerationOptions {
        &self.options
    }

    pub fn token_usage(&self) -> (u64, u64, u64) {
        self.llm.token_usage()
    }

    /// 发送一条消息并等待回复；成功时整对写入历史
    pub async fn submit(&self, user_text: &str, credential: Option<&str>) -> Result<String, ChatError> {
        check_input(user_text)?;
        let credential = self.rules.validate(credential)?;
        let _in_flight = self.begin_request()?;

        let mut messages = self.preamble();
        {
            let store = self.store.read().await;
            let history = store.history_for_request(store.retention_bound());
            tracing::info!(history_turns = history.len(), "Submitting chat message");
            messages.extend(history.iter().map(Turn::to_message));
        }
        messages.push(Message::user(user_text));

        let reply = self.dispatch(&messages, &credential).await?;
        self.store.write().await.append_exchange(user_text, reply.clone());
        Ok(reply)
    }

    /// 从注入的凭据来源取 Key 后 submit
    pub async fn submit_from(&self, user_text: &str, source: &dyn CredentialSource) -> Result<String, ChatError> {
        let raw = source.lookup();
        self.submit(user_text, raw.as_deref()).await
    }

    /// 无状态查询：不读也不写历史，不受单飞限制
    pub async fn query(&self, text: &str, credential: Option<&str>) -> Result<String, ChatError> {
        check_input(text)?;
        let credential = self.rules.validate(credential)?;

        let mut messages = self.preamble();
        messages.push(Message::user(text));
        tracing::info!("Submitting stateless query");
        self.dispatch(&messages, &credential).await
    }

    /// 模板查询：渲染模板后走无状态查询
    pub async fn query_template(
        &self,
        template: &PromptTemplate,
        vars: &HashMap<String, String>,
        credential: Option<&str>,
    ) -> Result<String, ChatError> {
        let prompt = template.render(vars)?;
        self.query(&prompt, credential).await
    }

    pub async fn history(&self) -> Vec<Turn> {
        self.store.read().await.turns().to_vec()
    }

    /// 清空对话；在途请求完成后其交换仍会写入
    pub async fn clear(&self) {
        self.store.write().await.clear();
        tracing::info!("Conversation cleared");
    }

    pub async fn retention_bound(&self) -> usize {
        self.store.read().await.retention_bound()
    }

    pub fn phase(&self) -> RequestPhase {
        *self.phase.borrow()
    }

    pub fn subscribe_phase(&self) -> watch::Receiver<RequestPhase> {
        self.phase.subscribe()
    }

    pub async fn snapshot(&self) -> ConversationSnapshot {
        let history = self.history().await;
        ConversationSnapshot::project(self.phase(), history)
    }

    /// Idle -> AwaitingReply 的原子切换；已在途则返回 Busy
    fn begin_request(&self) -> Result<InFlight<'_>, ChatError> {
        let acquired = self.phase.send_if_modified(|phase| {
            if *phase == RequestPhase::Idle {
                *phase = RequestPhase::AwaitingReply;
                true
            } else {
                false
            }
        });
        if !acquired {
            tracing::warn!("Rejected submit: conversation busy");
            return Err(ChatError::Busy);
        }
        Ok(InFlight { phase: &self.phase })
    }

    fn preamble(&self) -> Vec<Message> {
        self.system_prompt
            .iter()
            .map(|p| Message::system(p.clone()))
            .collect()
    }

    async fn dispatch(&self, messages: &[Message], credential: &Credential) -> Result<String, ChatError> {
        match self.llm.complete(messages, credential, &self.options).await {
            Ok(reply) if !reply.trim().is_empty() => Ok(reply),
            Ok(_) => Err(upstream_error(LlmError::EmptyResponse)),
            Err(err) => Err(upstream_error(err)),
        }
    }
}

fn check_input(text: &str) -> Result<(), ChatError> {
    if text.trim().is_empty() {
        return Err(ChatError::EmptyInput);
    }
    Ok(())
}

fn upstream_error(err: LlmError) -> ChatError {
    let classification = classify_llm_error(&err);
    tracing::warn!(
        kind = %classification.kind,
        retryable = classification.retryable,
        "Completion failed: {}",
        err
    );
    ChatError::Upstream {
        kind: classification.kind,
        retryable: classification.retryable,
        message: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ErrorKind;
    use crate::llm::{MockLlmClient, ScriptedLlmClient};

    const KEY: &str = "sk-validkeylongenough1234";

    #[tokio::test]
    async fn test_system_prompt_prepended_not_stored() {
        let client = Arc::new(ScriptedLlmClient::always("sure"));
        let orch = ChatOrchestrator::new(client.clone()).with_system_prompt("You are a chef.");

        orch.submit("Hi", Some(KEY)).await.unwrap();

        let sent = client.last_request().unwrap();
        assert_eq!(sent[0], Message::system("You are a chef."));
        assert_eq!(sent[1], Message::user("Hi"));
        assert_eq!(orch.history().await.len(), 2);
    }

    #[tokio::test]
    async fn test_blank_system_prompt_ignored() {
        let client = Arc::new(ScriptedLlmClient::always("sure"));
        let orch = ChatOrchestrator::new(client.clone()).with_system_prompt("   ");

        orch.query("Hi", Some(KEY)).await.unwrap();
        assert_eq!(client.last_request().unwrap(), vec![Message::user("Hi")]);
    }

    #[tokio::test]
    async fn test_blank_reply_is_upstream_failure() {
        let client = Arc::new(ScriptedLlmClient::new().then_reply("   "));
        let orch = ChatOrchestrator::new(client);

        let err = orch.submit("Hi", Some(KEY)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UpstreamModelError);
        assert!(orch.history().await.is_empty());
        assert_eq!(orch.phase(), RequestPhase::Idle);
    }

    #[tokio::test]
    async fn test_snapshot_reflects_history() {
        let orch = ChatOrchestrator::new(Arc::new(MockLlmClient));
        orch.submit("ping", Some(KEY)).await.unwrap();

        let snapshot = orch.snapshot().await;
        assert_eq!(snapshot.phase, RequestPhase::Idle);
        assert!(!snapshot.input_locked);
        assert_eq!(snapshot.history[1].content(), "Echo from Mock: ping");
    }
}
