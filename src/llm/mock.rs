//! Mock LLM 客户端（用于测试与离线演示，无需 API）
//!
//! - MockLlmClient：回显最后一条 User 消息
//! - ScriptedLlmClient：按脚本依次返回回复或失败，记录调用次数与每次收到的消息

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::{Credential, GenerationOptions, LlmClient, LlmError};
use crate::memory::{Message, Role};

/// Mock 客户端：回显用户最后一条消息
#[derive(Debug, Default)]
pub struct MockLlmClient;

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(
        &self,
        messages: &[Message],
        _credential: &Credential,
        _options: &GenerationOptions,
    ) -> Result<String, LlmError> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or("(no input)");

        Ok(format!("Echo from Mock: {last_user}"))
    }
}

/// 脚本化客户端：脚本耗尽后返回 fallback 回复
#[derive(Debug)]
pub struct ScriptedLlmClient {
    script: Mutex<VecDeque<Result<String, LlmError>>>,
    fallback: String,
    calls: AtomicUsize,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl Default for ScriptedLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedLlmClient {
    pub fn new() -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            fallback: "ok".to_string(),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// 始终返回同一回复
    pub fn always(reply: impl Into<String>) -> Self {
        Self {
            fallback: reply.into(),
            ..Self::new()
        }
    }

    pub fn then_reply(self, reply: impl Into<String>) -> Self {
        self.push(Ok(reply.into()));
        self
    }

    pub fn then_fail(self, description: impl Into<String>) -> Self {
        self.push(Err(LlmError::ApiError(description.into())));
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// 每次调用收到的完整消息序列
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn last_request(&self) -> Option<Vec<Message>> {
        self.requests().pop()
    }

    fn push(&self, item: Result<String, LlmError>) {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(item);
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(
        &self,
        messages: &[Message],
        _credential: &Credential,
        _options: &GenerationOptions,
    ) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(messages.to_vec());
        // 锁中毒时仍取出脚本项，排队的失败不会被 fallback 吞掉
        let next = self.script.lock().unwrap_or_else(|e| e.into_inner()).pop_front();
        next.unwrap_or_else(|| Ok(self.fallback.clone()))
    }
}
