//! 短期记忆：对话轮次存储（Turn Store）
//!
//! 保留最近 N 个交换（user + assistant 为一个交换），超出时从最旧端整对剪枝，
//! 为下一次请求提供历史窗口，并供 UI 渲染与「清空对话」使用。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 默认保留的交换数（20 条消息）
pub const DEFAULT_RETENTION_EXCHANGES: usize = 10;

/// 消息角色（与 LLM API 一致）
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

/// 发往 LLM 的单条消息
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// 已提交的一条对话轮次，创建后不可变
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    role: Role,
    content: String,
    /// 由 TurnStore 分配的单调序号，仅用于排序与展示
    sequence: u64,
    created_at: DateTime<Utc>,
}

impl Turn {
    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn to_message(&self) -> Message {
        Message {
            role: self.role,
            content: self.content.clone(),
        }
    }
}

/// 对话轮次存储：最近 retention_bound 个交换，实际最多保留 retention_bound*2 条 Turn
#[derive(Clone, Debug)]
pub struct TurnStore {
    turns: Vec<Turn>,
    retention_bound: usize,
    next_sequence: u64,
}

impl TurnStore {
    /// retention_bound 为 0 时按 1 处理
    pub fn new(retention_bound: usize) -> Self {
        Self {
            turns: Vec::new(),
            retention_bound: retention_bound.max(1),
            next_sequence: 0,
        }
    }

    /// 追加一个交换（先 user 后 assistant），然后从最旧端剪枝
    pub fn append_exchange(&mut self, user_text: impl Into<String>, assistant_text: impl Into<String>) {
        let user = self.stamp(Role::User, user_text.into());
        let assistant = self.stamp(Role::Assistant, assistant_text.into());
        self.turns.push(user);
        self.turns.push(assistant);
        self.prune();
    }

    /// 最近 min(max_exchanges, retention_bound) 个交换，按时间从旧到新
    pub fn history_for_request(&self, max_exchanges: usize) -> &[Turn] {
        let keep = max_exchanges.min(self.retention_bound) * 2;
        let start = self.turns.len().saturating_sub(keep);
        &self.turns[start..]
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn exchange_count(&self) -> usize {
        self.turns.len() / 2
    }

    pub fn retention_bound(&self) -> usize {
        self.retention_bound
    }

    fn stamp(&mut self, role: Role, content: String) -> Turn {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        Turn {
            role,
            content,
            sequence,
            created_at: Utc::now(),
        }
    }

    /// 超出 retention_bound*2 时丢弃最旧的消息；长度恒为偶数，因此不会拆散交换
    fn prune(&mut self) {
        let keep = self.retention_bound * 2;
        if self.turns.len() > keep {
            let excess = self.turns.len() - keep;
            self.turns.drain(..excess);
            tracing::debug!(evicted = excess, "Pruned oldest turns");
        }
    }
}

impl Default for TurnStore {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION_EXCHANGES)
    }
}
