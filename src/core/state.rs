//! 会话状态：请求阶段与 UI 投影
//!
//! 每个会话同一时刻至多一个在途请求：Idle -> AwaitingReply -> Idle。
//! UI 只持有轻量的 ConversationSnapshot（阶段 + 历史）。

use serde::Serialize;

use crate::memory::Turn;

/// 请求阶段（单飞状态机）
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub enum RequestPhase {
    #[default]
    Idle,
    AwaitingReply,
}

impl RequestPhase {
    pub fn is_busy(self) -> bool {
        self == Self::AwaitingReply
    }
}

/// UI 看到的「投影」状态，轻量且易于渲染
#[derive(Clone, Debug, Serialize)]
pub struct ConversationSnapshot {
    pub phase: RequestPhase,
    pub history: Vec<Turn>,
    /// 为 true 时 UI 应禁用发送按钮
    pub input_locked: bool,
}

impl ConversationSnapshot {
    pub fn project(phase: RequestPhase, history: Vec<Turn>) -> Self {
        Self {
            phase,
            history,
            input_locked: phase.is_busy(),
        }
    }
}
