//! 对话错误类型
//!
//! 前置条件错误（EmptyInput / MissingCredential / InvalidCredentialFormat / Busy）在本地检测，不产生网络调用；
//! 其余由分类器根据后端失败描述事后归类。

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::llm::CredentialError;
use crate::prompt::TemplateError;

/// 调用方可据此分支的稳定错误种类
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    EmptyInput,
    MissingCredential,
    InvalidCredentialFormat,
    InvalidCredential,
    RateLimited,
    NetworkError,
    Timeout,
    UpstreamModelError,
    Unknown,
    /// 同一会话已有请求在途
    Busy,
    /// 模板缺少变量
    InvalidTemplate,
}

impl ErrorKind {
    /// 是否值得重试；凭据与输入问题需要用户修正配置而不是重试
    pub fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::NetworkError | Self::Timeout | Self::UpstreamModelError | Self::Unknown
        )
    }

    /// 展示给用户的提示
    pub fn guidance(self) -> &'static str {
        match self {
            Self::EmptyInput => "请输入内容后再发送。",
            Self::MissingCredential => "未配置 API Key，请在设置中填写或设置环境变量。",
            Self::InvalidCredentialFormat => "API Key 格式不正确，请检查前缀与长度。",
            Self::InvalidCredential => "API Key 无效或未授权，请更换后再试。",
            Self::RateLimited => "请求过于频繁，请稍后重试。",
            Self::NetworkError => "网络连接失败，请检查网络后重试。",
            Self::Timeout => "请求超时，请重试。",
            Self::UpstreamModelError => "模型服务暂时不可用，请稍后重试。",
            Self::Unknown => "发生未知错误，请重试。",
            Self::Busy => "上一条消息仍在处理中，请稍候。",
            Self::InvalidTemplate => "提示模板缺少必填字段，请补全后再试。",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// submit / query 返回的错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChatError {
    #[error("Input is empty")]
    EmptyInput,

    #[error("API key is missing")]
    MissingCredential,

    #[error("API key format is invalid: {0}")]
    InvalidCredentialFormat(String),

    #[error("A request is already in flight for this conversation")]
    Busy,

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("{kind}: {message}")]
    Upstream {
        kind: ErrorKind,
        retryable: bool,
        message: String,
    },
}

impl ChatError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyInput => ErrorKind::EmptyInput,
            Self::Template(_) => ErrorKind::InvalidTemplate,
            Self::MissingCredential => ErrorKind::MissingCredential,
            Self::InvalidCredentialFormat(_) => ErrorKind::InvalidCredentialFormat,
            Self::Busy => ErrorKind::Busy,
            Self::Upstream { kind, .. } => *kind,
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Upstream { retryable, .. } => *retryable,
            _ => false,
        }
    }
}

impl From<CredentialError> for ChatError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::Missing => Self::MissingCredential,
            CredentialError::InvalidFormat(reason) => Self::InvalidCredentialFormat(reason),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precondition_errors_not_retryable() {
        for err in [
            ChatError::EmptyInput,
            ChatError::MissingCredential,
            ChatError::InvalidCredentialFormat("short".to_string()),
            ChatError::Busy,
        ] {
            assert!(!err.is_retryable(), "{err} should not be retryable");
            assert!(!err.kind().is_retryable());
        }
    }

    #[test]
    fn test_credential_error_conversion() {
        assert_eq!(ChatError::from(CredentialError::Missing), ChatError::MissingCredential);
        assert_eq!(
            ChatError::from(CredentialError::InvalidFormat("x".to_string())).kind(),
            ErrorKind::InvalidCredentialFormat
        );
    }

    #[test]
    fn test_upstream_display_includes_kind() {
        let err = ChatError::Upstream {
            kind: ErrorKind::RateLimited,
            retryable: true,
            message: "429".to_string(),
        };
        assert_eq!(err.to_string(), "RateLimited: 429");
        assert!(!err.kind().guidance().is_empty());
    }
}
