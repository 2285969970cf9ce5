//! 失败分类
//!
//! 后端错误没有结构化错误码，只能对描述文本做大小写不敏感的子串匹配；
//! 规则按顺序匹配，首个命中即返回。若后端日后提供结构化错误码，只需替换本模块。

use crate::core::ErrorKind;
use crate::llm::LlmError;

/// 分类结果：稳定的错误种类 + 是否建议重试
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Classification {
    pub kind: ErrorKind,
    pub retryable: bool,
}

impl Classification {
    fn of(kind: ErrorKind) -> Self {
        Self {
            kind,
            retryable: kind.is_retryable(),
        }
    }
}

const KEY_WORDS: &[&str] = &["key", "credential"];
const ABSENCE_WORDS: &[&str] = &[
    "missing",
    "not found",
    "not provided",
    "not set",
    "not configured",
    "didn't provide",
    "did not provide",
    "required",
    "empty",
    "no key",
    "no api key",
    "no credential",
];
const INVALID_WORDS: &[&str] = &["invalid", "incorrect", "unauthorized", "401"];
const RATE_LIMIT_WORDS: &[&str] = &["rate limit", "rate_limit", "ratelimit", "429", "too many requests"];
const NETWORK_WORDS: &[&str] = &["network", "fetch", "connection", "error sending request", "dns"];
const TIMEOUT_WORDS: &[&str] = &["timeout", "timed out"];
const MODEL_WORDS: &[&str] = &["model"];

fn mentions(text: &str, words: &[&str]) -> bool {
    words.iter().any(|w| text.contains(w))
}

/// 按描述文本分类；纯函数
pub fn classify(description: &str) -> Classification {
    let text = description.to_lowercase();

    let kind = if mentions(&text, KEY_WORDS) && mentions(&text, ABSENCE_WORDS) {
        ErrorKind::MissingCredential
    } else if mentions(&text, INVALID_WORDS) {
        ErrorKind::InvalidCredential
    } else if mentions(&text, RATE_LIMIT_WORDS) {
        ErrorKind::RateLimited
    } else if mentions(&text, NETWORK_WORDS) {
        ErrorKind::NetworkError
    } else if mentions(&text, TIMEOUT_WORDS) {
        ErrorKind::Timeout
    } else if mentions(&text, MODEL_WORDS) {
        ErrorKind::UpstreamModelError
    } else {
        ErrorKind::Unknown
    };

    Classification::of(kind)
}

pub fn classify_llm_error(err: &LlmError) -> Classification {
    classify(&err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kind_of(description: &str) -> (ErrorKind, bool) {
        let c = classify(description);
        (c.kind, c.retryable)
    }

    #[test]
    fn test_classification_table() {
        assert_eq!(
            kind_of("The OPENAI_API_KEY environment variable is missing or empty"),
            (ErrorKind::MissingCredential, false)
        );
        for missing in [
            "API key not configured",
            "Missing key",
            "No credentials provided",
            "You didn't provide an API key.",
            "key is missing",
        ] {
            assert_eq!(kind_of(missing), (ErrorKind::MissingCredential, false), "{missing}");
        }
        assert_eq!(
            kind_of("Incorrect API key provided: sk-abc"),
            (ErrorKind::InvalidCredential, false)
        );
        assert_eq!(kind_of("401 Unauthorized"), (ErrorKind::InvalidCredential, false));
        assert_eq!(kind_of("HTTP 429 Too Many Requests"), (ErrorKind::RateLimited, true));
        assert_eq!(kind_of("Rate limit reached for requests"), (ErrorKind::RateLimited, true));
        assert_eq!(kind_of("Failed to fetch"), (ErrorKind::NetworkError, true));
        assert_eq!(
            kind_of("http error: error sending request for url"),
            (ErrorKind::NetworkError, true)
        );
        assert_eq!(kind_of("Request timed out"), (ErrorKind::Timeout, true));
        assert_eq!(kind_of("The model is overloaded"), (ErrorKind::UpstreamModelError, true));
        assert_eq!(kind_of("something odd happened"), (ErrorKind::Unknown, true));
    }

    #[test]
    fn test_first_match_wins() {
        // 同时提到 invalid 与 model：凭据规则在前
        assert_eq!(kind_of("invalid model id"), (ErrorKind::InvalidCredential, false));
        // 同时提到 429 与 timeout：限流规则在前
        assert_eq!(kind_of("429 after timeout"), (ErrorKind::RateLimited, true));
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(kind_of("TIMEOUT"), (ErrorKind::Timeout, true));
        assert_eq!(kind_of("UnAuthorized"), (ErrorKind::InvalidCredential, false));
    }

    #[test]
    fn test_classification_is_deterministic() {
        let description = "upstream model error 503";
        assert_eq!(classify(description), classify(description));
    }

    #[test]
    fn test_llm_error_display_is_classified() {
        assert_eq!(classify_llm_error(&LlmError::EmptyResponse).kind, ErrorKind::UpstreamModelError);
        assert_eq!(
            classify_llm_error(&LlmError::ApiError("429".to_string())).kind,
            ErrorKind::RateLimited
        );
    }
}
