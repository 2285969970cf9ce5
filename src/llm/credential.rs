//! API 凭据：格式校验与来源
//!
//! 格式校验只是客户端侧的基本检查（非空、前缀、最小长度），不是安全边界。
//! 凭据来源通过 CredentialSource 注入，核心逻辑从不直接读取环境变量；
//! 「环境配置 vs 用户输入缓存」的优先级由调用方用 LayeredCredentialSource 组合决定。

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

use crate::memory::KeyValueStore;

pub const DEFAULT_KEY_PREFIX: &str = "sk-";
pub const DEFAULT_MIN_KEY_LENGTH: usize = 20;
/// 用户输入的 API Key 在键值存储中的默认键
pub const DEFAULT_STORED_KEY: &str = "openai_api_key";

/// 已通过格式校验的不透明 Bearer Token；Debug 输出会脱敏
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let visible: String = self.0.chars().take(3).collect();
        write!(f, "Credential({visible}***)")
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("API key is missing")]
    Missing,

    #[error("API key format is invalid: {0}")]
    InvalidFormat(String),
}

/// 格式规则：前缀 + 最小长度
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CredentialRules {
    pub prefix: String,
    pub min_length: usize,
}

impl Default for CredentialRules {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_KEY_PREFIX.to_string(),
            min_length: DEFAULT_MIN_KEY_LENGTH,
        }
    }
}

impl CredentialRules {
    pub fn new(prefix: impl Into<String>, min_length: usize) -> Self {
        Self {
            prefix: prefix.into(),
            min_length,
        }
    }

    /// None 或空白视为缺失；其余按前缀与长度校验（比较前去掉首尾空白）
    pub fn validate(&self, raw: Option<&str>) -> Result<Credential, CredentialError> {
        let key = raw.map(str::trim).filter(|k| !k.is_empty()).ok_or(CredentialError::Missing)?;

        if !key.starts_with(&self.prefix) {
            return Err(CredentialError::InvalidFormat(format!(
                "expected prefix '{}'",
                self.prefix
            )));
        }
        let len = key.chars().count();
        if len < self.min_length {
            return Err(CredentialError::InvalidFormat(format!(
                "expected at least {} characters, got {len}",
                self.min_length
            )));
        }
        Ok(Credential(key.to_string()))
    }
}

/// 凭据来源：返回原始字符串或「不存在」
pub trait CredentialSource: Send + Sync {
    fn lookup(&self) -> Option<String>;
}

/// 从指定环境变量读取
#[derive(Clone, Debug)]
pub struct EnvCredentialSource {
    var: String,
}

impl EnvCredentialSource {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl CredentialSource for EnvCredentialSource {
    fn lookup(&self) -> Option<String> {
        std::env::var(&self.var).ok().filter(|v| !v.trim().is_empty())
    }
}

/// 固定值（测试或命令行传入）
#[derive(Clone, Debug, Default)]
pub struct StaticCredentialSource(Option<String>);

impl StaticCredentialSource {
    pub fn new(key: impl Into<String>) -> Self {
        Self(Some(key.into()))
    }

    pub fn absent() -> Self {
        Self(None)
    }
}

impl CredentialSource for StaticCredentialSource {
    fn lookup(&self) -> Option<String> {
        self.0.clone()
    }
}

/// 用户输入后缓存在键值存储中的 Key
#[derive(Clone)]
pub struct StoredCredentialSource {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl StoredCredentialSource {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self::with_key(store, DEFAULT_STORED_KEY)
    }

    pub fn with_key(store: Arc<dyn KeyValueStore>, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub fn remember(&self, raw: &str) -> anyhow::Result<()> {
        self.store.set(&self.key, raw.trim())
    }

    pub fn forget(&self) -> anyhow::Result<()> {
        self.store.remove(&self.key)
    }
}

impl CredentialSource for StoredCredentialSource {
    fn lookup(&self) -> Option<String> {
        match self.store.get(&self.key) {
            Ok(value) => value.filter(|v| !v.trim().is_empty()),
            Err(e) => {
                tracing::warn!("Stored credential lookup failed: {}", e);
                None
            }
        }
    }
}

/// 按顺序尝试多个来源，第一个存在的胜出
#[derive(Default)]
pub struct LayeredCredentialSource {
    layers: Vec<Box<dyn CredentialSource>>,
}

impl LayeredCredentialSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, source: impl CredentialSource + 'static) -> Self {
        self.layers.push(Box::new(source));
        self
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

impl CredentialSource for LayeredCredentialSource {
    fn lookup(&self) -> Option<String> {
        self.layers.iter().find_map(|layer| layer.lookup())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;

    #[test]
    fn test_validate_accepts_well_formed_key() {
        let rules = CredentialRules::default();
        let cred = rules.validate(Some("  sk-validkeylongenough1234 ")).unwrap();
        assert_eq!(cred.expose(), "sk-validkeylongenough1234");
    }

    #[test]
    fn test_validate_missing() {
        let rules = CredentialRules::default();
        assert_eq!(rules.validate(None), Err(CredentialError::Missing));
        assert_eq!(rules.validate(Some("")), Err(CredentialError::Missing));
        assert_eq!(rules.validate(Some("   ")), Err(CredentialError::Missing));
    }

    #[test]
    fn test_validate_bad_prefix_and_short_key() {
        let rules = CredentialRules::default();
        assert!(matches!(
            rules.validate(Some("pk-validkeylongenough1234")),
            Err(CredentialError::InvalidFormat(_))
        ));
        assert!(matches!(
            rules.validate(Some("sk-short")),
            Err(CredentialError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_custom_rules() {
        let rules = CredentialRules::new("key_", 6);
        assert!(rules.validate(Some("key_ab")).is_ok());
        assert!(rules.validate(Some("key_a")).is_err());
    }

    #[test]
    fn test_debug_is_redacted() {
        let cred = CredentialRules::default()
            .validate(Some("sk-validkeylongenough1234"))
            .unwrap();
        let printed = format!("{cred:?}");
        assert!(!printed.contains("validkey"));
        assert!(printed.starts_with("Credential(sk-"));
    }

    #[test]
    fn test_layered_source_precedence() {
        let store = Arc::new(MemoryStore::new());
        let stored = StoredCredentialSource::new(store.clone());

        let layered = LayeredCredentialSource::new()
            .with(StaticCredentialSource::absent())
            .with(stored.clone())
            .with(StaticCredentialSource::new("sk-fallback"));
        assert_eq!(layered.len(), 3);
        assert_eq!(layered.lookup().as_deref(), Some("sk-fallback"));

        stored.remember(" sk-user-entered ").unwrap();
        assert_eq!(layered.lookup().as_deref(), Some("sk-user-entered"));

        stored.forget().unwrap();
        assert_eq!(layered.lookup().as_deref(), Some("sk-fallback"));
    }

    #[test]
    fn test_env_source_missing_var() {
        let source = EnvCredentialSource::new("PARLEY_TEST_SURELY_UNSET_VAR");
        assert_eq!(source.lookup(), None);
    }
}
