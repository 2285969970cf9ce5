//! 应用配置：从 config/default.toml 与环境变量加载
//!
//! 加载顺序：先读 TOML 文件，再用环境变量 `PARLEY__*` 覆盖（双下划线表示嵌套，如 `PARLEY__LLM__PROVIDER=mock`）。

use std::path::PathBuf;

use serde::Deserialize;

use crate::core::RetryPolicy;
use crate::llm::{CredentialRules, GenerationOptions};

/// 应用配置根（对应 config/default.toml 的顶层）
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub app: AppSection,
    pub llm: LlmSection,
    pub credential: CredentialSection,
    pub retry: RetrySection,
    pub storage: StorageSection,
}

/// [app] 段：应用名、对话保留交换数、系统提示词
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppSection {
    pub name: Option<String>,
    /// 对话历史保留的交换数（user + assistant 为一个交换）
    pub retention_exchanges: usize,
    pub system_prompt: Option<String>,
}

impl Default for AppSection {
    fn default() -> Self {
        Self {
            name: None,
            retention_exchanges: crate::memory::DEFAULT_RETENTION_EXCHANGES,
            system_prompt: None,
        }
    }
}

/// [llm] 段：后端选择与生成参数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LlmSection {
    /// 后端：openai / mock
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    pub temperature: f32,
    pub max_output_tokens: u32,
    /// 读取 API Key 的环境变量名
    pub api_key_env: String,
}

impl Default for LlmSection {
    fn default() -> Self {
        let options = GenerationOptions::default();
        Self {
            provider: "openai".to_string(),
            model: options.model,
            base_url: None,
            temperature: options.temperature,
            max_output_tokens: options.max_output_tokens,
            api_key_env: "OPENAI_API_KEY".to_string(),
        }
    }
}

impl LlmSection {
    pub fn generation_options(&self) -> GenerationOptions {
        GenerationOptions::default()
            .with_model(self.model.clone())
            .with_temperature(self.temperature)
            .with_max_output_tokens(self.max_output_tokens)
    }
}

/// [credential] 段：API Key 格式规则
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CredentialSection {
    pub prefix: String,
    pub min_length: usize,
}

impl Default for CredentialSection {
    fn default() -> Self {
        let rules = CredentialRules::default();
        Self {
            prefix: rules.prefix,
            min_length: rules.min_length,
        }
    }
}

impl CredentialSection {
    pub fn rules(&self) -> CredentialRules {
        CredentialRules::new(self.prefix.clone(), self.min_length)
    }
}

/// [retry] 段：指数退避参数
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetrySection {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySection {
    fn default() -> Self {
        let policy = RetryPolicy::default();
        Self {
            max_attempts: policy.max_attempts,
            base_delay_ms: policy.base_delay_ms,
            max_delay_ms: policy.max_delay_ms,
        }
    }
}

impl RetrySection {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts.max(1),
            base_delay_ms: self.base_delay_ms,
            max_delay_ms: self.max_delay_ms,
        }
    }
}

/// [storage] 段：键值存储文件（保存的产物、用户输入的 API Key）；未设置时只保存在内存
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    pub path: Option<PathBuf>,
}

/// 从 config 目录加载配置，环境变量 PARLEY__* 可覆盖
///
/// 1. 按顺序查找 config/default.toml、../config/default.toml，找到则作为第一源
/// 2. 若传入 config_path 且文件存在，则追加该文件（可覆盖前面的键）
/// 3. 最后叠加环境变量 PARLEY__*（双下划线表示嵌套键）
pub fn load_config(config_path: Option<PathBuf>) -> Result<AppConfig, config::ConfigError> {
    let mut builder = config::Config::builder();

    for name in ["config/default", "../config/default"] {
        let path = format!("{name}.toml");
        if std::path::Path::new(&path).exists() {
            builder = builder.add_source(config::File::with_name(name).required(false));
            break;
        }
    }

    if let Some(path) = config_path {
        if path.exists() {
            builder = builder.add_source(config::File::from(path).required(false));
        } else {
            tracing::warn!("Config file {} not found, skipping", path.display());
        }
    }

    builder = builder.add_source(
        config::Environment::with_prefix("PARLEY")
            .separator("__")
            .try_parsing(true),
    );

    builder.build()?.try_deserialize()
}
