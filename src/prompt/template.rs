//! 提示模板：`{name}` 占位符插值
//!
//! 占位符名为标识符（字母或下划线开头）；`{{` 与 `}}` 输出字面量花括号。
//! 渲染时缺少任一变量即报错，不会把未替换的占位符发给模型。

use std::collections::{BTreeSet, HashMap};
use std::sync::OnceLock;

use regex::{Captures, Regex};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Missing template variables: {}", .0.join(", "))]
    MissingVariables(Vec<String>),
}

fn placeholder_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{\{|\}\}|\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern is valid")
    })
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PromptTemplate {
    source: String,
}

impl PromptTemplate {
    pub fn new(source: impl Into<String>) -> Self {
        Self { source: source.into() }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// 模板引用的变量名（去重、按字母序）
    pub fn variables(&self) -> Vec<String> {
        let names: BTreeSet<String> = placeholder_re()
            .captures_iter(&self.source)
            .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
            .collect();
        names.into_iter().collect()
    }

    pub fn render(&self, vars: &HashMap<String, String>) -> Result<String, TemplateError> {
        let missing: Vec<String> = self
            .variables()
            .into_iter()
            .filter(|name| !vars.contains_key(name))
            .collect();
        if !missing.is_empty() {
            return Err(TemplateError::MissingVariables(missing));
        }

        let rendered = placeholder_re().replace_all(&self.source, |caps: &Captures| {
            match caps.get(1) {
                Some(name) => vars.get(name.as_str()).cloned().unwrap_or_default(),
                None if &caps[0] == "{{" => "{".to_string(),
                None => "}".to_string(),
            }
        });
        Ok(rendered.into_owned())
    }
}

impl From<&str> for PromptTemplate {
    fn from(source: &str) -> Self {
        Self::new(source)
    }
}
