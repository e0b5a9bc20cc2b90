//! Analyzer configuration.
//!
//! The config is an optional repository-owned JSON file. Everything in it can
//! also come from flags or the environment; see [`resolve_backend`] for the
//! precedence of LM settings.
use crate::lm::{AnthropicConfig, LmBackend, DEFAULT_MAX_TOKENS, DEFAULT_MODEL};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path};

pub const CONFIG_SCHEMA_VERSION: u32 = 1;
pub const CONFIG_FILE_NAME: &str = ".context-debt.json";
pub const LM_COMMAND_ENV: &str = "CDEBT_LM_COMMAND";
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AnalyzerConfig {
    pub schema_version: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lm_command: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lm_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Repository-relative intent files, tried in order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub intent_files: Vec<String>,
}

impl AnalyzerConfig {
    pub fn empty() -> Self {
        Self {
            schema_version: CONFIG_SCHEMA_VERSION,
            ..Self::default()
        }
    }
}

pub fn load_config(path: &Path) -> Result<AnalyzerConfig> {
    let bytes = fs::read(path).with_context(|| format!("read config {}", path.display()))?;
    let config: AnalyzerConfig =
        serde_json::from_slice(&bytes).context("parse analyzer config JSON")?;
    validate_config(&config).with_context(|| format!("invalid config {}", path.display()))?;
    Ok(config)
}

/// Load `<repo>/.context-debt.json` when present, otherwise an empty config.
pub fn load_config_optional(repo_root: &Path) -> Result<AnalyzerConfig> {
    let path = repo_root.join(CONFIG_FILE_NAME);
    if !path.is_file() {
        return Ok(AnalyzerConfig::empty());
    }
    tracing::debug!(path = %path.display(), "loading analyzer config");
    load_config(&path)
}

pub fn validate_config(config: &AnalyzerConfig) -> Result<()> {
    if config.schema_version != CONFIG_SCHEMA_VERSION {
        return Err(anyhow!(
            "unsupported config schema_version {}",
            config.schema_version
        ));
    }
    if let Some(command) = config.lm_command.as_deref() {
        if command.trim().is_empty() {
            return Err(anyhow!("lm_command must be non-empty when set"));
        }
    }
    if config.max_tokens == Some(0) {
        return Err(anyhow!("max_tokens must be positive"));
    }
    for rel in &config.intent_files {
        let relative = !rel.is_empty()
            && Path::new(rel)
                .components()
                .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));
        if !relative {
            return Err(anyhow!(
                "intent_files entries must be repository-relative (got {rel:?})"
            ));
        }
    }
    Ok(())
}

/// LM-related environment, captured once so resolution stays testable.
#[derive(Debug, Clone, Default)]
pub struct LmEnv {
    pub command: Option<String>,
    pub api_key: Option<String>,
}

impl LmEnv {
    pub fn from_env() -> Self {
        let read = |key: &str| {
            std::env::var(key)
                .ok()
                .filter(|value| !value.trim().is_empty())
        };
        Self {
            command: read(LM_COMMAND_ENV),
            api_key: read(API_KEY_ENV),
        }
    }
}

/// Pick the LM backend: `--lm` flag, then config, then `CDEBT_LM_COMMAND`,
/// then the hosted API when a key is available.
pub fn resolve_backend(
    flag: Option<&str>,
    config: &AnalyzerConfig,
    env: &LmEnv,
) -> Result<LmBackend> {
    let command = flag
        .map(str::to_string)
        .or_else(|| config.lm_command.clone())
        .or_else(|| env.command.clone());
    if let Some(command) = command {
        return Ok(LmBackend::Command(command));
    }
    if let Some(api_key) = env.api_key.clone() {
        return Ok(LmBackend::Anthropic(AnthropicConfig {
            api_key,
            model: config
                .lm_model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens: config.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        }));
    }
    Err(anyhow!(
        "no LM configured; pass --lm, set lm_command in {CONFIG_FILE_NAME}, or set {LM_COMMAND_ENV} or {API_KEY_ENV}"
    ))
}
