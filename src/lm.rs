//! LM invocation for context-debt analysis.
//!
//! Two backends are supported:
//!
//! - **Command**: any local tool that reads the prompt on stdin and writes the
//!   answer to stdout (`llm`, `ollama run ...`, `claude --print`, a script).
//!   The command string is split with shell-words.
//! - **Anthropic**: the hosted messages API, used when no command is configured
//!   and `ANTHROPIC_API_KEY` is set.
//!
//! The core never depends on this module; it only consumes the prompt text
//! produced by [`crate::steering`].

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5";
pub const DEFAULT_MAX_TOKENS: u32 = 1000;
const ANTHROPIC_MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const HTTP_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnthropicConfig {
    pub api_key: String,
    pub model: String,
    pub max_tokens: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LmBackend {
    /// Shell-words command line; prompt on stdin, answer on stdout.
    Command(String),
    Anthropic(AnthropicConfig),
}

impl LmBackend {
    pub fn describe(&self) -> String {
        match self {
            LmBackend::Command(command) => format!("command `{command}`"),
            LmBackend::Anthropic(config) => format!("anthropic model {}", config.model),
        }
    }
}

/// Run the prompt through the backend and return the raw answer text.
pub fn invoke(backend: &LmBackend, system: &str, prompt: &str) -> Result<String> {
    let start = Instant::now();
    let response = match backend {
        LmBackend::Command(command) => invoke_command(command, system, prompt)?,
        LmBackend::Anthropic(config) => invoke_anthropic(config, system, prompt)?,
    };
    tracing::info!(
        elapsed_ms = start.elapsed().as_millis(),
        prompt_bytes = prompt.len(),
        response_bytes = response.len(),
        backend = %backend.describe(),
        "lm invoke complete"
    );
    Ok(response)
}

fn invoke_command(command: &str, system: &str, prompt: &str) -> Result<String> {
    let args =
        shell_words::split(command).with_context(|| format!("parse LM command: {command}"))?;
    if args.is_empty() {
        return Err(anyhow!("LM command is empty"));
    }
    let program = which::which(&args[0])
        .with_context(|| format!("locate LM command `{}`", args[0]))?;

    let mut child = Command::new(program)
        .args(&args[1..])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("spawn LM command: {}", args[0]))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(system.as_bytes())
            .and_then(|_| stdin.write_all(b"\n\n"))
            .and_then(|_| stdin.write_all(prompt.as_bytes()))
            .context("write prompt to LM stdin")?;
    }

    let output = child.wait_with_output().context("wait for LM command")?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!(
            "LM command failed with status {}: {}",
            output.status,
            stderr.trim()
        ));
    }
    String::from_utf8(output.stdout).context("decode LM stdout as UTF-8")
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

fn invoke_anthropic(config: &AnthropicConfig, system: &str, prompt: &str) -> Result<String> {
    let request = MessagesRequest {
        model: &config.model,
        max_tokens: config.max_tokens,
        temperature: 0.0,
        system,
        messages: vec![Message {
            role: "user",
            content: prompt,
        }],
    };
    let agent: ureq::Agent = ureq::Agent::config_builder()
        .timeout_global(Some(HTTP_TIMEOUT))
        .build()
        .into();
    let mut response = agent
        .post(ANTHROPIC_MESSAGES_URL)
        .header("x-api-key", &config.api_key)
        .header("anthropic-version", ANTHROPIC_VERSION)
        .send_json(&request)
        .context("call Anthropic messages API")?;
    let body: MessagesResponse = response
        .body_mut()
        .read_json()
        .context("parse Anthropic response JSON")?;
    Ok(collect_text(&body))
}

fn collect_text(response: &MessagesResponse) -> String {
    response
        .content
        .iter()
        .filter(|block| block.kind == "text")
        .filter_map(|block| block.text.as_deref())
        .collect::<Vec<_>>()
        .join("\n")
}
