//! Workflow and intent sources inside a checked-out repository.
//!
//! Discovery order is made explicit here (sorted by file name) because the
//! boundary text follows insertion order and directory listing order is not
//! stable across platforms.

use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Component, Path, PathBuf};

pub const WORKFLOWS_DIR: &str = ".github/workflows";

/// Intent files checked at the repository root, first match wins.
pub const DEFAULT_INTENT_FILES: &[&str] = &["AGENTS.md", "agents.md", "AGENT.md", "agent.md"];

/// Intent text used when no intent file exists.
pub const MISSING_INTENT: &str = "Error: No agents.md file found in repository root.";

/// One parsed workflow file, ready for validation.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub file_name: String,
    pub document: serde_yaml::Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Found { path: PathBuf, text: String },
    Missing,
}

impl Intent {
    pub fn text(&self) -> &str {
        match self {
            Intent::Found { text, .. } => text,
            Intent::Missing => MISSING_INTENT,
        }
    }
}

pub fn workflows_dir(repo_root: &Path) -> PathBuf {
    repo_root.join(WORKFLOWS_DIR)
}

/// `*.yml` and `*.yaml` files in the workflows directory, sorted by file name.
///
/// A repository without a workflows directory yields an empty list.
pub fn discover_workflow_files(repo_root: &Path) -> Result<Vec<PathBuf>> {
    let dir = workflows_dir(repo_root);
    if !dir.is_dir() {
        tracing::debug!(dir = %dir.display(), "no workflows directory");
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(&dir).with_context(|| format!("read {}", dir.display()))? {
        let entry = entry.with_context(|| format!("read entry in {}", dir.display()))?;
        let path = entry.path();
        let is_yaml = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("yml") | Some("yaml")
        );
        if is_yaml && path.is_file() {
            files.push(path);
        }
    }
    files.sort_by_key(|path| file_name(path));
    Ok(files)
}

pub fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Parse a workflow file into an untyped YAML tree. Empty files parse to `null`.
///
/// `<<` merge keys are resolved before the tree is returned.
pub fn read_document(path: &Path) -> Result<serde_yaml::Value> {
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    parse_document(&text).with_context(|| format!("parse {}", path.display()))
}

pub fn parse_document(text: &str) -> Result<serde_yaml::Value> {
    if text.trim().is_empty() {
        return Ok(serde_yaml::Value::Null);
    }
    let mut document: serde_yaml::Value = serde_yaml::from_str(text).context("invalid YAML")?;
    document
        .apply_merge()
        .context("resolve YAML merge keys")?;
    Ok(document)
}

/// Raw text of a single workflow file, restricted to the workflows directory.
pub fn read_raw_workflow(repo_root: &Path, requested: &str) -> Result<String> {
    let requested_path = Path::new(requested);
    let plain_name = requested_path
        .components()
        .all(|component| matches!(component, Component::Normal(_)));
    if requested.is_empty() || !plain_name {
        return Err(anyhow!(
            "access denied: {requested} is outside {WORKFLOWS_DIR}"
        ));
    }
    let dir = workflows_dir(repo_root);
    let target = dir.join(requested_path);
    if !target.is_file() {
        return Err(anyhow!("workflow file '{requested}' not found"));
    }
    let resolved_dir = dir
        .canonicalize()
        .with_context(|| format!("resolve {}", dir.display()))?;
    let resolved = target
        .canonicalize()
        .with_context(|| format!("resolve {}", target.display()))?;
    if !resolved.starts_with(&resolved_dir) {
        return Err(anyhow!(
            "access denied: {requested} is outside {WORKFLOWS_DIR}"
        ));
    }
    fs::read_to_string(&resolved).with_context(|| format!("read {}", resolved.display()))
}

/// Load the first intent file present at the repository root.
pub fn load_intent(repo_root: &Path, candidates: &[String]) -> Result<Intent> {
    let defaults: Vec<String> = DEFAULT_INTENT_FILES
        .iter()
        .map(|name| name.to_string())
        .collect();
    let candidates = if candidates.is_empty() {
        &defaults[..]
    } else {
        candidates
    };
    for name in candidates {
        let path = repo_root.join(name);
        if path.is_file() {
            let text =
                fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
            tracing::debug!(path = %path.display(), bytes = text.len(), "intent loaded");
            return Ok(Intent::Found { path, text });
        }
    }
    tracing::warn!(root = %repo_root.display(), "no intent file found");
    Ok(Intent::Missing)
}
