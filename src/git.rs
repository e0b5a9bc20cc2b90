//! Remote repository acquisition through the system `git`.
use anyhow::{anyhow, Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

const CACHE_SUBDIR: &str = "context-debt/repos";

/// Per-user cache for cloned repositories.
pub fn default_cache_root() -> Result<PathBuf> {
    dirs::cache_dir()
        .map(|dir| dir.join(CACHE_SUBDIR))
        .ok_or_else(|| anyhow!("no user cache directory; pass --cache"))
}

/// Directory name for a clone: last URL segment without a `.git` suffix.
pub fn repo_name_from_url(url: &str) -> Result<String> {
    let trimmed = url.trim().trim_end_matches('/');
    let last = trimmed
        .rsplit(['/', ':'])
        .next()
        .unwrap_or_default();
    let name = last.strip_suffix(".git").unwrap_or(last);
    if name.is_empty() || name == "." || name == ".." {
        return Err(anyhow!("cannot derive a repository name from {url:?}"));
    }
    Ok(name.to_string())
}

/// Clone `url` under `cache_root`, or pull if a clone already exists.
pub fn clone_or_update(url: &str, cache_root: &Path) -> Result<PathBuf> {
    let git = which::which("git").context("locate git")?;
    let name = repo_name_from_url(url)?;
    let target = cache_root.join(&name);
    fs::create_dir_all(cache_root)
        .with_context(|| format!("create cache dir {}", cache_root.display()))?;

    let mut command = Command::new(git);
    if target.join(".git").is_dir() {
        tracing::info!(repo = %name, path = %target.display(), "updating cached clone");
        command.arg("-C").arg(&target).args(["pull", "--ff-only"]);
    } else {
        tracing::info!(repo = %name, url, "cloning repository");
        command.args(["clone", "--depth", "1", url]).arg(&target);
    }
    let output = command
        .output()
        .with_context(|| format!("run git for {url}"))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!(
            "git failed with status {}: {}",
            output.status,
            stderr.trim()
        ));
    }
    Ok(target)
}
