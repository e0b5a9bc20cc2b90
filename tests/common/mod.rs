//! Shared test infrastructure for integration tests.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

pub const CI_WORKFLOW: &str = "on: push\njobs:\n  build:\n    runs-on: ubuntu-latest\n    steps:\n      - uses: actions/checkout@v4\n";

#[allow(dead_code)]
pub const MISSING_RUNNER_WORKFLOW: &str =
    "on: push\njobs:\n  build:\n    steps:\n      - run: make\n";

/// Throwaway repository checkout with a `.github/workflows` directory.
pub struct FixtureRepo {
    dir: TempDir,
}

impl Default for FixtureRepo {
    fn default() -> Self {
        Self::new()
    }
}

impl FixtureRepo {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("create temp dir");
        fs::create_dir_all(dir.path().join(".github/workflows")).expect("create workflows dir");
        Self { dir }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn workflow(self, file_name: &str, text: &str) -> Self {
        fs::write(self.path().join(".github/workflows").join(file_name), text)
            .expect("write workflow");
        self
    }

    pub fn file(self, rel: &str, text: &str) -> Self {
        let path = self.path().join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("create parent dir");
        }
        fs::write(path, text).expect("write file");
        self
    }
}

fn bin() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_cdebt"))
}

/// Run `cdebt <args> --repo <fixture>` with a clean LM environment.
pub fn run_cdebt(repo: &FixtureRepo, args: &[&str]) -> Output {
    Command::new(bin())
        .args(args)
        .arg("--repo")
        .arg(repo.path())
        .env_remove("CDEBT_LM_COMMAND")
        .env_remove("ANTHROPIC_API_KEY")
        .env_remove("RUST_LOG")
        .output()
        .expect("run cdebt")
}

pub fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}
