//! Append-only aggregate of validated workflows for one analysis run.

use crate::model::Workflow;
use crate::sources::{self, SourceDocument};
use crate::validate::{validate, ValidationErrors};
use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

/// Why a workflow file did not make it into the repository.
#[derive(Debug, Clone)]
pub enum FailureReason {
    /// The file could not be read or was not parseable YAML.
    Parse(String),
    Structural(ValidationErrors),
    /// A workflow with the same file name is already in the repository.
    Duplicate,
    /// The validation thread panicked.
    Lost,
}

#[derive(Debug, Clone)]
pub struct FileFailure {
    pub file_name: String,
    pub reason: FailureReason,
}

/// Per-file outcome, suitable for `validate --json`.
#[derive(Debug, Serialize)]
pub struct FileReport {
    pub file: String,
    pub status: &'static str,
    pub errors: Vec<ErrorEntry>,
}

#[derive(Debug, Serialize)]
pub struct ErrorEntry {
    pub code: &'static str,
    pub path: String,
    pub message: String,
}

/// Workflows keyed by file name, in the order they were inserted.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Repository {
    name: String,
    workflows: IndexMap<String, Workflow>,
    #[serde(skip)]
    failures: Vec<FileFailure>,
}

impl Repository {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            workflows: IndexMap::new(),
            failures: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Insert a validated workflow. Existing entries are never overwritten;
    /// returns false when `file_name` is already present.
    pub fn insert(&mut self, file_name: impl Into<String>, workflow: Workflow) -> bool {
        let file_name = file_name.into();
        if self.workflows.contains_key(&file_name) {
            tracing::warn!(file = %file_name, "duplicate workflow file ignored");
            return false;
        }
        self.workflows.insert(file_name, workflow);
        true
    }

    pub fn record_failure(&mut self, file_name: impl Into<String>, reason: FailureReason) {
        let file_name = file_name.into();
        match &reason {
            FailureReason::Parse(message) => {
                tracing::warn!(file = %file_name, error = %message, "workflow skipped");
            }
            FailureReason::Structural(errors) => {
                tracing::warn!(file = %file_name, count = errors.len(), "workflow skipped: {errors}");
            }
            FailureReason::Duplicate => {
                tracing::warn!(file = %file_name, "workflow skipped: file name already present");
            }
            FailureReason::Lost => {
                tracing::warn!(file = %file_name, "workflow skipped: validation thread panicked");
            }
        }
        self.failures.push(FileFailure { file_name, reason });
    }

    /// Validate one document and either insert it or record why it failed.
    pub fn ingest(&mut self, source: SourceDocument) -> bool {
        let outcome = validate(source.document);
        self.accept(source.file_name, outcome)
    }

    fn accept(&mut self, file_name: String, outcome: Result<Workflow, ValidationErrors>) -> bool {
        match outcome {
            Ok(workflow) => {
                if self.workflows.contains_key(&file_name) {
                    self.record_failure(file_name, FailureReason::Duplicate);
                    return false;
                }
                self.insert(file_name, workflow)
            }
            Err(errors) => {
                self.record_failure(file_name, FailureReason::Structural(errors));
                false
            }
        }
    }

    pub fn get(&self, file_name: &str) -> Option<&Workflow> {
        self.workflows.get(file_name)
    }

    pub fn workflows(&self) -> impl Iterator<Item = (&str, &Workflow)> {
        self.workflows
            .iter()
            .map(|(file_name, workflow)| (file_name.as_str(), workflow))
    }

    pub fn failures(&self) -> &[FileFailure] {
        &self.failures
    }

    pub fn len(&self) -> usize {
        self.workflows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }

    /// Projection `{name, workflows: {file: workflow}}` with external field names.
    pub fn to_serializable(&self) -> Value {
        serde_json::to_value(self).expect("repository projection is plain JSON")
    }

    /// Validation outcome for every file seen, accepted files first.
    pub fn file_reports(&self) -> Vec<FileReport> {
        let mut reports: Vec<FileReport> = self
            .workflows
            .keys()
            .map(|file| FileReport {
                file: file.clone(),
                status: "valid",
                errors: Vec::new(),
            })
            .collect();
        for failure in &self.failures {
            let errors = match &failure.reason {
                FailureReason::Parse(message) => vec![ErrorEntry {
                    code: "parse",
                    path: String::new(),
                    message: message.clone(),
                }],
                FailureReason::Duplicate => vec![ErrorEntry {
                    code: "duplicate",
                    path: String::new(),
                    message: format!("{} is already in the repository", failure.file_name),
                }],
                FailureReason::Lost => vec![ErrorEntry {
                    code: "internal",
                    path: String::new(),
                    message: "validation did not complete".to_string(),
                }],
                FailureReason::Structural(errors) => errors
                    .errors()
                    .iter()
                    .map(|error| ErrorEntry {
                        code: error.code(),
                        path: error.path().to_string(),
                        message: error.to_string(),
                    })
                    .collect(),
            };
            reports.push(FileReport {
                file: failure.file_name.clone(),
                status: "invalid",
                errors,
            });
        }
        reports
    }
}

/// Build a repository from documents, validating each on its own thread.
///
/// Inserts happen in input order regardless of which validation finishes
/// first, so the result matches sequential ingestion.
pub fn build_parallel(name: &str, sources: Vec<SourceDocument>) -> Repository {
    let file_names: Vec<String> = sources.iter().map(|s| s.file_name.clone()).collect();
    let outcomes: Vec<Option<Result<Workflow, ValidationErrors>>> = std::thread::scope(|scope| {
        let handles: Vec<_> = sources
            .into_iter()
            .map(|source| scope.spawn(move || validate(source.document)))
            .collect();
        handles.into_iter().map(|handle| handle.join().ok()).collect()
    });

    let mut repository = Repository::new(name);
    for (file_name, outcome) in file_names.into_iter().zip(outcomes) {
        match outcome {
            Some(outcome) => {
                repository.accept(file_name, outcome);
            }
            None => repository.record_failure(file_name, FailureReason::Lost),
        }
    }
    repository
}

/// Discover, parse and validate every workflow file under `repo_root`.
pub fn load_repository(repo_root: &Path) -> Result<Repository> {
    let name = repo_root
        .canonicalize()
        .with_context(|| format!("resolve repository root {}", repo_root.display()))?
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut repository = Repository::new(name);
    let files = sources::discover_workflow_files(repo_root)?;
    tracing::debug!(count = files.len(), "workflow files discovered");
    for path in files {
        let file_name = sources::file_name(&path);
        match sources::read_document(&path) {
            Ok(document) => {
                repository.ingest(SourceDocument {
                    file_name,
                    document,
                });
            }
            Err(err) => repository.record_failure(file_name, FailureReason::Parse(format!("{err:#}"))),
        }
    }
    tracing::info!(
        workflows = repository.len(),
        skipped = repository.failures().len(),
        "repository model built"
    );
    Ok(repository)
}
