//! Closed-world enumeration of the entities in a repository.
//!
//! The boundary lists every workflow file, every job id, and every action
//! reference that exists, and nothing else. Downstream consumers treat it as
//! authoritative: anything not named is considered non-existent.
//!
//! ```text
//! === STRUCTURAL BOUNDARIES (SOURCE OF TRUTH) ===
//! RESTRICTION: Only the following 1 workflows exist:
//!   - Workflow File: 'ci.yml' (ID: Unnamed)
//!     -> Allowed Jobs in 'ci.yml': ['build']
//!        -> Valid Actions in 'build': ['actions/checkout@v4']
//! ================================================
//! RULE: Any assertion referencing a workflow, job, or action NOT listed above is FALSE.
//! ```
//!
//! Order follows repository insertion order; nothing is sorted here.

use crate::repository::Repository;
use serde_json::Value;

const HEADER: &str = "=== STRUCTURAL BOUNDARIES (SOURCE OF TRUTH) ===";
const FOOTER: &str = "================================================";
const EMPTY_RESTRICTION: &str = "RESTRICTION: No workflows exist in this repository.";
const CLOSING_RULE: &str =
    "RULE: Any assertion referencing a workflow, job, or action NOT listed above is FALSE.";
const UNNAMED: &str = "Unnamed";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Boundary {
    pub workflows: Vec<WorkflowBoundary>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowBoundary {
    pub file: String,
    pub name: Option<String>,
    pub jobs: Vec<JobBoundary>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobBoundary {
    pub id: String,
    pub step_count: usize,
    /// Distinct action references in first-use order.
    pub actions: Vec<String>,
}

impl Boundary {
    pub fn from_repository(repository: &Repository) -> Self {
        let workflows = repository
            .workflows()
            .map(|(file, workflow)| WorkflowBoundary {
                file: file.to_string(),
                name: workflow.name.clone(),
                jobs: workflow
                    .jobs
                    .iter()
                    .map(|(id, job)| JobBoundary {
                        id: id.clone(),
                        step_count: job.steps.len(),
                        actions: distinct(job.action_refs()),
                    })
                    .collect(),
            })
            .collect();
        Self { workflows }
    }

    /// Best-effort read of a serialized repository projection.
    ///
    /// Missing or mistyped substructure is treated as absent, so a malformed
    /// model degrades to the empty boundary instead of failing.
    pub fn from_projection(model: &Value) -> Self {
        let Some(workflows) = model.get("workflows").and_then(Value::as_object) else {
            return Self::default();
        };
        let workflows = workflows
            .iter()
            .map(|(file, workflow)| WorkflowBoundary {
                file: file.clone(),
                name: workflow
                    .get("name")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                jobs: workflow
                    .get("jobs")
                    .and_then(Value::as_object)
                    .map(|jobs| jobs.iter().map(|(id, job)| job_from_projection(id, job)).collect())
                    .unwrap_or_default(),
            })
            .collect();
        Self { workflows }
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }

    pub fn workflow_files(&self) -> Vec<&str> {
        self.workflows.iter().map(|w| w.file.as_str()).collect()
    }

    /// `(workflow file, job id)` pairs in order.
    pub fn job_ids(&self) -> Vec<(&str, &str)> {
        self.workflows
            .iter()
            .flat_map(|w| w.jobs.iter().map(move |j| (w.file.as_str(), j.id.as_str())))
            .collect()
    }

    pub fn action_refs(&self) -> Vec<&str> {
        self.workflows
            .iter()
            .flat_map(|w| w.jobs.iter())
            .flat_map(|j| j.actions.iter().map(String::as_str))
            .collect()
    }

    pub fn render(&self) -> String {
        let mut lines = vec![HEADER.to_string()];
        if self.workflows.is_empty() {
            lines.push(EMPTY_RESTRICTION.to_string());
            return lines.join("\n");
        }

        lines.push(format!(
            "RESTRICTION: Only the following {} workflows exist:",
            self.workflows.len()
        ));
        for workflow in &self.workflows {
            lines.push(format!(
                "  - Workflow File: '{}' (ID: {})",
                workflow.file,
                workflow.name.as_deref().unwrap_or(UNNAMED)
            ));
            if workflow.jobs.is_empty() {
                lines.push(format!("    -> No jobs are declared in '{}'.", workflow.file));
                continue;
            }
            let ids: Vec<&str> = workflow.jobs.iter().map(|j| j.id.as_str()).collect();
            lines.push(format!(
                "    -> Allowed Jobs in '{}': {}",
                workflow.file,
                quoted_list(&ids)
            ));
            for job in &workflow.jobs {
                if job.step_count == 0 {
                    lines.push(format!("       -> Job '{}' declares no steps.", job.id));
                } else if !job.actions.is_empty() {
                    let actions: Vec<&str> = job.actions.iter().map(String::as_str).collect();
                    lines.push(format!(
                        "       -> Valid Actions in '{}': {}",
                        job.id,
                        quoted_list(&actions)
                    ));
                }
            }
        }
        lines.push(FOOTER.to_string());
        lines.push(CLOSING_RULE.to_string());
        lines.join("\n")
    }
}

/// Render the boundary text for a repository.
pub fn derive_boundary(repository: &Repository) -> String {
    Boundary::from_repository(repository).render()
}

fn job_from_projection(id: &str, job: &Value) -> JobBoundary {
    let steps = job
        .get("steps")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    let uses = steps
        .iter()
        .filter_map(|step| step.get("uses").and_then(Value::as_str))
        .filter(|uses| !uses.is_empty());
    JobBoundary {
        id: id.to_string(),
        step_count: steps.len(),
        actions: distinct(uses),
    }
}

fn distinct<'a>(refs: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for reference in refs {
        if !out.iter().any(|seen| seen == reference) {
            out.push(reference.to_string());
        }
    }
    out
}

fn quoted_list(items: &[&str]) -> String {
    let quoted: Vec<String> = items.iter().map(|item| quoted(item)).collect();
    format!("[{}]", quoted.join(", "))
}

/// Single-quoted like a Python `repr`: double quotes when the text holds a
/// `'` but no `"`, backslash escapes otherwise.
fn quoted(item: &str) -> String {
    let quote = if item.contains('\'') && !item.contains('"') {
        '"'
    } else {
        '\''
    };
    let mut out = String::with_capacity(item.len() + 2);
    out.push(quote);
    for ch in item.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
    out
}
