//! Typed domain model for CI workflow definitions.
//!
//! A [`Workflow`] is only ever built by the validator, so every value of these
//! types is structurally sound: required fields are present, union-typed fields
//! hold exactly one of their legal shapes, and jobs keep declaration order.
//!
//! Free-form sub-trees (`with`, `strategy`, `services`, trigger configuration)
//! are kept as JSON values; the core never interprets them.
//!
//! Serialization is the structural projection: external field names, absent
//! optional fields omitted, union fields written in whichever shape they hold.

pub mod fields;

use indexmap::IndexMap;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::{Number, Value};

/// Environment variable map (`env:`), values are string, number or boolean.
pub type EnvMap = IndexMap<String, EnvValue>;

/// Uninterpreted mapping kept verbatim.
pub type FreeMap = IndexMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EnvValue {
    String(String),
    Number(Number),
    Bool(bool),
}

/// Events that start a workflow (`on:`).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Trigger {
    Event(String),
    Events(Vec<String>),
    /// Event name to its configuration (`null` when the event has no filters).
    Map(FreeMap),
}

impl Trigger {
    pub fn event_names(&self) -> Vec<&str> {
        match self {
            Trigger::Event(event) => vec![event.as_str()],
            Trigger::Events(events) => events.iter().map(String::as_str).collect(),
            Trigger::Map(map) => map.keys().map(String::as_str).collect(),
        }
    }
}

/// Token permission grant, either a coarse mode or per-scope levels.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Permissions {
    Mode(String),
    Scopes(IndexMap<String, String>),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Concurrency {
    Group(String),
    Spec(FreeMap),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum JobEnvironment {
    Name(String),
    Spec(FreeMap),
}

/// Runner selection. Always non-empty once validated.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RunsOn {
    Label(String),
    Labels(Vec<String>),
}

impl RunsOn {
    pub fn labels(&self) -> Vec<&str> {
        match self {
            RunsOn::Label(label) => vec![label.as_str()],
            RunsOn::Labels(labels) => labels.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Needs {
    One(String),
    Many(Vec<String>),
}

impl Needs {
    pub fn ids(&self) -> Vec<&str> {
        match self {
            Needs::One(id) => vec![id.as_str()],
            Needs::Many(ids) => ids.iter().map(String::as_str).collect(),
        }
    }
}

/// What a step executes.
///
/// `uses` and `run` are mutually exclusive in intent but the source format
/// accepts either, neither, or both, so all four states are representable.
#[derive(Debug, Clone, PartialEq)]
pub enum StepAction {
    None,
    Uses(String),
    Run(String),
    Both { uses: String, run: String },
}

impl StepAction {
    pub fn from_parts(uses: Option<String>, run: Option<String>) -> Self {
        match (uses, run) {
            (None, None) => StepAction::None,
            (Some(uses), None) => StepAction::Uses(uses),
            (None, Some(run)) => StepAction::Run(run),
            (Some(uses), Some(run)) => StepAction::Both { uses, run },
        }
    }

    pub fn uses(&self) -> Option<&str> {
        match self {
            StepAction::Uses(uses) | StepAction::Both { uses, .. } => Some(uses),
            StepAction::None | StepAction::Run(_) => None,
        }
    }

    pub fn run(&self) -> Option<&str> {
        match self {
            StepAction::Run(run) | StepAction::Both { run, .. } => Some(run),
            StepAction::None | StepAction::Uses(_) => None,
        }
    }

    /// True when both `uses` and `run` are declared.
    pub fn is_ambiguous(&self) -> bool {
        matches!(self, StepAction::Both { .. })
    }
}

impl Serialize for StepAction {
    /// Written inline into the step as `uses` and/or `run`.
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        if let Some(uses) = self.uses() {
            map.serialize_entry(fields::USES, uses)?;
        }
        if let Some(run) = self.run() {
            map.serialize_entry(fields::RUN, run)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Step {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "if", skip_serializing_if = "Option::is_none")]
    pub if_condition: Option<String>,
    #[serde(flatten)]
    pub action: StepAction,
    #[serde(rename = "working-directory", skip_serializing_if = "Option::is_none")]
    pub working_directory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shell: Option<String>,
    /// Inputs for the referenced action; names are not checked.
    #[serde(rename = "with", skip_serializing_if = "Option::is_none")]
    pub with_args: Option<FreeMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<EnvMap>,
    #[serde(rename = "continue-on-error")]
    pub continue_on_error: bool,
    #[serde(rename = "timeout-minutes", skip_serializing_if = "Option::is_none")]
    pub timeout_minutes: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Job {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub needs: Option<Needs>,
    #[serde(rename = "runs-on")]
    pub runs_on: RunsOn,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Permissions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<JobEnvironment>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outputs: Option<IndexMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<EnvMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub defaults: Option<FreeMap>,
    #[serde(rename = "if", skip_serializing_if = "Option::is_none")]
    pub if_condition: Option<String>,
    pub steps: Vec<Step>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strategy: Option<FreeMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<Concurrency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub services: Option<FreeMap>,
}

impl Job {
    /// Action references used by this job's steps, in step order.
    pub fn action_refs(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().filter_map(|step| step.action.uses())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Workflow {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "run-name", skip_serializing_if = "Option::is_none")]
    pub run_name: Option<String>,
    pub on: Trigger,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub permissions: Option<Permissions>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env: Option<EnvMap>,
    /// Keyed by job id, in declaration order.
    pub jobs: IndexMap<String, Job>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<Concurrency>,
}

impl Workflow {
    pub fn job_ids(&self) -> impl Iterator<Item = &str> {
        self.jobs.keys().map(String::as_str)
    }

    /// Structural projection using external field names.
    ///
    /// Feeding the projection back through the validator yields an equal
    /// workflow.
    pub fn to_serializable(&self) -> Value {
        serde_json::to_value(self).expect("workflow projection is plain JSON")
    }
}
