//! Structural validation of workflow documents.
//!
//! Validation turns an untyped YAML tree into a [`Workflow`] or reports every
//! structural problem it finds; it never stops at the first one.
//!
//! ## Rules
//! - **Missing**: a required field (`on`, `jobs`, `runs-on`) is absent.
//! - **Wrong shape**: a field holds a value outside its legal shape family.
//! - **Ambiguous**: a field is set under both its external (`runs-on`) and
//!   internal (`runs_on`) spelling with different values.
//!
//! Unknown fields are ignored. Expressions are never evaluated and job
//! cross-references (`needs`) are not resolved against sibling jobs.
//!
//! ```text
//! jobs:
//!   build:
//!     steps: []
//! -> jobs.build.runs-on: missing required field
//! ```

mod shape;

use crate::model::{
    fields, Concurrency, Job, JobEnvironment, Needs, Permissions, RunsOn, Step, StepAction,
    Trigger, Workflow,
};
use crate::normalize::normalize;
use indexmap::IndexMap;
use serde_yaml::Value;
use shape::Fields;
use std::fmt;
use thiserror::Error;

/// Path used for problems with the document root itself.
pub const ROOT_PATH: &str = "<root>";

/// A single structural violation, located by dotted path.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuralError {
    #[error("{path}: missing required field")]
    Missing { path: String },

    #[error("{path}: expected {expected}, found {found}")]
    WrongShape {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("{path}: `{external}` and `{internal}` are both set with different values")]
    Ambiguous {
        path: String,
        external: &'static str,
        internal: &'static str,
    },
}

impl StructuralError {
    pub fn path(&self) -> &str {
        match self {
            StructuralError::Missing { path }
            | StructuralError::WrongShape { path, .. }
            | StructuralError::Ambiguous { path, .. } => path,
        }
    }

    /// Last path segment, i.e. the external name of the offending field.
    pub fn field(&self) -> &str {
        let path = self.path();
        let last = path.rsplit('.').next().unwrap_or(path);
        last.split('[').next().unwrap_or(last)
    }

    pub fn code(&self) -> &'static str {
        match self {
            StructuralError::Missing { .. } => "missing",
            StructuralError::WrongShape { .. } => "wrong_shape",
            StructuralError::Ambiguous { .. } => "ambiguous",
        }
    }
}

/// Every structural violation found in one document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrors(Vec<StructuralError>);

impl ValidationErrors {
    pub fn errors(&self) -> &[StructuralError] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_inner(self) -> Vec<StructuralError> {
        self.0
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} structural error(s)", self.0.len())?;
        for error in &self.0 {
            write!(f, "; {error}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Normalize and validate a parsed workflow document.
pub fn validate(document: Value) -> Result<Workflow, ValidationErrors> {
    validate_normalized(&normalize(document))
}

/// Validate a document that has already been through [`normalize`].
pub fn validate_normalized(document: &Value) -> Result<Workflow, ValidationErrors> {
    let mut errors = Vec::new();
    let workflow = workflow(document, &mut errors);
    match workflow {
        Some(workflow) if errors.is_empty() => Ok(workflow),
        _ => Err(ValidationErrors(errors)),
    }
}

fn workflow(document: &Value, errors: &mut Vec<StructuralError>) -> Option<Workflow> {
    let Some(map) = document.as_mapping() else {
        errors.push(StructuralError::WrongShape {
            path: ROOT_PATH.to_string(),
            expected: shape::MAPPING,
            found: shape::kind_name(document),
        });
        return None;
    };
    let f = Fields::new(map, "");

    let name = f.optional(fields::NAME, shape::STRING, errors, shape::string);
    let run_name = f.optional(fields::RUN_NAME, shape::STRING, errors, shape::string);
    let on = f.required(fields::ON, shape::TRIGGER, errors, trigger);
    let permissions = f.optional(fields::PERMISSIONS, shape::PERMISSIONS, errors, permissions);
    let env = f.optional(fields::ENV, shape::ENV_MAP, errors, shape::env_map);
    let jobs = jobs(&f, errors);
    let concurrency = f.optional(
        fields::CONCURRENCY,
        shape::STRING_OR_MAPPING,
        errors,
        concurrency,
    );

    Some(Workflow {
        name,
        run_name,
        on: on?,
        permissions,
        env,
        jobs: jobs?,
        concurrency,
    })
}

fn jobs(f: &Fields<'_>, errors: &mut Vec<StructuralError>) -> Option<IndexMap<String, Job>> {
    let map = f.required(fields::JOBS, shape::MAPPING, errors, Value::as_mapping)?;
    let jobs_path = f.path(fields::JOBS);
    let mut jobs = IndexMap::with_capacity(map.len());
    let mut complete = true;
    for (key, value) in map {
        let Some(id) = shape::key_string(key) else {
            errors.push(StructuralError::WrongShape {
                path: jobs_path.clone(),
                expected: shape::SCALAR_KEY,
                found: shape::kind_name(key),
            });
            complete = false;
            continue;
        };
        let path = format!("{jobs_path}.{id}");
        if jobs.contains_key(&id) {
            errors.push(StructuralError::WrongShape {
                path,
                expected: shape::UNIQUE_JOB_ID,
                found: shape::kind_name(key),
            });
            complete = false;
            continue;
        }
        match job(value, &path, errors) {
            Some(job) => {
                jobs.insert(id, job);
            }
            None => complete = false,
        }
    }
    complete.then_some(jobs)
}

fn job(value: &Value, path: &str, errors: &mut Vec<StructuralError>) -> Option<Job> {
    let Some(map) = value.as_mapping() else {
        errors.push(StructuralError::WrongShape {
            path: path.to_string(),
            expected: shape::MAPPING,
            found: shape::kind_name(value),
        });
        return None;
    };
    let f = Fields::new(map, path);

    let name = f.optional(fields::NAME, shape::STRING, errors, shape::string);
    let needs = f.optional(fields::NEEDS, shape::STRING_OR_LIST, errors, needs);
    let runs_on = f.required(fields::RUNS_ON, shape::RUNNER, errors, runs_on);
    let permissions = f.optional(fields::PERMISSIONS, shape::PERMISSIONS, errors, permissions);
    let environment = f.optional(
        fields::ENVIRONMENT,
        shape::STRING_OR_MAPPING,
        errors,
        environment,
    );
    let outputs = f.optional(fields::OUTPUTS, shape::STRING_MAP, errors, shape::string_map);
    let env = f.optional(fields::ENV, shape::ENV_MAP, errors, shape::env_map);
    let defaults = f.optional(fields::DEFAULTS, shape::MAPPING, errors, shape::free_map);
    let if_condition = f.optional(fields::IF, shape::STRING, errors, shape::string);
    let steps = steps(&f, errors);
    let strategy = f.optional(fields::STRATEGY, shape::MAPPING, errors, shape::free_map);
    let concurrency = f.optional(
        fields::CONCURRENCY,
        shape::STRING_OR_MAPPING,
        errors,
        concurrency,
    );
    let services = f.optional(fields::SERVICES, shape::MAPPING, errors, shape::free_map);

    Some(Job {
        name,
        needs,
        runs_on: runs_on?,
        permissions,
        environment,
        outputs,
        env,
        defaults,
        if_condition,
        steps: steps?,
        strategy,
        concurrency,
        services,
    })
}

fn steps(f: &Fields<'_>, errors: &mut Vec<StructuralError>) -> Option<Vec<Step>> {
    let Some(items) = f.optional(fields::STEPS, shape::STEP_LIST, errors, Value::as_sequence)
    else {
        return Some(Vec::new());
    };
    let steps_path = f.path(fields::STEPS);
    let mut steps = Vec::with_capacity(items.len());
    let mut complete = true;
    for (index, item) in items.iter().enumerate() {
        match step(item, &format!("{steps_path}[{index}]"), errors) {
            Some(step) => steps.push(step),
            None => complete = false,
        }
    }
    complete.then_some(steps)
}

fn step(value: &Value, path: &str, errors: &mut Vec<StructuralError>) -> Option<Step> {
    let Some(map) = value.as_mapping() else {
        errors.push(StructuralError::WrongShape {
            path: path.to_string(),
            expected: shape::MAPPING,
            found: shape::kind_name(value),
        });
        return None;
    };
    let f = Fields::new(map, path);

    let name = f.optional(fields::NAME, shape::STRING, errors, shape::string);
    let id = f.optional(fields::ID, shape::STRING, errors, shape::string);
    let if_condition = f.optional(fields::IF, shape::STRING, errors, shape::string);
    let uses = f.optional(fields::USES, shape::STRING, errors, shape::string);
    let run = f.optional(fields::RUN, shape::STRING, errors, shape::string);
    let working_directory = f.optional(
        fields::WORKING_DIRECTORY,
        shape::STRING,
        errors,
        shape::string,
    );
    let shell = f.optional(fields::SHELL, shape::STRING, errors, shape::string);
    let with_args = f.optional(fields::WITH, shape::MAPPING, errors, shape::free_map);
    let env = f.optional(fields::ENV, shape::ENV_MAP, errors, shape::env_map);
    let continue_on_error = f.optional(
        fields::CONTINUE_ON_ERROR,
        shape::BOOLEAN,
        errors,
        shape::boolean,
    );
    let timeout_minutes = f.optional(
        fields::TIMEOUT_MINUTES,
        shape::NON_NEGATIVE_INTEGER,
        errors,
        shape::non_negative_integer,
    );

    Some(Step {
        name,
        id,
        if_condition,
        action: StepAction::from_parts(uses, run),
        working_directory,
        shell,
        with_args,
        env,
        continue_on_error: continue_on_error.unwrap_or(false),
        timeout_minutes,
    })
}

fn trigger(value: &Value) -> Option<Trigger> {
    match value {
        Value::String(event) => Some(Trigger::Event(event.clone())),
        Value::Sequence(_) => shape::string_list(value).map(Trigger::Events),
        Value::Mapping(_) => shape::free_map(value).map(Trigger::Map),
        _ => None,
    }
}

fn runs_on(value: &Value) -> Option<RunsOn> {
    match value {
        Value::String(label) if !label.trim().is_empty() => Some(RunsOn::Label(label.clone())),
        Value::Sequence(_) => shape::string_list(value)
            .filter(|labels| !labels.is_empty())
            .map(RunsOn::Labels),
        _ => None,
    }
}

fn needs(value: &Value) -> Option<Needs> {
    match value {
        Value::String(id) => Some(Needs::One(id.clone())),
        Value::Sequence(_) => shape::string_list(value).map(Needs::Many),
        _ => None,
    }
}

fn permissions(value: &Value) -> Option<Permissions> {
    match value {
        Value::String(mode) => Some(Permissions::Mode(mode.clone())),
        Value::Mapping(_) => shape::string_map(value).map(Permissions::Scopes),
        _ => None,
    }
}

fn environment(value: &Value) -> Option<JobEnvironment> {
    match value {
        Value::String(name) => Some(JobEnvironment::Name(name.clone())),
        Value::Mapping(_) => shape::free_map(value).map(JobEnvironment::Spec),
        _ => None,
    }
}

fn concurrency(value: &Value) -> Option<Concurrency> {
    match value {
        Value::String(group) => Some(Concurrency::Group(group.clone())),
        Value::Mapping(_) => shape::free_map(value).map(Concurrency::Spec),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::EnvValue;
    use serde_json::json;

    fn yaml(text: &str) -> Value {
        serde_yaml::from_str(text).expect("parse yaml")
    }

    fn errors_of(text: &str) -> Vec<StructuralError> {
        validate(yaml(text))
            .expect_err("expected validation failure")
            .into_inner()
    }

    #[test]
    fn minimal_workflow_validates() {
        let workflow = validate(yaml(
            "on: push\njobs:\n  build:\n    runs-on: ubuntu-latest\n    steps:\n      - uses: actions/checkout@v4\n",
        ))
        .expect("valid workflow");

        assert_eq!(workflow.name, None);
        assert_eq!(workflow.on, Trigger::Event("push".to_string()));
        let build = &workflow.jobs["build"];
        assert_eq!(build.runs_on, RunsOn::Label("ubuntu-latest".to_string()));
        assert_eq!(
            build.steps[0].action,
            StepAction::Uses("actions/checkout@v4".to_string())
        );
        assert!(!build.steps[0].continue_on_error);
    }

    #[test]
    fn missing_runs_on_is_the_only_error() {
        let errors = errors_of("on: push\njobs:\n  build:\n    steps:\n      - run: make\n");
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code(), "missing");
        assert_eq!(errors[0].path(), "jobs.build.runs-on");
        assert_eq!(errors[0].field(), "runs-on");
    }

    #[test]
    fn reports_every_missing_field_not_just_the_first() {
        let errors = errors_of("name: nothing\n");
        let paths: Vec<&str> = errors.iter().map(StructuralError::path).collect();
        assert_eq!(paths, vec!["on", "jobs"]);
        assert!(errors
            .iter()
            .all(|error| matches!(error, StructuralError::Missing { .. })));
    }

    #[test]
    fn collects_errors_across_jobs_and_steps() {
        let errors = errors_of(
            "on: push\njobs:\n  a:\n    steps: []\n  b:\n    runs-on: [linux]\n    steps:\n      - with: not-a-map\n      - timeout-minutes: -3\n",
        );
        let paths: Vec<&str> = errors.iter().map(StructuralError::path).collect();
        assert_eq!(
            paths,
            vec![
                "jobs.a.runs-on",
                "jobs.b.steps[0].with",
                "jobs.b.steps[1].timeout-minutes"
            ]
        );
    }

    #[test]
    fn wrong_shape_names_the_expected_family() {
        let errors = errors_of("on: push\njobs:\n  build:\n    runs-on: {os: linux}\n");
        assert_eq!(
            errors,
            vec![StructuralError::WrongShape {
                path: "jobs.build.runs-on".to_string(),
                expected: shape::RUNNER,
                found: "mapping",
            }]
        );
    }

    #[test]
    fn empty_runner_is_rejected() {
        assert_eq!(
            errors_of("on: push\njobs:\n  b:\n    runs-on: []\n")[0].code(),
            "wrong_shape"
        );
        assert_eq!(
            errors_of("on: push\njobs:\n  b:\n    runs-on: ''\n")[0].code(),
            "wrong_shape"
        );
    }

    #[test]
    fn non_mapping_root_is_a_single_error() {
        let errors = validate(yaml("- on\n- jobs\n"))
            .expect_err("list root")
            .into_inner();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].path(), ROOT_PATH);
        assert!(validate(Value::Null).is_err());
    }

    #[test]
    fn boolean_trigger_key_is_normalized_before_validation() {
        let mut root = serde_yaml::Mapping::new();
        root.insert(Value::Bool(true), yaml("[push, pull_request]"));
        root.insert(Value::String("jobs".into()), yaml("{}"));
        let workflow = validate(Value::Mapping(root)).expect("valid after normalization");
        assert_eq!(workflow.on.event_names(), vec!["push", "pull_request"]);
        assert!(workflow.jobs.is_empty());
    }

    #[test]
    fn trigger_accepts_all_three_shapes() {
        let single = validate(yaml("on: push\njobs: {}\n")).expect("single");
        assert_eq!(single.on, Trigger::Event("push".into()));
        let list = validate(yaml("on: [push, release]\njobs: {}\n")).expect("list");
        assert_eq!(list.on.event_names(), vec!["push", "release"]);
        let map = validate(yaml(
            "on:\n  push:\n    branches: [main]\n  workflow_dispatch:\njobs: {}\n",
        ))
        .expect("map");
        match map.on {
            Trigger::Map(events) => {
                assert_eq!(events["push"], json!({"branches": ["main"]}));
                assert_eq!(events["workflow_dispatch"], json!(null));
            }
            other => panic!("unexpected trigger {other:?}"),
        }
        assert_eq!(errors_of("on: 3\njobs: {}\n")[0].code(), "wrong_shape");
    }

    #[test]
    fn internal_and_external_spellings_resolve_to_the_same_field() {
        let external = validate(yaml(
            "on: push\njobs:\n  b:\n    runs-on: x\n    steps:\n      - uses: a/b@v1\n        with: {k: v}\n        continue-on-error: true\n        timeout-minutes: 5\n        working-directory: src\n        if: success()\n",
        ))
        .expect("external spelling");
        let internal = validate(yaml(
            "on: push\njobs:\n  b:\n    runs_on: x\n    steps:\n      - uses: a/b@v1\n        with_args: {k: v}\n        continue_on_error: true\n        timeout_minutes: 5\n        working_directory: src\n        if_condition: success()\n",
        ))
        .expect("internal spelling");
        assert_eq!(external, internal);
        let step = &internal.jobs["b"].steps[0];
        assert!(step.continue_on_error);
        assert_eq!(step.timeout_minutes, Some(5));
        assert_eq!(step.if_condition.as_deref(), Some("success()"));
    }

    #[test]
    fn conflicting_spellings_are_ambiguous() {
        let errors = errors_of("on: push\njobs:\n  b:\n    runs-on: x\n    runs_on: y\n");
        assert_eq!(
            errors,
            vec![StructuralError::Ambiguous {
                path: "jobs.b.runs-on".to_string(),
                external: "runs-on",
                internal: "runs_on",
            }]
        );
        validate(yaml("on: push\njobs:\n  b:\n    runs-on: x\n    runs_on: x\n"))
            .expect("identical values are not ambiguous");
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let workflow = validate(yaml(
            "on: push\nfuture-field: 1\njobs:\n  b:\n    runs-on: x\n    uses: org/repo/.github/workflows/w.yml@main\n    steps:\n      - run: make\n        mystery: true\n",
        ))
        .expect("unknown fields ignored");
        assert_eq!(workflow.jobs["b"].steps.len(), 1);
    }

    #[test]
    fn step_may_declare_both_or_neither_action_form() {
        let workflow = validate(yaml(
            "on: push\njobs:\n  b:\n    runs-on: x\n    steps:\n      - uses: a/b@v1\n        run: echo hi\n      - name: placeholder\n",
        ))
        .expect("both and neither are legal");
        let steps = &workflow.jobs["b"].steps;
        assert!(steps[0].action.is_ambiguous());
        assert_eq!(steps[1].action, StepAction::None);
    }

    #[test]
    fn job_fields_accept_their_union_shapes() {
        let workflow = validate(yaml(
            r#"
on: push
permissions: read-all
env:
  RUST_LOG: debug
  RETRIES: 3
  STRICT: true
concurrency: ci-${{ github.ref }}
jobs:
  test:
    needs: build
    runs-on: [self-hosted, linux]
    permissions:
      contents: read
    environment:
      name: production
      url: https://example.com
    outputs:
      version: ${{ steps.v.outputs.version }}
    defaults:
      run:
        shell: bash
    strategy:
      matrix:
        node: [18, 20]
    concurrency:
      group: deploy
      cancel-in-progress: true
    services:
      redis:
        image: redis
    steps: []
  deploy:
    needs: [build, test]
    runs-on: ubuntu-latest
    environment: staging
"#,
        ))
        .expect("valid workflow");

        assert_eq!(workflow.permissions, Some(Permissions::Mode("read-all".into())));
        let env = workflow.env.as_ref().expect("env");
        assert_eq!(env["RETRIES"], EnvValue::Number(3.into()));
        assert_eq!(env["STRICT"], EnvValue::Bool(true));
        let test = &workflow.jobs["test"];
        assert_eq!(test.needs, Some(Needs::One("build".into())));
        assert_eq!(test.runs_on.labels(), vec!["self-hosted", "linux"]);
        assert!(matches!(test.environment, Some(JobEnvironment::Spec(_))));
        assert!(matches!(test.concurrency, Some(Concurrency::Spec(_))));
        let deploy = &workflow.jobs["deploy"];
        assert_eq!(
            deploy.needs.as_ref().map(Needs::ids),
            Some(vec!["build", "test"])
        );
        assert_eq!(
            deploy.environment,
            Some(JobEnvironment::Name("staging".into()))
        );
    }

    #[test]
    fn needs_is_not_resolved_against_sibling_jobs() {
        validate(yaml("on: push\njobs:\n  b:\n    runs-on: x\n    needs: [ghost]\n"))
            .expect("unknown dependency is not a structural error");
    }

    #[test]
    fn job_ids_that_collide_after_stringifying_are_rejected() {
        let errors = errors_of(
            "on: push\njobs:\n  1:\n    runs-on: a\n    steps:\n      - uses: x/one@v1\n  \"1\":\n    runs-on: b\n    steps:\n      - uses: x/two@v1\n",
        );
        assert_eq!(
            errors,
            vec![StructuralError::WrongShape {
                path: "jobs.1".to_string(),
                expected: shape::UNIQUE_JOB_ID,
                found: "string",
            }]
        );
    }

    #[test]
    fn boolean_trigger_value_overrides_literal_trigger() {
        let mut root = serde_yaml::Mapping::new();
        root.insert(Value::String("on".into()), yaml("push"));
        root.insert(Value::Bool(true), yaml("release"));
        root.insert(Value::String("jobs".into()), yaml("{}"));
        let workflow = validate(Value::Mapping(root)).expect("valid");
        assert_eq!(workflow.on, Trigger::Event("release".into()));
    }

    #[test]
    fn jobs_keep_declaration_order() {
        let workflow = validate(yaml(
            "on: push\njobs:\n  zulu: {runs-on: x}\n  alpha: {runs-on: x}\n  mike: {runs-on: x}\n",
        ))
        .expect("valid");
        let ids: Vec<&str> = workflow.job_ids().collect();
        assert_eq!(ids, vec!["zulu", "alpha", "mike"]);
    }

    #[test]
    fn projection_revalidates_to_an_equal_workflow() {
        let workflow = validate(yaml(
            r#"
name: CI
run-name: Build ${{ github.sha }}
on:
  push:
    branches: [main]
env:
  N: 1.5
jobs:
  build:
    runs-on: ubuntu-latest
    steps:
      - uses: actions/checkout@v4
        with:
          fetch-depth: 0
      - name: Test
        id: test
        run: cargo test
        shell: bash
        env:
          CI: true
        timeout-minutes: 10
  lint:
    needs: build
    runs-on: [linux]
"#,
        ))
        .expect("valid workflow");

        let projection = workflow.to_serializable();
        let reparsed: Value = serde_yaml::to_value(&projection).expect("json to yaml");
        let revalidated = validate(reparsed).expect("projection validates");
        assert_eq!(revalidated, workflow);
    }

    #[test]
    fn display_lists_all_errors() {
        let errors = validate(yaml("name: x\n")).expect_err("invalid");
        let text = errors.to_string();
        assert!(text.starts_with("2 structural error(s)"));
        assert!(text.contains("on: missing required field"));
        assert!(text.contains("jobs: missing required field"));
    }
}
