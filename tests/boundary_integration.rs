mod common;

use common::{run_cdebt, stdout, FixtureRepo, CI_WORKFLOW, MISSING_RUNNER_WORKFLOW};
use context_debt::boundary::derive_boundary;
use context_debt::repository::load_repository;

#[test]
fn boundary_lists_the_single_workflow() {
    let repo = FixtureRepo::new().workflow("ci.yml", CI_WORKFLOW);
    let output = run_cdebt(&repo, &["boundary"]);
    assert!(output.status.success());

    let expected = [
        "=== STRUCTURAL BOUNDARIES (SOURCE OF TRUTH) ===",
        "RESTRICTION: Only the following 1 workflows exist:",
        "  - Workflow File: 'ci.yml' (ID: Unnamed)",
        "    -> Allowed Jobs in 'ci.yml': ['build']",
        "       -> Valid Actions in 'build': ['actions/checkout@v4']",
        "================================================",
        "RULE: Any assertion referencing a workflow, job, or action NOT listed above is FALSE.",
    ]
    .join("\n");
    assert_eq!(stdout(&output).trim_end(), expected);
}

#[test]
fn invalid_workflow_is_excluded_from_model_and_boundary() {
    let repo = FixtureRepo::new()
        .workflow("ci.yml", CI_WORKFLOW)
        .workflow("broken.yml", MISSING_RUNNER_WORKFLOW)
        .workflow("garbage.yaml", "jobs: [unclosed\n");

    let repository = load_repository(repo.path()).expect("load repository");
    let files: Vec<&str> = repository.workflows().map(|(file, _)| file).collect();
    assert_eq!(files, vec!["ci.yml"]);
    assert_eq!(repository.failures().len(), 2);

    let boundary = derive_boundary(&repository);
    assert!(!boundary.contains("broken.yml"));
    assert!(!boundary.contains("garbage.yaml"));

    let output = run_cdebt(&repo, &["model"]);
    assert!(output.status.success());
    let model: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("model JSON");
    let workflows = model["workflows"].as_object().expect("workflows object");
    assert_eq!(workflows.keys().collect::<Vec<_>>(), vec!["ci.yml"]);
    assert_eq!(
        model["workflows"]["ci.yml"]["jobs"]["build"]["steps"][0]["uses"],
        "actions/checkout@v4"
    );
}

#[test]
fn validate_json_names_the_missing_runner() {
    let repo = FixtureRepo::new()
        .workflow("broken.yml", MISSING_RUNNER_WORKFLOW)
        .workflow("ci.yml", CI_WORKFLOW);
    let output = run_cdebt(&repo, &["validate", "--json"]);
    assert!(!output.status.success());

    let reports: serde_json::Value = serde_json::from_str(&stdout(&output)).expect("JSON");
    let reports = reports.as_array().expect("array");
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0]["file"], "ci.yml");
    assert_eq!(reports[0]["status"], "valid");
    assert_eq!(reports[1]["file"], "broken.yml");
    let errors = reports[1]["errors"].as_array().expect("errors");
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["code"], "missing");
    assert_eq!(errors[0]["path"], "jobs.build.runs-on");
}

#[test]
fn empty_repository_has_the_empty_boundary() {
    let repo = FixtureRepo::new();
    let output = run_cdebt(&repo, &["boundary"]);
    assert!(output.status.success());
    assert_eq!(
        stdout(&output).trim_end(),
        "=== STRUCTURAL BOUNDARIES (SOURCE OF TRUTH) ===\nRESTRICTION: No workflows exist in this repository."
    );
}

#[test]
fn show_refuses_paths_outside_workflows() {
    let repo = FixtureRepo::new()
        .workflow("ci.yml", CI_WORKFLOW)
        .file("secret.txt", "token");
    let output = run_cdebt(&repo, &["show", "ci.yml"]);
    assert!(output.status.success());
    assert_eq!(stdout(&output), CI_WORKFLOW);

    let output = run_cdebt(&repo, &["show", "../../secret.txt"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("access denied"));
}
