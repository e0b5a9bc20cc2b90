//! Context-debt steering: turns a repository model and intent text into a
//! bounded audit task for an LM.
//!
//! The boundary text is injected verbatim and treated as ground truth; the
//! intent text is the object under examination. Neither step does I/O or can
//! fail: a malformed model yields the empty boundary.

use crate::boundary::Boundary;
use crate::repository::Repository;
use serde_json::Value;

const CONTEXT_DEBT_TEMPLATE: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/prompts/context_debt.md"));

const BOUNDARY_PLACEHOLDER: &str = "{{boundary}}";
const INTENT_DIVIDER: &str = "---\nDOCUMENTATION TO ANALYZE:";

/// System prompt sent alongside the assembled task.
pub const SYSTEM_PROMPT: &str = "You are a static context debt analyzer. You must be precise and concise without being overly verbose and WITHOUT ADDING INFORMATION that is not provided by the CONTEXT.";

/// Boundary text for a serialized repository model.
pub fn compute_constraints(model: &Value) -> String {
    Boundary::from_projection(model).render()
}

/// Full audit task: instructions, boundary, then the intent text.
pub fn assemble_prompt(model: &Value, intent: &str) -> String {
    render_prompt(&compute_constraints(model), intent)
}

/// Same as [`assemble_prompt`] for an in-memory repository.
pub fn assemble_prompt_for_repository(repository: &Repository, intent: &str) -> String {
    render_prompt(&Boundary::from_repository(repository).render(), intent)
}

fn render_prompt(boundary: &str, intent: &str) -> String {
    let mut prompt = CONTEXT_DEBT_TEMPLATE.replacen(BOUNDARY_PLACEHOLDER, boundary, 1);
    if !prompt.ends_with('\n') {
        prompt.push('\n');
    }
    prompt.push('\n');
    prompt.push_str(INTENT_DIVIDER);
    prompt.push('\n');
    prompt.push_str(intent);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::SourceDocument;
    use serde_json::json;

    fn scenario_repository() -> Repository {
        let mut repository = Repository::new("demo");
        repository.ingest(SourceDocument {
            file_name: "ci.yml".to_string(),
            document: serde_yaml::from_str(
                "on: push\njobs:\n  build:\n    runs-on: ubuntu-latest\n    steps:\n      - uses: actions/checkout@v4\n",
            )
            .expect("parse yaml"),
        });
        repository
    }

    #[test]
    fn constraints_are_the_unaltered_boundary() {
        let repository = scenario_repository();
        let model = repository.to_serializable();
        assert_eq!(
            compute_constraints(&model),
            Boundary::from_repository(&repository).render()
        );
    }

    #[test]
    fn prompt_embeds_boundary_categories_and_intent() {
        let repository = scenario_repository();
        let intent = "Our CI checks out code with actions/checkout@v1.";
        let prompt = assemble_prompt(&repository.to_serializable(), intent);

        assert!(prompt.contains("Valid Actions in 'build': ['actions/checkout@v4']"));
        assert!(prompt.contains("HALLUCINATED ENTITY"));
        assert!(prompt.contains("VERSION DRIFT"));
        assert!(prompt.contains("LOGIC MISMATCH"));
        assert!(prompt.contains("Severity: High | Medium"));
        assert!(prompt.contains("Do not mention material that is consistent"));
        assert!(!prompt.contains(BOUNDARY_PLACEHOLDER));
        assert!(prompt.ends_with(&format!("{INTENT_DIVIDER}\n{intent}")));

        let boundary_at = prompt.find("STRUCTURAL BOUNDARIES").expect("boundary");
        let intent_at = prompt.find(intent).expect("intent");
        assert!(boundary_at < intent_at);
    }

    #[test]
    fn repository_and_projection_prompts_match() {
        let repository = scenario_repository();
        assert_eq!(
            assemble_prompt_for_repository(&repository, "docs"),
            assemble_prompt(&repository.to_serializable(), "docs")
        );
    }

    #[test]
    fn malformed_model_degrades_to_empty_boundary() {
        let prompt = assemble_prompt(&json!({"unexpected": true}), "The deploy.yml workflow ships releases.");
        assert!(prompt.contains("RESTRICTION: No workflows exist in this repository."));
        assert!(prompt.contains("The deploy.yml workflow ships releases."));
    }

    #[test]
    fn intent_text_with_placeholder_is_left_alone() {
        let prompt = assemble_prompt(&json!({}), "literal {{boundary}} in docs");
        assert!(prompt.ends_with("literal {{boundary}} in docs"));
    }
}
