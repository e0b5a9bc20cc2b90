//! External field names and the alias table between external and internal spellings.
//!
//! The source format uses hyphenated names (`runs-on`) and reserved words
//! (`if`, `with`) that are not valid Rust identifiers. Documents may use either
//! spelling; the validator resolves both through [`ALIASES`] and projections
//! always write the external one.

pub const NAME: &str = "name";
pub const RUN_NAME: &str = "run-name";
pub const ON: &str = "on";
pub const PERMISSIONS: &str = "permissions";
pub const ENV: &str = "env";
pub const JOBS: &str = "jobs";
pub const CONCURRENCY: &str = "concurrency";

pub const NEEDS: &str = "needs";
pub const RUNS_ON: &str = "runs-on";
pub const ENVIRONMENT: &str = "environment";
pub const OUTPUTS: &str = "outputs";
pub const DEFAULTS: &str = "defaults";
pub const IF: &str = "if";
pub const STEPS: &str = "steps";
pub const STRATEGY: &str = "strategy";
pub const SERVICES: &str = "services";

pub const ID: &str = "id";
pub const USES: &str = "uses";
pub const RUN: &str = "run";
pub const WORKING_DIRECTORY: &str = "working-directory";
pub const SHELL: &str = "shell";
pub const WITH: &str = "with";
pub const CONTINUE_ON_ERROR: &str = "continue-on-error";
pub const TIMEOUT_MINUTES: &str = "timeout-minutes";

/// Bidirectional `(external, internal)` name table.
pub const ALIASES: &[(&str, &str)] = &[
    (RUN_NAME, "run_name"),
    (RUNS_ON, "runs_on"),
    (IF, "if_condition"),
    (WITH, "with_args"),
    (WORKING_DIRECTORY, "working_directory"),
    (CONTINUE_ON_ERROR, "continue_on_error"),
    (TIMEOUT_MINUTES, "timeout_minutes"),
];

/// Internal spelling for an external field name, if the field is aliased.
pub fn internal_name(external: &str) -> Option<&'static str> {
    ALIASES
        .iter()
        .find(|(ext, _)| *ext == external)
        .map(|(_, internal)| *internal)
}

/// External spelling for an internal field name, if the field is aliased.
pub fn external_name(internal: &str) -> Option<&'static str> {
    ALIASES
        .iter()
        .find(|(_, int)| *int == internal)
        .map(|(external, _)| *external)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alias_table_resolves_both_directions() {
        for (external, internal) in ALIASES {
            assert_eq!(internal_name(external), Some(*internal));
            assert_eq!(external_name(internal), Some(*external));
        }
    }

    #[test]
    fn unaliased_fields_have_no_mapping() {
        assert_eq!(internal_name(NAME), None);
        assert_eq!(external_name("steps"), None);
    }
}
