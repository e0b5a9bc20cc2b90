//! CLI argument parsing for workflow modeling and context-debt analysis.
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "cdebt",
    version,
    about = "Model CI workflows and audit documentation against them",
    after_help = "Examples:\n  cdebt validate --repo .\n  cdebt boundary --repo .\n  cdebt prompt --repo . --intent AGENTS.md\n  cdebt analyze --url https://github.com/acme/widgets --lm 'llm -m gpt-4o'\n  cdebt show --repo . ci.yml",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Log debug output to stderr (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the repository model as JSON
    Model(ModelArgs),
    /// Report structural validation results per workflow file
    Validate(ValidateArgs),
    /// Print the structural boundary text
    Boundary(BoundaryArgs),
    /// Print the assembled context-debt prompt
    Prompt(PromptArgs),
    /// Run the prompt through an LM and report discrepancies
    Analyze(AnalyzeArgs),
    /// Clone or update a remote repository in the cache
    Fetch(FetchArgs),
    /// Print the raw text of one workflow file
    Show(ShowArgs),
}

/// Where workflows come from: a local checkout or a remote URL.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Repository root containing .github/workflows
    #[arg(long, value_name = "DIR", conflicts_with = "url", required_unless_present = "url")]
    pub repo: Option<PathBuf>,

    /// Git URL to clone (or update) before analysis
    #[arg(long, value_name = "URL")]
    pub url: Option<String>,

    /// Cache directory for clones (defaults to the user cache dir)
    #[arg(long, value_name = "DIR", requires = "url")]
    pub cache: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ModelArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Emit machine-readable JSON output
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct BoundaryArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

#[derive(Args, Debug)]
pub struct PromptArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Intent file to audit instead of the repository's AGENTS.md
    #[arg(long, value_name = "FILE")]
    pub intent: Option<PathBuf>,

    /// Analyzer config (defaults to <repo>/.context-debt.json)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Intent file to audit instead of the repository's AGENTS.md
    #[arg(long, value_name = "FILE")]
    pub intent: Option<PathBuf>,

    /// Analyzer config (defaults to <repo>/.context-debt.json)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// LM command; prompt on stdin, answer on stdout
    #[arg(long, value_name = "CMD")]
    pub lm: Option<String>,

    /// Emit parsed discrepancies as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Git URL to clone or update
    #[arg(long, value_name = "URL")]
    pub url: String,

    /// Cache directory for clones (defaults to the user cache dir)
    #[arg(long, value_name = "DIR")]
    pub cache: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Workflow file name inside .github/workflows
    #[arg(value_name = "FILE")]
    pub file: String,
}
