//! Command handlers behind the CLI.
//!
//! Each handler resolves its inputs, runs the library pipeline and prints the
//! result to stdout. Diagnostics go through `tracing` to stderr.
use crate::boundary::derive_boundary;
use crate::cli::{
    AnalyzeArgs, BoundaryArgs, Command, FetchArgs, ModelArgs, PromptArgs, ShowArgs, SourceArgs,
    ValidateArgs,
};
use crate::config::{self, AnalyzerConfig, LmEnv};
use crate::git;
use crate::lm;
use crate::report::{parse_report, Discrepancy};
use crate::repository::{load_repository, Repository};
use crate::sources::{self, Intent};
use crate::steering::{assemble_prompt_for_repository, SYSTEM_PROMPT};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

pub fn run(command: Command) -> Result<ExitCode> {
    match command {
        Command::Model(args) => run_model(args),
        Command::Validate(args) => run_validate(args),
        Command::Boundary(args) => run_boundary(args),
        Command::Prompt(args) => run_prompt(args),
        Command::Analyze(args) => run_analyze(args),
        Command::Fetch(args) => run_fetch(args),
        Command::Show(args) => run_show(args),
    }
}

fn repo_root(source: &SourceArgs) -> Result<PathBuf> {
    if let Some(repo) = &source.repo {
        return Ok(repo.clone());
    }
    let url = source
        .url
        .as_deref()
        .context("either --repo or --url is required")?;
    let cache = match &source.cache {
        Some(cache) => cache.clone(),
        None => git::default_cache_root()?,
    };
    git::clone_or_update(url, &cache)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("serialize JSON output")?;
    println!("{text}");
    Ok(())
}

fn run_model(args: ModelArgs) -> Result<ExitCode> {
    let repository = load_repository(&repo_root(&args.source)?)?;
    print_json(&repository.to_serializable())?;
    Ok(ExitCode::SUCCESS)
}

fn run_validate(args: ValidateArgs) -> Result<ExitCode> {
    let repository = load_repository(&repo_root(&args.source)?)?;
    let reports = repository.file_reports();
    if args.json {
        print_json(&reports)?;
    } else {
        for report in &reports {
            println!("{}: {}", report.file, report.status);
            for error in &report.errors {
                println!("  - {}", error.message);
            }
        }
        if reports.is_empty() {
            println!("no workflow files found");
        }
    }
    Ok(if repository.failures().is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn run_boundary(args: BoundaryArgs) -> Result<ExitCode> {
    let repository = load_repository(&repo_root(&args.source)?)?;
    println!("{}", derive_boundary(&repository));
    Ok(ExitCode::SUCCESS)
}

fn load_analyzer_config(explicit: Option<&Path>, root: &Path) -> Result<AnalyzerConfig> {
    match explicit {
        Some(path) => config::load_config(path),
        None => config::load_config_optional(root),
    }
}

fn load_intent(explicit: Option<&Path>, root: &Path, config: &AnalyzerConfig) -> Result<Intent> {
    match explicit {
        Some(path) => {
            let text =
                fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
            Ok(Intent::Found {
                path: path.to_path_buf(),
                text,
            })
        }
        None => sources::load_intent(root, &config.intent_files),
    }
}

struct PreparedPrompt {
    repository: Repository,
    config: AnalyzerConfig,
    prompt: String,
}

fn prepare_prompt(
    source: &SourceArgs,
    intent: Option<&Path>,
    config_path: Option<&Path>,
) -> Result<PreparedPrompt> {
    let root = repo_root(source)?;
    let config = load_analyzer_config(config_path, &root)?;
    let repository = load_repository(&root)?;
    let intent = load_intent(intent, &root, &config)?;
    let prompt = assemble_prompt_for_repository(&repository, intent.text());
    tracing::debug!(prompt_bytes = prompt.len(), "prompt assembled");
    Ok(PreparedPrompt {
        repository,
        config,
        prompt,
    })
}

fn run_prompt(args: PromptArgs) -> Result<ExitCode> {
    let prepared = prepare_prompt(&args.source, args.intent.as_deref(), args.config.as_deref())?;
    println!("{}", prepared.prompt);
    Ok(ExitCode::SUCCESS)
}

#[derive(Serialize)]
struct AnalysisOutput<'a> {
    repository: &'a str,
    workflows: usize,
    discrepancies: &'a [Discrepancy],
}

fn run_analyze(args: AnalyzeArgs) -> Result<ExitCode> {
    let prepared = prepare_prompt(&args.source, args.intent.as_deref(), args.config.as_deref())?;
    let backend = config::resolve_backend(args.lm.as_deref(), &prepared.config, &LmEnv::from_env())?;
    let response = lm::invoke(&backend, SYSTEM_PROMPT, &prepared.prompt)?;
    let discrepancies = parse_report(&response);
    tracing::info!(count = discrepancies.len(), "discrepancies parsed");

    if args.json {
        print_json(&AnalysisOutput {
            repository: prepared.repository.name(),
            workflows: prepared.repository.len(),
            discrepancies: &discrepancies,
        })?;
    } else {
        println!("{}", response.trim_end());
    }
    Ok(ExitCode::SUCCESS)
}

fn run_fetch(args: FetchArgs) -> Result<ExitCode> {
    let cache = match args.cache {
        Some(cache) => cache,
        None => git::default_cache_root()?,
    };
    let path = git::clone_or_update(&args.url, &cache)?;
    println!("{}", path.display());
    Ok(ExitCode::SUCCESS)
}

fn run_show(args: ShowArgs) -> Result<ExitCode> {
    let text = sources::read_raw_workflow(&repo_root(&args.source)?, &args.file)?;
    print!("{text}");
    Ok(ExitCode::SUCCESS)
}
