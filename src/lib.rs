//! Typed model of CI workflow definitions, a closed-world boundary extractor
//! over that model, and a steering layer that audits documentation against it.
//!
//! The core (`normalize`, `validate`, `model`, `repository`, `boundary`,
//! `steering`) is pure. File discovery, git, configuration, LM invocation and
//! the CLI live in the outer modules.

pub mod boundary;
pub mod cli;
pub mod commands;
pub mod config;
pub mod git;
pub mod lm;
pub mod model;
pub mod normalize;
pub mod report;
pub mod repository;
pub mod sources;
pub mod steering;
pub mod validate;
