//! Parsing of context-debt reports returned by the LM.
//!
//! The expected shape is the one requested by the steering prompt:
//!
//! ```text
//! - [TYPE: Version Drift]
//!   - Claim: "We use actions/checkout@v1"
//!   - Reality: "Valid Actions in 'build': ['actions/checkout@v4']"
//!   - Severity: High
//! ```
//!
//! Parsing is lenient about bullets, quotes and case. Anything outside a
//! `[TYPE: ...]` entry is ignored.

use regex::Regex;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscrepancyKind {
    HallucinatedEntity,
    VersionDrift,
    LogicMismatch,
    Other(String),
}

impl DiscrepancyKind {
    fn from_label(label: &str) -> Self {
        let lower = label.trim().to_ascii_lowercase();
        if lower.contains("logic") {
            DiscrepancyKind::LogicMismatch
        } else if lower.contains("drift") || lower.contains("version") {
            DiscrepancyKind::VersionDrift
        } else if lower.contains("hallucinat") || lower.contains("entity") {
            DiscrepancyKind::HallucinatedEntity
        } else {
            DiscrepancyKind::Other(label.trim().to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            DiscrepancyKind::HallucinatedEntity => "Hallucinated Entity",
            DiscrepancyKind::VersionDrift => "Version Drift",
            DiscrepancyKind::LogicMismatch => "Logic Mismatch",
            DiscrepancyKind::Other(label) => label,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Discrepancy {
    pub kind: DiscrepancyKind,
    pub claim: String,
    pub reality: String,
    pub severity: Option<Severity>,
}

/// Extract every discrepancy entry from an LM response.
pub fn parse_report(text: &str) -> Vec<Discrepancy> {
    let type_line = Regex::new(r"(?i)^\s*(?:[-*]\s*)?\[\s*TYPE\s*:\s*([^\]]+)\]")
        .expect("regex for discrepancy type");
    let field_line = Regex::new(r"(?i)^\s*(?:[-*]\s*)?(claim|reality|severity)\s*:\s*(.*?)\s*$")
        .expect("regex for discrepancy field");

    let mut out = Vec::new();
    let mut current: Option<Discrepancy> = None;
    for line in text.lines() {
        if let Some(cap) = type_line.captures(line) {
            out.extend(current.take());
            current = Some(Discrepancy {
                kind: DiscrepancyKind::from_label(&cap[1]),
                claim: String::new(),
                reality: String::new(),
                severity: None,
            });
            continue;
        }
        let (Some(entry), Some(cap)) = (current.as_mut(), field_line.captures(line)) else {
            continue;
        };
        let value = unquote(&cap[2]);
        match cap[1].to_ascii_lowercase().as_str() {
            "claim" => entry.claim = value,
            "reality" => entry.reality = value,
            _ => entry.severity = parse_severity(&value),
        }
    }
    out.extend(current);
    out
}

fn parse_severity(value: &str) -> Option<Severity> {
    let lower = value.to_ascii_lowercase();
    if lower.starts_with("high") {
        Some(Severity::High)
    } else if lower.starts_with("medium") {
        Some(Severity::Medium)
    } else {
        None
    }
}

fn unquote(value: &str) -> String {
    let trimmed = value.trim();
    for (open, close) in [('"', '"'), ('\u{201c}', '\u{201d}'), ('\'', '\'')] {
        if trimmed.len() >= 2 && trimmed.starts_with(open) && trimmed.ends_with(close) {
            return trimmed[open.len_utf8()..trimmed.len() - close.len_utf8()].to_string();
        }
    }
    trimmed.to_string()
}
