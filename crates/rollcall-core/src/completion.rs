//! Completion-confidence scoring for extracted markers.
//!
//! Each marker runs through independent sub-checks. A check that fires
//! contributes its own 0-100 confidence to a weighted average:
//!
//! | check        | looks at                                     | weight |
//! |--------------|----------------------------------------------|--------|
//! | direct       | the marker text (`[x]`, strikethrough, ✓)    | 1.5    |
//! | context      | ±3 surrounding lines                         | 1.2    |
//! | old document | file path, header, phases, stale years       | 0.8    |
//! | git          | subject of the last commit touching the file | 1.0    |
//!
//! Checks that don't fire are left out of both sums, so the score is 0
//! when nothing fires.

use crate::git::GitInfoProvider;
use crate::patterns::PatternCatalog;
use crate::scanner::ScanResult;
use crate::todo::{checkbox_state, TodoItem, UNCHECKED_TASK};
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub const DIRECT_WEIGHT: f64 = 1.5;
pub const CONTEXT_WEIGHT: f64 = 1.2;
pub const OLD_DOCUMENT_WEIGHT: f64 = 0.8;
pub const GIT_WEIGHT: f64 = 1.0;

/// Scores at or above this count as likely completed.
pub const COMPLETION_THRESHOLD: u32 = 70;

pub const CONTEXT_RADIUS: usize = 3;
pub const HEADER_CHARS: usize = 500;

const ARCHIVE_PATH_SCORE: u32 = 70;
const OUTDATED_HEADER_SCORE: u32 = 30;
const PHASE_NUMBERING_SCORE: u32 = 20;
const OLD_YEARS_SCORE: u32 = 25;
const OLD_YEAR_MIN_MENTIONS: usize = 3;
const OLD_YEAR_AGE: i32 = 2;

const GIT_COMMIT_SCORE: u32 = 60;
const GIT_COMMIT_MATCH_SCORE: u32 = 75;

// ---------------------------------------------------------------------------
// CheckResult
// ---------------------------------------------------------------------------

/// Outcome of one sub-check. The confidence stays unrounded until the
/// checks are blended.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckResult {
    pub fired: bool,
    pub confidence: f64,
    pub reasons: Vec<String>,
}

impl CheckResult {
    fn fired(confidence: impl Into<f64>, reasons: Vec<String>) -> Self {
        Self {
            fired: true,
            confidence: confidence.into().min(100.0),
            reasons,
        }
    }
}

// ---------------------------------------------------------------------------
// CompletionAnalysis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionAnalysis {
    pub todo: TodoItem,
    pub confidence: u32,
    pub is_likely_completed: bool,
    pub reasons: Vec<String>,
    pub suggestions: Vec<String>,
}

/// Weighted average of `(confidence, weight)` pairs, rounded. Zero when the
/// slice is empty.
pub fn calculate_confidence(parts: &[(f64, f64)]) -> u32 {
    let total_weight: f64 = parts.iter().map(|(_, w)| w).sum();
    if total_weight <= 0.0 {
        return 0;
    }
    let weighted: f64 = parts.iter().map(|(c, w)| c * w).sum();
    (weighted / total_weight).round().clamp(0.0, 100.0) as u32
}

pub fn is_likely_completed(confidence: u32) -> bool {
    confidence >= COMPLETION_THRESHOLD
}

/// Recommended next steps for a score, by fixed descending tiers.
pub fn suggestions_for(confidence: u32) -> Vec<String> {
    let lines: &[&str] = if confidence >= 90 {
        &[
            "Safe to close: strong evidence this is already done",
            "Remove the marker or check it off",
        ]
    } else if confidence >= 70 {
        &[
            "Recommend review: this is likely completed",
            "Confirm with the owner, then close it",
        ]
    } else if confidence >= 50 {
        &[
            "Needs verification: some signs of completion",
            "Check recent changes around this code",
        ]
    } else if confidence >= 30 {
        &["Flag for review: weak completion signals"]
    } else {
        &["Appears active: keep tracking it"]
    };
    lines.iter().map(|s| s.to_string()).collect()
}

// ---------------------------------------------------------------------------
// CompletionAnalyzer
// ---------------------------------------------------------------------------

pub struct CompletionAnalyzer<'a> {
    catalog: &'a PatternCatalog,
    current_year: i32,
    git: Option<&'a dyn GitInfoProvider>,
}

impl<'a> CompletionAnalyzer<'a> {
    pub fn new(catalog: &'a PatternCatalog) -> Self {
        Self {
            catalog,
            current_year: chrono::Utc::now().year(),
            git: None,
        }
    }

    /// Pin the year used to decide which year mentions are stale.
    pub fn with_current_year(mut self, year: i32) -> Self {
        self.current_year = year;
        self
    }

    pub fn with_git(mut self, git: &'a dyn GitInfoProvider) -> Self {
        self.git = Some(git);
        self
    }

    /// The marker text itself carries a completion mark. The strongest match
    /// wins. A checklist item is only checked off by its own box, not by an
    /// `[x]` later in its text.
    pub fn direct_check(&self, todo: &TodoItem) -> CheckResult {
        let checklist = todo.kind == UNCHECKED_TASK;
        let best = self
            .catalog
            .direct_indicators()
            .filter(|i| {
                if checklist && i.checkbox {
                    checkbox_state(&todo.raw_text) == Some(true)
                } else {
                    i.regex.is_match(&todo.raw_text)
                }
            })
            .max_by_key(|i| i.confidence);
        match best {
            Some(indicator) => CheckResult::fired(
                indicator.confidence,
                vec![format!(
                    "{} ({}% confidence)",
                    indicator.description, indicator.confidence
                )],
            ),
            None => CheckResult::default(),
        }
    }

    /// Completion language within `CONTEXT_RADIUS` lines of the marker. The
    /// score is the mean of every indicator that matched.
    pub fn context_check(&self, todo: &TodoItem, content: &str) -> CheckResult {
        let window = context_window(content, todo.line, CONTEXT_RADIUS);
        let matched: Vec<_> = self
            .catalog
            .context_indicators()
            .filter(|i| i.regex.is_match(&window))
            .collect();
        if matched.is_empty() {
            return CheckResult::default();
        }
        let sum: u32 = matched.iter().map(|i| i.confidence).sum();
        let mean = f64::from(sum) / matched.len() as f64;
        let reasons = matched
            .iter()
            .map(|i| format!("{} ({}% confidence)", i.description, i.confidence))
            .collect();
        CheckResult::fired(mean, reasons)
    }

    /// Signs the whole document is superseded. Signals add up, capped at 100.
    pub fn old_document_check(&self, todo: &TodoItem, content: &str) -> CheckResult {
        let mut score = 0;
        let mut reasons = Vec::new();

        if self.catalog.is_archive_path(&todo.file) {
            score += ARCHIVE_PATH_SCORE;
            reasons.push(format!("File is in an archive-style location: {}", todo.file));
        }

        let header = header_of(content, HEADER_CHARS);
        if let Some(m) = self.catalog.outdated_header().find(header) {
            score += OUTDATED_HEADER_SCORE;
            reasons.push(format!(
                "Document header marks it as '{}'",
                m.as_str().to_lowercase()
            ));
        }

        if self.catalog.phase_numbering().is_match(content) {
            score += PHASE_NUMBERING_SCORE;
            reasons.push("Document is organized into numbered phases".to_string());
        }

        let cutoff = self.current_year - OLD_YEAR_AGE;
        let old_mentions = self
            .catalog
            .year_mention()
            .captures_iter(content)
            .filter_map(|c| c.get(1)?.as_str().parse::<i32>().ok())
            .filter(|&year| year <= cutoff)
            .count();
        if old_mentions >= OLD_YEAR_MIN_MENTIONS {
            score += OLD_YEARS_SCORE;
            reasons.push(format!(
                "Document mentions years {cutoff} or earlier {old_mentions} times"
            ));
        }

        if score == 0 {
            return CheckResult::default();
        }
        CheckResult::fired(score, reasons)
    }

    /// The last commit touching the file reads like a completion, stronger
    /// when it shares a word with the marker.
    pub fn git_check(&self, todo: &TodoItem) -> CheckResult {
        let Some(git) = self.git else {
            return CheckResult::default();
        };
        let Some(commit) = git.last_commit(&todo.file) else {
            return CheckResult::default();
        };
        if !self.catalog.completion_commit().is_match(&commit.subject) {
            return CheckResult::default();
        }
        let short = commit.hash.get(..7).unwrap_or(&commit.hash);
        let marker_words = significant_words(&todo.content);
        let shared = significant_words(&commit.subject)
            .intersection(&marker_words)
            .next()
            .is_some();
        if shared {
            CheckResult::fired(
                GIT_COMMIT_MATCH_SCORE,
                vec![format!(
                    "Last commit {short} ({}) mentions this work: \"{}\"",
                    commit.date.format("%Y-%m-%d"),
                    commit.subject
                )],
            )
        } else {
            CheckResult::fired(
                GIT_COMMIT_SCORE,
                vec![format!(
                    "Last commit {short} ({}) reads like a completion: \"{}\"",
                    commit.date.format("%Y-%m-%d"),
                    commit.subject
                )],
            )
        }
    }

    /// Score one marker against the full content of its file.
    pub fn analyze(&self, todo: TodoItem, content: &str) -> CompletionAnalysis {
        let checks = [
            (self.direct_check(&todo), DIRECT_WEIGHT),
            (self.context_check(&todo, content), CONTEXT_WEIGHT),
            (self.old_document_check(&todo, content), OLD_DOCUMENT_WEIGHT),
            (self.git_check(&todo), GIT_WEIGHT),
        ];

        let parts: Vec<(f64, f64)> = checks
            .iter()
            .filter(|(c, _)| c.fired)
            .map(|(c, w)| (c.confidence, *w))
            .collect();
        let confidence = calculate_confidence(&parts);
        let reasons = checks
            .into_iter()
            .filter(|(c, _)| c.fired)
            .flat_map(|(c, _)| c.reasons)
            .collect();

        CompletionAnalysis {
            todo,
            confidence,
            is_likely_completed: is_likely_completed(confidence),
            reasons,
            suggestions: suggestions_for(confidence),
        }
    }

    /// Score every marker in a scan, re-reading each file once. Markers in
    /// files that can no longer be read are skipped.
    pub fn analyze_scan(&self, scan: &ScanResult) -> Vec<CompletionAnalysis> {
        let mut analyses = Vec::with_capacity(scan.todos.len());
        let mut i = 0;
        while i < scan.todos.len() {
            let file = &scan.todos[i].file;
            let end = scan.todos[i..]
                .iter()
                .position(|t| &t.file != file)
                .map_or(scan.todos.len(), |n| i + n);

            let path = scan.root.join(file);
            match std::fs::read_to_string(&path) {
                Ok(content) => {
                    for todo in &scan.todos[i..end] {
                        analyses.push(self.analyze(todo.clone(), &content));
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        skipped = end - i,
                        "cannot read file; skipping its markers"
                    );
                }
            }
            i = end;
        }
        analyses
    }
}

/// Lines `line - radius ..= line + radius` (1-based, clamped) joined by
/// newlines.
pub fn context_window(content: &str, line: usize, radius: usize) -> String {
    let lines: Vec<&str> = content.lines().collect();
    if lines.is_empty() {
        return String::new();
    }
    let center = line.saturating_sub(1).min(lines.len() - 1);
    let start = center.saturating_sub(radius);
    let end = (center + radius).min(lines.len() - 1);
    lines[start..=end].join("\n")
}

/// At most the first `max_chars` characters of `content`.
fn header_of(content: &str, max_chars: usize) -> &str {
    match content.char_indices().nth(max_chars) {
        Some((idx, _)) => &content[..idx],
        None => content,
    }
}

fn significant_words(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 3)
        .map(str::to_lowercase)
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
