//! Cross-reference planning-document features against the codebase.
//!
//! Evidence comes from four places: planned files that exist, keyword hits,
//! import statements naming the feature's component, and test files named
//! after it. Confidence is tiered rather than averaged:
//!
//! | evidence                           | confidence                                   |
//! |------------------------------------|----------------------------------------------|
//! | files and (usages or tests)        | 80 + usage bonus (≤15) + 10 if tested + pattern bonus (≤10) |
//! | files only                         | 60 + pattern bonus (≤10)                     |
//! | usages or tests, no files          | 50 + usage bonus (≤20) + 5 if tested         |
//! | keyword hits only                  | 10 per hit, at most 40                       |
//! | nothing                            | 0                                            |
//!
//! This scale is not the completion analyzer's. Here 40 already means
//! "implemented", because existing at all is what is being measured.

use crate::config::{DetectionOptions, DEFAULT_MAX_FILE_SIZE};
use crate::error::Result;
use crate::patterns::FileKind;
use crate::planning::{Feature, PlannedFile, PlanningDocument};
use crate::types::FeatureStatus;
use crate::walk::FileWalker;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Every keyword hit carries this confidence.
pub const PATTERN_MATCH_CONFIDENCE: u32 = 50;

const MAX_PATTERN_MATCHES: usize = 25;

const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "and", "or", "but", "for", "with", "without", "from", "into", "onto", "that",
    "this", "these", "those", "will", "should", "must", "can", "could", "would", "when", "then",
    "than", "them", "they", "their", "there", "have", "has", "been", "being", "were", "was", "are",
    "is", "be", "to", "of", "in", "on", "at", "by", "as", "it", "its", "all", "any", "each",
    "some", "more", "most", "also", "just", "only", "new", "add", "adds", "added", "create",
    "creates", "implement", "implements", "update", "updates", "make", "makes", "use", "using",
    "support", "feature", "features", "page", "file", "files", "code", "into", "via", "per",
];

// ---------------------------------------------------------------------------
// Evidence types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatternMatch {
    pub file: String,
    pub line: usize,
    pub keyword: String,
    pub confidence: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportUsage {
    pub file: String,
    pub line: usize,
    pub text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImplementationEvidence {
    pub files_found: Vec<String>,
    pub pattern_matches: Vec<PatternMatch>,
    pub tests_found: Vec<String>,
    pub import_usages: Vec<ImportUsage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<DateTime<Utc>>,
}

impl ImplementationEvidence {
    pub fn is_empty(&self) -> bool {
        self.files_found.is_empty()
            && self.pattern_matches.is_empty()
            && self.tests_found.is_empty()
            && self.import_usages.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureDetection {
    /// Planning document the feature came from.
    pub document: String,
    pub feature: Feature,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub component: Option<String>,
    pub keywords: Vec<String>,
    pub evidence: ImplementationEvidence,
    pub status: FeatureStatus,
    pub confidence: u32,
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

pub fn calculate_feature_confidence(evidence: &ImplementationEvidence) -> u32 {
    let files = !evidence.files_found.is_empty();
    let usages = evidence.import_usages.len() as u32;
    let tested = !evidence.tests_found.is_empty();
    let patterns = evidence.pattern_matches.len() as u32;
    let pattern_bonus = (patterns * 2).min(10);

    let score = if files && (usages > 0 || tested) {
        80 + (usages * 5).min(15) + if tested { 10 } else { 0 } + pattern_bonus
    } else if files {
        60 + pattern_bonus
    } else if usages > 0 || tested {
        50 + (usages * 5).min(20) + if tested { 5 } else { 0 }
    } else if patterns > 0 {
        (patterns * 10).min(40)
    } else {
        0
    };
    score.min(100)
}

// ---------------------------------------------------------------------------
// Keywords
// ---------------------------------------------------------------------------

fn is_stop_word(word: &str) -> bool {
    STOP_WORDS.contains(&word.to_lowercase().as_str())
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Lowercase search words (stop words and short words dropped) followed by
/// PascalCase and camelCase joins of the non-stop words.
pub fn extract_keywords(description: &str) -> Vec<String> {
    let words: Vec<&str> = description
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .filter(|w| !is_stop_word(w))
        .collect();

    let mut keywords: Vec<String> = Vec::new();
    for word in &words {
        let lower = word.to_lowercase();
        if lower.chars().count() > 3 && !keywords.contains(&lower) {
            keywords.push(lower);
        }
    }

    if words.len() > 1 {
        let pascal: String = words.iter().map(|w| capitalize(&w.to_lowercase())).collect();
        let mut camel = words[0].to_lowercase();
        camel.extend(words[1..].iter().map(|w| capitalize(&w.to_lowercase())));
        for variant in [pascal, camel] {
            if !keywords.contains(&variant) {
                keywords.push(variant);
            }
        }
    }
    keywords
}

static PASCAL_RE: OnceLock<Regex> = OnceLock::new();
static CAPITALIZED_RE: OnceLock<Regex> = OnceLock::new();

fn pascal_re() -> &'static Regex {
    PASCAL_RE.get_or_init(|| Regex::new(r"\b[A-Z][a-z0-9]+(?:[A-Z][a-z0-9]*)+\b").unwrap())
}

fn capitalized_re() -> &'static Regex {
    CAPITALIZED_RE.get_or_init(|| Regex::new(r"\b[A-Z][A-Za-z0-9]+\b").unwrap())
}

/// A component-like identifier in the description: a PascalCase word, or
/// failing that a capitalized word that isn't the leading verb or a stop
/// word.
pub fn component_name(description: &str) -> Option<String> {
    if let Some(m) = pascal_re().find(description) {
        return Some(m.as_str().to_string());
    }
    capitalized_re()
        .find_iter(description)
        .filter(|m| m.start() > 0)
        .map(|m| m.as_str())
        .find(|w| !is_stop_word(w))
        .map(str::to_string)
}

/// Test files by naming convention or location.
pub fn is_test_file(relative: &str) -> bool {
    let lower = relative.to_lowercase();
    let name = lower.rsplit('/').next().unwrap_or(&lower);
    name.contains(".test.")
        || name.contains(".spec.")
        || name.contains("_test.")
        || name.starts_with("test_")
        || lower.starts_with("tests/")
        || lower.contains("/tests/")
        || lower.contains("__tests__/")
}

fn import_re(component: &str) -> Option<Regex> {
    let name = regex::escape(component);
    Regex::new(&format!(
        r"(?i)^\s*(?:import\b.*\b{name}\b|export\b.*\bfrom\b.*\b{name}\b|(?:pub\s+)?use\s+.*\b{name}\b|from\s+\S*\b{name}\b.*\bimport\b|from\s+\S+\s+import\b.*\b{name}\b|.*\brequire\(\s*['\x22][^'\x22]*\b{name}\b)"
    ))
    .ok()
}

// ---------------------------------------------------------------------------
// FeatureDetector
// ---------------------------------------------------------------------------

struct IndexedFile {
    relative: String,
    content: String,
}

/// Holds the source tree in memory so every feature is checked against the
/// same snapshot.
pub struct FeatureDetector {
    root: PathBuf,
    files: Vec<IndexedFile>,
}

impl FeatureDetector {
    /// Index every non-markdown source file under `root`.
    pub fn new(root: &Path, options: &DetectionOptions) -> Result<Self> {
        let walked = FileWalker::new(root)
            .exclude(options.exclude.iter().cloned())
            .use_gitignore(options.use_gitignore)
            .walk()?;

        let mut files = Vec::new();
        for file in walked {
            if FileKind::of(&file.path) == FileKind::Markdown {
                continue;
            }
            let too_big = std::fs::metadata(&file.path)
                .map(|m| m.len() > DEFAULT_MAX_FILE_SIZE)
                .unwrap_or(false);
            if too_big {
                tracing::warn!(path = %file.path.display(), "skipping oversized file");
                continue;
            }
            match std::fs::read_to_string(&file.path) {
                Ok(content) => files.push(IndexedFile {
                    relative: file.relative,
                    content,
                }),
                Err(e) => {
                    tracing::warn!(path = %file.path.display(), error = %e, "skipping unreadable file");
                }
            }
        }
        tracing::debug!(files = files.len(), "indexed source tree");

        Ok(Self {
            root: root.to_path_buf(),
            files,
        })
    }

    /// Check every feature in `doc`. Planned files are attributed to the
    /// feature whose checklist line precedes them.
    pub fn detect_document(&self, doc: &PlanningDocument) -> Vec<FeatureDetection> {
        doc.features
            .iter()
            .enumerate()
            .map(|(i, feature)| {
                let next_line = doc
                    .features
                    .get(i + 1)
                    .map_or(usize::MAX, |next| next.line);
                let planned: Vec<&PlannedFile> = doc
                    .files
                    .iter()
                    .filter(|f| f.line >= feature.line && f.line < next_line)
                    .collect();
                self.detect_feature(&doc.path, feature, &planned)
            })
            .collect()
    }

    pub fn detect_feature(
        &self,
        document: &str,
        feature: &Feature,
        planned: &[&PlannedFile],
    ) -> FeatureDetection {
        let keywords = extract_keywords(&feature.description);
        let component = component_name(&feature.description);

        let mut evidence = ImplementationEvidence::default();
        let mut modified: Vec<DateTime<Utc>> = Vec::new();
        for file in planned {
            if let Some((display, path)) = self.resolve_planned(&file.path) {
                if let Some(time) = modified_time(&path) {
                    modified.push(time);
                }
                if !evidence.files_found.contains(&display) {
                    evidence.files_found.push(display);
                }
            }
        }
        evidence.last_modified = modified.into_iter().max();
        evidence.pattern_matches = self.find_keywords(&keywords);

        if let Some(name) = &component {
            evidence.import_usages = self.find_imports(name, &evidence.files_found);
            evidence.tests_found = self.find_tests(name);
        }

        let confidence = calculate_feature_confidence(&evidence);
        FeatureDetection {
            document: document.to_string(),
            feature: feature.clone(),
            component,
            keywords,
            evidence,
            status: FeatureStatus::from_confidence(confidence),
            confidence,
        }
    }

    /// Resolve a planned path: absolute, or relative to the root with or
    /// without its leading slash.
    fn resolve_planned(&self, planned: &str) -> Option<(String, PathBuf)> {
        let as_given = Path::new(planned);
        let candidates = [
            self.root.join(planned.trim_start_matches('/')),
            as_given.to_path_buf(),
            self.root.join(as_given),
        ];
        candidates
            .into_iter()
            .find(|p| p.is_file())
            .map(|p| (crate::paths::relative_slash_path(&self.root, &p), p))
    }

    fn find_keywords(&self, keywords: &[String]) -> Vec<PatternMatch> {
        let mut matches = Vec::new();
        for keyword in keywords {
            let lower = keyword.to_lowercase();
            let case_sensitive = keyword.chars().any(char::is_uppercase);
            for file in &self.files {
                let hit = file.content.lines().enumerate().find(|(_, line)| {
                    if case_sensitive {
                        line.contains(keyword.as_str())
                    } else {
                        line.to_lowercase().contains(&lower)
                    }
                });
                if let Some((idx, _)) = hit {
                    matches.push(PatternMatch {
                        file: file.relative.clone(),
                        line: idx + 1,
                        keyword: keyword.clone(),
                        confidence: PATTERN_MATCH_CONFIDENCE,
                    });
                    if matches.len() >= MAX_PATTERN_MATCHES {
                        return matches;
                    }
                }
            }
        }
        matches
    }

    /// Import lines naming `component`, outside test files and the planned
    /// files themselves.
    fn find_imports(&self, component: &str, own_files: &[String]) -> Vec<ImportUsage> {
        let Some(re) = import_re(component) else {
            return Vec::new();
        };
        let mut usages = Vec::new();
        for file in &self.files {
            if is_test_file(&file.relative) || own_files.contains(&file.relative) {
                continue;
            }
            for (idx, line) in file.content.lines().enumerate() {
                if re.is_match(line) {
                    usages.push(ImportUsage {
                        file: file.relative.clone(),
                        line: idx + 1,
                        text: line.trim().to_string(),
                    });
                }
            }
        }
        usages
    }

    fn find_tests(&self, component: &str) -> Vec<String> {
        let needle = component.to_lowercase();
        self.files
            .iter()
            .filter(|f| is_test_file(&f.relative))
            .filter(|f| {
                f.relative
                    .rsplit('/')
                    .next()
                    .is_some_and(|name| name.to_lowercase().contains(&needle))
            })
            .map(|f| f.relative.clone())
            .collect()
    }
}

fn modified_time(path: &Path) -> Option<DateTime<Utc>> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    Some(DateTime::<Utc>::from(modified))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
