use crate::config::DetectionOptions;
use crate::error::Result;
use crate::patterns::FileKind;
use crate::types::FileAction;
use crate::walk::{build_globset, FileWalker, SourceFile};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One checklist entry from a planning document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    pub description: String,
    pub line: usize,
    pub checked: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlannedFile {
    pub path: String,
    pub action: FileAction,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanningDocument {
    /// Path relative to the project root.
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub features: Vec<Feature>,
    pub files: Vec<PlannedFile>,
}

// ---------------------------------------------------------------------------
// Regexes
// ---------------------------------------------------------------------------

const SOURCE_EXTENSIONS: &str =
    "ts|tsx|js|jsx|mjs|cjs|vue|svelte|rs|py|go|rb|java|kt|swift|c|h|cpp|cs|php|css|scss|html|md|json|yaml|yml|toml|sql|sh";

static CHECKLIST_RE: OnceLock<Regex> = OnceLock::new();
static VERIFICATION_START_RE: OnceLock<Regex> = OnceLock::new();
static VERIFICATION_PHRASE_RE: OnceLock<Regex> = OnceLock::new();
static LABELED_PATH_RE: OnceLock<Regex> = OnceLock::new();
static BACKTICK_PATH_RE: OnceLock<Regex> = OnceLock::new();

fn checklist_re() -> &'static Regex {
    CHECKLIST_RE.get_or_init(|| Regex::new(r"^\s*[-*]\s+\[([ xX])\]\s+(.+?)\s*$").unwrap())
}

fn verification_start_re() -> &'static Regex {
    VERIFICATION_START_RE
        .get_or_init(|| Regex::new(r"(?i)^(?:run|test|verify|check|ensure)\b").unwrap())
}

fn verification_phrase_re() -> &'static Regex {
    VERIFICATION_PHRASE_RE.get_or_init(|| {
        Regex::new(r"(?i)lighthouse score|git commit|documentation updated").unwrap()
    })
}

fn labeled_path_re() -> &'static Regex {
    LABELED_PATH_RE.get_or_init(|| {
        Regex::new(&format!(
            r"(?i)\b(?:file|path):\s*`?([^\s`]+\.(?:{SOURCE_EXTENSIONS}))\b`?"
        ))
        .unwrap()
    })
}

fn backtick_path_re() -> &'static Regex {
    BACKTICK_PATH_RE.get_or_init(|| {
        Regex::new(&format!(r"`(/[^`\s]+\.(?:{SOURCE_EXTENSIONS}))`")).unwrap()
    })
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Process steps ("run the tests", "git commit") rather than features.
pub fn is_verification_item(description: &str) -> bool {
    verification_start_re().is_match(description.trim())
        || verification_phrase_re().is_match(description)
}

pub fn parse_planning_document(path: &str, content: &str) -> PlanningDocument {
    let mut title = None;
    let mut features = Vec::new();
    let mut files: Vec<PlannedFile> = Vec::new();

    for (idx, line) in content.lines().enumerate() {
        let line_no = idx + 1;

        if title.is_none() {
            if let Some(rest) = line.strip_prefix("# ") {
                let rest = rest.trim();
                if !rest.is_empty() {
                    title = Some(rest.to_string());
                }
            }
        }

        if let Some(caps) = checklist_re().captures(line) {
            let description = caps[2].to_string();
            if !is_verification_item(&description) {
                features.push(Feature {
                    description,
                    line: line_no,
                    checked: &caps[1] != " ",
                });
            }
        }

        let action = if line.contains("NEW:") {
            FileAction::Create
        } else {
            FileAction::Modify
        };
        let referenced = labeled_path_re()
            .captures_iter(line)
            .chain(backtick_path_re().captures_iter(line))
            .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()));
        for path in referenced {
            if files.iter().any(|f| f.path == path) {
                continue;
            }
            files.push(PlannedFile {
                path,
                action,
                line: line_no,
            });
        }
    }

    PlanningDocument {
        path: path.to_string(),
        title,
        features,
        files,
    }
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// Markdown files under `root` matching the configured planning globs.
pub fn find_planning_documents(root: &Path, options: &DetectionOptions) -> Result<Vec<SourceFile>> {
    let planning = build_globset(&options.planning_paths, true)?;
    let files = FileWalker::new(root)
        .exclude(options.exclude.iter().cloned())
        .use_gitignore(options.use_gitignore)
        .walk()?;
    Ok(files
        .into_iter()
        .filter(|f| FileKind::of(&f.path) == FileKind::Markdown)
        .filter(|f| planning.is_match(&f.relative))
        .collect())
}

/// Parse each file, skipping (with a warning) any that can't be read.
pub fn load_planning_documents(files: &[SourceFile]) -> Vec<PlanningDocument> {
    files
        .iter()
        .filter_map(|file| match std::fs::read_to_string(&file.path) {
            Ok(content) => Some(parse_planning_document(&file.relative, &content)),
            Err(e) => {
                tracing::warn!(
                    path = %file.path.display(),
                    error = %e,
                    "skipping unreadable planning document"
                );
                None
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PLAN: &str = "\
# Checkout Revamp

Intro text.

## Tasks
- [ ] Implement Foo widget
  File: /src/foo.ts
- [x] Add PaymentForm component
  NEW: `/src/components/PaymentForm.tsx`
- [ ] Run the full test suite
- [ ] Verify on staging
- [ ] Lighthouse score above 90
- [ ] Make a git commit
* [ ] Cache exchange rates
Path: src/rates.rs
";

    #[test]
    fn extracts_title_features_and_files() {
        let doc = parse_planning_document("docs/PLAN.md", PLAN);
        assert_eq!(doc.title.as_deref(), Some("Checkout Revamp"));

        let descriptions: Vec<_> = doc.features.iter().map(|f| f.description.as_str()).collect();
        assert_eq!(
            descriptions,
            vec![
                "Implement Foo widget",
                "Add PaymentForm component",
                "Cache exchange rates"
            ]
        );
        assert_eq!(doc.features[0].line, 6);
        assert!(!doc.features[0].checked);
        assert!(doc.features[1].checked);

        let files: Vec<_> = doc
            .files
            .iter()
            .map(|f| (f.path.as_str(), f.action))
            .collect();
        assert_eq!(
            files,
            vec![
                ("/src/foo.ts", FileAction::Modify),
                ("/src/components/PaymentForm.tsx", FileAction::Create),
                ("src/rates.rs", FileAction::Modify),
            ]
        );
    }

    #[test]
    fn verification_items() {
        assert!(is_verification_item("Run cargo test"));
        assert!(is_verification_item("test the login flow"));
        assert!(is_verification_item("Ensure CI is green"));
        assert!(is_verification_item("Documentation updated"));
        assert!(!is_verification_item("Testimonials carousel"));
        assert!(!is_verification_item("Add checkout page"));
    }

    #[test]
    fn document_without_heading_has_no_title() {
        let doc = parse_planning_document("x.md", "## Sub\n- [ ] Thing\n");
        assert!(doc.title.is_none());
        assert_eq!(doc.features.len(), 1);
    }

    #[test]
    fn duplicate_file_references_are_merged() {
        let doc = parse_planning_document(
            "x.md",
            "File: /src/a.ts\nsee `/src/a.ts` again\n",
        );
        assert_eq!(doc.files.len(), 1);
    }

    #[test]
    fn discovers_planning_docs_case_insensitively() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("docs")).unwrap();
        std::fs::write(dir.path().join("docs/Q3-PLAN.md"), "# Q3\n").unwrap();
        std::fs::write(dir.path().join("ROADMAP.md"), "# Roadmap\n").unwrap();
        std::fs::write(dir.path().join("README.md"), "# Readme\n").unwrap();
        std::fs::write(dir.path().join("plan.ts"), "// not markdown\n").unwrap();

        let files = find_planning_documents(dir.path(), &DetectionOptions::default()).unwrap();
        let rel: Vec<_> = files.iter().map(|f| f.relative.as_str()).collect();
        assert_eq!(rel, vec!["ROADMAP.md", "docs/Q3-PLAN.md"]);

        let docs = load_planning_documents(&files);
        assert_eq!(docs[1].title.as_deref(), Some("Q3"));
    }

    #[test]
    fn unreadable_planning_docs_are_skipped() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("PLAN.md"), "# Launch\n- [ ] Ship it\n").unwrap();
        std::fs::write(dir.path().join("todo-notes.md"), [0xff, 0xfe, b'\n']).unwrap();
        let files = vec![
            SourceFile {
                path: dir.path().join("gone-plan.md"),
                relative: "gone-plan.md".to_string(),
            },
            SourceFile {
                path: dir.path().join("todo-notes.md"),
                relative: "todo-notes.md".to_string(),
            },
            SourceFile {
                path: dir.path().join("PLAN.md"),
                relative: "PLAN.md".to_string(),
            },
        ];

        let docs = load_planning_documents(&files);
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].path, "PLAN.md");
        assert_eq!(docs[0].features.len(), 1);
    }
}
