use crate::types::{Category, Priority};
use regex::Regex;
use std::path::Path;

// ---------------------------------------------------------------------------
// Extension tables
// ---------------------------------------------------------------------------

pub const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown", "mdx"];

/// Extensions whose TODOs live in comments. Markdown patterns are not applied
/// to these.
pub const CODE_EXTENSIONS: &[&str] = &[
    "rs", "ts", "tsx", "js", "jsx", "mjs", "cjs", "vue", "svelte", "go", "py", "rb", "java",
    "kt", "kts", "scala", "swift", "c", "h", "cc", "cpp", "cxx", "hpp", "cs", "php", "lua",
    "sh", "bash", "zsh", "ps1", "sql", "css", "scss", "sass", "less", "html", "htm", "xml",
    "yaml", "yml", "toml", "ini", "cfg", "conf", "dart", "ex", "exs", "erl", "hs", "ml", "clj",
    "r", "pl", "zig", "tf",
];

// ---------------------------------------------------------------------------
// FileKind
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Markdown,
    Code,
    Unknown,
}

impl FileKind {
    pub fn of(path: &Path) -> Self {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return FileKind::Unknown;
        };
        let ext = ext.to_ascii_lowercase();
        if MARKDOWN_EXTENSIONS.contains(&ext.as_str()) {
            FileKind::Markdown
        } else if CODE_EXTENSIONS.contains(&ext.as_str()) {
            FileKind::Code
        } else {
            FileKind::Unknown
        }
    }
}

// ---------------------------------------------------------------------------
// TodoPattern / CompletionIndicator
// ---------------------------------------------------------------------------

/// A marker pattern. Every regex exposes a `content` capture group holding
/// the text that follows the marker.
#[derive(Debug, Clone)]
pub struct TodoPattern {
    pub name: &'static str,
    pub regex: Regex,
    pub priority: Priority,
    pub category: Category,
}

/// A signal that a marker has already been dealt with.
///
/// Indicators with `context_required == false` are tested against the marker
/// text itself; the rest are tested against the lines surrounding it. On a
/// checklist item a `checkbox` indicator only reads the item's own box.
#[derive(Debug, Clone)]
pub struct CompletionIndicator {
    pub regex: Regex,
    pub confidence: u32,
    pub description: &'static str,
    pub context_required: bool,
    pub checkbox: bool,
}

// ---------------------------------------------------------------------------
// PatternCatalog
// ---------------------------------------------------------------------------

/// Read-only tables of every regex the scanner and analyzers use. Build it
/// once and hand out references.
#[derive(Debug, Clone)]
pub struct PatternCatalog {
    code: Vec<TodoPattern>,
    markdown_code: Vec<TodoPattern>,
    markdown: Vec<TodoPattern>,
    indicators: Vec<CompletionIndicator>,
    archive_paths: Vec<Regex>,
    outdated_header: Regex,
    phase_numbering: Regex,
    year_mention: Regex,
    completion_commit: Regex,
}

impl Default for PatternCatalog {
    fn default() -> Self {
        Self::new()
    }
}

// Patterns are compile-time constants; a failure here is a programming error.
fn re(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap()
}

const CODE_LEADERS: &str = r"//+|/\*+|\*|#|--|<!--|;+";

/// In markdown `#` opens a heading, which the `TODO Section` pattern owns.
const MARKDOWN_LEADERS: &str = r"//+|/\*+|\*|--|<!--|;+";

/// Comment leader followed by `marker`. The leader must start a line or
/// follow a space so `#TODO` hashtags are not read as comments.
fn comment_marker(marker: &str, leaders: &str) -> Regex {
    re(&format!(
        r"(?m)(?:^|[ \t])(?:{leaders})[ \t]*{marker}\b(?:\([^)\n]*\))?[ \t]*:?[ \t]*(?P<content>[^\n]*)$"
    ))
}

impl PatternCatalog {
    pub fn new() -> Self {
        let code_markers: [(&'static str, Priority); 8] = [
            ("TODO", Priority::Medium),
            ("FIXME", Priority::High),
            ("HACK", Priority::Medium),
            ("BUG", Priority::High),
            ("OPTIMIZE", Priority::Low),
            ("REFACTOR", Priority::Low),
            ("NOTE", Priority::Low),
            ("XXX", Priority::High),
        ];
        let comment_patterns = |leaders: &str| -> Vec<TodoPattern> {
            code_markers
                .iter()
                .map(|&(name, priority)| TodoPattern {
                    name,
                    regex: comment_marker(name, leaders),
                    priority,
                    category: Category::Code,
                })
                .collect()
        };
        let code = comment_patterns(CODE_LEADERS);
        let markdown_code = comment_patterns(MARKDOWN_LEADERS);

        let markdown = vec![
            TodoPattern {
                name: "Unchecked Task",
                regex: re(r"(?m)^[ \t]*[-*+][ \t]+\[[ xX]\][ \t]+(?P<content>[^\n]+)$"),
                priority: Priority::Medium,
                category: Category::Markdown,
            },
            TodoPattern {
                name: "TODO Section",
                regex: re(
                    r"(?mi)^#{1,6}[ \t]+(?:todo|to-do|tasks|action items|next steps)\b[ \t]*:?[ \t]*(?P<content>[^\n]*)$",
                ),
                priority: Priority::Medium,
                category: Category::Markdown,
            },
            TodoPattern {
                name: "Action Item",
                regex: re(
                    r"(?m)^[ \t]*(?:[-*+][ \t]+)?(?:\*\*)?(?:(?i:action item)|AI)(?:\*\*)?[ \t]*:(?:\*\*)?[ \t]*(?P<content>[^\n]+)$",
                ),
                priority: Priority::High,
                category: Category::Markdown,
            },
            TodoPattern {
                name: "Incomplete Note",
                regex: re(
                    r"(?m)(?P<content>(?:\bTBD\b|\bWIP\b|\b(?i:coming soon)\b|\[(?i:placeholder)\])[^\n]*)$",
                ),
                priority: Priority::Low,
                category: Category::Markdown,
            },
        ];

        let indicators = vec![
            CompletionIndicator {
                regex: re(r"\[[xX]\]"),
                confidence: 95,
                description: "Explicitly checked off with [x]",
                context_required: false,
                checkbox: true,
            },
            CompletionIndicator {
                regex: re(r"~~[^~\n]+~~"),
                confidence: 90,
                description: "Struck through with ~~strikethrough~~",
                context_required: false,
                checkbox: false,
            },
            CompletionIndicator {
                regex: re(r"[✓✔✅☑]"),
                confidence: 90,
                description: "Marked with a checkmark",
                context_required: false,
                checkbox: false,
            },
            CompletionIndicator {
                regex: re(
                    r"(?i)\b(?:completed|done|fixed|resolved|shipped|deployed|implemented|finished)\b",
                ),
                confidence: 70,
                description: "Completion language near the marker",
                context_required: true,
                checkbox: false,
            },
            CompletionIndicator {
                regex: re(
                    r"(?i)\bstatus[ \t]*:[ \t]*(?:done|complete|completed|closed|resolved|shipped)\b",
                ),
                confidence: 85,
                description: "Explicit done status near the marker",
                context_required: true,
                checkbox: false,
            },
            CompletionIndicator {
                regex: re(
                    r"(?i)\b(?:completed|done|fixed|shipped|deployed|resolved)[ \t]+(?:on|in)[ \t]+(?:\d{4}-\d{2}-\d{2}|(?:jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec)[a-z]*\.?[ \t]+(?:\d{1,2},?[ \t]+)?\d{4})",
                ),
                confidence: 80,
                description: "Dated completion note near the marker",
                context_required: true,
                checkbox: false,
            },
            CompletionIndicator {
                regex: re(r"(?i)\b(?:deprecated|archived|superseded|legacy)\b"),
                confidence: 60,
                description: "Deprecation language near the marker",
                context_required: true,
                checkbox: false,
            },
            CompletionIndicator {
                regex: re(r"(?i)(?:\bno longer (?:needed|required|relevant)\b|\bobsolete\b)"),
                confidence: 75,
                description: "Marked as no longer needed",
                context_required: true,
                checkbox: false,
            },
        ];

        let archive_paths = vec![
            re(r"(?i)(?:^|/)(?:archive|archives|archived|old|deprecated|legacy|backup|backups|obsolete)/"),
            re(r"(?i)\.(?:old|backup|bak|orig)\."),
            re(r"(?i)\.(?:old|backup|bak|orig)$"),
        ];

        Self {
            code,
            markdown_code,
            markdown,
            indicators,
            archive_paths,
            outdated_header: re(
                r"(?i)\b(?:outdated|superseded|deprecated|archived|historical|no longer maintained|obsolete)\b",
            ),
            phase_numbering: re(r"(?i)\bphase[ \t]+(?:\d+|one|two|three|four|five|i{1,3}|iv|v)\b"),
            year_mention: re(r"\b(20\d{2})\b"),
            completion_commit: re(
                r"(?i)\b(?:fix(?:es|ed)?|complete[sd]?|done|implement(?:s|ed)?|resolve[sd]?|close[sd]?)\b",
            ),
        }
    }

    pub fn code_patterns(&self) -> &[TodoPattern] {
        &self.code
    }

    pub fn markdown_patterns(&self) -> &[TodoPattern] {
        &self.markdown
    }

    /// Patterns that apply to `path`. Markdown also gets the comment markers,
    /// minus the `#` leader, so fenced code blocks are covered. Unknown
    /// extensions get everything.
    pub fn patterns_for(&self, path: &Path) -> Vec<&TodoPattern> {
        match FileKind::of(path) {
            FileKind::Code => self.code.iter().collect(),
            FileKind::Markdown => self.markdown_code.iter().chain(self.markdown.iter()).collect(),
            FileKind::Unknown => self.code.iter().chain(self.markdown.iter()).collect(),
        }
    }

    pub fn direct_indicators(&self) -> impl Iterator<Item = &CompletionIndicator> {
        self.indicators.iter().filter(|i| !i.context_required)
    }

    pub fn context_indicators(&self) -> impl Iterator<Item = &CompletionIndicator> {
        self.indicators.iter().filter(|i| i.context_required)
    }

    /// True if `path` (relative, `/`-separated) looks like superseded content.
    pub fn is_archive_path(&self, path: &str) -> bool {
        let normalized = path.replace('\\', "/");
        self.archive_paths.iter().any(|r| r.is_match(&normalized))
    }

    pub fn outdated_header(&self) -> &Regex {
        &self.outdated_header
    }

    pub fn phase_numbering(&self) -> &Regex {
        &self.phase_numbering
    }

    pub fn year_mention(&self) -> &Regex {
        &self.year_mention
    }

    /// Commit subjects that read like the work was finished.
    pub fn completion_commit(&self) -> &Regex {
        &self.completion_commit
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
