use crate::config::ScanOptions;
use crate::error::Result;
use crate::patterns::PatternCatalog;
use crate::todo::{checkbox_state, normalize_content, TodoItem, UNCHECKED_TASK};
use crate::walk::{FileWalker, SourceFile};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

// ---------------------------------------------------------------------------
// ScanSummary / ScanResult
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub total: usize,
    pub by_priority: BTreeMap<String, usize>,
    pub by_type: BTreeMap<String, usize>,
    pub by_file: BTreeMap<String, usize>,
    pub files_scanned: usize,
    pub files_skipped: usize,
    pub elapsed_ms: u64,
}

impl ScanSummary {
    fn from_items(items: &[TodoItem]) -> Self {
        let mut summary = ScanSummary {
            total: items.len(),
            ..Default::default()
        };
        for item in items {
            *summary
                .by_priority
                .entry(item.priority.to_string())
                .or_default() += 1;
            *summary.by_type.entry(item.kind.clone()).or_default() += 1;
            *summary.by_file.entry(item.file.clone()).or_default() += 1;
        }
        summary
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanResult {
    pub root: PathBuf,
    pub todos: Vec<TodoItem>,
    pub summary: ScanSummary,
}

// ---------------------------------------------------------------------------
// Extraction
// ---------------------------------------------------------------------------

/// 1-based line holding byte `offset`. Multi-line matches belong to the line
/// they start on.
pub fn line_at_offset(content: &str, offset: usize) -> usize {
    let end = offset.min(content.len());
    content.as_bytes()[..end]
        .iter()
        .filter(|&&b| b == b'\n')
        .count()
        + 1
}

/// Every marker in `content`, ordered by position.
pub fn extract_todos(catalog: &PatternCatalog, relative: &str, content: &str) -> Vec<TodoItem> {
    let mut found: Vec<(usize, TodoItem)> = Vec::new();
    for pattern in catalog.patterns_for(Path::new(relative)) {
        for caps in pattern.regex.captures_iter(content) {
            let Some(whole) = caps.get(0) else { continue };
            let start = whole.start() + (whole.len() - whole.as_str().trim_start().len());
            let body = caps.name("content").map(|m| m.as_str()).unwrap_or("");
            let mut text = normalize_content(body);
            if text.is_empty() {
                text = pattern.name.to_string();
            }
            found.push((
                start,
                TodoItem {
                    kind: pattern.name.to_string(),
                    content: text,
                    file: relative.to_string(),
                    line: line_at_offset(content, start),
                    priority: pattern.priority,
                    category: pattern.category,
                    raw_text: whole.as_str().trim().to_string(),
                },
            ));
        }
    }
    found.sort_by_key(|(start, _)| *start);
    found.into_iter().map(|(_, item)| item).collect()
}

/// True if the item is already checked off.
///
/// Checklist items only look at their own checkbox; any other marker counts
/// as completed when an `[x]` appears anywhere in its text.
pub fn is_completed_marker(item: &TodoItem) -> bool {
    if item.kind == UNCHECKED_TASK {
        return checkbox_state(&item.raw_text) == Some(true);
    }
    item.raw_text.contains("[x]") || item.raw_text.contains("[X]")
}

pub fn filter_todos(
    items: Vec<TodoItem>,
    options: &ScanOptions,
    catalog: &PatternCatalog,
) -> Vec<TodoItem> {
    items
        .into_iter()
        .filter(|item| options.include_completed || !is_completed_marker(item))
        .filter(|item| !options.exclude_archives || !catalog.is_archive_path(&item.file))
        .collect()
}

// ---------------------------------------------------------------------------
// Scanner
// ---------------------------------------------------------------------------

pub struct Scanner<'a> {
    catalog: &'a PatternCatalog,
    options: &'a ScanOptions,
}

impl<'a> Scanner<'a> {
    pub fn new(catalog: &'a PatternCatalog, options: &'a ScanOptions) -> Self {
        Self { catalog, options }
    }

    /// Walk `root` and extract every marker.
    pub fn scan(&self, root: &Path) -> Result<ScanResult> {
        let started = Instant::now();
        let files = FileWalker::from_scan_options(root, self.options).walk()?;
        let mut result = self.scan_files(root, &files);
        result.summary.elapsed_ms = started.elapsed().as_millis() as u64;
        Ok(result)
    }

    /// Extract markers from an already-walked file list.
    pub fn scan_files(&self, root: &Path, files: &[SourceFile]) -> ScanResult {
        let started = Instant::now();
        let mut todos = Vec::new();
        let mut scanned = 0;
        let mut skipped = 0;

        for file in files {
            match read_scannable(&file.path, self.options.max_file_size) {
                Some(content) => {
                    scanned += 1;
                    todos.extend(extract_todos(self.catalog, &file.relative, &content));
                }
                None => skipped += 1,
            }
        }

        let todos = filter_todos(todos, self.options, self.catalog);
        let mut summary = ScanSummary::from_items(&todos);
        summary.files_scanned = scanned;
        summary.files_skipped = skipped;
        summary.elapsed_ms = started.elapsed().as_millis() as u64;

        tracing::debug!(
            files = scanned,
            skipped,
            todos = summary.total,
            "scan complete"
        );

        ScanResult {
            root: root.to_path_buf(),
            todos,
            summary,
        }
    }
}

/// Read a file for scanning, or log why it was skipped.
fn read_scannable(path: &Path, max_size: u64) -> Option<String> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.len() > max_size => {
            tracing::warn!(
                path = %path.display(),
                size = meta.len(),
                limit = max_size,
                "skipping file above size limit"
            );
            return None;
        }
        Ok(_) => {}
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "skipping unreadable file");
            return None;
        }
    }
    match std::fs::read_to_string(path) {
        Ok(content) => Some(content),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "skipping unreadable file");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Priority;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, body: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, body).unwrap();
    }

    fn scan(root: &Path, options: &ScanOptions) -> ScanResult {
        let catalog = PatternCatalog::new();
        Scanner::new(&catalog, options).scan(root).unwrap()
    }

    #[test]
    fn line_numbers_follow_match_start() {
        let content = "a\nb\nc // TODO: x\n";
        assert_eq!(line_at_offset(content, 0), 1);
        assert_eq!(line_at_offset(content, 2), 2);
        assert_eq!(line_at_offset(content, content.find("TODO").unwrap()), 3);
        assert_eq!(line_at_offset(content, 10_000), 4);
    }

    #[test]
    fn todo_on_line_five() {
        let catalog = PatternCatalog::new();
        let content = "fn a() {}\n\nfn b() {}\n\n    // TODO: fix this\n";
        let items = extract_todos(&catalog, "src/lib.rs", content);
        assert_eq!(items.len(), 1);
        let todo = &items[0];
        assert_eq!(todo.kind, "TODO");
        assert_eq!(todo.line, 5);
        assert_eq!(todo.priority, Priority::Medium);
        assert_eq!(todo.content, "fix this");
        assert_eq!(todo.raw_text, "// TODO: fix this");
    }

    #[test]
    fn items_ordered_by_position_across_patterns() {
        let catalog = PatternCatalog::new();
        let content = "// FIXME: one\n// TODO: two\n// BUG: three\n";
        let items = extract_todos(&catalog, "a.ts", content);
        let kinds: Vec<_> = items.iter().map(|i| i.kind.as_str()).collect();
        assert_eq!(kinds, vec!["FIXME", "TODO", "BUG"]);
        assert_eq!(items[0].priority, Priority::High);
    }

    #[test]
    fn markdown_gets_code_and_checklist_patterns() {
        let catalog = PatternCatalog::new();
        let content = "# Plan\n\n- [ ] Write docs\n\n```js\n// TODO: inline\n```\n";
        let items = extract_todos(&catalog, "PLAN.md", content);
        let kinds: Vec<_> = items.iter().map(|i| i.kind.as_str()).collect();
        assert_eq!(kinds, vec!["Unchecked Task", "TODO"]);
        assert_eq!(items[0].line, 3);
        assert_eq!(items[1].line, 6);
    }

    #[test]
    fn code_files_ignore_markdown_patterns() {
        let catalog = PatternCatalog::new();
        let items = extract_todos(&catalog, "a.py", "x = '- [ ] not a task'\n");
        assert!(items.is_empty());
    }

    #[test]
    fn checked_items_dropped_by_default() {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "TASKS.md",
            "- [x] Ship feature X\n- [ ] Support [x] coordinates\n<!-- TODO: [x] old -->\n",
        );
        let result = scan(dir.path(), &ScanOptions::default());
        let contents: Vec<_> = result.todos.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["Support [x] coordinates"]);

        let options = ScanOptions {
            include_completed: true,
            ..Default::default()
        };
        let result = scan(dir.path(), &options);
        assert_eq!(result.todos.len(), 3);
        assert_eq!(result.todos[0].kind, "Unchecked Task");
        assert_eq!(result.todos[0].content, "Ship feature X");
    }

    #[test]
    fn archive_only_tree_yields_nothing_when_excluded() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "archive/2022-old-plan/notes.md", "- [ ] Migrate\n");
        write(dir.path(), "archive/2022-old-plan/main.ts", "// TODO: remove\n");

        let options = ScanOptions {
            exclude_archives: true,
            ..Default::default()
        };
        let result = scan(dir.path(), &options);
        assert!(result.todos.is_empty());
        assert_eq!(result.summary.files_scanned, 2);

        let result = scan(dir.path(), &ScanOptions::default());
        assert_eq!(result.todos.len(), 2);
    }

    #[test]
    fn ignored_files_produce_no_items() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), ".gitignore", "secret/\n");
        write(dir.path(), "secret/a.rs", "// TODO: hidden\n");
        write(dir.path(), "node_modules/x/index.js", "// TODO: vendored\n");
        write(dir.path(), "src/a.rs", "// TODO: visible\n");
        let result = scan(dir.path(), &ScanOptions::default());
        assert_eq!(result.todos.len(), 1);
        assert_eq!(result.todos[0].file, "src/a.rs");
    }

    #[test]
    fn oversized_files_are_skipped() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "big.rs", &"// TODO: big\n".repeat(100));
        write(dir.path(), "small.rs", "// TODO: small\n");
        let options = ScanOptions {
            max_file_size: 64,
            ..Default::default()
        };
        let result = scan(dir.path(), &options);
        assert_eq!(result.todos.len(), 1);
        assert_eq!(result.summary.files_skipped, 1);
    }

    #[test]
    fn non_utf8_files_are_skipped_and_scan_continues() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("bad.rs"), [0xff, 0xfe, 0x00, b'\n']).unwrap();
        write(dir.path(), "good.rs", "// TODO: still found
");
        let result = scan(dir.path(), &ScanOptions::default());
        let files: Vec<_> = result.todos.iter().map(|t| t.file.as_str()).collect();
        assert_eq!(files, vec!["good.rs"]);
        assert_eq!(result.summary.files_scanned, 1);
        assert_eq!(result.summary.files_skipped, 1);
    }

    #[test]
    fn markdown_h1_todo_is_counted_once() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "NOTES.md", "# TODO: launch checklist
");
        let result = scan(dir.path(), &ScanOptions::default());
        assert_eq!(result.todos.len(), 1);
        assert_eq!(result.todos[0].kind, "TODO Section");
        assert_eq!(result.todos[0].content, "launch checklist");
        assert_eq!(result.summary.by_type.get("TODO"), None);
    }

    #[test]
    fn summary_counts() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.rs", "// TODO: a\n// FIXME: b\n");
        write(dir.path(), "b.rs", "// TODO: c\n");
        let result = scan(dir.path(), &ScanOptions::default());
        let s = &result.summary;
        assert_eq!(s.total, 3);
        assert_eq!(s.by_priority["medium"], 2);
        assert_eq!(s.by_priority["high"], 1);
        assert_eq!(s.by_type["TODO"], 2);
        assert_eq!(s.by_file["a.rs"], 2);
        assert_eq!(s.files_scanned, 2);
        let files: Vec<_> = result.todos.iter().map(|t| t.file.as_str()).collect();
        assert_eq!(files, vec!["a.rs", "a.rs", "b.rs"]);
    }

    #[test]
    fn rescans_are_stable() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.rs", "// TODO: a\n\n// HACK: b\n");
        let first = scan(dir.path(), &ScanOptions::default());
        let second = scan(dir.path(), &ScanOptions::default());
        let h1: Vec<_> = first.todos.iter().map(TodoItem::hash).collect();
        let h2: Vec<_> = second.todos.iter().map(TodoItem::hash).collect();
        assert_eq!(h1, h2);
    }
}
