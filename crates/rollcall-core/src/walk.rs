//! Ignore-aware directory traversal.

use crate::config::ScanOptions;
use crate::error::{Result, RollcallError};
use crate::paths;
use crate::patterns::{CODE_EXTENSIONS, MARKDOWN_EXTENSIONS};
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use std::path::{Path, PathBuf};

/// Plain-text extensions scanned in addition to code and markdown.
pub const TEXT_EXTENSIONS: &[&str] = &["txt", "rst", "adoc", "org"];

/// Directories never descended into, whatever `.gitignore` says.
pub const BLOCKED_DIRS: &[&str] = &[
    "node_modules",
    ".git",
    "target",
    "dist",
    "build",
    "out",
    "coverage",
    ".next",
    ".nuxt",
    ".cache",
    "vendor",
    "__pycache__",
    ".venv",
    paths::ROLLCALL_DIR,
];

/// Generated or bundled artifacts that carry a scannable extension.
pub const BLOCKED_SUFFIXES: &[&str] = &[
    ".min.js",
    ".min.css",
    ".bundle.js",
    ".chunk.js",
    ".map",
    ".lock",
    "-lock.yaml",
    ".pb.go",
    ".generated.ts",
];

pub fn is_scannable_extension(path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    let ext = ext.to_ascii_lowercase();
    CODE_EXTENSIONS.contains(&ext.as_str())
        || MARKDOWN_EXTENSIONS.contains(&ext.as_str())
        || TEXT_EXTENSIONS.contains(&ext.as_str())
}

fn is_blocked_file(relative: &str) -> bool {
    let lower = relative.to_ascii_lowercase();
    BLOCKED_SUFFIXES.iter().any(|s| lower.ends_with(s))
}

/// Compile a list of globs into one matcher.
pub fn build_globset(patterns: &[String], case_insensitive: bool) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .case_insensitive(case_insensitive)
            .build()
            .map_err(|source| RollcallError::InvalidGlob {
                pattern: pattern.clone(),
                source,
            })?;
        builder.add(glob);
    }
    builder.build().map_err(|source| RollcallError::InvalidGlob {
        pattern: patterns.join(", "),
        source,
    })
}

// ---------------------------------------------------------------------------
// SourceFile
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Path relative to the walk root, `/`-separated.
    pub relative: String,
}

// ---------------------------------------------------------------------------
// FileWalker
// ---------------------------------------------------------------------------

pub struct FileWalker {
    root: PathBuf,
    include: Vec<String>,
    exclude: Vec<String>,
    use_gitignore: bool,
    max_depth: Option<usize>,
}

impl FileWalker {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            include: Vec::new(),
            exclude: Vec::new(),
            use_gitignore: true,
            max_depth: None,
        }
    }

    pub fn from_scan_options(root: impl Into<PathBuf>, options: &ScanOptions) -> Self {
        Self::new(root)
            .include(options.include.iter().cloned())
            .exclude(options.exclude.iter().cloned())
            .use_gitignore(options.use_gitignore)
            .max_depth(options.max_depth)
    }

    /// Add include patterns (e.g., `["src/**"]`)
    pub fn include(mut self, patterns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.include.extend(patterns.into_iter().map(Into::into));
        self
    }

    /// Add exclude patterns (e.g., `["fixtures/**"]`)
    pub fn exclude(mut self, patterns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.exclude.extend(patterns.into_iter().map(Into::into));
        self
    }

    pub fn use_gitignore(mut self, yes: bool) -> Self {
        self.use_gitignore = yes;
        self
    }

    pub fn max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    /// Every scannable file under the root, sorted by relative path.
    ///
    /// Fails only when the root itself is missing. Entries that can't be read
    /// are logged and skipped.
    pub fn walk(&self) -> Result<Vec<SourceFile>> {
        if !self.root.exists() {
            return Err(RollcallError::RootNotFound(
                self.root.display().to_string(),
            ));
        }
        if !self.root.is_dir() {
            return Err(RollcallError::RootNotDirectory(
                self.root.display().to_string(),
            ));
        }

        let include = build_globset(&self.include, false)?;
        let exclude = build_globset(&self.exclude, false)?;

        let walker = WalkBuilder::new(&self.root)
            .hidden(false)
            .git_ignore(self.use_gitignore)
            .git_global(self.use_gitignore)
            .git_exclude(self.use_gitignore)
            .ignore(self.use_gitignore)
            .parents(self.use_gitignore)
            .require_git(false)
            .max_depth(self.max_depth)
            .filter_entry(|entry| {
                let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
                !(entry.depth() > 0
                    && is_dir
                    && entry
                        .file_name()
                        .to_str()
                        .is_some_and(|name| BLOCKED_DIRS.contains(&name)))
            })
            .build();

        let mut files = Vec::new();
        for entry in walker {
            let entry = match entry {
                Ok(e) => e,
                Err(err) => {
                    tracing::warn!(error = %err, "skipping unreadable path");
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }

            let path = entry.path();
            if !is_scannable_extension(path) {
                continue;
            }
            let relative = paths::relative_slash_path(&self.root, path);
            if is_blocked_file(&relative) {
                continue;
            }
            if !self.include.is_empty() && !include.is_match(&relative) {
                continue;
            }
            if exclude.is_match(&relative) {
                continue;
            }

            files.push(SourceFile {
                path: path.to_path_buf(),
                relative,
            });
        }

        files.sort_by(|a, b| a.relative.cmp(&b.relative));
        tracing::debug!(root = %self.root.display(), count = files.len(), "walked source tree");
        Ok(files)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
