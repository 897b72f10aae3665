//! File history signals from git.
//!
//! Everything here degrades to "no evidence": a missing binary, a directory
//! outside any repository, or a failing command all produce `None` / empty
//! results instead of errors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::process::Command;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitInfo {
    pub hash: String,
    pub date: DateTime<Utc>,
    pub subject: String,
}

// ---------------------------------------------------------------------------
// GitInfoProvider
// ---------------------------------------------------------------------------

/// Source of git history for the completion analyzer.
pub trait GitInfoProvider {
    /// Most recent commit touching `relative` (a path under the root).
    fn last_commit(&self, relative: &str) -> Option<CommitInfo>;
}

/// Provider for roots that are not repositories.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGit;

impl GitInfoProvider for NoGit {
    fn last_commit(&self, _relative: &str) -> Option<CommitInfo> {
        None
    }
}

/// Provider that shells out to the `git` CLI.
#[derive(Debug, Clone)]
pub struct GitCli {
    root: PathBuf,
}

impl GitCli {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// A boxed provider for `root`: the CLI-backed one when git is installed
    /// and `root` is inside a work tree, [`NoGit`] otherwise.
    pub fn detect(root: &Path) -> Box<dyn GitInfoProvider> {
        if which::which("git").is_err() {
            tracing::debug!("git not found on PATH; git evidence disabled");
            return Box::new(NoGit);
        }
        let cli = GitCli::new(root);
        match cli.run(&["rev-parse", "--is-inside-work-tree"]) {
            Some(out) if out.trim() == "true" => Box::new(cli),
            _ => {
                tracing::debug!(root = %root.display(), "not a git work tree; git evidence disabled");
                Box::new(NoGit)
            }
        }
    }

    /// Run git in the root, returning stdout on success. Returns None on any
    /// error.
    fn run(&self, args: &[&str]) -> Option<String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .output()
            .ok()?;
        if output.status.success() {
            Some(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            tracing::debug!(
                args = ?args,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "git command failed"
            );
            None
        }
    }

    fn run_trimmed(&self, args: &[&str]) -> Option<String> {
        let out = self.run(args)?;
        let out = out.trim();
        if out.is_empty() {
            None
        } else {
            Some(out.to_string())
        }
    }
}

impl GitInfoProvider for GitCli {
    fn last_commit(&self, relative: &str) -> Option<CommitInfo> {
        let out = self.run_trimmed(&["log", "-1", "--format=%H%x1f%cI%x1f%s", "--", relative])?;
        parse_commit_line(&out)
    }
}

/// Parse one `%H%x1f%cI%x1f%s` log line.
pub fn parse_commit_line(line: &str) -> Option<CommitInfo> {
    let mut parts = line.splitn(3, '\u{1f}');
    let hash = parts.next()?.trim().to_string();
    let date = DateTime::parse_from_rfc3339(parts.next()?.trim())
        .ok()?
        .with_timezone(&Utc);
    let subject = parts.next().unwrap_or("").trim().to_string();
    if hash.is_empty() {
        return None;
    }
    Some(CommitInfo {
        hash,
        date,
        subject,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parses_log_line() {
        let line = "abc123\u{1f}2024-03-01T10:00:00+02:00\u{1f}fix: resolve retry bug";
        let commit = parse_commit_line(line).unwrap();
        assert_eq!(commit.hash, "abc123");
        assert_eq!(commit.subject, "fix: resolve retry bug");
        assert_eq!(commit.date.to_rfc3339(), "2024-03-01T08:00:00+00:00");
    }

    #[test]
    fn rejects_malformed_log_line() {
        assert!(parse_commit_line("").is_none());
        assert!(parse_commit_line("abc\u{1f}not-a-date\u{1f}x").is_none());
    }

    #[test]
    fn no_git_reports_nothing() {
        assert!(NoGit.last_commit("a.rs").is_none());
    }

    #[test]
    fn cli_outside_repo_degrades_gracefully() {
        let dir = TempDir::new().unwrap();
        // Whether or not git is installed, a fresh temp dir has no history.
        let provider = GitCli::detect(dir.path());
        assert!(provider.last_commit("missing.rs").is_none());

        let cli = GitCli::new(dir.path().join("does-not-exist"));
        assert!(cli.last_commit("missing.rs").is_none());
    }
}
