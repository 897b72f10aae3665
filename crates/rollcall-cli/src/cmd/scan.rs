use crate::output::{print_json, print_table, truncate};
use anyhow::Context;
use rollcall_core::{
    config::{Config, ScanOptions},
    patterns::PatternCatalog,
    paths,
    scanner::{ScanResult, ScanSummary, Scanner},
    state::{find_new_todos, ScanState},
    todo::TodoItem,
};
use serde::Serialize;
use std::path::Path;

/// Scan flags shared by `scan` and `analyze`. Each one overrides the value
/// from `.rollcall/config.yaml`.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct ScanFlags {
    /// Only scan files matching this glob (repeatable)
    #[arg(long)]
    pub include: Vec<String>,

    /// Skip files matching this glob (repeatable)
    #[arg(long)]
    pub exclude: Vec<String>,

    /// Keep checklist items that are already checked off
    #[arg(long)]
    pub include_completed: bool,

    /// Drop markers in archive-style paths (archive/, old/, *.bak ...)
    #[arg(long)]
    pub exclude_archives: bool,

    /// Do not descend more than N directories below the root
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Scan files even if .gitignore excludes them
    #[arg(long)]
    pub no_gitignore: bool,
}

impl ScanFlags {
    pub fn apply(&self, options: &mut ScanOptions) {
        options.include.extend(self.include.iter().cloned());
        options.exclude.extend(self.exclude.iter().cloned());
        if self.include_completed {
            options.include_completed = true;
        }
        if self.exclude_archives {
            options.exclude_archives = true;
        }
        if self.max_depth.is_some() {
            options.max_depth = self.max_depth;
        }
        if self.no_gitignore {
            options.use_gitignore = false;
        }
    }
}

/// Load config, apply `flags`, and scan `root`.
pub fn load_and_scan(
    root: &Path,
    flags: &ScanFlags,
) -> anyhow::Result<(PatternCatalog, ScanOptions, ScanResult)> {
    let config =
        Config::load(root).with_context(|| format!("failed to load {}", paths::CONFIG_FILE))?;
    let mut options = config.scan;
    flags.apply(&mut options);

    let catalog = PatternCatalog::new();
    let result = Scanner::new(&catalog, &options)
        .scan(root)
        .with_context(|| format!("failed to scan {}", root.display()))?;
    Ok((catalog, options, result))
}

pub fn run(
    root: &Path,
    flags: &ScanFlags,
    save_state: bool,
    new_only: bool,
    json: bool,
) -> anyhow::Result<()> {
    let (_, _, result) = load_and_scan(root, flags)?;

    let todos: Vec<&TodoItem> = if new_only {
        let previous = ScanState::load(root)
            .with_context(|| format!("failed to read {}", paths::STATE_FILE))?;
        if previous.is_none() && !json {
            println!("No saved state; every marker is new.");
        }
        find_new_todos(previous.as_ref(), &result.todos)
    } else {
        result.todos.iter().collect()
    };

    if save_state {
        ScanState::from_scan(&result)
            .save(root)
            .with_context(|| format!("failed to write {}", paths::STATE_FILE))?;
    }

    if json {
        #[derive(Serialize)]
        #[serde(rename_all = "camelCase")]
        struct ScanOutput<'a> {
            todos: Vec<&'a TodoItem>,
            summary: &'a ScanSummary,
        }
        return print_json(&ScanOutput {
            todos,
            summary: &result.summary,
        });
    }

    if todos.is_empty() {
        println!("No TODOs found.");
    } else {
        let rows = todos
            .iter()
            .map(|t| {
                vec![
                    t.location(),
                    t.kind.clone(),
                    t.priority.to_string(),
                    truncate(&t.content, 60),
                ]
            })
            .collect();
        print_table(&["LOCATION", "TYPE", "PRIORITY", "CONTENT"], rows);
    }

    let summary = &result.summary;
    println!(
        "\n{} shown, {} total in {} files ({} scanned, {} skipped, {}ms)",
        todos.len(),
        summary.total,
        summary.by_file.len(),
        summary.files_scanned,
        summary.files_skipped,
        summary.elapsed_ms
    );
    if save_state {
        println!("Saved {}", paths::STATE_FILE);
    }
    Ok(())
}
