use crate::cmd::scan::{load_and_scan, ScanFlags};
use crate::output::{print_json, print_table, truncate};
use rollcall_core::{
    completion::CompletionAnalyzer,
    git::{GitCli, GitInfoProvider},
    report::CompletionReport,
};
use std::path::Path;

pub fn run(
    root: &Path,
    flags: &ScanFlags,
    min_confidence: Option<u32>,
    git: bool,
    markdown: bool,
    json: bool,
) -> anyhow::Result<()> {
    if let Some(m) = min_confidence {
        if m > 100 {
            anyhow::bail!("--min-confidence must be between 0 and 100, got {m}");
        }
    }

    let (catalog, options, result) = load_and_scan(root, flags)?;
    let min_confidence = min_confidence.unwrap_or(options.min_confidence);

    let provider: Option<Box<dyn GitInfoProvider>> = git.then(|| GitCli::detect(root));
    let mut analyzer = CompletionAnalyzer::new(&catalog);
    if let Some(provider) = &provider {
        analyzer = analyzer.with_git(&**provider);
    }

    let analyses = analyzer.analyze_scan(&result);
    let report = CompletionReport::build(analyses, min_confidence);

    if json {
        return print_json(&report);
    }
    if markdown {
        print!("{}", report.to_markdown());
        return Ok(());
    }

    println!(
        "Analyzed {} TODOs: {} likely completed, average confidence {}%",
        report.total_todos, report.likely_completed, report.average_confidence
    );
    let b = &report.buckets;
    println!(
        "Confidence: very high {}, high {}, medium {}, low {}, minimal {}",
        b.very_high, b.high, b.medium, b.low, b.minimal
    );

    let sections = [
        ("Safe to close", &report.recommendations.safe_to_close),
        ("Needs review", &report.recommendations.needs_review),
        ("Possibly done", &report.recommendations.possibly_done),
    ];
    for (heading, items) in sections {
        if items.is_empty() {
            continue;
        }
        println!("\n{heading} ({}):", items.len());
        let rows = items
            .iter()
            .map(|a| {
                vec![
                    format!("{}%", a.confidence),
                    a.todo.location(),
                    a.todo.kind.clone(),
                    truncate(&a.todo.content, 50),
                ]
            })
            .collect();
        print_table(&["CONF", "LOCATION", "TYPE", "CONTENT"], rows);
    }
    Ok(())
}
