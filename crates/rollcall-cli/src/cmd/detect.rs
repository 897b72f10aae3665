use crate::output::{print_json, print_table, truncate};
use anyhow::Context;
use rollcall_core::{
    config::Config,
    detection::FeatureDetector,
    paths,
    planning::{find_planning_documents, load_planning_documents},
    report::ImplementationReport,
    walk::SourceFile,
};
use std::path::{Path, PathBuf};

pub fn run(root: &Path, plans: &[PathBuf], markdown: bool, json: bool) -> anyhow::Result<()> {
    let config =
        Config::load(root).with_context(|| format!("failed to load {}", paths::CONFIG_FILE))?;
    let options = config.detection;

    let files = if plans.is_empty() {
        find_planning_documents(root, &options).with_context(|| {
            format!("failed to search {} for planning documents", root.display())
        })?
    } else {
        plans
            .iter()
            .map(|p| explicit_plan(root, p))
            .collect::<anyhow::Result<Vec<_>>>()?
    };

    if files.is_empty() && !json {
        println!("No planning documents found.");
        return Ok(());
    }

    let documents = load_planning_documents(&files);
    let detector =
        FeatureDetector::new(root, &options).context("failed to index source files")?;
    let detections = documents
        .iter()
        .flat_map(|doc| detector.detect_document(doc))
        .collect();
    let report = ImplementationReport::build(&documents, detections);

    if json {
        return print_json(&report);
    }
    if markdown {
        print!("{}", report.to_markdown());
        return Ok(());
    }

    for summary in &report.documents {
        println!(
            "\n{} ({}): {}/{} implemented, {}%",
            summary.title.as_deref().unwrap_or("untitled"),
            summary.path,
            summary.implemented,
            summary.total,
            summary.completion_percent
        );
        let rows: Vec<Vec<String>> = report
            .detections
            .iter()
            .filter(|d| d.document == summary.path)
            .map(|d| {
                vec![
                    d.status.to_string(),
                    format!("{}%", d.confidence),
                    truncate(&d.feature.description, 60),
                ]
            })
            .collect();
        if !rows.is_empty() {
            print_table(&["STATUS", "CONF", "FEATURE"], rows);
        }
    }
    println!(
        "\nOverall: {}/{} features implemented ({}%), {} partial, {} missing",
        report.implemented,
        report.total_features,
        report.completion_percent,
        report.partial,
        report.missing
    );
    Ok(())
}

/// A `--plan` argument: absolute, relative to the root, or relative to the
/// working directory, tried in that order.
fn explicit_plan(root: &Path, plan: &Path) -> anyhow::Result<SourceFile> {
    let path = if plan.is_absolute() || !root.join(plan).is_file() {
        plan.to_path_buf()
    } else {
        root.join(plan)
    };
    if !path.is_file() {
        anyhow::bail!("planning document not found: {}", plan.display());
    }
    Ok(SourceFile {
        relative: paths::relative_slash_path(root, &path),
        path,
    })
}
