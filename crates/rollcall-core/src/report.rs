use crate::completion::CompletionAnalysis;
use crate::detection::FeatureDetection;
use crate::planning::PlanningDocument;
use crate::types::FeatureStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const SAFE_TO_CLOSE: u32 = 90;
pub const NEEDS_REVIEW: u32 = 70;
pub const POSSIBLY_DONE: u32 = 50;
pub const LOW_CONFIDENCE: u32 = 30;

// ---------------------------------------------------------------------------
// CompletionReport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfidenceBuckets {
    pub very_high: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub minimal: usize,
}

impl ConfidenceBuckets {
    fn add(&mut self, confidence: u32) {
        match confidence {
            c if c >= SAFE_TO_CLOSE => self.very_high += 1,
            c if c >= NEEDS_REVIEW => self.high += 1,
            c if c >= POSSIBLY_DONE => self.medium += 1,
            c if c >= LOW_CONFIDENCE => self.low += 1,
            _ => self.minimal += 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendations {
    pub safe_to_close: Vec<CompletionAnalysis>,
    pub needs_review: Vec<CompletionAnalysis>,
    pub possibly_done: Vec<CompletionAnalysis>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionReport {
    pub generated_at: DateTime<Utc>,
    /// Analyses before the `min_confidence` cut.
    pub total_todos: usize,
    pub likely_completed: usize,
    pub average_confidence: u32,
    pub buckets: ConfidenceBuckets,
    pub recommendations: Recommendations,
    pub analyses: Vec<CompletionAnalysis>,
}

impl CompletionReport {
    /// Aggregate `analyses`, dropping any below `min_confidence` first.
    /// Analyses are listed highest confidence first.
    pub fn build(analyses: Vec<CompletionAnalysis>, min_confidence: u32) -> Self {
        let total_todos = analyses.len();
        let mut kept: Vec<CompletionAnalysis> = analyses
            .into_iter()
            .filter(|a| a.confidence >= min_confidence)
            .collect();
        kept.sort_by(|a, b| b.confidence.cmp(&a.confidence));

        let mut buckets = ConfidenceBuckets::default();
        let mut recommendations = Recommendations::default();
        for analysis in &kept {
            buckets.add(analysis.confidence);
            match analysis.confidence {
                c if c >= SAFE_TO_CLOSE => recommendations.safe_to_close.push(analysis.clone()),
                c if c >= NEEDS_REVIEW => recommendations.needs_review.push(analysis.clone()),
                c if c >= POSSIBLY_DONE => recommendations.possibly_done.push(analysis.clone()),
                _ => {}
            }
        }

        let average_confidence = if kept.is_empty() {
            0
        } else {
            let sum: u64 = kept.iter().map(|a| u64::from(a.confidence)).sum();
            (sum as f64 / kept.len() as f64).round() as u32
        };

        Self {
            generated_at: Utc::now(),
            total_todos,
            likely_completed: kept.iter().filter(|a| a.is_likely_completed).count(),
            average_confidence,
            buckets,
            recommendations,
            analyses: kept,
        }
    }

    pub fn to_markdown(&self) -> String {
        let mut doc = String::new();
        doc.push_str("# TODO Completion Report\n\n");
        doc.push_str(&format!(
            "_Generated {}_\n\n",
            self.generated_at.format("%Y-%m-%d %H:%M UTC")
        ));
        doc.push_str(&format!("- **TODOs analyzed:** {}\n", self.total_todos));
        doc.push_str(&format!("- **Likely completed:** {}\n", self.likely_completed));
        doc.push_str(&format!(
            "- **Average confidence:** {}%\n",
            self.average_confidence
        ));

        doc.push_str("\n## Confidence Distribution\n\n");
        doc.push_str("| Bucket | Range | Count |\n|---|---|---|\n");
        let rows = [
            ("Very high", "90-100", self.buckets.very_high),
            ("High", "70-89", self.buckets.high),
            ("Medium", "50-69", self.buckets.medium),
            ("Low", "30-49", self.buckets.low),
            ("Minimal", "0-29", self.buckets.minimal),
        ];
        for (label, range, count) in rows {
            doc.push_str(&format!("| {label} | {range} | {count} |\n"));
        }

        let sections = [
            ("Safe to Close", &self.recommendations.safe_to_close),
            ("Needs Review", &self.recommendations.needs_review),
            ("Possibly Done", &self.recommendations.possibly_done),
        ];
        for (heading, items) in sections {
            if items.is_empty() {
                continue;
            }
            doc.push_str(&format!("\n## {heading} ({})\n\n", items.len()));
            for a in items.iter() {
                doc.push_str(&format!(
                    "- **{}%** `{}` [{}] {}\n",
                    a.confidence,
                    a.todo.location(),
                    a.todo.kind,
                    a.todo.content
                ));
                for reason in &a.reasons {
                    doc.push_str(&format!("  - {reason}\n"));
                }
            }
        }
        doc
    }
}

// ---------------------------------------------------------------------------
// ImplementationReport
// ---------------------------------------------------------------------------

/// `round(100 * implemented / total)`, or 0 for an empty document.
pub fn completion_percent(implemented: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (100.0 * implemented as f64 / total as f64).round() as u32
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub total: usize,
    pub implemented: usize,
    pub partial: usize,
    pub missing: usize,
    pub completion_percent: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImplementationReport {
    pub generated_at: DateTime<Utc>,
    pub documents: Vec<DocumentSummary>,
    pub total_features: usize,
    pub implemented: usize,
    pub partial: usize,
    pub missing: usize,
    pub completion_percent: u32,
    pub detections: Vec<FeatureDetection>,
}

impl ImplementationReport {
    /// Group `detections` under the documents they came from, in document
    /// order. Documents with no retained features still get a row.
    pub fn build(documents: &[PlanningDocument], detections: Vec<FeatureDetection>) -> Self {
        let summaries: Vec<DocumentSummary> = documents
            .iter()
            .map(|doc| {
                let mine: Vec<&FeatureDetection> = detections
                    .iter()
                    .filter(|d| d.document == doc.path)
                    .collect();
                let count =
                    |status: FeatureStatus| mine.iter().filter(|d| d.status == status).count();
                let implemented = count(FeatureStatus::Implemented);
                DocumentSummary {
                    path: doc.path.clone(),
                    title: doc.title.clone(),
                    total: mine.len(),
                    implemented,
                    partial: count(FeatureStatus::Partial),
                    missing: count(FeatureStatus::Missing),
                    completion_percent: completion_percent(implemented, mine.len()),
                }
            })
            .collect();

        let count = |status: FeatureStatus| {
            detections.iter().filter(|d| d.status == status).count()
        };
        let implemented = count(FeatureStatus::Implemented);
        let partial = count(FeatureStatus::Partial);
        let missing = count(FeatureStatus::Missing);

        Self {
            generated_at: Utc::now(),
            documents: summaries,
            total_features: detections.len(),
            implemented,
            partial,
            missing,
            completion_percent: completion_percent(implemented, detections.len()),
            detections,
        }
    }

    pub fn to_markdown(&self) -> String {
        let mut doc = String::new();
        doc.push_str("# Implementation Report\n\n");
        doc.push_str(&format!(
            "_Generated {}_\n\n",
            self.generated_at.format("%Y-%m-%d %H:%M UTC")
        ));
        doc.push_str(&format!(
            "**Overall:** {}/{} features implemented ({}%), {} partial, {} missing\n",
            self.implemented, self.total_features, self.completion_percent, self.partial, self.missing
        ));

        for summary in &self.documents {
            let heading = summary.title.as_deref().unwrap_or(&summary.path);
            doc.push_str(&format!("\n## {heading}\n\n"));
            doc.push_str(&format!(
                "`{}`: {}/{} implemented ({}%)\n\n",
                summary.path, summary.implemented, summary.total, summary.completion_percent
            ));
            for d in self.detections.iter().filter(|d| d.document == summary.path) {
                let mark = match d.status {
                    FeatureStatus::Implemented => "x",
                    FeatureStatus::Partial => "~",
                    FeatureStatus::Missing => " ",
                };
                doc.push_str(&format!(
                    "- [{mark}] {} ({}, {}%)\n",
                    d.feature.description, d.status, d.confidence
                ));
                for file in &d.evidence.files_found {
                    doc.push_str(&format!("  - file: `{file}`\n"));
                }
                if !d.evidence.tests_found.is_empty() {
                    doc.push_str(&format!(
                        "  - tests: {}\n",
                        d.evidence.tests_found.join(", ")
                    ));
                }
            }
        }
        doc
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
