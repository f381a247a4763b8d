use crate::determinism::json_canonical;
use crate::determinism::run_id::generation_id_from_completion;
use crate::error::CoreResult;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use super::coverage::{coverage, detect_test_id_column};
use super::model::{
    CanonicalTable, CoverageSummary, NormalizeConfig, NormalizeReport, SectionKind, TableAbsent,
};
use super::render::{render_suite_markdown, render_table_csv, SectionView};
use super::splitter::SplitCompletion;
use super::table::normalize_with;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteRequest {
    pub project_name: String,
    pub completion: String,
    pub normalize: NormalizeConfig,
    /// RTM column holding test references; detected when unset.
    pub test_id_column: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SectionOutcome {
    SectionAbsent,
    TableAbsent {
        text: String,
        reason: TableAbsent,
    },
    Table {
        text: String,
        table: CanonicalTable,
        report: NormalizeReport,
    },
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SectionArtifact {
    pub kind: SectionKind,
    pub outcome: SectionOutcome,
}

impl SectionArtifact {
    pub fn table(&self) -> Option<&CanonicalTable> {
        match &self.outcome {
            SectionOutcome::Table { table, .. } => Some(table),
            _ => None,
        }
    }

    pub fn view(&self) -> SectionView<'_> {
        match &self.outcome {
            SectionOutcome::SectionAbsent => SectionView::Absent,
            SectionOutcome::TableAbsent { text, reason } => SectionView::RawText(text, reason),
            SectionOutcome::Table { table, .. } => SectionView::Table(table),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SuiteArtifacts {
    pub generation_id: String,
    pub sections: Vec<SectionArtifact>,
    pub coverage: Option<CoverageSummary>,
    pub coverage_column: Option<String>,
    /// (relative path, bytes, content type)
    pub deliverables: Vec<(String, Vec<u8>, String)>,
}

impl SuiteArtifacts {
    pub fn section(&self, kind: SectionKind) -> &SectionArtifact {
        &self.sections[kind.position()]
    }

    pub fn table(&self, kind: SectionKind) -> Option<&CanonicalTable> {
        self.section(kind).table()
    }

    /// Worksheets for every section that produced a table, in FRS/OQ/RTM order.
    pub fn sheets(&self) -> Vec<(&'static str, &CanonicalTable)> {
        self.sections
            .iter()
            .filter_map(|s| s.table().map(|t| (s.kind.sheet_name(), t)))
            .collect()
    }

    pub fn sections_present(&self) -> usize {
        self.sections
            .iter()
            .filter(|s| s.outcome != SectionOutcome::SectionAbsent)
            .count()
    }

    pub fn deliverable(&self, path: &str) -> Option<&[u8]> {
        self.deliverables
            .iter()
            .find(|(p, _, _)| p == path)
            .map(|(_, b, _)| b.as_slice())
    }
}

pub fn normalize_sections(split: &SplitCompletion, cfg: &NormalizeConfig) -> Vec<SectionArtifact> {
    split
        .iter()
        .map(|(kind, section)| {
            let outcome = match section {
                None => SectionOutcome::SectionAbsent,
                Some(section) => match normalize_with(&section.text, cfg) {
                    Ok((table, report)) => SectionOutcome::Table {
                        text: section.text.clone(),
                        table,
                        report,
                    },
                    Err(reason) => {
                        warn!(section = %kind, %reason, "no table in section");
                        SectionOutcome::TableAbsent {
                            text: section.text.clone(),
                            reason,
                        }
                    }
                },
            };
            SectionArtifact { kind, outcome }
        })
        .collect()
}

pub fn generate_suite_artifacts(req: &SuiteRequest) -> CoreResult<SuiteArtifacts> {
    let generation_id = generation_id_from_completion(&req.completion);
    let split = SplitCompletion::from_completion(&req.completion);
    let sections = normalize_sections(&split, &req.normalize);

    let rtm = sections[SectionKind::Rtm.position()].table();
    let coverage_column = rtm.and_then(|t| {
        req.test_id_column
            .clone()
            .or_else(|| detect_test_id_column(t).map(str::to_string))
    });
    let coverage_summary = match (rtm, &coverage_column) {
        (Some(t), Some(col)) => Some(coverage(t, col)),
        _ => None,
    };

    let mut deliverables = Vec::new();
    for section in &sections {
        if let Some(table) = section.table() {
            deliverables.push((
                format!("deliverables/{}.csv", section.kind.sheet_name()),
                render_table_csv(table)?.into_bytes(),
                "text/csv".to_string(),
            ));
        }
    }

    let views: Vec<(SectionKind, SectionView<'_>)> =
        sections.iter().map(|s| (s.kind, s.view())).collect();
    let suite_md = render_suite_markdown(&req.project_name, &views, coverage_summary.as_ref());
    deliverables.push((
        "deliverables/validation_suite.md".to_string(),
        suite_md.into_bytes(),
        "text/markdown".to_string(),
    ));

    let coverage_json = json!({
        "schema_version": "RTM_COVERAGE_V1",
        "generation_id": generation_id,
        "test_id_column": coverage_column,
        "coverage": coverage_summary,
    });
    deliverables.push((
        "deliverables/coverage.json".to_string(),
        json_canonical::to_canonical_bytes(&coverage_json)?,
        "application/json".to_string(),
    ));

    info!(
        generation_id = %generation_id,
        sections = split.present_count(),
        tables = sections.iter().filter(|s| s.table().is_some()).count(),
        coverage = ?coverage_summary.and_then(|c| c.percentage),
        "validation suite artifacts built"
    );

    Ok(SuiteArtifacts {
        generation_id,
        sections,
        coverage: coverage_summary,
        coverage_column,
        deliverables,
    })
}
