use crate::determinism::run_id::sha256_hex;
use crate::determinism::zip::zip_entries_deterministic;
use crate::error::{CoreError, CoreResult};
use crate::suite::workflow::SuiteArtifacts;
use rust_xlsxwriter::{DocProperties, ExcelDateTime, Format, Workbook};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::info;

use super::hashes::{render_entry_hashes_csv, EntryHashRow};

pub const WORKBOOK_ENTRY: &str = "deliverables/validation_suite.xlsx";
pub const HASHES_ENTRY: &str = "artifact_hashes.csv";
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WorkbookExport {
    pub path: PathBuf,
    pub sha256: String,
    /// Sheet names in FRS/OQ/RTM order.
    pub sheets: Vec<String>,
}

/// One worksheet per section table, header row in bold and frozen.
pub fn build_workbook(artifacts: &SuiteArtifacts) -> CoreResult<Vec<u8>> {
    let sheets = artifacts.sheets();
    if sheets.is_empty() {
        return Err(CoreError::InvalidInput(
            "no section produced a table; nothing to export".to_string(),
        ));
    }

    let mut workbook = Workbook::new();
    // Fixed creation time keeps identical tables byte-identical.
    let created = ExcelDateTime::from_ymd(2000, 1, 1)?;
    workbook.set_properties(&DocProperties::new().set_creation_datetime(&created));

    let header = Format::new().set_bold();
    for (name, table) in sheets {
        let sheet = workbook.add_worksheet();
        sheet.set_name(name)?;
        for (col, title) in table.columns.iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, title, &header)?;
        }
        for (idx, row) in table.ordered_rows().iter().enumerate() {
            for (col, value) in row.iter().enumerate() {
                sheet.write_string(idx as u32 + 1, col as u16, value)?;
            }
        }
        sheet.set_freeze_panes(1, 0)?;
        sheet.autofit();
    }
    Ok(workbook.save_to_buffer()?)
}

pub fn write_workbook(artifacts: &SuiteArtifacts, out_xlsx: &Path) -> CoreResult<WorkbookExport> {
    let bytes = build_workbook(artifacts)?;
    if let Some(parent) = out_xlsx.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(out_xlsx, &bytes)?;
    let sha256 = sha256_hex(&bytes);
    let sheets: Vec<String> = artifacts
        .sheets()
        .iter()
        .map(|(name, _)| name.to_string())
        .collect();
    info!(path = %out_xlsx.display(), sha256 = %sha256, ?sheets, "workbook exported");
    Ok(WorkbookExport {
        path: out_xlsx.to_path_buf(),
        sha256,
        sheets,
    })
}

/// Every deliverable, the workbook when any table exists, and the hash manifest.
pub fn bundle_entries(artifacts: &SuiteArtifacts) -> CoreResult<Vec<(String, Vec<u8>)>> {
    let mut entries = Vec::new();
    let mut rows = Vec::new();
    let mut push = |name: &str, bytes: Vec<u8>, content_type: &str| {
        rows.push(EntryHashRow {
            entry: name.to_string(),
            sha256: sha256_hex(&bytes),
            bytes: bytes.len() as u64,
            content_type: content_type.to_string(),
        });
        entries.push((name.to_string(), bytes));
    };
    for (rel, bytes, content_type) in &artifacts.deliverables {
        push(rel.as_str(), bytes.clone(), content_type.as_str());
    }
    if !artifacts.sheets().is_empty() {
        push(WORKBOOK_ENTRY, build_workbook(artifacts)?, XLSX_CONTENT_TYPE);
    }
    entries.push((
        HASHES_ENTRY.to_string(),
        render_entry_hashes_csv(rows)?.into_bytes(),
    ));
    Ok(entries)
}

/// Deterministic zip of [`bundle_entries`]; returns its SHA-256.
pub fn write_bundle(artifacts: &SuiteArtifacts, out_zip: &Path) -> CoreResult<String> {
    let entries = bundle_entries(artifacts)?;
    let sha256 = zip_entries_deterministic(&entries, out_zip)?;
    info!(path = %out_zip.display(), sha256 = %sha256, entries = entries.len(), "bundle exported");
    Ok(sha256)
}

/// Write every rendered deliverable under `out_dir`, returning the written paths.
pub fn write_deliverables(artifacts: &SuiteArtifacts, out_dir: &Path) -> CoreResult<Vec<PathBuf>> {
    let mut written = Vec::new();
    for (rel, bytes, _) in &artifacts.deliverables {
        let path = out_dir.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, bytes)?;
        written.push(path);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suite::model::NormalizeConfig;
    use crate::suite::workflow::{generate_suite_artifacts, SuiteRequest};
    use calamine::{Reader, Xlsx};
    use std::io::Cursor;

    fn artifacts(completion: &str) -> SuiteArtifacts {
        generate_suite_artifacts(&SuiteRequest {
            project_name: "LIMS".to_string(),
            completion: completion.to_string(),
            normalize: NormalizeConfig::default(),
            test_id_column: None,
        })
        .unwrap()
    }

    #[test]
    fn workbook_has_a_sheet_per_available_table() {
        let a = artifacts("| ID | Name |\n|---|---|\n| F-1 | x |---SECTION_SPLIT---prose only");
        let bytes = build_workbook(&a).unwrap();
        let mut wb: Xlsx<_> = Xlsx::new(Cursor::new(bytes)).unwrap();
        assert_eq!(wb.sheet_names(), vec!["FRS".to_string()]);
        let range = wb.worksheet_range("FRS").unwrap();
        let cells: Vec<Vec<String>> = range
            .rows()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect();
        assert_eq!(cells, vec![vec!["ID", "Name"], vec!["F-1", "x"]]);
    }

    #[test]
    fn nothing_to_export_is_rejected() {
        let a = artifacts("no tables anywhere");
        assert!(matches!(build_workbook(&a), Err(CoreError::InvalidInput(_))));
    }

    #[test]
    fn export_is_reproducible() {
        let dir = tempfile::tempdir().unwrap();
        let a = artifacts("| ID | Name |\n|---|---|\n| F-1 | x |");
        let first = write_workbook(&a, &dir.path().join("a.xlsx")).unwrap();
        let second = write_workbook(&a, &dir.path().join("b.xlsx")).unwrap();
        assert_eq!(first.sha256, second.sha256);
        assert_eq!(first.sheets, vec!["FRS".to_string()]);
    }

    #[test]
    fn bundle_lists_workbook_in_manifest() {
        let a = artifacts("| ID | Name |\n|---|---|\n| F-1 | x |");
        let entries = bundle_entries(&a).unwrap();
        let names: Vec<&str> = entries.iter().map(|(n, _)| n.as_str()).collect();
        assert!(names.contains(&WORKBOOK_ENTRY));
        assert!(names.contains(&"deliverables/FRS.csv"));
        let (_, manifest) = entries.iter().find(|(n, _)| n == HASHES_ENTRY).unwrap();
        let (_, xlsx) = entries.iter().find(|(n, _)| n == WORKBOOK_ENTRY).unwrap();
        let manifest = String::from_utf8(manifest.clone()).unwrap();
        assert!(manifest.contains(&sha256_hex(xlsx)));
        assert!(manifest.contains(XLSX_CONTENT_TYPE));
    }

    #[test]
    fn bundle_without_tables_has_no_workbook() {
        let a = artifacts("no tables anywhere");
        let entries = bundle_entries(&a).unwrap();
        assert!(entries.iter().all(|(n, _)| n != WORKBOOK_ENTRY));
        assert!(entries.iter().any(|(n, _)| n == HASHES_ENTRY));
    }

    #[test]
    fn deliverables_written_under_out_dir() {
        let dir = tempfile::tempdir().unwrap();
        let a = artifacts("| ID | Name |\n|---|---|\n| F-1 | x |");
        let paths = write_deliverables(&a, dir.path()).unwrap();
        assert!(paths.iter().all(|p| p.exists()));
        assert!(dir.path().join("deliverables/validation_suite.md").exists());
    }
}
