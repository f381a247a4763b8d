use crate::error::CoreResult;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EntryHashRow {
    pub entry: String,
    pub sha256: String,
    pub bytes: u64,
    pub content_type: String,
}

/// Hash manifest for an export bundle, sorted by entry name.
pub fn render_entry_hashes_csv(mut rows: Vec<EntryHashRow>) -> CoreResult<String> {
    rows.sort_by(|a, b| a.entry.cmp(&b.entry));

    let mut wtr = csv::WriterBuilder::new().from_writer(vec![]);
    wtr.write_record(["entry", "sha256", "bytes", "content_type"])?;
    for r in rows {
        wtr.write_record(&[
            r.entry,
            r.sha256,
            r.bytes.to_string(),
            r.content_type,
        ])?;
    }
    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8_lossy(&bytes).replace("\r\n", "\n"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(entry: &str) -> EntryHashRow {
        EntryHashRow {
            entry: entry.to_string(),
            sha256: "a".repeat(64),
            bytes: 10,
            content_type: "text/csv".to_string(),
        }
    }

    #[test]
    fn rows_sorted_by_entry() {
        let csv = render_entry_hashes_csv(vec![
            row("deliverables/validation_suite.xlsx"),
            row("deliverables/FRS.csv"),
            row("deliverables/OQ.csv"),
        ])
        .unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "entry,sha256,bytes,content_type");
        assert!(lines[1].starts_with("deliverables/FRS.csv,"));
        assert!(lines[2].starts_with("deliverables/OQ.csv,"));
        assert!(lines[3].starts_with("deliverables/validation_suite.xlsx,"));
        assert!(!csv.contains('\r'));
    }
}
