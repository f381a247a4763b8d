use crate::error::CoreResult;

use super::model::{CanonicalTable, CoverageSummary, SectionKind, TableAbsent};

/// One section as it should be displayed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionView<'a> {
    Table(&'a CanonicalTable),
    RawText(&'a str, &'a TableAbsent),
    Absent,
}

pub fn render_table_markdown(table: &CanonicalTable) -> String {
    let mut out = Vec::new();
    out.push(format!(
        "| {} |",
        table
            .columns
            .iter()
            .map(|c| escape_cell(c))
            .collect::<Vec<_>>()
            .join(" | ")
    ));
    out.push(format!(
        "|{}|",
        vec!["---"; table.columns.len()].join("|")
    ));
    for row in table.ordered_rows() {
        out.push(format!(
            "| {} |",
            row.iter()
                .map(|c| escape_cell(c))
                .collect::<Vec<_>>()
                .join(" | ")
        ));
    }
    out.join("\n")
}

pub fn render_table_csv(table: &CanonicalTable) -> CoreResult<String> {
    let mut wtr = csv::WriterBuilder::new().from_writer(vec![]);
    wtr.write_record(&table.columns)?;
    for row in table.ordered_rows() {
        wtr.write_record(&row)?;
    }
    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    Ok(String::from_utf8_lossy(&bytes).replace("\r\n", "\n"))
}

pub fn render_suite_markdown(
    project_name: &str,
    sections: &[(SectionKind, SectionView<'_>)],
    coverage: Option<&CoverageSummary>,
) -> String {
    let mut out = Vec::new();
    out.push(format!("# Validation Suite: {}", project_name));
    out.push("".to_string());

    for (kind, view) in sections {
        out.push(format!("## {} ({})", kind.title(), kind.sheet_name()));
        out.push("".to_string());
        match view {
            SectionView::Table(table) => out.push(render_table_markdown(table)),
            SectionView::RawText(text, reason) => {
                out.push(format!("_No structured table: {}._", reason));
                out.push("".to_string());
                out.push(text.trim().to_string());
            }
            SectionView::Absent => {
                out.push("_Section not generated._".to_string());
            }
        }
        out.push("".to_string());
    }

    out.push("## Traceability Coverage".to_string());
    out.push("".to_string());
    match coverage.and_then(|c| c.percentage.map(|p| (p, c))) {
        Some((pct, c)) => out.push(format!(
            "- Coverage: {}% ({} of {} requirements traced, {} gap(s))",
            pct,
            c.total - c.gap_count,
            c.total,
            c.gap_count
        )),
        None => out.push("- Coverage: not computed".to_string()),
    }
    out.push("".to_string());
    out.join("\n")
}

fn escape_cell(cell: &str) -> String {
    cell.replace('|', "\\|").replace('\n', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suite::table::normalize;

    #[test]
    fn markdown_round_trips_through_normalizer() {
        let table = normalize("| ID | Rule |\n|---|---|\n| R-1 | a \\| b |\n| R-2 | c |").unwrap();
        let md = render_table_markdown(&table);
        assert_eq!(md, "| ID | Rule |\n|---|---|\n| R-1 | a \\| b |\n| R-2 | c |");
        assert_eq!(normalize(&md).unwrap(), table);
    }

    #[test]
    fn csv_uses_header_and_lf() {
        let table = normalize("| ID | Step |\n|---|---|\n| OQ-01 | Login, then logout |").unwrap();
        let csv = render_table_csv(&table).unwrap();
        assert_eq!(csv, "ID,Step\nOQ-01,\"Login, then logout\"\n");
    }

    #[test]
    fn suite_markdown_shows_placeholders() {
        let absent = TableAbsent::TooFewTableLines { found: 0 };
        let md = render_suite_markdown(
            "LIMS",
            &[
                (SectionKind::Frs, SectionView::RawText("Narrative only", &absent)),
                (SectionKind::Oq, SectionView::Absent),
            ],
            None,
        );
        assert!(md.contains("# Validation Suite: LIMS"));
        assert!(md.contains("Narrative only"));
        assert!(md.contains("_Section not generated._"));
        assert!(md.contains("- Coverage: not computed"));
    }
}
