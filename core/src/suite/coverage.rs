use super::model::{CanonicalTable, CoverageSummary};

/// Traceability coverage of an RTM table over its test-ID column.
///
/// A row is a gap when its test-ID value is empty, or when the column is
/// missing altogether. The percentage rounds half to even, so 1 of 8 covered
/// (12.5) reports 12 and 3 of 8 (37.5) reports 38.
pub fn coverage(rtm: &CanonicalTable, test_id_column: &str) -> CoverageSummary {
    let total = rtm.row_count();
    let gap_count = if rtm.has_column(test_id_column) {
        rtm.rows
            .iter()
            .filter(|row| {
                row.get(test_id_column)
                    .map_or(true, |value| value.trim().is_empty())
            })
            .count()
    } else {
        total
    };
    let percentage = if total == 0 {
        None
    } else {
        Some(percent_half_even(total - gap_count, total))
    };
    CoverageSummary {
        total,
        gap_count,
        percentage,
    }
}

// Integer arithmetic keeps .5 ties exact.
fn percent_half_even(part: usize, total: usize) -> u8 {
    let scaled = part * 100;
    let (q, r) = (scaled / total, scaled % total);
    let rounded = match (2 * r).cmp(&total) {
        std::cmp::Ordering::Less => q,
        std::cmp::Ordering::Greater => q + 1,
        std::cmp::Ordering::Equal => q + (q % 2),
    };
    rounded as u8
}

/// Best guess at the RTM column holding test references.
///
/// Prefers headers mentioning "test", then an exact `OQ` / `OQ Reference`
/// style header, then the last column.
pub fn detect_test_id_column(rtm: &CanonicalTable) -> Option<&str> {
    let lowered: Vec<(String, &str)> = rtm
        .columns
        .iter()
        .map(|c| (c.to_ascii_lowercase(), c.as_str()))
        .collect();
    lowered
        .iter()
        .find(|(l, _)| l.contains("test"))
        .or_else(|| {
            lowered
                .iter()
                .find(|(l, _)| l == "oq" || l.starts_with("oq ") || l.starts_with("oq_"))
        })
        .map(|(_, c)| *c)
        .or_else(|| rtm.columns.last().map(String::as_str))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn rtm(columns: &[&str], rows: &[&[&str]]) -> CanonicalTable {
        CanonicalTable {
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| {
                    columns
                        .iter()
                        .zip(r.iter())
                        .map(|(c, v)| (c.to_string(), v.to_string()))
                        .collect::<BTreeMap<_, _>>()
                })
                .collect(),
        }
    }

    #[test]
    fn one_gap_in_four_is_75_percent() {
        let t = rtm(
            &["URS", "Test ID"],
            &[
                &["URS-01", "OQ-01"],
                &["URS-02", ""],
                &["URS-03", "OQ-03"],
                &["URS-04", "OQ-04"],
            ],
        );
        let c = coverage(&t, "Test ID");
        assert_eq!(c.percentage, Some(75));
        assert_eq!(c.gap_count, 1);
        assert_eq!(c.total, 4);
    }

    #[test]
    fn empty_table_has_no_percentage() {
        let t = rtm(&["URS", "Test ID"], &[]);
        let c = coverage(&t, "Test ID");
        assert_eq!(c.percentage, None);
        assert_eq!(c.gap_count, 0);
    }

    #[test]
    fn missing_column_counts_every_row_as_gap() {
        let t = rtm(&["URS", "FRS"], &[&["URS-01", "FRS-01"], &["URS-02", "FRS-02"]]);
        let c = coverage(&t, "Test ID");
        assert_eq!(c.gap_count, 2);
        assert_eq!(c.percentage, Some(0));
    }

    #[test]
    fn percentage_rounds_to_nearest() {
        let t = rtm(
            &["URS", "OQ"],
            &[&["1", "a"], &["2", "b"], &["3", ""]],
        );
        assert_eq!(coverage(&t, "OQ").percentage, Some(67));
    }

    #[test]
    fn ties_round_half_to_even() {
        let rows: Vec<[&str; 2]> = (0..8)
            .map(|i| if i == 0 { ["U", "OQ-1"] } else { ["U", ""] })
            .collect();
        let refs: Vec<&[&str]> = rows.iter().map(|r| &r[..]).collect();
        let t = rtm(&["URS", "OQ"], &refs);
        let c = coverage(&t, "OQ");
        assert_eq!(c.gap_count, 7);
        assert_eq!(c.percentage, Some(12));

        assert_eq!(percent_half_even(3, 8), 38);
        assert_eq!(percent_half_even(1, 2), 50);
        assert_eq!(percent_half_even(8, 8), 100);
    }

    #[test]
    fn detects_test_column() {
        let t = rtm(&["URS ID", "Description", "FRS Reference", "Test ID"], &[]);
        assert_eq!(detect_test_id_column(&t), Some("Test ID"));
        let t = rtm(&["URS", "FRS", "OQ"], &[]);
        assert_eq!(detect_test_id_column(&t), Some("OQ"));
        let t = rtm(&["URS", "Link"], &[]);
        assert_eq!(detect_test_id_column(&t), Some("Link"));
    }
}
