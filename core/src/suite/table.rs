use super::model::{
    CanonicalTable, FillPolicy, NormalizeConfig, NormalizeReport, RawTableRow, RowOrder,
    TableAbsent,
};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Header, divider and at least one data row.
pub const MIN_TABLE_LINES: usize = 3;

type Grid = Vec<Vec<Option<String>>>;

/// Normalize with the default configuration.
pub fn normalize(section_text: &str) -> Result<CanonicalTable, TableAbsent> {
    normalize_with(section_text, &NormalizeConfig::default()).map(|(table, _)| table)
}

/// Extract the markdown table embedded in `section_text` and clean it.
///
/// Rows whose cell count differs from the header are padded with empty cells
/// or truncated to the header width. Duplicate identifiers collapse into one
/// row where the last non-empty value of every column wins.
pub fn normalize_with(
    section_text: &str,
    cfg: &NormalizeConfig,
) -> Result<(CanonicalTable, NormalizeReport), TableAbsent> {
    let raw_rows = extract_table_rows(section_text);
    let mut report = NormalizeReport {
        table_lines: raw_rows.len(),
        ..NormalizeReport::default()
    };
    if raw_rows.len() < MIN_TABLE_LINES {
        return Err(TableAbsent::TooFewTableLines {
            found: raw_rows.len(),
        });
    }

    let header = &raw_rows[0].cells;
    let width = header.len();

    let mut body: Vec<Vec<String>> = Vec::with_capacity(raw_rows.len() - 1);
    for row in &raw_rows[1..] {
        if is_separator_row(&row.cells) {
            report.separator_rows_dropped += 1;
            continue;
        }
        let mut cells = row.cells.clone();
        match cells.len().cmp(&width) {
            Ordering::Less => {
                report.rows_padded += 1;
                cells.resize(width, String::new());
            }
            Ordering::Greater => {
                report.rows_truncated += 1;
                debug!(line = row.line_no, cells = cells.len(), width, "truncating long table row");
                cells.truncate(width);
            }
            Ordering::Equal => {}
        }
        body.push(cells);
    }
    if body.is_empty() {
        return Err(TableAbsent::NoDataRows);
    }

    let names = column_names(header);
    let kept: Vec<usize> = (0..width)
        .filter(|&col| body.iter().any(|row| !row[col].is_empty()))
        .collect();
    report.columns_dropped = (0..width)
        .filter(|col| !kept.contains(col))
        .map(|col| names[col].clone())
        .collect();
    if kept.is_empty() {
        return Err(TableAbsent::NoColumns);
    }
    let columns: Vec<String> = kept.iter().map(|&col| names[col].clone()).collect();

    let id_col = cfg.identifier_column_index;
    if id_col >= columns.len() {
        return Err(TableAbsent::Malformed {
            detail: format!(
                "identifier column index {} out of range for {} column(s)",
                id_col,
                columns.len()
            ),
        });
    }

    let mut grid: Grid = body
        .into_iter()
        .map(|row| {
            kept.iter()
                .map(|&col| Some(row[col].clone()).filter(|v| !v.is_empty()))
                .collect()
        })
        .collect();

    report.cells_filled = fill_columns(&mut grid, cfg.fill_policy);

    let row_count = grid.len();
    let merged = merge_by_identifier(grid, id_col, cfg.row_order);
    report.duplicate_rows_merged = row_count - merged.len();

    let rows = merged
        .into_iter()
        .map(|cells| {
            columns
                .iter()
                .cloned()
                .zip(cells.into_iter().map(Option::unwrap_or_default))
                .collect::<BTreeMap<String, String>>()
        })
        .collect();

    debug!(
        columns = columns.len(),
        separators = report.separator_rows_dropped,
        padded = report.rows_padded,
        truncated = report.rows_truncated,
        dropped = report.columns_dropped.len(),
        filled = report.cells_filled,
        merged = report.duplicate_rows_merged,
        "normalized table"
    );

    Ok((CanonicalTable { columns, rows }, report))
}

/// Lines holding at least one pipe, split into trimmed cells.
pub fn extract_table_rows(section_text: &str) -> Vec<RawTableRow> {
    section_text
        .lines()
        .enumerate()
        .filter(|(_, line)| line.contains('|'))
        .map(|(idx, line)| RawTableRow {
            line_no: idx + 1,
            cells: split_cells(line),
        })
        .collect()
}

/// A markdown divider cell such as `---`, `:---` or `:---:`.
pub fn is_separator_cell(cell: &str) -> bool {
    let core = cell.trim();
    let core = core.strip_prefix(':').unwrap_or(core);
    let core = core.strip_suffix(':').unwrap_or(core);
    !core.is_empty() && core.chars().all(|c| c == '-')
}

/// First cell is a divider, or the first cell is blank and every filled cell is.
pub fn is_separator_row(cells: &[String]) -> bool {
    match cells.first() {
        Some(first) if is_separator_cell(first) => true,
        Some(first) if first.is_empty() => {
            let filled: Vec<&String> = cells.iter().filter(|c| !c.is_empty()).collect();
            !filled.is_empty() && filled.iter().all(|c| is_separator_cell(c))
        }
        _ => false,
    }
}

fn split_cells(line: &str) -> Vec<String> {
    let trimmed = line.trim();
    let inner = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let inner = if inner.ends_with('|') && !inner.ends_with("\\|") {
        &inner[..inner.len() - 1]
    } else {
        inner
    };

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'|') => {
                current.push('|');
                chars.next();
            }
            '|' => cells.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(c),
        }
    }
    cells.push(current.trim().to_string());
    cells
}

fn column_names(header: &[String]) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    header
        .iter()
        .enumerate()
        .map(|(idx, cell)| {
            let base = if cell.is_empty() {
                format!("column_{}", idx + 1)
            } else {
                cell.clone()
            };
            let n = seen.entry(base.clone()).or_insert(0);
            let name = if *n == 0 {
                base
            } else {
                format!("{}.{}", base, n)
            };
            *n += 1;
            name
        })
        .collect()
}

/// Fill missing cells column by column; returns how many cells were filled.
fn fill_columns(grid: &mut Grid, policy: FillPolicy) -> usize {
    if policy == FillPolicy::Disabled || grid.is_empty() {
        return 0;
    }
    let width = grid[0].len();
    let mut filled = 0;
    for col in 0..width {
        let mut last: Option<String> = None;
        for row in grid.iter_mut() {
            match &row[col] {
                Some(v) => last = Some(v.clone()),
                None => {
                    if let Some(v) = &last {
                        row[col] = Some(v.clone());
                        filled += 1;
                    }
                }
            }
        }
        let mut next: Option<String> = None;
        for row in grid.iter_mut().rev() {
            match &row[col] {
                Some(v) => next = Some(v.clone()),
                None => {
                    if let Some(v) = &next {
                        row[col] = Some(v.clone());
                        filled += 1;
                    }
                }
            }
        }
    }
    filled
}

fn merge_by_identifier(grid: Grid, id_col: usize, order: RowOrder) -> Grid {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<(String, Vec<Option<String>>)> = Vec::new();

    for row in grid {
        let key = row[id_col].clone().unwrap_or_default();
        match index.get(&key) {
            Some(&pos) => {
                let merged = &mut groups[pos].1;
                for (slot, value) in merged.iter_mut().zip(row) {
                    if value.is_some() {
                        *slot = value;
                    }
                }
            }
            None => {
                index.insert(key.clone(), groups.len());
                groups.push((key, row));
            }
        }
    }

    match order {
        RowOrder::Lexicographic => groups.sort_by(|a, b| a.0.cmp(&b.0)),
        RowOrder::Natural => groups.sort_by(|a, b| natural_cmp(&a.0, &b.0)),
        RowOrder::FirstSeen => {}
    }
    groups.into_iter().map(|(_, row)| row).collect()
}

#[derive(Debug, PartialEq, Eq)]
enum Chunk<'a> {
    Digits(&'a str),
    Text(&'a str),
}

fn chunks(s: &str) -> Vec<Chunk<'_>> {
    let mut out = Vec::new();
    let mut start = 0;
    let mut in_digits: Option<bool> = None;
    for (idx, c) in s.char_indices() {
        let digit = c.is_ascii_digit();
        match in_digits {
            Some(prev) if prev != digit => {
                out.push(make_chunk(&s[start..idx], prev));
                start = idx;
            }
            _ => {}
        }
        in_digits = Some(digit);
    }
    if let Some(prev) = in_digits {
        out.push(make_chunk(&s[start..], prev));
    }
    out
}

fn make_chunk(s: &str, digits: bool) -> Chunk<'_> {
    if digits {
        Chunk::Digits(s)
    } else {
        Chunk::Text(s)
    }
}

/// Compare identifiers with digit runs ordered numerically.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let (ca, cb) = (chunks(a), chunks(b));
    for (x, y) in ca.iter().zip(cb.iter()) {
        let ord = match (x, y) {
            (Chunk::Digits(x), Chunk::Digits(y)) => {
                let (xs, ys) = (x.trim_start_matches('0'), y.trim_start_matches('0'));
                xs.len().cmp(&ys.len()).then_with(|| xs.cmp(ys))
            }
            (Chunk::Text(x), Chunk::Text(y)) => x.cmp(y),
            (Chunk::Digits(_), Chunk::Text(_)) => Ordering::Less,
            (Chunk::Text(_), Chunk::Digits(_)) => Ordering::Greater,
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    ca.len().cmp(&cb.len()).then_with(|| a.cmp(b))
}
