use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Literal delimiter the master prompt asks the model to put between sections.
pub const SECTION_SENTINEL: &str = "---SECTION_SPLIT---";

/// Positional role of a section inside one completion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum SectionKind {
    Frs,
    Oq,
    Rtm,
}

impl SectionKind {
    pub const ALL: [SectionKind; 3] = [SectionKind::Frs, SectionKind::Oq, SectionKind::Rtm];

    pub fn from_position(idx: usize) -> Option<Self> {
        Self::ALL.get(idx).copied()
    }

    pub fn position(self) -> usize {
        match self {
            SectionKind::Frs => 0,
            SectionKind::Oq => 1,
            SectionKind::Rtm => 2,
        }
    }

    /// Worksheet name used in the exported workbook.
    pub fn sheet_name(self) -> &'static str {
        match self {
            SectionKind::Frs => "FRS",
            SectionKind::Oq => "OQ",
            SectionKind::Rtm => "RTM",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            SectionKind::Frs => "Functional Requirements Specification",
            SectionKind::Oq => "Operational Qualification Protocol",
            SectionKind::Rtm => "Requirements Traceability Matrix",
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.sheet_name())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Section {
    pub kind: SectionKind,
    pub text: String,
}

/// Why a section could not be processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionAbsent(pub SectionKind);

impl fmt::Display for SectionAbsent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "section {} absent from completion", self.0)
    }
}

/// Cells of one pipe-containing line, before any cleaning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawTableRow {
    pub line_no: usize,
    pub cells: Vec<String>,
}

/// Why a section produced no table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TableAbsent {
    /// Fewer than header + divider + one data row.
    TooFewTableLines { found: usize },
    /// Every column was empty once separator rows were removed.
    NoColumns,
    /// Only header and separator rows were present.
    NoDataRows,
    Malformed { detail: String },
}

impl fmt::Display for TableAbsent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableAbsent::TooFewTableLines { found } => {
                write!(f, "only {} table line(s) found, need at least 3", found)
            }
            TableAbsent::NoColumns => f.write_str("no column carries any data"),
            TableAbsent::NoDataRows => f.write_str("table has a header but no data rows"),
            TableAbsent::Malformed { detail } => write!(f, "malformed table: {}", detail),
        }
    }
}

/// Cleaned, deduplicated, fully populated table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CanonicalTable {
    pub columns: Vec<String>,
    pub rows: Vec<BTreeMap<String, String>>,
}

impl CanonicalTable {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Name of the identifier column, if the table has any column.
    pub fn identifier_column(&self) -> Option<&str> {
        self.columns.first().map(String::as_str)
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&str> {
        self.rows.get(row)?.get(column).map(String::as_str)
    }

    /// Rows as cell vectors in column order; missing cells come out empty.
    pub fn ordered_rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .map(|c| row.get(c).cloned().unwrap_or_default())
                    .collect()
            })
            .collect()
    }
}

/// Counters describing what the normalizer had to repair.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NormalizeReport {
    pub table_lines: usize,
    pub separator_rows_dropped: usize,
    pub rows_padded: usize,
    pub rows_truncated: usize,
    pub columns_dropped: Vec<String>,
    pub cells_filled: usize,
    pub duplicate_rows_merged: usize,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FillPolicy {
    /// Forward fill then backward fill within each column.
    #[default]
    ForwardThenBackward,
    /// Leave empty cells untouched.
    Disabled,
}

/// Output order of merged identifier rows.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RowOrder {
    /// Byte-wise ascending identifier.
    #[default]
    Lexicographic,
    /// Ascending identifier with digit runs compared numerically (FRS-2 < FRS-10).
    Natural,
    /// Order of each identifier's first appearance in the completion.
    FirstSeen,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NormalizeConfig {
    pub identifier_column_index: usize,
    pub fill_policy: FillPolicy,
    pub row_order: RowOrder,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            identifier_column_index: 0,
            fill_policy: FillPolicy::ForwardThenBackward,
            row_order: RowOrder::Lexicographic,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct CoverageSummary {
    pub total: usize,
    pub gap_count: usize,
    /// `None` when the table has no rows.
    pub percentage: Option<u8>,
}
