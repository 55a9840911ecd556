use crate::sheet::CellValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

//==============================================================================
// Classification
//==============================================================================

/// What a single cell holds, as far as writes are concerned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CellKind {
    Formula,
    Value,
    Blank,
}

/// Per-row mutability inside a section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RowClass {
    /// Label or value cell is a formula; the row is frozen
    FormulaRow,
    /// Plain values; eligible for overwrite or clear
    DataRow,
    /// Label and value both blank; ends the extent
    BlankTerminator,
}

impl fmt::Display for RowClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RowClass::FormulaRow => "formula",
            RowClass::DataRow => "data",
            RowClass::BlankTerminator => "terminator",
        };
        f.write_str(name)
    }
}

//==============================================================================
// Sections
//==============================================================================

/// A located section of a sheet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Section {
    /// Marker substring the header was found by (e.g. "5040")
    pub marker: String,
    pub anchor_row: u32,
    pub marker_column: u32,
    /// Column holding job numbers
    pub label_column: u32,
    /// Column holding the metric
    pub value_column: u32,
    /// First row below the header where data may appear
    pub data_start_row: u32,
    /// Style source for appends when the section has no data rows
    pub template_row: Option<u32>,
}

/// A data row as found in the sheet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExistingRow {
    pub row: u32,
    /// Trimmed label text
    pub job: String,
    /// Current content of the value cell
    pub value: CellValue,
}

/// Current extent of one section plus its per-row classification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SectionExtent {
    pub section: Section,
    /// Classification of every walked row (terminator included)
    pub rows: BTreeMap<u32, RowClass>,
    /// Data rows, ascending
    pub data_rows: Vec<ExistingRow>,
    /// Last row inside the extent; `data_start_row - 1` when the extent is empty
    pub extent_end_row: u32,
    /// Last row the walk was allowed to visit
    pub bound_row: u32,
    /// Whether a blank terminator row was found before the bound
    pub terminated: bool,
    /// Blank rows directly below the extent that appends may claim;
    /// `None` when the blank run reaches past the used range
    pub append_capacity: Option<usize>,
}

impl SectionExtent {
    pub fn marker(&self) -> &str {
        &self.section.marker
    }

    /// Highest data row, used as the style source for appended rows
    pub fn last_data_row(&self) -> Option<u32> {
        self.data_rows.last().map(|r| r.row)
    }

    pub fn formula_rows(&self) -> impl Iterator<Item = u32> + '_ {
        self.rows
            .iter()
            .filter(|(_, class)| **class == RowClass::FormulaRow)
            .map(|(row, _)| *row)
    }
}

//==============================================================================
// Targets
//==============================================================================

/// One `(job, value)` pair from the upstream aggregation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetRow {
    #[serde(deserialize_with = "crate::targets::job_key")]
    pub job: String,
    pub value: f64,
}

impl TargetRow {
    pub fn new(job: impl Into<String>, value: f64) -> Self {
        Self {
            job: job.into(),
            value,
        }
    }
}

/// Ordered target rows for one section marker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetTable {
    pub marker: String,
    #[serde(default)]
    pub rows: Vec<TargetRow>,
}

impl TargetTable {
    pub fn new(marker: impl Into<String>, rows: Vec<TargetRow>) -> Self {
        Self {
            marker: marker.into(),
            rows,
        }
    }
}

//==============================================================================
// Edit plans
//==============================================================================

/// A single row operation
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum EditOp {
    Overwrite {
        row: u32,
        job: String,
        value: f64,
    },
    Append {
        row: u32,
        job: String,
        value: f64,
        /// Row whose style is copied onto this one (rows beyond the old extent)
        clone_style_from: Option<u32>,
        /// Set when an existing job is moved up to close a hole
        relocated_from: Option<u32>,
    },
    Clear {
        row: u32,
        job: String,
    },
}

impl EditOp {
    pub fn row(&self) -> u32 {
        match self {
            EditOp::Overwrite { row, .. } | EditOp::Append { row, .. } | EditOp::Clear { row, .. } => {
                *row
            }
        }
    }

    pub fn kind(&self) -> OpKind {
        match self {
            EditOp::Overwrite { .. } => OpKind::Overwrite,
            EditOp::Append { .. } => OpKind::Append,
            EditOp::Clear { .. } => OpKind::Clear,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OpKind {
    Overwrite,
    Append,
    Clear,
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OpKind::Overwrite => "OVERWRITE",
            OpKind::Append => "APPEND",
            OpKind::Clear => "CLEAR",
        };
        f.write_str(name)
    }
}

/// Ordered operations for one section; holds no workbook reference
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditPlan {
    pub marker: String,
    pub label_column: u32,
    pub value_column: u32,
    pub ops: Vec<EditOp>,
}

impl EditPlan {
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }
}

//==============================================================================
// Results
//==============================================================================

/// One row of a preview / audit diff
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Change {
    pub row: u32,
    pub job: String,
    pub operation: OpKind,
    pub old_value: CellValue,
    pub new_value: Option<f64>,
}

/// Applied (or previewed) changes of one section
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChangeSummary {
    pub marker: String,
    pub label_column: u32,
    pub value_column: u32,
    pub changes: Vec<Change>,
}

impl ChangeSummary {
    pub fn count(&self, kind: OpKind) -> usize {
        self.changes.iter().filter(|c| c.operation == kind).count()
    }
}

/// Non-fatal conditions surfaced to the caller
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// Scan reached its bound without a blank terminator row
    UnterminatedSection { marker: String, bound_row: u32 },
    /// Several data rows share one job key; the lowest row wins
    AmbiguousJobKey {
        marker: String,
        job: String,
        rows: Vec<u32>,
    },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::UnterminatedSection { marker, bound_row } => write!(
                f,
                "section '{}' has no blank row before row {}; using it as the extent end",
                marker, bound_row
            ),
            Warning::AmbiguousJobKey { marker, job, rows } => write!(
                f,
                "section '{}' lists job '{}' on rows {:?}; row {} is kept",
                marker,
                job,
                rows,
                rows.first().copied().unwrap_or_default()
            ),
        }
    }
}

/// Result of reconciling every requested section of one sheet
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconcileOutcome {
    pub sheet: String,
    pub summaries: Vec<ChangeSummary>,
    pub warnings: Vec<Warning>,
}

impl ReconcileOutcome {
    pub fn total_changes(&self) -> usize {
        self.summaries.iter().map(|s| s.changes.len()).sum()
    }

    pub fn summary(&self, marker: &str) -> Option<&ChangeSummary> {
        self.summaries.iter().find(|s| s.marker == marker)
    }
}
