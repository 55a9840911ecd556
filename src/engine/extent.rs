//! Region extent resolver: walk a section's data block row by row

use super::classifier::classify;
use crate::config::ScanLimits;
use crate::sheet::{storage_cell, CellContent, CellRef, Grid};
use crate::types::{CellKind, ExistingRow, RowClass, Section, SectionExtent, Warning};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Walk `section` from its first data row until a blank terminator or the bound
///
/// The bound is the row above `next_anchor_row`. For the last section it is
/// the first row past the used range. That row is blank by construction and
/// acts as a synthetic terminator: a last section that runs to the final used
/// row terminates there, and only `limits.max_section_rows` can leave it
/// unterminated. Hitting the bound without a terminator yields an
/// [`Warning::UnterminatedSection`] and the bound is used as the extent end.
pub fn resolve<G: Grid + ?Sized>(
    grid: &G,
    section: &Section,
    next_anchor_row: Option<u32>,
    limits: &ScanLimits,
) -> (SectionExtent, Option<Warning>) {
    let used_rows = grid.used_rows();
    let mut bound = match next_anchor_row {
        Some(next) => next.saturating_sub(1),
        None => used_rows
            .max(section.data_start_row.saturating_sub(1))
            .saturating_add(1),
    };
    if let Some(max_rows) = limits.max_section_rows {
        bound = bound.min(
            section
                .data_start_row
                .saturating_add(max_rows.saturating_sub(1)),
        );
    }

    let mut rows = BTreeMap::new();
    let mut data_rows = Vec::new();
    let mut terminator = None;

    for row in section.data_start_row..=bound {
        let label = read(grid, row, section.label_column);
        let value = read(grid, row, section.value_column);
        let class = classify_row(&label, &value);
        debug!(marker = %section.marker, row, class = %class, "classified row");
        rows.insert(row, class);

        match class {
            RowClass::BlankTerminator => {
                terminator = Some(row);
                break;
            }
            RowClass::DataRow => data_rows.push(ExistingRow {
                row,
                job: label.value.display_text(),
                value: value.value,
            }),
            RowClass::FormulaRow => {}
        }
    }

    let extent_end_row = match terminator {
        Some(row) => row - 1,
        None => bound.max(section.data_start_row.saturating_sub(1)),
    };

    let warning = if terminator.is_none() {
        warn!(marker = %section.marker, bound_row = bound, "section has no blank terminator row");
        Some(Warning::UnterminatedSection {
            marker: section.marker.clone(),
            bound_row: bound,
        })
    } else {
        None
    };

    let append_capacity = match terminator {
        Some(row) => free_rows_below(grid, section, row, next_anchor_row),
        None => Some(0),
    };

    let extent = SectionExtent {
        section: section.clone(),
        rows,
        data_rows,
        extent_end_row,
        bound_row: bound,
        terminated: terminator.is_some(),
        append_capacity,
    };

    (extent, warning)
}

/// Row rule: a formula in either cell freezes the row, two blanks end the block
fn classify_row(label: &CellContent, value: &CellContent) -> RowClass {
    let (label_kind, value_kind) = (classify(label), classify(value));
    if label_kind == CellKind::Formula || value_kind == CellKind::Formula {
        RowClass::FormulaRow
    } else if label_kind == CellKind::Blank && value_kind == CellKind::Blank {
        RowClass::BlankTerminator
    } else {
        RowClass::DataRow
    }
}

fn read<G: Grid + ?Sized>(grid: &G, row: u32, col: u32) -> CellContent {
    grid.content(storage_cell(grid, CellRef::new(row, col)))
}

/// Count the blank rows from the terminator that appends may fill
///
/// When the run ends at other content (a footer, a subtotal, a note), its
/// last row stays blank so the block keeps a terminator; filling it would make
/// the next resolve walk into that content. A run that reaches the next
/// anchor is usable in full, since the bound stops the walk there.
/// Returns `None` for the last section once the run passes the used range:
/// everything below is free.
fn free_rows_below<G: Grid + ?Sized>(
    grid: &G,
    section: &Section,
    terminator_row: u32,
    next_anchor_row: Option<u32>,
) -> Option<usize> {
    let used_rows = grid.used_rows();
    let last = match next_anchor_row {
        Some(next) => next.saturating_sub(1),
        None => used_rows,
    };

    let mut free: usize = 0;
    let mut row = terminator_row;
    while row <= last {
        let label = read(grid, row, section.label_column);
        let value = read(grid, row, section.value_column);
        if classify_row(&label, &value) != RowClass::BlankTerminator {
            return Some(free.saturating_sub(1));
        }
        free += 1;
        row += 1;
    }

    match next_anchor_row {
        Some(_) => Some(free),
        None => None,
    }
}
