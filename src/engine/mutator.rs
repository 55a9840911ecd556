//! Workbook mutator: apply an edit plan to a grid

use super::classifier::classify;
use crate::error::{WipError, WipResult};
use crate::sheet::{format_number, storage_cell, CellRef, CellValue, Grid};
use crate::types::{Change, ChangeSummary, CellKind, EditOp, EditPlan, OpKind};
use std::collections::HashSet;
use tracing::{debug, info};

/// Apply `plan` to `grid` and report what changed
///
/// Every target cell is checked before the first write, so a plan that would
/// touch a formula cell or land an append on occupied cells is rejected with
/// the grid untouched. Only the label and value cells of each row are
/// written; clears blank the value but keep the cell's style.
pub fn apply<G: Grid + ?Sized>(grid: &mut G, plan: &EditPlan) -> WipResult<ChangeSummary> {
    let changes = check(grid, plan)?;

    for op in &plan.ops {
        let row = op.row();
        let label = storage_cell(grid, CellRef::new(row, plan.label_column));
        let value = storage_cell(grid, CellRef::new(row, plan.value_column));

        match op {
            EditOp::Overwrite { job, value: v, .. } => {
                if grid.content(label).value.display_text() != *job {
                    write_job(grid, label, job)?;
                }
                write_number(grid, value, *v)?;
            }
            EditOp::Clear { .. } => {
                write_blank(grid, label)?;
                write_blank(grid, value)?;
            }
            EditOp::Append {
                job,
                value: v,
                clone_style_from,
                ..
            } => {
                if let Some(source) = clone_style_from {
                    let (first, last) = if plan.label_column <= plan.value_column {
                        (plan.label_column, plan.value_column)
                    } else {
                        (plan.value_column, plan.label_column)
                    };
                    for col in first..=last {
                        grid.copy_style(CellRef::new(*source, col), CellRef::new(row, col));
                    }
                }
                write_job(grid, label, job)?;
                write_number(grid, value, *v)?;
            }
        }
        debug!(marker = %plan.marker, row, op = %op.kind(), "applied");
    }

    let summary = ChangeSummary {
        marker: plan.marker.clone(),
        label_column: plan.label_column,
        value_column: plan.value_column,
        changes,
    };
    info!(
        marker = %plan.marker,
        overwrites = summary.count(OpKind::Overwrite),
        clears = summary.count(OpKind::Clear),
        appends = summary.count(OpKind::Append),
        "section written"
    );
    Ok(summary)
}

/// Verify every operation of `plan` against `grid` without writing
///
/// Returns the change records `apply` would report.
pub fn check<G: Grid + ?Sized>(grid: &G, plan: &EditPlan) -> WipResult<Vec<Change>> {
    let cleared: HashSet<u32> = plan
        .ops
        .iter()
        .filter(|op| op.kind() == OpKind::Clear)
        .map(EditOp::row)
        .collect();

    let mut changes = Vec::with_capacity(plan.ops.len());
    for op in &plan.ops {
        let row = op.row();
        let label = storage_cell(grid, CellRef::new(row, plan.label_column));
        let value = storage_cell(grid, CellRef::new(row, plan.value_column));

        for at in [label, value] {
            ensure_writable(grid, at)?;
            if op.kind() == OpKind::Append
                && !cleared.contains(&row)
                && !grid.content(at).value.is_blank()
            {
                return Err(WipError::AppendCollision {
                    row: at.row,
                    column: at.col,
                });
            }
        }

        let (job, old_value, new_value) = match op {
            EditOp::Overwrite { job, value: v, .. } => {
                (job.clone(), grid.content(value).value, Some(*v))
            }
            EditOp::Append { job, value: v, .. } => (job.clone(), CellValue::Blank, Some(*v)),
            EditOp::Clear { job, .. } => (job.clone(), grid.content(value).value, None),
        };
        changes.push(Change {
            row,
            job,
            operation: op.kind(),
            old_value,
            new_value,
        });
    }
    Ok(changes)
}

fn ensure_writable<G: Grid + ?Sized>(grid: &G, at: CellRef) -> WipResult<()> {
    if classify(&grid.content(at)) == CellKind::Formula {
        return Err(WipError::FormulaProtectionViolation {
            row: at.row,
            column: at.col,
        });
    }
    Ok(())
}

fn write_number<G: Grid + ?Sized>(grid: &mut G, at: CellRef, value: f64) -> WipResult<()> {
    ensure_writable(grid, at)?;
    grid.set_number(at, value);
    Ok(())
}

/// Job keys that read back as the same number ("400", "12.5") are stored as
/// numbers, like the keys already in the sheet; "007" or "2417-B" stay text
fn write_job<G: Grid + ?Sized>(grid: &mut G, at: CellRef, job: &str) -> WipResult<()> {
    ensure_writable(grid, at)?;
    match numeric_job(job) {
        Some(n) => grid.set_number(at, n),
        None => grid.set_text(at, job),
    }
    Ok(())
}

fn numeric_job(job: &str) -> Option<f64> {
    job.parse::<f64>()
        .ok()
        .filter(|n| n.is_finite() && format_number(*n) == job)
}

fn write_blank<G: Grid + ?Sized>(grid: &mut G, at: CellRef) -> WipResult<()> {
    ensure_writable(grid, at)?;
    grid.set_blank(at);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::{CellContent, MemorySheet};
    use pretty_assertions::assert_eq;

    fn plan(ops: Vec<EditOp>) -> EditPlan {
        EditPlan {
            marker: "5040".to_string(),
            label_column: 1,
            value_column: 2,
            ops,
        }
    }

    fn sheet() -> MemorySheet {
        MemorySheet::new()
            .with_text(1, 1, "5040")
            .with_text(2, 1, "100")
            .with_number(2, 2, 50.0)
            .with_style(2, 2, 7)
            .with_text(3, 1, "200")
            .with_number(3, 2, 0.0)
            .with_style(3, 1, 4)
            .with_style(3, 2, 5)
            .with_text(4, 1, "Total")
            .with_formula(4, 2, "SUM(B2:B3)")
    }

    #[test]
    fn test_overwrite_clear_append() {
        let mut sheet = sheet();
        let summary = apply(
            &mut sheet,
            &plan(vec![
                EditOp::Overwrite {
                    row: 2,
                    job: "100".into(),
                    value: 75.0,
                },
                EditOp::Clear {
                    row: 3,
                    job: "200".into(),
                },
                EditOp::Append {
                    row: 3,
                    job: "300".into(),
                    value: 10.0,
                    clone_style_from: None,
                    relocated_from: None,
                },
            ]),
        )
        .unwrap();

        assert_eq!(sheet.content(CellRef::new(2, 2)), CellContent::number(75.0));
        assert_eq!(sheet.style_of(CellRef::new(2, 2)), 7);
        assert_eq!(sheet.content(CellRef::new(3, 1)), CellContent::number(300.0));
        assert_eq!(sheet.content(CellRef::new(3, 2)), CellContent::number(10.0));
        // Reused row keeps its own formatting
        assert_eq!(sheet.style_of(CellRef::new(3, 1)), 4);
        assert_eq!(sheet.style_of(CellRef::new(3, 2)), 5);

        assert_eq!(summary.changes.len(), 3);
        assert_eq!(summary.changes[0].old_value, CellValue::Number(50.0));
        assert_eq!(summary.changes[1].old_value, CellValue::Number(0.0));
        assert_eq!(summary.changes[1].new_value, None);
        assert_eq!(summary.count(OpKind::Append), 1);
    }

    #[test]
    fn test_append_clones_style() {
        let mut sheet = sheet().with_style(3, 1, 11);
        apply(
            &mut sheet,
            &plan(vec![EditOp::Append {
                row: 6,
                job: "400".into(),
                value: 1.0,
                clone_style_from: Some(3),
                relocated_from: None,
            }]),
        )
        .unwrap();
        assert_eq!(sheet.style_of(CellRef::new(6, 1)), 11);
        assert_eq!(sheet.style_of(CellRef::new(6, 2)), 5);
    }

    #[test]
    fn test_formula_cell_is_refused_before_any_write() {
        let mut sheet = sheet();
        let before = sheet.clone();
        let err = apply(
            &mut sheet,
            &plan(vec![
                EditOp::Overwrite {
                    row: 2,
                    job: "100".into(),
                    value: 1.0,
                },
                EditOp::Overwrite {
                    row: 4,
                    job: "Total".into(),
                    value: 2.0,
                },
            ]),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            WipError::FormulaProtectionViolation { row: 4, column: 2 }
        ));
        assert_eq!(sheet, before);
    }

    #[test]
    fn test_string_formula_is_protected() {
        let mut sheet = MemorySheet::new().with_text(2, 2, "=A2*2");
        let err = apply(
            &mut sheet,
            &plan(vec![EditOp::Clear {
                row: 2,
                job: String::new(),
            }]),
        )
        .unwrap_err();
        assert!(matches!(err, WipError::FormulaProtectionViolation { .. }));
    }

    #[test]
    fn test_append_collision() {
        let mut sheet = sheet();
        let err = apply(
            &mut sheet,
            &plan(vec![EditOp::Append {
                row: 2,
                job: "900".into(),
                value: 1.0,
                clone_style_from: None,
                relocated_from: None,
            }]),
        )
        .unwrap_err();
        assert!(matches!(err, WipError::AppendCollision { row: 2, column: 1 }));
    }

    #[test]
    fn test_formulas_unchanged() {
        let mut sheet = sheet();
        let before = sheet.formulas();
        apply(
            &mut sheet,
            &plan(vec![EditOp::Clear {
                row: 2,
                job: "100".into(),
            }]),
        )
        .unwrap();
        assert_eq!(sheet.formulas(), before);
    }

    #[test]
    fn test_job_keys_keep_numeric_type() {
        let mut sheet = sheet();
        let append = |row: u32, job: &str| EditOp::Append {
            row,
            job: job.into(),
            value: 1.0,
            clone_style_from: None,
            relocated_from: None,
        };
        apply(
            &mut sheet,
            &plan(vec![append(5, "400"), append(6, "2417-B"), append(7, "007")]),
        )
        .unwrap();

        assert_eq!(sheet.content(CellRef::new(5, 1)), CellContent::number(400.0));
        assert_eq!(sheet.content(CellRef::new(6, 1)), CellContent::text("2417-B"));
        assert_eq!(sheet.content(CellRef::new(7, 1)), CellContent::text("007"));
    }
}
