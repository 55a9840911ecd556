//! Section reconciliation engine
//!
//! Leaves first: [`classifier`] → [`locator`] → [`extent`] → [`reconciler`] →
//! [`mutator`]. [`reconcile_sheet`] composes them over every configured section
//! of one sheet; [`preview_sheet`] does the same against a throwaway copy.

pub mod classifier;
pub mod extent;
pub mod locator;
pub mod mutator;
pub mod reconciler;

use crate::config::{ScanLimits, SectionLayout};
use crate::error::{WipError, WipResult};
use crate::sheet::Grid;
use crate::types::{ChangeSummary, EditPlan, ReconcileOutcome, SectionExtent, TargetTable, Warning};
use tracing::{info, warn};

/// A section resolved and planned, not yet applied
#[derive(Debug, Clone)]
pub struct PlannedSection {
    pub extent: SectionExtent,
    pub plan: EditPlan,
}

/// Locate, resolve and plan every section of `grid` without writing
///
/// All configured sections are located (a missing marker fails here), but
/// only those with a target table are planned. A target table naming a
/// marker that is not configured is rejected.
pub fn plan_sheet<G: Grid + ?Sized>(
    grid: &G,
    layouts: &[SectionLayout],
    targets: &[TargetTable],
    limits: &ScanLimits,
) -> WipResult<(Vec<PlannedSection>, Vec<Warning>)> {
    for table in targets {
        if !layouts.iter().any(|l| same_marker(&l.marker, &table.marker)) {
            return Err(WipError::InvalidTarget {
                marker: table.marker.clone(),
                reason: "no section with this marker is configured".to_string(),
            });
        }
    }

    let sections = locator::locate(grid, layouts, limits)?;
    let mut planned = Vec::new();
    let mut warnings = Vec::new();

    for (idx, section) in sections.iter().enumerate() {
        let Some(table) = targets.iter().find(|t| same_marker(&t.marker, &section.marker)) else {
            continue;
        };
        let next_anchor = sections.get(idx + 1).map(|s| s.anchor_row);
        let (extent, warning) = extent::resolve(grid, section, next_anchor, limits);
        warnings.extend(warning);

        let (plan, plan_warnings) = reconciler::plan(&extent, table)?;
        warnings.extend(plan_warnings);
        planned.push(PlannedSection { extent, plan });
    }

    Ok((planned, warnings))
}

/// Reconcile every targeted section of one sheet in place
///
/// Every plan is computed and checked against the grid before the first write,
/// so [`WipError::SectionNotFound`], formula protection and collisions are
/// raised with the grid untouched.
pub fn reconcile_sheet<G: Grid + ?Sized>(
    grid: &mut G,
    sheet: &str,
    layouts: &[SectionLayout],
    targets: &[TargetTable],
    limits: &ScanLimits,
) -> WipResult<ReconcileOutcome> {
    let (planned, warnings) = plan_sheet(grid, layouts, targets, limits)?;
    for section in &planned {
        mutator::check(grid, &section.plan)?;
    }

    let mut summaries: Vec<ChangeSummary> = Vec::with_capacity(planned.len());
    for section in &planned {
        summaries.push(mutator::apply(grid, &section.plan)?);
    }

    for warning in &warnings {
        warn!(sheet, "{}", warning);
    }

    let outcome = ReconcileOutcome {
        sheet: sheet.to_string(),
        summaries,
        warnings,
    };
    info!(sheet, changes = outcome.total_changes(), "reconciled sheet");
    Ok(outcome)
}

/// Same as [`reconcile_sheet`], run against a clone that is dropped afterwards
pub fn preview_sheet<G: Grid + Clone>(
    grid: &G,
    sheet: &str,
    layouts: &[SectionLayout],
    targets: &[TargetTable],
    limits: &ScanLimits,
) -> WipResult<ReconcileOutcome> {
    let mut scratch = grid.clone();
    reconcile_sheet(&mut scratch, sheet, layouts, targets, limits)
}

fn same_marker(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}
