//! Reconciler: diff a target table against a section's current extent
//!
//! Planning works on a final row layout first and derives the operations from
//! it:
//! 1. target jobs already on a data row keep that row (first occurrence wins)
//! 2. other data rows become free (job gone, duplicate, or unlabeled)
//! 3. new jobs fill free rows top-down, then the rows below the extent
//! 4. free rows left above an occupied row are closed by moving the
//!    bottom-most occupied row up, so the block stays contiguous
//!
//! Formula rows never enter the layout. Matching is exact on trimmed text.

use crate::error::{WipError, WipResult};
use crate::types::{EditOp, EditPlan, SectionExtent, TargetTable, Warning};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::{info, warn};

/// Slot in the final layout
#[derive(Debug, Clone, Copy)]
struct Occupant {
    /// Index into the target table
    target: usize,
    /// Row the job sits on today, if it is already in the section
    origin: Option<u32>,
}

/// Compute the edit plan that turns `extent` into `target`
pub fn plan(extent: &SectionExtent, target: &TargetTable) -> WipResult<(EditPlan, Vec<Warning>)> {
    let marker = extent.marker().to_string();
    validate_target(&marker, target)?;

    let mut warnings = Vec::new();

    // 1. existing_jobs: trimmed job → first data row carrying it
    let mut existing_jobs: HashMap<&str, u32> = HashMap::new();
    let mut duplicates: BTreeMap<&str, Vec<u32>> = BTreeMap::new();
    for data_row in &extent.data_rows {
        if data_row.job.is_empty() {
            continue;
        }
        match existing_jobs.get(data_row.job.as_str()) {
            Some(first) => duplicates
                .entry(data_row.job.as_str())
                .or_insert_with(|| vec![*first])
                .push(data_row.row),
            None => {
                existing_jobs.insert(data_row.job.as_str(), data_row.row);
            }
        }
    }
    for (job, rows) in duplicates {
        warn!(marker = %marker, job, ?rows, "ambiguous job key");
        warnings.push(Warning::AmbiguousJobKey {
            marker: marker.clone(),
            job: job.to_string(),
            rows,
        });
    }

    // 2. matched jobs keep their row; queue the rest
    let mut layout: BTreeMap<u32, Occupant> = BTreeMap::new();
    let mut queued = Vec::new();
    for (idx, row) in target.rows.iter().enumerate() {
        match existing_jobs.remove(row.job.trim()) {
            Some(existing_row) => {
                layout.insert(
                    existing_row,
                    Occupant {
                        target: idx,
                        origin: Some(existing_row),
                    },
                );
            }
            None => queued.push(idx),
        }
    }

    // 3. unconsumed data rows are free; new jobs claim them, then rows below
    let mut free: BTreeSet<u32> = extent
        .data_rows
        .iter()
        .map(|r| r.row)
        .filter(|row| !layout.contains_key(row))
        .collect();

    let mut next_row = extent.extent_end_row + 1;
    let mut beyond = 0usize;
    for idx in queued {
        let row = match free.pop_first() {
            Some(row) => row,
            None => {
                let row = next_row;
                next_row += 1;
                beyond += 1;
                row
            }
        };
        layout.insert(
            row,
            Occupant {
                target: idx,
                origin: None,
            },
        );
    }

    if let Some(available) = extent.append_capacity {
        if beyond > available {
            return Err(WipError::SectionOverflow {
                marker,
                needed: beyond,
                available,
            });
        }
    }

    // 4. close holes above occupied rows
    while let (Some(&hole), Some((&last, _))) = (free.first(), layout.last_key_value()) {
        if hole > last {
            break;
        }
        free.remove(&hole);
        if let Some(occupant) = layout.remove(&last) {
            layout.insert(hole, occupant);
        }
        if extent.data_rows.iter().any(|r| r.row == last) {
            free.insert(last);
        }
    }

    let ops = derive_ops(extent, target, &layout);
    let plan = EditPlan {
        marker: marker.clone(),
        label_column: extent.section.label_column,
        value_column: extent.section.value_column,
        ops,
    };

    info!(
        marker = %marker,
        ops = plan.len(),
        appended_rows = beyond,
        "planned section"
    );

    Ok((plan, warnings))
}

/// Turn the final layout into ordered operations: overwrites and appends in
/// target order, clears ascending
fn derive_ops(
    extent: &SectionExtent,
    target: &TargetTable,
    layout: &BTreeMap<u32, Occupant>,
) -> Vec<EditOp> {
    let style_source = extent
        .last_data_row()
        .or(extent.section.template_row);

    let current: HashMap<u32, &crate::types::ExistingRow> =
        extent.data_rows.iter().map(|r| (r.row, r)).collect();

    let mut final_rows: Vec<(usize, u32, Occupant)> = layout
        .iter()
        .map(|(row, occupant)| (occupant.target, *row, *occupant))
        .collect();
    final_rows.sort_by_key(|(target_idx, _, _)| *target_idx);

    let mut overwrites = Vec::new();
    let mut appends = Vec::new();
    for (target_idx, row, occupant) in &final_rows {
        let wanted = &target.rows[*target_idx];
        let job = wanted.job.trim().to_string();
        if occupant.origin == Some(*row) {
            let unchanged = current
                .get(row)
                .and_then(|existing| existing.value.as_number())
                .is_some_and(|v| v == wanted.value);
            if !unchanged {
                overwrites.push(EditOp::Overwrite {
                    row: *row,
                    job,
                    value: wanted.value,
                });
            }
        } else {
            appends.push(EditOp::Append {
                row: *row,
                job,
                value: wanted.value,
                clone_style_from: if *row > extent.extent_end_row {
                    style_source
                } else {
                    None
                },
                relocated_from: occupant.origin,
            });
        }
    }

    let clears = extent.data_rows.iter().filter_map(|existing| {
        let stays = layout
            .get(&existing.row)
            .is_some_and(|occupant| occupant.origin == Some(existing.row));
        (!stays).then(|| EditOp::Clear {
            row: existing.row,
            job: existing.job.clone(),
        })
    });

    overwrites.into_iter().chain(clears).chain(appends).collect()
}

fn validate_target(marker: &str, target: &TargetTable) -> WipResult<()> {
    let mut seen = HashSet::new();
    for row in &target.rows {
        let job = row.job.trim();
        if job.is_empty() {
            return Err(WipError::InvalidTarget {
                marker: marker.to_string(),
                reason: "empty job key".to_string(),
            });
        }
        if !row.value.is_finite() {
            return Err(WipError::InvalidTarget {
                marker: marker.to_string(),
                reason: format!("job '{}' has non-finite value {}", job, row.value),
            });
        }
        if !seen.insert(job) {
            return Err(WipError::InvalidTarget {
                marker: marker.to_string(),
                reason: format!("job '{}' listed twice", job),
            });
        }
    }
    Ok(())
}
