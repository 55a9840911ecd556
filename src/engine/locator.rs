//! Section locator: find marker headers in the used range

use super::classifier::classify;
use crate::config::{ScanLimits, SectionLayout};
use crate::error::{WipError, WipResult};
use crate::sheet::{CellRef, Grid};
use crate::types::{CellKind, Section};
use tracing::{debug, info};

/// Locate every configured section, ordered by anchor row
///
/// Rows are scanned top-to-bottom and columns left-to-right; the first value
/// cell whose trimmed, lower-cased text contains the marker (or an alias)
/// anchors that section. A marker that matches nothing is an error, never a
/// default position.
pub fn locate<G: Grid + ?Sized>(
    grid: &G,
    layouts: &[SectionLayout],
    limits: &ScanLimits,
) -> WipResult<Vec<Section>> {
    let max_row = limit(grid.used_rows(), limits.max_marker_rows);
    let max_col = limit(grid.used_columns(), limits.max_marker_columns);
    let needles: Vec<Vec<String>> = layouts.iter().map(SectionLayout::needles).collect();
    let mut found: Vec<Option<CellRef>> = vec![None; layouts.len()];

    'rows: for row in 1..=max_row {
        for col in 1..=max_col {
            let at = CellRef::new(row, col);
            let content = grid.content(at);
            if classify(&content) != CellKind::Value {
                continue;
            }
            let text = content.value.display_text().to_lowercase();
            for (idx, layout_needles) in needles.iter().enumerate() {
                if found[idx].is_none() && layout_needles.iter().any(|n| text.contains(n.as_str())) {
                    debug!(marker = %layouts[idx].marker, cell = %at, text = %text, "marker matched");
                    found[idx] = Some(at);
                }
            }
            if found.iter().all(Option::is_some) {
                break 'rows;
            }
        }
    }

    let mut sections = Vec::with_capacity(layouts.len());
    for (layout, at) in layouts.iter().zip(found) {
        let at = at.ok_or_else(|| WipError::SectionNotFound {
            marker: layout.marker.clone(),
        })?;
        sections.push(build_section(layout, at)?);
    }

    sections.sort_by_key(|s| s.anchor_row);
    for pair in sections.windows(2) {
        let (first, second) = (&pair[0], &pair[1]);
        if second.anchor_row < first.data_start_row {
            return Err(WipError::OverlappingSections {
                first: first.marker.clone(),
                second: second.marker.clone(),
                row: second.anchor_row,
            });
        }
    }

    for section in &sections {
        info!(
            marker = %section.marker,
            anchor_row = section.anchor_row,
            label_column = section.label_column,
            value_column = section.value_column,
            "located section"
        );
    }

    Ok(sections)
}

fn limit(used: u32, cap: Option<u32>) -> u32 {
    cap.map_or(used, |cap| used.min(cap))
}

fn build_section(layout: &SectionLayout, at: CellRef) -> WipResult<Section> {
    let label_column = layout.label_column.resolve(at.col)?;
    let value_column = layout.value_column.resolve(at.col)?;
    if label_column == value_column {
        return Err(WipError::Config(format!(
            "section '{}': label and value both resolve to column {}",
            layout.marker, label_column
        )));
    }

    Ok(Section {
        marker: layout.marker.clone(),
        anchor_row: at.row,
        marker_column: at.col,
        label_column,
        value_column,
        data_start_row: at.row + layout.header_rows,
        template_row: layout.template_row,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ColumnSpec;
    use crate::sheet::MemorySheet;

    fn layouts() -> Vec<SectionLayout> {
        vec![SectionLayout::new("5040"), SectionLayout::new("5030")]
    }

    fn sheet() -> MemorySheet {
        MemorySheet::new()
            .with_text(1, 1, "WIP Report - Jun 25")
            .with_text(3, 1, "  Sub Labor Cost - 5040 ")
            .with_text(4, 1, "100")
            .with_number(4, 2, 50.0)
            .with_text(7, 1, "MATERIAL - 5030")
            .with_text(8, 1, "100")
            .with_number(8, 2, 12.5)
    }

    #[test]
    fn test_locate_orders_by_anchor_row() {
        // Requested in reverse order, returned top-down
        let reversed: Vec<SectionLayout> = layouts().into_iter().rev().collect();
        let sections = locate(&sheet(), &reversed, &ScanLimits::default()).unwrap();
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].marker, "5040");
        assert_eq!(sections[0].anchor_row, 3);
        assert_eq!(sections[0].data_start_row, 4);
        assert_eq!(sections[0].label_column, 1);
        assert_eq!(sections[0].value_column, 2);
        assert_eq!(sections[1].marker, "5030");
        assert_eq!(sections[1].anchor_row, 7);
    }

    #[test]
    fn test_locate_case_insensitive_alias() {
        let sheet = MemorySheet::new().with_text(2, 3, "% OF SUB LABOR COST");
        let layouts = vec![SectionLayout::new("5040").with_aliases(&["% of sub labor cost"])];
        let sections = locate(&sheet, &layouts, &ScanLimits::default()).unwrap();
        assert_eq!(sections[0].anchor_row, 2);
        assert_eq!(sections[0].marker_column, 3);
    }

    #[test]
    fn test_first_match_wins() {
        let sheet = MemorySheet::new()
            .with_text(2, 4, "5040 summary")
            .with_text(9, 1, "5040 detail");
        let layouts = vec![SectionLayout::new("5040")];
        let sections = locate(&sheet, &layouts, &ScanLimits::default()).unwrap();
        assert_eq!(sections[0].anchor_row, 2);
    }

    #[test]
    fn test_formula_cells_are_not_markers() {
        let sheet = MemorySheet::new()
            .with_formula(2, 1, "\"5040\"")
            .with_text(5, 1, "5040");
        let sections = locate(&sheet, &[SectionLayout::new("5040")], &ScanLimits::default()).unwrap();
        assert_eq!(sections[0].anchor_row, 5);
    }

    #[test]
    fn test_missing_marker_reported() {
        let sheet = MemorySheet::new().with_text(3, 1, "Sub Labor - 5040");
        let err = locate(&sheet, &layouts(), &ScanLimits::default()).unwrap_err();
        match err {
            WipError::SectionNotFound { marker } => assert_eq!(marker, "5030"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_scan_limits_bound_search() {
        let limits = ScanLimits {
            max_marker_rows: Some(5),
            ..ScanLimits::default()
        };
        let err = locate(&sheet(), &layouts(), &limits).unwrap_err();
        assert!(matches!(err, WipError::SectionNotFound { marker } if marker == "5030"));
    }

    #[test]
    fn test_offset_columns() {
        let sheet = MemorySheet::new().with_text(3, 2, "5040");
        let layouts = vec![SectionLayout::new("5040")
            .with_columns(ColumnSpec::Offset(-1), ColumnSpec::Offset(3))
            .with_header_rows(2)
            .with_template_row(20)];
        let section = &locate(&sheet, &layouts, &ScanLimits::default()).unwrap()[0];
        assert_eq!(section.label_column, 1);
        assert_eq!(section.value_column, 5);
        assert_eq!(section.data_start_row, 5);
        assert_eq!(section.template_row, Some(20));
    }

    #[test]
    fn test_same_row_overlap() {
        let sheet = MemorySheet::new().with_text(3, 1, "5040 / 5030 combined");
        let err = locate(&sheet, &layouts(), &ScanLimits::default()).unwrap_err();
        assert!(matches!(err, WipError::OverlappingSections { row: 3, .. }));
    }

    #[test]
    fn test_identical_resolved_columns_rejected() {
        let sheet = MemorySheet::new().with_text(3, 1, "5040");
        let layouts = vec![SectionLayout::new("5040")
            .with_columns(ColumnSpec::Letter("A".into()), ColumnSpec::Offset(0))];
        assert!(matches!(
            locate(&sheet, &layouts, &ScanLimits::default()),
            Err(WipError::Config(_))
        ));
    }
}
