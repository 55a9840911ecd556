//! Deployment configuration: where sections live and how far to scan
//!
//! ```yaml
//! template_sheet: Template
//! scan:
//!   max_marker_rows: 200
//!   max_section_rows: 500
//! sections:
//!   - marker: "5040"
//!     aliases: ["% of sub labor cost"]
//!     label_column: A      # absolute column letter
//!     value_column: 4      # or a signed offset from the marker's column
//!     header_rows: 1
//! ```

use crate::error::{WipError, WipResult};
use crate::sheet::column_index;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Sheet cloned when the requested month tab does not exist
    #[serde(default)]
    pub template_sheet: Option<String>,

    #[serde(default)]
    pub scan: ScanLimits,

    #[serde(default = "default_sections")]
    pub sections: Vec<SectionLayout>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            template_sheet: None,
            scan: ScanLimits::default(),
            sections: default_sections(),
        }
    }
}

/// Bounds that stand in for timeouts on pathological sheets
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScanLimits {
    /// Marker search stops after this many rows (default: whole used range)
    #[serde(default)]
    pub max_marker_rows: Option<u32>,
    /// Marker search only looks at the first N columns
    #[serde(default)]
    pub max_marker_columns: Option<u32>,
    /// Longest data block walked per section
    #[serde(default)]
    pub max_section_rows: Option<u32>,
}

/// Column placement of a section's label or value cells
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnSpec {
    /// Offset from the column the marker was found in
    Offset(i32),
    /// Absolute column letter
    Letter(String),
}

impl ColumnSpec {
    /// Resolve to a 1-based column number
    pub fn resolve(&self, marker_column: u32) -> WipResult<u32> {
        match self {
            ColumnSpec::Letter(letters) => column_index(letters).ok_or_else(|| {
                WipError::Config(format!("'{}' is not a column letter", letters))
            }),
            ColumnSpec::Offset(offset) => {
                let col = marker_column as i64 + *offset as i64;
                if col < 1 {
                    return Err(WipError::Config(format!(
                        "offset {} from column {} falls off the sheet",
                        offset, marker_column
                    )));
                }
                Ok(col as u32)
            }
        }
    }
}

/// Where one named section lives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SectionLayout {
    /// Substring identifying the section header (case-insensitive)
    pub marker: String,

    /// Additional header texts that identify the same section
    #[serde(default)]
    pub aliases: Vec<String>,

    #[serde(default = "default_label_column")]
    pub label_column: ColumnSpec,

    #[serde(default = "default_value_column")]
    pub value_column: ColumnSpec,

    /// Rows between the marker and the first data row
    #[serde(default = "default_header_rows")]
    pub header_rows: u32,

    /// Row whose styling seeds appends when the section has no data rows
    #[serde(default)]
    pub template_row: Option<u32>,
}

impl SectionLayout {
    /// Layout with default columns (label A, value B)
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
            aliases: Vec::new(),
            label_column: default_label_column(),
            value_column: default_value_column(),
            header_rows: default_header_rows(),
            template_row: None,
        }
    }

    pub fn with_columns(mut self, label: ColumnSpec, value: ColumnSpec) -> Self {
        self.label_column = label;
        self.value_column = value;
        self
    }

    pub fn with_aliases(mut self, aliases: &[&str]) -> Self {
        self.aliases = aliases.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn with_header_rows(mut self, header_rows: u32) -> Self {
        self.header_rows = header_rows;
        self
    }

    pub fn with_template_row(mut self, row: u32) -> Self {
        self.template_row = Some(row);
        self
    }

    /// Lower-cased needles: the marker first, then aliases
    pub fn needles(&self) -> Vec<String> {
        std::iter::once(&self.marker)
            .chain(self.aliases.iter())
            .map(|n| n.trim().to_lowercase())
            .filter(|n| !n.is_empty())
            .collect()
    }
}

fn default_label_column() -> ColumnSpec {
    ColumnSpec::Letter("A".to_string())
}

fn default_value_column() -> ColumnSpec {
    ColumnSpec::Letter("B".to_string())
}

fn default_header_rows() -> u32 {
    1
}

/// Sub Labor (5040) and Material (5030) as laid out in the WIP report
fn default_sections() -> Vec<SectionLayout> {
    vec![
        SectionLayout::new("5040")
            .with_aliases(&["% of sub labor cost", "sub labor cost - 5040"])
            .with_columns(
                ColumnSpec::Letter("A".to_string()),
                ColumnSpec::Letter("E".to_string()),
            ),
        SectionLayout::new("5030")
            .with_aliases(&["% of material", "material - 5030"])
            .with_columns(
                ColumnSpec::Letter("A".to_string()),
                ColumnSpec::Letter("C".to_string()),
            ),
    ]
}

impl Config {
    /// Load and validate a YAML config file
    pub fn from_path(path: &Path) -> WipResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            WipError::Config(format!("cannot read '{}': {}", path.display(), e))
        })?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(yaml: &str) -> WipResult<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> WipResult<()> {
        if self.sections.is_empty() {
            return Err(WipError::Config("no sections configured".to_string()));
        }

        let mut seen = HashSet::new();
        for layout in &self.sections {
            let marker = layout.marker.trim();
            if marker.is_empty() {
                return Err(WipError::Config("section marker is empty".to_string()));
            }
            if !seen.insert(marker.to_lowercase()) {
                return Err(WipError::Config(format!(
                    "section marker '{}' is configured twice",
                    marker
                )));
            }
            if layout.header_rows == 0 {
                return Err(WipError::Config(format!(
                    "section '{}': header_rows must be at least 1",
                    marker
                )));
            }
            for spec in [&layout.label_column, &layout.value_column] {
                if let ColumnSpec::Letter(letters) = spec {
                    if column_index(letters).is_none() {
                        return Err(WipError::Config(format!(
                            "section '{}': '{}' is not a column letter",
                            marker, letters
                        )));
                    }
                }
            }
            if layout.label_column == layout.value_column {
                return Err(WipError::Config(format!(
                    "section '{}': label and value columns are the same",
                    marker
                )));
            }
        }

        if matches!(self.scan.max_section_rows, Some(0)) {
            return Err(WipError::Config(
                "scan.max_section_rows must be at least 1".to_string(),
            ));
        }

        Ok(())
    }

    pub fn layout(&self, marker: &str) -> Option<&SectionLayout> {
        self.sections
            .iter()
            .find(|l| l.marker.trim().eq_ignore_ascii_case(marker.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sections.len(), 2);
        assert_eq!(
            config.layout("5040").map(|l| l.value_column.clone()),
            Some(ColumnSpec::Letter("E".to_string()))
        );
    }

    #[test]
    fn test_parse_offsets_and_letters() {
        let config = Config::from_yaml_str(
            r#"
template_sheet: Template
scan:
  max_section_rows: 40
sections:
  - marker: "5040"
    label_column: 0
    value_column: 4
  - marker: "5030"
    label_column: A
    value_column: C
    header_rows: 2
    template_row: 30
"#,
        )
        .unwrap();

        assert_eq!(config.template_sheet.as_deref(), Some("Template"));
        assert_eq!(config.scan.max_section_rows, Some(40));
        let labor = config.layout("5040").unwrap();
        assert_eq!(labor.label_column.resolve(2).unwrap(), 2);
        assert_eq!(labor.value_column.resolve(2).unwrap(), 6);
        let material = config.layout("5030").unwrap();
        assert_eq!(material.header_rows, 2);
        assert_eq!(material.template_row, Some(30));
        assert_eq!(material.value_column.resolve(9).unwrap(), 3);
    }

    #[test]
    fn test_reject_duplicate_markers() {
        let err = Config::from_yaml_str(
            "sections:\n  - marker: \"5040\"\n  - marker: \"5040\"\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("configured twice"));
    }

    #[test]
    fn test_reject_bad_column_letter() {
        let err = Config::from_yaml_str(
            "sections:\n  - marker: \"5040\"\n    value_column: \"E1\"\n",
        )
        .unwrap_err();
        assert!(err.to_string().contains("not a column letter"));
    }

    #[test]
    fn test_offset_off_sheet() {
        assert!(ColumnSpec::Offset(-3).resolve(2).is_err());
        assert_eq!(ColumnSpec::Offset(-1).resolve(2).unwrap(), 1);
    }

    #[test]
    fn test_needles_lowercase_marker_first() {
        let layout = SectionLayout::new("5040").with_aliases(&["Sub Labor Cost", "  "]);
        assert_eq!(layout.needles(), vec!["5040", "sub labor cost"]);
    }
}
