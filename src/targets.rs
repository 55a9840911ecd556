//! Target tables produced upstream by the GL aggregation
//!
//! ```yaml
//! sections:
//!   - marker: "5040"
//!     rows:
//!       - { job: 100, value: 75 }
//!       - { job: "2417-B", value: 0 }
//! ```
//!
//! Files ending in `.json` are read as JSON with the same shape.

use crate::error::{WipError, WipResult};
use crate::sheet::format_number;
use crate::types::TargetTable;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Every target table for one run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TargetSet {
    #[serde(default)]
    pub sections: Vec<TargetTable>,
}

impl TargetSet {
    pub fn from_path(path: &Path) -> WipResult<Self> {
        let content = fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));

        let set: TargetSet = if is_json {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };
        set.validate()?;
        Ok(set)
    }

    pub fn from_yaml_str(yaml: &str) -> WipResult<Self> {
        let set: TargetSet = serde_yaml::from_str(yaml)?;
        set.validate()?;
        Ok(set)
    }

    /// One table per marker
    pub fn validate(&self) -> WipResult<()> {
        let mut seen = HashSet::new();
        for table in &self.sections {
            if !seen.insert(table.marker.trim().to_lowercase()) {
                return Err(WipError::InvalidTarget {
                    marker: table.marker.clone(),
                    reason: "marker appears in more than one table".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn tables(&self) -> &[TargetTable] {
        &self.sections
    }

    pub fn row_count(&self) -> usize {
        self.sections.iter().map(|t| t.rows.len()).sum()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawJobKey {
    Text(String),
    Integer(i64),
    Float(f64),
}

/// Accept job keys written as strings or YAML/JSON numbers
pub fn job_key<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match RawJobKey::deserialize(deserializer)? {
        RawJobKey::Text(s) => s.trim().to_string(),
        RawJobKey::Integer(n) => n.to_string(),
        RawJobKey::Float(n) => format_number(n),
    })
}
