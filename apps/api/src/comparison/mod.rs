//! Comparator: pairs two extracted records field by field.
//!
//! Status rule:
//! 1. either side absent (including both) → `missing`
//! 2. equal after trimming surrounding whitespace → `same`
//! 3. otherwise → `different`

use serde::{Deserialize, Serialize};

use crate::extraction::record::ExtractedRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonStatus {
    Same,
    Different,
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonEntry {
    pub field: &'static str,
    pub file1_value: Option<String>,
    pub file2_value: Option<String>,
    pub status: ComparisonStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ComparisonSummary {
    pub same: usize,
    pub different: usize,
    pub missing: usize,
}

impl ComparisonSummary {
    pub fn from_entries(entries: &[ComparisonEntry]) -> Self {
        entries
            .iter()
            .fold(ComparisonSummary::default(), |mut acc, e| {
                match e.status {
                    ComparisonStatus::Same => acc.same += 1,
                    ComparisonStatus::Different => acc.different += 1,
                    ComparisonStatus::Missing => acc.missing += 1,
                }
                acc
            })
    }
}

pub fn classify(left: Option<&str>, right: Option<&str>) -> ComparisonStatus {
    match (left, right) {
        (Some(a), Some(b)) if a.trim() == b.trim() => ComparisonStatus::Same,
        (Some(_), Some(_)) => ComparisonStatus::Different,
        _ => ComparisonStatus::Missing,
    }
}

/// One entry per field of `fields`, in that order. Fields a record lacks count as absent.
pub fn compare_records(
    fields: &[&'static str],
    left: &ExtractedRecord,
    right: &ExtractedRecord,
) -> Vec<ComparisonEntry> {
    fields
        .iter()
        .map(|&field| {
            let file1_value = left.get(field);
            let file2_value = right.get(field);
            ComparisonEntry {
                field,
                status: classify(file1_value, file2_value),
                file1_value: file1_value.map(str::to_string),
                file2_value: file2_value.map(str::to_string),
            }
        })
        .collect()
}
