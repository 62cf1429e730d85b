use std::collections::{BTreeMap, HashMap};

use fd_accum::AccumulatorSet;
use fd_runtime::DiagnosticLedger;
use fd_types::{ColumnDescriptor, Summary};
use serde::{Deserialize, Serialize};

use crate::StreamError;

pub const GROUP_KEY_SEPARATOR: &str = "|";
pub const NULL_GROUP_MARKER: &str = "<null>";

/// Render a group-key tuple as its canonical string.
///
/// Blank values render as [`NULL_GROUP_MARKER`]. The rendering is not
/// injective when a value itself contains [`GROUP_KEY_SEPARATOR`]; such keys
/// share one entry.
#[must_use]
pub fn group_key_string<S: AsRef<str>>(values: &[S]) -> String {
    values
        .iter()
        .map(|value| {
            let value = value.as_ref();
            if value.trim().is_empty() {
                NULL_GROUP_MARKER
            } else {
                value
            }
        })
        .collect::<Vec<&str>>()
        .join(GROUP_KEY_SEPARATOR)
}

pub type ColumnSummaries = BTreeMap<String, Summary>;

/// Canonical result: column → summary, or group key → column → summary.
///
/// Deserialization tries `Grouped` first, so a bare `{}` reads back as an
/// empty grouped result (an empty input with grouping). An overall result
/// with every column excluded has the same JSON; the metadata envelope
/// keeps the two apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultObject {
    Grouped(BTreeMap<String, ColumnSummaries>),
    Overall(ColumnSummaries),
}

impl ResultObject {
    #[must_use]
    pub fn analysis_type(&self) -> AnalysisType {
        match self {
            Self::Overall(_) => AnalysisType::Overall,
            Self::Grouped(_) => AnalysisType::Grouped,
        }
    }

    /// Column summary of an overall result.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Summary> {
        match self {
            Self::Overall(columns) => columns.get(name),
            Self::Grouped(_) => None,
        }
    }

    #[must_use]
    pub fn group(&self, key: &str) -> Option<&ColumnSummaries> {
        match self {
            Self::Overall(_) => None,
            Self::Grouped(groups) => groups.get(key),
        }
    }

    #[must_use]
    pub fn group_count(&self) -> usize {
        match self {
            Self::Overall(_) => 1,
            Self::Grouped(groups) => groups.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisType {
    Overall,
    Grouped,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    pub total_rows_processed: u64,
    pub skipped_rows: u64,
    pub analysis_type: AnalysisType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grouped_by: Option<Vec<String>>,
}

/// Everything a finished pass produced.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsReport {
    pub metadata: AnalysisMetadata,
    pub result: ResultObject,
    pub columns: Vec<ColumnDescriptor>,
    pub diagnostics: DiagnosticLedger,
}

impl StatsReport {
    /// The `analysis_metadata` + `*_analysis` document.
    #[must_use]
    pub fn envelope(&self) -> Envelope<'_> {
        let (overall_analysis, grouped_analysis) = match &self.result {
            ResultObject::Overall(columns) => (Some(columns), None),
            ResultObject::Grouped(groups) => (None, Some(groups)),
        };
        Envelope {
            analysis_metadata: &self.metadata,
            overall_analysis,
            grouped_analysis,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Envelope<'a> {
    pub analysis_metadata: &'a AnalysisMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overall_analysis: Option<&'a ColumnSummaries>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grouped_analysis: Option<&'a BTreeMap<String, ColumnSummaries>>,
}

/// Unfinalized state of one pass. Shards that share a schema merge these
/// before a single assembly.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialAggregate {
    pub(crate) columns: Vec<ColumnDescriptor>,
    pub(crate) active: Vec<bool>,
    pub(crate) group_by: Vec<String>,
    pub(crate) groups: HashMap<Vec<String>, AccumulatorSet>,
    pub(crate) rows_processed: u64,
    pub(crate) diagnostics: DiagnosticLedger,
}

impl PartialAggregate {
    #[must_use]
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    #[must_use]
    pub fn rows_processed(&self) -> u64 {
        self.rows_processed
    }

    #[must_use]
    pub fn diagnostics(&self) -> &DiagnosticLedger {
        &self.diagnostics
    }

    #[must_use]
    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    pub fn merge(&mut self, other: &Self) -> Result<(), StreamError> {
        if self.columns != other.columns || self.active != other.active {
            return Err(StreamError::SchemaMismatch);
        }
        if self.group_by != other.group_by {
            return Err(StreamError::GroupingMismatch {
                left: self.group_by.clone(),
                right: other.group_by.clone(),
            });
        }
        for (key, set) in &other.groups {
            match self.groups.get_mut(key) {
                Some(existing) => existing.merge(set)?,
                None => {
                    self.groups.insert(key.clone(), set.clone());
                }
            }
        }
        self.rows_processed += other.rows_processed;
        self.diagnostics.merge(&other.diagnostics);
        Ok(())
    }

    /// Finalize every accumulator into a [`StatsReport`].
    pub fn assemble(&self, top_n: Option<usize>) -> Result<StatsReport, StreamError> {
        let result = if self.group_by.is_empty() {
            let summaries = match self.groups.get(&[] as &[String]) {
                Some(set) => self.summarize(set, top_n),
                None => self.summarize(&AccumulatorSet::new(&self.columns, &self.active), top_n),
            };
            ResultObject::Overall(summaries)
        } else {
            let mut rendered: BTreeMap<String, AccumulatorSet> = BTreeMap::new();
            for (key, set) in &self.groups {
                let name = group_key_string(key.as_slice());
                match rendered.get_mut(&name) {
                    Some(existing) => existing.merge(set)?,
                    None => {
                        rendered.insert(name, set.clone());
                    }
                }
            }
            ResultObject::Grouped(
                rendered
                    .into_iter()
                    .map(|(name, set)| (name, self.summarize(&set, top_n)))
                    .collect(),
            )
        };

        Ok(StatsReport {
            metadata: AnalysisMetadata {
                total_rows_processed: self.rows_processed,
                skipped_rows: self.diagnostics.skipped_rows(),
                analysis_type: result.analysis_type(),
                grouped_by: (!self.group_by.is_empty()).then(|| self.group_by.clone()),
            },
            result,
            columns: self.columns.clone(),
            diagnostics: self.diagnostics.clone(),
        })
    }

    fn summarize(&self, set: &AccumulatorSet, top_n: Option<usize>) -> ColumnSummaries {
        set.finalize(top_n)
            .filter_map(|(pos, summary)| {
                self.columns
                    .get(pos)
                    .map(|descriptor| (descriptor.name.clone(), summary))
            })
            .collect()
    }
}
