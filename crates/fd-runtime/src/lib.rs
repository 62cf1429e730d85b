#![forbid(unsafe_code)]

use std::path::PathBuf;

use fd_accum::DEFAULT_TOP_N;
use fd_detect::DetectOptions;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Free-text creative columns left out of the summaries unless the caller
/// supplies its own exclusion list.
pub const DEFAULT_EXCLUDED_COLUMNS: [&str; 4] = [
    "ad_creative_bodies",
    "ad_creative_link_captions",
    "ad_creative_link_titles",
    "ad_creative_link_descriptions",
];

/// Run configuration, built once before the stream pass starts.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsConfig {
    pub source_path: PathBuf,
    pub output_path: PathBuf,
    /// Ordered grouping columns; empty means one implicit global group.
    pub group_by: Vec<String>,
    pub detect: DetectOptions,
    /// Columns that are never summarized (free-text bodies and the like).
    pub exclude_columns: Vec<String>,
    /// Frequency entries kept per summary; `None` keeps the whole table.
    pub top_n: Option<usize>,
    /// Wrap the result in the `analysis_metadata` envelope.
    pub with_metadata: bool,
}

impl StatsConfig {
    #[must_use]
    pub fn new(source_path: impl Into<PathBuf>, output_path: impl Into<PathBuf>) -> Self {
        Self {
            source_path: source_path.into(),
            output_path: output_path.into(),
            group_by: Vec::new(),
            detect: DetectOptions::default(),
            exclude_columns: DEFAULT_EXCLUDED_COLUMNS
                .iter()
                .map(|name| (*name).to_owned())
                .collect(),
            top_n: Some(DEFAULT_TOP_N),
            with_metadata: false,
        }
    }

    #[must_use]
    pub fn with_group_by<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.group_by = columns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_exclude_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exclude_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_multi_valued_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.detect.multi_valued_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_sample_rows(mut self, sample_rows: usize) -> Self {
        self.detect.sample_rows = sample_rows;
        self
    }

    #[must_use]
    pub fn with_numeric_threshold(mut self, threshold: f64) -> Self {
        self.detect.numeric_threshold = threshold;
        self
    }

    #[must_use]
    pub fn with_top_n(mut self, top_n: Option<usize>) -> Self {
        self.top_n = top_n;
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, with_metadata: bool) -> Self {
        self.with_metadata = with_metadata;
        self
    }

    #[must_use]
    pub fn is_grouped(&self) -> bool {
        !self.group_by.is_empty()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.source_path.as_os_str().is_empty() {
            return Err(ConfigError::EmptySourcePath);
        }
        self.validate_options()
    }

    /// Everything [`Self::validate`] checks except the paths; in-memory
    /// sources have none.
    pub fn validate_options(&self) -> Result<(), ConfigError> {
        if self.detect.sample_rows == 0 {
            return Err(ConfigError::ZeroSampleRows);
        }
        let threshold = self.detect.numeric_threshold;
        if !(0.0..1.0).contains(&threshold) {
            return Err(ConfigError::ThresholdOutOfRange { threshold });
        }
        if self.top_n == Some(0) {
            return Err(ConfigError::ZeroTopN);
        }
        if let Some(column) = self.group_by.iter().find(|c| self.exclude_columns.contains(*c)) {
            return Err(ConfigError::GroupColumnExcluded {
                column: column.clone(),
            });
        }
        Ok(())
    }
}

impl Default for StatsConfig {
    fn default() -> Self {
        Self::new(PathBuf::new(), PathBuf::from("stats.json"))
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConfigError {
    #[error("source path is empty")]
    EmptySourcePath,
    #[error("sample_rows must be at least 1")]
    ZeroSampleRows,
    #[error("numeric threshold {threshold} is outside [0, 1)")]
    ThresholdOutOfRange { threshold: f64 },
    #[error("top_n must be at least 1 when set")]
    ZeroTopN,
    #[error("grouping column {column:?} is also excluded")]
    GroupColumnExcluded { column: String },
}

/// Split a comma-separated column list, dropping blanks.
#[must_use]
pub fn parse_column_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_owned)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IssueKind {
    FieldCountMismatch,
    UndecodableRow,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowIssue {
    pub kind: IssueKind,
    /// 1-based source line, when the reader knows it.
    pub line: Option<u64>,
    pub detail: String,
}

pub const MAX_RECORDED_ISSUES: usize = 1_000;

/// Non-fatal problems seen during a pass. Counts are exact; only the first
/// [`MAX_RECORDED_ISSUES`] row issues are kept verbatim.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticLedger {
    skipped_rows: u64,
    rejected_numeric_cells: u64,
    issues: Vec<RowIssue>,
}

impl DiagnosticLedger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_skipped(&mut self, issue: RowIssue) {
        self.skipped_rows += 1;
        if self.issues.len() < MAX_RECORDED_ISSUES {
            self.issues.push(issue);
        }
    }

    pub fn note_rejected_numeric(&mut self) {
        self.rejected_numeric_cells += 1;
    }

    pub fn merge(&mut self, other: &Self) {
        self.skipped_rows += other.skipped_rows;
        self.rejected_numeric_cells += other.rejected_numeric_cells;
        let room = MAX_RECORDED_ISSUES.saturating_sub(self.issues.len());
        self.issues.extend(other.issues.iter().take(room).cloned());
    }

    #[must_use]
    pub fn skipped_rows(&self) -> u64 {
        self.skipped_rows
    }

    #[must_use]
    pub fn rejected_numeric_cells(&self) -> u64 {
        self.rejected_numeric_cells
    }

    #[must_use]
    pub fn issues(&self) -> &[RowIssue] {
        &self.issues
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ConfigError, DEFAULT_EXCLUDED_COLUMNS, DiagnosticLedger, IssueKind, MAX_RECORDED_ISSUES,
        RowIssue, StatsConfig, parse_column_list,
    };

    fn issue(line: u64) -> RowIssue {
        RowIssue {
            kind: IssueKind::FieldCountMismatch,
            line: Some(line),
            detail: "expected 3 fields, found 2".to_owned(),
        }
    }

    #[test]
    fn default_config_is_overall_with_top_five() {
        let config = StatsConfig::new("ads.csv", "out.json");
        assert!(!config.is_grouped());
        assert_eq!(config.top_n, Some(5));
        assert_eq!(config.detect.sample_rows, 2_000);
        assert!(config.detect.is_multi_valued("publisher_platforms"));
        assert_eq!(config.exclude_columns, DEFAULT_EXCLUDED_COLUMNS);
        assert_eq!(config.validate(), Ok(()));

        let everything = config.with_exclude_columns(Vec::<String>::new());
        assert!(everything.exclude_columns.is_empty());
    }

    #[test]
    fn validate_rejects_bad_values() {
        assert_eq!(
            StatsConfig::default().validate(),
            Err(ConfigError::EmptySourcePath)
        );
        let base = StatsConfig::new("a.csv", "b.json");
        assert_eq!(
            base.clone().with_sample_rows(0).validate(),
            Err(ConfigError::ZeroSampleRows)
        );
        assert_eq!(
            base.clone().with_numeric_threshold(1.0).validate(),
            Err(ConfigError::ThresholdOutOfRange { threshold: 1.0 })
        );
        assert_eq!(
            base.clone().with_top_n(Some(0)).validate(),
            Err(ConfigError::ZeroTopN)
        );
        assert_eq!(
            StatsConfig::default().with_sample_rows(0).validate_options(),
            Err(ConfigError::ZeroSampleRows)
        );
        assert_eq!(StatsConfig::default().validate_options(), Ok(()));
        let err = base
            .with_group_by(["page_name"])
            .with_exclude_columns(["page_name"])
            .validate()
            .expect_err("grouped and excluded");
        assert_eq!(err.to_string(), "grouping column \"page_name\" is also excluded");
    }

    #[test]
    fn column_list_splits_and_trims() {
        assert_eq!(
            parse_column_list(" page_name, currency ,,"),
            vec!["page_name".to_owned(), "currency".to_owned()]
        );
        assert!(parse_column_list("  ").is_empty());
    }

    #[test]
    fn ledger_counts_everything_but_caps_records() {
        let mut ledger = DiagnosticLedger::new();
        for line in 0..(MAX_RECORDED_ISSUES as u64 + 5) {
            ledger.record_skipped(issue(line));
        }
        ledger.note_rejected_numeric();
        assert_eq!(ledger.skipped_rows(), MAX_RECORDED_ISSUES as u64 + 5);
        assert_eq!(ledger.issues().len(), MAX_RECORDED_ISSUES);
        assert_eq!(ledger.rejected_numeric_cells(), 1);

        let mut other = DiagnosticLedger::new();
        other.record_skipped(issue(1));
        ledger.merge(&other);
        assert_eq!(ledger.skipped_rows(), MAX_RECORDED_ISSUES as u64 + 6);
        assert_eq!(ledger.issues().len(), MAX_RECORDED_ISSUES);
    }

    #[test]
    fn ledger_serializes_snake_case_kinds() {
        let mut ledger = DiagnosticLedger::new();
        ledger.record_skipped(issue(7));
        let json = serde_json::to_value(&ledger).expect("serialize");
        assert_eq!(json["skipped_rows"], 1);
        assert_eq!(json["issues"][0]["kind"], "field_count_mismatch");
        assert_eq!(json["issues"][0]["line"], 7);
    }
}
