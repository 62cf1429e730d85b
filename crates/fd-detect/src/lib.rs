#![forbid(unsafe_code)]

use fd_cell::parse_cell;
use fd_types::{Cell, ColumnDescriptor, ColumnKind};
use serde::Serialize;

pub const DEFAULT_SAMPLE_ROWS: usize = 2_000;
pub const DEFAULT_NUMERIC_THRESHOLD: f64 = 0.5;

/// Column names that always hold stringified lists, even when a sample only
/// shows bare scalars.
pub const DEFAULT_MULTI_VALUED_COLUMNS: [&str; 1] = ["publisher_platforms"];

#[derive(Debug, Clone, PartialEq)]
pub struct DetectOptions {
    pub sample_rows: usize,
    /// Share of non-missing samples that must parse as numbers, exclusive.
    pub numeric_threshold: f64,
    pub multi_valued_columns: Vec<String>,
}

impl Default for DetectOptions {
    fn default() -> Self {
        Self {
            sample_rows: DEFAULT_SAMPLE_ROWS,
            numeric_threshold: DEFAULT_NUMERIC_THRESHOLD,
            multi_valued_columns: DEFAULT_MULTI_VALUED_COLUMNS
                .iter()
                .map(|name| (*name).to_owned())
                .collect(),
        }
    }
}

impl DetectOptions {
    #[must_use]
    pub fn is_multi_valued(&self, column: &str) -> bool {
        self.multi_valued_columns.iter().any(|name| name == column)
    }
}

/// Parse-outcome tallies for one column's sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ColumnProfile {
    pub sampled: usize,
    pub missing: usize,
    pub numbers: usize,
    pub texts: usize,
    pub sequences: usize,
    pub mappings: usize,
}

impl ColumnProfile {
    pub fn observe(&mut self, cell: &Cell) {
        self.sampled += 1;
        match cell {
            Cell::Missing => self.missing += 1,
            Cell::Number(_) => self.numbers += 1,
            Cell::Text(_) => self.texts += 1,
            Cell::Sequence(_) => self.sequences += 1,
            Cell::Mapping(_) => self.mappings += 1,
        }
    }

    #[must_use]
    pub fn non_missing(&self) -> usize {
        self.sampled - self.missing
    }

    #[must_use]
    pub fn numeric_share(&self) -> Option<f64> {
        match self.non_missing() {
            0 => None,
            n => Some(self.numbers as f64 / n as f64),
        }
    }

    /// Apply the classification rules in priority order.
    #[must_use]
    pub fn classify(&self, forced_sequence: bool, numeric_threshold: f64) -> ColumnKind {
        if forced_sequence {
            return ColumnKind::ComplexSequence;
        }
        let Some(share) = self.numeric_share() else {
            return ColumnKind::Categorical;
        };
        if share > numeric_threshold {
            ColumnKind::Numeric
        } else if self.sequences > 0 {
            ColumnKind::ComplexSequence
        } else if self.mappings > 0 {
            ColumnKind::ComplexMapping
        } else {
            ColumnKind::Categorical
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub descriptors: Vec<ColumnDescriptor>,
    pub profiles: Vec<ColumnProfile>,
}

impl Detection {
    #[must_use]
    pub fn kind_of(&self, column: &str) -> Option<ColumnKind> {
        self.descriptors
            .iter()
            .find(|descriptor| descriptor.name == column)
            .map(|descriptor| descriptor.kind)
    }
}

/// Classify every header column from the first `options.sample_rows` rows.
///
/// Rows shorter than the header contribute only the cells they have. The
/// sample is read, never retained.
pub fn detect<R, S>(sample_rows: &[R], header: &[String], options: &DetectOptions) -> Detection
where
    R: AsRef<[S]>,
    S: AsRef<str>,
{
    let mut profiles = vec![ColumnProfile::default(); header.len()];
    for row in sample_rows.iter().take(options.sample_rows) {
        for (profile, raw) in profiles.iter_mut().zip(row.as_ref()) {
            profile.observe(&parse_cell(raw.as_ref()));
        }
    }

    let descriptors = header
        .iter()
        .zip(&profiles)
        .map(|(name, profile)| {
            let kind = profile.classify(options.is_multi_valued(name), options.numeric_threshold);
            tracing::debug!(
                column = %name,
                %kind,
                sampled = profile.sampled,
                missing = profile.missing,
                numbers = profile.numbers,
                sequences = profile.sequences,
                mappings = profile.mappings,
                "classified column"
            );
            ColumnDescriptor::new(name.clone(), kind)
        })
        .collect();

    Detection {
        descriptors,
        profiles,
    }
}
