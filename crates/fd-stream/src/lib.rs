#![forbid(unsafe_code)]

//! Push-based single-pass aggregation over CSV rows.
//!
//! A [`StreamEngine`] buffers the first `sample_rows` well-formed rows,
//! classifies every column from them, then folds each row exactly once into
//! per-group accumulator sets. Memory stays bounded by the sample buffer plus
//! one accumulator per (group, column).

mod report;

use std::collections::{HashMap, HashSet};

use fd_accum::{AccumError, AccumulatorSet, FoldOutcome};
use fd_cell::parse_cell_as;
use fd_detect::{DetectOptions, detect};
use fd_runtime::{
    ConfigError, DEFAULT_EXCLUDED_COLUMNS, DiagnosticLedger, IssueKind, RowIssue, StatsConfig,
};
use fd_types::{ColumnDescriptor, ColumnKind};
use thiserror::Error;

pub use report::{
    AnalysisMetadata, AnalysisType, ColumnSummaries, Envelope, GROUP_KEY_SEPARATOR,
    NULL_GROUP_MARKER, PartialAggregate, ResultObject, StatsReport, group_key_string,
};

#[derive(Debug, Error)]
pub enum StreamError {
    #[error("csv header is empty")]
    EmptyHeader,
    #[error("grouping column {column:?} is not in the header")]
    UnknownGroupColumn { column: String },
    #[error("{descriptors} column descriptors for a {header}-column header")]
    DescriptorWidth { header: usize, descriptors: usize },
    #[error("descriptor {position} is named {found:?}, header has {expected:?}")]
    DescriptorName {
        position: usize,
        expected: String,
        found: String,
    },
    #[error("partial aggregates were built over different column schemas")]
    SchemaMismatch,
    #[error("partial aggregates were grouped by {left:?} and {right:?}")]
    GroupingMismatch { left: Vec<String>, right: Vec<String> },
    #[error(transparent)]
    Accum(#[from] AccumError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Detecting,
    Streaming,
}

#[derive(Debug)]
enum State {
    Detecting(Vec<Vec<String>>),
    Streaming(Vec<ColumnDescriptor>),
}

/// Make header names unique with pandas-style `.1`, `.2` suffixes.
#[must_use]
pub fn dedupe_header<S: AsRef<str>>(names: &[S]) -> Vec<String> {
    let mut seen = HashSet::with_capacity(names.len());
    let mut out = Vec::with_capacity(names.len());
    for name in names {
        let name = name.as_ref();
        let mut candidate = name.to_owned();
        let mut suffix = 0_usize;
        while seen.contains(&candidate) {
            suffix += 1;
            candidate = format!("{name}.{suffix}");
        }
        seen.insert(candidate.clone());
        out.push(candidate);
    }
    out
}

#[derive(Debug)]
pub struct StreamEngine {
    header: Vec<String>,
    group_by: Vec<String>,
    group_positions: Vec<usize>,
    active: Vec<bool>,
    detect: DetectOptions,
    top_n: Option<usize>,
    state: State,
    groups: HashMap<Vec<String>, AccumulatorSet>,
    rows_processed: u64,
    diagnostics: DiagnosticLedger,
}

impl StreamEngine {
    pub fn new<S: AsRef<str>>(header: &[S], config: &StatsConfig) -> Result<Self, StreamError> {
        config.validate_options()?;
        let header = dedupe_header(header);
        if header.is_empty() {
            return Err(StreamError::EmptyHeader);
        }

        let group_positions = config
            .group_by
            .iter()
            .map(|column| {
                header
                    .iter()
                    .position(|name| name == column)
                    .ok_or_else(|| StreamError::UnknownGroupColumn {
                        column: column.clone(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        for column in &config.exclude_columns {
            if !header.contains(column) && !DEFAULT_EXCLUDED_COLUMNS.contains(&column.as_str()) {
                tracing::warn!(column = %column, "excluded column is not in the header");
            }
        }
        let active = header
            .iter()
            .enumerate()
            .map(|(pos, name)| {
                !group_positions.contains(&pos) && !config.exclude_columns.contains(name)
            })
            .collect();

        Ok(Self {
            header,
            group_by: config.group_by.clone(),
            group_positions,
            active,
            detect: config.detect.clone(),
            top_n: config.top_n,
            state: State::Detecting(Vec::new()),
            groups: HashMap::new(),
            rows_processed: 0,
            diagnostics: DiagnosticLedger::new(),
        })
    }

    /// Start directly in the streaming phase with an already-detected schema.
    pub fn with_descriptors<S: AsRef<str>>(
        header: &[S],
        descriptors: Vec<ColumnDescriptor>,
        config: &StatsConfig,
    ) -> Result<Self, StreamError> {
        let mut engine = Self::new(header, config)?;
        if descriptors.len() != engine.header.len() {
            return Err(StreamError::DescriptorWidth {
                header: engine.header.len(),
                descriptors: descriptors.len(),
            });
        }
        if let Some((position, (expected, descriptor))) = engine
            .header
            .iter()
            .zip(&descriptors)
            .enumerate()
            .find(|(_, (name, descriptor))| **name != descriptor.name)
        {
            return Err(StreamError::DescriptorName {
                position,
                expected: expected.clone(),
                found: descriptor.name.clone(),
            });
        }
        engine.state = State::Streaming(descriptors);
        Ok(engine)
    }

    #[must_use]
    pub fn header(&self) -> &[String] {
        &self.header
    }

    #[must_use]
    pub fn phase(&self) -> Phase {
        match self.state {
            State::Detecting(_) => Phase::Detecting,
            State::Streaming(_) => Phase::Streaming,
        }
    }

    /// Detected schema, once the engine is streaming.
    #[must_use]
    pub fn descriptors(&self) -> Option<&[ColumnDescriptor]> {
        match &self.state {
            State::Detecting(_) => None,
            State::Streaming(descriptors) => Some(descriptors),
        }
    }

    /// Rows folded so far. Buffered sample rows are not counted until
    /// detection has run.
    #[must_use]
    pub fn rows_processed(&self) -> u64 {
        self.rows_processed
    }

    #[must_use]
    pub fn diagnostics(&self) -> &DiagnosticLedger {
        &self.diagnostics
    }

    pub fn push_row<S: AsRef<str>>(&mut self, fields: &[S]) {
        self.push_record(None, fields);
    }

    /// Push one row; `line` is its 1-based source line when known.
    pub fn push_record<S: AsRef<str>>(&mut self, line: Option<u64>, fields: &[S]) {
        if fields.len() != self.header.len() {
            let detail = format!(
                "expected {} fields, found {}",
                self.header.len(),
                fields.len()
            );
            tracing::debug!(?line, %detail, "skipping malformed row");
            self.diagnostics.record_skipped(RowIssue {
                kind: IssueKind::FieldCountMismatch,
                line,
                detail,
            });
            return;
        }

        if let State::Detecting(buffer) = &mut self.state {
            buffer.push(fields.iter().map(|field| field.as_ref().to_owned()).collect());
            if buffer.len() >= self.detect.sample_rows {
                self.start_streaming();
            }
            return;
        }
        self.fold(fields);
    }

    /// Record a row the source could not decode at all.
    pub fn push_unreadable_row(&mut self, line: Option<u64>, detail: impl Into<String>) {
        let detail = detail.into();
        tracing::debug!(?line, %detail, "skipping undecodable row");
        self.diagnostics.record_skipped(RowIssue {
            kind: IssueKind::UndecodableRow,
            line,
            detail,
        });
    }

    /// Unfinalized state, for merging with other shards.
    #[must_use]
    pub fn into_partial(mut self) -> PartialAggregate {
        self.start_streaming();
        let columns = match self.state {
            State::Streaming(descriptors) => descriptors,
            State::Detecting(_) => Vec::new(),
        };
        PartialAggregate {
            columns,
            active: self.active,
            group_by: self.group_by,
            groups: self.groups,
            rows_processed: self.rows_processed,
            diagnostics: self.diagnostics,
        }
    }

    pub fn finish(self) -> Result<StatsReport, StreamError> {
        let top_n = self.top_n;
        let report = self.into_partial().assemble(top_n)?;
        tracing::info!(
            rows = report.metadata.total_rows_processed,
            skipped = report.metadata.skipped_rows,
            groups = report.result.group_count(),
            rejected_numeric = report.diagnostics.rejected_numeric_cells(),
            "aggregation finished"
        );
        Ok(report)
    }

    fn start_streaming(&mut self) {
        let State::Detecting(buffer) = &mut self.state else {
            return;
        };
        let buffer = std::mem::take(buffer);
        let detection = detect(&buffer, &self.header, &self.detect);
        let count_of = |kind: ColumnKind| {
            detection
                .descriptors
                .iter()
                .filter(|descriptor| descriptor.kind == kind)
                .count()
        };
        tracing::info!(
            sampled = buffer.len(),
            numeric = count_of(ColumnKind::Numeric),
            categorical = count_of(ColumnKind::Categorical),
            sequence = count_of(ColumnKind::ComplexSequence),
            mapping = count_of(ColumnKind::ComplexMapping),
            "column detection complete"
        );
        self.state = State::Streaming(detection.descriptors);
        for row in &buffer {
            self.fold(row.as_slice());
        }
    }

    fn fold<S: AsRef<str>>(&mut self, fields: &[S]) {
        let State::Streaming(descriptors) = &self.state else {
            return;
        };
        let key: Vec<String> = self
            .group_positions
            .iter()
            .map(|&pos| fields.get(pos).map_or_else(String::new, |v| v.as_ref().to_owned()))
            .collect();
        let set = self
            .groups
            .entry(key)
            .or_insert_with(|| AccumulatorSet::new(descriptors, &self.active));

        for (pos, raw) in fields.iter().enumerate() {
            let Some(acc) = set.slot_mut(pos) else {
                continue;
            };
            let kind = acc.kind();
            let outcome = acc.fold(&parse_cell_as(raw.as_ref(), kind));
            if outcome == FoldOutcome::Rejected && kind == ColumnKind::Numeric {
                self.diagnostics.note_rejected_numeric();
            }
        }
        self.rows_processed += 1;
    }
}
