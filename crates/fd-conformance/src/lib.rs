#![forbid(unsafe_code)]

//! Parity checks between two Result Objects.
//!
//! Any execution strategy that claims to produce the canonical result (a
//! streaming pass, a sharded pass, an in-memory tabular pass) can be diffed
//! against another with [`compare_results`]. Floating-point fields compare
//! within a relative tolerance; counts, kinds and frequency tables compare
//! exactly.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use fd_stream::{ColumnSummaries, ResultObject};
use fd_types::Summary;
use serde::{Deserialize, Serialize};

/// Relative tolerance for summation-order drift between strategies.
pub const DEFAULT_REL_TOL: f64 = 1e-9;

/// Comparison dimension of a mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonCategory {
    /// Overall vs grouped, or a group/column present on one side only.
    Shape,
    /// Column kind disagreement.
    Type,
    /// Exact count fields.
    Count,
    /// Float fields beyond tolerance.
    Value,
    /// Null on one side, a number on the other.
    Nullness,
    /// Frequency table entries or their order.
    Frequency,
}

impl ComparisonCategory {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Shape => "shape",
            Self::Type => "type",
            Self::Count => "count",
            Self::Value => "value",
            Self::Nullness => "nullness",
            Self::Frequency => "frequency",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultMismatch {
    pub category: ComparisonCategory,
    /// `group/column.field`; the group part is absent for overall results.
    pub location: String,
    pub message: String,
}

impl fmt::Display for ResultMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.category.as_str(), self.location, self.message)
    }
}

#[must_use]
pub fn values_close(left: f64, right: f64, rel_tol: f64) -> bool {
    if left == right {
        return true;
    }
    let scale = left.abs().max(right.abs()).max(1.0);
    (left - right).abs() <= rel_tol * scale
}

/// Every difference between two Result Objects, in canonical key order.
#[must_use]
pub fn compare_results(
    left: &ResultObject,
    right: &ResultObject,
    rel_tol: f64,
) -> Vec<ResultMismatch> {
    let mut out = Vec::new();
    match (left, right) {
        (ResultObject::Overall(l), ResultObject::Overall(r)) => {
            compare_columns("", l, r, rel_tol, &mut out);
        }
        (ResultObject::Grouped(l), ResultObject::Grouped(r)) => {
            for key in union_keys(l, r) {
                match (l.get(key), r.get(key)) {
                    (Some(lc), Some(rc)) => compare_columns(&format!("{key}/"), lc, rc, rel_tol, &mut out),
                    (lc, _) => out.push(ResultMismatch {
                        category: ComparisonCategory::Shape,
                        location: key.clone(),
                        message: format!(
                            "group only present on the {} side",
                            if lc.is_some() { "left" } else { "right" }
                        ),
                    }),
                }
            }
        }
        (l, r) => out.push(ResultMismatch {
            category: ComparisonCategory::Shape,
            location: String::new(),
            message: format!(
                "analysis types differ: {:?} vs {:?}",
                l.analysis_type(),
                r.analysis_type()
            ),
        }),
    }
    out
}

fn union_keys<'a, V>(l: &'a BTreeMap<String, V>, r: &'a BTreeMap<String, V>) -> BTreeSet<&'a String> {
    l.keys().chain(r.keys()).collect()
}

fn compare_columns(
    prefix: &str,
    left: &ColumnSummaries,
    right: &ColumnSummaries,
    rel_tol: f64,
    out: &mut Vec<ResultMismatch>,
) {
    for column in union_keys(left, right) {
        let location = format!("{prefix}{column}");
        match (left.get(column), right.get(column)) {
            (Some(l), Some(r)) => compare_summaries(&location, l, r, rel_tol, out),
            (l, _) => out.push(ResultMismatch {
                category: ComparisonCategory::Shape,
                location,
                message: format!(
                    "column only present on the {} side",
                    if l.is_some() { "left" } else { "right" }
                ),
            }),
        }
    }
}

/// Append every difference between two column summaries to `out`.
pub fn compare_summaries(
    location: &str,
    left: &Summary,
    right: &Summary,
    rel_tol: f64,
    out: &mut Vec<ResultMismatch>,
) {
    if left.kind != right.kind {
        out.push(ResultMismatch {
            category: ComparisonCategory::Type,
            location: location.to_owned(),
            message: format!("kind {} vs {}", left.kind, right.kind),
        });
        return;
    }
    if left.count != right.count {
        out.push(ResultMismatch {
            category: ComparisonCategory::Count,
            location: format!("{location}.count"),
            message: format!("{} vs {}", left.count, right.count),
        });
    }
    if left.unique_count != right.unique_count {
        out.push(ResultMismatch {
            category: ComparisonCategory::Count,
            location: format!("{location}.unique_count"),
            message: format!("{:?} vs {:?}", left.unique_count, right.unique_count),
        });
    }

    let floats = [
        ("sum", left.sum, right.sum),
        ("mean", left.mean, right.mean),
        ("std", left.std, right.std),
        ("min", left.min, right.min),
        ("max", left.max, right.max),
    ];
    for (field, l, r) in floats {
        match (l, r) {
            (None, None) => {}
            (Some(a), Some(b)) if values_close(a, b, rel_tol) => {}
            (Some(a), Some(b)) => out.push(ResultMismatch {
                category: ComparisonCategory::Value,
                location: format!("{location}.{field}"),
                message: format!("{a} vs {b} exceeds relative tolerance {rel_tol}"),
            }),
            (l, r) => out.push(ResultMismatch {
                category: ComparisonCategory::Nullness,
                location: format!("{location}.{field}"),
                message: format!("{l:?} vs {r:?}"),
            }),
        }
    }

    if left.top_frequencies != right.top_frequencies {
        let position = left
            .top_frequencies
            .iter()
            .zip(&right.top_frequencies)
            .position(|(l, r)| l != r)
            .unwrap_or_else(|| left.top_frequencies.len().min(right.top_frequencies.len()));
        out.push(ResultMismatch {
            category: ComparisonCategory::Frequency,
            location: format!("{location}.top_frequencies[{position}]"),
            message: format!(
                "{:?} vs {:?}",
                left.top_frequencies.get(position),
                right.top_frequencies.get(position)
            ),
        });
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: ComparisonCategory,
    pub count: usize,
}

/// Parity verdict between two labelled results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractCheck {
    pub left_label: String,
    pub right_label: String,
    pub rel_tol: f64,
    pub groups_compared: usize,
    pub mismatches: Vec<ResultMismatch>,
    pub categories: Vec<CategoryCount>,
}

impl ContractCheck {
    #[must_use]
    pub fn run(
        left_label: impl Into<String>,
        left: &ResultObject,
        right_label: impl Into<String>,
        right: &ResultObject,
        rel_tol: f64,
    ) -> Self {
        let mismatches = compare_results(left, right, rel_tol);
        let mut counts = BTreeMap::<ComparisonCategory, usize>::new();
        for mismatch in &mismatches {
            *counts.entry(mismatch.category).or_default() += 1;
        }
        Self {
            left_label: left_label.into(),
            right_label: right_label.into(),
            rel_tol,
            groups_compared: left.group_count().max(right.group_count()),
            mismatches,
            categories: counts
                .into_iter()
                .map(|(category, count)| CategoryCount { category, count })
                .collect(),
        }
    }

    #[must_use]
    pub fn is_parity(&self) -> bool {
        self.mismatches.is_empty()
    }

    #[must_use]
    pub fn summary_line(&self) -> String {
        if self.is_parity() {
            format!(
                "{} == {} across {} group(s) (rel_tol={})",
                self.left_label, self.right_label, self.groups_compared, self.rel_tol
            )
        } else {
            format!(
                "{} != {}: {} mismatch(es), first {}",
                self.left_label,
                self.right_label,
                self.mismatches.len(),
                self.mismatches[0]
            )
        }
    }
}
