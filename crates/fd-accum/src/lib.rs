#![forbid(unsafe_code)]

//! Running per-column statistics.
//!
//! Every accumulator is an order-independent fold: folding rows in any order,
//! or merging partial states in any order, finalizes to the same summary up
//! to floating-point summation order.

use std::collections::HashMap;

use fd_types::{Cell, ColumnDescriptor, ColumnKind, FrequencyEntry, Summary, number_token};
use thiserror::Error;

pub const DEFAULT_TOP_N: usize = 5;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AccumError {
    #[error("cannot merge {right} accumulator into {left} accumulator")]
    KindMismatch { left: ColumnKind, right: ColumnKind },
    #[error("accumulator sets have {left} and {right} slots")]
    WidthMismatch { left: usize, right: usize },
}

/// What a single fold did with its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoldOutcome {
    Counted,
    Missing,
    /// The value's shape does not apply to this accumulator and was ignored.
    Rejected,
}

/// Running moments of a numeric column.
///
/// Values are stored as `x * 2^-exponent`, where `exponent` tracks the
/// largest magnitude seen, and the second moment is kept as sums of
/// `x - shift` around the first folded value. Squares therefore stay small
/// and a large common offset never cancels against itself.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NumericAccumulator {
    count: u64,
    sum: f64,
    exponent: i32,
    shift: f64,
    shifted_sum: f64,
    shifted_sq: f64,
    min: Option<f64>,
    max: Option<f64>,
}

/// Binary exponent that brings `value` below 1.0 in magnitude; zero when it
/// already is.
fn magnitude_exponent(value: f64) -> i32 {
    let biased = ((value.to_bits() >> 52) & 0x7ff) as i32;
    (biased - 1022).max(0)
}

/// `value * 2^exponent`, in steps small enough that no power overflows.
fn scale(mut value: f64, mut exponent: i32) -> f64 {
    while exponent != 0 {
        let step = exponent.clamp(-1000, 1000);
        value *= 2f64.powi(step);
        exponent -= step;
    }
    value
}

impl NumericAccumulator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one value. Non-finite values are ignored.
    pub fn push(&mut self, value: f64) -> bool {
        if !value.is_finite() {
            return false;
        }
        self.rescale(magnitude_exponent(value));
        let scaled = scale(value, -self.exponent);
        if self.count == 0 {
            self.shift = scaled;
        }
        let offset = scaled - self.shift;
        self.count += 1;
        self.sum += value;
        self.shifted_sum += offset;
        self.shifted_sq += offset * offset;
        self.min = Some(self.min.map_or(value, |m| m.min(value)));
        self.max = Some(self.max.map_or(value, |m| m.max(value)));
        true
    }

    /// Raise the working exponent to at least `exponent`.
    fn rescale(&mut self, exponent: i32) {
        if exponent <= self.exponent {
            return;
        }
        let step = self.exponent - exponent;
        self.shift = scale(self.shift, step);
        self.shifted_sum = scale(self.shifted_sum, step);
        self.shifted_sq = scale(self.shifted_sq, 2 * step);
        self.exponent = exponent;
    }

    pub fn fold(&mut self, cell: &Cell) -> FoldOutcome {
        match cell {
            Cell::Missing => FoldOutcome::Missing,
            other => match other.to_f64() {
                Ok(v) if self.push(v) => FoldOutcome::Counted,
                _ => FoldOutcome::Rejected,
            },
        }
    }

    pub fn merge(&mut self, other: &Self) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = other.clone();
            return;
        }
        self.rescale(other.exponent);
        let step = other.exponent - self.exponent;
        let other_sum = scale(other.shifted_sum, step);
        let other_sq = scale(other.shifted_sq, 2 * step);
        // Re-centre the other side's sums on this side's shift.
        let delta = scale(other.shift, step) - self.shift;
        let n = other.count as f64;
        self.shifted_sq += other_sq + 2.0 * delta * other_sum + n * delta * delta;
        self.shifted_sum += other_sum + n * delta;
        self.count += other.count;
        self.sum += other.sum;
        self.min = match (self.min, other.min) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        self.max = match (self.max, other.max) {
            (Some(a), Some(b)) => Some(a.max(b)),
            (a, b) => a.or(b),
        };
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }

    #[must_use]
    pub fn sum(&self) -> f64 {
        self.sum
    }

    /// `sum / count`; falls back to the shifted form when the raw sum has
    /// overflowed.
    #[must_use]
    pub fn mean(&self) -> Option<f64> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as f64;
        let direct = self.sum / n;
        if direct.is_finite() {
            Some(direct)
        } else {
            Some(scale(self.shift + self.shifted_sum / n, self.exponent))
        }
    }

    /// Sample variance (N-1) in scaled units, clamped at zero.
    fn scaled_variance(&self) -> Option<f64> {
        if self.count < 2 {
            return None;
        }
        let n = self.count as f64;
        let variance = (self.shifted_sq - self.shifted_sum * self.shifted_sum / n) / (n - 1.0);
        variance.is_finite().then(|| variance.max(0.0))
    }

    /// Sample variance (N-1); `None` below two values or when the variance
    /// itself is not representable.
    #[must_use]
    pub fn sample_variance(&self) -> Option<f64> {
        self.scaled_variance()
            .map(|variance| scale(variance, 2 * self.exponent))
            .filter(|variance| variance.is_finite())
    }

    #[must_use]
    pub fn sample_std(&self) -> Option<f64> {
        self.scaled_variance()
            .map(|variance| scale(variance.sqrt(), self.exponent))
            .filter(|std| std.is_finite())
    }

    #[must_use]
    pub fn min(&self) -> Option<f64> {
        self.min
    }

    #[must_use]
    pub fn max(&self) -> Option<f64> {
        self.max
    }

    #[must_use]
    pub fn finalize(&self) -> Summary {
        Summary {
            kind: ColumnKind::Numeric,
            count: self.count,
            sum: Some(self.sum),
            mean: self.mean(),
            std: self.sample_std(),
            min: self.min,
            max: self.max,
            unique_count: None,
            top_frequencies: Vec::new(),
        }
    }
}

/// Token counts for categorical columns and exploded sequence columns.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyAccumulator {
    kind: ColumnKind,
    count: u64,
    table: HashMap<String, u64>,
}

impl FrequencyAccumulator {
    #[must_use]
    pub fn categorical() -> Self {
        Self::with_kind(ColumnKind::Categorical)
    }

    /// One row with N elements contributes N increments.
    #[must_use]
    pub fn exploding() -> Self {
        Self::with_kind(ColumnKind::ComplexSequence)
    }

    fn with_kind(kind: ColumnKind) -> Self {
        Self {
            kind,
            count: 0,
            table: HashMap::new(),
        }
    }

    pub fn record(&mut self, token: &str) {
        self.record_n(token, 1);
    }

    fn record_n(&mut self, token: &str, n: u64) {
        self.count += n;
        if let Some(slot) = self.table.get_mut(token) {
            *slot += n;
        } else {
            self.table.insert(token.to_owned(), n);
        }
    }

    pub fn fold(&mut self, cell: &Cell) -> FoldOutcome {
        match (cell, self.kind) {
            (Cell::Missing, _) => return FoldOutcome::Missing,
            (Cell::Text(text), _) => self.record(text),
            (Cell::Number(v), _) => self.record(&number_token(*v)),
            (Cell::Sequence(items), ColumnKind::ComplexSequence) => {
                for item in items {
                    self.record(item);
                }
            }
            (Cell::Sequence(_) | Cell::Mapping(_), _) => return FoldOutcome::Rejected,
        }
        FoldOutcome::Counted
    }

    pub fn merge(&mut self, other: &Self) {
        for (token, n) in &other.table {
            self.record_n(token, *n);
        }
    }

    #[must_use]
    pub fn count(&self) -> u64 {
        self.count
    }

    #[must_use]
    pub fn frequency(&self, token: &str) -> u64 {
        self.table.get(token).copied().unwrap_or(0)
    }

    #[must_use]
    pub fn unique_count(&self) -> usize {
        self.table.len()
    }

    /// Descending count, ties broken by ascending token.
    #[must_use]
    pub fn top_frequencies(&self, top_n: Option<usize>) -> Vec<FrequencyEntry> {
        let mut entries: Vec<FrequencyEntry> = self
            .table
            .iter()
            .map(|(value, count)| FrequencyEntry {
                value: value.clone(),
                count: *count,
            })
            .collect();
        entries.sort_unstable_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
        if let Some(n) = top_n {
            entries.truncate(n);
        }
        entries
    }

    #[must_use]
    pub fn finalize(&self, top_n: Option<usize>) -> Summary {
        Summary {
            count: self.count,
            unique_count: Some(self.table.len() as u64),
            top_frequencies: self.top_frequencies(top_n),
            ..Summary::empty(self.kind)
        }
    }
}

/// Mapping-valued columns are only counted; their sub-fields are parsed but
/// not aggregated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingAccumulator {
    count: u64,
}

impl MappingAccumulator {
    pub fn fold(&mut self, cell: &Cell) -> FoldOutcome {
        match cell {
            Cell::Missing => FoldOutcome::Missing,
            Cell::Mapping(_) => {
                self.count += 1;
                FoldOutcome::Counted
            }
            _ => FoldOutcome::Rejected,
        }
    }

    pub fn merge(&mut self, other: &Self) {
        self.count += other.count;
    }

    #[must_use]
    pub fn finalize(&self) -> Summary {
        Summary {
            count: self.count,
            ..Summary::empty(ColumnKind::ComplexMapping)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Accumulator {
    Numeric(NumericAccumulator),
    Frequency(FrequencyAccumulator),
    Mapping(MappingAccumulator),
}

impl Accumulator {
    #[must_use]
    pub fn for_kind(kind: ColumnKind) -> Self {
        match kind {
            ColumnKind::Numeric => Self::Numeric(NumericAccumulator::new()),
            ColumnKind::Categorical => Self::Frequency(FrequencyAccumulator::categorical()),
            ColumnKind::ComplexSequence => Self::Frequency(FrequencyAccumulator::exploding()),
            ColumnKind::ComplexMapping => Self::Mapping(MappingAccumulator::default()),
        }
    }

    #[must_use]
    pub fn kind(&self) -> ColumnKind {
        match self {
            Self::Numeric(_) => ColumnKind::Numeric,
            Self::Frequency(acc) => acc.kind,
            Self::Mapping(_) => ColumnKind::ComplexMapping,
        }
    }

    pub fn fold(&mut self, cell: &Cell) -> FoldOutcome {
        match self {
            Self::Numeric(acc) => acc.fold(cell),
            Self::Frequency(acc) => acc.fold(cell),
            Self::Mapping(acc) => acc.fold(cell),
        }
    }

    pub fn merge(&mut self, other: &Self) -> Result<(), AccumError> {
        match (self, other) {
            (Self::Numeric(left), Self::Numeric(right)) => left.merge(right),
            (Self::Frequency(left), Self::Frequency(right)) if left.kind == right.kind => {
                left.merge(right);
            }
            (Self::Mapping(left), Self::Mapping(right)) => left.merge(right),
            (left, right) => {
                return Err(AccumError::KindMismatch {
                    left: left.kind(),
                    right: right.kind(),
                });
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn finalize(&self, top_n: Option<usize>) -> Summary {
        match self {
            Self::Numeric(acc) => acc.finalize(),
            Self::Frequency(acc) => acc.finalize(top_n),
            Self::Mapping(acc) => acc.finalize(),
        }
    }
}

/// One accumulator per column position; `None` marks a column that is not
/// summarized (grouping or excluded columns).
#[derive(Debug, Clone, PartialEq)]
pub struct AccumulatorSet {
    slots: Vec<Option<Accumulator>>,
}

impl AccumulatorSet {
    #[must_use]
    pub fn new(descriptors: &[ColumnDescriptor], active: &[bool]) -> Self {
        let slots = descriptors
            .iter()
            .zip(active)
            .map(|(descriptor, &on)| on.then(|| Accumulator::for_kind(descriptor.kind)))
            .collect();
        Self { slots }
    }

    #[must_use]
    pub fn slot(&self, position: usize) -> Option<&Accumulator> {
        self.slots.get(position).and_then(Option::as_ref)
    }

    pub fn slot_mut(&mut self, position: usize) -> Option<&mut Accumulator> {
        self.slots.get_mut(position).and_then(Option::as_mut)
    }

    pub fn merge(&mut self, other: &Self) -> Result<(), AccumError> {
        if self.slots.len() != other.slots.len() {
            return Err(AccumError::WidthMismatch {
                left: self.slots.len(),
                right: other.slots.len(),
            });
        }
        for (slot, right) in self.slots.iter_mut().zip(&other.slots) {
            let Some(right) = right else {
                continue;
            };
            if let Some(left) = slot {
                left.merge(right)?;
            } else {
                *slot = Some(right.clone());
            }
        }
        Ok(())
    }

    /// `(position, summary)` for every active slot.
    pub fn finalize(&self, top_n: Option<usize>) -> impl Iterator<Item = (usize, Summary)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(move |(pos, slot)| slot.as_ref().map(|acc| (pos, acc.finalize(top_n))))
    }
}

#[cfg(test)]
mod tests {
    use fd_types::{Cell, ColumnDescriptor, ColumnKind, FrequencyEntry};
    use proptest::prelude::*;

    use super::{
        AccumError, Accumulator, AccumulatorSet, FoldOutcome, FrequencyAccumulator,
        MappingAccumulator, NumericAccumulator,
    };

    fn numeric(values: &[f64]) -> NumericAccumulator {
        let mut acc = NumericAccumulator::new();
        for v in values {
            acc.push(*v);
        }
        acc
    }

    #[test]
    fn sample_std_matches_reference() {
        let acc = numeric(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        let summary = acc.finalize();
        assert_eq!(summary.count, 8);
        assert_eq!(summary.mean, Some(5.0));
        let std = summary.std.expect("std");
        assert!((std - 2.138_089_935_299_395).abs() < 1e-9, "std={std}");
        assert_eq!(summary.min, Some(2.0));
        assert_eq!(summary.max, Some(9.0));
    }

    #[test]
    fn zero_and_single_counts_yield_nulls() {
        let empty = NumericAccumulator::new().finalize();
        assert_eq!(empty.count, 0);
        assert_eq!(empty.mean, None);
        assert_eq!(empty.std, None);
        assert_eq!(empty.min, None);

        let single = numeric(&[3.5]).finalize();
        assert_eq!(single.mean, Some(3.5));
        assert_eq!(single.std, None);
    }

    #[test]
    fn variance_is_clamped_non_negative() {
        let acc = numeric(&[0.1; 7]);
        let variance = acc.sample_variance().expect("variance");
        assert!(variance >= 0.0);
        assert!(acc.sample_std().expect("std").is_finite());
    }

    fn two_pass_std(values: &[f64], unit: f64) -> f64 {
        let n = values.len() as f64;
        let mean = values.iter().map(|v| v / unit).sum::<f64>() / n;
        let squares: f64 = values.iter().map(|v| (v / unit - mean).powi(2)).sum();
        (squares / (n - 1.0)).sqrt() * unit
    }

    fn assert_rel_close(actual: f64, expected: f64) {
        let rel = ((actual - expected) / expected).abs();
        assert!(rel <= 1e-9, "actual={actual} expected={expected} rel={rel}");
    }

    #[test]
    fn std_keeps_precision_under_large_offsets() {
        let stamps: Vec<f64> = (0..1_000)
            .map(|i| 1_700_000_000.0 + f64::from(i % 7))
            .collect();
        let offsets: Vec<f64> = (0..1_000).map(|i| f64::from(i % 7)).collect();
        let std = numeric(&stamps).sample_std().expect("std");
        assert_rel_close(std, two_pass_std(&offsets, 1.0));

        let decimals = [1_000_000_000.1, 1_000_000_000.2, 1_000_000_000.3];
        let std = numeric(&decimals).sample_std().expect("std");
        assert_rel_close(std, two_pass_std(&decimals, 1.0));
        assert!((std - 0.1).abs() < 1e-6, "std={std}");
    }

    #[test]
    fn std_survives_magnitudes_whose_squares_overflow() {
        let values = [1e200, 2e200, 3e200];
        let acc = numeric(&values);
        let std = acc.sample_std().expect("std");
        assert_rel_close(std, two_pass_std(&values, 1e200));
        assert_rel_close(std, 1e200);
        assert_rel_close(acc.mean().expect("mean"), 2e200);
        // The variance itself is past f64::MAX.
        assert_eq!(acc.sample_variance(), None);

        let extremes = numeric(&[f64::MAX, f64::MAX, f64::MAX]);
        assert_eq!(extremes.sample_std(), Some(0.0));
        assert_eq!(extremes.mean(), Some(f64::MAX));
    }

    #[test]
    fn merge_aligns_scale_and_shift() {
        let near: Vec<f64> = (0..50).map(|i| 1e9 + f64::from(i)).collect();
        let far = [3e12, 3e12 + 5.0, 1e200];
        let mut all = near.clone();
        all.extend_from_slice(&far);

        let whole = numeric(&all);
        let mut left = numeric(&near);
        left.merge(&numeric(&far));
        assert_eq!(left.count(), whole.count());
        assert_eq!(left.max(), Some(1e200));
        assert_rel_close(
            left.sample_std().expect("merged std"),
            whole.sample_std().expect("std"),
        );

        let mut empty = NumericAccumulator::new();
        empty.merge(&whole);
        assert_eq!(empty, whole);
        let mut unchanged = whole.clone();
        unchanged.merge(&NumericAccumulator::new());
        assert_eq!(unchanged, whole);
    }

    #[test]
    fn numeric_fold_ignores_missing_and_rejects_text() {
        let mut acc = NumericAccumulator::new();
        assert_eq!(acc.fold(&Cell::Number(1.0)), FoldOutcome::Counted);
        assert_eq!(acc.fold(&Cell::Missing), FoldOutcome::Missing);
        assert_eq!(acc.fold(&Cell::Number(3.0)), FoldOutcome::Counted);
        assert_eq!(acc.fold(&Cell::Text("x".to_owned())), FoldOutcome::Rejected);
        assert_eq!(acc.count(), 2);
        assert_eq!(acc.sum(), 4.0);
        assert_eq!(acc.mean(), Some(2.0));
        assert!(!acc.push(f64::NAN));
        assert_eq!(acc.count(), 2);
    }

    #[test]
    fn sequence_explodes_into_tokens() {
        let mut acc = FrequencyAccumulator::exploding();
        acc.fold(&Cell::Sequence(vec!["facebook".to_owned(), "instagram".to_owned()]));
        acc.fold(&Cell::Sequence(vec!["facebook".to_owned()]));
        assert_eq!(acc.frequency("facebook"), 2);
        assert_eq!(acc.frequency("instagram"), 1);
        assert_eq!(acc.count(), 3);
        assert_eq!(
            acc.top_frequencies(None),
            vec![
                FrequencyEntry { value: "facebook".to_owned(), count: 2 },
                FrequencyEntry { value: "instagram".to_owned(), count: 1 },
            ]
        );
    }

    #[test]
    fn bare_text_in_sequence_column_counts_once() {
        let mut acc = FrequencyAccumulator::exploding();
        assert_eq!(acc.fold(&Cell::Text("facebook".to_owned())), FoldOutcome::Counted);
        assert_eq!(acc.frequency("facebook"), 1);
    }

    #[test]
    fn categorical_rejects_composites_and_renders_numbers() {
        let mut acc = FrequencyAccumulator::categorical();
        assert_eq!(
            acc.fold(&Cell::Sequence(vec!["a".to_owned()])),
            FoldOutcome::Rejected
        );
        acc.fold(&Cell::Number(2.0));
        acc.fold(&Cell::Text("2".to_owned()));
        assert_eq!(acc.frequency("2"), 2);
        assert_eq!(acc.unique_count(), 1);
    }

    #[test]
    fn ties_break_by_ascending_token_and_truncate() {
        let mut acc = FrequencyAccumulator::categorical();
        for token in ["b", "a", "c", "a", "b", "d"] {
            acc.record(token);
        }
        let top = acc.top_frequencies(Some(3));
        let values: Vec<&str> = top.iter().map(|e| e.value.as_str()).collect();
        assert_eq!(values, ["a", "b", "c"]);
        let summary = acc.finalize(Some(3));
        assert_eq!(summary.unique_count, Some(4));
        assert_eq!(summary.count, 6);
        assert_eq!(summary.mean, None);
    }

    #[test]
    fn mapping_only_counts_mappings() {
        let mut acc = MappingAccumulator::default();
        assert_eq!(
            acc.fold(&Cell::Mapping(Default::default())),
            FoldOutcome::Counted
        );
        assert_eq!(acc.fold(&Cell::Number(1.0)), FoldOutcome::Rejected);
        let summary = acc.finalize();
        assert_eq!(summary.count, 1);
        assert_eq!(summary.kind, ColumnKind::ComplexMapping);
        assert_eq!(summary.sum, None);
    }

    #[test]
    fn merge_rejects_kind_mismatch() {
        let mut left = Accumulator::for_kind(ColumnKind::Categorical);
        let right = Accumulator::for_kind(ColumnKind::ComplexSequence);
        assert_eq!(
            left.merge(&right),
            Err(AccumError::KindMismatch {
                left: ColumnKind::Categorical,
                right: ColumnKind::ComplexSequence,
            })
        );
    }

    #[test]
    fn accumulator_set_skips_inactive_slots() {
        let descriptors = vec![
            ColumnDescriptor::new("g", ColumnKind::Categorical),
            ColumnDescriptor::new("v", ColumnKind::Numeric),
        ];
        let mut set = AccumulatorSet::new(&descriptors, &[false, true]);
        assert!(set.slot(0).is_none());
        set.slot_mut(1).expect("active").fold(&Cell::Number(4.0));
        let summaries: Vec<_> = set.finalize(None).collect();
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].0, 1);
        assert_eq!(summaries[0].1.sum, Some(4.0));

        let other = AccumulatorSet::new(&descriptors[..1], &[true]);
        assert_eq!(
            set.merge(&other),
            Err(AccumError::WidthMismatch { left: 2, right: 1 })
        );
    }

    proptest! {
        #[test]
        fn prop_numeric_merge_matches_single_pass(
            values in proptest::collection::vec(-1e6f64..1e6f64, 0..60),
            split in 0usize..60,
        ) {
            let split = split.min(values.len());
            let whole = numeric(&values);
            let mut left = numeric(&values[..split]);
            let right = numeric(&values[split..]);
            left.merge(&right);
            prop_assert_eq!(left.count(), whole.count());
            prop_assert_eq!(left.min(), whole.min());
            prop_assert_eq!(left.max(), whole.max());
            let tol = 1e-9 * whole.sum().abs().max(1.0);
            prop_assert!((left.sum() - whole.sum()).abs() <= tol);
        }

        #[test]
        fn prop_std_matches_two_pass_at_any_offset(
            offset in prop::sample::select(vec![0.0, 1e9, 1.7e9, -3e12]),
            quarters in proptest::collection::vec(-500i32..500, 2..60),
            split in 0usize..60,
        ) {
            let steps: Vec<f64> = quarters.iter().map(|q| f64::from(*q) / 4.0).collect();
            let values: Vec<f64> = steps.iter().map(|step| offset + step).collect();
            let want = two_pass_std(&steps, 1.0);

            let whole = numeric(&values);
            let got = whole.sample_std().expect("std");
            prop_assert!((got - want).abs() <= 1e-9 * want, "got={} want={}", got, want);

            let split = split.min(values.len());
            let mut left = numeric(&values[..split]);
            left.merge(&numeric(&values[split..]));
            let merged = left.sample_std().expect("merged std");
            prop_assert!((merged - want).abs() <= 1e-9 * want, "merged={} want={}", merged, want);
        }

        #[test]
        fn prop_frequency_fold_is_order_independent(
            tokens in proptest::collection::vec("[a-d]", 0..40),
        ) {
            let mut forward = FrequencyAccumulator::categorical();
            let mut backward = FrequencyAccumulator::categorical();
            for token in &tokens {
                forward.record(token);
            }
            for token in tokens.iter().rev() {
                backward.record(token);
            }
            prop_assert_eq!(forward.finalize(None), backward.finalize(None));
        }
    }
}
