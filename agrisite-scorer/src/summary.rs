//! Running counters and bounded top-N ranking for a batch.
#![forbid(unsafe_code)]

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use serde::Serialize;

use crate::{Classification, ProductivityResult};

/// Availability of the water data a batch ran against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct WaterSourceStatus {
    /// Number of indexed water sources.
    pub count: usize,
    /// `true` when the catalogue served expired data.
    pub stale: bool,
}

/// Outcome of a batch run.
///
/// The counts always satisfy
/// `total_analyzed == productive_count + not_productive_count + errored_count`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSummary {
    /// Candidates processed, errored ones included.
    pub total_analyzed: usize,
    /// Candidates at or above the threshold.
    pub productive_count: usize,
    /// Candidates scored below the threshold.
    pub not_productive_count: usize,
    /// Candidates that were malformed or could not be scored.
    pub errored_count: usize,
    /// `productive_count / total_analyzed`, or `0.0` for an empty batch.
    pub success_rate: f64,
    /// Best results by descending score; ties keep input order.
    pub top_results: Vec<ProductivityResult>,
    /// Water data used for the run.
    pub water_sources: WaterSourceStatus,
    /// `true` when the run stopped early on request.
    pub cancelled: bool,
}

struct Ranked {
    index: usize,
    result: ProductivityResult,
}

impl Ord for Ranked {
    /// Higher scores rank greater; for equal scores the earlier input does.
    fn cmp(&self, other: &Self) -> Ordering {
        self.result
            .score
            .total_cmp(&other.result.score)
            .then_with(|| other.index.cmp(&self.index))
    }
}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked {}

/// Keeps the `capacity` best results seen so far.
///
/// Memory stays proportional to `capacity` regardless of batch size. The
/// selection does not depend on insertion order because ties are resolved
/// by input index.
pub(crate) struct TopResults {
    capacity: usize,
    heap: BinaryHeap<Reverse<Ranked>>,
}

impl TopResults {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            capacity,
            heap: BinaryHeap::with_capacity(capacity.saturating_add(1)),
        }
    }

    pub(crate) fn offer(&mut self, index: usize, result: ProductivityResult) {
        if self.capacity == 0 {
            return;
        }
        let candidate = Ranked { index, result };
        if self.heap.len() < self.capacity {
            self.heap.push(Reverse(candidate));
            return;
        }
        let beats_worst = self
            .heap
            .peek()
            .is_some_and(|Reverse(worst)| candidate > *worst);
        if beats_worst {
            self.heap.pop();
            self.heap.push(Reverse(candidate));
        }
    }

    pub(crate) fn into_sorted(self) -> Vec<ProductivityResult> {
        // Ascending order of `Reverse` is descending rank.
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|Reverse(ranked)| ranked.result)
            .collect()
    }
}

/// Incrementally folds candidate outcomes into an [`AnalysisSummary`].
pub(crate) struct SummaryBuilder {
    threshold_hits: usize,
    misses: usize,
    errored: usize,
    top: TopResults,
}

impl SummaryBuilder {
    pub(crate) fn new(top_n: usize) -> Self {
        Self {
            threshold_hits: 0,
            misses: 0,
            errored: 0,
            top: TopResults::new(top_n),
        }
    }

    pub(crate) fn record_scored(&mut self, index: usize, result: ProductivityResult) {
        match result.classification {
            Classification::Productive => self.threshold_hits += 1,
            Classification::NotProductive => self.misses += 1,
        }
        self.top.offer(index, result);
    }

    pub(crate) const fn record_error(&mut self) {
        self.errored += 1;
    }

    pub(crate) const fn processed(&self) -> usize {
        self.threshold_hits + self.misses + self.errored
    }

    pub(crate) fn finish(self, water_sources: WaterSourceStatus, cancelled: bool) -> AnalysisSummary {
        let total = self.processed();
        AnalysisSummary {
            total_analyzed: total,
            productive_count: self.threshold_hits,
            not_productive_count: self.misses,
            errored_count: self.errored,
            success_rate: ratio(self.threshold_hits, total),
            top_results: self.top.into_sorted(),
            water_sources,
            cancelled,
        }
    }
}

#[expect(
    clippy::float_arithmetic,
    clippy::cast_precision_loss,
    reason = "success rate is a display ratio of two counts"
)]
fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

#[cfg(test)]
#[expect(
    clippy::float_arithmetic,
    reason = "tests derive expected ratios and scores"
)]
mod tests {
    use super::*;
    use crate::ProductivityTier;
    use agrisite_core::Coordinate;
    use proptest::prelude::*;
    use rstest::rstest;

    fn result(score: f64) -> ProductivityResult {
        ProductivityResult {
            coordinate: Coordinate::new(38.0, 27.0).expect("valid coordinate"),
            score,
            classification: Classification::from_score(score, 50.0),
            tier: ProductivityTier::from_score(score),
            factors: Vec::new(),
            excluded: Vec::new(),
            nearest_water: None,
        }
    }

    fn position(index: usize) -> f64 {
        f64::from(u8::try_from(index).expect("small batch"))
    }

    /// Rank `scores`, returning `(input index, score)` pairs.
    fn top(scores: &[f64], capacity: usize) -> Vec<(f64, f64)> {
        let mut top = TopResults::new(capacity);
        for (index, score) in scores.iter().enumerate() {
            let mut scored = result(*score);
            // Encode the index in the longitude so ties can be told apart.
            scored.coordinate = Coordinate::new(0.0, position(index)).expect("valid coordinate");
            top.offer(index, scored);
        }
        top.into_sorted()
            .into_iter()
            .map(|r| (r.coordinate.lon(), r.score))
            .collect()
    }

    #[rstest]
    fn keeps_best_in_descending_order() {
        assert_eq!(
            top(&[10.0, 90.0, 40.0, 70.0], 2),
            vec![(1.0, 90.0), (3.0, 70.0)]
        );
    }

    #[rstest]
    fn ties_keep_input_order() {
        assert_eq!(
            top(&[100.0, 20.0, 100.0, 100.0], 2),
            vec![(0.0, 100.0), (2.0, 100.0)]
        );
    }

    #[rstest]
    fn zero_capacity_keeps_nothing() {
        assert!(top(&[1.0, 2.0], 0).is_empty());
    }

    #[rstest]
    fn counts_add_up() {
        let mut builder = SummaryBuilder::new(3);
        builder.record_scored(0, result(80.0));
        builder.record_scored(1, result(20.0));
        builder.record_error();
        let summary = builder.finish(WaterSourceStatus::default(), false);
        assert_eq!(summary.total_analyzed, 3);
        assert_eq!(summary.productive_count, 1);
        assert_eq!(summary.not_productive_count, 1);
        assert_eq!(summary.errored_count, 1);
        assert!((summary.success_rate - 1.0 / 3.0).abs() < 1.0e-12);
    }

    #[rstest]
    fn empty_batch_has_zero_success_rate() {
        let summary = SummaryBuilder::new(3).finish(WaterSourceStatus::default(), false);
        assert_eq!(summary.total_analyzed, 0);
        assert!(summary.success_rate.abs() < f64::EPSILON);
    }

    proptest! {
        #[test]
        fn matches_full_sort(
            scores in proptest::collection::vec(0_u8..=20, 0..60),
            capacity in 1_usize..8,
        ) {
            let values: Vec<f64> = scores.iter().map(|s| f64::from(*s) * 5.0).collect();
            let mut expected: Vec<(f64, f64)> = values
                .iter()
                .enumerate()
                .map(|(index, score)| (position(index), *score))
                .collect();
            expected.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.total_cmp(&b.0)));
            expected.truncate(capacity);
            prop_assert_eq!(top(&values, capacity), expected);
        }
    }
}
