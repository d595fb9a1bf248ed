//! Batch analysis over many candidates.
//!
//! A run resolves water data once per region, builds a [`GeoIndex`] and then
//! scores candidates in input order. Per-candidate failures are counted and
//! logged, never propagated. With more than one worker the candidate slice
//! is split into contiguous chunks scored on scoped threads; outcomes are
//! reduced in input order so the summary matches a sequential run.
#![forbid(unsafe_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread;

use agrisite_core::{
    AnalysisConfig, CandidateInput, ConfigError, Coordinate, GeoIndex, MalformedCandidate,
    Region, SourceUnavailable, WaterSourceCatalogue,
};
use log::{info, warn};
use thiserror::Error;

use crate::summary::SummaryBuilder;
use crate::{
    AnalysisSummary, ProductivityResult, ProductivityScorer, ScoreError, WaterSourceStatus,
};

/// Shared flag requesting a batch to stop between candidates.
///
/// Clones observe the same flag, so one can be handed to a signal handler
/// while another is passed to [`BatchAnalysisRunner::run`].
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    /// Create a token that has not been cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Report whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Failures that abort a whole batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchError {
    /// Water data could not be obtained for the region.
    #[error(transparent)]
    SourceUnavailable(#[from] SourceUnavailable),
}

#[derive(Debug, Error)]
enum CandidateFailure {
    #[error(transparent)]
    Malformed(#[from] MalformedCandidate),
    #[error("candidate {index} at {coordinate} was rejected: {source}")]
    Rejected {
        index: usize,
        coordinate: Coordinate,
        #[source]
        source: ScoreError,
    },
}

type Outcome = Result<ProductivityResult, CandidateFailure>;

struct Progress {
    done: AtomicUsize,
    total: usize,
    interval: usize,
}

impl Progress {
    fn tick(&self) {
        let done = self.done.fetch_add(1, Ordering::Relaxed).saturating_add(1);
        if done.checked_rem(self.interval) == Some(0) {
            info!("analysed {done}/{} candidates", self.total);
        }
    }
}

/// Scores batches of candidates and summarises them.
#[derive(Debug)]
pub struct BatchAnalysisRunner {
    config: AnalysisConfig,
    scorer: ProductivityScorer,
}

impl BatchAnalysisRunner {
    /// Build a runner from validated configuration.
    ///
    /// # Errors
    /// Returns [`ConfigError`] when `config` fails validation.
    pub fn new(config: AnalysisConfig) -> Result<Self, ConfigError> {
        let valid = config.validate()?;
        Ok(Self {
            scorer: ProductivityScorer::new(valid.scoring)?,
            config: valid,
        })
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Scorer applied to each candidate.
    #[must_use]
    pub const fn scorer(&self) -> &ProductivityScorer {
        &self.scorer
    }

    /// Resolve water data for `region` and analyse `candidates`.
    ///
    /// The catalogue is consulted exactly once, before any candidate is
    /// scored.
    ///
    /// # Errors
    /// Returns [`BatchError::SourceUnavailable`] when the catalogue has
    /// neither fresh nor stale data; no candidate is processed in that case.
    pub fn run(
        &self,
        candidates: &[CandidateInput],
        region: &Region,
        catalogue: &dyn WaterSourceCatalogue,
        cancel: &CancellationToken,
    ) -> Result<AnalysisSummary, BatchError> {
        let snapshot = catalogue.water_sources(region)?;
        if snapshot.stale {
            warn!(
                "using stale water sources for region '{}' ({} sources)",
                region.key(),
                snapshot.sources.len()
            );
        }
        let index = GeoIndex::build(&snapshot.sources);
        if index.is_empty() {
            warn!(
                "no water sources for region '{}'; water proximity will be excluded",
                region.key()
            );
        }
        let status = WaterSourceStatus {
            count: index.len(),
            stale: snapshot.stale,
        };
        Ok(self.run_with_index(candidates, &index, status, cancel))
    }

    /// Analyse `candidates` against a prebuilt index.
    #[must_use]
    pub fn run_with_index(
        &self,
        candidates: &[CandidateInput],
        index: &GeoIndex,
        water_sources: WaterSourceStatus,
        cancel: &CancellationToken,
    ) -> AnalysisSummary {
        let limit = self
            .config
            .candidate_cap
            .map_or(candidates.len(), |cap| cap.min(candidates.len()));
        let batch = candidates.get(..limit).unwrap_or(candidates);
        info!(
            "analysing {} of {} candidates with {} worker(s)",
            batch.len(),
            candidates.len(),
            self.config.workers
        );
        let progress = Progress {
            done: AtomicUsize::new(0),
            total: batch.len(),
            interval: self.config.progress_interval,
        };

        let outcomes = if self.config.workers > 1 && batch.len() > 1 {
            self.score_parallel(batch, index, cancel, &progress)
        } else {
            self.score_chunk(0, batch, index, cancel, &progress)
        };

        let mut builder = SummaryBuilder::new(self.config.top_n);
        for (position, outcome) in outcomes {
            match outcome {
                Ok(result) => builder.record_scored(position, result),
                Err(err) => {
                    warn!("skipping candidate: {err}");
                    builder.record_error();
                }
            }
        }
        let cancelled = builder.processed() < batch.len();
        if cancelled {
            info!(
                "analysis cancelled after {} of {} candidates",
                builder.processed(),
                batch.len()
            );
        }
        let summary = builder.finish(water_sources, cancelled);
        info!(
            "analysis finished: {} analysed, {} productive, {} errored",
            summary.total_analyzed, summary.productive_count, summary.errored_count
        );
        summary
    }

    fn score_chunk(
        &self,
        offset: usize,
        chunk: &[CandidateInput],
        index: &GeoIndex,
        cancel: &CancellationToken,
        progress: &Progress,
    ) -> Vec<(usize, Outcome)> {
        let mut outcomes = Vec::with_capacity(chunk.len());
        for (position, input) in chunk.iter().enumerate() {
            if cancel.is_cancelled() {
                break;
            }
            let absolute = offset.saturating_add(position);
            outcomes.push((absolute, self.score_one(absolute, input, index)));
            progress.tick();
        }
        outcomes
    }

    fn score_parallel(
        &self,
        batch: &[CandidateInput],
        index: &GeoIndex,
        cancel: &CancellationToken,
        progress: &Progress,
    ) -> Vec<(usize, Outcome)> {
        let chunk_len = batch.len().div_ceil(self.config.workers).max(1);
        thread::scope(|scope| {
            let handles: Vec<_> = batch
                .chunks(chunk_len)
                .enumerate()
                .map(|(chunk_no, chunk)| {
                    let offset = chunk_no.saturating_mul(chunk_len);
                    scope.spawn(move || self.score_chunk(offset, chunk, index, cancel, progress))
                })
                .collect();
            // Joining in spawn order keeps outcomes sorted by input index.
            let mut outcomes = Vec::with_capacity(batch.len());
            for handle in handles {
                match handle.join() {
                    Ok(chunk_outcomes) => outcomes.extend(chunk_outcomes),
                    Err(payload) => std::panic::resume_unwind(payload),
                }
            }
            outcomes
        })
    }

    fn score_one(&self, position: usize, input: &CandidateInput, index: &GeoIndex) -> Outcome {
        let candidate = input.as_ref().map_err(|err| err.clone())?;
        self.scorer
            .score(candidate.coordinate, &candidate.attributes, Some(index))
            .map_err(|source| CandidateFailure::Rejected {
                index: position,
                coordinate: candidate.coordinate,
                source,
            })
    }
}
