//! Strategy registry and the primary/auxiliary selection rule.

use strum::IntoEnumIterator;
use tracing::{debug, trace};

use crate::deobfuscation::score::DeobfuscationScore;
use crate::deobfuscation::strategy::{Endpoint, Strategy};
use crate::extract::Artifact;

/// Minimum fingerprint score for a strategy to run.
pub const DEFAULT_THRESHOLD: usize = 50;

/// The endpoints one registry pass recovered.
///
/// One recovered endpoint settles a sample, so the pass ends at the first
/// strategy that finds anything. When that strategy surfaces several URLs
/// the first one becomes the primary recovery and the rest are kept as
/// auxiliary findings.
#[derive(Debug, Default)]
pub struct DeobfuscationOutcome {
    /// The winning strategy's recovery, if any strategy recovered anything.
    pub primary: Option<Recovery>,
    /// Further URLs the winning strategy surfaced, in discovery order.
    pub auxiliary: Vec<Endpoint>,
}

impl DeobfuscationOutcome {
    /// Iterate over every recovered endpoint, primary first.
    pub fn endpoints(&self) -> impl Iterator<Item = &Endpoint> {
        self.primary
            .iter()
            .map(|recovery| &recovery.endpoint)
            .chain(self.auxiliary.iter())
    }

    /// True when no strategy recovered anything.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.primary.is_none()
    }
}

/// A single strategy's successful recovery.
#[derive(Debug)]
pub struct Recovery {
    /// The strategy that won the pass.
    pub strategy: Strategy,
    /// The first endpoint it surfaced.
    pub endpoint: Endpoint,
    /// The fingerprint score that admitted it.
    pub score: DeobfuscationScore,
}

/// Runs the recovery strategies in fixed priority order.
///
/// Strategies are ordered from most fingerprint-specific to the generic
/// fallback. Each one whose fingerprint meets the threshold gets to run,
/// and the pass stops at the first strategy that recovers an endpoint.
///
/// # Examples
///
/// ```rust,no_run
/// use pyscope::deobfuscation::DeobfuscationRegistry;
///
/// let registry = DeobfuscationRegistry::new();
/// let outcome = registry.run(&[]);
/// assert!(outcome.is_empty());
/// ```
pub struct DeobfuscationRegistry {
    strategies: Vec<Strategy>,
    threshold: usize,
}

impl Default for DeobfuscationRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl DeobfuscationRegistry {
    /// Creates a registry with every strategy in priority order and the
    /// default threshold.
    #[must_use]
    pub fn new() -> Self {
        Self {
            strategies: Strategy::iter().collect(),
            threshold: DEFAULT_THRESHOLD,
        }
    }

    /// Sets the fingerprint threshold.
    pub fn set_threshold(&mut self, threshold: usize) {
        self.threshold = threshold;
    }

    /// Returns the current fingerprint threshold.
    #[must_use]
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Returns the registered strategies in evaluation order.
    #[must_use]
    pub fn strategies(&self) -> &[Strategy] {
        &self.strategies
    }

    /// Run the strategies over the staged artifacts, stopping at the first
    /// recovery.
    #[must_use]
    pub fn run(&self, artifacts: &[Artifact]) -> DeobfuscationOutcome {
        for &strategy in &self.strategies {
            let score = strategy.fingerprint(artifacts);
            if !score.meets_threshold(self.threshold) {
                trace!(
                    strategy = %strategy,
                    score = score.score(),
                    "fingerprint below threshold"
                );
                continue;
            }

            let mut endpoints = strategy.deobfuscate(artifacts);
            debug!(
                strategy = %strategy,
                score = score.score(),
                endpoints = endpoints.len(),
                "strategy evaluated"
            );
            if endpoints.is_empty() {
                continue;
            }

            // Already URL-deduplicated by the strategy pass
            let endpoint = endpoints.remove(0);
            return DeobfuscationOutcome {
                primary: Some(Recovery {
                    strategy,
                    endpoint,
                    score,
                }),
                auxiliary: endpoints,
            };
        }

        DeobfuscationOutcome::default()
    }
}
