//! Fingerprint scoring and evidence types for strategy selection.
//!
//! Each recovery strategy scores how well the staged artifact set matches
//! the payload shape it knows how to unwrap, and records what contributed
//! to that score for reporting.

use std::cmp::Ordering;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

/// Confidence score for a strategy fingerprint.
///
/// Scores are on a 0-100+ scale; a strategy runs when its score meets the
/// registry threshold. Evidence accumulation is thread-safe so fingerprints
/// can be computed from parallel scan workers.
pub struct DeobfuscationScore {
    /// Primary score (0-100+, higher = better match).
    score: AtomicUsize,
    /// Evidence that contributed to this score.
    evidence: boxcar::Vec<ScoreEvidence>,
}

impl DeobfuscationScore {
    /// Creates a new empty score with zero confidence and no evidence.
    #[must_use]
    pub fn new() -> Self {
        Self {
            score: AtomicUsize::new(0),
            evidence: boxcar::Vec::new(),
        }
    }

    /// Creates a score with an initial value but no evidence.
    #[must_use]
    pub fn with_score(score: usize) -> Self {
        Self {
            score: AtomicUsize::new(score),
            evidence: boxcar::Vec::new(),
        }
    }

    /// Returns the total confidence score.
    #[must_use]
    pub fn score(&self) -> usize {
        self.score.load(AtomicOrdering::Relaxed)
    }

    /// Returns an iterator over all evidence that contributed to this score.
    pub fn evidence(&self) -> impl Iterator<Item = &ScoreEvidence> {
        (0..self.evidence.count()).filter_map(|i| self.evidence.get(i))
    }

    /// Adds evidence and increases the score by the evidence's confidence
    /// value.
    pub fn add(&self, evidence: ScoreEvidence) {
        self.score
            .fetch_add(evidence.confidence(), AtomicOrdering::Relaxed);
        self.evidence.push(evidence);
    }

    /// Checks if the score meets or exceeds a threshold.
    #[must_use]
    pub fn meets_threshold(&self, threshold: usize) -> bool {
        self.score() >= threshold
    }

    /// Merges another score into this one, adding its value and appending
    /// all its evidence.
    pub fn merge(&self, other: &DeobfuscationScore) {
        self.score.fetch_add(other.score(), AtomicOrdering::Relaxed);
        for i in 0..other.evidence.count() {
            if let Some(ev) = other.evidence.get(i) {
                self.evidence.push(ev.clone());
            }
        }
    }

    /// Generates a summary string of all evidence.
    ///
    /// # Returns
    ///
    /// A comma-separated string of short evidence descriptions, or
    /// "no evidence" if none has been recorded.
    #[must_use]
    pub fn evidence_summary(&self) -> String {
        if self.evidence.count() == 0 {
            return "no evidence".to_string();
        }

        self.evidence()
            .map(ScoreEvidence::short_description)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Default for DeobfuscationScore {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for DeobfuscationScore {
    fn clone(&self) -> Self {
        let cloned = Self::with_score(self.score());
        for i in 0..self.evidence.count() {
            if let Some(ev) = self.evidence.get(i) {
                cloned.evidence.push(ev.clone());
            }
        }
        cloned
    }
}

impl fmt::Debug for DeobfuscationScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeobfuscationScore")
            .field("score", &self.score())
            .field("evidence_count", &self.evidence.count())
            .finish()
    }
}

impl PartialEq for DeobfuscationScore {
    fn eq(&self, other: &Self) -> bool {
        self.score() == other.score()
    }
}

impl Eq for DeobfuscationScore {}

impl PartialOrd for DeobfuscationScore {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DeobfuscationScore {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score().cmp(&other.score())
    }
}

impl fmt::Display for DeobfuscationScore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "score={} ({})", self.score(), self.evidence_summary())
    }
}

/// Evidence that contributed to a strategy fingerprint.
#[derive(Debug, Clone)]
pub enum ScoreEvidence {
    /// Entry names matching a file pattern the strategy targets.
    NamePattern {
        /// Pattern description (e.g. "*.class").
        pattern: String,
        /// Number of matching entries.
        match_count: usize,
        /// Confidence contribution, already capped by the strategy.
        confidence: usize,
    },

    /// An artifact carrying encoded runs the strategy can unwrap.
    EncodedPayload {
        /// Artifact name.
        artifact: String,
        /// Number of encoded runs found in it.
        run_count: usize,
        /// Confidence contribution.
        confidence: usize,
    },

    /// A bundle entry point the strategy keys on.
    EntryPoint {
        /// Artifact name.
        name: String,
        /// Confidence contribution.
        confidence: usize,
    },

    /// Unconditional applicability of the fallback sweep.
    Fallback {
        /// Confidence contribution.
        confidence: usize,
    },
}

impl ScoreEvidence {
    /// Returns the confidence contribution of this evidence.
    #[must_use]
    pub fn confidence(&self) -> usize {
        match self {
            Self::NamePattern { confidence, .. }
            | Self::EncodedPayload { confidence, .. }
            | Self::EntryPoint { confidence, .. }
            | Self::Fallback { confidence } => *confidence,
        }
    }

    /// Generates a short description suitable for summaries.
    ///
    /// # Returns
    ///
    /// A compact string describing this evidence (e.g. "names:*.class x3").
    #[must_use]
    pub fn short_description(&self) -> String {
        match self {
            Self::NamePattern {
                pattern,
                match_count,
                ..
            } => format!("names:{pattern} x{match_count}"),
            Self::EncodedPayload {
                artifact,
                run_count,
                ..
            } => format!("encoded:{artifact} x{run_count}"),
            Self::EntryPoint { name, .. } => format!("entry:{name}"),
            Self::Fallback { .. } => "fallback".to_string(),
        }
    }
}
