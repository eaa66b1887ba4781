//! Report model: detections, indicator buckets and the final analysis result.
//!
//! Everything a triage run learns about a sample funnels into an
//! [`AnalysisReport`]: individual [`Detection`]s with a three-level
//! [`Severity`], recovered callback endpoints, deduplicated indicator buckets
//! and the 0-100 risk score. The report is plain serializable data so callers
//! can persist it, diff it between runs, or feed it to downstream tooling.
//!
//! Two properties of the model matter to consumers:
//!
//! - **Determinism** - bucket contents are sorted and capped, detections are
//!   ordered by severity, so identical inputs serialize identically.
//! - **Degradation over absence** - partial failures during a run surface as
//!   detections inside the report instead of replacing it.
//!
//! # Examples
//!
//! ```rust
//! use pyscope::{Detection, Severity};
//!
//! let detection = Detection::new(
//!     "Discord Webhook Found",
//!     "Found Discord webhook URL: https://discord.com/api/webhooks/1/x",
//!     Severity::Critical,
//! );
//! assert!(detection.severity > Severity::Warning);
//! ```

use md5::Md5;
use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use sha2::Sha256;

use crate::pipeline::PipelineState;

/// Hard cap on entries per indicator bucket in a finished report.
///
/// Keeps reports bounded on adversarial inputs that embed thousands of
/// distinct URLs or addresses. Buckets are sorted before the cap is applied,
/// so truncation is deterministic.
pub const MAX_BUCKET_ENTRIES: usize = 100;

/// Severity of a single detection.
///
/// Ordered so that comparisons follow triage priority:
/// `Info < Warning < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Contextual finding, worth a note but not alarming on its own
    Info,
    /// Suspicious trait that warrants attention
    Warning,
    /// Strong indicator of malicious behavior
    Critical,
}

impl Severity {
    /// Score contribution of one detection at this severity.
    #[must_use]
    pub fn weight(&self) -> u32 {
        match self {
            Severity::Info => 5,
            Severity::Warning => 15,
            Severity::Critical => 30,
        }
    }
}

/// A single analysis finding.
///
/// Titles come from a fixed catalog (for example `Discord Webhook Found`,
/// `Suspicious Imports Found`) so downstream consumers can match on them;
/// descriptions carry the per-sample specifics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Detection {
    /// Short, stable finding title
    pub title: String,
    /// Human-readable specifics for this sample
    pub description: String,
    /// Triage priority of this finding
    pub severity: Severity,
}

impl Detection {
    /// Create a detection with an explicit severity.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        severity: Severity,
    ) -> Detection {
        Detection {
            title: title.into(),
            description: description.into(),
            severity,
        }
    }

    /// Create an informational detection.
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Detection {
        Detection::new(title, description, Severity::Info)
    }

    /// Create a warning detection.
    pub fn warning(title: impl Into<String>, description: impl Into<String>) -> Detection {
        Detection::new(title, description, Severity::Warning)
    }

    /// Create a critical detection.
    pub fn critical(title: impl Into<String>, description: impl Into<String>) -> Detection {
        Detection::new(title, description, Severity::Critical)
    }
}

/// Cryptographic digests of the whole sample, for correlation with external
/// intelligence feeds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleHashes {
    /// MD5 digest, lowercase hex
    pub md5: String,
    /// SHA-1 digest, lowercase hex
    pub sha1: String,
    /// SHA-256 digest, lowercase hex
    pub sha256: String,
}

impl SampleHashes {
    /// Compute all three digests over `data`.
    #[must_use]
    pub fn compute(data: &[u8]) -> SampleHashes {
        SampleHashes {
            md5: format!("{:x}", Md5::digest(data)),
            sha1: format!("{:x}", Sha1::digest(data)),
            sha256: format!("{:x}", Sha256::digest(data)),
        }
    }
}

/// Deduplicated, sorted and capped indicator buckets.
///
/// Webhook endpoints live outside these buckets, in
/// [`AnalysisReport::endpoints`], because they contribute to the risk score
/// differently than ordinary network indicators.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IocBuckets {
    /// Plain URLs observed in sample or artifact bytes
    pub urls: Vec<String>,
    /// Dotted-quad addresses observed in sample or artifact bytes
    pub ips: Vec<String>,
    /// Digests of the whole input sample
    pub hashes: SampleHashes,
}

/// The complete result of one analysis run.
///
/// Serializes with stable field and bucket ordering; analyzing the same bytes
/// twice produces byte-identical JSON.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// All findings, ordered critical first
    pub detections: Vec<Detection>,
    /// Recovered callback endpoints, sorted and capped
    pub endpoints: Vec<String>,
    /// Indicator buckets
    pub iocs: IocBuckets,
    /// Aggregate risk score, clamped to 0-100
    pub score: u32,
    /// Terminal pipeline state; [`PipelineState::Failed`] marks a degraded report
    pub state: PipelineState,
}

impl AnalysisReport {
    /// Serialize the report as compact JSON.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`serde_json::Error`] if serialization fails.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// Serialize the report as human-readable JSON.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`serde_json::Error`] if serialization fails.
    pub fn to_json_pretty(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Iterate over detections of at least `severity`.
    pub fn detections_at_least(&self, severity: Severity) -> impl Iterator<Item = &Detection> {
        self.detections.iter().filter(move |d| d.severity >= severity)
    }
}

/// Sort, deduplicate and cap an indicator bucket.
///
/// Applied to every bucket at report assembly so output ordering never
/// depends on scan scheduling.
#[must_use]
pub(crate) fn finalize_bucket(mut items: Vec<String>) -> Vec<String> {
    items.sort();
    items.dedup();
    items.truncate(MAX_BUCKET_ENTRIES);
    items
}

/// Stable-sort detections by descending severity.
///
/// Stability keeps the discovery order within one severity class, which makes
/// reports diffable across runs.
pub(crate) fn sort_detections(detections: &mut [Detection]) {
    detections.sort_by_key(|d| std::cmp::Reverse(d.severity));
}
