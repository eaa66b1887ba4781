//! Additive risk scoring over detections and recovered endpoints.
//!
//! The score is a single 0-100 number meant for sorting a triage queue, not a
//! verdict. Weights are fixed: 30 per critical detection, 15 per warning,
//! 5 per informational, plus 20 for every recovered callback endpoint. The
//! sum saturates at 100 so heavily flagged samples all pin to the top rather
//! than overflowing.
//!
//! # Examples
//!
//! ```rust
//! use pyscope::{risk_score, Detection};
//!
//! let detections = vec![
//!     Detection::critical("Discord Webhook Found", "..."),
//!     Detection::warning("Suspicious Constant Found: webhook", "..."),
//! ];
//! // 30 + 15 + one endpoint at 20
//! assert_eq!(risk_score(&detections, 1), 65);
//! ```

use crate::report::Detection;

/// Score contribution of each recovered callback endpoint.
pub const ENDPOINT_WEIGHT: u32 = 20;

/// Ceiling for the aggregate score.
pub const MAX_SCORE: u32 = 100;

/// Compute the aggregate risk score for a set of detections and a count of
/// recovered endpoints.
///
/// Pure and total: no detection set can overflow or exceed [`MAX_SCORE`], and
/// an empty run scores zero.
#[must_use]
pub fn risk_score(detections: &[Detection], endpoint_count: usize) -> u32 {
    let detection_score = detections
        .iter()
        .fold(0u32, |acc, d| acc.saturating_add(d.severity.weight()));

    let endpoint_score =
        ENDPOINT_WEIGHT.saturating_mul(u32::try_from(endpoint_count).unwrap_or(u32::MAX));

    detection_score.saturating_add(endpoint_score).min(MAX_SCORE)
}
