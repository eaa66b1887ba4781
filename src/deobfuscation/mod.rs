//! Recovery of hidden exfiltration endpoints.
//!
//! Commodity grabber kits rarely leave their webhook in plain sight: the
//! endpoint gets base64-encoded into resource pools, deflate-compressed
//! inside compiled bytecode, or tucked into string constants of the bundle
//! entry script. This module recovers those endpoints without executing
//! anything.
//!
//! # Architecture
//!
//! - [`Strategy`] - one unwrapping scheme each, in fixed priority order
//! - [`DeobfuscationScore`] / [`ScoreEvidence`] - fingerprint confidence
//!   with an evidence trail
//! - [`DeobfuscationRegistry`] - threshold gating and primary/auxiliary
//!   selection
//!
//! Strategies run in priority order, gated by their fingerprint score, and
//! the pass stops at the first one to recover an endpoint. That endpoint is
//! the primary recovery; any further URLs the same strategy surfaced are
//! kept as auxiliary findings. The generic fallback always fingerprints
//! above threshold, so a recoverable endpoint is never silently skipped.
//!
//! # Examples
//!
//! ```rust,no_run
//! use pyscope::deobfuscation::DeobfuscationRegistry;
//! use pyscope::extract::Artifact;
//!
//! let artifacts = vec![Artifact::new(
//!     "settings.py",
//!     b"WEBHOOK_URL = 'https://discord.com/api/webhooks/1/t'".to_vec(),
//!     Vec::new(),
//! )];
//!
//! let outcome = DeobfuscationRegistry::new().run(&artifacts);
//! if let Some(recovery) = &outcome.primary {
//!     println!("recovered via {}", recovery.strategy);
//! }
//! ```

mod decode;
mod registry;
mod score;
mod strategy;

pub use registry::{DeobfuscationOutcome, DeobfuscationRegistry, Recovery, DEFAULT_THRESHOLD};
pub use score::{DeobfuscationScore, ScoreEvidence};
pub use strategy::{Endpoint, Strategy};
