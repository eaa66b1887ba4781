// Copyright 2025 pyscope Contributors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
#![allow(dead_code)]
//#![deny(unsafe_code)]
// - 'file/physical.rs' uses mmap to map a file into memory

//! # pyscope
//!
//! [![Crates.io](https://img.shields.io/crates/v/pyscope.svg)](https://crates.io/crates/pyscope)
//! [![Documentation](https://docs.rs/pyscope/badge.svg)](https://docs.rs/pyscope)
//! [![License](https://img.shields.io/badge/license-Apache--2.0-blue.svg)](https://github.com/pyscope/pyscope/blob/main/LICENSE)
//!
//! A cross-platform triage engine for Python-based droppers bundled into Windows
//! executables. Built in pure Rust, `pyscope` classifies suspicious inputs, walks
//! the self-extracting archive appended to bundled loaders, scans every embedded
//! artifact for indicators of compromise and recovers exfiltration endpoints that
//! the dropper tried to hide, without executing a single byte of the sample.
//!
//! ## Features
//!
//! - **📦 Efficient memory access** - Memory-mapped file access with minimal allocations and reference-based parsing
//! - **🔍 Archive excavation** - Parse the trailing table of contents of bundled loaders, including nested bundles
//! - **⚡ Parallel artifact scanning** - Content-addressed scans fan out across a thread pool and are cached across runs
//! - **🕵️ Endpoint recovery** - Layered deobfuscation strategies pull webhook URLs out of encoded and compressed payloads
//! - **🛡️ Crash-proof triage** - Malware inputs are hostile by definition; everything below the archive trailer degrades to report warnings
//! - **📊 Scored reports** - Severity-ranked detections, deduplicated indicator buckets and a clamped aggregate risk score
//! - **🧩 Extensible architecture** - Modular design for custom scanners and recovery strategies
//!
//! ## Quick Start
//!
//! Add `pyscope` to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! pyscope = "0.1"
//! ```
//!
//! ### Using the Prelude
//!
//! For convenient access to the most commonly used types, import the prelude:
//!
//! ```rust,no_run
//! use pyscope::prelude::*;
//!
//! // Load and triage a suspicious executable
//! let sample = Sample::from_file("dropper.exe".as_ref())?;
//! let report = AnalysisPipeline::default().run(&sample);
//! println!("risk score: {}", report.score);
//! # Ok::<(), pyscope::Error>(())
//! ```
//!
//! ### Basic Usage
//!
//! ```rust,no_run
//! use pyscope::{AnalysisPipeline, Sample};
//! use std::path::Path;
//!
//! // Load and classify a sample
//! let sample = Sample::from_file(Path::new("dropper.exe"))?;
//! println!("classified as {}", sample.kind());
//!
//! // Run the full pipeline; analysis never fails, it degrades
//! let pipeline = AnalysisPipeline::default();
//! let report = pipeline.run(&sample);
//!
//! for detection in &report.detections {
//!     println!(
//!         "[{:?}] {}: {}",
//!         detection.severity, detection.title, detection.description
//!     );
//! }
//! for endpoint in &report.endpoints {
//!     println!("exfiltration endpoint: {endpoint}");
//! }
//! println!("{}", report.to_json_pretty()?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! `pyscope` is organized into several key modules:
//!
//! - [`prelude`] - Convenient re-exports of commonly used types and traits
//! - [`format`] - Magic-based classification of raw inputs
//! - [`archive`] - Trailing table-of-contents parsing for bundled loaders
//! - [`extract`] - Artifact staging with provenance tracking and byte budgets
//! - [`ioc`] - Indicator scanning against curated pattern tables
//! - [`deobfuscation`] - Layered endpoint recovery strategies
//! - [`decompiler`] - Supervision of an external bytecode decompiler
//! - [`pipeline`] - The conductor that ties every stage together
//! - [`report`] - Severity-ranked detections and serializable reports
//! - [`Error`] and [`Result`] - Comprehensive error handling
//!
//! ### The Triage Pipeline
//!
//! A run moves through fixed, observable stages. The sample is classified at
//! load time; if it is an executable carrying an archive trailer, every entry
//! is staged to disk and nested bundles are expanded up to a configured depth.
//! Each artifact is then scanned for indicators: webhook URLs, credential
//! store paths, registry persistence keys, stealer vocabulary and obfuscation
//! markers. Compiled bytecode can be handed to an external decompiler so the
//! recovered source gets the stricter text-only checks. Finally the recovery
//! strategies inspect the artifact tree for endpoints hidden behind base64 and
//! zlib layers, and everything is folded into a scored report.
//!
//! Scans are content-addressed: a pipeline kept alive across many samples
//! recognizes artifacts it has already seen and reuses their results.
//!
//! ## Error Handling
//!
//! All fallible operations return [`Result<T, Error>`](Result) with detailed
//! error information. The pipeline itself never fails; parse-level errors are
//! degraded into report detections instead:
//!
//! ```rust,no_run
//! use pyscope::{CArchive, Error, Sample};
//!
//! let sample = Sample::from_file(std::path::Path::new("dropper.exe"))?;
//! match CArchive::parse(sample.data()) {
//!     Ok(archive) => println!("{} embedded entries", archive.entries().len()),
//!     Err(Error::MalformedArchive { message, .. }) => println!("malformed: {message}"),
//!     Err(e) => println!("other error: {e}"),
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Development and Testing
//!
//! The crate includes fuzzing support for the parsing surface:
//!
//! ### Fuzzing
//!
//! ```bash
//! # Install fuzzing tools
//! cargo install cargo-fuzz
//!
//! # Fuzz the archive parser
//! cargo +nightly fuzz run carchive --release
//!
//! # Fuzz the whole pipeline
//! cargo +nightly fuzz run pipeline --release
//! ```
//!
//! ### Testing
//!
//! The test suite builds synthetic bundles byte-for-byte, including
//! deliberately damaged ones:
//!
//! ```bash
//! cargo test
//! cargo test --release  # For performance tests
//! ```

#[macro_use]
pub(crate) mod error;
pub(crate) mod file;

/// Shared functionality which is used in unit- and integration-tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// This module provides a curated selection of the most frequently used types
/// from across the pyscope library, allowing for convenient glob imports.
///
/// # Example
///
/// ```rust,no_run
/// use pyscope::prelude::*;
///
/// // Now you have access to the most common types
/// let sample = Sample::from_file("dropper.exe".as_ref())?;
/// let report = AnalysisPipeline::default().run(&sample);
/// # Ok::<(), pyscope::Error>(())
/// ```
pub mod prelude;

/// Magic-based classification of raw triage inputs.
///
/// Inspects leading bytes to sort inputs into executables, compiled Python
/// bytecode, Python source text or unknown data. Classification is total and
/// never fails; see [`format::FormatSniffer`] and [`format::SampleKind`].
pub mod format;

/// Trailing table-of-contents archive parsing for bundled loaders.
///
/// Bundled droppers append a self-extracting archive to the loader
/// executable. This module locates the trailer, validates the table of
/// contents and exposes entry metadata and payloads:
///
/// - [`archive::CArchive`] - A parsed view over the embedded archive
/// - [`archive::TocEntry`] - One table-of-contents record
/// - [`archive::CompressionKind`] / [`archive::EntryKind`] - Declared entry attributes
///
/// Only structural damage is fatal. Inconsistent records degrade to
/// warnings that the pipeline carries into the final report.
pub mod archive;

/// Artifact staging, byte budgets and recursive bundle extraction.
///
/// Materializes archive payloads into a temporary staging area while
/// enforcing a global byte budget, and tracks where in the bundle tree
/// each artifact came from; see [`extract::Artifact`] and
/// [`extract::ArtifactStore`].
pub mod extract;

/// Indicator scanning against curated pattern tables.
///
/// Runs every staged artifact through webhook, URL, credential-path,
/// registry-key and vocabulary checks; see [`ioc::IocScanner`] for the entry
/// point and [`ioc::ArtifactScan`] for the per-artifact result.
pub mod ioc;

/// Layered endpoint recovery for obfuscated payloads.
///
/// Fixed-priority strategies fingerprint the artifact tree and peel back
/// base64 and zlib layers to recover hidden exfiltration endpoints:
///
/// - [`deobfuscation::DeobfuscationRegistry`] - Runs strategies in priority order
/// - [`deobfuscation::Strategy`] - The individual recovery approaches
/// - [`deobfuscation::DeobfuscationScore`] - Evidence-backed fingerprint confidence
pub mod deobfuscation;

/// Supervision of an external bytecode decompiler.
///
/// Runs the configured decompiler with timeouts and a retry, and marks it
/// unavailable after repeated failures so later runs skip it cheaply; see
/// [`decompiler::Decompiler`].
pub mod decompiler;

/// The conductor that ties every triage stage together.
///
/// [`pipeline::AnalysisPipeline`] drives classification, extraction,
/// scanning, decompilation and endpoint recovery, and folds the results
/// into one [`report::AnalysisReport`]. Runs are infallible and move
/// through the observable states of [`pipeline::PipelineState`];
/// [`pipeline::AnalysisConfig`] holds the tuning knobs.
pub mod pipeline;

/// Severity-ranked detections and serializable triage reports.
///
/// - [`report::Detection`] - One finding with a [`report::Severity`]
/// - [`report::AnalysisReport`] - The complete result of a pipeline run
/// - [`report::SampleHashes`] / [`report::IocBuckets`] - Identity and indicator buckets
pub mod report;

/// Aggregate risk scoring over detections and recovered endpoints.
pub mod score;

/// `pyscope` Result type
///
/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
/// This is used consistently throughout the crate for all fallible operations.
///
/// # Examples
///
/// ```rust,no_run
/// use pyscope::{Result, Sample};
///
/// fn load_sample(path: &str) -> Result<Sample> {
///     Sample::from_file(std::path::Path::new(path))
/// }
/// ```
pub type Result<T> = std::result::Result<T, Error>;

/// `pyscope` Error type
///
/// The main error type for all operations in this crate. Provides detailed error
/// information for sample loading, archive parsing, artifact staging and
/// decompiler supervision.
///
/// # Examples
///
/// ```rust,no_run
/// use pyscope::{Error, Sample};
///
/// match Sample::from_file(std::path::Path::new("dropper.exe")) {
///     Ok(sample) => println!("loaded {} bytes", sample.len()),
///     Err(Error::FileError(io)) => println!("cannot read file: {io}"),
///     Err(e) => println!("error: {e}"),
/// }
/// ```
pub use error::Error;

/// Main entry point for loading triage inputs.
///
/// See [`Sample`] for loading samples from disk or memory and reading their
/// classification.
///
/// # Example
///
/// ```rust,no_run
/// use pyscope::Sample;
/// let sample = Sample::from_file(std::path::Path::new("dropper.exe"))?;
/// println!("{} bytes, classified as {}", sample.len(), sample.kind());
/// # Ok::<(), pyscope::Error>(())
/// ```
pub use file::{parser::Parser, Sample};

/// Magic-based input classification.
///
/// [`FormatSniffer`] assigns a [`SampleKind`] to raw bytes; classification is
/// total and empty or unrecognized inputs are [`SampleKind::Unknown`].
pub use format::{FormatSniffer, SampleKind};

/// A parsed view over the archive a bundled loader carries as trailing data.
pub use archive::CArchive;

/// Per-artifact indicator scanning.
pub use ioc::IocScanner;

/// End-to-end triage: the pipeline conductor and its observable run states.
///
/// # Example
///
/// ```rust,no_run
/// use pyscope::{AnalysisPipeline, PipelineState, Sample};
///
/// let sample = Sample::from_file(std::path::Path::new("dropper.exe"))?;
/// let report = AnalysisPipeline::default().run(&sample);
/// assert_ne!(report.state, PipelineState::Failed);
/// # Ok::<(), pyscope::Error>(())
/// ```
pub use pipeline::{AnalysisPipeline, PipelineState};

/// Report structure: detections, severities and the assembled result.
pub use report::{AnalysisReport, Detection, Severity};

/// Aggregate risk scoring over a finished detection set.
pub use score::risk_score;
