//! # pyscope Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the pyscope library. Import this module to get quick access to the essential
//! types for bundled-dropper triage.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all pyscope operations
pub use crate::Error;

/// The result type used throughout pyscope
pub use crate::Result;

// ================================================================================================
// Main Entry Points
// ================================================================================================

/// Main input abstraction carrying sample data and classification
pub use crate::Sample;

/// End-to-end triage conductor
pub use crate::AnalysisPipeline;

/// Pipeline tuning knobs and limits
pub use crate::pipeline::{
    AnalysisConfig, PipelineState, DEFAULT_MAX_ARTIFACTS, DEFAULT_MAX_DEPTH,
    DEFAULT_STAGING_BUDGET,
};

// ================================================================================================
// Format Classification
// ================================================================================================

/// Magic-based input classification
pub use crate::format::{FormatSniffer, SampleKind, DOS_SIGNATURE};

// ================================================================================================
// Embedded Archives
// ================================================================================================

/// Trailing-TOC archive parsing
pub use crate::archive::{CArchive, CompressionKind, EntryKind, TocEntry, CARCHIVE_MAGIC};

// ================================================================================================
// Artifact Extraction and Staging
// ================================================================================================

/// Materialized archive payloads with provenance
pub use crate::extract::{Artifact, ArtifactStore, ExtractionOutcome, StagedArtifact};

// ================================================================================================
// Indicator Scanning
// ================================================================================================

/// Per-artifact indicator extraction
pub use crate::ioc::{ArtifactScan, IocScanner};

// ================================================================================================
// Endpoint Recovery
// ================================================================================================

/// Layered deobfuscation strategies and their outcomes
pub use crate::deobfuscation::{
    DeobfuscationOutcome, DeobfuscationRegistry, DeobfuscationScore, Endpoint, Recovery,
    ScoreEvidence, Strategy, DEFAULT_THRESHOLD,
};

// ================================================================================================
// Bytecode Decompilation
// ================================================================================================

/// External decompiler collaborator
pub use crate::decompiler::{Decompiler, DEFAULT_PROGRAM, DEFAULT_TIMEOUT, RETRY_TIMEOUT};

// ================================================================================================
// Reports and Scoring
// ================================================================================================

/// Report structure and detection severities
pub use crate::report::{
    AnalysisReport, Detection, IocBuckets, SampleHashes, Severity, MAX_BUCKET_ENTRIES,
};

/// Aggregate risk scoring
pub use crate::score::{risk_score, ENDPOINT_WEIGHT, MAX_SCORE};

// ================================================================================================
// Low-Level Parsing Utilities
// ================================================================================================

/// Cursor-based reader for binary structures
pub use crate::Parser;
