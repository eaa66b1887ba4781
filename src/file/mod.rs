//! Sample abstraction and raw data access.
//!
//! This module provides the input layer of the triage pipeline. It abstracts
//! over different data sources (files on disk, memory buffers) and attaches
//! the initial format classification to each loaded sample.
//!
//! # Architecture
//!
//! - **Sample abstraction** - Unified interface for triage input
//! - **Backend system** - Pluggable data sources (disk files, memory buffers)
//! - **Format sniffing** - Magic-based classification at load time
//!
//! # Key Components
//!
//! ## Core Types
//! - [`crate::Sample`] - Main input abstraction carrying data and classification
//! - [`crate::file::Backend`] - Trait for different data sources
//!
//! ## Parsing Infrastructure
//! - [`crate::file::parser::Parser`] - Cursor-based reader for binary structures
//! - [`crate::file::io`] - Low-level endian-aware read utilities
//!
//! ## Backend Implementations
//! - [`crate::file::physical::Physical`] - Memory-mapped file backend for disk access
//! - [`crate::file::memory::Memory`] - In-memory buffer backend
//!
//! # Examples
//!
//! ## Loading from File
//!
//! ```rust,no_run
//! use pyscope::Sample;
//! use std::path::Path;
//!
//! let sample = Sample::from_file(Path::new("dropper.exe"))?;
//! println!("Loaded {} bytes, classified as {}", sample.len(), sample.kind());
//! # Ok::<(), pyscope::Error>(())
//! ```
//!
//! ## Loading from Memory
//!
//! ```rust
//! use pyscope::{Sample, SampleKind};
//!
//! let sample = Sample::from_mem(b"#!/usr/bin/env python3\nprint('x')\n".to_vec());
//! assert_eq!(sample.kind(), SampleKind::SourceText);
//! ```

pub(crate) mod io;
pub(crate) mod memory;
pub(crate) mod parser;
pub(crate) mod physical;

use std::path::Path;

use crate::{
    file::{memory::Memory, physical::Physical},
    format::{FormatSniffer, SampleKind},
    Result,
};

/// Trait abstracting over sample data sources.
///
/// Implementations provide bounds-checked access to raw bytes regardless of
/// whether the data lives in a memory-mapped file or an owned buffer.
pub trait Backend: Send + Sync {
    /// Returns a slice of the data at `offset` with length `len`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if `offset + len` exceeds the
    /// data length or overflows.
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]>;

    /// Returns the complete underlying data.
    fn data(&self) -> &[u8];

    /// Returns the total length of the data in bytes.
    fn len(&self) -> usize;

    /// Returns `true` if the data is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A loaded triage input with its format classification.
///
/// `Sample` owns the raw bytes of one suspicious input (through a pluggable
/// [`Backend`]) together with the [`SampleKind`] the format sniffer assigned
/// at load time. Classification never fails: inputs that match no known
/// signature, including empty ones, are [`SampleKind::Unknown`].
///
/// The optional display name is metadata only. It is carried for log and
/// report readability and has no influence on classification or analysis
/// results.
///
/// # Examples
///
/// ```rust
/// use pyscope::{Sample, SampleKind};
///
/// let sample = Sample::from_mem(vec![]);
/// assert_eq!(sample.kind(), SampleKind::Unknown);
/// assert!(sample.is_empty());
///
/// let sample = Sample::from_mem(b"MZ\x90\x00rest of an executable".to_vec());
/// assert_eq!(sample.kind(), SampleKind::Executable);
/// ```
pub struct Sample {
    /// The underlying data source
    data: Box<dyn Backend>,
    /// Optional display name, never used for classification
    name: Option<String>,
    /// Format classification assigned at load time
    kind: SampleKind,
}

impl Sample {
    /// Load a sample from a file on disk using memory-mapped I/O.
    ///
    /// # Arguments
    /// * `path` - Path to the sample on disk
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::FileError`] if the file cannot be opened or
    /// mapped.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use pyscope::Sample;
    /// use std::path::Path;
    ///
    /// let sample = Sample::from_file(Path::new("suspicious.exe"))?;
    /// println!("{} bytes", sample.len());
    /// # Ok::<(), pyscope::Error>(())
    /// ```
    pub fn from_file(path: &Path) -> Result<Sample> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned());

        Ok(Sample::load(Box::new(Physical::new(path)?), name))
    }

    /// Load a sample from a byte buffer already in memory.
    ///
    /// Never fails; empty buffers classify as [`SampleKind::Unknown`].
    #[must_use]
    pub fn from_mem(data: Vec<u8>) -> Sample {
        Sample::load(Box::new(Memory::new(data)), None)
    }

    /// Load a sample from a byte buffer with a display name attached.
    ///
    /// The name appears in traces and reports but does not affect analysis.
    #[must_use]
    pub fn from_mem_named(data: Vec<u8>, name: impl Into<String>) -> Sample {
        Sample::load(Box::new(Memory::new(data)), Some(name.into()))
    }

    fn load(data: Box<dyn Backend>, name: Option<String>) -> Sample {
        let kind = FormatSniffer::classify(data.data());
        Sample { data, name, kind }
    }

    /// Returns the format classification assigned at load time.
    #[must_use]
    pub fn kind(&self) -> SampleKind {
        self.kind
    }

    /// Returns the display name, if one was attached.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Returns the complete sample data.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.data.data()
    }

    /// Returns a slice of the sample data at `offset` with length `len`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the range exceeds the sample
    /// length.
    pub fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        self.data.data_slice(offset, len)
    }

    /// Returns the sample length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the sample holds no data.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl std::fmt::Debug for Sample {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sample")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("len", &self.len())
            .finish()
    }
}
