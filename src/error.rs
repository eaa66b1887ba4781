//! Error types and result handling for sample triage operations.
//!
//! This module provides a comprehensive error system for handling failures during
//! sample loading, archive parsing, artifact staging and endpoint recovery. All
//! errors implement standard traits for seamless integration with Rust error
//! handling patterns.
//!
//! # Error Categories
//!
//! - **Bounds**: [`crate::Error::OutOfBounds`] for reads past a buffer edge
//! - **Structure**: [`crate::Error::MalformedArchive`] for unparseable embedded archives
//! - **Entries**: [`crate::Error::EntryCorrupt`] for single archive entries that fail to materialize
//! - **Budgets**: [`crate::Error::ResourceExhausted`] for staging limits
//! - **Collaborators**: [`crate::Error::DecompilationUnavailable`] for a missing or stuck decompiler
//! - **IO**: [`crate::Error::FileError`] for filesystem access problems
//!
//! # Examples
//!
//! ```rust,no_run
//! use pyscope::{Sample, Error};
//!
//! match Sample::from_file(std::path::Path::new("sample.exe")) {
//!     Ok(sample) => println!("loaded {} bytes", sample.len()),
//!     Err(Error::FileError(io)) => eprintln!("cannot read file: {}", io),
//!     Err(e) => eprintln!("triage error: {}", e),
//! }
//! ```

use thiserror::Error;

/// Creates an [`crate::Error::OutOfBounds`] annotated with the current source location.
macro_rules! out_of_bounds_error {
    () => {
        crate::Error::OutOfBounds {
            file: file!(),
            line: line!(),
        }
    };
}

/// Creates an [`crate::Error::MalformedArchive`] with a formatted message and the
/// current source location.
macro_rules! malformed_error {
    // Single string version
    ($msg:expr) => {
        crate::Error::MalformedArchive {
            message: $msg.to_string(),
            file: file!(),
            line: line!(),
        }
    };

    // Format string with arguments version
    ($fmt:expr, $($arg:tt)*) => {
        crate::Error::MalformedArchive {
            message: format!($fmt, $($arg)*),
            file: file!(),
            line: line!(),
        }
    };
}

/// Errors produced while loading samples, walking embedded archives and
/// recovering endpoints.
///
/// Fatal errors are reserved for conditions where no meaningful extraction can
/// continue, such as an archive whose table of contents lies outside the file.
/// Recoverable conditions, like a single corrupt entry, surface as
/// [`Error::EntryCorrupt`] so callers can degrade them to report warnings
/// instead of aborting a run.
///
/// # Examples
///
/// ```rust
/// use pyscope::{CArchive, Error};
///
/// // A buffer too small to hold the trailer is structurally malformed.
/// match CArchive::parse(&[0u8; 4]) {
///     Err(Error::MalformedArchive { message, .. }) => {
///         assert!(message.contains("too small"));
///     }
///     _ => panic!("expected a malformed archive error"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// A read would cross the end of the underlying buffer.
    ///
    /// Raised by the low level [`crate::Parser`] and the sample backends when
    /// an offset plus length lands outside the mapped data. Carries the source
    /// location of the failed read to make truncated-input diagnostics
    /// actionable.
    #[error("Out of bounds access - {file}:{line}")]
    OutOfBounds {
        /// Source file where the out of bounds access happened
        file: &'static str,
        /// Line in the source file where the out of bounds access happened
        line: u32,
    },

    /// The trailing archive structure is invalid and extraction cannot start.
    ///
    /// Covers a mismatched archive magic, an overlay length that exceeds the
    /// file length, and a table of contents that overruns its declared region.
    #[error("Malformed archive - {file}:{line}: {message}")]
    MalformedArchive {
        /// Description of the structural violation
        message: String,
        /// Source file where the violation was detected
        file: &'static str,
        /// Line in the source file where the violation was detected
        line: u32,
    },

    /// A single archive entry could not be materialized.
    ///
    /// The rest of the archive remains readable; callers typically record this
    /// as a corruption warning and continue with the next entry.
    #[error("Corrupt archive entry '{name}': {message}")]
    EntryCorrupt {
        /// Name of the entry as declared in the table of contents
        name: String,
        /// Description of why the entry failed to materialize
        message: String,
    },

    /// A staging budget was exhausted.
    ///
    /// Returned when materializing another artifact would exceed the
    /// configured byte budget. Artifacts staged before the budget ran out
    /// stay valid.
    #[error("Resource exhausted ({what}, limit {limit})")]
    ResourceExhausted {
        /// Which budget ran out
        what: &'static str,
        /// The configured limit in bytes
        limit: u64,
    },

    /// The external bytecode decompiler is missing, crashed or timed out.
    ///
    /// Analysis continues without decompiled text; the pipeline downgrades
    /// this to an informational detection.
    #[error("Decompilation unavailable: {message}")]
    DecompilationUnavailable {
        /// Description of what went wrong with the collaborator
        message: String,
    },

    /// The operation is only defined for another sample kind.
    ///
    /// For example, opening an embedded archive on a sample that is not an
    /// executable.
    #[error("Operation not supported for this sample kind")]
    UnsupportedSampleKind,

    /// Error related to file system operations.
    #[error("{0}")]
    FileError(#[from] std::io::Error),
}
