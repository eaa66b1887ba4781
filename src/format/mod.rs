//! Format classification for triage inputs.
//!
//! This module decides, from leading bytes alone, which analysis paths apply
//! to a sample: native executables get PE surface analysis and an embedded
//! archive probe, compiled bytecode gets decompilation, and source text gets
//! the full keyword scan. Classification is intentionally cheap and total;
//! anything unrecognized falls through to [`SampleKind::Unknown`] and still
//! receives the generic byte-level scan.
//!
//! # Key Components
//!
//! - [`SampleKind`] - The four-way classification attached to every sample and artifact
//! - [`FormatSniffer`] - Magic-based classifier over leading bytes
//! - [`pe`] - Surface analysis of native executables
//!
//! # Examples
//!
//! ```rust
//! use pyscope::{FormatSniffer, SampleKind};
//!
//! assert_eq!(FormatSniffer::classify(b"MZ\x90\x00"), SampleKind::Executable);
//! assert_eq!(FormatSniffer::classify(b"#!/usr/bin/python3\n"), SampleKind::SourceText);
//! assert_eq!(FormatSniffer::classify(b"random bytes"), SampleKind::Unknown);
//! assert_eq!(FormatSniffer::classify(&[]), SampleKind::Unknown);
//! ```

pub(crate) mod pe;

use strum::{EnumCount, EnumIter};

/// DOS signature that opens every native Windows executable.
pub const DOS_SIGNATURE: &[u8; 2] = b"MZ";

/// Known compiled bytecode magics, paired with the interpreter release that
/// emits them. The magic occupies the first four bytes of a `.pyc` file; the
/// trailing `\r\n` guards against text-mode transfer corruption.
const BYTECODE_MAGICS: &[([u8; 4], &str)] = &[
    ([0x03, 0xF3, 0x0D, 0x0A], "2.7"),
    ([0xEE, 0x0C, 0x0D, 0x0A], "3.4"),
    ([0x17, 0x0D, 0x0D, 0x0A], "3.5"),
    ([0x33, 0x0D, 0x0D, 0x0A], "3.6"),
    ([0x42, 0x0D, 0x0D, 0x0A], "3.7"),
    ([0x55, 0x0D, 0x0D, 0x0A], "3.8"),
    ([0x61, 0x0D, 0x0D, 0x0A], "3.9"),
    ([0x6F, 0x0D, 0x0D, 0x0A], "3.10"),
    ([0xA7, 0x0D, 0x0D, 0x0A], "3.11"),
    ([0xCB, 0x0D, 0x0D, 0x0A], "3.12"),
];

/// How many leading bytes the source-text probe will inspect for a first line.
const FIRST_LINE_PROBE: usize = 256;

/// Classification of a sample or extracted artifact.
///
/// Assigned once at load time from content alone; file names and extensions
/// are never consulted, so renaming an input cannot change how it is
/// analyzed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumCount, EnumIter)]
pub enum SampleKind {
    /// Native executable, recognized by the DOS `MZ` signature
    Executable,
    /// Compiled interpreter bytecode, recognized by a known magic
    CompiledBytecode,
    /// Interpreter source text, recognized by a `python` marker in the first line
    SourceText,
    /// Anything else, including empty input
    Unknown,
}

impl SampleKind {
    /// Stable lowercase name for traces and summaries.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            SampleKind::Executable => "executable",
            SampleKind::CompiledBytecode => "compiled-bytecode",
            SampleKind::SourceText => "source-text",
            SampleKind::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for SampleKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Magic-based classifier over the leading bytes of an input.
///
/// Checks run in a fixed order: executable signature, bytecode magic table,
/// then the bounded first-line probe for source text. The first match wins,
/// so an executable whose body happens to contain the word `python` still
/// classifies as [`SampleKind::Executable`].
pub struct FormatSniffer;

impl FormatSniffer {
    /// Classify `data` by its leading bytes.
    ///
    /// Total over all inputs: empty and unrecognized data yield
    /// [`SampleKind::Unknown`].
    #[must_use]
    pub fn classify(data: &[u8]) -> SampleKind {
        if data.len() >= DOS_SIGNATURE.len() && &data[..DOS_SIGNATURE.len()] == DOS_SIGNATURE {
            return SampleKind::Executable;
        }

        if FormatSniffer::bytecode_version(data).is_some() {
            return SampleKind::CompiledBytecode;
        }

        if let Some(line) = FormatSniffer::first_line(data) {
            if line.to_ascii_lowercase().contains("python") {
                return SampleKind::SourceText;
            }
        }

        SampleKind::Unknown
    }

    /// Returns the interpreter release a bytecode magic belongs to, if the
    /// data starts with a known magic.
    #[must_use]
    pub fn bytecode_version(data: &[u8]) -> Option<&'static str> {
        if data.len() < 4 {
            return None;
        }

        BYTECODE_MAGICS
            .iter()
            .find(|(magic, _)| &data[..4] == magic)
            .map(|(_, version)| *version)
    }

    /// Extracts the first line of `data` as UTF-8, probing at most
    /// [`FIRST_LINE_PROBE`] bytes. Returns `None` when the probe window is
    /// not valid UTF-8, which rules binary data out of the source-text path.
    fn first_line(data: &[u8]) -> Option<&str> {
        let window = &data[..data.len().min(FIRST_LINE_PROBE)];
        let line = match window.iter().position(|&b| b == b'\n') {
            Some(newline) => &window[..newline],
            None => window,
        };

        std::str::from_utf8(line).ok().map(str::trim_end)
    }
}
