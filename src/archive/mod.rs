//! Parsing of the self-extracting archive appended to bundled droppers.
//!
//! Bundled loaders carry their payload as a trailing overlay: the last eight
//! bytes of the file are a four-byte magic followed by a big-endian overlay
//! length, and the overlay itself opens with a length-prefixed table of
//! contents whose records describe absolutely-addressed, individually
//! compressed entries. This module locates that trailer, validates the
//! structure and exposes the entries for extraction.
//!
//! Structural damage splits into two classes:
//!
//! - **Fatal** - a bad magic, an overlay that exceeds the file, or a table of
//!   contents that overruns its declared region make the whole archive
//!   unreadable and fail [`CArchive::parse`].
//! - **Local** - a single record pointing outside the file, or declaring an
//!   unknown compression codec, is skipped or degraded and surfaces through
//!   [`CArchive::warnings`] while every other entry stays readable.
//!
//! # Wire Layout
//!
//! ```text
//! +-------------------- payload --------------------+
//! | entry data at absolute offsets                  |
//! +------------------- overlay ---------------------+
//! | toc_len: u32 BE                                 |
//! | records: record_len u32 BE, uncompressed u32 BE,|
//! |          offset u32 BE, compressed u32 BE,      |
//! |          compression u8, type u8, name bytes    |
//! +-------------------- trailer --------------------+
//! | magic "PYZ\0" | overlay_len: u32 BE             |
//! +-------------------------------------------------+
//! ```
//!
//! # Examples
//!
//! ```rust
//! use pyscope::CArchive;
//!
//! // Smallest well-formed archive: empty payload, empty table of contents
//! let mut data = b"MZ".to_vec();
//! data.extend_from_slice(&0u32.to_be_bytes());      // TOC length
//! data.extend_from_slice(b"PYZ\0");                 // archive magic
//! data.extend_from_slice(&4u32.to_be_bytes());      // overlay length
//!
//! let archive = CArchive::parse(&data)?;
//! assert!(archive.entries().is_empty());
//! # Ok::<(), pyscope::Error>(())
//! ```

use std::io::Read;

use flate2::read::ZlibDecoder;

use crate::{
    file::parser::Parser,
    format::SampleKind,
    report::Detection,
    Error, Result, Sample,
};

/// Magic that closes every embedded archive, directly before the overlay
/// length.
pub const CARCHIVE_MAGIC: &[u8; 4] = b"PYZ\0";

/// Trailer size: magic plus the big-endian overlay length.
const TRAILER_LEN: usize = 8;

/// Fixed portion of a table of contents record, before the name bytes.
const TOC_RECORD_FIXED: usize = 18;

/// Compression applied to an entry's payload bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionKind {
    /// Payload bytes are used as-is
    Stored,
    /// Payload bytes are a zlib stream
    Deflated,
    /// Unrecognized flag; payload is read as stored and a warning is recorded
    Unknown,
}

impl From<u8> for CompressionKind {
    fn from(flag: u8) -> CompressionKind {
        match flag {
            0 => CompressionKind::Stored,
            1 => CompressionKind::Deflated,
            _ => CompressionKind::Unknown,
        }
    }
}

/// Role of an entry inside the bundle, from the record type flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Single interpreter module
    Module,
    /// Package entry
    Package,
    /// Reference to a sibling bundle
    Dependency,
    /// Everything else: scripts, resources, nested binaries
    Data,
}

impl From<u8> for EntryKind {
    fn from(flag: u8) -> EntryKind {
        match flag {
            b'm' => EntryKind::Module,
            b'M' => EntryKind::Package,
            b'd' => EntryKind::Dependency,
            _ => EntryKind::Data,
        }
    }
}

/// One record from the archive's table of contents.
///
/// Offsets are absolute file positions. A listed entry always has a payload
/// range inside the file; records that declare ranges past the end are
/// dropped at parse time with a warning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    name: String,
    uncompressed_size: u32,
    offset: u32,
    compressed_size: u32,
    compression: CompressionKind,
    kind: EntryKind,
}

impl TocEntry {
    /// Entry name, NUL-trimmed and lossily decoded from the record bytes.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared size of the entry after decompression.
    #[must_use]
    pub fn uncompressed_size(&self) -> u32 {
        self.uncompressed_size
    }

    /// Absolute file offset of the entry's payload bytes.
    #[must_use]
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Size of the entry's payload bytes as stored in the file.
    #[must_use]
    pub fn compressed_size(&self) -> u32 {
        self.compressed_size
    }

    /// Compression applied to the payload bytes.
    #[must_use]
    pub fn compression(&self) -> CompressionKind {
        self.compression
    }

    /// Role of the entry inside the bundle.
    #[must_use]
    pub fn kind(&self) -> EntryKind {
        self.kind
    }
}

/// A parsed embedded archive, borrowing the underlying sample data.
///
/// Parsing validates the trailer and walks the table of contents once;
/// payload bytes are only touched when [`CArchive::read_entry`] is called.
#[derive(Debug)]
pub struct CArchive<'a> {
    data: &'a [u8],
    toc_offset: usize,
    entries: Vec<TocEntry>,
    warnings: Vec<Detection>,
}

impl<'a> CArchive<'a> {
    /// Returns `true` if `data` ends in an archive trailer.
    ///
    /// A cheap probe for deciding whether archive semantics apply at all;
    /// a `true` result does not guarantee that [`CArchive::parse`] succeeds.
    #[must_use]
    pub fn has_trailer(data: &[u8]) -> bool {
        data.len() >= TRAILER_LEN + 4
            && &data[data.len() - TRAILER_LEN..data.len() - 4] == CARCHIVE_MAGIC
    }

    /// Parse the trailing archive structure of `data`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::MalformedArchive`] when the input is too small
    /// to hold a trailer, the magic mismatches, the overlay length exceeds
    /// the file length, or the declared table of contents overruns its
    /// region. Damage local to single records never fails the parse; it is
    /// recorded in [`CArchive::warnings`].
    pub fn parse(data: &'a [u8]) -> Result<CArchive<'a>> {
        if data.len() < TRAILER_LEN + 4 {
            return Err(malformed_error!(
                "{} bytes is too small for an embedded archive",
                data.len()
            ));
        }

        let magic_start = data.len() - TRAILER_LEN;
        let magic = &data[magic_start..magic_start + 4];
        if magic != CARCHIVE_MAGIC {
            return Err(malformed_error!("bad archive magic {:02x?}", magic));
        }

        let mut parser = Parser::new(data);
        parser.seek(magic_start + 4)?;
        let overlay_size = parser.read_be::<u32>()? as usize;

        let Some(toc_offset) = magic_start.checked_sub(overlay_size) else {
            return Err(malformed_error!(
                "overlay length {} exceeds file length {}",
                overlay_size,
                data.len()
            ));
        };
        if overlay_size < 4 {
            return Err(malformed_error!(
                "overlay of {} bytes cannot hold a table of contents",
                overlay_size
            ));
        }

        parser.seek(toc_offset)?;
        let toc_len = parser.read_be::<u32>()? as usize;
        let Some(toc_end) = toc_offset.checked_add(4).and_then(|p| p.checked_add(toc_len))
        else {
            return Err(malformed_error!("declared TOC length {} overflows", toc_len));
        };
        if toc_end > magic_start {
            return Err(malformed_error!(
                "declared TOC length {} overruns the {}-byte overlay",
                toc_len,
                overlay_size
            ));
        }

        let mut entries = Vec::new();
        let mut warnings = Vec::new();

        // Records run to the declared boundary; trailing bytes too short for
        // another record are tolerated as padding.
        while parser.pos() + TOC_RECORD_FIXED <= toc_end {
            let record_start = parser.pos();
            let record_len = parser.read_be::<u32>()? as usize;
            if record_len < TOC_RECORD_FIXED {
                break;
            }

            let record_end = record_start.saturating_add(record_len);
            if record_end > toc_end {
                warnings.push(Detection::warning(
                    "Truncated TOC Record",
                    format!(
                        "record at TOC offset {} declares {} bytes but only {} remain",
                        record_start - toc_offset,
                        record_len,
                        toc_end - record_start
                    ),
                ));
                break;
            }

            let uncompressed_size = parser.read_be::<u32>()?;
            let offset = parser.read_be::<u32>()?;
            let compressed_size = parser.read_be::<u32>()?;
            let compression_flag = parser.read_be::<u8>()?;
            let type_flag = parser.read_be::<u8>()?;
            let name_bytes = parser.read_bytes(record_len - TOC_RECORD_FIXED)?;
            let name = String::from_utf8_lossy(name_bytes)
                .trim_end_matches('\0')
                .to_string();

            let compression = CompressionKind::from(compression_flag);
            if compression == CompressionKind::Unknown {
                warnings.push(Detection::warning(
                    "Unknown Compression Flag",
                    format!(
                        "entry '{name}' declares compression flag {compression_flag}; reading payload as stored"
                    ),
                ));
            }

            if u64::from(offset) + u64::from(compressed_size) > data.len() as u64 {
                warnings.push(Detection::warning(
                    "Corrupt Archive Entry",
                    format!(
                        "entry '{}' declares bytes {}..{} outside the {}-byte file",
                        name,
                        offset,
                        u64::from(offset) + u64::from(compressed_size),
                        data.len()
                    ),
                ));
                parser.seek(record_end)?;
                continue;
            }

            entries.push(TocEntry {
                name,
                uncompressed_size,
                offset,
                compressed_size,
                compression,
                kind: EntryKind::from(type_flag),
            });
            parser.seek(record_end)?;
        }

        Ok(CArchive {
            data,
            toc_offset,
            entries,
            warnings,
        })
    }

    /// Open the embedded archive of an executable sample.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::UnsupportedSampleKind`] if the sample is not
    /// classified as an executable, or any error [`CArchive::parse`] can
    /// produce.
    pub fn from_sample(sample: &'a Sample) -> Result<CArchive<'a>> {
        if sample.kind() != SampleKind::Executable {
            return Err(Error::UnsupportedSampleKind);
        }

        CArchive::parse(sample.data())
    }

    /// The entries listed in the table of contents, in record order.
    ///
    /// Every listed entry has a payload range inside the file.
    #[must_use]
    pub fn entries(&self) -> &[TocEntry] {
        &self.entries
    }

    /// Warnings collected while parsing the table of contents.
    ///
    /// Covers skipped out-of-bounds records, truncated records and unknown
    /// compression flags.
    #[must_use]
    pub fn warnings(&self) -> &[Detection] {
        &self.warnings
    }

    /// Absolute file offset where the overlay begins.
    #[must_use]
    pub fn toc_offset(&self) -> usize {
        self.toc_offset
    }

    /// Materialize the payload of one entry, applying its declared
    /// decompression.
    ///
    /// The output is bounded by the declared uncompressed size: a zlib stream
    /// that inflates past its declaration is treated as corrupt rather than
    /// allowed to balloon.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::EntryCorrupt`] if the payload range is out of
    /// bounds, the zlib stream is damaged, or the stream inflates beyond the
    /// declared size.
    pub fn read_entry(&self, entry: &TocEntry) -> Result<Vec<u8>> {
        let start = entry.offset as usize;
        let raw = start
            .checked_add(entry.compressed_size as usize)
            .and_then(|end| self.data.get(start..end))
            .ok_or_else(|| Error::EntryCorrupt {
                name: entry.name.clone(),
                message: format!(
                    "payload range {}..+{} is outside the file",
                    entry.offset, entry.compressed_size
                ),
            })?;

        match entry.compression {
            CompressionKind::Deflated => {
                let limit = u64::from(entry.uncompressed_size);
                let mut decoder = ZlibDecoder::new(raw).take(limit + 1);
                let mut out = Vec::new();
                decoder
                    .read_to_end(&mut out)
                    .map_err(|error| Error::EntryCorrupt {
                        name: entry.name.clone(),
                        message: format!("zlib inflate failed: {error}"),
                    })?;

                if out.len() as u64 > limit {
                    return Err(Error::EntryCorrupt {
                        name: entry.name.clone(),
                        message: format!(
                            "zlib stream inflates past the declared {} bytes",
                            entry.uncompressed_size
                        ),
                    });
                }

                Ok(out)
            }
            CompressionKind::Stored | CompressionKind::Unknown => Ok(raw.to_vec()),
        }
    }
}
