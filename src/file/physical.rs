//! Physical file backend for memory-mapped I/O.
//!
//! This module provides the [`crate::file::physical::Physical`] backend that implements the
//! [`crate::file::Backend`] trait for accessing samples from disk using memory-mapped I/O.
//! This approach provides efficient access to large files without loading the entire content
//! into memory upfront, while still allowing fast random access to any part of the file.
//!
//! # Architecture
//!
//! The physical backend uses memory-mapped I/O to map files directly into the process's
//! virtual address space:
//!
//! - **Efficient memory usage** - Only requested portions are loaded into physical memory
//! - **Operating system optimization** - Leverages OS-level caching and paging
//! - **Lazy loading** - Pages are loaded on-demand as they are accessed
//!
//! Dropped samples can be large, and the archive trailer sits at the very end of
//! the file, so random access without an upfront copy matters here.
//!
//! # Usage Examples
//!
//! ```rust,ignore
//! use pyscope::file::{Physical, Backend};
//! use std::path::Path;
//!
//! let physical = Physical::new(Path::new("dropper.exe"))?;
//! println!("File size: {} bytes", physical.len());
//!
//! // Read the first 2 bytes (e.g., the DOS signature)
//! let header = physical.data_slice(0, 2)?;
//! assert_eq!(header, b"MZ");
//! # Ok::<(), pyscope::Error>(())
//! ```

use super::Backend;
use crate::{Error::FileError, Result};

use memmap2::Mmap;
use std::{fs, path::Path};

/// A sample backend that uses memory-mapped I/O for efficient access to files on disk.
///
/// [`crate::file::physical::Physical`] provides a way to access large samples by mapping
/// them directly into the process's virtual address space. This eliminates the need to
/// read the entire file into memory upfront and allows the operating system to manage
/// memory efficiently through demand paging.
///
/// The backend is well-suited for triage input, which is accessed in a
/// non-sequential pattern: the trailer at the end of the file first, then the
/// table of contents, then individual entry ranges. All access operations
/// include bounds checking to ensure memory safety.
#[derive(Debug)]
pub struct Physical {
    /// Memory-mapped file data
    data: Mmap,
}

impl Physical {
    /// Create a new physical backend by memory-mapping the specified file.
    ///
    /// The file is mapped as read-only and shared, allowing multiple processes
    /// to efficiently access the same file.
    ///
    /// # Arguments
    /// * `path` - Path to the sample on disk. Accepts `&Path`, `&str`, `String`, or `PathBuf`.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be opened or
    /// memory mapping fails.
    pub fn new(path: impl AsRef<Path>) -> Result<Physical> {
        let file = match fs::File::open(path) {
            Ok(file) => file,
            Err(error) => return Err(FileError(error)),
        };

        let mmap = match unsafe { Mmap::map(&file) } {
            Ok(mmap) => mmap,
            Err(error) => return Err(FileError(error)),
        };

        Ok(Physical { data: mmap })
    }

    /// Creates a new physical backend from an opened [`std::fs::File`].
    ///
    /// This is useful when a caller needs to open the file with specific
    /// permissions or flags before creating the backend.
    ///
    /// # Arguments
    /// * `file` - An opened file handle
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if memory mapping fails.
    #[allow(clippy::needless_pass_by_value)]
    pub fn from_std_file(file: fs::File) -> Result<Physical> {
        // Note: We take ownership of `file` even though we only borrow it for Mmap::map().
        // This is intentional - the file handle must remain alive for the duration of the mmap,
        // and Mmap internally keeps the file alive. Taking by value matches std library conventions.
        let mmap = unsafe { Mmap::map(&file) }.map_err(FileError)?;

        Ok(Physical { data: mmap })
    }
}

impl Backend for Physical {
    fn data_slice(&self, offset: usize, len: usize) -> Result<&[u8]> {
        let Some(offset_end) = offset.checked_add(len) else {
            return Err(out_of_bounds_error!());
        };

        if offset_end > self.data.len() {
            return Err(out_of_bounds_error!());
        }

        Ok(&self.data[offset..offset_end])
    }

    fn data(&self) -> &[u8] {
        self.data.as_ref()
    }

    fn len(&self) -> usize {
        self.data.len()
    }
}
