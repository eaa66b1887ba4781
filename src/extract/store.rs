//! Budgeted staging for extracted artifacts.
//!
//! Every byte an extraction run materializes is charged against a fixed
//! budget before it is produced, which bounds memory and disk use on
//! archive-bomb style inputs. The store also owns a temporary directory for
//! artifacts that must exist on disk, such as bytecode handed to the external
//! decompiler; staged files are removed when their guard drops and the whole
//! directory is removed with the store.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use tempfile::TempDir;

use crate::{Error, Result};

/// Longest file extension preserved when staging to disk.
const MAX_EXTENSION_LEN: usize = 16;

/// Byte-budgeted staging area for extraction output.
///
/// Thread-safe: reservations use atomic accounting so parallel scanners can
/// stage concurrently. The budget is cumulative over a run; artifacts all
/// stay live until scanning finishes, so peak and cumulative use coincide.
#[derive(Debug)]
pub struct ArtifactStore {
    root: TempDir,
    capacity: u64,
    used: AtomicU64,
    sequence: AtomicUsize,
}

impl ArtifactStore {
    /// Create a store with `capacity` bytes of staging budget.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::FileError`] if the temporary directory cannot
    /// be created.
    pub fn new(capacity: u64) -> Result<ArtifactStore> {
        Ok(ArtifactStore {
            root: tempfile::tempdir()?,
            capacity,
            used: AtomicU64::new(0),
            sequence: AtomicUsize::new(0),
        })
    }

    /// Reserve `bytes` against the staging budget.
    ///
    /// Must be called before materializing artifact data. Reservations are
    /// first-come-first-served; a failed reservation leaves the budget
    /// untouched so smaller later entries may still fit.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::ResourceExhausted`] when the reservation would
    /// exceed the capacity.
    pub fn reserve(&self, bytes: u64) -> Result<()> {
        let result = self
            .used
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |used| {
                used.checked_add(bytes).filter(|total| *total <= self.capacity)
            });

        match result {
            Ok(_) => Ok(()),
            Err(_) => Err(Error::ResourceExhausted {
                what: "staging bytes",
                limit: self.capacity,
            }),
        }
    }

    /// Write `bytes` to a fresh file in the staging directory.
    ///
    /// The returned guard removes the file when dropped. Only the extension
    /// of `name_hint` is preserved, sanitized to alphanumerics; collaborators
    /// like the decompiler key their behavior on it.
    ///
    /// The bytes are expected to be budgeted already via
    /// [`ArtifactStore::reserve`]; staging itself charges nothing.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::FileError`] if the file cannot be written.
    pub fn stage(&self, name_hint: &str, bytes: &[u8]) -> Result<StagedArtifact<'_>> {
        let index = self.sequence.fetch_add(1, Ordering::SeqCst);
        let file_name = match sanitized_extension(name_hint) {
            Some(ext) => format!("artifact-{index:04}.{ext}"),
            None => format!("artifact-{index:04}"),
        };

        let path = self.root.path().join(file_name);
        std::fs::write(&path, bytes)?;

        Ok(StagedArtifact { path, _store: self })
    }

    /// Bytes reserved so far.
    #[must_use]
    pub fn used(&self) -> u64 {
        self.used.load(Ordering::SeqCst)
    }

    /// Total staging budget in bytes.
    #[must_use]
    pub fn capacity(&self) -> u64 {
        self.capacity
    }
}

/// A file staged on disk, removed again when this guard drops.
#[derive(Debug)]
pub struct StagedArtifact<'a> {
    path: PathBuf,
    _store: &'a ArtifactStore,
}

impl StagedArtifact<'_> {
    /// Path of the staged file, valid until this guard drops.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StagedArtifact<'_> {
    fn drop(&mut self) {
        // The store's directory cleanup catches anything this misses
        let _ = std::fs::remove_file(&self.path);
    }
}

/// Extract and sanitize a file extension from an entry name.
fn sanitized_extension(name_hint: &str) -> Option<String> {
    let ext = Path::new(name_hint).extension()?.to_string_lossy();
    let cleaned: String = ext
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(MAX_EXTENSION_LEN)
        .collect();

    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned)
    }
}
