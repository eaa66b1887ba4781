//! Low-level byte order and safe reading utilities for archive and header parsing.
//!
//! This module provides endian-aware binary data reading for the packed archive
//! trailer and table of contents. It implements safe, bounds-checked operations
//! for reading primitive types from byte buffers with both little-endian and
//! big-endian support, preventing buffer overruns during binary analysis.
//!
//! # Architecture
//!
//! The module is built around the [`crate::file::io::RawIO`] trait which provides
//! a unified interface for reading binary data in a type-safe manner:
//!
//! - Generic trait-based reading for the primitive types the formats need
//! - Automatic bounds checking to prevent buffer overruns
//! - Consistent error handling through the [`crate::Result`] type
//!
//! # Key Components
//!
//! - [`crate::file::io::RawIO`] - Trait defining endian-aware conversion for primitive types
//! - [`crate::file::io::read_le`] / [`crate::file::io::read_be`] - Read values from a buffer start
//! - [`crate::file::io::read_le_at`] / [`crate::file::io::read_be_at`] - Read values at an offset with auto-advance
//!
//! # Usage Examples
//!
//! ```rust,ignore
//! use pyscope::file::io::{read_be, read_be_at};
//!
//! // The archive trailer stores lengths big-endian.
//! let data = [0x00, 0x00, 0x01, 0x00];
//! let value: u32 = read_be(&data)?;
//! assert_eq!(value, 256);
//!
//! let mut offset = 0;
//! let first: u16 = read_be_at(&data, &mut offset)?;  // offset: 0 -> 2
//! let second: u16 = read_be_at(&data, &mut offset)?; // offset: 2 -> 4
//! assert_eq!((first, second), (0, 256));
//! # Ok::<(), pyscope::Error>(())
//! ```

use crate::Result;

/// A trait for types that can be read from byte buffers in an endian-aware manner.
///
/// Implemented for the unsigned and signed integer widths the archive formats
/// use. The associated [`RawIO::Bytes`] type ties each integer to its
/// fixed-size array representation so conversions stay infallible once bounds
/// are checked.
pub trait RawIO: Sized {
    /// The byte array type used for conversion (e.g., `[u8; 4]` for `u32`)
    type Bytes: Sized + for<'a> TryFrom<&'a [u8]>;

    /// Convert from little-endian bytes to the native type
    fn from_le_bytes(bytes: Self::Bytes) -> Self;
    /// Convert from big-endian bytes to the native type
    fn from_be_bytes(bytes: Self::Bytes) -> Self;
}

macro_rules! impl_raw_io {
    ($($t:ty),*) => {
        $(
            impl RawIO for $t {
                type Bytes = [u8; std::mem::size_of::<$t>()];

                fn from_le_bytes(bytes: Self::Bytes) -> Self {
                    <$t>::from_le_bytes(bytes)
                }

                fn from_be_bytes(bytes: Self::Bytes) -> Self {
                    <$t>::from_be_bytes(bytes)
                }
            }
        )*
    };
}

impl_raw_io!(u8, u16, u32, u64, i8, i16, i32, i64);

/// Reads a value of type `T` from the start of the byte slice in little-endian order.
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] if the buffer is smaller than the
/// size of `T`.
pub fn read_le<T: RawIO>(data: &[u8]) -> Result<T> {
    let size = std::mem::size_of::<T>();
    if data.len() < size {
        return Err(out_of_bounds_error!());
    }

    match T::Bytes::try_from(&data[0..size]) {
        Ok(bytes) => Ok(T::from_le_bytes(bytes)),
        Err(_) => Err(out_of_bounds_error!()),
    }
}

/// Reads a value of type `T` from the byte slice at `offset` in little-endian
/// order, advancing `offset` past the value on success.
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] if fewer than `size_of::<T>()` bytes
/// remain at `offset`.
pub fn read_le_at<T: RawIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let size = std::mem::size_of::<T>();
    let end = offset
        .checked_add(size)
        .ok_or_else(|| out_of_bounds_error!())?;
    if end > data.len() {
        return Err(out_of_bounds_error!());
    }

    match T::Bytes::try_from(&data[*offset..end]) {
        Ok(bytes) => {
            *offset = end;
            Ok(T::from_le_bytes(bytes))
        }
        Err(_) => Err(out_of_bounds_error!()),
    }
}

/// Reads a value of type `T` from the start of the byte slice in big-endian order.
///
/// The archive trailer and table of contents store their lengths big-endian,
/// so this is the workhorse for [`crate::CArchive`] parsing.
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] if the buffer is smaller than the
/// size of `T`.
pub fn read_be<T: RawIO>(data: &[u8]) -> Result<T> {
    let size = std::mem::size_of::<T>();
    if data.len() < size {
        return Err(out_of_bounds_error!());
    }

    match T::Bytes::try_from(&data[0..size]) {
        Ok(bytes) => Ok(T::from_be_bytes(bytes)),
        Err(_) => Err(out_of_bounds_error!()),
    }
}

/// Reads a value of type `T` from the byte slice at `offset` in big-endian
/// order, advancing `offset` past the value on success.
///
/// # Errors
///
/// Returns [`crate::Error::OutOfBounds`] if fewer than `size_of::<T>()` bytes
/// remain at `offset`.
pub fn read_be_at<T: RawIO>(data: &[u8], offset: &mut usize) -> Result<T> {
    let size = std::mem::size_of::<T>();
    let end = offset
        .checked_add(size)
        .ok_or_else(|| out_of_bounds_error!())?;
    if end > data.len() {
        return Err(out_of_bounds_error!());
    }

    match T::Bytes::try_from(&data[*offset..end]) {
        Ok(bytes) => {
            *offset = end;
            Ok(T::from_be_bytes(bytes))
        }
        Err(_) => Err(out_of_bounds_error!()),
    }
}
