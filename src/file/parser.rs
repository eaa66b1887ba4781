//! Low-level byte stream parser for archive structure decoding.
//!
//! This module provides the [`crate::file::parser::Parser`] type, a cursor-based
//! binary data parser designed for reading the packed archive trailer and table
//! of contents records. It offers bounds-checked access to binary data with
//! support for both little-endian and big-endian formats.
//!
//! # Architecture
//!
//! The parser is built around a simple cursor-based model that maintains a
//! position within a byte slice:
//!
//! - **Position tracking** - Maintains current offset for sequential parsing operations
//! - **Bounds checking** - All operations validate data availability before reading
//! - **Type-safe reading** - Strongly typed methods for the primitive widths the formats use
//!
//! # Key Components
//!
//! ## Navigation Methods
//! - [`crate::file::parser::Parser::seek`] - Move to specific position
//! - [`crate::file::parser::Parser::advance`] - Move forward by one byte
//! - [`crate::file::parser::Parser::advance_by`] - Move forward by specified bytes
//! - [`crate::file::parser::Parser::pos`] - Get current position
//!
//! ## Data Access Methods
//! - [`crate::file::parser::Parser::read_le`] - Read primitive types (little-endian)
//! - [`crate::file::parser::Parser::read_be`] - Read primitive types (big-endian)
//! - [`crate::file::parser::Parser::read_bytes`] - Read a counted byte run
//! - [`crate::file::parser::Parser::peek_byte`] - Peek at current byte without advancing
//! - [`crate::file::parser::Parser::data`] - Access remaining data slice
//!
//! # Usage Examples
//!
//! ## Basic Value Reading
//!
//! ```rust
//! use pyscope::Parser;
//!
//! let data = [0x01, 0x02, 0x03, 0x04];
//! let mut parser = Parser::new(&data);
//!
//! // Read little-endian values
//! let value = parser.read_le::<u16>()?;
//! assert_eq!(value, 0x0201);
//! # Ok::<(), pyscope::Error>(())
//! ```
//!
//! ## Sequential Parsing with Navigation
//!
//! ```rust
//! use pyscope::Parser;
//!
//! let data = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08];
//! let mut parser = Parser::new(&data);
//!
//! // Read sequentially
//! let first = parser.read_le::<u32>()?;
//! assert_eq!(first, 0x04030201);
//!
//! // Seek to specific position
//! parser.seek(6)?;
//! let last_bytes = parser.read_be::<u16>()?;
//! assert_eq!(last_bytes, 0x0708);
//! # Ok::<(), pyscope::Error>(())
//! ```

use crate::{
    file::io::{read_be_at, read_le_at, RawIO},
    Result,
};

/// A cursor-based binary data parser for archive structures.
///
/// `Parser` provides safe, bounds-checked access to binary data with support
/// for the little-endian and big-endian primitives that appear in the packed
/// archive trailer and table of contents. All read operations advance the
/// internal cursor; failed reads leave it untouched.
///
/// # Examples
///
/// ```rust
/// use pyscope::Parser;
///
/// // A table of contents record header: length, then a payload size
/// let data = [0x00, 0x00, 0x00, 0x1C, 0x00, 0x00, 0x01, 0x00];
/// let mut parser = Parser::new(&data);
///
/// let record_len = parser.read_be::<u32>()?;
/// let payload = parser.read_be::<u32>()?;
/// assert_eq!(record_len, 28);
/// assert_eq!(payload, 256);
/// # Ok::<(), pyscope::Error>(())
/// ```
pub struct Parser<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new `Parser` instance from a byte slice.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Parser<'a> {
        Parser { data, position: 0 }
    }

    /// Returns the total length of the underlying data.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the underlying data is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` if at least one more byte can be read.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Move the cursor to an absolute position.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if `pos` is past the end of the
    /// data.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(out_of_bounds_error!());
        }

        self.position = pos;
        Ok(())
    }

    /// Move the cursor forward by one byte.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the cursor is already at the
    /// end of the data.
    pub fn advance(&mut self) -> Result<()> {
        if self.position >= self.data.len() {
            return Err(out_of_bounds_error!());
        }

        self.position += 1;
        Ok(())
    }

    /// Move the cursor forward by `bytes` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `bytes` bytes
    /// remain.
    pub fn advance_by(&mut self, bytes: usize) -> Result<()> {
        let end = self
            .position
            .checked_add(bytes)
            .ok_or_else(|| out_of_bounds_error!())?;
        if end > self.data.len() {
            return Err(out_of_bounds_error!());
        }

        self.position = end;
        Ok(())
    }

    /// Returns the current cursor position.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// Returns the data from the current position to the end.
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        &self.data[self.position..]
    }

    /// Returns the byte at the current position without advancing.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if the cursor is at the end of
    /// the data.
    pub fn peek_byte(&self) -> Result<u8> {
        if self.position >= self.data.len() {
            return Err(out_of_bounds_error!());
        }

        Ok(self.data[self.position])
    }

    /// Read a value of type `T` in little-endian order and advance.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `size_of::<T>()`
    /// bytes remain.
    pub fn read_le<T: RawIO>(&mut self) -> Result<T> {
        read_le_at(self.data, &mut self.position)
    }

    /// Read a value of type `T` in big-endian order and advance.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `size_of::<T>()`
    /// bytes remain.
    pub fn read_be<T: RawIO>(&mut self) -> Result<T> {
        read_be_at(self.data, &mut self.position)
    }

    /// Read `len` bytes starting at the current position and advance.
    ///
    /// Used for counted fields such as entry names in the table of contents.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `len` bytes remain.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .position
            .checked_add(len)
            .ok_or_else(|| out_of_bounds_error!())?;
        if end > self.data.len() {
            return Err(out_of_bounds_error!());
        }

        let slice = &self.data[self.position..end];
        self.position = end;
        Ok(slice)
    }
}
