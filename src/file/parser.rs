//! Cursor-based big-endian byte stream parser for class file attributes.
//!
//! This module provides the [`crate::file::parser::Parser`] type, a bounds-checked cursor over a
//! byte slice. The attribute tables in [`crate::classfile`] decode themselves through it.
//!
//! # Key Components
//!
//! - [`crate::file::parser::Parser::seek`] - Move to a specific position
//! - [`crate::file::parser::Parser::advance_by`] - Move forward by a number of bytes
//! - [`crate::file::parser::Parser::read_be`] - Read primitive types (big-endian)
//! - [`crate::file::parser::Parser::read_bytes`] - Borrow a run of raw bytes
//!
//! # Usage Examples
//!
//! ```rust
//! use classscope::Parser;
//!
//! let data = [0x00, 0x02, 0xCA, 0xFE, 0xBA, 0xBE];
//! let mut parser = Parser::new(&data);
//!
//! let count = parser.read_be::<u16>()?;
//! assert_eq!(count, 2);
//! assert_eq!(parser.read_be::<u32>()?, 0xCAFE_BABE);
//! assert!(!parser.has_more_data());
//! # Ok::<(), classscope::Error>(())
//! ```

use crate::{
    file::io::{read_be_at, ClassIO},
    Error::OutOfBounds,
    Result,
};

/// A bounds-checked reading cursor over a borrowed byte slice.
///
/// All reads advance the cursor on success and leave it untouched on failure.
pub struct Parser<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Parser<'a> {
    /// Create a new parser positioned at the start of `data`.
    #[must_use]
    pub fn new(data: &'a [u8]) -> Self {
        Parser { data, position: 0 }
    }

    /// Total length of the underlying buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the underlying buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` if unread bytes remain.
    #[must_use]
    pub fn has_more_data(&self) -> bool {
        self.position < self.data.len()
    }

    /// Number of unread bytes.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Move the cursor to an absolute position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `pos` lies past the end of the buffer.
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(OutOfBounds);
        }

        self.position = pos;
        Ok(())
    }

    /// Move the cursor forward by `step` bytes.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `step` bytes remain.
    pub fn advance_by(&mut self, step: usize) -> Result<()> {
        if step > self.remaining() {
            return Err(OutOfBounds);
        }

        self.position += step;
        Ok(())
    }

    /// Current cursor position.
    #[must_use]
    pub fn pos(&self) -> usize {
        self.position
    }

    /// The complete underlying buffer.
    #[must_use]
    pub fn data(&self) -> &'a [u8] {
        self.data
    }

    /// Read a big-endian primitive and advance past it.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the buffer is too short.
    pub fn read_be<T: ClassIO>(&mut self) -> Result<T> {
        read_be_at::<T>(self.data, &mut self.position)
    }

    /// Borrow the next `len` bytes and advance past them.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if fewer than `len` bytes remain.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(OutOfBounds);
        }

        let bytes = &self.data[self.position..self.position + len];
        self.position += len;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_sequential_reads() {
        let data = [0x00, 0x01, 0x00, 0x00, 0x00, 0x02, 0x7F];
        let mut parser = Parser::new(&data);

        assert_eq!(parser.read_be::<u16>().unwrap(), 1);
        assert_eq!(parser.read_be::<u32>().unwrap(), 2);
        assert_eq!(parser.read_be::<u8>().unwrap(), 0x7F);
        assert!(!parser.has_more_data());
        assert_eq!(parser.remaining(), 0);
    }

    #[test]
    fn test_parser_failed_read_keeps_position() {
        let data = [0x00, 0x01, 0x02];
        let mut parser = Parser::new(&data);
        parser.advance_by(2).unwrap();

        assert!(matches!(parser.read_be::<u16>(), Err(OutOfBounds)));
        assert_eq!(parser.pos(), 2);
    }

    #[test]
    fn test_parser_seek_and_bytes() {
        let data = [0x10, 0x20, 0x30, 0x40];
        let mut parser = Parser::new(&data);

        parser.seek(1).unwrap();
        assert_eq!(parser.read_bytes(2).unwrap(), &[0x20, 0x30]);
        assert!(parser.read_bytes(2).is_err());
        assert!(parser.seek(5).is_err());
        parser.seek(4).unwrap();
        assert!(!parser.has_more_data());
    }

    #[test]
    fn test_parser_empty() {
        let parser = Parser::new(&[]);
        assert!(parser.is_empty());
        assert_eq!(parser.len(), 0);
    }
}
