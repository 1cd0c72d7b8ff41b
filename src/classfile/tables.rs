//! Code attribute tables: line numbers, local variables and exception handlers.
//!
//! Each table is stored as a big-endian `u16` entry count followed by fixed-size entries.
//! Tables decode through [`crate::Parser`] and encode back into a caller-provided buffer.
//!
//! # Examples
//!
//! ```rust
//! use classscope::{classfile::ExceptionTable, Parser};
//!
//! let raw = [0x00, 0x01, 0x00, 0x00, 0x00, 0x08, 0x00, 0x0B, 0x00, 0x03];
//! let table = ExceptionTable::read(&mut Parser::new(&raw))?;
//! assert_eq!(table.entries()[0].handler_pc, 11);
//! assert_eq!(table.to_bytes()?, raw);
//! # Ok::<(), classscope::Error>(())
//! ```

use crate::{
    file::{io::write_be_at, parser::Parser},
    Result,
};

/// Maps a bytecode offset to a source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineNumber {
    /// First bytecode offset of the line
    pub start_pc: u16,
    /// Source line number
    pub line: u16,
}

/// Describes the range over which a local variable slot holds a named value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocalVariable {
    /// First bytecode offset at which the variable is live
    pub start_pc: u16,
    /// Length of the live range in bytes
    pub length: u16,
    /// Constant pool index of the variable name
    pub name_index: u16,
    /// Constant pool index of the variable descriptor
    pub type_index: u16,
    /// Local variable slot
    pub index: u16,
}

/// One exception handler: a protected range `[start_pc, end_pc)` and its handler offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Catch {
    /// First protected offset
    pub start_pc: u16,
    /// First offset past the protected range
    pub end_pc: u16,
    /// Offset of the handler code
    pub handler_pc: u16,
    /// Constant pool index of the caught class, 0 for catch-all
    pub catch_type: u16,
}

impl Catch {
    /// Returns `true` if the handler catches every throwable.
    #[must_use]
    pub fn is_catch_all(&self) -> bool {
        self.catch_type == 0
    }

    /// Returns `true` if `pc` lies inside the protected range.
    #[must_use]
    pub fn protects(&self, pc: u32) -> bool {
        u32::from(self.start_pc) <= pc && pc < u32::from(self.end_pc)
    }
}

/// The `LineNumberTable` attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineNumberTable(Vec<LineNumber>);

/// The `LocalVariableTable` attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocalVariableTable(Vec<LocalVariable>);

/// The exception table of a `Code` attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExceptionTable(Vec<Catch>);

impl LineNumberTable {
    /// Create a table from entries.
    #[must_use]
    pub fn new(entries: Vec<LineNumber>) -> Self {
        LineNumberTable(entries)
    }

    /// Decode the table at the parser's position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the input is truncated.
    pub fn read(parser: &mut Parser) -> Result<Self> {
        let count = parser.read_be::<u16>()?;
        let mut entries = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            entries.push(LineNumber {
                start_pc: parser.read_be()?,
                line: parser.read_be()?,
            });
        }
        Ok(LineNumberTable(entries))
    }

    /// Encode the table into `data` at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `data` is too small.
    pub fn write_to(&self, data: &mut [u8], offset: &mut usize) -> Result<()> {
        write_be_at(data, offset, entry_count(self.0.len())?)?;
        for entry in &self.0 {
            write_be_at(data, offset, entry.start_pc)?;
            write_be_at(data, offset, entry.line)?;
        }
        Ok(())
    }

    /// Source line for the instruction at `pc`: the entry with the greatest start not
    /// exceeding it.
    #[must_use]
    pub fn line_at(&self, pc: u16) -> Option<u16> {
        self.0
            .iter()
            .filter(|entry| entry.start_pc <= pc)
            .max_by_key(|entry| entry.start_pc)
            .map(|entry| entry.line)
    }

    /// The decoded entries.
    #[must_use]
    pub fn entries(&self) -> &[LineNumber] {
        &self.0
    }

    /// Encoded size in bytes.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        2 + self.0.len() * 4
    }

    /// Encode into a freshly allocated buffer.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the table has more than `u16::MAX` entries.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut data = vec![0u8; self.byte_len()];
        self.write_to(&mut data, &mut 0)?;
        Ok(data)
    }
}

impl LocalVariableTable {
    /// Create a table from entries.
    #[must_use]
    pub fn new(entries: Vec<LocalVariable>) -> Self {
        LocalVariableTable(entries)
    }

    /// Decode the table at the parser's position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the input is truncated.
    pub fn read(parser: &mut Parser) -> Result<Self> {
        let count = parser.read_be::<u16>()?;
        let mut entries = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            entries.push(LocalVariable {
                start_pc: parser.read_be()?,
                length: parser.read_be()?,
                name_index: parser.read_be()?,
                type_index: parser.read_be()?,
                index: parser.read_be()?,
            });
        }
        Ok(LocalVariableTable(entries))
    }

    /// Encode the table into `data` at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `data` is too small.
    pub fn write_to(&self, data: &mut [u8], offset: &mut usize) -> Result<()> {
        write_be_at(data, offset, entry_count(self.0.len())?)?;
        for entry in &self.0 {
            write_be_at(data, offset, entry.start_pc)?;
            write_be_at(data, offset, entry.length)?;
            write_be_at(data, offset, entry.name_index)?;
            write_be_at(data, offset, entry.type_index)?;
            write_be_at(data, offset, entry.index)?;
        }
        Ok(())
    }

    /// Entries describing slot `index` whose live range covers `pc`.
    pub fn live_at(&self, index: u16, pc: u16) -> impl Iterator<Item = &LocalVariable> {
        self.0.iter().filter(move |entry| {
            entry.index == index
                && entry.start_pc <= pc
                && u32::from(pc) < u32::from(entry.start_pc) + u32::from(entry.length)
        })
    }

    /// The decoded entries.
    #[must_use]
    pub fn entries(&self) -> &[LocalVariable] {
        &self.0
    }

    /// Encoded size in bytes.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        2 + self.0.len() * 10
    }

    /// Encode into a freshly allocated buffer.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the table has more than `u16::MAX` entries.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut data = vec![0u8; self.byte_len()];
        self.write_to(&mut data, &mut 0)?;
        Ok(data)
    }
}

impl ExceptionTable {
    /// Create a table from entries.
    #[must_use]
    pub fn new(entries: Vec<Catch>) -> Self {
        ExceptionTable(entries)
    }

    /// Decode the table at the parser's position.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if the input is truncated, or
    /// [`crate::Error::Malformed`] for an empty or inverted protected range.
    pub fn read(parser: &mut Parser) -> Result<Self> {
        let count = parser.read_be::<u16>()?;
        let mut entries = Vec::with_capacity(usize::from(count));
        for _ in 0..count {
            let entry = Catch {
                start_pc: parser.read_be()?,
                end_pc: parser.read_be()?,
                handler_pc: parser.read_be()?,
                catch_type: parser.read_be()?,
            };
            if entry.end_pc <= entry.start_pc {
                return Err(malformed_error!(
                    "Exception range [{}, {}) is empty",
                    entry.start_pc,
                    entry.end_pc
                ));
            }
            entries.push(entry);
        }
        Ok(ExceptionTable(entries))
    }

    /// Encode the table into `data` at `offset`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfBounds`] if `data` is too small.
    pub fn write_to(&self, data: &mut [u8], offset: &mut usize) -> Result<()> {
        write_be_at(data, offset, entry_count(self.0.len())?)?;
        for entry in &self.0 {
            write_be_at(data, offset, entry.start_pc)?;
            write_be_at(data, offset, entry.end_pc)?;
            write_be_at(data, offset, entry.handler_pc)?;
            write_be_at(data, offset, entry.catch_type)?;
        }
        Ok(())
    }

    /// The decoded entries, in handler search order.
    #[must_use]
    pub fn entries(&self) -> &[Catch] {
        &self.0
    }

    /// Encoded size in bytes.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        2 + self.0.len() * 8
    }

    /// Encode into a freshly allocated buffer.
    ///
    /// # Errors
    /// Returns [`crate::Error::Malformed`] if the table has more than `u16::MAX` entries.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut data = vec![0u8; self.byte_len()];
        self.write_to(&mut data, &mut 0)?;
        Ok(data)
    }
}

fn entry_count(len: usize) -> Result<u16> {
    u16::try_from(len).map_err(|_| malformed_error!("Table has {} entries, limit is 65535", len))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_line_number_table() {
        let raw = [0x00, 0x02, 0x00, 0x00, 0x00, 0x0A, 0x00, 0x05, 0x00, 0x0C];
        let table = LineNumberTable::read(&mut Parser::new(&raw)).unwrap();

        assert_eq!(table.entries().len(), 2);
        assert_eq!(table.line_at(0), Some(10));
        assert_eq!(table.line_at(4), Some(10));
        assert_eq!(table.line_at(9), Some(12));
        assert_eq!(table.byte_len(), raw.len());
        assert_eq!(table.to_bytes().unwrap(), raw);
    }

    #[test]
    fn test_local_variable_table() {
        let raw = [
            0x00, 0x01, // count
            0x00, 0x02, 0x00, 0x08, // start, length
            0x00, 0x11, 0x00, 0x12, // name, descriptor
            0x00, 0x03, // slot
        ];
        let table = LocalVariableTable::read(&mut Parser::new(&raw)).unwrap();
        let entry = table.entries()[0];

        assert_eq!(entry.index, 3);
        assert_eq!(entry.name_index, 0x11);
        assert_eq!(table.live_at(3, 2).count(), 1);
        assert_eq!(table.live_at(3, 10).count(), 0);
        assert_eq!(table.live_at(1, 4).count(), 0);
        assert_eq!(table.to_bytes().unwrap(), raw);
    }

    #[test]
    fn test_exception_table_rejects_empty_range() {
        let raw = [0x00, 0x01, 0x00, 0x08, 0x00, 0x08, 0x00, 0x0B, 0x00, 0x00];
        let result = ExceptionTable::read(&mut Parser::new(&raw));
        assert!(matches!(result, Err(Error::Malformed { .. })));
    }

    #[test]
    fn test_exception_table_truncated() {
        let raw = [0x00, 0x02, 0x00, 0x00, 0x00, 0x08, 0x00, 0x0B, 0x00, 0x00];
        let result = ExceptionTable::read(&mut Parser::new(&raw));
        assert!(matches!(result, Err(Error::OutOfBounds)));
    }

    #[test]
    fn test_catch_protects() {
        let catch = Catch {
            start_pc: 4,
            end_pc: 10,
            handler_pc: 12,
            catch_type: 0,
        };
        assert!(catch.is_catch_all());
        assert!(!catch.protects(3));
        assert!(catch.protects(4));
        assert!(catch.protects(9));
        assert!(!catch.protects(10));
    }

    #[test]
    fn test_write_to_consecutive_tables() {
        let catches = ExceptionTable::new(vec![Catch {
            start_pc: 0,
            end_pc: 6,
            handler_pc: 6,
            catch_type: 0,
        }]);
        let lines = LineNumberTable::new(vec![LineNumber {
            start_pc: 0,
            line: 12,
        }]);
        let mut data = vec![0u8; 1 + catches.byte_len() + lines.byte_len()];
        let mut offset = 1;
        catches.write_to(&mut data, &mut offset).unwrap();
        assert_eq!(offset, 1 + catches.byte_len());
        lines.write_to(&mut data, &mut offset).unwrap();
        assert_eq!(offset, data.len());

        let mut parser = Parser::new(&data[1..]);
        assert_eq!(ExceptionTable::read(&mut parser).unwrap(), catches);
        assert_eq!(LineNumberTable::read(&mut parser).unwrap(), lines);
        assert!(!parser.has_more_data());
    }

    #[test]
    fn test_write_to_small_buffer() {
        let table = LineNumberTable::new(vec![LineNumber {
            start_pc: 0,
            line: 1,
        }]);
        let mut data = [0u8; 4];
        assert!(matches!(
            table.write_to(&mut data, &mut 0),
            Err(Error::OutOfBounds)
        ));
    }
}
