//! Byte-level access to class file data.
//!
//! - [`io`] - Big-endian primitive conversion and bounds-checked reads/writes
//! - [`parser`] - Cursor-based [`parser::Parser`] used by the attribute table decoders

pub mod io;
pub mod parser;
