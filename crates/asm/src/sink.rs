//! Describe how encoded bytes are collected.

use smallvec::SmallVec;

/// Offset in bytes from the beginning of an assembly unit.
///
/// A dedicated type rather than `usize` so offsets mean the same thing
/// regardless of the host platform.
pub type CodeOffset = u32;

/// A sink receiving the bytes of encoded instructions.
pub trait CodeSink {
    /// Add 1 byte to the code section.
    fn put1(&mut self, _: u8);

    /// Add 2 bytes to the code section, little-endian.
    fn put2(&mut self, _: u16);

    /// Add 4 bytes to the code section, little-endian.
    fn put4(&mut self, _: u32);

    /// Add 8 bytes to the code section, little-endian.
    fn put8(&mut self, _: u64);

    /// The byte offset of the current location.
    fn current_offset(&self) -> CodeOffset;
}

impl CodeSink for Vec<u8> {
    fn put1(&mut self, v: u8) {
        self.push(v);
    }

    fn put2(&mut self, v: u16) {
        self.extend_from_slice(&v.to_le_bytes());
    }

    fn put4(&mut self, v: u32) {
        self.extend_from_slice(&v.to_le_bytes());
    }

    fn put8(&mut self, v: u64) {
        self.extend_from_slice(&v.to_le_bytes());
    }

    fn current_offset(&self) -> CodeOffset {
        self.len().try_into().expect("code section exceeds 4 GiB")
    }
}

/// An encoded instruction is at most 15 bytes, so a single instruction can be
/// collected without touching the heap.
impl CodeSink for SmallVec<[u8; 16]> {
    fn put1(&mut self, v: u8) {
        self.push(v);
    }

    fn put2(&mut self, v: u16) {
        self.extend_from_slice(&v.to_le_bytes());
    }

    fn put4(&mut self, v: u32) {
        self.extend_from_slice(&v.to_le_bytes());
    }

    fn put8(&mut self, v: u64) {
        self.extend_from_slice(&v.to_le_bytes());
    }

    fn current_offset(&self) -> CodeOffset {
        self.len().try_into().expect("code section exceeds 4 GiB")
    }
}
