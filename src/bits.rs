// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! For pulling big-endian bit fields out of an in-memory buffer

use crate::Error;
use bitstream_io::{BigEndian, BitRead, BitReader};

/// Reads the next `bits` bits from `data`, most-significant bit first,
/// starting at bit offset `position`
///
/// On success, `position` is advanced by `bits`.
/// On failure, `position` is left untouched.
///
/// # Errors
///
/// Returns [`Error::InvalidBitCount`] if `bits` is 0 or more than 64,
/// and [`Error::Truncated`] if fewer than `bits` bits remain.
///
/// # Example
///
/// ```
/// use flac_metaedit::bits::read_bits;
///
/// let data = [0b1011_0110, 0b0100_0000];
/// let mut position = 0;
/// assert_eq!(read_bits(&data, &mut position, 3).unwrap(), 0b101);
/// assert_eq!(read_bits(&data, &mut position, 7).unwrap(), 0b1_0110_01);
/// assert_eq!(position, 10);
/// assert!(read_bits(&data, &mut position, 7).is_err());
/// ```
pub fn read_bits(data: &[u8], position: &mut u64, bits: u32) -> Result<u64, Error> {
    if !(1..=64).contains(&bits) {
        return Err(Error::InvalidBitCount);
    }

    let end = position
        .checked_add(u64::from(bits))
        .filter(|end| *end <= (data.len() as u64) * 8)
        .ok_or(Error::Truncated)?;

    // start from the byte holding our first bit
    let mut r = BitReader::endian(&data[(*position / 8) as usize..], BigEndian);
    r.skip((*position % 8) as u32)?;
    let value = r.read_var::<u64>(bits)?;

    *position = end;
    Ok(value)
}

/// A cursor over an in-memory buffer which yields bit fields
///
/// The cursor performs no I/O of its own.
/// It may be restarted at any bit position with [`BitCursor::at`].
#[derive(Copy, Clone, Debug)]
pub struct BitCursor<'b> {
    data: &'b [u8],
    position: u64,
}

impl<'b> BitCursor<'b> {
    /// Builds cursor at the start of the given buffer
    pub fn new(data: &'b [u8]) -> Self {
        Self::at(data, 0)
    }

    /// Builds cursor at the given bit offset of the buffer
    pub fn at(data: &'b [u8], position: u64) -> Self {
        Self { data, position }
    }

    /// Our current offset, in bits
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Number of unread bits remaining in buffer
    pub fn remaining(&self) -> u64 {
        ((self.data.len() as u64) * 8).saturating_sub(self.position)
    }

    /// Reads the next `bits` bits as an unsigned value
    ///
    /// # Errors
    ///
    /// See [`read_bits`]
    pub fn read(&mut self, bits: u32) -> Result<u64, Error> {
        read_bits(self.data, &mut self.position, bits)
    }

    /// Returns the next `N` whole bytes
    ///
    /// The cursor must be byte-aligned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Truncated`] if the cursor is not
    /// byte-aligned or fewer than `N` bytes remain.
    pub fn read_bytes<const N: usize>(&mut self) -> Result<[u8; N], Error> {
        if !self.position.is_multiple_of(8) {
            return Err(Error::Truncated);
        }
        let start = (self.position / 8) as usize;
        let bytes = self
            .data
            .get(start..start + N)
            .and_then(|b| b.try_into().ok())
            .ok_or(Error::Truncated)?;
        self.position += (N as u64) * 8;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unaligned_fields() {
        let data = [0xAB, 0xCD, 0xEF, 0x12];
        let mut c = BitCursor::new(&data);
        assert_eq!(c.read(4).unwrap(), 0xA);
        assert_eq!(c.read(12).unwrap(), 0xBCD);
        assert_eq!(c.read(1).unwrap(), 1);
        assert_eq!(c.read(15).unwrap(), 0b110_1111_0001_0010);
        assert_eq!(c.remaining(), 0);
        assert!(matches!(c.read(1), Err(Error::Truncated)));
    }

    #[test]
    fn test_wide_fields() {
        let data = [0xFF; 9];
        let mut position = 4;
        assert_eq!(read_bits(&data, &mut position, 64).unwrap(), u64::MAX);
        assert_eq!(position, 68);
        assert!(matches!(
            read_bits(&data, &mut position, 5),
            Err(Error::Truncated)
        ));
        assert_eq!(position, 68);
    }

    #[test]
    fn test_invalid_counts() {
        let data = [0; 16];
        let mut position = 0;
        assert!(matches!(
            read_bits(&data, &mut position, 0),
            Err(Error::InvalidBitCount)
        ));
        assert!(matches!(
            read_bits(&data, &mut position, 65),
            Err(Error::InvalidBitCount)
        ));
    }

    #[test]
    fn test_restart() {
        let data = [0x12, 0x34];
        let mut c = BitCursor::new(&data);
        assert_eq!(c.read(8).unwrap(), 0x12);
        let mut again = BitCursor::at(&data, 4);
        assert_eq!(again.read(8).unwrap(), 0x23);
        assert_eq!(c.read_bytes::<1>().unwrap(), [0x34]);
        assert!(matches!(again.read_bytes::<1>(), Err(Error::Truncated)));
    }
}
