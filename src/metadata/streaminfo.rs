// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use super::{Block, BlockType};
use crate::Error;
use crate::bits::BitCursor;
use bitstream_io::{BigEndian, BitWrite, BitWriter, ToBitStream};

/// A decoded STREAMINFO metadata block
///
/// This block contains metadata about the stream,
/// such as its sample rate and channel count.
///
/// | Bits | Field | Meaning |
/// |-----:|------:|---------|
/// | 16   | `minimum_block_size` | minimum block size (in samples) in the stream
/// | 16   | `maximum_block_size` | maximum block size (in samples) in the stream
/// | 24   | `minimum_frame_size` | minimum frame size (in bytes) in the stream
/// | 24   | `maximum_frame_size` | maximum frame size (in bytes) in the stream
/// | 20   | `sample_rate` | stream's sample rate, in Hz
/// | 3    | `channels` | stream's channel count (+1)
/// | 5    | `bits_per_sample` | stream's bits-per-sample (+1)
/// | 36   | `total_samples` | stream's total channel-independent samples
/// | 16×8 | `md5` | decoded stream's MD5 sum hash
///
/// This is a view of the first block's payload,
/// decoded fresh each time it is requested.
/// To change the stream's parameters, replace
/// that block's payload with [`Streaminfo::to_block`].
///
/// # Example
/// ```
/// use flac_metaedit::metadata::Streaminfo;
///
/// let data: &[u8] = &[
///     0x10, 0x00,
///     0x10, 0x00,
///     0x00, 0x00, 0x0c,
///     0x00, 0x00, 0x0c,
///     0b00001010, 0b11000100, 0b0100_000_0,
///     0b1111_0000, 0b00000000, 0b00000000, 0b00000000, 0b01010000,
///     0xf5, 0x3f, 0x86, 0x87, 0x6d, 0xcd, 0x77, 0x83,
///     0x22, 0x5c, 0x93, 0xba, 0x8a, 0x93, 0x8c, 0x7d,
/// ];
///
/// assert_eq!(
///     Streaminfo::decode(data).unwrap(),
///     Streaminfo {
///         minimum_block_size: 0x10_00,
///         maximum_block_size: 0x10_00,
///         minimum_frame_size: 0x00_00_0c,
///         maximum_frame_size: 0x00_00_0c,
///         sample_rate: 0b00001010_11000100_0100,  // 44100
///         channels: 0b000 + 1,
///         bits_per_sample: 0b0_1111 + 1,          // 16
///         total_samples: 0b0000_00000000_00000000_00000000_01010000,
///         md5: [
///             0xf5, 0x3f, 0x86, 0x87, 0x6d, 0xcd, 0x77, 0x83,
///             0x22, 0x5c, 0x93, 0xba, 0x8a, 0x93, 0x8c, 0x7d,
///         ],
///     },
/// );
/// ```
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Streaminfo {
    /// The minimum block size (in samples) used in the stream,
    /// excluding the last block.
    pub minimum_block_size: u16,
    /// The maximum block size (in samples) used in the stream,
    /// excluding the last block.
    pub maximum_block_size: u16,
    /// The minimum framesize (in bytes) used in the stream.
    ///
    /// 0 indicates the value is unknown.
    pub minimum_frame_size: u32,
    /// The maximum framesize (in bytes) used in the stream.
    ///
    /// 0 indicates the value is unknown.
    pub maximum_frame_size: u32,
    /// Sample rate in Hz
    ///
    /// 0 indicates a non-audio stream.
    pub sample_rate: u32,
    /// Number of channels, from 1 to 8
    pub channels: u8,
    /// Number of bits-per-sample, from 1 to 32
    pub bits_per_sample: u8,
    /// Total number of interchannel samples in stream.
    ///
    /// 0 indicates the value is unknown.
    pub total_samples: u64,
    /// MD5 hash of unencoded audio data.
    ///
    /// All 0 bytes indicates the value is unknown.
    pub md5: [u8; 16],
}

impl Streaminfo {
    /// The maximum size of a frame, in bytes (2²⁴ - 1)
    pub const MAX_FRAME_SIZE: u32 = (1 << 24) - 1;

    /// The maximum sample rate, in Hz (2²⁰ - 1)
    pub const MAX_SAMPLE_RATE: u32 = (1 << 20) - 1;

    /// The maximum number of channels (8)
    pub const MAX_CHANNELS: u8 = 8;

    /// The maximum number of total samples (2³⁶ - 1)
    pub const MAX_TOTAL_SAMPLES: u64 = (1 << 36) - 1;

    /// Defined size of STREAMINFO block, in bytes
    pub const SIZE: usize = 34;

    /// Decodes STREAMINFO from a block's payload
    ///
    /// Decoding is pure: the same bytes always
    /// yield the same values.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Truncated`] if the payload is too short.
    pub fn decode(data: &[u8]) -> Result<Self, Error> {
        let mut r = BitCursor::new(data);

        // each field is no wider than its target type
        Ok(Self {
            minimum_block_size: r.read(16)? as u16,
            maximum_block_size: r.read(16)? as u16,
            minimum_frame_size: r.read(24)? as u32,
            maximum_frame_size: r.read(24)? as u32,
            sample_rate: r.read(20)? as u32,
            channels: r.read(3)? as u8 + 1,
            bits_per_sample: r.read(5)? as u8 + 1,
            total_samples: r.read(36)?,
            md5: r.read_bytes()?,
        })
    }

    /// Encodes ourself as a block payload
    ///
    /// # Errors
    ///
    /// Returns an I/O error if any field is out of range
    /// for its fixed-width field in the block.
    pub fn encode(&self) -> Result<Vec<u8>, Error> {
        let mut data = Vec::with_capacity(Self::SIZE);
        BitWriter::endian(&mut data, BigEndian).build(self)?;
        Ok(data)
    }

    /// Builds a STREAMINFO block from ourself
    ///
    /// # Errors
    ///
    /// Same as [`Streaminfo::encode`]
    pub fn to_block(&self) -> Result<Block, Error> {
        self.encode()
            .map(|data| Block::new(BlockType::Streaminfo, data))
    }

    /// Returns duration of stream, if known
    pub fn duration(&self) -> Option<std::time::Duration> {
        const NANOS_PER_SEC: u64 = 1_000_000_000;

        let sample_rate = u64::from(self.sample_rate);

        (self.total_samples > 0 && sample_rate > 0).then(|| {
            std::time::Duration::new(
                self.total_samples / sample_rate,
                u32::try_from(((self.total_samples % sample_rate) * NANOS_PER_SEC) / sample_rate)
                    .unwrap_or_default(),
            )
        })
    }
}

impl ToBitStream for Streaminfo {
    type Error = std::io::Error;

    fn to_writer<W: BitWrite + ?Sized>(&self, w: &mut W) -> Result<(), Self::Error> {
        fn out_of_range(field: &'static str) -> std::io::Error {
            std::io::Error::new(std::io::ErrorKind::InvalidInput, field)
        }

        w.write_from(self.minimum_block_size)?;
        w.write_from(self.maximum_block_size)?;
        w.write::<24, _>(self.minimum_frame_size)?;
        w.write::<24, _>(self.maximum_frame_size)?;
        w.write::<20, _>(self.sample_rate)?;
        w.write::<3, u8>(
            self.channels
                .checked_sub(1)
                .ok_or_else(|| out_of_range("channel count out of range"))?,
        )?;
        w.write::<5, u8>(
            self.bits_per_sample
                .checked_sub(1)
                .ok_or_else(|| out_of_range("bits-per-sample out of range"))?,
        )?;
        w.write::<36, _>(self.total_samples)?;
        w.write_bytes(&self.md5)
    }
}

/// Decodes STREAMINFO from the first of the given blocks
///
/// # Errors
///
/// Returns [`Error::MissingStreaminfo`] if there are no blocks
/// or the first is not a STREAMINFO block,
/// or [`Error::Truncated`] if its payload is too short.
pub fn streaminfo(blocks: &[Block]) -> Result<Streaminfo, Error> {
    match blocks.first() {
        Some(Block {
            block_type: BlockType::Streaminfo,
            data,
        }) => Streaminfo::decode(data),
        _ => Err(Error::MissingStreaminfo),
    }
}
