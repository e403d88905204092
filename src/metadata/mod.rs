// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! For handling a FLAC file's metadata blocks
//!
//! Many items are capitalized simply because they were capitalized
//! in the original FLAC format documentation.
//!
//! # Metadata Blocks
//!
//! FLAC defines seven different metadata block types,
//! with types 7 through 126 reserved for future use
//!
//! | Block Type | Purpose |
//! |-----------:|---------|
//! | STREAMINFO | stream information such as sample rate, channel count, etc. |
//! | PADDING | empty data which can easily be resized as needed |
//! | APPLICATION | application-specific data such as foreign RIFF WAVE chunks |
//! | SEEKTABLE | to allow for more efficient seeking within a FLAC file |
//! | VORBIS_COMMENT | textual metadata such as track title, artist name, album name, etc. |
//! | CUESHEET | the original disc's layout, for CD images |
//! | PICTURE | embedded image files such as cover art |
//!
//! Only STREAMINFO is decoded by this crate.
//! All other blocks are carried as opaque payloads.

use crate::Error;
use bitstream_io::{
    BigEndian, BitRead, BitReader, BitWrite, BitWriter, FromBitStream, ToBitStream,
    ToBitStreamUsing,
};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

mod streaminfo;

pub use streaminfo::{Streaminfo, streaminfo};

pub(crate) const FLAC_TAG: &[u8; 4] = b"fLaC";

/// A FLAC metadata block header
///
/// | Bits | Field | Meaning |
/// |-----:|------:|---------|
/// | 1    | `last` | final metadata block in file |
/// | 7    | `block_type` | type of block |
/// | 24   | `size` | block size, in bytes |
///
/// # Example
/// ```
/// use bitstream_io::{BitReader, BitRead, BigEndian};
/// use flac_metaedit::metadata::{BlockHeader, BlockType};
///
/// let data: &[u8] = &[0b1_0000000, 0x00, 0x00, 0x22];
/// let mut r = BitReader::endian(data, BigEndian);
/// assert_eq!(
///     r.parse::<BlockHeader>().unwrap(),
///     BlockHeader {
///         last: true,                         // 0b1
///         block_type: BlockType::Streaminfo,  // 0b0000000
///         size: 0x00_00_22u16.into(),         // 0x00, 0x00, 0x22
///     },
/// );
/// ```
#[derive(Debug, Eq, PartialEq)]
pub struct BlockHeader {
    /// Whether we are the final block
    pub last: bool,
    /// Our block type
    pub block_type: BlockType,
    /// Our block size, in bytes
    pub size: BlockSize,
}

impl BlockHeader {
    /// Size of header itself, in bytes
    pub const SIZE: BlockSize = BlockSize((1 + 7 + 24) / 8);

    fn new(last: bool, block: &Block) -> Result<Self, Error> {
        Ok(Self {
            last,
            block_type: block.block_type,
            size: block
                .data
                .len()
                .try_into()
                .map_err(|_| Error::ExcessiveBlockSize)?,
        })
    }
}

impl FromBitStream for BlockHeader {
    type Error = Error;

    fn from_reader<R: BitRead + ?Sized>(r: &mut R) -> Result<Self, Self::Error> {
        Ok(Self {
            last: r.read_bit()?,
            block_type: r.parse()?,
            size: r.parse()?,
        })
    }
}

impl ToBitStream for BlockHeader {
    type Error = Error;

    fn to_writer<W: BitWrite + ?Sized>(&self, w: &mut W) -> Result<(), Self::Error> {
        w.write_bit(self.last)?;
        w.build(&self.block_type)?;
        w.build(&self.size)?;
        Ok(())
    }
}

/// A type of FLAC metadata block
#[derive(Copy, Clone, Debug, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub enum BlockType {
    /// The STREAMINFO block
    Streaminfo,
    /// The PADDING block
    Padding,
    /// The APPLICATION block
    Application,
    /// The SEEKTABLE block
    SeekTable,
    /// The VORBIS_COMMENT block
    VorbisComment,
    /// The CUESHEET block
    Cuesheet,
    /// The PICTURE block
    Picture,
    /// A reserved block type, from 7 to 126
    Reserved(u8),
}

impl std::fmt::Display for BlockType {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Streaminfo => "STREAMINFO".fmt(f),
            Self::Padding => "PADDING".fmt(f),
            Self::Application => "APPLICATION".fmt(f),
            Self::SeekTable => "SEEKTABLE".fmt(f),
            Self::VorbisComment => "VORBIS_COMMENT".fmt(f),
            Self::Cuesheet => "CUESHEET".fmt(f),
            Self::Picture => "PICTURE".fmt(f),
            Self::Reserved(t) => write!(f, "RESERVED({t})"),
        }
    }
}

impl TryFrom<u8> for BlockType {
    type Error = Error;

    fn try_from(t: u8) -> Result<Self, Self::Error> {
        match t {
            0 => Ok(Self::Streaminfo),
            1 => Ok(Self::Padding),
            2 => Ok(Self::Application),
            3 => Ok(Self::SeekTable),
            4 => Ok(Self::VorbisComment),
            5 => Ok(Self::Cuesheet),
            6 => Ok(Self::Picture),
            t @ 7..=126 => Ok(Self::Reserved(t)),
            _ => Err(Error::InvalidMetadataBlock),
        }
    }
}

impl TryFrom<BlockType> for u8 {
    type Error = Error;

    fn try_from(block_type: BlockType) -> Result<Self, Self::Error> {
        match block_type {
            BlockType::Streaminfo => Ok(0),
            BlockType::Padding => Ok(1),
            BlockType::Application => Ok(2),
            BlockType::SeekTable => Ok(3),
            BlockType::VorbisComment => Ok(4),
            BlockType::Cuesheet => Ok(5),
            BlockType::Picture => Ok(6),
            // only genuinely reserved values may be written
            BlockType::Reserved(t @ 7..=126) => Ok(t),
            BlockType::Reserved(_) => Err(Error::InvalidMetadataBlock),
        }
    }
}

impl FromBitStream for BlockType {
    type Error = Error;

    fn from_reader<R: BitRead + ?Sized>(r: &mut R) -> Result<Self, Self::Error> {
        r.read::<7, u8>()?.try_into()
    }
}

impl ToBitStream for BlockType {
    type Error = Error;

    fn to_writer<W: BitWrite + ?Sized>(&self, w: &mut W) -> Result<(), Self::Error> {
        w.write::<7, u8>((*self).try_into()?).map_err(Error::Io)
    }
}

/// A 24-bit block size value, with safeguards against overflow
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Ord, PartialOrd)]
pub struct BlockSize(u32);

impl BlockSize {
    /// A value of 0
    pub const ZERO: BlockSize = BlockSize(0);

    /// The largest possible block size, in bytes (2²⁴ - 1)
    pub const MAX: BlockSize = BlockSize((1 << 24) - 1);

    /// Conditionally add `BlockSize` to ourself
    pub fn checked_add(self, rhs: Self) -> Option<Self> {
        self.0
            .checked_add(rhs.0)
            .filter(|s| *s <= Self::MAX.0)
            .map(Self)
    }
}

impl std::fmt::Display for BlockSize {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl FromBitStream for BlockSize {
    type Error = std::io::Error;

    fn from_reader<R: BitRead + ?Sized>(r: &mut R) -> Result<Self, Self::Error> {
        r.read::<24, _>().map(Self)
    }
}

impl ToBitStream for BlockSize {
    type Error = std::io::Error;

    fn to_writer<W: BitWrite + ?Sized>(&self, w: &mut W) -> Result<(), Self::Error> {
        w.write::<24, _>(self.0)
    }
}

impl From<u8> for BlockSize {
    fn from(u: u8) -> Self {
        Self(u.into())
    }
}

impl From<u16> for BlockSize {
    fn from(u: u16) -> Self {
        Self(u.into())
    }
}

impl TryFrom<usize> for BlockSize {
    type Error = BlockSizeOverflow;

    fn try_from(u: usize) -> Result<Self, Self::Error> {
        u32::try_from(u)
            .map_err(|_| BlockSizeOverflow)
            .and_then(Self::try_from)
    }
}

impl TryFrom<u32> for BlockSize {
    type Error = BlockSizeOverflow;

    fn try_from(u: u32) -> Result<Self, Self::Error> {
        (u <= Self::MAX.0)
            .then_some(Self(u))
            .ok_or(BlockSizeOverflow)
    }
}

impl From<BlockSize> for u32 {
    #[inline]
    fn from(size: BlockSize) -> u32 {
        size.0
    }
}

impl From<BlockSize> for u64 {
    #[inline]
    fn from(size: BlockSize) -> u64 {
        size.0.into()
    }
}

/// An error that occurs when trying to build an overly large `BlockSize`
#[derive(Copy, Clone, Debug)]
pub struct BlockSizeOverflow;

impl std::error::Error for BlockSizeOverflow {}

impl std::fmt::Display for BlockSizeOverflow {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        "value too large for BlockSize".fmt(f)
    }
}

impl From<BlockSizeOverflow> for Error {
    fn from(_: BlockSizeOverflow) -> Self {
        Error::ExcessiveBlockSize
    }
}

/// A single FLAC metadata block
///
/// Each block consists of a [`BlockHeader`] followed by the block's contents.
///
/// ```text
/// ┌──────────┬────────┬┄┄┄┄┄┄┄┄┬┄┄┄┬────────┬┄┄┄┄┄┄┄┄┬┄┄┄╮
/// │ FLAC Tag │ Block₀ │ Block₁ ┆ … ┆ Frame₀ │ Frame₁ ┆ … ┆ FLAC File
/// └──────────┼────────┼┄┄┄┄┄┄┄┄┴┄┄┄┴────────┴┄┄┄┄┄┄┄┄┴┄┄┄╯
/// ╭──────────╯        ╰────────────────────────╮
/// ├──────────────┬─────────────────────────────┤
/// │ Block Header │     Metadata Block Data     │           Metadata Block
/// └──────────────┴─────────────────────────────┘
/// ```
///
/// The block's contents are kept as raw bytes.
/// Whether a block is the last one in the file is not stored;
/// that flag is derived from the block's position whenever
/// blocks are written.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Block {
    /// The block's type
    pub block_type: BlockType,
    /// The block's contents, not including its header
    pub data: Vec<u8>,
}

impl Block {
    /// Builds block from type and contents
    pub fn new(block_type: BlockType, data: Vec<u8>) -> Self {
        Self { block_type, data }
    }

    /// Builds PADDING block of the given number of 0 bytes
    pub fn padding(size: usize) -> Self {
        Self::new(BlockType::Padding, vec![0; size])
    }

    /// Size of block, in bytes, including its header
    ///
    /// Returns `None` if the block's contents are too large
    /// to be written.
    ///
    /// # Example
    ///
    /// ```
    /// use flac_metaedit::metadata::Block;
    ///
    /// assert_eq!(Block::padding(10).total_size(), Some(14));
    /// assert_eq!(Block::padding((1 << 24) - 1).total_size(), Some((1 << 24) + 3));
    /// assert_eq!(Block::padding(1 << 24).total_size(), None);
    /// ```
    pub fn total_size(&self) -> Option<u32> {
        // the header may push the total past BlockSize::MAX
        BlockSize::try_from(self.data.len())
            .ok()
            .map(|s| u32::from(s) + u32::from(BlockHeader::SIZE))
    }

    /// Returns block with its header, as it would appear in a file
    ///
    /// # Errors
    ///
    /// Returns [`Error::ExcessiveBlockSize`] if the block's contents
    /// are larger than 2²⁴ - 1 bytes, or [`Error::InvalidMetadataBlock`]
    /// if the block's type cannot be written.
    ///
    /// # Example
    ///
    /// ```
    /// use flac_metaedit::metadata::{Block, BlockType};
    ///
    /// let block = Block::new(BlockType::Application, vec![1, 2, 3]);
    /// assert_eq!(block.to_bytes(false).unwrap(), [0x02, 0x00, 0x00, 0x03, 1, 2, 3]);
    /// assert_eq!(block.to_bytes(true).unwrap(), [0x82, 0x00, 0x00, 0x03, 1, 2, 3]);
    /// ```
    pub fn to_bytes(&self, last: bool) -> Result<Vec<u8>, Error> {
        let mut bytes = Vec::with_capacity(self.data.len() + 4);
        BitWriter::endian(&mut bytes, BigEndian).build_using(self, last)?;
        Ok(bytes)
    }
}

impl ToBitStreamUsing for Block {
    type Context = bool;
    type Error = Error;

    fn to_writer<W: BitWrite + ?Sized>(&self, w: &mut W, last: bool) -> Result<(), Self::Error> {
        w.build(&BlockHeader::new(last, self)?)?;
        w.write_bytes(&self.data).map_err(Error::from)
    }
}

/// Reads a single metadata block from the given reader
///
/// Returns the block along with whether its header
/// flags it as the last block in the file.
/// Reads exactly the header and the block's contents,
/// and nothing beyond.
///
/// # Errors
///
/// Returns [`Error::Truncated`] if the stream ends
/// before the header or contents are complete,
/// or [`Error::InvalidMetadataBlock`] for block type 127.
///
/// # Example
///
/// ```
/// use flac_metaedit::metadata::{read_block, Block, BlockType};
///
/// let data: &[u8] = &[0x81, 0x00, 0x00, 0x02, 0x00, 0x00];
/// let (block, last) = read_block(data).unwrap();
/// assert_eq!(block, Block::padding(2));
/// assert!(last);
/// ```
pub fn read_block<R: std::io::Read>(r: R) -> Result<(Block, bool), Error> {
    let mut r = BitReader::endian(r, BigEndian);
    let header: BlockHeader = r.parse()?;
    let data = r.read_to_vec(u32::from(header.size) as usize)?;

    Ok((Block::new(header.block_type, data), header.last))
}

/// An iterator over FLAC metadata blocks
///
/// Checks for the FLAC tag before yielding
/// any blocks and stops after the block flagged as last.
/// Once an error is returned, no further blocks are read.
pub struct BlockIterator<R: std::io::Read> {
    reader: R,
    tag_read: bool,
    failed: bool,
    finished: bool,
}

impl<R: std::io::Read> BlockIterator<R> {
    /// Creates an iterator over something that implements `Read`.
    /// Because this may perform many small reads,
    /// performance is greatly improved by buffering reads
    /// when reading from a raw `File`.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            tag_read: false,
            failed: false,
            finished: false,
        }
    }

    /// Returns our inner reader
    ///
    /// Once the iterator is finished, the reader
    /// is positioned at the start of the FLAC frames.
    pub fn into_reader(self) -> R {
        self.reader
    }

    fn read_tag(&mut self) -> Result<(), Error> {
        let mut tag = [0; 4];
        let read = crate::read_up_to(&mut self.reader, &mut tag)?;
        match &tag[0..read] {
            tag if tag == FLAC_TAG => Ok(()),
            // a short stream is only truncated if it's still on course
            tag if FLAC_TAG.starts_with(tag) => Err(Error::Truncated),
            _ => Err(Error::MissingFlacTag),
        }
    }
}

impl<R: std::io::Read> Iterator for BlockIterator<R> {
    type Item = Result<Block, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.finished {
            // once we hit an error or the last block, stop any further reads
            None
        } else if !self.tag_read {
            // "fLaC" tag must come before anything else
            match self.read_tag() {
                Ok(()) => {
                    self.tag_read = true;
                    self.next()
                }
                Err(err) => {
                    self.failed = true;
                    Some(Err(err))
                }
            }
        } else {
            match read_block(self.reader.by_ref()) {
                Ok((block, last)) => {
                    self.finished = last;
                    Some(Ok(block))
                }
                Err(err) => {
                    self.failed = true;
                    Some(Err(err))
                }
            }
        }
    }
}

/// Returns iterator of blocks from the given reader
///
/// The reader should be positioned at the start of the FLAC
/// file.
///
/// Because this may perform many small reads,
/// using a buffered reader may greatly improve performance
/// when reading from a raw `File`.
///
/// # Example
///
/// ```
/// use flac_metaedit::metadata::{read_blocks, write_blocks, Block, BlockType};
///
/// let blocks = vec![
///     Block::new(BlockType::Streaminfo, vec![0; 34]),
///     Block::new(BlockType::Application, vec![1, 2, 3, 4]),
///     Block::padding(10),
/// ];
///
/// let mut flac = vec![];
/// write_blocks(&mut flac, &blocks).unwrap();
///
/// let read = read_blocks(flac.as_slice()).collect::<Result<Vec<_>, _>>().unwrap();
/// assert_eq!(blocks, read);
/// ```
pub fn read_blocks<R: std::io::Read>(r: R) -> BlockIterator<R> {
    BlockIterator::new(r)
}

/// Returns iterator of blocks from the given path
///
/// # Errors
///
/// Returns any I/O error from opening the path.
/// Note that the iterator itself may return any errors
/// from reading individual blocks.
pub fn blocks<P: AsRef<Path>>(p: P) -> std::io::Result<BlockIterator<BufReader<File>>> {
    File::open(p.as_ref()).map(|f| read_blocks(BufReader::new(f)))
}

/// Returns FLAC's STREAMINFO from the given file
///
/// Only the metadata blocks are read; the file's frames
/// are left untouched.
///
/// # Errors
///
/// Returns an error if the STREAMINFO block is not first
/// or if any I/O error occurs when reading the file.
pub fn info<P: AsRef<Path>>(p: P) -> Result<Streaminfo, Error> {
    let blocks = blocks(p)?.collect::<Result<Vec<_>, _>>()?;
    streaminfo(&blocks)
}

/// Writes the FLAC tag and the given blocks to the given writer
///
/// The last block in the list is flagged as last,
/// and no others, regardless of how they were
/// originally read.
///
/// Because this may perform many small writes,
/// buffering writes may greatly improve performance
/// when writing to a raw `File`.
///
/// # Errors
///
/// Passes along any I/O errors from the underlying stream.
/// Returns [`Error::MissingStreaminfo`] if there are no blocks
/// at all, and [`Error::ExcessiveBlockSize`] if any block is too large.
pub fn write_blocks<W: std::io::Write>(mut w: W, blocks: &[Block]) -> Result<(), Error> {
    if blocks.is_empty() {
        return Err(Error::MissingStreaminfo);
    }

    // "fLaC" tag must come before anything else
    w.write_all(FLAC_TAG)?;

    let mut w = BitWriter::endian(w, BigEndian);
    let last = blocks.len() - 1;

    blocks
        .iter()
        .enumerate()
        .try_for_each(|(index, block)| w.build_using(block, index == last))
}
