// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! A library for editing the metadata of FLAC files
//!
//! FLAC files consist of a `fLaC` tag, a sequence of metadata blocks
//! and then the encoded audio frames.
//!
//! ```text
//! ┌──────────┬────────┬┄┄┄┄┄┄┄┄┬┄┄┄┬────────┬┄┄┄┄┄┄┄┄┬┄┄┄╮
//! │ FLAC Tag │ Block₀ │ Block₁ ┆ … ┆ Frame₀ │ Frame₁ ┆ … ┆ FLAC File
//! └──────────┴────────┴┄┄┄┄┄┄┄┄┴┄┄┄┴────────┴┄┄┄┄┄┄┄┄┴┄┄┄╯
//! ```
//!
//! This crate reads the blocks, lets them be edited as plain
//! byte payloads, and writes them back out, either to a new
//! destination or directly over the original file.
//! Audio frames are never decoded; they are treated
//! as an opaque stream of bytes.
//!
//! # Example
//!
//! ```
//! use flac_metaedit::{FlacFile, metadata::{Block, BlockType}};
//! use std::io::Cursor;
//!
//! let streaminfo: &[u8] = &[
//!     0x04, 0x80, 0x04, 0x80, 0x00, 0x06, 0x72, 0x00, 0x17, 0xf2, 0x17, 0x70,
//!     0x03, 0x70, 0x00, 0x3a, 0x69, 0x80, 0xe5, 0xd1, 0x00, 0xc6, 0x3f, 0x51,
//!     0x88, 0x90, 0x0c, 0x66, 0xb6, 0xa6, 0xa0, 0x8c, 0xe2, 0xeb,
//! ];
//!
//! // build a small file in memory
//! let mut flac = FlacFile::new(vec![Block::new(BlockType::Streaminfo, streaminfo.to_vec())])
//!     .with_frames(Cursor::new(vec![0xFF, 0xF8, 0x01, 0x02]));
//!
//! let mut encoded = vec![];
//! flac.write_to(&mut encoded).unwrap();
//!
//! // read it back and add a PADDING block
//! let mut flac = FlacFile::read(Cursor::new(encoded)).unwrap();
//! assert_eq!(flac.streaminfo().unwrap().sample_rate, 96000);
//! flac.blocks.push(Block::padding(16));
//!
//! let mut rewritten = vec![];
//! assert_eq!(flac.write_to(&mut rewritten).unwrap(), 4 + 38 + 20 + 4);
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod bits;
mod file;
pub mod metadata;
pub mod stream;
pub mod update;

pub use file::{FlacFile, WriteError};

/// A FLAC metadata editing error
#[derive(Debug)]
pub enum Error {
    /// A general I/O error from the underlying stream
    Io(std::io::Error),
    /// The stream does not start with the `fLaC` tag
    MissingFlacTag,
    /// The stream ended in the middle of a field or block
    Truncated,
    /// The first metadata block is absent or not STREAMINFO
    MissingStreaminfo,
    /// The audio frames do not begin with a frame sync code
    MissingSyncCode,
    /// A metadata block is too large for its 24-bit size field
    ExcessiveBlockSize,
    /// A metadata block has the forbidden block type 127
    InvalidMetadataBlock,
    /// A bit count outside of 1 to 64 was requested
    InvalidBitCount,
    /// The file's audio frames have already been written out
    AlreadyWritten,
    /// A file is shorter than its own metadata blocks
    NegativeAudioSize,
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        match error.kind() {
            std::io::ErrorKind::UnexpectedEof => Self::Truncated,
            _ => Self::Io(error),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Self::Io(e) => e.fmt(f),
            Self::MissingFlacTag => "missing FLAC tag".fmt(f),
            Self::Truncated => "stream truncated".fmt(f),
            Self::MissingStreaminfo => "STREAMINFO block not first in file".fmt(f),
            Self::MissingSyncCode => "frames do not begin with sync code".fmt(f),
            Self::ExcessiveBlockSize => "metadata block too large".fmt(f),
            Self::InvalidMetadataBlock => "invalid metadata block".fmt(f),
            Self::InvalidBitCount => "bit count must be between 1 and 64".fmt(f),
            Self::AlreadyWritten => "audio frames already written".fmt(f),
            Self::NegativeAudioSize => "file smaller than its metadata blocks".fmt(f),
        }
    }
}

/// Reads into `buf` until it is full or the stream ends
///
/// Returns the number of bytes read, which is less than
/// `buf.len()` only at the end of the stream.
fn read_up_to<R: std::io::Read>(mut reader: R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;

    // read can return fewer bytes than requested
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(amt) => filled += amt,
            Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }

    Ok(filled)
}

/// Counts the bytes passing through a reader or writer
struct Counter<S> {
    stream: S,
    count: u64,
}

impl<S> Counter<S> {
    fn new(stream: S) -> Self {
        Self { stream, count: 0 }
    }
}

impl<R: std::io::Read> std::io::Read for Counter<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.stream.read(buf).inspect(|amt_read| {
            self.count += *amt_read as u64;
        })
    }
}

impl<W: std::io::Write> std::io::Write for Counter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.stream.write(buf).inspect(|amt_written| {
            self.count += *amt_written as u64;
        })
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.stream.flush()
    }
}
