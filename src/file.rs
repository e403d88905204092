// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

use crate::metadata::{Block, Streaminfo, read_blocks, streaminfo, write_blocks};
use crate::stream::{FrameSource, Frames, validate_sync};
use crate::update::SaveOptions;
use crate::{Counter, Error};
use std::fs::File;
use std::io::{BufReader, Read, Write};
use std::path::Path;

/// A FLAC file's metadata blocks along with its frames
///
/// The blocks may be edited freely in-between reading
/// and writing.  The first block must be STREAMINFO
/// for the file to be playable.
///
/// The frames are read only once: after the file has been
/// written out, any further attempt to write it fails
/// with [`Error::AlreadyWritten`].
#[derive(Debug)]
pub struct FlacFile {
    /// The file's metadata blocks, in order
    pub blocks: Vec<Block>,
    frames: Option<Frames>,
}

impl FlacFile {
    /// Builds file from the given blocks, with no frames
    pub fn new(blocks: Vec<Block>) -> Self {
        Self {
            blocks,
            frames: None,
        }
    }

    /// Attaches source of frame bytes to file
    ///
    /// The source is written out verbatim after the metadata
    /// blocks and is not checked for a sync code.
    pub fn with_frames(self, frames: impl FrameSource + 'static) -> Self {
        Self {
            frames: Some(Frames::new(frames)),
            ..self
        }
    }

    /// Reads only the metadata blocks from the given reader
    ///
    /// The reader should be positioned at the start of the file.
    /// It is left positioned at the start of the frames,
    /// which are not read.
    ///
    /// # Errors
    ///
    /// Returns any error reading the FLAC tag or metadata blocks.
    pub fn read_metadata<R: Read>(r: R) -> Result<Self, Error> {
        read_blocks(r).collect::<Result<Vec<_>, _>>().map(Self::new)
    }

    /// Reads metadata blocks from the given reader
    /// and keeps the reader as the file's frames
    ///
    /// Because this may perform many small reads,
    /// using a buffered reader is preferred when
    /// reading from a raw file.
    ///
    /// # Errors
    ///
    /// Returns any error reading the FLAC tag or metadata blocks,
    /// or [`Error::MissingSyncCode`] if the frames don't
    /// immediately follow the final block.
    pub fn read<R: FrameSource + 'static>(mut r: R) -> Result<Self, Error> {
        let file = Self::read_metadata(&mut r)?;
        Ok(file.with_frames(validate_sync(r)?))
    }

    /// Opens FLAC file at the given path, metadata blocks only
    ///
    /// The file is closed once its blocks are read.
    ///
    /// # Errors
    ///
    /// Returns any error opening the file or reading its blocks.
    pub fn open_metadata<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        Self::read_metadata(BufReader::new(File::open(path.as_ref())?))
    }

    /// Opens FLAC file at the given path
    ///
    /// The file is held open for its frames until
    /// written out, saved, closed or dropped.
    ///
    /// # Errors
    ///
    /// Same as [`FlacFile::read`], along with any
    /// error opening the file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        Self::read(BufReader::new(File::open(path.as_ref())?))
    }

    /// Decodes the file's STREAMINFO block
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingStreaminfo`] if the first block
    /// is not STREAMINFO, or [`Error::Truncated`] if it is too short.
    pub fn streaminfo(&self) -> Result<Streaminfo, Error> {
        streaminfo(&self.blocks)
    }

    /// Whether the file has frames left to write
    pub fn has_frames(&self) -> bool {
        self.frames.as_ref().is_some_and(|f| !f.is_exhausted())
    }

    /// Takes the file's frames for reading
    ///
    /// Returns `None` if the file was built without frames.
    /// Afterward, the file can no longer be written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyWritten`] if the frames
    /// have already been written or taken.
    pub fn take_frames(&mut self) -> Result<Option<Box<dyn FrameSource>>, Error> {
        self.frames.as_mut().map(Frames::take).transpose()
    }

    pub(crate) fn frames(&self) -> Option<&Frames> {
        self.frames.as_ref()
    }

    /// Writes FLAC tag and metadata blocks, but no frames
    ///
    /// Returns the number of bytes written,
    /// which is where the frames would start in a file.
    ///
    /// # Errors
    ///
    /// Passes along any error from [`write_blocks`].
    pub fn write_metadata<W: Write>(&self, w: W) -> Result<u64, Error> {
        let mut w = Counter::new(w);
        write_blocks(&mut w, &self.blocks)?;
        Ok(w.count)
    }

    /// Size of FLAC tag and all metadata blocks, in bytes
    ///
    /// # Errors
    ///
    /// Passes along any error from [`write_blocks`].
    pub fn metadata_len(&self) -> Result<u64, Error> {
        self.write_metadata(std::io::sink())
    }

    /// Writes the whole file to the given writer
    ///
    /// This writes the FLAC tag, every metadata block,
    /// and then copies over the file's frames in modest chunks.
    /// Only the final block is flagged as last.
    ///
    /// Returns the total number of bytes written.
    ///
    /// Once the frames are copied, they are released,
    /// and further calls fail with [`Error::AlreadyWritten`]
    /// without writing anything.
    ///
    /// # Errors
    ///
    /// Returns a [`WriteError`] containing the cause and the number
    /// of bytes accepted by the writer before the failure.
    pub fn write_to<W: Write>(&mut self, w: W) -> Result<u64, WriteError> {
        let mut w = Counter::new(w);

        match self.write_counted(&mut w) {
            Ok(()) => Ok(w.count),
            Err(error) => Err(WriteError {
                written: w.count,
                error,
            }),
        }
    }

    fn write_counted<W: Write>(&mut self, w: &mut Counter<W>) -> Result<(), Error> {
        if self.frames.as_ref().is_some_and(Frames::is_exhausted) {
            return Err(Error::AlreadyWritten);
        }

        write_blocks(&mut *w, &self.blocks)?;

        if let Some(frames) = self.frames.as_mut() {
            // the source is dropped (and any file closed) whether or not copying succeeds
            let mut source = frames.take()?;
            let copied = std::io::copy(&mut source, w)?;
            tracing::trace!(copied, "copied frames");
        }

        Ok(())
    }

    /// Saves file to the given path
    ///
    /// If the file's frames are being read from the same file
    /// as `path` (by the same path, or through a hard link),
    /// the file is updated in place by relocating its frames
    /// as needed.
    /// Otherwise, `path` is created or truncated and the whole
    /// file is written to it.
    ///
    /// In either case, the file's frames are consumed.
    ///
    /// # Important
    ///
    /// Updating in place is not atomic.
    /// An error partway through can leave the file corrupted.
    /// Callers needing atomic updates should save to a new
    /// path and rename it over the original.
    ///
    /// # Errors
    ///
    /// Returns any error writing the file.
    /// If the blocks themselves can't be written, or the frames
    /// are already written, the error is returned before
    /// anything at `path` is touched and the frames are kept.
    pub fn save<P: AsRef<Path>>(&mut self, path: P) -> Result<(), Error> {
        self.save_with(path, &SaveOptions::default())
    }

    /// Saves file to the given path with the given options
    ///
    /// See [`FlacFile::save`] for details.
    ///
    /// # Errors
    ///
    /// Returns any error writing the file.
    pub fn save_with<P: AsRef<Path>>(
        &mut self,
        path: P,
        options: &SaveOptions,
    ) -> Result<(), Error> {
        crate::update::save(self, path.as_ref(), options)
    }

    /// Releases the file's frames, closing any file they're read from
    ///
    /// Afterward, the file can no longer be written.
    pub fn close(&mut self) {
        if let Some(frames) = self.frames.as_mut() {
            frames.release();
        }
    }
}

/// An error that occurs partway through writing a file
#[derive(Debug)]
pub struct WriteError {
    /// The number of bytes accepted by the writer before the error
    pub written: u64,
    /// The error itself
    pub error: Error,
}

impl std::error::Error for WriteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl std::fmt::Display for WriteError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} after writing {} bytes", self.error, self.written)
    }
}

impl From<WriteError> for Error {
    fn from(WriteError { error, .. }: WriteError) -> Self {
        error
    }
}
