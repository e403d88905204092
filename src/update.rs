// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! For writing edited metadata blocks back over the original file
//!
//! When a file's metadata blocks change size, its frames
//! must be shifted forward or backward to make room.
//! Rather than copying the whole file through temporary
//! storage, the frames are moved within the file itself,
//! one chunk at a time, in whichever direction ensures
//! no chunk overwrites bytes that have yet to be moved.

use crate::metadata::{Block, read_blocks, write_blocks};
use crate::stream::Frames;
use crate::{Counter, Error, FlacFile};
use same_file::Handle;
use std::cmp::Ordering;
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Cursor, Read, Seek, SeekFrom, Write};
use std::num::NonZero;
use std::path::Path;
use tracing::{debug, trace};

/// Options for saving FLAC files
///
/// # Example
///
/// ```
/// use flac_metaedit::update::SaveOptions;
/// use std::num::NonZero;
///
/// let options = SaveOptions::default().chunk_size(NonZero::new(4096).unwrap());
/// assert_eq!(options.get_chunk_size().get(), 4096);
/// ```
#[derive(Clone, Debug)]
pub struct SaveOptions {
    chunk_size: NonZero<usize>,
}

impl SaveOptions {
    /// The default chunk size, in bytes (256 KiB)
    pub const DEFAULT_CHUNK_SIZE: NonZero<usize> = NonZero::new(256 * 1024).unwrap();

    /// Assigns size of chunks used when relocating frames
    ///
    /// Larger chunks use more memory but need fewer
    /// reads and writes.  The result is the same either way.
    pub fn chunk_size(self, chunk_size: NonZero<usize>) -> Self {
        Self { chunk_size }
    }

    /// Returns size of chunks used when relocating frames
    pub fn get_chunk_size(&self) -> NonZero<usize> {
        self.chunk_size
    }
}

impl Default for SaveOptions {
    fn default() -> Self {
        Self {
            chunk_size: Self::DEFAULT_CHUNK_SIZE,
        }
    }
}

/// A stream whose total length may be changed
pub trait Resize {
    /// Truncates or extends stream to the given length, in bytes
    ///
    /// Any extended portion is filled with 0 bytes.
    fn set_len(&mut self, size: u64) -> std::io::Result<()>;
}

impl Resize for File {
    fn set_len(&mut self, size: u64) -> std::io::Result<()> {
        File::set_len(self, size)
    }
}

impl Resize for Cursor<Vec<u8>> {
    fn set_len(&mut self, size: u64) -> std::io::Result<()> {
        let size = usize::try_from(size).map_err(|_| {
            std::io::Error::new(std::io::ErrorKind::OutOfMemory, "stream too large")
        })?;
        self.get_mut().resize(size, 0);
        Ok(())
    }
}

impl<F: Resize + ?Sized> Resize for &mut F {
    fn set_len(&mut self, size: u64) -> std::io::Result<()> {
        (**self).set_len(size)
    }
}

/// Replaces a FLAC file's metadata blocks with the given blocks
///
/// The file's existing blocks are read from its start to find
/// where its frames begin.  The frames are then moved
/// forward or backward in chunks to fit the new blocks,
/// the file is extended or truncated to match,
/// and the new blocks are written over the start of the file.
///
/// # Important
///
/// This is not atomic.  If an error occurs partway
/// through moving the frames, the file will be left
/// in an inconsistent state.
///
/// # Errors
///
/// Returns any error reading the existing blocks, any
/// error writing the new blocks, or [`Error::NegativeAudioSize`]
/// if the file is somehow shorter than its own blocks.
///
/// # Example
///
/// ```
/// use flac_metaedit::{FlacFile, metadata::{Block, BlockType}};
/// use flac_metaedit::update::{rewrite_metadata, SaveOptions};
/// use std::io::Cursor;
///
/// let mut original = vec![];
/// FlacFile::new(vec![Block::new(BlockType::Streaminfo, vec![0; 34])])
///     .with_frames(Cursor::new(vec![0xFF, 0xF8, 1, 2, 3]))
///     .write_to(&mut original)
///     .unwrap();
///
/// let mut flac = Cursor::new(original);
/// let blocks = vec![
///     Block::new(BlockType::Streaminfo, vec![0; 34]),
///     Block::padding(100),
/// ];
/// rewrite_metadata(&mut flac, &blocks, &SaveOptions::default()).unwrap();
///
/// let flac = flac.into_inner();
/// assert_eq!(flac.len(), 4 + 38 + 104 + 5);
/// assert_eq!(&flac[flac.len() - 5..], &[0xFF, 0xF8, 1, 2, 3]);
/// ```
pub fn rewrite_metadata<F>(
    mut file: F,
    blocks: &[Block],
    options: &SaveOptions,
) -> Result<(), Error>
where
    F: Read + Write + Seek + Resize,
{
    // measure existing blocks by re-reading them from the start
    file.rewind()?;
    let original_len = {
        let mut reader = Counter::new(BufReader::new(&mut file));
        read_blocks(&mut reader).try_for_each(|block| block.map(|_| ()))?;
        reader.count
    };

    let mut header = Vec::new();
    write_blocks(&mut header, blocks)?;
    let new_len = header.len() as u64;

    let file_len = file.seek(SeekFrom::End(0))?;
    let audio_len = file_len
        .checked_sub(original_len)
        .ok_or(Error::NegativeAudioSize)?;

    debug!(original_len, new_len, audio_len, "rewriting metadata blocks");

    let chunk_size = options.chunk_size.get();
    let buf_len = usize::try_from(audio_len).map_or(chunk_size, |len| len.min(chunk_size));
    let mut buf = vec![0; buf_len];

    match new_len.cmp(&original_len) {
        Ordering::Greater => {
            // blocks have grown, so make room and shift frames toward the end,
            // starting from the last chunk so no chunk lands on unmoved bytes
            let grow = new_len - original_len;
            file.set_len(file_len + grow)?;

            let mut remaining = audio_len;
            while remaining > 0 {
                let chunk = remaining.min(buf.len() as u64);
                remaining -= chunk;
                let from = original_len + remaining;
                move_chunk(&mut file, &mut buf[0..chunk as usize], from, from + grow)?;
            }
        }
        Ordering::Less => {
            // blocks have shrunk, so shift frames toward the start,
            // starting from the first chunk, then drop the leftover tail
            let shrink = original_len - new_len;

            let mut moved = 0;
            while moved < audio_len {
                let chunk = (audio_len - moved).min(buf.len() as u64);
                let from = original_len + moved;
                move_chunk(&mut file, &mut buf[0..chunk as usize], from, from - shrink)?;
                moved += chunk;
            }

            file.set_len(file_len - shrink)?;
        }
        Ordering::Equal => {
            // blocks are the same size, so frames stay put
        }
    }

    file.rewind()?;
    file.write_all(&header)?;
    file.flush()?;

    Ok(())
}

fn move_chunk<F: Read + Write + Seek>(
    file: &mut F,
    buf: &mut [u8],
    from: u64,
    to: u64,
) -> Result<(), Error> {
    trace!(from, to, len = buf.len(), "moving chunk");
    file.seek(SeekFrom::Start(from))?;
    file.read_exact(buf)?;
    file.seek(SeekFrom::Start(to))?;
    file.write_all(buf)?;
    Ok(())
}

pub(crate) fn save(flac: &mut FlacFile, path: &Path, options: &SaveOptions) -> Result<(), Error> {
    // fail before creating anything at path
    if flac.frames().is_some_and(Frames::is_exhausted) {
        return Err(Error::AlreadyWritten);
    }

    // and before giving up our frames, so a rejected edit can be retried
    flac.metadata_len()?;

    if reads_from(flac, path)? {
        debug!(path = %path.display(), "updating file in place");

        // our read-only handle is no longer needed
        flac.close();

        rewrite_metadata(
            OpenOptions::new().read(true).write(true).open(path)?,
            &flac.blocks,
            options,
        )
    } else {
        debug!(path = %path.display(), "writing new file");

        let mut w = BufWriter::new(File::create(path)?);
        flac.write_to(&mut w)?;
        w.flush().map_err(Error::from)
    }
}

/// Whether the file's frames are read from the file at `path`
///
/// Files are compared by identity rather than by name,
/// so hard links and symlinks to the same file match.
fn reads_from(flac: &FlacFile, path: &Path) -> Result<bool, Error> {
    let Some(input) = flac.frames().and_then(Frames::backing_file) else {
        return Ok(false);
    };

    let output = match Handle::from_path(path) {
        Ok(handle) => handle,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err.into()),
    };

    Ok(Handle::from_file(input.try_clone()?)? == output)
}
