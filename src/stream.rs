// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! For handling the FLAC frames following the metadata blocks
//!
//! Frames are never decoded.  Only the frame sync code
//! at the very start of the first frame is checked,
//! to confirm the metadata blocks ended where they claimed to.

use crate::Error;
use arrayvec::ArrayVec;
use std::fs::File;
use std::io::{BufReader, Cursor, Read};

/// A source of FLAC frame bytes
///
/// Beyond simply being readable, a source may report
/// the file it ultimately reads from.
/// Wrappers around other sources should forward that
/// query to whatever they wrap, so that a file
/// can be found beneath any number of layers.
pub trait FrameSource: Read {
    /// Returns the file this source's bytes come from, if any
    fn backing_file(&self) -> Option<&File> {
        None
    }
}

impl FrameSource for File {
    fn backing_file(&self) -> Option<&File> {
        Some(self)
    }
}

impl<R: FrameSource> FrameSource for BufReader<R> {
    fn backing_file(&self) -> Option<&File> {
        self.get_ref().backing_file()
    }
}

impl<R: FrameSource + ?Sized> FrameSource for Box<R> {
    fn backing_file(&self) -> Option<&File> {
        self.as_ref().backing_file()
    }
}

impl<R: FrameSource + ?Sized> FrameSource for &mut R {
    fn backing_file(&self) -> Option<&File> {
        (**self).backing_file()
    }
}

impl FrameSource for &[u8] {}

impl<T: AsRef<[u8]>> FrameSource for Cursor<T> {}

impl FrameSource for std::io::Empty {}

/// A reader which replays a few already-read bytes
/// before continuing with its inner reader
#[derive(Debug)]
pub struct Replay<R> {
    prefix: ArrayVec<u8, 2>,
    position: usize,
    reader: R,
}

impl<R> Replay<R> {
    /// Returns our inner reader
    ///
    /// Any bytes not yet replayed are discarded.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read> Read for Replay<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match &self.prefix[self.position..] {
            [] => self.reader.read(buf),
            remaining => {
                let amt = remaining.len().min(buf.len());
                buf[0..amt].copy_from_slice(&remaining[0..amt]);
                self.position += amt;
                Ok(amt)
            }
        }
    }
}

impl<R: FrameSource> FrameSource for Replay<R> {
    fn backing_file(&self) -> Option<&File> {
        self.reader.backing_file()
    }
}

/// Checks that the given reader starts with a FLAC frame sync code
///
/// The sync code is the 14 bits `0b11111111_111110`.
/// The bytes read to check it are not lost;
/// the returned reader yields them again, followed by
/// the rest of the stream.
///
/// A stream with no bytes at all is accepted,
/// since a file may contain no frames.
///
/// # Errors
///
/// Returns [`Error::MissingSyncCode`] if the stream does not start
/// with a sync code, or [`Error::Truncated`] if the stream ends
/// after a single byte.
///
/// # Example
///
/// ```
/// use flac_metaedit::stream::validate_sync;
/// use std::io::Read;
///
/// let frames: &[u8] = &[0xFF, 0xF8, 0x69, 0x08];
/// let mut replay = validate_sync(frames).unwrap();
/// let mut all = vec![];
/// replay.read_to_end(&mut all).unwrap();
/// assert_eq!(all, frames);
///
/// let bad: &[u8] = &[0xFF, 0x00, 0x69, 0x08];
/// assert!(validate_sync(bad).is_err());
/// ```
pub fn validate_sync<R: Read>(mut reader: R) -> Result<Replay<R>, Error> {
    let mut buf = [0; 2];
    let filled = crate::read_up_to(&mut reader, &mut buf)?;

    match &buf[0..filled] {
        [] => {}
        [_] => return Err(Error::Truncated),
        [0xFF, b] if b >> 2 == 0b111110 => {}
        _ => return Err(Error::MissingSyncCode),
    }

    Ok(Replay {
        prefix: buf[0..filled].iter().copied().collect(),
        position: 0,
        reader,
    })
}

/// A FLAC file's frames, which may only be read once
pub struct Frames {
    state: FramesState,
}

enum FramesState {
    Fresh(Box<dyn FrameSource>),
    Exhausted,
}

impl Frames {
    /// Wraps source of frame bytes
    pub fn new(source: impl FrameSource + 'static) -> Self {
        Self {
            state: FramesState::Fresh(Box::new(source)),
        }
    }

    /// Whether our frames have been read out already
    pub fn is_exhausted(&self) -> bool {
        matches!(self.state, FramesState::Exhausted)
    }

    /// Takes our frame source, leaving us exhausted
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyWritten`] if the source
    /// has already been taken.
    pub fn take(&mut self) -> Result<Box<dyn FrameSource>, Error> {
        match std::mem::replace(&mut self.state, FramesState::Exhausted) {
            FramesState::Fresh(source) => Ok(source),
            FramesState::Exhausted => Err(Error::AlreadyWritten),
        }
    }

    /// Drops our frame source, closing any file it holds open
    pub fn release(&mut self) {
        self.state = FramesState::Exhausted;
    }

    /// Returns the file our frames are read from, if any
    pub fn backing_file(&self) -> Option<&File> {
        match &self.state {
            FramesState::Fresh(source) => source.backing_file(),
            FramesState::Exhausted => None,
        }
    }
}

impl std::fmt::Debug for Frames {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("Frames")
            .field("exhausted", &self.is_exhausted())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Yields one byte per read call
    struct Trickle<'b>(&'b [u8]);

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match (self.0.split_first(), buf.first_mut()) {
                (Some((b, rest)), Some(out)) => {
                    *out = *b;
                    self.0 = rest;
                    Ok(1)
                }
                _ => Ok(0),
            }
        }
    }

    #[test]
    fn test_sync_codes() {
        for second in [0xF8, 0xF9, 0xFA, 0xFB] {
            assert!(validate_sync([0xFFu8, second].as_slice()).is_ok());
        }
        for second in [0xF0, 0xFC, 0x00, 0x7F] {
            assert!(matches!(
                validate_sync([0xFFu8, second].as_slice()),
                Err(Error::MissingSyncCode)
            ));
        }
        assert!(matches!(
            validate_sync([0xFEu8, 0xF8].as_slice()),
            Err(Error::MissingSyncCode)
        ));
        assert!(matches!(
            validate_sync([0xFFu8].as_slice()),
            Err(Error::Truncated)
        ));
        let empty: &[u8] = &[];
        assert!(validate_sync(empty).is_ok());
    }

    #[test]
    fn test_replay() {
        let data = [0xFF, 0xF8, 1, 2, 3, 4, 5];
        let mut replay = validate_sync(Trickle(&data)).unwrap();

        let mut first = [0; 1];
        replay.read_exact(&mut first).unwrap();
        assert_eq!(first, [0xFF]);

        let mut rest = vec![];
        replay.read_to_end(&mut rest).unwrap();
        assert_eq!(rest, &data[1..]);
    }

    #[test]
    fn test_backing_file() {
        let file = tempfile::tempfile().unwrap();
        let layered = Replay {
            prefix: ArrayVec::new(),
            position: 0,
            reader: BufReader::new(file),
        };
        assert!(layered.backing_file().is_some());

        let frames = Frames::new(layered);
        assert!(frames.backing_file().is_some());

        let in_memory = Frames::new(Cursor::new(vec![0xFF, 0xF8]));
        assert!(in_memory.backing_file().is_none());
    }

    #[test]
    fn test_single_take() {
        let mut frames = Frames::new(Cursor::new(vec![0xFF, 0xF8]));
        assert!(!frames.is_exhausted());
        assert!(frames.take().is_ok());
        assert!(frames.is_exhausted());
        assert!(matches!(frames.take(), Err(Error::AlreadyWritten)));
    }
}
