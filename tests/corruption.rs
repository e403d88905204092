// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

mod common;

use flac_metaedit::{Error, FlacFile};
use std::io::Cursor;

fn sample() -> (Vec<u8>, usize) {
    let blocks = common::sample_blocks();
    let flac = common::encode(&blocks, &common::sample_frames(1000));
    let header_len = FlacFile::new(blocks).metadata_len().unwrap() as usize;
    (flac, header_len)
}

#[test]
fn test_missing_tag() {
    let (flac, _) = sample();

    // ensure test file is okay
    assert!(FlacFile::read(Cursor::new(flac.clone())).is_ok());

    for _ in 0..100 {
        let mut flac = flac.clone();
        flac[fastrand::usize(0..4)] ^= 1 << fastrand::u32(0..8);

        assert!(matches!(
            FlacFile::read(Cursor::new(flac)),
            Err(Error::MissingFlacTag)
        ));
    }

    assert!(matches!(
        FlacFile::read(Cursor::new(b"RIFF\x00\x00\x00\x00WAVE".to_vec())),
        Err(Error::MissingFlacTag)
    ));

    // streams too short for a whole tag, but already wrong
    let wrong: [&[u8]; 5] = [b"ID3", b"RI", b"x", b"fLx", b"fa"];
    for short in wrong {
        assert!(matches!(
            FlacFile::read(Cursor::new(short.to_vec())),
            Err(Error::MissingFlacTag)
        ));
    }

    // while those still matching the tag so far are merely truncated
    let partial: [&[u8]; 4] = [b"", b"f", b"fL", b"fLa"];
    for short in partial {
        assert!(matches!(
            FlacFile::read(Cursor::new(short.to_vec())),
            Err(Error::Truncated)
        ));
    }
}

#[test]
fn test_truncated_metadata() {
    let (flac, header_len) = sample();

    // cutting anywhere before the final block ends is always noticed
    for _ in 0..100 {
        let cut = fastrand::usize(0..header_len);
        assert!(matches!(
            FlacFile::read(Cursor::new(flac[0..cut].to_vec())),
            Err(Error::Truncated)
        ));
    }

    // a length field claiming more bytes than are present
    let mut flac = flac;
    flac[5..8].copy_from_slice(&[0xFF, 0xFF, 0xFF]);
    assert!(matches!(
        FlacFile::read(Cursor::new(flac)),
        Err(Error::Truncated)
    ));
}

#[test]
fn test_truncated_frames() {
    let (flac, header_len) = sample();

    // no frames at all is fine
    let mut file = FlacFile::read(Cursor::new(flac[0..header_len].to_vec())).unwrap();
    let mut output = vec![];
    assert_eq!(file.write_to(&mut output).unwrap(), header_len as u64);
    assert_eq!(output, &flac[0..header_len]);

    // but a lone byte is too short for any sync code
    assert!(matches!(
        FlacFile::read(Cursor::new(flac[0..header_len + 1].to_vec())),
        Err(Error::Truncated)
    ));

    // while frames truncated past their sync code go unnoticed
    assert!(FlacFile::read(Cursor::new(flac[0..header_len + 2].to_vec())).is_ok());
}

#[test]
fn test_sync_code_corruption() {
    let (flac, header_len) = sample();

    for _ in 0..100 {
        let mut flac = flac.clone();
        // the final 2 bits of the second byte aren't part of the sync code
        match fastrand::bool() {
            true => flac[header_len] ^= 1 << fastrand::u32(0..8),
            false => flac[header_len + 1] ^= 1 << fastrand::u32(2..8),
        }

        assert!(matches!(
            FlacFile::read(Cursor::new(flac)),
            Err(Error::MissingSyncCode)
        ));
    }

    for bits in 0..4 {
        let mut flac = flac.clone();
        flac[header_len + 1] = 0xF8 | bits;
        assert!(FlacFile::read(Cursor::new(flac)).is_ok());
    }

    // a last flag set too soon leaves blocks
    // where the frames should be
    let mut flac = flac;
    flac[4] |= 0x80;
    assert!(matches!(
        FlacFile::read(Cursor::new(flac)),
        Err(Error::MissingSyncCode)
    ));
}

#[test]
fn test_invalid_block_type() {
    let (mut flac, _) = sample();

    // the STREAMINFO header, retyped to 127
    flac[4] = 0x7F;
    assert!(matches!(
        FlacFile::read(Cursor::new(flac)),
        Err(Error::InvalidMetadataBlock)
    ));
}
