// Copyright 2025 Brian Langenberger
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

#![allow(dead_code)]

use flac_metaedit::metadata::{Block, BlockType};

/// STREAMINFO of a 96kHz, 24 bps, 2 channel recording
pub const STREAMINFO: [u8; 34] = [
    0x04, 0x80, 0x04, 0x80, 0x00, 0x06, 0x72, 0x00, 0x17, 0xf2, 0x17, 0x70, 0x03, 0x70, 0x00,
    0x3a, 0x69, 0x80, 0xe5, 0xd1, 0x00, 0xc6, 0x3f, 0x51, 0x88, 0x90, 0x0c, 0x66, 0xb6, 0xa6,
    0xa0, 0x8c, 0xe2, 0xeb,
];

pub const MD5: [u8; 16] = [
    229, 209, 0, 198, 63, 81, 136, 144, 12, 102, 182, 166, 160, 140, 226, 235,
];

pub fn streaminfo() -> Block {
    Block::new(BlockType::Streaminfo, STREAMINFO.to_vec())
}

/// A typical set of blocks, with comment, application and padding
pub fn sample_blocks() -> Vec<Block> {
    vec![
        streaminfo(),
        Block::new(BlockType::VorbisComment, comment_payload()),
        Block::new(BlockType::Application, b"test\x01\x02\x03\x04".to_vec()),
        Block::padding(102),
    ]
}

/// Random frame bytes, starting with a frame sync code
pub fn sample_frames(len: usize) -> Vec<u8> {
    let mut frames = vec![0xFF, 0xF8];
    frames.extend(std::iter::repeat_with(|| fastrand::u8(..)).take(len.saturating_sub(2)));
    frames
}

/// Encodes the given blocks and frames as a complete file
pub fn encode(blocks: &[Block], frames: &[u8]) -> Vec<u8> {
    let mut data = vec![];
    flac_metaedit::metadata::write_blocks(&mut data, blocks).unwrap();
    data.extend_from_slice(frames);
    data
}

fn comment_payload() -> Vec<u8> {
    fn entry(data: &mut Vec<u8>, s: &str) {
        data.extend_from_slice(&(s.len() as u32).to_le_bytes());
        data.extend_from_slice(s.as_bytes());
    }

    let mut data = vec![];
    entry(&mut data, "reference libFLAC 1.4.3");
    data.extend_from_slice(&2u32.to_le_bytes());
    entry(&mut data, "TITLE=Bee Moved");
    entry(&mut data, "ARTIST=Blue Monday FM");
    data
}
