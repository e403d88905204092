use flac_metaedit::{
    Error,
    metadata::{BlockType, Streaminfo, blocks},
};
use std::path::Path;

/// Lists each FLAC file's metadata blocks, roughly
/// like the reference implementation's
///
/// "metaflac --list <file1.flac> <file2.flac> ..."
///
/// Only STREAMINFO is displayed in detail.
/// All other blocks are listed by type and size.
///
/// Set RUST_LOG=trace to see the library's own events.

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    for flac in std::env::args_os().skip(1) {
        if let Err(err) = display_blocks(&flac) {
            eprintln!("* {}: {err}", flac.display());
        }
    }
}

fn display_blocks<P: AsRef<Path>>(flac: P) -> Result<(), Error> {
    println!("{}:", flac.as_ref().display());

    for (num, block) in blocks(flac)?.enumerate() {
        let block = block?;

        println!("METADATA block #{num}");
        match u8::try_from(block.block_type) {
            Ok(t) => println!("  type: {t} ({})", block.block_type),
            Err(_) => println!("  type: {}", block.block_type),
        }
        println!("  length: {}", block.data.len());

        if block.block_type == BlockType::Streaminfo {
            display_streaminfo(Streaminfo::decode(&block.data)?);
        }
    }

    Ok(())
}

fn display_streaminfo(streaminfo: Streaminfo) {
    println!(
        "  minimum blocksize: {} samples",
        streaminfo.minimum_block_size
    );
    println!(
        "  maximum blocksize: {} samples",
        streaminfo.maximum_block_size
    );
    println!("  minimum framesize: {} bytes", streaminfo.minimum_frame_size);
    println!("  maximum framesize: {} bytes", streaminfo.maximum_frame_size);
    println!("  sample_rate: {} Hz", streaminfo.sample_rate);
    println!("  channels: {}", streaminfo.channels);
    println!("  bits-per-sample: {}", streaminfo.bits_per_sample);
    println!("  total samples: {}", streaminfo.total_samples);
    if let Some(duration) = streaminfo.duration() {
        println!("  duration: {:.3} s", duration.as_secs_f64());
    }
    print!("  MD5 signature: ");
    for b in streaminfo.md5 {
        print!("{b:02x}");
    }
    println!();
}
