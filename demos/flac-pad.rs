use flac_metaedit::{
    FlacFile,
    metadata::{Block, BlockType},
};

/// Roughly corresponds to the reference implementation's:
///
/// "metaflac --remove --block-type=PADDING --dont-use-padding <file.flac>"
/// "metaflac --add-padding=<length> <file.flac>"
///
/// Given only a file, removes all of its PADDING blocks.
/// Given a length and a file, replaces them with
/// a single PADDING block of that many bytes.
///
/// The file is updated in place, so its frames
/// are moved within the file rather than copied.
///
/// Set RUST_LOG=debug to follow the update.

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    match std::env::args().skip(1).collect::<Vec<_>>().as_slice() {
        [flac] => match pad(flac, None) {
            Ok(()) => println!("* {flac}: Removed padding"),
            Err(err) => eprintln!("* Error: {flac} - {err}"),
        },
        [length, flac] => match length.parse() {
            Ok(length) => match pad(flac, Some(length)) {
                Ok(()) => println!("* {flac}: Padded to {length} bytes"),
                Err(err) => eprintln!("* Error: {flac} - {err}"),
            },
            Err(err) => eprintln!("* Error: {length} - {err}"),
        },
        _ => eprintln!("* Usage: [padding length] <file.flac>"),
    }
}

fn pad(flac: &str, length: Option<usize>) -> Result<(), flac_metaedit::Error> {
    let mut file = FlacFile::open(flac)?;

    file.blocks.retain(|b| b.block_type != BlockType::Padding);
    if let Some(length) = length {
        file.blocks.push(Block::padding(length));
    }

    file.save(flac)
}
