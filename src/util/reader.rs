use std::ffi::OsStr;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::MultiGzDecoder;

/// Open a text input for buffered reading, decompressing `.gz` files on the fly.
///
/// Files are opened read-only and never locked, so external tools can keep
/// inspecting them while a parse is in progress.
pub fn open_reader(path: &Path) -> io::Result<BufReader<Box<dyn Read>>> {
    let file = File::open(path)?;
    let inner: Box<dyn Read> = if path.extension() == Some(OsStr::new("gz")) {
        Box::new(MultiGzDecoder::new(file))
    } else {
        Box::new(file)
    };
    Ok(BufReader::new(inner))
}

/// Iterate over the non-blank lines of `reader`, paired with 1-based line numbers.
pub fn numbered_lines<R: BufRead>(
    reader: R,
) -> impl Iterator<Item = io::Result<(usize, String)>> {
    reader
        .lines()
        .enumerate()
        .filter_map(|(idx, line)| match line {
            Ok(line) if line.trim().is_empty() => None,
            Ok(line) => Some(Ok((idx + 1, line))),
            Err(err) => Some(Err(err)),
        })
}
