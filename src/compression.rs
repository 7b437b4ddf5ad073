// src/compression.rs

//! Decompression of downloaded catalog artifacts
//!
//! - primary.sqlite.bz2: bzip2, decompressed to a file on disk
//! - primary.xml.gz: gzip, streamed into the XML parser; a file without a
//!   gzip header is read as plain XML

use crate::error::{Error, Result};
use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Read, Seek, SeekFrom, Write};
use std::path::Path;
use tracing::{debug, warn};

/// Gzip magic bytes
pub const GZIP_MAGIC_BYTES: [u8; 2] = [0x1f, 0x8b];

/// Decompress a bzip2 stream from `src` into `dst`, returning bytes written
pub fn bunzip2<R: Read, W: Write>(src: R, dst: &mut W) -> Result<u64> {
    let mut decoder = BzDecoder::new(src);
    io::copy(&mut decoder, dst).map_err(|e| Error::DecompressError(format!("bzip2: {}", e)))
}

/// Decompress the bzip2 file `src` into a new file `dst`
///
/// A partially written `dst` is removed on failure.
pub fn bunzip2_file(src: &Path, dst: &Path) -> Result<u64> {
    debug!("Decompressing {} to {}", src.display(), dst.display());

    let input = File::open(src)
        .map_err(|e| Error::IoError(format!("Failed to open {}: {}", src.display(), e)))?;
    let mut output = File::create(dst)
        .map_err(|e| Error::IoError(format!("Failed to create {}: {}", dst.display(), e)))?;

    let result = bunzip2(BufReader::new(input), &mut output).and_then(|n| {
        output.sync_all()?;
        Ok(n)
    });

    if result.is_err() {
        drop(output);
        if let Err(e) = std::fs::remove_file(dst) {
            warn!("Failed to remove partial {}: {}", dst.display(), e);
        }
    }
    result
}

/// Open a file that is gzip-compressed or, failing the header check, plain
pub fn open_gzip_or_plain(path: &Path) -> Result<Box<dyn BufRead>> {
    let mut file = File::open(path)
        .map_err(|e| Error::IoError(format!("Failed to open {}: {}", path.display(), e)))?;

    let mut magic = [0u8; 2];
    let read = read_prefix(&mut file, &mut magic)?;
    file.seek(SeekFrom::Start(0))?;

    if read == magic.len() && magic == GZIP_MAGIC_BYTES {
        debug!("Reading gzip-compressed {}", path.display());
        Ok(Box::new(BufReader::new(GzDecoder::new(BufReader::new(file)))))
    } else {
        debug!("No gzip header, reading {} as plain text", path.display());
        Ok(Box::new(BufReader::new(file)))
    }
}

fn read_prefix(file: &mut File, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match file.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bzip2::Compression as BzCompression;
    use bzip2::write::BzEncoder;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use tempfile::tempdir;

    #[test]
    fn test_bunzip2_file_roundtrip() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("data.bz2");
        let dst = dir.path().join("data");

        let mut encoder = BzEncoder::new(File::create(&src).unwrap(), BzCompression::best());
        encoder.write_all(b"hello catalog").unwrap();
        encoder.finish().unwrap();

        let n = bunzip2_file(&src, &dst).unwrap();
        assert_eq!(n, 13);
        assert_eq!(std::fs::read(&dst).unwrap(), b"hello catalog");
    }

    #[test]
    fn test_bunzip2_file_rejects_garbage_and_cleans_up() {
        let dir = tempdir().unwrap();
        let src = dir.path().join("data.bz2");
        let dst = dir.path().join("data");
        std::fs::write(&src, b"definitely not bzip2").unwrap();

        let err = bunzip2_file(&src, &dst).unwrap_err();
        assert!(matches!(err, Error::DecompressError(_)));
        assert!(!dst.exists());
    }

    #[test]
    fn test_open_gzip_or_plain() {
        let dir = tempdir().unwrap();

        let gz = dir.path().join("a.xml.gz");
        let mut encoder = GzEncoder::new(File::create(&gz).unwrap(), Compression::default());
        encoder.write_all(b"<metadata/>").unwrap();
        encoder.finish().unwrap();

        let mut text = String::new();
        open_gzip_or_plain(&gz).unwrap().read_to_string(&mut text).unwrap();
        assert_eq!(text, "<metadata/>");

        let plain = dir.path().join("b.xml.gz");
        std::fs::write(&plain, b"<metadata/>").unwrap();
        let mut text = String::new();
        open_gzip_or_plain(&plain).unwrap().read_to_string(&mut text).unwrap();
        assert_eq!(text, "<metadata/>");

        let empty = dir.path().join("c.xml.gz");
        std::fs::write(&empty, b"").unwrap();
        let mut text = String::new();
        open_gzip_or_plain(&empty).unwrap().read_to_string(&mut text).unwrap();
        assert!(text.is_empty());
    }
}
