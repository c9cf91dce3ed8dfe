//! Gzip a rotated backup in place

use flate2::write::GzEncoder;
use flate2::Compression;
use rollfile_core::{Error, Result};
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::backup::compressed_path;

/// Compress `src` into `src.gz` and remove `src`.
///
/// The original is only removed once the compressed copy has been fully
/// written and synced. On failure the partial `.gz` is removed and `src` is
/// left untouched.
pub fn compress_file(src: &Path) -> Result<PathBuf> {
    let dst = compressed_path(src);

    if let Err(source) = write_compressed(src, &dst) {
        if let Err(e) = fs::remove_file(&dst) {
            if e.kind() != io::ErrorKind::NotFound {
                debug!("Could not discard partial {}: {}", dst.display(), e);
            }
        }
        return Err(Error::Compression {
            path: src.to_path_buf(),
            source,
        });
    }

    fs::remove_file(src).map_err(|source| Error::Remove {
        path: src.to_path_buf(),
        source,
    })?;

    debug!("Compressed {} -> {}", src.display(), dst.display());
    Ok(dst)
}

fn write_compressed(src: &Path, dst: &Path) -> io::Result<()> {
    let mut input = File::open(src)?;
    let permissions = input.metadata()?.permissions();

    let output = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(dst)?;

    let mut encoder = GzEncoder::new(output, Compression::default());
    io::copy(&mut input, &mut encoder)?;
    let output = encoder.finish()?;
    output.sync_all()?;

    fs::set_permissions(dst, permissions)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;
    use tempfile::TempDir;

    fn gunzip(path: &Path) -> Vec<u8> {
        let mut decoder = GzDecoder::new(File::open(path).unwrap());
        let mut out = Vec::new();
        decoder.read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn test_compress_replaces_original() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("foo-2014-05-04T14-44-33.555-size.log");
        fs::write(&src, b"boo!").unwrap();

        let dst = compress_file(&src).unwrap();

        assert_eq!(dst, dir.path().join("foo-2014-05-04T14-44-33.555-size.log.gz"));
        assert!(!src.exists());
        assert_eq!(gunzip(&dst), b"boo!");
    }

    #[test]
    fn test_compress_overwrites_partial_output() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("foo-2014-05-04T14-44-33.555-size.log");
        fs::write(&src, b"foo!").unwrap();
        fs::write(compressed_path(&src), b"").unwrap();

        let dst = compress_file(&src).unwrap();

        assert!(!src.exists());
        assert_eq!(gunzip(&dst), b"foo!");
    }

    #[test]
    fn test_compress_missing_source() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("gone.log");

        let err = compress_file(&src).unwrap_err();

        assert!(matches!(err, Error::Compression { .. }));
        assert!(err.is_not_found());
        assert!(!compressed_path(&src).exists());
    }

    #[test]
    fn test_failed_read_discards_partial_output() {
        let dir = TempDir::new().unwrap();
        // opens fine on Linux, but reading it fails after the .gz was created
        let src = dir.path().join("foo-2014-05-04T14-44-33.555-size.log");
        fs::create_dir(&src).unwrap();

        let err = compress_file(&src).unwrap_err();

        assert!(matches!(err, Error::Compression { .. }));
        assert!(!compressed_path(&src).exists());
        assert!(src.is_dir());
    }

    #[test]
    fn test_unwritable_destination_keeps_original() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("foo-2014-05-04T14-44-33.555-size.log");
        fs::write(&src, b"keep me").unwrap();
        fs::create_dir(compressed_path(&src)).unwrap();

        let err = compress_file(&src).unwrap_err();

        assert!(matches!(err, Error::Compression { .. }));
        assert_eq!(fs::read(&src).unwrap(), b"keep me");
        assert!(compressed_path(&src).is_dir());
    }

    #[test]
    fn test_compress_large_input() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("big.log");
        let content: Vec<u8> = (0..200_000u32).flat_map(|i| i.to_le_bytes()).collect();
        fs::write(&src, &content).unwrap();

        let dst = compress_file(&src).unwrap();

        assert_eq!(gunzip(&dst), content);
        assert!(fs::metadata(&dst).unwrap().len() < content.len() as u64);
    }
}
