//! Byte-level equality of two files with as little re-reading as possible.
//!
//! With a checksum already known for the second file only the first file is
//! streamed and digested. Otherwise both files are read chunk by chunk in lock
//! step, bailing out at the first difference, while the first file's digest is
//! accumulated so the result can seed the checksum cache.

use crate::error::{Error, Result};
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::Path;
use tracing::trace;

/// BLAKE3 digest of a file's content.
pub type Checksum = blake3::Hash;

/// Read size for streaming comparison and hashing (64KB).
const CHUNK_SIZE: usize = 64 * 1024;

/// Compare `file_a` with `file_b`.
///
/// Returns `Ok(Some(checksum))` when the files are byte-identical, `Ok(None)` when
/// they differ (including differing lengths). Fails with [`Error::Missing`] if either
/// path does not exist when the call is made or disappears before it is opened.
pub fn compare(
    file_a: &Path,
    file_b: &Path,
    known_checksum_b: Option<&Checksum>,
    single_pass: bool,
) -> Result<Option<Checksum>> {
    let len_a = file_len(file_a)?;
    let len_b = file_len(file_b)?;

    if len_a != len_b {
        trace!(
            "Length mismatch {} ({}) vs {} ({})",
            file_a.display(),
            len_a,
            file_b.display(),
            len_b
        );
        return Ok(None);
    }

    if let Some(known) = known_checksum_b {
        return matches_checksum(file_a, known);
    }

    if single_pass {
        compare_streams(file_a, file_b)
    } else {
        let checksum_a = checksum_file(file_a)?;
        let checksum_b = checksum_file(file_b)?;
        Ok((checksum_a == checksum_b).then_some(checksum_a))
    }
}

/// Digest of the whole file.
pub fn checksum_file(path: &Path) -> Result<Checksum> {
    let mut reader = open(path)?;
    let mut hasher = blake3::Hasher::new();
    let mut buffer = vec![0u8; CHUNK_SIZE];
    loop {
        let read = fill_chunk(&mut reader, &mut buffer).map_err(|e| read_error(path, e))?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }
    Ok(hasher.finalize())
}

fn matches_checksum(file_a: &Path, known: &Checksum) -> Result<Option<Checksum>> {
    let checksum = checksum_file(file_a)?;
    Ok((checksum == *known).then_some(checksum))
}

fn compare_streams(file_a: &Path, file_b: &Path) -> Result<Option<Checksum>> {
    let mut reader_a = open(file_a)?;
    let mut reader_b = open(file_b)?;
    let mut buffer_a = vec![0u8; CHUNK_SIZE];
    let mut buffer_b = vec![0u8; CHUNK_SIZE];
    let mut hasher = blake3::Hasher::new();

    loop {
        let read_a = fill_chunk(&mut reader_a, &mut buffer_a).map_err(|e| read_error(file_a, e))?;
        let read_b = fill_chunk(&mut reader_b, &mut buffer_b).map_err(|e| read_error(file_b, e))?;

        if read_a != read_b || buffer_a[..read_a] != buffer_b[..read_b] {
            trace!(
                "Content differs: {} vs {}",
                file_a.display(),
                file_b.display()
            );
            return Ok(None);
        }
        if read_a == 0 {
            return Ok(Some(hasher.finalize()));
        }
        hasher.update(&buffer_a[..read_a]);
    }
}

fn file_len(path: &Path) -> Result<u64> {
    match fs::metadata(path) {
        Ok(metadata) => Ok(metadata.len()),
        Err(err) => Err(read_error(path, err)),
    }
}

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|err| read_error(path, err))
}

fn read_error(path: &Path, err: io::Error) -> Error {
    if err.kind() == io::ErrorKind::NotFound {
        Error::Missing(path.to_path_buf())
    } else {
        Error::FileRead {
            path: path.to_path_buf(),
            source: err,
        }
    }
}

/// Read until `buffer` is full or the reader is exhausted, so chunk boundaries of
/// two readers stay aligned regardless of short reads.
fn fill_chunk(reader: &mut impl Read, buffer: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buffer.len() {
        match reader.read(&mut buffer[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}
