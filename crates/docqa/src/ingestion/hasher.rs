//! Streaming content fingerprints

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::ContentHash;

/// Bytes read per iteration
pub const READ_BLOCK_SIZE: usize = 8192;

/// Hash everything a reader yields, one fixed-size block at a time
pub fn hash_reader<R: Read>(mut reader: R, label: &str) -> Result<ContentHash> {
    let mut hasher = Sha256::new();
    let mut buf = [0u8; READ_BLOCK_SIZE];

    loop {
        match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => hasher.update(&buf[..n]),
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(Error::read(label, e)),
        }
    }

    Ok(ContentHash::from_hex(hex::encode(hasher.finalize())))
}

/// Hash a file on disk
pub fn hash_file(path: &Path) -> Result<ContentHash> {
    let label = path.display().to_string();
    let file = File::open(path).map_err(|e| Error::read(&label, e))?;
    hash_reader(file, &label)
}

/// Hash an in-memory buffer
pub fn hash_bytes(data: &[u8]) -> ContentHash {
    ContentHash::from_hex(hex::encode(Sha256::digest(data)))
}
