//! File hashing for snapshot checksums and archive integrity.

use craftsync_core::{Error, Result};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io;
use std::path::Path;

/// Calculates the SHA-256 of a file as 64 lowercase hex characters.
///
/// The file is streamed, so large world archives hash without loading into
/// memory. Failures surface as [`Error::HashFailed`] with the offending path.
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .map_err(|e| Error::hash_failed(path.display().to_string(), e.to_string()))?;

    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)
        .map_err(|e| Error::hash_failed(path.display().to_string(), e.to_string()))?;

    Ok(format!("{:x}", hasher.finalize()))
}
