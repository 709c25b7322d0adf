//! SHA-256 digests of finished artefacts.

use crate::error::{ReleaseError, Result};
use camino::Utf8Path;
use sha2::{Digest, Sha256};
use std::fs;
use std::io::Read;

/// Compute the lowercase hex SHA-256 digest of the file at `path`.
///
/// # Errors
///
/// Returns [`ReleaseError::FileSystem`] if the file cannot be read.
pub fn sha256_file(path: &Utf8Path) -> Result<String> {
    let context = || format!("failed to hash {path}");

    let mut file = fs::File::open(path).map_err(|e| ReleaseError::file_system(context(), e))?;
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];
    loop {
        let bytes_read = file
            .read(&mut buffer)
            .map_err(|e| ReleaseError::file_system(context(), e))?;
        let Some(chunk) = buffer.get(..bytes_read).filter(|chunk| !chunk.is_empty()) else {
            break;
        };
        hasher.update(chunk);
    }
    Ok(format!("{:x}", hasher.finalize()))
}
