//! SHA-256 verification of fetched bundles.

use std::path::Path;

use sha2::{Digest, Sha256};
use tokio::fs::File;
use tokio::io::AsyncReadExt;

use super::error::{TransferError, TransferResult};

/// Read buffer size (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Lowercase hex SHA-256 of a file's contents.
pub async fn calculate_file_checksum(path: &Path) -> TransferResult<String> {
    let mut file = File::open(path)
        .await
        .map_err(|e| TransferError::io(path, e))?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = file
            .read(&mut buffer)
            .await
            .map_err(|e| TransferError::io(path, e))?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Check a file against an expected checksum.
pub async fn verify_checksum(path: &Path, file_name: &str, expected: &str) -> TransferResult<()> {
    let actual = calculate_file_checksum(path).await?;
    if !actual.eq_ignore_ascii_case(expected) {
        return Err(TransferError::ChecksumMismatch {
            file_name: file_name.to_string(),
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(())
}
