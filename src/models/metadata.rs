use std::{
    fs::File,
    io::{BufReader, Read},
    path::Path,
};

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

pub fn compute_sha256(path: &Path) -> Result<String> {
    let file =
        File::open(path).with_context(|| format!("open file for hashing: {}", path.display()))?;
    let mut reader = BufReader::new(file);
    let mut hasher = Sha256::new();
    let mut buffer = [0u8; 8192];

    loop {
        let read = reader.read(&mut buffer).context("hash read")?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// Catalog hashes are upper-case hex, ours are lower-case.
pub fn checksum_matches(expected: &str, actual: &str) -> bool {
    expected.trim().eq_ignore_ascii_case(actual)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn hashes_file_contents() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("abc.txt");
        std::fs::write(&path, b"abc").unwrap();
        assert_eq!(
            compute_sha256(&path).unwrap(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn comparison_ignores_case() {
        assert!(checksum_matches("BA7816BF", "ba7816bf"));
        assert!(!checksum_matches("BA7816BF", "ba7816be"));
    }
}
