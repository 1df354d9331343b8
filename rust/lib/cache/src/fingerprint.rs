//! SHA-256 content fingerprints, lowercase hex.

use std::fs;
use std::io;
use std::path::Path;

use sha2::{Digest, Sha256};

pub fn fingerprint(bytes: &[u8]) -> String {
    hex_encode(&Sha256::digest(bytes))
}

pub fn fingerprint_file(path: &Path) -> io::Result<String> {
    fs::read(path).map(|bytes| fingerprint(&bytes))
}

/// Incremental fingerprint over a sequence of named fields.
///
/// Each field is length-prefixed, so `("ab", "c")` and `("a", "bc")` differ.
#[derive(Debug, Clone, Default)]
pub struct Fingerprinter {
    hasher: Sha256,
}

impl Fingerprinter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(&mut self, name: &str, value: &str) -> &mut Self {
        for part in [name, value] {
            self.hasher.update((part.len() as u64).to_le_bytes());
            self.hasher.update(part.as_bytes());
        }
        self
    }

    pub fn finish(&self) -> String {
        hex_encode(&self.hasher.clone().finalize())
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        s.push_str(&format!("{:02x}", b));
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_digest() {
        assert_eq!(
            fingerprint(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn fields_are_delimited() {
        let a = Fingerprinter::new().field("k", "ab").field("k", "c").finish();
        let b = Fingerprinter::new().field("k", "a").field("k", "bc").finish();
        assert_ne!(a, b);
        let again = Fingerprinter::new().field("k", "ab").field("k", "c").finish();
        assert_eq!(a, again);
    }

    #[test]
    fn file_fingerprint_matches_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.h");
        fs::write(&path, "void Foo();").unwrap();
        assert_eq!(fingerprint_file(&path).unwrap(), fingerprint(b"void Foo();"));
        assert!(fingerprint_file(&dir.path().join("missing.h")).is_err());
    }
}
