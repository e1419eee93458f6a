use std::fmt;
use std::fs::File;
use std::io;
use std::path::Path;

use md5::{Digest, Md5};

/// MD5 of a file's bytes. Only used to spot accidental duplicates, it is
/// not an integrity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentDigest([u8; 16]);

impl ContentDigest {
    pub fn of_bytes(bytes: &[u8]) -> Self {
        Self::from_hasher(Md5::new_with_prefix(bytes))
    }

    pub fn of_file(path: &Path) -> io::Result<Self> {
        let mut file = File::open(path)?;
        let mut hasher = Md5::new();
        io::copy(&mut file, &mut hasher)?;
        Ok(Self::from_hasher(hasher))
    }

    fn from_hasher(hasher: Md5) -> Self {
        let mut out = [0u8; 16];
        out.copy_from_slice(&hasher.finalize());
        ContentDigest(out)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn matches_known_md5_values() {
        assert_eq!(
            ContentDigest::of_bytes(b"").to_hex(),
            "d41d8cd98f00b204e9800998ecf8427e"
        );
        assert_eq!(
            ContentDigest::of_bytes(b"abc").to_string(),
            "900150983cd24fb0d6963f7d28e17f72"
        );
    }

    #[test]
    fn file_digest_equals_byte_digest() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"abc").unwrap();
        assert_eq!(
            ContentDigest::of_file(file.path()).unwrap(),
            ContentDigest::of_bytes(b"abc")
        );
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(ContentDigest::of_file(Path::new("/no/such/upload")).is_err());
    }
}
