//! Lookup of stored files by content digest.
//!
//! [`DigestIndex`] is rebuilt from the storage directory when the uploader
//! opens and kept current as files are stored. [`scan_for`] walks and hashes
//! the whole directory on every call and is kept as the baseline the index is
//! checked against.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use super::digest::ContentDigest;
use crate::error::UploadError;

#[derive(Debug, Default)]
pub struct DigestIndex {
    by_digest: HashMap<ContentDigest, String>,
}

impl DigestIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hashes every stored file under `dir`. When two stored files share a
    /// digest the first one listed wins; listing order is whatever the
    /// filesystem returns.
    pub fn rebuild(dir: &Path) -> Result<Self, UploadError> {
        let mut index = DigestIndex::new();

        for (name, path) in stored_entries(dir)? {
            let digest = match ContentDigest::of_file(&path) {
                Ok(digest) => digest,
                Err(e) => {
                    tracing::warn!(name = %name, error = %e, "Skipping unreadable stored file");
                    continue;
                }
            };

            if let Some(existing) = index.get(&digest) {
                tracing::warn!(
                    name = %name,
                    existing = %existing,
                    digest = %digest,
                    "Stored files share a digest, keeping the first"
                );
                continue;
            }
            index.insert(digest, name);
        }

        tracing::debug!(dir = %dir.display(), entries = index.len(), "Digest index rebuilt");
        Ok(index)
    }

    pub fn get(&self, digest: &ContentDigest) -> Option<&str> {
        self.by_digest.get(digest).map(String::as_str)
    }

    /// Returns false and leaves the index untouched when the digest is
    /// already present.
    pub fn insert(&mut self, digest: ContentDigest, name: impl Into<String>) -> bool {
        match self.by_digest.entry(digest) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(name.into());
                true
            }
        }
    }

    pub fn remove(&mut self, digest: &ContentDigest) -> Option<String> {
        self.by_digest.remove(digest)
    }

    pub fn len(&self) -> usize {
        self.by_digest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_digest.is_empty()
    }
}

/// Returns the first stored file under `dir` whose digest is `digest`.
pub fn scan_for(dir: &Path, digest: &ContentDigest) -> Result<Option<String>, UploadError> {
    for (name, path) in stored_entries(dir)? {
        match ContentDigest::of_file(&path) {
            Ok(found) if found == *digest => return Ok(Some(name)),
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(name = %name, error = %e, "Skipping unreadable stored file");
            }
        }
    }
    Ok(None)
}

/// Regular, non-hidden files directly under `dir`. A directory that does not
/// exist yet holds nothing.
fn stored_entries(dir: &Path) -> Result<Vec<(String, PathBuf)>, UploadError> {
    let read_dir = match fs::read_dir(dir) {
        Ok(read_dir) => read_dir,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(UploadError::read(dir, e)),
    };

    let mut entries = Vec::new();
    for entry in read_dir {
        let entry = entry.map_err(|e| UploadError::read(dir, e))?;

        // subdirectories and sockets are never stored files
        match entry.file_type() {
            Ok(file_type) if file_type.is_file() => {}
            _ => continue,
        }

        let Ok(name) = entry.file_name().into_string() else {
            tracing::warn!(path = %entry.path().display(), "Skipping non UTF-8 file name");
            continue;
        };
        // generated names never start with a dot, in-flight temp files do
        if name.starts_with('.') {
            continue;
        }
        entries.push((name, entry.path()));
    }
    Ok(entries)
}
