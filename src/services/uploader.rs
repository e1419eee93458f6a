use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use super::digest::ContentDigest;
use super::digest_index::{scan_for, DigestIndex};
use crate::error::UploadError;
use crate::models::StoredFile;
use crate::utils::slug::{AsciiSlugger, Slugger};
use crate::utils::upload_file::{UploadForm, UploadedFile};

pub const DEFAULT_ALLOWED_EXTENSIONS: [&str; 3] = ["jpeg", "png", "jpg"];
pub const DEFAULT_PUBLIC_PREFIX: &str = "uploads";

/// Used when a client name slugs down to nothing, e.g. `!!!.png`.
const FALLBACK_SLUG: &str = "file";

/// How an incoming file is matched against what is already stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LookupMode {
    /// Digest index built when the uploader opens.
    #[default]
    Indexed,
    /// Rehash the whole directory on every lookup.
    Scan,
}

impl FromStr for LookupMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "indexed" | "index" => Ok(LookupMode::Indexed),
            "scan" => Ok(LookupMode::Scan),
            other => Err(format!("unknown lookup mode `{}`", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UploaderConfig {
    pub target_dir: PathBuf,
    pub public_prefix: String,
    pub allowed_extensions: Vec<String>,
    pub lookup_mode: LookupMode,
}

impl UploaderConfig {
    pub fn new(target_dir: impl Into<PathBuf>) -> Self {
        UploaderConfig {
            target_dir: target_dir.into(),
            public_prefix: DEFAULT_PUBLIC_PREFIX.to_string(),
            allowed_extensions: DEFAULT_ALLOWED_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            lookup_mode: LookupMode::default(),
        }
    }

    pub fn public_prefix(mut self, prefix: &str) -> Self {
        self.public_prefix = prefix.trim_matches('/').to_string();
        self
    }

    pub fn allowed_extensions<I, T>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.allowed_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn lookup_mode(mut self, mode: LookupMode) -> Self {
        self.lookup_mode = mode;
        self
    }
}

/// Stores uploaded images in one flat directory, never keeping two copies of
/// the same bytes.
pub struct Uploader<S = AsciiSlugger> {
    config: UploaderConfig,
    slugger: S,
    // held from the duplicate check until the new file is in place
    index: Mutex<DigestIndex>,
}

impl Uploader<AsciiSlugger> {
    pub fn with_default_slugger(config: UploaderConfig) -> Result<Self, UploadError> {
        Uploader::open(config, AsciiSlugger::default())
    }
}

impl<S: Slugger> Uploader<S> {
    pub fn open(config: UploaderConfig, slugger: S) -> Result<Self, UploadError> {
        let index = match config.lookup_mode {
            LookupMode::Indexed => DigestIndex::rebuild(&config.target_dir)?,
            LookupMode::Scan => DigestIndex::new(),
        };

        tracing::info!(
            target_dir = %config.target_dir.display(),
            mode = ?config.lookup_mode,
            indexed = index.len(),
            "Uploader ready"
        );

        Ok(Uploader {
            config,
            slugger,
            index: Mutex::new(index),
        })
    }

    pub fn target_dir(&self) -> &Path {
        &self.config.target_dir
    }

    pub fn validate(&self, file: &UploadedFile) -> Result<(), UploadError> {
        match file.guess_extension() {
            Some(ext) if self.config.allowed_extensions.iter().any(|allowed| allowed == ext) => {
                Ok(())
            }
            guessed => {
                tracing::debug!(
                    name = %file.original_name(),
                    client_mime = %file.client_mime_type(),
                    guessed = ?guessed,
                    "Rejected upload"
                );
                Err(UploadError::UnsupportedType {
                    extension: guessed.map(str::to_string),
                    allowed: self.config.allowed_extensions.clone(),
                })
            }
        }
    }

    /// Name of a stored file with the same bytes as `file`, if any.
    pub fn find_existing(&self, file: &UploadedFile) -> Result<Option<String>, UploadError> {
        let digest = digest_of(file)?;
        let mut index = self.index.lock();
        self.find_by_digest(&mut index, &digest)
    }

    /// `<slug>-<token>.<ext>` where the token is a lowercased ULID. The name
    /// is not checked against the directory.
    pub fn generate_name(&self, file: &UploadedFile) -> Result<String, UploadError> {
        let ext = file
            .guess_extension()
            .ok_or_else(|| UploadError::UnsupportedType {
                extension: None,
                allowed: self.config.allowed_extensions.clone(),
            })?;

        let slug = self.slugger.slug(file.original_stem());
        let slug = if slug.is_empty() {
            FALLBACK_SLUG
        } else {
            slug.as_str()
        };
        let token = ulid::Ulid::new().to_string().to_lowercase();

        Ok(format!("{}-{}.{}", slug, token, ext))
    }

    /// Stores the file submitted under `field_name` and returns its public
    /// path. `Ok(None)` when the form has no file under that name.
    pub fn upload(
        &self,
        field_name: &str,
        form: &mut UploadForm,
    ) -> Result<Option<String>, UploadError> {
        let Some(file) = form.take_file(field_name) else {
            tracing::debug!(field = %field_name, "No file submitted");
            return Ok(None);
        };

        self.upload_file(file).map(|stored| Some(stored.path))
    }

    pub fn upload_file(&self, file: UploadedFile) -> Result<StoredFile, UploadError> {
        self.validate(&file)?;

        let digest = digest_of(&file)?;
        let size = file
            .path()
            .metadata()
            .map_err(|e| UploadError::read(file.path(), e))?
            .len();

        let mut index = self.index.lock();

        if let Some(existing) = self.find_by_digest(&mut index, &digest)? {
            tracing::debug!(name = %existing, digest = %digest, "Duplicate upload, reusing stored file");
            let stored_at = modified_at(&self.config.target_dir.join(&existing));
            // dropping `file` removes the temporary copy
            return Ok(StoredFile::new(
                existing,
                &self.config.public_prefix,
                digest.to_hex(),
                size,
                true,
                stored_at,
            ));
        }

        let name = self.generate_name(&file)?;
        self.persist(file, &name)?;

        if self.config.lookup_mode == LookupMode::Indexed {
            index.insert(digest, name.clone());
        }

        tracing::info!(name = %name, digest = %digest, size, "Stored upload");
        Ok(StoredFile::new(
            name,
            &self.config.public_prefix,
            digest.to_hex(),
            size,
            false,
            Utc::now(),
        ))
    }

    fn find_by_digest(
        &self,
        index: &mut DigestIndex,
        digest: &ContentDigest,
    ) -> Result<Option<String>, UploadError> {
        match self.config.lookup_mode {
            LookupMode::Scan => scan_for(&self.config.target_dir, digest),
            LookupMode::Indexed => {
                let Some(name) = index.get(digest).map(str::to_string) else {
                    return Ok(None);
                };

                // the stored file may have been rewritten or removed since it was indexed
                match ContentDigest::of_file(&self.config.target_dir.join(&name)) {
                    Ok(current) if current == *digest => Ok(Some(name)),
                    Ok(current) => {
                        tracing::warn!(name = %name, digest = %current, "Indexed file changed, reindexing it");
                        index.remove(digest);
                        index.insert(current, name);
                        Ok(None)
                    }
                    Err(e) => {
                        tracing::warn!(name = %name, error = %e, "Indexed file is gone, dropping it from the index");
                        index.remove(digest);
                        Ok(None)
                    }
                }
            }
        }
    }

    fn persist(&self, file: UploadedFile, name: &str) -> Result<(), UploadError> {
        let dir = &self.config.target_dir;
        fs::create_dir_all(dir).map_err(|source| UploadError::Move { source })?;

        let destination = dir.join(name);
        match file.into_temp_file().persist_noclobber(&destination) {
            Ok(_) => Ok(()),
            Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => {
                Err(UploadError::Move { source: e.error })
            }
            Err(e) => {
                // rename does not cross filesystems
                tracing::debug!(error = %e.error, "Rename failed, copying upload instead");
                copy_noclobber(e.file.path(), &destination)
                    .map_err(|source| UploadError::Move { source })
            }
        }
    }
}

fn digest_of(file: &UploadedFile) -> Result<ContentDigest, UploadError> {
    ContentDigest::of_file(file.path()).map_err(|e| UploadError::read(file.path(), e))
}

fn modified_at(path: &Path) -> DateTime<Utc> {
    path.metadata()
        .and_then(|meta| meta.modified())
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now())
}

fn copy_noclobber(from: &Path, to: &Path) -> io::Result<()> {
    let mut source = File::open(from)?;
    let mut target = OpenOptions::new().write(true).create_new(true).open(to)?;

    if let Err(e) = io::copy(&mut source, &mut target).and_then(|_| target.sync_all()) {
        let _ = fs::remove_file(to);
        return Err(e);
    }
    Ok(())
}
