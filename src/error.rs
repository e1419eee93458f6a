use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// The sniffed extension is not one the uploader accepts. Nothing on disk
    /// has been touched when this is returned.
    #[error(
        "unsupported file type `{}`, allowed types are: {}",
        .extension.as_deref().unwrap_or("unknown"),
        .allowed.join(", ")
    )]
    UnsupportedType {
        extension: Option<String>,
        allowed: Vec<String>,
    },

    #[error("failed to move uploaded file: {source}")]
    Move {
        #[source]
        source: io::Error,
    },

    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl UploadError {
    pub(crate) fn read(path: impl Into<PathBuf>, source: io::Error) -> Self {
        UploadError::Read {
            path: path.into(),
            source,
        }
    }
}
