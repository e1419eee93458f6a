use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct StoredFile {
    pub name: String,
    /// `<public prefix>/<name>`, what callers keep and link to.
    pub path: String,
    pub digest: String,
    pub size: u64,
    /// True when an identical file was already stored and nothing was written.
    pub deduplicated: bool,
    pub stored_at: DateTime<Utc>,
}

impl StoredFile {
    pub fn new(
        name: impl Into<String>,
        public_prefix: &str,
        digest: impl Into<String>,
        size: u64,
        deduplicated: bool,
        stored_at: DateTime<Utc>,
    ) -> Self {
        let name = name.into();
        Self {
            path: format!("{}/{}", public_prefix, name),
            name,
            digest: digest.into(),
            size,
            deduplicated,
            stored_at,
        }
    }
}
