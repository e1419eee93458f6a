use std::collections::HashMap;
use std::path::Path;

use actix_multipart::form::tempfile::TempFile;
use mime_guess::{from_path, mime::Mime};
use tempfile::NamedTempFile;

use super::sniff::SniffedFormat;

/// A file the client sent us, still sitting in its temporary location.
///
/// The temporary file is removed when the handle is dropped unless the
/// uploader persists it first.
#[derive(Debug)]
pub struct UploadedFile {
    original_name: String,
    client_mime_type: Mime,
    file: NamedTempFile,
}

impl UploadedFile {
    pub fn new(original_name: impl Into<String>, file: NamedTempFile) -> Self {
        let original_name = original_name.into();
        let client_mime_type = from_path(&original_name).first_or_octet_stream();
        Self {
            original_name,
            client_mime_type,
            file,
        }
    }

    pub fn from_temp_file(temp: TempFile) -> Self {
        let original_name = temp.file_name.unwrap_or_default();
        let client_mime_type = temp
            .content_type
            .unwrap_or_else(|| from_path(&original_name).first_or_octet_stream());
        Self {
            original_name,
            client_mime_type,
            file: temp.file,
        }
    }

    /// Name as typed on the client machine. Never trusted for storage.
    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    /// Original name without its last extension.
    pub fn original_stem(&self) -> &str {
        Path::new(&self.original_name)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("")
    }

    /// MIME type the client declared, or the one its file name suggests.
    /// Only reported, never trusted.
    pub fn client_mime_type(&self) -> &Mime {
        &self.client_mime_type
    }

    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Extension derived from the file contents, `None` when the format is
    /// not recognised.
    pub fn guess_extension(&self) -> Option<&'static str> {
        SniffedFormat::from_path(self.path()).map(SniffedFormat::extension)
    }

    pub(crate) fn into_temp_file(self) -> NamedTempFile {
        self.file
    }
}

#[derive(Debug)]
pub enum FormValue {
    Text(String),
    File(UploadedFile),
}

/// Submitted form fields keyed by name.
#[derive(Debug, Default)]
pub struct UploadForm {
    fields: HashMap<String, FormValue>,
}

impl UploadForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_text(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(name.into(), FormValue::Text(value.into()));
    }

    pub fn insert_file(&mut self, name: impl Into<String>, file: UploadedFile) {
        self.fields.insert(name.into(), FormValue::File(file));
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.fields.get(name) {
            Some(FormValue::Text(value)) => Some(value.as_str()),
            _ => None,
        }
    }

    /// Removes and returns the file under `name`. A text field with that
    /// name is left in place.
    pub fn take_file(&mut self, name: &str) -> Option<UploadedFile> {
        if !matches!(self.fields.get(name), Some(FormValue::File(_))) {
            return None;
        }
        match self.fields.remove(name) {
            Some(FormValue::File(file)) => Some(file),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn temp_with(bytes: &[u8]) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(bytes).unwrap();
        file
    }

    #[test]
    fn stem_drops_only_the_last_extension() {
        let file = UploadedFile::new("café déjà.PNG", temp_with(b""));
        assert_eq!(file.original_stem(), "café déjà");

        let file = UploadedFile::new("archive.tar.gz", temp_with(b""));
        assert_eq!(file.original_stem(), "archive.tar");

        let file = UploadedFile::new("", temp_with(b""));
        assert_eq!(file.original_stem(), "");
    }

    #[test]
    fn extension_comes_from_content_not_name() {
        let file = UploadedFile::new("holiday.gif", temp_with(b"\x89PNG\r\n\x1a\nbody"));
        assert_eq!(file.guess_extension(), Some("png"));
        assert_eq!(file.client_mime_type().essence_str(), "image/gif");
    }

    #[test]
    fn unknown_content_has_no_extension() {
        let file = UploadedFile::new("notes.png", temp_with(b"just some text"));
        assert_eq!(file.guess_extension(), None);
    }

    #[test]
    fn take_file_ignores_text_fields() {
        let mut form = UploadForm::new();
        form.insert_text("title", "Holiday");
        form.insert_file("image", UploadedFile::new("a.png", temp_with(b"x")));

        assert!(form.take_file("title").is_none());
        assert_eq!(form.text("title"), Some("Holiday"));
        assert!(form.take_file("missing").is_none());
        assert!(form.take_file("image").is_some());
        assert!(form.take_file("image").is_none());
    }
}
