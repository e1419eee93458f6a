//! Content sniffing for uploaded images.
//!
//! The extension we trust is the one derived from the file's leading bytes,
//! never the one the client typed.

use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Enough bytes to recognise every signature below.
const SNIFF_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SniffedFormat {
    Jpeg,
    Png,
    Gif,
    Webp,
    Bmp,
    Tiff,
    Pdf,
}

impl SniffedFormat {
    pub fn from_magic_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 4 {
            return None;
        }

        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }
        if bytes.starts_with(b"\x89PNG\r\n\x1a\n") {
            return Some(Self::Png);
        }
        if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            return Some(Self::Gif);
        }
        // RIFF container, "WEBP" fourcc at offset 8
        if bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP" {
            return Some(Self::Webp);
        }
        if bytes.starts_with(b"BM") {
            return Some(Self::Bmp);
        }
        if bytes.starts_with(b"II*\0") || bytes.starts_with(b"MM\0*") {
            return Some(Self::Tiff);
        }
        if bytes.starts_with(b"%PDF") {
            return Some(Self::Pdf);
        }

        None
    }

    /// Reads the head of the file at `path`. Unreadable files are simply not
    /// recognised.
    pub fn from_path(path: &Path) -> Option<Self> {
        let mut head = Vec::with_capacity(SNIFF_LEN);
        let file = File::open(path).ok()?;
        file.take(SNIFF_LEN as u64).read_to_end(&mut head).ok()?;
        Self::from_magic_bytes(&head)
    }

    /// Preferred extension for the format, `jpg` rather than `jpeg` or `jpe`.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Webp => "webp",
            Self::Bmp => "bmp",
            Self::Tiff => "tif",
            Self::Pdf => "pdf",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn recognises_common_images() {
        assert_eq!(
            SniffedFormat::from_magic_bytes(b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR"),
            Some(SniffedFormat::Png)
        );
        assert_eq!(
            SniffedFormat::from_magic_bytes(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10]),
            Some(SniffedFormat::Jpeg)
        );
        assert_eq!(
            SniffedFormat::from_magic_bytes(b"GIF89a\x01\x00"),
            Some(SniffedFormat::Gif)
        );
        assert_eq!(
            SniffedFormat::from_magic_bytes(b"RIFF\x24\0\0\0WEBPVP8 "),
            Some(SniffedFormat::Webp)
        );
    }

    #[test]
    fn riff_without_webp_fourcc_is_unknown() {
        assert_eq!(SniffedFormat::from_magic_bytes(b"RIFF\x24\0\0\0WAVEfmt "), None);
    }

    #[test]
    fn short_or_plain_input_is_unknown() {
        assert_eq!(SniffedFormat::from_magic_bytes(b"\xFF\xD8"), None);
        assert_eq!(SniffedFormat::from_magic_bytes(b"hello world"), None);
    }

    #[test]
    fn jpeg_prefers_jpg_extension() {
        assert_eq!(SniffedFormat::Jpeg.extension(), "jpg");
    }

    #[test]
    fn sniffs_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"GIF87a rest of the image").unwrap();
        assert_eq!(
            SniffedFormat::from_path(file.path()),
            Some(SniffedFormat::Gif)
        );
        assert_eq!(
            SniffedFormat::from_path(Path::new("/definitely/not/here")),
            None
        );
    }
}
