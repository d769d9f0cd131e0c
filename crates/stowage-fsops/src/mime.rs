//! Extension-based MIME classification for listed content.

use std::path::Path;

/// MIME type reported when an extension is unknown.
pub const OCTET_STREAM: &str = "application/octet-stream";

const MIME_TABLE: &[(&str, &str)] = &[
    ("mkv", "video/x-matroska"),
    ("mp4", "video/mp4"),
    ("m4v", "video/x-m4v"),
    ("avi", "video/x-msvideo"),
    ("mov", "video/quicktime"),
    ("webm", "video/webm"),
    ("wmv", "video/x-ms-wmv"),
    ("flv", "video/x-flv"),
    ("mpg", "video/mpeg"),
    ("mpeg", "video/mpeg"),
    ("ts", "video/mp2t"),
    ("mp3", "audio/mpeg"),
    ("flac", "audio/flac"),
    ("wav", "audio/x-wav"),
    ("ogg", "audio/ogg"),
    ("m4a", "audio/mp4"),
    ("aac", "audio/aac"),
    ("opus", "audio/opus"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("gif", "image/gif"),
    ("webp", "image/webp"),
    ("bmp", "image/bmp"),
    ("svg", "image/svg+xml"),
    ("txt", "text/plain"),
    ("nfo", "text/plain"),
    ("srt", "application/x-subrip"),
    ("html", "text/html"),
    ("json", "application/json"),
    ("pdf", "application/pdf"),
    ("epub", "application/epub+zip"),
    ("zip", "application/zip"),
    ("rar", "application/vnd.rar"),
    ("7z", "application/x-7z-compressed"),
    ("tar", "application/x-tar"),
    ("gz", "application/gzip"),
    ("iso", "application/x-iso9660-image"),
    ("torrent", "application/x-bittorrent"),
];

const ARCHIVE_EXTENSIONS: &[&str] = &["zip", "rar", "7z", "tar", "gz"];

/// Lower-cased extension including the leading dot, or an empty string.
#[must_use]
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_ascii_lowercase()))
        .unwrap_or_default()
}

/// Best-effort MIME type for `path`.
#[must_use]
pub fn mime_type_for(path: &Path) -> &'static str {
    let Some(ext) = path.extension().map(|ext| ext.to_string_lossy().to_ascii_lowercase()) else {
        return OCTET_STREAM;
    };
    MIME_TABLE
        .iter()
        .find(|(known, _)| *known == ext)
        .map_or(OCTET_STREAM, |(_, mime)| mime)
}

/// Media classification flags derived from MIME type and extension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MediaKind {
    /// MIME type is `video/*`.
    pub video: bool,
    /// MIME type is `audio/*`.
    pub audio: bool,
    /// MIME type is `image/*`.
    pub image: bool,
    /// Extension names a common archive container.
    pub archive: bool,
}

impl MediaKind {
    /// Classify `path`.
    #[must_use]
    pub fn classify(path: &Path) -> Self {
        let mime = mime_type_for(path);
        let ext = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        Self {
            video: mime.starts_with("video/"),
            audio: mime.starts_with("audio/"),
            image: mime.starts_with("image/"),
            archive: ARCHIVE_EXTENSIONS.contains(&ext.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_extensions_are_case_insensitive() {
        assert_eq!(mime_type_for(Path::new("Movie.MKV")), "video/x-matroska");
        assert_eq!(mime_type_for(Path::new("a/b/song.flac")), "audio/flac");
        assert_eq!(mime_type_for(Path::new("README")), OCTET_STREAM);
        assert_eq!(mime_type_for(Path::new("blob.xyz")), OCTET_STREAM);
    }

    #[test]
    fn classification_flags() {
        let video = MediaKind::classify(Path::new("clip.mp4"));
        assert!(video.video && !video.audio && !video.archive);
        let archive = MediaKind::classify(Path::new("bundle.tar"));
        assert!(archive.archive);
        assert_eq!(extension_of(Path::new("Photo.JPG")), ".jpg");
        assert_eq!(extension_of(Path::new("Makefile")), "");
    }
}
