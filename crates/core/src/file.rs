//! In-memory image files as selected by the user.

use std::path::Path;

use image::ImageFormat;

/// Fallback MIME type when the extension is not a known image format.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// A named image blob with its media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl ImageFile {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            bytes,
        }
    }

    /// Read a file from disk, inferring the MIME type from its extension.
    pub async fn load(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        tracing::debug!(name = %name, size = bytes.len(), "Loaded image file");

        Ok(Self::new(name, mime_for_path(path), bytes))
    }

    pub fn size(&self) -> usize {
        self.bytes.len()
    }
}

/// Media type for a path based on its extension.
pub fn mime_for_path(path: &Path) -> &'static str {
    ImageFormat::from_path(path)
        .map(|format| format.to_mime_type())
        .unwrap_or(OCTET_STREAM)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mime_from_extension() {
        assert_eq!(mime_for_path(Path::new("a/photo.jpg")), "image/jpeg");
        assert_eq!(mime_for_path(Path::new("photo.png")), "image/png");
        assert_eq!(mime_for_path(Path::new("photo.webp")), "image/webp");
    }

    #[test]
    fn unknown_extension_is_octet_stream() {
        assert_eq!(mime_for_path(Path::new("notes.txt")), OCTET_STREAM);
        assert_eq!(mime_for_path(Path::new("no_extension")), OCTET_STREAM);
    }

    #[tokio::test]
    async fn load_reads_bytes_and_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sample.png");
        std::fs::write(&path, b"not really a png").unwrap();

        let file = ImageFile::load(&path).await.unwrap();
        assert_eq!(file.name, "sample.png");
        assert_eq!(file.mime, "image/png");
        assert_eq!(file.size(), 16);
    }
}
