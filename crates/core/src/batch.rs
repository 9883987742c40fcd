//! Upload batches of 1-5 images.
//!
//! Selections larger than [`MAX_BATCH_SIZE`] are truncated rather than
//! rejected, keeping the first files in selection order. Whether an empty
//! batch is acceptable depends on the caller, so emptiness is checked
//! separately via [`UploadBatch::require_non_empty`].

use crate::error::CoreError;
use crate::file::ImageFile;

/// Maximum number of images submitted together.
pub const MAX_BATCH_SIZE: usize = 5;

/// Ordered set of at most [`MAX_BATCH_SIZE`] image files.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadBatch {
    files: Vec<ImageFile>,
}

impl UploadBatch {
    /// Build a batch from a user selection, dropping anything past the limit.
    pub fn from_selection(files: Vec<ImageFile>) -> Self {
        let mut batch = Self::default();
        batch.extend(files);
        batch
    }

    /// Append files to the batch, then truncate to the limit.
    pub fn extend(&mut self, files: impl IntoIterator<Item = ImageFile>) {
        self.files.extend(files);
        if self.files.len() > MAX_BATCH_SIZE {
            let dropped = self.files.len() - MAX_BATCH_SIZE;
            tracing::warn!(
                dropped,
                limit = MAX_BATCH_SIZE,
                "Selection exceeds batch limit, extra files ignored",
            );
            self.files.truncate(MAX_BATCH_SIZE);
        }
    }

    /// Replace the current selection. The previous files are dropped here.
    pub fn replace(&mut self, files: Vec<ImageFile>) {
        let released: usize = self.files.iter().map(ImageFile::size).sum();
        if released > 0 {
            tracing::debug!(released_bytes = released, "Releasing previous selection");
        }
        self.files.clear();
        self.extend(files);
    }

    /// Fail with `message` when the batch holds no files.
    pub fn require_non_empty(&self, message: &str) -> Result<(), CoreError> {
        if self.files.is_empty() {
            return Err(CoreError::Validation(message.to_string()));
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn files(&self) -> &[ImageFile] {
        &self.files
    }

    pub fn into_files(self) -> Vec<ImageFile> {
        self.files
    }
}

/// Validate a pre-built list of files destined for one analysis request.
///
/// Unlike [`UploadBatch::from_selection`] this rejects oversized input.
pub fn validate_analysis_files(files: &[ImageFile]) -> Result<(), CoreError> {
    if files.is_empty() {
        return Err(CoreError::Validation(
            "Please provide at least one image file.".to_string(),
        ));
    }
    if files.len() > MAX_BATCH_SIZE {
        return Err(CoreError::Validation(format!(
            "Maximum {MAX_BATCH_SIZE} images allowed."
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    fn files(count: usize) -> Vec<ImageFile> {
        (0..count)
            .map(|i| ImageFile::new(format!("img-{i}.jpg"), "image/jpeg", vec![i as u8; 4]))
            .collect()
    }

    fn names(batch: &UploadBatch) -> Vec<&str> {
        batch.files().iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn seven_files_truncate_to_five_in_order() {
        let batch = UploadBatch::from_selection(files(7));
        assert_eq!(batch.len(), 5);
        assert_eq!(
            names(&batch),
            vec!["img-0.jpg", "img-1.jpg", "img-2.jpg", "img-3.jpg", "img-4.jpg"]
        );
    }

    #[test]
    fn extend_appends_then_truncates() {
        let mut batch = UploadBatch::from_selection(files(3));
        batch.extend(files(4));
        assert_eq!(batch.len(), 5);
        assert_eq!(
            names(&batch),
            vec!["img-0.jpg", "img-1.jpg", "img-2.jpg", "img-0.jpg", "img-1.jpg"]
        );
    }

    #[test]
    fn replace_discards_previous_selection() {
        let mut batch = UploadBatch::from_selection(files(4));
        batch.replace(vec![ImageFile::new("new.png", "image/png", vec![1])]);
        assert_eq!(names(&batch), vec!["new.png"]);
    }

    #[test]
    fn empty_batch_fails_requirement() {
        let batch = UploadBatch::default();
        assert_matches!(
            batch.require_non_empty("Please select at least one image."),
            Err(CoreError::Validation(msg)) if msg == "Please select at least one image."
        );
        assert!(UploadBatch::from_selection(files(1))
            .require_non_empty("unused")
            .is_ok());
    }

    #[test]
    fn analysis_files_bounds() {
        assert_matches!(
            validate_analysis_files(&[]),
            Err(CoreError::Validation(msg)) if msg == "Please provide at least one image file."
        );
        assert_matches!(
            validate_analysis_files(&files(6)),
            Err(CoreError::Validation(msg)) if msg == "Maximum 5 images allowed."
        );
        assert!(validate_analysis_files(&files(5)).is_ok());
    }
}
