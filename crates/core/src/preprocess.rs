//! Client-side downscaling and recompression of images before upload.
//!
//! Each image is decoded, scaled uniformly so that neither side exceeds
//! the configured bound, and re-encoded as JPEG. Images that need no
//! downscaling, or whose re-encoded form would be under
//! [`BYPASS_THRESHOLD_BYTES`], are passed through untouched.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

use crate::batch::UploadBatch;
use crate::error::CoreError;
use crate::file::ImageFile;

/* --------------------------------------------------------------------------
Named constants
-------------------------------------------------------------------------- */

/// Default bound on either side of the output, in pixels.
pub const DEFAULT_MAX_DIMENSION: u32 = 1024;

/// Default encoder quality factor in `(0, 1]`.
pub const DEFAULT_QUALITY: f32 = 0.7;

/// Re-encoded output below this size is discarded in favour of the original.
pub const BYPASS_THRESHOLD_BYTES: usize = 50 * 1024;

/// Media type of recompressed output.
pub const RECOMPRESSED_MIME: &str = "image/jpeg";

/* --------------------------------------------------------------------------
Types
-------------------------------------------------------------------------- */

/// Tunable parameters for [`preprocess_image`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PreprocessConfig {
    /// Upper bound on output width and height.
    pub max_dimension: u32,
    /// Encoder quality factor in `(0, 1]`.
    pub quality: f32,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
            quality: DEFAULT_QUALITY,
        }
    }
}

impl PreprocessConfig {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.max_dimension == 0 {
            return Err(CoreError::Validation(
                "Maximum dimension must be greater than 0".to_string(),
            ));
        }
        if !(self.quality > 0.0 && self.quality <= 1.0) {
            return Err(CoreError::Validation(format!(
                "Quality must be in (0, 1] (got {})",
                self.quality
            )));
        }
        Ok(())
    }

    /// Quality factor mapped onto the JPEG encoder's 1-100 scale.
    fn jpeg_quality(&self) -> u8 {
        (self.quality * 100.0).round().clamp(1.0, 100.0) as u8
    }
}

/// An image ready for upload, occupying the same batch slot as its source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedImage {
    pub file: ImageFile,
    /// Pixel width of `file`.
    pub width: u32,
    /// Pixel height of `file`.
    pub height: u32,
    /// `true` when `file` holds re-encoded bytes rather than the original.
    pub recompressed: bool,
}

impl ProcessedImage {
    fn passthrough(file: ImageFile, width: u32, height: u32) -> Self {
        Self {
            file,
            width,
            height,
            recompressed: false,
        }
    }
}

/// Errors from the preprocessing step.
#[derive(Debug, thiserror::Error)]
pub enum PreprocessError {
    /// The bytes could not be decoded as a supported image.
    #[error("Failed to decode image '{name}': {source}")]
    Decode {
        name: String,
        #[source]
        source: image::ImageError,
    },

    /// The scaled image could not be re-encoded.
    #[error("Failed to encode image '{name}': {source}")]
    Encode {
        name: String,
        #[source]
        source: image::ImageError,
    },

    /// The configuration was rejected before any work started.
    #[error(transparent)]
    Invalid(#[from] CoreError),

    /// The blocking task running the conversion panicked or was cancelled.
    #[error("Preprocessing task for '{name}' failed: {message}")]
    Task { name: String, message: String },
}

/* --------------------------------------------------------------------------
Scaling
-------------------------------------------------------------------------- */

/// Uniform scale factor that fits `width x height` inside `max_dimension`.
///
/// Never exceeds 1, so images are not enlarged.
pub fn scale_factor(width: u32, height: u32, max_dimension: u32) -> f64 {
    let max = f64::from(max_dimension);
    (max / f64::from(width))
        .min(max / f64::from(height))
        .min(1.0)
}

/// Apply `scale` to both axes, rounding and keeping at least one pixel.
pub fn scaled_dimensions(width: u32, height: u32, scale: f64) -> (u32, u32) {
    let w = (f64::from(width) * scale).round().max(1.0) as u32;
    let h = (f64::from(height) * scale).round().max(1.0) as u32;
    (w, h)
}

/* --------------------------------------------------------------------------
Processing
-------------------------------------------------------------------------- */

/// Downscale and recompress one image.
///
/// Returns the original file unchanged when it already fits within the
/// bound or when recompression would produce fewer than
/// [`BYPASS_THRESHOLD_BYTES`].
pub fn preprocess_image(
    file: ImageFile,
    config: &PreprocessConfig,
) -> Result<ProcessedImage, PreprocessError> {
    config.validate()?;

    let decoded = image::load_from_memory(&file.bytes).map_err(|source| {
        PreprocessError::Decode {
            name: file.name.clone(),
            source,
        }
    })?;
    let (width, height) = decoded.dimensions();

    let scale = scale_factor(width, height, config.max_dimension);
    if scale >= 1.0 {
        tracing::debug!(name = %file.name, width, height, "Image within bounds, keeping original");
        return Ok(ProcessedImage::passthrough(file, width, height));
    }

    let (new_width, new_height) = scaled_dimensions(width, height, scale);
    let resized = decoded.resize_exact(new_width, new_height, FilterType::Triangle);
    drop(decoded);

    let encoded =
        encode_jpeg(&resized, config.jpeg_quality()).map_err(|source| PreprocessError::Encode {
            name: file.name.clone(),
            source,
        })?;

    if encoded.len() < BYPASS_THRESHOLD_BYTES {
        tracing::debug!(
            name = %file.name,
            encoded_size = encoded.len(),
            "Recompressed image below bypass threshold, keeping original",
        );
        return Ok(ProcessedImage::passthrough(file, width, height));
    }

    tracing::info!(
        name = %file.name,
        original_size = file.size(),
        compressed_size = encoded.len(),
        width = new_width,
        height = new_height,
        "Image recompressed",
    );

    Ok(ProcessedImage {
        file: ImageFile::new(file.name, RECOMPRESSED_MIME, encoded),
        width: new_width,
        height: new_height,
        recompressed: true,
    })
}

fn encode_jpeg(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, image::ImageError> {
    let rgb = image.to_rgb8();
    let mut buf = Vec::new();
    rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut buf, quality))?;
    Ok(buf)
}

/// Preprocess every file of a batch concurrently on the blocking pool.
///
/// Resolves once all files are done, in batch order. The first failure
/// fails the whole batch.
pub async fn preprocess_batch(
    batch: UploadBatch,
    config: PreprocessConfig,
) -> Result<Vec<ProcessedImage>, PreprocessError> {
    config.validate()?;

    let tasks = batch.into_files().into_iter().map(|file| {
        let name = file.name.clone();
        async move {
            tokio::task::spawn_blocking(move || preprocess_image(file, &config))
                .await
                .map_err(|e| PreprocessError::Task {
                    name,
                    message: e.to_string(),
                })?
        }
    });

    futures::future::try_join_all(tasks).await
}

/* --------------------------------------------------------------------------
Tests
-------------------------------------------------------------------------- */
