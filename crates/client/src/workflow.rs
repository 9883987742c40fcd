//! Multi-step flows built on top of [`ShadeMatchApi`].
//!
//! * the training wizard: create a colour, upload its example photos in
//!   parallel and open the progress stream;
//! * retraining an existing colour once it has enough photos;
//! * analysing a batch after downscaling it locally.

use futures::future::try_join_all;
use shadematch_core::batch::{validate_analysis_files, UploadBatch};
use shadematch_core::error::CoreError;
use shadematch_core::preprocess::{preprocess_batch, PreprocessConfig, PreprocessError};
use shadematch_core::types::DbId;

use crate::api::{ApiError, ShadeMatchApi};
use crate::models::{AnalysisResponse, ColorProfile, ColorStatus, MessageResponse, TrainingImage};
use crate::progress::{ProgressStream, TrainingError};

/// Description given to colours created by the wizard.
pub const WIZARD_DESCRIPTION: &str = "Trained via wizard";

/// Photos a colour needs before it can be (re)trained.
pub const MIN_TRAINING_IMAGES: usize = 3;

pub const NO_WIZARD_IMAGES: &str = "Please upload at least 1 image.";
pub const COLOR_NAME_MISSING: &str = "Color name is missing.";

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error(transparent)]
    Invalid(#[from] CoreError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Training(#[from] TrainingError),

    #[error(transparent)]
    Preprocess(#[from] PreprocessError),
}

/// A wizard run whose uploads finished and whose training is streaming.
pub struct WizardRun {
    pub color: ColorProfile,
    pub images: Vec<TrainingImage>,
    pub progress: ProgressStream,
}

/// Create a colour named `name`, upload every file of `batch` and open
/// the training stream for it.
///
/// Validation happens before any request is sent. If an upload fails the
/// colour is left in place on the backend.
pub async fn create_color_and_train(
    api: &ShadeMatchApi,
    name: &str,
    batch: &UploadBatch,
) -> Result<WizardRun, WorkflowError> {
    batch.require_non_empty(NO_WIZARD_IMAGES)?;
    let name = name.trim();
    if name.is_empty() {
        return Err(CoreError::Validation(COLOR_NAME_MISSING.to_string()).into());
    }

    let color = api.create_color(name, WIZARD_DESCRIPTION).await?;
    tracing::info!(color_id = color.id, name = %color.name, images = batch.len(), "Wizard colour created");

    let uploads = batch
        .files()
        .iter()
        .map(|file| api.upload_training_image(color.id, file));
    let images = try_join_all(uploads).await?;
    tracing::info!(color_id = color.id, uploaded = images.len(), "Training images uploaded");

    let progress = api.stream_training(color.id).await?;

    Ok(WizardRun {
        color,
        images,
        progress,
    })
}

/// Whether `color` with `image_count` photos may be sent for training.
pub fn ensure_trainable(color: &ColorProfile, image_count: usize) -> Result<(), CoreError> {
    if color.status == ColorStatus::Training {
        return Err(CoreError::Validation(format!(
            "'{}' is already training.",
            color.name
        )));
    }
    if image_count < MIN_TRAINING_IMAGES {
        return Err(CoreError::Validation(format!(
            "'{}' has {image_count} training image(s); at least {MIN_TRAINING_IMAGES} are required.",
            color.name
        )));
    }
    Ok(())
}

/// Trigger training of an existing colour after checking it is eligible.
pub async fn train_existing(
    api: &ShadeMatchApi,
    color_id: DbId,
) -> Result<MessageResponse, WorkflowError> {
    let color = api
        .list_colors()
        .await?
        .into_iter()
        .find(|c| c.id == color_id)
        .ok_or_else(|| CoreError::Validation(format!("Color {color_id} not found.")))?;

    let images = api.list_training_images(color_id).await?;
    ensure_trainable(&color, images.len())?;

    let response = api.trigger_training(color_id).await?;
    tracing::info!(color_id, message = %response.message, "Training triggered");
    Ok(response)
}

/// Downscale every file of `batch` and submit the results for analysis.
pub async fn analyze_batch(
    api: &ShadeMatchApi,
    batch: UploadBatch,
    config: PreprocessConfig,
) -> Result<AnalysisResponse, WorkflowError> {
    validate_analysis_files(batch.files())?;

    let processed = preprocess_batch(batch, config).await?;
    let recompressed = processed.iter().filter(|p| p.recompressed).count();
    tracing::info!(count = processed.len(), recompressed, "Batch preprocessed");

    let files: Vec<_> = processed.into_iter().map(|p| p.file).collect();
    Ok(api.analyze_images(&files).await?)
}
