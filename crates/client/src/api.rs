//! REST client for the analysis service.
//!
//! Every method maps to exactly one HTTP call. Non-success responses are
//! turned into [`ApiError::Backend`] carrying the backend's `detail`
//! text, which is also the error's display string.

use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use shadematch_core::batch::validate_analysis_files;
use shadematch_core::error::CoreError;
use shadematch_core::file::ImageFile;
use shadematch_core::types::DbId;
use validator::Validate;

use crate::models::{
    AnalysisResponse, CacheStats, ColorProfile, CreateColor, MessageResponse, TrainingImage,
};

/// Default base URL of a locally running backend.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

/// Message used when an error body cannot be parsed at all.
pub const UNKNOWN_ERROR: &str = "An unknown error occurred.";

/// Message used when an error body parses but carries no `detail`.
pub const REQUEST_FAILED: &str = "Request failed.";

/// HTTP client for one backend instance.
#[derive(Debug, Clone)]
pub struct ShadeMatchApi {
    client: reqwest::Client,
    api_url: String,
}

/// Errors from the REST layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend returned a non-2xx status.
    #[error("{detail}")]
    Backend {
        /// HTTP status code.
        status: u16,
        /// Backend `detail` text, or a generic fallback.
        detail: String,
    },

    /// A success body did not match the expected shape.
    #[error("Unexpected response body: {0}")]
    Decode(String),

    /// Input rejected before any request was sent.
    #[error(transparent)]
    Invalid(#[from] CoreError),
}

impl ApiError {
    /// HTTP status of a backend error, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Backend { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

impl ShadeMatchApi {
    /// Create a client for the backend at `api_url`, e.g. `http://host:8000`.
    pub fn new(api_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), api_url)
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, api_url: impl Into<String>) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        Self { client, api_url }
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.client
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    /// Absolute URL of a server-relative path such as a training image's.
    pub fn resolve(&self, path: &str) -> String {
        if path.starts_with('/') {
            self.url(path)
        } else {
            format!("{}/{}", self.api_url, path)
        }
    }

    // ---- colour profiles ----

    /// `GET /colors`
    pub async fn list_colors(&self) -> Result<Vec<ColorProfile>, ApiError> {
        let response = self.client.get(self.url("/colors")).send().await?;
        Self::parse_response(response).await
    }

    /// `POST /colors`
    pub async fn create_color(
        &self,
        name: &str,
        description: &str,
    ) -> Result<ColorProfile, ApiError> {
        let body = CreateColor {
            name: name.trim().to_string(),
            description: description.to_string(),
        };
        body.validate()
            .map_err(|e| CoreError::Validation(validation_message(&e)))?;

        tracing::debug!(name = %body.name, "Creating color");
        let response = self
            .client
            .post(self.url("/colors"))
            .json(&body)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// `DELETE /colors/{id}`. Resolves with no body on 204.
    pub async fn delete_color(&self, color_id: DbId) -> Result<(), ApiError> {
        let response = self
            .client
            .delete(self.url(&format!("/colors/{color_id}")))
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NO_CONTENT {
            tracing::info!(color_id, "Color deleted");
            return Ok(());
        }
        Self::check_status(response).await
    }

    /// `GET /colors/{id}/images`
    pub async fn list_training_images(
        &self,
        color_id: DbId,
    ) -> Result<Vec<TrainingImage>, ApiError> {
        let response = self
            .client
            .get(self.url(&format!("/colors/{color_id}/images")))
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// `POST /colors/{id}/images` with a single `image` part.
    pub async fn upload_training_image(
        &self,
        color_id: DbId,
        file: &ImageFile,
    ) -> Result<TrainingImage, ApiError> {
        let form = Form::new().part("image", file_part(file)?);

        tracing::debug!(color_id, name = %file.name, size = file.size(), "Uploading training image");
        let response = self
            .client
            .post(self.url(&format!("/colors/{color_id}/images")))
            .multipart(form)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    // ---- training ----

    /// `POST /train/{id}`. Starts training without progress reporting.
    pub async fn trigger_training(&self, color_id: DbId) -> Result<MessageResponse, ApiError> {
        let response = self
            .client
            .post(self.url(&format!("/train/{color_id}")))
            .send()
            .await?;
        Self::parse_response(response).await
    }

    // ---- analysis ----

    /// `POST /analyze` with 1-5 `images` parts.
    pub async fn analyze_images(&self, files: &[ImageFile]) -> Result<AnalysisResponse, ApiError> {
        validate_analysis_files(files)?;
        let form = images_form(files)?;

        tracing::info!(count = files.len(), "Submitting images for analysis");
        let response = self
            .client
            .post(self.url("/analyze"))
            .multipart(form)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    /// `POST /analyze` with a single image.
    pub async fn analyze_image(&self, file: &ImageFile) -> Result<AnalysisResponse, ApiError> {
        self.analyze_images(std::slice::from_ref(file)).await
    }

    /// `POST /analyze-legacy`, the predefined-palette analyser.
    ///
    /// The result shape is owned by the legacy backend and returned as-is.
    pub async fn analyze_images_legacy(
        &self,
        files: &[ImageFile],
    ) -> Result<Vec<serde_json::Value>, ApiError> {
        let form = images_form(files)?;
        let response = self
            .client
            .post(self.url("/analyze-legacy"))
            .multipart(form)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    // ---- cache ----

    /// `POST /clear-cache`
    pub async fn clear_cache(&self) -> Result<MessageResponse, ApiError> {
        let response = self.client.post(self.url("/clear-cache")).send().await?;
        Self::parse_response(response).await
    }

    /// `GET /cache/stats`
    pub async fn cache_stats(&self) -> Result<CacheStats, ApiError> {
        let response = self.client.get(self.url("/cache/stats")).send().await?;
        Self::parse_response(response).await
    }

    // ---- private helpers ----

    /// Return the response unchanged on success, or an [`ApiError::Backend`]
    /// carrying the backend's `detail` text.
    pub(crate) async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.bytes().await.unwrap_or_default();
        let detail = error_detail(&body);
        tracing::warn!(status = status.as_u16(), detail = %detail, "Backend returned an error");

        Err(ApiError::Backend {
            status: status.as_u16(),
            detail,
        })
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ApiError> {
        let response = Self::ensure_success(response).await?;
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| {
            tracing::warn!(error = %e, "Failed to parse success response");
            ApiError::Decode(e.to_string())
        })
    }

    /// Assert the response has a success status code, discarding the body.
    async fn check_status(response: reqwest::Response) -> Result<(), ApiError> {
        Self::ensure_success(response).await?;
        Ok(())
    }
}

/// Extract the `detail` string from an error body, with fallbacks.
pub fn error_detail(body: &[u8]) -> String {
    match serde_json::from_slice::<ErrorBody>(body) {
        Ok(ErrorBody {
            detail: Some(detail),
        }) if !detail.is_empty() => detail,
        Ok(_) => REQUEST_FAILED.to_string(),
        Err(_) => UNKNOWN_ERROR.to_string(),
    }
}

fn validation_message(errors: &validator::ValidationErrors) -> String {
    errors
        .field_errors()
        .values()
        .flat_map(|errs| errs.iter())
        .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
        .next()
        .unwrap_or_else(|| errors.to_string())
}

fn file_part(file: &ImageFile) -> Result<Part, ApiError> {
    Ok(Part::bytes(file.bytes.clone())
        .file_name(file.name.clone())
        .mime_str(&file.mime)?)
}

fn images_form(files: &[ImageFile]) -> Result<Form, ApiError> {
    files
        .iter()
        .try_fold(Form::new(), |form, file| Ok(form.part("images", file_part(file)?)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_extracted_from_error_body() {
        assert_eq!(error_detail(br#"{"detail": "Color not found"}"#), "Color not found");
    }

    #[test]
    fn body_without_detail_is_request_failed() {
        assert_eq!(error_detail(br#"{"error": "nope"}"#), REQUEST_FAILED);
        assert_eq!(error_detail(br#"{"detail": null}"#), REQUEST_FAILED);
    }

    #[test]
    fn unparsable_body_is_unknown_error() {
        assert_eq!(error_detail(b"<html>502 Bad Gateway</html>"), UNKNOWN_ERROR);
        assert_eq!(error_detail(b""), UNKNOWN_ERROR);
    }

    #[test]
    fn backend_error_displays_detail_only() {
        let err = ApiError::Backend {
            status: 404,
            detail: "Color not found".into(),
        };
        assert_eq!(err.to_string(), "Color not found");
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let api = ShadeMatchApi::new("http://localhost:8000/");
        assert_eq!(api.api_url(), "http://localhost:8000");
        assert_eq!(api.url("/colors"), "http://localhost:8000/colors");
        assert_eq!(
            api.resolve("/static/img/1.jpg"),
            "http://localhost:8000/static/img/1.jpg"
        );
        assert_eq!(api.resolve("img/1.jpg"), "http://localhost:8000/img/1.jpg");
    }
}
