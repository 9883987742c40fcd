//! Request and response bodies of the analysis service.

use serde::{Deserialize, Serialize};
use shadematch_core::types::DbId;
use validator::Validate;

/// Training state of a colour profile as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum ColorStatus {
    Untrained,
    Training,
    Ready,
    /// Any tag this client does not know about.
    Unknown,
}

impl From<String> for ColorStatus {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "untrained" => ColorStatus::Untrained,
            "training" => ColorStatus::Training,
            "ready" => ColorStatus::Ready,
            _ => ColorStatus::Unknown,
        }
    }
}

impl ColorStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ColorStatus::Untrained => "untrained",
            ColorStatus::Training => "training",
            ColorStatus::Ready => "ready",
            ColorStatus::Unknown => "unknown",
        }
    }
}

/// A named classification target owned by the backend.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ColorProfile {
    pub id: DbId,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_status")]
    pub status: ColorStatus,
}

fn default_status() -> ColorStatus {
    ColorStatus::Untrained
}

/// Body of `POST /colors`.
#[derive(Debug, Clone, Serialize, Validate)]
pub struct CreateColor {
    #[validate(length(min = 1, message = "Color name is missing."))]
    pub name: String,
    pub description: String,
}

/// An example photo attached to a colour profile.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct TrainingImage {
    pub id: DbId,
    /// Server-relative path; prefix with the API base URL to fetch it.
    pub image_path: String,
}

/// Generic `{message}` acknowledgement.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Body of `GET /cache/stats`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CacheStats {
    pub cached_results: u64,
}

/// Body of `POST /analyze`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnalysisResponse {
    pub num_images: u32,
    #[serde(default)]
    pub results: Vec<ImageAnalysis>,
}

/// Analysis of one submitted image.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ImageAnalysis {
    /// 1-based position in the submitted batch.
    #[serde(default)]
    pub image_index: u32,
    #[serde(default)]
    pub filename: Option<String>,
    /// Served from the backend's result cache.
    #[serde(default)]
    pub cached: bool,
    /// Per-image failure; the other fields are absent when set.
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub analysis_summary: Option<AnalysisSummary>,
    #[serde(default)]
    pub dominant_hair_colors: Option<Vec<DominantColor>>,
    #[serde(default)]
    pub best_matches: Vec<ColorMatch>,
}

/// Backend estimates of tone, level and style.
///
/// The values are free-form (strings or numbers depending on the model).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AnalysisSummary {
    #[serde(default)]
    pub estimated_tone: serde_json::Value,
    #[serde(default)]
    pub estimated_level: serde_json::Value,
    #[serde(default)]
    pub estimated_style: serde_json::Value,
}

/// A colour cluster found in the hair region.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DominantColor {
    pub hex: String,
    /// Share of the hair region, 0-100.
    pub percentage: f64,
}

/// Similarity of the image to one trained colour profile.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ColorMatch {
    pub color_id: DbId,
    pub name: String,
    /// Similarity in `[0, 1]`.
    pub combined_score: f64,
}

impl ImageAnalysis {
    pub fn best_match(&self) -> Option<&ColorMatch> {
        self.best_matches.first()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_status_tolerates_unknown_tags() {
        let json = r#"[
            {"id": 1, "name": "Ash", "description": null, "status": "ready"},
            {"id": 2, "name": "Copper", "status": "queued"},
            {"id": 3, "name": "Auburn"}
        ]"#;
        let colors: Vec<ColorProfile> = serde_json::from_str(json).unwrap();
        assert_eq!(colors[0].status, ColorStatus::Ready);
        assert_eq!(colors[1].status, ColorStatus::Unknown);
        assert_eq!(colors[2].status, ColorStatus::Untrained);
        assert!(colors[2].description.is_none());
    }

    #[test]
    fn create_color_requires_name() {
        let empty = CreateColor {
            name: String::new(),
            description: "Trained via wizard".into(),
        };
        assert!(empty.validate().is_err());

        let named = CreateColor {
            name: "#6 Brown".into(),
            description: String::new(),
        };
        assert!(named.validate().is_ok());
    }

    #[test]
    fn analysis_response_with_error_result() {
        let json = r##"{
            "num_images": 2,
            "results": [
                {
                    "image_index": 1,
                    "filename": "a.jpg",
                    "cached": true,
                    "analysis_summary": {"estimated_tone": "warm", "estimated_level": 6, "estimated_style": "solid"},
                    "dominant_hair_colors": [{"hex": "#7a4f35", "percentage": 61.4}],
                    "best_matches": [
                        {"color_id": 4, "name": "#6 Brown", "combined_score": 0.91},
                        {"color_id": 9, "name": "#5A Chestnut Charm", "combined_score": 0.72}
                    ]
                },
                {"image_index": 2, "error": "No hair detected"}
            ]
        }"##;
        let response: AnalysisResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.num_images, 2);

        let first = &response.results[0];
        assert!(first.cached);
        assert_eq!(first.best_match().unwrap().name, "#6 Brown");
        assert_eq!(first.analysis_summary.as_ref().unwrap().estimated_level, 6);

        let second = &response.results[1];
        assert_eq!(second.error.as_deref(), Some("No hair detected"));
        assert!(second.dominant_hair_colors.is_none());
        assert!(second.best_match().is_none());
    }
}
