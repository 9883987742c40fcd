//! Plain-text rendering of service responses.

use serde_json::Value;
use shadematch_client::messages::TrainingProgress;
use shadematch_client::models::{AnalysisResponse, ColorProfile, ImageAnalysis, TrainingImage};
use shadematch_core::catalog::{Shade, ShadeKind};

/// Shown for a result that lacks its summary or colour breakdown.
pub const INCOMPLETE_ANALYSIS: &str = "Incomplete analysis data.";

pub const NO_DESCRIPTION: &str = "No description";

/// Dominant colours listed per result.
const TOP_COLORS: usize = 3;

/// Runner-up matches listed after the best one (matches 2-4).
const RUNNER_UPS: usize = 3;

/// Similarity score in `[0, 1]` as a whole percentage.
pub fn score_percent(score: f64) -> i64 {
    (score * 100.0).round() as i64
}

fn summary_value(value: &Value) -> String {
    match value {
        Value::Null => "unknown".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Newline-terminated lines.
fn join_lines(lines: Vec<String>) -> String {
    lines.into_iter().map(|line| line + "\n").collect()
}

/// `Image N • filename`, followed by `(cached)` for cache hits.
pub fn result_header(result: &ImageAnalysis) -> String {
    let mut header = format!("Image {}", result.image_index);
    if let Some(name) = result.filename.as_deref().filter(|n| !n.is_empty()) {
        header.push_str(&format!(" • {name}"));
    }
    if result.cached {
        header.push_str(" (cached)");
    }
    header
}

pub fn render_result(result: &ImageAnalysis) -> String {
    let mut lines = vec![result_header(result)];

    if let Some(error) = result.error.as_deref() {
        lines.push(format!("  Error: {error}"));
        return join_lines(lines);
    }

    let (Some(summary), Some(colors)) = (&result.analysis_summary, &result.dominant_hair_colors)
    else {
        lines.push(format!("  {INCOMPLETE_ANALYSIS}"));
        return join_lines(lines);
    };

    lines.push(match result.best_match() {
        Some(best) => format!(
            "  Best match: {} ({}%)",
            best.name,
            score_percent(best.combined_score)
        ),
        None => "  Best match: none".to_string(),
    });

    lines.push(format!(
        "  Tone: {} | Level: {} | Style: {}",
        summary_value(&summary.estimated_tone),
        summary_value(&summary.estimated_level),
        summary_value(&summary.estimated_style),
    ));

    if !colors.is_empty() {
        let swatches: Vec<String> = colors
            .iter()
            .take(TOP_COLORS)
            .map(|c| format!("{} {}%", c.hex, c.percentage.round() as i64))
            .collect();
        lines.push(format!("  Dominant colors: {}", swatches.join(", ")));
    }

    let others: Vec<String> = result
        .best_matches
        .iter()
        .skip(1)
        .take(RUNNER_UPS)
        .map(|m| format!("{} {}%", m.name, score_percent(m.combined_score)))
        .collect();
    if !others.is_empty() {
        lines.push(format!("  Other matches: {}", others.join(", ")));
    }

    join_lines(lines)
}

pub fn render_analysis(response: &AnalysisResponse) -> String {
    let mut out = format!("Analyzed {} image(s)\n", response.num_images);
    for result in &response.results {
        out.push('\n');
        out.push_str(&render_result(result));
    }
    out
}

pub fn render_colors(colors: &[ColorProfile]) -> String {
    if colors.is_empty() {
        return "No colors yet.\n".to_string();
    }
    let lines = colors.iter().map(|color| {
        let description = color
            .description
            .as_deref()
            .filter(|d| !d.is_empty())
            .unwrap_or(NO_DESCRIPTION);
        format!(
            "[{}] {} ({})\n    {description}",
            color.id,
            color.name,
            color.status.as_str()
        )
    });
    join_lines(lines.collect())
}

pub fn render_training_images(images: &[TrainingImage], resolve: impl Fn(&str) -> String) -> String {
    if images.is_empty() {
        return "No training images.\n".to_string();
    }
    join_lines(
        images
            .iter()
            .map(|image| format!("[{}] {}", image.id, resolve(&image.image_path)))
            .collect(),
    )
}

/// One progress line, e.g. `[ 40%] training: Extracting features`.
pub fn render_progress(progress: &TrainingProgress) -> String {
    let percent = match progress.percentage {
        Some(p) => format!("{p:>3}%"),
        None => "   -".to_string(),
    };
    match progress.message.as_deref() {
        Some(message) => format!("[{percent}] {}: {message}", progress.status),
        None => format!("[{percent}] {}", progress.status),
    }
}

pub fn render_suggestions(shades: &[&Shade]) -> String {
    if shades.is_empty() {
        return "No matching shades.\n".to_string();
    }
    let lines = shades.iter().map(|shade| {
        let kind = match shade.kind {
            ShadeKind::Single => "single",
            ShadeKind::Highlight => "highlight",
            ShadeKind::Rooted => "rooted",
        };
        format!("{:<32} {} ({kind})", shade.name, shade.hex)
    });
    join_lines(lines.collect())
}
