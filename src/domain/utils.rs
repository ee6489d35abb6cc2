//! Domain-specific shared validations and formatting utilities

use std::sync::LazyLock;

use regex::Regex;

use crate::{
    errors::AppError,
    youtube_client::{CaptionFilter, ChannelSummary, VideoSummary},
};

pub const DEFAULT_MAX_RESULTS: u32 = 5;
pub const MAX_MAX_RESULTS: u32 = 10;
pub const MAX_QUERY_CHARS: usize = 500;

static LANGUAGE_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z]{2,3}(-[A-Za-z0-9]{2,8})*$").expect("language tag pattern")
});

pub fn normalize_query(value: Option<String>) -> Result<String, AppError> {
    let Some(value) = value else {
        return Err(AppError::bad_request(
            "missing_query",
            "a non-empty search query is required",
        ));
    };

    let normalized = value.trim();
    if normalized.is_empty() {
        return Err(AppError::bad_request(
            "missing_query",
            "a non-empty search query is required",
        ));
    }

    if normalized.chars().count() > MAX_QUERY_CHARS {
        return Err(AppError::bad_request(
            "query_too_long",
            "search query must not exceed 500 characters",
        ));
    }

    Ok(normalized.to_string())
}

pub fn normalize_max_results(limit: Option<u32>) -> Result<u8, AppError> {
    let limit = limit.unwrap_or(DEFAULT_MAX_RESULTS);
    if limit == 0 || limit > MAX_MAX_RESULTS {
        return Err(AppError::bad_request(
            "invalid_max_results",
            "max_results must be between 1 and 10",
        ));
    }

    Ok(limit as u8)
}

pub fn normalize_language(language: Option<String>) -> Result<Option<String>, AppError> {
    let Some(value) = language else {
        return Ok(None);
    };

    let normalized = value.trim();
    if normalized.is_empty() {
        return Ok(None);
    }

    if !LANGUAGE_TAG.is_match(normalized) {
        return Err(AppError::bad_request(
            "invalid_language",
            "language must be an ISO 639-1 code or BCP-47 tag such as en or pt-BR",
        ));
    }

    Ok(Some(normalized.to_string()))
}

pub fn normalize_caption(caption: Option<String>) -> Result<CaptionFilter, AppError> {
    match caption
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        None | Some("any") => Ok(CaptionFilter::Any),
        Some("closed_caption") | Some("closedcaption") | Some("captioned") => {
            Ok(CaptionFilter::ClosedCaption)
        }
        Some("none") => Ok(CaptionFilter::None),
        _ => Err(AppError::bad_request(
            "invalid_caption",
            "caption must be one of: any, closed_caption, none",
        )),
    }
}

fn or_unknown(value: Option<&String>) -> &str {
    value.map(String::as_str).unwrap_or("undefined")
}

pub fn render_video_results(query: &str, videos: &[VideoSummary]) -> String {
    if videos.is_empty() {
        return format!("No results found for \"{query}\"");
    }

    let mut formatted = String::new();
    for video in videos {
        formatted.push_str(&format!("\n\n**Title:** {}\n\n", or_unknown(video.title.as_ref())));
        formatted.push_str(&format!(
            "**Description:** {}\n\n",
            or_unknown(video.description.as_ref())
        ));
        formatted.push_str(&format!(
            "**Thumbnail:** ![Thumbnail]({})\n\n",
            or_unknown(video.thumbnail_url.as_ref())
        ));
        formatted.push_str(&format!(
            "**Channel:** {}\n\n",
            or_unknown(video.channel_title.as_ref())
        ));
        formatted.push_str(&format!(
            "**Published At:** {}\n\n",
            or_unknown(video.published_at.as_ref())
        ));
        formatted.push_str(&format!(
            "**Link:** [Watch Video](https://www.youtube.com/watch?v={})\n\n",
            or_unknown(video.video_id.as_ref())
        ));
    }

    format!("# Search results for \"{query}\"\n\n{formatted}")
}

pub fn render_channel_results(query: &str, channels: &[ChannelSummary]) -> String {
    if channels.is_empty() {
        return format!("No results found for \"{query}\"");
    }

    let mut formatted = String::new();
    for channel in channels {
        formatted.push_str(&format!(
            "\n\n**Title:** {}\n\n",
            or_unknown(channel.title.as_ref())
        ));
        formatted.push_str(&format!(
            "**Description:** {}\n\n",
            or_unknown(channel.description.as_ref())
        ));
        formatted.push_str(&format!(
            "**Thumbnail:** ![Thumbnail]({})\n\n",
            or_unknown(channel.thumbnail_url.as_ref())
        ));
        formatted.push_str(&format!(
            "**Published At:** {}\n\n",
            or_unknown(channel.published_at.as_ref())
        ));
        formatted.push_str(&format!(
            "**URL:** http://youtube.com/{}\n\n",
            or_unknown(channel.custom_url.as_ref())
        ));
    }

    format!("# Search results for \"{query}\"\n\n{formatted}")
}
