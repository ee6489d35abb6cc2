use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::AppError;

pub const DEFAULT_YOUTUBE_API_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOrder {
    Relevance,
}

impl SearchOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Relevance => "relevance",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CaptionFilter {
    #[default]
    Any,
    ClosedCaption,
    None,
}

impl CaptionFilter {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::ClosedCaption => "closedCaption",
            Self::None => "none",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub query: String,
    pub max_results: u8,
    pub order: SearchOrder,
    pub relevance_language: Option<String>,
    pub caption: CaptionFilter,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct VideoSummary {
    pub video_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub channel_title: Option<String>,
    pub published_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChannelSummary {
    pub channel_id: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub thumbnail_url: Option<String>,
    pub custom_url: Option<String>,
    pub default_language: Option<String>,
    pub country: Option<String>,
    pub published_at: Option<String>,
}

#[async_trait]
pub trait VideoPlatform: Send + Sync {
    async fn search_videos(&self, query: &SearchQuery) -> Result<Vec<VideoSummary>, AppError>;

    async fn find_channels(&self, handle: &str) -> Result<Vec<ChannelSummary>, AppError>;
}

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Thumbnail {
    url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Thumbnails {
    default: Option<Thumbnail>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchResultId {
    video_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    title: Option<String>,
    description: Option<String>,
    thumbnails: Option<Thumbnails>,
    channel_title: Option<String>,
    custom_url: Option<String>,
    default_language: Option<String>,
    country: Option<String>,
    published_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    id: SearchResultId,
    #[serde(default)]
    snippet: Snippet,
}

#[derive(Debug, Deserialize)]
struct ChannelResource {
    id: Option<String>,
    #[serde(default)]
    snippet: Snippet,
}

fn default_thumbnail(thumbnails: Option<Thumbnails>) -> Option<String> {
    thumbnails
        .and_then(|thumbnails| thumbnails.default)
        .and_then(|thumbnail| thumbnail.url)
}

impl From<SearchResult> for VideoSummary {
    fn from(item: SearchResult) -> Self {
        Self {
            video_id: item.id.video_id,
            title: item.snippet.title,
            description: item.snippet.description,
            thumbnail_url: default_thumbnail(item.snippet.thumbnails),
            channel_title: item.snippet.channel_title,
            published_at: item.snippet.published_at,
        }
    }
}

impl From<ChannelResource> for ChannelSummary {
    fn from(item: ChannelResource) -> Self {
        Self {
            channel_id: item.id,
            title: item.snippet.title,
            description: item.snippet.description,
            thumbnail_url: default_thumbnail(item.snippet.thumbnails),
            custom_url: item.snippet.custom_url,
            default_language: item.snippet.default_language,
            country: item.snippet.country,
            published_at: item.snippet.published_at,
        }
    }
}

/// YouTube Data API v3 client authenticated with an API key.
pub struct YoutubeApiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl YoutubeApiClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| AppError::internal(format!("failed to build http client: {err}")))?;
        Ok(Self::with_http(http, api_key, base_url))
    }

    pub fn with_http(
        http: reqwest::Client,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn list<T>(&self, resource: &str, params: Vec<(&str, String)>) -> Result<Vec<T>, AppError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let url = format!("{}/{resource}", self.base_url);
        debug!(resource, "calling youtube data api");

        let response = self
            .http
            .get(&url)
            .query(&params)
            .query(&[("key", self.api_key.as_str())])
            .send()
            .await
            .map_err(|err| {
                AppError::upstream(format!("youtube {resource} request failed: {}", err.without_url()))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::upstream(format!(
                "youtube {resource} request returned status {}",
                status.as_u16()
            )));
        }

        let body: ListResponse<T> = response.json().await.map_err(|err| {
            AppError::upstream(format!(
                "youtube {resource} response could not be decoded: {}",
                err.without_url()
            ))
        })?;

        Ok(body.items)
    }
}

#[async_trait]
impl VideoPlatform for YoutubeApiClient {
    async fn search_videos(&self, query: &SearchQuery) -> Result<Vec<VideoSummary>, AppError> {
        let mut params = vec![
            ("part", "snippet".to_string()),
            ("q", query.query.clone()),
            ("type", "video".to_string()),
            ("maxResults", query.max_results.to_string()),
            ("order", query.order.as_str().to_string()),
        ];
        if let Some(language) = &query.relevance_language {
            params.push(("relevanceLanguage", language.clone()));
        }
        if query.caption != CaptionFilter::Any {
            params.push(("videoCaption", query.caption.as_str().to_string()));
        }

        let items: Vec<SearchResult> = self.list("search", params).await?;
        Ok(items.into_iter().map(VideoSummary::from).collect())
    }

    async fn find_channels(&self, handle: &str) -> Result<Vec<ChannelSummary>, AppError> {
        let params = vec![
            ("part", "snippet".to_string()),
            ("forHandle", handle.to_string()),
            ("maxResults", "5".to_string()),
        ];

        let items: Vec<ChannelResource> = self.list("channels", params).await?;
        Ok(items.into_iter().map(ChannelSummary::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashMap,
        sync::{Arc, Mutex},
    };

    use axum::{
        extract::{Query, State},
        http::StatusCode,
        response::{IntoResponse, Response},
        routing::get,
        Json, Router,
    };
    use serde_json::json;

    use super::*;

    type Seen = Arc<Mutex<Vec<HashMap<String, String>>>>;

    async fn mock_search(
        State(seen): State<Seen>,
        Query(params): Query<HashMap<String, String>>,
    ) -> Json<serde_json::Value> {
        seen.lock().expect("lock").push(params);
        Json(json!({
            "kind": "youtube#searchListResponse",
            "items": [{
                "id": { "kind": "youtube#video", "videoId": "abc123" },
                "snippet": {
                    "title": "Cats being cats",
                    "description": "A compilation",
                    "thumbnails": { "default": { "url": "https://i.ytimg.com/vi/abc123/default.jpg" } },
                    "channelTitle": "Cat Channel",
                    "publishedAt": "2024-01-01T00:00:00Z"
                }
            }]
        }))
    }

    async fn mock_channels(
        State(seen): State<Seen>,
        Query(params): Query<HashMap<String, String>>,
    ) -> Response {
        seen.lock().expect("lock").push(params);
        Json(json!({ "kind": "youtube#channelListResponse" })).into_response()
    }

    async fn mock_forbidden() -> Response {
        (StatusCode::FORBIDDEN, "quotaExceeded").into_response()
    }

    async fn spawn_mock() -> (String, Seen) {
        let seen: Seen = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route("/search", get(mock_search))
            .route("/channels", get(mock_channels))
            .route("/forbidden/search", get(mock_forbidden))
            .with_state(seen.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock");
        let addr = listener.local_addr().expect("mock addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        (format!("http://{addr}"), seen)
    }

    fn client(base_url: &str) -> YoutubeApiClient {
        let http = reqwest::Client::builder()
            .no_proxy()
            .build()
            .expect("http client");
        YoutubeApiClient::with_http(http, "test-key", base_url)
    }

    #[tokio::test]
    async fn search_sends_expected_parameters_and_parses_items() {
        let (base_url, seen) = spawn_mock().await;

        let videos = client(&base_url)
            .search_videos(&SearchQuery {
                query: "cats".to_string(),
                max_results: 5,
                order: SearchOrder::Relevance,
                relevance_language: Some("en".to_string()),
                caption: CaptionFilter::ClosedCaption,
            })
            .await
            .expect("search should succeed");

        assert_eq!(videos.len(), 1);
        assert_eq!(videos[0].video_id.as_deref(), Some("abc123"));
        assert_eq!(videos[0].title.as_deref(), Some("Cats being cats"));
        assert_eq!(
            videos[0].thumbnail_url.as_deref(),
            Some("https://i.ytimg.com/vi/abc123/default.jpg")
        );
        assert_eq!(videos[0].channel_title.as_deref(), Some("Cat Channel"));

        let seen = seen.lock().expect("lock");
        assert_eq!(seen.len(), 1);
        let params = &seen[0];
        assert_eq!(params.get("part").map(String::as_str), Some("snippet"));
        assert_eq!(params.get("q").map(String::as_str), Some("cats"));
        assert_eq!(params.get("type").map(String::as_str), Some("video"));
        assert_eq!(params.get("maxResults").map(String::as_str), Some("5"));
        assert_eq!(params.get("order").map(String::as_str), Some("relevance"));
        assert_eq!(params.get("relevanceLanguage").map(String::as_str), Some("en"));
        assert_eq!(params.get("videoCaption").map(String::as_str), Some("closedCaption"));
        assert_eq!(params.get("key").map(String::as_str), Some("test-key"));
    }

    #[tokio::test]
    async fn channels_without_items_yield_empty_list() {
        let (base_url, seen) = spawn_mock().await;

        let channels = client(&base_url)
            .find_channels("@returngis")
            .await
            .expect("channel lookup should succeed");

        assert!(channels.is_empty());
        let seen = seen.lock().expect("lock");
        assert_eq!(seen[0].get("forHandle").map(String::as_str), Some("@returngis"));
        assert_eq!(seen[0].get("maxResults").map(String::as_str), Some("5"));
    }

    #[tokio::test]
    async fn non_success_status_is_upstream_failure_without_key() {
        let (base_url, _) = spawn_mock().await;

        let err = client(&format!("{base_url}/forbidden"))
            .search_videos(&SearchQuery {
                query: "cats".to_string(),
                max_results: 5,
                order: SearchOrder::Relevance,
                relevance_language: None,
                caption: CaptionFilter::Any,
            })
            .await
            .expect_err("forbidden must fail");

        assert!(matches!(err, AppError::Upstream { .. }));
        assert!(err.to_string().contains("403"));
        assert!(!err.to_string().contains("test-key"));
    }
}
