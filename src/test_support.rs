use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::{
    domain::resources::DocumentSource,
    errors::AppError,
    youtube_client::{ChannelSummary, SearchQuery, VideoPlatform, VideoSummary},
    Services,
};

#[derive(Default)]
pub struct MockPlatform {
    searches: Mutex<Vec<SearchQuery>>,
    empty: bool,
    failing: bool,
}

impl MockPlatform {
    pub fn empty() -> Self {
        Self {
            empty: true,
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Default::default()
        }
    }

    pub fn searches(&self) -> Vec<SearchQuery> {
        self.searches.lock().expect("searches lock").clone()
    }
}

#[async_trait]
impl VideoPlatform for MockPlatform {
    async fn search_videos(&self, query: &SearchQuery) -> Result<Vec<VideoSummary>, AppError> {
        self.searches.lock().expect("searches lock").push(query.clone());
        if self.failing {
            return Err(AppError::upstream("youtube search returned status 403"));
        }
        if self.empty {
            return Ok(vec![]);
        }

        Ok((1..=query.max_results)
            .map(|n| VideoSummary {
                video_id: Some(format!("vid{n}")),
                title: Some(format!("{} video {n}", query.query)),
                description: Some("A video".to_string()),
                thumbnail_url: Some(format!("https://i.ytimg.com/vi/vid{n}/default.jpg")),
                channel_title: Some("Channel".to_string()),
                published_at: Some("2024-01-01T00:00:00Z".to_string()),
            })
            .collect())
    }

    async fn find_channels(&self, handle: &str) -> Result<Vec<ChannelSummary>, AppError> {
        if self.failing {
            return Err(AppError::upstream("youtube channels returned status 403"));
        }
        Ok(vec![ChannelSummary {
            channel_id: Some("UC123".to_string()),
            title: Some(handle.trim_start_matches('@').to_string()),
            description: None,
            thumbnail_url: None,
            custom_url: Some(handle.to_string()),
            default_language: None,
            country: None,
            published_at: Some("2015-01-01T00:00:00Z".to_string()),
        }])
    }
}

pub struct StaticDocuments;

#[async_trait]
impl DocumentSource for StaticDocuments {
    async fn fetch_text(&self, _uri: &str) -> Result<String, AppError> {
        Ok("# MCP TypeScript SDK".to_string())
    }
}

pub fn services(platform: Arc<MockPlatform>) -> Services {
    Services {
        video_platform: platform,
        documents: Arc::new(StaticDocuments),
    }
}
