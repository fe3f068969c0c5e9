use std::collections::HashSet;
use std::time::Duration;

use futures_util::stream::BoxStream;

use crate::{GenerationError, GroundingSource, PartialArticle};

/// Lazy, finite sequence of partial articles. A failure is always the last element.
pub type ArticleStream = BoxStream<'static, Result<PartialArticle, GenerationError>>;

#[derive(Debug, Clone)]
pub struct GeneratorSettings {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    pub connect_timeout: Duration,
    pub article_temperature: f32,
    pub topic_temperature: f32,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-2.5-flash".to_string(),
            api_key: String::new(),
            connect_timeout: Duration::from_secs(10),
            article_temperature: 0.3,
            topic_temperature: 1.0,
        }
    }
}

/// The external text-generation service.
#[async_trait::async_trait]
pub trait Generator: Send + Sync {
    /// Starts a fresh article request. Each element carries the cumulative
    /// text; the final element carries the deduplicated grounding sources.
    fn stream_article(&self, topic: &str) -> ArticleStream;

    /// Asks for one random encyclopedia topic.
    async fn suggest_random_topic(&self) -> Result<String, GenerationError>;
}

/// Grounding sources deduplicated by URI; the first title seen for a URI wins.
#[derive(Debug, Clone, Default)]
pub struct SourceSet {
    seen: HashSet<String>,
    sources: Vec<GroundingSource>,
}

impl SourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a source unless its URI is already present. Sources missing a
    /// title or URI are dropped.
    pub fn insert(&mut self, title: &str, uri: &str) -> bool {
        if title.is_empty() || uri.is_empty() || self.seen.contains(uri) {
            return false;
        }
        self.seen.insert(uri.to_string());
        self.sources.push(GroundingSource {
            title: title.to_string(),
            uri: uri.to_string(),
        });
        true
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn to_vec(&self) -> Vec<GroundingSource> {
        self.sources.clone()
    }
}
