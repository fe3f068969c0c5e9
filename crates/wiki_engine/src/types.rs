use thiserror::Error;

pub type RequestId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroundingSource {
    pub title: String,
    pub uri: String,
}

/// One element of an article stream.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PartialArticle {
    /// Cumulative text generated so far.
    pub content: Option<String>,
    /// Present on the final element only.
    pub sources: Option<Vec<GroundingSource>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    ArticleChunk {
        request_id: RequestId,
        article: PartialArticle,
    },
    ArticleCompleted {
        request_id: RequestId,
    },
    ArticleFailed {
        request_id: RequestId,
        message: String,
    },
    RandomTopic {
        request_id: RequestId,
        result: Result<String, String>,
    },
    /// The request was aborted before it finished.
    Cancelled {
        request_id: RequestId,
    },
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("request failed: {0}")]
    Http(String),
    #[error("generation service returned {status}: {message}")]
    HttpStatus { status: u16, message: String },
    #[error("stream interrupted: {0}")]
    Stream(String),
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("{0}")]
    Api(String),
}
