use crate::{ArticleUpdate, HistoryEntry, RequestId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Msg {
    /// Navigate to a topic (search box, history pick, in-article link).
    /// An empty or blank topic returns to the home page.
    NavigateRequested(String),
    /// User asked for a random article.
    RandomRequested,
    /// User clicked "Try Again" on the error page.
    RetryRequested,
    /// User clicked "Resume Reading" on the home page.
    ResumeRequested,
    /// Restore the history log loaded from persistent storage.
    HistoryRestored(Vec<HistoryEntry>),
    /// Engine produced a partial article.
    ArticleChunk {
        request_id: RequestId,
        update: ArticleUpdate,
    },
    /// Engine finished an article stream without error.
    ArticleCompleted {
        request_id: RequestId,
        /// Unix timestamp in milliseconds, supplied by the caller.
        completed_at: i64,
    },
    /// Engine failed while streaming an article.
    ArticleFailed {
        request_id: RequestId,
        message: String,
    },
    /// Engine returned a random topic suggestion.
    RandomTopicPicked { request_id: RequestId, topic: String },
    /// The random topic suggestion failed.
    RandomTopicFailed { request_id: RequestId },
    /// UI/render tick to coalesce rendering.
    Tick,
    /// Fallback for placeholder wiring.
    NoOp,
}
