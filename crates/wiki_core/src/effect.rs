use crate::{HistoryEntry, RequestId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    StreamArticle { request_id: RequestId, topic: String },
    PickRandomTopic { request_id: RequestId },
    /// Abort a superseded request that is still running.
    CancelRequest { request_id: RequestId },
    PersistHistory { entries: Vec<HistoryEntry> },
}
