use crate::history::{HistoryEntry, HistoryLog, HISTORY_DISPLAY_LIMIT};
use crate::view_model::{AppViewModel, HistoryRowView, PageView};

/// Loading label shown while a random topic is being chosen.
pub const PICKING_TOPIC_LABEL: &str = "Picking a topic...";
/// Topic loaded when the random topic suggestion fails.
pub const RANDOM_FALLBACK_TOPIC: &str = "Serendipity";
/// Error text used when a failure carries no message of its own.
pub const DEFAULT_ERROR_MESSAGE: &str = "Failed to generate content. Please try again.";

/// Monotonic epoch identifying one logical request.
pub type RequestId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub title: String,
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Article {
    pub topic: String,
    pub content: String,
    pub sources: Vec<Source>,
}

impl Article {
    pub fn empty(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            ..Self::default()
        }
    }
}

/// One partial result from the generation stream.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ArticleUpdate {
    /// Cumulative text generated so far.
    pub content: Option<String>,
    pub sources: Option<Vec<Source>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NavigationState {
    #[default]
    Home,
    Loading {
        topic: String,
    },
    Viewing,
    Error {
        topic: String,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestKind {
    Article { topic: String },
    RandomPick,
}

/// The currently live request. Events carrying any other id are stale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveRequest {
    pub id: RequestId,
    pub kind: RequestKind,
    pub in_flight: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppState {
    nav: NavigationState,
    article: Option<Article>,
    active: Option<ActiveRequest>,
    last_request_id: RequestId,
    history: HistoryLog,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn navigation(&self) -> &NavigationState {
        &self.nav
    }

    pub fn article(&self) -> Option<&Article> {
        self.article.as_ref()
    }

    pub fn active_request(&self) -> Option<&ActiveRequest> {
        self.active.as_ref()
    }

    pub fn history(&self) -> &HistoryLog {
        &self.history
    }

    pub fn view(&self) -> AppViewModel {
        let page = match &self.nav {
            NavigationState::Home => PageView::Home {
                resume_topic: self.history.latest().map(|entry| entry.topic.clone()),
            },
            NavigationState::Loading { topic } => PageView::Loading {
                topic: topic.clone(),
            },
            NavigationState::Viewing => PageView::Viewing,
            NavigationState::Error { message, .. } => PageView::Error {
                message: message.clone(),
            },
        };
        let current_topic = self.article.as_ref().map(|article| article.topic.as_str());
        let history = self
            .history
            .list(HISTORY_DISPLAY_LIMIT)
            .into_iter()
            .map(|entry| HistoryRowView {
                topic: entry.topic.clone(),
                timestamp: entry.timestamp,
                is_current: current_topic == Some(entry.topic.as_str()),
            })
            .collect();

        AppViewModel {
            page,
            article: self.article.clone(),
            streaming: self.active.as_ref().is_some_and(|active| active.in_flight),
            history,
            dirty: self.dirty,
        }
    }

    /// Returns whether anything visible changed since the last call.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Issues a new request id, making every earlier request stale. Returns the
    /// superseded request id when that request was still running.
    pub(crate) fn begin_request(&mut self, kind: RequestKind) -> (RequestId, Option<RequestId>) {
        let superseded = self.invalidate_active();
        self.last_request_id += 1;
        let id = self.last_request_id;
        self.active = Some(ActiveRequest {
            id,
            kind,
            in_flight: true,
        });
        (id, superseded)
    }

    /// Drops the active request. Returns its id when it was still running.
    pub(crate) fn invalidate_active(&mut self) -> Option<RequestId> {
        self.active
            .take()
            .filter(|active| active.in_flight)
            .map(|active| active.id)
    }

    /// Topic of the active article request if `request_id` is current and running.
    pub(crate) fn live_article_topic(&self, request_id: RequestId) -> Option<String> {
        match &self.active {
            Some(ActiveRequest {
                id,
                kind: RequestKind::Article { topic },
                in_flight: true,
            }) if *id == request_id => Some(topic.clone()),
            _ => None,
        }
    }

    pub(crate) fn is_live_random_pick(&self, request_id: RequestId) -> bool {
        matches!(
            &self.active,
            Some(ActiveRequest {
                id,
                kind: RequestKind::RandomPick,
                in_flight: true,
            }) if *id == request_id
        )
    }

    pub(crate) fn finish_active(&mut self) {
        if let Some(active) = self.active.as_mut() {
            active.in_flight = false;
        }
        self.mark_dirty();
    }

    pub(crate) fn show_home(&mut self) {
        self.nav = NavigationState::Home;
        self.article = None;
        self.mark_dirty();
    }

    pub(crate) fn show_loading(&mut self, topic: &str, article: Option<Article>) {
        self.nav = NavigationState::Loading {
            topic: topic.to_string(),
        };
        self.article = article;
        self.mark_dirty();
    }

    pub(crate) fn show_error(&mut self, topic: String, message: String) {
        self.nav = NavigationState::Error { topic, message };
        self.mark_dirty();
    }

    pub(crate) fn ensure_viewing(&mut self) {
        if matches!(self.nav, NavigationState::Loading { .. }) {
            self.nav = NavigationState::Viewing;
            self.mark_dirty();
        }
    }

    pub(crate) fn merge_update(&mut self, update: ArticleUpdate) {
        let Some(article) = self.article.as_mut() else {
            return;
        };
        if let Some(content) = update.content.filter(|content| !content.is_empty()) {
            if article.content != content {
                article.content = content;
                self.dirty = true;
            }
        }
        if let Some(sources) = update.sources {
            if article.sources != sources {
                article.sources = sources;
                self.dirty = true;
            }
        }
    }

    pub(crate) fn record_history(&mut self, topic: &str, timestamp: i64) -> bool {
        let changed = self.history.append(topic, timestamp);
        if changed {
            self.mark_dirty();
        }
        changed
    }

    pub(crate) fn restore_history(&mut self, entries: Vec<HistoryEntry>) {
        self.history = HistoryLog::from_entries(entries);
        self.mark_dirty();
    }
}
