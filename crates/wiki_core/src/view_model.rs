use crate::Article;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageView {
    Home {
        /// Latest history topic, offered as "Resume Reading".
        resume_topic: Option<String>,
    },
    Loading {
        topic: String,
    },
    Viewing,
    Error {
        message: String,
    },
}

impl Default for PageView {
    fn default() -> Self {
        Self::Home { resume_topic: None }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AppViewModel {
    pub page: PageView,
    pub article: Option<Article>,
    /// A request is still running for the current page.
    pub streaming: bool,
    /// Recent history, most recent first.
    pub history: Vec<HistoryRowView>,
    pub dirty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRowView {
    pub topic: String,
    pub timestamp: i64,
    pub is_current: bool,
}
