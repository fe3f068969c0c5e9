//! Wiki core: pure navigation state machine, history log and view-model helpers.
mod effect;
mod history;
mod msg;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use history::{HistoryEntry, HistoryLog, HISTORY_CAPACITY, HISTORY_DISPLAY_LIMIT};
pub use msg::Msg;
pub use state::{
    ActiveRequest, AppState, Article, ArticleUpdate, NavigationState, RequestId, RequestKind,
    Source, DEFAULT_ERROR_MESSAGE, PICKING_TOPIC_LABEL, RANDOM_FALLBACK_TOPIC,
};
pub use update::update;
pub use view_model::{AppViewModel, HistoryRowView, PageView};
