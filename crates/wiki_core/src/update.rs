use wiki_logging::{wiki_debug, wiki_info, wiki_warn};

use crate::{
    AppState, Article, Effect, Msg, NavigationState, RequestId, RequestKind,
    DEFAULT_ERROR_MESSAGE, PICKING_TOPIC_LABEL, RANDOM_FALLBACK_TOPIC,
};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::NavigateRequested(topic) => load(&mut state, &topic),
        Msg::RandomRequested => load_random(&mut state),
        Msg::RetryRequested => match state.navigation() {
            NavigationState::Error { topic, .. } => {
                let topic = topic.clone();
                load(&mut state, &topic)
            }
            _ => Vec::new(),
        },
        Msg::ResumeRequested => match state.history().latest() {
            Some(entry) => {
                let topic = entry.topic.clone();
                load(&mut state, &topic)
            }
            None => Vec::new(),
        },
        Msg::HistoryRestored(entries) => {
            state.restore_history(entries);
            Vec::new()
        }
        Msg::ArticleChunk { request_id, update } => {
            if state.live_article_topic(request_id).is_none() {
                discard_stale(request_id, "chunk");
                return (state, Vec::new());
            }
            state.ensure_viewing();
            state.merge_update(update);
            Vec::new()
        }
        Msg::ArticleCompleted {
            request_id,
            completed_at,
        } => {
            let Some(topic) = state.live_article_topic(request_id) else {
                discard_stale(request_id, "completion");
                return (state, Vec::new());
            };
            state.finish_active();
            state.ensure_viewing();
            wiki_info!("Article request {} for '{}' completed", request_id, topic);
            if state.record_history(&topic, completed_at) {
                vec![Effect::PersistHistory {
                    entries: state.history().entries(),
                }]
            } else {
                Vec::new()
            }
        }
        Msg::ArticleFailed {
            request_id,
            message,
        } => {
            let Some(topic) = state.live_article_topic(request_id) else {
                discard_stale(request_id, "failure");
                return (state, Vec::new());
            };
            wiki_warn!("Article request {} for '{}' failed: {}", request_id, topic, message);
            state.finish_active();
            let message = if message.trim().is_empty() {
                DEFAULT_ERROR_MESSAGE.to_string()
            } else {
                message
            };
            state.show_error(topic, message);
            Vec::new()
        }
        Msg::RandomTopicPicked { request_id, topic } => {
            if !state.is_live_random_pick(request_id) {
                discard_stale(request_id, "random topic");
                return (state, Vec::new());
            }
            let topic = if topic.trim().is_empty() {
                RANDOM_FALLBACK_TOPIC.to_string()
            } else {
                topic
            };
            state.finish_active();
            load(&mut state, &topic)
        }
        Msg::RandomTopicFailed { request_id } => {
            if !state.is_live_random_pick(request_id) {
                discard_stale(request_id, "random topic failure");
                return (state, Vec::new());
            }
            wiki_warn!(
                "Random topic request {} failed; using '{}'",
                request_id,
                RANDOM_FALLBACK_TOPIC
            );
            state.finish_active();
            load(&mut state, RANDOM_FALLBACK_TOPIC)
        }
        Msg::Tick | Msg::NoOp => Vec::new(),
    };

    (state, effects)
}

fn load(state: &mut AppState, raw_topic: &str) -> Vec<Effect> {
    let topic = raw_topic.trim();
    if topic.is_empty() {
        let superseded = state.invalidate_active();
        state.show_home();
        return superseded
            .map(|request_id| vec![Effect::CancelRequest { request_id }])
            .unwrap_or_default();
    }

    let (request_id, superseded) = state.begin_request(RequestKind::Article {
        topic: topic.to_string(),
    });
    state.show_loading(topic, Some(Article::empty(topic)));
    wiki_info!("Article request {} started for '{}'", request_id, topic);

    let mut effects = Vec::with_capacity(2);
    if let Some(request_id) = superseded {
        effects.push(Effect::CancelRequest { request_id });
    }
    effects.push(Effect::StreamArticle {
        request_id,
        topic: topic.to_string(),
    });
    effects
}

fn load_random(state: &mut AppState) -> Vec<Effect> {
    let (request_id, superseded) = state.begin_request(RequestKind::RandomPick);
    state.show_loading(PICKING_TOPIC_LABEL, None);

    let mut effects = Vec::with_capacity(2);
    if let Some(request_id) = superseded {
        effects.push(Effect::CancelRequest { request_id });
    }
    effects.push(Effect::PickRandomTopic { request_id });
    effects
}

fn discard_stale(request_id: RequestId, what: &str) {
    wiki_debug!("Discarding stale {} for request {}", what, request_id);
}
