use std::sync::{mpsc, Arc};
use std::thread;

use chrono::Utc;
use wiki_core::{ArticleUpdate, Effect, Msg, Source};
use wiki_engine::{EngineEvent, EngineHandle, KeyValueStore, PartialArticle};
use wiki_logging::{wiki_debug, wiki_info, wiki_warn};

use super::app::LoopEvent;
use super::persistence;

/// Executes controller effects and feeds engine events back as messages.
pub struct EffectRunner {
    engine: EngineHandle,
    store: Arc<dyn KeyValueStore>,
}

impl EffectRunner {
    pub fn new(
        engine: EngineHandle,
        store: Arc<dyn KeyValueStore>,
        events: mpsc::Sender<LoopEvent>,
    ) -> Self {
        let runner = Self { engine, store };
        runner.spawn_event_loop(events);
        runner
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::StreamArticle { request_id, topic } => {
                    wiki_info!("StreamArticle request_id={} topic={}", request_id, topic);
                    self.engine.stream_article(request_id, topic);
                }
                Effect::PickRandomTopic { request_id } => {
                    wiki_info!("PickRandomTopic request_id={}", request_id);
                    self.engine.pick_random_topic(request_id);
                }
                Effect::CancelRequest { request_id } => {
                    self.engine.cancel(request_id);
                }
                Effect::PersistHistory { entries } => {
                    persistence::save_history(self.store.as_ref(), &entries);
                }
            }
        }
    }

    fn spawn_event_loop(&self, events: mpsc::Sender<LoopEvent>) {
        let engine = self.engine.clone();
        thread::spawn(move || {
            while let Some(event) = engine.recv() {
                let Some(msg) = map_event(event, || Utc::now().timestamp_millis()) else {
                    continue;
                };
                if events.send(LoopEvent::Msg(msg)).is_err() {
                    break;
                }
            }
            wiki_debug!("Engine event loop stopped");
        });
    }
}

/// Translates an engine event into a controller message. `now` stamps
/// completions in unix milliseconds.
pub(crate) fn map_event(event: EngineEvent, now: impl Fn() -> i64) -> Option<Msg> {
    match event {
        EngineEvent::ArticleChunk {
            request_id,
            article,
        } => Some(Msg::ArticleChunk {
            request_id,
            update: to_update(article),
        }),
        EngineEvent::ArticleCompleted { request_id } => Some(Msg::ArticleCompleted {
            request_id,
            completed_at: now(),
        }),
        EngineEvent::ArticleFailed {
            request_id,
            message,
        } => Some(Msg::ArticleFailed {
            request_id,
            message,
        }),
        EngineEvent::RandomTopic {
            request_id,
            result: Ok(topic),
        } => Some(Msg::RandomTopicPicked { request_id, topic }),
        EngineEvent::RandomTopic {
            request_id,
            result: Err(err),
        } => {
            wiki_warn!("Random topic request {} failed: {}", request_id, err);
            Some(Msg::RandomTopicFailed { request_id })
        }
        EngineEvent::Cancelled { request_id } => {
            wiki_debug!("Request {} cancelled", request_id);
            None
        }
    }
}

fn to_update(article: PartialArticle) -> ArticleUpdate {
    ArticleUpdate {
        content: article.content,
        sources: article.sources.map(|sources| {
            sources
                .into_iter()
                .map(|source| Source {
                    title: source.title,
                    uri: source.uri,
                })
                .collect()
        }),
    }
}
