use std::sync::{Arc, Once};
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use pretty_assertions::assert_eq;
use wiki_engine::{
    ArticleStream, EngineEvent, EngineHandle, GenerationError, Generator, PartialArticle,
};

const WAIT: Duration = Duration::from_secs(5);

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(wiki_logging::initialize_for_tests);
}

/// Streams a fixed list of chunks, or never finishes when `hang` is set.
struct ScriptedGenerator {
    chunks: Vec<&'static str>,
    fail_after: bool,
    hang: bool,
}

impl ScriptedGenerator {
    fn finishing(chunks: Vec<&'static str>) -> Self {
        Self {
            chunks,
            fail_after: false,
            hang: false,
        }
    }
}

#[async_trait::async_trait]
impl Generator for ScriptedGenerator {
    fn stream_article(&self, _topic: &str) -> ArticleStream {
        let mut text = String::new();
        let mut elements: Vec<Result<PartialArticle, GenerationError>> = Vec::new();
        for chunk in &self.chunks {
            text.push_str(chunk);
            elements.push(Ok(PartialArticle {
                content: Some(text.clone()),
                sources: None,
            }));
        }
        if self.fail_after {
            elements.push(Err(GenerationError::Stream("connection reset".to_string())));
        }
        let head = stream::iter(elements);
        if self.hang {
            head.chain(stream::pending()).boxed()
        } else {
            head.boxed()
        }
    }

    async fn suggest_random_topic(&self) -> Result<String, GenerationError> {
        if self.hang {
            std::future::pending::<()>().await;
        }
        Ok("Tardigrade".to_string())
    }
}

fn drain_until_terminal(engine: &EngineHandle) -> Vec<EngineEvent> {
    init_logging();
    let mut events = Vec::new();
    while let Some(event) = engine.recv_timeout(WAIT) {
        let terminal = !matches!(event, EngineEvent::ArticleChunk { .. });
        events.push(event);
        if terminal {
            break;
        }
    }
    events
}

#[test]
fn article_chunks_arrive_in_order_then_complete() {
    let engine = EngineHandle::new(Arc::new(ScriptedGenerator::finishing(vec!["# A", "\nbody"])));

    engine.stream_article(1, "A");
    let events = drain_until_terminal(&engine);

    assert_eq!(
        events,
        vec![
            EngineEvent::ArticleChunk {
                request_id: 1,
                article: PartialArticle {
                    content: Some("# A".to_string()),
                    sources: None,
                },
            },
            EngineEvent::ArticleChunk {
                request_id: 1,
                article: PartialArticle {
                    content: Some("# A\nbody".to_string()),
                    sources: None,
                },
            },
            EngineEvent::ArticleCompleted { request_id: 1 },
        ]
    );
}

#[test]
fn stream_error_becomes_failure_event() {
    let engine = EngineHandle::new(Arc::new(ScriptedGenerator {
        chunks: vec!["partial"],
        fail_after: true,
        hang: false,
    }));

    engine.stream_article(4, "A");
    let events = drain_until_terminal(&engine);

    assert_eq!(events.len(), 2);
    assert_eq!(
        events[1],
        EngineEvent::ArticleFailed {
            request_id: 4,
            message: "stream interrupted: connection reset".to_string(),
        }
    );
}

#[test]
fn cancelling_a_hung_stream_reports_cancelled_and_never_completes() {
    let engine = EngineHandle::new(Arc::new(ScriptedGenerator {
        chunks: vec!["# Slow"],
        fail_after: false,
        hang: true,
    }));

    init_logging();
    engine.stream_article(2, "Slow");
    let first = engine.recv_timeout(WAIT);
    assert!(matches!(first, Some(EngineEvent::ArticleChunk { request_id: 2, .. })));

    engine.cancel(2);
    assert_eq!(
        engine.recv_timeout(WAIT),
        Some(EngineEvent::Cancelled { request_id: 2 })
    );
    assert_eq!(engine.recv_timeout(Duration::from_millis(200)), None);
}

#[test]
fn random_topic_result_carries_request_id() {
    let engine = EngineHandle::new(Arc::new(ScriptedGenerator::finishing(Vec::new())));

    engine.pick_random_topic(9);

    assert_eq!(
        engine.recv_timeout(WAIT),
        Some(EngineEvent::RandomTopic {
            request_id: 9,
            result: Ok("Tardigrade".to_string()),
        })
    );
}

#[test]
fn cancelling_random_pick_reports_cancelled() {
    let engine = EngineHandle::new(Arc::new(ScriptedGenerator {
        chunks: Vec::new(),
        fail_after: false,
        hang: true,
    }));

    engine.pick_random_topic(3);
    engine.cancel(3);

    assert_eq!(
        engine.recv_timeout(WAIT),
        Some(EngineEvent::Cancelled { request_id: 3 })
    );
}

#[test]
fn cancelling_unknown_request_is_ignored() {
    let engine = EngineHandle::new(Arc::new(ScriptedGenerator::finishing(vec!["x"])));

    engine.cancel(42);
    engine.stream_article(5, "X");

    let events = drain_until_terminal(&engine);
    assert_eq!(events.last(), Some(&EngineEvent::ArticleCompleted { request_id: 5 }));
}
