use std::collections::HashMap;
use std::sync::{mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use wiki_logging::{wiki_debug, wiki_error, wiki_info};

use crate::generate::Generator;
use crate::{EngineEvent, RequestId};

enum EngineCommand {
    StreamArticle { request_id: RequestId, topic: String },
    PickRandomTopic { request_id: RequestId },
    Cancel { request_id: RequestId },
}

/// Runs generation requests on a background tokio runtime and reports
/// progress as [`EngineEvent`]s.
#[derive(Clone)]
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: Arc<Mutex<mpsc::Receiver<EngineEvent>>>,
}

impl EngineHandle {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();

        thread::spawn(move || {
            let runtime = match tokio::runtime::Runtime::new() {
                Ok(runtime) => runtime,
                Err(err) => {
                    wiki_error!("Failed to start engine runtime: {}", err);
                    return;
                }
            };
            // A request's token is cancelled when it is aborted or when its
            // task ends, so cancelled entries can be pruned.
            let mut requests: HashMap<RequestId, CancellationToken> = HashMap::new();
            while let Ok(command) = cmd_rx.recv() {
                requests.retain(|_, token| !token.is_cancelled());
                match command {
                    EngineCommand::StreamArticle { request_id, topic } => {
                        let token = CancellationToken::new();
                        requests.insert(request_id, token.clone());
                        runtime.spawn(run_article(
                            generator.clone(),
                            request_id,
                            topic,
                            token,
                            event_tx.clone(),
                        ));
                    }
                    EngineCommand::PickRandomTopic { request_id } => {
                        let token = CancellationToken::new();
                        requests.insert(request_id, token.clone());
                        runtime.spawn(run_random_topic(
                            generator.clone(),
                            request_id,
                            token,
                            event_tx.clone(),
                        ));
                    }
                    EngineCommand::Cancel { request_id } => {
                        if let Some(token) = requests.remove(&request_id) {
                            wiki_info!("Cancelling request {}", request_id);
                            token.cancel();
                        }
                    }
                }
            }
            wiki_debug!("Engine command channel closed");
        });

        Self {
            cmd_tx,
            event_rx: Arc::new(Mutex::new(event_rx)),
        }
    }

    pub fn stream_article(&self, request_id: RequestId, topic: impl Into<String>) {
        let _ = self.cmd_tx.send(EngineCommand::StreamArticle {
            request_id,
            topic: topic.into(),
        });
    }

    pub fn pick_random_topic(&self, request_id: RequestId) {
        let _ = self
            .cmd_tx
            .send(EngineCommand::PickRandomTopic { request_id });
    }

    pub fn cancel(&self, request_id: RequestId) {
        let _ = self.cmd_tx.send(EngineCommand::Cancel { request_id });
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx.lock().ok()?.try_recv().ok()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Option<EngineEvent> {
        self.event_rx.lock().ok()?.recv_timeout(timeout).ok()
    }

    /// Blocks until the next event; `None` once the engine thread is gone.
    pub fn recv(&self) -> Option<EngineEvent> {
        self.event_rx.lock().ok()?.recv().ok()
    }
}

async fn run_article(
    generator: Arc<dyn Generator>,
    request_id: RequestId,
    topic: String,
    token: CancellationToken,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    let _finished = token.clone().drop_guard();
    let mut stream = generator.stream_article(&topic);
    loop {
        let next = tokio::select! {
            _ = token.cancelled() => {
                let _ = event_tx.send(EngineEvent::Cancelled { request_id });
                return;
            }
            next = stream.next() => next,
        };
        match next {
            Some(Ok(article)) => {
                let _ = event_tx.send(EngineEvent::ArticleChunk {
                    request_id,
                    article,
                });
            }
            Some(Err(err)) => {
                let _ = event_tx.send(EngineEvent::ArticleFailed {
                    request_id,
                    message: err.to_string(),
                });
                return;
            }
            None => {
                let _ = event_tx.send(EngineEvent::ArticleCompleted { request_id });
                return;
            }
        }
    }
}

async fn run_random_topic(
    generator: Arc<dyn Generator>,
    request_id: RequestId,
    token: CancellationToken,
    event_tx: mpsc::Sender<EngineEvent>,
) {
    let _finished = token.clone().drop_guard();
    let event = tokio::select! {
        _ = token.cancelled() => EngineEvent::Cancelled { request_id },
        result = generator.suggest_random_topic() => EngineEvent::RandomTopic {
            request_id,
            result: result.map_err(|err| err.to_string()),
        },
    };
    let _ = event_tx.send(event);
}
