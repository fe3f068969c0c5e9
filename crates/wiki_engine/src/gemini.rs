//! Gemini REST client implementing [`Generator`].
//!
//! Articles use `streamGenerateContent?alt=sse`; each server-sent event holds
//! one `GenerateContentResponse` JSON document. Text parts are accumulated and
//! grounding chunks are collected across the whole stream, so the element
//! emitted after the last event carries the complete source set.

use std::pin::Pin;

use eventsource_stream::{Event, EventStreamError, Eventsource};
use futures_util::{Stream, StreamExt};
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use wiki_logging::{wiki_debug, wiki_info, wiki_warn};

use crate::generate::{ArticleStream, Generator, GeneratorSettings, SourceSet};
use crate::{GenerationError, PartialArticle};

const API_KEY_HEADER: &str = "x-goog-api-key";
const RANDOM_TOPIC_DEFAULT: &str = "Science";
const RANDOM_TOPIC_PROMPT: &str = "Give me the name of one random, interesting, specific encyclopedia topic. Just the name, nothing else.";

const SYSTEM_INSTRUCTION: &str = r#"You are the engine for "Infinite Wiki", a dynamic encyclopedia.
Your goal is to generate a comprehensive, factual, and well-structured wiki page for the requested topic.

Formatting Rules:
1. Use standard Markdown.
2. The first line should be the Title of the article as a Level 1 Header (# Title).
3. Provide a brief summary paragraph immediately after the title.
4. Use Level 2 Headers (##) for main sections (e.g., History, Significance, details appropriate to the topic).
5. CRITICAL: Identify key terms, concepts, or related topics within the text that would make good wiki pages themselves. Wrap these terms in double brackets like [[This]]. For example: "The [[Eiffel Tower]] is a wrought-iron lattice tower on the [[Champ de Mars]]."
6. Do not add a "References" section manually; citations are handled using the grounding metadata.
7. Maintain a neutral, encyclopedic tone.
8. If the topic is ambiguous, choose the most common interpretation or briefly mention alternatives."#;

type SseStream =
    Pin<Box<dyn Stream<Item = Result<Event, EventStreamError<reqwest::Error>>> + Send>>;

#[derive(Debug, Clone)]
pub struct GeminiGenerator {
    settings: GeneratorSettings,
    client: reqwest::Client,
}

impl GeminiGenerator {
    pub fn new(settings: GeneratorSettings) -> Result<Self, GenerationError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .build()
            .map_err(|err| GenerationError::Http(err.to_string()))?;
        Ok(Self { settings, client })
    }

    pub fn settings(&self) -> &GeneratorSettings {
        &self.settings
    }

    fn endpoint(&self, method: &str) -> String {
        format!(
            "{}/v1beta/models/{}:{}",
            self.settings.base_url.trim_end_matches('/'),
            self.settings.model,
            method
        )
    }

    fn post(
        &self,
        url: String,
        body: &GenerateContentRequest,
    ) -> Result<reqwest::RequestBuilder, GenerationError> {
        let payload = serde_json::to_vec(body)?;
        Ok(self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(API_KEY_HEADER, self.settings.api_key.as_str())
            .body(payload))
    }

    fn article_request(&self, topic: &str) -> Result<reqwest::RequestBuilder, GenerationError> {
        let body = GenerateContentRequest {
            contents: vec![RequestContent::user(format!("Write a wiki page for: {topic}"))],
            system_instruction: Some(RequestContent::system(SYSTEM_INSTRUCTION)),
            tools: vec![Tool {
                google_search: GoogleSearch {},
            }],
            generation_config: GenerationConfig {
                temperature: self.settings.article_temperature,
            },
        };
        let url = format!("{}?alt=sse", self.endpoint("streamGenerateContent"));
        self.post(url, &body)
    }
}

#[async_trait::async_trait]
impl Generator for GeminiGenerator {
    fn stream_article(&self, topic: &str) -> ArticleStream {
        wiki_info!("Requesting article '{}' from model {}", topic, self.settings.model);
        let phase = match self.article_request(topic) {
            Ok(request) => StreamPhase::Connect(request),
            Err(err) => StreamPhase::Failed(err),
        };
        futures_util::stream::unfold(phase, next_element).boxed()
    }

    async fn suggest_random_topic(&self) -> Result<String, GenerationError> {
        let body = GenerateContentRequest {
            contents: vec![RequestContent::user(RANDOM_TOPIC_PROMPT.to_string())],
            system_instruction: None,
            tools: Vec::new(),
            generation_config: GenerationConfig {
                temperature: self.settings.topic_temperature,
            },
        };
        let response = self
            .post(self.endpoint("generateContent"), &body)?
            .send()
            .await
            .map_err(|err| GenerationError::Http(err.to_string()))?;
        let response = check_status(response).await?;
        let text = response
            .text()
            .await
            .map_err(|err| GenerationError::Http(err.to_string()))?;

        let parsed: GenerateContentResponse = serde_json::from_str(&text)?;
        if let Some(error) = parsed.error {
            return Err(GenerationError::Api(error.message));
        }
        let topic = parsed.text().trim().to_string();
        if topic.is_empty() {
            wiki_warn!("Empty random topic reply; using '{}'", RANDOM_TOPIC_DEFAULT);
            return Ok(RANDOM_TOPIC_DEFAULT.to_string());
        }
        Ok(topic)
    }
}

enum StreamPhase {
    Connect(reqwest::RequestBuilder),
    Streaming {
        events: SseStream,
        text: String,
        sources: SourceSet,
    },
    Failed(GenerationError),
    Done,
}

async fn next_element(
    mut phase: StreamPhase,
) -> Option<(Result<PartialArticle, GenerationError>, StreamPhase)> {
    loop {
        phase = match phase {
            StreamPhase::Done => return None,
            StreamPhase::Failed(err) => {
                wiki_warn!("Article stream failed: {}", err);
                return Some((Err(err), StreamPhase::Done));
            }
            StreamPhase::Connect(request) => match open_event_stream(request).await {
                Ok(events) => StreamPhase::Streaming {
                    events,
                    text: String::new(),
                    sources: SourceSet::new(),
                },
                Err(err) => StreamPhase::Failed(err),
            },
            StreamPhase::Streaming {
                mut events,
                mut text,
                mut sources,
            } => match events.next().await {
                None => {
                    wiki_debug!(
                        "Article stream finished: {} bytes, {} sources",
                        text.len(),
                        sources.len()
                    );
                    let last = PartialArticle {
                        content: Some(text),
                        sources: Some(sources.to_vec()),
                    };
                    return Some((Ok(last), StreamPhase::Done));
                }
                Some(Err(err)) => StreamPhase::Failed(GenerationError::Stream(err.to_string())),
                Some(Ok(event)) => match decode_event(&event.data) {
                    Err(err) => StreamPhase::Failed(err),
                    Ok(None) => StreamPhase::Streaming {
                        events,
                        text,
                        sources,
                    },
                    Ok(Some(response)) => {
                        response.collect_sources(&mut sources);
                        let delta = response.text();
                        if delta.is_empty() {
                            StreamPhase::Streaming {
                                events,
                                text,
                                sources,
                            }
                        } else {
                            text.push_str(&delta);
                            let partial = PartialArticle {
                                content: Some(text.clone()),
                                sources: None,
                            };
                            return Some((
                                Ok(partial),
                                StreamPhase::Streaming {
                                    events,
                                    text,
                                    sources,
                                },
                            ));
                        }
                    }
                },
            },
        };
    }
}

async fn open_event_stream(request: reqwest::RequestBuilder) -> Result<SseStream, GenerationError> {
    let response = request
        .send()
        .await
        .map_err(|err| GenerationError::Http(err.to_string()))?;
    let response = check_status(response).await?;
    Ok(Box::pin(response.bytes_stream().eventsource()))
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, GenerationError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|envelope| envelope.error.message)
        .ok()
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| status.to_string());
    Err(GenerationError::HttpStatus {
        status: status.as_u16(),
        message,
    })
}

/// Parses one SSE payload. Blank keep-alive payloads yield `None`.
fn decode_event(data: &str) -> Result<Option<GenerateContentResponse>, GenerationError> {
    let data = data.trim();
    if data.is_empty() {
        return Ok(None);
    }
    let response: GenerateContentResponse = serde_json::from_str(data)?;
    if let Some(error) = response.error {
        return Err(GenerationError::Api(error.message));
    }
    Ok(Some(response))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<RequestContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<RequestContent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Tool>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct RequestContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<RequestPart>,
}

impl RequestContent {
    fn user(text: String) -> Self {
        Self {
            role: Some("user"),
            parts: vec![RequestPart { text }],
        }
    }

    fn system(text: &str) -> Self {
        Self {
            role: None,
            parts: vec![RequestPart {
                text: text.to_string(),
            }],
        }
    }
}

#[derive(Debug, Serialize)]
struct RequestPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Tool {
    google_search: GoogleSearch,
}

#[derive(Debug, Serialize)]
struct GoogleSearch {}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    error: Option<ApiError>,
}

impl GenerateContentResponse {
    /// Text of the first candidate, excluding thought parts.
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter(|part| !part.thought.unwrap_or(false))
                    .filter_map(|part| part.text.as_deref())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn collect_sources(&self, sources: &mut SourceSet) {
        let chunks = self
            .candidates
            .first()
            .and_then(|candidate| candidate.grounding_metadata.as_ref())
            .map(|metadata| metadata.grounding_chunks.as_slice())
            .unwrap_or_default();
        for web in chunks.iter().filter_map(|chunk| chunk.web.as_ref()) {
            if let (Some(title), Some(uri)) = (web.title.as_deref(), web.uri.as_deref()) {
                sources.insert(title, uri);
            }
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<ResponseContent>,
    grounding_metadata: Option<GroundingMetadata>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Default, Deserialize)]
struct ResponsePart {
    text: Option<String>,
    thought: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroundingMetadata {
    #[serde(default)]
    grounding_chunks: Vec<GroundingChunk>,
}

#[derive(Debug, Default, Deserialize)]
struct GroundingChunk {
    web: Option<WebChunk>,
}

#[derive(Debug, Default, Deserialize)]
struct WebChunk {
    uri: Option<String>,
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

#[derive(Debug, Default, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}
