use futures_util::StreamExt;
use pretty_assertions::assert_eq;
use wiki_engine::{
    GeminiGenerator, GenerationError, Generator, GeneratorSettings, GroundingSource,
    PartialArticle,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const STREAM_PATH: &str = "/v1beta/models/test-model:streamGenerateContent";
const GENERATE_PATH: &str = "/v1beta/models/test-model:generateContent";

fn generator(server: &MockServer) -> GeminiGenerator {
    GeminiGenerator::new(GeneratorSettings {
        base_url: server.uri(),
        model: "test-model".to_string(),
        api_key: "test-key".to_string(),
        ..GeneratorSettings::default()
    })
    .expect("client builds")
}

fn sse_body(payloads: &[&str]) -> String {
    payloads
        .iter()
        .map(|payload| format!("data: {payload}\n\n"))
        .collect()
}

fn sse_response(payloads: &[&str]) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(sse_body(payloads), "text/event-stream")
}

async fn collect(
    generator: &GeminiGenerator,
    topic: &str,
) -> Vec<Result<PartialArticle, GenerationError>> {
    generator.stream_article(topic).collect().await
}

#[tokio::test]
async fn article_stream_yields_cumulative_text_then_sources() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .and(header("x-goog-api-key", "test-key"))
        .respond_with(sse_response(&[
            r##"{"candidates":[{"content":{"parts":[{"text":"# Eiffel"}]}}]}"##,
            r#"{"candidates":[{"content":{"parts":[{"text":" Tower\nA tower in [[Paris]]."}]},"groundingMetadata":{"groundingChunks":[{"web":{"uri":"http://x","title":"Wiki"}}]}}]}"#,
            r#"{"candidates":[{"groundingMetadata":{"groundingChunks":[{"web":{"uri":"http://x","title":"Dup"}},{"web":{"uri":"http://y","title":"Docs"}}]}}]}"#,
        ]))
        .mount(&server)
        .await;

    let elements = collect(&generator(&server), "Eiffel Tower").await;
    let elements: Vec<PartialArticle> = elements
        .into_iter()
        .map(|element| element.expect("no stream errors"))
        .collect();

    assert_eq!(
        elements,
        vec![
            PartialArticle {
                content: Some("# Eiffel".to_string()),
                sources: None,
            },
            PartialArticle {
                content: Some("# Eiffel Tower\nA tower in [[Paris]].".to_string()),
                sources: None,
            },
            PartialArticle {
                content: Some("# Eiffel Tower\nA tower in [[Paris]].".to_string()),
                sources: Some(vec![
                    GroundingSource {
                        title: "Wiki".to_string(),
                        uri: "http://x".to_string(),
                    },
                    GroundingSource {
                        title: "Docs".to_string(),
                        uri: "http://y".to_string(),
                    },
                ]),
            },
        ]
    );
}

#[tokio::test]
async fn article_request_carries_topic_and_search_tool() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .respond_with(sse_response(&[
            r#"{"candidates":[{"content":{"parts":[{"text":"ok"}]}}]}"#,
        ]))
        .expect(1)
        .mount(&server)
        .await;

    let _ = collect(&generator(&server), "Champ de Mars").await;

    let requests = server.received_requests().await.expect("recording enabled");
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).expect("json body");
    assert_eq!(requests[0].url.query(), Some("alt=sse"));
    assert_eq!(
        body["contents"][0]["parts"][0]["text"],
        "Write a wiki page for: Champ de Mars"
    );
    assert!(body["tools"][0].get("googleSearch").is_some());
    assert!(body["systemInstruction"]["parts"][0]["text"]
        .as_str()
        .is_some_and(|text| text.contains("[[")));
}

#[tokio::test]
async fn http_failure_is_a_single_error_element() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .respond_with(
            ResponseTemplate::new(500)
                .set_body_raw(r#"{"error":{"message":"backend down"}}"#, "application/json"),
        )
        .mount(&server)
        .await;

    let elements = collect(&generator(&server), "Anything").await;

    assert_eq!(elements.len(), 1);
    match &elements[0] {
        Err(GenerationError::HttpStatus { status, message }) => {
            assert_eq!(*status, 500);
            assert_eq!(message, "backend down");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn error_event_mid_stream_ends_with_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .respond_with(sse_response(&[
            r#"{"candidates":[{"content":{"parts":[{"text":"partial"}]}}]}"#,
            r#"{"error":{"code":429,"message":"quota exceeded"}}"#,
        ]))
        .mount(&server)
        .await;

    let elements = collect(&generator(&server), "Anything").await;

    assert_eq!(elements.len(), 2);
    assert!(elements[0].is_ok());
    assert!(matches!(
        &elements[1],
        Err(GenerationError::Api(message)) if message == "quota exceeded"
    ));
}

#[tokio::test]
async fn malformed_event_is_a_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .respond_with(sse_response(&["{not json"]))
        .mount(&server)
        .await;

    let elements = collect(&generator(&server), "Anything").await;

    assert_eq!(elements.len(), 1);
    assert!(matches!(elements[0], Err(GenerationError::Decode(_))));
}

#[tokio::test]
async fn empty_stream_completes_with_empty_article() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .respond_with(sse_response(&[]))
        .mount(&server)
        .await;

    let elements = collect(&generator(&server), "Anything").await;

    assert_eq!(elements.len(), 1);
    assert_eq!(
        elements[0].as_ref().ok(),
        Some(&PartialArticle {
            content: Some(String::new()),
            sources: Some(Vec::new()),
        })
    );
}

#[tokio::test]
async fn random_topic_is_trimmed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"candidates":[{"content":{"parts":[{"text":"  Tardigrade \n"}]}}]}"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    let topic = generator(&server)
        .suggest_random_topic()
        .await
        .expect("topic");

    assert_eq!(topic, "Tardigrade");
}

#[tokio::test]
async fn blank_random_reply_falls_back_to_science() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"candidates":[{"content":{"parts":[{"text":"   "}]}}]}"#,
            "application/json",
        ))
        .mount(&server)
        .await;

    let topic = generator(&server)
        .suggest_random_topic()
        .await
        .expect("topic");

    assert_eq!(topic, "Science");
}

#[tokio::test]
async fn random_topic_failure_reports_status() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(GENERATE_PATH))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let err = generator(&server)
        .suggest_random_topic()
        .await
        .expect_err("status error");

    assert!(matches!(err, GenerationError::HttpStatus { status: 403, .. }));
}
