//! HTTP vendor adapters against wiremock backends.

use std::sync::Arc;

use futures::StreamExt;
use serde_json::{Value, json};
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use parley_gateway::config::StreamingAudioConfig;
use parley_gateway::core::llm::{
    BaseLLM, ChatMessage, ConversationHistory, GenerationDriver, LLMConfig, LLMError, OpenAIChat,
};
use parley_gateway::core::tts::{PlayHtTts, SynthesisDriver, TTSConfig, TTSError};

// =============================================================================
// OpenAI
// =============================================================================

fn delta(text: &str) -> String {
    format!(
        "data: {}\n\n",
        json!({"choices": [{"index": 0, "delta": {"content": text}}]})
    )
}

fn openai(server: &MockServer) -> OpenAIChat {
    OpenAIChat::new(LLMConfig {
        api_key: "sk-test".to_string(),
        base_url: Some(format!("{}/v1/chat/completions", server.uri())),
        ..Default::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_openai_streams_fragments_until_done() {
    let server = MockServer::start().await;
    let sse = format!(
        "{}{}{}data: [DONE]\n\n",
        delta("Waffles "),
        delta("are "),
        delta("better.")
    );
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({"model": "gpt-3.5-turbo", "stream": true})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse, "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let llm = openai(&server);
    let fragments: Vec<String> = llm
        .stream_chat(vec![ChatMessage::user("which is better?")])
        .await
        .unwrap()
        .map(|item| item.unwrap())
        .collect()
        .await;

    assert_eq!(fragments, vec!["Waffles ", "are ", "better."]);
}

#[tokio::test]
async fn test_openai_rejected_key() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let result = openai(&server).stream_chat(vec![ChatMessage::user("hi")]).await;
    assert!(matches!(result, Err(LLMError::AuthenticationFailed(_))));
}

#[tokio::test]
async fn test_generation_driver_sends_context_and_records_answer() {
    let server = MockServer::start().await;
    let sse = format!("{}{}data: [DONE]\n\n", delta("Pancakes"), delta("!"));
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(sse, "text/event-stream"))
        .mount(&server)
        .await;

    let history = ConversationHistory::shared();
    let driver = GenerationDriver::new(Arc::new(openai(&server)), history.clone(), "Be brief.");
    driver.append("breakfast").unwrap();

    let answer: Vec<String> = driver
        .generate(None)
        .await
        .unwrap()
        .map(|item| item.unwrap())
        .collect()
        .await;
    assert_eq!(answer.concat(), "Pancakes!");

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][0]["content"], "Be brief.");
    assert_eq!(body["messages"][1]["content"], "Conversation Context: ");
    assert_eq!(body["messages"][2]["role"], "user");
    assert_eq!(body["messages"][2]["content"], "breakfast");

    let history = history.lock();
    assert_eq!(history.len(), 2);
    assert_eq!(history.closed_turns()[1].text, "Pancakes!");
}

// =============================================================================
// Play.ht
// =============================================================================

fn wav_header() -> Vec<u8> {
    let mut h = Vec::new();
    h.extend_from_slice(b"RIFF");
    h.extend_from_slice(&u32::MAX.to_le_bytes());
    h.extend_from_slice(b"WAVE");
    h.extend_from_slice(b"fmt ");
    h.extend_from_slice(&16u32.to_le_bytes());
    h.extend_from_slice(&[0u8; 16]);
    h.extend_from_slice(b"data");
    h.extend_from_slice(&u32::MAX.to_le_bytes());
    h
}

fn playht(server: &MockServer) -> PlayHtTts {
    PlayHtTts::new(TTSConfig {
        provider: "playht".to_string(),
        api_key: "ht-key".to_string(),
        user_id: Some("user-1".to_string()),
        base_url: Some(format!("{}/api/v2/tts/stream", server.uri())),
        ..Default::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_playht_frames_skip_wav_header() {
    let server = MockServer::start().await;
    let mut wav = wav_header();
    wav.extend_from_slice(&[5u8; 1280]);
    Mock::given(method("POST"))
        .and(path("/api/v2/tts/stream"))
        .and(header("X-USER-ID", "user-1"))
        .and(header("AUTHORIZATION", "ht-key"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(wav, "audio/wav"))
        .expect(2)
        .mount(&server)
        .await;

    let audio = StreamingAudioConfig::new(16000, 1, 16, 20).unwrap();
    let frames: Vec<_> = SynthesisDriver::new(Box::new(playht(&server)), &audio, true)
        .speak_stream(Box::pin(futures::stream::iter([
            "First sentence. ".to_string(),
            "Second one.".to_string(),
        ])))
        .await
        .unwrap()
        .map(|frame| frame.unwrap())
        .collect()
        .await;

    // Only the first response's header is a preamble chunk; the second is stripped
    assert_eq!(frames.len(), 4);
    assert!(frames.iter().all(|frame| frame.len() == 640));
    assert!(frames.iter().all(|frame| frame.iter().all(|&b| b == 5)));
}

#[tokio::test]
async fn test_playht_error_status_surfaces_in_stream() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(403)
                .set_body_json(json!({"error_message": "bad key", "error_id": "AUTH"})),
        )
        .mount(&server)
        .await;

    let audio = StreamingAudioConfig::new(16000, 1, 16, 20).unwrap();
    let mut frames = SynthesisDriver::new(Box::new(playht(&server)), &audio, true)
        .speak("Hello there.")
        .await
        .unwrap();

    assert!(matches!(
        frames.next().await,
        Some(Err(TTSError::AuthenticationFailed(_)))
    ));
    assert!(frames.next().await.is_none());
}
