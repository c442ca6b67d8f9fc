//! HTTP adapter tests against a local fake API server

use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::Json;
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::post;
use banter::completion::DEFAULT_MODEL;
use banter::voice::{AudioSink, OpenAiSpeech, TextToSpeech};
use banter::{
    ChatMessage, CompletionProvider, Error, OpenAiCompletion, SpeechSynthesizer, TurnController,
    TurnStatus,
};
use secrecy::SecretString;
use serde_json::{Value, json};

/// Serve `router` on an ephemeral port and return its `/v1` base URL
async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}/v1")
}

fn key() -> SecretString {
    SecretString::from("sk-test".to_string())
}

type Captured = Arc<Mutex<Vec<(Option<String>, Value)>>>;

fn chat_router(reply: &'static str, captured: Captured) -> Router {
    Router::new().route(
        "/v1/chat/completions",
        post(move |headers: HeaderMap, Json(body): Json<Value>| {
            let captured = Arc::clone(&captured);
            async move {
                let auth = headers
                    .get(header::AUTHORIZATION)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                captured.lock().unwrap().push((auth, body));
                Json(json!({
                    "id": "chatcmpl-test",
                    "choices": [
                        {"index": 0, "message": {"role": "assistant", "content": reply}},
                        {"index": 1, "message": {"role": "assistant", "content": "ignored"}}
                    ]
                }))
            }
        }),
    )
}

#[tokio::test]
async fn test_completion_sends_bearer_and_history() {
    let captured = Captured::default();
    let base = serve(chat_router("Hi there", Arc::clone(&captured))).await;

    let client = OpenAiCompletion::new(key(), &base, DEFAULT_MODEL.to_string());
    let reply = client
        .complete(&[ChatMessage::system("coach"), ChatMessage::user("hello")])
        .await
        .unwrap();
    assert_eq!(reply, "Hi there");

    let captured = captured.lock().unwrap();
    let (auth, body) = &captured[0];
    assert_eq!(auth.as_deref(), Some("Bearer sk-test"));
    assert_eq!(body["model"], DEFAULT_MODEL);
    assert_eq!(
        body["messages"],
        json!([
            {"role": "system", "content": "coach"},
            {"role": "user", "content": "hello"}
        ])
    );
}

#[tokio::test]
async fn test_completion_error_status() {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(|| async { (StatusCode::UNAUTHORIZED, "invalid api key") }),
    );
    let base = serve(router).await;

    let client = OpenAiCompletion::new(key(), &base, DEFAULT_MODEL.to_string());
    let err = client.complete(&[ChatMessage::user("hi")]).await.unwrap_err();

    match err {
        Error::Completion(message) => {
            assert!(message.contains("401"));
            assert!(message.contains("invalid api key"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_completion_malformed_body() {
    let router = Router::new().route(
        "/v1/chat/completions",
        post(|| async { "not json" }),
    );
    let base = serve(router).await;

    let client = OpenAiCompletion::new(key(), &base, DEFAULT_MODEL.to_string());
    assert!(matches!(
        client.complete(&[ChatMessage::user("hi")]).await,
        Err(Error::Completion(_))
    ));
}

#[tokio::test]
async fn test_controller_round_trip_over_http() {
    let captured = Captured::default();
    let base = serve(chat_router("  Hello!  \n", Arc::clone(&captured))).await;

    let provider = Arc::new(OpenAiCompletion::new(key(), &base, DEFAULT_MODEL.to_string()));
    let (mut ctl, mut rx) = TurnController::new(provider, "You are a coach.");

    let id = ctl.send_turn("hi").unwrap();
    let completion = rx.recv().await.unwrap();
    ctl.apply(completion);

    let reply = ctl.conversation().get(id).unwrap();
    assert_eq!(reply.status, TurnStatus::Complete);
    assert_eq!(reply.text, "Hello!");

    let captured = captured.lock().unwrap();
    assert_eq!(captured[0].1["messages"][0]["role"], "system");
    assert_eq!(captured[0].1["messages"][0]["content"], "You are a coach.");
}

#[tokio::test]
async fn test_speech_writes_clip_to_file() {
    let captured = Captured::default();
    let router = {
        let captured = Arc::clone(&captured);
        Router::new().route(
            "/v1/audio/speech",
            post(move |Json(body): Json<Value>| {
                let captured = Arc::clone(&captured);
                async move {
                    captured.lock().unwrap().push((None, body));
                    ([(header::CONTENT_TYPE, "audio/mpeg")], vec![0xFFu8, 0xFB, 0x90, 0x00])
                }
            }),
        )
    };
    let base = serve(router).await;

    let dir = tempfile::tempdir().unwrap();
    // Parent directory is created on first write
    let clip = dir.path().join("cache").join("banter").join("reply.mp3");
    let tts = TextToSpeech::new(key(), &base, "tts-1".to_string(), 1.0).unwrap();
    let speech = OpenAiSpeech::new(tts, AudioSink::File(clip.clone()));

    speech.speak("  Hello!  ", "nova").await.unwrap();

    assert_eq!(std::fs::read(&clip).unwrap(), vec![0xFF, 0xFB, 0x90, 0x00]);
    let captured = captured.lock().unwrap();
    assert_eq!(captured[0].1["input"], "Hello!");
    assert_eq!(captured[0].1["voice"], "nova");
}

#[tokio::test]
async fn test_speech_skips_blank_text() {
    let dir = tempfile::tempdir().unwrap();
    let clip = dir.path().join("reply.mp3");
    // Unroutable base URL: any request would fail
    let tts = TextToSpeech::new(key(), "http://127.0.0.1:9/v1", "tts-1".to_string(), 1.0).unwrap();
    let speech = OpenAiSpeech::new(tts, AudioSink::File(clip.clone()));

    speech.speak(" \n ", "alloy").await.unwrap();
    assert!(!clip.exists());
}
