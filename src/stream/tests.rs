//! Tests for the streaming module

use super::*;
use crate::error::{ApiError, Error};
use crate::http::ByteStream;
use crate::testing::ScriptedConnector;
use bytes::Bytes;
use futures::StreamExt;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use test_case::test_case;

const STREAM_URL: &str = "/tweets/search/stream";

fn reader(connector: &Arc<ScriptedConnector>, policy: MalformedFrames) -> StreamReader {
    StreamReader::new(
        connector.clone(),
        StreamConfig::default().with_malformed_frames(policy),
    )
}

fn no_params() -> Vec<(String, String)> {
    Vec::new()
}

async fn drain(session: &mut StreamSession) -> Vec<EventResult> {
    let mut items = Vec::new();
    while let Some(item) = session.next_event().await {
        items.push(item);
    }
    items
}

fn ids(items: &[EventResult]) -> Vec<String> {
    items
        .iter()
        .filter_map(|item| item.as_ref().ok())
        .filter_map(|event| event.data())
        .filter_map(|data| data["id"].as_str().map(str::to_string))
        .collect()
}

// ============================================================================
// StreamEvent Tests
// ============================================================================

#[test]
fn test_decode_data_frame() {
    let event = StreamEvent::decode(
        r#"{"data":{"id":"1","text":"hi"},"includes":{"users":[{"id":"7"}]},"matching_rules":[{"id":"42","tag":"rust"}]}"#,
    )
    .unwrap();

    let StreamEvent::Data {
        data,
        includes,
        matching_rules,
    } = event
    else {
        panic!("Expected data event");
    };
    assert_eq!(data["id"], "1");
    assert_eq!(includes.users().len(), 1);
    assert_eq!(matching_rules, vec![json!({"id": "42", "tag": "rust"})]);
}

#[test]
fn test_decode_errors_frame() {
    let event = StreamEvent::decode(r#"{"errors":[{"title":"operational-disconnect"}]}"#).unwrap();
    assert_eq!(
        event,
        StreamEvent::Errors(vec![json!({"title": "operational-disconnect"})])
    );
    assert_eq!(event.kind(), "errors");
}

#[test]
fn test_decode_data_wins_over_errors() {
    let event = StreamEvent::decode(r#"{"data":{"id":"1"},"errors":[{"title":"partial"}]}"#).unwrap();
    assert!(event.is_data());
}

#[test_case(r#"{"connection_issue":"TooManyConnections"}"#; "unknown object")]
#[test_case("[1,2,3]"; "array")]
#[test_case("42"; "number")]
fn test_decode_unrecognized(frame: &str) {
    let event = StreamEvent::decode(frame).unwrap();
    assert_eq!(event.kind(), "unrecognized");
}

#[test]
fn test_decode_invalid_json() {
    assert!(StreamEvent::decode("{not json").is_err());
}

#[test]
fn test_event_data_as() {
    #[derive(serde::Deserialize)]
    struct Tweet {
        id: String,
    }

    let event = StreamEvent::decode(r#"{"data":{"id":"9"}}"#).unwrap();
    let tweet: Tweet = event.data_as().unwrap();
    assert_eq!(tweet.id, "9");

    let errors = StreamEvent::Errors(Vec::new());
    assert!(matches!(
        errors.data_as::<Tweet>(),
        Err(Error::Decode { .. })
    ));
}

#[test]
fn test_stream_config_from_yaml() {
    let config: StreamConfig = serde_yaml::from_str("malformed_frames: surface\n").unwrap();
    assert_eq!(config.malformed_frames, MalformedFrames::Surface);
    assert_eq!(config.buffer, 1);
}

// ============================================================================
// StreamReader Tests
// ============================================================================

#[tokio::test]
async fn test_stream_two_events_and_heartbeat() {
    let connector = Arc::new(ScriptedConnector::chunks(vec![
        "{\"data\":{\"id\":\"1\"}}\r\n",
        "\r\n",
        "{\"data\":{\"id\":\"2\"}}\n",
    ]));

    let mut session = reader(&connector, MalformedFrames::Skip)
        .start(STREAM_URL, no_params())
        .await
        .unwrap();

    let items = drain(&mut session).await;
    assert_eq!(items.len(), 2);
    assert_eq!(ids(&items), vec!["1", "2"]);

    let summary = session.shutdown().await.unwrap();
    assert_eq!(summary.exit, StreamExit::ServerClosed);
    assert_eq!(summary.events, 2);
    assert_eq!(summary.heartbeats, 1);
    assert_eq!(connector.drop_count(), 1);
}

#[tokio::test]
async fn test_stream_frames_split_across_chunks() {
    let connector = Arc::new(ScriptedConnector::chunks(vec![
        "{\"data\":{\"i",
        "d\":\"1\"}}\n{\"data\"",
        ":{\"id\":\"2\"}}",
    ]));

    let mut session = reader(&connector, MalformedFrames::Skip)
        .start(STREAM_URL, no_params())
        .await
        .unwrap();

    // The second frame has no trailing newline and is decoded at end of body.
    let items = drain(&mut session).await;
    assert_eq!(ids(&items), vec!["1", "2"]);
}

#[tokio::test]
async fn test_stream_sends_query_params() {
    let connector = Arc::new(ScriptedConnector::chunks(vec![]));

    let mut session = reader(&connector, MalformedFrames::Skip)
        .start(STREAM_URL, [("tweet.fields", "author_id")])
        .await
        .unwrap();
    assert!(session.next_event().await.is_none());

    let requests = connector.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url, "/tweets/search/stream?tweet.fields=author_id");
}

#[tokio::test]
async fn test_stream_stop_releases_connection_once() {
    let chunks: Vec<crate::error::Result<Bytes>> =
        vec![Ok(Bytes::from_static(b"{\"data\":{\"id\":\"1\"}}\n"))];
    let body: ByteStream = Box::pin(futures::stream::iter(chunks).chain(futures::stream::pending()));
    let connector = Arc::new(ScriptedConnector::with_body(body));

    let mut session = reader(&connector, MalformedFrames::Skip)
        .start(STREAM_URL, no_params())
        .await
        .unwrap();

    let first = session.next_event().await.unwrap().unwrap();
    assert_eq!(first.data().unwrap()["id"], "1");
    assert!(session.is_running());

    session.stop();
    session.stop();
    assert!(!session.is_running());
    assert!(session.next_event().await.is_none());

    let summary = session.shutdown().await.unwrap();
    assert_eq!(summary.exit, StreamExit::Stopped);
    assert_eq!(connector.drop_count(), 1);
}

#[tokio::test]
async fn test_stream_dropped_session_releases_connection() {
    let body: ByteStream = Box::pin(futures::stream::pending());
    let connector = Arc::new(ScriptedConnector::with_body(body));

    let session = reader(&connector, MalformedFrames::Skip)
        .start(STREAM_URL, no_params())
        .await
        .unwrap();
    drop(session);

    tokio::time::timeout(Duration::from_secs(5), async {
        while connector.drop_count() == 0 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();
    assert_eq!(connector.drop_count(), 1);
}

#[tokio::test]
async fn test_stream_handshake_failure() {
    let connector = Arc::new(ScriptedConnector::refuse(Error::http_status(
        401,
        "Unauthorized",
    )));

    let result = reader(&connector, MalformedFrames::Skip)
        .start(STREAM_URL, no_params())
        .await;

    assert_eq!(result.unwrap_err(), ApiError::new(401, "Unauthorized"));
}

#[tokio::test]
async fn test_stream_read_error_is_terminal() {
    let chunks: Vec<crate::error::Result<Bytes>> = vec![
        Ok(Bytes::from_static(b"{\"data\":{\"id\":\"1\"}}\n")),
        Err(Error::Other("connection reset".to_string())),
        Ok(Bytes::from_static(b"{\"data\":{\"id\":\"2\"}}\n")),
    ];
    let connector = Arc::new(ScriptedConnector::with_body(Box::pin(futures::stream::iter(
        chunks,
    ))));

    let mut session = reader(&connector, MalformedFrames::Skip)
        .start(STREAM_URL, no_params())
        .await
        .unwrap();

    let items = drain(&mut session).await;
    assert_eq!(items.len(), 2);
    assert_eq!(ids(&items), vec!["1"]);
    let error = items[1].as_ref().unwrap_err();
    assert_eq!(error.code, 0);
    assert!(error.message.contains("connection reset"));

    let summary = session.shutdown().await.unwrap();
    assert_eq!(summary.exit, StreamExit::ReadError);
    assert_eq!(connector.drop_count(), 1);
}

#[tokio::test]
async fn test_malformed_frames_skip() {
    let connector = Arc::new(ScriptedConnector::chunks(vec![
        "{oops\n",
        "{\"data\":{\"id\":\"1\"}}\n",
    ]));

    let mut session = reader(&connector, MalformedFrames::Skip)
        .start(STREAM_URL, no_params())
        .await
        .unwrap();

    let items = drain(&mut session).await;
    assert_eq!(ids(&items), vec!["1"]);
    assert_eq!(items.len(), 1);
    assert_eq!(session.shutdown().await.unwrap().skipped, 1);
}

#[tokio::test]
async fn test_malformed_frames_surface() {
    let connector = Arc::new(ScriptedConnector::chunks(vec![
        "{oops\n",
        "{\"data\":{\"id\":\"1\"}}\n",
    ]));

    let items: Vec<_> = reader(&connector, MalformedFrames::Surface)
        .start(STREAM_URL, no_params())
        .await
        .unwrap()
        .collect()
        .await;

    assert_eq!(items.len(), 2);
    match items[0].as_ref().unwrap() {
        StreamEvent::Malformed { raw, reason } => {
            assert_eq!(raw, "{oops");
            assert!(!reason.is_empty());
        }
        other => panic!("Expected malformed event, got {other:?}"),
    }
    assert_eq!(ids(&items), vec!["1"]);
}

#[tokio::test]
async fn test_malformed_frames_terminate() {
    let connector = Arc::new(ScriptedConnector::chunks(vec![
        "{\"data\":{\"id\":\"1\"}}\n",
        "{oops\n",
        "{\"data\":{\"id\":\"2\"}}\n",
    ]));

    let mut session = reader(&connector, MalformedFrames::Terminate)
        .start(STREAM_URL, no_params())
        .await
        .unwrap();

    let items = drain(&mut session).await;
    assert_eq!(items.len(), 2);
    assert_eq!(ids(&items), vec!["1"]);
    assert_eq!(items[1].as_ref().unwrap_err().code, 0);
    assert_eq!(
        session.shutdown().await.unwrap().exit,
        StreamExit::Malformed
    );
}
