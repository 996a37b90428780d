//! Integration tests for the event stream session against a mock HTTP
//! server: connect handshake, event routing, reconnect choreography and
//! teardown.
//!
//! These tests run on the default single-threaded test runtime, so a
//! subscription attached right after `connect` returns is guaranteed to be
//! in place before the driver task consumes the first body chunk.

use std::io::Write;
use std::time::Duration;

use mockito::Matcher;
use tokio::time::timeout;
use voltstream::{
    Error, Event, EventStream, EventSubscription, NoticeSubscription, ResponseBody, StreamNotice,
    StreamState,
};

const WAIT: Duration = Duration::from_secs(5);

async fn next_event(sub: &mut EventSubscription) -> Event {
    timeout(WAIT, sub.recv())
        .await
        .expect("timed out waiting for an event")
        .expect("event channel closed early")
}

async fn next_notice(sub: &mut NoticeSubscription) -> StreamNotice {
    timeout(WAIT, sub.recv())
        .await
        .expect("timed out waiting for a lifecycle notice")
        .expect("lifecycle channel closed early")
}

/// Drain a subscription until it reports closure.
async fn assert_events_closed(sub: &mut EventSubscription) {
    timeout(WAIT, async {
        while sub.recv().await.is_some() {}
    })
    .await
    .expect("event channel did not close");
}

async fn assert_notices_closed(sub: &mut NoticeSubscription) {
    timeout(WAIT, async {
        while sub.recv().await.is_some() {}
    })
    .await
    .expect("lifecycle channel did not close");
}

fn sse_body(blocks: &[(&str, &str)]) -> String {
    blocks
        .iter()
        .map(|(name, data)| format!("event: {name}\ndata: {data}\n\n"))
        .collect()
}

#[tokio::test]
async fn token_rides_the_query_string_not_headers() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/v1/events")
        .match_query(Matcher::UrlEncoded(
            "access_token".into(),
            "sekrit-token".into(),
        ))
        .match_header("authorization", Matcher::Missing)
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(sse_body(&[("boot", "{\"ok\":true}")]))
        .expect(1)
        .create_async()
        .await;

    let stream = EventStream::builder(format!("{}/v1/events", server.url()))
        .token("sekrit-token")
        .reconnect_interval(Duration::from_secs(30))
        .connect()
        .await
        .unwrap();
    let mut events = stream.events();

    let event = next_event(&mut events).await;
    assert_eq!(event.name, "boot");

    mock.assert_async().await;
    stream.abort();
}

#[tokio::test]
async fn events_route_to_named_and_generic_subscriptions() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/v1/events")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(sse_body(&[
            ("temperature", "{\"c\":21}"),
            ("humidity", "{\"rh\":40}"),
        ]))
        .create_async()
        .await;

    let stream = EventStream::connect(&format!("{}/v1/events", server.url()), "t")
        .await
        .unwrap();
    let mut temperature = stream.subscribe("temperature").unwrap();
    let mut all = stream.events();

    assert_eq!(
        next_event(&mut all).await,
        Event::new("temperature", serde_json::json!({"c": 21}))
    );
    assert_eq!(
        next_event(&mut all).await,
        Event::new("humidity", serde_json::json!({"rh": 40}))
    );

    // The named subscription sees only its own events.
    let named = next_event(&mut temperature).await;
    assert_eq!(named.name, "temperature");
    stream.abort();
    assert_events_closed(&mut temperature).await;
}

#[tokio::test]
async fn events_assemble_across_chunk_boundaries() {
    let mut server = mockito::Server::new_async().await;
    // Chunks cut a field name, a CRLF pair, and a JSON payload in half.
    server
        .mock("GET", "/v1/events")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_chunked_body(|w| {
            w.write_all(b"event: temp")?;
            w.write_all(b"erature\r")?;
            w.write_all(b"\ndata: {\"c\":")?;
            w.write_all(b"21.5}\r\n\r")?;
            w.write_all(b"\n")
        })
        .create_async()
        .await;

    let stream = EventStream::connect(&format!("{}/v1/events", server.url()), "t")
        .await
        .unwrap();
    let mut events = stream.events();

    assert_eq!(
        next_event(&mut events).await,
        Event::new("temperature", serde_json::json!({"c": 21.5}))
    );
    stream.abort();
}

#[tokio::test]
async fn malformed_payloads_are_dropped_without_stalling_the_stream() {
    let mut server = mockito::Server::new_async().await;
    // Two data lines assemble to two JSON documents, which is not valid
    // JSON; the block must vanish while later events still flow. Blocks
    // missing a name or missing data are dropped by the framing layer.
    let body = format!(
        "event: broken\ndata: {{\"a\":1}}\ndata: {{\"b\":2}}\n\n\
         data: {{\"orphan\":true}}\n\n\
         event: nameonly\n\n{}",
        sse_body(&[("good", "{\"ok\":true}")])
    );
    server
        .mock("GET", "/v1/events")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(body)
        .create_async()
        .await;

    let stream = EventStream::connect(&format!("{}/v1/events", server.url()), "t")
        .await
        .unwrap();
    let mut events = stream.events();

    let only = next_event(&mut events).await;
    assert_eq!(only.name, "good");

    stream.abort();
    assert_events_closed(&mut events).await;
}

#[tokio::test]
async fn reserved_names_reach_only_the_generic_channel() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/v1/events")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(sse_body(&[("error", "{\"code\":123}")]))
        .create_async()
        .await;

    let stream = EventStream::connect(&format!("{}/v1/events", server.url()), "t")
        .await
        .unwrap();

    for name in ["event", "error", "response"] {
        match stream.subscribe(name) {
            Err(Error::ReservedEventName(rejected)) => assert_eq!(rejected, name),
            other => panic!("expected reserved-name rejection for {name}, got {other:?}"),
        }
    }

    let mut all = stream.events();
    let event = next_event(&mut all).await;
    assert_eq!(event.name, "error");
    assert_eq!(event.data, serde_json::json!({"code": 123}));
    stream.abort();
}

#[tokio::test]
async fn events_before_any_subscription_are_dropped() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/v1/events")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(sse_body(&[("early", "{\"n\":1}")]))
        .create_async()
        .await;

    let stream = EventStream::builder(format!("{}/v1/events", server.url()))
        .token("t")
        .reconnect_interval(Duration::from_secs(30))
        .connect()
        .await
        .unwrap();

    // Yield so the driver consumes the whole body with nobody listening.
    tokio::time::sleep(Duration::from_millis(100)).await;

    let mut late = stream.events();
    stream.abort();
    assert_events_closed(&mut late).await;
}

#[tokio::test]
async fn rejected_connect_reports_status_and_server_message() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/v1/events")
        .match_query(Matcher::Any)
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body("{\"error\":\"invalid_token\",\"error_description\":\"bad token\"}")
        .create_async()
        .await;

    let url = format!("{}/v1/events", server.url());
    let err = EventStream::connect(&url, "t").await.unwrap_err();

    assert_eq!(err.status(), Some(401));
    assert_eq!(err.to_string(), format!("HTTP error 401 from {url} - bad token"));
    let body = err.body().expect("parsed JSON body");
    assert_eq!(body["error_description"], "bad token");
}

#[tokio::test]
async fn rejected_connect_with_unparseable_body_omits_the_message() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/v1/events")
        .match_query(Matcher::Any)
        .with_status(500)
        .with_body("upstream exploded")
        .create_async()
        .await;

    let url = format!("{}/v1/events", server.url());
    let err = EventStream::connect(&url, "t").await.unwrap_err();

    assert_eq!(err.status(), Some(500));
    assert_eq!(err.to_string(), format!("HTTP error 500 from {url}"));
    assert!(err.body().is_none());
}

#[tokio::test]
async fn unreachable_host_maps_to_a_network_error() {
    // Port 1 refuses connections without a server in the loop.
    let url = "http://127.0.0.1:1/v1/events";
    let err = EventStream::connect(url, "t").await.unwrap_err();

    assert!(err.is_network());
    assert_eq!(err.to_string(), format!("Network error from {url}"));
}

#[tokio::test]
async fn stream_resumes_after_one_disconnect() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/v1/events")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(sse_body(&[("tick", "{\"n\":1}")]))
        .expect_at_least(2)
        .create_async()
        .await;

    let stream = EventStream::builder(format!("{}/v1/events", server.url()))
        .token("t")
        .reconnect_interval(Duration::from_millis(50))
        .connect()
        .await
        .unwrap();
    let mut events = stream.events();
    let mut lifecycle = stream.lifecycle();

    assert_eq!(next_event(&mut events).await.name, "tick");

    // The server closes the body after each response, so the session
    // disconnects, waits out the interval, and reconnects to the same mock.
    assert!(matches!(
        next_notice(&mut lifecycle).await,
        StreamNotice::Disconnect
    ));
    assert!(matches!(
        next_notice(&mut lifecycle).await,
        StreamNotice::Reconnect
    ));
    assert!(matches!(
        next_notice(&mut lifecycle).await,
        StreamNotice::ReconnectSuccess
    ));

    // Events flow again on the new connection.
    assert_eq!(next_event(&mut events).await.name, "tick");

    mock.assert_async().await;
    stream.abort();
    assert_eq!(stream.state(), StreamState::Aborted);
}

#[tokio::test]
async fn failed_reconnect_tears_the_session_down() {
    let mut server = mockito::Server::new_async().await;
    let first = server
        .mock("GET", "/v1/events")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(sse_body(&[("tick", "{\"n\":1}")]))
        .create_async()
        .await;

    let stream = EventStream::builder(format!("{}/v1/events", server.url()))
        .token("t")
        .reconnect_interval(Duration::from_millis(300))
        .connect()
        .await
        .unwrap();
    let mut events = stream.events();
    let mut lifecycle = stream.lifecycle();

    assert_eq!(next_event(&mut events).await.name, "tick");
    assert!(matches!(
        next_notice(&mut lifecycle).await,
        StreamNotice::Disconnect
    ));

    // Swap the endpoint to a 401 while the reconnect timer runs; the single
    // retry hits it and the session must go down for good.
    first.remove_async().await;
    server
        .mock("GET", "/v1/events")
        .match_query(Matcher::Any)
        .with_status(401)
        .with_header("content-type", "application/json")
        .with_body("{\"error_description\":\"expired\"}")
        .create_async()
        .await;

    assert!(matches!(
        next_notice(&mut lifecycle).await,
        StreamNotice::Reconnect
    ));

    match next_notice(&mut lifecycle).await {
        StreamNotice::Response(info) => {
            assert_eq!(info.status, 401);
            match info.body {
                ResponseBody::Json(value) => assert_eq!(value["error_description"], "expired"),
                ResponseBody::Raw(raw) => panic!("expected decoded body, got raw {raw:?}"),
            }
        },
        other => panic!("expected response metadata, got {other:?}"),
    }
    match next_notice(&mut lifecycle).await {
        StreamNotice::ReconnectError(err) => {
            assert_eq!(err.status(), Some(401));
            assert!(err.to_string().ends_with(" - expired"));
        },
        other => panic!("expected reconnect-error, got {other:?}"),
    }
    assert!(matches!(
        next_notice(&mut lifecycle).await,
        StreamNotice::Error(_)
    ));

    // No second retry: the session is gone and every channel closes.
    assert_notices_closed(&mut lifecycle).await;
    assert_events_closed(&mut events).await;
    assert_eq!(stream.state(), StreamState::Aborted);
    assert!(matches!(
        stream.subscribe("temperature"),
        Err(Error::SessionClosed)
    ));
}

#[tokio::test]
async fn abort_cancels_a_pending_reconnect() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/v1/events")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(sse_body(&[("tick", "{\"n\":1}")]))
        .expect(1)
        .create_async()
        .await;

    let stream = EventStream::builder(format!("{}/v1/events", server.url()))
        .token("t")
        .reconnect_interval(Duration::from_millis(200))
        .connect()
        .await
        .unwrap();
    let mut events = stream.events();
    let mut lifecycle = stream.lifecycle();

    assert_eq!(next_event(&mut events).await.name, "tick");
    assert!(matches!(
        next_notice(&mut lifecycle).await,
        StreamNotice::Disconnect
    ));

    stream.abort();
    assert_eq!(stream.state(), StreamState::Aborted);
    assert_notices_closed(&mut lifecycle).await;
    assert_events_closed(&mut events).await;

    // Wait past the interval: the cancelled timer must not reconnect.
    tokio::time::sleep(Duration::from_millis(400)).await;
    mock.assert_async().await;
}

#[tokio::test]
async fn abort_is_idempotent() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/v1/events")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_header("content-type", "text/event-stream")
        .with_body(sse_body(&[("tick", "{\"n\":1}")]))
        .create_async()
        .await;

    let stream = EventStream::connect(&format!("{}/v1/events", server.url()), "t")
        .await
        .unwrap();

    stream.abort();
    stream.abort();
    assert_eq!(stream.state(), StreamState::Aborted);

    // Subscriptions taken after the abort are born closed.
    let mut events = stream.events();
    assert_events_closed(&mut events).await;
    assert!(matches!(
        stream.subscribe("temperature"),
        Err(Error::SessionClosed)
    ));
}
