//! The event stream session: connect, parse, dispatch, reconnect, abort.
//!
//! One driver task per session owns the parse state and consumes the
//! response body, so parsing and state transitions are never concurrent
//! for the same session. The caller-facing [`EventStream`] handle shares
//! only the validated state field, the subscriber hub, and a cancellation
//! token with the driver.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;
use uuid::Uuid;

use crate::client::auth::{AuthProvider, StaticToken};
use crate::error::{Error, Result};
use crate::shared::dispatch::{EventSubscription, NoticeSubscription, SubscriberHub};
use crate::shared::http::open_stream;
use crate::shared::sse::SseParser;
use crate::types::{Event, StreamNotice};
use crate::{DEFAULT_CHANNEL_CAPACITY, DEFAULT_RECONNECT_INTERVAL_MS};

/// Lifecycle state of an [`EventStream`] session.
///
/// Transitions are validated; once `Aborted` is reached no further
/// transition is possible, which is what makes stale reconnect timers
/// inert.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    /// Initial request in flight, response not yet validated.
    Connecting,
    /// Active response body being consumed.
    Streaming,
    /// Response body closed by the peer; reconnect decision pending.
    Ended,
    /// Reconnect timer pending or reconnect attempt in flight.
    Reconnecting,
    /// Terminal: explicit abort, handle drop, or fatal reconnect failure.
    Aborted,
}

impl StreamState {
    /// Whether a transition from `self` to `next` is legal.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use voltstream::StreamState;
    ///
    /// assert!(StreamState::Streaming.can_advance_to(StreamState::Ended));
    /// assert!(!StreamState::Aborted.can_advance_to(StreamState::Streaming));
    /// ```
    #[must_use]
    pub fn can_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Connecting, Self::Streaming)
                | (Self::Streaming, Self::Ended)
                | (Self::Ended, Self::Reconnecting)
                | (Self::Reconnecting, Self::Streaming)
        ) || (next == Self::Aborted && self != Self::Aborted)
    }

    /// Whether no further transitions can happen from this state.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Aborted)
    }
}

/// Configuration for one stream session.
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Streaming endpoint URL (without the `access_token` parameter; the
    /// connector appends it per attempt).
    pub url: Url,
    /// Credential source, re-queried on every (re)connect attempt.
    pub auth: Arc<dyn AuthProvider>,
    /// Delay between a disconnect and the single reconnect attempt.
    pub reconnect_interval: Duration,
    /// Buffered capacity of each subscriber channel.
    pub channel_capacity: usize,
}

impl StreamConfig {
    /// Config with the default reconnect interval and channel capacity.
    pub fn new(url: Url, auth: Arc<dyn AuthProvider>) -> Self {
        Self {
            url,
            auth,
            reconnect_interval: Duration::from_millis(DEFAULT_RECONNECT_INTERVAL_MS),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Builder for [`EventStream`] sessions.
///
/// # Examples
///
/// ```rust,no_run
/// use std::time::Duration;
/// use voltstream::EventStream;
///
/// # async fn example() -> Result<(), voltstream::Error> {
/// let stream = EventStream::builder("https://api.volt.io/v1/events")
///     .token("my-access-token")
///     .reconnect_interval(Duration::from_millis(500))
///     .connect()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct StreamBuilder {
    url: String,
    auth: Option<Arc<dyn AuthProvider>>,
    reconnect_interval: Duration,
    channel_capacity: usize,
}

impl StreamBuilder {
    fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            auth: None,
            reconnect_interval: Duration::from_millis(DEFAULT_RECONNECT_INTERVAL_MS),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }

    /// Authenticate with a fixed bearer token.
    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.auth = Some(Arc::new(StaticToken::new(token)));
        self
    }

    /// Authenticate through a custom provider, re-queried per attempt.
    #[must_use]
    pub fn auth_provider(mut self, provider: Arc<dyn AuthProvider>) -> Self {
        self.auth = Some(provider);
        self
    }

    /// Delay before the reconnect attempt after a disconnect.
    #[must_use]
    pub fn reconnect_interval(mut self, interval: Duration) -> Self {
        self.reconnect_interval = interval;
        self
    }

    /// Buffered capacity of each subscriber channel (minimum 1).
    #[must_use]
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Open the stream and return the live session handle.
    pub async fn connect(self) -> Result<EventStream> {
        let url = Url::parse(&self.url)?;
        let auth = self
            .auth
            .ok_or_else(|| Error::auth("no access token or auth provider configured"))?;
        EventStream::connect_with(StreamConfig {
            url,
            auth,
            reconnect_interval: self.reconnect_interval,
            channel_capacity: self.channel_capacity,
        })
        .await
    }
}

#[derive(Debug)]
struct StreamInner {
    id: Uuid,
    config: StreamConfig,
    http: reqwest::Client,
    hub: SubscriberHub,
    state: RwLock<StreamState>,
    cancel: CancellationToken,
}

impl StreamInner {
    fn state(&self) -> StreamState {
        *self.state.read()
    }

    // Validated transition. Refuses illegal moves (notably anything after
    // Aborted) and reports whether it advanced.
    fn advance(&self, next: StreamState) -> bool {
        let mut state = self.state.write();
        if state.can_advance_to(next) {
            debug!(session_id = %self.id, from = ?*state, to = ?next, "state transition");
            *state = next;
            true
        } else {
            false
        }
    }

    // Enter Aborted, stop the transport, close all subscriptions. Exactly
    // one caller wins; later calls are no-ops.
    fn terminate(&self) -> bool {
        if !self.advance(StreamState::Aborted) {
            return false;
        }
        self.cancel.cancel();
        self.hub.shutdown();
        true
    }
}

/// Handle to one live event stream session.
///
/// Obtained from [`EventStream::connect`], [`EventStream::builder`] or
/// [`CloudClient::event_stream`](crate::CloudClient::event_stream). The
/// handle owns the session: dropping it aborts the stream.
///
/// Events delivered while no subscription is attached are dropped, so
/// attach subscriptions before yielding back to the runtime if the first
/// events matter.
///
/// # Examples
///
/// ```rust,no_run
/// use voltstream::EventStream;
///
/// # async fn example() -> Result<(), voltstream::Error> {
/// let stream = EventStream::connect("https://api.volt.io/v1/events", "token").await?;
/// let mut temperature = stream.subscribe("temperature")?;
/// while let Some(event) = temperature.recv().await {
///     println!("reading: {}", event.data);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct EventStream {
    inner: Arc<StreamInner>,
}

impl EventStream {
    /// Start building a session against `url`.
    pub fn builder(url: impl Into<String>) -> StreamBuilder {
        StreamBuilder::new(url)
    }

    /// Connect with a fixed bearer token and default settings.
    pub async fn connect(url: &str, token: &str) -> Result<Self> {
        Self::builder(url).token(token).connect().await
    }

    /// Connect with an explicit [`StreamConfig`].
    pub async fn connect_with(config: StreamConfig) -> Result<Self> {
        let inner = Arc::new(StreamInner {
            id: Uuid::new_v4(),
            http: reqwest::Client::new(),
            hub: SubscriberHub::new(config.channel_capacity),
            state: RwLock::new(StreamState::Connecting),
            cancel: CancellationToken::new(),
            config,
        });

        let response = open_stream(
            &inner.http,
            &inner.config.url,
            inner.config.auth.as_ref(),
            &inner.hub,
        )
        .await?;

        let advanced = inner.advance(StreamState::Streaming);
        debug_assert!(advanced, "fresh session must enter streaming");
        info!(session_id = %inner.id, url = %inner.config.url, "event stream established");

        tokio::spawn(drive(Arc::clone(&inner), response));
        Ok(Self { inner })
    }

    /// Subscribe to every parsed event (the generic `event` channel).
    pub fn events(&self) -> EventSubscription {
        self.inner.hub.subscribe_events()
    }

    /// Subscribe to events published under `name`.
    ///
    /// Fails with [`Error::ReservedEventName`] for `event`, `error` and
    /// `response`, and with [`Error::SessionClosed`] once the session is
    /// torn down.
    pub fn subscribe(&self, name: &str) -> Result<EventSubscription> {
        self.inner.hub.subscribe_named(name)
    }

    /// Subscribe to lifecycle notices (disconnects, reconnects, errors,
    /// non-200 response metadata).
    pub fn lifecycle(&self) -> NoticeSubscription {
        self.inner.hub.subscribe_lifecycle()
    }

    /// Current session state.
    pub fn state(&self) -> StreamState {
        self.inner.state()
    }

    /// Unique id of this session, as carried in its log fields.
    pub fn session_id(&self) -> Uuid {
        self.inner.id
    }

    /// The endpoint this session streams from, without credentials.
    pub fn url(&self) -> &Url {
        &self.inner.config.url
    }

    /// Terminate the session: stop the transport, cancel any pending
    /// reconnect, and close every subscription.
    ///
    /// Idempotent; repeated calls (and the abort performed by `Drop`) are
    /// no-ops after the first.
    pub fn abort(&self) {
        if self.inner.terminate() {
            info!(session_id = %self.inner.id, "event stream aborted");
        }
    }
}

impl Drop for EventStream {
    fn drop(&mut self) {
        self.abort();
    }
}

#[derive(Debug)]
enum BodyEnd {
    Eof,
    Failed,
    Cancelled,
}

/// Session driver: consume bodies, schedule the single reconnect attempt
/// per disconnect, stop on abort or fatal reconnect failure.
async fn drive(inner: Arc<StreamInner>, mut response: reqwest::Response) {
    let mut parser = SseParser::new();
    loop {
        // Fresh (re)connect: no bytes from a dead connection may leak in.
        parser.reset();
        let end = stream_body(&inner, &mut parser, &mut response).await;
        if matches!(end, BodyEnd::Cancelled) {
            return;
        }

        // Peer closed the body. Schedule exactly one reconnect attempt,
        // unless an abort won the race for the state field.
        if !inner.advance(StreamState::Ended) {
            return;
        }
        if !inner.advance(StreamState::Reconnecting) {
            return;
        }
        inner.hub.notify(StreamNotice::Disconnect);
        debug!(
            session_id = %inner.id,
            interval_ms = inner.config.reconnect_interval.as_millis() as u64,
            "stream ended; reconnect scheduled"
        );

        tokio::select! {
            () = inner.cancel.cancelled() => return,
            () = tokio::time::sleep(inner.config.reconnect_interval) => {},
        }
        // The timer may have fired into an aborted session.
        if inner.state() != StreamState::Reconnecting {
            return;
        }

        inner.hub.notify(StreamNotice::Reconnect);
        match open_stream(
            &inner.http,
            &inner.config.url,
            inner.config.auth.as_ref(),
            &inner.hub,
        )
        .await
        {
            Ok(new_response) => {
                if !inner.advance(StreamState::Streaming) {
                    return;
                }
                info!(session_id = %inner.id, "event stream re-established");
                inner.hub.notify(StreamNotice::ReconnectSuccess);
                response = new_response;
            },
            Err(err) => {
                error!(
                    session_id = %inner.id,
                    error = %err,
                    "reconnect failed; tearing down session"
                );
                let err = Arc::new(err);
                inner.hub.notify(StreamNotice::ReconnectError(Arc::clone(&err)));
                inner.hub.notify(StreamNotice::Error(err));
                inner.terminate();
                return;
            },
        }
    }
}

/// Consume one response body, feeding chunks through the parser and
/// dispatching decoded events, until EOF, a read error, or cancellation.
async fn stream_body(
    inner: &StreamInner,
    parser: &mut SseParser,
    response: &mut reqwest::Response,
) -> BodyEnd {
    loop {
        let chunk = tokio::select! {
            () = inner.cancel.cancelled() => return BodyEnd::Cancelled,
            chunk = response.chunk() => chunk,
        };
        match chunk {
            Ok(Some(bytes)) => {
                for block in parser.feed(&bytes) {
                    match serde_json::from_str::<serde_json::Value>(&block.data) {
                        Ok(data) => inner.hub.dispatch(Event {
                            name: block.name,
                            data,
                        }),
                        Err(err) => debug!(
                            session_id = %inner.id,
                            name = %block.name,
                            error = %err,
                            "dropping event with malformed JSON payload"
                        ),
                    }
                }
            },
            Ok(None) => return BodyEnd::Eof,
            Err(err) => {
                warn!(session_id = %inner.id, error = %err, "stream read failed");
                return BodyEnd::Failed;
            },
        }
    }
}
