//! Event and lifecycle notification types for the streaming API.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Channel names reserved for the SDK's own notification channels.
///
/// Events the server publishes under one of these names are still delivered
/// on the generic event channel, but never dispatched as named events, and
/// [`EventStream::subscribe`](crate::EventStream::subscribe) rejects them.
pub const RESERVED_EVENT_NAMES: &[&str] = &["event", "error", "response"];

/// Whether `name` collides with one of the SDK's internal channels.
///
/// # Examples
///
/// ```rust
/// assert!(voltstream::is_reserved_event_name("error"));
/// assert!(!voltstream::is_reserved_event_name("temperature"));
/// ```
#[must_use]
pub fn is_reserved_event_name(name: &str) -> bool {
    RESERVED_EVENT_NAMES.contains(&name)
}

/// One decoded message from the event stream.
///
/// An event is only constructed from a complete event block whose
/// accumulated `data:` payload parsed as JSON and whose `event:` name was
/// set; blocks that fail either condition are dropped by the parser layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Name from the block's last `event:` field. May be empty when the
    /// server sent `event:` with no value.
    pub name: String,
    /// JSON-decoded payload assembled from the block's `data:` lines.
    pub data: serde_json::Value,
}

impl Event {
    /// Create an event.
    pub fn new(name: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

/// Metadata captured from a non-200 HTTP response during a connect attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseInfo {
    /// HTTP status code.
    pub status: u16,
    /// Response body, decoded when possible.
    pub body: ResponseBody,
}

/// Body of a non-200 response: JSON when it decodes, raw text otherwise.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// The body decoded as JSON.
    Json(serde_json::Value),
    /// The body as received; JSON decoding failed or was not attempted.
    Raw(String),
}

impl ResponseBody {
    /// The decoded JSON body, when there is one.
    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Json(value) => Some(value),
            Self::Raw(_) => None,
        }
    }
}

/// Lifecycle notifications delivered on the control channel.
///
/// These are the strongly-typed counterparts of the `response`, `error`,
/// `disconnect`, `reconnect`, `reconnect-success` and `reconnect-error`
/// channels consumers of the original wire protocol expect.
#[derive(Debug, Clone)]
pub enum StreamNotice {
    /// A connect attempt got a non-200 response; carries its metadata.
    Response(ResponseInfo),
    /// The active response body ended and a reconnect is pending.
    Disconnect,
    /// The reconnect timer fired and a new connect attempt is starting.
    Reconnect,
    /// The reconnect attempt re-established the stream.
    ReconnectSuccess,
    /// The reconnect attempt failed; the session is being torn down.
    ReconnectError(Arc<Error>),
    /// A fatal session error. Emitted together with
    /// [`StreamNotice::ReconnectError`] on reconnect failure.
    Error(Arc<Error>),
}

impl StreamNotice {
    /// The wire-protocol channel name this notice corresponds to.
    #[must_use]
    pub fn channel_name(&self) -> &'static str {
        match self {
            Self::Response(_) => "response",
            Self::Disconnect => "disconnect",
            Self::Reconnect => "reconnect",
            Self::ReconnectSuccess => "reconnect-success",
            Self::ReconnectError(_) => "reconnect-error",
            Self::Error(_) => "error",
        }
    }
}
