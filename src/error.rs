//! Error types for the VoltCloud client SDK.
//!
//! All fallible operations in this crate return [`Result`], with [`Error`]
//! covering the full failure taxonomy: transport-level failures before any
//! response, non-200 HTTP responses (with the server's structured error body
//! when one decodes), and the client-side validation failures around
//! subscriptions and sessions.

/// Result type alias using our [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors surfaced by the SDK.
///
/// # Examples
///
/// ```rust
/// use voltstream::Error;
///
/// let err = Error::http(401, "https://api.volt.io/v1/events", Some("invalid token"), None);
/// assert_eq!(err.status(), Some(401));
/// assert!(err.to_string().contains("invalid token"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The server answered with a non-200 status.
    ///
    /// `description` is the synthesized human-readable form
    /// (`HTTP error <code> from <uri>[ - <server message>]`); `body` holds
    /// the response body when it decoded as JSON.
    #[error("{description}")]
    Http {
        /// HTTP status code of the failed response.
        status: u16,
        /// Synthesized description, including the server's
        /// `error_description` when the body carried one.
        description: String,
        /// Parsed JSON response body, if it decoded.
        body: Option<serde_json::Value>,
    },

    /// The request failed before any response arrived (DNS, TCP, TLS).
    #[error("Network error from {uri}")]
    Network {
        /// The URI the request was addressed to.
        uri: String,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },

    /// A URL could not be parsed or joined.
    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// A response body could not be decoded into the expected type.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A token provider failed to produce a credential.
    #[error("authentication error: {0}")]
    Auth(String),

    /// An attempt to subscribe under one of the reserved channel names.
    ///
    /// `event`, `error` and `response` are internal channels; events the
    /// server sends under those names are delivered on the generic event
    /// channel only.
    #[error("{0:?} is a reserved event name")]
    ReservedEventName(String),

    /// The session was aborted or torn down; no further subscriptions are
    /// possible.
    #[error("event stream session is closed")]
    SessionClosed,

    /// Catch-all for errors raised inside caller-provided components such
    /// as custom auth providers.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Build an [`Error::Http`] with the synthesized description used
    /// everywhere a non-200 response is surfaced.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use voltstream::Error;
    ///
    /// let err = Error::http(404, "https://api.volt.io/v1/devices/x", None, None);
    /// assert_eq!(
    ///     err.to_string(),
    ///     "HTTP error 404 from https://api.volt.io/v1/devices/x"
    /// );
    /// ```
    pub fn http(
        status: u16,
        uri: &str,
        server_message: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> Self {
        let description = match server_message {
            Some(msg) => format!("HTTP error {status} from {uri} - {msg}"),
            None => format!("HTTP error {status} from {uri}"),
        };
        Self::Http {
            status,
            description,
            body,
        }
    }

    /// Build an [`Error::Network`] from a transport failure.
    pub fn network(uri: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            uri: uri.into(),
            source,
        }
    }

    /// Build an [`Error::Auth`].
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth(message.into())
    }

    /// HTTP status code, when this error originated from a non-200 response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Parsed JSON body of the failed response, when one decoded.
    pub fn body(&self) -> Option<&serde_json::Value> {
        match self {
            Self::Http { body, .. } => body.as_ref(),
            _ => None,
        }
    }

    /// Whether this is a transport-level failure that never saw a response.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network { .. })
    }
}
