//! # VoltCloud client SDK
//!
//! Rust client for the VoltCloud API, built around its Server-Sent-Events
//! stream:
//! - Incremental SSE parsing that never assumes event boundaries align
//!   with network chunks
//! - Automatic reconnection with a single retry per disconnect
//! - Typed lifecycle notifications separated from device-defined events
//! - A thin REST surface for devices, products, libraries and publishing
//!
//! ## Quick Start
//!
//! ### Streaming events
//!
//! ```rust,no_run
//! use voltstream::EventStream;
//!
//! # async fn example() -> Result<(), voltstream::Error> {
//! let stream = EventStream::connect("https://api.volt.io/v1/events", "my-token").await?;
//!
//! // Named subscription: only `temperature` events.
//! let mut temperature = stream.subscribe("temperature")?;
//! // Lifecycle channel: disconnects, reconnects, failures.
//! let mut lifecycle = stream.lifecycle();
//!
//! tokio::spawn(async move {
//!     while let Some(notice) = lifecycle.recv().await {
//!         eprintln!("stream lifecycle: {}", notice.channel_name());
//!     }
//! });
//!
//! while let Some(event) = temperature.recv().await {
//!     println!("{} = {}", event.name, event.data);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### REST API
//!
//! ```rust,no_run
//! use voltstream::CloudClient;
//!
//! # async fn example() -> Result<(), voltstream::Error> {
//! let client = CloudClient::new("my-token")?;
//! let devices = client.list_devices().await?;
//! client
//!     .publish_event("greenhouse/reading", serde_json::json!({"c": 21.5}), true)
//!     .await?;
//! # Ok(())
//! # }
//! ```

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]
#![deny(unsafe_code)]
// Allow certain clippy lints that are too pedantic for this codebase
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::multiple_crate_versions)]
#![allow(clippy::result_large_err)]

pub mod client;
pub mod error;
pub mod shared;
pub mod types;

// Re-export commonly used types
pub use client::auth::{AuthProvider, StaticToken};
pub use client::CloudClient;
pub use error::{Error, Result};
pub use shared::{
    init_logging, EventBlock, EventStream, EventSubscription, LogFormat, LogLevel, LoggingConfig,
    NoticeSubscription, SseParser, StreamBuilder, StreamConfig, StreamState,
};
pub use types::{
    is_reserved_event_name, Device, Event, Library, Product, PublishRequest, PublishResponse,
    ResponseBody, ResponseInfo, StreamNotice, RESERVED_EVENT_NAMES,
};

// Re-export async_trait for implementing AuthProvider
pub use async_trait::async_trait;

/// Default API host for [`CloudClient::new`].
///
/// # Examples
///
/// ```rust
/// use voltstream::DEFAULT_BASE_URL;
///
/// assert_eq!(DEFAULT_BASE_URL, "https://api.volt.io/");
/// ```
pub const DEFAULT_BASE_URL: &str = "https://api.volt.io/";

/// Default delay before the reconnect attempt after a disconnect, in
/// milliseconds.
///
/// # Examples
///
/// ```rust
/// use std::time::Duration;
/// use voltstream::DEFAULT_RECONNECT_INTERVAL_MS;
///
/// let interval = Duration::from_millis(DEFAULT_RECONNECT_INTERVAL_MS);
/// assert_eq!(interval, Duration::from_secs(2));
/// ```
pub const DEFAULT_RECONNECT_INTERVAL_MS: u64 = 2_000;

/// Default buffered capacity of each subscriber channel.
///
/// A subscriber that falls more than this many events behind loses the
/// oldest ones; see [`EventSubscription::recv`].
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;
