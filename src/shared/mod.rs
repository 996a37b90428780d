//! Streaming internals: the SSE parser, the subscriber hub, the stream
//! connector, and the session driver.

pub mod dispatch;
pub(crate) mod http;
pub mod logging;
pub mod sse;
pub mod stream;

pub use dispatch::{EventSubscription, NoticeSubscription};
pub use logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
pub use sse::{EventBlock, SseParser};
pub use stream::{EventStream, StreamBuilder, StreamConfig, StreamState};
