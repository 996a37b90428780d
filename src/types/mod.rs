//! Public data types: stream events, lifecycle notices, and REST payloads.

pub mod api;
pub mod events;

pub use api::{Device, Library, Product, PublishRequest, PublishResponse};
pub use events::{
    is_reserved_event_name, Event, ResponseBody, ResponseInfo, StreamNotice, RESERVED_EVENT_NAMES,
};
