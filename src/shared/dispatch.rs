//! Fan-out of parsed events and lifecycle notices to subscribers.
//!
//! Two separate channel families back the subscription surface: a typed
//! lifecycle channel carrying [`StreamNotice`] values, and broadcast
//! channels for data events (one generic channel that sees every event,
//! plus one channel per subscribed event name). Keeping lifecycle and user
//! events apart means a device publishing under a name like `error` can
//! never trigger the SDK's own control signals.

use std::fmt;

use dashmap::DashMap;
use parking_lot::RwLock;
use tokio::sync::broadcast;
use tracing::{trace, warn};

use crate::error::{Error, Result};
use crate::types::{is_reserved_event_name, Event, StreamNotice};

/// Subscription to parsed events, either the generic channel or one event
/// name.
///
/// Dropping the subscription detaches it. If the session is aborted or torn
/// down, [`recv`](Self::recv) returns `None` once buffered events are
/// drained.
pub struct EventSubscription {
    rx: broadcast::Receiver<Event>,
}

impl EventSubscription {
    /// Receive the next event, or `None` once the session is torn down.
    ///
    /// A subscriber that falls behind the channel capacity loses the oldest
    /// events; the loss is logged and delivery resumes with what is still
    /// buffered.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "event subscriber lagging; oldest events dropped");
                },
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Adapt the subscription into a [`futures::Stream`] of events.
    pub fn into_stream(self) -> impl futures::Stream<Item = Event> {
        use tokio_stream::StreamExt as _;
        tokio_stream::wrappers::BroadcastStream::new(self.rx).filter_map(|item| item.ok())
    }
}

impl fmt::Debug for EventSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventSubscription").finish_non_exhaustive()
    }
}

/// Subscription to the typed lifecycle channel.
pub struct NoticeSubscription {
    rx: broadcast::Receiver<StreamNotice>,
}

impl NoticeSubscription {
    /// Receive the next lifecycle notice, or `None` once the session is
    /// torn down.
    pub async fn recv(&mut self) -> Option<StreamNotice> {
        loop {
            match self.rx.recv().await {
                Ok(notice) => return Some(notice),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "lifecycle subscriber lagging; oldest notices dropped");
                },
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Adapt the subscription into a [`futures::Stream`] of notices.
    pub fn into_stream(self) -> impl futures::Stream<Item = StreamNotice> {
        use tokio_stream::StreamExt as _;
        tokio_stream::wrappers::BroadcastStream::new(self.rx).filter_map(|item| item.ok())
    }
}

impl fmt::Debug for NoticeSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NoticeSubscription").finish_non_exhaustive()
    }
}

struct Channels {
    all: broadcast::Sender<Event>,
    lifecycle: broadcast::Sender<StreamNotice>,
    named: DashMap<String, broadcast::Sender<Event>>,
}

/// Owns every subscriber channel of one session.
///
/// Teardown drops the senders, which closes every outstanding subscription;
/// it is idempotent and reports whether it was the call that actually tore
/// down.
pub(crate) struct SubscriberHub {
    channels: RwLock<Option<Channels>>,
    capacity: usize,
}

impl SubscriberHub {
    pub(crate) fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            channels: RwLock::new(Some(Channels {
                all: broadcast::channel(capacity).0,
                lifecycle: broadcast::channel(capacity).0,
                named: DashMap::new(),
            })),
            capacity,
        }
    }

    /// Deliver one parsed event: first to its named channel (reserved names
    /// are suppressed there), then to the generic channel.
    pub(crate) fn dispatch(&self, event: Event) {
        let guard = self.channels.read();
        let Some(channels) = guard.as_ref() else {
            return;
        };
        trace!(name = %event.name, "dispatching event");
        if !is_reserved_event_name(&event.name) {
            if let Some(tx) = channels.named.get(event.name.as_str()) {
                let _ = tx.send(event.clone());
            }
        }
        let _ = channels.all.send(event);
    }

    /// Deliver one lifecycle notice.
    pub(crate) fn notify(&self, notice: StreamNotice) {
        let guard = self.channels.read();
        let Some(channels) = guard.as_ref() else {
            return;
        };
        trace!(channel = notice.channel_name(), "lifecycle notice");
        let _ = channels.lifecycle.send(notice);
    }

    /// Subscribe to every parsed event.
    pub(crate) fn subscribe_events(&self) -> EventSubscription {
        let guard = self.channels.read();
        let rx = match guard.as_ref() {
            Some(channels) => channels.all.subscribe(),
            None => closed_receiver(),
        };
        EventSubscription { rx }
    }

    /// Subscribe to events carrying one specific name.
    pub(crate) fn subscribe_named(&self, name: &str) -> Result<EventSubscription> {
        if is_reserved_event_name(name) {
            return Err(Error::ReservedEventName(name.to_string()));
        }
        let guard = self.channels.read();
        let Some(channels) = guard.as_ref() else {
            return Err(Error::SessionClosed);
        };
        let rx = channels
            .named
            .entry(name.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();
        Ok(EventSubscription { rx })
    }

    /// Subscribe to lifecycle notices.
    pub(crate) fn subscribe_lifecycle(&self) -> NoticeSubscription {
        let guard = self.channels.read();
        let rx = match guard.as_ref() {
            Some(channels) => channels.lifecycle.subscribe(),
            None => closed_receiver(),
        };
        NoticeSubscription { rx }
    }

    /// Drop every sender, ending all subscriptions. Returns whether this
    /// call performed the teardown.
    pub(crate) fn shutdown(&self) -> bool {
        self.channels.write().take().is_some()
    }

    #[cfg(test)]
    pub(crate) fn is_closed(&self) -> bool {
        self.channels.read().is_none()
    }
}

impl fmt::Debug for SubscriberHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberHub")
            .field("closed", &self.channels.read().is_none())
            .field("capacity", &self.capacity)
            .finish()
    }
}

fn closed_receiver<T: Clone>() -> broadcast::Receiver<T> {
    let (tx, rx) = broadcast::channel(1);
    drop(tx);
    rx
}
