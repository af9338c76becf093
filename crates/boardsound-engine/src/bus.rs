//! Theme change broadcasting.
//!
//! Every subscriber owns an unbounded channel; emitting clones the event into
//! each one. Subscribers whose receiver was dropped are pruned on the next
//! emit.

use std::sync::atomic::{AtomicU64, Ordering};

use crossbeam_channel::{unbounded, Receiver, Sender, TrySendError};
use parking_lot::RwLock;
use tracing::debug;

use boardsound_common::Theme;

/// Events published by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThemeEvent {
    /// The active theme changed.
    ThemeChanged(Theme),
}

impl ThemeEvent {
    /// Topic name.
    #[must_use]
    pub const fn topic(&self) -> &'static str {
        match self {
            Self::ThemeChanged(_) => "theme_changed",
        }
    }
}

/// Outbound notification channel.
pub trait ThemeBus: Send + Sync {
    /// Publishes `event` to every listener.
    fn emit(&self, event: ThemeEvent);
}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

#[derive(Debug)]
struct Subscriber {
    id: SubscriberId,
    sender: Sender<ThemeEvent>,
}

/// In-process fan-out bus.
#[derive(Debug, Default)]
pub struct EventBus {
    subscribers: RwLock<Vec<Subscriber>>,
    next_id: AtomicU64,
}

impl EventBus {
    /// Creates a bus with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener.
    #[must_use]
    pub fn subscribe(&self) -> (SubscriberId, Receiver<ThemeEvent>) {
        let (sender, receiver) = unbounded();
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.write().push(Subscriber { id, sender });
        (id, receiver)
    }

    /// Removes a listener. Returns whether it was registered.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|s| s.id != id);
        subscribers.len() != before
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

impl ThemeBus for EventBus {
    fn emit(&self, event: ThemeEvent) {
        let mut subscribers = self.subscribers.write();
        subscribers.retain(|s| match s.sender.try_send(event.clone()) {
            Ok(()) | Err(TrySendError::Full(_)) => true,
            Err(TrySendError::Disconnected(_)) => {
                debug!("Dropping disconnected subscriber {:?}", s.id);
                false
            },
        });
        debug!("Emitted {} to {} subscribers", event.topic(), subscribers.len());
    }
}
