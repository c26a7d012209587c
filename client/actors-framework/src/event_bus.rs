use tokio::sync::broadcast;
use tracing::warn;

/// Depth of the broadcast channel backing each [`EventBus`]. A slow subscriber that falls this
/// far behind observes a `Lagged` error on its next `recv` rather than blocking the emitter.
const MAX_PENDING_EVENTS: usize = 1_024;

pub trait EventBusMessage: Clone + Send + 'static {}

#[derive(Clone)]
pub struct EventBus<T: EventBusMessage> {
    sender: broadcast::Sender<T>,
}

impl<T: EventBusMessage> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: EventBusMessage + Clone> EventBus<T> {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(MAX_PENDING_EVENTS);
        Self { sender }
    }

    pub fn emit(&self, event: T) {
        if self.sender.send(event).is_err() {
            warn!("no listener for emitted event");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<T> {
        self.sender.subscribe()
    }
}

/// Implemented by an [`Actor::EventBusProvider`](crate::actor::Actor::EventBusProvider) for
/// each event type it emits.
pub trait ProvidesEventBus<T: EventBusMessage> {
    fn event_bus(&self) -> &EventBus<T>;
}
