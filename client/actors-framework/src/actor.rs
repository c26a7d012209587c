use core::fmt::{self, Debug, Formatter};

use tokio::sync::mpsc;

use crate::event_bus::{EventBusMessage, ProvidesEventBus};

/// The [`Actor`] trait represents an actor, which runs on its own event loop and can handle
/// messages. The struct implementing this trait can be seen as the context of the actor,
/// holding the internal state or the shared data (through commands and queries).
pub trait Actor: Sized {
    /// The type of message that the actor can handle.
    /// Usually an enum that represents the different types of messages that the actor can receive.
    type Message: Send + Sized + 'static;

    /// The event loop associated with the actor.
    /// If no custom event loop is needed, the default [`EventLoop<Self>`] can be used.
    type EventLoop: ActorEventLoop<Self> + Send + 'static;

    /// The event bus provider associated with the actor. This struct will implement
    /// [`ProvidesEventBus`] for all events that will be emitted by the actor.
    /// If there are no events to be emitted, this can be set to `()`.
    type EventBusProvider: Clone + Send + 'static;

    /// Handles a message received by the actor.
    fn handle_message(
        &mut self,
        message: Self::Message,
    ) -> impl std::future::Future<Output = ()> + Send;

    /// Returns the event bus provider for the actor.
    fn get_event_bus_provider(&self) -> &Self::EventBusProvider;

    fn emit<E: EventBusMessage>(&self, event: E)
    where
        Self::EventBusProvider: ProvidesEventBus<E>,
    {
        self.get_event_bus_provider().event_bus().emit(event)
    }
}

/// Trait representing an event loop for an actor.
pub trait ActorEventLoop<T: Actor> {
    /// Creates a new instance of the event loop.
    fn new(actor: T, receiver: mpsc::UnboundedReceiver<T::Message>) -> Self;

    /// The event loop to be implemented. This function should run continuously, receiving and
    /// handling messages for the actor. To be spawned as a separate task.
    fn run(self) -> impl std::future::Future<Output = ()> + Send;
}

/// A simple and generic event loop that handles messages for an actor.
/// If a custom event loop (e.g. to select over multiple queues) is needed, implement
/// [`ActorEventLoop`] directly, as the Fisherman scheduler's event loop does.
pub struct EventLoop<T: Actor> {
    receiver: mpsc::UnboundedReceiver<T::Message>,
    actor: T,
}

impl<T: Actor + Send> ActorEventLoop<T> for EventLoop<T> {
    fn new(actor: T, receiver: mpsc::UnboundedReceiver<T::Message>) -> Self {
        Self { actor, receiver }
    }

    /// Runs continuously, receiving and handling messages for the actor.
    /// Stops after all senders are dropped.
    async fn run(mut self) {
        while let Some(message) = self.receiver.recv().await {
            self.actor.handle_message(message).await;
        }
    }
}

/// A handle to an actor running on its own task, used by command-interface traits to talk to
/// the actor without exposing its internal state.
pub struct ActorHandle<T: Actor> {
    sender: mpsc::UnboundedSender<T::Message>,
    pub(crate) event_bus_provider: T::EventBusProvider,
}

impl<T: Actor> Debug for ActorHandle<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActorHandle").finish_non_exhaustive()
    }
}

impl<T: Actor> ActorHandle<T> {
    /// Sends a message to the actor, asynchronously, without waiting for it to be handled.
    pub async fn send(&self, message: T::Message) {
        self.sender.send(message).expect("actor is dead");
    }
}

/// Implemented manually because the compiler can't infer that we don't need a `T: Clone` bound.
impl<T: Actor> Clone for ActorHandle<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            event_bus_provider: self.event_bus_provider.clone(),
        }
    }
}

pub trait ActorSpawner<T: Actor + Send + 'static> {
    /// Returns the actor's handle along with a join handle for its event loop task, so a
    /// caller that signals shutdown can await the loop actually finishing.
    fn spawn_actor(self, actor: T) -> (ActorHandle<T>, tokio::task::JoinHandle<()>);
}

/// Spawns actors as named, grouped tokio tasks. The name/group pair is logging-only metadata;
/// there is no scheduler-level task registry to plug into outside of a full node runtime.
#[derive(Clone)]
pub struct TaskSpawner {
    name: &'static str,
    group: Option<&'static str>,
}

impl Debug for TaskSpawner {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskSpawner")
            .field("name", &self.name)
            .field("group", &self.group)
            .finish()
    }
}

impl TaskSpawner {
    pub fn new(name: &'static str) -> Self {
        Self { name, group: None }
    }

    pub fn with_group(&self, group: &'static str) -> Self {
        Self {
            group: Some(group),
            ..self.clone()
        }
    }

    pub fn with_name(&self, name: &'static str) -> Self {
        Self {
            name,
            ..self.clone()
        }
    }

    pub fn spawn(
        &self,
        task: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> tokio::task::JoinHandle<()> {
        let name = self.name;
        let group = self.group.unwrap_or("default");
        tokio::spawn(async move {
            tracing::debug!(task = name, group, "task started");
            task.await;
            tracing::debug!(task = name, group, "task finished");
        })
    }
}

impl<T: Actor + Send + 'static> ActorSpawner<T> for TaskSpawner {
    fn spawn_actor(self, actor: T) -> (ActorHandle<T>, tokio::task::JoinHandle<()>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let event_bus_provider = actor.get_event_bus_provider().clone();
        let event_loop = T::EventLoop::new(actor, receiver);

        let join_handle = self.spawn(async move { event_loop.run().await });

        (
            ActorHandle {
                sender,
                event_bus_provider,
            },
            join_handle,
        )
    }
}
