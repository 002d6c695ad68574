use super::handler::{ActionMap, Handler, PendingReply, Reply};
use crate::{
    config::{MessagingConfig, MultiMatchPolicy},
    host::{panic_message, MessageSender, RuntimeAdapter, SendResponse, TaskSpawner},
    message::{FilterSet, Location, MessagePath},
};
use futures::{future, future::BoxFuture, FutureExt};
use serde_json::Value;
use std::{
    iter,
    panic::{self, AssertUnwindSafe},
    sync::{Arc, Mutex, PoisonError},
};
use tokio::sync::oneshot;

struct Subscription {
    id: usize,
    path: MessagePath,
    handler: Box<dyn Handler>,
}

type Subscriptions = Arc<Mutex<Vec<Arc<Subscription>>>>;

/// Multiplexes the host's single `onMessage` event into many filtered subscriptions.
///
/// Construct one per execution context. Creating it installs exactly one host
/// listener; every `on_message*` call adds a subscription behind that listener.
/// Subscriptions are evaluated in registration order and every match is invoked;
/// the [`MultiMatchPolicy`] decides which reply reaches the sender.
pub struct Registry {
    adapter: RuntimeAdapter,
    subscriptions: Subscriptions,
    config: MessagingConfig,
}

impl Registry {
    pub fn new(adapter: RuntimeAdapter) -> Self {
        Self::with_config(adapter, MessagingConfig::default())
    }

    pub fn with_config(adapter: RuntimeAdapter, config: MessagingConfig) -> Self {
        let subscriptions = Subscriptions::default();
        let dispatcher = Dispatcher {
            subscriptions: Arc::clone(&subscriptions),
            policy: config.multi_match,
        };

        // Listeners hold the host weakly: the host owns them.
        match &adapter {
            RuntimeAdapter::Callback(host) => {
                let weak = Arc::downgrade(host);
                host.add_listener(Box::new(
                    move |message: Value, sender: MessageSender, send_response: SendResponse| {
                        let spawner = weak.upgrade();
                        dispatcher.on_callback_message(
                            &message,
                            sender,
                            send_response,
                            spawner.as_deref(),
                        )
                    },
                ));
            }
            RuntimeAdapter::Promise(host) => {
                let weak = Arc::downgrade(host);
                host.add_listener(Box::new(move |message: Value, sender: MessageSender| {
                    let spawner = weak.upgrade();
                    dispatcher.on_promise_message(&message, sender, spawner.as_deref())
                }));
            }
        }
        tracing::debug!(style = ?adapter.style(), "registry listening on runtime.onMessage");

        Self {
            adapter,
            subscriptions,
            config,
        }
    }

    pub fn adapter(&self) -> &RuntimeAdapter {
        &self.adapter
    }

    pub fn config(&self) -> &MessagingConfig {
        &self.config
    }

    /// An empty [`ActionMap`] keyed by the configured action field.
    pub fn action_map(&self) -> ActionMap {
        ActionMap::keyed_by(self.config.action_key.clone())
    }

    /// Listen for envelopes matching `path`. Registering the same path twice
    /// invokes both handlers.
    pub fn on_message(&self, path: MessagePath, handler: impl Handler) {
        let mut subscriptions = self
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let id = subscriptions.len();
        tracing::debug!(subscription = id, ?path, "subscribed");
        subscriptions.push(Arc::new(Subscription {
            id,
            path,
            handler: Box::new(handler),
        }));
    }

    pub fn on_message_from_background(
        &self,
        current: Location,
        filters: FilterSet,
        handler: impl Handler,
    ) {
        self.on_message(from_to(Location::Background, current, filters), handler);
    }

    pub fn on_message_from_options(
        &self,
        current: Location,
        filters: FilterSet,
        handler: impl Handler,
    ) {
        self.on_message(from_to(Location::Options, current, filters), handler);
    }

    pub fn on_message_from_popup(
        &self,
        current: Location,
        filters: FilterSet,
        handler: impl Handler,
    ) {
        self.on_message(from_to(Location::Popup, current, filters), handler);
    }

    pub fn on_message_from_content_script(
        &self,
        current: Location,
        filters: FilterSet,
        handler: impl Handler,
    ) {
        self.on_message(from_to(Location::Content, current, filters), handler);
    }

    /// Any source. With `current` set, only envelopes addressed to it.
    pub fn on_message_anywhere(
        &self,
        current: Option<Location>,
        filters: FilterSet,
        handler: impl Handler,
    ) {
        let path = MessagePath {
            source: None,
            destination: current,
            filters: Some(filters),
        };
        self.on_message(path, handler);
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

fn from_to(source: Location, destination: Location, filters: FilterSet) -> MessagePath {
    MessagePath::between(source, destination).with_filters(filters)
}

/// The state captured by the host listener.
struct Dispatcher {
    subscriptions: Subscriptions,
    policy: MultiMatchPolicy,
}

/// A reply still in the running for the sender's single response slot.
enum Candidate {
    Ready(Value),
    Pending(usize, oneshot::Receiver<Option<Value>>),
}

impl Dispatcher {
    /// Invoke every matching subscription and return the responding ones in
    /// policy order. Deferred replies are spawned here so each runs to
    /// completion whether or not it ends up answering.
    fn dispatch<S: TaskSpawner + ?Sized>(
        &self,
        message: &Value,
        sender: &MessageSender,
        spawner: Option<&S>,
    ) -> Vec<Candidate> {
        // Snapshot so handlers may subscribe without deadlocking.
        let snapshot = self
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        let mut replies = Vec::new();
        for subscription in snapshot.iter().filter(|s| s.path.matches(message)) {
            let data = message.get("data").cloned().unwrap_or(Value::Null);
            let reply = invoke(subscription, data, sender.clone());
            if reply.is_response() {
                replies.push((subscription.id, reply));
            }
        }
        if self.policy == MultiMatchPolicy::LastRegistered {
            replies.reverse();
        }
        if replies.is_empty() {
            tracing::trace!("no subscription replied to incoming message");
        }

        let mut candidates = Vec::with_capacity(replies.len());
        for (id, reply) in replies {
            match reply {
                Reply::NoResponse => {}
                Reply::Ready(value) => candidates.push(Candidate::Ready(value)),
                Reply::Deferred(pending) => match spawner {
                    Some(spawner) => {
                        let (tx, rx) = oneshot::channel();
                        spawner.spawn(
                            async move {
                                // Receiver gone means another reply already answered.
                                let _ = tx.send(settle(id, pending).await);
                            }
                            .boxed(),
                        );
                        candidates.push(Candidate::Pending(id, rx));
                    }
                    None => {
                        tracing::warn!(subscription = id, "host is gone, dropping deferred reply");
                    }
                },
            }
        }
        candidates
    }

    fn on_callback_message<S: TaskSpawner + ?Sized>(
        &self,
        message: &Value,
        sender: MessageSender,
        send_response: SendResponse,
        spawner: Option<&S>,
    ) -> bool {
        let mut candidates = self.dispatch(message, &sender, spawner).into_iter();
        match candidates.next() {
            None => false,
            Some(Candidate::Ready(value)) => {
                send_response(Some(value));
                false
            }
            Some(pending) => {
                // Pending candidates only exist when a spawner was available.
                let Some(spawner) = spawner else {
                    return false;
                };
                let candidates: Vec<_> = iter::once(pending).chain(candidates).collect();
                spawner.spawn(
                    async move {
                        send_response(first_reply(candidates).await);
                    }
                    .boxed(),
                );
                true
            }
        }
    }

    fn on_promise_message<S: TaskSpawner + ?Sized>(
        &self,
        message: &Value,
        sender: MessageSender,
        spawner: Option<&S>,
    ) -> Option<BoxFuture<'static, Option<Value>>> {
        let mut candidates = self.dispatch(message, &sender, spawner).into_iter();
        match candidates.next()? {
            Candidate::Ready(value) => Some(future::ready(Some(value)).boxed()),
            pending => {
                let candidates: Vec<_> = iter::once(pending).chain(candidates).collect();
                Some(first_reply(candidates).boxed())
            }
        }
    }
}

/// Walk the candidates in policy order; a deferred reply that settles without
/// a value hands the slot to the next one.
async fn first_reply(candidates: Vec<Candidate>) -> Option<Value> {
    for candidate in candidates {
        match candidate {
            Candidate::Ready(value) => return Some(value),
            Candidate::Pending(id, rx) => match rx.await {
                Ok(Some(value)) => return Some(value),
                _ => tracing::debug!(subscription = id, "deferred reply gave no value"),
            },
        }
    }
    None
}

/// Run a handler with its failures contained: errors and panics become "no response".
fn invoke(subscription: &Subscription, data: Value, sender: MessageSender) -> Reply {
    let call = AssertUnwindSafe(|| subscription.handler.call(data, sender));
    match panic::catch_unwind(call) {
        Ok(Ok(reply)) => reply,
        Ok(Err(error)) => {
            tracing::warn!(
                subscription = subscription.id,
                %error,
                "handler failed, treating as no response"
            );
            Reply::NoResponse
        }
        Err(payload) => {
            tracing::warn!(
                subscription = subscription.id,
                panic = %panic_message(&*payload),
                "handler panicked, treating as no response"
            );
            Reply::NoResponse
        }
    }
}

async fn settle(id: usize, pending: PendingReply) -> Option<Value> {
    match AssertUnwindSafe(pending).catch_unwind().await {
        Ok(Ok(value)) => value,
        Ok(Err(error)) => {
            tracing::warn!(
                subscription = id,
                %error,
                "deferred reply failed, treating as no response"
            );
            None
        }
        Err(payload) => {
            tracing::warn!(
                subscription = id,
                panic = %panic_message(&*payload),
                "deferred reply panicked, treating as no response"
            );
            None
        }
    }
}
