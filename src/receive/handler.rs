use crate::{
    config::MessagingConfig,
    error::{BoxError, MessagingError},
    host::MessageSender,
};
use futures::{future::BoxFuture, FutureExt};
use serde::Serialize;
use serde_json::Value;
use std::{collections::HashMap, fmt, future::Future};

/// Future behind a deferred reply. `Ok(None)` declines to respond.
pub type PendingReply = BoxFuture<'static, Result<Option<Value>, BoxError>>;

/// What a handler hands back to the registry.
pub enum Reply {
    /// The handler declines to respond.
    NoResponse,
    /// Respond immediately with this value.
    Ready(Value),
    /// Respond once the future settles.
    Deferred(PendingReply),
}

impl Reply {
    /// Respond with the serialized output of `fut` once it completes.
    pub fn later<F, T, E>(fut: F) -> Self
    where
        F: Future<Output = Result<T, E>> + Send + 'static,
        T: Serialize,
        E: Into<BoxError>,
    {
        Reply::Deferred(
            async move {
                let value = fut.await.map_err(Into::<BoxError>::into)?;
                Ok::<_, BoxError>(Some(serde_json::to_value(value)?))
            }
            .boxed(),
        )
    }

    pub fn is_response(&self) -> bool {
        !matches!(self, Reply::NoResponse)
    }
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::NoResponse => f.write_str("NoResponse"),
            Reply::Ready(v) => f.debug_tuple("Ready").field(v).finish(),
            Reply::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// Conversion from a handler's return value into a [`Reply`].
pub trait IntoReply {
    fn into_reply(self) -> Result<Reply, BoxError>;
}

impl IntoReply for Reply {
    fn into_reply(self) -> Result<Reply, BoxError> {
        Ok(self)
    }
}

impl IntoReply for () {
    fn into_reply(self) -> Result<Reply, BoxError> {
        Ok(Reply::NoResponse)
    }
}

impl IntoReply for Value {
    fn into_reply(self) -> Result<Reply, BoxError> {
        Ok(Reply::Ready(self))
    }
}

impl IntoReply for Option<Value> {
    fn into_reply(self) -> Result<Reply, BoxError> {
        Ok(self.map_or(Reply::NoResponse, Reply::Ready))
    }
}

impl<T, E> IntoReply for Result<T, E>
where
    T: IntoReply,
    E: Into<BoxError>,
{
    fn into_reply(self) -> Result<Reply, BoxError> {
        self.map_err(Into::<BoxError>::into)?.into_reply()
    }
}

/// Something that handles the `data` of a matched envelope.
///
/// Implemented for closures `Fn(Value, MessageSender) -> impl IntoReply` and for
/// [`ActionMap`].
pub trait Handler: Send + Sync + 'static {
    fn call(&self, data: Value, sender: MessageSender) -> Result<Reply, BoxError>;
}

impl<F, R> Handler for F
where
    F: Fn(Value, MessageSender) -> R + Send + Sync + 'static,
    R: IntoReply,
{
    fn call(&self, data: Value, sender: MessageSender) -> Result<Reply, BoxError> {
        self(data, sender).into_reply()
    }
}

/// Dispatch table keyed by a string tag read from the envelope's `data`.
///
/// Lets one subscription serve several logical operations. Tags are validated
/// when registered; an unknown or missing tag at runtime is "no response".
pub struct ActionMap {
    key: String,
    actions: HashMap<String, Box<dyn Handler>>,
}

impl Default for ActionMap {
    fn default() -> Self {
        Self::keyed_by(MessagingConfig::default().action_key)
    }
}

impl ActionMap {
    /// Tag read from `data.action`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag read from `data.<key>`.
    pub fn keyed_by(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            actions: HashMap::new(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn on(
        mut self,
        action: impl Into<String>,
        handler: impl Handler,
    ) -> Result<Self, MessagingError> {
        let action = action.into();
        if action.trim().is_empty() {
            return Err(MessagingError::EmptyAction);
        }
        if self.actions.contains_key(&action) {
            return Err(MessagingError::DuplicateAction(action));
        }
        self.actions.insert(action, Box::new(handler));
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

impl Handler for ActionMap {
    fn call(&self, data: Value, sender: MessageSender) -> Result<Reply, BoxError> {
        let handler = data
            .get(&self.key)
            .and_then(Value::as_str)
            .and_then(|tag| self.actions.get(tag));
        match handler {
            Some(handler) => handler.call(data, sender),
            None => {
                tracing::trace!(key = %self.key, "no action registered for tag");
                Ok(Reply::NoResponse)
            }
        }
    }
}
