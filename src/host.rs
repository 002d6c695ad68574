//! Host capabilities and the adapter that hides which calling convention is active.
//!
//! Chromium exposes `chrome.runtime`, whose functions take a completion callback as
//! their last argument. Firefox exposes `browser.runtime`, whose functions return a
//! promise. The application wraps whichever namespace it has in a [`CallbackHost`] or
//! a [`PromiseHost`], picks one with [`RuntimeAdapter::select`], and hands that
//! adapter to both [`Messenger`](crate::Messenger) and [`Registry`](crate::Registry).

use crate::error::{HostError, MessagingError};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
    any::Any,
    fmt,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
};
use tokio::sync::oneshot;

pub type TabId = i64;

/// Tab descriptor as returned by `tabs.query`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Tab {
    pub id: Option<TabId>,
    pub window_id: Option<i64>,
    pub active: bool,
    pub url: Option<String>,
    pub title: Option<String>,
}

/// Who sent an incoming message, as reported by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MessageSender {
    pub id: Option<String>,
    pub url: Option<String>,
    pub origin: Option<String>,
    pub tab: Option<Tab>,
    pub frame_id: Option<i64>,
    pub document_id: Option<String>,
    pub tls_channel_id: Option<String>,
}

/// The host functions this crate calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostPrimitive {
    /// `runtime.sendMessage([extensionId], message, [options])`
    RuntimeSendMessage,
    /// `tabs.sendMessage(tabId, message, [options])`
    TabsSendMessage,
    /// `tabs.query(queryInfo)`
    TabsQuery,
}

impl HostPrimitive {
    pub const fn as_str(self) -> &'static str {
        match self {
            HostPrimitive::RuntimeSendMessage => "runtime.sendMessage",
            HostPrimitive::TabsSendMessage => "tabs.sendMessage",
            HostPrimitive::TabsQuery => "tabs.query",
        }
    }
}

impl fmt::Display for HostPrimitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Completion callback handed to a callback-style host function. Receives the
/// callback's positional arguments.
pub type Completion = Box<dyn FnOnce(Vec<Value>) + Send + 'static>;

/// Raw reply primitive of a callback-style `onMessage` event (`sendResponse`).
/// `None` replies with no value.
pub type SendResponse = Box<dyn FnOnce(Option<Value>) + Send + 'static>;

/// Listener for a callback-style `onMessage` event. Returning `true` keeps the
/// reply channel open until `SendResponse` is called.
pub type CallbackListener =
    Box<dyn Fn(Value, MessageSender, SendResponse) -> bool + Send + Sync + 'static>;

/// Listener for a promise-style `onMessage` event. Returning `None` means this
/// listener does not respond.
pub type PromiseListener = Box<
    dyn Fn(Value, MessageSender) -> Option<BoxFuture<'static, Option<Value>>>
        + Send
        + Sync
        + 'static,
>;

/// Drives detached futures on the host's event loop.
pub trait TaskSpawner: Send + Sync + 'static {
    fn spawn(&self, task: BoxFuture<'static, ()>);
}

/// A host whose functions report completion through a trailing callback.
pub trait CallbackHost: TaskSpawner {
    /// Invoke `primitive` with `args` followed by `done`. An `Err` is a
    /// synchronous throw.
    fn call(
        &self,
        primitive: HostPrimitive,
        args: Vec<Value>,
        done: Completion,
    ) -> Result<(), HostError>;

    /// Subscribe to the single `runtime.onMessage` event.
    fn add_listener(&self, listener: CallbackListener);
}

/// A host whose functions return futures.
pub trait PromiseHost: TaskSpawner {
    fn call(
        &self,
        primitive: HostPrimitive,
        args: Vec<Value>,
    ) -> BoxFuture<'static, Result<Option<Value>, HostError>>;

    fn add_listener(&self, listener: PromiseListener);
}

/// Which completion style the active host uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostStyle {
    Callback,
    Promise,
}

impl HostStyle {
    /// Pick a style from what is available. A callback host wins when both
    /// exist (Firefox also exposes a callback-compatible `chrome` namespace).
    pub const fn detect(callback_available: bool, promise_available: bool) -> Option<Self> {
        if callback_available {
            Some(HostStyle::Callback)
        } else if promise_available {
            Some(HostStyle::Promise)
        } else {
            None
        }
    }
}

/// The hosts an application found in its environment.
#[derive(Default, Clone)]
pub struct AvailableHosts {
    pub callback: Option<Arc<dyn CallbackHost>>,
    pub promise: Option<Arc<dyn PromiseHost>>,
}

/// The selected host, injected into [`Messenger`](crate::Messenger) and
/// [`Registry`](crate::Registry).
#[derive(Clone)]
pub enum RuntimeAdapter {
    Callback(Arc<dyn CallbackHost>),
    Promise(Arc<dyn PromiseHost>),
}

impl fmt::Debug for RuntimeAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RuntimeAdapter").field(&self.style()).finish()
    }
}

impl RuntimeAdapter {
    pub fn callback(host: impl CallbackHost) -> Self {
        RuntimeAdapter::Callback(Arc::new(host))
    }

    pub fn promise(host: impl PromiseHost) -> Self {
        RuntimeAdapter::Promise(Arc::new(host))
    }

    /// Select once, at startup, from the available hosts.
    pub fn select(available: AvailableHosts) -> Result<Self, MessagingError> {
        let style = HostStyle::detect(available.callback.is_some(), available.promise.is_some());
        match (style, available.callback, available.promise) {
            (Some(HostStyle::Callback), Some(host), _) => Ok(RuntimeAdapter::Callback(host)),
            (Some(HostStyle::Promise), _, Some(host)) => Ok(RuntimeAdapter::Promise(host)),
            _ => Err(MessagingError::NoHost),
        }
    }

    pub fn style(&self) -> HostStyle {
        match self {
            RuntimeAdapter::Callback(_) => HostStyle::Callback,
            RuntimeAdapter::Promise(_) => HostStyle::Promise,
        }
    }

    pub fn spawn(&self, task: BoxFuture<'static, ()>) {
        match self {
            RuntimeAdapter::Callback(host) => host.spawn(task),
            RuntimeAdapter::Promise(host) => host.spawn(task),
        }
    }

    /// Invoke a host primitive and get a single value back, whatever the style.
    pub async fn call(
        &self,
        primitive: HostPrimitive,
        args: Vec<Value>,
    ) -> Result<Option<Value>, MessagingError> {
        tracing::debug!(
            %primitive,
            style = ?self.style(),
            args = args.len(),
            "invoking host primitive"
        );
        match self {
            RuntimeAdapter::Callback(host) => {
                let host = Arc::clone(host);
                callback_to_future(move |args, done| host.call(primitive, args, done), args)
                    .await
            }
            RuntimeAdapter::Promise(host) => Ok(host.call(primitive, args).await?),
        }
    }
}

/// Wrap a callback-terminated host function into a future.
///
/// The callback's arguments collapse as follows: none → `None`, one → that value,
/// several → a JSON array of all of them. An `Err` return or a panic from `func`
/// rejects with [`MessagingError::Host`]. If the completion is never invoked the
/// future never settles.
pub async fn callback_to_future<F>(
    func: F,
    args: Vec<Value>,
) -> Result<Option<Value>, MessagingError>
where
    F: FnOnce(Vec<Value>, Completion) -> Result<(), HostError>,
{
    let (tx, rx) = oneshot::channel::<Vec<Value>>();
    let done: Completion = Box::new(move |results| {
        // Receiver gone means the caller stopped waiting.
        let _ = tx.send(results);
    });

    match panic::catch_unwind(AssertUnwindSafe(move || func(args, done))) {
        Ok(Ok(())) => {}
        Ok(Err(err)) => return Err(MessagingError::Host(err)),
        Err(payload) => return Err(MessagingError::Host(HostError::new(panic_message(&*payload)))),
    }

    match rx.await {
        Ok(results) => Ok(collapse_results(results)),
        // The completion was dropped without being called: it can never fire.
        Err(_) => std::future::pending().await,
    }
}

fn collapse_results(mut results: Vec<Value>) -> Option<Value> {
    match results.len() {
        0 => None,
        1 => results.pop(),
        _ => Some(Value::Array(results)),
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic with non-string payload".to_string()
    }
}
