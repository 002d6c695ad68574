#![allow(dead_code)]

use futures::{future::BoxFuture, FutureExt};
use runtime_messaging::host::{CallbackListener, Completion, PromiseListener, SendResponse};
use runtime_messaging::{
    CallbackHost, HostError, HostPrimitive, MessageSender, PromiseHost, RuntimeAdapter,
    TaskSpawner,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

type SharedCallbackListener = Arc<dyn Fn(Value, MessageSender, SendResponse) -> bool + Send + Sync>;
type SharedPromiseListener =
    Arc<dyn Fn(Value, MessageSender) -> Option<BoxFuture<'static, Option<Value>>> + Send + Sync>;

/// What every mock host reports as the sender of looped-back messages.
pub fn test_sender() -> MessageSender {
    MessageSender {
        id: Some("test-extension-id".to_string()),
        url: Some("chrome-extension://test-extension-id/popup.html".to_string()),
        ..MessageSender::default()
    }
}

pub fn active_tab(id: i64) -> Value {
    json!({ "id": id, "windowId": 1, "active": true, "url": "https://example.org/" })
}

/// The message argument of a send primitive, given its positional args.
fn message_arg(primitive: HostPrimitive, args: &[Value]) -> Value {
    match primitive {
        // [tabId, message, options?]
        HostPrimitive::TabsSendMessage => args.get(1).cloned().unwrap_or(Value::Null),
        // [extensionId?, message, options?]
        _ => match args.first() {
            Some(Value::String(_)) => args.get(1).cloned().unwrap_or(Value::Null),
            Some(first) => first.clone(),
            None => Value::Null,
        },
    }
}

/// Shared bookkeeping for both mocks.
#[derive(Default)]
struct MockState {
    calls: Mutex<Vec<(HostPrimitive, Vec<Value>)>>,
    tabs: Mutex<Vec<Value>>,
    fail_with: Mutex<Option<String>>,
}

impl MockState {
    fn record(&self, primitive: HostPrimitive, args: &[Value]) -> Result<(), HostError> {
        self.calls.lock().unwrap().push((primitive, args.to_vec()));
        match self.fail_with.lock().unwrap().clone() {
            Some(message) => Err(HostError::new(message)),
            None => Ok(()),
        }
    }
}

/// Chromium-like host: callback-terminated calls, `sendResponse` + `return true`.
/// Sends loop back into the listeners registered on this same host.
#[derive(Clone, Default)]
pub struct MockChrome {
    listeners: Arc<Mutex<Vec<SharedCallbackListener>>>,
    state: Arc<MockState>,
}

impl MockChrome {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn adapter(&self) -> RuntimeAdapter {
        RuntimeAdapter::callback(self.clone())
    }

    pub fn with_tabs(self, tabs: Vec<Value>) -> Self {
        *self.state.tabs.lock().unwrap() = tabs;
        self
    }

    pub fn fail_with(&self, message: &str) {
        *self.state.fail_with.lock().unwrap() = Some(message.to_string());
    }

    pub fn calls(&self) -> Vec<(HostPrimitive, Vec<Value>)> {
        self.state.calls.lock().unwrap().clone()
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap().len()
    }

    fn deliver(&self, message: Value, done: Completion) {
        let done = Arc::new(Mutex::new(Some(done)));
        let listeners = self.listeners.lock().unwrap().clone();

        let mut keep_open = false;
        for listener in listeners {
            let slot = Arc::clone(&done);
            let send_response: SendResponse = Box::new(move |reply: Option<Value>| {
                let done = slot.lock().unwrap().take();
                if let Some(done) = done {
                    done(reply.into_iter().collect());
                }
            });
            keep_open |= listener(message.clone(), test_sender(), send_response);
        }

        // Nobody asked to keep the channel open: the host closes it.
        if !keep_open {
            let done = done.lock().unwrap().take();
            if let Some(done) = done {
                done(Vec::new());
            }
        }
    }
}

impl TaskSpawner for MockChrome {
    fn spawn(&self, task: BoxFuture<'static, ()>) {
        tokio::spawn(task);
    }
}

impl CallbackHost for MockChrome {
    fn call(
        &self,
        primitive: HostPrimitive,
        args: Vec<Value>,
        done: Completion,
    ) -> Result<(), HostError> {
        self.state.record(primitive, &args)?;
        match primitive {
            HostPrimitive::TabsQuery => {
                let tabs = self.state.tabs.lock().unwrap().clone();
                done(vec![Value::Array(tabs)]);
            }
            HostPrimitive::RuntimeSendMessage | HostPrimitive::TabsSendMessage => {
                self.deliver(message_arg(primitive, &args), done);
            }
        }
        Ok(())
    }

    fn add_listener(&self, listener: CallbackListener) {
        self.listeners.lock().unwrap().push(Arc::from(listener));
    }
}

/// Firefox-like host: calls return futures, listeners return a promise or nothing.
#[derive(Clone, Default)]
pub struct MockBrowser {
    listeners: Arc<Mutex<Vec<SharedPromiseListener>>>,
    state: Arc<MockState>,
}

impl MockBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn adapter(&self) -> RuntimeAdapter {
        RuntimeAdapter::promise(self.clone())
    }

    pub fn with_tabs(self, tabs: Vec<Value>) -> Self {
        *self.state.tabs.lock().unwrap() = tabs;
        self
    }

    pub fn fail_with(&self, message: &str) {
        *self.state.fail_with.lock().unwrap() = Some(message.to_string());
    }

    pub fn calls(&self) -> Vec<(HostPrimitive, Vec<Value>)> {
        self.state.calls.lock().unwrap().clone()
    }
}

impl TaskSpawner for MockBrowser {
    fn spawn(&self, task: BoxFuture<'static, ()>) {
        tokio::spawn(task);
    }
}

impl PromiseHost for MockBrowser {
    fn call(
        &self,
        primitive: HostPrimitive,
        args: Vec<Value>,
    ) -> BoxFuture<'static, Result<Option<Value>, HostError>> {
        if let Err(err) = self.state.record(primitive, &args) {
            return futures::future::ready(Err(err)).boxed();
        }
        match primitive {
            HostPrimitive::TabsQuery => {
                let tabs = self.state.tabs.lock().unwrap().clone();
                futures::future::ready(Ok(Some(Value::Array(tabs)))).boxed()
            }
            HostPrimitive::RuntimeSendMessage | HostPrimitive::TabsSendMessage => {
                let message = message_arg(primitive, &args);
                let listeners = self.listeners.lock().unwrap().clone();
                // First promise returned by any listener answers the sender.
                let mut reply = None;
                for listener in listeners {
                    if let Some(pending) = listener(message.clone(), test_sender()) {
                        reply.get_or_insert(pending);
                    }
                }
                match reply {
                    Some(pending) => async move { Ok::<_, HostError>(pending.await) }.boxed(),
                    None => futures::future::ready(Ok(None)).boxed(),
                }
            }
        }
    }

    fn add_listener(&self, listener: PromiseListener) {
        self.listeners.lock().unwrap().push(Arc::from(listener));
    }
}
