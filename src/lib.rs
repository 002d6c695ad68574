//! # runtime_messaging
//!
//! A small Rust crate for **browser extension runtime messaging**:
//!
//! - One **async send API** over both host flavours: Chromium's callback-based
//!   `chrome.runtime` and Firefox's promise-based `browser.runtime`
//! - **Addressed messages**: every envelope carries a `source` and `destination`
//!   [`Location`] plus free-form key/value [`FilterSet`]s
//! - Many **independent listeners** sharing the one `onMessage` event a context gets
//!
//! ---
//!
//! ## Why?
//!
//! Each extension context (background, popup, options page, content script) has
//! exactly one `runtime.onMessage` event. Once two features both listen on it they
//! start answering each other's messages. On top of that, Chromium reports results
//! through a trailing callback and wants `true` returned to answer asynchronously,
//! while Firefox wants a promise back. This crate hides both problems.
//!
//! ### Gotchas (read this first)
//!
//! - **No response is normal:** a send that nobody answers resolves to `Ok(None)`.
//! - **No timeout:** if the other side keeps the reply channel open and never answers,
//!   the send never completes. Wrap it yourself if you need a deadline.
//! - **Unmatched messages are silent:** routing is a filter, not validation. A message
//!   that is not a JSON object, or names an unknown location, simply matches nothing.
//! - **Several matches, one reply:** every matching handler runs, but only one reply
//!   reaches the sender ([`MultiMatchPolicy`], first-registered by default). A deferred
//!   reply that fails or resolves to nothing passes the slot to the next match.
//!
//! ---
//!
//! ## Crate layout
//!
//! - [`message`] — [`Location`], [`MessagePath`], [`FilterSet`], [`Envelope`] and matching.
//! - [`host`] — host capability traits, style detection, the callback adapter.
//! - [`send`] — [`Messenger`]: send to background/options/popup/tabs/other extensions.
//! - [`receive`] — [`Registry`], [`Handler`], [`Reply`], [`ActionMap`].
//! - [`config`] — [`MessagingConfig`] (TOML loading behind the `config` feature).
//! - `global` — a shared instance behind free functions (`global` feature).
//!
//! ---
//!
//! ## Wire format
//!
//! Routing fields are siblings of the payload, never nested inside it:
//!
//! ```rust
//! use runtime_messaging::{Envelope, FilterSet, Location, MessagePath};
//! use serde_json::json;
//!
//! let path = MessagePath::between(Location::Content, Location::Background)
//!     .with_filters(FilterSet::from([("op", "ping")]));
//! let envelope = Envelope::new(json!("x"), path);
//!
//! assert_eq!(
//!     serde_json::to_value(&envelope).unwrap(),
//!     json!({
//!         "data": "x",
//!         "source": "content",
//!         "destination": "background",
//!         "filters": { "op": "ping" }
//!     })
//! );
//! ```
//!
//! ## Matching
//!
//! A subscriber's path is a predicate. Unset fields are wildcards; filters are a
//! required subset.
//!
//! ```rust
//! use runtime_messaging::{FilterSet, Location, MessagePath};
//! use serde_json::json;
//!
//! let wanted = MessagePath::any()
//!     .with_source(Location::Content)
//!     .with_filters(FilterSet::from([("op", "ping")]));
//!
//! assert!(wanted.matches(&json!({
//!     "data": 1, "source": "content", "destination": "popup",
//!     "filters": { "op": "ping", "extra": true }
//! })));
//! assert!(!wanted.matches(&json!({ "data": 1, "source": "content" })));
//! ```
//!
//! ---
//!
//! ## Quick start
//!
//! Wrap your host namespace in a [`CallbackHost`] (Chromium) or [`PromiseHost`]
//! (Firefox), select it once, and hand the adapter to both sides.
//!
//! ```ignore
//! use runtime_messaging::{
//!     AvailableHosts, FilterSet, Location, MessageOptions, MessageSender, Messenger,
//!     Registry, Reply, RuntimeAdapter,
//! };
//! use serde_json::{json, Value};
//!
//! let adapter = RuntimeAdapter::select(AvailableHosts {
//!     callback: chrome_host(),   // your binding, if present
//!     promise: browser_host(),   // your binding, if present
//! })?;
//!
//! // Background page: answer pings from content scripts.
//! let registry = Registry::new(adapter.clone());
//! registry.on_message_from_content_script(
//!     Location::Background,
//!     FilterSet::from([("op", "ping")]),
//!     |data: Value, _sender: MessageSender| {
//!         Reply::later(async move { Ok::<_, std::io::Error>(json!({ "pong": data })) })
//!     },
//! );
//!
//! // Content script: ask the background page.
//! let messenger = Messenger::new(adapter);
//! let reply = messenger
//!     .send_to_background(
//!         "hello",
//!         Location::Content,
//!         &MessageOptions::default(),
//!         Some(FilterSet::from([("op", "ping")])),
//!     )
//!     .await?;
//! ```
//!
//! ### One subscription, many operations
//!
//! ```ignore
//! let actions = registry
//!     .action_map()
//!     .on("get", |data: Value, _: MessageSender| json!({ "value": 1 }))?
//!     .on("clear", |_: Value, _: MessageSender| ())?;
//! registry.on_message_anywhere(Some(Location::Background), FilterSet::new(), actions);
//! // `{ "data": { "action": "get" }, ... }` → `{ "value": 1 }`
//! ```
//!
//! ---
//!
//! ## Logging
//!
//! The crate logs through [`tracing`] and installs no subscriber. Handler failures and
//! panics are reported at `warn` and treated as "no response".

pub mod config;
pub mod error;
#[cfg(feature = "global")]
pub mod global;
pub mod host;
pub mod message;
pub mod receive;
pub mod send;

// -------- Message re-exports --------

#[doc(inline)]
pub use message::{Envelope, FilterSet, FilterValue, Location, MessagePath};

// -------- Host re-exports --------

#[doc(inline)]
pub use host::{
    callback_to_future, AvailableHosts, CallbackHost, HostPrimitive, HostStyle, MessageSender,
    PromiseHost, RuntimeAdapter, Tab, TabId, TaskSpawner,
};

// -------- Send / receive re-exports --------

#[doc(inline)]
pub use receive::{ActionMap, Handler, IntoReply, Registry, Reply};
#[doc(inline)]
pub use send::{MessageOptions, Messenger, SendOptions, Target};

#[doc(inline)]
pub use config::{MessagingConfig, MultiMatchPolicy};
#[doc(inline)]
pub use error::{BoxError, HostError, MessagingError};
