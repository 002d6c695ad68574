//! Outbound messages: one async contract over both host styles.

use crate::{
    error::MessagingError,
    host::{HostPrimitive, RuntimeAdapter, Tab, TabId},
    message::{Envelope, FilterSet, Location, MessagePath},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Where a message goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Every listening context of this extension.
    Runtime,
    /// Another extension, by id.
    Extension(String),
    /// The content scripts of one tab.
    Tab(TabId),
}

impl Target {
    /// Positional arguments for the host primitive, in host order.
    pub fn arguments(&self, message: Value, options: Option<Value>) -> (HostPrimitive, Vec<Value>) {
        let (primitive, mut args) = match self {
            Target::Runtime => (HostPrimitive::RuntimeSendMessage, vec![message]),
            Target::Extension(id) => (HostPrimitive::RuntimeSendMessage, vec![json!(id), message]),
            Target::Tab(tab_id) => (HostPrimitive::TabsSendMessage, vec![json!(tab_id), message]),
        };
        args.extend(options);
        (primitive, args)
    }
}

/// Host send options (`runtime.MessageOptions` / `tabs.MessageSendOptions`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include_tls_channel_id: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_id: Option<String>,
}

/// Per-call options for the convenience senders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageOptions {
    /// Send to this extension instead of our own. Takes precedence over a tab id.
    pub extension_id: Option<String>,
    pub options: Option<SendOptions>,
}

impl MessageOptions {
    pub fn to_extension(extension_id: impl Into<String>) -> Self {
        Self {
            extension_id: Some(extension_id.into()),
            options: None,
        }
    }
}

/// Sends envelopes through the selected host and resolves with the reply.
///
/// `Ok(None)` means nobody responded. Failures of the host primitive come back as
/// [`MessagingError::Host`]. There is no timeout: if the other end never replies,
/// neither does the returned future.
#[derive(Debug, Clone)]
pub struct Messenger {
    adapter: RuntimeAdapter,
}

impl Messenger {
    pub fn new(adapter: RuntimeAdapter) -> Self {
        Self { adapter }
    }

    pub fn adapter(&self) -> &RuntimeAdapter {
        &self.adapter
    }

    pub async fn send<T: Serialize>(
        &self,
        envelope: &Envelope<T>,
        target: &Target,
        options: Option<&SendOptions>,
    ) -> Result<Option<Value>, MessagingError> {
        let message = serde_json::to_value(envelope)
            .map_err(MessagingError::Encode)?;
        let options = options
            .map(serde_json::to_value)
            .transpose()
            .map_err(MessagingError::Encode)?;
        let (primitive, args) = target.arguments(message, options);
        tracing::debug!(
            ?target,
            source = ?envelope.path.source,
            destination = ?envelope.path.destination,
            "sending message"
        );
        self.adapter.call(primitive, args).await
    }

    /// Merge `data` and `path` into an envelope and send it. The target is the
    /// extension in `options` if any, else `tab_id` if any, else our own runtime.
    pub async fn send_to<T: Serialize>(
        &self,
        data: T,
        path: MessagePath,
        options: &MessageOptions,
        tab_id: Option<TabId>,
    ) -> Result<Option<Value>, MessagingError> {
        let target = match (&options.extension_id, tab_id) {
            (Some(id), _) => Target::Extension(id.clone()),
            (None, Some(tab_id)) => Target::Tab(tab_id),
            (None, None) => Target::Runtime,
        };
        let envelope = Envelope::new(data, path);
        self.send(&envelope, &target, options.options.as_ref()).await
    }

    pub async fn send_to_background<T: Serialize>(
        &self,
        data: T,
        source: Location,
        options: &MessageOptions,
        filters: Option<FilterSet>,
    ) -> Result<Option<Value>, MessagingError> {
        let path = addressed(source, Location::Background, filters);
        self.send_to(data, path, options, None).await
    }

    pub async fn send_to_options<T: Serialize>(
        &self,
        data: T,
        source: Location,
        options: &MessageOptions,
        filters: Option<FilterSet>,
    ) -> Result<Option<Value>, MessagingError> {
        let path = addressed(source, Location::Options, filters);
        self.send_to(data, path, options, None).await
    }

    pub async fn send_to_popup<T: Serialize>(
        &self,
        data: T,
        source: Location,
        options: &MessageOptions,
        filters: Option<FilterSet>,
    ) -> Result<Option<Value>, MessagingError> {
        let path = addressed(source, Location::Popup, filters);
        self.send_to(data, path, options, None).await
    }

    pub async fn send_to_content_script<T: Serialize>(
        &self,
        tab_id: TabId,
        data: T,
        source: Location,
        options: &MessageOptions,
        filters: Option<FilterSet>,
    ) -> Result<Option<Value>, MessagingError> {
        let path = addressed(source, Location::Content, filters);
        self.send_to(data, path, options, Some(tab_id)).await
    }

    /// Send to the content script of the active tab in the current window.
    pub async fn send_to_current_tab<T: Serialize>(
        &self,
        data: T,
        source: Location,
        options: &MessageOptions,
        filters: Option<FilterSet>,
    ) -> Result<Option<Value>, MessagingError> {
        let tab = self.current_tab().await?;
        let tab_id = tab.id.ok_or(MessagingError::NoActiveTab)?;
        self.send_to_content_script(tab_id, data, source, options, filters)
            .await
    }

    /// The active tab of the current window.
    pub async fn current_tab(&self) -> Result<Tab, MessagingError> {
        let query = json!({ "active": true, "currentWindow": true });
        let reply = self.adapter.call(HostPrimitive::TabsQuery, vec![query]);
        let tabs: Vec<Tab> = match reply.await? {
            Some(tabs) => serde_json::from_value(tabs).map_err(MessagingError::Decode)?,
            None => Vec::new(),
        };
        tabs.into_iter().next().ok_or(MessagingError::NoActiveTab)
    }
}

fn addressed(source: Location, destination: Location, filters: Option<FilterSet>) -> MessagePath {
    MessagePath {
        source: Some(source),
        destination: Some(destination),
        filters,
    }
}
