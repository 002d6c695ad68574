//! A process-wide [`Messenger`] and [`Registry`] behind free functions.
//!
//! Install once per execution context (background page, popup, content script, ...)
//! with the adapter you selected, then call the free functions from anywhere. Nothing
//! inside this crate reaches for the shared instance.

use crate::{
    config::MessagingConfig,
    error::MessagingError,
    host::{RuntimeAdapter, TabId},
    message::{FilterSet, Location, MessagePath},
    receive::{Handler, Registry},
    send::{MessageOptions, Messenger},
};
use once_cell::sync::OnceCell;
use serde::Serialize;
use serde_json::Value;

#[cfg(feature = "config")]
use std::path::Path;

struct Shared {
    messenger: Messenger,
    registry: Registry,
}

static SHARED: OnceCell<Shared> = OnceCell::new();

pub fn install(adapter: RuntimeAdapter) -> Result<(), MessagingError> {
    install_with_config(adapter, MessagingConfig::default())
}

/// Fails with [`MessagingError::AlreadyInstalled`] on every call after the first;
/// the first adapter stays in place.
pub fn install_with_config(
    adapter: RuntimeAdapter,
    config: MessagingConfig,
) -> Result<(), MessagingError> {
    let mut installed = false;
    SHARED.get_or_init(|| {
        installed = true;
        Shared {
            messenger: Messenger::new(adapter.clone()),
            registry: Registry::with_config(adapter, config),
        }
    });
    if installed {
        Ok(())
    } else {
        Err(MessagingError::AlreadyInstalled)
    }
}

/// Install with a [`MessagingConfig`] read from a TOML file. A config that fails
/// to load leaves nothing installed.
#[cfg(feature = "config")]
pub fn install_from_path(
    adapter: RuntimeAdapter,
    path: impl AsRef<Path>,
) -> Result<(), MessagingError> {
    let config = MessagingConfig::from_path(path)?;
    install_with_config(adapter, config)
}

fn shared() -> Result<&'static Shared, MessagingError> {
    SHARED.get().ok_or(MessagingError::NotInstalled)
}

pub fn messenger() -> Result<&'static Messenger, MessagingError> {
    Ok(&shared()?.messenger)
}

pub fn registry() -> Result<&'static Registry, MessagingError> {
    Ok(&shared()?.registry)
}

// -------- Senders --------

pub async fn send_to<T: Serialize>(
    data: T,
    path: MessagePath,
    options: &MessageOptions,
    tab_id: Option<TabId>,
) -> Result<Option<Value>, MessagingError> {
    messenger()?.send_to(data, path, options, tab_id).await
}

pub async fn send_to_background<T: Serialize>(
    data: T,
    source: Location,
    options: &MessageOptions,
    filters: Option<FilterSet>,
) -> Result<Option<Value>, MessagingError> {
    messenger()?.send_to_background(data, source, options, filters).await
}

pub async fn send_to_options<T: Serialize>(
    data: T,
    source: Location,
    options: &MessageOptions,
    filters: Option<FilterSet>,
) -> Result<Option<Value>, MessagingError> {
    messenger()?.send_to_options(data, source, options, filters).await
}

pub async fn send_to_popup<T: Serialize>(
    data: T,
    source: Location,
    options: &MessageOptions,
    filters: Option<FilterSet>,
) -> Result<Option<Value>, MessagingError> {
    messenger()?.send_to_popup(data, source, options, filters).await
}

pub async fn send_to_content_script<T: Serialize>(
    tab_id: TabId,
    data: T,
    source: Location,
    options: &MessageOptions,
    filters: Option<FilterSet>,
) -> Result<Option<Value>, MessagingError> {
    messenger()?
        .send_to_content_script(tab_id, data, source, options, filters)
        .await
}

pub async fn send_to_current_tab<T: Serialize>(
    data: T,
    source: Location,
    options: &MessageOptions,
    filters: Option<FilterSet>,
) -> Result<Option<Value>, MessagingError> {
    messenger()?.send_to_current_tab(data, source, options, filters).await
}

// -------- Receivers --------

pub fn on_message(path: MessagePath, handler: impl Handler) -> Result<(), MessagingError> {
    registry()?.on_message(path, handler);
    Ok(())
}

pub fn on_message_from_background(
    current: Location,
    filters: FilterSet,
    handler: impl Handler,
) -> Result<(), MessagingError> {
    registry()?.on_message_from_background(current, filters, handler);
    Ok(())
}

pub fn on_message_from_options(
    current: Location,
    filters: FilterSet,
    handler: impl Handler,
) -> Result<(), MessagingError> {
    registry()?.on_message_from_options(current, filters, handler);
    Ok(())
}

pub fn on_message_from_popup(
    current: Location,
    filters: FilterSet,
    handler: impl Handler,
) -> Result<(), MessagingError> {
    registry()?.on_message_from_popup(current, filters, handler);
    Ok(())
}

pub fn on_message_from_content_script(
    current: Location,
    filters: FilterSet,
    handler: impl Handler,
) -> Result<(), MessagingError> {
    registry()?.on_message_from_content_script(current, filters, handler);
    Ok(())
}

pub fn on_message_anywhere(
    current: Option<Location>,
    filters: FilterSet,
    handler: impl Handler,
) -> Result<(), MessagingError> {
    registry()?.on_message_anywhere(current, filters, handler);
    Ok(())
}
