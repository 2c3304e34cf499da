//! Lifecycle notifications around writes.
//!
//! Listeners are registered per event name and called synchronously, in
//! registration order, exactly once per emitted event.

use std::collections::HashMap;
use std::fmt;

use contentstore_core::{ContentRecord, ContentType};

/// Names of the lifecycle events emitted by the storage layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageEventName {
    /// Before a record is written.
    PreSave,
    /// After a record was written.
    PostSave,
    /// Before a record is deleted.
    PreDelete,
    /// After a record was deleted.
    PostDelete,
}

impl StorageEventName {
    /// Every event, in lifecycle order.
    pub const ALL: [StorageEventName; 4] = [
        StorageEventName::PreSave,
        StorageEventName::PostSave,
        StorageEventName::PreDelete,
        StorageEventName::PostDelete,
    ];

    /// Event name as exposed to external listeners.
    pub const fn as_str(self) -> &'static str {
        match self {
            StorageEventName::PreSave => "preSave",
            StorageEventName::PostSave => "postSave",
            StorageEventName::PreDelete => "preDelete",
            StorageEventName::PostDelete => "postDelete",
        }
    }
}

impl fmt::Display for StorageEventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload handed to listeners.
#[derive(Debug, Clone, Copy)]
pub struct StorageEvent<'a> {
    /// Which lifecycle point this is.
    pub name: StorageEventName,
    /// Content type of the affected record.
    pub content_type: &'a ContentType,
    /// Identity of the affected record; `None` before the first save.
    pub id: Option<i64>,
    /// The record being saved. Deletes only carry the identity.
    pub record: Option<&'a ContentRecord>,
}

type Listener = Box<dyn Fn(&StorageEvent<'_>) + Send + Sync>;

/// Ordered listener lists, one per event name.
#[derive(Default)]
pub struct StorageEvents {
    listeners: HashMap<StorageEventName, Vec<Listener>>,
}

impl fmt::Debug for StorageEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for name in StorageEventName::ALL {
            map.entry(&name.as_str(), &self.listener_count(name));
        }
        map.finish()
    }
}

impl StorageEvents {
    /// No listeners.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for `name`.
    pub fn listen<F>(&mut self, name: StorageEventName, listener: F)
    where
        F: Fn(&StorageEvent<'_>) + Send + Sync + 'static,
    {
        self.listeners
            .entry(name)
            .or_default()
            .push(Box::new(listener));
    }

    /// Number of listeners registered for `name`.
    pub fn listener_count(&self, name: StorageEventName) -> usize {
        self.listeners.get(&name).map_or(0, Vec::len)
    }

    /// Call every listener of `event.name`, in registration order.
    pub fn dispatch(&self, event: &StorageEvent<'_>) {
        let Some(listeners) = self.listeners.get(&event.name) else {
            return;
        };
        tracing::trace!(
            event = %event.name,
            content_type = %event.content_type.key,
            id = ?event.id,
            listeners = listeners.len(),
            "Dispatching storage event"
        );
        for listener in listeners {
            listener(event);
        }
    }
}
