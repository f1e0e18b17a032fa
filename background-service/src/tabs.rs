use async_trait::async_trait;
use helper_core::{HelperError, Message, PostData, TabId, TabPort};
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::{debug, info};

/// Cross-context messaging as seen from the background context.
#[async_trait]
pub trait TabMessenger: Send + Sync {
    /// Sends a message to a tab and waits for its `PostData` reply.
    async fn send_request(&self, tab_id: TabId, message: Message) -> Result<PostData, HelperError>;

    /// Fire-and-forget delivery; succeeds once the message is queued.
    fn send_notification(&self, tab_id: TabId, message: Message) -> Result<(), HelperError>;
}

/// Runtime inboxes of every tab that has a content script attached.
#[derive(Default)]
pub struct TabRegistry {
    ports: RwLock<HashMap<TabId, TabPort>>,
}

impl TabRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, port: TabPort) {
        let tab_id = port.tab_id();
        if let Ok(mut ports) = self.ports.write() {
            if ports.insert(tab_id, port).is_some() {
                debug!(%tab_id, "Replaced content script port");
            }
            info!(%tab_id, "Tab registered");
        }
    }

    pub fn remove(&self, tab_id: TabId) -> Option<TabPort> {
        self.ports.write().ok()?.remove(&tab_id)
    }

    pub fn contains(&self, tab_id: TabId) -> bool {
        self.ports
            .read()
            .map(|ports| ports.contains_key(&tab_id))
            .unwrap_or(false)
    }

    fn port(&self, tab_id: TabId) -> Option<TabPort> {
        self.ports.read().ok()?.get(&tab_id).cloned()
    }
}

#[async_trait]
impl TabMessenger for TabRegistry {
    async fn send_request(&self, tab_id: TabId, message: Message) -> Result<PostData, HelperError> {
        let port = self
            .port(tab_id)
            .ok_or_else(|| HelperError::ExtractionUnavailable {
                tab_id,
                reason: "no content script in tab".to_string(),
            })?;
        port.request(message).await
    }

    fn send_notification(&self, tab_id: TabId, message: Message) -> Result<(), HelperError> {
        self.port(tab_id)
            .ok_or(HelperError::TabClosed { tab_id })?
            .notify(message)
    }
}
