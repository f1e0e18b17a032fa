use tokio::sync::broadcast;
use tracing::info;

pub const NAVIGATION_EVENT_CAPACITY: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocationChanged {
    pub from: String,
    pub to: String,
}

/// Tracks the last known location of one page load and reports client-side
/// navigations. Nothing resets extraction or injection state on these events
/// yet; subscribers only get notified.
pub struct NavigationObserver {
    last_href: String,
    events: broadcast::Sender<LocationChanged>,
}

impl NavigationObserver {
    pub fn new(initial_href: impl Into<String>, events: broadcast::Sender<LocationChanged>) -> Self {
        Self {
            last_href: initial_href.into(),
            events,
        }
    }

    pub fn last_href(&self) -> &str {
        &self.last_href
    }

    pub fn observe(&mut self, href: &str) -> Option<LocationChanged> {
        if href == self.last_href {
            return None;
        }

        let change = LocationChanged {
            from: std::mem::replace(&mut self.last_href, href.to_string()),
            to: href.to_string(),
        };
        info!(from = %change.from, to = %change.to, "Reddit navigation detected");

        // No subscribers is fine.
        let _ = self.events.send(change.clone());
        Some(change)
    }
}
