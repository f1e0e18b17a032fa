use crate::service::BackgroundHandle;
use helper_core::{HelperError, Message, TabId};
use tracing::{info, warn};

/// The "Run analysis" button of the extension popup.
pub struct PopupController {
    background: BackgroundHandle,
}

impl PopupController {
    pub fn new(background: BackgroundHandle) -> Self {
        Self { background }
    }

    /// Returns whether a RUN_ANALYSIS was sent.
    pub fn run_clicked(&self, active_tab: Option<TabId>) -> Result<bool, HelperError> {
        let Some(tab_id) = active_tab else {
            warn!("No active tab found.");
            return Ok(false);
        };

        self.background
            .send_message(Message::RunAnalysis { tab_id })?;
        info!(%tab_id, "Requested analysis");
        Ok(true)
    }
}
