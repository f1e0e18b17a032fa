//! Per-tab messaging between the background context and a content context.
//!
//! Contexts share no memory: every `Message` is moved into the channel and
//! owned by the receiving side from then on.

use crate::error::HelperError;
use crate::message::Message;
use crate::types::{PostData, TabId};
use tokio::sync::{mpsc, oneshot};

#[derive(Debug)]
pub enum Envelope {
    /// Awaits a `PostData` reply (GET_POST_DATA).
    Request {
        message: Message,
        reply: oneshot::Sender<PostData>,
    },
    /// One-way delivery (INJECT_RESULT).
    Notification(Message),
}

/// Sending half of a tab's runtime inbox.
#[derive(Debug, Clone)]
pub struct TabPort {
    tab_id: TabId,
    sender: mpsc::UnboundedSender<Envelope>,
}

pub fn tab_channel(tab_id: TabId) -> (TabPort, mpsc::UnboundedReceiver<Envelope>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (TabPort { tab_id, sender }, receiver)
}

impl TabPort {
    pub fn tab_id(&self) -> TabId {
        self.tab_id
    }

    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    pub async fn request(&self, message: Message) -> Result<PostData, HelperError> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(Envelope::Request { message, reply })
            .map_err(|_| HelperError::ExtractionUnavailable {
                tab_id: self.tab_id,
                reason: "receiving end does not exist".to_string(),
            })?;

        response
            .await
            .map_err(|_| HelperError::ExtractionUnavailable {
                tab_id: self.tab_id,
                reason: "content script went away before replying".to_string(),
            })
    }

    pub fn notify(&self, message: Message) -> Result<(), HelperError> {
        self.sender
            .send(Envelope::Notification(message))
            .map_err(|_| HelperError::TabClosed {
                tab_id: self.tab_id,
            })
    }
}
