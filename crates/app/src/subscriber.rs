//! Channel-backed subscriber used by transports.

use std::sync::Arc;

use tokio::sync::mpsc;

use webthing_domain::id::SubscriberId;
use webthing_domain::message::Message;
use webthing_domain::subscriber::{DeliveryError, Subscriber};

/// Subscriber queuing messages on a bounded tokio channel.
///
/// Sends never block: a full queue drops the message.
#[derive(Debug)]
pub struct ChannelSubscriber {
    id: SubscriberId,
    sender: mpsc::Sender<Message>,
}

impl ChannelSubscriber {
    /// Create a subscriber and the receiver draining it.
    #[must_use]
    pub fn channel(capacity: usize) -> (Arc<Self>, mpsc::Receiver<Message>) {
        let (sender, receiver) = mpsc::channel(capacity);
        let subscriber = Arc::new(Self {
            id: SubscriberId::new(),
            sender,
        });
        (subscriber, receiver)
    }
}

impl Subscriber for ChannelSubscriber {
    fn id(&self) -> SubscriberId {
        self.id
    }

    fn send(&self, message: &Message) -> Result<(), DeliveryError> {
        self.sender
            .try_send(message.clone())
            .map_err(|err| match err {
                mpsc::error::TrySendError::Full(_) => {
                    tracing::warn!(subscriber = %self.id, "subscriber lagging, message dropped");
                    DeliveryError::Full
                }
                mpsc::error::TrySendError::Closed(_) => {
                    tracing::trace!(subscriber = %self.id, "subscriber closed");
                    DeliveryError::Closed
                }
            })
    }
}
