//! In-process pub/sub keyed by channel name.
//!
//! One named channel (e.g. `"queue"` carrying a `"queue_update"` message)
//! wakes any number of subscribers. `tokio::sync::broadcast` gives us
//! exactly this shape (every live receiver gets every message), so the
//! messenger is a thin, mutex-guarded registry over broadcast senders
//! rather than a hand-rolled notification mechanism.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 64;

pub struct Messenger {
    channels: Mutex<HashMap<String, broadcast::Sender<String>>>,
}

impl Default for Messenger {
    fn default() -> Self {
        Self::new()
    }
}

impl Messenger {
    pub fn new() -> Self {
        Self {
            channels: Mutex::new(HashMap::new()),
        }
    }

    fn sender_for(&self, channel: &str) -> broadcast::Sender<String> {
        let mut channels = self.channels.lock().expect("messenger mutex poisoned");
        channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_CAPACITY).0)
            .clone()
    }

    /// Publishes `message` on `channel`. A channel with no subscribers
    /// silently drops the message, matching fire-and-forget pub/sub
    /// semantics.
    pub fn publish(&self, channel: &str, message: impl Into<String>) {
        let sender = self.sender_for(channel);
        let _ = sender.send(message.into());
    }

    pub fn subscribe(&self, channel: &str) -> broadcast::Receiver<String> {
        self.sender_for(channel).subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn subscriber_observes_published_message() {
        let messenger = Messenger::new();
        let mut rx = messenger.subscribe("queue");
        messenger.publish("queue", "queue_update");

        let received = tokio::time::timeout(Duration::from_millis(100), rx.recv())
            .await
            .expect("did not time out")
            .expect("channel not closed");
        assert_eq!(received, "queue_update");
    }

    #[tokio::test]
    async fn publish_with_no_subscribers_does_not_panic() {
        let messenger = Messenger::new();
        messenger.publish("queue", "queue_update");
    }
}
