//! Change notification backed by a `tokio::sync::broadcast` channel.

use renderq_core::JobEvent;
use tokio::sync::broadcast;
use tracing::debug;

/// Default buffer capacity for the broadcast channel.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Fan-out of [`JobEvent`]s to every current subscriber.
///
/// Delivery is best-effort: an event published with no subscriber is
/// dropped, and a subscriber that falls more than `capacity` events behind
/// observes `RecvError::Lagged` and should re-read state.
#[derive(Debug, Clone)]
pub struct ChangeNotifier {
    sender: broadcast::Sender<JobEvent>,
}

impl ChangeNotifier {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    pub fn publish(&self, event: JobEvent) {
        // A send error only means there are no receivers right now.
        if let Err(err) = self.sender.send(event) {
            debug!(event = ?err.0, "No subscribers, change event dropped");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<JobEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use renderq_core::{JobId, JobStatus};
    use tokio::sync::broadcast::error::{RecvError, TryRecvError};

    fn update(id: i64) -> JobEvent {
        JobEvent::JobUpdated {
            job_id: JobId::new(id),
            status: JobStatus::Working,
        }
    }

    #[tokio::test]
    async fn test_every_subscriber_receives_event() {
        let notifier = ChangeNotifier::default();
        let mut rx1 = notifier.subscribe();
        let mut rx2 = notifier.subscribe();

        notifier.publish(update(1));

        assert_eq!(rx1.recv().await.unwrap(), update(1));
        assert_eq!(rx2.recv().await.unwrap(), update(1));
    }

    #[test]
    fn test_publish_without_subscribers_is_dropped() {
        let notifier = ChangeNotifier::default();
        notifier.publish(update(1));

        // A late subscriber does not see events published before it attached.
        let mut rx = notifier.subscribe();
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_slow_subscriber_lags() {
        let notifier = ChangeNotifier::new(2);
        let mut rx = notifier.subscribe();

        for id in 1..=4 {
            notifier.publish(update(id));
        }

        assert!(matches!(rx.recv().await, Err(RecvError::Lagged(2))));
        assert_eq!(rx.recv().await.unwrap(), update(3));
    }

    #[test]
    fn test_subscriber_count_tracks_receivers() {
        let notifier = ChangeNotifier::default();
        assert_eq!(notifier.subscriber_count(), 0);
        let rx = notifier.subscribe();
        assert_eq!(notifier.subscriber_count(), 1);
        drop(rx);
        assert_eq!(notifier.subscriber_count(), 0);
    }
}
