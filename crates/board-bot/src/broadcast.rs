use std::time::Duration;

use tokio::sync::mpsc::{self, error::SendTimeoutError, error::TrySendError};
use tracing::{debug, info, warn};

use board_types::events::BoardEvent;

use crate::error::DispatchError;

const REGISTRATION_CAPACITY: usize = 16;

/// A registered bot's inbound queue.
struct BotInbox {
    name: String,
    tx: mpsc::Sender<BoardEvent>,
}

/// Delivery counters returned when the broadcaster stops.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchStats {
    pub delivered: u64,
    pub dropped: u64,
}

/// Cheap cloneable handle used by the controller and the poster to publish events
/// and by startup code to register bots.
#[derive(Clone)]
pub struct BroadcasterHandle {
    events: mpsc::Sender<BoardEvent>,
    registrations: mpsc::Sender<BotInbox>,
}

/// Fans every published event out to all registered bot inboxes.
pub struct Broadcaster {
    events: mpsc::Receiver<BoardEvent>,
    registrations: mpsc::Receiver<BotInbox>,
    inboxes: Vec<BotInbox>,
    stats: DispatchStats,
}

/// Create a broadcaster whose inbound queue holds at most `capacity` events.
pub fn channel(capacity: usize) -> (BroadcasterHandle, Broadcaster) {
    let (events_tx, events_rx) = mpsc::channel(capacity);
    let (reg_tx, reg_rx) = mpsc::channel(REGISTRATION_CAPACITY);

    let handle = BroadcasterHandle {
        events: events_tx,
        registrations: reg_tx,
    };
    let broadcaster = Broadcaster {
        events: events_rx,
        registrations: reg_rx,
        inboxes: Vec::new(),
        stats: DispatchStats::default(),
    };
    (handle, broadcaster)
}

impl BroadcasterHandle {
    /// Queue an event for fan-out, waiting at most `wait` for room.
    pub async fn publish(&self, event: BoardEvent, wait: Duration) -> Result<(), DispatchError> {
        self.events
            .send_timeout(event, wait)
            .await
            .map_err(|e| match e {
                SendTimeoutError::Timeout(_) => DispatchError::Timeout(wait),
                SendTimeoutError::Closed(_) => DispatchError::Closed,
            })
    }

    /// Register a bot. Events published after this call returns reach the returned inbox.
    pub async fn register(
        &self,
        name: impl Into<String>,
        inbox_capacity: usize,
    ) -> Result<mpsc::Receiver<BoardEvent>, DispatchError> {
        let (tx, rx) = mpsc::channel(inbox_capacity);
        self.registrations
            .send(BotInbox {
                name: name.into(),
                tx,
            })
            .await
            .map_err(|_| DispatchError::Closed)?;
        Ok(rx)
    }
}

impl Broadcaster {
    /// Run until every handle is dropped and the inbound queue is drained.
    pub async fn run(mut self) -> DispatchStats {
        info!("Broadcaster started");

        loop {
            tokio::select! {
                // Registrations first so a bot registered before a publish sees it.
                biased;
                Some(inbox) = self.registrations.recv() => {
                    info!(bot = %inbox.name, "Bot registered");
                    self.inboxes.push(inbox);
                }
                event = self.events.recv() => match event {
                    Some(event) => self.fan_out(event),
                    None => break,
                },
            }
        }

        info!(
            delivered = self.stats.delivered,
            dropped = self.stats.dropped,
            "Broadcaster stopped"
        );
        self.stats
    }

    /// Never blocks: a full inbox loses this event, a closed inbox is unregistered.
    fn fan_out(&mut self, event: BoardEvent) {
        let Self { inboxes, stats, .. } = self;
        debug!(
            id = event.message.id,
            bots = inboxes.len(),
            published_at = %event.published_at,
            "Broadcasting message"
        );

        inboxes.retain(|inbox| match inbox.tx.try_send(event.clone()) {
            Ok(()) => {
                stats.delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                warn!(bot = %inbox.name, id = event.message.id, "Bot inbox full, dropping message");
                stats.dropped += 1;
                true
            }
            Err(TrySendError::Closed(_)) => {
                info!(bot = %inbox.name, "Bot inbox closed, unregistering");
                false
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use board_types::models::Message;

    fn event(id: i64, body: &str) -> BoardEvent {
        BoardEvent::from_user(Message {
            id,
            body: body.into(),
            username: "taro".into(),
        })
    }

    const WAIT: Duration = Duration::from_millis(100);

    #[tokio::test]
    async fn every_bot_gets_a_copy() {
        let (handle, broadcaster) = channel(8);
        let mut a = handle.register("a", 8).await.unwrap();
        let mut b = handle.register("b", 8).await.unwrap();
        let task = tokio::spawn(broadcaster.run());

        handle.publish(event(1, "hello"), WAIT).await.unwrap();
        handle.publish(event(2, "gacha"), WAIT).await.unwrap();
        drop(handle);

        let stats = task.await.unwrap();
        assert_eq!(stats, DispatchStats { delivered: 4, dropped: 0 });

        for inbox in [&mut a, &mut b] {
            assert_eq!(inbox.recv().await.unwrap().message.id, 1);
            assert_eq!(inbox.recv().await.unwrap().message.id, 2);
            assert!(inbox.recv().await.is_none());
        }
    }

    #[tokio::test]
    async fn full_inbox_does_not_block_other_bots() {
        let (handle, broadcaster) = channel(8);
        let mut slow = handle.register("slow", 1).await.unwrap();
        let mut fast = handle.register("fast", 8).await.unwrap();

        for id in 1..=3 {
            handle.publish(event(id, "omikuji"), WAIT).await.unwrap();
        }
        drop(handle);

        let stats = broadcaster.run().await;
        assert_eq!(stats, DispatchStats { delivered: 4, dropped: 2 });

        assert_eq!(slow.recv().await.unwrap().message.id, 1);
        assert!(slow.recv().await.is_none());

        let mut ids = Vec::new();
        while let Some(e) = fast.recv().await {
            ids.push(e.message.id);
        }
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn closed_inbox_is_unregistered() {
        let (handle, broadcaster) = channel(8);
        let gone = handle.register("gone", 8).await.unwrap();
        let mut alive = handle.register("alive", 8).await.unwrap();
        drop(gone);

        handle.publish(event(1, "hello"), WAIT).await.unwrap();
        handle.publish(event(2, "hello"), WAIT).await.unwrap();
        drop(handle);

        let stats = broadcaster.run().await;
        assert_eq!(stats, DispatchStats { delivered: 2, dropped: 0 });
        assert_eq!(alive.recv().await.unwrap().message.id, 1);
    }

    #[tokio::test]
    async fn publish_times_out_when_queue_is_full() {
        let (handle, broadcaster) = channel(1);
        handle.publish(event(1, "hello"), WAIT).await.unwrap();

        let err = handle
            .publish(event(2, "hello"), Duration::from_millis(10))
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Timeout(_)));

        drop(broadcaster);
        let err = handle.publish(event(3, "hello"), WAIT).await.unwrap_err();
        assert!(matches!(err, DispatchError::Closed));
    }
}
