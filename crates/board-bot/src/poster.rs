use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{error, info, warn};

use board_db::Database;
use board_types::events::BoardEvent;
use board_types::models::NewMessage;

use crate::broadcast::BroadcasterHandle;
use crate::error::DispatchError;

/// A reply waiting to be stored, tagged with the bot that produced it.
#[derive(Debug)]
pub struct Outgoing {
    pub bot: String,
    pub message: NewMessage,
}

#[derive(Clone)]
pub struct PosterHandle {
    tx: mpsc::Sender<Outgoing>,
}

/// Single writer for bot replies: stores each one and re-broadcasts it.
pub struct Poster {
    inbound: mpsc::Receiver<Outgoing>,
}

pub fn channel(capacity: usize) -> (PosterHandle, Poster) {
    let (tx, rx) = mpsc::channel(capacity);
    (PosterHandle { tx }, Poster { inbound: rx })
}

impl PosterHandle {
    /// Waits for room in the queue; only the calling bot is held up.
    pub async fn post(&self, bot: &str, message: NewMessage) -> Result<(), DispatchError> {
        self.tx
            .send(Outgoing {
                bot: bot.to_string(),
                message,
            })
            .await
            .map_err(|_| DispatchError::Closed)
    }
}

impl Poster {
    /// Drain the queue until every handle is dropped. Returns how many replies were stored.
    pub async fn run(
        mut self,
        db: Arc<Database>,
        broadcaster: BroadcasterHandle,
        publish_timeout: Duration,
    ) -> u64 {
        info!("Poster started");
        let mut posted = 0;

        while let Some(Outgoing { bot, message }) = self.inbound.recv().await {
            // Run blocking DB insert off the async runtime
            let store = db.clone();
            let inserted = match tokio::task::spawn_blocking(move || store.insert_message(&message)).await {
                Ok(Ok(inserted)) => inserted,
                Ok(Err(e)) => {
                    error!(bot = %bot, "Failed to store bot reply: {}", e);
                    continue;
                }
                Err(e) => {
                    error!("spawn_blocking join error: {}", e);
                    continue;
                }
            };

            posted += 1;
            info!(bot = %bot, id = inserted.id, "Bot reply posted");

            if let Err(e) = broadcaster
                .publish(BoardEvent::from_bot(inserted, bot), publish_timeout)
                .await
            {
                warn!("Bot reply not broadcast: {}", e);
            }
        }

        info!(posted, "Poster stopped");
        posted
    }

    #[cfg(test)]
    pub(crate) async fn next(&mut self) -> Option<Outgoing> {
        self.inbound.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast;
    use board_types::events::Origin;

    #[tokio::test]
    async fn stores_and_rebroadcasts_replies() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let (bus, broadcaster) = broadcast::channel(8);
        let mut observer = bus.register("observer", 8).await.unwrap();
        tokio::spawn(broadcaster.run());

        let (handle, poster) = channel(10);
        handle.post("omikuji", NewMessage::new("大吉", "bot")).await.unwrap();
        handle.post("gacha", NewMessage::new("SSレア", "bot")).await.unwrap();
        drop(handle);

        let posted = poster.run(db.clone(), bus.clone(), Duration::from_millis(100)).await;
        assert_eq!(posted, 2);

        let stored = db.list_messages().unwrap();
        let bodies: Vec<&str> = stored.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["大吉", "SSレア"]);

        let first = observer.recv().await.unwrap();
        assert_eq!(first.message, stored[0]);
        assert_eq!(first.origin, Origin::Bot { name: "omikuji".into() });
        assert!(first.is_from_bot());

        let second = observer.recv().await.unwrap();
        assert_eq!(second.origin, Origin::Bot { name: "gacha".into() });
    }

    #[tokio::test]
    async fn failed_insert_is_skipped() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        db.with_conn(|conn| {
            conn.execute_batch(
                "CREATE TRIGGER reject_broken BEFORE INSERT ON message
                 WHEN NEW.body = 'broken'
                 BEGIN SELECT RAISE(ABORT, 'rejected'); END;",
            )
            .map_err(Into::into)
        })
        .unwrap();

        let (bus, broadcaster) = broadcast::channel(8);
        let mut observer = bus.register("observer", 8).await.unwrap();
        tokio::spawn(broadcaster.run());

        let (handle, poster) = channel(10);
        handle.post("talk", NewMessage::new("broken", "bot")).await.unwrap();
        handle.post("gacha", NewMessage::new("レア", "bot")).await.unwrap();
        drop(handle);

        let posted = poster.run(db.clone(), bus.clone(), Duration::from_millis(100)).await;
        assert_eq!(posted, 1);

        let stored = db.list_messages().unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].body, "レア");

        // only the stored reply is broadcast
        let event = observer.recv().await.unwrap();
        assert_eq!(event.message, stored[0]);
        assert_eq!(event.origin, Origin::Bot { name: "gacha".into() });
    }

    #[tokio::test]
    async fn post_fails_once_poster_is_gone() {
        let (handle, poster) = channel(1);
        drop(poster);
        let err = handle.post("helloworld", NewMessage::new("x", "bot")).await.unwrap_err();
        assert!(matches!(err, DispatchError::Closed));
    }
}
