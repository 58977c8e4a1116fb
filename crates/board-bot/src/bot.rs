use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use board_types::events::BoardEvent;
use board_types::models::NewMessage;

use crate::poster::PosterHandle;
use crate::processor::Processor;

/// A background task that watches new messages and may post a reply.
pub struct Bot {
    name: String,
    processor: Processor,
    inbox: mpsc::Receiver<BoardEvent>,
    poster: PosterHandle,
}

impl Bot {
    pub fn new(
        name: impl Into<String>,
        processor: Processor,
        inbox: mpsc::Receiver<BoardEvent>,
        poster: PosterHandle,
    ) -> Self {
        Self {
            name: name.into(),
            processor,
            inbox,
            poster,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run until `shutdown` fires or the inbox closes. Returns how many replies were posted.
    pub async fn run(mut self, shutdown: CancellationToken) -> u64 {
        info!(bot = %self.name, kind = %self.processor.kind(), "Bot started");
        let mut replies = 0;

        loop {
            let event = tokio::select! {
                _ = shutdown.cancelled() => break,
                event = self.inbox.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
            };

            // A hung API call must not hold up shutdown.
            let reply = tokio::select! {
                _ = shutdown.cancelled() => break,
                reply = self.handle(&event) => reply,
            };

            let Some(reply) = reply else { continue };
            if let Err(e) = self.poster.post(&self.name, reply).await {
                warn!(bot = %self.name, "Reply dropped: {}", e);
                break;
            }
            replies += 1;
        }

        info!(bot = %self.name, replies, "Bot stopped");
        replies
    }

    async fn handle(&mut self, event: &BoardEvent) -> Option<NewMessage> {
        if event.is_from_bot() {
            return None;
        }

        match self.processor.process(&event.message.body).await {
            Ok(Some(reply)) => {
                debug!(bot = %self.name, id = event.message.id, "Trigger matched");
                Some(reply)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(bot = %self.name, id = event.message.id, "Processor failed: {}", e);
                None
            }
        }
    }
}
