use std::sync::Arc;
use std::time::Duration;

use board_bot::broadcast::BroadcasterHandle;
use board_db::Database;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub broadcaster: BroadcasterHandle,
    /// Longest a create request waits for room in the broadcast queue.
    pub publish_timeout: Duration,
}
