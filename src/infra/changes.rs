use std::time::Duration;

use anyhow::Result;
use sqlx::postgres::PgListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::domain::change::ChangeEvent;
use crate::infra::db::Db;

/// Channel the row-change triggers notify on.
pub const CHANGE_CHANNEL: &str = "ventify_changes";

const RECONNECT_DELAY: Duration = Duration::from_secs(1);

/// In-process fan-out of database change notifications to live views.
#[derive(Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.sender.subscribe()
    }

    /// Returns how many live views received the event.
    pub fn publish(&self, event: ChangeEvent) -> usize {
        // No subscribers is the normal idle state.
        self.sender.send(event).unwrap_or(0)
    }

    /// Relays `LISTEN` notifications into the feed until the runtime stops,
    /// reconnecting after any listener failure.
    pub fn spawn_listener(&self, db: Db) -> JoinHandle<()> {
        let feed = self.clone();
        tokio::spawn(async move {
            loop {
                if let Err(err) = feed.relay(&db).await {
                    tracing::error!(error = ?err, "change listener failed; reconnecting");
                }
                tokio::time::sleep(RECONNECT_DELAY).await;
            }
        })
    }

    async fn relay(&self, db: &Db) -> Result<()> {
        let mut listener = PgListener::connect_with(db.pool()).await?;
        listener.listen(CHANGE_CHANNEL).await?;
        tracing::info!(channel = CHANGE_CHANNEL, "listening for row changes");

        loop {
            let notification = listener.recv().await?;
            match ChangeEvent::from_payload(notification.payload()) {
                Ok(event) => {
                    let delivered = self.publish(event);
                    tracing::debug!(delivered, "relayed row change");
                }
                Err(err) => {
                    tracing::warn!(error = %err, payload = notification.payload(), "ignoring malformed change payload");
                }
            }
        }
    }
}
