use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::watch;

use super::document::RoomDocument;
use super::types::RoomCode;

/// Full-document snapshot handed to every subscriber.
pub type RoomSnapshot = Arc<RoomDocument>;

/// Live fan-out: one watch channel per room.
///
/// Every committed write publishes the whole new document; subscribers
/// re-derive their view from it, there is no per-client diffing. A lagging
/// subscriber only ever sees the latest snapshot, and the last known
/// snapshot stays readable for as long as the room lives. Dropping the
/// channel (room deletion) terminates every subscriber stream.
pub struct RoomRegistry {
    channels: DashMap<RoomCode, watch::Sender<RoomSnapshot>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    /// Publish a committed document, opening the channel on first use.
    pub fn publish(&self, doc: RoomDocument) -> RoomSnapshot {
        let snapshot: RoomSnapshot = Arc::new(doc);
        match self.channels.entry(snapshot.code.clone()) {
            dashmap::mapref::entry::Entry::Occupied(entry) => {
                entry.get().send_replace(Arc::clone(&snapshot));
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                let (tx, _rx) = watch::channel(Arc::clone(&snapshot));
                entry.insert(tx);
            }
        }
        snapshot
    }

    pub fn subscribe(&self, code: &str) -> Option<watch::Receiver<RoomSnapshot>> {
        self.channels.get(code).map(|tx| tx.subscribe())
    }

    /// Latest published snapshot without subscribing.
    pub fn latest(&self, code: &str) -> Option<RoomSnapshot> {
        self.channels.get(code).map(|tx| tx.borrow().clone())
    }

    /// Tear the room's channel down; subscriber streams end.
    pub fn close(&self, code: &str) {
        self.channels.remove(code);
    }

    pub fn live_rooms(&self) -> usize {
        self.channels.len()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use crate::games::{CharadesSettings, GameSettings};
    use crate::room::types::Player;

    use super::*;

    fn sample_room(code: &str) -> RoomDocument {
        RoomDocument::new(
            code.to_string(),
            GameSettings::Charades(CharadesSettings::default()),
            Player::host(Uuid::new_v4(), "host"),
            Utc::now(),
        )
    }

    #[tokio::test]
    async fn subscribers_see_every_published_document() {
        let registry = RoomRegistry::new();
        registry.publish(sample_room("AAAAAA"));

        let mut rx = registry.subscribe("AAAAAA").unwrap();
        assert_eq!(rx.borrow().version, 1);

        let mut updated = sample_room("AAAAAA");
        updated.version = 2;
        registry.publish(updated);

        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().version, 2);
    }

    #[tokio::test]
    async fn close_ends_subscriber_streams() {
        let registry = RoomRegistry::new();
        registry.publish(sample_room("AAAAAA"));
        let mut rx = registry.subscribe("AAAAAA").unwrap();

        registry.close("AAAAAA");
        assert!(rx.changed().await.is_err());
        assert!(registry.subscribe("AAAAAA").is_none());
    }

    #[test]
    fn latest_returns_the_newest_snapshot() {
        let registry = RoomRegistry::new();
        assert!(registry.latest("AAAAAA").is_none());

        registry.publish(sample_room("AAAAAA"));
        let mut updated = sample_room("AAAAAA");
        updated.version = 9;
        registry.publish(updated);

        assert_eq!(registry.latest("AAAAAA").unwrap().version, 9);
    }
}
