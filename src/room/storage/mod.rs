use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::document::RoomDocument;
use super::error::RoomError;
use super::types::{DeckCode, PlayerId, RoomCode};

/// A word/question list published under an opaque code, importable into
/// any compatible room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedDeck {
    pub name: String,
    pub words: Vec<String>,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait RoomStorage: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn RoomStorageTxn + Send>, RoomError>;
}

/// One atomic read-modify-write scope. Every service operation runs inside
/// exactly one transaction; reads observe the transaction's own pending
/// writes.
#[async_trait]
pub trait RoomStorageTxn: Send {
    async fn load_room(&mut self, code: &str) -> Result<Option<RoomDocument>, RoomError>;

    /// Fails if the code is already taken.
    async fn insert_room(&mut self, doc: RoomDocument) -> Result<(), RoomError>;

    /// Fails if the room does not exist.
    async fn update_room(&mut self, doc: RoomDocument) -> Result<(), RoomError>;

    async fn delete_room(&mut self, code: &str) -> Result<(), RoomError>;

    /// "Which room is this user in" bookkeeping, used to evict a user from
    /// a stale room when they join elsewhere.
    async fn load_presence(&mut self, user: PlayerId) -> Result<Option<RoomCode>, RoomError>;

    async fn set_presence(&mut self, user: PlayerId, code: RoomCode) -> Result<(), RoomError>;

    async fn clear_presence(&mut self, user: PlayerId) -> Result<(), RoomError>;

    async fn insert_shared_deck(
        &mut self,
        code: DeckCode,
        deck: SharedDeck,
    ) -> Result<(), RoomError>;

    async fn load_shared_deck(&mut self, code: &str) -> Result<Option<SharedDeck>, RoomError>;

    async fn commit(self: Box<Self>) -> Result<(), RoomError>;
    async fn rollback(self: Box<Self>);
}

pub mod in_memory;

pub use in_memory::InMemoryRoomStorage;
