use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::room::document::RoomDocument;
use crate::room::error::RoomError;
use crate::room::types::{DeckCode, PlayerId, RoomCode};

use super::{RoomStorage, RoomStorageTxn, SharedDeck};

#[derive(Default)]
struct Inner {
    rooms: HashMap<RoomCode, RoomDocument>,
    presence: HashMap<PlayerId, RoomCode>,
    decks: HashMap<DeckCode, SharedDeck>,
}

/// Transaction-local write set, replayed onto `Inner` on commit. Reads scan
/// the pending ops newest-first so a transaction observes its own writes.
enum TxnOp {
    UpsertRoom(RoomDocument),
    DeleteRoom(RoomCode),
    SetPresence(PlayerId, RoomCode),
    ClearPresence(PlayerId),
    InsertDeck(DeckCode, SharedDeck),
}

pub struct InMemoryRoomStorage {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryRoomStorage {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner::default())),
        }
    }

    pub fn room_count(&self) -> usize {
        self.inner.read().rooms.len()
    }
}

impl Default for InMemoryRoomStorage {
    fn default() -> Self {
        Self::new()
    }
}

pub struct InMemoryRoomTxn {
    inner: Arc<RwLock<Inner>>,
    ops: Vec<TxnOp>,
}

#[async_trait]
impl RoomStorage for InMemoryRoomStorage {
    async fn begin(&self) -> Result<Box<dyn RoomStorageTxn + Send>, RoomError> {
        Ok(Box::new(InMemoryRoomTxn {
            inner: Arc::clone(&self.inner),
            ops: Vec::new(),
        }))
    }
}

impl InMemoryRoomTxn {
    fn lookup_room(&self, code: &str) -> Option<RoomDocument> {
        for op in self.ops.iter().rev() {
            match op {
                TxnOp::UpsertRoom(doc) if doc.code == code => return Some(doc.clone()),
                TxnOp::DeleteRoom(deleted) if deleted == code => return None,
                _ => {}
            }
        }
        self.inner.read().rooms.get(code).cloned()
    }

    fn lookup_presence(&self, user: PlayerId) -> Option<RoomCode> {
        for op in self.ops.iter().rev() {
            match op {
                TxnOp::SetPresence(id, code) if *id == user => return Some(code.clone()),
                TxnOp::ClearPresence(id) if *id == user => return None,
                _ => {}
            }
        }
        self.inner.read().presence.get(&user).cloned()
    }

    fn lookup_deck(&self, code: &str) -> Option<SharedDeck> {
        for op in self.ops.iter().rev() {
            if let TxnOp::InsertDeck(deck_code, deck) = op {
                if deck_code == code {
                    return Some(deck.clone());
                }
            }
        }
        self.inner.read().decks.get(code).cloned()
    }
}

#[async_trait]
impl RoomStorageTxn for InMemoryRoomTxn {
    async fn load_room(&mut self, code: &str) -> Result<Option<RoomDocument>, RoomError> {
        Ok(self.lookup_room(code))
    }

    async fn insert_room(&mut self, doc: RoomDocument) -> Result<(), RoomError> {
        if self.lookup_room(&doc.code).is_some() {
            return Err(RoomError::storage("room code already in use"));
        }
        self.ops.push(TxnOp::UpsertRoom(doc));
        Ok(())
    }

    async fn update_room(&mut self, doc: RoomDocument) -> Result<(), RoomError> {
        if self.lookup_room(&doc.code).is_none() {
            return Err(RoomError::NotFound("room"));
        }
        self.ops.push(TxnOp::UpsertRoom(doc));
        Ok(())
    }

    async fn delete_room(&mut self, code: &str) -> Result<(), RoomError> {
        if self.lookup_room(code).is_none() {
            return Err(RoomError::NotFound("room"));
        }
        self.ops.push(TxnOp::DeleteRoom(code.to_string()));
        Ok(())
    }

    async fn load_presence(&mut self, user: PlayerId) -> Result<Option<RoomCode>, RoomError> {
        Ok(self.lookup_presence(user))
    }

    async fn set_presence(&mut self, user: PlayerId, code: RoomCode) -> Result<(), RoomError> {
        self.ops.push(TxnOp::SetPresence(user, code));
        Ok(())
    }

    async fn clear_presence(&mut self, user: PlayerId) -> Result<(), RoomError> {
        self.ops.push(TxnOp::ClearPresence(user));
        Ok(())
    }

    async fn insert_shared_deck(
        &mut self,
        code: DeckCode,
        deck: SharedDeck,
    ) -> Result<(), RoomError> {
        if self.lookup_deck(&code).is_some() {
            return Err(RoomError::storage("deck code already in use"));
        }
        self.ops.push(TxnOp::InsertDeck(code, deck));
        Ok(())
    }

    async fn load_shared_deck(&mut self, code: &str) -> Result<Option<SharedDeck>, RoomError> {
        Ok(self.lookup_deck(code))
    }

    async fn commit(self: Box<Self>) -> Result<(), RoomError> {
        let InMemoryRoomTxn { inner, ops } = *self;
        let mut inner = inner.write();
        for op in ops {
            match op {
                TxnOp::UpsertRoom(doc) => {
                    inner.rooms.insert(doc.code.clone(), doc);
                }
                TxnOp::DeleteRoom(code) => {
                    inner.rooms.remove(&code);
                }
                TxnOp::SetPresence(user, code) => {
                    inner.presence.insert(user, code);
                }
                TxnOp::ClearPresence(user) => {
                    inner.presence.remove(&user);
                }
                TxnOp::InsertDeck(code, deck) => {
                    inner.decks.insert(code, deck);
                }
            }
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) {}
}
