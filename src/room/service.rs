use std::sync::Arc;

use dashmap::DashMap;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::watch;
use tracing::info;

use crate::clock::Clock;
use crate::games::{
    DeckSource, GameKind, GameSettings, GameState, ScoreOutcome, SpyRole, TurnFlow,
};

use super::code::{generate_deck_code, generate_room_code, looks_like_room_code};
use super::document::RoomDocument;
use super::error::RoomError;
use super::registry::{RoomRegistry, RoomSnapshot};
use super::storage::{RoomStorage, RoomStorageTxn, SharedDeck};
use super::types::{DeckCode, Player, PlayerId, RoomCode, RoomStatus};
use super::validation::{
    ensure_host, ensure_member, validate_deck_words, validate_player_name, validate_settings,
};

const LOG_TARGET: &str = "room::service";
const CODE_ATTEMPTS: usize = 16;

/// Registry work that must only happen once the transaction has committed.
enum SideEffect {
    Publish(RoomDocument),
    Close(RoomCode),
}

/// The one write path to room state.
///
/// Every operation is an atomic read-modify-write against the storage
/// transaction, authorized server-side, and fanned out to subscribers only
/// after commit. Clients never merge raw fields.
pub struct RoomService {
    storage: Arc<dyn RoomStorage>,
    registry: Arc<RoomRegistry>,
    clock: Arc<dyn Clock>,
    /// Transient reserve-next-speaker intents for sharing rooms. Never
    /// persisted and never part of a snapshot; lost on restart by design.
    reservations: DashMap<RoomCode, PlayerId>,
}

impl RoomService {
    pub fn new(
        storage: Arc<dyn RoomStorage>,
        registry: Arc<RoomRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            storage,
            registry,
            clock,
            reservations: DashMap::new(),
        }
    }

    pub fn subscribe(&self, code: &str) -> Option<watch::Receiver<RoomSnapshot>> {
        self.registry.subscribe(code)
    }

    // ---- Lifecycle -------------------------------------------------------

    pub async fn create_room(
        &self,
        user: PlayerId,
        name: &str,
        settings: GameSettings,
    ) -> Result<RoomSnapshot, RoomError> {
        validate_player_name(name)?;
        validate_settings(&settings)?;
        let now = self.clock.now();
        let mut rng = StdRng::from_entropy();

        let mut txn = self.storage.begin().await?;
        let result = async {
            let mut code = None;
            for _ in 0..CODE_ATTEMPTS {
                let candidate = generate_room_code(&mut rng);
                if txn.load_room(&candidate).await?.is_none() {
                    code = Some(candidate);
                    break;
                }
            }
            let code =
                code.ok_or_else(|| RoomError::storage("could not allocate an unused room code"))?;

            let effects = self
                .evict_from_current(txn.as_mut(), user, &code, now)
                .await?;

            let doc = RoomDocument::new(
                code.clone(),
                settings,
                Player::host(user, name.trim()),
                now,
            );
            txn.insert_room(doc.clone()).await?;
            txn.set_presence(user, code).await?;
            Ok((doc, effects))
        }
        .await;

        match result {
            Ok((doc, effects)) => {
                txn.commit().await?;
                self.apply_effects(effects);
                info!(
                    target = LOG_TARGET,
                    code = %doc.code,
                    game = ?doc.game(),
                    "room created"
                );
                Ok(self.registry.publish(doc))
            }
            Err(err) => {
                txn.rollback().await;
                Err(err)
            }
        }
    }

    pub async fn join_room(
        &self,
        code: &str,
        user: PlayerId,
        name: &str,
    ) -> Result<RoomSnapshot, RoomError> {
        validate_player_name(name)?;
        if !looks_like_room_code(code) {
            return Err(RoomError::validation("that does not look like a room code"));
        }
        let now = self.clock.now();

        let mut txn = self.storage.begin().await?;
        let result = async {
            let mut doc = txn
                .load_room(code)
                .await?
                .ok_or(RoomError::NotFound("room"))?;

            // Rejoining the room you are already in is a no-op reconnect.
            if doc.is_member(user) {
                return Ok((doc, Vec::new(), false));
            }

            ensure_waiting(&doc)?;
            let effects = self
                .evict_from_current(txn.as_mut(), user, code, now)
                .await?;

            doc.add_player(Player::new(user, name.trim()))?;
            txn.set_presence(user, code.to_string()).await?;
            doc.touch(now);
            txn.update_room(doc.clone()).await?;
            Ok((doc, effects, true))
        }
        .await;

        match result {
            Ok((doc, effects, wrote)) => {
                txn.commit().await?;
                self.apply_effects(effects);
                if wrote {
                    Ok(self.registry.publish(doc))
                } else {
                    Ok(Arc::new(doc))
                }
            }
            Err(err) => {
                txn.rollback().await;
                Err(err)
            }
        }
    }

    /// Remove a player; promotes a new host when needed and deletes the
    /// room (closing its channel) when the last player leaves.
    pub async fn leave_room(
        &self,
        code: &str,
        user: PlayerId,
    ) -> Result<Option<RoomSnapshot>, RoomError> {
        let now = self.clock.now();

        let mut txn = self.storage.begin().await?;
        let result = async {
            let mut doc = txn
                .load_room(code)
                .await?
                .ok_or(RoomError::NotFound("room"))?;
            let removal = doc.remove_player(user)?;
            txn.clear_presence(user).await?;

            if removal.room_empty {
                txn.delete_room(code).await?;
                return Ok(None);
            }

            if doc.status == RoomStatus::Playing {
                if let Some(state) = doc.state.as_mut() {
                    if state.handle_leave(user) == TurnFlow::Finished {
                        doc.transition(RoomStatus::Finished)?;
                    }
                }
            }
            doc.touch(now);
            txn.update_room(doc.clone()).await?;
            Ok(Some(doc))
        }
        .await;

        match result {
            Ok(None) => {
                txn.commit().await?;
                self.registry.close(code);
                self.reservations.remove(code);
                info!(target = LOG_TARGET, %code, "room deleted after last leave");
                Ok(None)
            }
            Ok(Some(doc)) => {
                txn.commit().await?;
                Ok(Some(self.registry.publish(doc)))
            }
            Err(err) => {
                txn.rollback().await;
                Err(err)
            }
        }
    }

    // ---- Game flow -------------------------------------------------------

    pub async fn start_game(&self, code: &str, actor: PlayerId) -> Result<RoomSnapshot, RoomError> {
        let now = self.clock.now();
        let mut rng = StdRng::from_entropy();
        let snapshot = self
            .mutate(code, |doc| {
                ensure_host(doc, actor)?;
                if doc.players.len() < doc.settings.min_players() {
                    return Err(RoomError::validation(format!(
                        "this game needs at least {} players",
                        doc.settings.min_players()
                    )));
                }
                doc.transition(RoomStatus::Playing)?;
                assign_missing_teams(doc);
                doc.state = Some(GameState::start(&doc.settings, &doc.players, now, &mut rng)?);
                Ok(())
            })
            .await?;
        info!(target = LOG_TARGET, %code, game = ?snapshot.game(), "game started");
        Ok(snapshot)
    }

    pub async fn advance_turn(
        &self,
        code: &str,
        actor: PlayerId,
    ) -> Result<RoomSnapshot, RoomError> {
        let now = self.clock.now();
        let mut rng = StdRng::from_entropy();
        let reserved = self.reservations.remove(code).map(|(_, player)| player);
        self.mutate(code, |doc| {
            ensure_member(doc, actor)?;
            ensure_playing(doc)?;
            let settings = doc.settings.clone();
            let state = doc
                .state
                .as_mut()
                .ok_or_else(|| RoomError::storage("playing room has no game state"))?;
            if state.advance(&settings, now, reserved, &mut rng)? == TurnFlow::Finished {
                doc.transition(RoomStatus::Finished)?;
            }
            Ok(())
        })
        .await
    }

    pub async fn record_score(
        &self,
        code: &str,
        actor: PlayerId,
        outcome: ScoreOutcome,
    ) -> Result<RoomSnapshot, RoomError> {
        let now = self.clock.now();
        let mut rng = StdRng::from_entropy();
        self.mutate(code, |doc| {
            ensure_member(doc, actor)?;
            ensure_playing(doc)?;
            let settings = doc.settings.clone();
            let state = doc
                .state
                .as_mut()
                .ok_or_else(|| RoomError::storage("playing room has no game state"))?;
            if state.record_score(&settings, actor, outcome, now, &mut rng)? == TurnFlow::Finished
            {
                doc.transition(RoomStatus::Finished)?;
            }
            Ok(())
        })
        .await
    }

    pub async fn flip_card(
        &self,
        code: &str,
        actor: PlayerId,
        card: usize,
    ) -> Result<RoomSnapshot, RoomError> {
        self.mutate(code, |doc| {
            ensure_member(doc, actor)?;
            ensure_playing(doc)?;
            let state = doc
                .state
                .as_mut()
                .ok_or_else(|| RoomError::storage("playing room has no game state"))?;
            if state.flip_card(actor, card)? == TurnFlow::Finished {
                doc.transition(RoomStatus::Finished)?;
            }
            Ok(())
        })
        .await
    }

    pub async fn reveal_spy(&self, code: &str, actor: PlayerId) -> Result<RoomSnapshot, RoomError> {
        self.mutate(code, |doc| {
            ensure_host(doc, actor)?;
            ensure_playing(doc)?;
            let state = doc
                .state
                .as_mut()
                .ok_or_else(|| RoomError::storage("playing room has no game state"))?;
            if state.reveal()? == TurnFlow::Finished {
                doc.transition(RoomStatus::Finished)?;
            }
            Ok(())
        })
        .await
    }

    /// Record a transient "I speak next" intent for a sharing room. This
    /// deliberately writes nothing to storage: the reservation is local to
    /// this process and lost on restart, matching the original behavior;
    /// only the order swap applied on the next advance persists.
    pub async fn reserve_next_speaker(
        &self,
        code: &str,
        actor: PlayerId,
    ) -> Result<(), RoomError> {
        let doc = self.snapshot(code).await?;
        ensure_member(&doc, actor)?;
        if doc.game() != GameKind::Sharing {
            return Err(RoomError::validation(
                "reservations only apply to the sharing game",
            ));
        }
        ensure_playing(&doc)?;
        self.reservations.insert(code.to_string(), actor);
        Ok(())
    }

    pub async fn choose_team(
        &self,
        code: &str,
        actor: PlayerId,
        team: usize,
    ) -> Result<RoomSnapshot, RoomError> {
        self.mutate(code, |doc| {
            ensure_member(doc, actor)?;
            ensure_waiting(doc)?;
            let teams = doc.settings.teams().len();
            if teams == 0 {
                return Err(RoomError::validation("this game has no teams"));
            }
            if team >= teams {
                return Err(RoomError::validation("no such team"));
            }
            if let Some(player) = doc.players.iter_mut().find(|p| p.id == actor) {
                player.team = Some(team);
            }
            Ok(())
        })
        .await
    }

    pub async fn pause(&self, code: &str, actor: PlayerId) -> Result<RoomSnapshot, RoomError> {
        let now = self.clock.now();
        self.mutate(code, |doc| {
            ensure_host(doc, actor)?;
            ensure_playing(doc)?;
            let state = doc
                .state
                .as_mut()
                .ok_or_else(|| RoomError::storage("playing room has no game state"))?;
            state.pause(now)
        })
        .await
    }

    pub async fn resume(&self, code: &str, actor: PlayerId) -> Result<RoomSnapshot, RoomError> {
        let now = self.clock.now();
        self.mutate(code, |doc| {
            ensure_host(doc, actor)?;
            ensure_playing(doc)?;
            let state = doc
                .state
                .as_mut()
                .ok_or_else(|| RoomError::storage("playing room has no game state"))?;
            state.resume(now)
        })
        .await
    }

    pub async fn update_settings(
        &self,
        code: &str,
        actor: PlayerId,
        settings: GameSettings,
    ) -> Result<RoomSnapshot, RoomError> {
        validate_settings(&settings)?;
        self.mutate(code, |doc| {
            ensure_host(doc, actor)?;
            ensure_waiting(doc)?;
            if settings.kind() != doc.settings.kind() {
                return Err(RoomError::validation("cannot change the game type"));
            }
            doc.settings = settings;
            Ok(())
        })
        .await
    }

    /// Finished -> Waiting for a replay: players and settings stay, game
    /// state is cleared.
    pub async fn reset_room(&self, code: &str, actor: PlayerId) -> Result<RoomSnapshot, RoomError> {
        self.mutate(code, |doc| {
            ensure_host(doc, actor)?;
            doc.transition(RoomStatus::Waiting)?;
            doc.state = None;
            Ok(())
        })
        .await
    }

    // ---- Decks -----------------------------------------------------------

    pub async fn share_deck(
        &self,
        name: &str,
        words: Vec<String>,
    ) -> Result<DeckCode, RoomError> {
        validate_deck_words(&words)?;
        if name.trim().is_empty() {
            return Err(RoomError::validation("a deck name is required"));
        }
        let now = self.clock.now();
        let mut rng = StdRng::from_entropy();

        let mut txn = self.storage.begin().await?;
        let result = async {
            let mut code = None;
            for _ in 0..CODE_ATTEMPTS {
                let candidate = generate_deck_code(&mut rng);
                if txn.load_shared_deck(&candidate).await?.is_none() {
                    code = Some(candidate);
                    break;
                }
            }
            let code =
                code.ok_or_else(|| RoomError::storage("could not allocate an unused deck code"))?;
            txn.insert_shared_deck(
                code.clone(),
                SharedDeck {
                    name: name.trim().to_string(),
                    words,
                    created_at: now,
                },
            )
            .await?;
            Ok(code)
        }
        .await;

        match result {
            Ok(code) => {
                txn.commit().await?;
                Ok(code)
            }
            Err(err) => {
                txn.rollback().await;
                Err(err)
            }
        }
    }

    /// Pull a shared deck into the room's settings as a new enabled source.
    pub async fn import_deck(
        &self,
        code: &str,
        actor: PlayerId,
        deck_code: &str,
    ) -> Result<RoomSnapshot, RoomError> {
        let now = self.clock.now();

        let mut txn = self.storage.begin().await?;
        let result = async {
            let shared = txn
                .load_shared_deck(deck_code)
                .await?
                .ok_or(RoomError::NotFound("deck"))?;
            let mut doc = txn
                .load_room(code)
                .await?
                .ok_or(RoomError::NotFound("room"))?;
            ensure_host(&doc, actor)?;
            ensure_waiting(&doc)?;

            let source = DeckSource::new(shared.name, shared.words);
            match &mut doc.settings {
                GameSettings::Charades(cfg) => cfg.word_sources.push(source),
                GameSettings::SketchGuess(cfg) => cfg.word_sources.push(source),
                GameSettings::Sharing(cfg) => cfg.question_sources.push(source),
                GameSettings::Spy(cfg) => cfg.location_sources.push(source),
                GameSettings::EmojiGuess(_) | GameSettings::MemoryMatch(_) => {
                    return Err(RoomError::validation(
                        "this game cannot import word decks",
                    ));
                }
            }
            doc.touch(now);
            txn.update_room(doc.clone()).await?;
            Ok(doc)
        }
        .await;

        match result {
            Ok(doc) => {
                txn.commit().await?;
                Ok(self.registry.publish(doc))
            }
            Err(err) => {
                txn.rollback().await;
                Err(err)
            }
        }
    }

    // ---- Reads -----------------------------------------------------------

    pub async fn snapshot(&self, code: &str) -> Result<RoomSnapshot, RoomError> {
        let mut txn = self.storage.begin().await?;
        let doc = txn.load_room(code).await;
        txn.rollback().await;
        doc?.map(Arc::new).ok_or(RoomError::NotFound("room"))
    }

    /// Per-player role lookup for the spy game, so clients need not dig
    /// secrets out of the raw snapshot.
    pub async fn role_view(&self, code: &str, user: PlayerId) -> Result<SpyRole, RoomError> {
        let doc = self.snapshot(code).await?;
        ensure_member(&doc, user)?;
        match &doc.state {
            Some(GameState::Spy(state)) => Ok(state.role_for(user)),
            Some(_) => Err(RoomError::validation("roles only apply to the spy game")),
            None => Err(RoomError::validation("the game has not started")),
        }
    }

    // ---- Internals -------------------------------------------------------

    /// Shared transaction envelope for single-room mutations.
    async fn mutate<F>(&self, code: &str, apply: F) -> Result<RoomSnapshot, RoomError>
    where
        F: FnOnce(&mut RoomDocument) -> Result<(), RoomError> + Send,
    {
        let now = self.clock.now();
        let mut txn = self.storage.begin().await?;
        let result = async {
            let mut doc = txn
                .load_room(code)
                .await?
                .ok_or(RoomError::NotFound("room"))?;
            apply(&mut doc)?;
            doc.touch(now);
            txn.update_room(doc.clone()).await?;
            Ok(doc)
        }
        .await;

        match result {
            Ok(doc) => {
                txn.commit().await?;
                Ok(self.registry.publish(doc))
            }
            Err(err) => {
                txn.rollback().await;
                Err(err)
            }
        }
    }

    /// If presence says the user is in another room, take them out of it
    /// inside the caller's transaction so "leave old, join new" cannot be
    /// torn apart by a failure between the steps.
    async fn evict_from_current(
        &self,
        txn: &mut dyn RoomStorageTxn,
        user: PlayerId,
        joining_code: &str,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<Vec<SideEffect>, RoomError> {
        let Some(old_code) = txn.load_presence(user).await? else {
            return Ok(Vec::new());
        };
        if old_code == joining_code {
            return Ok(Vec::new());
        }

        let mut effects = Vec::new();
        if let Some(mut old) = txn.load_room(&old_code).await? {
            if old.is_member(user) {
                let removal = old.remove_player(user)?;
                if removal.room_empty {
                    txn.delete_room(&old_code).await?;
                    effects.push(SideEffect::Close(old_code.clone()));
                } else {
                    if old.status == RoomStatus::Playing {
                        if let Some(state) = old.state.as_mut() {
                            if state.handle_leave(user) == TurnFlow::Finished {
                                old.transition(RoomStatus::Finished)?;
                            }
                        }
                    }
                    old.touch(now);
                    txn.update_room(old.clone()).await?;
                    effects.push(SideEffect::Publish(old));
                }
            }
        }
        txn.clear_presence(user).await?;
        Ok(effects)
    }

    fn apply_effects(&self, effects: Vec<SideEffect>) {
        for effect in effects {
            match effect {
                SideEffect::Publish(doc) => {
                    self.registry.publish(doc);
                }
                SideEffect::Close(code) => {
                    self.registry.close(&code);
                    self.reservations.remove(&code);
                    info!(target = LOG_TARGET, %code, "room deleted after eviction");
                }
            }
        }
    }
}

fn ensure_playing(doc: &RoomDocument) -> Result<(), RoomError> {
    if doc.status == RoomStatus::Playing {
        Ok(())
    } else {
        Err(RoomError::validation("the game is not running"))
    }
}

fn ensure_waiting(doc: &RoomDocument) -> Result<(), RoomError> {
    if doc.status == RoomStatus::Waiting {
        Ok(())
    } else {
        Err(RoomError::validation("the game has already started"))
    }
}

/// Round-robin team assignment for anyone who never picked one.
fn assign_missing_teams(doc: &mut RoomDocument) {
    let teams = doc.settings.teams().len();
    if teams == 0 {
        return;
    }
    let mut next = 0;
    for player in doc.players.iter_mut() {
        match player.team {
            Some(team) if team < teams => {}
            _ => {
                player.team = Some(next % teams);
                next += 1;
            }
        }
    }
}
