use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::room::error::RoomError;
use crate::room::types::{Player, PlayerId};

use super::deck::{Deck, DeckSource};
use super::{Countdown, ScoreOutcome, TurnFlow};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SketchSettings {
    pub total_rounds: u32,
    pub turn_seconds: u64,
    pub points_guesser: i32,
    pub points_drawer: i32,
    pub word_sources: Vec<DeckSource<String>>,
}

impl Default for SketchSettings {
    fn default() -> Self {
        Self {
            total_rounds: 2,
            turn_seconds: 90,
            points_guesser: 3,
            points_drawer: 2,
            word_sources: Vec::new(),
        }
    }
}

/// Drawer rotation over the player list. Stroke data never touches the
/// room document; only the word and rotation state are shared.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SketchState {
    pub order: Vec<PlayerId>,
    pub drawer_index: usize,
    /// 1-based round counter; one round is a full pass over `order`.
    pub round: u32,
    pub scores: BTreeMap<PlayerId, i32>,
    pub current_word: Option<String>,
    pub deck: Deck<String>,
    pub turn: Countdown,
}

impl SketchState {
    pub fn begin<R: Rng>(
        cfg: &SketchSettings,
        players: &[Player],
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<Self, RoomError> {
        if players.len() < 2 {
            return Err(RoomError::validation(
                "sketch and guess needs at least 2 players",
            ));
        }
        let mut deck = Deck::new(cfg.word_sources.clone());
        let first = deck
            .draw(rng)
            .ok_or_else(|| RoomError::validation("no enabled word source"))?;
        Ok(Self {
            order: players.iter().map(|p| p.id).collect(),
            drawer_index: 0,
            round: 1,
            scores: players.iter().map(|p| (p.id, 0)).collect(),
            current_word: Some(first),
            deck,
            turn: Countdown::start(now, cfg.turn_seconds),
        })
    }

    pub fn drawer(&self) -> Option<PlayerId> {
        self.order.get(self.drawer_index).copied()
    }

    /// `Correct` credits the guesser and the drawer and ends the turn;
    /// `Skip` just puts up a new word.
    pub fn record<R: Rng>(
        &mut self,
        cfg: &SketchSettings,
        actor: PlayerId,
        outcome: ScoreOutcome,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<TurnFlow, RoomError> {
        match outcome {
            ScoreOutcome::Correct => {
                let drawer = self
                    .drawer()
                    .ok_or_else(|| RoomError::storage("sketch rotation is empty"))?;
                if actor == drawer {
                    return Err(RoomError::validation("the drawer cannot guess"));
                }
                *self.scores.entry(actor).or_insert(0) += cfg.points_guesser;
                *self.scores.entry(drawer).or_insert(0) += cfg.points_drawer;
                self.advance(cfg, now, rng)
            }
            ScoreOutcome::Skip => {
                self.current_word = Some(
                    self.deck
                        .draw(rng)
                        .ok_or_else(|| RoomError::validation("no enabled word source"))?,
                );
                Ok(TurnFlow::Continue)
            }
        }
    }

    pub fn advance<R: Rng>(
        &mut self,
        cfg: &SketchSettings,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<TurnFlow, RoomError> {
        self.drawer_index += 1;
        if self.drawer_index >= self.order.len() {
            self.drawer_index = 0;
            self.round += 1;
        }
        if self.round > cfg.total_rounds {
            self.current_word = None;
            self.turn = Countdown::idle();
            return Ok(TurnFlow::Finished);
        }
        self.current_word = Some(
            self.deck
                .draw(rng)
                .ok_or_else(|| RoomError::validation("no enabled word source"))?,
        );
        self.turn = Countdown::start(now, cfg.turn_seconds);
        Ok(TurnFlow::Continue)
    }

    pub fn remove_player(&mut self, player: PlayerId) -> TurnFlow {
        if let Some(pos) = self.order.iter().position(|id| *id == player) {
            self.order.remove(pos);
            if self.order.len() < 2 {
                return TurnFlow::Finished;
            }
            if pos < self.drawer_index {
                self.drawer_index -= 1;
            } else {
                self.drawer_index %= self.order.len();
            }
        }
        TurnFlow::Continue
    }
}
