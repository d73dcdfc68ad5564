use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::room::error::RoomError;

use super::deck::{Deck, DeckSource};
use super::{Countdown, ScoreOutcome, TeamRotation, TurnFlow};

/// An emoji string and the phrase it encodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmojiPuzzle {
    pub emoji: String,
    pub answer: String,
}

impl EmojiPuzzle {
    pub fn new(emoji: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            emoji: emoji.into(),
            answer: answer.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmojiSettings {
    pub teams: Vec<String>,
    pub total_rounds: u32,
    pub turn_seconds: u64,
    pub points_correct: i32,
    pub points_skip: i32,
    pub puzzle_sources: Vec<DeckSource<EmojiPuzzle>>,
}

impl Default for EmojiSettings {
    fn default() -> Self {
        Self {
            teams: vec!["Red".to_string(), "Blue".to_string()],
            total_rounds: 2,
            turn_seconds: 90,
            points_correct: 3,
            points_skip: -1,
            puzzle_sources: Vec::new(),
        }
    }
}

/// Same turn shape as charades over a puzzle deck.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmojiState {
    pub rotation: TeamRotation,
    pub current_puzzle: Option<EmojiPuzzle>,
    pub deck: Deck<EmojiPuzzle>,
    pub turn: Countdown,
}

impl EmojiState {
    pub fn begin<R: Rng>(
        cfg: &EmojiSettings,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<Self, RoomError> {
        let mut deck = Deck::new(cfg.puzzle_sources.clone());
        let first = deck
            .draw(rng)
            .ok_or_else(|| RoomError::validation("no enabled puzzle source"))?;
        Ok(Self {
            rotation: TeamRotation::new(cfg.teams.len(), cfg.total_rounds),
            current_puzzle: Some(first),
            deck,
            turn: Countdown::start(now, cfg.turn_seconds),
        })
    }

    pub fn record<R: Rng>(
        &mut self,
        cfg: &EmojiSettings,
        outcome: ScoreOutcome,
        rng: &mut R,
    ) -> Result<TurnFlow, RoomError> {
        let delta = match outcome {
            ScoreOutcome::Correct => cfg.points_correct,
            ScoreOutcome::Skip => cfg.points_skip,
        };
        self.rotation.score(delta);
        self.current_puzzle = Some(
            self.deck
                .draw(rng)
                .ok_or_else(|| RoomError::validation("no enabled puzzle source"))?,
        );
        Ok(TurnFlow::Continue)
    }

    pub fn advance<R: Rng>(
        &mut self,
        cfg: &EmojiSettings,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<TurnFlow, RoomError> {
        if self.rotation.advance() {
            self.current_puzzle = None;
            self.turn = Countdown::idle();
            return Ok(TurnFlow::Finished);
        }
        self.current_puzzle = Some(
            self.deck
                .draw(rng)
                .ok_or_else(|| RoomError::validation("no enabled puzzle source"))?,
        );
        self.turn = Countdown::start(now, cfg.turn_seconds);
        Ok(TurnFlow::Continue)
    }
}
