use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::room::error::RoomError;

use super::deck::{Deck, DeckSource};
use super::{Countdown, ScoreOutcome, TeamRotation, TurnFlow};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharadesSettings {
    pub teams: Vec<String>,
    pub total_rounds: u32,
    pub turn_seconds: u64,
    pub points_correct: i32,
    /// Added on skip; configured negative by default.
    pub points_skip: i32,
    pub word_sources: Vec<DeckSource<String>>,
}

impl Default for CharadesSettings {
    fn default() -> Self {
        Self {
            teams: vec!["Red".to_string(), "Blue".to_string()],
            total_rounds: 2,
            turn_seconds: 60,
            points_correct: 3,
            points_skip: -1,
            word_sources: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharadesState {
    pub rotation: TeamRotation,
    pub current_word: Option<String>,
    pub deck: Deck<String>,
    pub turn: Countdown,
}

impl CharadesState {
    pub fn begin<R: Rng>(
        cfg: &CharadesSettings,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<Self, RoomError> {
        let mut deck = Deck::new(cfg.word_sources.clone());
        let first = deck
            .draw(rng)
            .ok_or_else(|| RoomError::validation("no enabled word source"))?;
        Ok(Self {
            rotation: TeamRotation::new(cfg.teams.len(), cfg.total_rounds),
            current_word: Some(first),
            deck,
            turn: Countdown::start(now, cfg.turn_seconds),
        })
    }

    /// Score the acting team and put up the next word.
    pub fn record<R: Rng>(
        &mut self,
        cfg: &CharadesSettings,
        outcome: ScoreOutcome,
        rng: &mut R,
    ) -> Result<TurnFlow, RoomError> {
        let delta = match outcome {
            ScoreOutcome::Correct => cfg.points_correct,
            ScoreOutcome::Skip => cfg.points_skip,
        };
        self.rotation.score(delta);
        self.current_word = Some(
            self.deck
                .draw(rng)
                .ok_or_else(|| RoomError::validation("no enabled word source"))?,
        );
        Ok(TurnFlow::Continue)
    }

    /// Hand the turn to the next team ("switch team").
    pub fn advance<R: Rng>(
        &mut self,
        cfg: &CharadesSettings,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<TurnFlow, RoomError> {
        if self.rotation.advance() {
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
}
