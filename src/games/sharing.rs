use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::room::error::RoomError;
use crate::room::types::{Player, PlayerId};

use super::deck::{Deck, DeckSource};
use super::TurnFlow;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SharingSettings {
    pub question_sources: Vec<DeckSource<String>>,
}

/// Conversation game: a speaker rotation over a question deck. No scoring;
/// each question is asked at most once, and exhausting the deck finishes
/// the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SharingState {
    pub order: Vec<PlayerId>,
    pub speaker_index: usize,
    pub current_question: Option<String>,
    pub deck: Deck<String>,
}

impl SharingState {
    pub fn begin<R: Rng>(
        cfg: &SharingSettings,
        players: &[Player],
        rng: &mut R,
    ) -> Result<Self, RoomError> {
        if players.len() < 2 {
            return Err(RoomError::validation("sharing needs at least 2 players"));
        }
        let mut deck = Deck::new(cfg.question_sources.clone());
        deck.prime(rng);
        let first = deck
            .take_queued()
            .ok_or_else(|| RoomError::validation("no enabled question source"))?;
        Ok(Self {
            order: players.iter().map(|p| p.id).collect(),
            speaker_index: 0,
            current_question: Some(first),
            deck,
        })
    }

    pub fn current_speaker(&self) -> Option<PlayerId> {
        self.order.get(self.speaker_index).copied()
    }

    /// Move to the next question and speaker. A reserved player, if any,
    /// is swapped into the next slot first; the swap itself is the only
    /// thing that persists, the reservation is the caller's transient
    /// state.
    pub fn advance(&mut self, reserved: Option<PlayerId>) -> TurnFlow {
        if self.order.is_empty() {
            return TurnFlow::Finished;
        }
        let next = (self.speaker_index + 1) % self.order.len();
        if let Some(player) = reserved {
            if let Some(pos) = self.order.iter().position(|id| *id == player) {
                if pos != self.speaker_index {
                    self.order.swap(pos, next);
                }
            }
        }
        self.speaker_index = next;

        match self.deck.take_queued() {
            Some(question) => {
                self.current_question = Some(question);
                TurnFlow::Continue
            }
            None => {
                self.current_question = None;
                TurnFlow::Finished
            }
        }
    }

    pub fn remove_player(&mut self, player: PlayerId) -> TurnFlow {
        if let Some(pos) = self.order.iter().position(|id| *id == player) {
            self.order.remove(pos);
            if self.order.len() < 2 {
                return TurnFlow::Finished;
            }
            if pos < self.speaker_index {
                self.speaker_index -= 1;
            } else {
                self.speaker_index %= self.order.len();
            }
        }
        TurnFlow::Continue
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use uuid::Uuid;

    use super::*;

    fn players(n: usize) -> Vec<Player> {
        (0..n)
            .map(|i| Player::new(Uuid::new_v4(), format!("p{i}")))
            .collect()
    }

    fn settings(questions: usize) -> SharingSettings {
        SharingSettings {
            question_sources: vec![DeckSource::new(
                "starters",
                (0..questions).map(|i| format!("question {i}")).collect(),
            )],
        }
    }

    #[test]
    fn speakers_rotate_in_join_order_without_a_reservation() {
        let mut rng = StdRng::seed_from_u64(8);
        let ps = players(3);
        let mut state = SharingState::begin(&settings(10), &ps, &mut rng).unwrap();

        assert_eq!(state.current_speaker(), Some(ps[0].id));
        state.advance(None);
        assert_eq!(state.current_speaker(), Some(ps[1].id));
        state.advance(None);
        assert_eq!(state.current_speaker(), Some(ps[2].id));
        state.advance(None);
        assert_eq!(state.current_speaker(), Some(ps[0].id));
    }

    #[test]
    fn reservation_swaps_the_player_into_the_next_slot() {
        let mut rng = StdRng::seed_from_u64(8);
        let ps = players(4);
        let mut state = SharingState::begin(&settings(10), &ps, &mut rng).unwrap();

        // p3 reserves; after the advance they speak instead of p1.
        state.advance(Some(ps[3].id));
        assert_eq!(state.current_speaker(), Some(ps[3].id));
        // p1 was swapped into p3's old slot, not dropped.
        assert!(state.order.contains(&ps[1].id));
    }

    #[test]
    fn reserving_the_current_speaker_changes_nothing() {
        let mut rng = StdRng::seed_from_u64(8);
        let ps = players(3);
        let mut state = SharingState::begin(&settings(10), &ps, &mut rng).unwrap();
        let order_before = state.order.clone();

        state.advance(Some(ps[0].id));
        assert_eq!(state.order, order_before);
    }

    #[test]
    fn exhausting_the_questions_finishes_the_game() {
        let mut rng = StdRng::seed_from_u64(8);
        let ps = players(2);
        let mut state = SharingState::begin(&settings(2), &ps, &mut rng).unwrap();

        assert_eq!(state.advance(None), TurnFlow::Continue);
        assert_eq!(state.advance(None), TurnFlow::Finished);
        assert!(state.current_question.is_none());
    }
}
