use std::collections::BTreeMap;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::room::error::RoomError;
use crate::room::types::{Player, PlayerId};

use super::TurnFlow;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySettings {
    /// Number of face pairs on the board.
    pub pairs: usize,
}

impl Default for MemorySettings {
    fn default() -> Self {
        Self { pairs: 8 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryCard {
    pub face: u8,
    pub matched_by: Option<PlayerId>,
}

/// Outcome of the previous completed flip pair, kept so late subscribers
/// can render the resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastFlip {
    pub cards: [usize; 2],
    pub matched: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryState {
    pub cards: Vec<MemoryCard>,
    pub turn_order: Vec<PlayerId>,
    pub turn_index: usize,
    /// Indices face-up in the current turn (0 or 1 entries).
    pub flipped: Vec<usize>,
    pub last_flip: Option<LastFlip>,
    pub scores: BTreeMap<PlayerId, i32>,
}

impl MemoryState {
    pub fn begin<R: Rng>(
        cfg: &MemorySettings,
        players: &[Player],
        rng: &mut R,
    ) -> Result<Self, RoomError> {
        if players.len() < 2 {
            return Err(RoomError::validation("memory match needs at least 2 players"));
        }
        let mut cards: Vec<MemoryCard> = (0..cfg.pairs)
            .flat_map(|face| {
                let face = face as u8;
                [
                    MemoryCard {
                        face,
                        matched_by: None,
                    },
                    MemoryCard {
                        face,
                        matched_by: None,
                    },
                ]
            })
            .collect();
        cards.shuffle(rng);

        Ok(Self {
            cards,
            turn_order: players.iter().map(|p| p.id).collect(),
            turn_index: 0,
            flipped: Vec::new(),
            last_flip: None,
            scores: players.iter().map(|p| (p.id, 0)).collect(),
        })
    }

    pub fn current_player(&self) -> Option<PlayerId> {
        self.turn_order.get(self.turn_index).copied()
    }

    /// Flip one card. A completed pair resolves immediately: a match scores
    /// the flipper and keeps their turn, a mismatch flips back and passes
    /// the turn.
    pub fn flip(&mut self, actor: PlayerId, index: usize) -> Result<TurnFlow, RoomError> {
        if self.current_player() != Some(actor) {
            return Err(RoomError::Forbidden("it is not your turn"));
        }
        let card = self
            .cards
            .get(index)
            .ok_or_else(|| RoomError::validation("card index out of range"))?;
        if card.matched_by.is_some() {
            return Err(RoomError::validation("card is already matched"));
        }
        if self.flipped.contains(&index) {
            return Err(RoomError::validation("card is already face up"));
        }

        self.flipped.push(index);
        if self.flipped.len() < 2 {
            return Ok(TurnFlow::Continue);
        }

        let (first, second) = (self.flipped[0], self.flipped[1]);
        let matched = self.cards[first].face == self.cards[second].face;
        self.last_flip = Some(LastFlip {
            cards: [first, second],
            matched,
        });
        self.flipped.clear();

        if matched {
            self.cards[first].matched_by = Some(actor);
            self.cards[second].matched_by = Some(actor);
            *self.scores.entry(actor).or_insert(0) += 1;
            if self.cards.iter().all(|c| c.matched_by.is_some()) {
                return Ok(TurnFlow::Finished);
            }
            // Matching player keeps the turn.
            return Ok(TurnFlow::Continue);
        }

        self.pass_turn();
        Ok(TurnFlow::Continue)
    }

    fn pass_turn(&mut self) {
        if !self.turn_order.is_empty() {
            self.turn_index = (self.turn_index + 1) % self.turn_order.len();
        }
    }

    pub fn remove_player(&mut self, player: PlayerId) -> TurnFlow {
        if let Some(pos) = self.turn_order.iter().position(|id| *id == player) {
            let was_current = pos == self.turn_index;
            self.turn_order.remove(pos);
            if self.turn_order.is_empty() {
                return TurnFlow::Finished;
            }
            if pos < self.turn_index {
                self.turn_index -= 1;
            } else if was_current {
                self.turn_index %= self.turn_order.len();
                self.flipped.clear();
            } else {
                self.turn_index %= self.turn_order.len();
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

    fn pair_indices(state: &MemoryState, face: u8) -> (usize, usize) {
        let hits: Vec<usize> = state
            .cards
            .iter()
            .enumerate()
            .filter(|(_, c)| c.face == face)
            .map(|(i, _)| i)
            .collect();
        (hits[0], hits[1])
    }

    #[test]
    fn match_scores_and_keeps_the_turn() {
        let mut rng = StdRng::seed_from_u64(11);
        let ps = players(2);
        let mut state = MemoryState::begin(&MemorySettings { pairs: 2 }, &ps, &mut rng).unwrap();
        let actor = state.current_player().unwrap();

        let (a, b) = pair_indices(&state, 0);
        state.flip(actor, a).unwrap();
        state.flip(actor, b).unwrap();

        assert_eq!(state.scores[&actor], 1);
        assert_eq!(state.current_player(), Some(actor));
        assert!(state.last_flip.unwrap().matched);
    }

    #[test]
    fn mismatch_passes_the_turn() {
        let mut rng = StdRng::seed_from_u64(11);
        let ps = players(2);
        let mut state = MemoryState::begin(&MemorySettings { pairs: 2 }, &ps, &mut rng).unwrap();
        let actor = state.current_player().unwrap();

        let (a, _) = pair_indices(&state, 0);
        let (b, _) = pair_indices(&state, 1);
        state.flip(actor, a).unwrap();
        state.flip(actor, b).unwrap();

        assert_ne!(state.current_player(), Some(actor));
        assert_eq!(state.scores[&actor], 0);
        assert!(state.flipped.is_empty());
    }

    #[test]
    fn matching_every_pair_finishes_the_game() {
        let mut rng = StdRng::seed_from_u64(11);
        let ps = players(2);
        let mut state = MemoryState::begin(&MemorySettings { pairs: 2 }, &ps, &mut rng).unwrap();
        let actor = state.current_player().unwrap();

        let (a, b) = pair_indices(&state, 0);
        assert_eq!(state.flip(actor, a).unwrap(), TurnFlow::Continue);
        assert_eq!(state.flip(actor, b).unwrap(), TurnFlow::Continue);
        let (c, d) = pair_indices(&state, 1);
        assert_eq!(state.flip(actor, c).unwrap(), TurnFlow::Continue);
        assert_eq!(state.flip(actor, d).unwrap(), TurnFlow::Finished);
    }

    #[test]
    fn out_of_turn_flip_is_forbidden() {
        let mut rng = StdRng::seed_from_u64(11);
        let ps = players(2);
        let mut state = MemoryState::begin(&MemorySettings::default(), &ps, &mut rng).unwrap();
        let waiting = state.turn_order[1];
        assert!(matches!(
            state.flip(waiting, 0).unwrap_err(),
            RoomError::Forbidden(_)
        ));
    }

    #[test]
    fn removing_the_current_player_moves_the_turn_on() {
        let mut rng = StdRng::seed_from_u64(11);
        let ps = players(3);
        let mut state = MemoryState::begin(&MemorySettings::default(), &ps, &mut rng).unwrap();
        let current = state.current_player().unwrap();
        let next = state.turn_order[1];

        assert_eq!(state.remove_player(current), TurnFlow::Continue);
        assert_eq!(state.current_player(), Some(next));
        assert_eq!(state.turn_order.len(), 2);
    }
}
