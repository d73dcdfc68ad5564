use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::room::error::RoomError;
use crate::room::types::{Player, PlayerId};

use super::deck::{Deck, DeckSource};
use super::Countdown;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpySettings {
    pub discussion_seconds: u64,
    pub location_sources: Vec<DeckSource<String>>,
}

impl Default for SpySettings {
    fn default() -> Self {
        Self {
            discussion_seconds: 300,
            location_sources: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpyPhase {
    Discussion,
    Revealed,
}

/// What a given player is allowed to know before the reveal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum SpyRole {
    Spy,
    Agent { location: String },
}

/// The assignment is part of the shared document like every other field;
/// clients are expected to read their own role through `role_for` rather
/// than the raw snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpyState {
    pub spy: PlayerId,
    pub location: String,
    pub phase: SpyPhase,
    pub discussion: Countdown,
}

impl SpyState {
    pub fn begin<R: Rng>(
        cfg: &SpySettings,
        players: &[Player],
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<Self, RoomError> {
        if players.len() < 3 {
            return Err(RoomError::validation("the spy game needs at least 3 players"));
        }
        let mut locations = Deck::new(cfg.location_sources.clone());
        let location = locations
            .draw(rng)
            .ok_or_else(|| RoomError::validation("no enabled location source"))?;
        let spy = players[rng.gen_range(0..players.len())].id;
        Ok(Self {
            spy,
            location,
            phase: SpyPhase::Discussion,
            discussion: Countdown::start(now, cfg.discussion_seconds),
        })
    }

    pub fn role_for(&self, player: PlayerId) -> SpyRole {
        if player == self.spy {
            SpyRole::Spy
        } else {
            SpyRole::Agent {
                location: self.location.clone(),
            }
        }
    }

    pub fn reveal(&mut self) {
        self.phase = SpyPhase::Revealed;
        self.discussion = Countdown::idle();
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

    fn settings() -> SpySettings {
        SpySettings {
            location_sources: vec![DeckSource::new(
                "places",
                vec!["airport".into(), "casino".into()],
            )],
            ..SpySettings::default()
        }
    }

    #[test]
    fn exactly_one_spy_is_drawn_from_the_room() {
        let mut rng = StdRng::seed_from_u64(4);
        let ps = players(4);
        let state = SpyState::begin(&settings(), &ps, Utc::now(), &mut rng).unwrap();

        assert!(ps.iter().any(|p| p.id == state.spy));
        let spies = ps
            .iter()
            .filter(|p| matches!(state.role_for(p.id), SpyRole::Spy))
            .count();
        assert_eq!(spies, 1);
    }

    #[test]
    fn agents_see_the_location_the_spy_does_not() {
        let mut rng = StdRng::seed_from_u64(4);
        let ps = players(3);
        let state = SpyState::begin(&settings(), &ps, Utc::now(), &mut rng).unwrap();

        for p in &ps {
            match state.role_for(p.id) {
                SpyRole::Spy => assert_eq!(p.id, state.spy),
                SpyRole::Agent { location } => assert_eq!(location, state.location),
            }
        }
    }

    #[test]
    fn begin_requires_three_players() {
        let mut rng = StdRng::seed_from_u64(4);
        let err = SpyState::begin(&settings(), &players(2), Utc::now(), &mut rng).unwrap_err();
        assert!(matches!(err, RoomError::Validation(_)));
    }

    #[test]
    fn reveal_stops_the_discussion_timer() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut state = SpyState::begin(&settings(), &players(3), Utc::now(), &mut rng).unwrap();
        assert!(state.discussion.is_running());
        state.reveal();
        assert_eq!(state.phase, SpyPhase::Revealed);
        assert!(!state.discussion.is_running());
    }
}
