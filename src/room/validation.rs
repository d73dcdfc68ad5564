use crate::games::GameSettings;

use super::document::RoomDocument;
use super::error::RoomError;
use super::types::PlayerId;

const MAX_NAME_LEN: usize = 32;
const MAX_DECK_WORDS: usize = 1_000;
const MIN_TURN_SECONDS: u64 = 10;
const MAX_TURN_SECONDS: u64 = 600;

pub fn validate_player_name(name: &str) -> Result<(), RoomError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(RoomError::validation("a display name is required"));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(RoomError::validation("display name is too long"));
    }
    Ok(())
}

pub fn validate_settings(settings: &GameSettings) -> Result<(), RoomError> {
    match settings {
        GameSettings::Charades(cfg) => {
            ensure_teams(&cfg.teams)?;
            ensure_rounds(cfg.total_rounds)?;
            ensure_turn_seconds(cfg.turn_seconds)?;
        }
        GameSettings::EmojiGuess(cfg) => {
            ensure_teams(&cfg.teams)?;
            ensure_rounds(cfg.total_rounds)?;
            ensure_turn_seconds(cfg.turn_seconds)?;
        }
        GameSettings::MemoryMatch(cfg) => {
            if cfg.pairs < 2 || cfg.pairs > 32 {
                return Err(RoomError::validation(
                    "memory match needs between 2 and 32 pairs",
                ));
            }
        }
        GameSettings::SketchGuess(cfg) => {
            ensure_rounds(cfg.total_rounds)?;
            ensure_turn_seconds(cfg.turn_seconds)?;
        }
        GameSettings::Spy(cfg) => {
            ensure_turn_seconds(cfg.discussion_seconds)?;
        }
        GameSettings::Sharing(_) => {}
    }
    Ok(())
}

pub fn validate_deck_words(words: &[String]) -> Result<(), RoomError> {
    if words.is_empty() {
        return Err(RoomError::validation("a deck needs at least one entry"));
    }
    if words.len() > MAX_DECK_WORDS {
        return Err(RoomError::validation("deck has too many entries"));
    }
    if words.iter().any(|w| w.trim().is_empty()) {
        return Err(RoomError::validation("deck entries cannot be blank"));
    }
    Ok(())
}

pub fn ensure_member(doc: &RoomDocument, actor: PlayerId) -> Result<(), RoomError> {
    if doc.is_member(actor) {
        Ok(())
    } else {
        Err(RoomError::Forbidden("you are not in this room"))
    }
}

pub fn ensure_host(doc: &RoomDocument, actor: PlayerId) -> Result<(), RoomError> {
    ensure_member(doc, actor)?;
    if doc.is_host(actor) {
        Ok(())
    } else {
        Err(RoomError::Forbidden("only the host can do that"))
    }
}

fn ensure_teams(teams: &[String]) -> Result<(), RoomError> {
    if teams.len() < 2 {
        return Err(RoomError::validation("at least 2 teams are required"));
    }
    if teams.iter().any(|t| t.trim().is_empty()) {
        return Err(RoomError::validation("team names cannot be blank"));
    }
    Ok(())
}

fn ensure_rounds(total_rounds: u32) -> Result<(), RoomError> {
    if total_rounds == 0 {
        return Err(RoomError::validation("total_rounds must be at least 1"));
    }
    Ok(())
}

fn ensure_turn_seconds(seconds: u64) -> Result<(), RoomError> {
    if !(MIN_TURN_SECONDS..=MAX_TURN_SECONDS).contains(&seconds) {
        return Err(RoomError::validation(format!(
            "timer must be between {MIN_TURN_SECONDS} and {MAX_TURN_SECONDS} seconds"
        )));
    }
    Ok(())
}
