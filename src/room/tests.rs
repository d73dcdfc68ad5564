use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::clock::{Clock, ManualClock};
use crate::games::{
    CharadesSettings, DeckSource, GameSettings, GameState, ScoreOutcome, SharingSettings,
    SpySettings,
};

use super::error::RoomError;
use super::registry::RoomRegistry;
use super::service::RoomService;
use super::storage::InMemoryRoomStorage;
use super::types::{PlayerId, RoomStatus};

struct Harness {
    service: RoomService,
    registry: Arc<RoomRegistry>,
    clock: Arc<ManualClock>,
}

fn harness() -> Harness {
    let storage = Arc::new(InMemoryRoomStorage::new());
    let registry = Arc::new(RoomRegistry::new());
    let clock = Arc::new(ManualClock::new(Utc::now()));
    let service = RoomService::new(storage, Arc::clone(&registry), clock.clone());
    Harness {
        service,
        registry,
        clock,
    }
}

fn charades_settings() -> GameSettings {
    GameSettings::Charades(CharadesSettings {
        word_sources: vec![DeckSource::new(
            "animals",
            vec!["cat".into(), "dog".into(), "owl".into(), "bee".into()],
        )],
        ..CharadesSettings::default()
    })
}

fn sharing_settings() -> GameSettings {
    GameSettings::Sharing(SharingSettings {
        question_sources: vec![DeckSource::new(
            "starters",
            (0..12).map(|i| format!("question {i}")).collect(),
        )],
    })
}

async fn charades_room(h: &Harness) -> (String, PlayerId, PlayerId) {
    let host = Uuid::new_v4();
    let room = h
        .service
        .create_room(host, "Host", charades_settings())
        .await
        .unwrap();
    let guest = Uuid::new_v4();
    h.service
        .join_room(&room.code, guest, "Guest")
        .await
        .unwrap();
    (room.code.clone(), host, guest)
}

#[tokio::test]
async fn host_leave_promotes_a_remaining_member() {
    let h = harness();
    let (code, host, guest) = charades_room(&h).await;

    let room = h.service.leave_room(&code, host).await.unwrap().unwrap();
    assert_eq!(room.host_id, guest);
    assert!(room.is_member(room.host_id));
    assert!(room.player(guest).unwrap().is_host);
}

#[tokio::test]
async fn last_leave_deletes_the_room_and_closes_the_channel() {
    let h = harness();
    let host = Uuid::new_v4();
    let room = h
        .service
        .create_room(host, "Host", charades_settings())
        .await
        .unwrap();
    let code = room.code.clone();
    let mut rx = h.service.subscribe(&code).unwrap();

    let result = h.service.leave_room(&code, host).await.unwrap();
    assert!(result.is_none());
    assert!(rx.changed().await.is_err());
    assert!(h.registry.subscribe(&code).is_none());
    assert!(matches!(
        h.service.snapshot(&code).await.unwrap_err(),
        RoomError::NotFound("room")
    ));
}

#[tokio::test]
async fn default_charades_scenario_scores_eight() {
    let h = harness();
    let (code, host, _guest) = charades_room(&h).await;
    h.service.start_game(&code, host).await.unwrap();

    for _ in 0..3 {
        h.service
            .record_score(&code, host, ScoreOutcome::Correct)
            .await
            .unwrap();
    }
    let room = h
        .service
        .record_score(&code, host, ScoreOutcome::Skip)
        .await
        .unwrap();

    match room.state.as_ref().unwrap() {
        GameState::Charades(state) => {
            assert_eq!(state.rotation.scores[0], 8);
            assert_eq!(state.rotation.scores[1], 0);
        }
        other => panic!("unexpected state {other:?}"),
    }
}

#[tokio::test]
async fn rotation_through_the_service_finishes_the_room() {
    let h = harness();
    let (code, host, guest) = charades_room(&h).await;
    h.service.start_game(&code, host).await.unwrap();

    // 2 rounds x 2 teams: the fourth advance finishes.
    for _ in 0..3 {
        let room = h.service.advance_turn(&code, guest).await.unwrap();
        assert_eq!(room.status, RoomStatus::Playing);
    }
    let room = h.service.advance_turn(&code, guest).await.unwrap();
    assert_eq!(room.status, RoomStatus::Finished);

    // Replay: reset goes back to waiting with state cleared.
    let room = h.service.reset_room(&code, host).await.unwrap();
    assert_eq!(room.status, RoomStatus::Waiting);
    assert!(room.state.is_none());
}

#[tokio::test]
async fn joining_elsewhere_evicts_from_the_old_room() {
    let h = harness();
    let (code_a, _host_a, guest) = charades_room(&h).await;

    let host_b = Uuid::new_v4();
    let room_b = h
        .service
        .create_room(host_b, "Other", charades_settings())
        .await
        .unwrap();

    let joined = h
        .service
        .join_room(&room_b.code, guest, "Guest")
        .await
        .unwrap();
    assert!(joined.is_member(guest));

    let room_a = h.service.snapshot(&code_a).await.unwrap();
    assert!(!room_a.is_member(guest));
}

#[tokio::test]
async fn creating_a_room_while_alone_elsewhere_deletes_the_old_room() {
    let h = harness();
    let user = Uuid::new_v4();
    let first = h
        .service
        .create_room(user, "Solo", charades_settings())
        .await
        .unwrap();
    let second = h
        .service
        .create_room(user, "Solo", charades_settings())
        .await
        .unwrap();

    assert_ne!(first.code, second.code);
    assert!(matches!(
        h.service.snapshot(&first.code).await.unwrap_err(),
        RoomError::NotFound("room")
    ));
    assert!(h.registry.subscribe(&first.code).is_none());
}

#[tokio::test]
async fn non_host_operations_are_forbidden() {
    let h = harness();
    let (code, _host, guest) = charades_room(&h).await;

    assert!(matches!(
        h.service.start_game(&code, guest).await.unwrap_err(),
        RoomError::Forbidden(_)
    ));
    assert!(matches!(
        h.service
            .update_settings(&code, guest, charades_settings())
            .await
            .unwrap_err(),
        RoomError::Forbidden(_)
    ));

    let outsider = Uuid::new_v4();
    assert!(matches!(
        h.service
            .record_score(&code, outsider, ScoreOutcome::Correct)
            .await
            .unwrap_err(),
        RoomError::Forbidden(_)
    ));
}

#[tokio::test]
async fn start_requires_enough_players() {
    let h = harness();
    let host = Uuid::new_v4();
    let room = h
        .service
        .create_room(
            host,
            "Host",
            GameSettings::Spy(SpySettings {
                location_sources: vec![DeckSource::new("places", vec!["airport".into()])],
                ..SpySettings::default()
            }),
        )
        .await
        .unwrap();
    h.service
        .join_room(&room.code, Uuid::new_v4(), "Two")
        .await
        .unwrap();

    let err = h.service.start_game(&room.code, host).await.unwrap_err();
    assert!(matches!(err, RoomError::Validation(_)));
}

#[tokio::test]
async fn pause_preserves_remaining_turn_time() {
    let h = harness();
    let (code, host, _guest) = charades_room(&h).await;
    h.service.start_game(&code, host).await.unwrap();

    h.clock.advance(Duration::seconds(20));
    h.service.pause(&code, host).await.unwrap();
    h.clock.advance(Duration::seconds(100));
    let room = h.service.resume(&code, host).await.unwrap();

    let now = h.clock.now();
    match room.state.as_ref().unwrap() {
        GameState::Charades(state) => {
            // Default turn is 60s; 20s elapsed before the pause.
            assert_eq!(state.turn.remaining_ms(now), 40_000);
        }
        other => panic!("unexpected state {other:?}"),
    }
}

#[tokio::test]
async fn reservation_swaps_the_next_speaker() {
    let h = harness();
    let host = Uuid::new_v4();
    let room = h
        .service
        .create_room(host, "Host", sharing_settings())
        .await
        .unwrap();
    let code = room.code.clone();
    let second = Uuid::new_v4();
    let third = Uuid::new_v4();
    h.service.join_room(&code, second, "Two").await.unwrap();
    h.service.join_room(&code, third, "Three").await.unwrap();
    h.service.start_game(&code, host).await.unwrap();

    h.service.reserve_next_speaker(&code, third).await.unwrap();
    let room = h.service.advance_turn(&code, host).await.unwrap();

    match room.state.as_ref().unwrap() {
        GameState::Sharing(state) => {
            assert_eq!(state.current_speaker(), Some(third));
        }
        other => panic!("unexpected state {other:?}"),
    }

    // The reservation was consumed; the following advance is sequential.
    let room = h.service.advance_turn(&code, host).await.unwrap();
    match room.state.as_ref().unwrap() {
        GameState::Sharing(state) => {
            assert_ne!(state.current_speaker(), Some(third));
        }
        other => panic!("unexpected state {other:?}"),
    }
}

#[tokio::test]
async fn subscribers_receive_committed_writes_in_order() {
    let h = harness();
    let (code, host, _guest) = charades_room(&h).await;
    let mut rx = h.service.subscribe(&code).unwrap();
    let seen = rx.borrow_and_update().version;

    h.service.start_game(&code, host).await.unwrap();
    rx.changed().await.unwrap();
    let room = rx.borrow_and_update().clone();
    assert_eq!(room.status, RoomStatus::Playing);
    assert!(room.version > seen);
}

#[tokio::test]
async fn shared_decks_round_trip_into_room_settings() {
    let h = harness();
    let (code, host, _guest) = charades_room(&h).await;

    let deck_code = h
        .service
        .share_deck("movies", vec!["jaws".into(), "alien".into()])
        .await
        .unwrap();

    let room = h
        .service
        .import_deck(&code, host, &deck_code)
        .await
        .unwrap();
    match &room.settings {
        GameSettings::Charades(cfg) => {
            let imported = cfg.word_sources.iter().find(|s| s.name == "movies");
            assert_eq!(imported.unwrap().items.len(), 2);
        }
        other => panic!("unexpected settings {other:?}"),
    }

    assert!(matches!(
        h.service
            .import_deck(&code, host, "NOPE1234")
            .await
            .unwrap_err(),
        RoomError::NotFound("deck")
    ));
}

#[tokio::test]
async fn rejoining_the_same_room_is_a_noop() {
    let h = harness();
    let (code, _host, guest) = charades_room(&h).await;
    let before = h.service.snapshot(&code).await.unwrap();

    let room = h.service.join_room(&code, guest, "Guest").await.unwrap();
    assert_eq!(room.version, before.version);
    assert_eq!(room.players.len(), before.players.len());
}

#[tokio::test]
async fn spy_roles_are_visible_only_through_the_role_view() {
    let h = harness();
    let host = Uuid::new_v4();
    let room = h
        .service
        .create_room(
            host,
            "Host",
            GameSettings::Spy(SpySettings {
                location_sources: vec![DeckSource::new("places", vec!["airport".into()])],
                ..SpySettings::default()
            }),
        )
        .await
        .unwrap();
    let code = room.code.clone();
    let second = Uuid::new_v4();
    let third = Uuid::new_v4();
    h.service.join_room(&code, second, "Two").await.unwrap();
    h.service.join_room(&code, third, "Three").await.unwrap();
    h.service.start_game(&code, host).await.unwrap();

    for user in [host, second, third] {
        h.service.role_view(&code, user).await.unwrap();
    }
    let outsider = Uuid::new_v4();
    assert!(matches!(
        h.service.role_view(&code, outsider).await.unwrap_err(),
        RoomError::Forbidden(_)
    ));

    let room = h.service.reveal_spy(&code, host).await.unwrap();
    assert_eq!(room.status, RoomStatus::Finished);
}
