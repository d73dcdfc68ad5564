use std::sync::Arc;

use axum::extract::{Path, Query};
use axum::routing::{get, post, put};
use axum::{Extension, Json, Router};

use crate::games::{GameSettings, SpyRole};
use crate::room::RoomService;

use super::dto::{
    ActorRequest, ChooseTeamRequest, CreateRoomRequest, FlipRequest, ImportDeckRequest,
    JoinRoomRequest, LeaveRoomResponse, RoleQuery, RoomResponse, ScoreRequest, ShareDeckRequest,
    ShareDeckResponse, UpdateSettingsRequest,
};
use super::error::ApiError;
use super::stream::room_events;

#[derive(Clone)]
pub struct ServerContext {
    pub service: Arc<RoomService>,
}

/// Axum facade over the room service.
pub struct PartyRoomsServer {
    router: Router,
}

impl PartyRoomsServer {
    pub fn new(service: Arc<RoomService>) -> Self {
        let context = Arc::new(ServerContext { service });

        let router = Router::new()
            .route("/rooms", post(create_room))
            .route("/rooms/:code", get(get_room))
            .route("/rooms/:code/events", get(room_events))
            .route("/rooms/:code/join", post(join_room))
            .route("/rooms/:code/leave", post(leave_room))
            .route("/rooms/:code/start", post(start_game))
            .route("/rooms/:code/advance", post(advance_turn))
            .route("/rooms/:code/score", post(record_score))
            .route("/rooms/:code/flip", post(flip_card))
            .route("/rooms/:code/reveal", post(reveal_spy))
            .route("/rooms/:code/reserve", post(reserve_next_speaker))
            .route("/rooms/:code/team", post(choose_team))
            .route("/rooms/:code/pause", post(pause))
            .route("/rooms/:code/resume", post(resume))
            .route("/rooms/:code/reset", post(reset_room))
            .route("/rooms/:code/settings", put(update_settings))
            .route("/rooms/:code/role", get(role_view))
            .route("/rooms/:code/decks/import", post(import_deck))
            .route("/decks", post(share_deck))
            .layer(Extension(context));

        Self { router }
    }

    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn into_router(self) -> Router {
        self.router
    }
}

async fn create_room(
    Extension(ctx): Extension<Arc<ServerContext>>,
    Json(request): Json<CreateRoomRequest>,
) -> Result<Json<RoomResponse>, ApiError> {
    let settings = match request.settings {
        Some(settings) => {
            if settings.kind() != request.game {
                return Err(ApiError::bad_request(
                    "settings do not match the requested game",
                ));
            }
            settings
        }
        None => GameSettings::default_for(request.game),
    };
    let room = ctx
        .service
        .create_room(request.user_id, &request.name, settings)
        .await?;
    Ok(Json(RoomResponse::new(room)))
}

async fn get_room(
    Extension(ctx): Extension<Arc<ServerContext>>,
    Path(code): Path<String>,
) -> Result<Json<RoomResponse>, ApiError> {
    let room = ctx.service.snapshot(&code).await?;
    Ok(Json(RoomResponse::new(room)))
}

async fn join_room(
    Extension(ctx): Extension<Arc<ServerContext>>,
    Path(code): Path<String>,
    Json(request): Json<JoinRoomRequest>,
) -> Result<Json<RoomResponse>, ApiError> {
    let room = ctx
        .service
        .join_room(&code, request.user_id, &request.name)
        .await?;
    Ok(Json(RoomResponse::new(room)))
}

async fn leave_room(
    Extension(ctx): Extension<Arc<ServerContext>>,
    Path(code): Path<String>,
    Json(request): Json<ActorRequest>,
) -> Result<Json<LeaveRoomResponse>, ApiError> {
    let room = ctx.service.leave_room(&code, request.user_id).await?;
    let deleted = room.is_none();
    Ok(Json(LeaveRoomResponse { room, deleted }))
}

async fn start_game(
    Extension(ctx): Extension<Arc<ServerContext>>,
    Path(code): Path<String>,
    Json(request): Json<ActorRequest>,
) -> Result<Json<RoomResponse>, ApiError> {
    let room = ctx.service.start_game(&code, request.user_id).await?;
    Ok(Json(RoomResponse::new(room)))
}

async fn advance_turn(
    Extension(ctx): Extension<Arc<ServerContext>>,
    Path(code): Path<String>,
    Json(request): Json<ActorRequest>,
) -> Result<Json<RoomResponse>, ApiError> {
    let room = ctx.service.advance_turn(&code, request.user_id).await?;
    Ok(Json(RoomResponse::new(room)))
}

async fn record_score(
    Extension(ctx): Extension<Arc<ServerContext>>,
    Path(code): Path<String>,
    Json(request): Json<ScoreRequest>,
) -> Result<Json<RoomResponse>, ApiError> {
    let room = ctx
        .service
        .record_score(&code, request.user_id, request.outcome)
        .await?;
    Ok(Json(RoomResponse::new(room)))
}

async fn flip_card(
    Extension(ctx): Extension<Arc<ServerContext>>,
    Path(code): Path<String>,
    Json(request): Json<FlipRequest>,
) -> Result<Json<RoomResponse>, ApiError> {
    let room = ctx
        .service
        .flip_card(&code, request.user_id, request.card)
        .await?;
    Ok(Json(RoomResponse::new(room)))
}

async fn reveal_spy(
    Extension(ctx): Extension<Arc<ServerContext>>,
    Path(code): Path<String>,
    Json(request): Json<ActorRequest>,
) -> Result<Json<RoomResponse>, ApiError> {
    let room = ctx.service.reveal_spy(&code, request.user_id).await?;
    Ok(Json(RoomResponse::new(room)))
}

async fn reserve_next_speaker(
    Extension(ctx): Extension<Arc<ServerContext>>,
    Path(code): Path<String>,
    Json(request): Json<ActorRequest>,
) -> Result<(), ApiError> {
    ctx.service
        .reserve_next_speaker(&code, request.user_id)
        .await?;
    Ok(())
}

async fn choose_team(
    Extension(ctx): Extension<Arc<ServerContext>>,
    Path(code): Path<String>,
    Json(request): Json<ChooseTeamRequest>,
) -> Result<Json<RoomResponse>, ApiError> {
    let room = ctx
        .service
        .choose_team(&code, request.user_id, request.team)
        .await?;
    Ok(Json(RoomResponse::new(room)))
}

async fn pause(
    Extension(ctx): Extension<Arc<ServerContext>>,
    Path(code): Path<String>,
    Json(request): Json<ActorRequest>,
) -> Result<Json<RoomResponse>, ApiError> {
    let room = ctx.service.pause(&code, request.user_id).await?;
    Ok(Json(RoomResponse::new(room)))
}

async fn resume(
    Extension(ctx): Extension<Arc<ServerContext>>,
    Path(code): Path<String>,
    Json(request): Json<ActorRequest>,
) -> Result<Json<RoomResponse>, ApiError> {
    let room = ctx.service.resume(&code, request.user_id).await?;
    Ok(Json(RoomResponse::new(room)))
}

async fn reset_room(
    Extension(ctx): Extension<Arc<ServerContext>>,
    Path(code): Path<String>,
    Json(request): Json<ActorRequest>,
) -> Result<Json<RoomResponse>, ApiError> {
    let room = ctx.service.reset_room(&code, request.user_id).await?;
    Ok(Json(RoomResponse::new(room)))
}

async fn update_settings(
    Extension(ctx): Extension<Arc<ServerContext>>,
    Path(code): Path<String>,
    Json(request): Json<UpdateSettingsRequest>,
) -> Result<Json<RoomResponse>, ApiError> {
    let room = ctx
        .service
        .update_settings(&code, request.user_id, request.settings)
        .await?;
    Ok(Json(RoomResponse::new(room)))
}

async fn role_view(
    Extension(ctx): Extension<Arc<ServerContext>>,
    Path(code): Path<String>,
    Query(query): Query<RoleQuery>,
) -> Result<Json<SpyRole>, ApiError> {
    let role = ctx.service.role_view(&code, query.user_id).await?;
    Ok(Json(role))
}

async fn import_deck(
    Extension(ctx): Extension<Arc<ServerContext>>,
    Path(code): Path<String>,
    Json(request): Json<ImportDeckRequest>,
) -> Result<Json<RoomResponse>, ApiError> {
    let room = ctx
        .service
        .import_deck(&code, request.user_id, &request.deck_code)
        .await?;
    Ok(Json(RoomResponse::new(room)))
}

async fn share_deck(
    Extension(ctx): Extension<Arc<ServerContext>>,
    Json(request): Json<ShareDeckRequest>,
) -> Result<Json<ShareDeckResponse>, ApiError> {
    let code = ctx
        .service
        .share_deck(&request.name, request.words)
        .await?;
    Ok(Json(ShareDeckResponse { code }))
}
