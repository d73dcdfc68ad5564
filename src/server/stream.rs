use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::Path;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Extension;
use futures::StreamExt;
use serde_json::json;
use tokio_stream::wrappers::WatchStream;

use super::error::ApiError;
use super::routes::ServerContext;

const EVENT_NAME: &str = "room";
const KEEP_ALIVE_SECS: u64 = 15;

/// Live snapshot subscription: the current document immediately, then every
/// committed write, as SSE `room` events. The stream ends when the room is
/// deleted.
pub async fn room_events(
    Extension(ctx): Extension<Arc<ServerContext>>,
    Path(code): Path<String>,
) -> Result<Sse<impl futures::Stream<Item = Result<Event, Infallible>>>, ApiError> {
    let receiver = ctx
        .service
        .subscribe(&code)
        .ok_or_else(|| ApiError::NotFound("room not found".to_string()))?;

    let stream = WatchStream::new(receiver).map(|snapshot| {
        let data = serde_json::to_string(&*snapshot)
            .unwrap_or_else(|err| json!({ "error": err.to_string() }).to_string());
        Ok::<Event, Infallible>(Event::default().event(EVENT_NAME).data(data))
    });

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(KEEP_ALIVE_SECS))
            .text(":\n"),
    ))
}
