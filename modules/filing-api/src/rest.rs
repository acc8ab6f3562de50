use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json,
    },
};
use futures::Stream;
use tracing::{debug, warn};

use crate::AppState;

const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

fn error_body(message: &str) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "error": message }))
}

/// GET /api/events: one SSE message per lifecycle event.
///
/// The subscription is registered before the response is returned and is
/// dropped with the stream when the client goes away.
pub async fn api_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut subscription = state.broadcaster.subscribe();
    debug!(subscriber = subscription.id(), "Event stream opened");

    let stream = async_stream::stream! {
        while let Some(event) = subscription.recv().await {
            match serde_json::to_string(&event) {
                Ok(json) => yield Ok(Event::default().data(json)),
                Err(e) => warn!(error = %e, "Failed to serialize lifecycle event"),
            }
        }
        debug!(subscriber = subscription.id(), "Event stream closed");
    };

    Sse::new(stream).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL).text("ping"))
}

/// GET /api/filings/latest
pub async fn api_filing_latest(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.store.fetch_latest().await {
        Ok(Some(filing)) => Json(filing).into_response(),
        Ok(None) => (StatusCode::NOT_FOUND, error_body("No filings found")).into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to load latest filing");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                error_body("Failed to load latest filing"),
            )
                .into_response()
        }
    }
}
