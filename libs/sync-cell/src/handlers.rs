use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    Json,
};
use futures::stream::{self, Stream};
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;

use crate::context::ClinicContext;
use crate::services::sync::{SyncService, SyncStatus};

pub async fn get_sync_status(State(ctx): State<Arc<ClinicContext>>) -> Json<SyncStatus> {
    Json(SyncService::new(ctx).status())
}

/// Streams a `refresh` event each time a mirror is rebuilt.
pub async fn sync_events(
    State(ctx): State<Arc<ClinicContext>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = ctx.subscribe_events();

    let events = stream::unfold(receiver, |mut receiver| async move {
        loop {
            match receiver.recv().await {
                Ok(change) => {
                    let event = Event::default()
                        .event("refresh")
                        .json_data(&change)
                        .unwrap_or_else(|_| Event::default().event("refresh"));
                    return Some((Ok::<_, Infallible>(event), receiver));
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!("Refresh stream lagged, {} events dropped", skipped);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(events).keep_alive(KeepAlive::default())
}
