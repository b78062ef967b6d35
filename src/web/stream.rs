//! The interactive "Fill Now" stage-streaming entry point (spec §6.2).

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json,
    extract::{Path, State},
    response::{
        Sse,
        sse::{Event, KeepAlive},
    },
};
use futures::stream::{self, Stream};
use serde::Deserialize;
use tokio::sync::mpsc;

use crate::app::AppState;
use crate::llm::{EnvCredentialSource, RequestCredentialSource};
use crate::pipeline::Stage;
use crate::store::models::Genre;

#[derive(Debug, Deserialize, Default)]
pub(crate) struct FillNowRequest {
    #[serde(default, rename = "apiKey")]
    api_key: Option<String>,
}

/// `POST /v1/genres/{genre}/fill-now` — streams `Stage` transitions as
/// server-sent events, with a final `result`/`error` event.
pub(crate) async fn fill_now(
    State(state): State<AppState>,
    Path(genre): Path<String>,
    Json(payload): Json<FillNowRequest>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, mut rx) = mpsc::unbounded_channel::<Stage>();

    let genre = Genre::new(genre);
    let scheduler = state.scheduler().clone();
    let server_key = state.config().llm_api_key().map(str::to_string);

    tokio::spawn(async move {
        let Some(genre) = genre else {
            let _ = tx.send(Stage::Error);
            return;
        };

        let credentials: Arc<dyn crate::llm::LlmCredentialSource> = match payload.api_key {
            Some(key) => Arc::new(RequestCredentialSource::new(key)),
            None => Arc::new(EnvCredentialSource::new(server_key)),
        };

        let outcome = scheduler.fill_genre(&genre, credentials.as_ref(), true, Some(&tx)).await;
        match outcome {
            Ok(_) => {}
            Err(_) => {
                let _ = tx.send(Stage::Error);
            }
        }
    });

    let events = stream::unfold(rx, |mut rx| async move {
        let stage = rx.recv().await?;
        let event = Event::default().event("stage").data(stage.as_str());
        Some((Ok(event), rx))
    });

    Sse::new(events).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
