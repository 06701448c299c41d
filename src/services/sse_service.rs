use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::broadcast::{self, error::RecvError};
use uuid::Uuid;

use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use crate::{
    dto::sse::{Handshake, ServerEvent},
    error::ServiceError,
    state::SharedState,
};

/// Open the public SSE stream. The handshake is delivered to this connection
/// only; it never goes through the shared hub.
pub async fn connect_public(
    state: &SharedState,
) -> Sse<impl Stream<Item = Result<Event, Infallible>> + use<>> {
    let handshake = Handshake {
        stream: "public".into(),
        degraded: state.is_degraded().await,
        token: None,
    };
    let receiver = state.public_sse().subscribe();
    bridge(receiver, handshake, StreamKind::Public)
}

/// Open the moderator-only SSE stream, claiming the coordination token. Only
/// one moderator stream may be active at a time; the token rides back to the
/// client inside its handshake.
pub async fn connect_moderator(
    state: &SharedState,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>> + use<>>, ServiceError> {
    let token = claim_moderator_token(state).await?;
    let handshake = Handshake {
        stream: "moderator".into(),
        degraded: state.is_degraded().await,
        token: Some(token),
    };
    let receiver = state.moderator_sse().subscribe();
    Ok(bridge(receiver, handshake, StreamKind::Moderator(state.clone())))
}

/// Identifies the target SSE stream so we can perform stream-specific
/// bookkeeping when the connection is torn down.
#[derive(Clone)]
enum StreamKind {
    Public,
    /// Carries a clone of the shared application state so teardown logic can
    /// reset the moderator token after the spawned task completes. Cloning
    /// `SharedState` is cheap because it is just bumping the inner `Arc`.
    Moderator(SharedState),
}

/// Wire a broadcast receiver to an SSE response. The handshake is injected as
/// the first item of the per-connection channel, ahead of any hub traffic.
fn bridge(
    receiver: broadcast::Receiver<ServerEvent>,
    handshake: Handshake,
    kind: StreamKind,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    // small bounded channel between forwarder and response
    let (tx, rx) = mpsc::channel::<Result<Event, Infallible>>(8);

    // forwarder task: greets the new client, then relays broadcast events
    tokio::spawn(async move {
        forward(receiver, tx, handshake).await;

        match kind {
            StreamKind::Public => tracing::info!("Public SSE stream disconnected"),
            StreamKind::Moderator(state) => {
                // Own the necessary state inside the spawned task so we can
                // clean up even if the request context has already dropped.
                reset_moderator_token(state).await;
                tracing::info!("Moderator SSE stream disconnected")
            }
        }
    });

    // response stream reads from mpsc; when client disconnects axum drops this stream
    let stream = ReceiverStream::new(rx);
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}

/// Push the handshake, then relay hub events until either side hangs up.
async fn forward(
    mut receiver: broadcast::Receiver<ServerEvent>,
    tx: mpsc::Sender<Result<Event, Infallible>>,
    handshake: Handshake,
) {
    if let Ok(event) = handshake_event(&handshake) {
        if tx.send(Ok(event)).await.is_err() {
            return;
        }
    }

    loop {
        tokio::select! {
            _ = tx.closed() => break,
            recv_result = receiver.recv() => {
                match recv_result {
                    Ok(payload) => {
                        if tx.send(Ok(to_event(payload))).await.is_err() {
                            break;
                        }
                    }
                    Err(RecvError::Closed) => break,
                    Err(RecvError::Lagged(_)) => {
                        // Skip lagged messages but keep the stream alive.
                        continue;
                    }
                }
            }
        }
    }
}

fn handshake_event(handshake: &Handshake) -> serde_json::Result<Event> {
    let payload = ServerEvent::json(Some("handshake".to_string()), handshake)?;
    Ok(to_event(payload))
}

fn to_event(payload: ServerEvent) -> Event {
    let mut event = Event::default().data(payload.data);
    if let Some(name) = payload.event {
        event = event.event(name);
    }
    event
}

/// Reserve the moderator token for a new stream, generating one when none
/// exists and failing if another connection already holds it.
async fn claim_moderator_token(state: &SharedState) -> Result<String, ServiceError> {
    let mut guard = state.moderator_token().lock().await;
    match &mut *guard {
        slot @ None => {
            let token = Uuid::new_v4().simple().to_string();
            slot.replace(token.clone());
            Ok(token)
        }
        Some(_) => Err(ServiceError::Unauthorized(
            "Another moderator SSE stream is already active".into(),
        )),
    }
}

/// Clear the stored moderator token so the next moderator connection
/// negotiates a fresh credential.
async fn reset_moderator_token(state: SharedState) {
    let mut guard = state.moderator_token().lock().await;
    guard.take();
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use tokio::sync::broadcast::error::TryRecvError;

    use super::*;
    use crate::{config::AppConfig, dao::slots::MemorySlotStore, state::AppState};

    #[tokio::test]
    async fn only_one_moderator_stream_at_a_time() {
        let state = AppState::new(AppConfig::default(), Arc::new(MemorySlotStore::default()));

        let stream = connect_moderator(&state).await.unwrap();

        let err = connect_moderator(&state).await.unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized(_)));

        // Dropping the response hangs up the connection; the forwarder task
        // releases the token on its way out.
        drop(stream);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(connect_moderator(&state).await.is_ok());
    }

    #[tokio::test]
    async fn handshake_stays_off_the_shared_hub() {
        let state = AppState::new(AppConfig::default(), Arc::new(MemorySlotStore::default()));

        let mut bystander = state.public_sse().subscribe();

        let _stream = connect_public(&state).await;
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;

        // Clients already connected must not see another client's greeting.
        assert!(matches!(bystander.try_recv(), Err(TryRecvError::Empty)));
    }
}
