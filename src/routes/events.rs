use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::{
        sse::{Event, KeepAlive, Sse},
        Response,
    },
};
use futures::Stream;
use std::{convert::Infallible, sync::Arc};
use tokio::sync::broadcast::error::RecvError;

use crate::error::{AppError, AppResult};
use crate::services::event_stream::{ClientRequest, Notifier, RealtimeEvent};
use crate::services::patient_service;
use crate::AppState;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| client_loop(socket, state))
}

/// Forward every broadcast to the socket and answer the client's pull requests.
async fn client_loop(mut socket: WebSocket, state: AppState) {
    let mut rx = state.notifier.subscribe();
    tracing::debug!(
        subscribers = state.notifier.subscriber_count(),
        "realtime client connected"
    );

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Ok(event) => {
                    if send_event(&mut socket, &event).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "realtime client lagging, events dropped");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Text(text))) => {
                    let request = match serde_json::from_str::<ClientRequest>(&text) {
                        Ok(request) => request,
                        Err(e) => {
                            tracing::debug!("ignoring realtime request: {e}");
                            continue;
                        }
                    };
                    match answer_request(&state, request).await {
                        Ok(Some(event)) => {
                            if send_event(&mut socket, &event).await.is_err() {
                                break;
                            }
                        }
                        Ok(None) => {}
                        Err(e) => tracing::warn!("realtime request failed: {e}"),
                    }
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }
    tracing::debug!("realtime client disconnected");
}

async fn send_event(socket: &mut WebSocket, event: &RealtimeEvent) -> Result<(), axum::Error> {
    let json = serde_json::to_string(event).unwrap_or_default();
    socket.send(Message::Text(json)).await
}

/// Reply addressed to the requesting client only. Unknown patients get no reply.
pub async fn answer_request(
    state: &AppState,
    request: ClientRequest,
) -> AppResult<Option<RealtimeEvent>> {
    match request {
        ClientRequest::RequestPatientList => {
            let patients = patient_service::active_patients(&state.pool).await?;
            Ok(Some(RealtimeEvent::PatientListUpdate { patients }))
        }
        ClientRequest::RequestPatientData { patient_id } => {
            match patient_service::snapshot(&state.pool, patient_id).await {
                Ok(snapshot) => Ok(Some(snapshot.into())),
                Err(AppError::NotFound) => Ok(None),
                Err(e) => Err(e),
            }
        }
    }
}

pub async fn sse_handler(
    State(notifier): State<Arc<Notifier>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let mut rx = notifier.subscribe();

    let stream = async_stream::stream! {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let json = serde_json::to_string(&event).unwrap_or_default();
                    yield Ok(Event::default().event(event.name()).data(json));
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event stream lagging, events dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}
