use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;

use crate::state::{AppState, RuntimeEvent};

pub async fn events_socket(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| stream_events(socket, state))
}

async fn stream_events(mut socket: WebSocket, state: AppState) {
    // Subscribe before reading the state so no update slips between the two.
    let mut updates = state.sim().subscribe();
    let Ok(current) = state.sim().state().await else {
        return;
    };

    let connected = RuntimeEvent::connected(current.tick, state.sim().is_paused());
    if send_event(&mut socket, &connected).await.is_err() {
        return;
    }
    if send_event(&mut socket, &RuntimeEvent::snapshot(&current))
        .await
        .is_err()
    {
        return;
    }

    loop {
        tokio::select! {
            inbound = socket.recv() => {
                match inbound {
                    Some(Ok(Message::Close(_))) | None => return,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => return,
                }
            }
            update = updates.recv() => {
                let event = match update {
                    Ok(update) => RuntimeEvent::from(update),
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "event subscriber lagged; resending state");
                        match state.sim().state().await {
                            Ok(current) => RuntimeEvent::snapshot(&current),
                            Err(_) => return,
                        }
                    }
                    Err(RecvError::Closed) => return,
                };
                if send_event(&mut socket, &event).await.is_err() {
                    return;
                }
            }
        }
    }
}

async fn send_event(socket: &mut WebSocket, event: &RuntimeEvent) -> Result<(), ()> {
    let payload = event_json(event)?;
    socket.send(Message::Text(payload)).await.map_err(|_| ())
}

fn event_json(event: &RuntimeEvent) -> Result<String, ()> {
    serde_json::to_string(event).map_err(|_| ())
}
