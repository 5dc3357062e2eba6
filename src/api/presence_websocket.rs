use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use warp::ws::{Message, WebSocket};

use crate::diagnostics::DiagnosticLog;
use crate::error::{Result, TicksError};
use crate::presence::{ClientEvent, ConnectionId, HubHandle, ServerEvent};

pub async fn handle_presence_websocket(websocket: WebSocket, hub: HubHandle, diagnostics: DiagnosticLog) {
    let connection = ConnectionId::next();
    tracing::info!(connection = %connection, "New presence WebSocket connection established");

    let (mut ws_sender, mut ws_receiver) = websocket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    if let Err(e) = hub.connect(connection, tx) {
        tracing::error!(connection = %connection, error = %e, "Cannot register connection");
        return;
    }

    // Spawn task to send snapshots to the client
    let sender_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match event.to_json() {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize server event");
                    continue;
                }
            };
            if let Err(e) = ws_sender.send(Message::text(text)).await {
                tracing::error!(error = %e, "Failed to send WebSocket message");
                break;
            }
        }
    });

    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(message) => {
                if let Err(e) = handle_websocket_message(&hub, &diagnostics, connection, message) {
                    tracing::error!(connection = %connection, error = %e, "Presence hub unavailable");
                    break;
                }
            }
            Err(e) => {
                tracing::warn!(connection = %connection, error = %e, "WebSocket error");
                break;
            }
        }
    }

    hub.disconnect(connection);
    sender_task.abort();
    tracing::info!(connection = %connection, "Presence WebSocket connection closed");
}

/// Malformed payloads are logged and dropped. Only a stopped hub is an error.
fn handle_websocket_message(
    hub: &HubHandle,
    diagnostics: &DiagnosticLog,
    connection: ConnectionId,
    message: Message,
) -> Result<()> {
    if message.is_ping() || message.is_pong() || message.is_close() {
        return Ok(());
    }

    let Ok(text) = message.to_str() else {
        let raw = String::from_utf8_lossy(message.as_bytes());
        let error = TicksError::malformed(format!("non-text frame of {} bytes", message.as_bytes().len()));
        report_malformed(diagnostics, connection, &raw, &error);
        return Ok(());
    };

    match ClientEvent::parse(text) {
        Ok(event) => hub.dispatch(connection, event),
        Err(e) => {
            report_malformed(diagnostics, connection, text, &e);
            Ok(())
        }
    }
}

fn report_malformed(diagnostics: &DiagnosticLog, connection: ConnectionId, raw: &str, error: &TicksError) {
    tracing::warn!(
        connection = %connection,
        error = %error,
        raw_message = %raw,
        "Discarding malformed presence event"
    );
    diagnostics.record(format!("ERROR: {error}\n{raw}"));
}
