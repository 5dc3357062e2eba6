use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::error::{Result, TicksError};
use crate::presence::{ClientEvent, ServerEvent};

/// Cloneable handle that queues events onto a session's socket.
#[derive(Debug, Clone)]
pub struct EventSender {
    outbound: mpsc::UnboundedSender<ClientEvent>,
}

impl EventSender {
    pub(crate) fn new(outbound: mpsc::UnboundedSender<ClientEvent>) -> Self {
        Self { outbound }
    }

    pub fn send(&self, event: ClientEvent) -> Result<()> {
        self.outbound
            .send(event)
            .map_err(|_| TicksError::network("session is closed"))
    }

    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }
}

/// One WebSocket connection to the presence endpoint.
///
/// A writer task drains queued [`ClientEvent`]s onto the socket and a reader
/// task decodes inbound frames into [`ServerEvent`]s. Both stop when the
/// session is dropped or the server closes the connection.
pub struct ClientSession {
    sender: EventSender,
    writer: JoinHandle<()>,
    reader: JoinHandle<()>,
}

impl ClientSession {
    pub async fn connect(url: &str) -> Result<(Self, mpsc::UnboundedReceiver<ServerEvent>)> {
        let (ws_stream, _) = connect_async(url).await?;
        tracing::debug!(url = %url, "Connected to presence endpoint");

        let (mut ws_sender, mut ws_receiver) = ws_stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<ClientEvent>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<ServerEvent>();

        let writer = tokio::spawn(async move {
            while let Some(event) = outbound_rx.recv().await {
                let text = match serde_json::to_string(&event) {
                    Ok(text) => text,
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to serialize client event");
                        continue;
                    }
                };
                if let Err(e) = ws_sender.send(Message::Text(text)).await {
                    tracing::warn!(error = %e, "Failed to send WebSocket message");
                    break;
                }
            }
            let _ = ws_sender.close().await;
        });

        let reader = tokio::spawn(async move {
            while let Some(result) = ws_receiver.next().await {
                match result {
                    Ok(Message::Text(text)) => match serde_json::from_str::<ServerEvent>(&text) {
                        Ok(event) => {
                            if inbound_tx.send(event).is_err() {
                                break;
                            }
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, raw_message = %text, "Ignoring unreadable server event")
                        }
                    },
                    Ok(Message::Close(_)) => break,
                    Ok(_) => continue,
                    Err(e) => {
                        tracing::warn!(error = %e, "WebSocket error");
                        break;
                    }
                }
            }
            tracing::debug!("Presence connection closed");
        });

        let session = Self {
            sender: EventSender::new(outbound_tx),
            writer,
            reader,
        };
        Ok((session, inbound_rx))
    }

    pub fn send(&self, event: ClientEvent) -> Result<()> {
        self.sender.send(event)
    }

    /// A handle for tasks that send on this session, such as a [`PingSchedule`](super::PingSchedule).
    pub fn sender(&self) -> EventSender {
        self.sender.clone()
    }

    /// Stops both socket tasks immediately.
    pub fn close(self) {
        drop(self);
    }
}

impl Drop for ClientSession {
    fn drop(&mut self) {
        self.writer.abort();
        self.reader.abort();
    }
}
