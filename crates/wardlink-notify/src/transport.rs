//! Transport seam between the notification channel and its WebSocket link.
//!
//! The channel never touches the socket directly: a `Connector` opens a
//! `TransportHandle`, which is a pair of mpsc halves pumped by a background
//! task. Tests substitute an in-memory connector; production uses
//! `WsConnector`.

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, warn};
use url::Url;

use wardlink_protocols::ChannelError;

/// Event reported by a live transport link.
#[derive(Debug)]
pub enum TransportEvent {
    /// A text frame arrived from the gateway.
    Message(String),
    /// The link closed, normally or due to an error.
    Closed(Option<String>),
}

/// One live link to the notification gateway.
///
/// Dropping the handle tears the link down: the pump task exits once the
/// outbound sender and event receiver are gone.
pub struct TransportHandle {
    /// Writer half: serialized frames queued for the gateway.
    pub outbound: mpsc::Sender<String>,
    /// Reader half: events pumped off the socket.
    pub events: mpsc::Receiver<TransportEvent>,
}

/// Opens transport links.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a link to `url`. Resolves once the transport reports
    /// successful establishment.
    async fn open(&self, url: &Url) -> Result<TransportHandle, ChannelError>;
}

/// WebSocket connector backed by tokio-tungstenite.
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn open(&self, url: &Url) -> Result<TransportHandle, ChannelError> {
        let (stream, _) = connect_async(url.as_str())
            .await
            .map_err(|e| ChannelError::ConnectionFailed(e.to_string()))?;
        let (mut write, mut read) = stream.split();

        let (outbound_tx, mut outbound_rx) = mpsc::channel::<String>(32);
        let (event_tx, event_rx) = mpsc::channel::<TransportEvent>(256);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    outgoing = outbound_rx.recv() => match outgoing {
                        Some(text) => {
                            if let Err(e) = write.send(Message::Text(text.into())).await {
                                warn!("WebSocket write failed: {}", e);
                                let _ = event_tx
                                    .send(TransportEvent::Closed(Some(e.to_string())))
                                    .await;
                                break;
                            }
                        }
                        // Handle dropped by the channel; close the socket.
                        None => {
                            let _ = write.send(Message::Close(None)).await;
                            break;
                        }
                    },
                    incoming = read.next() => match incoming {
                        Some(Ok(Message::Text(text))) => {
                            if event_tx
                                .send(TransportEvent::Message(text.into()))
                                .await
                                .is_err()
                            {
                                break;
                            }
                        }
                        Some(Ok(Message::Ping(data))) => {
                            let _ = write.send(Message::Pong(data)).await;
                        }
                        Some(Ok(Message::Close(frame))) => {
                            let reason = frame.map(|f| f.reason.to_string());
                            let _ = event_tx.send(TransportEvent::Closed(reason)).await;
                            break;
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            let _ = event_tx
                                .send(TransportEvent::Closed(Some(e.to_string())))
                                .await;
                            break;
                        }
                        None => {
                            let _ = event_tx.send(TransportEvent::Closed(None)).await;
                            break;
                        }
                    },
                }
            }
            debug!("WebSocket pump finished");
        });

        Ok(TransportHandle {
            outbound: outbound_tx,
            events: event_rx,
        })
    }
}
