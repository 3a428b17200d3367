//! The notification channel: connection lifecycle, bounded reconnection,
//! inbound decode and dispatch.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use wardlink_protocols::{ClinicianId, EventFrame, EventKind};

use crate::ChannelConfig;
use crate::registry::{Listener, ListenerId, ListenerRegistry};
use crate::transport::{Connector, TransportEvent, WsConnector};

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// No transport; `connect` has not been called yet.
    Idle,
    /// Transport establishment in flight.
    Connecting,
    /// Transport established; frames flow.
    Open,
    /// Transport lost; a reconnect may be scheduled.
    Closed,
    /// Explicitly torn down; no automatic reconnection.
    Disconnected,
}

struct ConnState {
    lifecycle: ChannelState,
    clinician: Option<ClinicianId>,
    outbound: Option<mpsc::Sender<String>>,
    should_reconnect: bool,
    attempts: u32,
    cancel: Option<CancellationToken>,
}

struct ChannelInner {
    config: ChannelConfig,
    connector: Arc<dyn Connector>,
    conn: Mutex<ConnState>,
    registry: ListenerRegistry,
}

/// Realtime appointment notification channel.
///
/// Owns at most one live link to the notification gateway, scoped to a
/// single clinician. Cheap to clone; clones share the connection and the
/// listener registry. Construct one instance at the composition root and
/// hand clones to whoever needs them.
#[derive(Clone)]
pub struct NotifyChannel {
    inner: Arc<ChannelInner>,
}

impl NotifyChannel {
    /// Create a channel speaking WebSocket to the configured gateway.
    pub fn new(config: ChannelConfig) -> Self {
        Self::with_connector(config, Arc::new(WsConnector))
    }

    /// Create a channel with a custom transport connector.
    pub fn with_connector(config: ChannelConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            inner: Arc::new(ChannelInner {
                config,
                connector,
                conn: Mutex::new(ConnState {
                    lifecycle: ChannelState::Idle,
                    clinician: None,
                    outbound: None,
                    should_reconnect: false,
                    attempts: 0,
                    cancel: None,
                }),
                registry: ListenerRegistry::new(),
            }),
        }
    }

    /// Open the gateway link for `clinician`.
    ///
    /// Returns immediately; establishment completes asynchronously. A call
    /// while the link is connecting or open is a no-op. Must be called
    /// within a tokio runtime.
    pub fn connect(&self, clinician: impl Into<ClinicianId>) {
        let clinician = clinician.into();
        let cancel = {
            let mut conn = self.inner.conn.lock();
            match conn.lifecycle {
                ChannelState::Connecting | ChannelState::Open => {
                    debug!("Notification channel already connected; ignoring connect");
                    return;
                }
                _ => {}
            }
            // Supersede any connection task still waiting out a backoff.
            if let Some(stale) = conn.cancel.take() {
                stale.cancel();
            }
            conn.lifecycle = ChannelState::Connecting;
            conn.clinician = Some(clinician.clone());
            conn.should_reconnect = true;
            conn.attempts = 0;
            let cancel = CancellationToken::new();
            conn.cancel = Some(cancel.clone());
            cancel
        };

        let inner = self.inner.clone();
        tokio::spawn(async move {
            run_connection(inner, clinician, cancel).await;
        });
    }

    /// Tear the channel down.
    ///
    /// Closes any live link, clears the listener registry, forgets the
    /// clinician id, and defuses any scheduled reconnect. Idempotent; safe
    /// to call when nothing is connected.
    pub fn disconnect(&self) {
        {
            let mut conn = self.inner.conn.lock();
            conn.should_reconnect = false;
            conn.lifecycle = ChannelState::Disconnected;
            conn.clinician = None;
            conn.outbound = None;
            if let Some(cancel) = conn.cancel.take() {
                cancel.cancel();
            }
        }
        self.inner.registry.clear();
        debug!("Notification channel disconnected");
    }

    /// Queue `message` for the gateway.
    ///
    /// Best-effort, at-most-once: when the link is not open, or the message
    /// fails to serialize, or the outbound queue is full, the message is
    /// dropped with a warning. Never blocks, never errors.
    pub fn send<T: Serialize>(&self, message: &T) {
        let outbound = {
            let conn = self.inner.conn.lock();
            match conn.lifecycle {
                ChannelState::Open => conn.outbound.clone(),
                _ => None,
            }
        };
        let Some(outbound) = outbound else {
            warn!("Notification channel not open; dropping outbound message");
            return;
        };

        match serde_json::to_string(message) {
            Ok(text) => {
                if outbound.try_send(text).is_err() {
                    warn!("Outbound queue unavailable; dropping message");
                }
            }
            Err(e) => warn!("Failed to serialize outbound message: {}", e),
        }
    }

    /// Register a listener for `kind`.
    ///
    /// Listeners for one kind run in registration order; ordering across
    /// kinds is unspecified.
    pub fn on<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&EventFrame) + Send + Sync + 'static,
    {
        let listener: Listener = Arc::new(listener);
        self.inner.registry.add(kind, listener)
    }

    /// Remove a listener. Unknown ids are a no-op.
    pub fn off(&self, kind: EventKind, id: ListenerId) {
        self.inner.registry.remove(kind, id);
    }

    /// Whether the gateway link is currently open.
    pub fn is_connected(&self) -> bool {
        self.inner.conn.lock().lifecycle == ChannelState::Open
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ChannelState {
        self.inner.conn.lock().lifecycle
    }

    /// Number of listeners registered for `kind`.
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.inner.registry.len(kind)
    }

    #[cfg(test)]
    pub(crate) fn registry(&self) -> &ListenerRegistry {
        &self.inner.registry
    }
}

/// Drives one `connect` call: establish, pump, and retry until the link is
/// torn down, superseded, or the retry attempts run out.
async fn run_connection(
    inner: Arc<ChannelInner>,
    clinician: ClinicianId,
    cancel: CancellationToken,
) {
    let endpoint = match inner.config.endpoint(&clinician) {
        Ok(url) => url,
        Err(e) => {
            error!("Cannot reach notification gateway: {}", e);
            let mut conn = inner.conn.lock();
            if conn.lifecycle == ChannelState::Connecting {
                conn.lifecycle = ChannelState::Closed;
            }
            return;
        }
    };

    loop {
        {
            let mut conn = inner.conn.lock();
            if cancel.is_cancelled() || !conn.should_reconnect {
                return;
            }
            conn.lifecycle = ChannelState::Connecting;
        }

        let opened = tokio::select! {
            _ = cancel.cancelled() => return,
            opened = inner.connector.open(&endpoint) => opened,
        };

        match opened {
            Ok(mut link) => {
                {
                    let mut conn = inner.conn.lock();
                    if cancel.is_cancelled() {
                        return;
                    }
                    conn.lifecycle = ChannelState::Open;
                    conn.attempts = 0;
                    conn.outbound = Some(link.outbound.clone());
                }
                info!("Notification channel open for doctor {}", clinician);

                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => return,
                        event = link.events.recv() => match event {
                            Some(TransportEvent::Message(text)) => handle_frame(&inner, &text),
                            Some(TransportEvent::Closed(reason)) => {
                                warn!(
                                    "Notification link lost: {}",
                                    reason.as_deref().unwrap_or("closed by gateway")
                                );
                                break;
                            }
                            None => {
                                warn!("Notification link lost: transport dropped");
                                break;
                            }
                        },
                    }
                }
            }
            Err(e) => warn!("Failed to reach notification gateway: {}", e),
        }

        // Transport lost. Decide whether a retry gets scheduled. A task
        // that was torn down or superseded meanwhile must not clobber the
        // state its successor owns.
        let delay = {
            let mut conn = inner.conn.lock();
            if cancel.is_cancelled() {
                return;
            }
            conn.lifecycle = ChannelState::Closed;
            conn.outbound = None;
            if !conn.should_reconnect {
                return;
            }
            if conn.attempts >= inner.config.reconnect.max_attempts {
                error!(
                    "Notification gateway unreachable after {} reconnect attempts; giving up",
                    conn.attempts
                );
                return;
            }
            conn.attempts += 1;
            debug!(
                "Scheduling reconnect attempt {} of {}",
                conn.attempts, inner.config.reconnect.max_attempts
            );
            inner.config.reconnect.delay()
        };

        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }
        // `should_reconnect` is re-checked at the top of the loop before
        // the retry actually runs.
    }
}

fn handle_frame(inner: &ChannelInner, text: &str) {
    match EventFrame::decode(text) {
        Ok(frame) => inner.registry.dispatch(&frame),
        Err(e) => warn!("Dropping undecodable notification frame: {}", e),
    }
}

#[cfg(test)]
#[path = "channel_tests.rs"]
mod tests;
