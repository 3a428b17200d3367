//! Shared fixtures for the unit test suites: an in-memory connector and
//! frame builders.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use url::Url;

use wardlink_protocols::{
    AppointmentSnapshot, ChannelError, EventFrame, EventKind, EventPayload,
};

use crate::transport::{Connector, TransportEvent, TransportHandle};

/// Build a frame with the given kind and appointment code.
pub fn frame(kind: EventKind, code: &str) -> EventFrame {
    EventFrame {
        kind,
        payload: EventPayload {
            appointment: AppointmentSnapshot {
                appointment_code: code.to_string(),
                id: None,
                patient_name: None,
                doctor_name: None,
                appointment_date: None,
                time_slot: None,
                status: None,
            },
            message: "m".to_string(),
            order: None,
        },
    }
}

/// Wire text for a frame with the given kind and appointment code.
pub fn frame_text(kind: EventKind, code: &str) -> String {
    frame(kind, code).encode().unwrap()
}

/// Test side of one link opened by the `FakeConnector`.
pub struct FakeLink {
    /// Feeds events into the channel, as the gateway would.
    pub events: mpsc::Sender<TransportEvent>,
    /// Receives whatever the channel wrote to the gateway.
    pub written: mpsc::Receiver<String>,
}

/// In-memory connector: every `open` yields a scripted link the test
/// drives by hand.
#[derive(Default)]
pub struct FakeConnector {
    opens: AtomicUsize,
    fail: AtomicBool,
    urls: Mutex<Vec<String>>,
    links: Mutex<Vec<FakeLink>>,
}

impl FakeConnector {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make every subsequent `open` fail with a connection error.
    pub fn fail_opens(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// How many times `open` was called.
    pub fn open_count(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Endpoints passed to `open`, in order.
    pub fn urls(&self) -> Vec<String> {
        self.urls.lock().clone()
    }

    /// Take the test side of the most recently opened link.
    pub fn last_link(&self) -> FakeLink {
        self.links.lock().pop().expect("no link opened")
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn open(&self, url: &Url) -> Result<TransportHandle, ChannelError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        self.urls.lock().push(url.to_string());
        if self.fail.load(Ordering::SeqCst) {
            return Err(ChannelError::ConnectionFailed("gateway down".to_string()));
        }

        let (event_tx, event_rx) = mpsc::channel(16);
        let (outbound_tx, outbound_rx) = mpsc::channel(16);
        self.links.lock().push(FakeLink {
            events: event_tx,
            written: outbound_rx,
        });
        Ok(TransportHandle {
            outbound: outbound_tx,
            events: event_rx,
        })
    }
}

/// Let spawned channel tasks run; with the paused clock this returns
/// without real waiting.
pub async fn settle() {
    tokio::time::sleep(std::time::Duration::from_millis(1)).await;
}
