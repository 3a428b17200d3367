//! Consumer-facing subscription binding.
//!
//! A `Subscription` registers one stable trampoline per event kind it
//! cares about; the trampoline forwards to whatever handler currently
//! occupies that kind's slot. Consumers swap handlers as often as they
//! like without touching the registry, and dropping the subscription
//! removes exactly the entries it added.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use wardlink_protocols::{EventFrame, EventKind};

use crate::channel::NotifyChannel;
use crate::registry::ListenerId;

/// Handler invoked with every frame of the kind it was bound to.
pub type EventHandler = Arc<dyn Fn(&EventFrame) + Send + Sync>;

/// Optional per-kind handlers for one subscription.
///
/// Only kinds with a handler present get registered; the rest are never
/// subscribed, so their frames cost the consumer nothing.
#[derive(Default, Clone)]
pub struct AppointmentHandlers {
    new: Option<EventHandler>,
    update: Option<EventHandler>,
    cancel: Option<EventHandler>,
}

impl AppointmentHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle newly created appointments.
    pub fn on_new<F>(mut self, handler: F) -> Self
    where
        F: Fn(&EventFrame) + Send + Sync + 'static,
    {
        self.new = Some(Arc::new(handler));
        self
    }

    /// Handle rescheduled or modified appointments.
    pub fn on_update<F>(mut self, handler: F) -> Self
    where
        F: Fn(&EventFrame) + Send + Sync + 'static,
    {
        self.update = Some(Arc::new(handler));
        self
    }

    /// Handle cancelled appointments.
    pub fn on_cancel<F>(mut self, handler: F) -> Self
    where
        F: Fn(&EventFrame) + Send + Sync + 'static,
    {
        self.cancel = Some(Arc::new(handler));
        self
    }

    fn get(&self, kind: EventKind) -> Option<EventHandler> {
        match kind {
            EventKind::NewAppointment => self.new.clone(),
            EventKind::UpdateAppointment => self.update.clone(),
            EventKind::CancelAppointment => self.cancel.clone(),
        }
    }
}

/// Current-handler slots shared between a subscription and its
/// trampolines.
#[derive(Default)]
struct HandlerSlots {
    new: Mutex<Option<EventHandler>>,
    update: Mutex<Option<EventHandler>>,
    cancel: Mutex<Option<EventHandler>>,
}

impl HandlerSlots {
    fn slot(&self, kind: EventKind) -> &Mutex<Option<EventHandler>> {
        match kind {
            EventKind::NewAppointment => &self.new,
            EventKind::UpdateAppointment => &self.update,
            EventKind::CancelAppointment => &self.cancel,
        }
    }

    /// Clone the current handler out of the slot so invocation happens
    /// without the slot lock held; a handler may then swap slots itself.
    fn current(&self, kind: EventKind) -> Option<EventHandler> {
        self.slot(kind).lock().clone()
    }
}

/// One consumer's binding to the notification channel.
///
/// The set of registered kinds is fixed at creation; handler closures can
/// be swapped afterwards via [`Subscription::update_handlers`]. Dropping
/// the subscription deregisters exactly the kinds it registered, leaving
/// sibling subscriptions untouched.
pub struct Subscription {
    channel: NotifyChannel,
    slots: Arc<HandlerSlots>,
    registered: Vec<(EventKind, ListenerId)>,
}

impl NotifyChannel {
    /// Bind `handlers` to this channel.
    ///
    /// Registers one trampoline per provided kind; omitted kinds are never
    /// subscribed.
    pub fn subscribe(&self, handlers: AppointmentHandlers) -> Subscription {
        let slots = Arc::new(HandlerSlots::default());
        let mut registered = Vec::new();

        for kind in EventKind::ALL {
            let Some(handler) = handlers.get(kind) else {
                continue;
            };
            *slots.slot(kind).lock() = Some(handler);

            let slots = slots.clone();
            let id = self.on(kind, move |frame| {
                if let Some(handler) = slots.current(kind) {
                    handler(frame);
                }
            });
            registered.push((kind, id));
        }

        Subscription {
            channel: self.clone(),
            slots,
            registered,
        }
    }
}

impl Subscription {
    /// Swap in the latest handler closures without re-registering.
    ///
    /// Kinds that had no handler at subscribe time stay unsubscribed; a
    /// handler supplied for such a kind is ignored. Setting a registered
    /// kind's handler to `None` mutes it until a later swap restores one.
    pub fn update_handlers(&self, handlers: AppointmentHandlers) {
        for kind in EventKind::ALL {
            let handler = handlers.get(kind);
            if self.registered.iter().any(|(k, _)| *k == kind) {
                *self.slots.slot(kind).lock() = handler;
            } else if handler.is_some() {
                debug!("Ignoring handler for unsubscribed kind {:?}", kind);
            }
        }
    }

    /// Kinds this subscription registered, in wire-tag order.
    pub fn kinds(&self) -> Vec<EventKind> {
        self.registered.iter().map(|(kind, _)| *kind).collect()
    }

    /// Whether the underlying gateway link is open.
    pub fn is_connected(&self) -> bool {
        self.channel.is_connected()
    }

    /// Queue a message for the gateway (best-effort passthrough).
    pub fn send<T: Serialize>(&self, message: &T) {
        self.channel.send(message)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        for (kind, id) in self.registered.drain(..) {
            self.channel.off(kind, id);
        }
    }
}

#[cfg(test)]
#[path = "subscription_tests.rs"]
mod tests;
