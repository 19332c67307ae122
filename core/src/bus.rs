//! In-process event bus decoupling ingestion from downstream consumers.
//!
//! RULE: handlers are matched by exact event kind. A handler subscribed
//! to `EventKind::Customer` never receives account or transaction
//! events, and there is no wildcard subscription.
//!
//! `publish` fans out to all subscribed handlers concurrently and joins
//! before returning. One handler's failure does not stop the others;
//! the first failure is surfaced to the publisher after all handlers
//! have run.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::{
    error::{C360Error, C360Result},
    event::{DomainEvent, EventHandler, EventKind, EventPublisher},
};

#[derive(Default)]
pub struct InMemoryEventBus {
    handlers: Mutex<HashMap<EventKind, Vec<Arc<dyn EventHandler>>>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<EventKind, Vec<Arc<dyn EventHandler>>>> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe(&self, kind: EventKind, handler: Arc<dyn EventHandler>) {
        self.lock().entry(kind).or_default().push(handler);
        log::debug!("handler subscribed for {kind}");
    }

    /// Remove a previously subscribed handler, matched by identity.
    pub fn unsubscribe(&self, kind: EventKind, handler: &Arc<dyn EventHandler>) {
        if let Some(list) = self.lock().get_mut(&kind) {
            list.retain(|h| !Arc::ptr_eq(h, handler));
        }
    }

    /// Number of handlers currently subscribed for a kind (test helper).
    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.lock().get(&kind).map_or(0, Vec::len)
    }

    /// Publish one event to all handlers subscribed for its exact kind.
    /// No subscribers is a no-op, not an error.
    pub fn publish(&self, event: &DomainEvent) -> C360Result<()> {
        let kind = event.kind();

        // Snapshot under the lock, dispatch outside it. A handler that
        // subscribes or unsubscribes during its own invocation sees the
        // change on the next publish.
        let snapshot: Vec<Arc<dyn EventHandler>> = match self.lock().get(&kind) {
            Some(list) => list.clone(),
            None => return Ok(()),
        };
        if snapshot.is_empty() {
            return Ok(());
        }

        let mut first_failure: Option<String> = None;
        std::thread::scope(|scope| {
            let joins: Vec<_> = snapshot
                .iter()
                .map(|handler| scope.spawn(move || handler.handle(event)))
                .collect();

            for join in joins {
                let outcome = match join.join() {
                    Ok(outcome) => outcome,
                    Err(_) => Err(anyhow::anyhow!("handler panicked")),
                };
                if let Err(e) = outcome {
                    log::warn!("event handler failed for {kind}: {e}");
                    if first_failure.is_none() {
                        first_failure = Some(e.to_string());
                    }
                }
            }
        });

        match first_failure {
            Some(message) => Err(C360Error::HandlerFailed {
                event_kind: kind,
                message,
            }),
            None => Ok(()),
        }
    }

    /// Publish a batch of events. Each event is independent; there is no
    /// all-or-nothing guarantee. The first failure is surfaced after all
    /// events have been dispatched.
    pub fn publish_batch(&self, events: &[DomainEvent]) -> C360Result<()> {
        let mut first_failure = None;
        for event in events {
            if let Err(e) = self.publish(event) {
                first_failure.get_or_insert(e);
            }
        }
        match first_failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl EventPublisher for InMemoryEventBus {
    fn publish(&self, event: &DomainEvent) -> C360Result<()> {
        InMemoryEventBus::publish(self, event)
    }

    fn publish_batch(&self, events: &[DomainEvent]) -> C360Result<()> {
        InMemoryEventBus::publish_batch(self, events)
    }
}
