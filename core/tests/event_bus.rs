//! Event bus tests: exact-kind matching, fan-out, failure isolation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use c360_core::bus::InMemoryEventBus;
use c360_core::error::C360Error;
use c360_core::event::{
    CustomerAction, DomainEvent, EventHandler, EventKind, EventPayload,
};
use c360_core::types::Gcid;

struct Counting {
    seen: AtomicUsize,
}

impl Counting {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            seen: AtomicUsize::new(0),
        })
    }
}

impl EventHandler for Counting {
    fn handle(&self, _event: &DomainEvent) -> anyhow::Result<()> {
        self.seen.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct Failing;

impl EventHandler for Failing {
    fn handle(&self, _event: &DomainEvent) -> anyhow::Result<()> {
        anyhow::bail!("downstream unavailable")
    }
}

fn customer_event() -> DomainEvent {
    DomainEvent::new(
        "Core Banking System",
        EventPayload::Customer {
            gcid: Gcid::new(),
            local_customer_id: "CB001".into(),
            national_id: Some("12345678".into()),
            phone: None,
            email: None,
            first_name: "John".into(),
            last_name: "Doe".into(),
            action: CustomerAction::Created,
        },
    )
}

fn login_event() -> DomainEvent {
    DomainEvent::new(
        "Mobile Banking",
        EventPayload::Login {
            gcid: Gcid::new(),
            channel: "Mobile".into(),
            successful: true,
            device_info: None,
            ip_address: None,
        },
    )
}

/// Publishing with no subscribers succeeds and does nothing.
#[test]
fn publish_without_subscribers_is_ok() {
    let bus = InMemoryEventBus::new();
    bus.publish(&customer_event()).unwrap();
}

/// Handlers receive only their exact kind.
#[test]
fn handlers_match_exact_kind_only() {
    let bus = InMemoryEventBus::new();
    let customer_handler = Counting::new();
    let login_handler = Counting::new();

    bus.subscribe(EventKind::Customer, customer_handler.clone());
    bus.subscribe(EventKind::Login, login_handler.clone());

    bus.publish(&customer_event()).unwrap();
    bus.publish(&customer_event()).unwrap();
    bus.publish(&login_event()).unwrap();

    assert_eq!(customer_handler.seen.load(Ordering::SeqCst), 2);
    assert_eq!(login_handler.seen.load(Ordering::SeqCst), 1);
}

/// Every subscriber for a kind receives each event.
#[test]
fn all_subscribers_receive_the_event() {
    let bus = InMemoryEventBus::new();
    let a = Counting::new();
    let b = Counting::new();
    bus.subscribe(EventKind::Customer, a.clone());
    bus.subscribe(EventKind::Customer, b.clone());

    bus.publish(&customer_event()).unwrap();

    assert_eq!(a.seen.load(Ordering::SeqCst), 1);
    assert_eq!(b.seen.load(Ordering::SeqCst), 1);
}

/// One failing handler does not starve the others; the failure is
/// surfaced to the publisher after all handlers ran.
#[test]
fn failing_handler_does_not_block_others() {
    let bus = InMemoryEventBus::new();
    let counting = Counting::new();
    bus.subscribe(EventKind::Customer, Arc::new(Failing));
    bus.subscribe(EventKind::Customer, counting.clone());

    let err = bus.publish(&customer_event()).unwrap_err();
    match err {
        C360Error::HandlerFailed { event_kind, message } => {
            assert_eq!(event_kind, EventKind::Customer);
            assert!(message.contains("downstream unavailable"), "got: {message}");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(
        counting.seen.load(Ordering::SeqCst),
        1,
        "healthy handler must still run"
    );
}

/// Unsubscribe removes exactly the given handler.
#[test]
fn unsubscribe_removes_handler() {
    let bus = InMemoryEventBus::new();
    let a = Counting::new();
    let b = Counting::new();
    let a_dyn: Arc<dyn EventHandler> = a.clone();
    bus.subscribe(EventKind::Customer, a_dyn.clone());
    bus.subscribe(EventKind::Customer, b.clone());
    assert_eq!(bus.handler_count(EventKind::Customer), 2);

    bus.unsubscribe(EventKind::Customer, &a_dyn);
    assert_eq!(bus.handler_count(EventKind::Customer), 1);

    bus.publish(&customer_event()).unwrap();
    assert_eq!(a.seen.load(Ordering::SeqCst), 0);
    assert_eq!(b.seen.load(Ordering::SeqCst), 1);
}

/// A batch dispatches every event even when one of them fails.
#[test]
fn publish_batch_continues_past_failures() {
    let bus = InMemoryEventBus::new();
    let logins = Counting::new();
    bus.subscribe(EventKind::Customer, Arc::new(Failing));
    bus.subscribe(EventKind::Login, logins.clone());

    let events = vec![customer_event(), login_event(), login_event()];
    let err = bus.publish_batch(&events).unwrap_err();
    assert!(matches!(err, C360Error::HandlerFailed { .. }));
    assert_eq!(
        logins.seen.load(Ordering::SeqCst),
        2,
        "later events must still be dispatched"
    );
}
