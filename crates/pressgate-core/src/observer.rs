//! # Event observers.
//!
//! Provides [`Observer`], the extension point for consumers of admission and watchdog
//! events (structured log journal, metrics).
//!
//! ## Rules
//! - Observers are called synchronously, in registration order, after the admission
//!   lock has been released. Keep `on_event` cheap.
//! - A panicking observer is isolated: the panic is caught and logged, the remaining
//!   observers still see the event.
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use pressgate_model::Event;
use tracing::error;

pub trait Observer: Send + Sync + 'static {
    fn on_event(&self, event: &Event);

    fn name(&self) -> &'static str {
        "observer"
    }
}

/// Immutable, cheaply clonable list of observers.
#[derive(Clone, Default)]
pub struct ObserverSet {
    observers: Arc<[Arc<dyn Observer>]>,
}

impl ObserverSet {
    pub fn new(observers: Vec<Arc<dyn Observer>>) -> Self {
        Self {
            observers: observers.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub fn publish(&self, event: Event) {
        for observer in self.observers.iter() {
            let delivered = catch_unwind(AssertUnwindSafe(|| observer.on_event(&event)));
            if delivered.is_err() {
                error!(
                    observer = observer.name(),
                    event = event.kind.as_str(),
                    "observer panicked while processing an event"
                );
            }
        }
    }
}

impl From<Vec<Arc<dyn Observer>>> for ObserverSet {
    fn from(observers: Vec<Arc<dyn Observer>>) -> Self {
        Self::new(observers)
    }
}
