// src/scrape/events.rs
//
// In-process observer channel for scheduler notifications. Listeners register
// per event kind on the scheduler instance and are invoked synchronously at
// the emission site; there is no global event bus.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};

use crate::scrape::scheduler::SchedulerStats;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    CycleComplete,
    Error,
    ManualTrigger,
}

#[derive(Debug, Clone)]
pub enum SchedulerEvent {
    CycleComplete {
        articles_added: u64,
        timestamp: DateTime<Utc>,
        stats: SchedulerStats,
    },
    Error {
        error: String,
        retry_count: u32,
        timestamp: DateTime<Utc>,
    },
    ManualTrigger {
        timestamp: DateTime<Utc>,
    },
}

impl SchedulerEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            SchedulerEvent::CycleComplete { .. } => EventKind::CycleComplete,
            SchedulerEvent::Error { .. } => EventKind::Error,
            SchedulerEvent::ManualTrigger { .. } => EventKind::ManualTrigger,
        }
    }
}

pub type EventListener = Box<dyn Fn(&SchedulerEvent) + Send + Sync>;

#[derive(Default)]
pub struct ListenerRegistry {
    inner: Mutex<HashMap<EventKind, Vec<EventListener>>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on(&self, kind: EventKind, listener: EventListener) {
        self.inner
            .lock()
            .expect("listener mutex poisoned")
            .entry(kind)
            .or_default()
            .push(listener);
    }

    pub fn emit(&self, event: &SchedulerEvent) {
        let map = self.inner.lock().expect("listener mutex poisoned");
        if let Some(listeners) = map.get(&event.kind()) {
            for listener in listeners {
                listener(event);
            }
        }
    }
}
