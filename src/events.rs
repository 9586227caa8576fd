//! Typed event bus for the brewing session
//! Synchronous fan-out to registered observers; publish is fire-and-forget.

use crate::types::{BrewStep, MainTab, ParameterInfo};
use log::debug;

// === EVENT HIERARCHY ===

/// Top-level session event - everything the UI listens to flows through this
#[derive(Debug, Clone)]
pub enum SessionEvent {
    // Navigation
    StepChanged { from: BrewStep, to: BrewStep },
    MainTabChanged { tab: MainTab },

    // Parameter bar
    ParamsUpdated { info: ParameterInfo },

    // Selection milestones
    EquipmentSelected { id: String },
    MethodSelected { name: String },
    CoffeeBeanSelected { id: String },

    // Note form signals
    NoteFormShow,
    NoteFormClose,
    NoteSaved { id: String },

    // Timer milestones
    CountdownTick { remaining: u32 },
    TimerStarted,
    TimerPaused,
    TimerResumed,
    StageAdvanced { from: usize, to: usize },
    BrewFinished { total_time_s: u32 },
}

// === OBSERVER BUS ===

pub type SubscriberId = usize;

type Observer = Box<dyn Fn(&SessionEvent)>;

/// One-to-many observer channel. Publication is synchronous and happens only
/// after the mutating call has committed all of its state, so observers never
/// see a partial transition.
pub struct EventBus {
    subscribers: Vec<(SubscriberId, Observer)>,
    next_id: SubscriberId,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
            next_id: 0,
        }
    }

    pub fn subscribe<F>(&mut self, observer: F) -> SubscriberId
    where
        F: Fn(&SessionEvent) + 'static,
    {
        let id = self.next_id;
        self.next_id += 1;
        self.subscribers.push((id, Box::new(observer)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriberId) {
        self.subscribers.retain(|(sub_id, _)| *sub_id != id);
    }

    /// Publish an event to every subscriber. No backpressure, no subscriber
    /// count dependency - zero subscribers is fine.
    pub fn publish(&self, event: SessionEvent) {
        debug!("📡 Publishing: {:?}", event);
        for (_, observer) in &self.subscribers {
            observer(&event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
