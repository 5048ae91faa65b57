//! Named timer slots owned by the core.
//!
//! Every slot holds at most one live task. Arming a slot aborts whatever was
//! there and stamps the new task with a fresh generation; firings travel to
//! the core as [`CoreEvent::Timer`] and are only honoured if their
//! generation is still the armed one, so a firing that was already queued
//! when its slot got re-armed or cancelled is dropped.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use crate::core::CoreEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerSlot {
    /// Hourly background refresh.
    Refresh,
    /// Weather city step.
    CityAdvance,
    /// One-shot dwell on a non-weather category.
    Dwell,
    /// Domestic/world alternation.
    SubViewToggle,
}

/// Slots tied to the active category; torn down together when it changes.
pub const ROTATION_SLOTS: [TimerSlot; 3] = [
    TimerSlot::CityAdvance,
    TimerSlot::Dwell,
    TimerSlot::SubViewToggle,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerFired {
    pub slot: TimerSlot,
    pub generation: u64,
}

struct Armed {
    generation: u64,
    repeating: bool,
    handle: JoinHandle<()>,
}

pub struct TimerRegistry {
    tx: mpsc::Sender<CoreEvent>,
    armed: HashMap<TimerSlot, Armed>,
    generation: u64,
}

impl TimerRegistry {
    pub fn new(tx: mpsc::Sender<CoreEvent>) -> Self {
        Self {
            tx,
            armed: HashMap::new(),
            generation: 0,
        }
    }

    /// Fire every `period`, first firing one period from now.
    pub fn arm_interval(&mut self, slot: TimerSlot, period: Duration) {
        let generation = self.next_generation(slot);
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                let fired = TimerFired { slot, generation };
                if tx.send(CoreEvent::Timer(fired)).await.is_err() {
                    break;
                }
            }
        });
        self.armed.insert(
            slot,
            Armed {
                generation,
                repeating: true,
                handle,
            },
        );
    }

    /// Fire once after `delay`.
    pub fn arm_timeout(&mut self, slot: TimerSlot, delay: Duration) {
        let generation = self.next_generation(slot);
        let tx = self.tx.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx
                .send(CoreEvent::Timer(TimerFired { slot, generation }))
                .await;
        });
        self.armed.insert(
            slot,
            Armed {
                generation,
                repeating: false,
                handle,
            },
        );
    }

    pub fn cancel(&mut self, slot: TimerSlot) {
        if let Some(armed) = self.armed.remove(&slot) {
            debug!("[timers] cancel {:?} gen={}", slot, armed.generation);
            armed.handle.abort();
        }
    }

    pub fn cancel_all(&mut self, slots: &[TimerSlot]) {
        for slot in slots {
            self.cancel(*slot);
        }
    }

    pub fn is_armed(&self, slot: TimerSlot) -> bool {
        self.armed.contains_key(&slot)
    }

    /// Whether a firing belongs to the currently armed task. A one-shot slot
    /// is released once its firing is accepted.
    pub fn accept(&mut self, fired: TimerFired) -> bool {
        let current = match self.armed.get(&fired.slot) {
            Some(armed) if armed.generation == fired.generation => armed.repeating,
            _ => {
                debug!("[timers] drop stale {:?} gen={}", fired.slot, fired.generation);
                return false;
            }
        };
        if !current {
            self.armed.remove(&fired.slot);
        }
        true
    }

    fn next_generation(&mut self, slot: TimerSlot) -> u64 {
        self.cancel(slot);
        self.generation += 1;
        self.generation
    }
}

impl Drop for TimerRegistry {
    fn drop(&mut self) {
        for (_, armed) in self.armed.drain() {
            armed.handle.abort();
        }
    }
}
