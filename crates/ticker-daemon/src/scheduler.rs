//! Bottom-bar rotation: which category, which sub-view and which weather
//! city is on screen.
//!
//! The scheduler owns the rotation pointer and arms/cancels the rotation
//! timer slots whenever the pointer moves. It never flips the bar itself:
//! anything that should be animated comes back to the core as a
//! [`BarMutation`] to push through the bar gate.

use std::time::Duration;

use tracing::{debug, info};

use ticker_proto::config::ScheduleConfig;
use ticker_proto::protocol::{CategoryData, InfoCategory, SubView, ROTATION_ORDER};

use crate::timers::{TimerRegistry, TimerSlot, ROTATION_SLOTS};

/// Mutation carried by a bottom-bar flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarMutation {
    /// First appearance of the bar after data arrives.
    Reveal,
    /// Move to the next available category.
    Advance,
}

#[derive(Debug, Clone, Copy)]
pub struct RotationTiming {
    pub weather_city: Duration,
    pub category_dwell: Duration,
    pub sub_view_toggle: Duration,
}

impl From<&ScheduleConfig> for RotationTiming {
    fn from(schedule: &ScheduleConfig) -> Self {
        Self {
            weather_city: schedule.weather_city(),
            category_dwell: schedule.category_dwell(),
            sub_view_toggle: schedule.sub_view_toggle(),
        }
    }
}

#[derive(Debug)]
pub struct RotationScheduler {
    timing: RotationTiming,
    active: Option<InfoCategory>,
    sub_view: SubView,
    item_index: usize,
}

/// The category following `current` in rotation order among those with
/// data, wrapping around. With no current category, the first available.
pub fn next_available(current: Option<InfoCategory>, data: &CategoryData) -> Option<InfoCategory> {
    let start = current
        .and_then(|c| ROTATION_ORDER.iter().position(|o| *o == c))
        .map_or(0, |pos| pos + 1);
    (0..ROTATION_ORDER.len())
        .map(|offset| ROTATION_ORDER[(start + offset) % ROTATION_ORDER.len()])
        .find(|c| data.is_available(*c))
}

impl RotationScheduler {
    pub fn new(timing: RotationTiming) -> Self {
        Self {
            timing,
            active: None,
            sub_view: SubView::Domestic,
            item_index: 0,
        }
    }

    pub fn active(&self) -> Option<InfoCategory> {
        self.active
    }

    pub fn sub_view(&self) -> SubView {
        self.sub_view
    }

    pub fn item_index(&self) -> usize {
        self.item_index
    }

    /// Midpoint of a bar flip.
    pub fn apply_bar(&mut self, mutation: BarMutation, data: &CategoryData, timers: &mut TimerRegistry) {
        let target = match mutation {
            BarMutation::Reveal => next_available(None, data),
            BarMutation::Advance => next_available(self.active, data),
        };
        match target {
            Some(category) => self.enter(category, timers),
            None => self.stop(timers),
        }
    }

    /// A bar flip is starting; the dwell that may have requested it is done.
    pub fn on_flip_started(&mut self, timers: &mut TimerRegistry) {
        timers.cancel(TimerSlot::Dwell);
    }

    /// The bar gate is idle again.
    pub fn on_settled(&mut self, timers: &mut TimerRegistry) {
        self.arm_dwell(timers);
    }

    /// Weather city step. Returns true when the last city wrapped and the
    /// outer rotation should advance.
    pub fn on_city_tick(&mut self, weather_len: usize) -> bool {
        if self.active != Some(InfoCategory::Weather) {
            return false;
        }
        if self.item_index + 1 >= weather_len {
            self.item_index = 0;
            true
        } else {
            self.item_index += 1;
            false
        }
    }

    pub fn on_sub_view_tick(&mut self) {
        if self.active.is_some_and(InfoCategory::has_sub_views) {
            self.sub_view = self.sub_view.toggled();
        }
    }

    /// Reconcile with freshly replaced category data. Returns the flip to
    /// request, if any.
    pub fn on_data_changed(
        &mut self,
        data: &CategoryData,
        bar_idle: bool,
        timers: &mut TimerRegistry,
    ) -> Option<BarMutation> {
        if data.available().is_empty() {
            if self.active.is_some() {
                info!("[rotation] no category has data, stopping");
            }
            self.stop(timers);
            return None;
        }

        let Some(active) = self.active else {
            return Some(BarMutation::Reveal);
        };

        if !data.is_available(active) {
            if let Some(next) = next_available(Some(active), data) {
                info!("[rotation] {:?} lost its data, moving to {:?}", active, next);
                self.enter(next, timers);
                if bar_idle {
                    self.arm_dwell(timers);
                }
            }
        } else if active == InfoCategory::Weather && self.item_index >= data.weather_len() {
            self.item_index = 0;
        }
        None
    }

    fn enter(&mut self, category: InfoCategory, timers: &mut TimerRegistry) {
        debug!("[rotation] enter {:?}", category);
        timers.cancel_all(&ROTATION_SLOTS);
        self.active = Some(category);
        self.sub_view = SubView::Domestic;
        self.item_index = 0;
        if category == InfoCategory::Weather {
            timers.arm_interval(TimerSlot::CityAdvance, self.timing.weather_city);
        }
        if category.has_sub_views() {
            timers.arm_interval(TimerSlot::SubViewToggle, self.timing.sub_view_toggle);
        }
    }

    fn arm_dwell(&mut self, timers: &mut TimerRegistry) {
        match self.active {
            Some(category) if category != InfoCategory::Weather => {
                timers.arm_timeout(TimerSlot::Dwell, self.timing.category_dwell);
            }
            _ => {}
        }
    }

    fn stop(&mut self, timers: &mut TimerRegistry) {
        timers.cancel_all(&ROTATION_SLOTS);
        self.active = None;
        self.sub_view = SubView::Domestic;
        self.item_index = 0;
    }
}
