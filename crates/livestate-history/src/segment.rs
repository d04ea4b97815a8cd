//! State segments: constant-attribute intervals of one entity.

use crate::event::EntityKey;
use crate::live::EntityConfig;
use crate::state::{Attributes, State};
use crate::window::TimeWindow;
use std::sync::{Arc, Weak};

/// Time spent in one state, absolute and as a fraction of the query window.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StateDuration {
    pub duration: i64,
    pub part: f64,
}

/// Per-state duration buckets of a segment, indexed by [`State::index`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StateDurations {
    buckets: [StateDuration; 5],
}

impl StateDurations {
    /// Buckets with the whole `duration` attributed to `state`.
    pub fn single(state: State, duration: i64, part: f64) -> Self {
        let mut durations = Self::default();
        durations.buckets[state.index()] = StateDuration { duration, part };
        durations
    }

    pub fn get(&self, state: State) -> StateDuration {
        self.buckets[state.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (State, StateDuration)> + '_ {
        State::ALL.iter().map(|s| (*s, self.buckets[s.index()]))
    }

    pub fn total(&self) -> i64 {
        self.buckets.iter().map(|b| b.duration).sum()
    }
}

/// One interval `[from, until)` during which an entity kept the same
/// [`Attributes`].
#[derive(Debug, Clone)]
pub struct StateSegment {
    /// Identity captured from the log; survives deletion of the entity
    pub key: EntityKey,
    /// Time and line of the event that opened the segment
    pub time: i64,
    pub lineno: u64,
    pub from: i64,
    pub until: i64,
    pub duration: i64,
    pub duration_part: f64,
    pub durations: StateDurations,
    pub attributes: Attributes,
    pub notification_period: String,
    pub service_period: String,
    /// Presence in the live configuration is not confirmed
    pub may_no_longer_exist: bool,
    /// Last time the entity was known to exist
    pub last_known_time: i64,
    /// Which code path opened the segment
    pub debug_info: String,
    /// Plugin output of the state event that opened the segment
    pub log_output: String,
    /// Service fragments overlapping a host segment
    pub services: Vec<StateSegment>,
    config: Option<Weak<EntityConfig>>,
}

impl StateSegment {
    /// Opens a segment at `from`. It is closed later by [`StateSegment::close`].
    pub fn open(key: EntityKey, from: i64, lineno: u64, attributes: Attributes) -> Self {
        Self {
            key,
            time: from,
            lineno,
            from,
            until: from,
            duration: 0,
            duration_part: 0.0,
            durations: StateDurations::default(),
            attributes,
            notification_period: String::new(),
            service_period: String::new(),
            may_no_longer_exist: false,
            last_known_time: 0,
            debug_info: String::new(),
            log_output: String::new(),
            services: Vec::new(),
            config: None,
        }
    }

    pub fn with_debug_info(mut self, debug_info: &str) -> Self {
        self.debug_info = debug_info.to_string();
        self
    }

    pub fn with_periods(mut self, notification_period: &str, service_period: &str) -> Self {
        self.notification_period = notification_period.to_string();
        self.service_period = service_period.to_string();
        self
    }

    /// Ends the segment at `until` and attributes its whole span to the
    /// bucket of its state.
    pub fn close(&mut self, until: i64, window: &TimeWindow) {
        self.until = until.max(self.from);
        self.duration = self.until - self.from;
        self.duration_part = window.fraction(self.duration);
        self.durations = StateDurations::single(self.state(), self.duration, self.duration_part);
    }

    /// Copy of this segment restricted to `[from, until)`, without children.
    pub fn clip(&self, from: i64, until: i64, window: &TimeWindow) -> StateSegment {
        let mut fragment = StateSegment {
            services: Vec::new(),
            ..self.clone()
        };
        fragment.from = from.max(self.from);
        fragment.close(until.min(self.until), window);
        fragment
    }

    pub fn state(&self) -> State {
        self.attributes.state
    }

    pub fn is_host(&self) -> bool {
        self.key.is_host()
    }

    pub fn host_name(&self) -> &str {
        &self.key.host_name
    }

    pub fn service_description(&self) -> &str {
        self.key.service_description.as_deref().unwrap_or_default()
    }

    pub fn has_vanished(&self) -> bool {
        self.attributes.has_vanished
    }

    pub fn overlaps(&self, from: i64, until: i64) -> bool {
        self.from < until && from < self.until
    }

    /// Live configuration of the entity, if it still exists.
    pub fn config(&self) -> Option<Arc<EntityConfig>> {
        self.config.as_ref().and_then(Weak::upgrade)
    }

    pub fn set_config(&mut self, config: Option<Weak<EntityConfig>>) {
        self.config = config;
    }
}
