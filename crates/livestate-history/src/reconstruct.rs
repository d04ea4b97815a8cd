//! Per-entity replay of an [`EntityStream`] into closed [`StateSegment`]s.
//!
//! The reconstruction is a two-state machine: before the window opens it
//! only folds changes into the attribute tuple the first segment will
//! start with; afterwards every timestamp group whose resulting tuple
//! differs from the open segment closes it and opens a new one.

use crate::demux::{Change, EntityEvent, EntityStream};
use crate::live::LiveConfig;
use crate::segment::StateSegment;
use crate::state::Attributes;
use crate::stats;
use crate::window::TimeWindow;
use std::sync::Arc;
use tracing::{debug, trace};

// ============================================================================
// Builder
// ============================================================================

struct SegmentBuilder<'a> {
    stream: &'a EntityStream,
    window: TimeWindow,
    pending: Attributes,
    may_no_longer_exist: bool,
    last_known_time: i64,
    log_output: String,
    last_time: Option<i64>,
    last_lineno: u64,
    open: Option<StateSegment>,
    closed: Vec<StateSegment>,
}

impl<'a> SegmentBuilder<'a> {
    fn new(stream: &'a EntityStream, window: TimeWindow) -> Self {
        Self {
            stream,
            window,
            pending: Attributes::default(),
            may_no_longer_exist: false,
            last_known_time: 0,
            log_output: String::new(),
            last_time: None,
            last_lineno: 0,
            open: None,
            closed: Vec::new(),
        }
    }

    fn is_out_of_order(&self, event: &EntityEvent) -> bool {
        self.last_time.is_some_and(|last| event.time < last)
    }

    fn apply(&mut self, event: &EntityEvent) {
        if event.time > self.window.start() {
            self.ensure_open();
        }
        self.last_time = Some(event.time);
        self.last_lineno = event.lineno;

        let t = event.time;
        let attrs = &mut self.pending;
        match &event.change {
            Change::State { state, output, .. } => {
                attrs.state = *state;
                attrs.has_vanished = false;
                self.may_no_longer_exist = false;
                self.last_known_time = t;
                self.log_output.clone_from(output);
            }
            Change::Downtime(active) => {
                attrs.in_downtime = *active;
                self.last_known_time = t;
            }
            Change::HostDowntime(active) => attrs.in_host_downtime = *active,
            Change::Flapping(active) => {
                attrs.is_flapping = *active;
                self.last_known_time = t;
            }
            Change::NotificationPeriod(active) => attrs.in_notification_period = *active,
            Change::ServicePeriod(active) => attrs.in_service_period = *active,
            Change::HostDown(down) => attrs.host_down = *down,
            Change::PresenceUnconfirmed => self.may_no_longer_exist = true,
            Change::Vanished => {
                *attrs = attrs.vanished();
                self.may_no_longer_exist = true;
                self.log_output.clear();
            }
            Change::Removed => {
                *attrs = attrs.vanished();
                self.may_no_longer_exist = true;
                self.last_known_time = t;
                self.log_output.clear();
            }
        }
    }

    /// Called after the last event of a timestamp group.
    fn commit(&mut self, event: &EntityEvent) {
        let t = event.time;
        if t <= self.window.start() {
            return;
        }
        let Some(open) = self.open.as_mut() else {
            return;
        };

        if open.attributes != self.pending {
            let label = event.change.label();
            let reverted = self
                .closed
                .last()
                .is_some_and(|prev| prev.attributes == self.pending);
            if open.from == t && reverted {
                // the change opened at t was undone at t
                if let Some(prev) = self.closed.pop() {
                    *open = prev;
                }
            } else if open.from == t {
                open.attributes = self.pending;
                open.debug_info = label.to_string();
                open.log_output.clone_from(&self.log_output);
            } else {
                let next = StateSegment::open(self.stream.key.clone(), t, event.lineno, self.pending)
                    .with_debug_info(label);
                let mut done = std::mem::replace(open, next);
                done.close(t, &self.window);
                trace!(entity = %self.stream.key, from = done.from, until = t, state = %done.state(), "segment closed");
                self.closed.push(done);
                open.log_output.clone_from(&self.log_output);
            }
        }
        open.may_no_longer_exist = self.may_no_longer_exist;
        open.last_known_time = self.last_known_time;
    }

    /// Opens the segment starting at the window start from what is known
    /// at that instant.
    fn ensure_open(&mut self) {
        if self.open.is_some() {
            return;
        }
        let mut segment = StateSegment::open(
            self.stream.key.clone(),
            self.window.start(),
            self.last_lineno,
            self.pending,
        )
        .with_debug_info("WINDOW OPEN");
        segment.may_no_longer_exist = self.may_no_longer_exist;
        segment.last_known_time = self.last_known_time;
        segment.log_output.clone_from(&self.log_output);
        self.open = Some(segment);
    }

    fn finish(mut self, live: Option<&dyn LiveConfig>) -> Vec<StateSegment> {
        if self.last_time.is_none() {
            return Vec::new();
        }
        self.ensure_open();

        let mut segments = std::mem::take(&mut self.closed);
        if let Some(mut last) = self.open.take() {
            if live.is_some_and(|live| !live.exists(&self.stream.key)) {
                last.may_no_longer_exist = true;
            }
            last.close(self.window.end(), &self.window);
            segments.push(last);
        }

        let config = self.stream.config.as_ref().map(Arc::downgrade);
        for segment in &mut segments {
            segment.notification_period.clone_from(&self.stream.notification_period);
            segment.service_period.clone_from(&self.stream.service_period);
            segment.set_config(config.clone());
        }
        stats::segments_produced(segments.len());
        segments
    }
}

// ============================================================================
// Entry point
// ============================================================================

/// Replays `stream` over `window`.
///
/// The result covers `[window.start, window.end)` without gaps, or is empty
/// if the stream has no usable event before the window end. Events earlier
/// than an already processed one are skipped.
pub fn reconstruct(
    stream: &EntityStream,
    window: &TimeWindow,
    live: Option<&dyn LiveConfig>,
) -> Vec<StateSegment> {
    let mut builder = SegmentBuilder::new(stream, *window);
    let mut events = stream.events.iter().peekable();

    while let Some(event) = events.next() {
        if event.time >= window.end() {
            break;
        }
        if builder.is_out_of_order(event) {
            debug!(
                entity = %stream.key,
                time = event.time,
                lineno = event.lineno,
                last = ?builder.last_time,
                "skipping out-of-order log event"
            );
            stats::event_skipped();
            continue;
        }

        builder.apply(event);
        let group_ends = events.peek().map_or(true, |next| next.time != event.time);
        if group_ends {
            builder.commit(event);
        }
    }

    builder.finish(live)
}
