//! Counters exported through the `metrics` facade. Without an installed
//! recorder they are no-ops.

pub const EVENTS_SKIPPED_TOTAL: &str = "livestate_history_events_skipped_total";
pub const SEGMENTS_TOTAL: &str = "livestate_history_segments_total";
pub const LOG_LINES_MALFORMED_TOTAL: &str = "livestate_log_lines_malformed_total";

/// Registers descriptions for all history counters.
pub fn describe() {
    metrics::describe_counter!(
        EVENTS_SKIPPED_TOTAL,
        "Out-of-order log events skipped during reconstruction"
    );
    metrics::describe_counter!(SEGMENTS_TOTAL, "State segments produced by reconstruction");
    metrics::describe_counter!(
        LOG_LINES_MALFORMED_TOTAL,
        "Log lines with a known prefix that could not be parsed"
    );
}

pub(crate) fn event_skipped() {
    metrics::counter!(EVENTS_SKIPPED_TOTAL).increment(1);
}

pub(crate) fn segments_produced(count: usize) {
    metrics::counter!(SEGMENTS_TOTAL).increment(count as u64);
}

pub(crate) fn line_malformed() {
    metrics::counter!(LOG_LINES_MALFORMED_TOTAL).increment(1);
}
