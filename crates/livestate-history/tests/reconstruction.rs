//! Black-box tests of the reconstruction through the query engine.

use livestate_common::HistoryConfig;
use livestate_history::{
    EntityKey, HistoryEngine, HistoryQuery, LogEvent, LogEventKind, MemoryLogSource, QueryScope,
    State, StateSegment, TimeWindow,
};
use proptest::prelude::*;

fn run(events: Vec<LogEvent>, start: i64, end: i64) -> Vec<StateSegment> {
    let engine = HistoryEngine::new(HistoryConfig::default());
    let query = HistoryQuery::new(TimeWindow::new(start, end).unwrap());
    engine.run(&MemoryLogSource::new(events), &query).unwrap()
}

fn spans(segments: &[StateSegment]) -> Vec<(i64, i64, State, i64)> {
    segments
        .iter()
        .map(|s| (s.from, s.until, s.state(), s.duration))
        .collect()
}

#[test]
fn test_end_to_end_three_segments() {
    let segments = run(
        vec![
            LogEvent::service_state(0, "web01", "HTTP", State::Ok),
            LogEvent::service_state(40, "web01", "HTTP", State::Critical),
            LogEvent::service_state(90, "web01", "HTTP", State::Ok),
        ],
        0,
        100,
    );
    assert_eq!(
        spans(&segments),
        vec![
            (0, 40, State::Ok, 40),
            (40, 90, State::Critical, 50),
            (90, 100, State::Ok, 10),
        ]
    );

    let total = |state| -> i64 {
        segments
            .iter()
            .map(|s| s.durations.get(state).duration)
            .sum()
    };
    assert_eq!(total(State::Ok), 50);
    assert_eq!(total(State::Critical), 50);
    assert_eq!(total(State::Warning), 0);
}

#[test]
fn test_identical_events_absorbed() {
    let segments = run(
        vec![
            LogEvent::service_state(0, "h", "s", State::Warning),
            LogEvent::service_state(20, "h", "s", State::Warning),
            LogEvent::service_state(60, "h", "s", State::Warning),
        ],
        0,
        100,
    );
    assert_eq!(spans(&segments), vec![(0, 100, State::Warning, 100)]);
}

#[test]
fn test_removed_entity_segment() {
    let segments = run(
        vec![
            LogEvent::host_state(0, "h", State::Ok),
            LogEvent::new(
                30,
                12,
                LogEventKind::EntityRemoved {
                    key: EntityKey::host("h"),
                },
            ),
        ],
        0,
        100,
    );
    assert_eq!(segments.len(), 2);
    let gone = &segments[1];
    assert!(gone.has_vanished());
    assert_eq!(gone.last_known_time, 30);
    assert_eq!((gone.from, gone.until), (30, 100));
    assert_eq!(gone.debug_info, "REMOVED");
}

#[test]
fn test_restart_without_initial_state_vanishes() {
    let initial = |time, service: &str| {
        LogEvent::new(
            time,
            0,
            LogEventKind::ServiceState {
                host: "h".into(),
                service: service.into(),
                state: State::Ok,
                initial: true,
                output: String::new(),
            },
        )
    };
    let segments = run(
        vec![
            initial(0, "kept"),
            initial(0, "dropped"),
            LogEvent::new(50, 0, LogEventKind::CoreStarting),
            initial(50, "kept"),
            LogEvent::service_state(60, "h", "kept", State::Critical),
        ],
        0,
        100,
    );

    let dropped: Vec<_> = segments
        .iter()
        .filter(|s| s.service_description() == "dropped")
        .collect();
    assert_eq!(dropped.len(), 2);
    assert!(dropped[0].may_no_longer_exist);
    assert!(!dropped[0].has_vanished());
    assert!(dropped[1].has_vanished());
    assert_eq!((dropped[1].from, dropped[1].last_known_time), (60, 0));

    let kept: Vec<_> = segments
        .iter()
        .filter(|s| s.service_description() == "kept")
        .collect();
    assert!(kept.iter().all(|s| !s.has_vanished()));
    assert!(!kept.last().unwrap().may_no_longer_exist);
}

#[test]
fn test_host_down_splits_service_history() {
    let segments = run(
        vec![
            LogEvent::host_state(0, "h", State::Ok),
            LogEvent::service_state(0, "h", "s", State::Ok),
            LogEvent::host_state(25, "h", State::Warning),
            LogEvent::host_state(75, "h", State::Ok),
        ],
        0,
        100,
    );
    let service: Vec<_> = segments
        .iter()
        .filter(|s| !s.is_host())
        .map(|s| (s.from, s.attributes.host_down))
        .collect();
    assert_eq!(service, vec![(0, false), (25, true), (75, false)]);
}

#[test]
fn test_combined_host_rows() {
    let engine = HistoryEngine::new(HistoryConfig::default());
    let query = HistoryQuery::new(TimeWindow::new(0, 100).unwrap())
        .scope(QueryScope::Hosts)
        .attach_services(true);
    let source = MemoryLogSource::new(vec![
        LogEvent::host_state(0, "h", State::Ok),
        LogEvent::service_state(0, "h", "s", State::Ok),
        LogEvent::service_state(10, "h", "s", State::Critical),
        LogEvent::host_state(40, "h", State::Critical),
    ]);
    let hosts = engine.run(&source, &query).unwrap();

    for host in &hosts {
        let covered: i64 = host.services.iter().map(|s| s.duration).sum();
        assert_eq!(covered, host.duration);
        assert!(host
            .services
            .iter()
            .all(|s| s.from >= host.from && s.until <= host.until));
    }
}

#[test]
fn test_late_host_recovery_does_not_leak_into_services() {
    let segments = run(
        vec![
            LogEvent::host_state(0, "h", State::Ok),
            LogEvent::host_state(50, "h", State::Warning),
            LogEvent::host_state(30, "h", State::Ok),
            LogEvent::service_state(60, "h", "s2", State::Ok),
        ],
        0,
        100,
    );
    let host: Vec<_> = segments
        .iter()
        .filter(|s| s.is_host())
        .map(|s| (s.from, s.until, s.state()))
        .collect();
    assert_eq!(host, vec![(0, 50, State::Ok), (50, 100, State::Warning)]);
    let service: Vec<_> = segments
        .iter()
        .filter(|s| !s.is_host() && s.from >= 60)
        .map(|s| s.attributes.host_down)
        .collect();
    assert_eq!(service, vec![true]);
}

#[test]
fn test_widest_representable_window() {
    let (start, end) = (i64::MIN / 2, i64::MAX / 2);
    let segments = run(vec![LogEvent::service_state(0, "h", "s", State::Ok)], start, end);
    let covered: i64 = segments.iter().map(|s| s.duration).sum();
    assert_eq!(covered, end - start);
    assert_eq!(segments.last().map(|s| s.until), Some(end));
}

// ============================================================================
// Properties
// ============================================================================

fn arb_state() -> impl Strategy<Value = State> {
    prop::sample::select(State::ALL[1..].to_vec())
}

fn arb_events() -> impl Strategy<Value = Vec<LogEvent>> {
    prop::collection::vec((-50i64..250, arb_state(), 0usize..3), 0..40).prop_map(|raw| {
        raw.into_iter()
            .map(|(time, state, flag)| match flag {
                0 => LogEvent::service_state(time, "h", "s", state),
                1 => LogEvent::new(
                    time,
                    0,
                    LogEventKind::ServiceDowntime {
                        host: "h".into(),
                        service: "s".into(),
                        active: state == State::Critical,
                    },
                ),
                _ => LogEvent::host_state(time, "h", state),
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn durations_cover_window(events in arb_events(), start in 0i64..100, len in 1i64..150) {
        let end = start + len;
        let segments = run(events, start, end);

        for entity in [EntityKey::host("h"), EntityKey::service("h", "s")] {
            let own: Vec<_> = segments.iter().filter(|s| s.key == entity).collect();
            if own.is_empty() {
                continue;
            }
            let total: i64 = own.iter().map(|s| s.duration).sum();
            prop_assert_eq!(total, end - start);
            prop_assert_eq!(own[0].from, start);
            prop_assert_eq!(own[own.len() - 1].until, end);
            for pair in own.windows(2) {
                prop_assert_eq!(pair[0].until, pair[1].from);
                prop_assert_ne!(pair[0].attributes, pair[1].attributes);
            }
        }

        for segment in &segments {
            let non_zero: Vec<_> = segment
                .durations
                .iter()
                .filter(|(_, d)| d.duration != 0)
                .collect();
            prop_assert!(non_zero.len() <= 1);
            prop_assert_eq!(segment.durations.total(), segment.duration);
            prop_assert_eq!(segment.durations.get(segment.state()).duration, segment.duration);
        }
    }
}
