//! Host/service aggregation for combined availability rows.

use crate::segment::StateSegment;
use crate::window::TimeWindow;
use std::collections::HashMap;

/// Attaches the service segments of each host to the overlapping host
/// segments.
///
/// A service segment spanning a host segment boundary is split, so that
/// each fragment belongs to exactly one host segment. Fragments carry their
/// own duration accounting relative to `window`.
pub fn attach_services(hosts: &mut [StateSegment], services: &[StateSegment], window: &TimeWindow) {
    let mut by_host: HashMap<&str, Vec<&StateSegment>> = HashMap::new();
    for service in services.iter().filter(|s| !s.is_host()) {
        by_host.entry(service.host_name()).or_default().push(service);
    }

    for host in hosts.iter_mut().filter(|h| h.is_host()) {
        let Some(candidates) = by_host.get(host.host_name()) else {
            continue;
        };
        let (from, until) = (host.from, host.until);
        host.services = candidates
            .iter()
            .filter(|service| service.overlaps(from, until))
            .map(|service| service.clip(from, until, window))
            .collect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EntityKey;
    use crate::state::{Attributes, State};

    fn segment(key: EntityKey, from: i64, until: i64, state: State) -> StateSegment {
        let mut seg = StateSegment::open(
            key,
            from,
            0,
            Attributes {
                state,
                ..Attributes::default()
            },
        );
        seg.close(until, &TimeWindow::new(0, 100).unwrap());
        seg
    }

    #[test]
    fn test_service_split_at_host_boundary() {
        let window = TimeWindow::new(0, 100).unwrap();
        let mut hosts = vec![
            segment(EntityKey::host("h"), 0, 50, State::Ok),
            segment(EntityKey::host("h"), 50, 100, State::Warning),
        ];
        let services = vec![
            segment(EntityKey::service("h", "s"), 0, 30, State::Ok),
            segment(EntityKey::service("h", "s"), 30, 100, State::Critical),
            segment(EntityKey::service("other", "s"), 0, 100, State::Ok),
        ];
        attach_services(&mut hosts, &services, &window);

        let first: Vec<_> = hosts[0].services.iter().map(|s| (s.from, s.until)).collect();
        let second: Vec<_> = hosts[1].services.iter().map(|s| (s.from, s.until)).collect();
        assert_eq!(first, vec![(0, 30), (30, 50)]);
        assert_eq!(second, vec![(50, 100)]);
        assert_eq!(hosts[1].services[0].durations.get(State::Critical).duration, 50);
        assert_eq!(hosts[1].services[0].duration_part, 0.5);
    }

    #[test]
    fn test_host_without_services() {
        let window = TimeWindow::new(0, 100).unwrap();
        let mut hosts = vec![segment(EntityKey::host("lonely"), 0, 100, State::Ok)];
        attach_services(&mut hosts, &[], &window);
        assert!(hosts[0].services.is_empty());
    }
}
