//! Log events consumed by the reconstruction.

use crate::state::State;
use std::fmt;

/// Identity of a monitored entity: a host, or a service of a host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityKey {
    pub host_name: String,
    pub service_description: Option<String>,
}

impl EntityKey {
    pub fn host(host_name: impl Into<String>) -> Self {
        Self {
            host_name: host_name.into(),
            service_description: None,
        }
    }

    pub fn service(host_name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            host_name: host_name.into(),
            service_description: Some(description.into()),
        }
    }

    pub fn is_host(&self) -> bool {
        self.service_description.is_none()
    }

    /// Key of the host this entity belongs to (itself for hosts).
    pub fn host_key(&self) -> EntityKey {
        EntityKey::host(self.host_name.clone())
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.service_description {
            Some(service) => write!(f, "{};{}", self.host_name, service),
            None => f.write_str(&self.host_name),
        }
    }
}

/// One line of the monitoring log.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEvent {
    pub time: i64,
    /// Line number in the originating log file
    pub lineno: u64,
    pub kind: LogEventKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LogEventKind {
    /// Host state alert; `initial` for the state dump after a (re)start or
    /// log rotation
    HostState {
        host: String,
        state: State,
        initial: bool,
        output: String,
    },
    ServiceState {
        host: String,
        service: String,
        state: State,
        initial: bool,
        output: String,
    },
    HostDowntime {
        host: String,
        active: bool,
    },
    ServiceDowntime {
        host: String,
        service: String,
        active: bool,
    },
    HostFlapping {
        host: String,
        active: bool,
    },
    ServiceFlapping {
        host: String,
        service: String,
        active: bool,
    },
    TimeperiodTransition {
        period: String,
        active: bool,
    },
    /// The core restarted and is about to log the state of everything it
    /// still monitors.
    CoreStarting,
    /// The surrounding system confirmed that the entity was deleted.
    EntityRemoved {
        key: EntityKey,
    },
}

impl LogEvent {
    pub fn new(time: i64, lineno: u64, kind: LogEventKind) -> Self {
        Self { time, lineno, kind }
    }

    /// Entity the event is about, `None` for global events.
    pub fn entity(&self) -> Option<EntityKey> {
        match &self.kind {
            LogEventKind::HostState { host, .. }
            | LogEventKind::HostDowntime { host, .. }
            | LogEventKind::HostFlapping { host, .. } => Some(EntityKey::host(host.clone())),
            LogEventKind::ServiceState { host, service, .. }
            | LogEventKind::ServiceDowntime { host, service, .. }
            | LogEventKind::ServiceFlapping { host, service, .. } => {
                Some(EntityKey::service(host.clone(), service.clone()))
            }
            LogEventKind::EntityRemoved { key } => Some(key.clone()),
            LogEventKind::TimeperiodTransition { .. } | LogEventKind::CoreStarting => None,
        }
    }

    /// Initial state dumps do not end the post-restart confirmation phase.
    pub fn is_initial_state(&self) -> bool {
        matches!(
            self.kind,
            LogEventKind::HostState { initial: true, .. }
                | LogEventKind::ServiceState { initial: true, .. }
        )
    }

    pub fn host_state(time: i64, host: &str, state: State) -> Self {
        Self::new(
            time,
            0,
            LogEventKind::HostState {
                host: host.to_string(),
                state,
                initial: false,
                output: String::new(),
            },
        )
    }

    pub fn service_state(time: i64, host: &str, service: &str, state: State) -> Self {
        Self::new(
            time,
            0,
            LogEventKind::ServiceState {
                host: host.to_string(),
                service: service.to_string(),
                state,
                initial: false,
                output: String::new(),
            },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_keys() {
        let host = EntityKey::host("web01");
        let svc = EntityKey::service("web01", "HTTP");
        assert!(host.is_host());
        assert!(!svc.is_host());
        assert_eq!(svc.host_key(), host);
        assert_eq!(svc.to_string(), "web01;HTTP");
        assert!(host < svc);
    }

    #[test]
    fn test_event_entity() {
        let e = LogEvent::service_state(5, "h", "s", State::Ok);
        assert_eq!(e.entity(), Some(EntityKey::service("h", "s")));
        assert!(!e.is_initial_state());

        let t = LogEvent::new(
            5,
            1,
            LogEventKind::TimeperiodTransition {
                period: "24x7".into(),
                active: true,
            },
        );
        assert_eq!(t.entity(), None);
    }
}
