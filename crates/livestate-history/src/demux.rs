//! Routing of the global monitoring log into per-entity event streams.
//!
//! The log interleaves all hosts and services, and some lines affect more
//! than the entity they name: a host going down marks its services, a
//! timeperiod transition touches every entity using the period, and a core
//! restart puts the presence of everything in question. The
//! [`Demultiplexer`] resolves these effects once, sequentially, so that the
//! per-entity reconstruction can run independently afterwards.

use crate::event::{EntityKey, LogEvent, LogEventKind};
use crate::live::{EntityConfig, LiveConfig};
use crate::state::State;
use crate::stats;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use tracing::debug;

/// A single attribute change of one entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    State {
        state: State,
        output: String,
        initial: bool,
    },
    Downtime(bool),
    HostDowntime(bool),
    Flapping(bool),
    NotificationPeriod(bool),
    ServicePeriod(bool),
    HostDown(bool),
    /// The core restarted; the entity has to show up in the initial state
    /// dump to stay confirmed.
    PresenceUnconfirmed,
    /// Missing from the initial state dump after a restart.
    Vanished,
    /// Deletion confirmed by the surrounding system.
    Removed,
}

impl Change {
    /// Tag recorded as `debug_info` on the segment the change opens.
    pub fn label(&self) -> &'static str {
        match self {
            Change::State { initial: true, .. } => "INITIAL STATE",
            Change::State { .. } => "STATE CHANGE",
            Change::Downtime(_) => "DOWNTIME",
            Change::HostDowntime(_) => "HOST DOWNTIME",
            Change::Flapping(_) => "FLAPPING",
            Change::NotificationPeriod(_) => "NOTIFICATION PERIOD",
            Change::ServicePeriod(_) => "SERVICE PERIOD",
            Change::HostDown(_) => "HOST DOWN",
            Change::PresenceUnconfirmed => "PRESENCE UNCONFIRMED",
            Change::Vanished => "VANISHED",
            Change::Removed => "REMOVED",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityEvent {
    pub time: i64,
    pub lineno: u64,
    pub change: Change,
}

/// All changes of one entity, in log order.
#[derive(Debug, Clone)]
pub struct EntityStream {
    pub key: EntityKey,
    pub config: Option<Arc<EntityConfig>>,
    pub notification_period: String,
    pub service_period: String,
    pub events: Vec<EntityEvent>,
}

impl EntityStream {
    pub fn new(key: EntityKey, config: Option<Arc<EntityConfig>>) -> Self {
        let (notification_period, service_period) = config
            .as_deref()
            .map(|c| (c.notification_period.clone(), c.service_period.clone()))
            .unwrap_or_default();
        Self {
            key,
            config,
            notification_period,
            service_period,
            events: Vec::new(),
        }
    }

    pub fn push(&mut self, time: i64, lineno: u64, change: Change) {
        self.events.push(EntityEvent {
            time,
            lineno,
            change,
        });
    }
}

/// What a newly seen entity inherits from the rest of the log.
struct Context<'a> {
    live: Option<&'a dyn LiveConfig>,
    services_by_host: HashMap<String, BTreeSet<EntityKey>>,
    /// Last known activity per timeperiod; unknown periods are active
    periods: HashMap<String, bool>,
    host_down: HashMap<String, bool>,
    host_downtime: HashMap<String, bool>,
}

impl Context<'_> {
    /// Stream of an entity seen for the first time, starting with the
    /// current period and host context as its first changes.
    fn first_sight(&mut self, key: &EntityKey, time: i64, lineno: u64) -> EntityStream {
        let config = self.live.and_then(|live| live.resolve(key));
        let mut stream = EntityStream::new(key.clone(), config);

        let notification = self.period_active(&stream.notification_period);
        let service = self.period_active(&stream.service_period);
        stream.push(time, lineno, Change::NotificationPeriod(notification));
        stream.push(time, lineno, Change::ServicePeriod(service));

        if !key.is_host() {
            let host = &key.host_name;
            if let Some(down) = self.host_down.get(host) {
                stream.push(time, lineno, Change::HostDown(*down));
            }
            if let Some(downtime) = self.host_downtime.get(host) {
                stream.push(time, lineno, Change::HostDowntime(*downtime));
            }
            self.services_by_host
                .entry(host.clone())
                .or_default()
                .insert(key.clone());
        }
        stream
    }

    fn period_active(&self, period: &str) -> bool {
        period.is_empty() || self.periods.get(period).copied().unwrap_or(true)
    }
}

/// Splits the global log into [`EntityStream`]s.
///
/// An event older than the last accepted one for the same entity (or the
/// same timeperiod) is dropped before it can touch any stream or the
/// inherited context.
pub struct Demultiplexer<'a> {
    context: Context<'a>,
    streams: BTreeMap<EntityKey, EntityStream>,
    last_entity_time: HashMap<EntityKey, i64>,
    last_period_time: HashMap<String, i64>,
    restart_pending: bool,
    unconfirmed: BTreeSet<EntityKey>,
}

impl<'a> Demultiplexer<'a> {
    pub fn new(live: Option<&'a dyn LiveConfig>) -> Self {
        Self {
            context: Context {
                live,
                services_by_host: HashMap::new(),
                periods: HashMap::new(),
                host_down: HashMap::new(),
                host_downtime: HashMap::new(),
            },
            streams: BTreeMap::new(),
            last_entity_time: HashMap::new(),
            last_period_time: HashMap::new(),
            restart_pending: false,
            unconfirmed: BTreeSet::new(),
        }
    }

    pub fn push(&mut self, event: &LogEvent) {
        let (time, lineno) = (event.time, event.lineno);

        if !self.admit(event) {
            debug!(
                time,
                lineno,
                kind = ?event.kind,
                "dropping out-of-order log event"
            );
            stats::event_skipped();
            return;
        }

        if self.restart_pending && ends_initial_block(event) {
            self.vanish_unconfirmed(time, lineno);
        }

        match &event.kind {
            LogEventKind::HostState {
                host,
                state,
                initial,
                output,
            } => {
                let key = EntityKey::host(host.clone());
                self.confirm(&key, *initial);
                self.stream(&key, time, lineno).push(
                    time,
                    lineno,
                    Change::State {
                        state: *state,
                        output: output.clone(),
                        initial: *initial,
                    },
                );
                let down = *state != State::Ok;
                self.context.host_down.insert(host.clone(), down);
                self.fan_out(host, time, lineno, Change::HostDown(down));
            }
            LogEventKind::ServiceState {
                host,
                service,
                state,
                initial,
                output,
            } => {
                let key = EntityKey::service(host.clone(), service.clone());
                self.confirm(&key, *initial);
                self.stream(&key, time, lineno).push(
                    time,
                    lineno,
                    Change::State {
                        state: *state,
                        output: output.clone(),
                        initial: *initial,
                    },
                );
            }
            LogEventKind::HostDowntime { host, active } => {
                let key = EntityKey::host(host.clone());
                self.stream(&key, time, lineno)
                    .push(time, lineno, Change::Downtime(*active));
                self.context.host_downtime.insert(host.clone(), *active);
                self.fan_out(host, time, lineno, Change::HostDowntime(*active));
            }
            LogEventKind::ServiceDowntime {
                host,
                service,
                active,
            } => {
                let key = EntityKey::service(host.clone(), service.clone());
                self.stream(&key, time, lineno)
                    .push(time, lineno, Change::Downtime(*active));
            }
            LogEventKind::HostFlapping { host, active } => {
                let key = EntityKey::host(host.clone());
                self.stream(&key, time, lineno)
                    .push(time, lineno, Change::Flapping(*active));
            }
            LogEventKind::ServiceFlapping {
                host,
                service,
                active,
            } => {
                let key = EntityKey::service(host.clone(), service.clone());
                self.stream(&key, time, lineno)
                    .push(time, lineno, Change::Flapping(*active));
            }
            LogEventKind::TimeperiodTransition { period, active } => {
                self.context.periods.insert(period.clone(), *active);
                for stream in self.streams.values_mut() {
                    if stream.notification_period == *period {
                        stream.push(time, lineno, Change::NotificationPeriod(*active));
                    }
                    if stream.service_period == *period {
                        stream.push(time, lineno, Change::ServicePeriod(*active));
                    }
                }
            }
            LogEventKind::CoreStarting => {
                debug!(time, entities = self.streams.len(), "core restart in log");
                self.restart_pending = true;
                self.unconfirmed = self.streams.keys().cloned().collect();
                for stream in self.streams.values_mut() {
                    stream.push(time, lineno, Change::PresenceUnconfirmed);
                }
            }
            LogEventKind::EntityRemoved { key } => {
                self.unconfirmed.remove(key);
                self.stream(key, time, lineno)
                    .push(time, lineno, Change::Removed);
                if key.is_host() {
                    let services = self
                        .context
                        .services_by_host
                        .get(&key.host_name)
                        .cloned()
                        .unwrap_or_default();
                    for service in services {
                        self.unconfirmed.remove(&service);
                        if let Some(stream) = self.streams.get_mut(&service) {
                            stream.push(time, lineno, Change::Removed);
                        }
                    }
                }
            }
        }
    }

    /// Streams ordered by entity key.
    pub fn finish(self) -> Vec<EntityStream> {
        self.streams.into_values().collect()
    }

    fn confirm(&mut self, key: &EntityKey, initial: bool) {
        if initial {
            self.unconfirmed.remove(key);
        }
    }

    fn vanish_unconfirmed(&mut self, time: i64, lineno: u64) {
        self.restart_pending = false;
        let unconfirmed = std::mem::take(&mut self.unconfirmed);
        if !unconfirmed.is_empty() {
            debug!(time, count = unconfirmed.len(), "entities missing after restart");
        }
        for key in unconfirmed {
            if let Some(stream) = self.streams.get_mut(&key) {
                stream.push(time, lineno, Change::Vanished);
            }
        }
    }

    fn fan_out(&mut self, host: &str, time: i64, lineno: u64, change: Change) {
        let Some(services) = self.context.services_by_host.get(host) else {
            return;
        };
        for service in services {
            if let Some(stream) = self.streams.get_mut(service) {
                stream.push(time, lineno, change.clone());
            }
        }
    }

    /// Records the time of `event` unless it is older than the last event
    /// accepted for the same entity or timeperiod.
    fn admit(&mut self, event: &LogEvent) -> bool {
        let last = match &event.kind {
            LogEventKind::CoreStarting => return true,
            LogEventKind::TimeperiodTransition { period, .. } => {
                self.last_period_time.entry(period.clone()).or_insert(event.time)
            }
            _ => match event.entity() {
                Some(key) => self.last_entity_time.entry(key).or_insert(event.time),
                None => return true,
            },
        };
        if event.time < *last {
            return false;
        }
        *last = event.time;
        true
    }

    fn stream(&mut self, key: &EntityKey, time: i64, lineno: u64) -> &mut EntityStream {
        match self.streams.entry(key.clone()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(self.context.first_sight(key, time, lineno)),
        }
    }
}

/// Events that show the initial state dump after a restart is over.
fn ends_initial_block(event: &LogEvent) -> bool {
    !event.is_initial_state()
        && !matches!(
            event.kind,
            LogEventKind::TimeperiodTransition { .. } | LogEventKind::CoreStarting
        )
}

/// Demultiplexes a whole event sequence.
pub fn demux<'e>(
    events: impl IntoIterator<Item = &'e LogEvent>,
    live: Option<&dyn LiveConfig>,
) -> Vec<EntityStream> {
    let mut demux = Demultiplexer::new(live);
    for event in events {
        demux.push(event);
    }
    demux.finish()
}
