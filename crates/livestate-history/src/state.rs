use livestate_filter::EnumDomain;
use std::fmt;

/// Bit domain of the `state` column: code `-1` (unmonitored) maps to bit 0.
pub const STATE_DOMAIN: EnumDomain =
    EnumDomain::new(-1, &["UNMONITORED", "OK", "WARNING", "CRITICAL", "UNKNOWN"]);

/// Monitored state of a host or service.
///
/// Hosts share the numeric space with services: UP is 0, DOWN is 1 and
/// UNREACHABLE is 2, so they land in the OK, WARNING and CRITICAL buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum State {
    /// No information for the entity, or it is gone from the configuration.
    #[default]
    Unmonitored,
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl State {
    pub const ALL: [State; 5] = [
        State::Unmonitored,
        State::Ok,
        State::Warning,
        State::Critical,
        State::Unknown,
    ];

    pub fn code(self) -> i64 {
        self.index() as i64 - 1
    }

    pub fn from_code(code: i64) -> Option<Self> {
        let index = usize::try_from(code.checked_add(1)?).ok()?;
        Self::ALL.get(index).copied()
    }

    /// Position in [`State::ALL`], also the duration bucket index.
    pub fn index(self) -> usize {
        match self {
            State::Unmonitored => 0,
            State::Ok => 1,
            State::Warning => 2,
            State::Critical => 3,
            State::Unknown => 4,
        }
    }

    pub fn name(self) -> &'static str {
        STATE_DOMAIN.names[self.index()]
    }

    pub fn parse_service(text: &str) -> Option<Self> {
        match text {
            "OK" => Some(State::Ok),
            "WARNING" => Some(State::Warning),
            "CRITICAL" => Some(State::Critical),
            "UNKNOWN" => Some(State::Unknown),
            _ => None,
        }
    }

    pub fn parse_host(text: &str) -> Option<Self> {
        match text {
            "UP" => Some(State::Ok),
            "DOWN" => Some(State::Warning),
            "UNREACHABLE" => Some(State::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// The attribute tuple compared between consecutive events. A segment ends
/// exactly when this tuple changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Attributes {
    pub state: State,
    pub in_downtime: bool,
    pub in_host_downtime: bool,
    pub in_notification_period: bool,
    pub in_service_period: bool,
    pub is_flapping: bool,
    /// Only meaningful for services
    pub host_down: bool,
    pub has_vanished: bool,
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            state: State::Unmonitored,
            in_downtime: false,
            in_host_downtime: false,
            // no period known means always active
            in_notification_period: true,
            in_service_period: true,
            is_flapping: false,
            host_down: false,
            has_vanished: false,
        }
    }
}

impl Attributes {
    /// Tuple of an entity that disappeared from the configuration. Period
    /// and host flags describe the surroundings and are kept.
    pub fn vanished(self) -> Self {
        Self {
            state: State::Unmonitored,
            in_downtime: false,
            is_flapping: false,
            has_vanished: true,
            ..self
        }
    }
}
