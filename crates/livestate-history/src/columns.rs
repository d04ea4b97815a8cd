//! The state-history table: every segment field exposed as a filterable
//! column.

use crate::segment::StateSegment;
use crate::state::{State, STATE_DOMAIN};
use livestate_filter::{ColumnId, ColumnKind, Row, Schema, Value};
use once_cell::sync::Lazy;

/// Columns of the state-history table, in schema order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HistoryColumn {
    Time,
    Lineno,
    From,
    Until,
    Duration,
    DurationPart,
    State,
    HostDown,
    InDowntime,
    InHostDowntime,
    InNotificationPeriod,
    InServicePeriod,
    IsFlapping,
    NotificationPeriod,
    ServicePeriod,
    DebugInfo,
    HostName,
    ServiceDescription,
    Alias,
    LogOutput,
    MayNoLongerExist,
    HasVanished,
    LastKnownTime,
    IsHost,
    NumServices,
    StateDuration(State),
    StateDurationPart(State),
}

const FIXED: [HistoryColumn; 25] = [
    HistoryColumn::Time,
    HistoryColumn::Lineno,
    HistoryColumn::From,
    HistoryColumn::Until,
    HistoryColumn::Duration,
    HistoryColumn::DurationPart,
    HistoryColumn::State,
    HistoryColumn::HostDown,
    HistoryColumn::InDowntime,
    HistoryColumn::InHostDowntime,
    HistoryColumn::InNotificationPeriod,
    HistoryColumn::InServicePeriod,
    HistoryColumn::IsFlapping,
    HistoryColumn::NotificationPeriod,
    HistoryColumn::ServicePeriod,
    HistoryColumn::DebugInfo,
    HistoryColumn::HostName,
    HistoryColumn::ServiceDescription,
    HistoryColumn::Alias,
    HistoryColumn::LogOutput,
    HistoryColumn::MayNoLongerExist,
    HistoryColumn::HasVanished,
    HistoryColumn::LastKnownTime,
    HistoryColumn::IsHost,
    HistoryColumn::NumServices,
];

/// Every column, fixed ones first, then a duration/part pair per state.
pub static ALL_COLUMNS: Lazy<Vec<HistoryColumn>> = Lazy::new(|| {
    let mut columns = FIXED.to_vec();
    for state in State::ALL {
        columns.push(HistoryColumn::StateDuration(state));
        columns.push(HistoryColumn::StateDurationPart(state));
    }
    columns
});

pub static STATEHIST_SCHEMA: Lazy<Schema> = Lazy::new(|| {
    let mut schema = Schema::new();
    for column in ALL_COLUMNS.iter() {
        schema.add_column(&column.name(), &column.description(), column.kind());
    }
    schema
});

impl HistoryColumn {
    pub fn from_id(id: ColumnId) -> Option<Self> {
        ALL_COLUMNS.get(id.index()).copied()
    }

    pub fn name(&self) -> String {
        let fixed = match self {
            HistoryColumn::Time => "time",
            HistoryColumn::Lineno => "lineno",
            HistoryColumn::From => "from",
            HistoryColumn::Until => "until",
            HistoryColumn::Duration => "duration",
            HistoryColumn::DurationPart => "duration_part",
            HistoryColumn::State => "state",
            HistoryColumn::HostDown => "host_down",
            HistoryColumn::InDowntime => "in_downtime",
            HistoryColumn::InHostDowntime => "in_host_downtime",
            HistoryColumn::InNotificationPeriod => "in_notification_period",
            HistoryColumn::InServicePeriod => "in_service_period",
            HistoryColumn::IsFlapping => "is_flapping",
            HistoryColumn::NotificationPeriod => "notification_period",
            HistoryColumn::ServicePeriod => "service_period",
            HistoryColumn::DebugInfo => "debug_info",
            HistoryColumn::HostName => "host_name",
            HistoryColumn::ServiceDescription => "service_description",
            HistoryColumn::Alias => "alias",
            HistoryColumn::LogOutput => "log_output",
            HistoryColumn::MayNoLongerExist => "may_no_longer_exist",
            HistoryColumn::HasVanished => "has_vanished",
            HistoryColumn::LastKnownTime => "last_known_time",
            HistoryColumn::IsHost => "is_host",
            HistoryColumn::NumServices => "num_services",
            HistoryColumn::StateDuration(state) => {
                return format!("duration_{}", state.name().to_lowercase())
            }
            HistoryColumn::StateDurationPart(state) => {
                return format!("duration_part_{}", state.name().to_lowercase())
            }
        };
        fixed.to_string()
    }

    pub fn description(&self) -> String {
        let fixed = match self {
            HistoryColumn::Time => "Time of the log event that opened the interval",
            HistoryColumn::Lineno => "Line number of that event in its log file",
            HistoryColumn::From => "Start of the interval",
            HistoryColumn::Until => "End of the interval",
            HistoryColumn::Duration => "Length of the interval in seconds",
            HistoryColumn::DurationPart => "Length of the interval relative to the query window",
            HistoryColumn::State => "State during the interval",
            HistoryColumn::HostDown => "Whether the host of the service was down",
            HistoryColumn::InDowntime => "Whether the entity was in a scheduled downtime",
            HistoryColumn::InHostDowntime => "Whether the host of the service was in a downtime",
            HistoryColumn::InNotificationPeriod => "Whether the notification period was active",
            HistoryColumn::InServicePeriod => "Whether the service period was active",
            HistoryColumn::IsFlapping => "Whether the entity was flapping",
            HistoryColumn::NotificationPeriod => "Name of the notification period",
            HistoryColumn::ServicePeriod => "Name of the service period",
            HistoryColumn::DebugInfo => "Which event opened the interval",
            HistoryColumn::HostName => "Host name",
            HistoryColumn::ServiceDescription => "Service description, empty for hosts",
            HistoryColumn::Alias => "Alias from the live configuration, empty if gone",
            HistoryColumn::LogOutput => "Plugin output of the opening state event",
            HistoryColumn::MayNoLongerExist => "Whether presence in the configuration is unconfirmed",
            HistoryColumn::HasVanished => "Whether the entity was removed from the configuration",
            HistoryColumn::LastKnownTime => "Last time the entity was known to exist",
            HistoryColumn::IsHost => "Whether the row describes a host",
            HistoryColumn::NumServices => "Number of service intervals attached to a host interval",
            HistoryColumn::StateDuration(state) => {
                return format!("Seconds spent in state {state}")
            }
            HistoryColumn::StateDurationPart(state) => {
                return format!("Part of the query window spent in state {state}")
            }
        };
        fixed.to_string()
    }

    pub fn kind(&self) -> ColumnKind {
        match self {
            HistoryColumn::Time
            | HistoryColumn::From
            | HistoryColumn::Until
            | HistoryColumn::LastKnownTime => ColumnKind::Time,
            HistoryColumn::Lineno
            | HistoryColumn::Duration
            | HistoryColumn::NumServices
            | HistoryColumn::StateDuration(_) => ColumnKind::Int,
            HistoryColumn::DurationPart | HistoryColumn::StateDurationPart(_) => ColumnKind::Float,
            HistoryColumn::State => ColumnKind::Enum(STATE_DOMAIN),
            HistoryColumn::HostDown
            | HistoryColumn::InDowntime
            | HistoryColumn::InHostDowntime
            | HistoryColumn::InNotificationPeriod
            | HistoryColumn::InServicePeriod
            | HistoryColumn::IsFlapping
            | HistoryColumn::MayNoLongerExist
            | HistoryColumn::HasVanished
            | HistoryColumn::IsHost => ColumnKind::Bool,
            HistoryColumn::NotificationPeriod
            | HistoryColumn::ServicePeriod
            | HistoryColumn::DebugInfo
            | HistoryColumn::HostName
            | HistoryColumn::ServiceDescription
            | HistoryColumn::Alias
            | HistoryColumn::LogOutput => ColumnKind::Text,
        }
    }

    pub fn value(&self, segment: &StateSegment) -> Value {
        let attrs = &segment.attributes;
        match self {
            HistoryColumn::Time => Value::Time(segment.time),
            HistoryColumn::Lineno => Value::Int(segment.lineno as i64),
            HistoryColumn::From => Value::Time(segment.from),
            HistoryColumn::Until => Value::Time(segment.until),
            HistoryColumn::Duration => Value::Int(segment.duration),
            HistoryColumn::DurationPart => Value::Float(segment.duration_part),
            HistoryColumn::State => Value::Int(attrs.state.code()),
            HistoryColumn::HostDown => Value::Bool(attrs.host_down),
            HistoryColumn::InDowntime => Value::Bool(attrs.in_downtime),
            HistoryColumn::InHostDowntime => Value::Bool(attrs.in_host_downtime),
            HistoryColumn::InNotificationPeriod => Value::Bool(attrs.in_notification_period),
            HistoryColumn::InServicePeriod => Value::Bool(attrs.in_service_period),
            HistoryColumn::IsFlapping => Value::Bool(attrs.is_flapping),
            HistoryColumn::NotificationPeriod => Value::Text(segment.notification_period.clone()),
            HistoryColumn::ServicePeriod => Value::Text(segment.service_period.clone()),
            HistoryColumn::DebugInfo => Value::Text(segment.debug_info.clone()),
            HistoryColumn::HostName => Value::Text(segment.host_name().to_string()),
            HistoryColumn::ServiceDescription => {
                Value::Text(segment.service_description().to_string())
            }
            HistoryColumn::Alias => Value::Text(
                segment
                    .config()
                    .map(|config| config.alias.clone())
                    .unwrap_or_default(),
            ),
            HistoryColumn::LogOutput => Value::Text(segment.log_output.clone()),
            HistoryColumn::MayNoLongerExist => Value::Bool(segment.may_no_longer_exist),
            HistoryColumn::HasVanished => Value::Bool(attrs.has_vanished),
            HistoryColumn::LastKnownTime => Value::Time(segment.last_known_time),
            HistoryColumn::IsHost => Value::Bool(segment.is_host()),
            HistoryColumn::NumServices => Value::Int(segment.services.len() as i64),
            HistoryColumn::StateDuration(state) => {
                Value::Int(segment.durations.get(*state).duration)
            }
            HistoryColumn::StateDurationPart(state) => {
                Value::Float(segment.durations.get(*state).part)
            }
        }
    }
}

impl Row for StateSegment {
    fn get(&self, column: ColumnId) -> Value {
        match HistoryColumn::from_id(column) {
            Some(column) => column.value(self),
            None => panic!("column {} is not part of the state history table", column.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EntityKey;
    use crate::state::Attributes;
    use crate::window::TimeWindow;
    use livestate_filter::{CompiledFilter, FilterNode, Operator};

    fn segment(state: State) -> StateSegment {
        let window = TimeWindow::new(0, 100).unwrap();
        let mut seg = StateSegment::open(
            EntityKey::service("web01", "HTTP"),
            10,
            3,
            Attributes {
                state,
                ..Attributes::default()
            },
        );
        seg.close(60, &window);
        seg
    }

    #[test]
    fn test_schema_matches_column_list() {
        assert_eq!(STATEHIST_SCHEMA.len(), ALL_COLUMNS.len());
        for (i, column) in ALL_COLUMNS.iter().enumerate() {
            let def = STATEHIST_SCHEMA.column(&column.name()).unwrap();
            assert_eq!(def.id.index(), i);
            assert_eq!(HistoryColumn::from_id(def.id), Some(*column));
        }
        assert!(STATEHIST_SCHEMA.column("duration_part_critical").is_ok());
        assert!(STATEHIST_SCHEMA.column("duration_unmonitored").is_ok());
    }

    #[test]
    fn test_row_values() {
        let seg = segment(State::Warning);
        let get = |name: &str| seg.get(STATEHIST_SCHEMA.column(name).unwrap().id);

        assert_eq!(get("state"), Value::Int(1));
        assert_eq!(get("duration"), Value::Int(50));
        assert_eq!(get("duration_warning"), Value::Int(50));
        assert_eq!(get("duration_ok"), Value::Int(0));
        assert_eq!(get("duration_part_warning"), Value::Float(0.5));
        assert_eq!(get("service_description"), Value::Text("HTTP".into()));
        assert_eq!(get("alias"), Value::Text(String::new()));
        assert_eq!(get("is_host"), Value::Bool(false));
        assert_eq!(get("in_notification_period"), Value::Bool(true));
    }

    #[test]
    fn test_state_filter_compiles_to_mask() {
        let filter = FilterNode::or(vec![
            FilterNode::leaf(&STATEHIST_SCHEMA, "state", Operator::Equal, "WARNING").unwrap(),
            FilterNode::leaf(&STATEHIST_SCHEMA, "state", Operator::Equal, "CRITICAL").unwrap(),
        ])
        .unwrap();
        let compiled = CompiledFilter::compile(Some(filter), &STATEHIST_SCHEMA);
        assert!(compiled.is_bitmask());

        let mut rows = vec![segment(State::Ok), segment(State::Critical), segment(State::Warning)];
        compiled.retain(&mut rows);
        let states: Vec<_> = rows.iter().map(|s| s.state()).collect();
        assert_eq!(states, vec![State::Critical, State::Warning]);
    }
}
