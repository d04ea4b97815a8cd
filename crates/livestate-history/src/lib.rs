//! State history reconstruction.
//!
//! The monitoring core logs every status change of its hosts and services.
//! This crate replays that log for a query window and derives
//! [`StateSegment`]s: maximal intervals during which an entity kept the same
//! state, downtime, flapping and period attributes. Segments carry per-state
//! duration accounting for availability reports and are rows of the
//! state-history table, so they can be filtered with `livestate-filter`.
//!
//! Pipeline: [`LogSource`] -> [`demux::Demultiplexer`] (global log to
//! per-entity streams) -> [`reconstruct::reconstruct`] (per entity, in
//! parallel) -> [`aggregate::attach_services`] -> filter.

pub mod aggregate;
pub mod columns;
pub mod demux;
pub mod error;
pub mod event;
pub mod live;
pub mod query;
pub mod reconstruct;
pub mod segment;
pub mod source;
pub mod state;
pub mod stats;
pub mod window;

pub use columns::{HistoryColumn, ALL_COLUMNS, STATEHIST_SCHEMA};
pub use demux::{Change, EntityStream};
pub use error::{HistoryError, Result};
pub use event::{EntityKey, LogEvent, LogEventKind};
pub use live::{EntityConfig, LiveConfig, StaticLiveConfig};
pub use query::{HistoryEngine, HistoryQuery, QueryScope};
pub use segment::{StateDuration, StateDurations, StateSegment};
pub use source::{parse_line, FileLogSource, LogEvents, LogSource, MemoryLogSource};
pub use state::{Attributes, State, STATE_DOMAIN};
pub use window::TimeWindow;
