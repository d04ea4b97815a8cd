//! Log sources feeding the reconstruction.

use crate::error::{HistoryError, Result};
use crate::event::{LogEvent, LogEventKind};
use crate::state::State;
use crate::stats;
use livestate_common::HistoryConfig;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::debug;

pub type LogEvents<'a> = Box<dyn Iterator<Item = Result<LogEvent>> + 'a>;

/// A finite, ordered sequence of log events.
///
/// Opening the source fails with [`HistoryError::LogUnavailable`] when the
/// log cannot be accessed at all; that error is terminal for the query.
pub trait LogSource: Send + Sync {
    fn events(&self) -> Result<LogEvents<'_>>;
}

/// Events that are already in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryLogSource {
    events: Vec<LogEvent>,
}

impl MemoryLogSource {
    pub fn new(events: Vec<LogEvent>) -> Self {
        Self { events }
    }

    pub fn push(&mut self, event: LogEvent) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl LogSource for MemoryLogSource {
    fn events(&self) -> Result<LogEvents<'_>> {
        Ok(Box::new(self.events.iter().cloned().map(Ok)))
    }
}

// ============================================================================
// File-backed source
// ============================================================================

/// Monitoring core log files, read in the given order.
#[derive(Debug, Clone)]
pub struct FileLogSource {
    paths: Vec<PathBuf>,
}

impl FileLogSource {
    pub fn new(paths: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    /// Every `*.log` file of an archive directory, sorted by name.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(archive_files(dir.as_ref())?))
    }

    /// Archived logs first, then the current log.
    pub fn from_config(config: &HistoryConfig) -> Result<Self> {
        let mut paths = match &config.archive_dir {
            Some(dir) => archive_files(dir)?,
            None => Vec::new(),
        };
        paths.extend(config.log_path.iter().cloned());
        if paths.is_empty() {
            return Err(HistoryError::NoLogConfigured);
        }
        Ok(Self::new(paths))
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }
}

fn archive_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let unavailable = |source| HistoryError::LogUnavailable {
        path: dir.to_path_buf(),
        source,
    };
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(unavailable)? {
        let path = entry.map_err(unavailable)?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "log") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

impl LogSource for FileLogSource {
    fn events(&self) -> Result<LogEvents<'_>> {
        let mut readers = Vec::with_capacity(self.paths.len());
        for path in &self.paths {
            let file = File::open(path).map_err(|source| HistoryError::LogUnavailable {
                path: path.clone(),
                source,
            })?;
            readers.push((path, BufReader::new(file)));
        }

        let events = readers.into_iter().flat_map(|(path, reader)| {
            lossy_lines(reader)
                .zip(1u64..)
                .filter_map(move |(line, lineno)| match line {
                    Ok(line) => parse_line(&line, lineno).map(Ok),
                    Err(source) => Some(Err(HistoryError::LogRead {
                        path: path.clone(),
                        source,
                    })),
                })
        });
        Ok(Box::new(events))
    }
}

/// Lines of `reader` without their terminator. Bytes that are not valid
/// UTF-8 are replaced instead of failing the whole read.
fn lossy_lines<R: BufRead>(mut reader: R) -> impl Iterator<Item = std::io::Result<String>> {
    let mut buf = Vec::new();
    std::iter::from_fn(move || {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => None,
            Ok(_) => {
                if buf.ends_with(b"\n") {
                    buf.pop();
                    if buf.ends_with(b"\r") {
                        buf.pop();
                    }
                }
                Some(Ok(String::from_utf8_lossy(&buf).into_owned()))
            }
            Err(e) => Some(Err(e)),
        }
    })
}

// ============================================================================
// Line parser
// ============================================================================

/// Parses one line of the `[epoch] KIND: field;field;...` log format.
///
/// Returns `None` for lines that carry nothing relevant to state history,
/// including malformed ones.
pub fn parse_line(line: &str, lineno: u64) -> Option<LogEvent> {
    let rest = line.strip_prefix('[')?;
    let (time, message) = rest.split_once("] ")?;
    let time: i64 = time.trim().parse().ok()?;

    if message.starts_with("logging initial states") {
        return Some(LogEvent::new(time, lineno, LogEventKind::CoreStarting));
    }

    let (kind, body) = message.split_once(": ")?;
    if !KINDS.iter().any(|known| *known == kind) {
        return None;
    }
    let fields: Vec<&str> = body.split(';').collect();
    let parsed = parse_fields(kind, &fields);
    if parsed.is_none() {
        debug!(lineno, line, "skipping malformed log line");
        stats::line_malformed();
    }
    parsed.map(|kind| LogEvent::new(time, lineno, kind))
}

const KINDS: [&str; 11] = [
    "HOST ALERT",
    "INITIAL HOST STATE",
    "CURRENT HOST STATE",
    "SERVICE ALERT",
    "INITIAL SERVICE STATE",
    "CURRENT SERVICE STATE",
    "HOST DOWNTIME ALERT",
    "SERVICE DOWNTIME ALERT",
    "HOST FLAPPING ALERT",
    "SERVICE FLAPPING ALERT",
    "TIMEPERIOD TRANSITION",
];

fn parse_fields(kind: &str, fields: &[&str]) -> Option<LogEventKind> {
    match (kind, fields) {
        ("HOST ALERT", _) => host_state(fields, false),
        ("INITIAL HOST STATE" | "CURRENT HOST STATE", _) => host_state(fields, true),
        ("SERVICE ALERT", _) => service_state(fields, false),
        ("INITIAL SERVICE STATE" | "CURRENT SERVICE STATE", _) => service_state(fields, true),
        ("HOST DOWNTIME ALERT", [host, transition, ..]) => Some(LogEventKind::HostDowntime {
            host: host.to_string(),
            active: started(transition)?,
        }),
        ("SERVICE DOWNTIME ALERT", [host, service, transition, ..]) => {
            Some(LogEventKind::ServiceDowntime {
                host: host.to_string(),
                service: service.to_string(),
                active: started(transition)?,
            })
        }
        ("HOST FLAPPING ALERT", [host, transition, ..]) => Some(LogEventKind::HostFlapping {
            host: host.to_string(),
            active: started(transition)?,
        }),
        ("SERVICE FLAPPING ALERT", [host, service, transition, ..]) => {
            Some(LogEventKind::ServiceFlapping {
                host: host.to_string(),
                service: service.to_string(),
                active: started(transition)?,
            })
        }
        ("TIMEPERIOD TRANSITION", [period, _from, to, ..]) => {
            Some(LogEventKind::TimeperiodTransition {
                period: period.to_string(),
                active: to.trim() == "1",
            })
        }
        _ => None,
    }
}

/// `host;state;type;attempt;output...`
fn host_state(fields: &[&str], initial: bool) -> Option<LogEventKind> {
    let [host, state, rest @ ..] = fields else {
        return None;
    };
    Some(LogEventKind::HostState {
        host: host.to_string(),
        state: State::parse_host(state)?,
        initial,
        output: output(rest, 2),
    })
}

/// `host;service;state;type;attempt;output...`
fn service_state(fields: &[&str], initial: bool) -> Option<LogEventKind> {
    let [host, service, state, rest @ ..] = fields else {
        return None;
    };
    Some(LogEventKind::ServiceState {
        host: host.to_string(),
        service: service.to_string(),
        state: State::parse_service(state)?,
        initial,
        output: output(rest, 2),
    })
}

/// Plugin output may itself contain `;`.
fn output(fields: &[&str], skip: usize) -> String {
    fields.get(skip..).map(|f| f.join(";")).unwrap_or_default()
}

fn started(transition: &str) -> Option<bool> {
    match transition {
        "STARTED" => Some(true),
        "STOPPED" | "CANCELLED" => Some(false),
        _ => None,
    }
}
