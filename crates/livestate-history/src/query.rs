//! Query driver: log source in, filtered state segments out.

use crate::aggregate::attach_services;
use crate::columns::STATEHIST_SCHEMA;
use crate::demux::{Demultiplexer, EntityStream};
use crate::error::{HistoryError, Result};
use crate::live::LiveConfig;
use crate::reconstruct::reconstruct;
use crate::segment::StateSegment;
use crate::source::LogSource;
use crate::stats;
use crate::window::TimeWindow;
use livestate_common::{Config, HistoryConfig};
use livestate_filter::{CompiledFilter, FilterNode};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Which entities a query returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryScope {
    Hosts,
    Services,
    #[default]
    All,
}

impl QueryScope {
    fn includes(&self, stream: &EntityStream) -> bool {
        match self {
            QueryScope::Hosts => stream.key.is_host(),
            QueryScope::Services => !stream.key.is_host(),
            QueryScope::All => true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HistoryQuery {
    pub window: TimeWindow,
    pub scope: QueryScope,
    /// Attach service fragments to host segments
    pub attach_services: bool,
    pub filter: Option<FilterNode>,
}

impl HistoryQuery {
    pub fn new(window: TimeWindow) -> Self {
        Self {
            window,
            scope: QueryScope::All,
            attach_services: false,
            filter: None,
        }
    }

    pub fn scope(mut self, scope: QueryScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn attach_services(mut self, attach: bool) -> Self {
        self.attach_services = attach;
        self
    }

    pub fn filter(mut self, filter: FilterNode) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// Runs [`HistoryQuery`]s against a [`LogSource`].
pub struct HistoryEngine {
    config: HistoryConfig,
    live: Option<Arc<dyn LiveConfig>>,
}

impl HistoryEngine {
    pub fn new(config: HistoryConfig) -> Self {
        stats::describe();
        Self { config, live: None }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config.history.clone()))
    }

    pub fn with_live_config(mut self, live: Arc<dyn LiveConfig>) -> Self {
        self.live = Some(live);
        self
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    pub fn run(&self, source: &dyn LogSource, query: &HistoryQuery) -> Result<Vec<StateSegment>> {
        let started = Instant::now();
        let window = query.window;
        let live = self.live.as_deref();

        let mut demux = Demultiplexer::new(live);
        let mut pulled = 0usize;
        for event in source.events()? {
            let event = event?;
            if event.time >= window.end() {
                break;
            }
            pulled += 1;
            if let Some(limit) = self.config.event_limit() {
                if pulled > limit {
                    return Err(HistoryError::EventLimitExceeded { limit });
                }
            }
            demux.push(&event);
        }

        let needs_services = query.attach_services && query.scope != QueryScope::Services;
        let streams: Vec<EntityStream> = demux
            .finish()
            .into_iter()
            .filter(|s| query.scope.includes(s) || (needs_services && !s.key.is_host()))
            .collect();
        debug!(events = pulled, entities = streams.len(), "log demultiplexed");

        let reconstructed = self.reconstruct_all(&streams, &window, live)?;

        let (mut hosts, services): (Vec<_>, Vec<_>) =
            reconstructed.into_iter().partition(StateSegment::is_host);
        if needs_services {
            attach_services(&mut hosts, &services, &window);
        }

        let mut segments = match query.scope {
            QueryScope::Hosts => hosts,
            QueryScope::Services => services,
            QueryScope::All => {
                hosts.extend(services);
                hosts
            }
        };

        let filter = CompiledFilter::compile(query.filter.clone(), &STATEHIST_SCHEMA);
        filter.retain(&mut segments);
        segments.sort_by(|a, b| a.key.cmp(&b.key).then(a.from.cmp(&b.from)));

        info!(
            window_start = window.start(),
            window_end = window.end(),
            events = pulled,
            segments = segments.len(),
            bitmask = filter.is_bitmask(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "history query finished"
        );
        Ok(segments)
    }

    /// Reconstructs every stream, spread over `worker_threads` scoped
    /// threads.
    fn reconstruct_all(
        &self,
        streams: &[EntityStream],
        window: &TimeWindow,
        live: Option<&dyn LiveConfig>,
    ) -> Result<Vec<StateSegment>> {
        let workers = self.config.worker_threads.max(1);
        if workers == 1 || streams.len() < 2 {
            return Ok(streams
                .iter()
                .flat_map(|s| reconstruct(s, window, live))
                .collect());
        }

        let chunk_size = streams.len().div_ceil(workers);
        let chunks = crossbeam::thread::scope(|scope| {
            let handles: Vec<_> = streams
                .chunks(chunk_size)
                .map(|chunk| {
                    scope.spawn(move |_| {
                        chunk
                            .iter()
                            .flat_map(|s| reconstruct(s, window, live))
                            .collect::<Vec<_>>()
                    })
                })
                .collect();
            handles
                .into_iter()
                .map(|handle| handle.join().map_err(|_| HistoryError::WorkerPanicked))
                .collect::<Result<Vec<_>>>()
        })
        .map_err(|_| HistoryError::WorkerPanicked)??;

        Ok(chunks.into_iter().flatten().collect())
    }
}
