use std::sync::{Arc, Mutex};

use serde::Serialize;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunLogEventKind {
    TickApplied,
    NewsFired,
    CommandApplied,
    CommandRejected,
    Paused,
    Resumed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunLogEvent {
    pub tick: u64,
    pub kind: RunLogEventKind,
    pub detail: Option<String>,
    pub latency_micros: Option<u64>,
}

impl RunLogEvent {
    pub fn new(tick: u64, kind: RunLogEventKind) -> Self {
        Self {
            tick,
            kind,
            detail: None,
            latency_micros: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_latency_micros(mut self, latency_micros: u64) -> Self {
        self.latency_micros = Some(latency_micros);
        self
    }
}

/// Journal of every transition the driver performs.
pub trait RunLogWriter: Send {
    fn write(&mut self, event: RunLogEvent);
}

/// Forwards journal entries to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingRunLogWriter;

impl RunLogWriter for TracingRunLogWriter {
    fn write(&mut self, event: RunLogEvent) {
        let detail = event.detail.as_deref().unwrap_or("");
        match event.kind {
            RunLogEventKind::TickApplied => debug!(
                tick = event.tick,
                latency_micros = event.latency_micros,
                detail,
                "tick applied"
            ),
            RunLogEventKind::CommandRejected => {
                warn!(tick = event.tick, detail, "command rejected")
            }
            kind => info!(
                tick = event.tick,
                ?kind,
                latency_micros = event.latency_micros,
                detail,
                "run event"
            ),
        }
    }
}

/// Shared in-memory journal; clones observe the same events.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRunLogWriter {
    events: Arc<Mutex<Vec<RunLogEvent>>>,
}

impl InMemoryRunLogWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RunLogEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl RunLogWriter for InMemoryRunLogWriter {
    fn write(&mut self, event: RunLogEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}
