//! Async shell around the simulation engine: a single-writer driver task,
//! a periodic ticker, the run journal and transition latency metrics.

pub mod driver;
pub mod logging;
pub mod metrics;
pub mod ticker;

pub use driver::{spawn_driver, DriverError, SimHandle, SimUpdate};
pub use logging::{
    InMemoryRunLogWriter, RunLogEvent, RunLogEventKind, RunLogWriter, TracingRunLogWriter,
};
pub use metrics::{LatencyPercentiles, TransitionLatencyMetrics};
pub use ticker::spawn_ticker;
