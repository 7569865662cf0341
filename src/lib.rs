pub mod error;
pub mod process;
pub mod metrics;
pub mod simulation;

pub use error::{Result, SimError};
pub use simulation::{Simulation, SimulationConfig, SimulationResult};
pub use metrics::QueueMetrics;

pub mod prelude {
    pub use crate::error::{Result, SimError};
    pub use crate::process::{generate, ExponentialProcess, ProcessSamples};
    pub use crate::simulation::{
        CustomerRecord, FirstRecordPolicy, SeedMode, Simulation, SimulationConfig, SimulationResult, TimelineEntry,
        TraceSimulator,
    };
    pub use crate::metrics::{QueueMetrics, WaitHistogram};
    pub use crate::metrics::theory::SteadyState;
}
