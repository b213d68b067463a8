//! Post-processing of solved flow fields.

pub mod convergence;
pub mod permeability;

pub use convergence::{
    ConvergenceCriteria, ConvergenceEstimate, ConvergenceMonitor, ConvergenceReport,
    ConvergenceState, Sample,
};
pub use permeability::{
    FlowSolution, FluidProperties, PermeabilityAnalyzer, PermeabilityMethod, PermeabilityResult,
    RoiConfig,
};
