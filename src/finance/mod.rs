//! Financial evaluation of solved schedules and of the no-battery counterfactual.

pub mod baseline;
pub mod metrics;

pub use baseline::*;
pub use metrics::*;
