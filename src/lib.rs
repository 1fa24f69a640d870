//! Battery arbitrage scheduling.
//!
//! A [`ScheduleOptimizer`] solves one fixed horizon as a linear program; the
//! resulting schedule is then priced ([`FinancialMetrics`]), checked against the
//! grid connection ([`GridConstraintChecker`]) and compared with the
//! no-battery baseline ([`BaselineEstimator`]).

pub mod config;
pub mod domain;
pub mod error;
pub mod finance;
pub mod grid;
pub mod optimizer;
pub mod report;
pub mod telemetry;

pub use domain::{cycle_count, degradation_cost, BatteryAsset, DegradationModel, TimeSeries};
pub use error::{ScheduleError, ValidationError};
pub use finance::{baseline_cost, BaselineEstimator, FinancialMetrics};
pub use grid::{check_violations, GridConstraintChecker};
pub use optimizer::{optimize, ScheduleOptimizer};
