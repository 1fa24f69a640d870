//! Battery Arbitrage Scheduler
//!
//! Builds the scheduling LP for one fixed horizon, hands it to an [`LpSolver`]
//! and turns the optimal point into a [`Schedule`] with its financial metrics.
//! Every call is independent: nothing is cached between invocations.

use std::time::Instant;

use tracing::{debug, instrument, warn};

use super::constraints::{build_program, VariableLayout};
use super::solver::{microlp_backend, LpSolver, SolverError};
use crate::domain::{
    timestep_hours, BatteryAsset, OptimizationResult, Schedule, TimeSeries,
    DEFAULT_TIMESTEP_MINUTES,
};
use crate::error::{ScheduleError, ValidationError};
use crate::finance::FinancialMetrics;

/// Flat wear charge applied to each kWh moved through the battery.
pub const DEFAULT_DEGRADATION_COST_PER_KWH: f64 = 0.05;

/// Horizons beyond one week of quarter hours make the dense simplex slow.
const LARGE_HORIZON: usize = 672;

/// LP-based charge/discharge scheduler
pub struct ScheduleOptimizer {
    timestep_minutes: u32,
    solver: Box<dyn LpSolver>,
}

impl Default for ScheduleOptimizer {
    fn default() -> Self {
        Self::new(DEFAULT_TIMESTEP_MINUTES)
    }
}

impl std::fmt::Debug for ScheduleOptimizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScheduleOptimizer")
            .field("timestep_minutes", &self.timestep_minutes)
            .field("solver", &self.solver.name())
            .finish()
    }
}

impl ScheduleOptimizer {
    /// Scheduler using the pure-Rust simplex back end.
    pub fn new(timestep_minutes: u32) -> Self {
        Self::with_solver(timestep_minutes, Box::new(microlp_backend()))
    }

    pub fn with_solver(timestep_minutes: u32, solver: Box<dyn LpSolver>) -> Self {
        Self {
            timestep_minutes,
            solver,
        }
    }

    pub fn timestep_minutes(&self) -> u32 {
        self.timestep_minutes
    }

    pub fn solver_name(&self) -> &str {
        self.solver.name()
    }

    /// Optimizes raw series. Fails with a validation error on unequal lengths,
    /// an empty horizon or non-finite inputs.
    pub fn optimize(
        &self,
        asset: &BatteryAsset,
        solar_kw: &[f64],
        load_kw: &[f64],
        price_per_kwh: &[f64],
        grid_export_limit_kw: f64,
        degradation_cost_per_kwh: f64,
    ) -> Result<OptimizationResult, ScheduleError> {
        let series = TimeSeries::from_slices(solar_kw, load_kw, price_per_kwh)?;
        self.optimize_series(asset, &series, grid_export_limit_kw, degradation_cost_per_kwh)
    }

    #[instrument(skip(self, asset, series), fields(horizon = series.len(), solver = self.solver.name()))]
    pub fn optimize_series(
        &self,
        asset: &BatteryAsset,
        series: &TimeSeries,
        grid_export_limit_kw: f64,
        degradation_cost_per_kwh: f64,
    ) -> Result<OptimizationResult, ScheduleError> {
        asset.check()?;
        if self.timestep_minutes == 0 {
            return Err(ValidationError::InvalidTimestep(0.0).into());
        }
        for (name, value) in [
            ("grid_export_limit_kw", grid_export_limit_kw),
            ("degradation_cost_per_kwh", degradation_cost_per_kwh),
        ] {
            if !value.is_finite() {
                return Err(ValidationError::NonFiniteParameter { name, value }.into());
            }
        }

        let n = series.len();
        if n > LARGE_HORIZON {
            warn!(horizon = n, "large horizon, solve may be slow");
        }

        let started = Instant::now();
        let dt = timestep_hours(self.timestep_minutes);

        let program = build_program(
            asset,
            series,
            dt,
            grid_export_limit_kw,
            degradation_cost_per_kwh,
        );
        debug!(
            variables = program.num_variables(),
            inequalities = program.inequalities.len(),
            equalities = program.equalities.len(),
            "built scheduling program"
        );

        let solution = self.solver.solve(&program).map_err(|e| {
            debug!(error = %e, "solver rejected program");
            e
        })?;

        if solution.values.len() != program.num_variables() {
            return Err(SolverError::Backend(format!(
                "{} returned {} values for {} columns",
                self.solver.name(),
                solution.values.len(),
                program.num_variables()
            ))
            .into());
        }

        // Back ends may land a hair outside a bound; clamp before deriving anything.
        let layout = VariableLayout::new(n);
        let value = |j: usize| program.bounds[j].clamp(solution.values[j]);
        let schedule = Schedule {
            charge_kw: (0..n).map(|t| value(layout.charge(t))).collect(),
            discharge_kw: (0..n).map(|t| value(layout.discharge(t))).collect(),
            soc_kwh: (0..=n).map(|t| value(layout.soc(t))).collect(),
        };

        let soc_trajectory_pct = schedule.soc_pct(asset.capacity_kwh);
        let grid_export_kw = schedule.grid_export_kw(series);
        let metrics = FinancialMetrics::calculate(
            &schedule,
            series,
            &grid_export_kw,
            &soc_trajectory_pct,
            asset.capacity_kwh,
            dt,
        );

        let solve_time_ms = started.elapsed().as_secs_f64() * 1000.0;
        debug!(
            objective = solution.objective,
            net_profit = metrics.net_profit,
            solve_time_ms,
            "schedule solved"
        );

        Ok(OptimizationResult {
            schedule,
            soc_trajectory_pct,
            grid_export_kw,
            metrics,
            objective_value: solution.objective,
            solver_status: solution.status,
            solve_time_ms,
        })
    }
}

/// One-shot optimization at the default 15 minute resolution.
pub fn optimize(
    asset: &BatteryAsset,
    solar_kw: &[f64],
    load_kw: &[f64],
    price_per_kwh: &[f64],
    grid_export_limit_kw: f64,
    degradation_cost_per_kwh: f64,
) -> Result<OptimizationResult, ScheduleError> {
    ScheduleOptimizer::default().optimize(
        asset,
        solar_kw,
        load_kw,
        price_per_kwh,
        grid_export_limit_kw,
        degradation_cost_per_kwh,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::{LinearProgram, LpSolution};

    fn two_price_asset() -> BatteryAsset {
        BatteryAsset::new(4.0, 2.0, 1.0, 100.0)
    }

    #[test]
    fn test_discharges_into_high_prices() {
        let result = optimize(
            &two_price_asset(),
            &[0.0; 4],
            &[1.0; 4],
            &[0.05, 0.05, 0.20, 0.20],
            2.0,
            DEFAULT_DEGRADATION_COST_PER_KWH,
        )
        .unwrap();

        let schedule = &result.schedule;
        assert!((schedule.discharge_kw[2] - 2.0).abs() < 1e-6);
        assert!((schedule.discharge_kw[3] - 2.0).abs() < 1e-6);
        assert!(schedule.charge_kw.iter().all(|&c| c.abs() < 1e-6));
        assert!(result.net_profit() > 0.0);
        assert_eq!(result.soc_trajectory_pct.len(), 5);
        assert!((result.soc_trajectory_pct[0] - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_no_cycling_below_wear_spread() {
        // spread 0.05 is below twice the 0.05 wear cost
        let asset = BatteryAsset::new(4.0, 2.0, 1.0, 50.0);
        let result = optimize(
            &asset,
            &[0.0; 4],
            &[1.0; 4],
            &[0.10, 0.10, 0.15, 0.15],
            4.0,
            0.05,
        )
        .unwrap();

        assert!(result.schedule.charge_kw.iter().all(|&c| c.abs() < 1e-6));
        // discharging at 0.15 - 0.05 still earns, but charging never does
        assert!(result.schedule.discharge_kw[2] > 1.0);
    }

    #[test]
    fn test_length_mismatch_is_validation_error() {
        let err = optimize(
            &BatteryAsset::default(),
            &[0.0, 0.0],
            &[1.0],
            &[0.1, 0.1],
            4.0,
            0.05,
        )
        .unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_invalid_asset_rejected() {
        let asset = BatteryAsset::new(4.0, 2.0, 1.5, 50.0);
        let err = optimize(&asset, &[0.0], &[1.0], &[0.1], 4.0, 0.05).unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::Validation(ValidationError::InvalidAsset(_))
        ));
    }

    #[test]
    fn test_non_finite_limit_rejected() {
        let err = optimize(
            &BatteryAsset::default(),
            &[0.0],
            &[1.0],
            &[0.1],
            f64::NAN,
            0.05,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::Validation(ValidationError::NonFiniteParameter {
                name: "grid_export_limit_kw",
                ..
            })
        ));
    }

    #[test]
    fn test_zero_timestep_rejected() {
        let optimizer = ScheduleOptimizer::new(0);
        let err = optimizer
            .optimize(&BatteryAsset::default(), &[0.0], &[1.0], &[0.1], 4.0, 0.05)
            .unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::Validation(ValidationError::InvalidTimestep(_))
        ));
    }

    #[test]
    fn test_infeasible_export_limit() {
        // 10 kW of surplus can only be soaked up by 2 kW of charging
        let asset = BatteryAsset::new(4.0, 2.0, 1.0, 0.0);
        let err = optimize(&asset, &[10.0], &[0.0], &[0.1], 2.0, 0.05).unwrap_err();
        assert!(err.is_infeasible());
    }

    struct RejectingSolver;

    impl LpSolver for RejectingSolver {
        fn name(&self) -> &str {
            "rejecting"
        }

        fn solve(&self, _program: &LinearProgram) -> Result<LpSolution, SolverError> {
            Err(SolverError::Backend("license expired".to_string()))
        }
    }

    #[test]
    fn test_injected_solver_error_propagates() {
        let optimizer = ScheduleOptimizer::with_solver(15, Box::new(RejectingSolver));
        assert_eq!(optimizer.solver_name(), "rejecting");

        let err = optimizer
            .optimize(&BatteryAsset::default(), &[0.0], &[1.0], &[0.1], 4.0, 0.05)
            .unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::Infeasible(SolverError::Backend(_))
        ));
    }

    struct TruncatingSolver;

    impl LpSolver for TruncatingSolver {
        fn name(&self) -> &str {
            "truncating"
        }

        fn solve(&self, _program: &LinearProgram) -> Result<LpSolution, SolverError> {
            Ok(LpSolution {
                values: vec![0.0],
                objective: 0.0,
                status: "truncating: optimal".to_string(),
            })
        }
    }

    #[test]
    fn test_short_solution_vector_is_backend_error() {
        let optimizer = ScheduleOptimizer::with_solver(15, Box::new(TruncatingSolver));
        let err = optimizer
            .optimize(&BatteryAsset::default(), &[0.0, 0.0], &[1.0, 1.0], &[0.1, 0.2], 4.0, 0.05)
            .unwrap_err();
        assert!(matches!(
            err,
            ScheduleError::Infeasible(SolverError::Backend(ref msg)) if msg.contains("1 values for 7 columns")
        ));
    }

    #[test]
    fn test_status_and_timing_reported() {
        let result = optimize(
            &BatteryAsset::default(),
            &[0.0, 3.0],
            &[1.0, 1.0],
            &[0.1, 0.3],
            4.0,
            0.05,
        )
        .unwrap();
        assert_eq!(result.solver_status, "microlp: optimal");
        assert!(result.solve_time_ms >= 0.0);
        assert_eq!(result.grid_export_kw.len(), 2);
    }
}
