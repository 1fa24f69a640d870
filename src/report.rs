//! Schedule Assessment
//!
//! Runs one optimization and evaluates the resulting schedule from each
//! independent angle: quadratic wear, grid compliance and the no-battery
//! baseline. The evaluators only read the finished schedule.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::config::Config;
use crate::domain::{timestep_hours, BatteryAsset, OptimizationResult, TimeSeries};
use crate::error::ScheduleError;
use crate::finance::{BaselineCost, BenefitAnalysis};
use crate::grid::GridReport;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assessment {
    pub asset: BatteryAsset,
    pub result: OptimizationResult,
    /// Quadratic depth-of-discharge wear of the solved schedule
    pub degradation_cost: f64,
    pub cycle_count: f64,
    /// net_profit - degradation_cost
    pub effective_profit: f64,
    /// Energy the battery delivered net of what it absorbed (kWh)
    pub net_battery_kwh: f64,
    pub grid: GridReport,
    pub critical_violations: usize,
    pub baseline: BaselineCost,
    pub benefit: BenefitAnalysis,
}

/// Wires the configured components into one assessment pass.
#[derive(Debug, Clone)]
pub struct Assessor {
    config: Config,
}

impl Assessor {
    pub fn from_config(config: &Config) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    #[instrument(skip_all, fields(horizon = series.len()))]
    pub fn assess(
        &self,
        asset: &BatteryAsset,
        series: &TimeSeries,
    ) -> Result<Assessment, ScheduleError> {
        let market = &self.config.market;
        let result = self.config.optimizer().optimize_series(
            asset,
            series,
            market.grid_export_limit_kw,
            market.degradation_cost_per_kwh,
        )?;

        let dt = timestep_hours(market.timestep_minutes);
        let wear = self.config.degradation_model(asset);
        let degradation_cost = wear.cost(&result.schedule.discharge_kw, dt);
        let cycle_count = wear.cycles(&result.schedule.discharge_kw, dt);
        let effective_profit = result.net_profit() - degradation_cost;
        let net_battery_kwh: f64 = result.schedule.net_battery_kw().iter().sum::<f64>() * dt;

        let grid = self
            .config
            .grid_checker()
            .check_violations(&result.grid_export_kw, market.timestep_minutes);
        let critical_violations = grid.critical_count();
        let baseline = self.config.baseline_estimator().estimate(series, dt);
        let benefit = BenefitAnalysis::compare(
            effective_profit,
            &baseline,
            self.config.benefit.battery_cost,
            cycle_count,
            wear.warranty_cycles,
        );

        info!(
            net_profit = result.net_profit(),
            effective_profit,
            net_battery_kwh,
            violations = grid.violation_count,
            critical_violations,
            daily_benefit = benefit.daily_benefit,
            "assessment complete"
        );

        Ok(Assessment {
            asset: *asset,
            result,
            degradation_cost,
            cycle_count,
            effective_profit,
            net_battery_kwh,
            grid,
            critical_violations,
            baseline,
            benefit,
        })
    }
}
