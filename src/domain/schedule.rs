use itertools::izip;
use serde::{Deserialize, Serialize};

use super::TimeSeries;
use crate::finance::FinancialMetrics;

/// Solved battery trajectory over one horizon.
///
/// `charge_kw` and `discharge_kw` hold N values, `soc_kwh` holds N+1 boundary
/// points starting with the initial state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub charge_kw: Vec<f64>,
    pub discharge_kw: Vec<f64>,
    pub soc_kwh: Vec<f64>,
}

impl Schedule {
    /// Number of timesteps N.
    pub fn len(&self) -> usize {
        self.charge_kw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.charge_kw.is_empty()
    }

    /// Battery contribution to the connection point (positive = discharging).
    pub fn net_battery_kw(&self) -> Vec<f64> {
        izip!(&self.discharge_kw, &self.charge_kw)
            .map(|(discharge, charge)| discharge - charge)
            .collect()
    }

    /// State of charge as percent of capacity, N+1 points.
    pub fn soc_pct(&self, capacity_kwh: f64) -> Vec<f64> {
        self.soc_kwh
            .iter()
            .map(|soc| soc / capacity_kwh * 100.0)
            .collect()
    }

    /// Net export at the connection point (positive = export, negative = import).
    pub fn grid_export_kw(&self, series: &TimeSeries) -> Vec<f64> {
        izip!(
            series.solar_kw(),
            series.load_kw(),
            &self.discharge_kw,
            &self.charge_kw
        )
        .map(|(solar, load, discharge, charge)| solar - load + discharge - charge)
        .collect()
    }
}

/// Everything one optimizer invocation produces. Owned by the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub schedule: Schedule,
    /// N+1 points (%)
    pub soc_trajectory_pct: Vec<f64>,
    /// Net grid power per timestep (kW, + export / - import)
    pub grid_export_kw: Vec<f64>,
    #[serde(flatten)]
    pub metrics: FinancialMetrics,
    /// Minimised objective: negated profit including the linear wear term
    pub objective_value: f64,
    pub solver_status: String,
    pub solve_time_ms: f64,
}

impl OptimizationResult {
    pub fn net_profit(&self) -> f64 {
        self.metrics.net_profit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule() -> Schedule {
        Schedule {
            charge_kw: vec![1.0, 0.0],
            discharge_kw: vec![0.0, 2.0],
            soc_kwh: vec![2.0, 2.25, 1.75],
        }
    }

    #[test]
    fn test_net_battery_power() {
        assert_eq!(schedule().net_battery_kw(), vec![-1.0, 2.0]);
        assert_eq!(schedule().len(), 2);
    }

    #[test]
    fn test_soc_percent_keeps_boundary_points() {
        let pct = schedule().soc_pct(4.0);
        assert_eq!(pct, vec![50.0, 56.25, 43.75]);
    }

    #[test]
    fn test_grid_export() {
        let series = TimeSeries::from_slices(&[3.0, 0.0], &[1.0, 1.0], &[0.1, 0.3]).unwrap();
        // t0: 3 - 1 - 1 charge = 1 export, t1: 0 - 1 + 2 discharge = 1 export
        assert_eq!(schedule().grid_export_kw(&series), vec![1.0, 1.0]);
    }
}
