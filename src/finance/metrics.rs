//! Schedule Financial Metrics
//!
//! Revenue and cost are settled on the net flow at the connection point, so the
//! battery's value shows up as displaced imports as well as added exports.

use itertools::izip;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::fmt;

use crate::domain::{Schedule, TimeSeries};

/// Standard deviations below this are treated as zero.
const STD_DEV_EPSILON: f64 = 1e-12;

/// Derived scalars of one solved schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialMetrics {
    /// Σ max(0, export) · price · Δt
    pub revenue: f64,
    /// Σ max(0, -export) · price · Δt
    pub cost: f64,
    pub net_profit: f64,
    /// Mean over standard deviation of per-step discharge revenue
    pub sharpe_ratio: f64,
    /// 100 - lowest SoC reached (%)
    pub max_drawdown_pct: f64,
    /// Equivalent full cycles over the horizon
    pub utilization_factor: f64,
}

impl FinancialMetrics {
    /// Evaluates `schedule` against the series it was solved for.
    ///
    /// `grid_export_kw` and `soc_pct` are the derived series already held by the
    /// caller; `soc_pct` must carry all N+1 boundary points.
    pub fn calculate(
        schedule: &Schedule,
        series: &TimeSeries,
        grid_export_kw: &[f64],
        soc_pct: &[f64],
        capacity_kwh: f64,
        timestep_hours: f64,
    ) -> Self {
        let dt = timestep_hours;

        let (revenue, cost) = izip!(grid_export_kw, series.price_per_kwh()).fold(
            (0.0, 0.0),
            |(revenue, cost), (&export, &price)| {
                (
                    revenue + export.max(0.0) * price * dt,
                    cost + (-export).max(0.0) * price * dt,
                )
            },
        );

        let min_soc = soc_pct.iter().copied().fold(f64::INFINITY, f64::min);
        let max_drawdown_pct = if min_soc.is_finite() {
            100.0 - min_soc
        } else {
            0.0
        };

        let discharged_kwh: f64 = schedule.discharge_kw.iter().map(|d| d * dt).sum();
        let utilization_factor = if capacity_kwh > 0.0 {
            discharged_kwh / capacity_kwh
        } else {
            0.0
        };

        Self {
            revenue,
            cost,
            net_profit: revenue - cost,
            sharpe_ratio: sharpe_ratio(&schedule.discharge_kw, series.price_per_kwh()),
            max_drawdown_pct,
            utilization_factor,
        }
    }
}

impl fmt::Display for FinancialMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Schedule Financials:")?;
        writeln!(f, "  Revenue:      {:.4}", self.revenue)?;
        writeln!(f, "  Cost:         {:.4}", self.cost)?;
        writeln!(f, "  Net profit:   {:.4}", self.net_profit)?;
        writeln!(f, "  Sharpe ratio: {:.3}", self.sharpe_ratio)?;
        writeln!(f, "  Max drawdown: {:.1}%", self.max_drawdown_pct)?;
        write!(f, "  Utilization:  {:.3} cycles", self.utilization_factor)
    }
}

/// `mean(d·p) / std(d·p)` with population standard deviation.
///
/// Returns 0 for an empty series or when every step earns the same amount.
pub fn sharpe_ratio(discharge_kw: &[f64], price_per_kwh: &[f64]) -> f64 {
    let returns: Vec<f64> = izip!(discharge_kw, price_per_kwh)
        .map(|(d, p)| d * p)
        .collect();
    if returns.is_empty() {
        return 0.0;
    }

    let std_dev = returns.iter().population_std_dev();
    if !std_dev.is_finite() || std_dev < STD_DEV_EPSILON {
        return 0.0;
    }

    returns.iter().mean() / std_dev
}
