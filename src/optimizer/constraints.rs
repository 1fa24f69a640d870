//! Scheduling LP construction
//!
//! Decision vector (3N + 1 non-negative scalars):
//! - `charge[0..N]`     charging power per timestep (kW)
//! - `discharge[0..N]`  discharging power per timestep (kW)
//! - `soc[0..=N]`       stored energy at each timestep boundary (kWh)
//!
//! The program is plain data so the encoding can be audited, and solved by any
//! [`LpSolver`](super::LpSolver) back end.

use serde::{Deserialize, Serialize};

use crate::domain::{BatteryAsset, TimeSeries};

/// Index map from decision variables to columns of the program.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariableLayout {
    horizon: usize,
}

impl VariableLayout {
    pub fn new(horizon: usize) -> Self {
        Self { horizon }
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn charge(&self, t: usize) -> usize {
        t
    }

    pub fn discharge(&self, t: usize) -> usize {
        self.horizon + t
    }

    pub fn soc(&self, t: usize) -> usize {
        2 * self.horizon + t
    }

    /// Total column count, 3N + 1.
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        3 * self.horizon + 1
    }
}

/// Column bounds. `upper == None` means unbounded above.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub lower: f64,
    pub upper: Option<f64>,
}

impl Bounds {
    pub fn non_negative() -> Self {
        Self {
            lower: 0.0,
            upper: None,
        }
    }

    pub fn between(lower: f64, upper: f64) -> Self {
        Self {
            lower,
            upper: Some(upper),
        }
    }

    pub fn clamp(&self, value: f64) -> f64 {
        let value = value.max(self.lower);
        match self.upper {
            Some(upper) => value.min(upper),
            None => value,
        }
    }
}

/// Sparse row `Σ coefficients[i].1 * x[coefficients[i].0]` against `rhs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearConstraint {
    pub coefficients: Vec<(usize, f64)>,
    pub rhs: f64,
}

impl LinearConstraint {
    pub fn new(coefficients: Vec<(usize, f64)>, rhs: f64) -> Self {
        Self { coefficients, rhs }
    }

    pub fn lhs(&self, x: &[f64]) -> f64 {
        self.coefficients.iter().map(|&(j, a)| a * x[j]).sum()
    }
}

/// `minimise objective·x` subject to `inequalities` (≤), `equalities` (=) and column bounds.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LinearProgram {
    pub objective: Vec<f64>,
    pub bounds: Vec<Bounds>,
    pub inequalities: Vec<LinearConstraint>,
    pub equalities: Vec<LinearConstraint>,
}

impl LinearProgram {
    pub fn num_variables(&self) -> usize {
        self.objective.len()
    }

    pub fn objective_value(&self, x: &[f64]) -> f64 {
        self.objective.iter().zip(x).map(|(c, v)| c * v).sum()
    }

    /// Largest amount by which `x` breaks any bound or row (0 when feasible).
    pub fn max_violation(&self, x: &[f64]) -> f64 {
        let bounds = self.bounds.iter().zip(x).map(|(b, &v)| {
            let below = b.lower - v;
            let above = b.upper.map_or(0.0, |u| v - u);
            below.max(above)
        });
        let inequalities = self.inequalities.iter().map(|row| row.lhs(x) - row.rhs);
        let equalities = self.equalities.iter().map(|row| (row.lhs(x) - row.rhs).abs());

        bounds
            .chain(inequalities)
            .chain(equalities)
            .fold(0.0_f64, f64::max)
    }
}

/// Builds the arbitrage program for one asset over one horizon.
///
/// Inputs are assumed validated: the asset passed [`BatteryAsset::check`] and the
/// series is non-empty with equal lengths.
pub fn build_program(
    asset: &BatteryAsset,
    series: &TimeSeries,
    timestep_hours: f64,
    grid_export_limit_kw: f64,
    degradation_cost_per_kwh: f64,
) -> LinearProgram {
    let n = series.len();
    let layout = VariableLayout::new(n);
    let dt = timestep_hours;
    let eta = asset.leg_efficiency();

    let mut objective = vec![0.0; layout.len()];
    let mut bounds = vec![Bounds::non_negative(); layout.len()];

    for (t, &price) in series.price_per_kwh().iter().enumerate() {
        // Wear is charged on both legs, so cycling needs a spread above 2x the wear cost
        objective[layout.charge(t)] = (price + degradation_cost_per_kwh) * dt;
        objective[layout.discharge(t)] = -(price - degradation_cost_per_kwh) * dt;

        bounds[layout.charge(t)] = Bounds::between(0.0, asset.power_kw);
        bounds[layout.discharge(t)] = Bounds::between(0.0, asset.power_kw);
    }
    for t in 0..=n {
        bounds[layout.soc(t)] = Bounds::between(0.0, asset.capacity_kwh);
    }

    // Export cap: solar - load + discharge - charge <= limit. Import is left free.
    let inequalities = series
        .net_generation_kw()
        .into_iter()
        .enumerate()
        .map(|(t, net_generation)| {
            LinearConstraint::new(
                vec![(layout.discharge(t), 1.0), (layout.charge(t), -1.0)],
                grid_export_limit_kw - net_generation,
            )
        })
        .collect();

    // soc[t+1] - soc[t] - eta*dt*charge[t] + dt/eta*discharge[t] = 0
    let mut equalities: Vec<LinearConstraint> = (0..n)
        .map(|t| {
            LinearConstraint::new(
                vec![
                    (layout.soc(t + 1), 1.0),
                    (layout.soc(t), -1.0),
                    (layout.charge(t), -eta * dt),
                    (layout.discharge(t), dt / eta),
                ],
                0.0,
            )
        })
        .collect();
    equalities.push(LinearConstraint::new(
        vec![(layout.soc(0), 1.0)],
        asset.initial_soc_kwh(),
    ));

    LinearProgram {
        objective,
        bounds,
        inequalities,
        equalities,
    }
}
