use itertools::izip;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::TimeSeries;
use crate::error::ValidationError;

/// Settlement of the site with no battery participation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaselineCost {
    pub cost: f64,
    pub revenue: f64,
    /// revenue - cost
    pub net: f64,
}

/// No-battery counterfactual. Exports are paid a fraction of the import price,
/// imports pay the full price.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
pub struct BaselineEstimator {
    #[validate(range(min = 0.0, max = 1.0))]
    pub export_tariff_fraction: f64,
}

impl Default for BaselineEstimator {
    fn default() -> Self {
        Self {
            export_tariff_fraction: 0.5,
        }
    }
}

impl BaselineEstimator {
    pub fn new(export_tariff_fraction: f64) -> Self {
        Self {
            export_tariff_fraction,
        }
    }

    pub fn estimate(&self, series: &TimeSeries, timestep_hours: f64) -> BaselineCost {
        let dt = timestep_hours;
        let (cost, revenue) = izip!(series.solar_kw(), series.load_kw(), series.price_per_kwh())
            .fold((0.0, 0.0), |(cost, revenue), (solar, load, price)| {
                let net = solar - load;
                (
                    cost + (-net).max(0.0) * price * dt,
                    revenue + net.max(0.0) * price * self.export_tariff_fraction * dt,
                )
            });

        BaselineCost {
            cost,
            revenue,
            net: revenue - cost,
        }
    }
}

/// Baseline with the default 50 % export tariff.
pub fn baseline_cost(
    solar_kw: &[f64],
    load_kw: &[f64],
    price_per_kwh: &[f64],
    timestep_hours: f64,
) -> Result<BaselineCost, ValidationError> {
    if !timestep_hours.is_finite() || timestep_hours <= 0.0 {
        return Err(ValidationError::InvalidTimestep(timestep_hours));
    }
    let series = TimeSeries::from_slices(solar_kw, load_kw, price_per_kwh)?;
    Ok(BaselineEstimator::default().estimate(&series, timestep_hours))
}

/// Battery value over the baseline, extrapolated from one horizon treated as one day.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BenefitAnalysis {
    pub daily_benefit: f64,
    pub annual_benefit: f64,
    /// `None` when the battery never pays back
    pub payback_years: Option<f64>,
    pub roi_pct: f64,
    /// Years until the warranty cycle count is used up at this daily rate
    pub years_to_warranty: Option<f64>,
}

impl BenefitAnalysis {
    pub fn compare(
        effective_profit: f64,
        baseline: &BaselineCost,
        battery_cost: f64,
        daily_cycles: f64,
        warranty_cycles: u32,
    ) -> Self {
        let daily_benefit = effective_profit - baseline.net;
        let annual_benefit = daily_benefit * 365.0;

        let payback_years = (annual_benefit > 0.0).then(|| battery_cost / annual_benefit);
        let roi_pct = if battery_cost > 0.0 {
            annual_benefit / battery_cost * 100.0
        } else {
            0.0
        };
        let annual_cycles = daily_cycles * 365.0;
        let years_to_warranty =
            (annual_cycles > 0.0).then(|| f64::from(warranty_cycles) / annual_cycles);

        Self {
            daily_benefit,
            annual_benefit,
            payback_years,
            roi_pct,
            years_to_warranty,
        }
    }
}
