use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::ValidationError;

/// Static configuration of one battery, fixed for a single optimization call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct BatteryAsset {
    /// Usable energy capacity (kWh)
    #[validate(range(exclusive_min = 0.0))]
    pub capacity_kwh: f64,
    /// Symmetric charge/discharge power limit (kW)
    #[validate(range(exclusive_min = 0.0))]
    pub power_kw: f64,
    /// Round-trip efficiency (0, 1]
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub efficiency: f64,
    /// State of charge at the start of the horizon (%)
    #[validate(range(min = 0.0, max = 100.0))]
    pub initial_soc_pct: f64,
}

impl Default for BatteryAsset {
    fn default() -> Self {
        // 13.5 kWh / 5 kW home battery
        Self {
            capacity_kwh: 13.5,
            power_kw: 5.0,
            efficiency: 0.90,
            initial_soc_pct: 50.0,
        }
    }
}

impl BatteryAsset {
    pub fn new(capacity_kwh: f64, power_kw: f64, efficiency: f64, initial_soc_pct: f64) -> Self {
        Self {
            capacity_kwh,
            power_kw,
            efficiency,
            initial_soc_pct,
        }
    }

    /// Checks finiteness and physical ranges.
    pub fn check(&self) -> Result<(), ValidationError> {
        let fields = [
            ("capacity_kwh", self.capacity_kwh),
            ("power_kw", self.power_kw),
            ("efficiency", self.efficiency),
            ("initial_soc_pct", self.initial_soc_pct),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(ValidationError::NonFiniteParameter { name, value });
            }
        }

        self.validate()?;
        Ok(())
    }

    /// Stored energy at t = 0 (kWh).
    pub fn initial_soc_kwh(&self) -> f64 {
        self.initial_soc_pct / 100.0 * self.capacity_kwh
    }

    /// One-way efficiency applied on both the charge and the discharge leg.
    pub fn leg_efficiency(&self) -> f64 {
        self.efficiency.sqrt()
    }
}

/// Cycle-wear cost estimate derived from warranty economics.
///
/// Wear scales with the square of depth of discharge per timestep, so one deep
/// discharge costs more than several shallow ones moving the same energy.
/// This is reported independently of the flat per-kWh wear term used in the
/// scheduling objective; the two are not reconciled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegradationModel {
    pub capacity_kwh: f64,
    pub warranty_cycles: u32,
    pub replacement_cost: f64,
    /// Capacity guaranteed at end of warranty (%)
    pub capacity_retention_pct: f64,
}

impl Default for DegradationModel {
    fn default() -> Self {
        // 70% retention over 3650 cycles on a 7000 unit replacement
        Self {
            capacity_kwh: 13.5,
            warranty_cycles: 3650,
            replacement_cost: 7000.0,
            capacity_retention_pct: 70.0,
        }
    }
}

impl DegradationModel {
    pub fn new(
        capacity_kwh: f64,
        warranty_cycles: u32,
        replacement_cost: f64,
        capacity_retention_pct: f64,
    ) -> Self {
        Self {
            capacity_kwh,
            warranty_cycles,
            replacement_cost,
            capacity_retention_pct,
        }
    }

    /// Default economics applied to a specific asset's capacity.
    pub fn for_asset(asset: &BatteryAsset) -> Self {
        Self {
            capacity_kwh: asset.capacity_kwh,
            ..Self::default()
        }
    }

    /// Monetary wear of one full equivalent cycle.
    pub fn cost_per_cycle(&self) -> f64 {
        if self.warranty_cycles == 0 {
            return 0.0;
        }
        let lost_value = self.replacement_cost * (1.0 - self.capacity_retention_pct / 100.0);
        lost_value / f64::from(self.warranty_cycles)
    }

    /// Quadratic depth-of-discharge wear cost of a discharge schedule.
    pub fn cost(&self, discharge_kw: &[f64], timestep_hours: f64) -> f64 {
        if self.capacity_kwh <= 0.0 {
            return 0.0;
        }
        let weighted_cycles: f64 = discharge_kw
            .iter()
            .map(|&kw| {
                let depth = kw * timestep_hours / self.capacity_kwh;
                depth * depth
            })
            .sum();
        weighted_cycles * self.cost_per_cycle()
    }

    /// Equivalent full cycles of a discharge schedule.
    pub fn cycles(&self, discharge_kw: &[f64], timestep_hours: f64) -> f64 {
        if self.capacity_kwh <= 0.0 {
            return 0.0;
        }
        discharge_kw.iter().sum::<f64>() * timestep_hours / self.capacity_kwh
    }
}

/// Wear cost under the default warranty economics.
pub fn degradation_cost(discharge_kw: &[f64], timestep_hours: f64) -> f64 {
    DegradationModel::default().cost(discharge_kw, timestep_hours)
}

/// Equivalent full cycles for the default 13.5 kWh battery.
pub fn cycle_count(discharge_kw: &[f64], timestep_hours: f64) -> f64 {
    DegradationModel::default().cycles(discharge_kw, timestep_hours)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_default_asset_is_valid() {
        assert!(BatteryAsset::default().check().is_ok());
    }

    #[rstest]
    #[case::zero_capacity(BatteryAsset::new(0.0, 5.0, 0.9, 50.0))]
    #[case::negative_power(BatteryAsset::new(10.0, -1.0, 0.9, 50.0))]
    #[case::zero_efficiency(BatteryAsset::new(10.0, 5.0, 0.0, 50.0))]
    #[case::efficiency_above_one(BatteryAsset::new(10.0, 5.0, 1.01, 50.0))]
    #[case::soc_above_full(BatteryAsset::new(10.0, 5.0, 0.9, 100.5))]
    #[case::soc_negative(BatteryAsset::new(10.0, 5.0, 0.9, -1.0))]
    fn test_invalid_asset_rejected(#[case] asset: BatteryAsset) {
        assert!(matches!(
            asset.check(),
            Err(ValidationError::InvalidAsset(_))
        ));
    }

    #[test]
    fn test_nan_asset_rejected() {
        let asset = BatteryAsset::new(f64::NAN, 5.0, 0.9, 50.0);
        assert!(matches!(
            asset.check(),
            Err(ValidationError::NonFiniteParameter { name: "capacity_kwh", .. })
        ));
    }

    #[test]
    fn test_boundary_asset_accepted() {
        assert!(BatteryAsset::new(4.0, 2.0, 1.0, 100.0).check().is_ok());
        assert!(BatteryAsset::new(4.0, 2.0, 0.5, 0.0).check().is_ok());
    }

    #[test]
    fn test_initial_soc_and_leg_efficiency() {
        let asset = BatteryAsset::new(10.0, 5.0, 0.81, 40.0);
        assert!((asset.initial_soc_kwh() - 4.0).abs() < 1e-12);
        assert!((asset.leg_efficiency() - 0.9).abs() < 1e-12);
    }

    #[test]
    fn test_cost_per_cycle_from_warranty() {
        let model = DegradationModel::default();
        // 7000 * 0.3 / 3650
        assert!((model.cost_per_cycle() - 0.575_342_465).abs() < 1e-6);
    }

    #[test]
    fn test_deep_discharge_costs_more_than_shallow() {
        let model = DegradationModel::default();

        // One full-depth hour vs two half-depth hours moving the same energy
        let deep = model.cost(&[13.5], 1.0);
        let shallow = model.cost(&[6.75, 6.75], 1.0);

        assert!((deep - model.cost_per_cycle()).abs() < 1e-9);
        assert!((shallow - model.cost_per_cycle() / 2.0).abs() < 1e-9);
        assert!((model.cycles(&[13.5], 1.0) - model.cycles(&[6.75, 6.75], 1.0)).abs() < 1e-12);
    }

    #[test]
    fn test_cycle_count() {
        // 4 x 15 min at 13.5 kW = 13.5 kWh
        assert!((cycle_count(&[13.5; 4], 0.25) - 1.0).abs() < 1e-12);
        assert_eq!(cycle_count(&[], 0.25), 0.0);
        assert_eq!(degradation_cost(&[0.0, 0.0], 0.25), 0.0);
    }

    #[test]
    fn test_degenerate_model_is_free() {
        let model = DegradationModel::new(13.5, 0, 7000.0, 70.0);
        assert_eq!(model.cost(&[5.0], 1.0), 0.0);

        let model = DegradationModel::new(0.0, 3650, 7000.0, 70.0);
        assert_eq!(model.cycles(&[5.0], 1.0), 0.0);
    }

    #[test]
    fn test_for_asset_uses_asset_capacity() {
        let asset = BatteryAsset::new(4.0, 2.0, 1.0, 100.0);
        let model = DegradationModel::for_asset(&asset);
        assert_eq!(model.capacity_kwh, 4.0);
        assert_eq!(model.warranty_cycles, 3650);
    }
}
