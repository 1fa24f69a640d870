use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use validator::Validate;

use crate::domain::{BatteryAsset, DegradationModel, DEFAULT_TIMESTEP_MINUTES};
use crate::finance::BaselineEstimator;
use crate::grid::{GridConstraintChecker, GridPhysics};
use crate::optimizer::{ScheduleOptimizer, DEFAULT_DEGRADATION_COST_PER_KWH};

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
const ENV_PREFIX: &str = "BESS__";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] figment::Error),

    #[error("invalid configuration: {0}")]
    Invalid(#[from] validator::ValidationErrors),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct Config {
    #[validate(nested)]
    pub battery: BatteryAsset,
    #[validate(nested)]
    pub market: MarketConfig,
    #[validate(nested)]
    pub grid: GridPhysics,
    #[validate(nested)]
    pub degradation: DegradationConfig,
    #[validate(nested)]
    pub benefit: BenefitConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct MarketConfig {
    /// Connection export limit (kW)
    pub grid_export_limit_kw: f64,
    /// Flat wear charge per kWh in the scheduling objective
    #[validate(range(min = 0.0))]
    pub degradation_cost_per_kwh: f64,
    /// Share of the import price paid for exports in the no-battery baseline
    #[validate(range(min = 0.0, max = 1.0))]
    pub export_tariff_fraction: f64,
    #[validate(range(min = 1, max = 1440))]
    pub timestep_minutes: u32,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            grid_export_limit_kw: 4.0,
            degradation_cost_per_kwh: DEFAULT_DEGRADATION_COST_PER_KWH,
            export_tariff_fraction: 0.5,
            timestep_minutes: DEFAULT_TIMESTEP_MINUTES,
        }
    }
}

/// Warranty economics; capacity is taken from the battery section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct DegradationConfig {
    #[validate(range(min = 1))]
    pub warranty_cycles: u32,
    #[validate(range(min = 0.0))]
    pub replacement_cost: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub capacity_retention_pct: f64,
}

impl Default for DegradationConfig {
    fn default() -> Self {
        let model = DegradationModel::default();
        Self {
            warranty_cycles: model.warranty_cycles,
            replacement_cost: model.replacement_cost,
            capacity_retention_pct: model.capacity_retention_pct,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct BenefitConfig {
    /// Installed cost of the battery for payback analysis
    #[validate(range(min = 0.0))]
    pub battery_cost: f64,
}

impl Default for BenefitConfig {
    fn default() -> Self {
        Self {
            battery_cost: 7000.0,
        }
    }
}

impl Config {
    /// `config/default.toml` overlaid with `BESS__*` environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let figment = Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"));
        Self::from_figment(figment)
    }

    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn degradation_model(&self, asset: &BatteryAsset) -> DegradationModel {
        DegradationModel::new(
            asset.capacity_kwh,
            self.degradation.warranty_cycles,
            self.degradation.replacement_cost,
            self.degradation.capacity_retention_pct,
        )
    }

    pub fn optimizer(&self) -> ScheduleOptimizer {
        ScheduleOptimizer::new(self.market.timestep_minutes)
    }

    pub fn grid_checker(&self) -> GridConstraintChecker {
        GridConstraintChecker::with_physics(self.market.grid_export_limit_kw, self.grid)
    }

    pub fn baseline_estimator(&self) -> BaselineEstimator {
        BaselineEstimator::new(self.market.export_tariff_fraction)
    }
}
