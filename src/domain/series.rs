use itertools::izip;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Default resolution of every series (quarter-hourly).
pub const DEFAULT_TIMESTEP_MINUTES: u32 = 15;

/// Converts a timestep in minutes to hours.
pub fn timestep_hours(timestep_minutes: u32) -> f64 {
    f64::from(timestep_minutes) / 60.0
}

/// Exogenous solar, load and price series over one horizon.
///
/// Construction guarantees equal, non-zero lengths and finite values, so
/// consumers can index all three series with the same `t`. Deserialization
/// goes through the same checks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawTimeSeries")]
pub struct TimeSeries {
    solar_kw: Vec<f64>,
    load_kw: Vec<f64>,
    price_per_kwh: Vec<f64>,
}

/// Unchecked wire shape of [`TimeSeries`].
#[derive(Deserialize)]
struct RawTimeSeries {
    solar_kw: Vec<f64>,
    load_kw: Vec<f64>,
    price_per_kwh: Vec<f64>,
}

impl TryFrom<RawTimeSeries> for TimeSeries {
    type Error = ValidationError;

    fn try_from(raw: RawTimeSeries) -> Result<Self, Self::Error> {
        Self::new(raw.solar_kw, raw.load_kw, raw.price_per_kwh)
    }
}

impl TimeSeries {
    pub fn new(
        solar_kw: Vec<f64>,
        load_kw: Vec<f64>,
        price_per_kwh: Vec<f64>,
    ) -> Result<Self, ValidationError> {
        if solar_kw.len() != load_kw.len() || solar_kw.len() != price_per_kwh.len() {
            return Err(ValidationError::LengthMismatch {
                solar: solar_kw.len(),
                load: load_kw.len(),
                price: price_per_kwh.len(),
            });
        }
        if solar_kw.is_empty() {
            return Err(ValidationError::EmptyHorizon);
        }

        for (series, values) in [
            ("solar_kw", &solar_kw),
            ("load_kw", &load_kw),
            ("price_per_kwh", &price_per_kwh),
        ] {
            if let Some((index, &value)) = values.iter().enumerate().find(|(_, v)| !v.is_finite()) {
                return Err(ValidationError::NonFiniteValue {
                    series,
                    index,
                    value,
                });
            }
        }

        Ok(Self {
            solar_kw,
            load_kw,
            price_per_kwh,
        })
    }

    pub fn from_slices(
        solar_kw: &[f64],
        load_kw: &[f64],
        price_per_kwh: &[f64],
    ) -> Result<Self, ValidationError> {
        Self::new(solar_kw.to_vec(), load_kw.to_vec(), price_per_kwh.to_vec())
    }

    /// Number of timesteps N.
    pub fn len(&self) -> usize {
        self.solar_kw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.solar_kw.is_empty()
    }

    pub fn solar_kw(&self) -> &[f64] {
        &self.solar_kw
    }

    pub fn load_kw(&self) -> &[f64] {
        &self.load_kw
    }

    pub fn price_per_kwh(&self) -> &[f64] {
        &self.price_per_kwh
    }

    /// Solar minus load per timestep: the export the site produces with an idle battery.
    pub fn net_generation_kw(&self) -> Vec<f64> {
        izip!(&self.solar_kw, &self.load_kw)
            .map(|(solar, load)| solar - load)
            .collect()
    }
}
