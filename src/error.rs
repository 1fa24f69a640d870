use thiserror::Error;

use crate::optimizer::SolverError;

/// Input problems detected before any program is built.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("time series length mismatch: solar={solar}, load={load}, price={price}")]
    LengthMismatch {
        solar: usize,
        load: usize,
        price: usize,
    },

    #[error("time series is empty, at least one timestep is required")]
    EmptyHorizon,

    #[error("{series}[{index}] is not finite: {value}")]
    NonFiniteValue {
        series: &'static str,
        index: usize,
        value: f64,
    },

    #[error("{name} is not finite: {value}")]
    NonFiniteParameter { name: &'static str, value: f64 },

    #[error("timestep must be positive, got {0} h")]
    InvalidTimestep(f64),

    #[error("invalid battery asset: {0}")]
    InvalidAsset(String),
}

impl From<validator::ValidationErrors> for ValidationError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ValidationError::InvalidAsset(errors.to_string())
    }
}

/// Failure of a single scheduling call. No partial schedule accompanies either variant.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("optimization infeasible: {0}")]
    Infeasible(#[from] SolverError),
}

impl ScheduleError {
    pub fn is_validation(&self) -> bool {
        matches!(self, ScheduleError::Validation(_))
    }

    pub fn is_infeasible(&self) -> bool {
        matches!(self, ScheduleError::Infeasible(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = ValidationError::LengthMismatch {
            solar: 4,
            load: 3,
            price: 4,
        };
        assert_eq!(
            error.to_string(),
            "time series length mismatch: solar=4, load=3, price=4"
        );

        let error = ScheduleError::from(SolverError::Infeasible);
        assert_eq!(
            error.to_string(),
            "optimization infeasible: problem is infeasible"
        );
        assert!(error.is_infeasible());
    }

    #[test]
    fn test_validation_wraps_into_schedule_error() {
        let error: ScheduleError = ValidationError::EmptyHorizon.into();
        assert!(error.is_validation());
        assert!(!error.is_infeasible());
    }
}
