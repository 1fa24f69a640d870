//! Grid Connection Compliance
//!
//! Re-checks a net export profile against the connection export limit and
//! estimates feeder voltage rise. The checker reports; it never alters a schedule
//! and never fails.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use validator::Validate;

/// Severity tier of a single export breach
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

/// Timestep whose export exceeds the connection limit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridViolation {
    pub timestep: usize,
    /// Clock time from the start of the horizon, `HH:MM`
    pub time_label: String,
    pub net_export_kw: f64,
    pub limit_kw: f64,
    pub excess_kw: f64,
    pub voltage_rise_pct: f64,
    pub severity: Severity,
}

/// Voltage and loading summary of an export profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridImpact {
    pub max_voltage_rise_v: f64,
    pub max_voltage_rise_pct: f64,
    /// max(clamp(export / limit, 0, 1))
    pub peak_grid_stress: f64,
    /// Exporting steps above the near-limit fraction of the limit
    pub times_at_limit: usize,
    /// Peak voltage rise stays under the statutory limit
    pub voltage_compliant: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridReport {
    pub violations: Vec<GridViolation>,
    pub violation_count: usize,
    pub max_voltage_rise_v: f64,
    pub max_voltage_rise_pct: f64,
    pub peak_grid_stress: f64,
    pub times_at_limit: usize,
    /// No violations and voltage rise under the statutory limit
    pub g99_compliant: bool,
}

impl GridReport {
    pub fn critical_count(&self) -> usize {
        self.violations
            .iter()
            .filter(|v| v.severity == Severity::Critical)
            .count()
    }
}

/// Feeder and threshold parameters, independent of the export limit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct GridPhysics {
    /// LV feeder resistance (Ω)
    #[validate(range(min = 0.0))]
    pub line_resistance_ohm: f64,
    #[validate(range(exclusive_min = 0.0))]
    pub nominal_voltage_v: f64,
    /// Excess above which a breach is critical (kW)
    #[validate(range(min = 0.0))]
    pub critical_excess_kw: f64,
    /// Statutory voltage rise limit (% of nominal)
    #[validate(range(exclusive_min = 0.0))]
    pub voltage_rise_limit_pct: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub near_limit_fraction: f64,
}

impl Default for GridPhysics {
    fn default() -> Self {
        Self {
            line_resistance_ohm: 0.075,
            nominal_voltage_v: 230.0,
            critical_excess_kw: 0.5,
            voltage_rise_limit_pct: 10.0,
            near_limit_fraction: 0.95,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridConstraintChecker {
    export_limit_kw: f64,
    physics: GridPhysics,
}

impl Default for GridConstraintChecker {
    fn default() -> Self {
        Self::new(4.0)
    }
}

impl GridConstraintChecker {
    pub fn new(export_limit_kw: f64) -> Self {
        Self::with_physics(export_limit_kw, GridPhysics::default())
    }

    pub fn with_physics(export_limit_kw: f64, physics: GridPhysics) -> Self {
        Self {
            export_limit_kw,
            physics,
        }
    }

    pub fn export_limit_kw(&self) -> f64 {
        self.export_limit_kw
    }

    pub fn physics(&self) -> &GridPhysics {
        &self.physics
    }

    /// Voltage rise in volts for an export; imports cause no rise.
    pub fn voltage_rise_v(&self, export_kw: f64) -> f64 {
        export_kw.max(0.0) * 1000.0 * self.physics.line_resistance_ohm
            / self.physics.nominal_voltage_v
    }

    pub fn voltage_rise_pct(&self, export_kw: f64) -> f64 {
        self.voltage_rise_v(export_kw) / self.physics.nominal_voltage_v * 100.0
    }

    fn stress(&self, export_kw: f64) -> f64 {
        let export = export_kw.max(0.0);
        if self.export_limit_kw > 0.0 {
            (export / self.export_limit_kw).clamp(0.0, 1.0)
        } else if export > 0.0 {
            1.0
        } else {
            0.0
        }
    }

    /// Voltage and stress summary over all timesteps.
    pub fn grid_impact(&self, grid_export_kw: &[f64]) -> GridImpact {
        let max_export = grid_export_kw
            .iter()
            .copied()
            .fold(0.0_f64, f64::max);
        let max_voltage_rise_pct = self.voltage_rise_pct(max_export);
        let near_limit = self.export_limit_kw * self.physics.near_limit_fraction;

        GridImpact {
            max_voltage_rise_v: self.voltage_rise_v(max_export),
            max_voltage_rise_pct,
            peak_grid_stress: grid_export_kw
                .iter()
                .map(|&e| self.stress(e))
                .fold(0.0, f64::max),
            times_at_limit: grid_export_kw
                .iter()
                .filter(|&&e| e > 0.0 && e > near_limit)
                .count(),
            voltage_compliant: max_voltage_rise_pct < self.physics.voltage_rise_limit_pct,
        }
    }

    /// Scans an export profile for limit breaches. Empty input yields an empty,
    /// compliant report.
    #[instrument(skip_all, fields(horizon = grid_export_kw.len()))]
    pub fn check_violations(&self, grid_export_kw: &[f64], timestep_minutes: u32) -> GridReport {
        let violations: Vec<GridViolation> = grid_export_kw
            .iter()
            .enumerate()
            .filter(|&(_, &export)| export > self.export_limit_kw)
            .map(|(t, &export)| {
                let excess_kw = export - self.export_limit_kw;
                let severity = if excess_kw > self.physics.critical_excess_kw {
                    Severity::Critical
                } else {
                    Severity::Warning
                };
                GridViolation {
                    timestep: t,
                    time_label: time_label(t, timestep_minutes),
                    net_export_kw: export,
                    limit_kw: self.export_limit_kw,
                    excess_kw,
                    voltage_rise_pct: self.voltage_rise_pct(export),
                    severity,
                }
            })
            .collect();

        let impact = self.grid_impact(grid_export_kw);
        debug!(
            violations = violations.len(),
            peak_stress = impact.peak_grid_stress,
            "grid check complete"
        );

        GridReport {
            violation_count: violations.len(),
            g99_compliant: violations.is_empty() && impact.voltage_compliant,
            violations,
            max_voltage_rise_v: impact.max_voltage_rise_v,
            max_voltage_rise_pct: impact.max_voltage_rise_pct,
            peak_grid_stress: impact.peak_grid_stress,
            times_at_limit: impact.times_at_limit,
        }
    }

    /// Power that must be shed per timestep to respect the export limit.
    pub fn curtailment_required(&self, unconstrained_export_kw: &[f64]) -> Vec<f64> {
        unconstrained_export_kw
            .iter()
            .map(|e| (e - self.export_limit_kw).max(0.0))
            .collect()
    }
}

/// `HH:MM` offset of timestep `t` from the start of the horizon. Hours keep
/// counting past 24 on multi-day horizons.
pub fn time_label(t: usize, timestep_minutes: u32) -> String {
    let minutes = t * timestep_minutes as usize;
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}

/// Check with the default connection parameters.
pub fn check_violations(grid_export_kw: &[f64], timestep_minutes: u32) -> GridReport {
    GridConstraintChecker::default().check_violations(grid_export_kw, timestep_minutes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_single_critical_violation() {
        let report = check_violations(&[1.0, 3.0, 5.0, 2.0], 15);

        assert_eq!(report.violation_count, 1);
        assert_eq!(report.critical_count(), 1);
        let violation = &report.violations[0];
        assert_eq!(violation.timestep, 2);
        assert_eq!(violation.time_label, "00:30");
        assert_eq!(violation.severity, Severity::Critical);
        assert!((violation.excess_kw - 1.0).abs() < 0.001);
        assert_eq!(violation.limit_kw, 4.0);

        assert_eq!(report.times_at_limit, 1);
        assert_eq!(report.peak_grid_stress, 1.0);
        // 5 kW * 1000 * 0.075 / 230
        assert!((report.max_voltage_rise_v - 1.6304).abs() < 0.001);
        assert!((report.max_voltage_rise_pct - 0.7089).abs() < 0.001);
        assert!(!report.g99_compliant);
    }

    #[rstest]
    #[case(4.3, Severity::Warning)]
    #[case(4.5, Severity::Warning)]
    #[case(4.6, Severity::Critical)]
    fn test_severity_threshold(#[case] export: f64, #[case] expected: Severity) {
        let report = check_violations(&[export], 15);
        assert_eq!(report.violations[0].severity, expected);
    }

    #[test]
    fn test_clean_profile_is_compliant() {
        let report = check_violations(&[-2.0, 0.0, 3.9, 4.0], 15);
        assert!(report.violations.is_empty());
        assert!(report.g99_compliant);
        // 3.9 and 4.0 both sit above 95 % of the limit
        assert_eq!(report.times_at_limit, 2);
        assert_eq!(report.peak_grid_stress, 1.0);
    }

    #[test]
    fn test_voltage_rise_alone_breaks_compliance() {
        let checker = GridConstraintChecker::new(100.0);
        let report = checker.check_violations(&[80.0], 15);
        assert!(report.violations.is_empty());
        assert!(report.max_voltage_rise_pct >= 10.0);
        assert!(!report.g99_compliant);
    }

    #[test]
    fn test_empty_profile() {
        let report = check_violations(&[], 15);
        assert_eq!(report.violation_count, 0);
        assert_eq!(report.max_voltage_rise_v, 0.0);
        assert_eq!(report.peak_grid_stress, 0.0);
        assert!(report.g99_compliant);
    }

    #[test]
    fn test_imports_cause_no_stress() {
        let impact = GridConstraintChecker::default().grid_impact(&[-6.0, -1.0]);
        assert_eq!(impact.peak_grid_stress, 0.0);
        assert_eq!(impact.max_voltage_rise_v, 0.0);
        assert_eq!(impact.times_at_limit, 0);
    }

    #[test]
    fn test_zero_limit_guarded() {
        let checker = GridConstraintChecker::new(0.0);
        let report = checker.check_violations(&[0.0, 0.5], 30);
        assert_eq!(report.peak_grid_stress, 1.0);
        assert_eq!(report.violations[0].time_label, "00:30");
    }

    #[rstest]
    #[case(0, 15, "00:00")]
    #[case(5, 15, "01:15")]
    #[case(95, 15, "23:45")]
    #[case(100, 15, "25:00")]
    fn test_time_label(#[case] t: usize, #[case] minutes: u32, #[case] expected: &str) {
        assert_eq!(time_label(t, minutes), expected);
    }

    #[test]
    fn test_curtailment() {
        let curtailment = GridConstraintChecker::default().curtailment_required(&[2.0, 4.0, 6.5]);
        assert_eq!(curtailment, vec![0.0, 0.0, 2.5]);
    }
}
