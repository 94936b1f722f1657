//! Financial metrics engine
//!
//! Deterministic indicators over a cost sheet. Every ratio is guarded to 0 on
//! degenerate input except the hourly rate: zero hours worked is invalid input
//! and is reported as a computation error.
//!
//! No rounding happens here; two decimals is a presentation concern.

use crate::error::AssistantError;
use crate::models::{FinancialInputs, FinancialReport};
use crate::Result;

/// Category names treated as fixed costs (case-insensitive).
pub const FIXED_COST_CATEGORIES: &[&str] = &["fixed", "fixos"];

pub fn is_fixed_category(category: &str) -> bool {
    FIXED_COST_CATEGORIES
        .iter()
        .any(|fixed| category.trim().eq_ignore_ascii_case(fixed))
}

/// Stateless calculator; kept as a type so the assistant can own one.
#[derive(Debug, Clone, Copy, Default)]
pub struct FinancialEngine;

impl FinancialEngine {
    pub fn new() -> Self {
        Self
    }

    /// Compute the full report. Fails only when `hours_worked == 0`.
    pub fn compute(&self, inputs: &FinancialInputs) -> Result<FinancialReport> {
        let total_costs = inputs.resolved_total();
        let revenue = inputs.revenue_projected;

        let profit = revenue - total_costs;
        let profit_after_tax = after_tax(profit, inputs.tax_rate);
        let real_margin_pct = real_margin_pct(revenue, total_costs, inputs.tax_rate);

        let fixed_costs = fixed_costs(inputs);
        let variable_costs = variable_costs(inputs);

        let contribution_margin = revenue - variable_costs;
        let contribution_margin_pct = if revenue > 0.0 {
            contribution_margin / revenue * 100.0
        } else {
            0.0
        };

        let breakeven_point = if contribution_margin_pct > 0.0 {
            fixed_costs / (contribution_margin_pct / 100.0)
        } else {
            0.0
        };

        let roi_pct = if inputs.investments > 0.0 {
            profit_after_tax / inputs.investments * 100.0
        } else {
            0.0
        };

        let payback_periods = if contribution_margin > 0.0 {
            inputs.investments / contribution_margin
        } else {
            0.0
        };

        let hourly_rate = hourly_rate(total_costs, inputs.hours_worked)?;

        let (sensitivity_up_pct, sensitivity_down_pct) = sensitivity(
            revenue,
            total_costs,
            inputs.tax_rate,
            inputs.sensitivity_rate,
        );

        Ok(FinancialReport {
            revenue_projected: revenue,
            total_costs,
            variable_costs,
            fixed_costs,
            investments: inputs.investments,
            profit,
            profit_after_tax,
            real_margin_pct,
            contribution_margin,
            contribution_margin_pct,
            breakeven_point,
            roi_pct,
            payback_periods,
            hourly_rate,
            sensitivity_rate: inputs.sensitivity_rate,
            sensitivity_up_pct,
            sensitivity_down_pct,
            categorized_costs: inputs.categorized_costs.clone(),
        })
    }
}

fn after_tax(profit: f64, tax_rate: f64) -> f64 {
    profit * (1.0 - tax_rate)
}

/// After-tax profit as a percentage of revenue; 0 when revenue is not positive.
pub fn real_margin_pct(revenue: f64, total_costs: f64, tax_rate: f64) -> f64 {
    if revenue > 0.0 {
        after_tax(revenue - total_costs, tax_rate) / revenue * 100.0
    } else {
        0.0
    }
}

pub fn fixed_costs(inputs: &FinancialInputs) -> f64 {
    inputs
        .categorized_costs
        .iter()
        .filter(|(category, _)| is_fixed_category(category))
        .map(|(_, amount)| amount)
        .sum()
}

pub fn variable_costs(inputs: &FinancialInputs) -> f64 {
    inputs
        .categorized_costs
        .iter()
        .filter(|(category, _)| !is_fixed_category(category))
        .map(|(_, amount)| amount)
        .sum()
}

/// Cost of one worked hour.
pub fn hourly_rate(total_costs: f64, hours_worked: f64) -> Result<f64> {
    if hours_worked == 0.0 {
        return Err(AssistantError::Computation(
            "DivisionError: hourly rate requires hours_worked > 0".to_string(),
        ));
    }
    Ok(total_costs / hours_worked)
}

/// Real margin recomputed with revenue shifted up and down by `rate`.
pub fn sensitivity(revenue: f64, total_costs: f64, tax_rate: f64, rate: f64) -> (f64, f64) {
    let up = real_margin_pct(revenue * (1.0 + rate), total_costs, tax_rate);
    let down = real_margin_pct(revenue * (1.0 - rate), total_costs, tax_rate);
    (up, down)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    const EPS: f64 = 1e-9;

    fn costs(entries: &[(&str, f64)]) -> BTreeMap<String, f64> {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    fn reference_inputs() -> FinancialInputs {
        FinancialInputs::new(costs(&[("fixed", 10_000.0), ("variable", 40_000.0)]), 75_000.0, 160.0)
    }

    #[test]
    fn test_reference_scenario() {
        let report = FinancialEngine::new().compute(&reference_inputs()).unwrap();

        assert!((report.profit - 25_000.0).abs() < EPS);
        assert!((report.profit_after_tax - 21_250.0).abs() < EPS);
        assert!((report.real_margin_pct - 28.333_333_333).abs() < 1e-6);
        assert!((report.contribution_margin - 35_000.0).abs() < EPS);
        assert!((report.fixed_costs - 10_000.0).abs() < EPS);
        assert!((report.variable_costs - 40_000.0).abs() < EPS);
    }

    #[test]
    fn test_payback_periods() {
        let inputs = reference_inputs().with_investments(20_000.0);
        let report = FinancialEngine::new().compute(&inputs).unwrap();

        assert!((report.payback_periods - 20_000.0 / 35_000.0).abs() < EPS);
        assert!((report.payback_periods - 0.571).abs() < 1e-3);
        assert!((report.roi_pct - 106.25).abs() < EPS);
    }

    #[test]
    fn test_zero_revenue_is_guarded() {
        let inputs = FinancialInputs::new(costs(&[("fixed", 500.0), ("ads", 200.0)]), 0.0, 10.0);
        let report = FinancialEngine::new().compute(&inputs).unwrap();

        assert_eq!(report.real_margin_pct, 0.0);
        assert_eq!(report.contribution_margin_pct, 0.0);
        assert_eq!(report.breakeven_point, 0.0);
        assert_eq!(report.payback_periods, 0.0);
        assert_eq!(report.sensitivity_up_pct, 0.0);
        assert_eq!(report.sensitivity_down_pct, 0.0);
    }

    #[test]
    fn test_negative_revenue_margins_are_zero() {
        for revenue in [-1.0, -250.0, -1e9] {
            let inputs = FinancialInputs::new(costs(&[("variable", 10.0)]), revenue, 1.0);
            let report = FinancialEngine::new().compute(&inputs).unwrap();
            assert_eq!(report.real_margin_pct, 0.0);
            assert_eq!(report.contribution_margin_pct, 0.0);
        }
    }

    #[test]
    fn test_zero_hours_is_computation_error() {
        let inputs = FinancialInputs::new(costs(&[("fixed", 100.0)]), 200.0, 0.0);
        let err = FinancialEngine::new().compute(&inputs).unwrap_err();
        assert!(matches!(err, AssistantError::Computation(_)));

        assert!(hourly_rate(100.0, 0.0).is_err());
    }

    #[test]
    fn test_hourly_rate_is_exact_division() {
        for hours in [1.0, 7.5, 160.0, 0.25] {
            assert_eq!(hourly_rate(50_000.0, hours).unwrap(), 50_000.0 / hours);
        }
        let report = FinancialEngine::new().compute(&reference_inputs()).unwrap();
        assert_eq!(report.hourly_rate, 50_000.0 / 160.0);
    }

    #[test]
    fn test_breakeven_covers_fixed_costs() {
        let report = FinancialEngine::new().compute(&reference_inputs()).unwrap();
        assert!(report.contribution_margin_pct > 0.0);
        let covered = report.breakeven_point * (report.contribution_margin_pct / 100.0);
        assert!((covered - report.fixed_costs).abs() < 1e-6);
    }

    #[test]
    fn test_derived_total_matches_category_sum() {
        let inputs = FinancialInputs::new(
            costs(&[("fixed", 1_234.56), ("marketing", 789.01), ("tools", 42.0)]),
            5_000.0,
            80.0,
        );
        let report = FinancialEngine::new().compute(&inputs).unwrap();
        assert_eq!(report.total_costs, inputs.categorized_costs.values().sum::<f64>());
    }

    #[test]
    fn test_sensitivity_brackets_real_margin() {
        let report = FinancialEngine::new().compute(&reference_inputs()).unwrap();
        assert!(report.sensitivity_up_pct > report.real_margin_pct);
        assert!(report.sensitivity_down_pct < report.real_margin_pct);

        let expected_up = real_margin_pct(75_000.0 * 1.05, 50_000.0, 0.15);
        assert!((report.sensitivity_up_pct - expected_up).abs() < EPS);
    }

    #[test]
    fn test_fixed_category_alias_and_case() {
        let inputs = FinancialInputs::new(costs(&[("Fixos", 300.0), ("FIXED", 200.0), ("travel", 100.0)]), 1_000.0, 10.0);
        assert_eq!(fixed_costs(&inputs), 500.0);
        assert_eq!(variable_costs(&inputs), 100.0);
    }

    #[test]
    fn test_compute_is_reproducible() {
        let engine = FinancialEngine::new();
        let inputs = reference_inputs().with_investments(12_345.67);
        assert_eq!(engine.compute(&inputs).unwrap(), engine.compute(&inputs).unwrap());
    }

    #[test]
    fn test_custom_rates_flow_through() {
        let report = FinancialEngine::new()
            .compute(&reference_inputs().with_rates(0.0, 0.10))
            .unwrap();

        assert!((report.profit_after_tax - report.profit).abs() < EPS);
        assert!((report.real_margin_pct - 100.0 / 3.0).abs() < 0.01);
        assert!((report.sensitivity_rate - 0.10).abs() < EPS);
    }
}
