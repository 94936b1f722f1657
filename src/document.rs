//! Parsed-document payloads
//!
//! Spreadsheet and PDF extraction happen upstream; this module receives the
//! extracted records, rejects malformed ones, and turns the rest into
//! `FinancialInputs`.

use crate::error::AssistantError;
use crate::models::{FinancialInputs, DEFAULT_SENSITIVITY_RATE, DEFAULT_TAX_RATE};
use crate::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

const CATEGORY_COLUMNS: &[&str] = &["category", "categoria"];
const AMOUNT_COLUMNS: &[&str] = &["amount", "valor", "value"];

/// Revenue projection applied when the sheet carries none
pub const PROJECTED_REVENUE_MARKUP: f64 = 1.5;

/// Largest gap tolerated between a declared total and the category sum
const TOTAL_TOLERANCE: f64 = 0.005;

/// Values applied when a payload leaves a scalar out
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputDefaults {
    pub hours_worked: f64,
    pub tax_rate: f64,
    pub sensitivity_rate: f64,
}

impl Default for InputDefaults {
    fn default() -> Self {
        Self {
            hours_worked: 160.0,
            tax_rate: DEFAULT_TAX_RATE,
            sensitivity_rate: DEFAULT_SENSITIVITY_RATE,
        }
    }
}

/// Records as emitted by the extraction collaborator, plus optional scalars
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentPayload {
    #[serde(default)]
    pub rows: Vec<Map<String, Value>>,
    #[serde(default)]
    pub total_costs: Option<f64>,
    #[serde(default)]
    pub revenue_projected: Option<f64>,
    #[serde(default)]
    pub investments: Option<f64>,
    #[serde(default)]
    pub hours_worked: Option<f64>,
    #[serde(default)]
    pub tax_rate: Option<f64>,
    #[serde(default)]
    pub sensitivity_rate: Option<f64>,
}

impl DocumentPayload {
    /// Payload from `(category, amount)` pairs
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let rows = entries
            .into_iter()
            .map(|(category, amount)| {
                let mut row = Map::new();
                row.insert("category".to_string(), Value::String(category.into()));
                row.insert("amount".to_string(), Value::from(amount));
                row
            })
            .collect();

        Self {
            rows,
            ..Self::default()
        }
    }

    pub fn with_revenue(mut self, revenue: f64) -> Self {
        self.revenue_projected = Some(revenue);
        self
    }

    pub fn with_investments(mut self, investments: f64) -> Self {
        self.investments = Some(investments);
        self
    }

    pub fn with_hours(mut self, hours: f64) -> Self {
        self.hours_worked = Some(hours);
        self
    }

    pub fn with_total(mut self, total: f64) -> Self {
        self.total_costs = Some(total);
        self
    }

    /// Validate and convert into engine inputs
    pub fn into_inputs(self, defaults: &InputDefaults) -> Result<FinancialInputs> {
        if self.rows.is_empty() && self.total_costs.is_none() {
            return Err(AssistantError::Validation(
                "Document has no cost rows".to_string(),
            ));
        }

        let mut categorized_costs: BTreeMap<String, f64> = BTreeMap::new();
        for (index, row) in self.rows.iter().enumerate() {
            let (category, amount) = parse_row(index, row)?;
            *categorized_costs.entry(category).or_insert(0.0) += amount;
        }

        let category_sum: f64 = categorized_costs.values().sum();
        let total_costs = match self.total_costs {
            Some(declared) => {
                ensure_finite("total_costs", declared)?;
                if !categorized_costs.is_empty() && (declared - category_sum).abs() > TOTAL_TOLERANCE {
                    return Err(AssistantError::Validation(format!(
                        "Declared total_costs {:.2} does not match category sum {:.2}",
                        declared, category_sum
                    )));
                }
                Some(declared)
            }
            None => None,
        };

        let resolved_total = total_costs.unwrap_or(category_sum);
        let revenue_projected = match self.revenue_projected {
            Some(revenue) => {
                ensure_finite("revenue_projected", revenue)?;
                revenue
            }
            None => resolved_total * PROJECTED_REVENUE_MARKUP,
        };

        let investments = self.investments.unwrap_or(0.0);
        ensure_non_negative("investments", investments)?;

        let hours_worked = self.hours_worked.unwrap_or(defaults.hours_worked);
        ensure_non_negative("hours_worked", hours_worked)?;

        let tax_rate = self.tax_rate.unwrap_or(defaults.tax_rate);
        ensure_fraction("tax_rate", tax_rate)?;

        let sensitivity_rate = self.sensitivity_rate.unwrap_or(defaults.sensitivity_rate);
        ensure_fraction("sensitivity_rate", sensitivity_rate)?;

        Ok(FinancialInputs {
            total_costs,
            categorized_costs,
            investments,
            revenue_projected,
            hours_worked,
            tax_rate,
            sensitivity_rate,
        })
    }
}

fn lookup<'a>(row: &'a Map<String, Value>, aliases: &[&str]) -> Option<&'a Value> {
    row.iter()
        .find(|(column, _)| {
            aliases
                .iter()
                .any(|alias| column.trim().eq_ignore_ascii_case(alias))
        })
        .map(|(_, value)| value)
}

fn parse_row(index: usize, row: &Map<String, Value>) -> Result<(String, f64)> {
    let category = match lookup(row, CATEGORY_COLUMNS) {
        Some(Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(_) => {
            return Err(AssistantError::Validation(format!(
                "Row {}: category must be a non-empty string",
                index + 1
            )))
        }
        None => {
            return Err(AssistantError::Validation(format!(
                "Row {}: missing category column",
                index + 1
            )))
        }
    };

    let amount = match lookup(row, AMOUNT_COLUMNS) {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => parse_amount(s),
        Some(_) => None,
        None => {
            return Err(AssistantError::Validation(format!(
                "Row {}: missing amount column",
                index + 1
            )))
        }
    };

    match amount {
        Some(amount) if amount.is_finite() => Ok((category, amount)),
        _ => Err(AssistantError::Validation(format!(
            "Row {}: amount for '{}' is not a number",
            index + 1,
            category
        ))),
    }
}

/// Accepts "1500.50", "1.500,50" and "R$ 1500"
fn parse_amount(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().trim_start_matches("R$").trim();
    if let Ok(value) = cleaned.parse::<f64>() {
        return Some(value);
    }

    if cleaned.contains(',') {
        let swapped = cleaned.replace('.', "").replace(',', ".");
        return swapped.parse::<f64>().ok();
    }

    None
}

fn ensure_finite(field: &str, value: f64) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(AssistantError::Validation(format!("{} must be a finite number", field)))
    }
}

fn ensure_non_negative(field: &str, value: f64) -> Result<()> {
    ensure_finite(field, value)?;
    if value < 0.0 {
        return Err(AssistantError::Validation(format!("{} must not be negative", field)));
    }
    Ok(())
}

fn ensure_fraction(field: &str, value: f64) -> Result<()> {
    ensure_finite(field, value)?;
    if !(0.0..=1.0).contains(&value) {
        return Err(AssistantError::Validation(format!(
            "{} must be a fraction between 0 and 1",
            field
        )));
    }
    Ok(())
}

/// Text projection used for classification: `"<category> <amount> …"`
pub fn flatten_inputs(inputs: &FinancialInputs) -> String {
    let mut parts: Vec<String> = inputs
        .categorized_costs
        .iter()
        .map(|(category, amount)| format!("{} {:.2}", category, amount))
        .collect();

    parts.push(format!("costs {:.2}", inputs.resolved_total()));
    parts.push(format!("revenue {:.2}", inputs.revenue_projected));
    if inputs.investments > 0.0 {
        parts.push(format!("investment {:.2}", inputs.investments));
    }

    parts.join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_rows_become_inputs() {
        let payload = DocumentPayload::from_entries([("fixed", 10_000.0), ("variable", 40_000.0)])
            .with_revenue(75_000.0)
            .with_investments(20_000.0);

        let inputs = payload.into_inputs(&InputDefaults::default()).unwrap();
        assert_eq!(inputs.categorized_costs.len(), 2);
        assert_eq!(inputs.resolved_total(), 50_000.0);
        assert_eq!(inputs.total_costs, None);
        assert_eq!(inputs.hours_worked, 160.0);
        assert_eq!(inputs.investments, 20_000.0);
    }

    #[test]
    fn test_portuguese_columns_and_duplicates() {
        let payload = DocumentPayload {
            rows: vec![
                row(json!({"Categoria": "Marketing", "Valor": 500.0})),
                row(json!({"categoria": "Marketing", "valor": "250,50"})),
                row(json!({"CATEGORIA": "Fixos", "VALOR": "R$ 1000"})),
            ],
            ..DocumentPayload::default()
        };

        let inputs = payload.into_inputs(&InputDefaults::default()).unwrap();
        assert_eq!(inputs.categorized_costs["Marketing"], 750.5);
        assert_eq!(inputs.categorized_costs["Fixos"], 1000.0);
        assert_eq!(inputs.revenue_projected, 1750.5 * PROJECTED_REVENUE_MARKUP);
    }

    #[test]
    fn test_missing_columns_are_rejected() {
        let missing_amount = DocumentPayload {
            rows: vec![row(json!({"category": "rent"}))],
            ..DocumentPayload::default()
        };
        assert!(matches!(
            missing_amount.into_inputs(&InputDefaults::default()),
            Err(AssistantError::Validation(_))
        ));

        let missing_category = DocumentPayload {
            rows: vec![row(json!({"amount": 10}))],
            ..DocumentPayload::default()
        };
        assert!(matches!(
            missing_category.into_inputs(&InputDefaults::default()),
            Err(AssistantError::Validation(_))
        ));

        let bad_amount = DocumentPayload {
            rows: vec![row(json!({"category": "rent", "amount": "lots"}))],
            ..DocumentPayload::default()
        };
        assert!(bad_amount.into_inputs(&InputDefaults::default()).is_err());

        assert!(DocumentPayload::default().into_inputs(&InputDefaults::default()).is_err());
    }

    #[test]
    fn test_declared_total_must_match() {
        let ok = DocumentPayload::from_entries([("rent", 100.0), ("ads", 50.0)]).with_total(150.0);
        assert_eq!(ok.into_inputs(&InputDefaults::default()).unwrap().total_costs, Some(150.0));

        let mismatch = DocumentPayload::from_entries([("rent", 100.0)]).with_total(999.0);
        assert!(matches!(
            mismatch.into_inputs(&InputDefaults::default()),
            Err(AssistantError::Validation(_))
        ));
    }

    #[test]
    fn test_scalar_ranges_are_validated() {
        let negative_hours = DocumentPayload::from_entries([("rent", 100.0)]).with_hours(-1.0);
        assert!(negative_hours.into_inputs(&InputDefaults::default()).is_err());

        let mut bad_tax = DocumentPayload::from_entries([("rent", 100.0)]);
        bad_tax.tax_rate = Some(1.5);
        assert!(bad_tax.into_inputs(&InputDefaults::default()).is_err());

        // zero hours passes validation; the engine reports it
        let zero_hours = DocumentPayload::from_entries([("rent", 100.0)]).with_hours(0.0);
        assert_eq!(zero_hours.into_inputs(&InputDefaults::default()).unwrap().hours_worked, 0.0);
    }

    #[test]
    fn test_payload_deserializes_from_json() {
        let payload: DocumentPayload = serde_json::from_value(json!({
            "rows": [{"category": "fixed", "amount": 10}],
            "revenue_projected": 30
        }))
        .unwrap();
        let inputs = payload.into_inputs(&InputDefaults::default()).unwrap();
        assert_eq!(inputs.revenue_projected, 30.0);
    }

    #[test]
    fn test_flatten_projection() {
        let inputs = DocumentPayload::from_entries([("fixed", 10.0), ("ads", 5.5)])
            .with_revenue(40.0)
            .into_inputs(&InputDefaults::default())
            .unwrap();
        assert_eq!(flatten_inputs(&inputs), "ads 5.50 fixed 10.00 costs 15.50 revenue 40.00");
    }
}
