//! Core data models for the finance assistant

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::AssistantError;

pub const DEFAULT_TAX_RATE: f64 = 0.15;
pub const DEFAULT_SENSITIVITY_RATE: f64 = 0.05;

//
// ================= Enums =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum IntentKind {
    Greeting,
    Financial,
    Joke,
    Generic,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Humor {
    #[default]
    Default,
    Sarcastic,
    Empathetic,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Local,
    External,
}

//
// ================= Intent =================
//

/// Classified purpose of a query plus the metadata the composer needs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Intent {
    pub kind: IntentKind,
    pub keywords: BTreeSet<String>,
    pub sentiment: Sentiment,
}

impl Intent {
    pub fn new(kind: IntentKind, sentiment: Sentiment) -> Self {
        Self {
            kind,
            keywords: BTreeSet::new(),
            sentiment,
        }
    }

    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords.extend(keywords.into_iter().map(Into::into));
        self
    }
}

//
// ================= Persona =================
//

/// Tone settings owned by one conversation session.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct PersonaState {
    pub humor: Humor,
}

impl PersonaState {
    pub fn new(humor: Humor) -> Self {
        Self { humor }
    }
}

//
// ================= Financial Data =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinancialInputs {
    /// Declared total. When absent the engine sums `categorized_costs`.
    pub total_costs: Option<f64>,
    pub categorized_costs: BTreeMap<String, f64>,
    #[serde(default)]
    pub investments: f64,
    pub revenue_projected: f64,
    pub hours_worked: f64,
    #[serde(default = "default_tax_rate")]
    pub tax_rate: f64,
    #[serde(default = "default_sensitivity_rate")]
    pub sensitivity_rate: f64,
}

fn default_tax_rate() -> f64 {
    DEFAULT_TAX_RATE
}

fn default_sensitivity_rate() -> f64 {
    DEFAULT_SENSITIVITY_RATE
}

impl FinancialInputs {
    pub fn new(categorized_costs: BTreeMap<String, f64>, revenue_projected: f64, hours_worked: f64) -> Self {
        Self {
            total_costs: None,
            categorized_costs,
            investments: 0.0,
            revenue_projected,
            hours_worked,
            tax_rate: DEFAULT_TAX_RATE,
            sensitivity_rate: DEFAULT_SENSITIVITY_RATE,
        }
    }

    pub fn with_investments(mut self, investments: f64) -> Self {
        self.investments = investments;
        self
    }

    pub fn with_declared_total(mut self, total_costs: f64) -> Self {
        self.total_costs = Some(total_costs);
        self
    }

    pub fn with_rates(mut self, tax_rate: f64, sensitivity_rate: f64) -> Self {
        self.tax_rate = tax_rate;
        self.sensitivity_rate = sensitivity_rate;
        self
    }

    pub fn category_sum(&self) -> f64 {
        self.categorized_costs.values().sum()
    }

    /// Declared total if present, otherwise the category sum.
    pub fn resolved_total(&self) -> f64 {
        self.total_costs.unwrap_or_else(|| self.category_sum())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinancialReport {
    pub revenue_projected: f64,
    pub total_costs: f64,
    pub variable_costs: f64,
    pub fixed_costs: f64,
    pub investments: f64,
    pub profit: f64,
    pub profit_after_tax: f64,
    pub real_margin_pct: f64,
    pub contribution_margin: f64,
    pub contribution_margin_pct: f64,
    pub breakeven_point: f64,
    pub roi_pct: f64,
    pub payback_periods: f64,
    pub hourly_rate: f64,
    pub sensitivity_rate: f64,
    pub sensitivity_up_pct: f64,
    pub sensitivity_down_pct: f64,
    pub categorized_costs: BTreeMap<String, f64>,
}

/// Persisted copy of the figures a report was computed from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinancialSnapshot {
    pub snapshot_id: Uuid,
    pub user_id: Uuid,
    pub categorized_costs: BTreeMap<String, f64>,
    pub total_costs: f64,
    pub revenue_projected: f64,
    pub investments: f64,
    pub hours_worked: f64,
    pub tax_rate: f64,
    pub sensitivity_rate: f64,
    pub created_at: DateTime<Utc>,
}

impl FinancialSnapshot {
    pub fn capture(user_id: Uuid, inputs: &FinancialInputs) -> Self {
        Self {
            snapshot_id: Uuid::new_v4(),
            user_id,
            categorized_costs: inputs.categorized_costs.clone(),
            total_costs: inputs.resolved_total(),
            revenue_projected: inputs.revenue_projected,
            investments: inputs.investments,
            hours_worked: inputs.hours_worked,
            tax_rate: inputs.tax_rate,
            sensitivity_rate: inputs.sensitivity_rate,
            created_at: Utc::now(),
        }
    }

    pub fn to_inputs(&self) -> FinancialInputs {
        FinancialInputs {
            total_costs: Some(self.total_costs),
            categorized_costs: self.categorized_costs.clone(),
            investments: self.investments,
            revenue_projected: self.revenue_projected,
            hours_worked: self.hours_worked,
            tax_rate: self.tax_rate,
            sensitivity_rate: self.sensitivity_rate,
        }
    }
}

//
// ================= Conversation =================
//

/// One prompt/response exchange. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConversationTurn {
    pub turn_id: Uuid,
    pub user_id: Uuid,
    pub prompt_text: String,
    pub response_text: String,
    pub origin: Origin,
    pub created_at: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(user_id: Uuid, prompt_text: String, response_text: String, origin: Origin) -> Self {
        Self {
            turn_id: Uuid::new_v4(),
            user_id,
            prompt_text,
            response_text,
            origin,
            created_at: Utc::now(),
        }
    }
}

//
// ================= Display / Parsing =================
//

impl fmt::Display for IntentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IntentKind::Greeting => "greeting",
            IntentKind::Financial => "financial",
            IntentKind::Joke => "joke",
            IntentKind::Generic => "generic",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for Humor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Humor::Default => "default",
            Humor::Sarcastic => "sarcastic",
            Humor::Empathetic => "empathetic",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Humor {
    type Err = AssistantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "default" | "padrao" | "padrão" | "neutral" => Ok(Humor::Default),
            "sarcastic" | "sarcastico" | "sarcástico" => Ok(Humor::Sarcastic),
            "empathetic" | "compreensivo" => Ok(Humor::Empathetic),
            other => Err(AssistantError::Validation(format!(
                "Unknown humor '{}'; expected default, sarcastic or empathetic",
                other
            ))),
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Origin::Local => "local",
            Origin::External => "external",
        };
        write!(f, "{}", s)
    }
}
