//! Persona response composer
//!
//! Pure rendering over data that is already computed: a financial report or a
//! templated reply. Humor picks the closing remark; the only randomness is the
//! optional cultural reference, drawn from an injectable `RandomSource`.

use crate::glossary;
use crate::models::{FinancialReport, Humor, Intent, IntentKind, PersonaState, Sentiment};
use rand::Rng;
use std::fmt::Write;
use std::sync::Arc;

const CULTURAL_REFERENCES: &[&str] = &[
    "As Doc Brown would say: where we're going, we don't need roads, but we do need a budget.",
    "Like Yoda says: do or do not, there is no 'I'll check the spreadsheet later'.",
    "Red pill or blue pill? Either way, Neo still has to pay taxes.",
    "One does not simply walk into Mordor without an emergency fund.",
];

const JOKES: &[&str] = &[
    "Why did the accountant break up with the calculator? It had too many problems to count on.",
    "My wallet is like an onion: opening it makes me cry.",
    "I told my budget a joke. It didn't laugh, it just balanced.",
];

/// Source of the only non-deterministic choice the composer makes
pub trait RandomSource: Send + Sync {
    /// Index in `0..upper`. `upper` is never zero.
    fn pick(&self, upper: usize) -> usize;
}

/// Production randomness backed by the thread-local generator
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn pick(&self, upper: usize) -> usize {
        rand::thread_rng().gen_range(0..upper)
    }
}

/// Always returns the same index (wrapped to the range)
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedRandom(pub usize);

impl RandomSource for FixedRandom {
    fn pick(&self, upper: usize) -> usize {
        self.0 % upper
    }
}

/// What the composer is asked to render
#[derive(Debug, Clone, Copy)]
pub enum Composition<'a> {
    Report(&'a FinancialReport),
    /// Financial intent without any figures to compute from
    MissingFinancialData(&'a Intent),
    Reply(&'a Intent),
}

pub struct PersonaComposer {
    random: Arc<dyn RandomSource>,
    currency: String,
}

impl PersonaComposer {
    pub fn new(random: Arc<dyn RandomSource>) -> Self {
        Self {
            random,
            currency: "R$".to_string(),
        }
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn compose(&self, subject: Composition<'_>, persona: PersonaState) -> String {
        match subject {
            Composition::Report(report) => self.compose_report(report, persona.humor),
            Composition::MissingFinancialData(intent) => without_data_reply(intent, persona.humor),
            Composition::Reply(intent) => self.compose_reply(intent, persona.humor),
        }
    }

    /// Fixed-order report followed by exactly one closing remark
    pub fn compose_report(&self, report: &FinancialReport, humor: Humor) -> String {
        let c = &self.currency;
        let mut out = String::new();

        out.push_str("📊 Financial Analysis\n\n");

        let _ = writeln!(out, "1. Profit");
        let _ = writeln!(out, "   - Projected revenue: {} {:.2}", c, report.revenue_projected);
        let _ = writeln!(out, "   - Total costs: {} {:.2}", c, report.total_costs);
        let _ = writeln!(out, "   - Profit: {} {:.2}", c, report.profit);
        let _ = writeln!(out, "   - Profit after tax: {} {:.2}\n", c, report.profit_after_tax);

        let _ = writeln!(out, "2. Margin");
        let _ = writeln!(out, "   - Real margin: {:.2}%\n", report.real_margin_pct);

        let _ = writeln!(out, "3. Contribution Margin");
        let _ = writeln!(out, "   - Variable costs: {} {:.2}", c, report.variable_costs);
        let _ = writeln!(
            out,
            "   - Contribution margin: {} {:.2} ({:.2}%)\n",
            c, report.contribution_margin, report.contribution_margin_pct
        );

        let _ = writeln!(out, "4. Breakeven");
        let _ = writeln!(out, "   - Fixed costs: {} {:.2}", c, report.fixed_costs);
        let _ = writeln!(out, "   - Breakeven point: {} {:.2}\n", c, report.breakeven_point);

        let _ = writeln!(out, "5. Return on Investment");
        let _ = writeln!(out, "   - Investments: {} {:.2}", c, report.investments);
        let _ = writeln!(out, "   - ROI: {:.2}%\n", report.roi_pct);

        let _ = writeln!(out, "6. Payback");
        let _ = writeln!(out, "   - Payback: {:.2} periods", report.payback_periods);
        let _ = writeln!(out, "   - Hourly cost: {} {:.2}\n", c, report.hourly_rate);

        let pct = report.sensitivity_rate * 100.0;
        let _ = writeln!(out, "7. Sensitivity");
        let _ = writeln!(out, "   - Revenue +{:.0}%: real margin {:.2}%", pct, report.sensitivity_up_pct);
        let _ = writeln!(out, "   - Revenue -{:.0}%: real margin {:.2}%\n", pct, report.sensitivity_down_pct);

        let _ = writeln!(out, "8. Costs by Category");
        if report.categorized_costs.is_empty() {
            let _ = writeln!(out, "   - (no categories)");
        }
        for (category, amount) in &report.categorized_costs {
            let _ = writeln!(out, "   - {}: {} {:.2}", category, c, amount);
        }

        out.push('\n');
        out.push_str(&closing_remark(report, humor));
        out
    }

    /// Templated reply for greeting, joke and generic intents
    pub fn compose_reply(&self, intent: &Intent, humor: Humor) -> String {
        match intent.kind {
            IntentKind::Greeting => greeting_reply(intent.sentiment, humor).to_string(),
            IntentKind::Joke => {
                let joke = JOKES[self.random.pick(JOKES.len()) % JOKES.len()];
                match humor {
                    Humor::Sarcastic => format!("{} You're welcome, I'll be here all week.", joke),
                    Humor::Empathetic => format!("{} Hope that brought a smile to your day!", joke),
                    Humor::Default => joke.to_string(),
                }
            }
            IntentKind::Generic => {
                let reference =
                    CULTURAL_REFERENCES[self.random.pick(CULTURAL_REFERENCES.len()) % CULTURAL_REFERENCES.len()];
                format!("{} {}", generic_reply(intent.sentiment, humor), reference)
            }
            IntentKind::Financial => without_data_reply(intent, humor),
        }
    }
}

impl Default for PersonaComposer {
    fn default() -> Self {
        Self::new(Arc::new(ThreadRandom))
    }
}

/// Deterministic in `(report, humor)`
pub fn closing_remark(report: &FinancialReport, humor: Humor) -> String {
    let losing = report.profit < 0.0;
    match (humor, losing) {
        (Humor::Sarcastic, false) => format!(
            "Look at you, keeping {:.2}% after tax. Try not to spend it all in one place.",
            report.real_margin_pct
        ),
        (Humor::Sarcastic, true) => {
            "Bold strategy, spending more than you earn. Let's see if it pays off.".to_string()
        }
        (Humor::Empathetic, false) => {
            "You're doing well. Keep an eye on your costs and you'll stay on track.".to_string()
        }
        (Humor::Empathetic, true) => {
            "Numbers like these are stressful, but every cost you trim moves you closer to breakeven. You've got this.".to_string()
        }
        (Humor::Default, false) => {
            "Review these indicators monthly to keep your plan on course.".to_string()
        }
        (Humor::Default, true) => {
            "Costs exceed revenue; review the largest categories first.".to_string()
        }
    }
}

fn greeting_reply(sentiment: Sentiment, humor: Humor) -> &'static str {
    match (sentiment, humor) {
        (Sentiment::Positive, Humor::Sarcastic) => "Hello! Someone's in a good mood. Shall we ruin it with a budget?",
        (Sentiment::Positive, _) => "Hello! Great to see you in good spirits! How can I help?",
        (Sentiment::Negative, Humor::Sarcastic) => "Hi. Rough day? Numbers never judge, unlike me.",
        (Sentiment::Negative, _) => "Hi, it sounds like today isn't the best day. How can I help make it better?",
        (Sentiment::Neutral, Humor::Sarcastic) => "Oh, hello. Here for financial wisdom or just small talk?",
        (Sentiment::Neutral, Humor::Empathetic) => "Hello! I'm glad you stopped by. How can I help today?",
        (Sentiment::Neutral, Humor::Default) => "Hello! How can I help you today?",
    }
}

fn generic_reply(sentiment: Sentiment, humor: Humor) -> &'static str {
    match (humor, sentiment) {
        (Humor::Sarcastic, _) => "Fascinating. Not a number in sight, but I'll allow it.",
        (Humor::Empathetic, Sentiment::Negative) => "I hear you. I'm best with money questions, but I'm here to listen.",
        (Humor::Empathetic, _) => "Thanks for sharing! I'm best with money questions, but happy to chat.",
        (Humor::Default, _) => "I'm best with finance questions; send a cost sheet or ask about profit, margin or ROI.",
    }
}

/// Concept explanations when the question names any, then the upload request
fn without_data_reply(intent: &Intent, humor: Humor) -> String {
    match glossary::explain(&intent.keywords) {
        Some(lesson) => format!("{}\n{}", lesson, missing_data_reply(humor)),
        None => missing_data_reply(humor),
    }
}

fn missing_data_reply(humor: Humor) -> String {
    let base = "Please upload a cost sheet (category and amount columns) so I can calculate your indicators.";
    match humor {
        Humor::Sarcastic => format!("I'm good, but not psychic. {}", base),
        Humor::Empathetic => format!("I'd love to help with that. {}", base),
        Humor::Default => base.to_string(),
    }
}
