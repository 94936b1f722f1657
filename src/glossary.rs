//! Finance concept glossary
//!
//! Explanations served when a financial question arrives before any cost
//! sheet, selected by the keywords the classifier matched.

use std::collections::BTreeSet;
use std::fmt::Write;

pub struct Concept {
    pub name: &'static str,
    /// Normalized classifier keywords that select this concept
    pub triggers: &'static [&'static str],
    pub explanation: &'static str,
}

pub const CONCEPTS: &[Concept] = &[
    Concept {
        name: "ROI",
        triggers: &["roi", "retorno"],
        explanation: "Return on Investment measures how efficiently an investment pays off: \
                      (profit after tax / amount invested) × 100.",
    },
    Concept {
        name: "Payback",
        triggers: &["payback"],
        explanation: "The payback period is the time needed to recover the amount invested \
                      in a project.",
    },
    Concept {
        name: "Contribution Margin",
        triggers: &["margem de contribuicao", "contribution margin"],
        explanation: "Contribution margin is revenue minus variable costs; it is what is left \
                      to cover fixed costs and generate profit.",
    },
    Concept {
        name: "Breakeven Point",
        triggers: &["ponto de equilibrio", "breakeven", "break even"],
        explanation: "The breakeven point is the revenue at which the contribution margin \
                      covers fixed costs exactly, so profit is zero.",
    },
    Concept {
        name: "Compound Interest",
        triggers: &["juros compostos", "compound interest", "juros"],
        explanation: "Compound interest is charged on the initial amount plus the interest \
                      accumulated in previous periods.",
    },
];

const PROFILE_TRIGGERS: &[&str] = &["investidor", "investor", "conservador", "arrojado"];

const INVESTOR_PROFILES: &str = "\
1. Conservative profile: low-risk options such as fixed income bonds or bank deposits.
2. Moderate profile: fixed income combined with solid companies' stocks and real estate funds.
3. Aggressive profile: growth stocks, crypto and startups can pay more, with much higher risk.";

/// Concepts selected by `keywords`, in glossary order
pub fn concepts_for(keywords: &BTreeSet<String>) -> Vec<&'static Concept> {
    CONCEPTS
        .iter()
        .filter(|concept| concept.triggers.iter().any(|t| keywords.contains(*t)))
        .collect()
}

/// Rendered explanations, or `None` when no concept or profile was asked about
pub fn explain(keywords: &BTreeSet<String>) -> Option<String> {
    let concepts = concepts_for(keywords);
    let wants_profiles = PROFILE_TRIGGERS.iter().any(|t| keywords.contains(*t));

    if concepts.is_empty() && !wants_profiles {
        return None;
    }

    let mut out = String::from("📚 Financial Concepts\n");
    for concept in concepts {
        let _ = write!(out, "\n{}: {}\n", concept.name, concept.explanation);
    }
    if wants_profiles {
        let _ = write!(out, "\nInvestment strategies by investor profile:\n{}\n", INVESTOR_PROFILES);
    }

    Some(out)
}
