//! Intent Classifier
//!
//! Classifies user input as one of:
//! - Greeting: "olá, bom dia", "hello there"
//! - Financial: cost, revenue, margin and ROI questions, or an uploaded cost sheet
//! - Joke: "conta uma piada", "tell me a joke"
//! - Generic: everything else
//!
//! Priority is fixed: greeting, then financial, then joke, then generic.
//! Sentiment is scored locally and degrades to neutral on any analysis failure.

use crate::document::flatten_inputs;
use crate::models::{FinancialInputs, Intent, IntentKind, Sentiment};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Static keyword lists, stored already normalized (lowercase, no accents)
const GREETING_KEYWORDS: &[&str] = &[
    "ola", "oi", "bom dia", "boa tarde", "boa noite", "e ai",
    "hello", "hi", "hey", "good morning", "good afternoon", "good evening",
];

const FINANCIAL_KEYWORDS: &[&str] = &[
    // Portuguese
    "financa", "financas", "financeiro", "investimento", "investimentos", "dinheiro",
    "acoes", "economia", "receita", "lucro", "imposto", "taxa", "juros",
    "rentabilidade", "poupanca", "despesa", "despesas", "dividendos", "custo",
    "custos", "orcamento", "margem", "faturamento",
    // English
    "finance", "investment", "money", "revenue", "profit", "tax", "budget",
    "cost", "costs", "expenses", "margin", "cash flow",
    // Concepts and investor profiles
    "retorno", "margem de contribuicao", "contribution margin", "ponto de equilibrio",
    "break even", "juros compostos", "compound interest", "investidor", "investor",
    "conservador", "arrojado",
    // Shared
    "roi", "payback", "breakeven",
];

const JOKE_KEYWORDS: &[&str] = &[
    "piada", "piadas", "engracado", "brincadeira", "joke", "jokes", "funny", "laugh",
];

lazy_static! {
    /// Phrasings of financial questions that avoid the keyword list.
    static ref FINANCIAL_PATTERNS: Vec<Regex> = vec![
        Regex::new(r"\b(quanto|quanta|how much)\b.*\b(ganho|ganhei|gasto|gastei|custa|pago|earn|spend|spent|make)\b")
            .expect("valid financial pattern"),
        Regex::new(r"\b(qual|quais|what|whats)\b.*\b(retorno|return|rendimento|valor da hora|hourly rate)\b")
            .expect("valid financial pattern"),
        Regex::new(r"\bponto de equilibrio\b|\bbreak even\b")
            .expect("valid financial pattern"),
        Regex::new(r"\b(vale a pena investir|should i invest|worth investing)\b")
            .expect("valid financial pattern"),
    ];
}

const POSITIVE_WORDS: &[&str] = &[
    "bem", "bom", "boa", "otimo", "otima", "feliz", "animado", "animada", "excelente",
    "obrigado", "obrigada", "legal", "adoro", "great", "good", "happy", "excellent",
    "thanks", "love", "awesome", "nice", "glad",
];

const NEGATIVE_WORDS: &[&str] = &[
    "mal", "ruim", "triste", "pessimo", "pessima", "preocupado", "preocupada", "cansado",
    "prejuizo", "odeio", "bad", "sad", "terrible", "worried", "awful", "hate", "tired",
    "broke", "loss",
];

/// Score band around zero that counts as neutral
const NEUTRAL_BAND: f32 = 0.1;

// =============================
// Normalization
// =============================

/// Lowercase, fold accents, and reduce to single-spaced alphabetic words.
pub fn normalize(text: &str) -> String {
    let folded: String = text
        .trim()
        .to_lowercase()
        .chars()
        .map(fold_accent)
        .map(|c| if c.is_ascii_alphabetic() { c } else { ' ' })
        .collect();

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn fold_accent(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'å' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ç' => 'c',
        'ñ' => 'n',
        _ => c,
    }
}

/// Whole-word match of a (possibly multi-word) term against normalized text.
fn contains_term(padded: &str, term: &str) -> bool {
    padded.contains(&format!(" {} ", term))
}

fn matched_terms(padded: &str, terms: &[&str]) -> Vec<String> {
    terms
        .iter()
        .filter(|term| contains_term(padded, term))
        .map(|term| term.to_string())
        .collect()
}

// =============================
// Sentiment
// =============================

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SentimentError {
    #[error("no words to analyse")]
    EmptyCorpus,

    #[error("unsupported input: {0}")]
    Unsupported(String),
}

/// Polarity scorer. Returns a score in [-1, 1].
pub trait SentimentAnalyzer: Send + Sync {
    fn polarity(&self, normalized: &str) -> std::result::Result<f32, SentimentError>;
}

/// Word-list polarity over Portuguese and English vocabulary
#[derive(Debug, Clone, Copy, Default)]
pub struct LexiconSentiment;

impl SentimentAnalyzer for LexiconSentiment {
    fn polarity(&self, normalized: &str) -> std::result::Result<f32, SentimentError> {
        let words: Vec<&str> = normalized.split_whitespace().collect();
        if words.is_empty() {
            return Err(SentimentError::EmptyCorpus);
        }

        let positive = words.iter().filter(|w| POSITIVE_WORDS.contains(w)).count();
        let negative = words.iter().filter(|w| NEGATIVE_WORDS.contains(w)).count();
        let matched = positive + negative;

        if matched == 0 {
            return Ok(0.0);
        }

        Ok((positive as f32 - negative as f32) / matched as f32)
    }
}

pub fn bucket(score: f32) -> Sentiment {
    if score > NEUTRAL_BAND {
        Sentiment::Positive
    } else if score < -NEUTRAL_BAND {
        Sentiment::Negative
    } else {
        Sentiment::Neutral
    }
}

// =============================
// Classifier
// =============================

/// Intent classifier
#[derive(Clone)]
pub struct IntentClassifier {
    sentiment: Arc<dyn SentimentAnalyzer>,
}

impl IntentClassifier {
    pub fn new() -> Self {
        Self::with_sentiment(Arc::new(LexiconSentiment))
    }

    pub fn with_sentiment(sentiment: Arc<dyn SentimentAnalyzer>) -> Self {
        Self { sentiment }
    }

    /// Classify free text
    pub fn classify(&self, text: &str) -> Intent {
        let normalized = normalize(text);
        let padded = format!(" {} ", normalized);

        let greetings = matched_terms(&padded, GREETING_KEYWORDS);
        let financial = matched_terms(&padded, FINANCIAL_KEYWORDS);
        let jokes = matched_terms(&padded, JOKE_KEYWORDS);

        let kind = if !greetings.is_empty() {
            IntentKind::Greeting
        } else if !financial.is_empty() || matches_financial_pattern(&normalized) {
            IntentKind::Financial
        } else if !jokes.is_empty() {
            IntentKind::Joke
        } else {
            IntentKind::Generic
        };

        let sentiment = self.sentiment_of(&normalized);

        let keywords: BTreeSet<String> = greetings
            .into_iter()
            .chain(financial)
            .chain(jokes)
            .collect();

        debug!(intent = %kind, sentiment = ?sentiment, keywords = ?keywords, "Classified input");

        Intent {
            kind,
            keywords,
            sentiment,
        }
    }

    /// Keyword and sentiment metadata for a validated document.
    ///
    /// A cost sheet is always financial; category names such as "Oi" only
    /// contribute keywords.
    pub fn classify_document(&self, inputs: &FinancialInputs) -> Intent {
        let mut intent = self.classify(&flatten_inputs(inputs));
        intent.kind = IntentKind::Financial;
        intent
    }

    fn sentiment_of(&self, normalized: &str) -> Sentiment {
        match self.sentiment.polarity(normalized) {
            Ok(score) if score.is_finite() => bucket(score),
            Ok(score) => {
                warn!(score, "Sentiment score not finite, defaulting to neutral");
                Sentiment::Neutral
            }
            Err(e) => {
                warn!("Sentiment analysis failed, defaulting to neutral: {}", e);
                Sentiment::Neutral
            }
        }
    }
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::new()
    }
}

fn matches_financial_pattern(normalized: &str) -> bool {
    FINANCIAL_PATTERNS.iter().any(|re| re.is_match(normalized))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn kind_of(text: &str) -> IntentKind {
        IntentClassifier::new().classify(text).kind
    }

    #[test]
    fn test_normalize_strips_accents_and_punctuation() {
        assert_eq!(normalize("  Olá, BOM DIA!! tudo bem? "), "ola bom dia tudo bem");
        assert_eq!(normalize("Orçamento 2024: R$ 1.500,00"), "orcamento r");
        assert_eq!(normalize("???"), "");
    }

    #[test]
    fn test_greetings_regardless_of_case_and_accents() {
        let cases = vec![
            "Olá, bom dia, tudo bem?",
            "OLA, BOM DIA, TUDO BEM",
            "ola bom dia tudo bem",
            "olá,   Bom   Día!",
            "hello there",
        ];

        for c in cases {
            assert_eq!(kind_of(c), IntentKind::Greeting, "case: {}", c);
        }
    }

    #[test]
    fn test_financial_questions() {
        let cases = vec![
            "qual o ROI do meu investimento",
            "Qual é a minha receita projetada?",
            "how is my profit margin looking",
            "quanto eu ganho por mês?",
            "qual o ponto de equilíbrio?",
        ];

        for c in cases {
            assert_eq!(kind_of(c), IntentKind::Financial, "case: {}", c);
        }
    }

    #[test]
    fn test_greeting_wins_over_financial() {
        assert_eq!(kind_of("oi, qual o meu lucro?"), IntentKind::Greeting);
    }

    #[test]
    fn test_financial_wins_over_joke() {
        assert_eq!(kind_of("conta uma piada sobre impostos e lucro"), IntentKind::Financial);
    }

    #[test]
    fn test_jokes_and_generic() {
        assert_eq!(kind_of("me conta uma piada"), IntentKind::Joke);
        assert_eq!(kind_of("tell me something funny"), IntentKind::Joke);
        assert_eq!(kind_of("me fale sobre o filme Matrix"), IntentKind::Generic);
        assert_eq!(kind_of(""), IntentKind::Generic);
    }

    #[test]
    fn test_keywords_match_whole_words_only() {
        // "hi" inside "this" and "oi" inside "coisa" must not count as greetings
        assert_eq!(kind_of("this coisa"), IntentKind::Generic);
    }

    #[test]
    fn test_keywords_are_reported() {
        let intent = IntentClassifier::new().classify("qual o ROI do meu investimento");
        assert!(intent.keywords.contains("roi"));
        assert!(intent.keywords.contains("investimento"));

        let intent = IntentClassifier::new().classify("o que é margem de contribuição?");
        assert_eq!(intent.kind, IntentKind::Financial);
        assert!(intent.keywords.contains("margem de contribuicao"));
    }

    #[test]
    fn test_sentiment_buckets() {
        let classifier = IntentClassifier::new();
        assert_eq!(classifier.classify("estou muito feliz hoje").sentiment, Sentiment::Positive);
        assert_eq!(classifier.classify("I feel sad and worried").sentiment, Sentiment::Negative);
        assert_eq!(classifier.classify("me fale sobre o tempo").sentiment, Sentiment::Neutral);
    }

    struct BrokenAnalyzer;

    impl SentimentAnalyzer for BrokenAnalyzer {
        fn polarity(&self, _normalized: &str) -> std::result::Result<f32, SentimentError> {
            Err(SentimentError::Unsupported("corpus missing".into()))
        }
    }

    struct NanAnalyzer;

    impl SentimentAnalyzer for NanAnalyzer {
        fn polarity(&self, _normalized: &str) -> std::result::Result<f32, SentimentError> {
            Ok(f32::NAN)
        }
    }

    #[test]
    fn test_sentiment_failure_defaults_to_neutral() {
        let classifier = IntentClassifier::with_sentiment(Arc::new(BrokenAnalyzer));
        let intent = classifier.classify("estou muito feliz");
        assert_eq!(intent.sentiment, Sentiment::Neutral);

        let classifier = IntentClassifier::with_sentiment(Arc::new(NanAnalyzer));
        assert_eq!(classifier.classify("hello").sentiment, Sentiment::Neutral);

        // Empty input makes the lexicon fail, which must still be neutral
        assert_eq!(IntentClassifier::new().classify("!!!").sentiment, Sentiment::Neutral);
    }

    #[test]
    fn test_document_projection_is_financial() {
        let costs = BTreeMap::from([("fixed".to_string(), 10_000.0), ("rent".to_string(), 2_000.0)]);
        let inputs = FinancialInputs::new(costs, 18_000.0, 160.0);
        let intent = IntentClassifier::new().classify_document(&inputs);
        assert_eq!(intent.kind, IntentKind::Financial);
    }

    #[test]
    fn test_greeting_word_category_stays_financial() {
        let costs = BTreeMap::from([("Oi".to_string(), 200.0), ("Hi-Fi".to_string(), 50.0)]);
        let inputs = FinancialInputs::new(costs, 400.0, 160.0);
        let intent = IntentClassifier::new().classify_document(&inputs);
        assert_eq!(intent.kind, IntentKind::Financial);
        assert!(intent.keywords.contains("oi"));
    }

    #[test]
    fn test_keywords_can_be_attached_to_an_intent() {
        let intent = Intent::new(IntentKind::Financial, Sentiment::Neutral).with_keywords(["roi", "payback"]);
        assert_eq!(intent.keywords.len(), 2);
        assert!(intent.keywords.contains("payback"));
    }
}
