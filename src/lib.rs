//! Personal Finance Assistant
//!
//! A conversational assistant that:
//! - Classifies messages by keyword and sentiment
//! - Computes financial indicators from uploaded cost sheets
//! - Renders answers through a configurable humor persona
//! - Optionally enriches answers with an external generative service
//! - Persists every conversation turn
//!
//! PIPELINE:
//! INPUT → CLASSIFY → COMPUTE → COMPOSE → ENRICH? → PERSIST

pub mod api;
pub mod assistant;
pub mod classifier;
pub mod config;
pub mod document;
pub mod error;
pub mod finance;
pub mod gemini;
pub mod generative;
pub mod glossary;
pub mod models;
pub mod persona;
pub mod store;

pub use error::{AssistantError, ExternalServiceError, Result};

// Re-export common types
pub use assistant::{Assistant, AssistantInput, AssistantReply, PipelineStage};
pub use classifier::IntentClassifier;
pub use config::{AssistantConfig, ExternalMode};
pub use document::DocumentPayload;
pub use finance::FinancialEngine;
pub use models::*;
pub use persona::PersonaComposer;
