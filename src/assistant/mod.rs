//! Assistant orchestrator - classify, compute, compose, enrich, persist
//!
//! START → LOCAL_COMPUTED → [EXTERNAL_ATTEMPTED → MERGED | FAILED] → DONE
//!
//! The local answer is always complete before the external service is tried,
//! so a caller never sees an external failure. Only validation errors and the
//! zero-hours computation error leave `handle`.

pub mod session;

pub use session::SessionRegistry;

use crate::classifier::IntentClassifier;
use crate::config::{AssistantConfig, ExternalMode};
use crate::document::{flatten_inputs, DocumentPayload, InputDefaults};
use crate::error::ExternalServiceError;
use crate::finance::FinancialEngine;
use crate::gemini::GeminiClient;
use crate::generative::{GenerationRequest, GenerativeService};
use crate::models::{
    ConversationTurn, FinancialSnapshot, Humor, Intent, IntentKind, Origin, PersonaState,
};
use crate::persona::{Composition, PersonaComposer};
use crate::store::TurnStore;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Raw request from the presentation layer
#[derive(Debug, Clone)]
pub enum AssistantInput {
    Text(String),
    Document(DocumentPayload),
}

impl From<&str> for AssistantInput {
    fn from(text: &str) -> Self {
        AssistantInput::Text(text.to_string())
    }
}

impl From<DocumentPayload> for AssistantInput {
    fn from(payload: DocumentPayload) -> Self {
        AssistantInput::Document(payload)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Start,
    LocalComputed,
    ExternalAttempted,
    ExternalMerged,
    ExternalFailed,
    Done,
}

/// Single-attempt enrichment settings
#[derive(Debug, Clone)]
pub struct ExternalPolicy {
    pub mode: ExternalMode,
    pub timeout: Duration,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl ExternalPolicy {
    pub fn from_config(config: &AssistantConfig) -> Self {
        Self {
            mode: config.external_mode,
            timeout: config.external_timeout,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }
}

impl Default for ExternalPolicy {
    fn default() -> Self {
        Self::from_config(&AssistantConfig::default())
    }
}

#[derive(Debug, Clone)]
pub struct AssistantReply {
    pub text: String,
    pub origin: Origin,
    pub intent: Intent,
    pub stages: Vec<PipelineStage>,
    pub turn: ConversationTurn,
}

/// Everything computed without leaving the process
struct LocalAnswer {
    prompt_text: String,
    intent: Intent,
    text: String,
    snapshot: Option<FinancialSnapshot>,
}

pub struct Assistant {
    classifier: IntentClassifier,
    engine: FinancialEngine,
    composer: PersonaComposer,
    external: Option<Arc<dyn GenerativeService>>,
    policy: ExternalPolicy,
    store: Arc<dyn TurnStore>,
    sessions: SessionRegistry,
    input_defaults: InputDefaults,
}

impl Assistant {
    /// Local-only assistant
    pub fn new(store: Arc<dyn TurnStore>) -> Self {
        Self {
            classifier: IntentClassifier::new(),
            engine: FinancialEngine::new(),
            composer: PersonaComposer::default(),
            external: None,
            policy: ExternalPolicy::default(),
            store,
            sessions: SessionRegistry::new(),
            input_defaults: InputDefaults::default(),
        }
    }

    /// Wire everything from configuration; Gemini only when a key is present
    pub fn from_config(config: &AssistantConfig, store: Arc<dyn TurnStore>) -> Result<Self> {
        let mut assistant = Self::new(store).with_input_defaults(config.input_defaults());

        if config.external_enabled() {
            if let Some(api_key) = config.gemini_api_key.clone() {
                let client = GeminiClient::new(api_key, &config.gemini_model, config.external_timeout)?;
                assistant = assistant.with_external(Arc::new(client), ExternalPolicy::from_config(config));
            }
        } else {
            info!("External generative service disabled; running local-only");
        }

        Ok(assistant)
    }

    pub fn with_external(mut self, service: Arc<dyn GenerativeService>, policy: ExternalPolicy) -> Self {
        self.external = Some(service);
        self.policy = policy;
        self
    }

    pub fn with_composer(mut self, composer: PersonaComposer) -> Self {
        self.composer = composer;
        self
    }

    pub fn with_classifier(mut self, classifier: IntentClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_input_defaults(mut self, defaults: InputDefaults) -> Self {
        self.input_defaults = defaults;
        self
    }

    /// Answer text for one request
    pub async fn handle(&self, user_id: Uuid, input: impl Into<AssistantInput>) -> Result<String> {
        self.handle_detailed(user_id, input.into())
            .await
            .map(|reply| reply.text)
    }

    pub async fn set_humor(&self, user_id: Uuid, humor: Humor) {
        info!(user_id = %user_id, humor = %humor, "Humor changed");
        self.sessions.set_humor(user_id, humor).await;
    }

    pub async fn humor(&self, user_id: Uuid) -> Humor {
        self.sessions.persona(user_id).await.humor
    }

    /// Latest persisted financial figures for a user
    pub async fn latest_financials(&self, user_id: Uuid) -> Result<Option<FinancialSnapshot>> {
        self.store.latest_snapshot(user_id).await
    }

    /// Run the full pipeline and report how the answer was produced
    pub async fn handle_detailed(&self, user_id: Uuid, input: AssistantInput) -> Result<AssistantReply> {
        let start_time = Instant::now();
        let mut stages = vec![PipelineStage::Start];

        let persona = self.sessions.persona(user_id).await;

        // === LOCAL ===
        let local = self.compute_local(user_id, input, persona).await?;
        stages.push(PipelineStage::LocalComputed);

        info!(
            user_id = %user_id,
            intent = %local.intent.kind,
            humor = %persona.humor,
            "Local answer computed"
        );

        // === EXTERNAL ===
        let (text, origin) = self.enrich(&local, &mut stages).await;
        stages.push(PipelineStage::Done);

        // === PERSIST ===
        let turn = ConversationTurn::new(user_id, local.prompt_text, text.clone(), origin);
        self.persist(&turn, local.snapshot.as_ref()).await;

        debug!(
            user_id = %user_id,
            origin = %origin,
            stages = ?stages,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Request complete"
        );

        Ok(AssistantReply {
            text,
            origin,
            intent: local.intent,
            stages,
            turn,
        })
    }

    async fn compute_local(
        &self,
        user_id: Uuid,
        input: AssistantInput,
        persona: PersonaState,
    ) -> Result<LocalAnswer> {
        match input {
            AssistantInput::Text(prompt_text) => {
                let intent = self.classifier.classify(&prompt_text);

                let text = match intent.kind {
                    IntentKind::Financial => match self.load_latest_snapshot(user_id).await {
                        Some(snapshot) => {
                            let report = self.engine.compute(&snapshot.to_inputs())?;
                            self.composer.compose(Composition::Report(&report), persona)
                        }
                        None => self.composer.compose(Composition::MissingFinancialData(&intent), persona),
                    },
                    IntentKind::Greeting | IntentKind::Joke | IntentKind::Generic => {
                        self.composer.compose(Composition::Reply(&intent), persona)
                    }
                };

                Ok(LocalAnswer {
                    prompt_text,
                    intent,
                    text,
                    snapshot: None,
                })
            }
            AssistantInput::Document(payload) => {
                let inputs = payload.into_inputs(&self.input_defaults)?;

                // Only figures the engine accepted are ever captured
                let report = self.engine.compute(&inputs)?;
                let snapshot = FinancialSnapshot::capture(user_id, &inputs);

                let intent = self.classifier.classify_document(&inputs);
                let text = self.composer.compose(Composition::Report(&report), persona);

                Ok(LocalAnswer {
                    prompt_text: flatten_inputs(&inputs),
                    intent,
                    text,
                    snapshot: Some(snapshot),
                })
            }
        }
    }

    async fn load_latest_snapshot(&self, user_id: Uuid) -> Option<FinancialSnapshot> {
        match self.store.latest_snapshot(user_id).await {
            Ok(snapshot) => snapshot,
            Err(error) => {
                warn!(user_id = %user_id, "Financial snapshot load failed, answering without data: {}", error);
                None
            }
        }
    }

    /// One bounded attempt; any failure keeps the local answer
    async fn enrich(&self, local: &LocalAnswer, stages: &mut Vec<PipelineStage>) -> (String, Origin) {
        let (service, strategy) = match (&self.external, MergeStrategy::for_mode(self.policy.mode)) {
            (Some(service), Some(strategy)) => (service, strategy),
            _ => return (local.text.clone(), Origin::Local),
        };

        stages.push(PipelineStage::ExternalAttempted);

        let request = GenerationRequest {
            prompt: enrichment_prompt(local),
            max_tokens: self.policy.max_tokens,
            temperature: self.policy.temperature,
        };

        let outcome = match tokio::time::timeout(self.policy.timeout, service.generate(request)).await {
            Ok(Ok(text)) if text.trim().is_empty() => Err(ExternalServiceError::Malformed(
                "empty generated text".to_string(),
            )),
            Ok(result) => result,
            Err(_) => Err(ExternalServiceError::Timeout(self.policy.timeout)),
        };

        match outcome {
            Ok(external_text) => {
                stages.push(PipelineStage::ExternalMerged);
                info!(service = service.name(), mode = ?self.policy.mode, "External answer merged");
                (strategy.merge(&local.text, external_text.trim()), Origin::External)
            }
            Err(error) => {
                stages.push(PipelineStage::ExternalFailed);
                warn!(
                    service = service.name(),
                    "External enrichment failed, returning local answer: {}",
                    error
                );
                (local.text.clone(), Origin::Local)
            }
        }
    }

    async fn persist(&self, turn: &ConversationTurn, snapshot: Option<&FinancialSnapshot>) {
        if let Some(snapshot) = snapshot {
            if let Err(error) = self.store.save_snapshot(snapshot).await {
                warn!(user_id = %turn.user_id, "Financial snapshot save failed: {}", error);
            }
        }

        if let Err(error) = self.store.save_turn(turn).await {
            warn!(
                user_id = %turn.user_id,
                "Conversation turn save failed, response will still be returned: {}",
                error
            );
        }
    }
}

fn enrichment_prompt(local: &LocalAnswer) -> String {
    match local.intent.kind {
        IntentKind::Financial => format!(
            "Here is a financial analysis:\n\n{}\n\nAdd a short, friendly and useful perspective on \
             these numbers, with a light pop-culture reference. Do not change any figure.",
            local.text
        ),
        IntentKind::Greeting | IntentKind::Joke | IntentKind::Generic => local.prompt_text.clone(),
    }
}

/// How a successful external answer joins the local one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MergeStrategy {
    Append,
    Replace,
}

impl MergeStrategy {
    /// `None` when the mode never calls out
    fn for_mode(mode: ExternalMode) -> Option<Self> {
        match mode {
            ExternalMode::Off => None,
            ExternalMode::Augment => Some(MergeStrategy::Append),
            ExternalMode::Replace => Some(MergeStrategy::Replace),
        }
    }

    fn merge(self, local: &str, external: &str) -> String {
        match self {
            MergeStrategy::Append => format!("{}\n\n{}", local, external),
            MergeStrategy::Replace => external.to_string(),
        }
    }
}
