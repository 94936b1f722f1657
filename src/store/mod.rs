//! Turn and financial-snapshot persistence
//!
//! In-memory for development and tests; Postgres when a database URL is set.

use crate::config::AssistantConfig;
use crate::models::{ConversationTurn, FinancialSnapshot};
use crate::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

pub mod postgres;
pub use postgres::PostgresTurnStore;

/// Trait for the persistence collaborator
#[async_trait::async_trait]
pub trait TurnStore: Send + Sync {
    /// Write prompt and response as one unit
    async fn save_turn(&self, turn: &ConversationTurn) -> Result<()>;
    async fn save_snapshot(&self, snapshot: &FinancialSnapshot) -> Result<()>;
    async fn latest_snapshot(&self, user_id: Uuid) -> Result<Option<FinancialSnapshot>>;
    /// Turns for a user, oldest first
    async fn turns_for_user(&self, user_id: Uuid) -> Result<Vec<ConversationTurn>>;
}

/// In-memory store for development
pub struct InMemoryTurnStore {
    turns_by_user: Arc<RwLock<HashMap<Uuid, Vec<ConversationTurn>>>>,
    snapshots_by_user: Arc<RwLock<HashMap<Uuid, Vec<FinancialSnapshot>>>>,
}

impl InMemoryTurnStore {
    pub fn new() -> Self {
        Self {
            turns_by_user: Arc::new(RwLock::new(HashMap::new())),
            snapshots_by_user: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryTurnStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl TurnStore for InMemoryTurnStore {
    async fn save_turn(&self, turn: &ConversationTurn) -> Result<()> {
        let mut turns = self.turns_by_user.write().await;
        turns.entry(turn.user_id).or_default().push(turn.clone());
        Ok(())
    }

    async fn save_snapshot(&self, snapshot: &FinancialSnapshot) -> Result<()> {
        let mut snapshots = self.snapshots_by_user.write().await;
        snapshots
            .entry(snapshot.user_id)
            .or_default()
            .push(snapshot.clone());
        Ok(())
    }

    async fn latest_snapshot(&self, user_id: Uuid) -> Result<Option<FinancialSnapshot>> {
        let snapshots = self.snapshots_by_user.read().await;
        Ok(snapshots
            .get(&user_id)
            .and_then(|list| list.iter().max_by_key(|s| s.created_at))
            .cloned())
    }

    async fn turns_for_user(&self, user_id: Uuid) -> Result<Vec<ConversationTurn>> {
        let turns = self.turns_by_user.read().await;
        let mut items = turns.get(&user_id).cloned().unwrap_or_default();
        items.sort_by_key(|t| t.created_at);
        Ok(items)
    }
}

/// Postgres when configured and reachable, otherwise in-memory
pub fn build_store(config: &AssistantConfig) -> Arc<dyn TurnStore> {
    if let Some(url) = config.database_url.as_deref() {
        match PostgresTurnStore::connect_lazy(url) {
            Ok(store) => {
                info!("Turn store backend: postgres");
                return Arc::new(store);
            }
            Err(error) => {
                warn!(
                    "Failed to initialize postgres turn store, falling back to in-memory: {}",
                    error
                );
            }
        }
    }

    info!("Turn store backend: in-memory");
    Arc::new(InMemoryTurnStore::new())
}
