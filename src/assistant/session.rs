//! Per-user persona state
//!
//! Owned by one `Assistant`; never a process-wide singleton.

use crate::models::{Humor, PersonaState};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Clone, Default)]
pub struct SessionRegistry {
    personas: Arc<RwLock<HashMap<Uuid, PersonaState>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current persona; users who never changed humor get the default
    pub async fn persona(&self, user_id: Uuid) -> PersonaState {
        let personas = self.personas.read().await;
        personas.get(&user_id).copied().unwrap_or_default()
    }

    pub async fn set_humor(&self, user_id: Uuid, humor: Humor) {
        let mut personas = self.personas.write().await;
        personas.entry(user_id).or_default().humor = humor;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_humor_is_per_user() {
        let sessions = SessionRegistry::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        sessions.set_humor(alice, Humor::Sarcastic).await;

        assert_eq!(sessions.persona(alice).await.humor, Humor::Sarcastic);
        assert_eq!(sessions.persona(bob).await.humor, Humor::Default);
    }

    #[tokio::test]
    async fn test_registries_do_not_share_state() {
        let first = SessionRegistry::new();
        let second = SessionRegistry::new();
        let user = Uuid::new_v4();

        first.set_humor(user, Humor::Empathetic).await;
        assert_eq!(second.persona(user).await.humor, Humor::Default);
    }
}
