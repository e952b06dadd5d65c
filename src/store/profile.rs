//! Persisted user profile and the tour-completed flag.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::StoreError;
use crate::tour::model::UserProfile;

use super::traits::KeyValueStore;

/// Keys used in the key-value store.
pub mod keys {
    /// The `UserProfile` JSON document.
    pub const PROFILE: &str = "guided_tour_profile";
    /// Set once a tour run has been closed; gates the restart affordance.
    pub const COMPLETED: &str = "guided_tour_completed";
}

/// Loads and saves the single profile document.
#[derive(Clone)]
pub struct ProfileStore {
    kv: Arc<dyn KeyValueStore>,
}

impl ProfileStore {
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self { kv }
    }

    /// The stored profile, or `None` if absent, unreadable or corrupt.
    pub async fn load(&self) -> Option<UserProfile> {
        let raw = match self.kv.get(keys::PROFILE).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Failed to read user profile: {}", e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(profile) => Some(profile),
            Err(e) => {
                warn!("Stored user profile is corrupt, starting fresh: {}", e);
                None
            }
        }
    }

    /// The stored profile, or a fresh default one.
    pub async fn load_or_create(&self) -> UserProfile {
        match self.load().await {
            Some(profile) => profile,
            None => {
                debug!("Creating fresh user profile");
                UserProfile::default()
            }
        }
    }

    /// Overwrite the stored profile.
    pub async fn save(&self, profile: &UserProfile) -> Result<(), StoreError> {
        let json = serde_json::to_string(profile)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        self.kv.set(keys::PROFILE, &json).await
    }

    pub async fn set_completed_flag(&self) -> Result<(), StoreError> {
        self.kv.set(keys::COMPLETED, "true").await
    }

    pub async fn clear_completed_flag(&self) -> Result<(), StoreError> {
        self.kv.remove(keys::COMPLETED).await.map(|_| ())
    }

    /// Whether a tour run has been completed. Read failures count as "no".
    pub async fn is_completed(&self) -> bool {
        match self.kv.get(keys::COMPLETED).await {
            Ok(value) => value.as_deref() == Some("true"),
            Err(e) => {
                warn!("Failed to read tour completion flag: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::tour::model::fields;

    fn store() -> (Arc<MemoryStore>, ProfileStore) {
        let kv = Arc::new(MemoryStore::new());
        (kv.clone(), ProfileStore::new(kv))
    }

    #[tokio::test]
    async fn load_absent_is_none() {
        let (_, profiles) = store();
        assert!(profiles.load().await.is_none());
    }

    #[tokio::test]
    async fn save_then_load() {
        let (_, profiles) = store();
        let profile = UserProfile::default()
            .with_answer(fields::PRIMARY_GOAL, "Making an investment".into())
            .with_completed_steps(["welcome"]);
        profiles.save(&profile).await.unwrap();

        let loaded = profiles.load().await.unwrap();
        assert_eq!(loaded, profile);
    }

    #[tokio::test]
    async fn document_without_timestamps_is_not_corrupt() {
        let (kv, profiles) = store();
        kv.set(
            keys::PROFILE,
            r#"{"interests":["luxury"],"interactions":{"pagesViewed":[],"timeSpent":0,"actions":[]},"tourProgress":{"completedSteps":["welcome","primary-goal"],"skippedSteps":[],"timeSpentPerStep":{},"preferences":{"primaryGoal":"Making an investment"}}}"#,
        )
        .await
        .unwrap();

        let loaded = profiles.load().await.unwrap();
        assert_eq!(loaded.interests, vec!["luxury"]);
        assert_eq!(
            loaded.tour_progress.completed_steps,
            vec!["welcome", "primary-goal"]
        );
    }

    #[tokio::test]
    async fn corrupt_document_degrades_to_fresh_profile() {
        let (kv, profiles) = store();
        kv.set(keys::PROFILE, "{not json").await.unwrap();

        assert!(profiles.load().await.is_none());
        let fresh = profiles.load_or_create().await;
        assert!(fresh.interests.is_empty());
        assert!(fresh.tour_progress.completed_steps.is_empty());
    }

    #[tokio::test]
    async fn completed_flag_is_independent_of_profile() {
        let (kv, profiles) = store();
        assert!(!profiles.is_completed().await);

        profiles.set_completed_flag().await.unwrap();
        assert!(profiles.is_completed().await);
        assert!(kv.get(keys::PROFILE).await.unwrap().is_none());

        profiles.save(&UserProfile::default()).await.unwrap();
        profiles.clear_completed_flag().await.unwrap();
        assert!(!profiles.is_completed().await);
        assert!(profiles.load().await.is_some());
    }
}
