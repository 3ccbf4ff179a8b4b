use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use super::{entities::UserState, store::KeyValueStore};

pub fn storage_key(user_id: &str) -> String {
    format!("monitor-state:{user_id}")
}

/// Bridges [UserState] and a [KeyValueStore]. Saved state older than `max_age` is treated as
/// absent, as is anything that fails to read or parse.
pub struct PersistenceGateway<S: KeyValueStore> {
    store: S,
    max_age: Duration,
    default_exempt: Vec<String>,
}

impl<S: KeyValueStore> PersistenceGateway<S> {
    pub fn new(store: S, max_age: Duration, default_exempt: Vec<String>) -> Self {
        Self {
            store,
            max_age,
            default_exempt,
        }
    }

    /// Stamps `state` with `moment` and writes it under the user's key.
    pub async fn save(&self, state: &mut UserState, moment: DateTime<Utc>) -> Result<()> {
        state.saved_at = moment;
        let serialized = serde_json::to_string(state)?;
        self.store
            .set(&storage_key(&state.user_id), serialized)
            .await?;
        debug!("Saved state for {}", state.user_id);
        Ok(())
    }

    /// Returns the user's state if it is fresh. The whitelist comes back merged with the
    /// default-exempt identities.
    pub async fn load(&self, user_id: &str, now: DateTime<Utc>) -> Option<UserState> {
        let raw = match self.store.get(&storage_key(user_id)).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!("Couldn't read state for {user_id}: {e:?}");
                return None;
            }
        };

        let mut state = match serde_json::from_str::<UserState>(&raw) {
            Ok(state) => state,
            Err(e) => {
                warn!("Discarding malformed state for {user_id}: {e}");
                return None;
            }
        };

        if now - state.saved_at >= self.max_age {
            info!("Discarding stale state for {user_id} saved at {}", state.saved_at);
            return None;
        }

        state.user_id = user_id.to_string();
        state
            .focus_policy
            .whitelist
            .extend(self.default_exempt.iter().cloned());
        Some(state)
    }
}
