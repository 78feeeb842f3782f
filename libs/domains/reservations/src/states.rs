//! The catalog of named lifecycle states.
//!
//! The engine never invents state names: every transition resolves its target
//! through a [`StateRegistry`] before writing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::ReservationResult;
use crate::models::{ReservationState, ReservationStatus};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait StateRegistry: Send + Sync {
    /// Exact, case-sensitive match on the state name
    async fn find_by_name(&self, name: &str) -> ReservationResult<Option<ReservationState>>;

    async fn list_active(&self) -> ReservationResult<Vec<ReservationState>>;
}

/// Registry held in memory, seeded with the standard catalog
#[derive(Debug, Clone)]
pub struct InMemoryStateRegistry {
    states: Arc<RwLock<HashMap<ReservationStatus, ReservationState>>>,
}

impl Default for InMemoryStateRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStateRegistry {
    pub fn new() -> Self {
        Self::with_states(standard_catalog())
    }

    pub fn with_states(states: impl IntoIterator<Item = ReservationState>) -> Self {
        let states = states.into_iter().map(|s| (s.status, s)).collect();
        Self {
            states: Arc::new(RwLock::new(states)),
        }
    }

    /// Registry missing `status`, e.g. a database that was never seeded
    pub fn without(status: ReservationStatus) -> Self {
        Self::with_states(standard_catalog().into_iter().filter(|s| s.status != status))
    }

    pub async fn set_active(&self, status: ReservationStatus, active: bool) {
        if let Some(state) = self.states.write().await.get_mut(&status) {
            state.active = active;
        }
    }
}

#[async_trait]
impl StateRegistry for InMemoryStateRegistry {
    async fn find_by_name(&self, name: &str) -> ReservationResult<Option<ReservationState>> {
        let Ok(status) = ReservationStatus::from_str(name) else {
            return Ok(None);
        };

        Ok(self.states.read().await.get(&status).cloned())
    }

    async fn list_active(&self) -> ReservationResult<Vec<ReservationState>> {
        let states = self.states.read().await;
        let mut active: Vec<_> = states.values().filter(|s| s.active).cloned().collect();
        active.sort_by_key(|s| s.status as u8);
        Ok(active)
    }
}

/// The four states every deployment ships with
pub fn standard_catalog() -> Vec<ReservationState> {
    [
        (ReservationStatus::Pending, "Awaiting confirmation"),
        (ReservationStatus::Confirmed, "Confirmed and blocking the product dates"),
        (ReservationStatus::Cancelled, "Cancelled by the guest or an administrator"),
        (ReservationStatus::Completed, "Stay finished"),
    ]
    .into_iter()
    .map(|(status, description)| ReservationState {
        id: Uuid::now_v7(),
        status,
        description: description.to_string(),
        active: true,
    })
    .collect()
}
