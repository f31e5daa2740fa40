//! State persistence layer
//!
//! Advisor sessions and saved calculations, keyed by the owning user.
//! Postgres when a database URL is configured, in-memory otherwise.

use crate::models::{AdvisorSession, Calculation, FinancialProfile, NewCalculation, Recommendation};
use crate::Result;
use std::sync::Arc;
use tracing::{info, warn};

pub mod memory;
pub mod postgres;

pub use memory::{InMemoryCalculationStore, InMemorySessionStore};
pub use postgres::PgStore;

/// Append-only store of analyze results.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist one (profile, recommendation) pair and return its new id.
    async fn record(
        &self,
        user_id: i64,
        profile: &FinancialProfile,
        recommendation: &Recommendation,
    ) -> Result<i64>;

    /// Sessions owned by `user_id`, newest first.
    async fn list_by_user(&self, user_id: i64) -> Result<Vec<AdvisorSession>>;
}

/// Saved SIP calculator results.
#[async_trait::async_trait]
pub trait CalculationStore: Send + Sync {
    async fn save(&self, user_id: i64, calculation: NewCalculation) -> Result<i64>;

    /// Calculations owned by `user_id`, newest first.
    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Calculation>>;

    /// Delete `id` only if it belongs to `user_id`. Returns whether a row was removed.
    async fn delete_owned(&self, user_id: i64, id: i64) -> Result<bool>;
}

/// The store handles shared by the orchestrator and the HTTP layer.
#[derive(Clone)]
pub struct Stores {
    pub sessions: Arc<dyn SessionStore>,
    pub calculations: Arc<dyn CalculationStore>,
}

impl Stores {
    pub fn in_memory() -> Self {
        Self {
            sessions: Arc::new(InMemorySessionStore::new()),
            calculations: Arc::new(InMemoryCalculationStore::new()),
        }
    }
}

/// Pick the backend from an optional database URL.
///
/// The pool connects lazily, so an unreachable database surfaces as
/// storage errors on use rather than failing startup.
pub fn build_stores(database_url: Option<&str>) -> Stores {
    if let Some(url) = database_url {
        match PgStore::connect_lazy(url) {
            Ok(store) => {
                info!("Storage backend: postgres");
                let store = Arc::new(store);
                return Stores {
                    sessions: store.clone(),
                    calculations: store,
                };
            }
            Err(error) => {
                warn!(
                    "Failed to initialize postgres backend, falling back to in-memory: {}",
                    error
                );
            }
        }
    }

    info!("Storage backend: in-memory");
    Stores::in_memory()
}
