//! In-memory stores for development and tests

use super::{CalculationStore, SessionStore};
use crate::models::{AdvisorSession, Calculation, FinancialProfile, NewCalculation, Recommendation};
use crate::Result;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Rows are kept in insertion order; ids grow with it.
struct Table<T> {
    next_id: i64,
    rows: Vec<T>,
}

impl<T> Table<T> {
    fn new() -> Self {
        Self {
            next_id: 1,
            rows: Vec::new(),
        }
    }

    fn allocate_id(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

pub struct InMemorySessionStore {
    sessions: Arc<RwLock<Table<AdvisorSession>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self {
            sessions: Arc::new(RwLock::new(Table::new())),
        }
    }
}

impl Default for InMemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl SessionStore for InMemorySessionStore {
    async fn record(
        &self,
        user_id: i64,
        profile: &FinancialProfile,
        recommendation: &Recommendation,
    ) -> Result<i64> {
        let mut table = self.sessions.write().await;
        let id = table.allocate_id();

        table.rows.push(AdvisorSession {
            id,
            user_id,
            profile: profile.clone(),
            recommendation: recommendation.clone(),
            created_at: Utc::now(),
        });

        Ok(id)
    }

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<AdvisorSession>> {
        let table = self.sessions.read().await;

        // Insertion order is creation order, so reversing gives newest first
        // even when two rows share a timestamp.
        Ok(table
            .rows
            .iter()
            .rev()
            .filter(|session| session.user_id == user_id)
            .cloned()
            .collect())
    }
}

pub struct InMemoryCalculationStore {
    calculations: Arc<RwLock<Table<Calculation>>>,
}

impl InMemoryCalculationStore {
    pub fn new() -> Self {
        Self {
            calculations: Arc::new(RwLock::new(Table::new())),
        }
    }
}

impl Default for InMemoryCalculationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl CalculationStore for InMemoryCalculationStore {
    async fn save(&self, user_id: i64, calculation: NewCalculation) -> Result<i64> {
        let mut table = self.calculations.write().await;
        let id = table.allocate_id();

        table
            .rows
            .push(Calculation::from_new(id, user_id, calculation, Utc::now()));

        Ok(id)
    }

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Calculation>> {
        let table = self.calculations.read().await;

        Ok(table
            .rows
            .iter()
            .rev()
            .filter(|calculation| calculation.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn delete_owned(&self, user_id: i64, id: i64) -> Result<bool> {
        let mut table = self.calculations.write().await;
        let before = table.rows.len();

        table
            .rows
            .retain(|calculation| !(calculation.id == id && calculation.user_id == user_id));

        Ok(table.rows.len() != before)
    }
}
