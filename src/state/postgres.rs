//! Postgres-backed stores
//!
//! Profiles and recommendations are stored as serialized JSON text, exactly
//! as they were at creation time. Owner rows live in `users`, which is
//! managed by the account service; deleting a user cascades to both tables.

use super::{CalculationStore, SessionStore};
use crate::error::AdvisorError;
use crate::models::{AdvisorSession, Calculation, FinancialProfile, NewCalculation, Recommendation};
use crate::Result;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info};

const SCHEMA: [&str; 4] = [
    r#"
    CREATE TABLE IF NOT EXISTS users (
      id BIGSERIAL PRIMARY KEY,
      name TEXT NOT NULL,
      email TEXT UNIQUE NOT NULL,
      password_hash TEXT NOT NULL,
      is_admin BOOLEAN NOT NULL DEFAULT FALSE,
      created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS calculations (
      id BIGSERIAL PRIMARY KEY,
      user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
      monthly_investment BIGINT NOT NULL,
      return_rate DOUBLE PRECISION NOT NULL,
      time_period BIGINT NOT NULL,
      invested_amount BIGINT NOT NULL,
      estimated_returns BIGINT NOT NULL,
      total_value BIGINT NOT NULL,
      created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    );
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS advisor_sessions (
      id BIGSERIAL PRIMARY KEY,
      user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
      profile_data TEXT NOT NULL,
      recommendation_data TEXT NOT NULL,
      created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    );
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS idx_advisor_sessions_user_time
    ON advisor_sessions (user_id, created_at DESC);
    "#,
];

pub struct PgStore {
    pool: PgPool,
    schema_ready: OnceCell<()>,
}

impl PgStore {
    /// Build a lazily-connecting pool; only the URL is checked here.
    pub fn connect_lazy(database_url: &str) -> std::result::Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .connect_lazy(database_url)?;

        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            schema_ready: OnceCell::new(),
        }
    }

    async fn ensure_schema(&self) -> Result<()> {
        self.schema_ready
            .get_or_try_init(|| async {
                for statement in SCHEMA {
                    sqlx::query(statement).execute(&self.pool).await?;
                }
                info!("Postgres schema ready");
                Ok::<(), sqlx::Error>(())
            })
            .await
            .map_err(storage("Failed to initialize schema"))?;

        Ok(())
    }
}

fn storage(context: &'static str) -> impl Fn(sqlx::Error) -> AdvisorError {
    move |e| AdvisorError::Storage(format!("{}: {}", context, e))
}

fn session_from_row(row: &PgRow) -> Result<AdvisorSession> {
    let read = storage("Failed to read advisor session");

    let profile_data: String = row.try_get("profile_data").map_err(&read)?;
    let recommendation_data: String = row.try_get("recommendation_data").map_err(&read)?;

    let profile: FinancialProfile = serde_json::from_str(&profile_data)
        .map_err(|e| AdvisorError::Storage(format!("Corrupt profile_data: {}", e)))?;
    let recommendation: Recommendation = serde_json::from_str(&recommendation_data)
        .map_err(|e| AdvisorError::Storage(format!("Corrupt recommendation_data: {}", e)))?;

    Ok(AdvisorSession {
        id: row.try_get("id").map_err(&read)?,
        user_id: row.try_get("user_id").map_err(&read)?,
        profile,
        recommendation,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at").map_err(&read)?,
    })
}

fn calculation_from_row(row: &PgRow) -> Result<Calculation> {
    let read = storage("Failed to read calculation");

    Ok(Calculation {
        id: row.try_get("id").map_err(&read)?,
        user_id: row.try_get("user_id").map_err(&read)?,
        monthly_investment: row.try_get("monthly_investment").map_err(&read)?,
        return_rate: row.try_get("return_rate").map_err(&read)?,
        time_period: row.try_get("time_period").map_err(&read)?,
        invested_amount: row.try_get("invested_amount").map_err(&read)?,
        estimated_returns: row.try_get("estimated_returns").map_err(&read)?,
        total_value: row.try_get("total_value").map_err(&read)?,
        created_at: row.try_get("created_at").map_err(&read)?,
    })
}

#[async_trait::async_trait]
impl SessionStore for PgStore {
    async fn record(
        &self,
        user_id: i64,
        profile: &FinancialProfile,
        recommendation: &Recommendation,
    ) -> Result<i64> {
        self.ensure_schema().await?;

        let profile_data = serde_json::to_string(profile)?;
        let recommendation_data = serde_json::to_string(recommendation)?;

        let row = sqlx::query(
            r#"
            INSERT INTO advisor_sessions (user_id, profile_data, recommendation_data)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(profile_data)
        .bind(recommendation_data)
        .fetch_one(&self.pool)
        .await
        .map_err(storage("Failed to save advisor session"))?;

        let id: i64 = row.try_get("id").map_err(storage("Failed to read session id"))?;
        debug!(user_id, session_id = id, "Advisor session stored");

        Ok(id)
    }

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<AdvisorSession>> {
        self.ensure_schema().await?;

        let rows = sqlx::query(
            r#"
            SELECT id, user_id, profile_data, recommendation_data, created_at
            FROM advisor_sessions
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage("Failed to load advisor sessions"))?;

        rows.iter().map(session_from_row).collect()
    }
}

#[async_trait::async_trait]
impl CalculationStore for PgStore {
    async fn save(&self, user_id: i64, calculation: NewCalculation) -> Result<i64> {
        self.ensure_schema().await?;

        let row = sqlx::query(
            r#"
            INSERT INTO calculations
              (user_id, monthly_investment, return_rate, time_period, invested_amount, estimated_returns, total_value)
            VALUES
              ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(calculation.monthly_investment)
        .bind(calculation.return_rate)
        .bind(calculation.time_period)
        .bind(calculation.invested_amount)
        .bind(calculation.estimated_returns)
        .bind(calculation.total_value)
        .fetch_one(&self.pool)
        .await
        .map_err(storage("Failed to save calculation"))?;

        row.try_get("id").map_err(storage("Failed to read calculation id"))
    }

    async fn list_by_user(&self, user_id: i64) -> Result<Vec<Calculation>> {
        self.ensure_schema().await?;

        let rows = sqlx::query(
            r#"
            SELECT id, user_id, monthly_investment, return_rate, time_period,
                   invested_amount, estimated_returns, total_value, created_at
            FROM calculations
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage("Failed to load calculations"))?;

        rows.iter().map(calculation_from_row).collect()
    }

    async fn delete_owned(&self, user_id: i64, id: i64) -> Result<bool> {
        self.ensure_schema().await?;

        let result = sqlx::query("DELETE FROM calculations WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(storage("Failed to delete calculation"))?;

        Ok(result.rows_affected() > 0)
    }
}
