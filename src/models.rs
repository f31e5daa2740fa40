//! Core data models for the advisor service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Number;
use std::fmt;

//
// ================= Enums =================
//

/// Decision key for the fallback allocation table.
///
/// Only the exact tags `"Aggressive"` and `"Conservative"` select their rows;
/// every other tag (including `"Moderate"`, `"Balanced"` or a lowercase
/// spelling) lands on the moderate default.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RiskTier {
    Conservative,
    Moderate,
    Aggressive,
}

impl RiskTier {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "Aggressive" => RiskTier::Aggressive,
            "Conservative" => RiskTier::Conservative,
            _ => RiskTier::Moderate,
        }
    }
}

/// Which production path generated a recommendation. Never serialized to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    External,
    Fallback,
}

impl Provenance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::External => "external",
            Provenance::Fallback => "fallback",
        }
    }
}

//
// ================= Profile =================
//

/// Validated financial profile, built per request.
///
/// Amounts are kept as JSON numbers so the stored copy matches what the
/// caller sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinancialProfile {
    pub age: u32,
    #[serde(rename = "income")]
    pub monthly_income: Number,
    #[serde(rename = "savings")]
    pub current_savings: Number,
    #[serde(rename = "risk")]
    pub risk_tolerance: String,
    pub goals: Vec<String>,
    pub timeline: String,
}

impl FinancialProfile {
    pub fn income(&self) -> f64 {
        self.monthly_income.as_f64().unwrap_or_default()
    }

    pub fn risk_tier(&self) -> RiskTier {
        RiskTier::from_tag(&self.risk_tolerance)
    }

    /// Goals as one phrase ("Retirement and Child Education").
    pub fn goals_phrase(&self) -> String {
        self.goals.join(" and ")
    }
}

//
// ================= Recommendation =================
//

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AssetAllocation {
    pub equity: f64,
    pub debt: f64,
    pub hybrid: f64,
    pub gold: f64,
}

impl AssetAllocation {
    pub const fn new(equity: f64, debt: f64, hybrid: f64, gold: f64) -> Self {
        Self {
            equity,
            debt,
            hybrid,
            gold,
        }
    }

    pub fn total(&self) -> f64 {
        self.equity + self.debt + self.hybrid + self.gold
    }

    pub fn entries(&self) -> [(&'static str, f64); 4] {
        [
            ("equity", self.equity),
            ("debt", self.debt),
            ("hybrid", self.hybrid),
            ("gold", self.gold),
        ]
    }
}

/// Canonical recommendation shape returned to callers and stored verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    #[serde(rename = "suggestedSIP", deserialize_with = "deserialize_amount")]
    pub suggested_sip: u64,
    pub asset_allocation: AssetAllocation,
    pub strategy: String,
    pub recommended_funds: Vec<String>,
    pub risk_analysis: String,
    pub action_plan: Vec<String>,
}

/// Accepts `10000` as well as `10000.0` / `9999.6`; rejects negatives, non-finite
/// values and anything that does not fit in a u64.
fn deserialize_amount<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if !value.is_finite() || value < 0.0 {
        return Err(serde::de::Error::custom(format!(
            "amount must be a non-negative number, got {}",
            value
        )));
    }
    let rounded = value.round();
    if rounded >= u64::MAX as f64 {
        return Err(serde::de::Error::custom(format!(
            "amount out of range: {}",
            value
        )));
    }
    Ok(rounded as u64)
}

//
// ================= Sessions =================
//

/// One persisted analyze request. Immutable once stored.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisorSession {
    pub id: i64,
    #[serde(skip_serializing)]
    pub user_id: i64,
    pub profile: FinancialProfile,
    pub recommendation: Recommendation,
    pub created_at: DateTime<Utc>,
}

//
// ================= Calculations =================
//

/// SIP calculator result as submitted by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCalculation {
    pub monthly_investment: i64,
    pub return_rate: f64,
    pub time_period: i64,
    pub invested_amount: i64,
    pub estimated_returns: i64,
    pub total_value: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Calculation {
    pub id: i64,
    pub user_id: i64,
    pub monthly_investment: i64,
    pub return_rate: f64,
    pub time_period: i64,
    pub invested_amount: i64,
    pub estimated_returns: i64,
    pub total_value: i64,
    pub created_at: DateTime<Utc>,
}

impl Calculation {
    pub fn from_new(id: i64, user_id: i64, new: NewCalculation, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id,
            monthly_investment: new.monthly_investment,
            return_rate: new.return_rate,
            time_period: new.time_period,
            invested_amount: new.invested_amount,
            estimated_returns: new.estimated_returns,
            total_value: new.total_value,
            created_at,
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskTier::Conservative => "Conservative",
            RiskTier::Moderate => "Moderate",
            RiskTier::Aggressive => "Aggressive",
        };
        write!(f, "{}", s)
    }
}
