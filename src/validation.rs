//! Payload validation
//!
//! Works on raw JSON so a rejection can name the first missing or mistyped
//! field. Presence and type only: no range checks (a negative income is
//! accepted and flows through to the engines).

use crate::error::AdvisorError;
use crate::models::{FinancialProfile, NewCalculation};
use crate::Result;
use serde_json::{Map, Number, Value};

/// Profile fields in validation order, using their wire names.
pub const PROFILE_FIELDS: [&str; 6] = ["age", "income", "savings", "risk", "goals", "timeline"];

/// Validate an analyze payload into a [`FinancialProfile`].
pub fn validate_profile(payload: &Value) -> Result<FinancialProfile> {
    let object = payload
        .as_object()
        .ok_or_else(|| AdvisorError::Validation("Profile must be a JSON object".to_string()))?;

    let age = require(object, "age")?
        .as_u64()
        .and_then(|age| u32::try_from(age).ok())
        .ok_or_else(|| malformed("age", "a non-negative integer"))?;

    let monthly_income = require_number(object, "income")?;
    let current_savings = require_number(object, "savings")?;
    let risk_tolerance = require_string(object, "risk")?;

    let goals = require(object, "goals")?
        .as_array()
        .ok_or_else(|| malformed("goals", "an array of strings"))?
        .iter()
        .map(|goal| goal.as_str().map(str::to_string))
        .collect::<Option<Vec<_>>>()
        .ok_or_else(|| malformed("goals", "an array of strings"))?;

    let timeline = require_string(object, "timeline")?;

    Ok(FinancialProfile {
        age,
        monthly_income,
        current_savings,
        risk_tolerance,
        goals,
        timeline,
    })
}

/// Validate a saved-calculation payload. Every field must be present and non-zero.
pub fn validate_calculation(payload: &Value) -> Result<NewCalculation> {
    let object = payload.as_object().ok_or_else(calculation_fields_required)?;

    let field = |name: &str| -> Result<f64> {
        object
            .get(name)
            .and_then(Value::as_f64)
            .filter(|value| value.is_finite() && *value != 0.0)
            .ok_or_else(calculation_fields_required)
    };

    Ok(NewCalculation {
        monthly_investment: field("monthlyInvestment")?.round() as i64,
        return_rate: field("returnRate")?,
        time_period: field("timePeriod")?.round() as i64,
        invested_amount: field("investedAmount")?.round() as i64,
        estimated_returns: field("estimatedReturns")?.round() as i64,
        total_value: field("totalValue")?.round() as i64,
    })
}

fn require<'a>(object: &'a Map<String, Value>, field: &str) -> Result<&'a Value> {
    match object.get(field) {
        None | Some(Value::Null) => Err(AdvisorError::Validation(format!(
            "Missing required field: {}",
            field
        ))),
        Some(value) => Ok(value),
    }
}

fn require_number(object: &Map<String, Value>, field: &str) -> Result<Number> {
    match require(object, field)? {
        Value::Number(number) => Ok(number.clone()),
        _ => Err(malformed(field, "a number")),
    }
}

fn require_string(object: &Map<String, Value>, field: &str) -> Result<String> {
    require(object, field)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| malformed(field, "a string"))
}

fn malformed(field: &str, expected: &str) -> AdvisorError {
    AdvisorError::Validation(format!("Invalid field {}: expected {}", field, expected))
}

fn calculation_fields_required() -> AdvisorError {
    AdvisorError::Validation("All calculation fields required".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    fn valid_payload() -> Value {
        json!({
            "age": 30,
            "income": 50000,
            "savings": 100000,
            "risk": "Aggressive",
            "goals": ["Retirement"],
            "timeline": "15 years"
        })
    }

    fn rejection(payload: &Value) -> String {
        match validate_profile(payload) {
            Err(AdvisorError::Validation(message)) => message,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_valid_profile() {
        let profile = assert_ok!(validate_profile(&valid_payload()));
        assert_eq!(profile.age, 30);
        assert_eq!(profile.income(), 50000.0);
        assert_eq!(profile.current_savings, Number::from(100000));
        assert_eq!(profile.risk_tolerance, "Aggressive");
        assert_eq!(profile.goals, vec!["Retirement".to_string()]);
        assert_eq!(profile.timeline, "15 years");
    }

    #[test]
    fn test_each_missing_field_is_named() {
        for field in PROFILE_FIELDS {
            let mut payload = valid_payload();
            payload.as_object_mut().unwrap().remove(field);
            let message = rejection(&payload);
            assert!(message.contains(field), "{} not named in '{}'", field, message);
        }
    }

    #[test]
    fn test_first_missing_field_wins() {
        let payload = json!({ "age": 30, "risk": "Moderate" });
        assert!(rejection(&payload).ends_with("income"));
    }

    #[test]
    fn test_null_counts_as_missing() {
        let mut payload = valid_payload();
        payload["timeline"] = Value::Null;
        assert_eq!(rejection(&payload), "Missing required field: timeline");
    }

    #[test]
    fn test_mistyped_fields() {
        let mut payload = valid_payload();
        payload["income"] = json!("50000");
        assert!(rejection(&payload).contains("income"));

        let mut payload = valid_payload();
        payload["goals"] = json!(["Retirement", 5]);
        assert!(rejection(&payload).contains("goals"));

        let mut payload = valid_payload();
        payload["age"] = json!(30.5);
        assert!(rejection(&payload).contains("age"));
    }

    #[test]
    fn test_negative_income_and_empty_goals_accepted() {
        let mut payload = valid_payload();
        payload["income"] = json!(-1000);
        payload["goals"] = json!([]);

        let profile = assert_ok!(validate_profile(&payload));
        assert_eq!(profile.income(), -1000.0);
        assert!(profile.goals.is_empty());
    }

    #[test]
    fn test_non_object_rejected() {
        assert_err!(validate_profile(&json!(["age", 30])));
    }

    #[test]
    fn test_calculation_requires_every_field() {
        let payload = json!({
            "monthlyInvestment": 5000,
            "returnRate": 12.0,
            "timePeriod": 10,
            "investedAmount": 600000,
            "estimatedReturns": 561695.4,
            "totalValue": 1161695
        });

        let calculation = assert_ok!(validate_calculation(&payload));
        assert_eq!(calculation.estimated_returns, 561695);
        assert_eq!(calculation.return_rate, 12.0);

        let mut zeroed = payload.clone();
        zeroed["timePeriod"] = json!(0);
        assert_err!(validate_calculation(&zeroed));

        let mut missing = payload;
        missing.as_object_mut().unwrap().remove("totalValue");
        assert_err!(validate_calculation(&missing));
    }
}
