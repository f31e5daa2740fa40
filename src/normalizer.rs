//! Model output normalization
//!
//! Turns raw generative text into a [`Recommendation`]. The model is not
//! trusted: the text must parse, carry all six top-level fields and match
//! their types. The allocation sum is reported but not enforced.

use crate::error::AdvisorError;
use crate::models::Recommendation;
use crate::Result;
use serde_json::Value;
use tracing::warn;

/// Required top-level fields, in the order they are checked.
pub const RECOMMENDATION_FIELDS: [&str; 6] = [
    "suggestedSIP",
    "assetAllocation",
    "strategy",
    "recommendedFunds",
    "riskAnalysis",
    "actionPlan",
];

/// Parse raw model output into the canonical recommendation shape.
pub fn normalize(raw: &str) -> Result<Recommendation> {
    let cleaned = strip_code_fences(raw);

    let json = serde_json::from_str::<Value>(cleaned)
        .or_else(|first_error| {
            outermost_object(cleaned)
                .and_then(|candidate| serde_json::from_str::<Value>(candidate).ok())
                .ok_or(first_error)
        })
        .map_err(|e| {
            AdvisorError::MalformedResponse(format!("Model output is not valid JSON: {}", e))
        })?;

    let object = json.as_object().ok_or_else(|| {
        AdvisorError::MalformedResponse("Model output is not a JSON object".to_string())
    })?;

    if let Some(missing) = RECOMMENDATION_FIELDS
        .iter()
        .find(|field| object.get(**field).map_or(true, Value::is_null))
    {
        return Err(AdvisorError::MalformedResponse(format!(
            "Model output missing field: {}",
            missing
        )));
    }

    let recommendation: Recommendation = serde_json::from_value(json).map_err(|e| {
        AdvisorError::MalformedResponse(format!("Model output has the wrong shape: {}", e))
    })?;

    for (name, text) in [
        ("strategy", &recommendation.strategy),
        ("riskAnalysis", &recommendation.risk_analysis),
    ] {
        if text.trim().is_empty() {
            return Err(AdvisorError::MalformedResponse(format!(
                "Model output has blank {}",
                name
            )));
        }
    }

    let allocation = recommendation.asset_allocation;
    if let Some((name, value)) = allocation
        .entries()
        .into_iter()
        .find(|(_, value)| !(0.0..=100.0).contains(value))
    {
        return Err(AdvisorError::MalformedResponse(format!(
            "Allocation {} out of range: {}",
            name, value
        )));
    }

    if (allocation.total() - 100.0).abs() > f64::EPSILON * 100.0 {
        warn!(
            total = allocation.total(),
            "Model allocation does not sum to 100; passing through unchanged"
        );
    }

    Ok(recommendation)
}

/// Remove surrounding ```json / ``` markers and whitespace.
fn strip_code_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let without_open = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```JSON"))
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);

    without_open
        .trim()
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
}

/// Largest `{ ... }` span, for answers with prose around the object.
fn outermost_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (start < end).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AssetAllocation;
    use serde_json::json;
    use tokio_test::assert_ok;

    fn model_json() -> Value {
        json!({
            "suggestedSIP": 15000,
            "assetAllocation": {"equity": 60, "debt": 25, "hybrid": 5, "gold": 10},
            "strategy": "Index-heavy core with a satellite mid-cap sleeve.",
            "recommendedFunds": ["Large Cap Index Fund", "Mid Cap Fund"],
            "riskAnalysis": "Long horizon supports equity volatility.",
            "actionPlan": ["Start SIP", "Build emergency fund", "Rebalance yearly"]
        })
    }

    fn malformed_message(raw: &str) -> String {
        match normalize(raw) {
            Err(AdvisorError::MalformedResponse(message)) => message,
            other => panic!("expected malformed response, got {:?}", other),
        }
    }

    #[test]
    fn test_plain_json() {
        let recommendation = assert_ok!(normalize(&model_json().to_string()));
        assert_eq!(recommendation.suggested_sip, 15000);
        assert_eq!(
            recommendation.asset_allocation,
            AssetAllocation::new(60.0, 25.0, 5.0, 10.0)
        );
        assert_eq!(recommendation.action_plan.len(), 3);
    }

    #[test]
    fn test_fenced_json() {
        let fenced = format!("```json\n{}\n```", model_json());
        assert_ok!(normalize(&fenced));

        let bare_fence = format!("  ```\n{}\n```  \n", model_json());
        assert_ok!(normalize(&bare_fence));
    }

    #[test]
    fn test_prose_around_object() {
        let chatty = format!("Here is your plan:\n{}\nGood luck!", model_json());
        let recommendation = assert_ok!(normalize(&chatty));
        assert_eq!(recommendation.recommended_funds.len(), 2);
    }

    #[test]
    fn test_missing_field_is_named() {
        for field in RECOMMENDATION_FIELDS {
            let mut json = model_json();
            json.as_object_mut().unwrap().remove(field);
            let message = malformed_message(&json.to_string());
            assert!(message.ends_with(field), "'{}' should name {}", message, field);
        }
    }

    #[test]
    fn test_not_json() {
        let message = malformed_message("I'm sorry, I can't help with that.");
        assert!(message.contains("not valid JSON"));
        malformed_message("");
        malformed_message("[1, 2, 3]");
    }

    #[test]
    fn test_wrong_types_rejected() {
        let mut json = model_json();
        json["recommendedFunds"] = json!("Large Cap Index Fund");
        malformed_message(&json.to_string());

        let mut json = model_json();
        json["suggestedSIP"] = json!("15000");
        malformed_message(&json.to_string());
    }

    #[test]
    fn test_blank_narratives_rejected() {
        for field in ["strategy", "riskAnalysis"] {
            for blank in ["", "   \n"] {
                let mut json = model_json();
                json[field] = json!(blank);
                let message = malformed_message(&json.to_string());
                assert!(message.ends_with(field), "'{}' should name {}", message, field);
            }
        }
    }

    #[test]
    fn test_out_of_range_allocation_rejected() {
        let mut json = model_json();
        json["assetAllocation"]["equity"] = json!(140);
        let message = malformed_message(&json.to_string());
        assert!(message.contains("equity"));
    }

    #[test]
    fn test_allocation_sum_not_enforced() {
        let mut json = model_json();
        json["assetAllocation"] = json!({"equity": 60, "debt": 30, "hybrid": 10, "gold": 10});
        let recommendation = assert_ok!(normalize(&json.to_string()));
        assert_eq!(recommendation.asset_allocation.total(), 110.0);
    }
}
