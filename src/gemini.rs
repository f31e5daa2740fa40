//! Gemini API client for the advisor
//!
//! Builds the advisory prompt from a profile and issues exactly one
//! `generateContent` call. No retries: any failure is returned to the
//! caller, which decides what to do with it.
//!
//! The underlying reqwest::Client is built on first use and reused for
//! every later call (connection-pooled).

use crate::error::AdvisorError;
use crate::models::FinancialProfile;
use crate::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, error, info};

const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Seam for the external text-generation service.
#[async_trait]
pub trait AdvisoryClient: Send + Sync {
    /// Raw model text for the profile, or `ExternalService` on any failure.
    async fn advise(&self, profile: &FinancialProfile) -> Result<String>;
}

/// Reusable Gemini client
pub struct GeminiClient {
    http: OnceCell<Client>,
    api_key: Option<String>,
    model: String,
    timeout: Duration,
    base_url: String,
}

impl GeminiClient {
    pub fn new(api_key: Option<String>, model: impl Into<String>, timeout: Duration) -> Self {
        Self {
            http: OnceCell::new(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            model: model.into(),
            timeout,
            base_url: GEMINI_BASE_URL.to_string(),
        }
    }

    /// Point the client at a different API root (proxies, test servers).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn has_credentials(&self) -> bool {
        self.api_key.is_some()
    }

    async fn http(&self) -> Result<&Client> {
        self.http
            .get_or_try_init(|| async {
                info!("Initializing Gemini HTTP client");
                Client::builder()
                    .pool_idle_timeout(Duration::from_secs(90))
                    .pool_max_idle_per_host(8)
                    .timeout(self.timeout)
                    .build()
                    .map_err(|e| {
                        AdvisorError::ExternalService(format!("Failed to build HTTP client: {}", e))
                    })
            })
            .await
    }

    /// Send one prompt and return the first candidate's text.
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            AdvisorError::ExternalService("GEMINI_API_KEY not configured".to_string())
        })?;

        let url = format!("{}/{}:generateContent", self.base_url, self.model);

        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.3,
                top_p: 0.9,
                top_k: 40,
                max_output_tokens: 2048,
                response_mime_type: "application/json",
            },
        };

        debug!(model = %self.model, "Calling Gemini API");

        let response = self
            .http()
            .await?
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Gemini API request failed: {}", e);
                AdvisorError::ExternalService(format!("Gemini API request failed: {}", e))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(%status, "Gemini API error response: {}", error_text);
            return Err(AdvisorError::ExternalService(format!(
                "Gemini API returned {}: {}",
                status, error_text
            )));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            AdvisorError::ExternalService(format!("Unreadable Gemini response: {}", e))
        })?;

        let text = gemini_response.first_text()?;

        info!(
            model = %self.model,
            chars = text.len(),
            "Gemini response received"
        );

        Ok(text)
    }
}

#[async_trait]
impl AdvisoryClient for GeminiClient {
    async fn advise(&self, profile: &FinancialProfile) -> Result<String> {
        self.generate(&build_prompt(profile)).await
    }
}

/// Advisory prompt embedding every profile field plus the output schema.
pub fn build_prompt(profile: &FinancialProfile) -> String {
    format!(
        r#"Act as an expert financial advisor for an Indian investor. Based on the following profile, provide a detailed investment strategy:

- Age: {}
- Monthly Income: ₹{}
- Current Savings: ₹{}
- Risk Tolerance: {}
- Goals: {}
- Timeline: {}

Respond with STRICT JSON only. Do not wrap it in markdown or code fences (no ```json). Use exactly this structure:
{{
  "suggestedSIP": number (monthly amount in rupees),
  "assetAllocation": {{
    "equity": number (percentage),
    "debt": number (percentage),
    "hybrid": number (percentage),
    "gold": number (percentage)
  }},
  "strategy": "string (detailed explanation of the strategy)",
  "recommendedFunds": ["string (fund category examples, e.g., 'Large Cap Index Fund')"],
  "riskAnalysis": "string (assessment of their risk profile vs goals)",
  "actionPlan": ["string (step 1)", "string (step 2)", "string (step 3)"]
}}
The four assetAllocation percentages must add up to 100."#,
        profile.age,
        profile.monthly_income,
        profile.current_savings,
        profile.risk_tolerance,
        profile.goals.join(", "),
        profile.timeline,
    )
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: i32,
    max_output_tokens: i32,
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

impl GeminiResponse {
    fn first_text(&self) -> Result<String> {
        let candidate = self.candidates.first().ok_or_else(|| {
            AdvisorError::ExternalService("No candidates in Gemini response".to_string())
        })?;

        let text: String = candidate
            .content
            .as_ref()
            .map(|content| content.parts.iter().map(|p| p.text.as_str()).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(AdvisorError::ExternalService(format!(
                "Empty response from Gemini (finish reason: {})",
                candidate.finish_reason.as_deref().unwrap_or("unknown")
            )));
        }

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Number};

    fn sample_profile() -> FinancialProfile {
        FinancialProfile {
            age: 30,
            monthly_income: Number::from(50000),
            current_savings: Number::from(100000),
            risk_tolerance: "Aggressive".to_string(),
            goals: vec!["Retirement".to_string(), "Travel".to_string()],
            timeline: "15 years".to_string(),
        }
    }

    #[test]
    fn test_prompt_embeds_profile_and_schema() {
        let prompt = build_prompt(&sample_profile());
        assert!(prompt.contains("Age: 30"));
        assert!(prompt.contains("Monthly Income: ₹50000"));
        assert!(prompt.contains("Current Savings: ₹100000"));
        assert!(prompt.contains("Risk Tolerance: Aggressive"));
        assert!(prompt.contains("Goals: Retirement, Travel"));
        assert!(prompt.contains("Timeline: 15 years"));
        for field in [
            "suggestedSIP",
            "assetAllocation",
            "strategy",
            "recommendedFunds",
            "riskAnalysis",
            "actionPlan",
        ] {
            assert!(prompt.contains(field), "schema missing {}", field);
        }
    }

    #[test]
    fn test_request_serialization() {
        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: "profile".to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.3,
                top_p: 0.9,
                top_k: 40,
                max_output_tokens: 2048,
                response_mime_type: "application/json",
            },
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["contents"][0]["parts"][0]["text"], json!("profile"));
        assert_eq!(value["generationConfig"]["maxOutputTokens"], json!(2048));
        assert_eq!(
            value["generationConfig"]["responseMimeType"],
            json!("application/json")
        );
    }

    #[test]
    fn test_response_text_joins_parts() {
        let response: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {"parts": [{"text": "{\"a\":"}, {"text": "1}"}], "role": "model"},
                "finishReason": "STOP"
            }],
            "usageMetadata": {"promptTokenCount": 10}
        }))
        .unwrap();

        assert_eq!(response.first_text().unwrap(), "{\"a\":1}");
    }

    #[test]
    fn test_empty_response_is_external_error() {
        let no_candidates: GeminiResponse = serde_json::from_value(json!({})).unwrap();
        assert!(matches!(
            no_candidates.first_text(),
            Err(AdvisorError::ExternalService(_))
        ));

        let blocked: GeminiResponse = serde_json::from_value(json!({
            "candidates": [{"finishReason": "SAFETY"}]
        }))
        .unwrap();
        let err = blocked.first_text().unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[tokio::test]
    async fn test_missing_api_key_fails_without_network() {
        let client = GeminiClient::new(None, "gemini-2.0-flash", Duration::from_secs(1));
        assert!(!client.has_credentials());

        let result = client.advise(&sample_profile()).await;
        let error_msg = result.unwrap_err().to_string();
        assert!(error_msg.contains("GEMINI_API_KEY"));
    }

    #[tokio::test]
    async fn test_blank_api_key_counts_as_missing() {
        let client = GeminiClient::new(Some("   ".to_string()), "gemini-2.0-flash", Duration::from_secs(1));
        assert!(!client.has_credentials());
        assert!(matches!(
            client.generate("hello").await,
            Err(AdvisorError::ExternalService(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_external_error() {
        let client = GeminiClient::new(
            Some("test-key".to_string()),
            "gemini-2.0-flash",
            Duration::from_secs(2),
        )
        .with_base_url("http://127.0.0.1:9/");

        assert!(matches!(
            client.generate("hello").await,
            Err(AdvisorError::ExternalService(_))
        ));
    }
}
