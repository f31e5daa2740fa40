//! One-shot advisor run from the command line.
//!
//! Usage: advisor ['{"age":30,"income":50000,...}']
//! Without an argument a sample profile is used. Uses GEMINI_API_KEY when set,
//! otherwise the rule engine.

use sip_advisor::{
    agent::RecommendationOrchestrator,
    config::AppConfig,
    gemini::GeminiClient,
    state::{InMemorySessionStore, SessionStore},
    validation::validate_profile,
};
use std::sync::Arc;
use tracing::info;

const SAMPLE_PROFILE: &str = r#"{
    "age": 30,
    "income": 50000,
    "savings": 100000,
    "risk": "Aggressive",
    "goals": ["Retirement", "Child Education"],
    "timeline": "15 years"
}"#;

const DEMO_USER_ID: i64 = 1;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let config = AppConfig::from_env()?;

    let raw = std::env::args()
        .nth(1)
        .unwrap_or_else(|| SAMPLE_PROFILE.to_string());
    let payload: serde_json::Value = serde_json::from_str(&raw)?;
    let profile = validate_profile(&payload)?;

    info!(
        age = profile.age,
        risk = %profile.risk_tolerance,
        "Running advisor"
    );

    let advisor = Arc::new(GeminiClient::new(
        config.gemini_api_key,
        config.gemini_model,
        config.advisor_timeout,
    ));
    let sessions = Arc::new(InMemorySessionStore::new());
    let orchestrator =
        RecommendationOrchestrator::new(advisor, sessions.clone(), config.advisor_timeout);

    let recommendation = orchestrator.analyze(DEMO_USER_ID, &profile).await;

    println!("\n=== RECOMMENDATION ===");
    println!("{}", serde_json::to_string_pretty(&recommendation)?);

    let history = sessions.list_by_user(DEMO_USER_ID).await?;
    println!("\nSessions recorded: {}", history.len());

    Ok(())
}
