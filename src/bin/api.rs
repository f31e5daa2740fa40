use sip_advisor::{
    agent::RecommendationOrchestrator,
    api::{start_server, ApiState},
    auth::TokenVerifier,
    config::AppConfig,
    gemini::GeminiClient,
    state::build_stores,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env()?;

    info!("🚀 SIP Advisor - API Server");
    info!("📍 Port: {}", config.port);

    // Create components
    let advisor = Arc::new(GeminiClient::new(
        config.gemini_api_key.clone(),
        config.gemini_model.clone(),
        config.advisor_timeout,
    ));
    let stores = build_stores(config.database_url.as_deref());
    let orchestrator = Arc::new(RecommendationOrchestrator::new(
        advisor,
        stores.sessions.clone(),
        config.advisor_timeout,
    ));

    let state = ApiState {
        orchestrator,
        stores,
        tokens: Arc::new(TokenVerifier::new(&config.jwt_secret)),
    };

    info!("✅ Advisor initialized");
    info!("📡 Starting API server...");

    start_server(state, config.port).await?;

    Ok(())
}
