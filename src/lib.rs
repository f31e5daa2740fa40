//! SIP Advisor
//!
//! Personal-finance backend that turns a short financial profile into a
//! structured investment recommendation:
//! - Asks a generative model (Gemini) for a recommendation and validates its output
//! - Falls back to a deterministic rule table whenever the model path fails
//! - Persists every recommendation as an advisor session, queryable per user
//! - Stores saved SIP calculator results per user
//!
//! FLOW:
//! PROFILE → VALIDATE → EXTERNAL | FALLBACK → PERSIST → RESPOND

pub mod agent;
pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod fallback;
pub mod gemini;
pub mod models;
pub mod normalizer;
pub mod state;
pub mod validation;

pub use error::Result;

// Re-export common types
pub use agent::RecommendationOrchestrator;
pub use models::*;
