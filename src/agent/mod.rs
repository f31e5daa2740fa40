//! Recommendation orchestrator
//!
//! PROFILE → EXTERNAL (advise → normalize) ─ok→ PERSIST → RETURN
//!                    └─────────err──────→ FALLBACK ─┘
//!
//! The only place where failures are absorbed instead of reported: for a
//! validated profile `analyze` always yields a recommendation.

use crate::error::AdvisorError;
use crate::fallback;
use crate::gemini::AdvisoryClient;
use crate::models::{FinancialProfile, Provenance, Recommendation};
use crate::normalizer;
use crate::state::SessionStore;
use crate::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Composes the external advisory path with the rule-engine fallback and
/// records every outcome as an advisor session.
pub struct RecommendationOrchestrator {
    advisor: Arc<dyn AdvisoryClient>,
    sessions: Arc<dyn SessionStore>,
    advisor_timeout: Duration,
}

impl RecommendationOrchestrator {
    pub fn new(
        advisor: Arc<dyn AdvisoryClient>,
        sessions: Arc<dyn SessionStore>,
        advisor_timeout: Duration,
    ) -> Self {
        Self {
            advisor,
            sessions,
            advisor_timeout,
        }
    }

    /// Produce, persist (best effort) and return a recommendation.
    pub async fn analyze(&self, user_id: i64, profile: &FinancialProfile) -> Recommendation {
        let request_id = Uuid::new_v4();
        let start_time = Instant::now();

        info!(
            %request_id,
            user_id,
            risk = %profile.risk_tolerance,
            "Advisor: analyzing profile"
        );

        let (recommendation, provenance) = self.produce(request_id, profile).await;

        // Durability is best effort; the caller gets the recommendation either way.
        match self.sessions.record(user_id, profile, &recommendation).await {
            Ok(session_id) => debug!(%request_id, session_id, "Advisor session saved"),
            Err(e) => warn!(%request_id, user_id, "Failed to save advisor session: {}", e),
        }

        info!(
            %request_id,
            provenance = provenance.as_str(),
            suggested_sip = recommendation.suggested_sip,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Advisor: recommendation ready"
        );

        recommendation
    }

    /// Exactly one of the two paths produces the recommendation.
    pub(crate) async fn produce(
        &self,
        request_id: Uuid,
        profile: &FinancialProfile,
    ) -> (Recommendation, Provenance) {
        match self.try_external(profile).await {
            Ok(recommendation) => (recommendation, Provenance::External),
            Err(e) => {
                warn!(%request_id, "External advisor unavailable, using rule engine: {}", e);
                (fallback::recommend(profile), Provenance::Fallback)
            }
        }
    }

    /// One bounded external call followed by normalization. No retry.
    async fn try_external(&self, profile: &FinancialProfile) -> Result<Recommendation> {
        let raw = tokio::time::timeout(self.advisor_timeout, self.advisor.advise(profile))
            .await
            .map_err(|_| {
                AdvisorError::ExternalService(format!(
                    "No response within {}s",
                    self.advisor_timeout.as_secs_f32()
                ))
            })??;

        normalizer::normalize(&raw)
    }
}
