//! Deterministic recommendation engine
//!
//! Rule-table recommendation used whenever the generative path cannot deliver.
//! Pure: no I/O, no clock, no randomness. The same profile always yields the
//! same bytes once serialized.

use crate::models::{AssetAllocation, FinancialProfile, Recommendation, RiskTier};

/// Share of monthly income suggested as the SIP amount.
const SIP_INCOME_SHARE: f64 = 0.20;

/// SIP amounts are rounded to the nearest multiple of this.
const SIP_ROUNDING_UNIT: f64 = 500.0;

const GOLD_FUND: &str = "Sovereign Gold Bond";

/// Allocation table row for a tier. Every row sums to 100.
pub const fn allocation_for(tier: RiskTier) -> AssetAllocation {
    match tier {
        RiskTier::Aggressive => AssetAllocation::new(70.0, 20.0, 0.0, 10.0),
        RiskTier::Conservative => AssetAllocation::new(30.0, 50.0, 10.0, 10.0),
        RiskTier::Moderate => AssetAllocation::new(50.0, 30.0, 10.0, 10.0),
    }
}

/// Largest number of 500-units whose product still fits in a u64.
const MAX_SIP_UNITS: u64 = u64::MAX / SIP_ROUNDING_UNIT as u64;

/// 20% of monthly income, rounded to the nearest 500. Never negative, and
/// saturates at the largest multiple of 500 a u64 holds.
pub fn suggested_sip(monthly_income: f64) -> u64 {
    let units = (monthly_income * SIP_INCOME_SHARE / SIP_ROUNDING_UNIT).round();
    if units.is_nan() || units <= 0.0 {
        return 0;
    }
    // MAX_SIP_UNITS as f64 rounds up, so clamp again after the cast.
    let units = units.min(MAX_SIP_UNITS as f64) as u64;
    units.min(MAX_SIP_UNITS) * SIP_ROUNDING_UNIT as u64
}

/// Build the rule-based recommendation for a validated profile.
pub fn recommend(profile: &FinancialProfile) -> Recommendation {
    let tier = profile.risk_tier();
    let sip = suggested_sip(profile.income());
    let aggressive = tier == RiskTier::Aggressive;

    let approach = if aggressive { "growth-oriented" } else { "balanced" };
    let focus = if aggressive {
        "equity mutual funds"
    } else {
        "debt and hybrid instruments"
    };
    let posture = if aggressive {
        "willing to accept short-term market fluctuations for higher long-term gains"
    } else {
        "prioritizing capital protection over aggressive growth"
    };

    let strategy = format!(
        "Based on your profile as a {}-year-old investor with a {} risk appetite, we recommend a {} approach. \
         Your goal of {} requires disciplined investing over {}. We suggest a monthly SIP of ₹{} and allocating \
         a significant portion to {} to optimize returns while managing volatility.",
        profile.age,
        profile.risk_tolerance,
        approach,
        profile.goals_phrase(),
        profile.timeline,
        sip,
        focus,
    );

    let risk_analysis = format!(
        "Your {} risk profile suggests you are {}. This aligns well with your {} timeline.",
        profile.risk_tolerance, posture, profile.timeline,
    );

    let recommended_funds = if aggressive {
        vec!["Bluechip Equity Fund", "Mid Cap Fund", GOLD_FUND]
    } else {
        vec!["Balanced Advantage Fund", "Short Term Debt Fund", GOLD_FUND]
    };

    Recommendation {
        suggested_sip: sip,
        asset_allocation: allocation_for(tier),
        strategy,
        recommended_funds: recommended_funds.into_iter().map(str::to_string).collect(),
        risk_analysis,
        action_plan: vec![
            format!("Start a monthly SIP of ₹{} immediately.", sip),
            "Build an emergency fund equivalent to 6 months of expenses before increasing investments."
                .to_string(),
            "Review and rebalance your portfolio every year.".to_string(),
        ],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Number;

    fn profile(income: f64, risk: &str) -> FinancialProfile {
        FinancialProfile {
            age: 30,
            monthly_income: Number::from_f64(income).unwrap(),
            current_savings: Number::from(100000),
            risk_tolerance: risk.to_string(),
            goals: vec!["Retirement".to_string()],
            timeline: "15 years".to_string(),
        }
    }

    #[test]
    fn test_aggressive_profile() {
        let recommendation = recommend(&profile(50000.0, "Aggressive"));
        assert_eq!(recommendation.suggested_sip, 10000);
        assert_eq!(
            recommendation.asset_allocation,
            AssetAllocation::new(70.0, 20.0, 0.0, 10.0)
        );
        assert_eq!(
            recommendation.recommended_funds,
            vec!["Bluechip Equity Fund", "Mid Cap Fund", "Sovereign Gold Bond"]
        );
    }

    #[test]
    fn test_conservative_profile() {
        let recommendation = recommend(&profile(50000.0, "Conservative"));
        assert_eq!(
            recommendation.asset_allocation,
            AssetAllocation::new(30.0, 50.0, 10.0, 10.0)
        );
        assert_eq!(
            recommendation.recommended_funds,
            vec!["Balanced Advantage Fund", "Short Term Debt Fund", "Sovereign Gold Bond"]
        );
    }

    #[test]
    fn test_unrecognized_tier_uses_moderate_row() {
        let recommendation = recommend(&profile(50000.0, "Balanced"));
        assert_eq!(
            recommendation.asset_allocation,
            AssetAllocation::new(50.0, 30.0, 10.0, 10.0)
        );
    }

    #[test]
    fn test_every_row_sums_to_100() {
        for tier in [RiskTier::Aggressive, RiskTier::Conservative, RiskTier::Moderate] {
            assert_eq!(allocation_for(tier).total(), 100.0, "{}", tier);
        }
        for risk in ["Aggressive", "Conservative", "Moderate", "Balanced", "", "aggressive"] {
            assert_eq!(recommend(&profile(42000.0, risk)).asset_allocation.total(), 100.0);
        }
    }

    #[test]
    fn test_sip_is_non_negative_multiple_of_500() {
        let incomes = [
            0.0,
            1.0,
            1249.0,
            1250.0,
            3333.33,
            50000.0,
            87654.0,
            1e9,
            1e20,
            1e25,
            f64::MAX,
            f64::INFINITY,
            -25000.0,
        ];
        for income in incomes {
            let sip = suggested_sip(income);
            assert_eq!(sip % 500, 0, "income {}", income);
        }
        assert_eq!(suggested_sip(1249.0), 0);
        assert_eq!(suggested_sip(1250.0), 500);
        assert_eq!(suggested_sip(87654.0), 17500);
        assert_eq!(suggested_sip(-25000.0), 0);
        assert_eq!(suggested_sip(1e25), MAX_SIP_UNITS * 500);
        assert_eq!(suggested_sip(f64::NAN), 0);
    }

    #[test]
    fn test_deterministic_bytes() {
        let input = profile(73210.0, "Moderate");
        let first = serde_json::to_vec(&recommend(&input)).unwrap();
        let second = serde_json::to_vec(&recommend(&input)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_narrative_carries_profile_facts() {
        let mut input = profile(50000.0, "Aggressive");
        input.goals = vec!["Retirement".to_string(), "Home".to_string()];
        let recommendation = recommend(&input);

        assert!(recommendation.strategy.contains("30-year-old"));
        assert!(recommendation.strategy.contains("Retirement and Home"));
        assert!(recommendation.strategy.contains("growth-oriented"));
        assert!(recommendation.strategy.contains("10000"));
        assert!(recommendation.risk_analysis.contains("15 years"));
        assert!(recommendation.risk_analysis.contains("Aggressive"));
    }

    #[test]
    fn test_action_plan_has_three_steps() {
        let recommendation = recommend(&profile(20000.0, "Conservative"));
        assert_eq!(recommendation.action_plan.len(), 3);
        assert!(recommendation.action_plan[0].contains("₹4000"));
        assert!(recommendation.action_plan[1].contains("6 months"));
        assert!(recommendation.action_plan[2].contains("rebalance"));
    }
}
