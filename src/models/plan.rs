use serde::{Deserialize, Serialize};

use crate::config::StripeSettings;

/// The plans the studio sells. Each tier maps to a Stripe price configured
/// per environment; the price id is what gets persisted on the subscription
/// row once checkout completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Starter,
    Studio,
    Agency,
}

impl PlanTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlanTier::Starter => "starter",
            PlanTier::Studio => "studio",
            PlanTier::Agency => "agency",
        }
    }

    /// Parse a plan identifier from registration input. Anything outside the
    /// catalog is rejected by the caller with a client error.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "starter" => Some(PlanTier::Starter),
            "studio" => Some(PlanTier::Studio),
            "agency" => Some(PlanTier::Agency),
            _ => None,
        }
    }

    pub fn price_id<'a>(&self, stripe: &'a StripeSettings) -> &'a str {
        match self {
            PlanTier::Starter => &stripe.price_starter,
            PlanTier::Studio => &stripe.price_studio,
            PlanTier::Agency => &stripe.price_agency,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_catalog_tiers_case_insensitively() {
        assert_eq!(PlanTier::parse("starter"), Some(PlanTier::Starter));
        assert_eq!(PlanTier::parse("  Studio "), Some(PlanTier::Studio));
        assert_eq!(PlanTier::parse("AGENCY"), Some(PlanTier::Agency));
    }

    #[test]
    fn parse_rejects_unknown_plan_identifiers() {
        assert_eq!(PlanTier::parse("enterprise"), None);
        assert_eq!(PlanTier::parse(""), None);
        assert_eq!(PlanTier::parse("price_starter"), None);
    }
}
