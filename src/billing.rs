//! Subscription plans and the upgrade flow.
//!
//! Upgrading only opens a hosted checkout session; the payment processor
//! owns the rest. The local subscription record is not touched here.

use crate::clients::backend::{BackendClient, CheckoutSession};
use crate::config::ClientConfig;
use crate::error::ShortsError;
use crate::model::Plan;
use crate::session::SessionStore;
use serde::Serialize;
use tracing::info;

/// One entry of the plan catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanInfo {
    pub plan: Plan,
    pub name: &'static str,
    /// Monthly price in whole US dollars.
    pub price_usd: u32,
    pub features: &'static [&'static str],
}

static CATALOG: [PlanInfo; 3] = [
    PlanInfo {
        plan: Plan::Free,
        name: "Free",
        price_usd: 0,
        features: &["5 videos per month", "Basic quality", "Community support"],
    },
    PlanInfo {
        plan: Plan::Pro,
        name: "Pro",
        price_usd: 29,
        features: &[
            "Unlimited videos",
            "HD quality",
            "Priority support",
            "Custom branding",
            "API access",
        ],
    },
    PlanInfo {
        plan: Plan::Enterprise,
        name: "Enterprise",
        price_usd: 99,
        features: &[
            "Everything in Pro",
            "4K quality",
            "Dedicated support",
            "Custom integrations",
            "Team collaboration",
        ],
    },
];

/// The plan catalog, cheapest first.
pub fn plans() -> &'static [PlanInfo] {
    &CATALOG
}

pub fn plan_info(plan: Plan) -> &'static PlanInfo {
    match plan {
        Plan::Free => &CATALOG[0],
        Plan::Pro => &CATALOG[1],
        Plan::Enterprise => &CATALOG[2],
    }
}

/// Start a checkout for `plan`.
///
/// Returns `Ok(None)` when there is nothing to buy: the free plan, or the
/// plan the user already has.
pub async fn upgrade(
    backend: &BackendClient,
    config: &ClientConfig,
    session: &SessionStore,
    plan: Plan,
) -> Result<Option<CheckoutSession>, ShortsError> {
    let user = session.user().ok_or(ShortsError::NotAuthenticated)?;
    if plan == user.subscription.plan {
        info!("Already on the {} plan", plan);
        return Ok(None);
    }
    let Some(price_id) = config.price_ids.for_plan(plan) else {
        info!("{} plan needs no checkout", plan);
        return Ok(None);
    };

    let checkout = backend.create_checkout_session(price_id).await?;
    info!("Checkout session {} opened for {}", checkout.id, plan);
    Ok(Some(checkout))
}
