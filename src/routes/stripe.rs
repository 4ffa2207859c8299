use axum::Json;
use axum::{extract::State, http::HeaderMap, response::IntoResponse};
use axum::{http::StatusCode, response::Response};
use time::{Duration, OffsetDateTime};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::models::billing_event::{
    BillingEvent, CheckoutSessionObject, InvoiceObject, SubscriptionObject,
};
use crate::models::subscription::{
    NewSubscription, SubscriptionPatch, SUBSCRIPTION_STATUS_ACTIVE, SUBSCRIPTION_STATUS_CANCELED,
    SUBSCRIPTION_STATUS_PAST_DUE,
};
use crate::responses::JsonResponse;
use crate::routes::registration::EMPRESA_METADATA_KEY;
use crate::services::stripe::StripeServiceError;
use crate::state::AppState;

/// Window granted at checkout completion until the first invoice carries the
/// authoritative period end.
const PROVISIONAL_PERIOD_DAYS: i64 = 30;

#[derive(Debug, thiserror::Error)]
enum ReconcileError {
    #[error("stripe call failed: {0}")]
    Upstream(#[from] StripeServiceError),
    #[error("subscription write failed: {0}")]
    Persistence(#[from] sqlx::Error),
}

/// Result of reconciling one verified event. Skipped events are acknowledged
/// so Stripe stops redelivering them.
enum Outcome {
    Applied,
    Skipped(&'static str),
}

// POST /api/webhooks/payment
pub async fn webhook(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Response {
    let sig = match headers
        .get("Stripe-Signature")
        .and_then(|h| h.to_str().ok())
    {
        Some(s) => s,
        None => return JsonResponse::bad_request("Missing Stripe-Signature").into_response(),
    };

    let evt = match app_state.stripe.verify_webhook(&body, sig) {
        Ok(e) => e,
        Err(err) => {
            warn!(?err, "stripe webhook verification failed");
            return (StatusCode::BAD_REQUEST, "invalid webhook").into_response();
        }
    };

    let event = match BillingEvent::from_event(&evt) {
        Ok(event) => event,
        Err(err) => {
            // Verified but malformed; retrying will not fix it.
            warn!(?err, event_id = %evt.id, event_type = %evt.r#type,
                "stripe event payload did not match its type; acknowledging");
            return Json(serde_json::json!({ "received": true })).into_response();
        }
    };

    match reconcile(&app_state, event).await {
        Ok(Outcome::Applied) => {
            Json(serde_json::json!({ "received": true })).into_response()
        }
        Ok(Outcome::Skipped(reason)) => {
            info!(reason, event_id = %evt.id, "stripe event acknowledged without changes");
            Json(serde_json::json!({ "received": true })).into_response()
        }
        Err(err) => {
            // Surface a failure so Stripe's retry-with-backoff redelivers.
            error!(?err, event_id = %evt.id, event_type = %evt.r#type, "failed to reconcile stripe event");
            JsonResponse::server_error("Event processing failed").into_response()
        }
    }
}

async fn reconcile(state: &AppState, event: BillingEvent) -> Result<Outcome, ReconcileError> {
    match event {
        BillingEvent::CheckoutCompleted(session) => apply_checkout_completed(state, session).await,
        BillingEvent::InvoicePaymentSucceeded(invoice) => apply_invoice_paid(state, invoice).await,
        BillingEvent::InvoicePaymentFailed(invoice) => apply_invoice_failed(state, invoice).await,
        BillingEvent::SubscriptionUpdated(sub) => apply_subscription_updated(state, sub).await,
        BillingEvent::SubscriptionDeleted(sub) => apply_subscription_deleted(state, sub).await,
        BillingEvent::Unrecognized { event_type } => {
            info!(event_type, "unhandled stripe event acknowledged");
            Ok(Outcome::Skipped("unrecognized event type"))
        }
    }
}

/// First lifecycle event for a subscription: resolve the empresa from the
/// customer's metadata and upsert the row keyed by subscription id.
async fn apply_checkout_completed(
    state: &AppState,
    session: CheckoutSessionObject,
) -> Result<Outcome, ReconcileError> {
    let Some(customer_id) = session.customer else {
        warn!(session_id = %session.id, "checkout session completed without a customer");
        return Ok(Outcome::Skipped("checkout session without customer"));
    };
    let Some(subscription_id) = session.subscription else {
        warn!(session_id = %session.id, "checkout session completed without a subscription");
        return Ok(Outcome::Skipped("checkout session without subscription"));
    };

    let customer = match state.stripe.get_customer(&customer_id).await {
        Ok(customer) => customer,
        Err(StripeServiceError::NotFound(_)) => {
            warn!(customer_id, "checkout customer not found upstream; dropping event");
            return Ok(Outcome::Skipped("customer not found"));
        }
        Err(err) => return Err(err.into()),
    };

    // Legacy or hand-created customers may lack the linkage, and metadata is
    // free-form; both cases are dropped rather than retried forever.
    let empresa_id = match customer.metadata.get(EMPRESA_METADATA_KEY) {
        Some(raw) => match Uuid::parse_str(raw) {
            Ok(id) => id,
            Err(_) => {
                warn!(customer_id, raw, "customer metadata carries a malformed empresa id");
                return Ok(Outcome::Skipped("malformed empresa metadata"));
            }
        },
        None => {
            warn!(customer_id, "customer metadata has no empresa id");
            return Ok(Outcome::Skipped("customer without empresa metadata"));
        }
    };

    let plan = state
        .stripe
        .list_checkout_line_items(&session.id)
        .await?
        .into_iter()
        .next();
    let Some(plan) = plan else {
        warn!(session_id = %session.id, "checkout session has no line items");
        return Ok(Outcome::Skipped("checkout session without line items"));
    };

    let record = NewSubscription {
        empresa_id,
        stripe_customer_id: customer_id,
        stripe_subscription_id: subscription_id.clone(),
        plan,
        current_period_end: OffsetDateTime::now_utc() + Duration::days(PROVISIONAL_PERIOD_DAYS),
        status: SUBSCRIPTION_STATUS_ACTIVE.to_string(),
    };
    state
        .subscription_repo
        .upsert_by_stripe_subscription_id(&record)
        .await?;

    info!(%empresa_id, subscription_id, "subscription activated from checkout");
    Ok(Outcome::Applied)
}

/// Invoices do not carry full subscription state, so the period end comes
/// from a fetch of the authoritative subscription record.
async fn apply_invoice_paid(
    state: &AppState,
    invoice: InvoiceObject,
) -> Result<Outcome, ReconcileError> {
    let Some(subscription_id) = invoice.subscription else {
        return Ok(Outcome::Skipped("invoice without subscription"));
    };

    if state
        .subscription_repo
        .find_by_stripe_subscription_id(&subscription_id)
        .await?
        .is_none()
    {
        warn!(subscription_id, "invoice paid for an unknown subscription");
        return Ok(Outcome::Skipped("no matching subscription row"));
    }

    let sub = state.stripe.get_subscription(&subscription_id).await?;
    let patch = SubscriptionPatch {
        plan: None,
        status: Some(SUBSCRIPTION_STATUS_ACTIVE.to_string()),
        current_period_end: OffsetDateTime::from_unix_timestamp(sub.current_period_end).ok(),
    };

    match state
        .subscription_repo
        .update_by_stripe_subscription_id(&subscription_id, patch)
        .await?
    {
        Some(_) => {
            info!(subscription_id, "subscription renewed");
            Ok(Outcome::Applied)
        }
        None => Ok(Outcome::Skipped("no matching subscription row")),
    }
}

async fn apply_invoice_failed(
    state: &AppState,
    invoice: InvoiceObject,
) -> Result<Outcome, ReconcileError> {
    let Some(subscription_id) = invoice.subscription else {
        return Ok(Outcome::Skipped("invoice without subscription"));
    };

    // Plan and period end stay as they are; the provider decides later
    // whether the subscription recovers or cancels.
    match state
        .subscription_repo
        .update_by_stripe_subscription_id(
            &subscription_id,
            SubscriptionPatch::status(SUBSCRIPTION_STATUS_PAST_DUE),
        )
        .await?
    {
        Some(_) => {
            warn!(subscription_id, "invoice payment failed; subscription marked past_due");
            Ok(Outcome::Applied)
        }
        None => {
            warn!(subscription_id, "invoice payment failed for an unknown subscription");
            Ok(Outcome::Skipped("no matching subscription row"))
        }
    }
}

async fn apply_subscription_updated(
    state: &AppState,
    sub: SubscriptionObject,
) -> Result<Outcome, ReconcileError> {
    let patch = SubscriptionPatch {
        plan: sub.price_id().map(|s| s.to_string()),
        status: sub.status.clone(),
        current_period_end: sub
            .current_period_end
            .and_then(|ts| OffsetDateTime::from_unix_timestamp(ts).ok()),
    };

    match state
        .subscription_repo
        .update_by_stripe_subscription_id(&sub.id, patch)
        .await?
    {
        Some(updated) => {
            info!(subscription_id = %sub.id, status = %updated.status, "subscription updated");
            Ok(Outcome::Applied)
        }
        None => {
            warn!(subscription_id = %sub.id, "update received for an unknown subscription");
            Ok(Outcome::Skipped("no matching subscription row"))
        }
    }
}

async fn apply_subscription_deleted(
    state: &AppState,
    sub: SubscriptionObject,
) -> Result<Outcome, ReconcileError> {
    let patch = SubscriptionPatch {
        plan: None,
        status: Some(SUBSCRIPTION_STATUS_CANCELED.to_string()),
        current_period_end: sub
            .current_period_end
            .and_then(|ts| OffsetDateTime::from_unix_timestamp(ts).ok()),
    };

    match state
        .subscription_repo
        .update_by_stripe_subscription_id(&sub.id, patch)
        .await?
    {
        Some(_) => {
            info!(subscription_id = %sub.id, "subscription canceled");
            Ok(Outcome::Applied)
        }
        None => {
            warn!(subscription_id = %sub.id, "cancellation received for an unknown subscription");
            Ok(Outcome::Skipped("no matching subscription row"))
        }
    }
}
