//! Webhook reconciliation: verified Stripe events become entitlements.
//!
//! The pipeline is Received -> Verified -> Parsed -> Entitled -> Notified.
//! Unprocessable events (unknown tenant, missing metadata) are acknowledged
//! so Stripe stops redelivering them; only store failures during the grant
//! surface as 5xx, where redelivery is safe under idempotency.

use crate::access::{AccessController, EntitlementOutcome};
use crate::email::build_access_email;
use crate::error::{AppError, Result, msg};
use crate::payments::{StripeCheckoutSession, StripeWebhookEvent};
use crate::store::AppState;

pub struct PaymentReconciler<'a> {
    state: &'a AppState,
}

impl<'a> PaymentReconciler<'a> {
    pub fn new(state: &'a AppState) -> Self {
        Self { state }
    }

    /// Runs the pipeline for one delivery. `Ok(())` means the event may be
    /// acknowledged with 200.
    pub async fn process(&self, payload: &[u8], signature: &str) -> Result<()> {
        if !self
            .state
            .stripe
            .verify_webhook_signature(payload, signature)?
        {
            return Err(AppError::Validation(msg::INVALID_WEBHOOK_SIGNATURE.into()));
        }

        let event: StripeWebhookEvent = serde_json::from_slice(payload)
            .map_err(|e| AppError::Validation(format!("Malformed webhook payload: {e}")))?;

        if event.event_type != "checkout.session.completed" {
            tracing::debug!(event_type = %event.event_type, "ignoring webhook event");
            return Ok(());
        }

        let session: StripeCheckoutSession = serde_json::from_value(event.data.object)
            .map_err(|e| AppError::Validation(format!("Malformed checkout session: {e}")))?;

        self.handle_checkout_completed(session).await
    }

    async fn handle_checkout_completed(&self, session: StripeCheckoutSession) -> Result<()> {
        if session.payment_status != "paid" {
            tracing::info!(
                session_id = %session.id,
                payment_status = %session.payment_status,
                "checkout session not paid, skipping"
            );
            return Ok(());
        }

        // Tenant and buyer come only from the session metadata; guessing a
        // tenant would write into the wrong database.
        let Some(project) = session.metadata.project.as_deref() else {
            tracing::error!(
                session_id = %session.id,
                "checkout session missing project metadata"
            );
            return Ok(());
        };
        let Some(email) = session.buyer_email() else {
            tracing::error!(
                session_id = %session.id,
                project = %project,
                "checkout session missing buyer email"
            );
            return Ok(());
        };
        let Ok(store) = self.state.store(project) else {
            tracing::error!(
                session_id = %session.id,
                project = %project,
                "unknown tenant in checkout metadata"
            );
            return Ok(());
        };

        tracing::info!(
            session_id = %session.id,
            tenant = %project,
            email = %email,
            amount_total = ?session.amount_total,
            currency = ?session.currency,
            "processing completed checkout"
        );

        let customer_id = session.customer.as_deref().unwrap_or_default();
        let payment_id = session.payment_reference();

        let controller = AccessController::new(store);
        let outcome = controller
            .grant_entitlement(email, customer_id, payment_id)
            .await?;

        match outcome {
            EntitlementOutcome::Granted { user, token } => {
                tracing::info!(
                    tenant = %store.tenant().id,
                    user_id = user.as_ref().map(|u| u.id),
                    token_prefix = token.get(..8).unwrap_or_default(),
                    "entitlement granted"
                );
                let mail = build_access_email(store.tenant(), &token);
                if let Err(error) = self
                    .state
                    .notifier
                    .send(email, &mail.subject, &mail.text, &mail.html)
                    .await
                {
                    tracing::error!(
                        tenant = %store.tenant().id,
                        %error,
                        "access email failed, entitlement unaffected"
                    );
                }
            }
            EntitlementOutcome::AlreadyProcessed => {}
        }

        Ok(())
    }
}
