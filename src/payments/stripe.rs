use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::{AppError, Result, msg};
use crate::tenant::Tenant;

type HmacSha256 = Hmac<Sha256>;

// Checkout uses pre-configured Stripe prices (price_xxx), one per tenant.
// Ad-hoc price_data would scatter one-time charges across the dashboard.

#[derive(Debug, Deserialize)]
struct CreateCheckoutSessionResponse {
    id: String,
    url: String,
}

#[derive(Debug, Deserialize)]
struct StripeCustomer {
    id: String,
}

#[derive(Debug, Deserialize)]
struct StripeCustomerList {
    data: Vec<StripeCustomer>,
}

#[derive(Debug, Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: String,
    webhook_secret: String,
}

impl StripeClient {
    pub fn new(secret_key: String, webhook_secret: String) -> Self {
        Self {
            client: Client::new(),
            secret_key,
            webhook_secret,
        }
    }

    /// Looks up an existing customer by email. Stripe allows duplicate
    /// emails, so this takes the first match like the dashboard does.
    pub async fn find_customer_by_email(&self, email: &str) -> Result<Option<String>> {
        let response = self
            .client
            .get("https://api.stripe.com/v1/customers")
            .basic_auth(&self.secret_key, None::<&str>)
            .query(&[("email", email), ("limit", "1")])
            .send()
            .await
            .map_err(|e| AppError::Payment(format!("Stripe API error: {e}")))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Payment(format!("Stripe API error: {error_text}")));
        }

        let list: StripeCustomerList = response
            .json()
            .await
            .map_err(|e| AppError::Payment(format!("Failed to parse Stripe response: {e}")))?;

        Ok(list.data.into_iter().next().map(|c| c.id))
    }

    pub async fn create_customer(&self, email: &str, tenant_id: &str) -> Result<String> {
        let response = self
            .client
            .post("https://api.stripe.com/v1/customers")
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&[("email", email), ("metadata[project]", tenant_id)])
            .send()
            .await
            .map_err(|e| AppError::Payment(format!("Stripe API error: {e}")))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Payment(format!("Stripe API error: {error_text}")));
        }

        let customer: StripeCustomer = response
            .json()
            .await
            .map_err(|e| AppError::Payment(format!("Failed to parse Stripe response: {e}")))?;

        Ok(customer.id)
    }

    /// Creates a one-time-payment checkout session for the tenant's price.
    /// Returns `(session_id, checkout_url)`.
    pub async fn create_checkout_session(
        &self,
        tenant: &Tenant,
        customer_id: &str,
        email: &str,
    ) -> Result<(String, String)> {
        let success_url = format!("{}?session_id={{CHECKOUT_SESSION_ID}}", tenant.success_url);

        let response = self
            .client
            .post("https://api.stripe.com/v1/checkout/sessions")
            .basic_auth(&self.secret_key, None::<&str>)
            .form(&[
                ("mode", "payment"),
                ("customer", customer_id),
                ("payment_method_types[0]", "card"),
                ("line_items[0][price]", tenant.stripe_price_id.as_str()),
                ("line_items[0][quantity]", "1"),
                ("success_url", success_url.as_str()),
                ("cancel_url", tenant.cancel_url.as_str()),
                ("metadata[project]", tenant.id.as_str()),
                ("metadata[user_email]", email),
                ("billing_address_collection", "auto"),
                ("automatic_tax[enabled]", "true"),
            ])
            .send()
            .await
            .map_err(|e| AppError::Payment(format!("Stripe API error: {e}")))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(AppError::Payment(format!("Stripe API error: {error_text}")));
        }

        let session: CreateCheckoutSessionResponse = response
            .json()
            .await
            .map_err(|e| AppError::Payment(format!("Failed to parse Stripe response: {e}")))?;

        Ok((session.id, session.url))
    }

    /// Maximum age of a webhook timestamp before it's rejected (in seconds).
    /// Stripe recommends 300 seconds (5 minutes).
    const WEBHOOK_TIMESTAMP_TOLERANCE_SECS: i64 = 300;

    pub fn verify_webhook_signature(&self, payload: &[u8], signature: &str) -> Result<bool> {
        // Stripe signature format: t=timestamp,v1=signature
        let parts: Vec<&str> = signature.split(',').collect();

        let mut timestamp = None;
        let mut sig_v1 = None;

        for part in parts {
            if let Some(t) = part.strip_prefix("t=") {
                timestamp = Some(t);
            } else if let Some(s) = part.strip_prefix("v1=") {
                sig_v1 = Some(s);
            }
        }

        let timestamp_str =
            timestamp.ok_or_else(|| AppError::Validation(msg::INVALID_SIGNATURE_FORMAT.into()))?;
        let sig_v1 =
            sig_v1.ok_or_else(|| AppError::Validation(msg::INVALID_SIGNATURE_FORMAT.into()))?;

        let timestamp: i64 = timestamp_str
            .parse()
            .map_err(|_| AppError::Validation(msg::INVALID_TIMESTAMP_IN_SIGNATURE.into()))?;

        let now = chrono::Utc::now().timestamp();
        let age = now - timestamp;

        if age > Self::WEBHOOK_TIMESTAMP_TOLERANCE_SECS {
            tracing::warn!(
                "Stripe webhook rejected: timestamp too old (age={}s, max={}s)",
                age,
                Self::WEBHOOK_TIMESTAMP_TOLERANCE_SECS
            );
            return Ok(false);
        }

        // Up to 60s of clock skew is tolerated in the other direction.
        if age < -60 {
            tracing::warn!(
                "Stripe webhook rejected: timestamp in the future (age={}s)",
                age
            );
            return Ok(false);
        }

        // Stripe signs `{timestamp}.{raw body}`.
        let signed_payload = format!("{}.{}", timestamp_str, String::from_utf8_lossy(payload));

        let mut mac = HmacSha256::new_from_slice(self.webhook_secret.as_bytes())
            .map_err(|_| AppError::Internal(msg::INVALID_WEBHOOK_SECRET.into()))?;
        mac.update(signed_payload.as_bytes());
        let expected = hex::encode(mac.finalize().into_bytes());

        let expected_bytes = expected.as_bytes();
        let provided_bytes = sig_v1.as_bytes();

        if expected_bytes.len() != provided_bytes.len() {
            return Ok(false);
        }

        // Constant-time comparison of the hex digests.
        Ok(expected_bytes.ct_eq(provided_bytes).into())
    }
}

/// Generic Stripe webhook event - object is parsed based on event_type
#[derive(Debug, Deserialize)]
pub struct StripeWebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

/// Session object carried by `checkout.session.completed` events.
#[derive(Debug, Deserialize)]
pub struct StripeCheckoutSession {
    pub id: String,
    pub payment_status: String,
    pub customer: Option<String>,
    pub payment_intent: Option<String>,
    pub amount_total: Option<i64>,
    pub currency: Option<String>,
    #[serde(default)]
    pub metadata: StripeMetadata,
    pub customer_details: Option<StripeCustomerDetails>,
}

#[derive(Debug, Default, Deserialize)]
pub struct StripeMetadata {
    pub project: Option<String>,
    pub user_email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StripeCustomerDetails {
    pub email: Option<String>,
}

impl StripeCheckoutSession {
    /// Payment reference used for idempotency; sessions without a payment
    /// intent fall back to their own id.
    pub fn payment_reference(&self) -> &str {
        self.payment_intent.as_deref().unwrap_or(&self.id)
    }

    /// Buyer email from metadata, falling back to Stripe's customer details.
    pub fn buyer_email(&self) -> Option<&str> {
        self.metadata
            .user_email
            .as_deref()
            .or_else(|| self.customer_details.as_ref()?.email.as_deref())
    }
}
