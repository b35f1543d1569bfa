use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use serde::Serialize;

use crate::error::{AppError, Result, msg};
use crate::extractors::Json;
use crate::reconcile::PaymentReconciler;
use crate::store::AppState;

#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

/// Stripe retries deliveries that do not get a 2xx, so everything that is
/// not a signature failure or a store failure acknowledges with 200.
pub async fn stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Validation(msg::INVALID_SIGNATURE_FORMAT.into()))?;

    PaymentReconciler::new(&state).process(&body, signature).await?;

    Ok(Json(WebhookAck { received: true }))
}
