use axum::extract::State;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result, msg};
use crate::extractors::{Json, Path};
use crate::models::validate_email_format;
use crate::store::AppState;

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub email: String,
    /// Optional product id; when present it must match the tenant in the
    /// path, so a client cannot buy for one product through another's URL.
    #[serde(default)]
    pub product: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub success: bool,
    pub checkout_url: String,
    pub session_id: String,
    pub customer_id: String,
}

pub async fn create_checkout(
    State(state): State<AppState>,
    Path(tenant_id): Path<String>,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<CheckoutResponse>> {
    let store = state.store(&tenant_id)?;
    let tenant = store.tenant();

    let email = request.email.trim();
    validate_email_format(email)?;
    if let Some(product) = request.product.as_deref()
        && product != tenant.id
    {
        return Err(AppError::Validation(msg::UNKNOWN_PRODUCT.into()));
    }

    let customer_id = match state.stripe.find_customer_by_email(email).await? {
        Some(id) => {
            tracing::info!(tenant = %tenant.id, customer_id = %id, "reusing Stripe customer");
            id
        }
        None => {
            let id = state.stripe.create_customer(email, &tenant.id).await?;
            tracing::info!(tenant = %tenant.id, customer_id = %id, "created Stripe customer");
            id
        }
    };

    let (session_id, checkout_url) = state
        .stripe
        .create_checkout_session(tenant, &customer_id, email)
        .await?;

    tracing::info!(
        tenant = %tenant.id,
        session_id = %session_id,
        amount = %tenant.price_display(),
        "checkout session created"
    );

    Ok(Json(CheckoutResponse {
        success: true,
        checkout_url,
        session_id,
        customer_id,
    }))
}
