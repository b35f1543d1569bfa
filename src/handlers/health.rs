use std::collections::BTreeMap;

use axum::extract::State;
use chrono::Utc;
use serde::Serialize;

use crate::extractors::Json;
use crate::store::{AppState, TenantStore};

#[derive(Debug, Default, Serialize)]
pub struct TenantCounts {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub questions: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub users: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sessions: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct TenantHealth {
    pub status: &'static str,
    pub transport: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub counts: Option<TenantCounts>,
}

#[derive(Debug, Serialize)]
pub struct HealthConfig {
    pub stripe_configured: bool,
    pub mail_configured: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub timestamp: String,
    pub tenants: BTreeMap<String, TenantHealth>,
    pub config: HealthConfig,
}

/// Pings one tenant store and, when reachable, gathers table counts.
/// A count failure only drops that count; the tenant still reads as
/// connected.
pub async fn probe_tenant(store: &TenantStore) -> TenantHealth {
    let transport = store.transport_name();
    match store.ping().await {
        Ok(()) => TenantHealth {
            status: "connected",
            transport,
            error: None,
            counts: Some(TenantCounts {
                questions: store.count_questions().await.ok(),
                users: store.count_users().await.ok(),
                sessions: store.count_sessions().await.ok(),
            }),
        },
        Err(err) => {
            tracing::warn!(tenant = %store.tenant().id, error = %err, "tenant probe failed");
            TenantHealth {
                status: "error",
                transport,
                error: Some(err.to_string()),
                counts: None,
            }
        }
    }
}

/// Connectivity report across all tenants. Always 200; a failing tenant is
/// reported in the body rather than failing the endpoint.
pub async fn health_report(State(state): State<AppState>) -> Json<HealthResponse> {
    let mut tenants = BTreeMap::new();
    for tenant in state.registry.iter() {
        let Ok(store) = state.store(&tenant.id) else {
            continue;
        };
        tenants.insert(tenant.id.clone(), probe_tenant(store).await);
    }

    let all_connected = tenants.values().all(|t| t.status == "connected");

    Json(HealthResponse {
        status: if all_connected { "ok" } else { "degraded" },
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now().to_rfc3339(),
        tenants,
        config: HealthConfig {
            stripe_configured: state.stripe_configured,
            mail_configured: state.mail_configured,
        },
    })
}
