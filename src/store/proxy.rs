use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use super::op::{Operation, OperationKind};
use super::row::{Row, write_ack};
use super::strategy::{DataAccessStrategy, StoreError};
use crate::tenant::Tenant;

const PROXY_TIMEOUT: Duration = Duration::from_secs(30);

/// Ships each operation to the HTTP bridge running next to the database.
/// The request body is a flat JSON object carrying the tenant id, the
/// action name and the operation parameters.
pub struct ProxyStrategy {
    client: reqwest::Client,
}

impl ProxyStrategy {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for ProxyStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
struct ProxyReply {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    rows: Option<Vec<Row>>,
    #[serde(default)]
    affected_rows: Option<u64>,
    #[serde(default)]
    insert_id: Option<u64>,
    #[serde(default)]
    error: Option<String>,
}

#[async_trait]
impl DataAccessStrategy for ProxyStrategy {
    fn name(&self) -> &'static str {
        "proxy"
    }

    async fn execute(&self, tenant: &Tenant, op: &Operation) -> Result<Vec<Row>, StoreError> {
        let Some(url) = tenant.connection.proxy_url.as_ref() else {
            return Err(StoreError::Connect("proxy url not configured".into()));
        };

        let mut envelope = serde_json::Map::new();
        envelope.insert("project".into(), tenant.id.clone().into());
        envelope.insert("action".into(), op.action().into());
        for (key, value) in op.params() {
            envelope.insert(key, value);
        }

        let response = self
            .client
            .post(url)
            .timeout(PROXY_TIMEOUT)
            .json(&envelope)
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(StoreError::Transport(format!("proxy returned {status}")));
        }

        let reply: ProxyReply = response
            .json()
            .await
            .map_err(|e| StoreError::Transport(format!("proxy reply decode: {e}")))?;

        if !reply.success {
            return Err(StoreError::Rejected(
                reply.error.unwrap_or_else(|| "proxy reported failure".into()),
            ));
        }

        match op.kind() {
            OperationKind::Fetch => Ok(reply.rows.unwrap_or_default()),
            OperationKind::Execute => Ok(vec![write_ack(
                reply.affected_rows.unwrap_or(0),
                reply.insert_id,
            )]),
        }
    }
}

fn classify_reqwest_error(error: reqwest::Error) -> StoreError {
    if error.is_connect() || error.is_timeout() {
        StoreError::Connect(format!("proxy unreachable: {error}"))
    } else {
        StoreError::Transport(error.to_string())
    }
}
