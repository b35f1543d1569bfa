use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use super::op::Operation;
use super::row::Row;
use crate::tenant::Tenant;

#[derive(Error, Debug, Clone)]
pub enum StoreError {
    /// Connection establishment failed. The only class the composite
    /// strategy falls back on.
    #[error("connect: {0}")]
    Connect(String),

    /// An established channel failed mid-operation.
    #[error("transport: {0}")]
    Transport(String),

    /// The remote store understood the operation and refused it.
    #[error("rejected: {0}")]
    Rejected(String),

    /// Rows arrived but did not match the expected shape.
    #[error("decode: {0}")]
    Decode(String),
}

/// A way of reaching one tenant's database. All implementations return
/// identically-shaped rows for the same operation, so callers cannot tell
/// transports apart.
#[async_trait]
pub trait DataAccessStrategy: Send + Sync {
    /// Stable name for logs and the health report.
    fn name(&self) -> &'static str;

    async fn execute(&self, tenant: &Tenant, op: &Operation) -> Result<Vec<Row>, StoreError>;
}

/// Tries the primary transport and switches to the secondary only when the
/// primary could not establish a connection. Rejections and mid-stream
/// failures surface unchanged.
pub struct FallbackStrategy {
    primary: Arc<dyn DataAccessStrategy>,
    secondary: Arc<dyn DataAccessStrategy>,
}

impl FallbackStrategy {
    pub fn new(primary: Arc<dyn DataAccessStrategy>, secondary: Arc<dyn DataAccessStrategy>) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait]
impl DataAccessStrategy for FallbackStrategy {
    fn name(&self) -> &'static str {
        "auto"
    }

    async fn execute(&self, tenant: &Tenant, op: &Operation) -> Result<Vec<Row>, StoreError> {
        match self.primary.execute(tenant, op).await {
            Err(StoreError::Connect(reason)) => {
                tracing::warn!(
                    tenant = %tenant.id,
                    primary = self.primary.name(),
                    secondary = self.secondary.name(),
                    %reason,
                    "primary transport unreachable, falling back"
                );
                self.secondary.execute(tenant, op).await
            }
            other => other,
        }
    }
}
