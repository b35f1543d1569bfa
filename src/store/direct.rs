use std::time::Duration;

use async_trait::async_trait;
use mysql_async::prelude::Queryable;
use mysql_async::{Conn, OptsBuilder};
use tokio::time::timeout;

use super::op::{Operation, OperationKind};
use super::row::{Row, mysql_row_to_json, write_ack};
use super::sql;
use super::strategy::{DataAccessStrategy, StoreError};
use crate::tenant::{ConnectionProfile, Tenant};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const QUERY_TIMEOUT: Duration = Duration::from_secs(30);
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Plain TCP MySQL. One connection per operation, closed afterwards.
pub struct DirectStrategy;

#[async_trait]
impl DataAccessStrategy for DirectStrategy {
    fn name(&self) -> &'static str {
        "direct"
    }

    async fn execute(&self, tenant: &Tenant, op: &Operation) -> Result<Vec<Row>, StoreError> {
        let profile = &tenant.connection;
        execute_over_tcp(&profile.host, profile.port, profile, op).await
    }
}

/// Shared by the direct and tunneled strategies: connect, run exactly one
/// operation, disconnect.
pub(crate) async fn execute_over_tcp(
    host: &str,
    port: u16,
    profile: &ConnectionProfile,
    op: &Operation,
) -> Result<Vec<Row>, StoreError> {
    let opts = OptsBuilder::default()
        .ip_or_hostname(host)
        .tcp_port(port)
        .user(Some(profile.user.clone()))
        .pass(Some(profile.password.clone()))
        .db_name(Some(profile.database.clone()));

    let conn = match timeout(CONNECT_TIMEOUT, Conn::new(opts)).await {
        Ok(Ok(conn)) => conn,
        Ok(Err(e)) => {
            return Err(StoreError::Connect(format!(
                "mysql connect to {host}:{port}: {e}"
            )));
        }
        Err(_) => {
            return Err(StoreError::Connect(format!(
                "mysql connect to {host}:{port}: timed out"
            )));
        }
    };

    run_operation(conn, op).await
}

async fn run_operation(mut conn: Conn, op: &Operation) -> Result<Vec<Row>, StoreError> {
    let (statement, params) = sql::render(op);

    let result = match op.kind() {
        OperationKind::Fetch => {
            match timeout(QUERY_TIMEOUT, conn.exec(statement.as_str(), params)).await {
                Ok(Ok(rows)) => {
                    let rows: Vec<mysql_async::Row> = rows;
                    Ok(rows.into_iter().map(mysql_row_to_json).collect())
                }
                Ok(Err(e)) => Err(classify_mysql_error(e)),
                Err(_) => Err(StoreError::Transport("query timed out".into())),
            }
        }
        OperationKind::Execute => {
            match timeout(QUERY_TIMEOUT, conn.exec_drop(statement.as_str(), params)).await {
                Ok(Ok(())) => Ok(vec![write_ack(conn.affected_rows(), conn.last_insert_id())]),
                Ok(Err(e)) => Err(classify_mysql_error(e)),
                Err(_) => Err(StoreError::Transport("query timed out".into())),
            }
        }
    };

    if let Ok(Err(error)) = timeout(DISCONNECT_TIMEOUT, conn.disconnect()).await {
        tracing::debug!(%error, "mysql disconnect failed");
    }

    result
}

/// Server-side errors are rejections; everything else on an established
/// connection is a transport fault.
fn classify_mysql_error(error: mysql_async::Error) -> StoreError {
    match error {
        mysql_async::Error::Server(e) => StoreError::Rejected(e.to_string()),
        other => StoreError::Transport(other.to_string()),
    }
}
