use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use russh::client;
use tokio::net::TcpListener;
use tokio::time::timeout;

use super::direct::execute_over_tcp;
use super::op::Operation;
use super::row::Row;
use super::strategy::{DataAccessStrategy, StoreError};
use crate::tenant::{SshProfile, Tenant};

const SSH_TIMEOUT: Duration = Duration::from_secs(30);

/// MySQL as the bastion sees it.
const FORWARD_HOST: &str = "127.0.0.1";

/// SSH local forward to the database host, then the same MySQL exchange the
/// direct strategy performs. The session, forward and connection are torn
/// down after every operation.
pub struct TunnelStrategy;

struct AcceptingHandler;

#[async_trait]
impl client::Handler for AcceptingHandler {
    type Error = russh::Error;

    // The bastion host key is not pinned.
    async fn check_server_key(
        &mut self,
        _server_public_key: &russh_keys::key::PublicKey,
    ) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

#[async_trait]
impl DataAccessStrategy for TunnelStrategy {
    fn name(&self) -> &'static str {
        "tunnel"
    }

    async fn execute(&self, tenant: &Tenant, op: &Operation) -> Result<Vec<Row>, StoreError> {
        let profile = &tenant.connection;
        let Some(ssh) = profile.ssh.as_ref() else {
            return Err(StoreError::Connect("ssh credentials not configured".into()));
        };

        let handle = open_ssh_session(ssh).await?;

        let listener = TcpListener::bind((FORWARD_HOST, 0))
            .await
            .map_err(|e| StoreError::Connect(format!("local forward bind: {e}")))?;
        let local_port = listener
            .local_addr()
            .map_err(|e| StoreError::Connect(format!("local forward addr: {e}")))?
            .port();

        let channel = match timeout(
            SSH_TIMEOUT,
            handle.channel_open_direct_tcpip(
                FORWARD_HOST,
                u32::from(profile.port),
                FORWARD_HOST,
                u32::from(local_port),
            ),
        )
        .await
        {
            Ok(Ok(channel)) => channel,
            Ok(Err(e)) => return Err(StoreError::Connect(format!("ssh forward channel: {e}"))),
            Err(_) => return Err(StoreError::Connect("ssh forward channel: timed out".into())),
        };

        // One MySQL connection will arrive on the listener; pump it through
        // the channel until either side closes.
        let pump = tokio::spawn(async move {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let mut stream = channel.into_stream();
                    if let Err(error) =
                        tokio::io::copy_bidirectional(&mut socket, &mut stream).await
                    {
                        tracing::debug!(%error, "tunnel stream ended");
                    }
                }
                Err(error) => tracing::debug!(%error, "tunnel accept failed"),
            }
        });

        let result = execute_over_tcp(FORWARD_HOST, local_port, profile, op).await;

        pump.abort();
        let _ = handle
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await;

        result
    }
}

async fn open_ssh_session(
    ssh: &SshProfile,
) -> Result<client::Handle<AcceptingHandler>, StoreError> {
    let config = Arc::new(client::Config::default());

    let mut handle = match timeout(
        SSH_TIMEOUT,
        client::connect(config, (ssh.host.as_str(), ssh.port), AcceptingHandler),
    )
    .await
    {
        Ok(Ok(handle)) => handle,
        Ok(Err(e)) => {
            return Err(StoreError::Connect(format!(
                "ssh connect to {}:{}: {e}",
                ssh.host, ssh.port
            )));
        }
        Err(_) => {
            return Err(StoreError::Connect(format!(
                "ssh connect to {}:{}: timed out",
                ssh.host, ssh.port
            )));
        }
    };

    let authenticated = match timeout(
        SSH_TIMEOUT,
        handle.authenticate_password(ssh.user.as_str(), ssh.password.as_str()),
    )
    .await
    {
        Ok(Ok(ok)) => ok,
        Ok(Err(e)) => return Err(StoreError::Connect(format!("ssh auth: {e}"))),
        Err(_) => return Err(StoreError::Connect("ssh auth: timed out".into())),
    };
    if !authenticated {
        return Err(StoreError::Connect("ssh auth: rejected".into()));
    }

    Ok(handle)
}
