//! Cluster access through the scylla driver

use super::{ClientError, Connector, KeyspaceMetadata, Result, RoleMetadata, Session};
use crate::config::ClusterConfig;
use async_trait::async_trait;
use scylla::client::execution_profile::ExecutionProfile;
use scylla::client::session::Session as DriverSession;
use scylla::client::session_builder::SessionBuilder;
use scylla::statement::Consistency;
use std::collections::HashMap;
use std::sync::Arc;

const KEYSPACE_QUERY: &str = "SELECT keyspace_name, durable_writes, replication \
     FROM system_schema.keyspaces WHERE keyspace_name = ?";

const ROLE_QUERY: &str = "SELECT role, can_login, is_superuser \
     FROM system_auth.roles WHERE role = ?";

/// Opens driver sessions from a validated cluster configuration
#[derive(Clone)]
pub struct ScyllaConnector {
    inner: Arc<ConnectorInner>,
}

struct ConnectorInner {
    config: ClusterConfig,
    tls: Option<Arc<rustls::ClientConfig>>,
}

impl ScyllaConnector {
    pub fn new(config: ClusterConfig) -> Result<Self> {
        let tls = config
            .tls_client_config()
            .map_err(|e| ClientError::Tls(e.to_string()))?;

        Ok(Self {
            inner: Arc::new(ConnectorInner { config, tls }),
        })
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.inner.config
    }
}

#[async_trait]
impl Connector for ScyllaConnector {
    async fn connect(&self) -> Result<Box<dyn Session>> {
        let config = &self.inner.config;
        let contact_points = config.contact_points();

        tracing::debug!(
            "Connecting to {} (tls: {})",
            contact_points.join(", "),
            self.inner.tls.is_some()
        );

        let profile = ExecutionProfile::builder()
            .consistency(Consistency::All)
            .build();

        let session = SessionBuilder::new()
            .known_nodes(&contact_points)
            .user(config.username.as_str(), config.password.as_str())
            .connection_timeout(config.connection_timeout)
            .default_execution_profile_handle(profile.into_handle())
            .tls_context(self.inner.tls.clone())
            .build()
            .await
            .map_err(ClientError::connect)?;

        Ok(Box::new(ScyllaSession { session }))
    }
}

struct ScyllaSession {
    session: DriverSession,
}

#[async_trait]
impl Session for ScyllaSession {
    async fn execute(&self, statement: &str) -> Result<()> {
        self.session
            .query_unpaged(statement, ())
            .await
            .map_err(ClientError::execute)?;
        Ok(())
    }

    async fn count_rows(&self, statement: &str) -> Result<usize> {
        let result = self
            .session
            .query_unpaged(statement, ())
            .await
            .map_err(ClientError::execute)?;

        let rows = result.into_rows_result().map_err(ClientError::rows)?;
        Ok(rows.rows_num())
    }

    async fn keyspace(&self, name: &str) -> Result<Option<KeyspaceMetadata>> {
        let result = self
            .session
            .query_unpaged(KEYSPACE_QUERY, (name,))
            .await
            .map_err(ClientError::execute)?;

        let row = result
            .into_rows_result()
            .map_err(ClientError::rows)?
            .maybe_first_row::<(String, Option<bool>, Option<HashMap<String, String>>)>()
            .map_err(ClientError::rows)?;

        Ok(row.map(|(name, durable_writes, replication)| {
            KeyspaceMetadata::from_replication(
                &name,
                durable_writes.unwrap_or(true),
                replication.unwrap_or_default(),
            )
        }))
    }

    async fn role(&self, name: &str) -> Result<Option<RoleMetadata>> {
        let result = self
            .session
            .query_unpaged(ROLE_QUERY, (name,))
            .await
            .map_err(ClientError::execute)?;

        let row = result
            .into_rows_result()
            .map_err(ClientError::rows)?
            .maybe_first_row::<(String, Option<bool>, Option<bool>)>()
            .map_err(ClientError::rows)?;

        Ok(row.map(|(name, can_login, is_superuser)| RoleMetadata {
            name,
            can_login: can_login.unwrap_or(false),
            is_superuser: is_superuser.unwrap_or(false),
        }))
    }
}
