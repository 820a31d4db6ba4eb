//! Cluster access seam
//!
//! Resources talk to the cluster through [`Connector`] and [`Session`]. The
//! driver-backed implementation lives in [`driver`]. An in-memory one that
//! records statements is built for tests and with the `testing` feature.

pub mod driver;
pub mod error;
#[cfg(any(test, feature = "testing"))]
pub mod memory;

pub use driver::ScyllaConnector;
pub use error::ClientError;
#[cfg(any(test, feature = "testing"))]
pub use memory::MemoryConnector;

use async_trait::async_trait;
use std::collections::BTreeMap;

pub type Result<T> = std::result::Result<T, ClientError>;

/// Prefix Cassandra puts in front of built-in replication strategy classes
pub const STRATEGY_CLASS_PREFIX: &str = "org.apache.cassandra.locator.";

/// Row of `system_schema.keyspaces`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyspaceMetadata {
    pub name: String,
    /// Strategy class without the `org.apache.cassandra.locator.` prefix
    pub strategy_class: String,
    /// Replication options other than `class`
    pub strategy_options: BTreeMap<String, String>,
    pub durable_writes: bool,
}

impl KeyspaceMetadata {
    /// Split a replication map as stored by Cassandra into class and options
    pub fn from_replication(
        name: &str,
        durable_writes: bool,
        replication: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        let mut strategy_class = String::new();
        let mut strategy_options = BTreeMap::new();

        for (key, value) in replication {
            if key == "class" {
                strategy_class = value
                    .strip_prefix(STRATEGY_CLASS_PREFIX)
                    .unwrap_or(&value)
                    .to_string();
            } else {
                strategy_options.insert(key, value);
            }
        }

        Self {
            name: name.to_string(),
            strategy_class,
            strategy_options,
            durable_writes,
        }
    }
}

/// Row of `system_auth.roles`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleMetadata {
    pub name: String,
    pub can_login: bool,
    pub is_superuser: bool,
}

/// Opens sessions against the cluster. One session is opened per resource
/// operation and dropped when the operation finishes.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Box<dyn Session>>;
}

#[async_trait]
pub trait Session: Send + Sync {
    /// Run a statement that returns no rows of interest
    async fn execute(&self, statement: &str) -> Result<()>;

    /// Run a statement and return how many rows it produced
    async fn count_rows(&self, statement: &str) -> Result<usize>;

    async fn keyspace(&self, name: &str) -> Result<Option<KeyspaceMetadata>>;

    async fn role(&self, name: &str) -> Result<Option<RoleMetadata>>;
}
