//! In-memory cluster
//!
//! Understands the statements the resources issue (keyspace and role DDL,
//! GRANT/REVOKE/LIST) well enough to keep a consistent picture of the
//! cluster, and records every statement it sees. Only built for tests and
//! with the `testing` feature.

use super::{
    ClientError, Connector, KeyspaceMetadata, Result, RoleMetadata, Session,
    STRATEGY_CLASS_PREFIX,
};
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
struct MemoryCluster {
    keyspaces: BTreeMap<String, KeyspaceMetadata>,
    roles: BTreeMap<String, RoleMetadata>,
    /// `<privilege> ON <resource> OF <grantee>` of every granted permission
    permissions: BTreeSet<String>,
    statements: Vec<String>,
    connection_failure: Option<String>,
    statement_failure: Option<String>,
}

#[derive(Clone, Default)]
pub struct MemoryConnector {
    cluster: Arc<Mutex<MemoryCluster>>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keyspace(self, keyspace: KeyspaceMetadata) -> Self {
        self.lock()
            .keyspaces
            .insert(keyspace.name.clone(), keyspace);
        self
    }

    pub fn with_role(self, role: RoleMetadata) -> Self {
        self.lock().roles.insert(role.name.clone(), role);
        self
    }

    /// Make every following connect fail with `message`
    pub fn fail_connections(&self, message: &str) {
        self.lock().connection_failure = Some(message.to_string());
    }

    /// Make every following statement fail with `message`
    pub fn fail_statements(&self, message: &str) {
        self.lock().statement_failure = Some(message.to_string());
    }

    /// Statements executed so far, in order
    pub fn statements(&self) -> Vec<String> {
        self.lock().statements.clone()
    }

    pub fn keyspace(&self, name: &str) -> Option<KeyspaceMetadata> {
        self.lock().keyspaces.get(name).cloned()
    }

    pub fn role(&self, name: &str) -> Option<RoleMetadata> {
        self.lock().roles.get(name).cloned()
    }

    pub fn permission_count(&self) -> usize {
        self.lock().permissions.len()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryCluster> {
        self.cluster
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self) -> Result<Box<dyn Session>> {
        if let Some(message) = &self.lock().connection_failure {
            return Err(ClientError::connect(io::Error::other(message.clone())));
        }
        Ok(Box::new(self.clone()))
    }
}

#[async_trait]
impl Session for MemoryConnector {
    async fn execute(&self, statement: &str) -> Result<()> {
        let mut cluster = self.lock();
        cluster.statements.push(statement.to_string());

        if let Some(message) = &cluster.statement_failure {
            return Err(ClientError::execute(io::Error::other(message.clone())));
        }

        cluster.apply(statement).map_err(ClientError::execute)
    }

    async fn count_rows(&self, statement: &str) -> Result<usize> {
        let mut cluster = self.lock();
        cluster.statements.push(statement.to_string());

        if let Some(message) = &cluster.statement_failure {
            return Err(ClientError::execute(io::Error::other(message.clone())));
        }

        match permission_key(statement, "LIST ", " OF ") {
            Some(key) => Ok(usize::from(cluster.permissions.contains(&key))),
            None => Err(ClientError::execute(unsupported(statement))),
        }
    }

    async fn keyspace(&self, name: &str) -> Result<Option<KeyspaceMetadata>> {
        Ok(self.lock().keyspaces.get(name).cloned())
    }

    async fn role(&self, name: &str) -> Result<Option<RoleMetadata>> {
        Ok(self.lock().roles.get(name).cloned())
    }
}

impl MemoryCluster {
    fn apply(&mut self, statement: &str) -> std::result::Result<(), io::Error> {
        if let Some(key) = permission_key(statement, "GRANT ", " TO ") {
            self.permissions.insert(key);
        } else if let Some(key) = permission_key(statement, "REVOKE ", " FROM ") {
            self.permissions.remove(&key);
        } else if let Some(rest) = statement.strip_prefix("CREATE KEYSPACE ") {
            let keyspace = parse_keyspace(rest).ok_or_else(|| unsupported(statement))?;
            if self.keyspaces.contains_key(&keyspace.name) {
                return Err(io::Error::other(format!(
                    "Keyspace {} already exists",
                    keyspace.name
                )));
            }
            self.keyspaces.insert(keyspace.name.clone(), keyspace);
        } else if let Some(rest) = statement.strip_prefix("ALTER KEYSPACE ") {
            let keyspace = parse_keyspace(rest).ok_or_else(|| unsupported(statement))?;
            if !self.keyspaces.contains_key(&keyspace.name) {
                return Err(missing("Keyspace", &keyspace.name));
            }
            self.keyspaces.insert(keyspace.name.clone(), keyspace);
        } else if let Some(name) = statement.strip_prefix("DROP KEYSPACE ") {
            let name = unquote_identifier(name.trim());
            self.keyspaces
                .remove(&name)
                .ok_or_else(|| missing("Keyspace", &name))?;
        } else if let Some(rest) = statement.strip_prefix("CREATE ROLE ") {
            let role = parse_role(rest).ok_or_else(|| unsupported(statement))?;
            if self.roles.contains_key(&role.name) {
                return Err(io::Error::other(format!("{} already exists", role.name)));
            }
            self.roles.insert(role.name.clone(), role);
        } else if let Some(rest) = statement.strip_prefix("ALTER ROLE ") {
            let role = parse_role(rest).ok_or_else(|| unsupported(statement))?;
            if !self.roles.contains_key(&role.name) {
                return Err(missing("Role", &role.name));
            }
            self.roles.insert(role.name.clone(), role);
        } else if let Some(name) = statement.strip_prefix("DROP ROLE ") {
            let name = unquote_literal(name.trim());
            self.roles
                .remove(&name)
                .ok_or_else(|| missing("Role", &name))?;
        } else {
            return Err(unsupported(statement));
        }
        Ok(())
    }
}

/// `GRANT x TO g`, `REVOKE x FROM g` and `LIST x OF g` all map to `x OF g`
fn permission_key(statement: &str, verb: &str, preposition: &str) -> Option<String> {
    let (target, grantee) = statement
        .strip_prefix(verb)?
        .rsplit_once(preposition)?;
    Some(format!("{} OF {}", target, grantee))
}

/// `<name> WITH REPLICATION = { 'k' : 'v', ... } AND DURABLE_WRITES = <bool>`
fn parse_keyspace(rest: &str) -> Option<KeyspaceMetadata> {
    let (name, rest) = rest.split_once(" WITH REPLICATION = {")?;
    let (replication, rest) = rest.split_once('}')?;
    let durable_writes = rest.trim().strip_prefix("AND DURABLE_WRITES = ")?;

    let mut entries = Vec::new();
    for entry in replication.split(',') {
        let (key, value) = entry.split_once(':')?;
        let key = unquote_literal(key.trim());
        let mut value = unquote_literal(value.trim());
        if key == "class" && !value.contains('.') {
            value = format!("{}{}", STRATEGY_CLASS_PREFIX, value);
        }
        entries.push((key, value));
    }

    Some(KeyspaceMetadata::from_replication(
        &unquote_identifier(name.trim()),
        durable_writes.trim().parse().ok()?,
        entries,
    ))
}

/// `'<name>' WITH PASSWORD = '<pw>' AND LOGIN = <bool> AND SUPERUSER = <bool>`
fn parse_role(rest: &str) -> Option<RoleMetadata> {
    let (name, rest) = rest.split_once(" WITH PASSWORD = ")?;
    let (_, rest) = rest.split_once(" AND LOGIN = ")?;
    let (login, superuser) = rest.split_once(" AND SUPERUSER = ")?;

    Some(RoleMetadata {
        name: unquote_literal(name.trim()),
        can_login: login.trim().parse().ok()?,
        is_superuser: superuser.trim().parse().ok()?,
    })
}

fn unquote(value: &str, quote: char) -> String {
    let doubled = format!("{}{}", quote, quote);
    match value
        .strip_prefix(quote)
        .and_then(|v| v.strip_suffix(quote))
    {
        Some(inner) => inner.replace(&doubled, &quote.to_string()),
        None => value.to_string(),
    }
}

fn unquote_literal(value: &str) -> String {
    unquote(value, '\'')
}

/// Quoted identifiers keep their case
fn unquote_identifier(value: &str) -> String {
    unquote(value, '"')
}

fn unsupported(statement: &str) -> io::Error {
    io::Error::other(format!("unsupported statement: {}", statement))
}

fn missing(kind: &str, name: &str) -> io::Error {
    io::Error::other(format!("{} {} doesn't exist", kind, name))
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    async fn session(connector: &MemoryConnector) -> Box<dyn Session> {
        connector.connect().await.unwrap()
    }

    #[tokio::test]
    async fn grants_are_listed_until_revoked() {
        let connector = MemoryConnector::new();
        let session = session(&connector).await;

        let list = r#"LIST SELECT ON TABLE "shop"."orders" OF "app""#;
        assert_eq!(session.count_rows(list).await.unwrap(), 0);

        session
            .execute(r#"GRANT SELECT ON TABLE "shop"."orders" TO "app""#)
            .await
            .unwrap();
        assert_eq!(session.count_rows(list).await.unwrap(), 1);

        session
            .execute(r#"REVOKE SELECT ON TABLE "shop"."orders" FROM "app""#)
            .await
            .unwrap();
        assert_eq!(session.count_rows(list).await.unwrap(), 0);
        assert_eq!(connector.statements().len(), 5);
    }

    #[tokio::test]
    async fn keyspace_ddl_updates_metadata() {
        let connector = MemoryConnector::new();
        let session = session(&connector).await;

        session
            .execute("CREATE KEYSPACE shop WITH REPLICATION = { 'class' : 'SimpleStrategy', 'replication_factor' : '1' } AND DURABLE_WRITES = true")
            .await
            .unwrap();

        let keyspace = session.keyspace("shop").await.unwrap().unwrap();
        assert_eq!(keyspace.strategy_class, "SimpleStrategy");
        assert_eq!(keyspace.strategy_options["replication_factor"], "1");
        assert!(keyspace.durable_writes);

        session.execute("DROP KEYSPACE shop").await.unwrap();
        assert!(session.keyspace("shop").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn quoted_keyspace_keeps_its_case() {
        let connector = MemoryConnector::new();
        let session = session(&connector).await;

        session
            .execute(r#"CREATE KEYSPACE "MyShop" WITH REPLICATION = { 'class' : 'SimpleStrategy', 'replication_factor' : '1' } AND DURABLE_WRITES = true"#)
            .await
            .unwrap();
        assert!(session.keyspace("MyShop").await.unwrap().is_some());
        assert!(session.keyspace("myshop").await.unwrap().is_none());

        session.execute(r#"DROP KEYSPACE "MyShop""#).await.unwrap();
        assert!(connector.keyspace("MyShop").is_none());
    }

    #[tokio::test]
    async fn role_ddl_updates_metadata() {
        let connector = MemoryConnector::new();
        let session = session(&connector).await;

        session
            .execute("CREATE ROLE 'reporting' WITH PASSWORD = 'secret' AND LOGIN = true AND SUPERUSER = false")
            .await
            .unwrap();
        let role = session.role("reporting").await.unwrap().unwrap();
        assert!(role.can_login);
        assert!(!role.is_superuser);

        assert!(session
            .execute("CREATE ROLE 'reporting' WITH PASSWORD = 'secret' AND LOGIN = true AND SUPERUSER = false")
            .await
            .is_err());

        session.execute("DROP ROLE 'reporting'").await.unwrap();
        assert!(connector.role("reporting").is_none());
    }

    #[tokio::test]
    async fn failures_are_injected() {
        let connector = MemoryConnector::new();
        connector.fail_statements("boom");
        let session = session(&connector).await;
        let err = session.execute("DROP KEYSPACE shop").await.unwrap_err();
        assert!(err.to_string().contains("boom"));

        connector.fail_connections("no hosts available");
        let err = connector.connect().await.err().unwrap();
        assert!(matches!(err, ClientError::Connect(_)));
    }

    #[tokio::test]
    async fn unknown_statements_are_rejected() {
        let connector = MemoryConnector::new();
        let session = session(&connector).await;
        assert!(session.execute("TRUNCATE shop.orders").await.is_err());
    }
}
