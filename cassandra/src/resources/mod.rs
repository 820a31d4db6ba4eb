pub mod grant;
pub mod keyspace;
pub mod role;

pub use grant::GrantResource;
pub use keyspace::KeyspaceResource;
pub use role::RoleResource;

use crate::client::{self, ClientError, Connector, Session};
use std::future::Future;
use std::sync::Arc;
use tfplug::{Context, Diagnostics, DynamicValue};

/// Cluster handle shared by the resources of one provider instance. Empty
/// until the provider is configured.
#[derive(Clone, Default)]
pub struct ClusterAccess {
    connector: Option<Arc<dyn Connector>>,
}

impl ClusterAccess {
    pub fn new(connector: Option<Arc<dyn Connector>>) -> Self {
        Self { connector }
    }

    pub fn is_configured(&self) -> bool {
        self.connector.is_some()
    }

    /// Open a session for one operation
    pub async fn session(&self, context: &Context) -> client::Result<Box<dyn Session>> {
        let connector = self.connector.as_ref().ok_or(ClientError::NotConfigured)?;
        cancellable(context, connector.connect()).await
    }

    pub async fn execute(&self, context: &Context, statement: &str) -> client::Result<()> {
        let session = self.session(context).await?;
        cancellable(context, session.execute(statement)).await
    }
}

/// Run `operation` unless the context is or becomes cancelled first
pub async fn cancellable<T>(
    context: &Context,
    operation: impl Future<Output = client::Result<T>>,
) -> client::Result<T> {
    if context.is_cancelled() {
        return Err(ClientError::Cancelled);
    }

    tokio::select! {
        result = operation => result,
        _ = context.cancelled() => Err(ClientError::Cancelled),
    }
}

pub(crate) fn client_error(summary: &str, err: &ClientError) -> Diagnostics {
    tracing::warn!("{}: {}", summary, err);

    let mut diagnostics = Diagnostics::new();
    diagnostics.add_error(summary, Some(err.to_string()));
    diagnostics
}

/// String attribute that must be present, reported against the attribute
/// when it is not
pub(crate) fn require_string(
    values: &DynamicValue,
    name: &str,
    diagnostics: &mut Diagnostics,
) -> Option<String> {
    match values.get_string(name) {
        Some(value) if !value.is_empty() => Some(value.to_string()),
        _ => {
            diagnostics.add_attribute_error(name, format!("{} must be set", name), None::<String>);
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::client::MemoryConnector;

    #[tokio::test]
    async fn unconfigured_access_reports_not_configured() {
        let access = ClusterAccess::default();
        let err = access.session(&Context::new()).await.err().unwrap();
        assert!(matches!(err, ClientError::NotConfigured));
    }

    #[tokio::test]
    async fn cancelled_context_stops_new_work() {
        let connector = MemoryConnector::new();
        let access = ClusterAccess::new(Some(Arc::new(connector.clone())));
        let context = Context::new();
        context.cancel();

        let err = access.execute(&context, "DROP ROLE 'x'").await.unwrap_err();
        assert!(matches!(err, ClientError::Cancelled));
        assert!(connector.statements().is_empty());
    }

    #[test]
    fn missing_string_is_reported_on_the_attribute() {
        let mut diagnostics = Diagnostics::new();
        let values = DynamicValue::new().with("name", "");
        assert_eq!(require_string(&values, "name", &mut diagnostics), None);
        assert_eq!(diagnostics.errors[0].attribute.as_deref(), Some("name"));
    }
}
