//! Terraform provider for Apache Cassandra
//!
//! Manages keyspaces, roles and grants. Grants are checked against the
//! authorization model in [`grant`] before any CQL reaches the cluster.

pub mod client;
pub mod config;
pub mod cql;
pub mod grant;
pub mod resources;

use async_trait::async_trait;
use client::{Connector, ScyllaConnector};
use config::{root_store, ClusterConfig};
use resources::{ClusterAccess, GrantResource, KeyspaceResource, RoleResource};
use std::collections::BTreeMap;
use std::sync::Arc;
use tfplug::request::{ConfigureRequest, ConfigureResponse, ValidateRequest, ValidateResponse};
use tfplug::validator::{ListLengthValidator, NumberRangeValidator, OneOfValidator};
use tfplug::{
    AttributeBuilder, AttributeType, Diagnostics, Provider, Resource, Schema, SchemaBuilder,
    TfplugError,
};

pub struct CassandraProvider {
    connector: Option<Arc<dyn Connector>>,
    /// Used instead of the driver once configured
    #[cfg(any(test, feature = "testing"))]
    injected: Option<Arc<dyn Connector>>,
}

impl Default for CassandraProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl CassandraProvider {
    pub fn new() -> Self {
        Self {
            connector: None,
            #[cfg(any(test, feature = "testing"))]
            injected: None,
        }
    }

    /// Provider that talks to `connector` instead of opening driver sessions.
    /// The provider block is still validated on configure.
    #[cfg(any(test, feature = "testing"))]
    pub fn with_connector(connector: Arc<dyn Connector>) -> Self {
        Self {
            connector: None,
            injected: Some(connector),
        }
    }

    #[cfg(any(test, feature = "testing"))]
    fn injected_connector(&self) -> Option<Arc<dyn Connector>> {
        self.injected.clone()
    }

    #[cfg(not(any(test, feature = "testing")))]
    fn injected_connector(&self) -> Option<Arc<dyn Connector>> {
        None
    }

    pub fn is_configured(&self) -> bool {
        self.connector.is_some()
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .description("Cassandra cluster connection")
            .attribute(
                AttributeBuilder::list("hosts", AttributeType::String)
                    .required()
                    .validator(Box::new(ListLengthValidator {
                        min: Some(1),
                        max: None,
                    }))
                    .description("Contact points of the cluster")
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("username")
                    .optional()
                    .description("Cassandra user, defaults to CASSANDRA_USERNAME")
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("password")
                    .optional()
                    .sensitive()
                    .description("Cassandra password, defaults to CASSANDRA_PASSWORD")
                    .build(),
            )
            .attribute(
                AttributeBuilder::number("port")
                    .optional()
                    .validator(Box::new(NumberRangeValidator {
                        min: Some(1.0),
                        max: Some(65535.0),
                    }))
                    .description("Native protocol port, 9042 when unset")
                    .build(),
            )
            .attribute(
                AttributeBuilder::number("connection_timeout")
                    .optional()
                    .validator(Box::new(NumberRangeValidator {
                        min: Some(1.0),
                        max: None,
                    }))
                    .description("Connection timeout in milliseconds, 1000 when unset")
                    .build(),
            )
            .attribute(
                AttributeBuilder::bool("use_ssl")
                    .optional()
                    .description("Connect over TLS")
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("root_ca")
                    .optional()
                    .description("PEM encoded CA bundle used to verify the cluster")
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("min_tls_version")
                    .optional()
                    .validator(OneOfValidator::create(&["TLS1.2", "TLS1.3"]))
                    .description("Lowest TLS version accepted, TLS1.2 when unset")
                    .build(),
            )
            .build(0)
    }
}

#[async_trait]
impl Provider for CassandraProvider {
    fn type_name(&self) -> &str {
        "cassandra"
    }

    fn schema(&self) -> Schema {
        Self::schema_static()
    }

    fn resource_schemas(&self) -> BTreeMap<String, Schema> {
        static SCHEMAS: std::sync::OnceLock<BTreeMap<String, Schema>> =
            std::sync::OnceLock::new();

        SCHEMAS
            .get_or_init(|| {
                let mut schemas = BTreeMap::new();
                schemas.insert(
                    resources::keyspace::TYPE_NAME.to_string(),
                    KeyspaceResource::schema_static(),
                );
                schemas.insert(
                    resources::role::TYPE_NAME.to_string(),
                    RoleResource::schema_static(),
                );
                schemas.insert(
                    resources::grant::TYPE_NAME.to_string(),
                    GrantResource::schema_static(),
                );
                schemas
            })
            .clone()
    }

    async fn validate(&self, request: ValidateRequest) -> ValidateResponse {
        let mut diagnostics = Diagnostics::new();
        let config = &request.config;

        if let Some(pem) = config.get_string("root_ca").filter(|pem| !pem.is_empty()) {
            if let Err(e) = root_store(Some(pem)) {
                diagnostics.add_attribute_error("root_ca", e.to_string(), None::<String>);
            }
            if !config.is_unknown("use_ssl") && config.get_bool("use_ssl") != Some(true) {
                diagnostics.add_warning(
                    "root_ca is ignored unless use_ssl is true",
                    None::<String>,
                );
            }
        }

        ValidateResponse { diagnostics }
    }

    async fn configure(&mut self, request: ConfigureRequest) -> ConfigureResponse {
        let mut diagnostics = Diagnostics::new();

        let cluster = match ClusterConfig::from_provider_config(&request.config) {
            Ok(cluster) => cluster,
            Err(e) => {
                diagnostics.add_error(e.to_string(), None::<String>);
                return ConfigureResponse { diagnostics };
            }
        };

        if let Some(connector) = self.injected_connector() {
            self.connector = Some(connector);
            return ConfigureResponse { diagnostics };
        }

        match ScyllaConnector::new(cluster) {
            Ok(connector) => {
                tracing::info!("Configured cluster {:?}", connector.config());
                self.connector = Some(Arc::new(connector));
            }
            Err(e) => {
                diagnostics.add_error("Failed to set up cluster connection", Some(e.to_string()));
            }
        }

        ConfigureResponse { diagnostics }
    }

    fn create_resource(&self, type_name: &str) -> tfplug::Result<Box<dyn Resource>> {
        let cluster = ClusterAccess::new(self.connector.clone());

        match type_name {
            resources::keyspace::TYPE_NAME => Ok(Box::new(KeyspaceResource::new(cluster))),
            resources::role::TYPE_NAME => Ok(Box::new(RoleResource::new(cluster))),
            resources::grant::TYPE_NAME => Ok(Box::new(GrantResource::new(cluster))),
            _ => Err(TfplugError::ResourceNotFound(type_name.to_string())),
        }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use client::MemoryConnector;
    use serial_test::serial;
    use tfplug::{Config, Context, Dynamic};

    fn provider_config() -> Config {
        Config::new()
            .with("hosts", Dynamic::List(vec!["127.0.0.1".into()]))
            .with("username", "cassandra")
            .with("password", "cassandra")
    }

    #[tokio::test]
    #[serial]
    async fn configure_builds_a_driver_connector() {
        let mut provider = CassandraProvider::new();
        let response = provider
            .configure(ConfigureRequest {
                context: Context::new(),
                config: provider_config(),
            })
            .await;

        assert!(response.diagnostics.errors.is_empty());
        assert!(provider.is_configured());
    }

    #[tokio::test]
    #[serial]
    async fn configure_requires_credentials() {
        std::env::remove_var(config::USERNAME_ENV);
        std::env::remove_var(config::PASSWORD_ENV);

        let mut provider = CassandraProvider::with_connector(Arc::new(MemoryConnector::new()));
        let response = provider
            .configure(ConfigureRequest {
                context: Context::new(),
                config: Config::new().with("hosts", Dynamic::List(vec!["127.0.0.1".into()])),
            })
            .await;

        assert!(response.diagnostics.errors[0]
            .summary
            .contains("CASSANDRA_USERNAME"));
        assert!(!provider.is_configured());
    }

    #[tokio::test]
    async fn root_ca_is_checked_during_validation() {
        let provider = CassandraProvider::new();
        let response = provider
            .validate(ValidateRequest {
                context: Context::new(),
                config: provider_config()
                    .with("use_ssl", true)
                    .with("root_ca", "-----BEGIN NOTHING-----"),
            })
            .await;

        assert_eq!(
            response.diagnostics.errors[0].attribute.as_deref(),
            Some("root_ca")
        );
        assert!(response.diagnostics.warnings.is_empty());
    }

    #[test]
    fn resources_are_registered() {
        let provider = CassandraProvider::new();
        let schemas = provider.resource_schemas();
        assert_eq!(
            schemas.keys().collect::<Vec<_>>(),
            vec!["cassandra_grant", "cassandra_keyspace", "cassandra_role"]
        );

        for name in schemas.keys() {
            let resource = provider.create_resource(name).unwrap();
            assert_eq!(resource.type_name(), name);
        }
        assert!(matches!(
            provider.create_resource("cassandra_table"),
            Err(TfplugError::ResourceNotFound(_))
        ));
    }
}
