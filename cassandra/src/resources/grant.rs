use super::{cancellable, client_error, ClusterAccess};
use crate::grant::identifier::{
    find_conflicts, FUNCTION_NAME, KEYSPACE_NAME, MBEAN_NAME, MBEAN_PATTERN, ROLE_NAME, TABLE_NAME,
};
use crate::grant::{self, render, Action, Grant, Privilege, ResourceType, ValidationError};
use async_trait::async_trait;
use tfplug::plan_modifier::{RequiresReplace, UseStateForUnknown};
use tfplug::request::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ReadRequest, ReadResponse,
    UpdateRequest, UpdateResponse, ValidateRequest, ValidateResponse,
};
use tfplug::validator::{OneOfValidator, RegexSyntaxValidator, StringPatternValidator};
use tfplug::{AttributeBuilder, Diagnostics, DynamicValue, Resource, Schema, SchemaBuilder};

pub const TYPE_NAME: &str = "cassandra_grant";

const GRANTEE_PATTERN: &str = r"^[^']{1,256}$";
const KEYSPACE_PATTERN: &str = r"^[a-zA-Z0-9_]{1,48}$";
const TABLE_PATTERN: &str = r"^[a-zA-Z0-9][a-zA-Z0-9_]{0,255}$";
const OBJECT_PATTERN: &str = r#"^[^"]{1,256}$"#;

pub struct GrantResource {
    cluster: ClusterAccess,
}

/// Build a grant from configuration or state values
fn grant_from(values: &DynamicValue) -> Result<Grant, ValidationError> {
    let resource_type = values.get_string("resource_type").unwrap_or_default();
    let identifier = resource_type
        .parse::<ResourceType>()
        .ok()
        .and_then(|rt| rt.identifier())
        .and_then(|identifier| values.get_string(identifier.attribute()));

    grant::validate(
        values.get_string("privilege").unwrap_or_default(),
        resource_type,
        values.get_string("grantee").unwrap_or_default(),
        values.get_string(KEYSPACE_NAME),
        identifier,
    )
}

/// String attribute that forces a new grant and must match `pattern`
fn matching(name: &str, pattern: &str, description: &str) -> AttributeBuilder {
    AttributeBuilder::string(name)
        .plan_modifier(RequiresReplace::create())
        .validator(StringPatternValidator::create(pattern, description))
}

impl GrantResource {
    pub fn new(cluster: ClusterAccess) -> Self {
        Self { cluster }
    }

    pub fn schema_static() -> Schema {
        let privileges = Privilege::spellings();
        let resource_types = ResourceType::spellings();

        SchemaBuilder::new()
            .description("Grants a privilege on a Cassandra resource to a role")
            .attribute(
                AttributeBuilder::string("id")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .description("Hash of the grant")
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("privilege")
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .validator(OneOfValidator::create(&privileges))
                    .description("Privilege to grant")
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("resource_type")
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .validator(OneOfValidator::create(&resource_types))
                    .description("Kind of resource the privilege applies to")
                    .build(),
            )
            .attribute(
                matching("grantee", GRANTEE_PATTERN, "1 to 256 characters without single quotes")
                    .required()
                    .description("Role receiving the privilege")
                    .build(),
            )
            .attribute(
                matching(KEYSPACE_NAME, KEYSPACE_PATTERN, "1 to 48 letters, digits or underscores")
                    .optional()
                    .description("Keyspace qualifying the resource")
                    .build(),
            )
            .attribute(
                matching(
                    TABLE_NAME,
                    TABLE_PATTERN,
                    "a letter or digit followed by up to 255 letters, digits or underscores",
                )
                    .optional()
                    .description("Table the privilege applies to")
                    .build(),
            )
            .attribute(
                matching(ROLE_NAME, GRANTEE_PATTERN, "1 to 256 characters without single quotes")
                    .optional()
                    .description("Role the privilege applies to")
                    .build(),
            )
            .attribute(
                matching(FUNCTION_NAME, OBJECT_PATTERN, "1 to 256 characters without double quotes")
                    .optional()
                    .description("Function the privilege applies to")
                    .build(),
            )
            .attribute(
                matching(MBEAN_NAME, OBJECT_PATTERN, "1 to 256 characters without double quotes")
                    .optional()
                    .description("MBean the privilege applies to")
                    .build(),
            )
            .attribute(
                AttributeBuilder::string(MBEAN_PATTERN)
                    .optional()
                    .plan_modifier(RequiresReplace::create())
                    .validator(Box::new(RegexSyntaxValidator))
                    .description("Regular expression matching mbean names")
                    .build(),
            )
            .build(0)
    }
}

#[async_trait]
impl Resource for GrantResource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Self::schema_static()
    }

    async fn validate(&self, request: ValidateRequest) -> ValidateResponse {
        let mut diagnostics = Diagnostics::new();
        let config = &request.config;

        let is_set = |name: &str| matches!(config.get_string(name), Some(v) if !v.is_empty());
        for (attribute, other) in find_conflicts(is_set) {
            diagnostics.add_attribute_error(
                attribute,
                format!("{} conflicts with {}", attribute, other),
                Some(format!("Only one of {} and {} may be set", attribute, other)),
            );
        }

        // unknown values are checked again at apply time
        if !diagnostics.has_errors() && !config.has_unknowns() {
            if let Err(e) = grant_from(config) {
                diagnostics.add_error(e.to_string(), None::<String>);
            }
        }

        ValidateResponse { diagnostics }
    }

    async fn create(&self, request: CreateRequest) -> CreateResponse {
        let mut diagnostics = Diagnostics::new();
        let planned = request.planned_state;

        let grant = match grant_from(&planned) {
            Ok(grant) => grant,
            Err(e) => {
                diagnostics.add_error(e.to_string(), None::<String>);
                return CreateResponse {
                    state: planned,
                    diagnostics,
                };
            }
        };

        let statement = render(Action::Create, &grant);
        tracing::debug!("Executing: {}", statement);

        if let Err(e) = self.cluster.execute(&request.context, &statement).await {
            diagnostics.extend(client_error(
                &format!("Failed to grant {} to {}", grant.privilege, grant.grantee),
                &e,
            ));
            return CreateResponse {
                state: planned,
                diagnostics,
            };
        }

        tracing::info!("Granted {} on {} to {}", grant.privilege, grant.resource_type, grant.grantee);
        CreateResponse {
            state: planned.with("id", grant.id()),
            diagnostics,
        }
    }

    async fn read(&self, request: ReadRequest) -> ReadResponse {
        let mut diagnostics = Diagnostics::new();
        let current = request.current_state;

        let grant = match grant_from(&current) {
            Ok(grant) => grant,
            Err(e) => {
                diagnostics.add_error(e.to_string(), None::<String>);
                return ReadResponse {
                    state: Some(current),
                    diagnostics,
                };
            }
        };

        let statement = render(Action::Read, &grant);
        tracing::debug!("Executing: {}", statement);

        let result = match self.cluster.session(&request.context).await {
            Ok(session) => cancellable(&request.context, session.count_rows(&statement)).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(0) => {
                tracing::info!("Grant {} no longer exists", grant.id());
                ReadResponse {
                    state: None,
                    diagnostics,
                }
            }
            Ok(_) => ReadResponse {
                state: Some(current.with("id", grant.id())),
                diagnostics,
            },
            Err(e) => {
                diagnostics.extend(client_error("Failed to list grant", &e));
                ReadResponse {
                    state: Some(current),
                    diagnostics,
                }
            }
        }
    }

    async fn update(&self, request: UpdateRequest) -> UpdateResponse {
        let mut diagnostics = Diagnostics::new();
        diagnostics.add_error(
            "Updating of grants is not supported",
            Some("Every grant attribute forces a new grant"),
        );
        UpdateResponse {
            state: request.current_state,
            diagnostics,
        }
    }

    async fn delete(&self, request: DeleteRequest) -> DeleteResponse {
        let mut diagnostics = Diagnostics::new();

        let grant = match grant_from(&request.current_state) {
            Ok(grant) => grant,
            Err(e) => {
                diagnostics.add_error(e.to_string(), None::<String>);
                return DeleteResponse { diagnostics };
            }
        };

        let statement = render(Action::Delete, &grant);
        tracing::debug!("Executing: {}", statement);

        if let Err(e) = self.cluster.execute(&request.context, &statement).await {
            diagnostics.extend(client_error(
                &format!("Failed to revoke {} from {}", grant.privilege, grant.grantee),
                &e,
            ));
        }

        DeleteResponse { diagnostics }
    }
}
