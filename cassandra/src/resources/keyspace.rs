use super::{cancellable, client_error, require_string, ClusterAccess};
use crate::client::KeyspaceMetadata;
use crate::cql::{quote_identifier, quote_literal};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tfplug::defaults::StaticDefault;
use tfplug::plan_modifier::{RequiresReplace, UseStateForUnknown};
use tfplug::request::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ImportRequest, ImportResponse,
    ReadRequest, ReadResponse, UpdateRequest, UpdateResponse, ValidateRequest, ValidateResponse,
};
use tfplug::validator::{NonEmptyMapValidator, OneOfValidator, StringPatternValidator, Validator};
use tfplug::{
    AttributeBuilder, AttributeType, Diagnostics, Dynamic, Resource, Schema, SchemaBuilder, State,
};

pub const TYPE_NAME: &str = "cassandra_keyspace";

const NAME_PATTERN: &str = r"^[a-zA-Z0-9_]{1,48}$";
const NAME_DESCRIPTION: &str = "1 to 48 letters, digits or underscores";
const STRATEGIES: [&str; 2] = ["SimpleStrategy", "NetworkTopologyStrategy"];

pub struct KeyspaceResource {
    cluster: ClusterAccess,
}

/// Desired keyspace settings taken from a plan
#[derive(Debug, Clone, PartialEq, Eq)]
struct KeyspaceSpec {
    name: String,
    replication_strategy: String,
    strategy_options: BTreeMap<String, String>,
    durable_writes: bool,
}

impl KeyspaceSpec {
    fn from_state(state: &State, diagnostics: &mut Diagnostics) -> Option<Self> {
        let name = require_string(state, "name", diagnostics);
        let replication_strategy = require_string(state, "replication_strategy", diagnostics);

        Some(Self {
            name: name?,
            replication_strategy: replication_strategy?,
            strategy_options: state.get_string_map("strategy_options").unwrap_or_default(),
            durable_writes: state.get_bool("durable_writes").unwrap_or(true),
        })
    }

    /// `CREATE` or `ALTER` statement for this keyspace. The name is quoted so
    /// Cassandra keeps its case.
    fn statement(&self, verb: &str) -> String {
        let mut replication = vec![format!(
            "'class' : {}",
            quote_literal(&self.replication_strategy)
        )];
        replication.extend(
            self.strategy_options
                .iter()
                .map(|(key, value)| format!("{} : {}", quote_literal(key), quote_literal(value))),
        );

        format!(
            "{} KEYSPACE {} WITH REPLICATION = {{ {} }} AND DURABLE_WRITES = {}",
            verb,
            quote_identifier(&self.name),
            replication.join(", "),
            self.durable_writes
        )
    }
}

fn state_from_metadata(metadata: KeyspaceMetadata) -> State {
    State::new()
        .with("id", metadata.name.as_str())
        .with("name", metadata.name)
        .with("replication_strategy", metadata.strategy_class)
        .with("strategy_options", metadata.strategy_options)
        .with("durable_writes", metadata.durable_writes)
}

impl KeyspaceResource {
    pub fn new(cluster: ClusterAccess) -> Self {
        Self { cluster }
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .description("Manages a Cassandra keyspace")
            .attribute(
                AttributeBuilder::string("id")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .description("Keyspace name")
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("name")
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .validator(StringPatternValidator::create(NAME_PATTERN, NAME_DESCRIPTION))
                    .description("Name of the keyspace")
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("replication_strategy")
                    .required()
                    .validator(OneOfValidator::create(&STRATEGIES))
                    .description("Replication strategy class")
                    .build(),
            )
            .attribute(
                AttributeBuilder::map("strategy_options", AttributeType::String)
                    .required()
                    .validator(Box::new(NonEmptyMapValidator))
                    .description("Options of the replication strategy, e.g. replication_factor")
                    .build(),
            )
            .attribute(
                AttributeBuilder::bool("durable_writes")
                    .optional()
                    .default(StaticDefault::bool(true))
                    .description("Write to the commit log for this keyspace")
                    .build(),
            )
            .build(0)
    }

    async fn apply(
        &self,
        verb: &str,
        context: &tfplug::Context,
        planned: State,
    ) -> (State, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let Some(spec) = KeyspaceSpec::from_state(&planned, &mut diagnostics) else {
            return (planned, diagnostics);
        };

        let statement = spec.statement(verb);
        tracing::debug!("Executing: {}", statement);

        if let Err(e) = self.cluster.execute(context, &statement).await {
            diagnostics.extend(client_error(
                &format!("Failed to {} keyspace {}", verb.to_lowercase(), spec.name),
                &e,
            ));
            return (planned, diagnostics);
        }

        tracing::info!("{} KEYSPACE {} succeeded", verb, spec.name);
        (planned.with("id", spec.name), diagnostics)
    }
}

#[async_trait]
impl Resource for KeyspaceResource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Self::schema_static()
    }

    async fn validate(&self, request: ValidateRequest) -> ValidateResponse {
        let mut diagnostics = Diagnostics::new();

        if request.config.get_string("name") == Some("system") {
            diagnostics.add_attribute_error(
                "name",
                "name must not be system",
                Some("The system keyspace is managed by Cassandra itself"),
            );
        }

        ValidateResponse { diagnostics }
    }

    async fn create(&self, request: CreateRequest) -> CreateResponse {
        let (state, diagnostics) = self
            .apply("CREATE", &request.context, request.planned_state)
            .await;
        CreateResponse { state, diagnostics }
    }

    async fn read(&self, request: ReadRequest) -> ReadResponse {
        let mut diagnostics = Diagnostics::new();
        let name = request
            .current_state
            .get_string("name")
            .or_else(|| request.current_state.get_string("id"))
            .unwrap_or_default()
            .to_string();

        let result = match self.cluster.session(&request.context).await {
            Ok(session) => cancellable(&request.context, session.keyspace(&name)).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(Some(metadata)) => ReadResponse {
                state: Some(state_from_metadata(metadata)),
                diagnostics,
            },
            Ok(None) => {
                tracing::info!("Keyspace {} no longer exists", name);
                ReadResponse {
                    state: None,
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.extend(client_error(
                    &format!("Failed to read keyspace {}", name),
                    &e,
                ));
                ReadResponse {
                    state: Some(request.current_state),
                    diagnostics,
                }
            }
        }
    }

    async fn update(&self, request: UpdateRequest) -> UpdateResponse {
        let (state, diagnostics) = self
            .apply("ALTER", &request.context, request.planned_state)
            .await;
        UpdateResponse { state, diagnostics }
    }

    async fn delete(&self, request: DeleteRequest) -> DeleteResponse {
        let mut diagnostics = Diagnostics::new();
        let Some(name) = require_string(&request.current_state, "name", &mut diagnostics) else {
            return DeleteResponse { diagnostics };
        };

        let statement = format!("DROP KEYSPACE {}", quote_identifier(&name));
        tracing::debug!("Executing: {}", statement);

        if let Err(e) = self.cluster.execute(&request.context, &statement).await {
            diagnostics.extend(client_error(&format!("Failed to drop keyspace {}", name), &e));
        }

        DeleteResponse { diagnostics }
    }

    async fn import_state(&self, request: ImportRequest) -> ImportResponse {
        let mut diagnostics = Diagnostics::new();

        StringPatternValidator::new(NAME_PATTERN, NAME_DESCRIPTION).validate(
            &Dynamic::String(request.id.clone()),
            "id",
            &mut diagnostics,
        );
        if diagnostics.has_errors() {
            return ImportResponse {
                state: None,
                diagnostics,
            };
        }

        ImportResponse {
            state: Some(
                State::new()
                    .with("id", request.id.as_str())
                    .with("name", request.id.as_str()),
            ),
            diagnostics,
        }
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    fn spec() -> KeyspaceSpec {
        KeyspaceSpec {
            name: "shop".to_string(),
            replication_strategy: "NetworkTopologyStrategy".to_string(),
            strategy_options: BTreeMap::from([
                ("dc2".to_string(), "2".to_string()),
                ("dc1".to_string(), "3".to_string()),
            ]),
            durable_writes: false,
        }
    }

    #[test]
    fn options_are_rendered_in_key_order() {
        assert_eq!(
            spec().statement("CREATE"),
            r#"CREATE KEYSPACE "shop" WITH REPLICATION = { 'class' : 'NetworkTopologyStrategy', 'dc1' : '3', 'dc2' : '2' } AND DURABLE_WRITES = false"#
        );
        assert!(spec().statement("ALTER").starts_with(r#"ALTER KEYSPACE "shop" "#));
    }

    #[test]
    fn mixed_case_name_is_quoted() {
        let spec = KeyspaceSpec {
            name: "MyShop".to_string(),
            ..spec()
        };
        assert!(spec
            .statement("CREATE")
            .starts_with(r#"CREATE KEYSPACE "MyShop" WITH REPLICATION"#));
    }

    #[test]
    fn option_quotes_are_escaped() {
        let spec = KeyspaceSpec {
            strategy_options: BTreeMap::from([("dc'1".to_string(), "it's".to_string())]),
            ..spec()
        };
        assert!(spec
            .statement("ALTER")
            .contains("'dc''1' : 'it''s' }"));
    }

    #[tokio::test]
    async fn import_rejects_names_outside_the_pattern() {
        let resource = KeyspaceResource::new(ClusterAccess::default());
        let response = resource
            .import_state(ImportRequest {
                context: tfplug::Context::new(),
                id: "my-shop".to_string(),
            })
            .await;

        assert!(response.state.is_none());
        assert_eq!(
            response.diagnostics.errors[0].summary,
            format!("id must match {}", NAME_DESCRIPTION)
        );
    }

    #[test]
    fn spec_requires_name_and_strategy() {
        let mut diagnostics = Diagnostics::new();
        let state = State::new().with("name", "shop");
        assert!(KeyspaceSpec::from_state(&state, &mut diagnostics).is_none());
        assert_eq!(
            diagnostics.errors[0].attribute.as_deref(),
            Some("replication_strategy")
        );
    }

    #[test]
    fn schema_shape() {
        let schema = KeyspaceResource::schema_static();
        assert!(schema.attribute("id").unwrap().computed);
        assert!(schema.attribute("name").unwrap().required);
        let durable = schema.attribute("durable_writes").unwrap();
        assert!(durable.optional && durable.computed);
    }
}
