use super::{cancellable, client_error, require_string, ClusterAccess};
use crate::client::RoleMetadata;
use crate::cql::quote_literal;
use async_trait::async_trait;
use tfplug::defaults::StaticDefault;
use tfplug::plan_modifier::{RequiresReplace, UseStateForUnknown};
use tfplug::request::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ImportRequest, ImportResponse,
    ReadRequest, ReadResponse, UpdateRequest, UpdateResponse,
};
use tfplug::validator::{StringPatternValidator, Validator};
use tfplug::{
    AttributeBuilder, Context, Diagnostics, Dynamic, Resource, Schema, SchemaBuilder, State,
};

pub const TYPE_NAME: &str = "cassandra_role";

const NAME_PATTERN: &str = r"^[^']{1,256}$";
const NAME_DESCRIPTION: &str = "1 to 256 characters without single quotes";
const PASSWORD_PATTERN: &str = r"^[^']{40,512}$";

pub struct RoleResource {
    cluster: ClusterAccess,
}

struct RoleSpec {
    name: String,
    password: String,
    super_user: bool,
    login: bool,
}

impl RoleSpec {
    fn from_state(state: &State, diagnostics: &mut Diagnostics) -> Option<Self> {
        let name = require_string(state, "name", diagnostics);
        let password = require_string(state, "password", diagnostics);

        Some(Self {
            name: name?,
            password: password?,
            super_user: state.get_bool("super_user").unwrap_or(false),
            login: state.get_bool("login").unwrap_or(true),
        })
    }

    fn statement(&self, verb: &str) -> String {
        format!(
            "{} ROLE {} WITH PASSWORD = {} AND LOGIN = {} AND SUPERUSER = {}",
            verb,
            quote_literal(&self.name),
            quote_literal(&self.password),
            self.login,
            self.super_user
        )
    }
}

/// Refresh state from the cluster. The password cannot be read back, so the
/// one already in state is kept.
fn refreshed_state(current: &State, metadata: RoleMetadata) -> State {
    let password = current
        .get("password")
        .cloned()
        .unwrap_or(Dynamic::Null);

    State::new()
        .with("id", metadata.name.as_str())
        .with("name", metadata.name)
        .with("password", password)
        .with("super_user", metadata.is_superuser)
        .with("login", metadata.can_login)
}

impl RoleResource {
    pub fn new(cluster: ClusterAccess) -> Self {
        Self { cluster }
    }

    pub fn schema_static() -> Schema {
        SchemaBuilder::new()
            .description("Manages a Cassandra role")
            .attribute(
                AttributeBuilder::string("id")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .description("Role name")
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("name")
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .validator(StringPatternValidator::create(NAME_PATTERN, NAME_DESCRIPTION))
                    .description("Name of the role")
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("password")
                    .required()
                    .sensitive()
                    .validator(StringPatternValidator::create(
                        PASSWORD_PATTERN,
                        "40 to 512 characters without single quotes",
                    ))
                    .description("Password of the role")
                    .build(),
            )
            .attribute(
                AttributeBuilder::bool("super_user")
                    .optional()
                    .default(StaticDefault::bool(false))
                    .description("Whether the role is a superuser")
                    .build(),
            )
            .attribute(
                AttributeBuilder::bool("login")
                    .optional()
                    .default(StaticDefault::bool(true))
                    .description("Whether the role may log in")
                    .build(),
            )
            .build(0)
    }

    async fn apply(&self, verb: &str, context: &Context, planned: State) -> (State, Diagnostics) {
        let mut diagnostics = Diagnostics::new();
        let Some(spec) = RoleSpec::from_state(&planned, &mut diagnostics) else {
            return (planned, diagnostics);
        };

        // the statement carries the password, log only the role
        tracing::debug!("Executing: {} ROLE '{}'", verb, spec.name);

        if let Err(e) = self.cluster.execute(context, &spec.statement(verb)).await {
            diagnostics.extend(client_error(
                &format!("Failed to {} role {}", verb.to_lowercase(), spec.name),
                &e,
            ));
            return (planned, diagnostics);
        }

        tracing::info!("{} ROLE {} succeeded", verb, spec.name);
        (planned.with("id", spec.name), diagnostics)
    }
}

#[async_trait]
impl Resource for RoleResource {
    fn type_name(&self) -> &str {
        TYPE_NAME
    }

    fn schema(&self) -> Schema {
        Self::schema_static()
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
            Ok(session) => cancellable(&request.context, session.role(&name)).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(Some(metadata)) => ReadResponse {
                state: Some(refreshed_state(&request.current_state, metadata)),
                diagnostics,
            },
            Ok(None) => {
                tracing::info!("Role {} no longer exists", name);
                ReadResponse {
                    state: None,
                    diagnostics,
                }
            }
            Err(e) => {
                diagnostics.extend(client_error(&format!("Failed to read role {}", name), &e));
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

        let statement = format!("DROP ROLE {}", quote_literal(&name));
        tracing::debug!("Executing: {}", statement);

        if let Err(e) = self.cluster.execute(&request.context, &statement).await {
            diagnostics.extend(client_error(&format!("Failed to drop role {}", name), &e));
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

    #[test]
    fn statement_renders_flags() {
        let spec = RoleSpec {
            name: "reporting".to_string(),
            password: "p".repeat(40),
            super_user: false,
            login: true,
        };
        assert_eq!(
            spec.statement("CREATE"),
            format!(
                "CREATE ROLE 'reporting' WITH PASSWORD = '{}' AND LOGIN = true AND SUPERUSER = false",
                "p".repeat(40)
            )
        );
    }

    #[test]
    fn refresh_keeps_configured_password() {
        let current = State::new()
            .with("name", "reporting")
            .with("password", "configured");
        let state = refreshed_state(
            &current,
            RoleMetadata {
                name: "reporting".to_string(),
                can_login: false,
                is_superuser: true,
            },
        );

        assert_eq!(state.get_string("password"), Some("configured"));
        assert_eq!(state.get_bool("login"), Some(false));
        assert_eq!(state.get_bool("super_user"), Some(true));
        assert_eq!(state.get_string("id"), Some("reporting"));
    }

    #[tokio::test]
    async fn import_rejects_quoted_names() {
        let resource = RoleResource::new(ClusterAccess::default());
        let response = resource
            .import_state(ImportRequest {
                context: Context::new(),
                id: "o'neil".to_string(),
            })
            .await;

        assert!(response.state.is_none());
        assert_eq!(
            response.diagnostics.errors[0].summary,
            format!("id must match {}", NAME_DESCRIPTION)
        );
    }

    #[test]
    fn password_is_sensitive() {
        let schema = RoleResource::schema_static();
        assert!(schema.attribute("password").unwrap().sensitive);
    }
}
