//! gRPC service implementation of the Terraform Plugin Protocol v6
//!
//! The service decodes wire values, checks them against the schemas the
//! provider publishes, performs planning and dispatches CRUD calls to the
//! resource handlers the provider creates on demand.

use crate::codec;
use crate::context::Context;
use crate::plan_modifier;
use crate::proto::{
    self, attribute_path, diagnostic, get_metadata, get_provider_schema, import_resource_state,
    provider_server::{Provider as ProtoProvider, ProviderServer},
    apply_resource_change, configure_provider, plan_resource_change, read_resource,
    stop_provider, upgrade_resource_state, validate_provider_config, validate_resource_config,
};
use crate::provider::Provider;
use crate::request::{
    ConfigureRequest, CreateRequest, DeleteRequest, ImportRequest, ReadRequest, UpdateRequest,
    ValidateRequest,
};
use crate::schema::{Attribute, Schema};
use crate::types::{Diagnostic, Diagnostics, DynamicValue};
use crate::TfplugError;
use std::sync::Arc;
use tokio::sync::RwLock;
use tonic::{Request, Response, Status};
use tracing::{debug, info, warn};

type RpcResult<T> = std::result::Result<Response<T>, Status>;

pub struct ProviderService<P: Provider> {
    provider: Arc<RwLock<P>>,
    stop: Context,
}

impl<P: Provider> ProviderService<P> {
    pub fn new(provider: P) -> Self {
        Self {
            provider: Arc::new(RwLock::new(provider)),
            stop: Context::new(),
        }
    }

    /// Context cancelled by StopProvider
    pub fn context(&self) -> Context {
        self.stop.clone()
    }

    pub fn into_server(self) -> ProviderServer<Self> {
        ProviderServer::new(self)
    }

    async fn resource_schema(&self, type_name: &str) -> std::result::Result<Schema, Status> {
        let provider = self.provider.read().await;
        provider
            .resource_schemas()
            .remove(type_name)
            .ok_or_else(|| TfplugError::ResourceNotFound(type_name.to_string()).into())
    }

    async fn resource(
        &self,
        type_name: &str,
    ) -> std::result::Result<Box<dyn crate::resource::Resource>, Status> {
        let provider = self.provider.read().await;
        Ok(provider.create_resource(type_name)?)
    }
}

#[tonic::async_trait]
impl<P: Provider> ProtoProvider for ProviderService<P> {
    async fn get_metadata(
        &self,
        _request: Request<get_metadata::Request>,
    ) -> RpcResult<get_metadata::Response> {
        let provider = self.provider.read().await;
        let resources = provider
            .resource_schemas()
            .into_keys()
            .map(|type_name| get_metadata::ResourceMetadata { type_name })
            .collect();

        Ok(Response::new(get_metadata::Response {
            server_capabilities: Some(server_capabilities()),
            diagnostics: vec![],
            resources,
        }))
    }

    async fn get_provider_schema(
        &self,
        _request: Request<get_provider_schema::Request>,
    ) -> RpcResult<get_provider_schema::Response> {
        let provider = self.provider.read().await;
        let resource_schemas = provider
            .resource_schemas()
            .iter()
            .map(|(name, schema)| (name.clone(), schema_to_proto(schema)))
            .collect();

        Ok(Response::new(get_provider_schema::Response {
            provider: Some(schema_to_proto(&provider.schema())),
            resource_schemas,
            data_source_schemas: Default::default(),
            diagnostics: vec![],
            server_capabilities: Some(server_capabilities()),
        }))
    }

    async fn validate_provider_config(
        &self,
        request: Request<validate_provider_config::Request>,
    ) -> RpcResult<validate_provider_config::Response> {
        let req = request.into_inner();
        let config = decode_object(&req.config)?.unwrap_or_default();

        let provider = self.provider.read().await;
        let mut diagnostics = provider.schema().validate_config(&config);
        if !diagnostics.has_errors() {
            let response = provider
                .validate(ValidateRequest {
                    context: self.stop.clone(),
                    config,
                })
                .await;
            diagnostics.extend(response.diagnostics);
        }

        Ok(Response::new(validate_provider_config::Response {
            diagnostics: convert_diagnostics(diagnostics),
        }))
    }

    async fn validate_resource_config(
        &self,
        request: Request<validate_resource_config::Request>,
    ) -> RpcResult<validate_resource_config::Response> {
        let req = request.into_inner();
        debug!(type_name = %req.type_name, "validate_resource_config");

        let schema = self.resource_schema(&req.type_name).await?;
        let config = decode_object(&req.config)?.unwrap_or_default();

        let mut diagnostics = schema.validate_config(&config);
        if !diagnostics.has_errors() {
            let resource = self.resource(&req.type_name).await?;
            let response = resource
                .validate(ValidateRequest {
                    context: self.stop.clone(),
                    config,
                })
                .await;
            diagnostics.extend(response.diagnostics);
        }

        Ok(Response::new(validate_resource_config::Response {
            diagnostics: convert_diagnostics(diagnostics),
        }))
    }

    async fn upgrade_resource_state(
        &self,
        request: Request<upgrade_resource_state::Request>,
    ) -> RpcResult<upgrade_resource_state::Response> {
        let req = request.into_inner();
        debug!(type_name = %req.type_name, version = req.version, "upgrade_resource_state");

        let schema = self.resource_schema(&req.type_name).await?;
        let raw = req.raw_state.unwrap_or_default();

        if raw.json.is_empty() {
            let mut diagnostics = Diagnostics::new();
            if !raw.flatmap.is_empty() {
                diagnostics.add_error(
                    "Unsupported state format",
                    Some("Legacy flatmap state cannot be upgraded by this provider."),
                );
            }
            return Ok(Response::new(upgrade_resource_state::Response {
                upgraded_state: None,
                diagnostics: convert_diagnostics(diagnostics),
            }));
        }

        let state = schema.complete(codec::decode_json(&raw.json)?);
        Ok(Response::new(upgrade_resource_state::Response {
            upgraded_state: Some(encode_object(&state)?),
            diagnostics: vec![],
        }))
    }

    async fn configure_provider(
        &self,
        request: Request<configure_provider::Request>,
    ) -> RpcResult<configure_provider::Response> {
        let req = request.into_inner();
        let config = decode_object(&req.config)?.unwrap_or_default();
        info!(terraform_version = %req.terraform_version, "configuring provider");

        let mut provider = self.provider.write().await;
        let response = provider
            .configure(ConfigureRequest {
                context: self.stop.clone(),
                config,
            })
            .await;

        if response.diagnostics.has_errors() {
            warn!("provider configuration failed");
        }

        Ok(Response::new(configure_provider::Response {
            diagnostics: convert_diagnostics(response.diagnostics),
        }))
    }

    async fn read_resource(
        &self,
        request: Request<read_resource::Request>,
    ) -> RpcResult<read_resource::Response> {
        let req = request.into_inner();
        debug!(type_name = %req.type_name, "read_resource");

        let schema = self.resource_schema(&req.type_name).await?;
        let Some(current_state) = decode_object(&req.current_state)? else {
            return Ok(Response::new(read_resource::Response {
                new_state: Some(null_value()),
                diagnostics: vec![],
                private: req.private,
            }));
        };

        let resource = self.resource(&req.type_name).await?;
        let response = resource
            .read(ReadRequest {
                context: self.stop.clone(),
                current_state,
            })
            .await;

        let new_state = match response.state {
            Some(state) => encode_object(&schema.complete(state))?,
            None => {
                debug!(type_name = %req.type_name, "resource no longer exists");
                null_value()
            }
        };

        Ok(Response::new(read_resource::Response {
            new_state: Some(new_state),
            diagnostics: convert_diagnostics(response.diagnostics),
            private: req.private,
        }))
    }

    async fn plan_resource_change(
        &self,
        request: Request<plan_resource_change::Request>,
    ) -> RpcResult<plan_resource_change::Response> {
        let req = request.into_inner();
        debug!(type_name = %req.type_name, "plan_resource_change");

        let schema = self.resource_schema(&req.type_name).await?;
        let prior_state = decode_object(&req.prior_state)?;

        let Some(proposed) = decode_object(&req.proposed_new_state)? else {
            // destroy
            return Ok(Response::new(plan_resource_change::Response {
                planned_state: Some(null_value()),
                requires_replace: vec![],
                planned_private: req.prior_private,
                diagnostics: vec![],
                legacy_type_system: false,
            }));
        };
        let config = decode_object(&req.config)?.unwrap_or_default();

        let result = plan_modifier::plan(&schema, prior_state.as_ref(), &proposed, &config);
        let requires_replace = result
            .requires_replace
            .iter()
            .map(|name| attribute_step_path(name))
            .collect();

        Ok(Response::new(plan_resource_change::Response {
            planned_state: Some(encode_object(&result.planned_state)?),
            requires_replace,
            planned_private: req.prior_private,
            diagnostics: convert_diagnostics(result.diagnostics),
            legacy_type_system: false,
        }))
    }

    async fn apply_resource_change(
        &self,
        request: Request<apply_resource_change::Request>,
    ) -> RpcResult<apply_resource_change::Response> {
        let req = request.into_inner();
        let schema = self.resource_schema(&req.type_name).await?;
        let resource = self.resource(&req.type_name).await?;

        let prior_state = decode_object(&req.prior_state)?;
        let planned_state = decode_object(&req.planned_state)?;
        let config = decode_object(&req.config)?.unwrap_or_default();
        let context = self.stop.clone();

        let (new_state, diagnostics) = match (prior_state, planned_state) {
            (None, Some(planned_state)) => {
                debug!(type_name = %req.type_name, "create");
                let response = resource
                    .create(CreateRequest {
                        context,
                        config,
                        planned_state,
                    })
                    .await;
                let state = (!response.diagnostics.has_errors()).then_some(response.state);
                (state, response.diagnostics)
            }
            (Some(current_state), Some(planned_state)) => {
                debug!(type_name = %req.type_name, "update");
                let response = resource
                    .update(UpdateRequest {
                        context,
                        config,
                        planned_state,
                        current_state: current_state.clone(),
                    })
                    .await;
                if response.diagnostics.has_errors() {
                    (Some(current_state), response.diagnostics)
                } else {
                    (Some(response.state), response.diagnostics)
                }
            }
            (Some(current_state), None) => {
                debug!(type_name = %req.type_name, "delete");
                let response = resource
                    .delete(DeleteRequest {
                        context,
                        current_state: current_state.clone(),
                    })
                    .await;
                let state = response.diagnostics.has_errors().then_some(current_state);
                (state, response.diagnostics)
            }
            (None, None) => (None, Diagnostics::new()),
        };

        let new_state = match new_state {
            Some(state) => encode_object(&schema.complete(state))?,
            None => null_value(),
        };

        Ok(Response::new(apply_resource_change::Response {
            new_state: Some(new_state),
            private: req.planned_private,
            diagnostics: convert_diagnostics(diagnostics),
            legacy_type_system: false,
        }))
    }

    async fn import_resource_state(
        &self,
        request: Request<import_resource_state::Request>,
    ) -> RpcResult<import_resource_state::Response> {
        let req = request.into_inner();
        debug!(type_name = %req.type_name, id = %req.id, "import_resource_state");

        let schema = self.resource_schema(&req.type_name).await?;
        let resource = self.resource(&req.type_name).await?;
        let response = resource
            .import_state(ImportRequest {
                context: self.stop.clone(),
                id: req.id,
            })
            .await;

        let imported_resources = match response.state {
            Some(state) if !response.diagnostics.has_errors() => {
                vec![import_resource_state::ImportedResource {
                    type_name: req.type_name,
                    state: Some(encode_object(&schema.complete(state))?),
                    private: vec![],
                }]
            }
            _ => vec![],
        };

        Ok(Response::new(import_resource_state::Response {
            imported_resources,
            diagnostics: convert_diagnostics(response.diagnostics),
        }))
    }

    async fn stop_provider(
        &self,
        _request: Request<stop_provider::Request>,
    ) -> RpcResult<stop_provider::Response> {
        info!("stop requested, cancelling in-flight operations");
        self.stop.cancel();
        Ok(Response::new(stop_provider::Response {
            error: String::new(),
        }))
    }
}

fn server_capabilities() -> proto::ServerCapabilities {
    proto::ServerCapabilities {
        plan_destroy: true,
        get_provider_schema_optional: false,
        move_resource_state: false,
    }
}

fn schema_to_proto(schema: &Schema) -> proto::Schema {
    proto::Schema {
        version: schema.version,
        block: Some(proto::schema::Block {
            version: schema.version,
            attributes: schema.attributes.values().map(attribute_to_proto).collect(),
            description: schema.description.clone(),
            description_kind: proto::StringKind::Plain as i32,
            deprecated: false,
        }),
    }
}

fn attribute_to_proto(attr: &Attribute) -> proto::schema::Attribute {
    proto::schema::Attribute {
        name: attr.name.clone(),
        r#type: attr.r#type.to_json(),
        description: attr.description.clone(),
        required: attr.required,
        optional: attr.optional,
        computed: attr.computed,
        sensitive: attr.sensitive,
        description_kind: proto::StringKind::Plain as i32,
        deprecated: false,
    }
}

/// Decode an object value; None when Terraform sent no object (null)
fn decode_object(
    value: &Option<proto::DynamicValue>,
) -> std::result::Result<Option<DynamicValue>, Status> {
    let Some(value) = value else {
        return Ok(None);
    };
    let decoded = if !value.msgpack.is_empty() {
        codec::decode_msgpack(&value.msgpack)?
    } else if !value.json.is_empty() {
        codec::decode_json(&value.json)?
    } else {
        return Ok(None);
    };
    Ok((!decoded.values.is_empty()).then_some(decoded))
}

fn encode_object(value: &DynamicValue) -> std::result::Result<proto::DynamicValue, Status> {
    Ok(proto::DynamicValue {
        msgpack: codec::encode_msgpack(value)?,
        json: vec![],
    })
}

fn null_value() -> proto::DynamicValue {
    proto::DynamicValue {
        msgpack: codec::encode_null(),
        json: vec![],
    }
}

fn attribute_step_path(name: &str) -> proto::AttributePath {
    proto::AttributePath {
        steps: vec![attribute_path::Step {
            selector: Some(attribute_path::step::Selector::AttributeName(
                name.to_string(),
            )),
        }],
    }
}

fn convert_diagnostic(diag: Diagnostic, severity: diagnostic::Severity) -> proto::Diagnostic {
    proto::Diagnostic {
        severity: severity as i32,
        summary: diag.summary,
        detail: diag.detail.unwrap_or_default(),
        attribute: diag.attribute.as_deref().map(attribute_step_path),
    }
}

fn convert_diagnostics(diags: Diagnostics) -> Vec<proto::Diagnostic> {
    diags
        .errors
        .into_iter()
        .map(|d| convert_diagnostic(d, diagnostic::Severity::Error))
        .chain(
            diags
                .warnings
                .into_iter()
                .map(|d| convert_diagnostic(d, diagnostic::Severity::Warning)),
        )
        .collect()
}
