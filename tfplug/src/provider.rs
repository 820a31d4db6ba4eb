use crate::request::{ConfigureRequest, ConfigureResponse, ValidateRequest, ValidateResponse};
use crate::resource::Resource;
use crate::schema::Schema;
use crate::Result;
use async_trait::async_trait;
use std::collections::BTreeMap;

#[async_trait]
pub trait Provider: Send + Sync + 'static {
    /// Prefix of every resource type, e.g. "cassandra"
    fn type_name(&self) -> &str;

    fn schema(&self) -> Schema;

    /// Schema of every resource type keyed by its full type name
    fn resource_schemas(&self) -> BTreeMap<String, Schema>;

    /// Cross-attribute validation of the provider block
    async fn validate(&self, _request: ValidateRequest) -> ValidateResponse {
        ValidateResponse::default()
    }

    /// Called once per run, before any resource operation that needs the
    /// remote system
    async fn configure(&mut self, request: ConfigureRequest) -> ConfigureResponse;

    /// Resource handler for a type name; unknown names are ResourceNotFound
    fn create_resource(&self, type_name: &str) -> Result<Box<dyn Resource>>;
}
