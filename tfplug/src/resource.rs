//! Resource trait
//!
//! A resource maps one Terraform resource type onto CRUD operations against
//! the remote system. The gRPC service decodes wire values, applies schema
//! rules and planning, then calls into these methods.

use crate::request::{
    CreateRequest, CreateResponse, DeleteRequest, DeleteResponse, ImportRequest, ImportResponse,
    ReadRequest, ReadResponse, UpdateRequest, UpdateResponse, ValidateRequest, ValidateResponse,
};
use crate::schema::Schema;
use crate::types::Diagnostics;
use async_trait::async_trait;

/// Base trait for resources - implement CRUD operations
/// Type name should be constant and match the provider's resource_schemas key
#[async_trait]
pub trait Resource: Send + Sync {
    /// Type name should be constant (e.g., "cassandra_keyspace")
    fn type_name(&self) -> &str;

    /// Cache this in your implementation
    fn schema(&self) -> Schema;

    /// Cross-attribute validation, run after the schema checks pass
    async fn validate(&self, _request: ValidateRequest) -> ValidateResponse {
        ValidateResponse::default()
    }

    /// MUST populate all attributes in the returned state (including computed)
    async fn create(&self, request: CreateRequest) -> CreateResponse;

    /// MUST return None if the remote object no longer exists
    async fn read(&self, request: ReadRequest) -> ReadResponse;

    async fn update(&self, request: UpdateRequest) -> UpdateResponse;

    async fn delete(&self, request: DeleteRequest) -> DeleteResponse;

    /// Resources that support `terraform import` override this
    async fn import_state(&self, _request: ImportRequest) -> ImportResponse {
        let mut diagnostics = Diagnostics::new();
        diagnostics.add_error(
            "Resource import not supported",
            Some(format!(
                "The resource type {} does not support import.",
                self.type_name()
            )),
        );
        ImportResponse {
            state: None,
            diagnostics,
        }
    }
}
