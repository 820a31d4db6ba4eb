//! tfplug - Terraform Plugin Framework for Rust
//!
//! A framework for building Terraform providers in Rust, implementing the
//! managed-resource subset of the Terraform Plugin Protocol v6.

// Core modules
pub mod codec;
pub mod context;
pub mod error;
pub mod schema;
pub mod types;

// Provider API modules
pub mod provider;
pub mod request;
pub mod resource;

// Helper modules
pub mod defaults;
pub mod plan_modifier;
pub mod validator;

// Protocol modules
pub mod grpc;
pub mod proto;
pub mod server;

// Re-exports for convenience
pub use context::Context;
pub use error::{Result, TfplugError};
pub use provider::Provider;
pub use resource::Resource;
pub use schema::{AttributeBuilder, AttributeType, Schema, SchemaBuilder};
pub use server::{serve, ServerConfig};
pub use types::{Config, Diagnostic, Diagnostics, Dynamic, DynamicValue, State};

