//! Schema types and builders for tfplug
//!
//! This module provides the schema system for defining provider and resource
//! schemas: attribute types, per-attribute behavior (validators, plan
//! modifiers, defaults) and config validation against the schema.

use crate::defaults::AttributeDefault;
use crate::plan_modifier::PlanModifier;
use crate::types::{Config, Diagnostics, Dynamic, State};
use crate::validator::Validator;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

/// AttributeType defines the type system for Terraform attributes
/// This must match Terraform's type system exactly
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeType {
    String,
    Number, // Always f64
    Bool,
    List(Box<AttributeType>), // Ordered, allows duplicates
    Set(Box<AttributeType>),  // Unordered, no duplicates
    Map(Box<AttributeType>),  // String keys only
}

impl AttributeType {
    fn json_value(&self) -> serde_json::Value {
        match self {
            AttributeType::String => json!("string"),
            AttributeType::Number => json!("number"),
            AttributeType::Bool => json!("bool"),
            AttributeType::List(inner) => json!(["list", inner.json_value()]),
            AttributeType::Set(inner) => json!(["set", inner.json_value()]),
            AttributeType::Map(inner) => json!(["map", inner.json_value()]),
        }
    }

    /// Type constraint in Terraform's JSON type notation
    pub fn to_json(&self) -> Vec<u8> {
        self.json_value().to_string().into_bytes()
    }

    /// Whether a value conforms to this type. Null and unknown conform to
    /// every type.
    pub fn matches(&self, value: &Dynamic) -> bool {
        match (self, value) {
            (_, Dynamic::Null) | (_, Dynamic::Unknown) => true,
            (AttributeType::String, Dynamic::String(_)) => true,
            (AttributeType::Number, Dynamic::Number(_)) => true,
            (AttributeType::Bool, Dynamic::Bool(_)) => true,
            (AttributeType::List(inner), Dynamic::List(items))
            | (AttributeType::Set(inner), Dynamic::List(items)) => {
                items.iter().all(|item| inner.matches(item))
            }
            (AttributeType::Map(inner), Dynamic::Map(entries)) => {
                entries.values().all(|v| inner.matches(v))
            }
            _ => false,
        }
    }
}

/// Attribute represents a single configuration attribute
#[derive(Clone)]
pub struct Attribute {
    pub name: String,
    pub r#type: AttributeType,
    pub description: String,
    pub required: bool,
    pub optional: bool,
    pub computed: bool,
    pub sensitive: bool,
    pub validators: Vec<Arc<dyn Validator>>,
    pub plan_modifiers: Vec<Arc<dyn PlanModifier>>,
    pub default: Option<Arc<dyn AttributeDefault>>,
}

// Manual Debug implementation since validators/modifiers don't implement Debug
impl std::fmt::Debug for Attribute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Attribute")
            .field("name", &self.name)
            .field("type", &self.r#type)
            .field("required", &self.required)
            .field("optional", &self.optional)
            .field("computed", &self.computed)
            .field("sensitive", &self.sensitive)
            .field(
                "validators",
                &format!("{} validators", self.validators.len()),
            )
            .field(
                "plan_modifiers",
                &format!("{} plan modifiers", self.plan_modifiers.len()),
            )
            .field("default", &self.default.is_some())
            .finish()
    }
}

/// Schema is returned by providers and resources
/// Version is used for state migration
#[derive(Debug, Clone, Default)]
pub struct Schema {
    pub version: i64,
    pub description: String,
    pub attributes: BTreeMap<String, Attribute>,
}

impl Schema {
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes.get(name)
    }

    /// Check a configuration against the schema: unsupported arguments,
    /// missing required arguments, values for computed-only attributes,
    /// type conformance, then attribute validators on known values.
    pub fn validate_config(&self, config: &Config) -> Diagnostics {
        let mut diags = Diagnostics::new();

        let mut unsupported: Vec<&String> = config
            .values
            .keys()
            .filter(|k| !self.attributes.contains_key(*k))
            .collect();
        unsupported.sort();
        for name in unsupported {
            diags.add_attribute_error(
                name,
                "Unsupported argument",
                Some(format!("An argument named \"{}\" is not expected here.", name)),
            );
        }

        for (name, attr) in &self.attributes {
            let value = config.get(name).unwrap_or(&Dynamic::Null);

            if value.is_null() {
                if attr.required {
                    diags.add_attribute_error(
                        name,
                        "Missing required argument",
                        Some(format!("The argument \"{}\" is required.", name)),
                    );
                }
                continue;
            }

            if attr.computed && !attr.optional && !attr.required {
                diags.add_attribute_error(
                    name,
                    "Value for unconfigurable attribute",
                    Some(format!("Can't configure a value for \"{}\".", name)),
                );
                continue;
            }

            if !attr.r#type.matches(value) {
                diags.add_attribute_error(
                    name,
                    "Incorrect attribute value type",
                    Some(format!(
                        "Inappropriate value for attribute \"{}\": got {}",
                        name,
                        value.type_name()
                    )),
                );
                continue;
            }

            if value.is_fully_known() {
                let mut attr_diags = Diagnostics::new();
                for validator in &attr.validators {
                    validator.validate(value, name, &mut attr_diags);
                }
                for mut diag in attr_diags.errors {
                    diag.attribute.get_or_insert_with(|| name.clone());
                    diags.errors.push(diag);
                }
                diags.warnings.extend(attr_diags.warnings);
            }
        }

        diags
    }

    /// Shape a state for Terraform: every schema attribute present (absent
    /// ones as null) and nothing outside the schema.
    pub fn complete(&self, mut state: State) -> State {
        let mut completed = State::new();
        for name in self.attributes.keys() {
            let value = state.values.remove(name).unwrap_or(Dynamic::Null);
            completed.values.insert(name.clone(), value);
        }
        completed
    }
}

/// AttributeBuilder provides fluent API for building attributes
/// ALWAYS use this instead of constructing Attribute directly
pub struct AttributeBuilder {
    attribute: Attribute,
}

impl AttributeBuilder {
    /// Create a new attribute builder
    pub fn new(name: &str, type_: AttributeType) -> Self {
        Self {
            attribute: Attribute {
                name: name.to_string(),
                r#type: type_,
                description: String::new(),
                required: false,
                optional: false,
                computed: false,
                sensitive: false,
                validators: Vec::new(),
                plan_modifiers: Vec::new(),
                default: None,
            },
        }
    }

    pub fn string(name: &str) -> Self {
        Self::new(name, AttributeType::String)
    }

    pub fn number(name: &str) -> Self {
        Self::new(name, AttributeType::Number)
    }

    pub fn bool(name: &str) -> Self {
        Self::new(name, AttributeType::Bool)
    }

    pub fn list(name: &str, element: AttributeType) -> Self {
        Self::new(name, AttributeType::List(Box::new(element)))
    }

    pub fn map(name: &str, element: AttributeType) -> Self {
        Self::new(name, AttributeType::Map(Box::new(element)))
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.attribute.description = desc.to_string();
        self
    }

    pub fn required(mut self) -> Self {
        self.attribute.required = true;
        self.attribute.optional = false;
        self
    }

    pub fn optional(mut self) -> Self {
        self.attribute.optional = true;
        self.attribute.required = false;
        self
    }

    pub fn computed(mut self) -> Self {
        self.attribute.computed = true;
        self
    }

    /// Mark as sensitive (hidden in plan output)
    pub fn sensitive(mut self) -> Self {
        self.attribute.sensitive = true;
        self
    }

    pub fn validator(mut self, validator: Box<dyn Validator>) -> Self {
        self.attribute.validators.push(Arc::from(validator));
        self
    }

    pub fn plan_modifier(mut self, modifier: Box<dyn PlanModifier>) -> Self {
        self.attribute.plan_modifiers.push(Arc::from(modifier));
        self
    }

    /// Set a default; defaulted attributes are computed so that Terraform
    /// accepts the provider-chosen value in the plan.
    pub fn default(mut self, default: Box<dyn AttributeDefault>) -> Self {
        self.attribute.default = Some(Arc::from(default));
        self.attribute.computed = true;
        self
    }

    pub fn build(self) -> Attribute {
        self.attribute
    }
}

/// SchemaBuilder provides fluent API for building schemas
pub struct SchemaBuilder {
    schema: Schema,
}

impl SchemaBuilder {
    pub fn new() -> Self {
        Self {
            schema: Schema::default(),
        }
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.schema.description = desc.to_string();
        self
    }

    pub fn attribute(mut self, attr: Attribute) -> Self {
        self.schema.attributes.insert(attr.name.clone(), attr);
        self
    }

    /// Finalize the schema at the given state version
    pub fn build(mut self, version: i64) -> Schema {
        self.schema.version = version;
        self.schema
    }
}

impl Default for SchemaBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::defaults::StaticDefault;
    use crate::types::DynamicValue;
    use crate::validator::NumberRangeValidator;

    fn test_schema() -> Schema {
        SchemaBuilder::new()
            .description("Test resource schema")
            .attribute(AttributeBuilder::string("id").computed().build())
            .attribute(
                AttributeBuilder::string("name")
                    .description("The name of the resource")
                    .required()
                    .build(),
            )
            .attribute(
                AttributeBuilder::number("port")
                    .optional()
                    .validator(Box::new(NumberRangeValidator {
                        min: Some(1.0),
                        max: Some(65535.0),
                    }))
                    .build(),
            )
            .attribute(
                AttributeBuilder::map("options", AttributeType::String)
                    .optional()
                    .build(),
            )
            .build(1)
    }

    #[test]
    fn attribute_builder_creates_required_string() {
        let attr = AttributeBuilder::string("name")
            .description("The name of the resource")
            .required()
            .build();

        assert_eq!(attr.name, "name");
        assert!(matches!(attr.r#type, AttributeType::String));
        assert!(attr.required);
        assert!(!attr.optional);
    }

    #[test]
    fn default_marks_attribute_computed() {
        let attr = AttributeBuilder::bool("durable_writes")
            .optional()
            .default(StaticDefault::bool(true))
            .build();
        assert!(attr.computed);
        assert!(attr.default.is_some());
    }

    #[test]
    fn type_json_uses_terraform_notation() {
        assert_eq!(AttributeType::String.to_json(), b"\"string\"".to_vec());
        assert_eq!(
            AttributeType::List(Box::new(AttributeType::String)).to_json(),
            br#"["list","string"]"#.to_vec()
        );
        assert_eq!(
            AttributeType::Map(Box::new(AttributeType::String)).to_json(),
            br#"["map","string"]"#.to_vec()
        );
    }

    #[test]
    fn validate_config_reports_missing_and_unsupported() {
        let schema = test_schema();
        let config = DynamicValue::new().with("bogus", "x");

        let diags = schema.validate_config(&config);
        let summaries: Vec<_> = diags.errors.iter().map(|d| d.summary.as_str()).collect();
        assert!(summaries.contains(&"Unsupported argument"));
        assert!(summaries.contains(&"Missing required argument"));
    }

    #[test]
    fn validate_config_rejects_computed_only_values() {
        let schema = test_schema();
        let config = DynamicValue::new().with("name", "a").with("id", "set");

        let diags = schema.validate_config(&config);
        assert_eq!(diags.errors.len(), 1);
        assert_eq!(diags.errors[0].attribute.as_deref(), Some("id"));
    }

    #[test]
    fn validate_config_checks_types_and_validators() {
        let schema = test_schema();

        let config = DynamicValue::new().with("name", "a").with("port", "high");
        let diags = schema.validate_config(&config);
        assert_eq!(diags.errors[0].summary, "Incorrect attribute value type");

        let config = DynamicValue::new().with("name", "a").with("port", 70000.0);
        let diags = schema.validate_config(&config);
        assert_eq!(diags.errors.len(), 1);
        assert_eq!(diags.errors[0].attribute.as_deref(), Some("port"));
    }

    #[test]
    fn validators_skip_unknown_values() {
        let schema = test_schema();
        let config = DynamicValue::new()
            .with("name", Dynamic::Unknown)
            .with("port", Dynamic::Unknown);
        assert!(!schema.validate_config(&config).has_errors());
    }

    #[test]
    fn complete_fills_nulls_and_drops_extras() {
        let schema = test_schema();
        let state = DynamicValue::new().with("name", "a").with("extra", true);

        let completed = schema.complete(state);
        assert_eq!(completed.values.len(), 4);
        assert_eq!(completed.get("port"), Some(&Dynamic::Null));
        assert!(completed.get("extra").is_none());
    }
}
