//! Default value providers for attributes
//!
//! Defaults are evaluated during planning when an attribute is null in
//! configuration. The planned value then carries the default so that the
//! resource sees it on apply.
//!
//! ```no_run
//! use tfplug::defaults::StaticDefault;
//! use tfplug::schema::AttributeBuilder;
//!
//! let port = AttributeBuilder::number("port")
//!     .optional()
//!     .default(StaticDefault::number(9042.0))
//!     .build();
//! ```

use crate::types::Dynamic;

/// AttributeDefault provides the value for an unset optional attribute
pub trait AttributeDefault: Send + Sync {
    /// Human-readable description
    fn description(&self) -> String;
    fn default_value(&self) -> Dynamic;
}

/// StaticDefault provides a static default value
pub struct StaticDefault {
    value: Dynamic,
}

impl StaticDefault {
    pub fn create(value: Dynamic) -> Box<dyn AttributeDefault> {
        Box::new(Self { value })
    }

    pub fn string(value: &str) -> Box<dyn AttributeDefault> {
        Self::create(Dynamic::String(value.to_string()))
    }

    pub fn number(value: f64) -> Box<dyn AttributeDefault> {
        Self::create(Dynamic::Number(value))
    }

    pub fn bool(value: bool) -> Box<dyn AttributeDefault> {
        Self::create(Dynamic::Bool(value))
    }
}

impl AttributeDefault for StaticDefault {
    fn description(&self) -> String {
        format!("static default value: {:?}", self.value)
    }

    fn default_value(&self) -> Dynamic {
        self.value.clone()
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;

    #[test]
    fn static_defaults_return_their_value() {
        assert_eq!(StaticDefault::bool(true).default_value(), Dynamic::Bool(true));
        assert_eq!(
            StaticDefault::number(1000.0).default_value(),
            Dynamic::Number(1000.0)
        );
        assert_eq!(
            StaticDefault::string("TLS1.2").default_value(),
            Dynamic::String("TLS1.2".to_string())
        );
    }

    #[test]
    fn description_names_the_value() {
        assert!(StaticDefault::bool(false).description().contains("false"));
    }
}
