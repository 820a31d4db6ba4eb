use crate::schema::Schema;
use crate::types::{Config, Diagnostics, Dynamic, State};

#[derive(Debug, Clone)]
pub struct PlanModifyRequest {
    pub state: Dynamic,
    pub plan: Dynamic,
    pub config: Dynamic,
    pub attribute_path: String,
}

#[derive(Debug, Clone)]
pub struct PlanModifyResponse {
    pub plan_value: Dynamic,
    pub requires_replace: bool,
    pub diagnostics: Diagnostics,
}

/// Trait for modifying terraform plan behavior
///
/// Plan modifiers run on updates, after defaults have been applied, and can:
/// - Modify the planned value
/// - Mark an attribute as requiring replacement
/// - Add warnings or errors to the plan
pub trait PlanModifier: Send + Sync {
    fn modify_plan(&self, request: PlanModifyRequest) -> PlanModifyResponse;
}

/// Marks an attribute as requiring replacement when it changes
pub struct RequiresReplace;

impl RequiresReplace {
    pub fn create() -> Box<dyn PlanModifier> {
        Box::new(Self)
    }
}

impl PlanModifier for RequiresReplace {
    fn modify_plan(&self, request: PlanModifyRequest) -> PlanModifyResponse {
        let requires_replace = !matches!(
            (&request.state, &request.plan),
            (Dynamic::Null, Dynamic::Null) | (Dynamic::Unknown, _) | (_, Dynamic::Unknown)
        ) && !values_equal(&request.state, &request.plan);

        PlanModifyResponse {
            plan_value: request.plan,
            requires_replace,
            diagnostics: Diagnostics::new(),
        }
    }
}

/// Keeps the prior state value for a computed attribute whose planned value
/// is unknown
pub struct UseStateForUnknown;

impl UseStateForUnknown {
    pub fn create() -> Box<dyn PlanModifier> {
        Box::new(Self)
    }
}

impl PlanModifier for UseStateForUnknown {
    fn modify_plan(&self, request: PlanModifyRequest) -> PlanModifyResponse {
        let plan_value = match (&request.plan, &request.state) {
            (Dynamic::Unknown, state) if !state.is_null() => state.clone(),
            _ => request.plan,
        };

        PlanModifyResponse {
            plan_value,
            requires_replace: false,
            diagnostics: Diagnostics::new(),
        }
    }
}

/// Outcome of planning one resource change
#[derive(Debug, Clone)]
pub struct PlanResult {
    pub planned_state: State,
    pub requires_replace: Vec<String>,
    pub diagnostics: Diagnostics,
}

/// Build the planned state from Terraform's proposed new state.
///
/// Nulls in config take the attribute default; computed attributes with no
/// value become unknown. Plan modifiers only run when a prior state exists.
pub fn plan(schema: &Schema, prior: Option<&State>, proposed: &State, config: &Config) -> PlanResult {
    let mut planned_state = State::new();
    let mut requires_replace = Vec::new();
    let mut diagnostics = Diagnostics::new();

    for (name, attr) in &schema.attributes {
        let config_value = config.get(name).cloned().unwrap_or(Dynamic::Null);
        let mut planned = proposed.get(name).cloned().unwrap_or(Dynamic::Null);

        if config_value.is_null() {
            if let Some(default) = &attr.default {
                planned = default.default_value();
            } else if attr.computed && planned.is_null() {
                planned = Dynamic::Unknown;
            }
        }

        if let Some(prior) = prior {
            let state_value = prior.get(name).cloned().unwrap_or(Dynamic::Null);
            for modifier in &attr.plan_modifiers {
                let response = modifier.modify_plan(PlanModifyRequest {
                    state: state_value.clone(),
                    plan: planned,
                    config: config_value.clone(),
                    attribute_path: name.clone(),
                });
                planned = response.plan_value;
                diagnostics.extend(response.diagnostics);
                if response.requires_replace && !requires_replace.contains(name) {
                    requires_replace.push(name.clone());
                }
            }
        }

        planned_state.values.insert(name.clone(), planned);
    }

    PlanResult {
        planned_state,
        requires_replace,
        diagnostics,
    }
}

/// Helper function to compare two Dynamic values for equality
fn values_equal(a: &Dynamic, b: &Dynamic) -> bool {
    match (a, b) {
        (Dynamic::Null, Dynamic::Null) => true,
        (Dynamic::Bool(a), Dynamic::Bool(b)) => a == b,
        (Dynamic::Number(a), Dynamic::Number(b)) => (a - b).abs() < f64::EPSILON,
        (Dynamic::String(a), Dynamic::String(b)) => a == b,
        (Dynamic::List(a), Dynamic::List(b)) => {
            a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| values_equal(x, y))
        }
        (Dynamic::Map(a), Dynamic::Map(b)) => {
            a.len() == b.len()
                && a.iter()
                    .all(|(k, v)| b.get(k).is_some_and(|v2| values_equal(v, v2)))
        }
        _ => false,
    }
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)]
mod tests {
    use super::*;
    use crate::defaults::StaticDefault;
    use crate::schema::{AttributeBuilder, SchemaBuilder};
    use crate::types::DynamicValue;

    fn request(state: Dynamic, plan: Dynamic) -> PlanModifyRequest {
        PlanModifyRequest {
            state,
            config: plan.clone(),
            plan,
            attribute_path: "name".to_string(),
        }
    }

    #[test]
    fn requires_replace_does_not_trigger_on_same_value() {
        let response = RequiresReplace.modify_plan(request("ks".into(), "ks".into()));
        assert!(!response.requires_replace);
        assert_eq!(response.diagnostics.errors.len(), 0);
    }

    #[test]
    fn requires_replace_triggers_on_different_value() {
        let response = RequiresReplace.modify_plan(request("ks".into(), "other".into()));
        assert!(response.requires_replace);
    }

    #[test]
    fn requires_replace_ignores_null_and_unknown() {
        assert!(
            !RequiresReplace
                .modify_plan(request(Dynamic::Null, Dynamic::Null))
                .requires_replace
        );
        assert!(
            !RequiresReplace
                .modify_plan(request("ks".into(), Dynamic::Unknown))
                .requires_replace
        );
    }

    #[test]
    fn use_state_for_unknown_keeps_prior_value() {
        let response = UseStateForUnknown.modify_plan(request("abc".into(), Dynamic::Unknown));
        assert_eq!(response.plan_value, Dynamic::String("abc".to_string()));

        let response = UseStateForUnknown.modify_plan(request(Dynamic::Null, Dynamic::Unknown));
        assert!(response.plan_value.is_unknown());
    }

    fn keyspace_like_schema() -> Schema {
        SchemaBuilder::new()
            .attribute(
                AttributeBuilder::string("id")
                    .computed()
                    .plan_modifier(UseStateForUnknown::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::string("name")
                    .required()
                    .plan_modifier(RequiresReplace::create())
                    .build(),
            )
            .attribute(
                AttributeBuilder::bool("durable_writes")
                    .optional()
                    .default(StaticDefault::bool(true))
                    .build(),
            )
            .build(0)
    }

    #[test]
    fn plan_on_create_applies_defaults_and_unknowns() {
        let schema = keyspace_like_schema();
        let config = DynamicValue::new().with("name", "ks");
        let proposed = config.clone();

        let result = plan(&schema, None, &proposed, &config);

        assert!(result.requires_replace.is_empty());
        assert!(result.planned_state.get("id").unwrap().is_unknown());
        assert_eq!(result.planned_state.get_bool("durable_writes"), Some(true));
        assert_eq!(result.planned_state.get_string("name"), Some("ks"));
    }

    #[test]
    fn plan_on_rename_requires_replacement() {
        let schema = keyspace_like_schema();
        let prior = DynamicValue::new()
            .with("id", "ks")
            .with("name", "ks")
            .with("durable_writes", true);
        let config = DynamicValue::new().with("name", "ks2");
        let proposed = DynamicValue::new()
            .with("id", "ks")
            .with("name", "ks2")
            .with("durable_writes", true);

        let result = plan(&schema, Some(&prior), &proposed, &config);

        assert_eq!(result.requires_replace, vec!["name".to_string()]);
        assert_eq!(result.planned_state.get_string("id"), Some("ks"));
    }

    #[test]
    fn explicit_config_overrides_default() {
        let schema = keyspace_like_schema();
        let config = DynamicValue::new()
            .with("name", "ks")
            .with("durable_writes", false);

        let result = plan(&schema, None, &config, &config);
        assert_eq!(result.planned_state.get_bool("durable_writes"), Some(false));
    }
}
