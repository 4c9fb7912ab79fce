//! C4 — variable context: Terraform variables → TOSCA inputs, and the
//! `(resource_address, property) → variable_name` reference map that
//! drives the "concrete in metadata, symbolic in properties" resolution
//! rule.
//!
//! Ground: `original_source/src/plugins/terraform/variables.py`
//! (`VariableExtractor`, `VariableReferenceTracker`, `PropertyResolver`).

use std::collections::HashMap;

use indexmap::IndexMap;
use serde_json::{json, Value};

use crate::model::ParameterDefinition;
use crate::plan::ParsedPlan;

/// Which kind of template field a value is destined for. Metadata never
/// resolves to `$get_input` — it must always be concrete (§4.6 shared
/// conventions: "Metadata values are always concrete").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveContext {
    Property,
    Attribute,
    Metadata,
}

/// Maps a Terraform type expression to its TOSCA Simple Profile
/// equivalent by *prefix*, not exact match, so parametrized compound
/// types (`list(string)`, `map(number)`, `object({...})`) still resolve —
/// ground: `variables.py::_map_terraform_type_to_tosca`. Unrecognized
/// types fall back to `string` with a warning rather than a hard error.
pub fn map_terraform_type_to_tosca(terraform_type: &str) -> &'static str {
    let t = terraform_type.trim();
    match t {
        "string" => "string",
        "number" => "float",
        "bool" => "boolean",
        _ if t.starts_with("list") || t.starts_with("set") || t.starts_with("tuple") => "list",
        _ if t.starts_with("map") || t.starts_with("object") => "map",
        _ => {
            eprintln!("warning: unrecognized terraform variable type '{t}', defaulting to string");
            "string"
        }
    }
}

pub struct VariableContext {
    /// TOSCA inputs derived from `configuration.root_module.variables`,
    /// insertion-order preserved.
    pub inputs: IndexMap<String, ParameterDefinition>,
    reference_map: HashMap<(String, String), String>,
}

impl VariableContext {
    pub fn build(plan: &ParsedPlan) -> Self {
        let mut inputs = IndexMap::new();
        for (name, var) in &plan.configuration.root_module.variables {
            let mut param = ParameterDefinition::new();
            param.description = var.description.clone();
            if let Some(ty) = &var.var_type {
                param.param_type = Some(map_terraform_type_to_tosca(ty).to_string());
            }
            // §3.3: required = (default is None) — ground: variables.py:108
            // `required = var_def.default is None`.
            param.required = var.default.is_none();
            if let Some(default) = &var.default {
                param.default = Some(default.clone());
            }
            inputs.insert(name.clone(), param);
        }

        let mut reference_map = HashMap::new();
        for resource in &plan.configuration.root_module.resources {
            for (property, expr) in &resource.expressions {
                for reference in &expr.references {
                    if let Some(var_name) = reference.strip_prefix("var.") {
                        reference_map.insert(
                            (resource.address.clone(), property.clone()),
                            var_name.to_string(),
                        );
                    }
                }
            }
        }

        Self {
            inputs,
            reference_map,
        }
    }

    /// Is `(address, property)` backed by a Terraform variable?
    pub fn is_variable_backed(&self, address: &str, property: &str) -> Option<&str> {
        self.reference_map
            .get(&(address.to_string(), property.to_string()))
            .map(|s| s.as_str())
    }

    /// Resolve a concrete value into either the concrete value or a
    /// `$get_input` function call, per `context`. Metadata is never
    /// symbolic regardless of whether the source is variable-backed.
    pub fn resolve(&self, address: &str, property: &str, value: &Value, context: ResolveContext) -> Value {
        if context == ResolveContext::Metadata {
            return value.clone();
        }
        match self.is_variable_backed(address, property) {
            Some(var_name) => json!({"$get_input": var_name}),
            None => value.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plan_with_variable() -> ParsedPlan {
        ParsedPlan::from_json(
            r#"{
            "configuration": {"root_module": {
                "variables": {"instance_type": {"type": "string", "default": "t3.micro"}},
                "resources": [
                    {"address": "aws_instance.web", "type": "aws_instance", "name": "web",
                     "expressions": {"instance_type": {"references": ["var.instance_type"]}}}
                ]
            }},
            "planned_values": {"root_module": {"resources": [
                {"address": "aws_instance.web", "type": "aws_instance", "name": "web", "values": {"instance_type": "t3.micro"}}
            ]}}
        }"#,
        )
        .unwrap()
    }

    #[test]
    fn type_mapping_handles_compound_prefixes() {
        assert_eq!(map_terraform_type_to_tosca("list(string)"), "list");
        assert_eq!(map_terraform_type_to_tosca("map(number)"), "map");
        assert_eq!(map_terraform_type_to_tosca("number"), "float");
        assert_eq!(map_terraform_type_to_tosca("weird"), "string");
    }

    #[test]
    fn property_resolves_to_get_input_when_variable_backed() {
        let plan = plan_with_variable();
        let ctx = VariableContext::build(&plan);
        let resolved = ctx.resolve(
            "aws_instance.web",
            "instance_type",
            &Value::String("t3.micro".into()),
            ResolveContext::Property,
        );
        assert_eq!(resolved, json!({"$get_input": "instance_type"}));
    }

    #[test]
    fn metadata_never_resolves_to_get_input() {
        let plan = plan_with_variable();
        let ctx = VariableContext::build(&plan);
        let resolved = ctx.resolve(
            "aws_instance.web",
            "instance_type",
            &Value::String("t3.micro".into()),
            ResolveContext::Metadata,
        );
        assert_eq!(resolved, Value::String("t3.micro".into()));
    }

    #[test]
    fn defaulted_variable_is_not_required() {
        let plan = plan_with_variable();
        let ctx = VariableContext::build(&plan);
        let param = ctx.inputs.get("instance_type").unwrap();
        assert!(!param.required);
        assert_eq!(param.default, Some(Value::String("t3.micro".into())));
    }

    #[test]
    fn variable_without_default_is_required() {
        let plan = ParsedPlan::from_json(
            r#"{
            "configuration": {"root_module": {
                "variables": {"db_name": {"type": "string"}},
                "resources": []
            }},
            "planned_values": {"root_module": {"resources": []}}
        }"#,
        )
        .unwrap();
        let ctx = VariableContext::build(&plan);
        let param = ctx.inputs.get("db_name").unwrap();
        assert!(param.required);
        assert!(param.default.is_none());
        assert!(param.validate().is_ok());
    }
}
