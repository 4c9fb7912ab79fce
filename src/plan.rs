//! C1 (input side) — typed view over a parsed Terraform plan document.
//!
//! Terraform's own JSON output is deeply nested and permissive; rather than
//! hand opaque `serde_json::Value` maps to every mapper (see design note in
//! §9: "never pass opaque maps to mappers"), the plan is parsed once here
//! into a small, typed shape that C4/C5/C6 can read without re-deriving
//! structure. Ground: `original_source/src/plugins/terraform/variables.py`
//! and `context.py`, which both operate over the same three top-level keys.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

use crate::errors::TranslationError;

/// `configuration.root_module.variables.<name>`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ConfigVariable {
    #[serde(rename = "type")]
    pub var_type: Option<String>,
    pub default: Option<Value>,
    pub description: Option<String>,
    #[serde(default)]
    pub sensitive: bool,
}

/// One entry of a resource's `expressions` map: `{references, constant_value}`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Expression {
    #[serde(default)]
    pub references: Vec<String>,
    pub constant_value: Option<Value>,
}

/// `configuration.root_module.resources[*]`.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigResource {
    pub address: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    #[serde(default)]
    pub expressions: HashMap<String, Expression>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ConfigRootModule {
    #[serde(default)]
    pub variables: HashMap<String, ConfigVariable>,
    #[serde(default)]
    pub resources: Vec<ConfigResource>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Configuration {
    #[serde(default)]
    pub root_module: ConfigRootModule,
}

/// `planned_values.root_module.resources[*]` and the `state.values`
/// equivalent share this shape.
#[derive(Debug, Clone, Deserialize)]
pub struct PlannedResource {
    pub address: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    pub name: String,
    pub index: Option<Value>,
    #[serde(default)]
    pub values: Value,
    #[serde(default)]
    pub depends_on: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RootModule {
    #[serde(default)]
    pub resources: Vec<PlannedResource>,
    #[serde(default)]
    pub child_modules: Vec<RootModule>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct PlannedValues {
    #[serde(default)]
    pub root_module: RootModule,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct StateValues {
    #[serde(default)]
    pub root_module: RootModule,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct State {
    #[serde(default)]
    pub values: StateValues,
}

/// Change record for one resource address, used for the destroy-only
/// pre-check (§4.6/"Resource validity pre-check").
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceChange {
    pub address: String,
    pub change: Change,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Change {
    #[serde(default)]
    pub actions: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct RawPlan {
    #[serde(default)]
    configuration: Configuration,
    #[serde(default)]
    planned_values: PlannedValues,
    state: Option<State>,
    #[serde(default)]
    resource_changes: Vec<ResourceChange>,
    /// Some collaborators nest the whole document under `plan` instead of
    /// flattening it — ground: `aws_lb_target_group_attachment.py::_find_database_targets`.
    plan: Option<Box<RawPlan>>,
}

/// The parsed plan, flattened past the optional `plan` wrapper.
#[derive(Debug, Clone)]
pub struct ParsedPlan {
    pub configuration: Configuration,
    pub planned_values: PlannedValues,
    pub state: Option<State>,
    pub resource_changes: Vec<ResourceChange>,
}

impl ParsedPlan {
    pub fn from_json(document: &str) -> Result<Self, TranslationError> {
        let raw: RawPlan = serde_json::from_str(document)
            .map_err(|e| TranslationError::ParseInputMalformed(e.to_string()))?;
        Ok(Self::from_raw(raw))
    }

    fn from_raw(raw: RawPlan) -> Self {
        let has_content = !raw.planned_values.root_module.resources.is_empty()
            || !raw.planned_values.root_module.child_modules.is_empty();
        if !has_content {
            if let Some(inner) = raw.plan {
                return Self::from_raw(*inner);
            }
        }
        Self {
            configuration: raw.configuration,
            planned_values: raw.planned_values,
            state: raw.state,
            resource_changes: raw.resource_changes,
        }
    }

    /// All planned resources in document order, depth-first through
    /// `child_modules`, with the module address prefix already applied by
    /// Terraform to each resource's own `address` field.
    pub fn all_planned_resources(&self) -> Vec<&PlannedResource> {
        let mut out = Vec::new();
        collect_resources(&self.planned_values.root_module, &mut out);
        out
    }

    pub fn state_resources(&self) -> Vec<&PlannedResource> {
        let mut out = Vec::new();
        if let Some(state) = &self.state {
            collect_resources(&state.values.root_module, &mut out);
        }
        out
    }

    pub fn config_resource(&self, address: &str) -> Option<&ConfigResource> {
        self.configuration
            .root_module
            .resources
            .iter()
            .find(|r| r.address == address)
    }

    /// `change.actions` for `address`, or empty if the plan carries no
    /// `resource_changes` (older/simplified plan documents).
    pub fn change_actions(&self, address: &str) -> &[String] {
        self.resource_changes
            .iter()
            .find(|c| c.address == address)
            .map(|c| c.change.actions.as_slice())
            .unwrap_or(&[])
    }

    /// A resource is a pure destroy when `actions` contains `delete` and
    /// not `create` — ground: `aws_lb_target_group_attachment.py::_validate_resource_state`.
    pub fn is_pure_destroy(&self, address: &str) -> bool {
        let actions = self.change_actions(address);
        !actions.is_empty()
            && actions.iter().any(|a| a == "delete")
            && !actions.iter().any(|a| a == "create")
    }
}

fn collect_resources<'a>(module: &'a RootModule, out: &mut Vec<&'a PlannedResource>) {
    out.extend(module.resources.iter());
    for child in &module.child_modules {
        collect_resources(child, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattens_plan_wrapper() {
        let doc = r#"{"plan": {"planned_values": {"root_module": {"resources": [
            {"address": "aws_vpc.main", "type": "aws_vpc", "name": "main", "values": {"id": "vpc-1"}}
        ]}}}}"#;
        let plan = ParsedPlan::from_json(doc).unwrap();
        assert_eq!(plan.all_planned_resources().len(), 1);
    }

    #[test]
    fn walks_child_modules_depth_first() {
        let doc = r#"{"planned_values": {"root_module": {
            "resources": [{"address": "aws_vpc.main", "type": "aws_vpc", "name": "main", "values": {}}],
            "child_modules": [{"resources": [
                {"address": "module.net.aws_subnet.a", "type": "aws_subnet", "name": "a", "values": {}}
            ]}]
        }}}"#;
        let plan = ParsedPlan::from_json(doc).unwrap();
        let addrs: Vec<&str> = plan
            .all_planned_resources()
            .iter()
            .map(|r| r.address.as_str())
            .collect();
        assert_eq!(addrs, vec!["aws_vpc.main", "module.net.aws_subnet.a"]);
    }

    #[test]
    fn pure_destroy_detection() {
        let doc = r#"{"planned_values": {"root_module": {"resources": []}},
            "resource_changes": [{"address": "aws_vpc.old", "change": {"actions": ["delete"]}}]}"#;
        let plan = ParsedPlan::from_json(doc).unwrap();
        assert!(plan.is_pure_destroy("aws_vpc.old"));
        assert!(!plan.is_pure_destroy("aws_vpc.untouched"));
    }

    #[test]
    fn malformed_json_is_parse_input_malformed() {
        let err = ParsedPlan::from_json("not json").unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
