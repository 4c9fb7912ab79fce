//! C7 — mapper dispatch & orchestrator.
//!
//! Two-pass dispatch (primary mappers, then post-pass composers) rather
//! than a single order-reliant pass — §5 calls the two observationally
//! equivalent for this mapper set, and two-pass is the simpler of the two
//! to reason about: a post-pass mapper never depends on dispatch order
//! within `planned_values` itself, only on every primary mapper having
//! already run.

use serde_json::Value;

use crate::builder::ServiceTemplateBuilder;
use crate::errors::TranslationError;
use crate::mappers;
use crate::model::{Import, ToscaFile, TOSCA_DEFINITIONS_VERSION};
use crate::plan::{ParsedPlan, PlannedResource};
use crate::reference::{extract_references, filter_edges, ReferenceEdge};
use crate::variables::{ResolveContext, VariableContext};

pub const TOSCA_SIMPLE_PROFILE_URL: &str =
    "https://docs.oasis-open.org/tosca/TOSCA-Simple-Profile-YAML/v2.0/TOSCA-Simple-Profile-YAML-v2.0.yaml";

/// Shared, read-only context threaded through every mapper invocation.
pub struct MappingContext<'a> {
    pub plan: &'a ParsedPlan,
    pub variables: &'a VariableContext,
}

impl<'a> MappingContext<'a> {
    pub fn resolve(&self, address: &str, property: &str, value: &Value, context: ResolveContext) -> Value {
        self.variables.resolve(address, property, value, context)
    }

    pub fn references(&self, resource: &PlannedResource) -> Vec<ReferenceEdge> {
        extract_references(self.plan, resource)
    }

    pub fn references_excluding(
        &self,
        resource: &PlannedResource,
        exclude_properties: &[&str],
        exclude_targets: &[&str],
    ) -> Vec<ReferenceEdge> {
        filter_edges(self.references(resource), exclude_properties, exclude_targets)
    }
}

/// Runs the full translation: plan → `VariableContext` → dispatch over
/// `planned_values` → finished `ToscaFile` (service template populated,
/// not yet serialized — see [`crate::emitter`]).
pub fn translate(plan: &ParsedPlan) -> Result<ToscaFile, TranslationError> {
    let variables = VariableContext::build(plan);
    let mut builder = ServiceTemplateBuilder::new();
    for (name, param) in &variables.inputs {
        builder.with_input(name.clone(), param.clone());
    }

    let registry = mappers::registry();
    let ctx = MappingContext {
        plan,
        variables: &variables,
    };
    let resources = plan.all_planned_resources();

    for resource in &resources {
        if plan.is_pure_destroy(&resource.address) {
            continue;
        }
        match registry.iter().find(|m| !m.is_post_pass() && m.can_map(&resource.resource_type)) {
            Some(mapper) => mapper.map(resource, &mut builder, &ctx).map_err(TranslationError::from)?,
            None => eprintln!("debug: no mapper registered for resource type '{}', skipping", resource.resource_type),
        }
    }

    for resource in &resources {
        if plan.is_pure_destroy(&resource.address) {
            continue;
        }
        if let Some(mapper) = registry.iter().find(|m| m.is_post_pass() && m.can_map(&resource.resource_type)) {
            mapper.map(resource, &mut builder, &ctx).map_err(TranslationError::from)?;
        }
    }

    let mut file = ToscaFile::new(TOSCA_DEFINITIONS_VERSION)?;
    file.imports.push(Import::new(TOSCA_SIMPLE_PROFILE_URL));
    file.service_template = Some(builder.build());
    Ok(file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_vpc_and_subnet_produce_depends_on_edge() {
        let plan = ParsedPlan::from_json(
            r#"{
            "configuration": {"root_module": {"resources": [
                {"address": "aws_subnet.a", "type": "aws_subnet", "name": "a",
                 "expressions": {"vpc_id": {"references": ["aws_vpc.main.id"]}}}
            ]}},
            "planned_values": {"root_module": {"resources": [
                {"address": "aws_vpc.main", "type": "aws_vpc", "name": "main",
                 "values": {"id": "vpc-1", "cidr_block": "10.0.0.0/16"}},
                {"address": "aws_subnet.a", "type": "aws_subnet", "name": "a",
                 "values": {"id": "subnet-1", "vpc_id": "vpc-1", "cidr_block": "10.0.1.0/24"}}
            ]}}
        }"#,
        )
        .unwrap();

        let file = translate(&plan).unwrap();
        let template = file.service_template.unwrap();
        assert!(template.node_templates.contains_key("aws_vpc_main"));
        assert!(template.node_templates.contains_key("aws_subnet_a"));
        let subnet = template.node_templates.get("aws_subnet_a").unwrap();
        assert!(subnet.requirements.iter().any(|(_, r)| matches!(
            &r.node,
            Some(crate::model::NodeRef::Name(n)) if n == "aws_vpc_main"
        )));
    }

    #[test]
    fn pure_destroy_resources_are_skipped() {
        let plan = ParsedPlan::from_json(
            r#"{
            "planned_values": {"root_module": {"resources": [
                {"address": "aws_vpc.old", "type": "aws_vpc", "name": "old", "values": {"cidr_block": "10.0.0.0/16"}}
            ]}},
            "resource_changes": [{"address": "aws_vpc.old", "change": {"actions": ["delete"]}}]
        }"#,
        )
        .unwrap();
        let file = translate(&plan).unwrap();
        let template = file.service_template.unwrap();
        assert!(!template.node_templates.contains_key("aws_vpc_old"));
    }
}
