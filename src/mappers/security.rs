//! Security group primary mapper and ingress/egress rule post-pass
//! composers.
//!
//! Ground: `original_source/src/plugins/terraform/mappers/aws/aws_security_group.py`.

use serde_json::{json, Value};

use crate::builder::ServiceTemplateBuilder;
use crate::dispatch::MappingContext;
use crate::errors::MappingError;
use crate::plan::PlannedResource;

use super::{add_dependency_requirements, base_metadata, node_name, require_values, ResourceMapper};

/// No TOSCA 2.0 normative type fits a security group; `Root` is the
/// generic fallback, carrying everything as metadata.
pub struct SecurityGroupMapper;

impl ResourceMapper for SecurityGroupMapper {
    fn can_map(&self, resource_type: &str) -> bool {
        resource_type == "aws_security_group"
    }

    fn map(&self, resource: &PlannedResource, builder: &mut ServiceTemplateBuilder, ctx: &MappingContext) -> Result<(), MappingError> {
        let Some(values) = require_values(resource) else { return Ok(()) };
        let values = values.clone();

        let mut node = builder.add_node(node_name(resource), "Root");
        node.with_metadata(base_metadata(resource, "SecurityGroup"));
        if let Some(name) = values.get("name") {
            node.with_property("name", name.clone());
        }
        if let Some(description) = values.get("description") {
            node.with_property("description", description.clone());
        }
        add_dependency_requirements(&mut node, ctx, resource, &[]);
        Ok(())
    }
}

const RULE_FIELDS: &[&str] = &["ip_protocol", "from_port", "to_port", "cidr_ipv4", "cidr_ipv6", "description"];

fn append_rule(
    resource: &PlannedResource,
    builder: &mut ServiceTemplateBuilder,
    ctx: &MappingContext,
    list_key: &str,
    mapper_name: &str,
) -> Result<(), MappingError> {
    let Some(values) = require_values(resource) else { return Ok(()) };

    let edges = ctx.references(resource);
    let Some(sg_edge) = edges.iter().find(|e| e.property == "security_group_id") else {
        eprintln!(
            "warning: {} '{}' has no security_group_id reference, skipping",
            resource.resource_type, resource.address
        );
        return Ok(());
    };
    let sg_name = sg_edge.target.clone();

    let mut rule = serde_json::Map::new();
    rule.insert("rule_id".to_string(), json!(resource.name));
    for field in RULE_FIELDS {
        if let Some(v) = values.get(*field) {
            if !v.is_null() {
                rule.insert((*field).to_string(), v.clone());
            }
        }
    }

    let mut sg_node = builder.get_node(&sg_name).ok_or_else(|| MappingError::PostPassMissingNode {
        mapper: mapper_name.to_string(),
        node_name: sg_name.clone(),
    })?;
    sg_node.append_to_metadata_list(list_key, Value::Object(rule));
    Ok(())
}

pub struct IngressRuleMapper;

impl ResourceMapper for IngressRuleMapper {
    fn can_map(&self, resource_type: &str) -> bool {
        resource_type == "aws_vpc_security_group_ingress_rule"
    }

    fn is_post_pass(&self) -> bool {
        true
    }

    fn map(&self, resource: &PlannedResource, builder: &mut ServiceTemplateBuilder, ctx: &MappingContext) -> Result<(), MappingError> {
        append_rule(resource, builder, ctx, "ingress_rules", "aws_vpc_security_group_ingress_rule")
    }
}

pub struct EgressRuleMapper;

impl ResourceMapper for EgressRuleMapper {
    fn can_map(&self, resource_type: &str) -> bool {
        resource_type == "aws_vpc_security_group_egress_rule"
    }

    fn is_post_pass(&self) -> bool {
        true
    }

    fn map(&self, resource: &PlannedResource, builder: &mut ServiceTemplateBuilder, ctx: &MappingContext) -> Result<(), MappingError> {
        append_rule(resource, builder, ctx, "egress_rules", "aws_vpc_security_group_egress_rule")
    }
}
