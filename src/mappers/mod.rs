//! C6/C9 — single-resource mappers and post-pass composers.
//!
//! One file per resource family, grouped the way
//! `original_source/src/plugins/terraform/mappers/aws/` groups them by
//! AWS service area. Each [`ResourceMapper`] is registered once in
//! [`registry`]; [`crate::dispatch`] looks mappers up by `can_map`.

mod compute;
mod dns;
mod iam;
mod lb;
mod network;
mod rds;
mod security;
mod storage;

use serde_json::Value;

use crate::builder::{NodeBuilder, ServiceTemplateBuilder};
use crate::dispatch::MappingContext;
use crate::errors::MappingError;
use crate::model::PropertyMap;
use crate::plan::PlannedResource;
use crate::reference::node_name_for_address;

/// Strategy interface: one implementation per Terraform resource type (or
/// small family of types sharing logic, e.g. ingress/egress rules).
pub trait ResourceMapper {
    fn can_map(&self, resource_type: &str) -> bool;

    /// Post-pass mappers run in a second dispatch sweep, after every
    /// primary mapper has already populated the builder (§4.6.2/§5).
    fn is_post_pass(&self) -> bool {
        false
    }

    fn map(
        &self,
        resource: &PlannedResource,
        builder: &mut ServiceTemplateBuilder,
        ctx: &MappingContext,
    ) -> Result<(), MappingError>;
}

pub fn registry() -> Vec<Box<dyn ResourceMapper>> {
    vec![
        Box::new(network::VpcMapper),
        Box::new(network::SubnetMapper),
        Box::new(network::InternetGatewayMapper),
        Box::new(network::EgressOnlyInternetGatewayMapper),
        Box::new(network::EipMapper),
        Box::new(network::RouteTableMapper),
        Box::new(network::RouteMapper),
        Box::new(compute::InstanceMapper),
        Box::new(compute::EbsVolumeMapper),
        Box::new(storage::S3BucketMapper),
        Box::new(rds::DbInstanceMapper),
        Box::new(rds::RdsClusterMapper),
        Box::new(rds::DbSubnetGroupMapper),
        Box::new(rds::ElastiCacheClusterMapper),
        Box::new(rds::ElastiCacheReplicationGroupMapper),
        Box::new(rds::ElastiCacheSubnetGroupMapper),
        Box::new(security::SecurityGroupMapper),
        Box::new(security::IngressRuleMapper),
        Box::new(security::EgressRuleMapper),
        Box::new(lb::LoadBalancerMapper),
        Box::new(lb::LoadBalancerListenerMapper),
        Box::new(lb::TargetGroupMapper),
        Box::new(lb::TargetGroupAttachmentMapper),
        Box::new(dns::Route53ZoneMapper),
        Box::new(dns::Route53RecordMapper),
        Box::new(iam::IamRoleMapper),
        Box::new(iam::IamPolicyMapper),
    ]
}

/// Node name for the resource's own address (§4.5).
pub fn node_name(resource: &PlannedResource) -> String {
    node_name_for_address(&resource.address)
}

fn tag_name(values: &Value) -> Option<String> {
    values
        .get("tags")
        .and_then(|t| t.get("Name"))
        .and_then(Value::as_str)
        .map(String::from)
}

/// Shared metadata convention from §4.6: every node carries
/// `{original_resource_type, original_resource_name, aws_component_type,
/// description, aws_arn?, aws_id?, aws_tags?, aws_tags_all?}` plus
/// whatever resource-specific `aws_*` fields its own mapper adds on top.
/// Always concrete — never passed through `ctx.resolve`.
pub fn base_metadata(resource: &PlannedResource, aws_component_type: &str) -> PropertyMap {
    let mut metadata = PropertyMap::new();
    metadata.insert(
        "original_resource_type".to_string(),
        Value::String(resource.resource_type.clone()),
    );
    metadata.insert(
        "original_resource_name".to_string(),
        Value::String(resource.name.clone()),
    );
    metadata.insert(
        "aws_component_type".to_string(),
        Value::String(aws_component_type.to_string()),
    );
    let description = tag_name(&resource.values)
        .unwrap_or_else(|| format!("{} {}", resource.resource_type, resource.name));
    metadata.insert("description".to_string(), Value::String(description));
    if let Some(arn) = resource.values.get("arn") {
        metadata.insert("aws_arn".to_string(), arn.clone());
    }
    if let Some(id) = resource.values.get("id") {
        metadata.insert("aws_id".to_string(), id.clone());
    }
    if let Some(tags) = resource.values.get("tags") {
        metadata.insert("aws_tags".to_string(), tags.clone());
        if let Some(tags_all) = resource.values.get("tags_all") {
            if tags_all != tags {
                metadata.insert("aws_tags_all".to_string(), tags_all.clone());
            }
        }
    }
    metadata
}

/// Appends one requirement per resolved-and-classified dependency edge
/// (§4.6 "Dependencies"). `exclude_properties` lets a mapper suppress
/// edges it has already represented explicitly (e.g. the attachment
/// mapper's own `target_group_arn`/`target_id` edges).
pub fn add_dependency_requirements(
    node: &mut NodeBuilder<'_>,
    ctx: &MappingContext,
    resource: &PlannedResource,
    exclude_properties: &[&str],
) {
    for edge in ctx.references_excluding(resource, exclude_properties, &[]) {
        node.add_requirement(edge.property.clone())
            .to_node(edge.target.clone())
            .with_relationship(edge.relationship)
            .and_node();
    }
}

/// A resource missing its `values` section is skipped with a warning,
/// not an error (§4.6: "Missing values section → log warning, skip").
pub fn require_values<'a>(resource: &'a PlannedResource) -> Option<&'a Value> {
    if resource.values.is_null() {
        eprintln!(
            "warning: resource '{}' has no values section, skipping",
            resource.address
        );
        None
    } else {
        Some(&resource.values)
    }
}
