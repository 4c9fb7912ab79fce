//! Load balancer, listener, target group, and target-group-attachment
//! mappers.
//!
//! Ground: §4.6.2/§4.6.4 and `aws_lb_target_group_attachment.py` for the
//! post-pass attachment pattern (`_extract_references`,
//! `_extract_from_configuration`, endpoint capability selection).

use serde_json::Value;

use crate::builder::ServiceTemplateBuilder;
use crate::dispatch::MappingContext;
use crate::errors::MappingError;
use crate::model::PropertyMap;
use crate::plan::PlannedResource;
use crate::reference::resolve_target;

use super::{add_dependency_requirements, base_metadata, node_name, require_values, ResourceMapper};

pub struct LoadBalancerMapper;

impl ResourceMapper for LoadBalancerMapper {
    fn can_map(&self, resource_type: &str) -> bool {
        resource_type == "aws_lb"
    }

    fn map(&self, resource: &PlannedResource, builder: &mut ServiceTemplateBuilder, ctx: &MappingContext) -> Result<(), MappingError> {
        let Some(values) = require_values(resource) else { return Ok(()) };
        let values = values.clone();
        let name = node_name(resource);

        {
            let mut node = builder.add_node(name.clone(), "LoadBalancer");
            node.with_metadata(base_metadata(resource, "LoadBalancer"));
            if let Some(internal) = values.get("internal") {
                node.with_property("internal", internal.clone());
            }
            if let Some(lb_type) = values.get("load_balancer_type") {
                node.with_property("load_balancer_type", lb_type.clone());
            }
            let mut client = node.add_capability("client");
            if let Some(dns_name) = values.get("dns_name") {
                client.with_property("dns_name", dns_name.clone());
            }
            add_dependency_requirements(&mut node, ctx, resource, &[]);
        }

        // Listener data is folded in here rather than by the (no-op)
        // listener mapper itself — ground: §4.6.2.
        let lb_arn = values.get("arn").and_then(Value::as_str).map(str::to_string);
        if let Some(lb_arn) = lb_arn {
            let listeners: Vec<&PlannedResource> = ctx
                .plan
                .all_planned_resources()
                .into_iter()
                .filter(|r| {
                    r.resource_type == "aws_lb_listener"
                        && r.values.get("load_balancer_arn").and_then(Value::as_str) == Some(lb_arn.as_str())
                })
                .collect();
            if let Some(listener) = listeners.first() {
                if let Some(mut node) = builder.get_node(&name) {
                    let mut client = node.capability_or_insert("client");
                    if let Some(protocol) = listener.values.get("protocol") {
                        client.with_property("protocol", protocol.clone());
                    }
                    if let Some(port) = listener.values.get("port") {
                        client.with_property("port", port.clone());
                    }
                }
            }
        }
        Ok(())
    }
}

/// No-op: listener data is folded into the load balancer's `client`
/// capability by [`LoadBalancerMapper`] itself (§4.6.2).
pub struct LoadBalancerListenerMapper;

impl ResourceMapper for LoadBalancerListenerMapper {
    fn can_map(&self, resource_type: &str) -> bool {
        resource_type == "aws_lb_listener"
    }

    fn map(&self, _resource: &PlannedResource, _builder: &mut ServiceTemplateBuilder, _ctx: &MappingContext) -> Result<(), MappingError> {
        Ok(())
    }
}

pub struct TargetGroupMapper;

impl ResourceMapper for TargetGroupMapper {
    fn can_map(&self, resource_type: &str) -> bool {
        resource_type == "aws_lb_target_group"
    }

    fn map(&self, resource: &PlannedResource, builder: &mut ServiceTemplateBuilder, ctx: &MappingContext) -> Result<(), MappingError> {
        let Some(values) = require_values(resource) else { return Ok(()) };
        let values = values.clone();

        let mut node = builder.add_node(node_name(resource), "Root");
        node.with_metadata(base_metadata(resource, "TargetGroup"));
        if let Some(port) = values.get("port") {
            node.with_property("port", port.clone());
        }
        if let Some(protocol) = values.get("protocol") {
            node.with_property("protocol", protocol.clone());
        }
        if let Some(target_type) = values.get("target_type") {
            node.with_property("target_type", target_type.clone());
        }
        add_dependency_requirements(&mut node, ctx, resource, &[]);
        Ok(())
    }
}

/// Resolves the target-group and attached-node references, preferring
/// the generic extractor and falling back to a direct configuration read
/// (ground: `_extract_references` / `_extract_from_configuration`).
fn resolve_attachment(ctx: &MappingContext, resource: &PlannedResource) -> Option<(String, String)> {
    let edges = ctx.references(resource);
    let via_edges = (
        edges.iter().find(|e| e.property == "target_group_arn").map(|e| e.target.clone()),
        edges.iter().find(|e| e.property == "target_id").map(|e| e.target.clone()),
    );
    if let (Some(tg), Some(target)) = via_edges {
        return Some((tg, target));
    }

    let config = ctx.plan.config_resource(&resource.address)?;
    let resolve_prop = |prop: &str| -> Option<String> {
        let raw = config.expressions.get(prop)?.references.first()?;
        let trimmed = raw.strip_suffix(".arn").or_else(|| raw.strip_suffix(".id")).unwrap_or(raw);
        Some(resolve_target(ctx.plan, trimmed, resource))
    };
    match (resolve_prop("target_group_arn"), resolve_prop("target_id")) {
        (Some(tg), Some(target)) => Some((tg, target)),
        _ => None,
    }
}

/// Post-pass: attaches a target to an existing target-group node rather
/// than creating a node of its own.
pub struct TargetGroupAttachmentMapper;

impl ResourceMapper for TargetGroupAttachmentMapper {
    fn can_map(&self, resource_type: &str) -> bool {
        resource_type == "aws_lb_target_group_attachment"
    }

    fn is_post_pass(&self) -> bool {
        true
    }

    fn map(&self, resource: &PlannedResource, builder: &mut ServiceTemplateBuilder, ctx: &MappingContext) -> Result<(), MappingError> {
        let Some(values) = require_values(resource) else { return Ok(()) };

        let Some((target_group_name, target_name)) = resolve_attachment(ctx, resource) else {
            eprintln!(
                "warning: aws_lb_target_group_attachment '{}' missing target_group_arn/target_id reference, skipping",
                resource.address
            );
            return Ok(());
        };

        if !builder.has_node(&target_name) {
            return Err(MappingError::PostPassMissingNode {
                mapper: "aws_lb_target_group_attachment".to_string(),
                node_name: target_name,
            });
        }

        let port = values.get("port").and_then(Value::as_u64);
        let capability = if port == Some(22) { "admin_endpoint" } else { "endpoint" };

        let mut target_group = builder.get_node(&target_group_name).ok_or_else(|| MappingError::PostPassMissingNode {
            mapper: "aws_lb_target_group_attachment".to_string(),
            node_name: target_group_name.clone(),
        })?;

        let mut req = target_group.add_requirement("application");
        req.to_node(target_name).to_capability(capability).with_relationship("RoutesTo");
        if let Some(az) = values.get("availability_zone") {
            if !az.is_null() {
                let mut props = PropertyMap::new();
                props.insert("availability_zone".to_string(), az.clone());
                req.with_properties(props);
            }
        }
        req.and_node();
        Ok(())
    }
}
