//! Route 53 hosted zone and record mappers (§4.6.4).

use serde_json::Value;

use crate::builder::ServiceTemplateBuilder;
use crate::dispatch::MappingContext;
use crate::errors::MappingError;
use crate::plan::PlannedResource;
use crate::reference::resolve_target;

use super::{add_dependency_requirements, base_metadata, node_name, require_values, ResourceMapper};

pub struct Route53ZoneMapper;

impl ResourceMapper for Route53ZoneMapper {
    fn can_map(&self, resource_type: &str) -> bool {
        resource_type == "aws_route53_zone"
    }

    fn map(&self, resource: &PlannedResource, builder: &mut ServiceTemplateBuilder, ctx: &MappingContext) -> Result<(), MappingError> {
        let Some(values) = require_values(resource) else { return Ok(()) };
        let is_private = matches!(values.get("vpc"), Some(Value::Array(a)) if !a.is_empty());

        let mut node = builder.add_node(node_name(resource), "Network");
        node.with_metadata(base_metadata(resource, "Route53Zone"));
        node.with_property("network_type", if is_private { "private" } else { "public" });
        node.with_property("dhcp_enabled", is_private);
        if let Some(domain) = values.get("name") {
            node.with_property("network_name", domain.clone());
        }
        add_dependency_requirements(&mut node, ctx, resource, &[]);
        Ok(())
    }
}

pub struct Route53RecordMapper;

impl ResourceMapper for Route53RecordMapper {
    fn can_map(&self, resource_type: &str) -> bool {
        resource_type == "aws_route53_record"
    }

    fn map(&self, resource: &PlannedResource, builder: &mut ServiceTemplateBuilder, ctx: &MappingContext) -> Result<(), MappingError> {
        let Some(values) = require_values(resource) else { return Ok(()) };
        let values = values.clone();
        let name = node_name(resource);

        {
            let mut node = builder.add_node(name.clone(), "Network");
            node.with_metadata(base_metadata(resource, "Route53Record"));
            node.with_property("network_type", "dns_record");
            if let Some(record_name) = values.get("name") {
                node.with_property("name", record_name.clone());
            }
            if let Some(record_type) = values.get("type") {
                node.with_property("record_type", record_type.clone());
            }
            if let Some(zone_edge) = ctx.references(resource).iter().find(|e| e.property == "zone_id") {
                node.add_requirement("zone").to_node(zone_edge.target.clone()).with_relationship("DependsOn").and_node();
            }
        }

        let Some(config) = ctx.plan.config_resource(&resource.address) else { return Ok(()) };
        for (property, expr) in &config.expressions {
            if !property.starts_with("alias") {
                continue;
            }
            for raw in &expr.references {
                let Some(trimmed) = raw.strip_prefix("aws_lb.").map(|_| raw.as_str()) else { continue };
                let Some(without_suffix) = trimmed.strip_suffix(".dns_name") else { continue };
                let lb_target = resolve_target(ctx.plan, without_suffix, resource);

                if let Some(mut node) = builder.get_node(&name) {
                    node.add_requirement("target").to_node(lb_target.clone()).with_relationship("RoutesTo").and_node();
                }
                // Compatibility aid: surface the alias record name on the
                // aliased load balancer's own `client` capability.
                if let Some(mut lb_node) = builder.get_node(&lb_target) {
                    let mut client = lb_node.capability_or_insert("client");
                    if let Some(record_name) = values.get("name") {
                        client.with_property("dns_name", record_name.clone());
                    }
                }
            }
        }
        Ok(())
    }
}
