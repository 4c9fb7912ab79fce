//! VPC, subnet, gateway, EIP, route table/route mappers.
//!
//! Ground: `original_source/src/plugins/terraform/mappers/aws/aws_vpc.py`
//! for the Network node shape and metadata conventions; §4.6.3 for the
//! gateway/EIP/route naming and property rules.

use serde_json::{json, Value};

use crate::builder::ServiceTemplateBuilder;
use crate::dispatch::MappingContext;
use crate::errors::MappingError;
use crate::plan::PlannedResource;
use crate::variables::ResolveContext;

use super::{add_dependency_requirements, base_metadata, node_name, require_values, ResourceMapper};

pub struct VpcMapper;

impl ResourceMapper for VpcMapper {
    fn can_map(&self, resource_type: &str) -> bool {
        resource_type == "aws_vpc"
    }

    fn map(&self, resource: &PlannedResource, builder: &mut ServiceTemplateBuilder, ctx: &MappingContext) -> Result<(), MappingError> {
        let Some(values) = require_values(resource) else { return Ok(()) };
        let cidr = values.get("cidr_block").and_then(Value::as_str).map(str::to_string);
        let ipv6_cidr = values.get("ipv6_cidr_block").and_then(Value::as_str).map(str::to_string);
        let ip_version = if cidr.is_some() { 4 } else { 6 };

        let mut node = builder.add_node(node_name(resource), "Network");
        node.with_metadata(base_metadata(resource, "VPC"));
        if let Some(cidr) = cidr {
            node.with_property(
                "cidr",
                ctx.resolve(&resource.address, "cidr_block", &json!(cidr), ResolveContext::Property),
            );
        }
        if let Some(ipv6) = ipv6_cidr {
            node.with_property(
                "ipv6_cidr",
                ctx.resolve(&resource.address, "ipv6_cidr_block", &json!(ipv6), ResolveContext::Property),
            );
        }
        node.with_property("ip_version", ip_version);
        add_dependency_requirements(&mut node, ctx, resource, &[]);
        Ok(())
    }
}

pub struct SubnetMapper;

impl ResourceMapper for SubnetMapper {
    fn can_map(&self, resource_type: &str) -> bool {
        resource_type == "aws_subnet"
    }

    fn map(&self, resource: &PlannedResource, builder: &mut ServiceTemplateBuilder, ctx: &MappingContext) -> Result<(), MappingError> {
        let Some(values) = require_values(resource) else { return Ok(()) };
        let cidr = values.get("cidr_block").and_then(Value::as_str).map(str::to_string);
        let ipv6_cidr = values.get("ipv6_cidr_block").and_then(Value::as_str).map(str::to_string);
        let ip_version = if cidr.is_none() && ipv6_cidr.is_some() { 6 } else { 4 };

        let mut node = builder.add_node(node_name(resource), "Network");
        node.with_metadata(base_metadata(resource, "Subnet"));
        if let Some(cidr) = cidr {
            node.with_property(
                "cidr",
                ctx.resolve(&resource.address, "cidr_block", &json!(cidr), ResolveContext::Property),
            );
        }
        if let Some(ipv6) = ipv6_cidr {
            node.with_property(
                "ipv6_cidr",
                ctx.resolve(&resource.address, "ipv6_cidr_block", &json!(ipv6), ResolveContext::Property),
            );
        }
        node.with_property("ip_version", ip_version);
        node.with_property("dhcp_enabled", true);
        add_dependency_requirements(&mut node, ctx, resource, &[]);
        Ok(())
    }
}

fn tag_or_clean_name(resource: &PlannedResource) -> String {
    resource
        .values
        .get("tags")
        .and_then(|t| t.get("Name"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| resource.name.clone())
}

pub struct InternetGatewayMapper;

impl ResourceMapper for InternetGatewayMapper {
    fn can_map(&self, resource_type: &str) -> bool {
        resource_type == "aws_internet_gateway"
    }

    fn map(&self, resource: &PlannedResource, builder: &mut ServiceTemplateBuilder, ctx: &MappingContext) -> Result<(), MappingError> {
        if require_values(resource).is_none() {
            return Ok(());
        }
        let mut node = builder.add_node(node_name(resource), "Network");
        node.with_metadata(base_metadata(resource, "InternetGateway"));
        node.with_property("network_type", "public");
        node.with_property("ip_version", 4);
        node.with_property("network_name", format!("IGW-{}", tag_or_clean_name(resource)));
        add_dependency_requirements(&mut node, ctx, resource, &[]);
        Ok(())
    }
}

pub struct EgressOnlyInternetGatewayMapper;

impl ResourceMapper for EgressOnlyInternetGatewayMapper {
    fn can_map(&self, resource_type: &str) -> bool {
        resource_type == "aws_egress_only_internet_gateway"
    }

    fn map(&self, resource: &PlannedResource, builder: &mut ServiceTemplateBuilder, ctx: &MappingContext) -> Result<(), MappingError> {
        if require_values(resource).is_none() {
            return Ok(());
        }
        let mut node = builder.add_node(node_name(resource), "Network");
        node.with_metadata(base_metadata(resource, "EgressOnlyInternetGateway"));
        node.with_property("network_type", "egress_only");
        node.with_property("ip_version", 6);
        node.with_property("network_name", format!("EIGW-{}", tag_or_clean_name(resource)));
        add_dependency_requirements(&mut node, ctx, resource, &[]);
        Ok(())
    }
}

pub struct EipMapper;

impl ResourceMapper for EipMapper {
    fn can_map(&self, resource_type: &str) -> bool {
        resource_type == "aws_eip"
    }

    fn map(&self, resource: &PlannedResource, builder: &mut ServiceTemplateBuilder, ctx: &MappingContext) -> Result<(), MappingError> {
        if require_values(resource).is_none() {
            return Ok(());
        }
        let mut node = builder.add_node(node_name(resource), "Network");
        node.with_metadata(base_metadata(resource, "ElasticIp"));
        node.with_property("network_type", "public");
        node.with_property("ip_version", 4);
        node.with_property("network_name", format!("EIP-{}", tag_or_clean_name(resource)));
        add_dependency_requirements(&mut node, ctx, resource, &[]);
        Ok(())
    }
}

/// Not detailed in §4.6.3; mapped to a `Network` node carrying only the
/// shared metadata convention, since route tables have no TOSCA-specific
/// properties of their own here — `aws_route` is the mapper that adds the
/// interesting structure (the gateway requirement) on top of this node.
pub struct RouteTableMapper;

impl ResourceMapper for RouteTableMapper {
    fn can_map(&self, resource_type: &str) -> bool {
        resource_type == "aws_route_table"
    }

    fn map(&self, resource: &PlannedResource, builder: &mut ServiceTemplateBuilder, ctx: &MappingContext) -> Result<(), MappingError> {
        if require_values(resource).is_none() {
            return Ok(());
        }
        let mut node = builder.add_node(node_name(resource), "Network");
        node.with_metadata(base_metadata(resource, "RouteTable"));
        add_dependency_requirements(&mut node, ctx, resource, &[]);
        Ok(())
    }
}

const GATEWAY_PROPERTIES: &[&str] = &[
    "gateway_id",
    "nat_gateway_id",
    "network_interface_id",
    "vpc_peering_connection_id",
    "transit_gateway_id",
    "carrier_gateway_id",
    "core_network_arn",
];

fn target_type_for_property(property: &str) -> &'static str {
    match property {
        "gateway_id" => "internet_gateway",
        "nat_gateway_id" => "nat_gateway",
        "network_interface_id" => "network_interface",
        "vpc_peering_connection_id" => "vpc_peering_connection",
        "transit_gateway_id" => "transit_gateway",
        "carrier_gateway_id" => "carrier_gateway",
        "core_network_arn" => "core_network",
        _ => "unknown",
    }
}

/// `(destination_type, destination_value, ip_version)` for whichever
/// destination field is populated on this route.
fn destination_detail(values: &Value) -> Option<(&'static str, Value, u32)> {
    if let Some(v) = values.get("destination_cidr_block").filter(|v| !v.is_null()) {
        return Some(("ipv4_cidr", v.clone(), 4));
    }
    if let Some(v) = values.get("destination_ipv6_cidr_block").filter(|v| !v.is_null()) {
        return Some(("ipv6_cidr", v.clone(), 6));
    }
    if let Some(v) = values.get("destination_prefix_list_id").filter(|v| !v.is_null()) {
        return Some(("prefix_list", v.clone(), 4));
    }
    None
}

/// Post-pass: does not create a node of its own. Adds a `dependency`
/// requirement on the *route table* it belongs to, targeting whichever
/// gateway/NAT/peering resource the route points at.
pub struct RouteMapper;

impl ResourceMapper for RouteMapper {
    fn can_map(&self, resource_type: &str) -> bool {
        resource_type == "aws_route"
    }

    fn is_post_pass(&self) -> bool {
        true
    }

    fn map(&self, resource: &PlannedResource, builder: &mut ServiceTemplateBuilder, ctx: &MappingContext) -> Result<(), MappingError> {
        let Some(values) = require_values(resource) else { return Ok(()) };
        let Some((destination_type, destination, ip_version)) = destination_detail(values) else {
            eprintln!("warning: aws_route '{}' has no destination, skipping", resource.address);
            return Ok(());
        };

        let edges = ctx.references(resource);
        let route_table_edge = edges.iter().find(|e| e.property == "route_table_id");
        let gateway_edge = edges.iter().find(|e| GATEWAY_PROPERTIES.contains(&e.property.as_str()));

        let Some(route_table_edge) = route_table_edge else {
            eprintln!("warning: aws_route '{}' has no route_table_id reference, skipping", resource.address);
            return Ok(());
        };
        let Some(gateway_edge) = gateway_edge else {
            eprintln!("warning: aws_route '{}' has no gateway/NAT reference, skipping", resource.address);
            return Ok(());
        };

        let target_type = target_type_for_property(&gateway_edge.property);
        let route_table_name = route_table_edge.target.clone();
        let gateway_name = gateway_edge.target.clone();
        let mut route_table = builder
            .get_node(&route_table_name)
            .ok_or_else(|| MappingError::PostPassMissingNode {
                mapper: "aws_route".to_string(),
                node_name: route_table_name.clone(),
            })?;
        route_table
            .add_requirement(format!("route_{}", resource.name))
            .to_node(gateway_name.clone())
            .with_relationship("LinksTo")
            .and_node();
        route_table.append_to_metadata_list(
            "aws_routes",
            json!({
                "route_id": resource.name,
                "destination_type": destination_type,
                "destination": destination,
                "target_type": target_type,
                "target": gateway_name,
            }),
        );
        // A table carrying any IPv4 route stays IPv4; only an all-IPv6
        // route table is marked ip_version 6.
        if route_table.property("ip_version").and_then(Value::as_u64) != Some(4) {
            route_table.with_property("ip_version", ip_version);
        }
        Ok(())
    }
}
