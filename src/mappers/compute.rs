//! EC2 instance and EBS volume mappers.

use serde_json::{json, Value};

use crate::builder::ServiceTemplateBuilder;
use crate::dispatch::MappingContext;
use crate::errors::MappingError;
use crate::plan::PlannedResource;
use crate::variables::ResolveContext;

use super::{add_dependency_requirements, base_metadata, node_name, require_values, ResourceMapper};

fn resolved_property(ctx: &MappingContext, resource: &PlannedResource, property: &str, value: &Value) -> Value {
    ctx.resolve(&resource.address, property, value, ResolveContext::Property)
}

pub struct InstanceMapper;

impl ResourceMapper for InstanceMapper {
    fn can_map(&self, resource_type: &str) -> bool {
        resource_type == "aws_instance"
    }

    fn map(&self, resource: &PlannedResource, builder: &mut ServiceTemplateBuilder, ctx: &MappingContext) -> Result<(), MappingError> {
        let Some(values) = require_values(resource) else { return Ok(()) };
        let values = values.clone();

        let mut node = builder.add_node(node_name(resource), "Compute");
        node.with_metadata(base_metadata(resource, "Instance"));
        if let Some(instance_type) = values.get("instance_type") {
            node.with_property("instance_type", resolved_property(ctx, resource, "instance_type", instance_type));
        }
        if let Some(ami) = values.get("ami") {
            node.with_property("image_id", resolved_property(ctx, resource, "ami", ami));
        }
        if let Some(az) = values.get("availability_zone") {
            node.with_property("availability_zone", resolved_property(ctx, resource, "availability_zone", az));
        }
        if let Some(key_name) = values.get("key_name") {
            if !key_name.is_null() {
                node.with_property("key_name", resolved_property(ctx, resource, "key_name", key_name));
            }
        }
        add_dependency_requirements(&mut node, ctx, resource, &[]);
        Ok(())
    }
}

pub struct EbsVolumeMapper;

impl ResourceMapper for EbsVolumeMapper {
    fn can_map(&self, resource_type: &str) -> bool {
        resource_type == "aws_ebs_volume"
    }

    fn map(&self, resource: &PlannedResource, builder: &mut ServiceTemplateBuilder, ctx: &MappingContext) -> Result<(), MappingError> {
        let Some(values) = require_values(resource) else { return Ok(()) };
        let values = values.clone();

        let mut node = builder.add_node(node_name(resource), "BlockStorage");
        node.with_metadata(base_metadata(resource, "EbsVolume"));
        if let Some(size) = values.get("size") {
            node.with_property("size", resolved_property(ctx, resource, "size", size));
        }
        if let Some(volume_type) = values.get("type") {
            node.with_property("volume_type", json!(volume_type));
        }
        if let Some(encrypted) = values.get("encrypted") {
            node.with_property("encrypted", json!(encrypted));
        }
        if let Some(az) = values.get("availability_zone") {
            node.with_property("availability_zone", resolved_property(ctx, resource, "availability_zone", az));
        }
        add_dependency_requirements(&mut node, ctx, resource, &[]);
        Ok(())
    }
}
