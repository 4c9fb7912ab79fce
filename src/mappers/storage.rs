//! S3 bucket mapper.

use crate::builder::ServiceTemplateBuilder;
use crate::dispatch::MappingContext;
use crate::errors::MappingError;
use crate::plan::PlannedResource;
use crate::variables::ResolveContext;

use super::{add_dependency_requirements, base_metadata, node_name, require_values, ResourceMapper};

pub struct S3BucketMapper;

impl ResourceMapper for S3BucketMapper {
    fn can_map(&self, resource_type: &str) -> bool {
        resource_type == "aws_s3_bucket"
    }

    fn map(&self, resource: &PlannedResource, builder: &mut ServiceTemplateBuilder, ctx: &MappingContext) -> Result<(), MappingError> {
        let Some(values) = require_values(resource) else { return Ok(()) };
        let values = values.clone();

        let mut node = builder.add_node(node_name(resource), "ObjectStorage");
        node.with_metadata(base_metadata(resource, "S3Bucket"));
        if let Some(bucket) = values.get("bucket") {
            node.with_property(
                "bucket_name",
                ctx.resolve(&resource.address, "bucket", bucket, ResolveContext::Property),
            );
        }
        add_dependency_requirements(&mut node, ctx, resource, &[]);
        Ok(())
    }
}
