//! IAM role and policy mappers. The profile defines no IAM-specific
//! node type, so these follow the generic `Root` convention used by
//! `aws_security_group` and `aws_lb_target_group` — metadata carries the
//! resource detail, requirements carry the dependency graph.

use serde_json::Value;

use crate::builder::ServiceTemplateBuilder;
use crate::dispatch::MappingContext;
use crate::errors::MappingError;
use crate::plan::PlannedResource;

use super::{add_dependency_requirements, base_metadata, node_name, require_values, ResourceMapper};

pub struct IamRoleMapper;

impl ResourceMapper for IamRoleMapper {
    fn can_map(&self, resource_type: &str) -> bool {
        resource_type == "aws_iam_role"
    }

    fn map(&self, resource: &PlannedResource, builder: &mut ServiceTemplateBuilder, ctx: &MappingContext) -> Result<(), MappingError> {
        let Some(values) = require_values(resource) else { return Ok(()) };
        let values = values.clone();

        let mut node = builder.add_node(node_name(resource), "Root");
        node.with_metadata(base_metadata(resource, "IamRole"));
        if let Some(name) = values.get("name") {
            node.with_property("name", name.clone());
        }
        if let Some(assume_role_policy) = values.get("assume_role_policy") {
            if let Some(raw) = assume_role_policy.as_str() {
                if let Ok(parsed) = serde_json::from_str::<Value>(raw) {
                    node.with_property("assume_role_policy", parsed);
                } else {
                    node.with_property("assume_role_policy", assume_role_policy.clone());
                }
            } else {
                node.with_property("assume_role_policy", assume_role_policy.clone());
            }
        }
        add_dependency_requirements(&mut node, ctx, resource, &[]);
        Ok(())
    }
}

pub struct IamPolicyMapper;

impl ResourceMapper for IamPolicyMapper {
    fn can_map(&self, resource_type: &str) -> bool {
        resource_type == "aws_iam_policy" || resource_type == "aws_iam_role_policy_attachment"
    }

    fn map(&self, resource: &PlannedResource, builder: &mut ServiceTemplateBuilder, ctx: &MappingContext) -> Result<(), MappingError> {
        let Some(values) = require_values(resource) else { return Ok(()) };
        let values = values.clone();

        // aws_iam_role_policy_attachment has no identity of its own in AWS;
        // it is represented as a dependency edge on the role it attaches
        // to, not as a node.
        if resource.resource_type == "aws_iam_role_policy_attachment" {
            let mut node = builder.add_node(node_name(resource), "Root");
            node.with_metadata(base_metadata(resource, "IamRolePolicyAttachment"));
            if let Some(policy_arn) = values.get("policy_arn") {
                node.with_property("policy_arn", policy_arn.clone());
            }
            add_dependency_requirements(&mut node, ctx, resource, &[]);
            return Ok(());
        }

        let mut node = builder.add_node(node_name(resource), "Root");
        node.with_metadata(base_metadata(resource, "IamPolicy"));
        if let Some(name) = values.get("name") {
            node.with_property("name", name.clone());
        }
        if let Some(policy) = values.get("policy") {
            if let Some(raw) = policy.as_str() {
                if let Ok(parsed) = serde_json::from_str::<Value>(raw) {
                    node.with_property("policy", parsed);
                } else {
                    node.with_property("policy", policy.clone());
                }
            } else {
                node.with_property("policy", policy.clone());
            }
        }
        add_dependency_requirements(&mut node, ctx, resource, &[]);
        Ok(())
    }
}
