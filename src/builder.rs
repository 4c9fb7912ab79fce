//! C2 — fluent, order-preserving in-memory construction API for C1.
//!
//! Mirrors the shape of the original Python `ServiceTemplateBuilder` /
//! `NodeTemplateBuilder` / `RequirementBuilder` chain
//! (`original_source/src/models/v2_0/builder.py`), adapted to Rust
//! ownership: each `add_*` call returns a short-lived sub-builder borrowing
//! the freshly inserted entity; `and_node()`/`and_service()` simply end the
//! borrow, since the caller already holds the parent binding.

use serde_json::Value;

use crate::model::*;

pub struct ServiceTemplateBuilder {
    template: ServiceTemplate,
}

impl Default for ServiceTemplateBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceTemplateBuilder {
    pub fn new() -> Self {
        Self {
            template: ServiceTemplate::default(),
        }
    }

    pub fn with_description(&mut self, description: impl Into<String>) -> &mut Self {
        self.template.description = Some(description.into());
        self
    }

    pub fn with_metadata(&mut self, metadata: PropertyMap) -> &mut Self {
        self.template.metadata.extend(metadata);
        self
    }

    /// Insert a TOSCA input. Overwriting an existing input with a
    /// differing type is a warning, not an error (§4.2).
    pub fn with_input(&mut self, name: impl Into<String>, param: ParameterDefinition) -> &mut Self {
        let name = name.into();
        if let Some(existing) = self.template.inputs.get(&name) {
            if existing.param_type != param.param_type {
                eprintln!(
                    "warning: input '{name}' redefined with a different type ({:?} -> {:?})",
                    existing.param_type, param.param_type
                );
            }
        }
        self.template.inputs.insert(name, param);
        self
    }

    pub fn with_output(&mut self, name: impl Into<String>, param: ParameterDefinition) -> &mut Self {
        self.template.outputs.insert(name.into(), param);
        self
    }

    pub fn add_node(&mut self, name: impl Into<String>, node_type: impl Into<String>) -> NodeBuilder<'_> {
        let name = name.into();
        self.template
            .node_templates
            .insert(name.clone(), NodeTemplate::new(node_type));
        NodeBuilder {
            node: self.template.node_templates.get_mut(&name).unwrap(),
            name,
        }
    }

    pub fn get_node(&mut self, name: &str) -> Option<NodeBuilder<'_>> {
        let name = name.to_string();
        self.template
            .node_templates
            .get_mut(&name)
            .map(|node| NodeBuilder { node, name })
    }

    pub fn has_node(&self, name: &str) -> bool {
        self.template.node_templates.contains_key(name)
    }

    pub fn add_group(&mut self, name: impl Into<String>, group_type: impl Into<String>) -> GroupBuilder<'_> {
        let name = name.into();
        self.template.groups.insert(
            name.clone(),
            GroupDefinition {
                group_type: group_type.into(),
                ..Default::default()
            },
        );
        GroupBuilder {
            group: self.template.groups.get_mut(&name).unwrap(),
        }
    }

    /// Policies are stored as an ordered list of singleton mappings so the
    /// same name/type pair may repeat.
    pub fn add_policy(&mut self, name: impl Into<String>, policy_type: impl Into<String>) -> PolicyBuilder<'_> {
        self.template
            .policies
            .push((name.into(), PolicyDefinition::new(policy_type)));
        let (_, policy) = self.template.policies.last_mut().unwrap();
        PolicyBuilder { policy }
    }

    pub fn add_workflow(&mut self, name: impl Into<String>) -> WorkflowBuilder<'_> {
        let name = name.into();
        self.template
            .workflows
            .insert(name.clone(), WorkflowDefinition::default());
        WorkflowBuilder {
            workflow: self.template.workflows.get_mut(&name).unwrap(),
        }
    }

    pub fn build(self) -> ServiceTemplate {
        self.template
    }
}

pub struct NodeBuilder<'a> {
    name: String,
    node: &'a mut NodeTemplate,
}

impl<'a> NodeBuilder<'a> {
    pub fn with_description(&mut self, description: impl Into<String>) -> &mut Self {
        self.node.description = Some(description.into());
        self
    }

    pub fn with_metadata(&mut self, metadata: PropertyMap) -> &mut Self {
        self.node.metadata.extend(metadata);
        self
    }

    /// Appends `item` to the array stored at `key` in this node's
    /// metadata, creating an empty array first if absent. Used by
    /// post-pass mappers that fold rules into an existing node (e.g.
    /// security-group ingress/egress rules).
    pub fn append_to_metadata_list(&mut self, key: impl Into<String>, item: Value) -> &mut Self {
        let entry = self.node.metadata.entry(key.into()).or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(items) = entry {
            items.push(item);
        }
        self
    }

    pub fn with_directives(&mut self, directives: &[NodeDirective]) -> &mut Self {
        self.node.directives.extend_from_slice(directives);
        self
    }

    pub fn with_property(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.node.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_properties(&mut self, properties: PropertyMap) -> &mut Self {
        self.node.properties.extend(properties);
        self
    }

    pub fn with_attribute(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.node.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_attributes(&mut self, attributes: PropertyMap) -> &mut Self {
        self.node.attributes.extend(attributes);
        self
    }

    pub fn with_count(&mut self, count: u32) -> &mut Self {
        self.node.count = Some(count);
        self
    }

    pub fn with_copy(&mut self, name: impl Into<String>) -> &mut Self {
        self.node.copy = Some(name.into());
        self
    }

    pub fn has_requirement(&self, name: &str) -> bool {
        self.node.requirements.iter().any(|(n, _)| n == name)
    }

    pub fn add_requirement(&mut self, name: impl Into<String>) -> RequirementBuilder<'_> {
        self.node
            .requirements
            .push((name.into(), RequirementAssignment::default()));
        let (_, req) = self.node.requirements.last_mut().unwrap();
        RequirementBuilder { req }
    }

    pub fn add_capability(&mut self, name: impl Into<String>) -> CapabilityBuilder<'_> {
        let name = name.into();
        self.node
            .capabilities
            .insert(name.clone(), CapabilityAssignment::default());
        CapabilityBuilder {
            cap: self.node.capabilities.get_mut(&name).unwrap(),
        }
    }

    /// Returns the existing capability builder if already present, else
    /// creates it. Post-pass mappers use this to append to a capability a
    /// primary mapper already created (e.g. the LoadBalancer `client`
    /// capability).
    pub fn capability_or_insert(&mut self, name: impl Into<String>) -> CapabilityBuilder<'_> {
        let name = name.into();
        let cap = self.node.capabilities.entry(name).or_default();
        CapabilityBuilder { cap }
    }

    pub fn add_artifact(
        &mut self,
        name: impl Into<String>,
        artifact_type: impl Into<String>,
        file: impl Into<String>,
    ) -> ArtifactBuilder<'_> {
        let name = name.into();
        self.node
            .artifacts
            .insert(name.clone(), ArtifactDefinition::new(artifact_type, file));
        ArtifactBuilder {
            artifact: self.node.artifacts.get_mut(&name).unwrap(),
        }
    }

    pub fn add_interface(&mut self, name: impl Into<String>, value: Value) -> &mut Self {
        self.node.interfaces.insert(name.into(), value);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.node.properties.get(key)
    }
}

pub struct RequirementBuilder<'a> {
    req: &'a mut RequirementAssignment,
}

impl<'a> RequirementBuilder<'a> {
    pub fn to_node(&mut self, name: impl Into<String>) -> &mut Self {
        self.req.node = Some(NodeRef::Name(name.into()));
        self
    }

    pub fn to_node_indexed(&mut self, name: impl Into<String>, index: u32) -> &mut Self {
        self.req.node = Some(NodeRef::NameIndex(name.into(), index));
        self
    }

    pub fn to_capability(&mut self, capability: impl Into<String>) -> &mut Self {
        self.req.capability = Some(capability.into());
        self
    }

    pub fn with_relationship(&mut self, relationship: impl Into<RelationshipValue>) -> &mut Self {
        self.req.relationship = Some(relationship.into());
        self
    }

    pub fn with_properties(&mut self, properties: PropertyMap) -> &mut Self {
        match &mut self.req.relationship {
            Some(RelationshipValue::Mapping { properties: p, .. }) => p.extend(properties),
            other => {
                let relationship_type = match other {
                    Some(RelationshipValue::TypeName(name)) => name.clone(),
                    _ => "DependsOn".to_string(),
                };
                *other = Some(RelationshipValue::Mapping {
                    relationship_type,
                    properties,
                })
            }
        }
        self
    }

    pub fn with_count(&mut self, count: u32) -> &mut Self {
        self.req.count = Some(count);
        self
    }

    pub fn optional(&mut self, optional: bool) -> &mut Self {
        self.req.optional = optional;
        self
    }

    pub fn and_node(&mut self) {}
}

impl From<&str> for RelationshipValue {
    fn from(s: &str) -> Self {
        RelationshipValue::TypeName(s.to_string())
    }
}

impl From<String> for RelationshipValue {
    fn from(s: String) -> Self {
        RelationshipValue::TypeName(s)
    }
}

impl RelationshipValue {
    pub fn mapping(relationship_type: impl Into<String>, properties: PropertyMap) -> Self {
        RelationshipValue::Mapping {
            relationship_type: relationship_type.into(),
            properties,
        }
    }
}

pub struct CapabilityBuilder<'a> {
    cap: &'a mut CapabilityAssignment,
}

impl<'a> CapabilityBuilder<'a> {
    pub fn with_property(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.cap.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_properties(&mut self, properties: PropertyMap) -> &mut Self {
        self.cap.properties.extend(properties);
        self
    }

    pub fn with_attribute(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.cap.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_directives(&mut self, directives: &[CapabilityDirective]) -> &mut Self {
        self.cap.directives.extend_from_slice(directives);
        self
    }

    pub fn and_node(&mut self) {}
}

pub struct ArtifactBuilder<'a> {
    artifact: &'a mut ArtifactDefinition,
}

impl<'a> ArtifactBuilder<'a> {
    pub fn with_repository(&mut self, repository: impl Into<String>) -> &mut Self {
        self.artifact.repository = Some(repository.into());
        self
    }

    pub fn with_version(&mut self, version: impl Into<String>) -> &mut Self {
        self.artifact.artifact_version = Some(version.into());
        self
    }

    pub fn with_checksum(&mut self, checksum: impl Into<String>, algorithm: ChecksumAlgorithm) -> &mut Self {
        self.artifact.checksum = Some(checksum.into());
        self.artifact.checksum_algorithm = Some(algorithm);
        self
    }

    pub fn and_node(&mut self) {}
}

pub struct GroupBuilder<'a> {
    group: &'a mut GroupDefinition,
}

impl<'a> GroupBuilder<'a> {
    pub fn with_property(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.group.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_members(&mut self, members: impl IntoIterator<Item = String>) -> &mut Self {
        self.group.members.extend(members);
        self
    }

    pub fn and_service(&mut self) {}
}

pub struct PolicyBuilder<'a> {
    policy: &'a mut PolicyDefinition,
}

impl<'a> PolicyBuilder<'a> {
    pub fn with_property(&mut self, key: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.policy.properties.insert(key.into(), value.into());
        self
    }

    pub fn with_properties(&mut self, properties: PropertyMap) -> &mut Self {
        self.policy.properties.extend(properties);
        self
    }

    pub fn with_metadata(&mut self, metadata: PropertyMap) -> &mut Self {
        self.policy.metadata.extend(metadata);
        self
    }

    pub fn with_targets(&mut self, targets: impl IntoIterator<Item = String>) -> &mut Self {
        self.policy.targets.extend(targets);
        self
    }

    pub fn and_service(&mut self) {}
}

pub struct WorkflowBuilder<'a> {
    workflow: &'a mut WorkflowDefinition,
}

impl<'a> WorkflowBuilder<'a> {
    pub fn with_input(&mut self, name: impl Into<String>, param: ParameterDefinition) -> &mut Self {
        self.workflow.inputs.insert(name.into(), param);
        self
    }

    pub fn with_steps(&mut self, steps: Value) -> &mut Self {
        self.workflow.steps = Some(steps);
        self
    }

    pub fn and_service(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_node_then_fetch_preserves_properties() {
        let mut builder = ServiceTemplateBuilder::new();
        builder
            .add_node("aws_vpc_main", "Network")
            .with_property("cidr", "10.0.0.0/16")
            .with_property("ip_version", 4);

        let template = builder.build();
        let node = template.node_templates.get("aws_vpc_main").unwrap();
        assert_eq!(node.node_type, "Network");
        assert_eq!(node.properties.get("cidr").unwrap(), "10.0.0.0/16");
    }

    #[test]
    fn requirements_preserve_insertion_order() {
        let mut builder = ServiceTemplateBuilder::new();
        {
            let mut node = builder.add_node("a", "Root");
            node.add_requirement("first").to_node("b").and_node();
            node.add_requirement("second").to_node("c").and_node();
        }
        let template = builder.build();
        let node = template.node_templates.get("a").unwrap();
        let names: Vec<&str> = node.requirements.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["first", "second"]);
    }

    #[test]
    fn node_templates_preserve_insertion_order() {
        let mut builder = ServiceTemplateBuilder::new();
        builder.add_node("z", "Root");
        builder.add_node("a", "Root");
        let template = builder.build();
        let names: Vec<&str> = template.node_templates.keys().map(|s| s.as_str()).collect();
        assert_eq!(names, vec!["z", "a"]);
    }

    #[test]
    fn get_node_allows_post_pass_mutation() {
        let mut builder = ServiceTemplateBuilder::new();
        builder.add_node("sg", "Root");
        {
            let mut node = builder.get_node("sg").expect("node exists");
            node.with_property("ingress_rule_count", 1);
        }
        let template = builder.build();
        assert_eq!(
            template.node_templates.get("sg").unwrap().properties.get("ingress_rule_count"),
            Some(&Value::from(1))
        );
    }

    #[test]
    fn policies_allow_repeated_names() {
        let mut builder = ServiceTemplateBuilder::new();
        builder.add_policy("placement", "Placement").with_targets(vec!["a".to_string()]);
        builder.add_policy("placement", "Placement").with_targets(vec!["b".to_string()]);
        let template = builder.build();
        assert_eq!(template.policies.len(), 2);
    }
}
