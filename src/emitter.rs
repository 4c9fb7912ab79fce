//! C3 — canonical YAML emission.
//!
//! Converts the in-memory [`crate::model::ToscaFile`] into YAML honoring
//! the fixed key order of §4.3, eliding null values and empty maps/lists
//! (including inside nested structures), and injecting generation
//! metadata at the file level.

use serde_yaml::{Mapping, Value};

use crate::errors::EmitError;
use crate::model::*;

pub const GENERATED_BY: &str = "tf2tosca";
pub const GENERATOR_VERSION: &str = env!("CARGO_PKG_VERSION");

fn is_empty(value: &Value) -> bool {
    matches!(value, Value::Null)
        || matches!(value, Value::Sequence(s) if s.is_empty())
        || matches!(value, Value::Mapping(m) if m.is_empty())
}

fn put(map: &mut Mapping, key: &str, value: Value) {
    if !is_empty(&value) {
        map.insert(Value::String(key.to_string()), value);
    }
}

fn json_to_yaml(value: &serde_json::Value) -> Value {
    serde_yaml::to_value(value).unwrap_or(Value::Null)
}

fn property_map_to_yaml(map: &PropertyMap) -> Value {
    let mut out = Mapping::new();
    for (key, value) in map {
        let yaml_value = json_to_yaml(value);
        if !is_empty(&yaml_value) {
            out.insert(Value::String(key.clone()), yaml_value);
        }
    }
    Value::Mapping(out)
}

fn node_ref_to_yaml(node_ref: &NodeRef) -> Value {
    match node_ref {
        NodeRef::Name(name) => Value::String(name.clone()),
        NodeRef::NameIndex(name, index) => {
            Value::Sequence(vec![Value::String(name.clone()), Value::from(*index)])
        }
    }
}

fn relationship_to_yaml(relationship: &RelationshipValue) -> Value {
    match relationship {
        RelationshipValue::TypeName(name) => Value::String(name.clone()),
        RelationshipValue::Mapping {
            relationship_type,
            properties,
        } => {
            let mut m = Mapping::new();
            put(&mut m, "type", Value::String(relationship_type.clone()));
            put(&mut m, "properties", property_map_to_yaml(properties));
            Value::Mapping(m)
        }
    }
}

fn requirement_to_yaml(req: &RequirementAssignment) -> Value {
    let mut m = Mapping::new();
    if let Some(node) = &req.node {
        put(&mut m, "node", node_ref_to_yaml(node));
    }
    if let Some(capability) = &req.capability {
        put(&mut m, "capability", Value::String(capability.clone()));
    }
    if let Some(relationship) = &req.relationship {
        put(&mut m, "relationship", relationship_to_yaml(relationship));
    }
    if let Some(allocation) = &req.allocation {
        put(&mut m, "allocation", json_to_yaml(allocation));
    }
    if let Some(count) = req.count {
        if count != 1 {
            put(&mut m, "count", Value::from(count));
        }
    }
    if let Some(node_filter) = &req.node_filter {
        put(&mut m, "node_filter", json_to_yaml(node_filter));
    }
    if !req.directives.is_empty() {
        put(
            &mut m,
            "directives",
            Value::Sequence(req.directives.iter().map(|d| Value::String(d.clone())).collect()),
        );
    }
    if req.optional {
        put(&mut m, "optional", Value::Bool(true));
    }
    Value::Mapping(m)
}

fn capability_to_yaml(cap: &CapabilityAssignment) -> Value {
    let mut m = Mapping::new();
    put(&mut m, "properties", property_map_to_yaml(&cap.properties));
    put(&mut m, "attributes", property_map_to_yaml(&cap.attributes));
    if !cap.directives.is_empty() {
        put(
            &mut m,
            "directives",
            Value::Sequence(
                cap.directives
                    .iter()
                    .map(|d| Value::String(d.as_str().to_string()))
                    .collect(),
            ),
        );
    }
    Value::Mapping(m)
}

fn artifact_to_yaml(artifact: &ArtifactDefinition) -> Value {
    let mut m = Mapping::new();
    put(&mut m, "type", Value::String(artifact.artifact_type.clone()));
    put(&mut m, "file", Value::String(artifact.file.clone()));
    if let Some(repository) = &artifact.repository {
        put(&mut m, "repository", Value::String(repository.clone()));
    }
    if let Some(version) = &artifact.artifact_version {
        put(&mut m, "artifact_version", Value::String(version.clone()));
    }
    if let Some(checksum) = &artifact.checksum {
        put(&mut m, "checksum", Value::String(checksum.clone()));
    }
    if let Some(algorithm) = artifact.checksum_algorithm {
        put(
            &mut m,
            "checksum_algorithm",
            Value::String(algorithm.as_str().to_string()),
        );
    }
    put(&mut m, "properties", property_map_to_yaml(&artifact.properties));
    Value::Mapping(m)
}

fn node_template_to_yaml(node: &NodeTemplate) -> Value {
    let mut m = Mapping::new();
    put(&mut m, "type", Value::String(node.node_type.clone()));
    if let Some(description) = &node.description {
        put(&mut m, "description", Value::String(description.clone()));
    }
    put(&mut m, "metadata", property_map_to_yaml(&node.metadata));
    if !node.directives.is_empty() {
        put(
            &mut m,
            "directives",
            Value::Sequence(
                node.directives
                    .iter()
                    .map(|d| Value::String(d.as_str().to_string()))
                    .collect(),
            ),
        );
    }
    put(&mut m, "properties", property_map_to_yaml(&node.properties));
    put(&mut m, "attributes", property_map_to_yaml(&node.attributes));
    if !node.requirements.is_empty() {
        let seq = node
            .requirements
            .iter()
            .map(|(name, req)| {
                let mut singleton = Mapping::new();
                singleton.insert(Value::String(name.clone()), requirement_to_yaml(req));
                Value::Mapping(singleton)
            })
            .collect();
        put(&mut m, "requirements", Value::Sequence(seq));
    }
    if !node.capabilities.is_empty() {
        let mut caps = Mapping::new();
        for (name, cap) in &node.capabilities {
            caps.insert(Value::String(name.clone()), capability_to_yaml(cap));
        }
        put(&mut m, "capabilities", Value::Mapping(caps));
    }
    put(&mut m, "interfaces", property_map_to_yaml(&node.interfaces));
    if !node.artifacts.is_empty() {
        let mut arts = Mapping::new();
        for (name, artifact) in &node.artifacts {
            arts.insert(Value::String(name.clone()), artifact_to_yaml(artifact));
        }
        put(&mut m, "artifacts", Value::Mapping(arts));
    }
    if let Some(count) = node.count {
        put(&mut m, "count", Value::from(count));
    }
    if let Some(node_filter) = &node.node_filter {
        put(&mut m, "node_filter", json_to_yaml(node_filter));
    }
    if let Some(copy) = &node.copy {
        put(&mut m, "copy", Value::String(copy.clone()));
    }
    Value::Mapping(m)
}

fn parameter_to_yaml(param: &ParameterDefinition) -> Value {
    let mut m = Mapping::new();
    if let Some(description) = &param.description {
        put(&mut m, "description", Value::String(description.clone()));
    }
    if let Some(param_type) = &param.param_type {
        put(&mut m, "type", Value::String(param_type.clone()));
    }
    if let Some(value) = &param.value {
        put(&mut m, "value", json_to_yaml(value));
    }
    if let Some(mapping) = &param.mapping {
        put(&mut m, "mapping", json_to_yaml(mapping));
    }
    if !param.required {
        put(&mut m, "required", Value::Bool(false));
    }
    if let Some(default) = &param.default {
        put(&mut m, "default", json_to_yaml(default));
    }
    if let Some(validation) = &param.validation {
        put(&mut m, "validation", json_to_yaml(validation));
    }
    if let Some(key_schema) = &param.key_schema {
        put(&mut m, "key_schema", json_to_yaml(key_schema));
    }
    if let Some(entry_schema) = &param.entry_schema {
        put(&mut m, "entry_schema", json_to_yaml(entry_schema));
    }
    Value::Mapping(m)
}

fn trigger_to_yaml(trigger: &TriggerDefinition) -> Value {
    let mut m = Mapping::new();
    put(&mut m, "event", Value::String(trigger.event.clone()));
    put(&mut m, "action", json_to_yaml(&trigger.action));
    if let Some(condition) = &trigger.condition {
        put(&mut m, "condition", json_to_yaml(condition));
    }
    Value::Mapping(m)
}

fn group_to_yaml(group: &GroupDefinition) -> Value {
    let mut m = Mapping::new();
    put(&mut m, "type", Value::String(group.group_type.clone()));
    put(&mut m, "properties", property_map_to_yaml(&group.properties));
    put(&mut m, "attributes", property_map_to_yaml(&group.attributes));
    if !group.members.is_empty() {
        put(
            &mut m,
            "members",
            Value::Sequence(group.members.iter().map(|s| Value::String(s.clone())).collect()),
        );
    }
    Value::Mapping(m)
}

fn policy_to_yaml(policy: &PolicyDefinition) -> Value {
    let mut m = Mapping::new();
    put(&mut m, "type", Value::String(policy.policy_type.clone()));
    put(&mut m, "metadata", property_map_to_yaml(&policy.metadata));
    put(&mut m, "properties", property_map_to_yaml(&policy.properties));
    if !policy.targets.is_empty() {
        put(
            &mut m,
            "targets",
            Value::Sequence(policy.targets.iter().map(|s| Value::String(s.clone())).collect()),
        );
    }
    if !policy.triggers.is_empty() {
        let mut triggers = Mapping::new();
        for (name, trigger) in &policy.triggers {
            triggers.insert(Value::String(name.clone()), trigger_to_yaml(trigger));
        }
        put(&mut m, "triggers", Value::Mapping(triggers));
    }
    Value::Mapping(m)
}

fn workflow_to_yaml(workflow: &WorkflowDefinition) -> Value {
    let mut m = Mapping::new();
    if !workflow.inputs.is_empty() {
        let mut inputs = Mapping::new();
        for (name, param) in &workflow.inputs {
            inputs.insert(Value::String(name.clone()), parameter_to_yaml(param));
        }
        put(&mut m, "inputs", Value::Mapping(inputs));
    }
    if let Some(precondition) = &workflow.precondition {
        put(&mut m, "precondition", json_to_yaml(precondition));
    }
    if let Some(steps) = &workflow.steps {
        put(&mut m, "steps", json_to_yaml(steps));
    }
    if let Some(implementation) = &workflow.implementation {
        put(&mut m, "implementation", json_to_yaml(implementation));
    }
    if !workflow.outputs.is_empty() {
        let mut outputs = Mapping::new();
        for (name, value) in &workflow.outputs {
            outputs.insert(Value::String(name.clone()), json_to_yaml(value));
        }
        put(&mut m, "outputs", Value::Mapping(outputs));
    }
    Value::Mapping(m)
}

fn service_template_to_yaml(template: &ServiceTemplate) -> Value {
    let mut m = Mapping::new();
    if let Some(description) = &template.description {
        put(&mut m, "description", Value::String(description.clone()));
    }
    put(&mut m, "metadata", property_map_to_yaml(&template.metadata));
    if !template.inputs.is_empty() {
        let mut inputs = Mapping::new();
        for (name, param) in &template.inputs {
            inputs.insert(Value::String(name.clone()), parameter_to_yaml(param));
        }
        put(&mut m, "inputs", Value::Mapping(inputs));
    }
    if !template.outputs.is_empty() {
        let mut outputs = Mapping::new();
        for (name, param) in &template.outputs {
            outputs.insert(Value::String(name.clone()), parameter_to_yaml(param));
        }
        put(&mut m, "outputs", Value::Mapping(outputs));
    }
    let mut nodes = Mapping::new();
    for (name, node) in &template.node_templates {
        nodes.insert(Value::String(name.clone()), node_template_to_yaml(node));
    }
    // node_templates is required and always emitted, even when empty
    // (boundary behaviour: an empty plan yields `node_templates: {}`).
    m.insert(Value::String("node_templates".to_string()), Value::Mapping(nodes));
    put(
        &mut m,
        "relationship_templates",
        property_map_to_yaml(&template.relationship_templates),
    );
    if !template.groups.is_empty() {
        let mut groups = Mapping::new();
        for (name, group) in &template.groups {
            groups.insert(Value::String(name.clone()), group_to_yaml(group));
        }
        put(&mut m, "groups", Value::Mapping(groups));
    }
    if !template.policies.is_empty() {
        let seq = template
            .policies
            .iter()
            .map(|(name, policy)| {
                let mut singleton = Mapping::new();
                singleton.insert(Value::String(name.clone()), policy_to_yaml(policy));
                Value::Mapping(singleton)
            })
            .collect();
        put(&mut m, "policies", Value::Sequence(seq));
    }
    if !template.workflows.is_empty() {
        let mut workflows = Mapping::new();
        for (name, workflow) in &template.workflows {
            workflows.insert(Value::String(name.clone()), workflow_to_yaml(workflow));
        }
        put(&mut m, "workflows", Value::Mapping(workflows));
    }
    Value::Mapping(m)
}

fn import_to_yaml(import: &Import) -> Value {
    let mut m = Mapping::new();
    put(&mut m, "url", Value::String(import.url.clone()));
    if let Some(namespace) = &import.namespace {
        put(&mut m, "namespace", Value::String(namespace.clone()));
    }
    Value::Mapping(m)
}

/// Convert the file to a [`serde_yaml::Value`], injecting generation
/// metadata into the file-level `metadata` map.
pub fn to_yaml_value(file: &ToscaFile, generation_timestamp: &str) -> Value {
    let mut m = Mapping::new();
    put(
        &mut m,
        "tosca_definitions_version",
        Value::String(file.tosca_definitions_version.clone()),
    );
    if let Some(description) = &file.description {
        put(&mut m, "description", Value::String(description.clone()));
    }

    let mut metadata = file.metadata.clone();
    metadata.insert(
        "generated_by".to_string(),
        serde_json::Value::String(GENERATED_BY.to_string()),
    );
    metadata.insert(
        "generator_version".to_string(),
        serde_json::Value::String(GENERATOR_VERSION.to_string()),
    );
    metadata.insert(
        "generation_timestamp".to_string(),
        serde_json::Value::String(generation_timestamp.to_string()),
    );
    put(&mut m, "metadata", property_map_to_yaml(&metadata));

    if let Some(profile) = &file.profile {
        put(&mut m, "profile", Value::String(profile.clone()));
    }
    if !file.imports.is_empty() {
        put(
            &mut m,
            "imports",
            Value::Sequence(file.imports.iter().map(import_to_yaml).collect()),
        );
    }
    put(&mut m, "repositories", property_map_to_yaml(&file.repositories));
    put(&mut m, "dsl_definitions", property_map_to_yaml(&file.dsl_definitions));
    if let Some(service_template) = &file.service_template {
        put(
            &mut m,
            "service_template",
            service_template_to_yaml(service_template),
        );
    }
    Value::Mapping(m)
}

/// Serialize the file to a YAML string.
pub fn emit(file: &ToscaFile, generation_timestamp: &str) -> Result<String, EmitError> {
    let value = to_yaml_value(file, generation_timestamp);
    serde_yaml::to_string(&value).map_err(|e| EmitError::Serialization {
        node_path: "$".to_string(),
        reason: e.to_string(),
    })
}

/// Serialize and write the file to `path`.
pub fn write_to_file(
    file: &ToscaFile,
    generation_timestamp: &str,
    path: &std::path::Path,
) -> Result<(), EmitError> {
    let contents = emit(file, generation_timestamp)?;
    std::fs::write(path, contents).map_err(|e| EmitError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ServiceTemplateBuilder;

    #[test]
    fn empty_service_template_emits_empty_node_templates_map() {
        let mut builder = ServiceTemplateBuilder::new();
        let mut file = ToscaFile::new(TOSCA_DEFINITIONS_VERSION).unwrap();
        file.imports.push(Import::new("https://example/tosca-2.0.yaml"));
        file.service_template = Some(builder.build());
        let yaml = emit(&file, "2026-07-31T00:00:00Z").unwrap();
        assert!(yaml.contains("node_templates: {}"));
        assert!(!yaml.contains("null"));
    }

    #[test]
    fn key_order_is_canonical_at_top_level() {
        let mut file = ToscaFile::new(TOSCA_DEFINITIONS_VERSION).unwrap();
        file.description = Some("demo".to_string());
        let value = to_yaml_value(&file, "2026-07-31T00:00:00Z");
        let keys: Vec<String> = match &value {
            Value::Mapping(m) => m.keys().map(|k| k.as_str().unwrap().to_string()).collect(),
            _ => panic!("expected mapping"),
        };
        assert_eq!(keys, vec!["tosca_definitions_version", "description", "metadata"]);
    }

    #[test]
    fn generation_metadata_is_injected() {
        let file = ToscaFile::new(TOSCA_DEFINITIONS_VERSION).unwrap();
        let yaml = emit(&file, "2026-07-31T00:00:00Z").unwrap();
        assert!(yaml.contains("generated_by: tf2tosca"));
        assert!(yaml.contains("generation_timestamp:"));
    }

    #[test]
    fn empty_properties_are_elided() {
        let mut builder = ServiceTemplateBuilder::new();
        builder.add_node("n", "Root");
        let mut file = ToscaFile::new(TOSCA_DEFINITIONS_VERSION).unwrap();
        file.service_template = Some(builder.build());
        let yaml = emit(&file, "2026-07-31T00:00:00Z").unwrap();
        assert!(!yaml.contains("properties:"));
        assert!(!yaml.contains("requirements:"));
    }
}
