//! C1 — typed data model for TOSCA 2.0 Simple Profile service templates.
//!
//! Pure data with structural validators; no I/O and no builder logic (that
//! lives in [`crate::builder`]). Invariants from the specification are
//! either enforced structurally by the Rust type (e.g. the requirement
//! `node` two-entry rule is just a two-variant enum, not a runtime check)
//! or enforced by a validating constructor returning [`InvalidTemplate`].

use indexmap::IndexMap;
use serde_json::Value;

use crate::errors::InvalidTemplate;

/// Generic property/attribute/metadata bag. Order-preserving so the
/// emitter can round-trip insertion order.
pub type PropertyMap = IndexMap<String, Value>;

pub const TOSCA_DEFINITIONS_VERSION: &str = "tosca_2_0";

#[derive(Debug, Clone)]
pub struct Import {
    pub url: String,
    pub namespace: Option<String>,
}

impl Import {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            namespace: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ToscaFile {
    pub tosca_definitions_version: String,
    pub description: Option<String>,
    pub metadata: PropertyMap,
    pub profile: Option<String>,
    pub imports: Vec<Import>,
    pub repositories: PropertyMap,
    pub dsl_definitions: PropertyMap,
    pub service_template: Option<ServiceTemplate>,
}

impl ToscaFile {
    /// Build a new file, validating that `tosca_definitions_version` is
    /// exactly `tosca_2_0`.
    pub fn new(tosca_definitions_version: impl Into<String>) -> Result<Self, InvalidTemplate> {
        let version = tosca_definitions_version.into();
        if version != TOSCA_DEFINITIONS_VERSION {
            return Err(InvalidTemplate::new(
                "tosca_definitions_version",
                format!("must be '{TOSCA_DEFINITIONS_VERSION}', got '{version}'"),
            ));
        }
        Ok(Self {
            tosca_definitions_version: version,
            description: None,
            metadata: PropertyMap::new(),
            profile: None,
            imports: Vec::new(),
            repositories: PropertyMap::new(),
            dsl_definitions: PropertyMap::new(),
            service_template: None,
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct ServiceTemplate {
    pub description: Option<String>,
    pub metadata: PropertyMap,
    pub inputs: IndexMap<String, ParameterDefinition>,
    pub outputs: IndexMap<String, ParameterDefinition>,
    /// Key order preserved; this is the load-bearing map of the whole
    /// translation.
    pub node_templates: IndexMap<String, NodeTemplate>,
    pub relationship_templates: PropertyMap,
    pub groups: IndexMap<String, GroupDefinition>,
    /// Ordered list of singleton mappings, so the same policy type can
    /// repeat under different names without a map collision.
    pub policies: Vec<(String, PolicyDefinition)>,
    pub workflows: IndexMap<String, WorkflowDefinition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeDirective {
    Create,
    Select,
    Substitute,
}

impl NodeDirective {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeDirective::Create => "create",
            NodeDirective::Select => "select",
            NodeDirective::Substitute => "substitute",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NodeTemplate {
    pub node_type: String,
    pub description: Option<String>,
    pub metadata: PropertyMap,
    pub directives: Vec<NodeDirective>,
    pub properties: PropertyMap,
    pub attributes: PropertyMap,
    /// Ordered list of singleton mappings: `[{name: assignment}, ...]`.
    pub requirements: Vec<(String, RequirementAssignment)>,
    pub capabilities: IndexMap<String, CapabilityAssignment>,
    pub interfaces: PropertyMap,
    pub artifacts: IndexMap<String, ArtifactDefinition>,
    pub count: Option<u32>,
    pub node_filter: Option<Value>,
    pub copy: Option<String>,
}

impl NodeTemplate {
    pub fn new(node_type: impl Into<String>) -> Self {
        Self {
            node_type: node_type.into(),
            ..Default::default()
        }
    }
}

/// `node` field of a requirement assignment: either a bare node name, or a
/// `[name, index]` pair. Modeled as a two-variant enum so the "exactly two
/// entries" invariant is structural, not a runtime check.
#[derive(Debug, Clone)]
pub enum NodeRef {
    Name(String),
    NameIndex(String, u32),
}

#[derive(Debug, Clone)]
pub enum RelationshipValue {
    TypeName(String),
    Mapping {
        relationship_type: String,
        properties: PropertyMap,
    },
}

#[derive(Debug, Clone, Default)]
pub struct RequirementAssignment {
    pub node: Option<NodeRef>,
    pub capability: Option<String>,
    pub relationship: Option<RelationshipValue>,
    pub allocation: Option<Value>,
    pub count: Option<u32>,
    pub node_filter: Option<Value>,
    pub directives: Vec<String>,
    pub optional: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityDirective {
    Internal,
    External,
}

impl CapabilityDirective {
    pub fn as_str(self) -> &'static str {
        match self {
            CapabilityDirective::Internal => "internal",
            CapabilityDirective::External => "external",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CapabilityAssignment {
    pub properties: PropertyMap,
    pub attributes: PropertyMap,
    pub directives: Vec<CapabilityDirective>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChecksumAlgorithm {
    Md5,
    Sha1,
    Sha256,
    Sha512,
}

impl ChecksumAlgorithm {
    pub fn as_str(self) -> &'static str {
        match self {
            ChecksumAlgorithm::Md5 => "MD5",
            ChecksumAlgorithm::Sha1 => "SHA-1",
            ChecksumAlgorithm::Sha256 => "SHA-256",
            ChecksumAlgorithm::Sha512 => "SHA-512",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ArtifactDefinition {
    pub artifact_type: String,
    pub file: String,
    pub repository: Option<String>,
    pub artifact_version: Option<String>,
    pub checksum: Option<String>,
    pub checksum_algorithm: Option<ChecksumAlgorithm>,
    pub properties: PropertyMap,
}

impl ArtifactDefinition {
    pub fn new(artifact_type: impl Into<String>, file: impl Into<String>) -> Self {
        Self {
            artifact_type: artifact_type.into(),
            file: file.into(),
            repository: None,
            artifact_version: None,
            checksum: None,
            checksum_algorithm: None,
            properties: PropertyMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GroupDefinition {
    pub group_type: String,
    pub properties: PropertyMap,
    pub attributes: PropertyMap,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct PolicyDefinition {
    pub policy_type: String,
    pub properties: PropertyMap,
    /// Not a TOSCA 2.0 field; carried here because Placement policies in
    /// this profile record their subnet discovery detail under `metadata`
    /// rather than `properties` (see §4.6.3).
    pub metadata: PropertyMap,
    pub targets: Vec<String>,
    pub triggers: IndexMap<String, TriggerDefinition>,
}

impl PolicyDefinition {
    pub fn new(policy_type: impl Into<String>) -> Self {
        Self {
            policy_type: policy_type.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParameterDefinition {
    pub param_type: Option<String>,
    pub value: Option<Value>,
    pub mapping: Option<Value>,
    pub required: bool,
    pub default: Option<Value>,
    pub validation: Option<Value>,
    pub key_schema: Option<Value>,
    pub entry_schema: Option<Value>,
    pub description: Option<String>,
}

impl ParameterDefinition {
    /// `required` defaults to `true` per §3.2.
    pub fn new() -> Self {
        Self {
            required: true,
            ..Default::default()
        }
    }

    /// Validates the `value`/`mapping` mutual exclusion and the
    /// `default` vs. `required=false` prohibition.
    pub fn validate(&self) -> Result<(), InvalidTemplate> {
        if self.value.is_some() && self.mapping.is_some() {
            return Err(InvalidTemplate::new(
                "value",
                "'value' and 'mapping' are mutually exclusive",
            ));
        }
        if !self.required && self.default.is_some() {
            return Err(InvalidTemplate::new(
                "default",
                "forbidden when required=false",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct WorkflowDefinition {
    pub inputs: IndexMap<String, ParameterDefinition>,
    pub precondition: Option<Value>,
    pub steps: Option<Value>,
    pub implementation: Option<Value>,
    pub outputs: IndexMap<String, Value>,
}

impl WorkflowDefinition {
    pub fn validate(&self) -> Result<(), InvalidTemplate> {
        if self.steps.is_some() && self.implementation.is_some() {
            return Err(InvalidTemplate::new(
                "steps",
                "'steps' and 'implementation' are mutually exclusive",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct TriggerDefinition {
    pub event: String,
    pub action: Value,
    pub condition: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tosca_file_rejects_wrong_version() {
        let err = ToscaFile::new("tosca_1_3").unwrap_err();
        assert_eq!(err.field, "tosca_definitions_version");
    }

    #[test]
    fn tosca_file_accepts_canonical_version() {
        assert!(ToscaFile::new(TOSCA_DEFINITIONS_VERSION).is_ok());
    }

    #[test]
    fn parameter_value_and_mapping_are_exclusive() {
        let mut p = ParameterDefinition::new();
        p.value = Some(Value::String("x".into()));
        p.mapping = Some(Value::String("y".into()));
        assert!(p.validate().is_err());
    }

    #[test]
    fn parameter_default_forbidden_when_not_required() {
        let mut p = ParameterDefinition::new();
        p.required = false;
        p.default = Some(Value::Bool(true));
        assert!(p.validate().is_err());
    }

    #[test]
    fn parameter_required_with_no_default_is_valid() {
        let p = ParameterDefinition::new();
        assert!(p.validate().is_ok());
        assert!(p.required);
    }

    #[test]
    fn workflow_steps_and_implementation_are_exclusive() {
        let mut w = WorkflowDefinition::default();
        w.steps = Some(Value::Array(vec![]));
        w.implementation = Some(Value::String("script.sh".into()));
        assert!(w.validate().is_err());
    }
}
