//! C5 — reference resolver: address parsing, TOSCA node-name generation,
//! and dependency-edge extraction/classification.
//!
//! Ground: `original_source/src/plugins/terraform/context.py`
//! (`TerraformMappingContext.extract_terraform_references`,
//! `_determine_terraform_relationship_type`).

use regex::Regex;
use serde_json::Value;

use crate::plan::{ParsedPlan, PlannedResource};

/// Parsed form of a Terraform resource address:
/// `module.<m>.<type>.<name>[idx]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub module: Vec<String>,
    pub resource_type: String,
    pub name: String,
    pub index: Option<String>,
}

fn strip_index(segment: &str) -> (String, Option<String>) {
    if let Some(open) = segment.find('[') {
        if let Some(close) = segment.find(']') {
            if close > open {
                let idx = segment[open + 1..close].trim_matches('"').to_string();
                return (segment[..open].to_string(), Some(idx));
            }
        }
    }
    (segment.to_string(), None)
}

/// Parses `module.<m>.<type>.<name>[idx]`, optionally nested
/// (`module.a.module.b.<type>.<name>`). Non-module-prefixed addresses are
/// just `<type>.<name>[idx]`.
pub fn parse_address(address: &str) -> Address {
    let segments: Vec<&str> = address.split('.').collect();
    let mut module = Vec::new();
    let mut i = 0;
    while i + 1 < segments.len() && segments[i] == "module" {
        module.push(segments[i + 1].to_string());
        i += 2;
    }
    let resource_type = segments.get(i).copied().unwrap_or_default().to_string();
    let (name, index) = segments
        .get(i + 1)
        .map(|s| strip_index(s))
        .unwrap_or_default();
    Address {
        module,
        resource_type,
        name,
        index,
    }
}

fn normalize(segment: &str) -> String {
    let re = Regex::new(r"[^A-Za-z0-9_]").expect("static pattern is valid");
    re.replace_all(segment, "_").to_string()
}

/// `join(module_segments + [type, name, index], "_")` with non-identifier
/// characters normalized to `_` (§4.5).
pub fn tosca_node_name(address: &Address) -> String {
    let mut parts: Vec<String> = address.module.iter().map(|s| normalize(s)).collect();
    parts.push(normalize(&address.resource_type));
    parts.push(normalize(&address.name));
    if let Some(idx) = &address.index {
        parts.push(normalize(idx));
    }
    parts.join("_")
}

/// Convenience: parse then generate in one step.
pub fn node_name_for_address(address: &str) -> String {
    tosca_node_name(&parse_address(address))
}

fn resource_index_string(resource: &PlannedResource) -> Option<String> {
    resource.index.as_ref().map(|v| match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    })
}

/// §4.5.2 index-aware target resolution: resolve a raw reference such as
/// `aws_subnet.a` or `aws_subnet.a[0]` to a concrete TOSCA node name,
/// aligning by the source resource's own index when the target itself
/// carries none.
pub fn resolve_target(plan: &ParsedPlan, raw_target: &str, source: &PlannedResource) -> String {
    let mut address = parse_address(raw_target);
    if address.index.is_some() {
        return tosca_node_name(&address);
    }

    let candidates: Vec<&PlannedResource> = plan
        .all_planned_resources()
        .into_iter()
        .filter(|r| {
            let a = parse_address(&r.address);
            a.resource_type == address.resource_type
                && a.name == address.name
                && a.module == address.module
        })
        .collect();

    if let Some(source_index) = resource_index_string(source) {
        if let Some(found) = candidates.iter().find(|r| {
            parse_address(&r.address).index.as_deref() == Some(source_index.as_str())
        }) {
            return node_name_for_address(&found.address);
        }
    }

    if let Some(first_indexed) = candidates
        .iter()
        .find(|r| parse_address(&r.address).index.is_some())
    {
        return node_name_for_address(&first_indexed.address);
    }

    address.index = None;
    tosca_node_name(&address)
}

/// One resolved, classified dependency edge.
#[derive(Debug, Clone)]
pub struct ReferenceEdge {
    pub property: String,
    pub target: String,
    pub relationship: &'static str,
}

/// §4.5.3 relationship classification table.
pub fn classify_relationship(property: &str, target_type: Option<&str>) -> &'static str {
    if matches!(property, "subnet_id" | "subnet_ids" | "vpc_id") {
        return "DependsOn";
    }
    if property.contains("network") {
        return match target_type {
            Some(t) if t.starts_with("aws_network_") || t == "aws_subnet" => "LinksTo",
            _ => "DependsOn",
        };
    }
    if property.starts_with("load_balancer") || property.starts_with("target_group") {
        return "ConnectsTo";
    }
    if matches!(property, "instance_id" | "instance_ids") {
        return "HostedOn";
    }
    if property.starts_with("security_group") {
        return "DependsOn";
    }
    "DependsOn"
}

fn target_resource_type(plan: &ParsedPlan, raw_target: &str) -> Option<String> {
    let address = parse_address(raw_target);
    plan.all_planned_resources()
        .into_iter()
        .find(|r| {
            let a = parse_address(&r.address);
            a.resource_type == address.resource_type && a.name == address.name
        })
        .map(|r| r.resource_type.clone())
}

/// Strip a trailing `.id` component from a configuration `references`
/// entry, e.g. `aws_vpc.main.id` → `aws_vpc.main`.
fn strip_trailing_id(raw_ref: &str) -> &str {
    raw_ref.strip_suffix(".id").unwrap_or(raw_ref)
}

/// §4.5.1: extract, classify, and deduplicate (by resolved target) the
/// dependency edges for one resource.
pub fn extract_references(plan: &ParsedPlan, resource: &PlannedResource) -> Vec<ReferenceEdge> {
    let mut edges: Vec<ReferenceEdge> = Vec::new();
    let mut seen = std::collections::HashSet::new();

    if let Some(config) = plan.config_resource(&resource.address) {
        for (property, expr) in &config.expressions {
            for raw_ref in &expr.references {
                if raw_ref.starts_with("var.") {
                    continue;
                }
                let trimmed = strip_trailing_id(raw_ref);
                let target_type = target_resource_type(plan, trimmed);
                let relationship = classify_relationship(property, target_type.as_deref());
                let target = resolve_target(plan, trimmed, resource);
                if seen.insert(target.clone()) {
                    edges.push(ReferenceEdge {
                        property: property.clone(),
                        target,
                        relationship,
                    });
                }
            }
        }
    }

    for dep in &resource.depends_on {
        let target_type = target_resource_type(plan, dep);
        let relationship = classify_relationship("dependency", target_type.as_deref());
        let target = resolve_target(plan, dep, resource);
        if seen.insert(target.clone()) {
            edges.push(ReferenceEdge {
                property: "dependency".to_string(),
                target,
                relationship,
            });
        }
    }

    if resource.depends_on.is_empty() {
        if let Some(vpc_id) = resource.values.get("vpc_id").and_then(Value::as_str) {
            if let Some(vpc) = plan.all_planned_resources().into_iter().find(|r| {
                r.resource_type == "aws_vpc" && r.values.get("id").and_then(Value::as_str) == Some(vpc_id)
            }) {
                let target = node_name_for_address(&vpc.address);
                if seen.insert(target.clone()) {
                    edges.push(ReferenceEdge {
                        property: "vpc_id".to_string(),
                        target,
                        relationship: classify_relationship("vpc_id", Some("aws_vpc")),
                    });
                }
            }
        }
    }

    edges
}

/// Excludes specified source-property names or target node names from an
/// edge list (§4.5.4), used by dispatch/mappers to suppress edges a
/// specialized mapper already handles explicitly.
pub fn filter_edges(
    edges: Vec<ReferenceEdge>,
    exclude_properties: &[&str],
    exclude_targets: &[&str],
) -> Vec<ReferenceEdge> {
    edges
        .into_iter()
        .filter(|e| {
            !exclude_properties.contains(&e.property.as_str()) && !exclude_targets.contains(&e.target.as_str())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_simple_address() {
        let a = parse_address("aws_subnet.a");
        assert_eq!(a.resource_type, "aws_subnet");
        assert_eq!(a.name, "a");
        assert!(a.index.is_none());
    }

    #[test]
    fn parses_indexed_module_address() {
        let a = parse_address("module.net.aws_subnet.a[2]");
        assert_eq!(a.module, vec!["net".to_string()]);
        assert_eq!(a.name, "a");
        assert_eq!(a.index.as_deref(), Some("2"));
    }

    #[test]
    fn node_name_joins_and_normalizes() {
        let a = parse_address("module.net.aws_subnet.a[2]");
        assert_eq!(tosca_node_name(&a), "net_aws_subnet_a_2");
    }

    #[test]
    fn classification_table_matches_spec() {
        assert_eq!(classify_relationship("subnet_id", None), "DependsOn");
        assert_eq!(
            classify_relationship("network_interface", Some("aws_subnet")),
            "LinksTo"
        );
        assert_eq!(
            classify_relationship("network_interface", Some("aws_instance")),
            "DependsOn"
        );
        assert_eq!(classify_relationship("target_group_arn", None), "ConnectsTo");
        assert_eq!(classify_relationship("instance_id", None), "HostedOn");
        assert_eq!(classify_relationship("security_group_ids", None), "DependsOn");
        assert_eq!(classify_relationship("whatever", None), "DependsOn");
    }

    fn make_plan(json: &str) -> ParsedPlan {
        ParsedPlan::from_json(json).unwrap()
    }

    #[test]
    fn extracts_and_strips_trailing_id_from_configuration() {
        let plan = make_plan(
            r#"{
            "configuration": {"root_module": {"resources": [
                {"address": "aws_instance.web", "type": "aws_instance", "name": "web",
                 "expressions": {"subnet_id": {"references": ["aws_subnet.a.id"]}}}
            ]}},
            "planned_values": {"root_module": {"resources": [
                {"address": "aws_instance.web", "type": "aws_instance", "name": "web", "values": {}},
                {"address": "aws_subnet.a", "type": "aws_subnet", "name": "a", "values": {}}
            ]}}
        }"#,
        );
        let web = &plan.all_planned_resources()[0];
        let edges = extract_references(&plan, web);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].target, "aws_subnet_a");
        assert_eq!(edges[0].relationship, "DependsOn");
    }

    #[test]
    fn var_references_are_skipped() {
        let plan = make_plan(
            r#"{
            "configuration": {"root_module": {"resources": [
                {"address": "aws_instance.web", "type": "aws_instance", "name": "web",
                 "expressions": {"ami": {"references": ["var.ami_id"]}}}
            ]}},
            "planned_values": {"root_module": {"resources": [
                {"address": "aws_instance.web", "type": "aws_instance", "name": "web", "values": {}}
            ]}}
        }"#,
        );
        let web = &plan.all_planned_resources()[0];
        assert!(extract_references(&plan, web).is_empty());
    }

    #[test]
    fn value_pattern_fallback_only_when_depends_on_empty() {
        let plan = make_plan(
            r#"{
            "planned_values": {"root_module": {"resources": [
                {"address": "aws_subnet.a", "type": "aws_subnet", "name": "a", "values": {"vpc_id": "vpc-1"}},
                {"address": "aws_vpc.main", "type": "aws_vpc", "name": "main", "values": {"id": "vpc-1"}}
            ]}}
        }"#,
        );
        let subnet = &plan.all_planned_resources()[0];
        let edges = extract_references(&plan, subnet);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].target, "aws_vpc_main");
    }
}
