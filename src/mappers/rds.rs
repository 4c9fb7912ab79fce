//! Composite DB mappers (`aws_db_instance`, `aws_rds_cluster`) and the
//! subnet-group Placement policy mappers.
//!
//! Ground: `original_source/src/plugins/terraform/mappers/aws/aws_db_subnet_group.py`
//! for the Placement-policy-builder and target-discovery pattern.

use serde_json::{json, Value};

use crate::builder::ServiceTemplateBuilder;
use crate::dispatch::MappingContext;
use crate::errors::MappingError;
use crate::model::PropertyMap;
use crate::plan::PlannedResource;
use crate::reference::{node_name_for_address, parse_address};
use crate::variables::ResolveContext;

use super::{add_dependency_requirements, base_metadata, node_name, require_values, ResourceMapper};

fn normalize_engine(engine: &str) -> String {
    match engine {
        "postgres" => "PostgreSQL".to_string(),
        "aurora-postgresql" => "Aurora PostgreSQL".to_string(),
        "aurora-mysql" | "aurora" => "Aurora MySQL".to_string(),
        "mysql" => "MySQL".to_string(),
        "mariadb" => "MariaDB".to_string(),
        other if other.starts_with("oracle") => "Oracle".to_string(),
        other if other.starts_with("sqlserver") => "SQL Server".to_string(),
        other => other.to_string(),
    }
}

fn default_port_for_engine(engine: &str) -> u32 {
    match engine {
        "mysql" | "mariadb" | "aurora" | "aurora-mysql" => 3306,
        "postgres" | "aurora-postgresql" => 5432,
        other if other.starts_with("oracle") => 1521,
        other if other.starts_with("sqlserver") => 1433,
        _ => 3306,
    }
}

fn map_composite_database(
    resource: &PlannedResource,
    builder: &mut ServiceTemplateBuilder,
    ctx: &MappingContext,
    component_type: &str,
) -> Result<(), MappingError> {
    let Some(values) = require_values(resource) else { return Ok(()) };
    let values = values.clone();

    let base = node_name(resource);
    let dbms_name = format!("{base}_dbms");
    let database_name = format!("{base}_database");

    let engine_raw = values.get("engine").and_then(Value::as_str).unwrap_or("").to_string();
    let engine_normalized = normalize_engine(&engine_raw);
    let explicit_port = values.get("port").and_then(Value::as_u64).map(|p| p as u32);
    let port = explicit_port.unwrap_or_else(|| default_port_for_engine(&engine_raw));

    {
        let mut dbms_metadata = base_metadata(resource, component_type);
        if explicit_port.is_none() {
            dbms_metadata.insert("aws_default_port".to_string(), json!(port));
        }
        let mut dbms = builder.add_node(dbms_name.clone(), "DBMS");
        dbms.with_metadata(dbms_metadata);
        dbms.with_property("engine_type", json!(engine_normalized));
        dbms.with_property("port", port);
        if let Some(version) = values.get("engine_version") {
            dbms.with_property(
                "version",
                ctx.resolve(&resource.address, "engine_version", version, ResolveContext::Property),
            );
        }
        add_dependency_requirements(&mut dbms, ctx, resource, &[]);
    }
    {
        let db_name_value = values
            .get("db_name")
            .or_else(|| values.get("database_name"))
            .cloned()
            .unwrap_or_else(|| json!(resource.name));
        let mut database_metadata = base_metadata(resource, component_type);
        database_metadata.insert("aws_database_name".to_string(), db_name_value.clone());
        if explicit_port.is_none() {
            database_metadata.insert("aws_default_port".to_string(), json!(port));
        }
        let mut database = builder.add_node(database_name.clone(), "Database");
        database.with_metadata(database_metadata);
        database.with_property(
            "name",
            ctx.resolve(&resource.address, "db_name", &db_name_value, ResolveContext::Property),
        );
        database.with_property("port", port);
        if let Some(username) = values.get("username") {
            database.with_property(
                "user",
                ctx.resolve(&resource.address, "username", username, ResolveContext::Property),
            );
        }
        database
            .add_requirement("host")
            .to_node(dbms_name)
            .with_relationship("HostedOn")
            .and_node();
    }
    Ok(())
}

pub struct DbInstanceMapper;

impl ResourceMapper for DbInstanceMapper {
    fn can_map(&self, resource_type: &str) -> bool {
        resource_type == "aws_db_instance"
    }

    fn map(&self, resource: &PlannedResource, builder: &mut ServiceTemplateBuilder, ctx: &MappingContext) -> Result<(), MappingError> {
        map_composite_database(resource, builder, ctx, "DbInstance")
    }
}

pub struct RdsClusterMapper;

impl ResourceMapper for RdsClusterMapper {
    fn can_map(&self, resource_type: &str) -> bool {
        resource_type == "aws_rds_cluster"
    }

    fn map(&self, resource: &PlannedResource, builder: &mut ServiceTemplateBuilder, ctx: &MappingContext) -> Result<(), MappingError> {
        map_composite_database(resource, builder, ctx, "RdsCluster")
    }
}

/// Resolves the `aws_subnet` resources feeding a subnet-group resource,
/// preferring the configuration reference list over value-based ID
/// matching (ground: `aws_db_subnet_group.py::_extract_subnet_information`).
fn referenced_subnets<'a>(ctx: &MappingContext<'a>, resource: &PlannedResource) -> Vec<&'a PlannedResource> {
    let mut out = Vec::new();
    if let Some(config) = ctx.plan.config_resource(&resource.address) {
        if let Some(expr) = config.expressions.get("subnet_ids") {
            for raw in &expr.references {
                let trimmed = raw.strip_suffix(".id").unwrap_or(raw);
                let address = parse_address(trimmed);
                if let Some(found) = ctx.plan.all_planned_resources().into_iter().find(|r| {
                    let a = parse_address(&r.address);
                    a.resource_type == address.resource_type && a.name == address.name
                }) {
                    out.push(found);
                }
            }
        }
    }
    if out.is_empty() {
        if let Some(ids) = resource.values.get("subnet_ids").and_then(Value::as_array) {
            for id in ids.iter().filter_map(Value::as_str) {
                if let Some(found) = ctx.plan.all_planned_resources().into_iter().find(|r| {
                    r.resource_type == "aws_subnet" && r.values.get("id").and_then(Value::as_str) == Some(id)
                }) {
                    out.push(found);
                }
            }
        }
    }
    out
}

fn subnet_detail(subnet: &PlannedResource) -> Value {
    let mut detail = serde_json::Map::new();
    detail.insert("id".to_string(), subnet.values.get("id").cloned().unwrap_or(Value::Null));
    detail.insert(
        "cidr".to_string(),
        subnet.values.get("cidr_block").cloned().unwrap_or(Value::Null),
    );
    detail.insert(
        "availability_zone".to_string(),
        subnet.values.get("availability_zone").cloned().unwrap_or(Value::Null),
    );
    Value::Object(detail)
}

/// Scans `planned_values` for consumer resources referencing this subnet
/// group by name, returning the TOSCA node name(s) each should be
/// targeted by — the DBMS/Database pair for composite database mappers,
/// or the bare node name otherwise.
fn find_database_targets(
    ctx: &MappingContext,
    group_name: &str,
    consumer_types: &[&str],
    property_name: &str,
    composite: bool,
) -> Vec<String> {
    let mut out = Vec::new();
    for r in ctx.plan.all_planned_resources() {
        if !consumer_types.contains(&r.resource_type.as_str()) {
            continue;
        }
        if r.values.get(property_name).and_then(Value::as_str) == Some(group_name) {
            let base = node_name_for_address(&r.address);
            if composite {
                out.push(format!("{base}_dbms"));
                out.push(format!("{base}_database"));
            } else {
                out.push(base);
            }
        }
    }
    out
}

fn own_name_or_clean(resource: &PlannedResource) -> String {
    resource
        .values
        .get("name")
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| resource.name.clone())
}

pub struct DbSubnetGroupMapper;

impl ResourceMapper for DbSubnetGroupMapper {
    fn can_map(&self, resource_type: &str) -> bool {
        resource_type == "aws_db_subnet_group"
    }

    fn map(&self, resource: &PlannedResource, builder: &mut ServiceTemplateBuilder, ctx: &MappingContext) -> Result<(), MappingError> {
        if require_values(resource).is_none() {
            return Ok(());
        }
        let referenced = referenced_subnets(ctx, resource);
        let subnet_count = referenced.len() as u64;
        let subnets: Vec<Value> = referenced.into_iter().map(subnet_detail).collect();
        let group_name = own_name_or_clean(resource);
        let targets = find_database_targets(ctx, &group_name, &["aws_db_instance", "aws_rds_cluster"], "db_subnet_group_name", true);

        let mut metadata = PropertyMap::new();
        metadata.insert("subnets".to_string(), Value::Array(subnets));
        builder
            .add_policy(node_name(resource), "Placement")
            .with_metadata(metadata)
            .with_property("placement_zone", "subnet_group")
            .with_property("availability_zones", subnet_count)
            .with_targets(targets);
        Ok(())
    }
}

fn normalize_cache_engine(engine: &str) -> String {
    match engine {
        "redis" => "Redis".to_string(),
        "memcached" => "Memcached".to_string(),
        "valkey" => "Valkey".to_string(),
        other => other.to_string(),
    }
}

fn default_port_for_cache_engine(engine: &str) -> u32 {
    match engine {
        "memcached" => 11211,
        _ => 6379,
    }
}

/// Composite DBMS+Database mapper shared by `aws_elasticache_cluster` and
/// `aws_elasticache_replication_group` — ground:
/// `original_source/tests/unit/plugins/terraform/mappers/aws/test_aws_elasticache_cluster_mapper.py`,
/// re-expressed for the replication-group resource type by the same
/// conventions (`replication_group_id` standing in for `cluster_id`).
fn map_composite_cache(
    resource: &PlannedResource,
    builder: &mut ServiceTemplateBuilder,
    ctx: &MappingContext,
    component_type: &str,
    id_property: &str,
) -> Result<(), MappingError> {
    let Some(values) = require_values(resource) else { return Ok(()) };
    let values = values.clone();

    let base = node_name(resource);
    let dbms_name = format!("{base}_dbms");
    let database_name = format!("{base}_database");

    let engine_raw = values.get("engine").and_then(Value::as_str).unwrap_or("").to_string();
    let engine_normalized = normalize_cache_engine(&engine_raw);
    let explicit_port = values
        .get("port")
        .and_then(Value::as_u64)
        .map(|p| p as u32)
        .filter(|p| (1..=65535).contains(p));
    let port = explicit_port.unwrap_or_else(|| default_port_for_cache_engine(&engine_raw));

    {
        let mut dbms_metadata = base_metadata(resource, component_type);
        dbms_metadata.insert("aws_engine".to_string(), json!(engine_raw));
        dbms_metadata.insert("engine_type".to_string(), json!(engine_normalized));
        if let Some(version) = values.get("engine_version") {
            dbms_metadata.insert("aws_engine_version".to_string(), version.clone());
        }
        if explicit_port.is_none() {
            dbms_metadata.insert("aws_default_port".to_string(), json!(port));
        }
        let mut dbms = builder.add_node(dbms_name.clone(), "DBMS");
        dbms.with_metadata(dbms_metadata);
        dbms.with_property("port", port);
        dbms.add_capability("host").and_node();
        add_dependency_requirements(&mut dbms, ctx, resource, &[]);
    }
    {
        let id_value = values.get(id_property).cloned().unwrap_or_else(|| json!(resource.name));
        let mut database_metadata = base_metadata(resource, component_type);
        database_metadata.insert("aws_engine".to_string(), json!(engine_raw));
        if explicit_port.is_none() {
            database_metadata.insert("aws_default_port".to_string(), json!(port));
        }
        if let Some(transit) = values.get("transit_encryption_enabled") {
            database_metadata.insert("aws_transit_encryption_enabled".to_string(), transit.clone());
        }
        if let Some(at_rest) = values.get("at_rest_encryption_enabled") {
            database_metadata.insert("aws_at_rest_encryption_enabled".to_string(), at_rest.clone());
        }
        let mut database = builder.add_node(database_name.clone(), "Database");
        database.with_metadata(database_metadata);
        database.with_property(
            "name",
            ctx.resolve(&resource.address, id_property, &id_value, ResolveContext::Property),
        );
        database.with_property("port", port);
        database.add_capability("database_endpoint").and_node();
        database
            .add_requirement("host")
            .to_node(dbms_name)
            .with_relationship("HostedOn")
            .and_node();
    }
    Ok(())
}

pub struct ElastiCacheClusterMapper;

impl ResourceMapper for ElastiCacheClusterMapper {
    fn can_map(&self, resource_type: &str) -> bool {
        resource_type == "aws_elasticache_cluster"
    }

    fn map(&self, resource: &PlannedResource, builder: &mut ServiceTemplateBuilder, ctx: &MappingContext) -> Result<(), MappingError> {
        map_composite_cache(resource, builder, ctx, "ElastiCacheCluster", "cluster_id")
    }
}

pub struct ElastiCacheReplicationGroupMapper;

impl ResourceMapper for ElastiCacheReplicationGroupMapper {
    fn can_map(&self, resource_type: &str) -> bool {
        resource_type == "aws_elasticache_replication_group"
    }

    fn map(&self, resource: &PlannedResource, builder: &mut ServiceTemplateBuilder, ctx: &MappingContext) -> Result<(), MappingError> {
        map_composite_cache(resource, builder, ctx, "ElastiCacheReplicationGroup", "replication_group_id")
    }
}

pub struct ElastiCacheSubnetGroupMapper;

impl ResourceMapper for ElastiCacheSubnetGroupMapper {
    fn can_map(&self, resource_type: &str) -> bool {
        resource_type == "aws_elasticache_subnet_group"
    }

    fn map(&self, resource: &PlannedResource, builder: &mut ServiceTemplateBuilder, ctx: &MappingContext) -> Result<(), MappingError> {
        if require_values(resource).is_none() {
            return Ok(());
        }
        let referenced = referenced_subnets(ctx, resource);
        let subnet_count = referenced.len() as u64;
        let subnets: Vec<Value> = referenced.into_iter().map(subnet_detail).collect();
        let group_name = own_name_or_clean(resource);
        let targets = find_database_targets(
            ctx,
            &group_name,
            &["aws_elasticache_cluster", "aws_elasticache_replication_group"],
            "subnet_group_name",
            false,
        );

        let mut metadata = PropertyMap::new();
        metadata.insert("subnets".to_string(), Value::Array(subnets));
        builder
            .add_policy(node_name(resource), "Placement")
            .with_metadata(metadata)
            .with_property("placement_zone", "subnet_group")
            .with_property("availability_zones", subnet_count)
            .with_targets(targets);
        Ok(())
    }
}
