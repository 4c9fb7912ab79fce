//! End-to-end scenarios exercised against the full translation pipeline.
//! One test per scenario in the specification's testable-properties
//! section, using inline plan JSON the way `dispatch.rs`'s own unit
//! tests do, rather than on-disk fixtures.

use serde_json::json;
use tf2tosca::model::{NodeRef, RelationshipValue};
use tf2tosca::plan::ParsedPlan;
use tf2tosca::translate;

fn requirement_target<'a>(node: &'a tf2tosca::model::NodeTemplate, name: &str) -> Option<&'a str> {
    node.requirements.iter().find(|(n, _)| n == name).and_then(|(_, req)| match &req.node {
        Some(NodeRef::Name(n)) => Some(n.as_str()),
        _ => None,
    })
}

fn relationship_type(req: &tf2tosca::model::RequirementAssignment) -> Option<&str> {
    match &req.relationship {
        Some(RelationshipValue::TypeName(t)) => Some(t.as_str()),
        Some(RelationshipValue::Mapping { relationship_type, .. }) => Some(relationship_type.as_str()),
        None => None,
    }
}

#[test]
fn empty_resources_produce_minimal_file() {
    let plan = ParsedPlan::from_json(r#"{"planned_values": {"root_module": {"resources": []}}}"#).unwrap();
    let file = translate(&plan).unwrap();
    let template = file.service_template.unwrap();
    assert!(template.node_templates.is_empty());
}

#[test]
fn vpc_subnet_dependency() {
    let plan = ParsedPlan::from_json(
        r#"{
        "configuration": {"root_module": {"resources": [
            {"address": "aws_subnet.s", "type": "aws_subnet", "name": "s",
             "expressions": {"vpc_id": {"references": ["aws_vpc.main.id"]}}}
        ]}},
        "planned_values": {"root_module": {"resources": [
            {"address": "aws_vpc.main", "type": "aws_vpc", "name": "main",
             "values": {"id": "vpc-1", "cidr_block": "10.0.0.0/16"}},
            {"address": "aws_subnet.s", "type": "aws_subnet", "name": "s",
             "values": {"id": "subnet-1", "vpc_id": "vpc-1", "cidr_block": "10.0.1.0/24"}}
        ]}}
    }"#,
    )
    .unwrap();

    let file = translate(&plan).unwrap();
    let template = file.service_template.unwrap();

    let vpc = template.node_templates.get("aws_vpc_main").expect("vpc node");
    assert_eq!(vpc.node_type, "Network");
    let subnet = template.node_templates.get("aws_subnet_s").expect("subnet node");
    assert_eq!(subnet.properties.get("cidr").unwrap(), &json!("10.0.1.0/24"));

    let (name, req) = subnet.requirements.iter().find(|(n, _)| n == "vpc_id").expect("vpc_id requirement");
    assert_eq!(name, "vpc_id");
    assert_eq!(requirement_target(subnet, "vpc_id"), Some("aws_vpc_main"));
    assert_eq!(relationship_type(req), Some("DependsOn"));
}

#[test]
fn variable_backed_database_name() {
    let plan = ParsedPlan::from_json(
        r#"{
        "configuration": {
            "root_module": {
                "variables": {"db_name": {"type": "string"}},
                "resources": [
                    {"address": "aws_db_instance.main", "type": "aws_db_instance", "name": "main",
                     "expressions": {"db_name": {"references": ["var.db_name"]}}}
                ]
            }
        },
        "planned_values": {"root_module": {"resources": [
            {"address": "aws_db_instance.main", "type": "aws_db_instance", "name": "main",
             "values": {"engine": "postgres", "db_name": "appdb"}}
        ]}}
    }"#,
    )
    .unwrap();

    let file = translate(&plan).unwrap();
    let template = file.service_template.unwrap();

    let input = template.inputs.get("db_name").expect("db_name input");
    assert_eq!(input.param_type.as_deref(), Some("string"));
    assert!(input.required);
    assert!(input.default.is_none());

    let database = template.node_templates.get("aws_db_instance_main_database").expect("database node");
    assert_eq!(database.properties.get("name").unwrap(), &json!({"$get_input": "db_name"}));
    assert_eq!(database.metadata.get("aws_database_name").unwrap(), &json!("appdb"));
}

#[test]
fn default_port_by_engine() {
    let plan = ParsedPlan::from_json(
        r#"{
        "planned_values": {"root_module": {"resources": [
            {"address": "aws_db_instance.main", "type": "aws_db_instance", "name": "main",
             "values": {"engine": "postgres", "db_name": "appdb"}}
        ]}}
    }"#,
    )
    .unwrap();

    let file = translate(&plan).unwrap();
    let template = file.service_template.unwrap();

    let dbms = template.node_templates.get("aws_db_instance_main_dbms").expect("dbms node");
    assert_eq!(dbms.properties.get("port").unwrap(), &json!(5432));
    assert_eq!(dbms.properties.get("engine_type").unwrap(), &json!("PostgreSQL"));
    assert_eq!(dbms.metadata.get("aws_default_port").unwrap(), &json!(5432));

    let database = template.node_templates.get("aws_db_instance_main_database").expect("database node");
    assert_eq!(database.properties.get("port").unwrap(), &json!(5432));
    assert_eq!(database.metadata.get("aws_default_port").unwrap(), &json!(5432));
    assert_eq!(requirement_target(database, "host"), Some("aws_db_instance_main_dbms"));
}

#[test]
fn security_group_ingress_rule_is_folded_in_as_post_pass() {
    let plan = ParsedPlan::from_json(
        r#"{
        "configuration": {"root_module": {"resources": [
            {"address": "aws_vpc_security_group_ingress_rule.r", "type": "aws_vpc_security_group_ingress_rule", "name": "r",
             "expressions": {"security_group_id": {"references": ["aws_security_group.sg.id"]}}}
        ]}},
        "planned_values": {"root_module": {"resources": [
            {"address": "aws_security_group.sg", "type": "aws_security_group", "name": "sg",
             "values": {"name": "sg"}},
            {"address": "aws_vpc_security_group_ingress_rule.r", "type": "aws_vpc_security_group_ingress_rule", "name": "r",
             "values": {"from_port": 443, "to_port": 443, "ip_protocol": "tcp", "cidr_ipv4": "0.0.0.0/0"}}
        ]}}
    }"#,
    )
    .unwrap();

    let file = translate(&plan).unwrap();
    let template = file.service_template.unwrap();

    assert!(!template.node_templates.contains_key("aws_vpc_security_group_ingress_rule_r"));
    let sg = template.node_templates.get("aws_security_group_sg").expect("security group node");
    let rules = sg.metadata.get("ingress_rules").unwrap().as_array().unwrap();
    assert_eq!(rules.len(), 1);
    assert_eq!(rules[0]["rule_id"], json!("r"));
    assert_eq!(rules[0]["from_port"], json!(443));
    assert_eq!(rules[0]["to_port"], json!(443));
    assert_eq!(rules[0]["ip_protocol"], json!("tcp"));
    assert_eq!(rules[0]["cidr_ipv4"], json!("0.0.0.0/0"));
}

#[test]
fn db_subnet_group_placement_policy_targeting() {
    let plan = ParsedPlan::from_json(
        r#"{
        "configuration": {"root_module": {"resources": [
            {"address": "aws_db_subnet_group.dsg", "type": "aws_db_subnet_group", "name": "dsg",
             "expressions": {"subnet_ids": {"references": ["aws_subnet.a.id", "aws_subnet.b.id"]}}}
        ]}},
        "planned_values": {"root_module": {"resources": [
            {"address": "aws_subnet.a", "type": "aws_subnet", "name": "a",
             "values": {"cidr_block": "10.0.1.0/24", "availability_zone": "us-east-1a"}},
            {"address": "aws_subnet.b", "type": "aws_subnet", "name": "b",
             "values": {"cidr_block": "10.0.2.0/24", "availability_zone": "us-east-1b"}},
            {"address": "aws_db_subnet_group.dsg", "type": "aws_db_subnet_group", "name": "dsg",
             "values": {"name": "db-subnets-1"}},
            {"address": "aws_db_instance.db1", "type": "aws_db_instance", "name": "db1",
             "values": {"engine": "mysql", "db_subnet_group_name": "db-subnets-1"}}
        ]}}
    }"#,
    )
    .unwrap();

    let file = translate(&plan).unwrap();
    let template = file.service_template.unwrap();

    let (name, policy) = template
        .policies
        .iter()
        .find(|(n, _)| n == "aws_db_subnet_group_dsg")
        .expect("placement policy");
    assert_eq!(name, "aws_db_subnet_group_dsg");
    assert_eq!(policy.policy_type, "Placement");
    let mut targets = policy.targets.clone();
    targets.sort();
    assert_eq!(
        targets,
        vec!["aws_db_instance_db1_database".to_string(), "aws_db_instance_db1_dbms".to_string()]
    );
    assert_eq!(policy.properties.get("placement_zone").unwrap(), &json!("subnet_group"));
    assert_eq!(policy.properties.get("availability_zones").unwrap(), &json!(2));
}

#[test]
fn route_table_with_ipv6_route() {
    let plan = ParsedPlan::from_json(
        r#"{
        "configuration": {"root_module": {"resources": [
            {"address": "aws_route.r", "type": "aws_route", "name": "r",
             "expressions": {
                "route_table_id": {"references": ["aws_route_table.rt.id"]},
                "gateway_id": {"references": ["aws_internet_gateway.igw.id"]}
             }}
        ]}},
        "planned_values": {"root_module": {"resources": [
            {"address": "aws_route_table.rt", "type": "aws_route_table", "name": "rt", "values": {"id": "rt-1"}},
            {"address": "aws_internet_gateway.igw", "type": "aws_internet_gateway", "name": "igw", "values": {"id": "igw-1"}},
            {"address": "aws_route.r", "type": "aws_route", "name": "r",
             "values": {"destination_ipv6_cidr_block": "::/0", "gateway_id": "igw-1"}}
        ]}}
    }"#,
    )
    .unwrap();

    let file = translate(&plan).unwrap();
    let template = file.service_template.unwrap();

    let rt = template.node_templates.get("aws_route_table_rt").expect("route table node");
    assert_eq!(rt.properties.get("ip_version").unwrap(), &json!(6));
    let routes = rt.metadata.get("aws_routes").unwrap().as_array().unwrap();
    assert_eq!(routes.len(), 1);
    assert_eq!(routes[0]["destination_type"], json!("ipv6_cidr"));
    assert_eq!(routes[0]["target_type"], json!("internet_gateway"));
    assert_eq!(requirement_target(rt, "route_r"), Some("aws_internet_gateway_igw"));
}

#[test]
fn target_group_attachment_keeps_routes_to_relationship_with_properties() {
    let plan = ParsedPlan::from_json(
        r#"{
        "configuration": {"root_module": {"resources": [
            {"address": "aws_lb_target_group_attachment.a", "type": "aws_lb_target_group_attachment", "name": "a",
             "expressions": {
                "target_group_arn": {"references": ["aws_lb_target_group.tg.arn"]},
                "target_id": {"references": ["aws_instance.web.id"]}
             }}
        ]}},
        "planned_values": {"root_module": {"resources": [
            {"address": "aws_lb_target_group.tg", "type": "aws_lb_target_group", "name": "tg", "values": {"arn": "tg-arn", "port": 80}},
            {"address": "aws_instance.web", "type": "aws_instance", "name": "web", "values": {"id": "i-1"}},
            {"address": "aws_lb_target_group_attachment.a", "type": "aws_lb_target_group_attachment", "name": "a",
             "values": {"target_group_arn": "tg-arn", "target_id": "i-1", "availability_zone": "us-east-1a"}}
        ]}}
    }"#,
    )
    .unwrap();

    let file = translate(&plan).unwrap();
    let template = file.service_template.unwrap();

    let tg = template.node_templates.get("aws_lb_target_group_tg").expect("target group node");
    let (_, req) = tg.requirements.iter().find(|(n, _)| n == "application").expect("application requirement");
    assert_eq!(relationship_type(req), Some("RoutesTo"));
    match &req.relationship {
        Some(RelationshipValue::Mapping { properties, .. }) => {
            assert_eq!(properties.get("availability_zone").unwrap(), &json!("us-east-1a"));
        }
        other => panic!("expected a relationship mapping with properties, got {other:?}"),
    }
}

#[test]
fn elasticache_cluster_defaults_port_by_engine() {
    let plan = ParsedPlan::from_json(
        r#"{
        "planned_values": {"root_module": {"resources": [
            {"address": "aws_elasticache_cluster.cache", "type": "aws_elasticache_cluster", "name": "cache",
             "values": {"cluster_id": "cache1", "engine": "redis"}}
        ]}}
    }"#,
    )
    .unwrap();

    let file = translate(&plan).unwrap();
    let template = file.service_template.unwrap();

    let dbms = template.node_templates.get("aws_elasticache_cluster_cache_dbms").expect("dbms node");
    let database = template.node_templates.get("aws_elasticache_cluster_cache_database").expect("database node");
    assert_eq!(dbms.node_type, "DBMS");
    assert_eq!(database.node_type, "Database");
    assert_eq!(dbms.properties.get("port").unwrap(), &json!(6379));
    assert_eq!(database.properties.get("port").unwrap(), &json!(6379));
    assert_eq!(dbms.metadata.get("engine_type").unwrap(), &json!("Redis"));
    assert_eq!(dbms.metadata.get("aws_default_port").unwrap(), &json!(6379));
    assert_eq!(database.properties.get("name").unwrap(), &json!("cache1"));
    assert_eq!(requirement_target(database, "host"), Some("aws_elasticache_cluster_cache_dbms"));
}
