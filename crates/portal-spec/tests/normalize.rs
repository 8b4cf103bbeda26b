use serde_json::{Value, json};

use portal_spec::{
    Context, FieldKind, TemplateRenderer, bind_schema, normalize, to_source_context, validate,
};

fn legacy() -> Value {
    serde_json::from_str(include_str!("../tests/fixtures/legacy_cookiecutter.json"))
        .expect("legacy fixture")
}

#[test]
fn legacy_context_becomes_one_fieldset_in_key_order() {
    let schema = normalize(&legacy(), "infra", "Infra");
    assert_eq!(schema.len(), 1);
    assert_eq!(schema[0].name, "infra");
    assert_eq!(schema[0].label, "Infra");

    let summary: Vec<(&str, &str)> = schema[0]
        .fields
        .iter()
        .map(|field| (field.name.as_str(), field.kind.as_str()))
        .collect();
    assert_eq!(
        summary,
        vec![
            ("cluster_name", "TEXT"),
            ("cluster_domain", "TEXT"),
            ("public_host", "TEXT"),
            ("deploy_network_netmask", "IP"),
            ("deploy_network_gateway", "TEXT"),
            ("dns_server01", "IP"),
            ("control_vlan", "TEXT"),
            ("opencontrail_enabled", "BOOL"),
            ("use_ssl", "BOOL"),
        ]
    );
}

#[test]
fn initial_values_are_kept_only_when_truthy() {
    let schema = normalize(&legacy(), "infra", "Infra");
    let initial = |name: &str| schema[0].field(name).and_then(|field| field.initial.clone());
    assert_eq!(initial("dns_server01"), Some(json!("8.8.8.8")));
    assert_eq!(initial("deploy_network_gateway"), None);
    assert_eq!(initial("use_ssl"), None);
}

#[test]
fn normalized_schema_round_trips_through_render_and_bind() {
    let schema = normalize(&legacy(), "infra", "Infra");
    assert!(validate(&schema).valid);

    let source = to_source_context(&schema).expect("yaml");
    let rendered = TemplateRenderer::default().render(&source, &Context::new());
    assert_eq!(rendered, schema);

    let bound = bind_schema(&rendered, &Context::new()).expect("bind");
    let expected: Vec<String> = schema[0]
        .fields
        .iter()
        .map(|field| field.name.clone())
        .collect();
    assert_eq!(bound.field_names(), expected);

    let flag = bound.field("opencontrail_enabled").expect("flag");
    assert_eq!(flag.kind(), FieldKind::Bool);
    assert_eq!(flag.initial, Some(json!(true)));
    assert_eq!(
        bound.field("dns_server01").map(|field| field.label.as_str()),
        Some("Dns server01")
    );
}

#[test]
fn structured_documents_pass_through() {
    let raw = json!([
        {
            "name": "compute",
            "label": "Compute",
            "fields": [
                { "name": "nodes", "type": "TEXT", "initial": "3" },
                { "name": "flavor", "type": "CHOICE", "choices": [["m1", "Medium"]] }
            ]
        }
    ]);
    let schema = normalize(&raw, "ignored", "Ignored");
    assert_eq!(schema.len(), 1);
    assert_eq!(schema[0].name, "compute");
    assert_eq!(schema[0].fields[1].choices[0].label, "Medium");
}

#[test]
fn validation_reports_authoring_defects() {
    let raw = json!([
        {
            "name": "a",
            "label": "A",
            "fields": [
                { "name": "x", "type": "TEXT" },
                { "name": "x", "type": "SLIDER" },
                { "name": "pick", "type": "CHOICE", "choices": ["one"], "initial": "two" }
            ]
        },
        { "name": "a", "label": "Again" }
    ]);
    let result = validate(&normalize(&raw, "", ""));
    assert!(!result.valid);
    let codes: Vec<_> = result.issues.iter().map(|issue| issue.code.as_str()).collect();
    assert_eq!(
        codes,
        vec!["duplicate_field", "unknown_type", "choice_initial_mismatch", "duplicate_fieldset"]
    );
}
