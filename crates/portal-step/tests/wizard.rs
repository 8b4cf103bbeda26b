use portal_step::{PortalConfig, StepError, Wizard};
use serde_json::{Value, json};

const STORAGE: &str = include_str!("fixtures/storage_step.yaml");
const BACKEND: &str = include_str!("fixtures/backend_step.yaml");

fn data(value: Value) -> portal_spec::Context {
    value.as_object().cloned().expect("object")
}

fn wizard() -> Wizard {
    let mut wizard = Wizard::new(PortalConfig::default().renderer());
    wizard.add_step("storage", STORAGE, &[]);
    wizard.add_step("backend", BACKEND, &["cluster_name"]);
    wizard
}

#[test]
fn each_step_discovers_all_of_its_fields() {
    let wizard = wizard();
    let names: Vec<&[String]> = wizard
        .steps()
        .iter()
        .map(|step| step.discover_contributed_fields())
        .collect();
    assert_eq!(names[0], ["storage_backend", "storage_network"]);
    assert_eq!(
        names[1],
        ["cluster_name", "ceph_monitor", "ceph_admin_password", "lvm_volume_group"]
    );
}

#[test]
fn backend_step_is_empty_before_storage_is_answered() {
    let wizard = wizard();
    let bound = wizard.render_step("backend").expect("render");
    assert!(bound.fieldsets.is_empty());
}

#[test]
fn ceph_choice_unlocks_ceph_fieldset() {
    let mut wizard = wizard();
    wizard
        .submit(
            "storage",
            &data(json!({"storage_backend": "ceph", "storage_network": "172.16.10.0/24"})),
        )
        .expect("submit storage");

    let bound = wizard.render_step("backend").expect("render");
    let names: Vec<String> = bound.field_names();
    assert_eq!(names, ["ceph_monitor", "ceph_admin_password"]);

    let monitor = bound.field("ceph_monitor").expect("monitor");
    assert_eq!(monitor.initial, Some(json!("172.16.10.10")));

    let password = bound.field("ceph_admin_password").expect("password");
    assert!(password.read_only);
    assert_eq!(password.initial.as_ref().and_then(Value::as_str).map(str::len), Some(16));
}

#[test]
fn lvm_choice_unlocks_lvm_fieldset() {
    let mut wizard = wizard();
    wizard
        .submit("storage", &data(json!({"storage_backend": "lvm"})))
        .expect("submit storage");
    let bound = wizard.render_step("backend").expect("render");
    assert_eq!(bound.field_names(), ["lvm_volume_group"]);
}

#[test]
fn finalize_returns_accumulated_context() {
    let mut wizard = wizard();
    wizard
        .submit("storage", &data(json!({"storage_backend": "lvm"})))
        .expect("submit storage");
    wizard
        .submit(
            "backend",
            &data(json!({"cluster_name": "lab", "lvm_volume_group": "vg0"})),
        )
        .expect("submit backend");

    let context = wizard.finalize();
    assert_eq!(
        Value::Object(context),
        json!({
            "storage_backend": "lvm",
            "storage_network": null,
            "ceph": false,
            "lvm": true,
            "cluster_name": "lab",
            "ceph_monitor": null,
            "ceph_admin_password": null,
            "lvm_volume_group": "vg0"
        })
    );
}

#[test]
fn submitting_unknown_step_fails() {
    let mut wizard = wizard();
    let err = wizard.submit("network", &data(json!({}))).expect_err("unknown");
    assert!(matches!(err, StepError::UnknownStep(_)));
}
