//! Serialization tests for the StatefulSetWorkload CRD

use chrono::{TimeZone, Utc};
use crds::*;
use kube::CustomResourceExt;
use serde_json::json;

#[test]
fn test_workload_manifest_deserializes() {
    let manifest = json!({
        "apiVersion": "core.oam.dev/v1alpha2",
        "kind": "StatefulSetWorkload",
        "metadata": { "name": "web", "namespace": "apps" },
        "spec": {
            "containers": [{
                "name": "web",
                "image": "nginx:1.21",
                "arguments": ["-g", "daemon off;"],
                "env": [
                    { "name": "MODE", "value": "prod" },
                    { "name": "DB_PASS", "fromSecret": { "name": "db-creds", "key": "password" } }
                ],
                "config": [{ "path": "/etc/app.conf", "value": "a=b" }],
                "ports": [{ "name": "http", "containerPort": 80 }, { "name": "dns", "containerPort": 53, "protocol": "UDP" }]
            }]
        }
    });

    let workload: StatefulSetWorkload = serde_json::from_value(manifest).unwrap();
    let container = &workload.spec.containers[0];

    assert_eq!(container.image, "nginx:1.21");
    assert_eq!(container.command, None);
    assert_eq!(container.arguments.as_deref(), Some(&["-g".to_string(), "daemon off;".to_string()][..]));
    assert_eq!(container.environment[0].source(), Some(ValueSource::Literal("prod")));
    assert!(matches!(container.environment[1].source(), Some(ValueSource::Secret(s)) if s.key == "password"));
    assert_eq!(container.config_files[0].path, "/etc/app.conf");
    assert_eq!(container.ports[0].protocol, None);
    assert_eq!(container.ports[1].protocol, Some(TransportProtocol::Udp));
    assert_eq!(workload.spec.service_name, None);
    assert!(workload.status.is_none());
}

#[test]
fn test_env_var_with_both_sources_has_no_source() {
    let env = ContainerEnvVar {
        name: "BROKEN".to_string(),
        value: Some("x".to_string()),
        from_secret: Some(SecretKeySelector { name: "s".to_string(), key: "k".to_string() }),
    };
    assert_eq!(env.source(), None);

    let empty = ContainerEnvVar { name: "EMPTY".to_string(), value: None, from_secret: None };
    assert_eq!(empty.source(), None);
}

#[test]
fn test_status_serializes_crossplane_layout() {
    let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let status = StatefulSetWorkloadStatus {
        conditions: vec![Condition::reconcile_error("cannot apply the statefulset: conflict", at)],
        resources: vec![TypedReference {
            api_version: "apps/v1".to_string(),
            kind: "StatefulSet".to_string(),
            name: "web".to_string(),
            uid: "1234".to_string(),
        }],
    };

    let value = serde_json::to_value(&status).unwrap();
    assert_eq!(value["conditions"][0]["type"], "Synced");
    assert_eq!(value["conditions"][0]["status"], "False");
    assert_eq!(value["conditions"][0]["reason"], "ReconcileError");
    assert_eq!(value["conditions"][0]["message"], "cannot apply the statefulset: conflict");
    assert_eq!(value["conditions"][0]["lastTransitionTime"], "2024-05-01T12:00:00Z");
    assert_eq!(value["resources"][0]["apiVersion"], "apps/v1");
    assert_eq!(value["resources"][0]["uid"], "1234");
}

#[test]
fn test_protocol_serializes_uppercase() {
    assert_eq!(serde_json::to_value(TransportProtocol::Tcp).unwrap(), json!("TCP"));
    assert_eq!(TransportProtocol::default().as_str(), "TCP");
    assert_eq!(TransportProtocol::Udp.as_str(), "UDP");
}

#[test]
fn test_crd_metadata() {
    let crd = StatefulSetWorkload::crd();
    assert_eq!(crd.spec.group, API_GROUP);
    assert_eq!(crd.spec.names.kind, "StatefulSetWorkload");
    assert_eq!(crd.spec.names.plural, "statefulsetworkloads");
    assert_eq!(
        crd.spec.names.categories,
        Some(vec!["crossplane".to_string(), "oam".to_string()])
    );

    let version = &crd.spec.versions[0];
    assert_eq!(version.name, API_VERSION);
    assert!(version.subresources.as_ref().and_then(|s| s.status.as_ref()).is_some());
}
