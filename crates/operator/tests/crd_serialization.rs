use kube::CustomResourceExt;
use serde_json::json;
use wordpress_stack_operator::crd::{KubernetesApplicationResource, ProvisionPolicy, RemoteStatus, WordpressInstance};
use wordpress_stack_operator::WordpressInstanceSpec;

#[test]
fn wordpress_spec_wire_names() {
    let spec: WordpressInstanceSpec = serde_json::from_value(json!({
        "provisionPolicy": "UseExistingTarget",
        "mySQLInstanceRef": {"name": "db"},
        "kubernetesClusterRef": {"name": "prod", "namespace": "clusters"}
    }))
    .unwrap();
    assert_eq!(spec.provision_policy(), ProvisionPolicy::UseExistingTarget);
    assert_eq!(spec.mysql_instance_ref.as_ref().unwrap().name.as_deref(), Some("db"));
    assert!(spec.image.is_empty());
    let j = serde_json::to_value(&spec).unwrap();
    assert!(j.get("image").is_none());
    assert_eq!(j["kubernetesClusterRef"]["namespace"], "clusters");
}

#[test]
fn provision_policy_defaults_to_new_cluster() {
    let spec: WordpressInstanceSpec = serde_json::from_value(json!({})).unwrap();
    assert_eq!(spec.provision_policy(), ProvisionPolicy::ProvisionNewCluster);
}

#[test]
fn remote_status_accepts_both_shapes() {
    let encoded: RemoteStatus = serde_json::from_value(json!("{\"loadBalancer\":{}}")).unwrap();
    assert!(matches!(encoded, RemoteStatus::Encoded(_)));
    let structured: RemoteStatus = serde_json::from_value(json!({"loadBalancer": {"ingress": [{"ip": "1.2.3.4"}]}})).unwrap();
    assert!(matches!(structured, RemoteStatus::Structured(_)));
}

#[test]
fn crds_carry_expected_groups() {
    let wp = WordpressInstance::crd();
    assert_eq!(wp.spec.group, "wordpress.samples.stacks.crossplane.io");
    assert_eq!(wp.spec.names.kind, "WordpressInstance");
    assert_eq!(wp.spec.versions[0].name, "v1alpha1");
    assert!(wp.spec.versions[0].subresources.as_ref().and_then(|s| s.status.as_ref()).is_some());
    let res = KubernetesApplicationResource::crd();
    assert_eq!(res.spec.group, "workload.crossplane.io");
    let yaml = serde_yaml::to_string(&res).unwrap();
    assert!(yaml.contains("x-kubernetes-preserve-unknown-fields"));
}
