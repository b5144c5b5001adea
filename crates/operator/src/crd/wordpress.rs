use k8s_openapi::api::core::v1::ObjectReference;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::status::Condition;

/// Whether WordPress goes to a freshly provisioned cluster or to one that already exists.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, JsonSchema, PartialEq, Eq)]
pub enum ProvisionPolicy {
    /// A new KubernetesCluster claim is created for the instance.
    #[default]
    ProvisionNewCluster,
    /// The cluster named by `kubernetesClusterRef` is labelled so the application targets it.
    UseExistingTarget,
}

#[derive(CustomResource, Serialize, Deserialize, Debug, Clone, Default, JsonSchema, PartialEq)]
#[kube(
    group = "wordpress.samples.stacks.crossplane.io",
    version = "v1alpha1",
    kind = "WordpressInstance",
    namespaced,
    status = "WordpressInstanceStatus",
    shortname = "wp",
    printcolumn = r#"{"name":"Endpoint","type":"string","jsonPath":".status.endpoint"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct WordpressInstanceSpec {
    /// Container image WordPress runs in. Re-applied every pass under server-side apply;
    /// fixed once the workload exists under create-only.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provision_policy: Option<ProvisionPolicy>,
    #[serde(default, rename = "mySQLInstanceRef", skip_serializing_if = "Option::is_none")]
    pub mysql_instance_ref: Option<ObjectReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubernetes_cluster_ref: Option<ObjectReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kubernetes_application_ref: Option<ObjectReference>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WordpressInstanceStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
    /// Address of the WordPress service once its load balancer is assigned.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub endpoint: String,
}

impl WordpressInstanceSpec {
    pub fn provision_policy(&self) -> ProvisionPolicy { self.provision_policy.unwrap_or_default() }
}
