use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::LocalSecretReference;

/// Claim for a managed Kubernetes cluster that workload applications are scheduled onto.
#[derive(CustomResource, Serialize, Deserialize, Debug, Clone, Default, JsonSchema, PartialEq)]
#[kube(group = "compute.crossplane.io", version = "v1alpha1", kind = "KubernetesCluster", namespaced)]
#[serde(rename_all = "camelCase")]
pub struct KubernetesClusterSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_connection_secret_to_ref: Option<LocalSecretReference>,
}
