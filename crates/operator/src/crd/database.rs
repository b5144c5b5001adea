use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::LocalSecretReference;

/// Claim for a managed MySQL database; the platform writes its connection
/// details into `writeConnectionSecretToRef`.
#[derive(CustomResource, Serialize, Deserialize, Debug, Clone, Default, JsonSchema, PartialEq)]
#[kube(group = "database.crossplane.io", version = "v1alpha1", kind = "MySQLInstance", namespaced)]
#[serde(rename_all = "camelCase")]
pub struct MySQLInstanceSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub write_connection_secret_to_ref: Option<LocalSecretReference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_version: Option<String>,
}
