use k8s_openapi::api::core::v1::ServiceStatus;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use kube::CustomResource;
use schemars::gen::SchemaGenerator;
use schemars::schema::Schema;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::embedded::{preserve_unknown_fields, EmbeddedObject, TemplateKind};
use super::LocalSecretReference;

/// A bundle of object templates scheduled onto whichever cluster matches `targetSelector`.
#[derive(CustomResource, Serialize, Deserialize, Debug, Clone, Default, JsonSchema, PartialEq)]
#[kube(group = "workload.crossplane.io", version = "v1alpha1", kind = "KubernetesApplication", namespaced)]
#[serde(rename_all = "camelCase")]
pub struct KubernetesApplicationSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_selector: Option<LabelSelector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_selector: Option<LabelSelector>,
    #[serde(default)]
    pub resource_templates: Vec<KubernetesApplicationResourceTemplate>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, JsonSchema, PartialEq)]
pub struct KubernetesApplicationResourceTemplate {
    #[serde(default)]
    pub metadata: ObjectMeta,
    pub spec: KubernetesApplicationResourceSpec,
}

impl KubernetesApplicationResourceTemplate {
    pub fn kind(&self) -> TemplateKind { self.spec.template.template_kind() }
}

/// One templated object; the platform materialises it under the template's own name.
#[derive(CustomResource, Serialize, Deserialize, Debug, Clone, Default, JsonSchema, PartialEq)]
#[kube(
    group = "workload.crossplane.io",
    version = "v1alpha1",
    kind = "KubernetesApplicationResource",
    namespaced,
    status = "KubernetesApplicationResourceStatus"
)]
pub struct KubernetesApplicationResourceSpec {
    pub template: EmbeddedObject,
    /// Local secrets propagated to the remote cluster as `<resource name>-<secret name>`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub secrets: Vec<LocalSecretReference>,
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, JsonSchema, PartialEq)]
pub struct KubernetesApplicationResourceStatus {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    /// Status of the object as observed in the remote cluster.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub remote: Option<RemoteStatus>,
}

/// Remote status as reported back: either already structured, or an opaque
/// serialized document that must be decoded first.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum RemoteStatus {
    Encoded(String),
    Structured(ServiceStatus),
}

impl RemoteStatus {
    pub fn decode(&self) -> serde_json::Result<ServiceStatus> {
        match self {
            Self::Encoded(raw) => serde_json::from_str(raw),
            Self::Structured(status) => Ok(status.clone()),
        }
    }
}

impl JsonSchema for RemoteStatus {
    fn schema_name() -> String { "RemoteStatus".to_string() }
    fn is_referenceable() -> bool { false }
    fn json_schema(_: &mut SchemaGenerator) -> Schema { preserve_unknown_fields(None, false) }
}
