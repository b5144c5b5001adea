//! Schema-agnostic envelope for objects nested inside resource templates.
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use schemars::gen::SchemaGenerator;
use schemars::schema::{InstanceType, Schema, SchemaObject};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

/// Any object with type and identity metadata; everything else is carried verbatim.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmbeddedObject {
    #[serde(default)]
    pub api_version: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(flatten)]
    pub body: Map<String, Value>,
}

/// Kinds the operator needs to tell apart inside a template set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind { Namespace, Deployment, Service, Other }

impl EmbeddedObject {
    pub fn from_value(value: Value) -> Result<Self> { Ok(serde_json::from_value(value)?) }

    pub fn name(&self) -> Option<&str> { self.metadata.name.as_deref() }

    pub fn template_kind(&self) -> TemplateKind {
        match self.kind.as_str() {
            "Namespace" => TemplateKind::Namespace,
            "Deployment" => TemplateKind::Deployment,
            "Service" => TemplateKind::Service,
            _ => TemplateKind::Other,
        }
    }
}

impl JsonSchema for EmbeddedObject {
    fn schema_name() -> String { "EmbeddedObject".to_string() }
    fn is_referenceable() -> bool { false }
    fn json_schema(_: &mut SchemaGenerator) -> Schema { preserve_unknown_fields(Some(InstanceType::Object), true) }
}

pub(crate) fn preserve_unknown_fields(instance_type: Option<InstanceType>, embedded: bool) -> Schema {
    let mut schema = SchemaObject { instance_type: instance_type.map(Into::into), ..Default::default() };
    schema.extensions.insert("x-kubernetes-preserve-unknown-fields".into(), Value::Bool(true));
    if embedded {
        schema.extensions.insert("x-kubernetes-embedded-resource".into(), Value::Bool(true));
    }
    Schema::Object(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keeps_unknown_fields_and_detects_kind() {
        let raw = json!({
            "apiVersion": "v1",
            "kind": "Service",
            "metadata": {"name": "wp1", "namespace": "wp1"},
            "spec": {"type": "LoadBalancer", "ports": [{"port": 80}]}
        });
        let obj = EmbeddedObject::from_value(raw.clone()).unwrap();
        assert_eq!(obj.template_kind(), TemplateKind::Service);
        assert_eq!(obj.name(), Some("wp1"));
        assert_eq!(serde_json::to_value(&obj).unwrap(), raw);
    }

    #[test]
    fn unknown_kind_is_other() {
        let obj = EmbeddedObject::from_value(json!({"apiVersion": "v1", "kind": "ConfigMap", "metadata": {"name": "x"}})).unwrap();
        assert_eq!(obj.template_kind(), TemplateKind::Other);
    }
}
