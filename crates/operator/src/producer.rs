//! Pure construction of every record a WordpressInstance needs. No I/O: the
//! same instance always produces the same objects.
use std::collections::BTreeMap;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta, OwnerReference};
use kube::{Resource, ResourceExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::crd::{
    EmbeddedObject, KubernetesApplication, KubernetesApplicationResourceSpec,
    KubernetesApplicationResourceTemplate, KubernetesApplicationSpec, KubernetesCluster, KubernetesClusterSpec,
    LocalSecretReference, MySQLInstance, MySQLInstanceSpec, WordpressInstance,
};
use crate::error::{Error, Result};

pub const MYSQL_ENGINE_VERSION: &str = "5.7";
const WORDPRESS_PORT: i32 = 80;

/// Fixed prefixes and label sets, built once from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Naming {
    pub resource_prefix: String,
    /// Label key whose value is the instance name on every local record.
    pub selector_key: String,
    /// Labels for objects running in the remote cluster.
    pub remote_labels: BTreeMap<String, String>,
}

impl Default for Naming {
    fn default() -> Self {
        Self {
            resource_prefix: "wordpress".into(),
            selector_key: "wordpress-instance".into(),
            remote_labels: BTreeMap::from([("app".to_string(), "wordpress".to_string())]),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ResourceProducer { naming: Naming }

impl ResourceProducer {
    pub fn new(naming: Naming) -> Self { Self { naming } }

    pub fn naming(&self) -> &Naming { &self.naming }

    pub fn local_selector(&self, wp: &WordpressInstance) -> BTreeMap<String, String> {
        BTreeMap::from([(self.naming.selector_key.clone(), wp.name_any())])
    }

    pub fn owner_reference(&self, wp: &WordpressInstance) -> OwnerReference {
        OwnerReference {
            api_version: WordpressInstance::api_version(&()).into_owned(),
            kind: WordpressInstance::kind(&()).into_owned(),
            name: wp.name_any(),
            uid: wp.uid().unwrap_or_default(),
            controller: Some(true),
            block_owner_deletion: Some(true),
        }
    }

    /// `<prefix>-<role>-<namespace>-<name>`; the name of a template and of the resource it becomes.
    pub fn template_name(&self, wp: &WordpressInstance, role: &str) -> String {
        format!("{}-{}-{}-{}", self.naming.resource_prefix, role, wp.namespace().unwrap_or_default(), wp.name_any())
    }

    /// Name under which a propagated local secret shows up next to the deployment.
    pub fn remote_secret_name(&self, wp: &WordpressInstance, db_secret: &LocalSecretReference) -> String {
        format!("{}-{}", self.template_name(wp, "deployment"), db_secret.name)
    }

    fn local_meta(&self, wp: &WordpressInstance) -> ObjectMeta {
        ObjectMeta {
            name: Some(wp.name_any()),
            namespace: wp.namespace(),
            labels: Some(self.local_selector(wp)),
            owner_references: Some(vec![self.owner_reference(wp)]),
            ..Default::default()
        }
    }

    pub fn mysql_instance(&self, wp: &WordpressInstance) -> MySQLInstance {
        let spec = MySQLInstanceSpec {
            write_connection_secret_to_ref: Some(LocalSecretReference::new(format!("sql-{}", wp.name_any()))),
            engine_version: Some(MYSQL_ENGINE_VERSION.into()),
        };
        let mut db = MySQLInstance::new(&wp.name_any(), spec);
        db.metadata = self.local_meta(wp);
        db
    }

    pub fn kubernetes_cluster(&self, wp: &WordpressInstance) -> KubernetesCluster {
        let spec = KubernetesClusterSpec {
            write_connection_secret_to_ref: Some(LocalSecretReference::new(format!("kubernetes-{}", wp.name_any()))),
        };
        let mut cluster = KubernetesCluster::new(&wp.name_any(), spec);
        cluster.metadata = self.local_meta(wp);
        cluster
    }

    /// Namespace, deployment and service templates wired to the database secret.
    pub fn kubernetes_application(
        &self,
        wp: &WordpressInstance,
        db_secret: Option<&LocalSecretReference>,
    ) -> Result<KubernetesApplication> {
        let db_secret = db_secret.ok_or_else(|| {
            Error::PreconditionMissing("cannot produce KubernetesApplication without local database connection secret".into())
        })?;
        let selector = LabelSelector { match_labels: Some(self.local_selector(wp)), ..Default::default() };
        let spec = KubernetesApplicationSpec {
            resource_selector: Some(selector.clone()),
            target_selector: Some(selector),
            resource_templates: vec![
                self.template(wp, "namespace", self.remote_namespace(wp), vec![])?,
                self.template(wp, "deployment", self.remote_deployment(wp, db_secret), vec![db_secret.clone()])?,
                self.template(wp, "service", self.remote_service(wp), vec![])?,
            ],
        };
        let mut app = KubernetesApplication::new(&wp.name_any(), spec);
        app.metadata = self.local_meta(wp);
        Ok(app)
    }

    fn template(
        &self,
        wp: &WordpressInstance,
        role: &str,
        remote: Value,
        secrets: Vec<LocalSecretReference>,
    ) -> Result<KubernetesApplicationResourceTemplate> {
        Ok(KubernetesApplicationResourceTemplate {
            metadata: ObjectMeta {
                name: Some(self.template_name(wp, role)),
                namespace: wp.namespace(),
                labels: Some(self.local_selector(wp)),
                ..Default::default()
            },
            spec: KubernetesApplicationResourceSpec { template: EmbeddedObject::from_value(remote)?, secrets },
        })
    }

    fn remote_namespace(&self, wp: &WordpressInstance) -> Value {
        json!({
            "apiVersion": "v1",
            "kind": "Namespace",
            "metadata": { "name": wp.name_any(), "labels": self.naming.remote_labels }
        })
    }

    fn remote_deployment(&self, wp: &WordpressInstance, db_secret: &LocalSecretReference) -> Value {
        let labels = &self.naming.remote_labels;
        // the secret arrives in the remote cluster prefixed with the deployment template's name
        let secret = self.remote_secret_name(wp, db_secret);
        json!({
            "apiVersion": "apps/v1",
            "kind": "Deployment",
            "metadata": { "name": wp.name_any(), "namespace": wp.name_any(), "labels": labels },
            "spec": {
                "selector": { "matchLabels": labels },
                "template": {
                    "metadata": { "labels": labels },
                    "spec": {
                        "containers": [{
                            "name": "wordpress",
                            "image": wp.spec.image,
                            "ports": [{ "name": "wordpress", "containerPort": WORDPRESS_PORT }],
                            "env": [
                                secret_env("WORDPRESS_DB_HOST", &secret, "endpoint"),
                                secret_env("WORDPRESS_DB_USER", &secret, "username"),
                                secret_env("WORDPRESS_DB_PASSWORD", &secret, "password"),
                            ]
                        }]
                    }
                }
            }
        })
    }

    fn remote_service(&self, wp: &WordpressInstance) -> Value {
        let labels = &self.naming.remote_labels;
        json!({
            "apiVersion": "v1",
            "kind": "Service",
            "metadata": { "name": wp.name_any(), "namespace": wp.name_any(), "labels": labels },
            "spec": { "ports": [{ "port": WORDPRESS_PORT }], "selector": labels, "type": "LoadBalancer" }
        })
    }
}

fn secret_env(name: &str, secret: &str, key: &str) -> Value {
    json!({ "name": name, "valueFrom": { "secretKeyRef": { "name": secret, "key": key } } })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{TemplateKind, WordpressInstanceSpec};

    fn instance(ns: &str, name: &str) -> WordpressInstance {
        let mut wp = WordpressInstance::new(name, WordpressInstanceSpec { image: "wordpress:4.6.1-apache".into(), ..Default::default() });
        wp.metadata.namespace = Some(ns.into());
        wp.metadata.uid = Some("1b4e28ba-2fa1-11d2-883f-0016d3cca427".into());
        wp
    }

    #[test]
    fn application_requires_database_secret() {
        let err = ResourceProducer::default().kubernetes_application(&instance("ns", "wp1"), None).unwrap_err();
        assert!(matches!(err, Error::PreconditionMissing(_)), "{err}");
    }

    #[test]
    fn local_records_share_identity_labels_and_owner() {
        let producer = ResourceProducer::default();
        let wp = instance("ns", "wp1");
        let db = producer.mysql_instance(&wp);
        let cluster = producer.kubernetes_cluster(&wp);
        for meta in [&db.metadata, &cluster.metadata] {
            assert_eq!(meta.name.as_deref(), Some("wp1"));
            assert_eq!(meta.namespace.as_deref(), Some("ns"));
            assert_eq!(meta.labels.as_ref().unwrap()["wordpress-instance"], "wp1");
            let owner = &meta.owner_references.as_ref().unwrap()[0];
            assert_eq!(owner.kind, "WordpressInstance");
            assert_eq!(owner.api_version, "wordpress.samples.stacks.crossplane.io/v1alpha1");
            assert_eq!(owner.uid, "1b4e28ba-2fa1-11d2-883f-0016d3cca427");
        }
        assert_eq!(db.spec.write_connection_secret_to_ref.unwrap().name, "sql-wp1");
        assert_eq!(cluster.spec.write_connection_secret_to_ref.unwrap().name, "kubernetes-wp1");
    }

    #[test]
    fn templates_are_namespace_deployment_service() {
        let producer = ResourceProducer::default();
        let wp = instance("ns", "wp1");
        let app = producer.kubernetes_application(&wp, Some(&LocalSecretReference::new("sql-wp1"))).unwrap();
        let kinds: Vec<_> = app.spec.resource_templates.iter().map(|t| t.kind()).collect();
        assert_eq!(kinds, vec![TemplateKind::Namespace, TemplateKind::Deployment, TemplateKind::Service]);
        let names: Vec<_> = app.spec.resource_templates.iter().map(|t| t.metadata.name.clone().unwrap()).collect();
        assert_eq!(names, vec!["wordpress-namespace-ns-wp1", "wordpress-deployment-ns-wp1", "wordpress-service-ns-wp1"]);
        assert_eq!(app.spec.resource_templates[1].spec.secrets, vec![LocalSecretReference::new("sql-wp1")]);
        assert_eq!(app.spec.resource_selector, app.spec.target_selector);
    }

    #[test]
    fn remote_objects_carry_remote_labels_only() {
        let producer = ResourceProducer::default();
        let app = producer.kubernetes_application(&instance("ns", "wp1"), Some(&LocalSecretReference::new("sql-wp1"))).unwrap();
        for t in &app.spec.resource_templates {
            let labels = t.spec.template.metadata.labels.as_ref().unwrap();
            assert_eq!(labels.get("app").map(String::as_str), Some("wordpress"));
            assert!(!labels.contains_key("wordpress-instance"));
        }
        let service = &app.spec.resource_templates[2].spec.template;
        assert_eq!(service.body["spec"]["type"], "LoadBalancer");
        assert_eq!(service.metadata.namespace.as_deref(), Some("wp1"));
    }
}
