//! Reads the externally reachable address of a WordPress service from the
//! status its KubernetesApplicationResource reports back from the remote cluster.
use k8s_openapi::api::core::v1::{ObjectReference, ServiceStatus};
use kube::ResourceExt;
use tracing::debug;

use crate::crd::{KubernetesApplication, KubernetesApplicationResource, TemplateKind};
use crate::error::{Error, Result};
use crate::store::{ObjectKey, ObjectStore};

/// Key of the resource materialised from the application's service template.
pub fn service_resource_key(app: &KubernetesApplication) -> Result<ObjectKey> {
    let namespace = app.namespace().unwrap_or_default();
    app.spec
        .resource_templates
        .iter()
        .find(|t| t.kind() == TemplateKind::Service)
        .and_then(|t| t.metadata.name.clone().map(|name| (t.metadata.namespace.clone().unwrap_or_else(|| namespace.clone()), name)))
        .map(|(ns, name)| ObjectKey::for_kind::<KubernetesApplicationResource>(ns, name))
        .ok_or_else(|| Error::NoServiceTemplate(app.name_any()))
}

/// First ingress point's IP, else its hostname, else empty.
pub fn ingress_address(status: &ServiceStatus) -> String {
    let Some(ingress) = status.load_balancer.as_ref().and_then(|lb| lb.ingress.as_ref()).and_then(|i| i.first()) else {
        return String::new();
    };
    [ingress.ip.as_deref(), ingress.hostname.as_deref()].into_iter().flatten().find(|a| !a.is_empty()).unwrap_or_default().to_string()
}

/// Address reported by a service resource; empty while nothing has been observed remotely.
pub fn remote_address(resource: &KubernetesApplicationResource) -> Result<String> {
    let Some(remote) = resource.status.as_ref().and_then(|s| s.remote.as_ref()) else {
        return Ok(String::new());
    };
    let status = remote.decode().map_err(|source| Error::Decode { name: resource.name_any(), source })?;
    Ok(ingress_address(&status))
}

pub struct EndpointResolver<'a, S: ?Sized> { store: &'a S }

impl<'a, S: ObjectStore + ?Sized> EndpointResolver<'a, S> {
    pub fn new(store: &'a S) -> Self { Self { store } }

    /// Follows the application reference to its service resource. Fails with
    /// `NotFound` while the application or the service resource does not exist yet.
    pub async fn resolve(&self, app_ref: Option<&ObjectReference>, default_namespace: &str) -> Result<String> {
        let key = app_ref
            .and_then(|r| ObjectKey::from_reference::<KubernetesApplication>(r, default_namespace))
            .ok_or_else(|| Error::PreconditionMissing("cannot get the endpoint without a KubernetesApplication reference".into()))?;
        let app: KubernetesApplication = self.store.get(&key.namespace, &key.name).await?;
        self.resolve_key(&service_resource_key(&app)?).await
    }

    pub async fn resolve_key(&self, key: &ObjectKey) -> Result<String> {
        let resource: KubernetesApplicationResource = self.store.get(&key.namespace, &key.name).await?;
        let address = remote_address(&resource)?;
        debug!(%key, address = %address, "endpoint.resolved");
        Ok(address)
    }
}
