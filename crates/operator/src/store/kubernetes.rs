use async_trait::async_trait;
use kube::api::{Api, Patch, PatchParams, PostParams};
use kube::{Client, Resource};
use serde_json::json;
use tracing::debug;

use super::{ManagedObject, ObjectKey, ObjectStore};
use crate::error::{Error, Result};

/// [`ObjectStore`] backed by the Kubernetes API server.
#[derive(Clone)]
pub struct KubeStore { client: Client, field_manager: String }

impl KubeStore {
    pub fn new(client: Client, field_manager: impl Into<String>) -> Self { Self { client, field_manager: field_manager.into() } }

    fn api<K: ManagedObject>(&self, namespace: &str) -> Api<K> { Api::namespaced(self.client.clone(), namespace) }
}

#[async_trait]
impl ObjectStore for KubeStore {
    async fn get<K: ManagedObject>(&self, namespace: &str, name: &str) -> Result<K> {
        self.api::<K>(namespace).get(name).await.map_err(|e| Error::from_kube(e, ObjectKey::for_kind::<K>(namespace, name)))
    }

    async fn create<K: ManagedObject>(&self, obj: &K) -> Result<K> {
        let key = ObjectKey::of(obj)?;
        debug!(%key, "store.create");
        self.api::<K>(&key.namespace).create(&PostParams::default(), obj).await.map_err(|e| Error::from_kube(e, key))
    }

    async fn update<K: ManagedObject>(&self, obj: &K) -> Result<K> {
        let key = ObjectKey::of(obj)?;
        debug!(%key, resource_version = ?obj.meta().resource_version, "store.update");
        self.api::<K>(&key.namespace).replace(&key.name, &PostParams::default(), obj).await.map_err(|e| Error::from_kube(e, key))
    }

    async fn update_status<K: ManagedObject>(&self, obj: &K) -> Result<K> {
        let key = ObjectKey::of(obj)?;
        let status = serde_json::to_value(obj)?.get("status").cloned().unwrap_or_else(|| json!({}));
        // resourceVersion in a merge patch turns it into a precondition
        let patch = json!({ "metadata": { "resourceVersion": obj.meta().resource_version }, "status": status });
        debug!(%key, "store.update_status");
        self.api::<K>(&key.namespace)
            .patch_status(&key.name, &PatchParams::default(), &Patch::Merge(&patch))
            .await
            .map_err(|e| Error::from_kube(e, key))
    }

    async fn apply<K: ManagedObject>(&self, obj: &K) -> Result<K> {
        let key = ObjectKey::of(obj)?;
        debug!(%key, field_manager = %self.field_manager, "store.apply");
        let params = PatchParams::apply(&self.field_manager).force();
        self.api::<K>(&key.namespace).patch(&key.name, &params, &Patch::Apply(obj)).await.map_err(|e| Error::from_kube(e, key))
    }
}
