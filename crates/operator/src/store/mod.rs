//! Narrow read/write interface over the orchestration store.
//!
//! Every record kind the operator touches goes through [`ObjectStore`], keyed
//! by (kind, namespace, name). `kubernetes.rs` talks to the API server; the test
//! harness provides an in-memory implementation.
use std::fmt::{self, Debug, Display};
use std::str::FromStr;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use k8s_openapi::NamespaceResourceScope;
use kube::{Resource, ResourceExt};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::{Error, Result};

pub mod kubernetes;

pub use self::kubernetes::KubeStore;

/// Any namespaced, statically typed record the store can persist.
pub trait ManagedObject:
    Resource<DynamicType = (), Scope = NamespaceResourceScope> + Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

impl<K> ManagedObject for K where
    K: Resource<DynamicType = (), Scope = NamespaceResourceScope> + Clone + Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectKey { pub kind: String, pub namespace: String, pub name: String }

impl ObjectKey {
    pub fn new(kind: impl Into<String>, namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self { kind: kind.into(), namespace: namespace.into(), name: name.into() }
    }

    pub fn for_kind<K: Resource<DynamicType = ()>>(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(K::kind(&()), namespace, name)
    }

    /// Key of an object about to be written; it must carry a name and a namespace.
    pub fn of<K: Resource<DynamicType = ()>>(obj: &K) -> Result<Self> {
        let kind = K::kind(&());
        let name = obj.meta().name.clone().ok_or_else(|| Error::PreconditionMissing(format!("{kind} without metadata.name")))?;
        let namespace = obj.namespace().ok_or_else(|| Error::PreconditionMissing(format!("{kind} {name} without metadata.namespace")))?;
        Ok(Self::new(kind, namespace, name))
    }

    /// Resolves a reference stored on a record; an unset namespace means `default_namespace`.
    pub fn from_reference<K: Resource<DynamicType = ()>>(reference: &ObjectReference, default_namespace: &str) -> Option<Self> {
        let name = reference.name.clone().filter(|n| !n.is_empty())?;
        let namespace = reference.namespace.clone().filter(|n| !n.is_empty()).unwrap_or_else(|| default_namespace.to_string());
        Some(Self::for_kind::<K>(namespace, name))
    }
}

impl Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{} {}/{}", self.kind, self.namespace, self.name) }
}

/// Reference written back onto the desired-state record once a dependency exists.
pub fn object_reference<K: Resource<DynamicType = ()>>(obj: &K) -> ObjectReference {
    ObjectReference {
        api_version: Some(K::api_version(&()).into_owned()),
        kind: Some(K::kind(&()).into_owned()),
        name: obj.meta().name.clone(),
        namespace: obj.namespace(),
        ..Default::default()
    }
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get<K: ManagedObject>(&self, namespace: &str, name: &str) -> Result<K>;
    /// Fails with [`Error::AlreadyExists`] when the key is taken.
    async fn create<K: ManagedObject>(&self, obj: &K) -> Result<K>;
    /// Optimistic update of everything but status; a stale resourceVersion yields [`Error::Conflict`].
    async fn update<K: ManagedObject>(&self, obj: &K) -> Result<K>;
    async fn update_status<K: ManagedObject>(&self, obj: &K) -> Result<K>;
    /// Server-side apply; creates the object when absent and is a no-op when nothing changed.
    async fn apply<K: ManagedObject>(&self, obj: &K) -> Result<K>;
}

/// `get` that folds absence into `None`.
pub async fn get_optional<K: ManagedObject, S: ObjectStore + ?Sized>(store: &S, key: &ObjectKey) -> Result<Option<K>> {
    match store.get::<K>(&key.namespace, &key.name).await {
        Ok(obj) => Ok(Some(obj)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// How owned objects are brought into existence on each pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApplyStrategy {
    /// Forced server-side apply of the produced object every pass.
    #[default]
    ServerSideApply,
    /// Create once; an existing object is taken as is.
    CreateOnly,
}

impl ApplyStrategy {
    pub fn reapplies_owned(self) -> bool { matches!(self, Self::ServerSideApply) }

    pub async fn ensure<K: ManagedObject, S: ObjectStore + ?Sized>(self, store: &S, desired: &K) -> Result<K> {
        match self {
            Self::ServerSideApply => store.apply(desired).await,
            Self::CreateOnly => match store.create(desired).await {
                Ok(created) => Ok(created),
                Err(e) if e.is_already_exists() => {
                    let key = ObjectKey::of(desired)?;
                    store.get(&key.namespace, &key.name).await
                }
                Err(e) => Err(e),
            },
        }
    }
}

impl FromStr for ApplyStrategy {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "server-side-apply" | "apply" | "ssa" => Ok(Self::ServerSideApply),
            "create-only" | "create" => Ok(Self::CreateOnly),
            other => Err(Error::Config(format!("unknown apply strategy {other:?}"))),
        }
    }
}
