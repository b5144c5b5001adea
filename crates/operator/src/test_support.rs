//! In-process [`ObjectStore`] for unit and integration tests, plus fixtures.
//! Behaves like the API server where the reconciler can tell the difference:
//! resource versions, conflicts, status subresource and no-op writes.
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use k8s_openapi::api::core::v1::{LoadBalancerIngress, LoadBalancerStatus, ServiceStatus};
use kube::core::ErrorResponse;
use kube::Resource;
use serde_json::{json, Map, Value};

use crate::crd::{WordpressInstance, WordpressInstanceSpec};
use crate::error::{Error, Result};
use crate::store::{ManagedObject, ObjectKey, ObjectStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op { Get, Create, Update, UpdateStatus, Apply }

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Write { pub op: Op, pub key: ObjectKey, pub changed: bool }

type Injected = Box<dyn Fn(&ObjectKey) -> Error + Send>;

#[derive(Default)]
struct State {
    objects: BTreeMap<ObjectKey, Value>,
    version: u64,
    failures: Vec<(Op, String, Injected)>,
    writes: Vec<Write>,
}

impl State {
    fn take_failure(&mut self, op: Op, key: &ObjectKey) -> Result<()> {
        match self.failures.iter().position(|(o, kind, _)| *o == op && *kind == key.kind) {
            Some(i) => Err((self.failures.remove(i).2)(key)),
            None => Ok(()),
        }
    }

    fn next_version(&mut self) -> String {
        self.version += 1;
        self.version.to_string()
    }

    fn insert_new(&mut self, op: Op, key: ObjectKey, mut value: Value) -> Value {
        prune(&mut value);
        let rv = self.next_version();
        let meta = &mut value["metadata"];
        meta["uid"] = json!(format!("uid-{rv}"));
        meta["resourceVersion"] = json!(rv);
        meta["generation"] = json!(1);
        self.objects.insert(key.clone(), value.clone());
        self.writes.push(Write { op, key, changed: true });
        value
    }

    /// Stores `next` over `prev`, moving the resource version only when something changed.
    fn commit(&mut self, op: Op, key: ObjectKey, prev: Value, mut next: Value) -> Value {
        prune(&mut next);
        for field in ["uid", "resourceVersion", "generation", "creationTimestamp"] {
            match prev["metadata"].get(field) {
                Some(v) => next["metadata"][field] = v.clone(),
                None => {
                    remove(&mut next["metadata"], field);
                }
            }
        }
        let changed = next != prev;
        if changed {
            next["metadata"]["resourceVersion"] = json!(self.next_version());
            if next.get("spec") != prev.get("spec") {
                let generation = prev["metadata"]["generation"].as_i64().unwrap_or(0) + 1;
                next["metadata"]["generation"] = json!(generation);
            }
            self.objects.insert(key.clone(), next.clone());
        }
        self.writes.push(Write { op, key, changed });
        next
    }
}

/// Drops null members; the API server never stores them.
fn prune(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|_, v| !v.is_null());
            map.values_mut().for_each(prune);
        }
        Value::Array(items) => items.iter_mut().for_each(prune),
        _ => {}
    }
}

fn remove(value: &mut Value, field: &str) -> Option<Value> { value.as_object_mut().and_then(|m| m.remove(field)) }

/// RFC 7386 merge of `patch` into `doc`.
fn merge(doc: &mut Value, patch: &Value) {
    let Value::Object(patch) = patch else {
        *doc = patch.clone();
        return;
    };
    if !doc.is_object() {
        *doc = Value::Object(Map::new());
    }
    if let Value::Object(map) = doc {
        for (k, v) in patch {
            if v.is_null() {
                map.remove(k);
            } else {
                merge(map.entry(k.clone()).or_insert(Value::Null), v);
            }
        }
    }
}

fn check_version(key: &ObjectKey, incoming: Option<&String>, stored: &Value) -> Result<()> {
    let stored = stored["metadata"]["resourceVersion"].as_str().unwrap_or_default();
    match incoming {
        Some(rv) if rv != stored => Err(Error::Conflict {
            key: key.clone(),
            message: format!("the object has been modified; resourceVersion {rv} is stale, current is {stored}"),
        }),
        _ => Ok(()),
    }
}

#[derive(Default)]
pub struct MemoryStore { state: Mutex<State> }

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    fn lock(&self) -> MutexGuard<'_, State> { self.state.lock().unwrap_or_else(PoisonError::into_inner) }

    /// Makes the next `op` on `kind` fail with whatever `make` builds.
    pub fn fail_next(&self, op: Op, kind: &str, make: impl Fn(&ObjectKey) -> Error + Send + 'static) {
        self.lock().failures.push((op, kind.to_string(), Box::new(make)));
    }

    /// Stores `obj` as is, status included, bypassing failure injection and the write log.
    pub fn insert<K: ManagedObject>(&self, obj: K) -> K {
        let key = ObjectKey::of(&obj).expect("fixture needs name and namespace");
        let value = serde_json::to_value(&obj).expect("fixture serializes");
        let mut state = self.lock();
        let stored = match state.objects.get(&key).cloned() {
            Some(prev) => {
                let writes = state.writes.len();
                let stored = state.commit(Op::Update, key, prev, value);
                state.writes.truncate(writes);
                stored
            }
            None => {
                let stored = state.insert_new(Op::Create, key, value);
                state.writes.pop();
                stored
            }
        };
        serde_json::from_value(stored).expect("fixture deserializes")
    }

    pub fn fetch<K: ManagedObject>(&self, namespace: &str, name: &str) -> Option<K> {
        let key = ObjectKey::for_kind::<K>(namespace, name);
        self.lock().objects.get(&key).cloned().and_then(|v| serde_json::from_value(v).ok())
    }

    pub fn keys(&self) -> Vec<ObjectKey> { self.lock().objects.keys().cloned().collect() }

    pub fn writes(&self) -> Vec<Write> { self.lock().writes.clone() }

    /// Writes that actually modified a stored object.
    pub fn changes(&self) -> Vec<Write> { self.writes().into_iter().filter(|w| w.changed).collect() }

    pub fn clear_writes(&self) { self.lock().writes.clear() }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get<K: ManagedObject>(&self, namespace: &str, name: &str) -> Result<K> {
        let key = ObjectKey::for_kind::<K>(namespace, name);
        let mut state = self.lock();
        state.take_failure(Op::Get, &key)?;
        let value = state.objects.get(&key).cloned().ok_or(Error::NotFound(key))?;
        Ok(serde_json::from_value(value)?)
    }

    async fn create<K: ManagedObject>(&self, obj: &K) -> Result<K> {
        let key = ObjectKey::of(obj)?;
        let mut value = serde_json::to_value(obj)?;
        remove(&mut value, "status");
        let mut state = self.lock();
        state.take_failure(Op::Create, &key)?;
        if state.objects.contains_key(&key) {
            return Err(Error::AlreadyExists(key));
        }
        Ok(serde_json::from_value(state.insert_new(Op::Create, key, value))?)
    }

    async fn update<K: ManagedObject>(&self, obj: &K) -> Result<K> {
        let key = ObjectKey::of(obj)?;
        let mut next = serde_json::to_value(obj)?;
        let mut state = self.lock();
        state.take_failure(Op::Update, &key)?;
        let prev = state.objects.get(&key).cloned().ok_or_else(|| Error::NotFound(key.clone()))?;
        check_version(&key, obj.meta().resource_version.as_ref(), &prev)?;
        remove(&mut next, "status");
        if let Some(status) = prev.get("status") {
            next["status"] = status.clone();
        }
        Ok(serde_json::from_value(state.commit(Op::Update, key, prev, next))?)
    }

    async fn update_status<K: ManagedObject>(&self, obj: &K) -> Result<K> {
        let key = ObjectKey::of(obj)?;
        let status = serde_json::to_value(obj)?.get("status").cloned();
        let mut state = self.lock();
        state.take_failure(Op::UpdateStatus, &key)?;
        let prev = state.objects.get(&key).cloned().ok_or_else(|| Error::NotFound(key.clone()))?;
        check_version(&key, obj.meta().resource_version.as_ref(), &prev)?;
        let mut next = prev.clone();
        match status {
            Some(status) => next["status"] = status,
            None => {
                remove(&mut next, "status");
            }
        }
        Ok(serde_json::from_value(state.commit(Op::UpdateStatus, key, prev, next))?)
    }

    async fn apply<K: ManagedObject>(&self, obj: &K) -> Result<K> {
        let key = ObjectKey::of(obj)?;
        let mut patch = serde_json::to_value(obj)?;
        remove(&mut patch, "status");
        for field in ["resourceVersion", "uid", "generation", "managedFields"] {
            remove(&mut patch["metadata"], field);
        }
        let mut state = self.lock();
        state.take_failure(Op::Apply, &key)?;
        let stored = match state.objects.get(&key).cloned() {
            Some(prev) => {
                let mut next = prev.clone();
                merge(&mut next, &patch);
                state.commit(Op::Apply, key, prev, next)
            }
            None => state.insert_new(Op::Apply, key, patch),
        };
        Ok(serde_json::from_value(stored)?)
    }
}

/// What the API server answers when it falls over.
pub fn server_error(key: &ObjectKey) -> Error {
    Error::Kube(kube::Error::Api(ErrorResponse {
        status: "Failure".into(),
        message: format!("internal error while handling {key}"),
        reason: "InternalError".into(),
        code: 500,
    }))
}

pub fn wordpress_instance(namespace: &str, name: &str) -> WordpressInstance {
    let mut wp = WordpressInstance::new(name, WordpressInstanceSpec::default());
    wp.meta_mut().namespace = Some(namespace.into());
    wp
}

pub fn load_balancer_status(ip: &str, hostname: &str) -> ServiceStatus {
    ServiceStatus {
        load_balancer: Some(LoadBalancerStatus {
            ingress: Some(vec![LoadBalancerIngress {
                ip: (!ip.is_empty()).then(|| ip.to_string()),
                hostname: (!hostname.is_empty()).then(|| hostname.to_string()),
                ..Default::default()
            }]),
        }),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::MySQLInstance;

    fn db(name: &str) -> MySQLInstance {
        let mut db = MySQLInstance::new(name, Default::default());
        db.metadata.namespace = Some("ns".into());
        db
    }

    #[tokio::test]
    async fn create_twice_is_already_exists() {
        let store = MemoryStore::new();
        let created = store.create(&db("a")).await.unwrap();
        assert_eq!(created.metadata.resource_version.as_deref(), Some("1"));
        assert!(created.metadata.uid.is_some());
        assert!(store.create(&db("a")).await.unwrap_err().is_already_exists());
    }

    #[tokio::test]
    async fn stale_update_conflicts() {
        let store = MemoryStore::new();
        let mut first = store.create(&db("a")).await.unwrap();
        let mut second = first.clone();
        first.spec.engine_version = Some("5.7".into());
        store.update(&first).await.unwrap();
        second.spec.engine_version = Some("8.0".into());
        assert!(store.update(&second).await.unwrap_err().is_conflict());
    }

    #[tokio::test]
    async fn unchanged_apply_keeps_version() {
        let store = MemoryStore::new();
        let applied = store.apply(&db("a")).await.unwrap();
        let again = store.apply(&db("a")).await.unwrap();
        assert_eq!(applied.metadata.resource_version, again.metadata.resource_version);
        assert_eq!(store.changes().len(), 1);
        assert_eq!(store.writes().len(), 2);
    }

    #[tokio::test]
    async fn injected_failure_fires_once() {
        let store = MemoryStore::new();
        store.fail_next(Op::Create, "MySQLInstance", server_error);
        assert!(matches!(store.create(&db("a")).await, Err(Error::Kube(_))));
        assert!(store.create(&db("a")).await.is_ok());
    }

    #[test]
    fn merge_replaces_scalars_and_drops_nulls() {
        let mut doc = json!({"a": 1, "b": {"c": 2, "d": 3}});
        merge(&mut doc, &json!({"a": 5, "b": {"d": null, "e": 4}}));
        assert_eq!(doc, json!({"a": 5, "b": {"c": 2, "e": 4}}));
    }
}
