//! One reconciliation pass over a WordpressInstance.
//!
//! Every ensure step is safe to repeat: owned objects are applied (or created
//! with AlreadyExists tolerated) and an adopted cluster only ever gains a
//! label. A pass that fails part way keeps whatever it already wrote and the
//! next pass picks up from there.
use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::controller::Action;
use kube::ResourceExt;
use tracing::{debug, info, instrument, warn};

use crate::config::OperatorConfig;
use crate::crd::{KubernetesCluster, MySQLInstance, ProvisionPolicy, WordpressInstance};
use crate::endpoint::EndpointResolver;
use crate::error::Result;
use crate::producer::ResourceProducer;
use crate::status::{report_error, report_success, RequeuePolicy};
use crate::store::{get_optional, object_reference, ApplyStrategy, ManagedObject, ObjectKey, ObjectStore};
use crate::telemetry::{self, Outcome};

pub struct Reconciler<S> {
    store: S,
    producer: ResourceProducer,
    strategy: ApplyStrategy,
    requeue: RequeuePolicy,
    default_image: String,
}

impl<S: ObjectStore> Reconciler<S> {
    pub fn new(store: S, config: &OperatorConfig) -> Self {
        Self {
            store,
            producer: ResourceProducer::new(config.naming.clone()),
            strategy: config.apply_strategy,
            requeue: config.requeue,
            default_image: config.default_image.clone(),
        }
    }

    pub fn store(&self) -> &S { &self.store }

    pub fn requeue(&self) -> &RequeuePolicy { &self.requeue }

    #[instrument(skip(self), fields(strategy = ?self.strategy))]
    pub async fn reconcile(&self, namespace: &str, name: &str) -> Result<Action> {
        let _timer = telemetry::RECONCILE_DURATION.start_timer();
        let mut wp = match self.store.get::<WordpressInstance>(namespace, name).await {
            Ok(wp) => wp,
            Err(e) if e.is_not_found() => {
                debug!("wordpress.deleted");
                telemetry::forget_instance(namespace, name);
                telemetry::record_outcome(Outcome::Deleted);
                return Ok(self.requeue.on_deleted());
            }
            Err(e) => {
                telemetry::record_outcome(Outcome::Error);
                return Err(e);
            }
        };
        self.fill_defaults(&mut wp);

        match self.converge(&mut wp).await {
            Ok(endpoint) => {
                telemetry::record_endpoint(namespace, name, &endpoint);
                report_success(wp.status.get_or_insert_with(Default::default), endpoint);
                if let Err(e) = self.store.update_status(&wp).await {
                    telemetry::record_outcome(Outcome::Error);
                    return Err(e);
                }
                info!(endpoint = %wp.status.as_ref().map(|s| s.endpoint.as_str()).unwrap_or_default(), "wordpress.reconciled");
                telemetry::record_outcome(Outcome::Success);
                Ok(self.requeue.on_success())
            }
            Err(err) => {
                warn!(error = %err, "wordpress.reconcile.failed");
                report_error(wp.status.get_or_insert_with(Default::default), &err);
                if let Err(e) = self.store.update_status(&wp).await {
                    warn!(error = %e, "wordpress.status.write_failed");
                }
                telemetry::record_outcome(Outcome::Error);
                Err(err)
            }
        }
    }

    fn fill_defaults(&self, wp: &mut WordpressInstance) {
        if wp.spec.image.is_empty() {
            wp.spec.image = self.default_image.clone();
        }
    }

    /// Ensures the owned records in dependency order, persists the references
    /// they produced and returns the endpoint observed so far.
    async fn converge(&self, wp: &mut WordpressInstance) -> Result<String> {
        let namespace = wp.namespace().unwrap_or_default();
        let db = self.ensure_mysql_instance(wp, &namespace).await?;
        self.ensure_kubernetes_cluster(wp, &namespace).await?;
        self.ensure_kubernetes_application(wp, &db, &namespace).await?;
        *wp = self.store.update(&*wp).await?;
        self.resolve_endpoint(wp, &namespace).await
    }

    async fn ensure_mysql_instance(&self, wp: &mut WordpressInstance, namespace: &str) -> Result<MySQLInstance> {
        let desired = self.producer.mysql_instance(wp);
        self.ensure_referenced(&mut wp.spec.mysql_instance_ref, desired, namespace).await
    }

    /// A reference to any cluster other than the produced one is adopted by
    /// label-merge, whatever the policy; otherwise the produced cluster is ensured.
    async fn ensure_kubernetes_cluster(&self, wp: &mut WordpressInstance, namespace: &str) -> Result<()> {
        let desired = self.producer.kubernetes_cluster(wp);
        let produced = ObjectKey::of(&desired)?;
        let existing = wp.spec.kubernetes_cluster_ref.as_ref().and_then(|r| ObjectKey::from_reference::<KubernetesCluster>(r, namespace));
        match existing {
            Some(key) if key != produced || wp.spec.provision_policy() == ProvisionPolicy::UseExistingTarget => {
                self.adopt_kubernetes_cluster(wp, &key).await
            }
            _ => {
                self.ensure_referenced(&mut wp.spec.kubernetes_cluster_ref, desired, namespace).await?;
                Ok(())
            }
        }
    }

    async fn adopt_kubernetes_cluster(&self, wp: &WordpressInstance, key: &ObjectKey) -> Result<()> {
        let mut cluster: KubernetesCluster = self.store.get(&key.namespace, &key.name).await?;
        let selector = self.producer.local_selector(wp);
        let labels = cluster.labels_mut();
        if selector.iter().all(|(k, v)| labels.get(k) == Some(v)) {
            return Ok(());
        }
        labels.extend(selector);
        self.store.update(&cluster).await?;
        info!(cluster = %key, "kubernetes_cluster.adopted");
        Ok(())
    }

    async fn ensure_kubernetes_application(&self, wp: &mut WordpressInstance, db: &MySQLInstance, namespace: &str) -> Result<()> {
        let desired = self.producer.kubernetes_application(wp, db.spec.write_connection_secret_to_ref.as_ref())?;
        self.ensure_referenced(&mut wp.spec.kubernetes_application_ref, desired, namespace).await?;
        Ok(())
    }

    /// Leaves a resolving reference alone unless it names the produced object and
    /// the strategy re-applies owned objects; otherwise ensures `desired` and points
    /// the reference at it.
    async fn ensure_referenced<K: ManagedObject>(
        &self,
        reference: &mut Option<ObjectReference>,
        desired: K,
        namespace: &str,
    ) -> Result<K> {
        let produced = ObjectKey::of(&desired)?;
        if let Some(key) = reference.as_ref().and_then(|r| ObjectKey::from_reference::<K>(r, namespace)) {
            if !(self.strategy.reapplies_owned() && key == produced) {
                if let Some(existing) = get_optional::<K, S>(&self.store, &key).await? {
                    debug!(%key, "reference.resolved");
                    return Ok(existing);
                }
            }
        }
        let obj = self.strategy.ensure(&self.store, &desired).await?;
        debug!(key = %produced, "owned.ensured");
        *reference = Some(object_reference(&obj));
        Ok(obj)
    }

    async fn resolve_endpoint(&self, wp: &WordpressInstance, namespace: &str) -> Result<String> {
        match EndpointResolver::new(&self.store).resolve(wp.spec.kubernetes_application_ref.as_ref(), namespace).await {
            Err(e) if e.is_not_found() => {
                debug!(error = %e, "endpoint.pending");
                Ok(String::new())
            }
            other => other,
        }
    }
}
