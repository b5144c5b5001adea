use std::sync::Arc;

use futures_util::StreamExt;
use kube::api::Api;
use kube::runtime::controller::{Action, Controller};
use kube::runtime::watcher;
use kube::{Client, ResourceExt};
use tracing::{debug, info, warn};

use crate::config::OperatorConfig;
use crate::crd::{KubernetesApplication, WordpressInstance};
use crate::error::{Error, Result};
use crate::reconcile::Reconciler;
use crate::store::{KubeStore, ObjectStore};

pub async fn reconcile<S: ObjectStore>(wp: Arc<WordpressInstance>, ctx: Arc<Reconciler<S>>) -> Result<Action> {
    ctx.reconcile(&wp.namespace().unwrap_or_default(), &wp.name_any()).await
}

pub fn error_policy<S: ObjectStore>(wp: Arc<WordpressInstance>, err: &Error, ctx: Arc<Reconciler<S>>) -> Action {
    warn!(namespace = ?wp.namespace(), name = %wp.name_any(), error = %err, "wordpress.requeue");
    ctx.requeue().on_error()
}

/// Watches WordpressInstances, and the KubernetesApplications they own, until a shutdown signal arrives.
pub async fn run(client: Client, config: OperatorConfig) -> anyhow::Result<()> {
    let (instances, applications) = match config.watch_namespace.as_deref() {
        Some(ns) => (Api::<WordpressInstance>::namespaced(client.clone(), ns), Api::<KubernetesApplication>::namespaced(client.clone(), ns)),
        None => (Api::<WordpressInstance>::all(client.clone()), Api::<KubernetesApplication>::all(client.clone())),
    };
    let ctx = Arc::new(Reconciler::new(KubeStore::new(client, config.field_manager.clone()), &config));
    info!(namespace = ?config.watch_namespace, strategy = ?config.apply_strategy, "controller.start");

    Controller::new(instances, watcher::Config::default())
        .owns(applications, watcher::Config::default())
        .shutdown_on_signal()
        .run(reconcile, error_policy, ctx)
        .for_each(|res| async move {
            match res {
                Ok((obj, action)) => debug!(object = %obj, ?action, "controller.reconciled"),
                Err(e) => warn!(error = %e, "controller.error"),
            }
        })
        .await;
    info!("controller.stopped");
    Ok(())
}
