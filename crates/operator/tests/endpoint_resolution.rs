use k8s_openapi::api::core::v1::ObjectReference;
use wordpress_stack_operator::crd::{
    KubernetesApplicationResource, KubernetesApplicationResourceStatus, LocalSecretReference, RemoteStatus,
};
use wordpress_stack_operator::endpoint::EndpointResolver;
use wordpress_stack_operator::producer::ResourceProducer;
use wordpress_stack_operator::store::{object_reference, ObjectStore};
use wordpress_stack_operator::test_support::{load_balancer_status, wordpress_instance, MemoryStore};
use wordpress_stack_operator::Error;

async fn store_with_application() -> (MemoryStore, ObjectReference) {
    let store = MemoryStore::new();
    let wp = store.insert(wordpress_instance("ns", "wp1"));
    let app = ResourceProducer::default().kubernetes_application(&wp, Some(&LocalSecretReference::new("sql-wp1"))).unwrap();
    let app = store.create(&app).await.unwrap();
    (store, object_reference(&app))
}

fn service_resource(remote: Option<RemoteStatus>) -> KubernetesApplicationResource {
    let mut res = KubernetesApplicationResource::new("wordpress-service-ns-wp1", Default::default());
    res.metadata.namespace = Some("ns".into());
    res.status = Some(KubernetesApplicationResourceStatus { state: None, remote });
    res
}

#[tokio::test]
async fn service_resource_not_materialised_yet() {
    let (store, app_ref) = store_with_application().await;
    let err = EndpointResolver::new(&store).resolve(Some(&app_ref), "ns").await.unwrap_err();
    assert!(err.is_not_found(), "{err}");
}

#[tokio::test]
async fn reads_the_service_resource_not_the_parent() {
    let (store, app_ref) = store_with_application().await;
    store.insert(service_resource(Some(RemoteStatus::Structured(load_balancer_status("", "lb.example.com")))));
    assert_eq!(EndpointResolver::new(&store).resolve(Some(&app_ref), "ns").await.unwrap(), "lb.example.com");
}

#[tokio::test]
async fn empty_ingress_is_not_an_error() {
    let (store, app_ref) = store_with_application().await;
    store.insert(service_resource(Some(RemoteStatus::Encoded(r#"{"loadBalancer":{"ingress":[]}}"#.into()))));
    assert_eq!(EndpointResolver::new(&store).resolve(Some(&app_ref), "ns").await.unwrap(), "");
    store.insert(service_resource(None));
    assert_eq!(EndpointResolver::new(&store).resolve(Some(&app_ref), "ns").await.unwrap(), "");
}

#[tokio::test]
async fn missing_reference_is_a_precondition() {
    let store = MemoryStore::new();
    let err = EndpointResolver::new(&store).resolve(None, "ns").await.unwrap_err();
    assert!(matches!(err, Error::PreconditionMissing(_)));
}
