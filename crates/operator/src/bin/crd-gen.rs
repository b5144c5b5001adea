use kube::CustomResourceExt;
use wordpress_stack_operator::crd::{KubernetesApplication, KubernetesApplicationResource, KubernetesCluster, MySQLInstance, WordpressInstance};

fn main() -> anyhow::Result<()> {
    let crds = [
        WordpressInstance::crd(),
        MySQLInstance::crd(),
        KubernetesCluster::crd(),
        KubernetesApplication::crd(),
        KubernetesApplicationResource::crd(),
    ];
    for crd in crds {
        println!("---");
        print!("{}", serde_yaml::to_string(&crd)?);
    }
    Ok(())
}
