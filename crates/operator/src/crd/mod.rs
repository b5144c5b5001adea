//! Record types for the WordpressInstance stack and the platform records it drives.
pub mod compute;
pub mod database;
pub mod embedded;
pub mod wordpress;
pub mod workload;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub use compute::{KubernetesCluster, KubernetesClusterSpec};
pub use database::{MySQLInstance, MySQLInstanceSpec};
pub use embedded::{EmbeddedObject, TemplateKind};
pub use wordpress::{ProvisionPolicy, WordpressInstance, WordpressInstanceSpec, WordpressInstanceStatus};
pub use workload::{
    KubernetesApplication, KubernetesApplicationResource, KubernetesApplicationResourceSpec,
    KubernetesApplicationResourceStatus, KubernetesApplicationResourceTemplate, KubernetesApplicationSpec, RemoteStatus,
};

/// Name of a secret in the same namespace as the referencing record.
#[derive(Serialize, Deserialize, Debug, Clone, Default, JsonSchema, PartialEq, Eq)]
pub struct LocalSecretReference { pub name: String }

impl LocalSecretReference {
    pub fn new(name: impl Into<String>) -> Self { Self { name: name.into() } }
}
