use thiserror::Error;

use crate::store::ObjectKey;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0} not found")] NotFound(ObjectKey),
    #[error("{0} already exists")] AlreadyExists(ObjectKey),
    #[error("conflict writing {key}: {message}")] Conflict { key: ObjectKey, message: String },
    #[error("precondition missing: {0}")] PreconditionMissing(String),
    #[error("KubernetesApplication {0} does not have a service type KubernetesApplicationResource")] NoServiceTemplate(String),
    #[error("cannot decode remote status of {name}: {source}")] Decode { name: String, #[source] source: serde_json::Error },
    #[error("serialization error: {0}")] Serialization(#[from] serde_json::Error),
    #[error("kube api error: {0}")] Kube(#[from] kube::Error),
    #[error("config error: {0}")] Config(String),
}

impl Error {
    pub fn is_not_found(&self) -> bool { matches!(self, Self::NotFound(_)) }
    pub fn is_already_exists(&self) -> bool { matches!(self, Self::AlreadyExists(_)) }
    pub fn is_conflict(&self) -> bool { matches!(self, Self::Conflict { .. }) }

    /// Maps an API server failure for `key` onto the store taxonomy.
    pub(crate) fn from_kube(err: kube::Error, key: ObjectKey) -> Self {
        match &err {
            kube::Error::Api(resp) if resp.code == 404 => Self::NotFound(key),
            kube::Error::Api(resp) if resp.code == 409 && resp.reason == "AlreadyExists" => Self::AlreadyExists(key),
            kube::Error::Api(resp) if resp.code == 409 => Self::Conflict { key, message: resp.message.clone() },
            _ => Self::Kube(err),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
