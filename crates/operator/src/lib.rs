pub mod config;
pub mod controller;
pub mod crd;
pub mod endpoint;
pub mod error;
pub mod logging;
pub mod producer;
pub mod reconcile;
pub mod status;
pub mod store;
pub mod telemetry;
pub mod test_support;

// Re-export commonly used symbols for convenience in binaries/tests.
pub use config::OperatorConfig;
pub use crd::{WordpressInstance, WordpressInstanceSpec, WordpressInstanceStatus};
pub use error::{Error, Result};
pub use reconcile::Reconciler;
