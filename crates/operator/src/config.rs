//! Operator configuration: an optional TOML file, then `WORDPRESS_*` environment overrides.
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs};

use serde::Deserialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::producer::Naming;
use crate::status::RequeuePolicy;
use crate::store::ApplyStrategy;

pub const DEFAULT_IMAGE: &str = "wordpress:4.6.1-apache";
pub const DEFAULT_FIELD_MANAGER: &str = "wordpress-stack-operator";
pub const DEFAULT_METRICS_ADDR: &str = "0.0.0.0:8080";

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub default_image: Option<String>,
    pub short_wait_secs: Option<u64>,
    pub long_wait_secs: Option<u64>,
    pub apply_strategy: Option<ApplyStrategy>,
    pub field_manager: Option<String>,
    pub metrics_addr: Option<String>,
    pub watch_namespace: Option<String>,
    pub naming: Option<Naming>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OperatorConfig {
    pub default_image: String,
    pub requeue: RequeuePolicy,
    pub apply_strategy: ApplyStrategy,
    pub field_manager: String,
    pub metrics_addr: SocketAddr,
    /// Only instances in this namespace are reconciled; all namespaces when unset.
    pub watch_namespace: Option<String>,
    pub naming: Naming,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            default_image: DEFAULT_IMAGE.into(),
            requeue: RequeuePolicy::default(),
            apply_strategy: ApplyStrategy::default(),
            field_manager: DEFAULT_FIELD_MANAGER.into(),
            metrics_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            watch_namespace: None,
            naming: Naming::default(),
        }
    }
}

fn env_var(name: &str) -> Option<String> { env::var(name).ok().filter(|v| !v.trim().is_empty()) }

fn parse_secs(name: &str, raw: &str) -> Result<u64> {
    match raw.trim().parse::<u64>() {
        Ok(0) | Err(_) => Err(Error::Config(format!("{name} must be a positive number of seconds, got {raw:?}"))),
        Ok(secs) => Ok(secs),
    }
}

impl OperatorConfig {
    /// `path` (or `WORDPRESS_OPERATOR_CONFIG`) must exist when given; without either only
    /// defaults and the environment apply.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path: Option<PathBuf> = path.map(Path::to_path_buf).or_else(|| env_var("WORDPRESS_OPERATOR_CONFIG").map(PathBuf::from));
        let mut file_cfg = match &path {
            Some(p) => {
                let content = fs::read_to_string(p).map_err(|e| Error::Config(format!("failed to read {}: {e}", p.display())))?;
                debug!(path = %p.display(), len = content.len(), "config.read");
                toml::from_str::<FileConfig>(&content).map_err(|e| Error::Config(format!("failed to parse {}: {e}", p.display())))?
            }
            None => FileConfig::default(),
        };

        if let Some(v) = env_var("WORDPRESS_DEFAULT_IMAGE") { file_cfg.default_image = Some(v); }
        if let Some(v) = env_var("WORDPRESS_SHORT_WAIT_SECS") { file_cfg.short_wait_secs = Some(parse_secs("WORDPRESS_SHORT_WAIT_SECS", &v)?); }
        if let Some(v) = env_var("WORDPRESS_LONG_WAIT_SECS") { file_cfg.long_wait_secs = Some(parse_secs("WORDPRESS_LONG_WAIT_SECS", &v)?); }
        if let Some(v) = env_var("WORDPRESS_APPLY_STRATEGY") { file_cfg.apply_strategy = Some(v.parse()?); }
        if let Some(v) = env_var("WORDPRESS_FIELD_MANAGER") { file_cfg.field_manager = Some(v); }
        if let Some(v) = env_var("WORDPRESS_METRICS_ADDR") { file_cfg.metrics_addr = Some(v); }
        if let Some(v) = env_var("WORDPRESS_WATCH_NAMESPACE") { file_cfg.watch_namespace = Some(v); }

        let defaults = Self::default();
        let metrics_addr = file_cfg.metrics_addr.as_deref().unwrap_or(DEFAULT_METRICS_ADDR);
        let metrics_addr = metrics_addr.parse().map_err(|e| Error::Config(format!("invalid metrics address {metrics_addr:?}: {e}")))?;
        let wait = |secs: Option<u64>, default: Duration, name: &str| match secs {
            Some(0) => Err(Error::Config(format!("{name} must be positive"))),
            Some(s) => Ok(Duration::from_secs(s)),
            None => Ok(default),
        };
        let requeue = RequeuePolicy {
            short_wait: wait(file_cfg.short_wait_secs, defaults.requeue.short_wait, "short_wait_secs")?,
            long_wait: wait(file_cfg.long_wait_secs, defaults.requeue.long_wait, "long_wait_secs")?,
        };
        let cfg = Self {
            default_image: file_cfg.default_image.filter(|s| !s.is_empty()).unwrap_or(defaults.default_image),
            requeue,
            apply_strategy: file_cfg.apply_strategy.unwrap_or_default(),
            field_manager: file_cfg.field_manager.filter(|s| !s.is_empty()).unwrap_or(defaults.field_manager),
            metrics_addr,
            watch_namespace: file_cfg.watch_namespace.filter(|s| !s.is_empty()),
            naming: file_cfg.naming.unwrap_or_default(),
        };
        debug!(?cfg, "config.loaded");
        Ok(cfg)
    }
}
