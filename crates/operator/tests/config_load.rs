use std::time::Duration;

use serial_test::serial;
use wordpress_stack_operator::store::ApplyStrategy;
use wordpress_stack_operator::{Error, OperatorConfig};

const VARS: &[&str] = &[
    "WORDPRESS_OPERATOR_CONFIG",
    "WORDPRESS_DEFAULT_IMAGE",
    "WORDPRESS_SHORT_WAIT_SECS",
    "WORDPRESS_LONG_WAIT_SECS",
    "WORDPRESS_APPLY_STRATEGY",
    "WORDPRESS_FIELD_MANAGER",
    "WORDPRESS_METRICS_ADDR",
    "WORDPRESS_WATCH_NAMESPACE",
];

fn clear_env() { VARS.iter().for_each(|v| std::env::remove_var(v)); }

#[test]
#[serial]
fn defaults_without_file_or_env() {
    clear_env();
    let cfg = OperatorConfig::load(None).unwrap();
    assert_eq!(cfg, OperatorConfig::default());
    assert_eq!(cfg.default_image, "wordpress:4.6.1-apache");
    assert_eq!(cfg.requeue.short_wait, Duration::from_secs(30));
    assert_eq!(cfg.requeue.long_wait, Duration::from_secs(60));
    assert_eq!(cfg.field_manager, "wordpress-stack-operator");
    assert_eq!(cfg.metrics_addr.port(), 8080);
}

#[test]
#[serial]
fn file_then_env_overrides() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("operator.toml");
    std::fs::write(
        &path,
        r#"
default_image = "wordpress:5.0"
short_wait_secs = 5
apply_strategy = "create-only"
watch_namespace = "blogs"

[naming]
resource_prefix = "wp"
"#,
    )
    .unwrap();
    std::env::set_var("WORDPRESS_SHORT_WAIT_SECS", "7");
    std::env::set_var("WORDPRESS_METRICS_ADDR", "127.0.0.1:9100");

    let cfg = OperatorConfig::load(Some(&path)).unwrap();
    assert_eq!(cfg.default_image, "wordpress:5.0");
    assert_eq!(cfg.requeue.short_wait, Duration::from_secs(7));
    assert_eq!(cfg.requeue.long_wait, Duration::from_secs(60));
    assert_eq!(cfg.apply_strategy, ApplyStrategy::CreateOnly);
    assert_eq!(cfg.watch_namespace.as_deref(), Some("blogs"));
    assert_eq!(cfg.metrics_addr.to_string(), "127.0.0.1:9100");
    assert_eq!(cfg.naming.resource_prefix, "wp");
    assert_eq!(cfg.naming.selector_key, "wordpress-instance");
    clear_env();
}

#[test]
#[serial]
fn config_path_from_env() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("c.toml");
    std::fs::write(&path, "field_manager = \"blog-operator\"\n").unwrap();
    std::env::set_var("WORDPRESS_OPERATOR_CONFIG", &path);
    std::env::set_var("WORDPRESS_APPLY_STRATEGY", "ssa");
    let cfg = OperatorConfig::load(None).unwrap();
    assert_eq!(cfg.field_manager, "blog-operator");
    assert_eq!(cfg.apply_strategy, ApplyStrategy::ServerSideApply);
    clear_env();
}

#[test]
#[serial]
fn invalid_values_are_config_errors() {
    clear_env();
    std::env::set_var("WORDPRESS_LONG_WAIT_SECS", "soon");
    assert!(matches!(OperatorConfig::load(None), Err(Error::Config(_))));
    clear_env();
    std::env::set_var("WORDPRESS_APPLY_STRATEGY", "merge");
    assert!(matches!(OperatorConfig::load(None), Err(Error::Config(_))));
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(OperatorConfig::load(Some(&dir.path().join("missing.toml"))), Err(Error::Config(_))));
    let bad = dir.path().join("bad.toml");
    std::fs::write(&bad, "unknown_key = 1\n").unwrap();
    assert!(matches!(OperatorConfig::load(Some(&bad)), Err(Error::Config(_))));
}
