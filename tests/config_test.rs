//! Configuration system tests.

use metric_bridge::core::{Config, ConfigBuilder, MetadataLookup, MetricIdentity, ResourceIdentity};
use metric_bridge::metrics::BucketLayout;
use std::io::Write;
use std::time::Duration;

#[test]
fn test_default_config() {
    let config = Config::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.exporter.export_interval, Duration::from_secs(60));
    assert_eq!(config.exporter.max_batch_size, 200);
    assert_eq!(config.exporter.metric_prefix, "custom.googleapis.com/app");
    assert_eq!(config.resource.resource_type, "global");
    assert_eq!(config.metrics.reservoir_size, 1028);
}

#[test]
fn test_default_config_has_no_project() {
    let config = Config::default();
    assert!(ResourceIdentity::resolve(&config).is_err());
}

#[test]
fn test_config_builder() {
    let config = ConfigBuilder::new()
        .project_id("builder-project")
        .export_interval(Duration::from_secs(10))
        .max_batch_size(25)
        .default_buckets(BucketLayout::Explicit {
            bounds: vec![1.0, 10.0, 100.0],
        })
        .build()
        .unwrap();

    assert_eq!(config.exporter.project_id, "builder-project");
    assert_eq!(config.exporter.export_interval, Duration::from_secs(10));
    assert_eq!(config.exporter.max_batch_size, 25);
    assert_eq!(config.metrics.default_buckets.bucket_count(), 4);
}

#[test]
fn test_batch_size_ceiling() {
    assert!(ConfigBuilder::new().max_batch_size(200).build().is_ok());
    assert!(ConfigBuilder::new().max_batch_size(201).build().is_err());
    assert!(ConfigBuilder::new().max_batch_size(0).build().is_err());
}

#[test]
fn test_invalid_default_buckets_rejected() {
    let result = ConfigBuilder::new()
        .default_buckets(BucketLayout::Exponential {
            count: 4,
            scale: 1.0,
            growth: 1.0,
        })
        .build();
    assert!(result.is_err());
}

#[test]
fn test_yaml_config() {
    let yaml = r#"
exporter:
  project_id: yaml-project
  export_interval: 2m
resource:
  type: k8s_container
  labels:
    cluster_name: prod
    namespace_name: web
"#;

    let config = ConfigBuilder::new().from_yaml(yaml).unwrap().build().unwrap();
    assert_eq!(config.exporter.export_interval, Duration::from_secs(120));
    // Unset fields keep their defaults.
    assert_eq!(config.exporter.max_batch_size, 200);

    let (scope, resource) = ResourceIdentity::resolve(&config).unwrap();
    assert_eq!(scope.name(), "projects/yaml-project");
    assert_eq!(resource.resource_type, "k8s_container");
    assert_eq!(resource.labels.get("cluster_name").map(String::as_str), Some("prod"));
    assert_eq!(
        resource.labels.get("project_id").map(String::as_str),
        Some("yaml-project")
    );
}

#[test]
fn test_malformed_yaml_rejected() {
    let result = ConfigBuilder::new().from_yaml("exporter: [not, a, map]");
    assert!(result.is_err());
}

#[tokio::test]
async fn test_config_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
exporter:
  project_id: file-project
  max_batch_size: 75
metrics:
  overrides:
    request_latency:
      display_name: Request latency
      unit: ms
"#
    )
    .unwrap();

    let config = ConfigBuilder::new()
        .from_file(file.path())
        .await
        .unwrap()
        .build()
        .unwrap();
    assert_eq!(config.exporter.project_id, "file-project");
    assert_eq!(config.exporter.max_batch_size, 75);

    let metadata = config
        .metrics
        .metadata(&MetricIdentity::new("request_latency").unwrap());
    assert_eq!(metadata.display_name, "Request latency");
    assert_eq!(metadata.unit, "ms");
    assert_eq!(metadata.buckets, config.metrics.default_buckets);
}

#[tokio::test]
async fn test_missing_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = ConfigBuilder::new()
        .from_file(&dir.path().join("missing.yaml"))
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_bucket_layouts_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
exporter:
  project_id: layout-project
metrics:
  default_buckets: {{ exponential: {{ count: 20, scale: 1.0, growth: 2.0 }} }}
  overrides:
    request_latency:
      unit: ms
      buckets: {{ explicit: {{ bounds: [5, 10, 50, 100, 500] }} }}
    queue_depth:
      buckets:
        linear:
          count: 4
          offset: 0
          width: 25
"#
    )
    .unwrap();

    let config = ConfigBuilder::new()
        .from_file(file.path())
        .await
        .unwrap()
        .build()
        .unwrap();

    assert_eq!(
        config.metrics.default_buckets,
        BucketLayout::Exponential {
            count: 20,
            scale: 1.0,
            growth: 2.0,
        }
    );

    let latency = config
        .metrics
        .metadata(&MetricIdentity::new("request_latency").unwrap());
    assert_eq!(
        latency.buckets,
        BucketLayout::Explicit {
            bounds: vec![5.0, 10.0, 50.0, 100.0, 500.0],
        }
    );

    let depth = config
        .metrics
        .metadata(&MetricIdentity::new("queue_depth").unwrap());
    assert_eq!(depth.buckets.bucket_count(), 6);

    // Metrics without an override use the default layout.
    let other = config.metrics.metadata(&MetricIdentity::new("other").unwrap());
    assert_eq!(other.buckets, config.metrics.default_buckets);
}

#[test]
fn test_oversized_bucket_layout_rejected() {
    let yaml = r#"
metrics:
  default_buckets: { exponential: { count: 1100, scale: 1.0, growth: 2.0 } }
"#;
    let result = ConfigBuilder::new().from_yaml(yaml).unwrap().build();
    assert!(result.is_err());
}

#[test]
fn test_bucket_layout_survives_yaml_round_trip() {
    let config = ConfigBuilder::new()
        .default_buckets(BucketLayout::Linear {
            count: 3,
            offset: 1.0,
            width: 2.0,
        })
        .build()
        .unwrap();

    let yaml = serde_yaml::to_string(&config).unwrap();
    let reloaded = ConfigBuilder::new().from_yaml(&yaml).unwrap().build().unwrap();
    assert_eq!(reloaded.metrics.default_buckets, config.metrics.default_buckets);
}
