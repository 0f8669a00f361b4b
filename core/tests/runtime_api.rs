//! The surface handed to transport collaborators: configuration
//! persistence, snapshots, roles, and the process-wide default registry.

mod support;

use std::sync::Arc;

use cascade_core::{default_registry, Runtime, TopicRegistry, TopicRole};
use serial_test::serial;
use support::{wait_for_text, write_config};

fn runtime() -> (Runtime, Arc<TopicRegistry>, tempfile::TempDir) {
    let registry = Arc::new(TopicRegistry::new());
    let dir = tempfile::tempdir().expect("tempdir");
    let runtime = Runtime::with_config_dir(Arc::clone(&registry), dir.path().join("config_files"));
    (runtime, registry, dir)
}

#[tokio::test]
async fn save_config_creates_and_overwrites() {
    let (runtime, _registry, dir) = runtime();

    let first = runtime.save_config("demo.conf", b"inc\nX\nY\n").await.unwrap();
    assert_eq!(std::fs::read(&first).unwrap(), b"inc\nX\nY\n");
    assert!(first.starts_with(dir.path().join("config_files")));

    let second = runtime.save_config("demo.conf", b"not\nX\nY\n").await.unwrap();
    assert_eq!(second, first);
    assert_eq!(std::fs::read(&second).unwrap(), b"not\nX\nY\n");
}

#[tokio::test]
async fn saved_config_round_trips_through_load() {
    let (runtime, registry, _dir) = runtime();

    let path = runtime
        .save_config("sum.conf", b"add\nA,B\nS\ninc\nS\nR\n")
        .await
        .unwrap();
    runtime.load_config(&path).await.unwrap();

    runtime.publish("A", "2.0").await.unwrap();
    runtime.publish("B", "3.0").await.unwrap();
    wait_for_text(&registry, "R", "6.0").await;
    runtime.shutdown().await;
}

#[tokio::test]
async fn snapshot_reports_roles_values_and_traffic() {
    let (runtime, _registry, dir) = runtime();
    let config = write_config(&dir, "sum.conf", "add\nA,B\nS\ninc\nS\nR\n");
    runtime.load_config(&config).await.unwrap();

    let rows = runtime.topic_snapshot().await;
    let names: Vec<&str> = rows.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["A", "B", "S", "R"]);

    let by_name = |name: &str| rows.iter().find(|r| r.name == name).unwrap();
    assert_eq!(by_name("A").role, TopicRole::InputOnly);
    assert_eq!(by_name("S").role, TopicRole::Intermediate);
    assert_eq!(by_name("R").role, TopicRole::OutputOnly);
    assert_eq!(by_name("A").last_value, "N/A");
    assert_eq!(by_name("S").subscribers, vec!["inc".to_string()]);
    assert_eq!(by_name("S").publishers, vec!["add".to_string()]);
    assert_eq!(by_name("A").stats.published, 0);

    runtime.publish("A", "1").await.unwrap();
    runtime.publish("B", "1").await.unwrap();
    wait_for_text(runtime.registry(), "R", "3.0").await;

    let rows = runtime.topic_snapshot().await;
    let a = rows.iter().find(|r| r.name == "A").unwrap();
    assert_eq!(a.stats.published, 1);
    assert_eq!(a.stats.delivered, 1);
    runtime.shutdown().await;
}

#[tokio::test]
async fn reload_is_structurally_idempotent() {
    let (runtime, registry, dir) = runtime();
    let config = write_config(&dir, "sum.conf", "add\nA,B\nS\ninc\nS\nR\n");

    runtime.load_config(&config).await.unwrap();
    let first_topics: Vec<String> = runtime
        .topic_snapshot()
        .await
        .into_iter()
        .map(|r| r.name)
        .collect();
    let first_graph = runtime.graph_snapshot().await;

    runtime.load_config(&config).await.unwrap();
    let second_topics: Vec<String> = runtime
        .topic_snapshot()
        .await
        .into_iter()
        .map(|r| r.name)
        .collect();
    let second_graph = runtime.graph_snapshot().await;

    assert_eq!(first_topics, second_topics);
    let ids = |g: &cascade_core::Graph| -> Vec<(String, Vec<usize>)> {
        g.nodes()
            .iter()
            .map(|n| (n.id.clone(), n.edges.clone()))
            .collect()
    };
    assert_eq!(ids(&first_graph), ids(&second_graph));

    // The old generation is gone: the fabric still computes exactly once.
    runtime.publish("A", "1").await.unwrap();
    runtime.publish("B", "2").await.unwrap();
    wait_for_text(&registry, "R", "4.0").await;
    runtime.shutdown().await;
}

#[tokio::test]
async fn parse_failure_aborts_but_keeps_registry_cleared() {
    let (runtime, registry, dir) = runtime();
    let good = write_config(&dir, "good.conf", "inc\nX\nY\n");
    runtime.load_config(&good).await.unwrap();
    assert_eq!(registry.len(), 2);

    let bad = write_config(&dir, "bad.conf", "inc\nX\n");
    assert!(runtime.load_config(&bad).await.is_err());
    // The failed load already tore down the previous generation.
    assert!(registry.is_empty());
    runtime.shutdown().await;
}

#[tokio::test]
async fn seconds_since_clear_tracks_loads() {
    let (runtime, _registry, dir) = runtime();
    assert_eq!(runtime.seconds_since_clear().await, None);

    let config = write_config(&dir, "inc.conf", "inc\nX\nY\n");
    runtime.load_config(&config).await.unwrap();
    assert!(runtime.seconds_since_clear().await.is_some());
    runtime.shutdown().await;
}

#[tokio::test]
async fn graph_snapshot_serialises_for_the_visualiser() {
    let (runtime, _registry, dir) = runtime();
    let config = write_config(&dir, "inc.conf", "inc\nX\nY\n");
    runtime.load_config(&config).await.unwrap();

    let graph = runtime.graph_snapshot().await;
    let json = serde_json::to_value(&graph).unwrap();
    let nodes = json.get("nodes").unwrap().as_array().unwrap();
    assert_eq!(nodes.len(), 3);
    assert_eq!(nodes[0]["id"], "T:X");
    assert_eq!(nodes[0]["kind"], "topic");
    runtime.shutdown().await;
}

#[tokio::test]
#[serial]
async fn default_registry_is_shared_and_clearable() {
    let registry = default_registry();
    registry.clear().await;

    let topic = registry.get("shared").await;
    topic
        .publish(cascade_core::Message::from_text("7"))
        .await;

    // Another handle observes the same fabric.
    let again = default_registry();
    let seen = again.lookup("shared").expect("same instance");
    assert_eq!(seen.last_value_text().await, "7");

    registry.clear().await;
    assert!(default_registry().is_empty());
}
