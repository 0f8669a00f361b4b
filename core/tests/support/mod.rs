//! Shared helpers for the integration suites.

use std::path::PathBuf;
use std::time::Duration;

use cascade_core::TopicRegistry;

const SETTLE_DEADLINE: Duration = Duration::from_secs(2);

pub fn write_config(dir: &tempfile::TempDir, name: &str, body: &str) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, body).expect("write config");
    path
}

/// Poll until the topic's last value matches `expected`, panicking after the
/// settle deadline. The fabric is asynchronous, so assertions on downstream
/// topics go through here.
pub async fn wait_for_text(registry: &TopicRegistry, topic: &str, expected: &str) {
    wait_until(registry, topic, |text| text == expected).await;
}

pub async fn wait_for_num(registry: &TopicRegistry, topic: &str, expected: f64) {
    wait_until(registry, topic, |text| {
        text.parse::<f64>().map(|v| v == expected).unwrap_or(false)
    })
    .await;
}

async fn wait_until(registry: &TopicRegistry, topic: &str, pred: impl Fn(&str) -> bool) {
    let deadline = tokio::time::Instant::now() + SETTLE_DEADLINE;
    loop {
        if let Some(t) = registry.lookup(topic) {
            let text = t.last_value_text().await;
            if pred(&text) {
                return;
            }
            if tokio::time::Instant::now() > deadline {
                panic!("topic '{topic}' settled at '{text}', which never matched");
            }
        } else if tokio::time::Instant::now() > deadline {
            panic!("topic '{topic}' was never created");
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
