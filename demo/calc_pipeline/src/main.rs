use std::time::Duration;

use cascade_core::{default_registry, Runtime};
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logging / tracing
    let filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info,cascade_core=info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let mut args = std::env::args().skip(1);
    let Some(config_path) = args.next() else {
        eprintln!("usage: calc-pipeline <config-file> [topic=value ...]");
        eprintln!("example: calc-pipeline configs/sum_chain.conf A=2.0 B=3.0");
        std::process::exit(2);
    };

    let runtime = Runtime::new(default_registry());
    runtime.load_config(&config_path).await?;
    info!(config = %config_path, "pipeline loaded");

    for pair in args {
        let Some((topic, value)) = pair.split_once('=') else {
            error!(argument = %pair, "expected topic=value, skipping");
            continue;
        };
        match runtime.publish(topic, value).await {
            Ok(()) => info!(topic, value, "published"),
            Err(err) => error!(topic, error = %err, "publish rejected"),
        }
    }

    // Give the workers a moment to chew through their mailboxes.
    tokio::time::sleep(Duration::from_millis(200)).await;

    let graph = runtime.graph_snapshot().await;
    println!(
        "{} nodes, cycles: {}",
        graph.len(),
        if graph.has_cycles() { "yes" } else { "no" }
    );
    println!("{:<20} {:<14} {:<12} value", "topic", "role", "traffic");
    for row in runtime.topic_snapshot().await {
        println!(
            "{:<20} {:<14} {:<12} {}",
            row.name,
            row.role.to_string(),
            format!("{}p/{}d", row.stats.published, row.stats.delivered),
            row.last_value
        );
    }

    runtime.shutdown().await;
    Ok(())
}
