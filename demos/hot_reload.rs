//! Example demonstrating file watching and automatic hot-reload.
//!
//! This example shows how to:
//! - Load keyed configuration from a file and keep watching it
//! - Look entries up while the file is being edited
//! - Subscribe to reload and reload-failure notifications
//!
//! Run with: cargo run --example hot_reload
//!
//! While running, edit the printed file to see automatic reloads. Saving a
//! broken file keeps the previous entries.

use keyswap_config::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
struct Upstream {
    url: String,
    #[serde(default = "default_timeout")]
    timeout_ms: u64,
}

fn default_timeout() -> u64 {
    1000
}

#[tokio::main]
async fn main() -> Result<()> {
    println!("=== Hot Reload Example ===\n");

    let config_path = std::env::temp_dir().join("keyswap_hot_reload.yaml");
    if !config_path.exists() {
        std::fs::write(
            &config_path,
            r#"orders:
  url: http://orders.internal:8080
  timeout_ms: 250

billing:
  url: http://billing.internal:9090
"#,
        )?;
        println!("Created {}", config_path.display());
    }

    let manager: ConfigurationManager<String, Upstream> = ConfigurationManager::builder()
        .with_watch_debounce(Duration::from_millis(500))
        .with_reload_policy(ReloadFailurePolicy::Notify)
        .build();

    let reload_count = Arc::new(AtomicUsize::new(0));
    let reload_count_clone = Arc::clone(&reload_count);
    let _subscription = manager.subscribe(move |event| match event {
        ConfigEvent::Loaded { source, entries } => {
            let count = reload_count_clone.fetch_add(1, Ordering::SeqCst);
            println!("\n[Event] Load #{}: {} entries from {}", count, entries, source);
        }
        ConfigEvent::ReloadFailed { source, error } => {
            println!("\n[Event] Reload of {} failed, keeping previous entries: {}", source, error);
        }
    });

    manager.configure_from_file_and_watch(&config_path)?;
    println!("Watching: {}\n", config_path.display());

    print_entries(&manager);

    println!(
        "\n===> Try editing {} to see automatic reloads! <===",
        config_path.display()
    );
    println!("     Example changes:");
    println!("     - Add a new upstream key");
    println!("     - Change a url or timeout_ms");
    println!("     - Break the YAML syntax");
    println!("\nPress Ctrl+C to exit\n");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = tokio::time::sleep(Duration::from_secs(5)) => {
                println!("[Status] loads: {}", reload_count.load(Ordering::SeqCst));
                print_entries(&manager);
            }
        }
    }

    manager.stop_watching().await;
    println!("Stopped watching");
    Ok(())
}

fn print_entries(manager: &ConfigurationManager<String, Upstream>) {
    let snapshot = manager.snapshot();
    let mut keys: Vec<&String> = snapshot.keys().collect();
    keys.sort();
    for key in keys {
        if let Some(upstream) = snapshot.get(key) {
            println!("  {}: {} (timeout {}ms)", key, upstream.url, upstream.timeout_ms);
        }
    }
    if let Some(error) = manager.last_reload_error() {
        println!("  last reload error: {}", error);
    }
}
