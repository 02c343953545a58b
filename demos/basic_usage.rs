// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Basic split-store usage example.
//!
//! Demonstrates:
//! 1. Opening a store over in-memory local and sync areas
//! 2. Writing league-scoped values and an ephemeral cache entry
//! 3. Enabling sync (migration + quota snapshot)
//! 4. A refused enable when the data does not fit the sync quota
//! 5. Displaying metrics
//!
//! # Run
//!
//! ```bash
//! cargo run --example basic_usage
//! ```

use std::sync::Arc;

use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
use serde_json::json;
use split_store::payload::now_millis;
use split_store::{Backend, HostFamily, MemoryArea, SplitStore, SplitStoreConfig, SyncSettings};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder.install().expect("failed to install metrics recorder");

    tracing_subscriber::fmt()
        .with_target(false)
        .compact()
        .init();

    println!("\n╔═══════════════════════════════════════════════════════════════╗");
    println!("║           split-store: Basic Usage Example                    ║");
    println!("╚═══════════════════════════════════════════════════════════════╝\n");

    // ─────────────────────────────────────────────────────────────────────────
    // 1. Open the store
    // ─────────────────────────────────────────────────────────────────────────
    let config = SplitStoreConfig {
        host: HostFamily::Firefox,
        ..Default::default()
    };
    println!("📦 Opening store for {:?} ({}.storage)...", config.host, config.host.api_namespace());

    let local = Arc::new(MemoryArea::new());
    let sync = Arc::new(MemoryArea::sync_for(config.host));
    let store = Arc::new(SplitStore::open(config, local.clone(), sync.clone()).await?);
    println!("   └─ Sync enabled: {}", store.sync_enabled());

    // ─────────────────────────────────────────────────────────────────────────
    // 2. Write some values
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n📝 Writing values...");
    let league = Some("Settlers");
    let entries = vec![
        ("bookmark-folders", json!([{"id": "f1", "title": "Maps"}])),
        ("bookmark-trades--f1", json!([{"query": "abc123"}])),
        ("trade-history", json!([{"item": "Mageblood", "price": 180}])),
        ("item-results-cache", json!({"results": 42})),
    ];
    for (key, value) in &entries {
        store.set_value(key, value, league).await?;
        println!("   └─ {} → {:?} area", key, store.backend_for(key, league));
    }
    store
        .set_ephemeral_value("poe-ninja-chaos-ratios-cache", &json!({"divine": 180}), now_millis() + 60_000, None)
        .await?;
    println!("   └─ poe-ninja-chaos-ratios-cache (expires in 60s)");

    // ─────────────────────────────────────────────────────────────────────────
    // 3. Enable sync
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n🔁 Enabling sync...");
    let settings = SyncSettings::new(store.clone());
    if settings.toggle_sync(true).await {
        println!("   ✅ Sync enabled, {} keys in the sync area", sync.len());
        println!("   └─ Usage: {}", settings.formatted_quota_usage());
        println!("   └─ Warning: {}", settings.show_quota_warning());
    } else {
        println!("   ❌ {}", settings.last_error().unwrap_or_default());
    }

    for (key, _) in &entries {
        let routed = store.backend_for(key, league);
        let marker = if routed == Backend::Sync { "☁️ " } else { "💾" };
        println!("   {} {}", marker, key);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // 4. A refused enable
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n🚫 Disabling, then growing trade history past the quota...");
    settings.toggle_sync(false).await;
    for i in 0..20 {
        let big = "x".repeat(6_000);
        store.set_value("trade-history", &big, Some(&format!("league{}", i))).await?;
    }
    if !settings.toggle_sync(true).await {
        println!("   └─ Refused: {}", settings.last_error().unwrap_or_default());
        println!("   └─ Sync enabled: {}", settings.sync_enabled());
    }

    // ─────────────────────────────────────────────────────────────────────────
    // 5. Metrics
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n📈 Raw Metrics:");
    dump_metrics(&snapshotter);

    println!("\n╔═══════════════════════════════════════════════════════════════╗");
    println!("║                    Example complete!                          ║");
    println!("╚═══════════════════════════════════════════════════════════════╝\n");

    Ok(())
}

/// Dump all captured metrics, sorted by name
fn dump_metrics(snapshotter: &Snapshotter) {
    let mut counters = vec![];
    let mut gauges = vec![];

    for (composite_key, _, _, value) in snapshotter.snapshot().into_vec() {
        let (_, key) = composite_key.into_parts();
        let labels: Vec<_> = key.labels().map(|l| format!("{}={}", l.key(), l.value())).collect();
        let label_str = if labels.is_empty() { String::new() } else { format!("{{{}}}", labels.join(",")) };

        match value {
            DebugValue::Counter(v) => counters.push((key.name().to_string(), label_str, v)),
            DebugValue::Gauge(v) => gauges.push((key.name().to_string(), label_str, v.into_inner())),
            DebugValue::Histogram(_) => {}
        }
    }

    counters.sort_by(|a, b| a.0.cmp(&b.0));
    gauges.sort_by(|a, b| a.0.cmp(&b.0));

    if !counters.is_empty() {
        println!("   ┌─ Counters (cumulative)");
        for (name, labels, value) in &counters {
            println!("   │  └─ {}{} = {}", name, labels, value);
        }
    }
    if !gauges.is_empty() {
        println!("   └─ Gauges (current value)");
        for (name, labels, value) in &gauges {
            println!("      └─ {}{} = {:.2}", name, labels, value);
        }
    }
}
