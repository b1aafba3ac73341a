// System status display: row count, latest ingested files, queue depth.

use std::sync::Arc;

use anyhow::Result;
use colored::Colorize;

use crate::db::RecordSink;
use crate::queue::SqsQueue;

/// Display system status to the terminal, listing up to `recent` files.
pub async fn show(
    sink: &Arc<dyn RecordSink>,
    queue: Option<&SqsQueue>,
    recent: u32,
) -> Result<()> {
    let total = sink.record_count().await?;
    println!("Ingested files: {}", total.to_string().bold());

    let records = sink.recent_records(recent).await?;
    if records.is_empty() {
        println!("Recent files: none yet");
        println!("  Upload a .txt file to the bucket and run `nexus run`");
    } else {
        println!("Recent files: {} most recent:", records.len());
        for record in &records {
            println!(
                "  #{} {} ({}, {})",
                record.id,
                record.file_key,
                format_bytes(record.content_length.max(0) as u64),
                record.processed_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
        }
    }

    match queue {
        Some(queue) => match queue.depth().await {
            Ok(depth) => println!(
                "Queue: {} waiting, {} in flight",
                format_count(depth.visible),
                format_count(depth.in_flight)
            ),
            Err(e) => println!("Queue: {} {e:#}", "unavailable:".yellow()),
        },
        None => println!("Queue: {}", "QUEUE_URL not set".dimmed()),
    }

    Ok(())
}

fn format_count(count: Option<i64>) -> String {
    count.map_or_else(|| "?".to_string(), |c| c.to_string())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
