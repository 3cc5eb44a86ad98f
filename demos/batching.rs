//! Windowed Batching Demonstration
//!
//! Run with:
//!   RUST_LOG=ppcflow=debug cargo run --example batching
//!
//! Two producers emit readings at different rates. A single consumer receives
//! them in batches of at most 8, flushed no later than 25ms after the first
//! reading of each batch. A slow producer therefore yields short batches
//! instead of stalling the consumer.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use ppcflow::error::{Error, Result};
use ppcflow::prelude::*;
use tracing_subscriber::EnvFilter;

/// Emits `count` readings, sleeping `interval` before each one.
struct Sensor {
    id: u32,
    count: u32,
    interval: Duration,
}

#[async_trait]
impl Producer<(u32, u32)> for Sensor {
    async fn init(&mut self) -> Result<()> {
        tracing::info!(sensor = self.id, "sensor online");
        Ok(())
    }

    async fn produce(&mut self, output: OutputFeed<(u32, u32)>, cancel: &Signal) -> Result<()> {
        for reading in 0..self.count {
            tokio::select! {
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                _ = tokio::time::sleep(self.interval) => {}
            }
            output.put((self.id, reading)).await?;
        }
        Ok(())
    }

    async fn dispose(&mut self) {
        tracing::info!(sensor = self.id, "sensor offline");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ppcflow=info,batching=info")),
        )
        .init();

    let batches = Arc::new(AtomicUsize::new(0));
    let counted = batches.clone();

    Orchestrator::new(WindowedBatch::new(8, Duration::from_millis(25))?)
        .capacity(32)
        .producer(Sensor {
            id: 1,
            count: 40,
            interval: Duration::from_millis(2),
        })
        .producer(Sensor {
            id: 2,
            count: 5,
            interval: Duration::from_millis(60),
        })
        .consumer(consumer_fn(move |batch: Vec<(u32, u32)>, _cancel| {
            let counted = counted.clone();
            async move {
                let n = counted.fetch_add(1, Ordering::Relaxed) + 1;
                tracing::info!(batch = n, size = batch.len(), first = ?batch.first(), "batch received");
                Ok::<(), Error>(())
            }
        }))
        .run()
        .await?;

    println!("delivered {} batches", batches.load(Ordering::Relaxed));
    Ok(())
}
