use async_trait::async_trait;
use tokio::time::Instant;

use crate::error::{Error, Result};
use crate::pipeline::buffer::{InputFeed, Take};
use crate::pipeline::config::BatchTimeout;

/// Turns buffered items into the units consumers receive.
///
/// One adapter is shared by every consumer of a run, so implementations must
/// not mutate themselves after construction.
#[async_trait]
pub trait Adapter<T: Send + 'static>: Send + Sync {
    type Unit: Send + 'static;

    /// The next unit, or `None` once the buffer is completed and drained.
    async fn try_get(&self, input: &InputFeed<T>) -> Result<Option<Self::Unit>>;
}

/// Delivers each item as its own unit.
#[derive(Clone, Copy, Debug, Default)]
pub struct Identity;

#[async_trait]
impl<T: Send + 'static> Adapter<T> for Identity {
    type Unit = T;

    async fn try_get(&self, input: &InputFeed<T>) -> Result<Option<T>> {
        input.take().await
    }
}

fn check_max_size(max_size: usize) -> Result<()> {
    if max_size < 2 {
        return Err(Error::config("batch max_size must be at least 2"));
    }
    Ok(())
}

/// Collect until `batch` is full or the buffer is exhausted, waiting as long as needed.
async fn fill<T>(input: &InputFeed<T>, batch: &mut Vec<T>, max_size: usize) -> Result<&'static str> {
    while batch.len() < max_size {
        match input.take().await? {
            Some(item) => batch.push(item),
            None => return Ok("exhausted"),
        }
    }
    Ok("full")
}

#[cfg_attr(not(feature = "tracing"), allow(unused_variables))]
fn finalized<T>(batch: Vec<T>, reason: &'static str) -> Option<Vec<T>> {
    #[cfg(feature = "tracing")]
    tracing::event!(
        tracing::Level::TRACE,
        event = "ppcflow.batch.finalized",
        size = batch.len(),
        reason = reason,
        "ppcflow.batch.finalized"
    );
    Some(batch)
}

/// Batches of up to `max_size` items with no deadline.
///
/// Only the last batch of a run can be short.
#[derive(Clone, Copy, Debug)]
pub struct Batch {
    max_size: usize,
}

impl Batch {
    pub fn new(max_size: usize) -> Result<Self> {
        check_max_size(max_size)?;
        Ok(Self { max_size })
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }
}

#[async_trait]
impl<T: Send + 'static> Adapter<T> for Batch {
    type Unit = Vec<T>;

    async fn try_get(&self, input: &InputFeed<T>) -> Result<Option<Vec<T>>> {
        let Some(first) = input.take().await? else {
            return Ok(None);
        };
        let mut batch = Vec::with_capacity(self.max_size);
        batch.push(first);

        let reason = fill(input, &mut batch, self.max_size).await?;
        Ok(finalized(batch, reason))
    }
}

/// Batches bounded by a count and by a deadline measured from the first item.
///
/// The first item of each batch is awaited without a deadline. After that the
/// batch keeps collecting until it is full or the window closes; once the
/// window has closed, only items already queued are picked up.
#[derive(Clone, Copy, Debug)]
pub struct WindowedBatch {
    max_size: usize,
    timeout: BatchTimeout,
}

impl WindowedBatch {
    pub fn new(max_size: usize, timeout: impl Into<BatchTimeout>) -> Result<Self> {
        check_max_size(max_size)?;
        Ok(Self {
            max_size,
            timeout: timeout.into(),
        })
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn timeout(&self) -> BatchTimeout {
        self.timeout
    }
}

#[async_trait]
impl<T: Send + 'static> Adapter<T> for WindowedBatch {
    type Unit = Vec<T>;

    async fn try_get(&self, input: &InputFeed<T>) -> Result<Option<Vec<T>>> {
        let Some(first) = input.take().await? else {
            return Ok(None);
        };
        let mut batch = Vec::with_capacity(self.max_size);
        batch.push(first);

        let window = match self.timeout {
            BatchTimeout::Infinite => {
                let reason = fill(input, &mut batch, self.max_size).await?;
                return Ok(finalized(batch, reason));
            }
            BatchTimeout::After(window) => window,
        };

        let started = Instant::now();
        let mut remaining = window.saturating_sub(started.elapsed());
        while batch.len() < self.max_size {
            match input.take_timeout(remaining).await? {
                Take::Item(item) => {
                    batch.push(item);
                    // Past the deadline every attempt is a zero-wait poll.
                    if !remaining.is_zero() {
                        remaining = window.saturating_sub(started.elapsed());
                    }
                }
                Take::Empty => return Ok(finalized(batch, "deadline")),
                Take::Exhausted => return Ok(finalized(batch, "exhausted")),
            }
        }
        Ok(finalized(batch, "full"))
    }
}
