use std::num::NonZeroUsize;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::pipeline::adapter::{Batch, WindowedBatch};

/// Buffer capacity. Zero means unbounded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize), serde(try_from = "i64"))]
pub enum Capacity {
    #[default]
    Unbounded,
    Bounded(NonZeroUsize),
}

impl Capacity {
    pub fn new(capacity: usize) -> Self {
        NonZeroUsize::new(capacity).map_or(Self::Unbounded, Self::Bounded)
    }

    pub fn get(self) -> usize {
        match self {
            Self::Unbounded => 0,
            Self::Bounded(n) => n.get(),
        }
    }

    pub(crate) fn has_room(self, queued: usize) -> bool {
        match self {
            Self::Unbounded => true,
            Self::Bounded(n) => queued < n.get(),
        }
    }
}

impl From<usize> for Capacity {
    fn from(capacity: usize) -> Self {
        Self::new(capacity)
    }
}

impl TryFrom<i64> for Capacity {
    type Error = Error;

    fn try_from(capacity: i64) -> Result<Self> {
        let capacity = usize::try_from(capacity)
            .map_err(|_| Error::config("buffer capacity must be zero (unbounded) or positive"))?;
        Ok(Self::new(capacity))
    }
}

/// How long a windowed batch may keep collecting after its first item.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Deserialize),
    serde(try_from = "Option<i64>")
)]
pub enum BatchTimeout {
    #[default]
    Infinite,
    After(Duration),
}

impl BatchTimeout {
    pub fn from_millis(millis: i64) -> Result<Self> {
        let millis =
            u64::try_from(millis).map_err(|_| Error::config("batch timeout must not be negative"))?;
        Ok(Self::After(Duration::from_millis(millis)))
    }
}

impl From<Duration> for BatchTimeout {
    fn from(timeout: Duration) -> Self {
        Self::After(timeout)
    }
}

impl TryFrom<Option<i64>> for BatchTimeout {
    type Error = Error;

    fn try_from(millis: Option<i64>) -> Result<Self> {
        millis.map_or(Ok(Self::Infinite), Self::from_millis)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
pub struct BatchConfig {
    pub max_size: usize,
    /// Absent or `null` means wait indefinitely for a full batch.
    #[cfg_attr(feature = "serde", serde(rename = "timeout_ms", default))]
    pub timeout: BatchTimeout,
}

impl BatchConfig {
    pub fn new(max_size: usize, timeout: impl Into<BatchTimeout>) -> Self {
        Self {
            max_size,
            timeout: timeout.into(),
        }
    }

    pub fn windowed(&self) -> Result<WindowedBatch> {
        WindowedBatch::new(self.max_size, self.timeout)
    }

    /// A count-only batch; the timeout is ignored.
    pub fn fixed(&self) -> Result<Batch> {
        Batch::new(self.max_size)
    }
}

/// A declarative description of one pipeline, e.g. loaded from a config file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize))]
pub struct PipelineConfig {
    #[cfg_attr(feature = "serde", serde(default))]
    pub capacity: Capacity,
    #[cfg_attr(feature = "serde", serde(default))]
    pub batch: Option<BatchConfig>,
}
