//! # ppcflow
//!
//! **Parallel producer-consumer pipelines on Tokio.**
//!
//! `ppcflow` runs any number of producers and consumers concurrently around
//! one shared buffer. It applies **backpressure**, can **batch** items before
//! delivery, and tears the **whole run down** the moment any participant fails.
//!
//! It is built for in-process workloads:
//!
//! - bounded or unbounded buffering
//! - competing consumers (each item goes to exactly one consumer)
//! - count- and deadline-bounded batching
//! - cooperative cancellation at every wait point
//! - guaranteed `dispose` for every participant
//!
//! ---
//!
//! ## Core Model
//!
//! ```text
//! producers → Buffer → Adapter → consumers
//! ```
//!
//! Producers implement [`Producer`], consumers implement [`Consumer`], and an
//! [`Adapter`] decides what a consumer receives: single items ([`Identity`]),
//! fixed-size batches ([`Batch`]) or time-windowed batches ([`WindowedBatch`]).
//!
//! ---
//!
//! ## Example
//!
//! ```no_run
//! use ppcflow::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> ppcflow::error::Result<()> {
//!     Orchestrator::new(WindowedBatch::new(64, std::time::Duration::from_millis(20))?)
//!         .capacity(256)
//!         .producers((0..4).map(|p| {
//!             producer_fn(move |out: OutputFeed<u64>, _cancel| async move {
//!                 for i in 0..1_000 {
//!                     out.put(p * 1_000 + i).await?;
//!                 }
//!                 Ok::<(), ppcflow::error::Error>(())
//!             })
//!         }))
//!         .consumer(consumer_fn(|batch: Vec<u64>, _cancel| async move {
//!             println!("batch of {}", batch.len());
//!             Ok::<(), ppcflow::error::Error>(())
//!         }))
//!         .run()
//!         .await
//! }
//! ```
//!
//! ---
//!
//! ## Failure Contract
//!
//! - Any error from a participant's `init` or work step fires the run's fault
//!   signal. Every sibling observes it at its next wait point and stops.
//! - The run fails with that first fault, wrapped in
//!   [`Error::Participant`](error::Error::Participant). Later faults are
//!   logged, never silently dropped.
//! - When the run is cancelled through its external [`CancelToken`] and no
//!   participant faulted, it fails with [`Error::Cancelled`](error::Error::Cancelled).
//! - `dispose` runs for every participant on every exit path.
//! - The buffer is completed once all producers are done, whether or not they
//!   succeeded, so consumers never wait for items that cannot arrive.
//!
//! ---
//!
//! ## Long-lived pipelines
//!
//! [`LongLived`] keeps the consumers of a run alive while items are pushed in
//! with `add`, and drains and disposes them on `tear_down`.
//!
//! ---
//!
//! ## Observability
//!
//! With the default `tracing` feature, `ppcflow` emits spans `ppcflow.run` and
//! `ppcflow.runner`, and events such as `ppcflow.runner.state`,
//! `ppcflow.fault.raised`, `ppcflow.fault.secondary`, `ppcflow.cancelled`,
//! `ppcflow.buffer.completed` and `ppcflow.batch.finalized`.
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("ppcflow=debug")
//!     .init();
//! ```
//!
//! ---
//!
//! ## Feature Flags
//!
//! - `tracing` *(default)*: structured spans and events.
//! - `serde` *(default)*: deserialize [`PipelineConfig`](pipeline::config::PipelineConfig)
//!   and friends, validating values on the way in.
//!
//! [`Producer`]: pipeline::role::Producer
//! [`Consumer`]: pipeline::role::Consumer
//! [`Adapter`]: pipeline::adapter::Adapter
//! [`Identity`]: pipeline::adapter::Identity
//! [`Batch`]: pipeline::adapter::Batch
//! [`WindowedBatch`]: pipeline::adapter::WindowedBatch
//! [`CancelToken`]: pipeline::cancel::CancelToken
//! [`LongLived`]: pipeline::facade::LongLived

pub mod error;
pub mod pipeline;

pub mod prelude {
    //! Convenient imports for most `ppcflow` users.

    pub use crate::pipeline::adapter::{Adapter, Batch, Identity, WindowedBatch};
    pub use crate::pipeline::buffer::{InputFeed, OutputFeed};
    pub use crate::pipeline::cancel::CancelToken;
    pub use crate::pipeline::config::{BatchTimeout, Capacity};
    pub use crate::pipeline::coordinator::Signal;
    pub use crate::pipeline::facade::LongLived;
    pub use crate::pipeline::orchestrator::Orchestrator;
    pub use crate::pipeline::role::{consumer_fn, producer_fn, Consumer, Producer};
}
