use crate::error::Result;
use crate::pipeline::adapter::Adapter;
use crate::pipeline::buffer::OutputFeed;
use crate::pipeline::orchestrator::{Orchestrator, RunHandle};

/// A pipeline whose input trickles in over time instead of coming from
/// producers that run to completion.
///
/// Call [`add`](Self::add) from as many tasks as needed (share the facade
/// behind an `Arc`, or hand out [`intake`](Self::intake) feeds), then call
/// [`tear_down`](Self::tear_down) exactly once after the last `add`.
///
/// Dropping the facade without tearing it down is a caller error: consumers
/// are cancelled mid-drain and buffered items are lost.
pub struct LongLived<T: Send + 'static> {
    run: Option<RunHandle<T>>,
    intake: OutputFeed<T>,
}

impl<T: Send + 'static> LongLived<T> {
    /// Start the consumers of `orchestrator`. Any producers it carries run too
    /// and are waited for on teardown.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start<A>(orchestrator: Orchestrator<T, A>) -> Self
    where
        A: Adapter<T> + 'static,
    {
        let run = orchestrator.launch();
        let intake = run.feed();
        Self {
            run: Some(run),
            intake,
        }
    }

    /// Enqueue one item, waiting for room if the buffer is bounded.
    ///
    /// Fails with `Cancelled` once the pipeline was cancelled or a consumer
    /// faulted.
    pub async fn add(&self, item: T) -> Result<()> {
        self.intake.put(item).await
    }

    /// A cloneable handle with the same semantics as [`add`](Self::add).
    /// Puts after teardown fail with `Closed`.
    pub fn intake(&self) -> OutputFeed<T> {
        self.intake.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.intake.signal().is_cancelled()
    }

    /// Stop intake, let consumers drain what is buffered, and wait for every
    /// consumer to be disposed. Returns the first consumer fault, if any.
    pub async fn tear_down(mut self) -> Result<()> {
        let Some(run) = self.run.take() else {
            return Ok(());
        };

        #[cfg(feature = "tracing")]
        tracing::event!(
            tracing::Level::INFO,
            event = "ppcflow.facade.teardown",
            queued = run.buffer().len(),
            "ppcflow.facade.teardown"
        );

        run.join().await
    }
}

impl<T: Send + 'static> Drop for LongLived<T> {
    fn drop(&mut self) {
        if let Some(run) = self.run.take() {
            #[cfg(feature = "tracing")]
            tracing::event!(
                tracing::Level::WARN,
                event = "ppcflow.facade.dropped",
                queued = run.buffer().len(),
                "ppcflow.facade.dropped"
            );
            run.abandon();
        }
    }
}
