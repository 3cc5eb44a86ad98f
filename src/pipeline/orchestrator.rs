use std::sync::Arc;

use tokio::task::{JoinHandle, JoinSet};

use crate::error::{Error, Result};
use crate::pipeline::adapter::Adapter;
use crate::pipeline::buffer::{Buffer, OutputFeed};
use crate::pipeline::cancel::CancelToken;
use crate::pipeline::config::{Capacity, PipelineConfig};
use crate::pipeline::coordinator::{Coordinator, FaultOrigin, Signal};
#[cfg(feature = "tracing")]
use crate::pipeline::role::Role;
use crate::pipeline::role::{Consumer, Producer};
use crate::pipeline::runner::{ConsumerRunner, ProducerRunner, RunnerReport};

/// Runs N producers and M consumers around one buffer and one adapter.
///
/// ```no_run
/// use ppcflow::prelude::*;
///
/// # async fn demo() -> ppcflow::error::Result<()> {
/// Orchestrator::new(Identity)
///     .capacity(16)
///     .producer(producer_fn(|out: OutputFeed<u32>, _cancel| async move {
///         for i in 0..100 {
///             out.put(i).await?;
///         }
///         Ok::<(), ppcflow::error::Error>(())
///     }))
///     .consumer(consumer_fn(|item: u32, _cancel| async move {
///         println!("got {item}");
///         Ok::<(), ppcflow::error::Error>(())
///     }))
///     .run()
///     .await
/// # }
/// ```
pub struct Orchestrator<T: Send + 'static, A: Adapter<T>> {
    capacity: Capacity,
    adapter: Arc<A>,
    cancel: Option<CancelToken>,
    producers: Vec<Box<dyn Producer<T>>>,
    consumers: Vec<Box<dyn Consumer<A::Unit>>>,
}

impl<T, A> Orchestrator<T, A>
where
    T: Send + 'static,
    A: Adapter<T> + 'static,
{
    pub fn new(adapter: A) -> Self {
        Self {
            capacity: Capacity::Unbounded,
            adapter: Arc::new(adapter),
            cancel: None,
            producers: Vec::new(),
            consumers: Vec::new(),
        }
    }

    /// Buffer capacity; `0` means unbounded (the default).
    pub fn capacity(mut self, capacity: impl Into<Capacity>) -> Self {
        self.capacity = capacity.into();
        self
    }

    /// Apply the buffer capacity from `config`. The adapter was fixed by
    /// [`new`](Self::new); build it from `config.batch` with
    /// [`BatchConfig::windowed`](crate::pipeline::config::BatchConfig::windowed)
    /// or [`BatchConfig::fixed`](crate::pipeline::config::BatchConfig::fixed).
    pub fn config(mut self, config: &PipelineConfig) -> Self {
        self.capacity = config.capacity;
        self
    }

    /// External cancellation source. Firing it tears the run down.
    pub fn cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn producer<P>(mut self, producer: P) -> Self
    where
        P: Producer<T> + 'static,
    {
        self.producers.push(Box::new(producer));
        self
    }

    pub fn producers<I, P>(self, producers: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Producer<T> + 'static,
    {
        producers.into_iter().fold(self, Self::producer)
    }

    pub fn consumer<C>(mut self, consumer: C) -> Self
    where
        C: Consumer<A::Unit> + 'static,
    {
        self.consumers.push(Box::new(consumer));
        self
    }

    pub fn consumers<I, C>(self, consumers: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Consumer<A::Unit> + 'static,
    {
        consumers.into_iter().fold(self, Self::consumer)
    }

    /// Start every runner and return a handle to the live run.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn launch(self) -> RunHandle<T> {
        let coordinator = Coordinator::new(self.cancel);
        let buffer = Buffer::new(self.capacity);

        #[cfg(feature = "tracing")]
        let span = tracing::info_span!(
            "ppcflow.run",
            producers = self.producers.len(),
            consumers = self.consumers.len(),
            capacity = self.capacity.get()
        );

        let mut consumers = JoinSet::new();
        for (index, consumer) in self.consumers.into_iter().enumerate() {
            let runner = ConsumerRunner::new(index, consumer);
            let input = buffer.input(coordinator.signal());
            let fut = runner.run(input, self.adapter.clone(), coordinator.clone());
            #[cfg(feature = "tracing")]
            let fut = instrument(fut, &span, Role::Consumer, index);
            consumers.spawn(fut);
        }

        let mut producers = JoinSet::new();
        for (index, producer) in self.producers.into_iter().enumerate() {
            let runner = ProducerRunner::new(index, producer);
            let output = buffer.output(coordinator.signal());
            let fut = runner.run(output, coordinator.clone());
            #[cfg(feature = "tracing")]
            let fut = instrument(fut, &span, Role::Producer, index);
            producers.spawn(fut);
        }

        RunHandle {
            buffer,
            coordinator,
            producers,
            consumers,
        }
    }

    /// Run to completion: every producer done, buffer drained, every consumer done.
    pub async fn run(self) -> Result<()> {
        self.launch().join().await
    }

    pub fn spawn(self) -> JoinHandle<Result<()>> {
        tokio::spawn(self.run())
    }
}

#[cfg(feature = "tracing")]
fn instrument<F>(
    fut: F,
    parent: &tracing::Span,
    role: Role,
    index: usize,
) -> tracing::instrument::Instrumented<F>
where
    F: std::future::Future<Output = Finished>,
{
    use tracing::Instrument;
    let span = tracing::info_span!(parent: parent, "ppcflow.runner", role = role.as_str(), index = index);
    fut.instrument(span)
}

type Finished = (RunnerReport, Result<()>);

/// A run in flight.
///
/// Dropping the handle without [`join`](Self::join) aborts every runner.
pub struct RunHandle<T> {
    buffer: Buffer<T>,
    coordinator: Coordinator,
    producers: JoinSet<Finished>,
    consumers: JoinSet<Finished>,
}

impl<T: Send + 'static> RunHandle<T> {
    /// Put side of the run's buffer, for items that do not come from a producer.
    pub fn feed(&self) -> OutputFeed<T> {
        self.buffer.output(self.coordinator.signal())
    }

    pub fn signal(&self) -> Signal {
        self.coordinator.signal()
    }

    pub fn buffer(&self) -> &Buffer<T> {
        &self.buffer
    }

    /// Wait for all producers, complete the buffer, then wait for all consumers.
    ///
    /// Fails with the first participant fault, or with [`Error::Cancelled`]
    /// when the run was cancelled without one.
    pub async fn join(self) -> Result<()> {
        self.join_with_reports().await.0
    }

    /// Like [`join`](Self::join), also returning how each runner ended.
    ///
    /// Reports come in completion order. A runner that panicked has no report;
    /// its panic surfaces as [`Error::Join`].
    pub async fn join_with_reports(mut self) -> (Result<()>, Vec<RunnerReport>) {
        let mut finished = Vec::new();
        let mut panics = Vec::new();

        // Consumers are watched too: one that panics must not strand producers on a full buffer.
        while !self.producers.is_empty() {
            let joined = tokio::select! {
                Some(joined) = self.producers.join_next() => joined,
                Some(joined) = self.consumers.join_next(), if !self.consumers.is_empty() => joined,
                else => break,
            };
            absorb(joined, &self.coordinator, &mut finished, &mut panics);
        }

        // Completing even after a producer fault keeps consumers from waiting forever.
        self.buffer.complete();
        while let Some(joined) = self.consumers.join_next().await {
            absorb(joined, &self.coordinator, &mut finished, &mut panics);
        }

        let reports = finished.iter().map(|(report, _)| *report).collect();
        (resolve(self.coordinator.primary(), finished, panics), reports)
    }

    /// Fire the fault signal and let the runners wind down unobserved.
    pub(crate) fn abandon(mut self) {
        self.coordinator.raise(None);
        self.producers.detach_all();
        self.consumers.detach_all();
    }
}

fn absorb(
    joined: std::result::Result<Finished, tokio::task::JoinError>,
    coordinator: &Coordinator,
    finished: &mut Vec<Finished>,
    panics: &mut Vec<Error>,
) {
    match joined {
        Ok(done) => finished.push(done),
        Err(e) => {
            coordinator.raise(None);
            #[cfg(feature = "tracing")]
            tracing::event!(
                tracing::Level::ERROR,
                event = "ppcflow.runner.panicked",
                error = %e,
                "ppcflow.runner.panicked"
            );
            panics.push(Error::Join(e));
        }
    }
}

fn resolve(
    primary: Option<FaultOrigin>,
    finished: Vec<Finished>,
    panics: Vec<Error>,
) -> Result<()> {
    let mut cancelled = false;
    let mut first = None;
    let mut others = Vec::new();

    for (report, result) in finished {
        match result {
            Ok(()) => {}
            Err(Error::Cancelled) => cancelled = true,
            Err(e) => {
                let origin = FaultOrigin {
                    role: report.role,
                    index: report.index,
                };
                if first.is_none() && primary == Some(origin) {
                    first = Some(e);
                } else {
                    others.push(e);
                }
            }
        }
    }
    others.extend(panics);

    match first.or_else(|| others.into_iter().next()) {
        Some(e) => Err(e),
        None if cancelled => Err(Error::Cancelled),
        None => Ok(()),
    }
}
