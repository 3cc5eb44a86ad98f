use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;

use crate::error::{Error, Result};
use crate::pipeline::adapter::Adapter;
use crate::pipeline::buffer::{InputFeed, OutputFeed};
use crate::pipeline::coordinator::{Coordinator, FaultOrigin};
use crate::pipeline::role::{Consumer, Producer, Role};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunnerState {
    Idle,
    Initializing,
    Running,
    Completed,
    Faulted,
}

impl RunnerState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Faulted)
    }
}

/// How one runner ended. Runners that panicked leave no report.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunnerReport {
    pub role: Role,
    pub index: usize,
    pub state: RunnerState,
}

struct Lifecycle {
    role: Role,
    index: usize,
    state: RunnerState,
}

impl Lifecycle {
    fn new(role: Role, index: usize) -> Self {
        Self {
            role,
            index,
            state: RunnerState::Idle,
        }
    }

    fn enter(&mut self, next: RunnerState) {
        #[cfg(feature = "tracing")]
        tracing::event!(
            tracing::Level::DEBUG,
            event = "ppcflow.runner.state",
            role = self.role.as_str(),
            index = self.index,
            from = ?self.state,
            to = ?next,
            "ppcflow.runner.state"
        );
        self.state = next;
    }

    /// Move to `Faulted` and fire the run's fault signal.
    fn fault(&mut self, coordinator: &Coordinator, error: Error) -> Error {
        self.enter(RunnerState::Faulted);

        if error.is_cancelled() {
            coordinator.raise(None);
            #[cfg(feature = "tracing")]
            tracing::event!(
                tracing::Level::DEBUG,
                event = "ppcflow.cancelled",
                role = self.role.as_str(),
                index = self.index,
                "ppcflow.cancelled"
            );
            return Error::Cancelled;
        }

        let origin = FaultOrigin {
            role: self.role,
            index: self.index,
        };
        let primary = coordinator.raise(Some(origin));
        #[cfg(feature = "tracing")]
        {
            if primary {
                tracing::event!(
                    tracing::Level::WARN,
                    event = "ppcflow.fault.raised",
                    role = self.role.as_str(),
                    index = self.index,
                    error = %error,
                    "ppcflow.fault.raised"
                );
            } else {
                // Lost the race to another fault; logged so it is never silently dropped.
                tracing::event!(
                    tracing::Level::WARN,
                    event = "ppcflow.fault.secondary",
                    role = self.role.as_str(),
                    index = self.index,
                    error = %error,
                    "ppcflow.fault.secondary"
                );
            }
        }
        #[cfg(not(feature = "tracing"))]
        let _ = primary;

        Error::participant(self.role, self.index, error)
    }

    fn finish(&mut self, coordinator: &Coordinator, result: Result<()>) -> Result<()> {
        match result {
            Ok(()) => {
                self.enter(RunnerState::Completed);
                Ok(())
            }
            Err(error) => Err(self.fault(coordinator, error)),
        }
    }

    fn report(&self) -> RunnerReport {
        RunnerReport {
            role: self.role,
            index: self.index,
            state: self.state,
        }
    }

    /// Fault the runner for a panic; the caller disposes, then resumes it.
    fn panicked(&mut self, coordinator: &Coordinator) {
        self.enter(RunnerState::Faulted);
        coordinator.raise(None);
    }
}

/// Drives one producer: `init`, a single `produce`, then `dispose`.
pub struct ProducerRunner<T> {
    lifecycle: Lifecycle,
    producer: Box<dyn Producer<T>>,
}

impl<T: Send + 'static> ProducerRunner<T> {
    pub fn new(index: usize, producer: Box<dyn Producer<T>>) -> Self {
        Self {
            lifecycle: Lifecycle::new(Role::Producer, index),
            producer,
        }
    }

    /// `dispose` runs even when `init` or `produce` panics; the panic is
    /// resumed afterwards.
    pub async fn run(
        mut self,
        output: OutputFeed<T>,
        coordinator: Coordinator,
    ) -> (RunnerReport, Result<()>) {
        let outcome = AssertUnwindSafe(self.work(output, &coordinator)).catch_unwind().await;
        let result = match outcome {
            Ok(result) => self.lifecycle.finish(&coordinator, result),
            Err(panic) => {
                self.lifecycle.panicked(&coordinator);
                self.producer.dispose().await;
                std::panic::resume_unwind(panic);
            }
        };
        self.producer.dispose().await;
        (self.lifecycle.report(), result)
    }

    async fn work(&mut self, output: OutputFeed<T>, coordinator: &Coordinator) -> Result<()> {
        let signal = coordinator.signal();
        self.lifecycle.enter(RunnerState::Initializing);
        self.producer.init().await?;
        self.lifecycle.enter(RunnerState::Running);
        signal.check()?;
        self.producer.produce(output, &signal).await
    }
}

/// Drives one consumer: `init`, one `consume` per unit until the adapter is
/// exhausted, then `dispose`.
pub struct ConsumerRunner<C> {
    lifecycle: Lifecycle,
    consumer: Box<dyn Consumer<C>>,
}

impl<C: Send + 'static> ConsumerRunner<C> {
    pub fn new(index: usize, consumer: Box<dyn Consumer<C>>) -> Self {
        Self {
            lifecycle: Lifecycle::new(Role::Consumer, index),
            consumer,
        }
    }

    pub async fn run<T, A>(
        mut self,
        input: InputFeed<T>,
        adapter: Arc<A>,
        coordinator: Coordinator,
    ) -> (RunnerReport, Result<()>)
    where
        T: Send + 'static,
        A: Adapter<T, Unit = C> + ?Sized,
    {
        let outcome = AssertUnwindSafe(self.work(&input, &*adapter, &coordinator))
            .catch_unwind()
            .await;
        let result = match outcome {
            Ok(result) => self.lifecycle.finish(&coordinator, result),
            Err(panic) => {
                self.lifecycle.panicked(&coordinator);
                self.consumer.dispose().await;
                std::panic::resume_unwind(panic);
            }
        };
        self.consumer.dispose().await;
        (self.lifecycle.report(), result)
    }

    async fn work<T, A>(
        &mut self,
        input: &InputFeed<T>,
        adapter: &A,
        coordinator: &Coordinator,
    ) -> Result<()>
    where
        T: Send + 'static,
        A: Adapter<T, Unit = C> + ?Sized,
    {
        let signal = coordinator.signal();
        self.lifecycle.enter(RunnerState::Initializing);
        self.consumer.init().await?;
        self.lifecycle.enter(RunnerState::Running);
        loop {
            signal.check()?;
            match adapter.try_get(input).await? {
                Some(unit) => self.consumer.consume(unit, &signal).await?,
                None => return Ok(()),
            }
        }
    }
}
