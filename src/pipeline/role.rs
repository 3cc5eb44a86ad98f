use std::fmt;
use std::future::Future;

use async_trait::async_trait;

use crate::error::Result;
use crate::pipeline::buffer::OutputFeed;
use crate::pipeline::coordinator::Signal;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    Producer,
    Consumer,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Producer => "producer",
            Self::Consumer => "consumer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Emits items into a run's buffer.
///
/// Per run: one `init`, one `produce`, one `dispose`. `dispose` runs on every
/// exit path, including when `init` failed.
#[async_trait]
pub trait Producer<T: Send + 'static>: Send {
    async fn init(&mut self) -> Result<()> {
        Ok(())
    }

    /// Put items with [`OutputFeed::put`] and return when done. Errors from
    /// `put` (cancellation, closed buffer) should be propagated with `?`.
    async fn produce(&mut self, output: OutputFeed<T>, cancel: &Signal) -> Result<()>;

    async fn dispose(&mut self) {}
}

/// Receives consumable units from a run's adapter.
///
/// `consume` is called once per unit and never concurrently with itself.
#[async_trait]
pub trait Consumer<C: Send + 'static>: Send {
    async fn init(&mut self) -> Result<()> {
        Ok(())
    }

    async fn consume(&mut self, unit: C, cancel: &Signal) -> Result<()>;

    async fn dispose(&mut self) {}
}

pub struct FnProducer<F>(pub F);

/// Wrap a closure as a [`Producer`] with no-op `init` and `dispose`.
pub fn producer_fn<T, F, Fut>(f: F) -> FnProducer<F>
where
    T: Send + 'static,
    F: FnMut(OutputFeed<T>, Signal) -> Fut + Send,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    FnProducer(f)
}

#[async_trait]
impl<T, F, Fut> Producer<T> for FnProducer<F>
where
    T: Send + 'static,
    F: FnMut(OutputFeed<T>, Signal) -> Fut + Send,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    async fn produce(&mut self, output: OutputFeed<T>, cancel: &Signal) -> Result<()> {
        (self.0)(output, cancel.clone()).await
    }
}

pub struct FnConsumer<F>(pub F);

/// Wrap a closure as a [`Consumer`] with no-op `init` and `dispose`.
pub fn consumer_fn<C, F, Fut>(f: F) -> FnConsumer<F>
where
    C: Send + 'static,
    F: FnMut(C, Signal) -> Fut + Send,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    FnConsumer(f)
}

#[async_trait]
impl<C, F, Fut> Consumer<C> for FnConsumer<F>
where
    C: Send + 'static,
    F: FnMut(C, Signal) -> Fut + Send,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    async fn consume(&mut self, unit: C, cancel: &Signal) -> Result<()> {
        (self.0)(unit, cancel.clone()).await
    }
}

#[async_trait]
impl<T, P> Producer<T> for Box<P>
where
    T: Send + 'static,
    P: Producer<T> + ?Sized,
{
    async fn init(&mut self) -> Result<()> {
        (**self).init().await
    }

    async fn produce(&mut self, output: OutputFeed<T>, cancel: &Signal) -> Result<()> {
        (**self).produce(output, cancel).await
    }

    async fn dispose(&mut self) {
        (**self).dispose().await
    }
}

#[async_trait]
impl<C, P> Consumer<C> for Box<P>
where
    C: Send + 'static,
    P: Consumer<C> + ?Sized,
{
    async fn init(&mut self) -> Result<()> {
        (**self).init().await
    }

    async fn consume(&mut self, unit: C, cancel: &Signal) -> Result<()> {
        (**self).consume(unit, cancel).await
    }

    async fn dispose(&mut self) {
        (**self).dispose().await
    }
}
