#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use ppcflow::error::{Error, Result};
use ppcflow::pipeline::buffer::OutputFeed;
use ppcflow::pipeline::coordinator::Signal;
use ppcflow::pipeline::role::{Consumer, Producer};

/// Counts lifecycle calls made on one participant.
#[derive(Clone, Default)]
pub struct Tracker {
    inits: Arc<AtomicUsize>,
    work: Arc<AtomicUsize>,
    disposes: Arc<AtomicUsize>,
}

impl Tracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inits(&self) -> usize {
        self.inits.load(Ordering::SeqCst)
    }

    pub fn work_calls(&self) -> usize {
        self.work.load(Ordering::SeqCst)
    }

    pub fn disposes(&self) -> usize {
        self.disposes.load(Ordering::SeqCst)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposes() == 1
    }
}

/// Puts `items` in order, optionally sleeping before each one.
pub struct VecProducer<T> {
    items: Vec<T>,
    delay: Option<Duration>,
    fail_init: bool,
    tracker: Tracker,
}

impl<T> VecProducer<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            delay: None,
            fail_init: false,
            tracker: Tracker::new(),
        }
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn fail_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    pub fn track(mut self, tracker: Tracker) -> Self {
        self.tracker = tracker;
        self
    }
}

#[async_trait]
impl<T: Send + 'static> Producer<T> for VecProducer<T> {
    async fn init(&mut self) -> Result<()> {
        self.tracker.inits.fetch_add(1, Ordering::SeqCst);
        if self.fail_init {
            return Err(Error::pipeline("producer init failed"));
        }
        Ok(())
    }

    async fn produce(&mut self, output: OutputFeed<T>, _cancel: &Signal) -> Result<()> {
        self.tracker.work.fetch_add(1, Ordering::SeqCst);
        for item in std::mem::take(&mut self.items) {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            output.put(item).await?;
        }
        Ok(())
    }

    async fn dispose(&mut self) {
        self.tracker.disposes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Puts `items`, then fails with `Error::pipeline("producer failed")`.
pub struct FailingProducer<T> {
    items: Vec<T>,
    tracker: Tracker,
}

impl<T> FailingProducer<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items,
            tracker: Tracker::new(),
        }
    }

    pub fn track(mut self, tracker: Tracker) -> Self {
        self.tracker = tracker;
        self
    }
}

#[async_trait]
impl<T: Send + 'static> Producer<T> for FailingProducer<T> {
    async fn init(&mut self) -> Result<()> {
        self.tracker.inits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn produce(&mut self, output: OutputFeed<T>, _cancel: &Signal) -> Result<()> {
        self.tracker.work.fetch_add(1, Ordering::SeqCst);
        for item in std::mem::take(&mut self.items) {
            output.put(item).await?;
        }
        Err(Error::pipeline("producer failed"))
    }

    async fn dispose(&mut self) {
        self.tracker.disposes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Appends every unit to a shared vector. Can be told to fail on the n-th unit.
pub struct CollectConsumer<C> {
    out: Arc<Mutex<Vec<C>>>,
    delay: Option<Duration>,
    fail_on: Option<usize>,
    tracker: Tracker,
}

impl<C> CollectConsumer<C> {
    pub fn new(out: Arc<Mutex<Vec<C>>>) -> Self {
        Self {
            out,
            delay: None,
            fail_on: None,
            tracker: Tracker::new(),
        }
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Fail when asked to consume the `n`-th unit (1-based).
    pub fn fail_on(mut self, n: usize) -> Self {
        self.fail_on = Some(n);
        self
    }

    pub fn track(mut self, tracker: Tracker) -> Self {
        self.tracker = tracker;
        self
    }
}

#[async_trait]
impl<C: Send + 'static> Consumer<C> for CollectConsumer<C> {
    async fn init(&mut self) -> Result<()> {
        self.tracker.inits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn consume(&mut self, unit: C, _cancel: &Signal) -> Result<()> {
        let n = self.tracker.work.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on == Some(n) {
            return Err(Error::pipeline("consumer failed"));
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.out.lock().expect("mutex poisoned").push(unit);
        Ok(())
    }

    async fn dispose(&mut self) {
        self.tracker.disposes.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn shared<C>() -> Arc<Mutex<Vec<C>>> {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn snapshot<C: Clone>(out: &Arc<Mutex<Vec<C>>>) -> Vec<C> {
    out.lock().expect("mutex poisoned").clone()
}

/// Panics in `consume` on the first unit. `dispose` is still counted.
pub struct PanickingConsumer {
    tracker: Tracker,
}

impl PanickingConsumer {
    pub fn new(tracker: Tracker) -> Self {
        Self { tracker }
    }
}

#[async_trait]
impl<C: Send + 'static> Consumer<C> for PanickingConsumer {
    async fn init(&mut self) -> Result<()> {
        self.tracker.inits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn consume(&mut self, _unit: C, _cancel: &Signal) -> Result<()> {
        self.tracker.work.fetch_add(1, Ordering::SeqCst);
        panic!("consumer exploded");
    }

    async fn dispose(&mut self) {
        self.tracker.disposes.fetch_add(1, Ordering::SeqCst);
    }
}

/// Panics in `produce` before emitting anything.
pub struct PanickingProducer {
    tracker: Tracker,
}

impl PanickingProducer {
    pub fn new(tracker: Tracker) -> Self {
        Self { tracker }
    }
}

#[async_trait]
impl<T: Send + 'static> Producer<T> for PanickingProducer {
    async fn produce(&mut self, _output: OutputFeed<T>, _cancel: &Signal) -> Result<()> {
        self.tracker.work.fetch_add(1, Ordering::SeqCst);
        panic!("producer exploded");
    }

    async fn dispose(&mut self) {
        self.tracker.disposes.fetch_add(1, Ordering::SeqCst);
    }
}
