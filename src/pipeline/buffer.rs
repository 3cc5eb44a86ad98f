use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::Notify;
use tokio::time::Instant;

use crate::error::{Error, Result};
use crate::pipeline::config::Capacity;
use crate::pipeline::coordinator::Signal;

/// Outcome of a take that is allowed to give up.
#[derive(Debug, PartialEq, Eq)]
pub enum Take<T> {
    Item(T),
    /// Nothing arrived within the allowed wait; the buffer is still open.
    Empty,
    /// Completed and drained. No item will ever arrive.
    Exhausted,
}

struct State<T> {
    queue: VecDeque<T>,
    completed: bool,
}

struct Shared<T> {
    state: Mutex<State<T>>,
    capacity: Capacity,
    items: Notify,
    space: Notify,
}

/// Competing-consumers queue shared by every producer and consumer of a run.
///
/// Blocking waits observe the [`Signal`] they are given and fail with
/// [`Error::Cancelled`] once it fires.
pub struct Buffer<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for Buffer<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<T> Buffer<T> {
    pub fn new(capacity: Capacity) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(State {
                    queue: VecDeque::new(),
                    completed: false,
                }),
                capacity,
                items: Notify::new(),
                space: Notify::new(),
            }),
        }
    }

    pub fn capacity(&self) -> Capacity {
        self.shared.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().queue.is_empty()
    }

    pub fn is_completed(&self) -> bool {
        self.lock().completed
    }

    // A panicking participant never leaves the queue half-updated, so a
    // poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, State<T>> {
        self.shared.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Enqueue `item`, waiting for room when the buffer is bounded and full.
    pub async fn put(&self, item: T, signal: &Signal) -> Result<()> {
        loop {
            let space = self.shared.space.notified();
            tokio::pin!(space);
            space.as_mut().enable();

            signal.check()?;
            {
                let mut state = self.lock();
                if state.completed {
                    return Err(Error::Closed);
                }
                if self.shared.capacity.has_room(state.queue.len()) {
                    state.queue.push_back(item);
                    drop(state);
                    self.shared.items.notify_one();
                    return Ok(());
                }
            }

            tokio::select! {
                _ = signal.cancelled() => return Err(Error::Cancelled),
                _ = &mut space => {}
            }
        }
    }

    /// Wait for the next item. `Ok(None)` means completed and drained.
    pub async fn take(&self, signal: &Signal) -> Result<Option<T>> {
        loop {
            let items = self.shared.items.notified();
            tokio::pin!(items);
            items.as_mut().enable();

            signal.check()?;
            match self.pop() {
                Some(Take::Item(item)) => return Ok(Some(item)),
                Some(_) => return Ok(None),
                None => {}
            }

            tokio::select! {
                _ = signal.cancelled() => return Err(Error::Cancelled),
                _ = &mut items => {}
            }
        }
    }

    /// Wait at most `wait` for the next item. A zero wait never suspends.
    pub async fn take_timeout(&self, wait: Duration, signal: &Signal) -> Result<Take<T>> {
        signal.check()?;
        if wait.is_zero() {
            return Ok(self.try_take());
        }

        let deadline = Instant::now() + wait;
        loop {
            let items = self.shared.items.notified();
            tokio::pin!(items);
            items.as_mut().enable();

            signal.check()?;
            if let Some(take) = self.pop() {
                return Ok(take);
            }

            tokio::select! {
                _ = signal.cancelled() => return Err(Error::Cancelled),
                _ = tokio::time::sleep_until(deadline) => {
                    return Ok(self.pop().unwrap_or(Take::Empty));
                }
                _ = &mut items => {}
            }
        }
    }

    /// Take whatever is immediately available without waiting.
    pub fn try_take(&self) -> Take<T> {
        self.pop().unwrap_or(Take::Empty)
    }

    /// Mark that no more items will be put. Idempotent; returns `true` on the
    /// first call. Queued items stay takeable.
    pub fn complete(&self) -> bool {
        let first = {
            let mut state = self.lock();
            !std::mem::replace(&mut state.completed, true)
        };
        self.shared.items.notify_waiters();
        self.shared.space.notify_waiters();

        #[cfg(feature = "tracing")]
        {
            if first {
                tracing::event!(
                    tracing::Level::DEBUG,
                    event = "ppcflow.buffer.completed",
                    queued = self.len(),
                    "ppcflow.buffer.completed"
                );
            }
        }
        first
    }

    fn pop(&self) -> Option<Take<T>> {
        let mut state = self.lock();
        if let Some(item) = state.queue.pop_front() {
            drop(state);
            self.shared.space.notify_one();
            Some(Take::Item(item))
        } else if state.completed {
            Some(Take::Exhausted)
        } else {
            None
        }
    }

    pub fn output(&self, signal: Signal) -> OutputFeed<T> {
        OutputFeed {
            buffer: self.clone(),
            signal,
        }
    }

    pub fn input(&self, signal: Signal) -> InputFeed<T> {
        InputFeed {
            buffer: self.clone(),
            signal,
        }
    }
}

/// The put-only side of a buffer handed to producers.
pub struct OutputFeed<T> {
    buffer: Buffer<T>,
    signal: Signal,
}

impl<T> Clone for OutputFeed<T> {
    fn clone(&self) -> Self {
        Self {
            buffer: self.buffer.clone(),
            signal: self.signal.clone(),
        }
    }
}

impl<T> OutputFeed<T> {
    pub async fn put(&self, item: T) -> Result<()> {
        self.buffer.put(item, &self.signal).await
    }

    pub fn signal(&self) -> &Signal {
        &self.signal
    }
}

/// The take side of a buffer handed to adapters.
pub struct InputFeed<T> {
    buffer: Buffer<T>,
    signal: Signal,
}

impl<T> Clone for InputFeed<T> {
    fn clone(&self) -> Self {
        Self {
            buffer: self.buffer.clone(),
            signal: self.signal.clone(),
        }
    }
}

impl<T> InputFeed<T> {
    pub async fn take(&self) -> Result<Option<T>> {
        self.buffer.take(&self.signal).await
    }

    pub async fn take_timeout(&self, wait: Duration) -> Result<Take<T>> {
        self.buffer.take_timeout(wait, &self.signal).await
    }

    pub fn try_take(&self) -> Take<T> {
        self.buffer.try_take()
    }

    pub fn signal(&self) -> &Signal {
        &self.signal
    }
}
