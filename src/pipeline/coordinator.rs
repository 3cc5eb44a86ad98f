use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};
use crate::pipeline::cancel::CancelToken;
use crate::pipeline::role::Role;

/// The effective cancellation signal every participant observes.
///
/// Fires when either the caller's external token or the run's internal fault
/// token fires, and never resets.
#[derive(Clone, Debug)]
pub struct Signal {
    external: Option<CancelToken>,
    fault: CancelToken,
}

impl Signal {
    /// A signal nobody will ever fire. Useful for driving a buffer by hand.
    pub fn never() -> Self {
        Self {
            external: None,
            fault: CancelToken::new(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.fault.is_cancelled() || self.external.as_ref().is_some_and(CancelToken::is_cancelled)
    }

    /// `true` when the run was torn down by a fault rather than by the caller.
    pub fn is_faulted(&self) -> bool {
        self.fault.is_cancelled()
    }

    pub async fn cancelled(&self) {
        match &self.external {
            Some(external) => {
                tokio::select! {
                    _ = external.cancelled() => {}
                    _ = self.fault.cancelled() => {}
                }
            }
            None => self.fault.cancelled().await,
        }
    }

    /// `Err(Cancelled)` once the signal has fired.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Which participant raised the fault that tore the run down.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FaultOrigin {
    pub role: Role,
    pub index: usize,
}

/// Owns the internal fault token of one run and remembers the first fault.
#[derive(Clone, Debug)]
pub struct Coordinator {
    signal: Signal,
    primary: Arc<Mutex<Option<FaultOrigin>>>,
}

impl Coordinator {
    pub fn new(external: Option<CancelToken>) -> Self {
        Self {
            signal: Signal {
                external,
                fault: CancelToken::new(),
            },
            primary: Arc::new(Mutex::new(None)),
        }
    }

    pub fn signal(&self) -> Signal {
        self.signal.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.signal.is_cancelled()
    }

    /// Fire the fault token. Idempotent.
    ///
    /// `origin` is `None` for cancellation fallout, which never claims the
    /// primary slot and leaves the fault token alone once the caller has
    /// cancelled. Returns `true` when `origin` became the primary fault.
    pub fn raise(&self, origin: Option<FaultOrigin>) -> bool {
        let won = match origin {
            None if self.signal.external.as_ref().is_some_and(CancelToken::is_cancelled) => {
                return false;
            }
            Some(origin) => {
                let mut slot = self.primary.lock().unwrap_or_else(|e| e.into_inner());
                if slot.is_none() {
                    *slot = Some(origin);
                    true
                } else {
                    false
                }
            }
            None => false,
        };
        self.signal.fault.cancel();
        won
    }

    pub fn primary(&self) -> Option<FaultOrigin> {
        *self.primary.lock().unwrap_or_else(|e| e.into_inner())
    }
}
