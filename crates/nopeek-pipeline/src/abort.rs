// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Session abort handle.
//
// A sanitization session is abandoned when the user picks another photo or
// closes the flow. In-flight service calls are not interrupted on the wire;
// their results are simply never applied.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use nopeek_core::error::{NoPeekError, Result};
use tokio::sync::watch;
use tracing::debug;

/// Cloneable handle shared between a pipeline and whoever can abandon it.
#[derive(Debug, Clone)]
pub struct AbortHandle {
    aborted: Arc<watch::Sender<bool>>,
    in_flight: Arc<AtomicUsize>,
}

impl Default for AbortHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl AbortHandle {
    pub fn new() -> Self {
        let (aborted, _) = watch::channel(false);
        Self {
            aborted: Arc::new(aborted),
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Abandon the session. Idempotent.
    pub fn abort(&self) {
        if !self.aborted.send_replace(true) {
            debug!("sanitization session aborted");
        }
    }

    pub fn is_aborted(&self) -> bool {
        *self.aborted.borrow()
    }

    /// True while a service call is outstanding; the close affordance is
    /// disabled meanwhile.
    pub fn is_processing(&self) -> bool {
        self.in_flight.load(Ordering::SeqCst) > 0
    }

    /// Await `fut` unless the session is aborted first.
    ///
    /// A result that arrives after `abort()` is dropped and `Cancelled` is
    /// returned in its place.
    pub async fn run<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if self.is_aborted() {
            return Err(NoPeekError::Cancelled);
        }
        let mut rx = self.aborted.subscribe();
        let _guard = InFlight::enter(&self.in_flight);

        tokio::select! {
            biased;
            _ = rx.wait_for(|aborted| *aborted) => Err(NoPeekError::Cancelled),
            out = fut => {
                if self.is_aborted() {
                    Err(NoPeekError::Cancelled)
                } else {
                    out
                }
            }
        }
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl<'a> InFlight<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
