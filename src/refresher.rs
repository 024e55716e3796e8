//! Cancellable fixed-interval polling.

use std::cell::{Cell, RefCell};
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;

use futures::future::{AbortHandle, Abortable};

use crate::runtime;

/// A repeating timer with an explicit start/stop lifecycle.
///
/// Each tick spawns its task independently, so a slow read never delays the
/// next tick and overlapping reads simply race; whichever lands last wins.
/// Dropping the last clone stops the timer.
#[derive(Clone)]
pub struct Refresher {
    name: &'static str,
    period: Duration,
    inner: Rc<RefresherInner>,
}

#[derive(Default)]
struct RefresherInner {
    handle: RefCell<Option<AbortHandle>>,
    ticks: Cell<u64>,
}

impl Drop for RefresherInner {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.get_mut().take() {
            handle.abort();
        }
    }
}

impl Refresher {
    pub fn new(name: &'static str, period: Duration) -> Self {
        Self { name, period, inner: Rc::new(RefresherInner::default()) }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_running(&self) -> bool {
        self.inner.handle.borrow().is_some()
    }

    /// Number of ticks fired since creation.
    pub fn ticks(&self) -> u64 {
        self.inner.ticks.get()
    }

    /// Start (or restart) the timer. The first tick fires one period from now.
    pub fn start<F, Fut>(&self, task: F)
    where
        F: Fn() -> Fut + 'static,
        Fut: Future<Output = ()> + 'static,
    {
        self.stop();

        let (handle, registration) = AbortHandle::new_pair();
        let period = self.period;
        let name = self.name;
        let inner = Rc::downgrade(&self.inner);

        let ticker = async move {
            loop {
                runtime::sleep(period).await;
                match inner.upgrade() {
                    Some(state) => state.ticks.set(state.ticks.get() + 1),
                    None => break,
                }
                tracing::trace!(refresher = name, "tick");
                runtime::spawn_local(task());
            }
        };

        runtime::spawn_local(async move {
            let _ = Abortable::new(ticker, registration).await;
        });
        *self.inner.handle.borrow_mut() = Some(handle);
        tracing::debug!(refresher = self.name, period_ms = self.period.as_millis() as u64, "polling started");
    }

    pub fn stop(&self) {
        if let Some(handle) = self.inner.handle.borrow_mut().take() {
            handle.abort();
            tracing::debug!(refresher = self.name, "polling stopped");
        }
    }
}

impl std::fmt::Debug for Refresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Refresher")
            .field("name", &self.name)
            .field("period", &self.period)
            .field("running", &self.is_running())
            .finish()
    }
}
