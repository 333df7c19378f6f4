//! Cooperative stop signal shared by every worker loop.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};

#[derive(Default)]
struct Inner {
    raised: Mutex<bool>,
    cond: Condvar,
}

/// One-shot flag raised by the supervisor and polled by the workers.
///
/// Besides polling, loops that need to sleep (reconnect backoff) wait on the
/// signal so a stop interrupts the sleep immediately.
#[derive(Clone, Default)]
pub struct StopSignal {
    inner: Arc<Inner>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raises the signal and wakes every waiter. Idempotent.
    pub fn raise(&self) {
        let mut raised = self.inner.raised.lock();
        *raised = true;
        self.inner.cond.notify_all();
    }

    #[inline]
    pub fn is_raised(&self) -> bool {
        *self.inner.raised.lock()
    }

    /// Sleeps for `timeout` unless the signal is raised first.
    ///
    /// Returns `true` if the signal is raised.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut raised = self.inner.raised.lock();
        while !*raised {
            if self.inner.cond.wait_until(&mut raised, deadline).timed_out() {
                break;
            }
        }
        *raised
    }
}

impl std::fmt::Debug for StopSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StopSignal")
            .field("raised", &self.is_raised())
            .finish()
    }
}
