//! Bounded, cancellable waits for declared think delays.
//!
//! The decision core only declares how long a move should appear to take.
//! Whoever submits the move waits on a `DelayGate`, which a game-end handler
//! can cancel from another thread.

use std::sync::{Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Longest wait the gate will ever perform for a single move.
pub const MAX_THINK_DELAY: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelayOutcome {
    Elapsed,
    Cancelled,
}

#[derive(Debug, Default)]
pub struct DelayGate {
    cancelled: Mutex<bool>,
    condvar: Condvar,
}

impl DelayGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block for `delay` (capped at [`MAX_THINK_DELAY`]) or until cancelled.
    pub fn wait(&self, delay: Duration) -> DelayOutcome {
        let delay = delay.min(MAX_THINK_DELAY);
        let started = Instant::now();
        let guard = self.cancelled.lock().unwrap_or_else(PoisonError::into_inner);
        let (guard, _timeout) = self
            .condvar
            .wait_timeout_while(guard, delay, |cancelled| !*cancelled)
            .unwrap_or_else(PoisonError::into_inner);

        if *guard {
            log::debug!("think delay cancelled after {:?}", started.elapsed());
            DelayOutcome::Cancelled
        } else {
            DelayOutcome::Elapsed
        }
    }

    /// Wake every waiter; later waits return immediately until `reset`.
    pub fn cancel(&self) {
        *self.cancelled.lock().unwrap_or_else(PoisonError::into_inner) = true;
        self.condvar.notify_all();
    }

    pub fn reset(&self) {
        *self.cancelled.lock().unwrap_or_else(PoisonError::into_inner) = false;
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn short_wait_elapses() {
        let gate = DelayGate::new();
        let started = Instant::now();
        assert_eq!(gate.wait(Duration::from_millis(20)), DelayOutcome::Elapsed);
        assert!(started.elapsed() >= Duration::from_millis(20));
    }

    #[test]
    fn cancel_wakes_a_long_wait() {
        let gate = Arc::new(DelayGate::new());
        let waiter = {
            let gate = Arc::clone(&gate);
            thread::spawn(move || gate.wait(Duration::from_secs(30)))
        };
        thread::sleep(Duration::from_millis(20));
        let started = Instant::now();
        gate.cancel();
        let outcome = waiter.join().expect("waiter thread");
        assert_eq!(outcome, DelayOutcome::Cancelled);
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn reset_rearms_the_gate() {
        let gate = DelayGate::new();
        gate.cancel();
        assert_eq!(gate.wait(Duration::from_secs(10)), DelayOutcome::Cancelled);
        gate.reset();
        assert!(!gate.is_cancelled());
        assert_eq!(gate.wait(Duration::ZERO), DelayOutcome::Elapsed);
    }
}
