use std::mem;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::trace;

use crate::response::Response;

enum Slot {
    Empty,
    Ready(Response),
    Taken,
}

/// Single-slot holder for "the response, once available".
///
/// Only the first [`PendingCall::fill`] is stored; the slot never reopens,
/// even after the response has been taken.
pub struct PendingCall {
    slot: Mutex<Slot>,
    ready: Condvar,
}

impl PendingCall {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot::Empty),
            ready: Condvar::new(),
        }
    }

    /// Store `response` and wake waiters. Returns `false` if the slot was
    /// already filled.
    pub fn fill(&self, response: Response) -> bool {
        let mut slot = self.slot.lock();
        if !matches!(*slot, Slot::Empty) {
            return false;
        }
        *slot = Slot::Ready(response);
        self.ready.notify_all();
        true
    }

    /// Take the response if it has arrived
    pub fn try_take(&self) -> Option<Response> {
        let mut slot = self.slot.lock();
        Self::take_ready(&mut slot)
    }

    /// Block until the response arrives.
    ///
    /// Each wait lasts at most `poll_interval` before the slot is re-checked.
    /// Returns `None` once `deadline` has elapsed without a response.
    pub fn wait(&self, poll_interval: Duration, deadline: Option<Duration>) -> Option<Response> {
        let started = Instant::now();
        let mut slot = self.slot.lock();
        loop {
            if let Some(response) = Self::take_ready(&mut slot) {
                return Some(response);
            }

            let timeout = match deadline {
                Some(deadline) => {
                    let remaining = deadline.checked_sub(started.elapsed())?;
                    if remaining.is_zero() {
                        return None;
                    }
                    poll_interval.min(remaining)
                }
                None => poll_interval,
            };

            if self.ready.wait_for(&mut slot, timeout).timed_out() {
                trace!("pending call still empty after {:?}", timeout);
            }
        }
    }

    fn take_ready(slot: &mut Slot) -> Option<Response> {
        match mem::replace(slot, Slot::Taken) {
            Slot::Ready(response) => Some(response),
            other => {
                *slot = other;
                None
            }
        }
    }
}

impl Default for PendingCall {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RequestId;
    use serde_json::json;
    use std::sync::Arc;
    use std::thread;

    fn response(n: i64) -> Response {
        Response::success(RequestId::Number(n), json!(n))
    }

    #[test]
    fn test_first_fill_wins() {
        let pending = PendingCall::new();
        assert!(pending.fill(response(1)));
        assert!(!pending.fill(response(2)));

        assert_eq!(pending.try_take(), Some(response(1)));
        assert_eq!(pending.try_take(), None);
        assert!(!pending.fill(response(3)));
    }

    #[test]
    fn test_wait_returns_response_filled_from_other_thread() {
        let pending = Arc::new(PendingCall::new());
        let filler = Arc::clone(&pending);

        let worker = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            filler.fill(response(7))
        });

        let got = pending.wait(Duration::from_millis(5), Some(Duration::from_secs(5)));
        assert_eq!(got, Some(response(7)));
        assert!(worker.join().unwrap());
    }

    #[test]
    fn test_wait_times_out() {
        let pending = PendingCall::new();
        let started = Instant::now();

        let got = pending.wait(Duration::from_millis(10), Some(Duration::from_millis(50)));
        assert!(got.is_none());
        assert!(started.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_wait_without_deadline_sees_early_fill() {
        let pending = PendingCall::new();
        pending.fill(response(4));

        assert_eq!(pending.wait(Duration::from_millis(10), None), Some(response(4)));
    }
}
