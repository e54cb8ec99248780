//! FIFO admission control with slot transfer.
//!
//! A finished call hands its slot straight to the oldest waiter instead of
//! returning it to a pool, so newcomers can never overtake queued callers
//! and the number of admitted calls never exceeds the capacity.

use super::error::GatewayError;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tracing::debug;

#[derive(Debug)]
enum Grant {
    Admitted,
    Shutdown,
}

#[derive(Debug, Default)]
struct AdmissionState {
    active: usize,
    waiters: VecDeque<oneshot::Sender<Grant>>,
    open: bool,
}

impl AdmissionState {
    /// Drop entries whose callers went away before being served.
    fn prune_abandoned(&mut self) {
        self.waiters.retain(|waiter| !waiter.is_closed());
    }
}

/// Counting gate with a strict FIFO wait queue.
#[derive(Debug)]
pub struct Admission {
    gateway: String,
    capacity: usize,
    max_queue_depth: Option<usize>,
    state: Mutex<AdmissionState>,
}

impl Admission {
    /// Create a closed gate. Call [`Admission::open`] before acquiring.
    #[must_use]
    pub fn new(gateway: impl Into<String>, capacity: usize, max_queue_depth: Option<usize>) -> Self {
        Self {
            gateway: gateway.into(),
            capacity: capacity.max(1),
            max_queue_depth,
            state: Mutex::new(AdmissionState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, AdmissionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start accepting callers.
    pub fn open(&self) {
        self.state().open = true;
    }

    /// Stop accepting callers and reject everyone still waiting.
    ///
    /// Calls already admitted keep their slots. Returns the number of
    /// rejected waiters.
    pub fn close(&self) -> usize {
        let mut state = self.state();
        state.open = false;
        let mut rejected = 0;
        while let Some(waiter) = state.waiters.pop_front() {
            if waiter.send(Grant::Shutdown).is_ok() {
                rejected += 1;
            }
        }
        rejected
    }

    /// Calls currently holding a slot.
    #[must_use]
    pub fn active(&self) -> usize {
        self.state().active
    }

    /// Callers waiting for a slot.
    #[must_use]
    pub fn queued(&self) -> usize {
        let mut state = self.state();
        state.prune_abandoned();
        state.waiters.len()
    }

    /// Maximum number of simultaneously admitted calls.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Wait for a slot.
    ///
    /// Granted immediately while below capacity, otherwise queued behind
    /// earlier callers. Dropping the returned future while queued gives up
    /// the place in line without losing a slot.
    ///
    /// # Errors
    ///
    /// `NotRunning` if the gate is closed, `Overloaded` if the queue is at
    /// its bound, `ShutdownRejection` if the gate closes while waiting.
    pub async fn acquire(self: &Arc<Self>) -> Result<AdmissionPermit, GatewayError> {
        let rx = {
            let mut state = self.state();
            if !state.open {
                return Err(GatewayError::NotRunning {
                    gateway: self.gateway.clone(),
                });
            }
            if state.active < self.capacity {
                state.active += 1;
                return Ok(AdmissionPermit::new(Arc::clone(self)));
            }

            state.prune_abandoned();
            if let Some(limit) = self.max_queue_depth {
                if state.waiters.len() >= limit {
                    return Err(GatewayError::Overloaded {
                        gateway: self.gateway.clone(),
                        queued: state.waiters.len(),
                    });
                }
            }

            let (tx, rx) = oneshot::channel();
            state.waiters.push_back(tx);
            debug!(
                gateway = %self.gateway,
                active = state.active,
                queued = state.waiters.len(),
                "admission: request queued"
            );
            rx
        };

        let mut pending = PendingAdmission {
            admission: Arc::clone(self),
            rx: Some(rx),
        };
        match pending.wait().await {
            Some(Grant::Admitted) => Ok(AdmissionPermit::new(Arc::clone(self))),
            Some(Grant::Shutdown) | None => Err(GatewayError::ShutdownRejection {
                gateway: self.gateway.clone(),
            }),
        }
    }

    /// Hand the slot to the oldest live waiter, or free it.
    fn release(&self) {
        let mut state = self.state();
        while let Some(waiter) = state.waiters.pop_front() {
            if waiter.send(Grant::Admitted).is_ok() {
                debug!(
                    gateway = %self.gateway,
                    queued = state.waiters.len(),
                    "admission: slot transferred to next waiter"
                );
                return;
            }
        }
        state.active = state.active.saturating_sub(1);
    }
}

/// Queued caller. Returns a transferred slot if dropped before observing it.
struct PendingAdmission {
    admission: Arc<Admission>,
    rx: Option<oneshot::Receiver<Grant>>,
}

impl PendingAdmission {
    async fn wait(&mut self) -> Option<Grant> {
        let rx = self.rx.as_mut()?;
        let grant = rx.await.ok();
        self.rx = None;
        grant
    }
}

impl Drop for PendingAdmission {
    fn drop(&mut self) {
        if let Some(mut rx) = self.rx.take() {
            rx.close();
            if let Ok(Grant::Admitted) = rx.try_recv() {
                self.admission.release();
            }
        }
    }
}

/// An admitted slot. Released (or transferred) on drop.
#[must_use = "dropping the permit releases the slot immediately"]
#[derive(Debug)]
pub struct AdmissionPermit {
    admission: Arc<Admission>,
}

impl AdmissionPermit {
    fn new(admission: Arc<Admission>) -> Self {
        Self { admission }
    }
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        self.admission.release();
    }
}

#[cfg(test)]
mod tests {
    use super::Admission;
    use crate::gateway::GatewayError;
    use std::sync::Arc;
    use std::time::Duration;

    fn open_gate(capacity: usize, max_queue_depth: Option<usize>) -> Arc<Admission> {
        let gate = Arc::new(Admission::new("test", capacity, max_queue_depth));
        gate.open();
        gate
    }

    async fn wait_for_queue(gate: &Admission, len: usize) {
        while gate.queued() < len {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn closed_gate_rejects() {
        let gate = Arc::new(Admission::new("test", 1, None));
        let result = gate.acquire().await;
        assert!(matches!(result, Err(GatewayError::NotRunning { .. })));
    }

    #[tokio::test]
    async fn grants_immediately_below_capacity() {
        let gate = open_gate(2, None);
        let first = gate.acquire().await.expect("first slot");
        let second = gate.acquire().await.expect("second slot");
        assert_eq!(gate.active(), 2);
        drop(first);
        assert_eq!(gate.active(), 1);
        drop(second);
        assert_eq!(gate.active(), 0);
    }

    #[tokio::test]
    async fn slot_is_transferred_to_waiter() {
        let gate = open_gate(1, None);
        let held = gate.acquire().await.expect("slot");

        let waiter = tokio::spawn({
            let gate = Arc::clone(&gate);
            async move { gate.acquire().await.map(|_permit| ()) }
        });
        wait_for_queue(&gate, 1).await;

        drop(held);
        assert_eq!(gate.active(), 1, "slot must move, not free");
        let result = waiter.await.expect("waiter task");
        assert!(result.is_ok());
        assert_eq!(gate.active(), 0);
    }

    #[tokio::test]
    async fn close_rejects_waiters() {
        let gate = open_gate(1, None);
        let _held = gate.acquire().await.expect("slot");

        let waiter = tokio::spawn({
            let gate = Arc::clone(&gate);
            async move { gate.acquire().await.map(|_permit| ()) }
        });
        wait_for_queue(&gate, 1).await;

        assert_eq!(gate.close(), 1);
        let result = waiter.await.expect("waiter task");
        assert!(matches!(result, Err(GatewayError::ShutdownRejection { .. })));
        assert_eq!(gate.queued(), 0);
    }

    #[tokio::test]
    async fn abandoned_waiter_does_not_leak_slot() {
        let gate = open_gate(1, None);
        let held = gate.acquire().await.expect("slot");

        let abandoned = tokio::time::timeout(Duration::from_millis(20), gate.acquire()).await;
        assert!(abandoned.is_err(), "acquire should still be pending");
        assert_eq!(gate.queued(), 0);

        drop(held);
        assert_eq!(gate.active(), 0);
        let _again = gate.acquire().await.expect("slot after abandon");
        assert_eq!(gate.active(), 1);
    }

    #[tokio::test]
    async fn bounded_queue_overloads() {
        let gate = open_gate(1, Some(1));
        let _held = gate.acquire().await.expect("slot");

        let _waiter = tokio::spawn({
            let gate = Arc::clone(&gate);
            async move { gate.acquire().await.map(|_permit| ()) }
        });
        wait_for_queue(&gate, 1).await;

        let result = gate.acquire().await;
        assert!(matches!(
            result,
            Err(GatewayError::Overloaded { queued: 1, .. })
        ));
    }
}
