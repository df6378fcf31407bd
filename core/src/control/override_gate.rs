//! Manual/automatic arbitration for the camera.
//!
//! Any operator input arms the gate for a fixed window. While armed the
//! ingestion loop keeps broadcasting but stops aiming the camera. A single
//! expiry timer is outstanding at any time: re-arming aborts the pending timer
//! and schedules a fresh one under the same lock, and each timer carries a
//! generation number so a timer that already woke up cannot clear a newer arm.

use std::sync::{Arc, Weak};
use std::time::Duration;

use log::{debug, info};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMode {
    Automatic,
    Manual { expires_at: Instant },
}

struct GateState {
    mode: ControlMode,
    generation: u64,
    timer: Option<JoinHandle<()>>,
}

struct GateInner {
    timeout: Duration,
    state: Mutex<GateState>,
}

#[derive(Clone)]
pub struct OverrideGate {
    inner: Arc<GateInner>,
}

impl OverrideGate {
    pub fn new(timeout: Duration) -> Self {
        Self {
            inner: Arc::new(GateInner {
                timeout,
                state: Mutex::new(GateState {
                    mode: ControlMode::Automatic,
                    generation: 0,
                    timer: None,
                }),
            }),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }

    /// Enters (or stays in) manual mode until `now + timeout`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn arm(&self) -> Instant {
        let timeout = self.inner.timeout;
        let expires_at = Instant::now() + timeout;
        let weak = Arc::downgrade(&self.inner);

        let mut state = self.inner.state.lock();
        if let Some(previous) = state.timer.take() {
            previous.abort();
        }
        state.generation += 1;
        let generation = state.generation;
        if state.mode == ControlMode::Automatic {
            info!("manual control engaged, automatic aiming paused for {:?}", timeout);
        } else {
            debug!("manual control renewed for {:?}", timeout);
        }
        state.mode = ControlMode::Manual { expires_at };
        state.timer = Some(tokio::spawn(expire_after(weak, timeout, generation)));
        expires_at
    }

    pub fn is_manual_active(&self) -> bool {
        match self.inner.state.lock().mode {
            ControlMode::Automatic => false,
            ControlMode::Manual { expires_at } => Instant::now() < expires_at,
        }
    }

    pub fn mode(&self) -> ControlMode {
        self.inner.state.lock().mode
    }

    /// Time left in manual mode, `None` when automatic.
    pub fn remaining(&self) -> Option<Duration> {
        match self.mode() {
            ControlMode::Automatic => None,
            ControlMode::Manual { expires_at } => {
                Some(expires_at.saturating_duration_since(Instant::now()))
            }
        }
    }

    /// Cancels any pending expiry timer and returns to automatic.
    pub fn shutdown(&self) {
        let mut state = self.inner.state.lock();
        if let Some(timer) = state.timer.take() {
            timer.abort();
            debug!("manual override timer cancelled");
        }
        state.generation += 1;
        state.mode = ControlMode::Automatic;
    }
}

async fn expire_after(gate: Weak<GateInner>, timeout: Duration, generation: u64) {
    tokio::time::sleep(timeout).await;
    let Some(inner) = gate.upgrade() else { return };
    let mut state = inner.state.lock();
    if state.generation == generation {
        state.mode = ControlMode::Automatic;
        state.timer = None;
        info!("no manual input for {:?}, automatic aiming resumed", timeout);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test(start_paused = true)]
    async fn starts_automatic() {
        let gate = OverrideGate::new(Duration::from_secs(15));
        assert!(!gate.is_manual_active());
        assert_eq!(gate.remaining(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn stays_manual_until_timeout() {
        let gate = OverrideGate::new(Duration::from_secs(15));
        gate.arm();
        sleep(Duration::from_secs(14)).await;
        assert!(gate.is_manual_active());
        sleep(Duration::from_secs(2)).await;
        assert!(!gate.is_manual_active());
        assert_eq!(gate.mode(), ControlMode::Automatic);
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_resets_countdown() {
        let gate = OverrideGate::new(Duration::from_secs(15));
        gate.arm();
        sleep(Duration::from_secs(10)).await;
        gate.arm();

        // Past the first deadline, inside the second.
        sleep(Duration::from_secs(10)).await;
        assert!(gate.is_manual_active());
        let remaining = gate.remaining().unwrap();
        assert_eq!(remaining, Duration::from_secs(5));

        sleep(Duration::from_secs(6)).await;
        assert!(!gate.is_manual_active());
    }

    #[tokio::test(start_paused = true)]
    async fn only_one_timer_is_pending() {
        let gate = OverrideGate::new(Duration::from_secs(15));
        for _ in 0..5 {
            gate.arm();
            sleep(Duration::from_secs(3)).await;
        }
        assert!(gate.is_manual_active());
        sleep(Duration::from_secs(13)).await;
        assert!(!gate.is_manual_active());
        assert!(gate.inner.state.lock().timer.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_pending_timer() {
        let gate = OverrideGate::new(Duration::from_secs(15));
        gate.arm();
        gate.shutdown();
        assert!(!gate.is_manual_active());
        assert!(gate.inner.state.lock().timer.is_none());
    }
}
