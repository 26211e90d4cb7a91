//! Readiness gate and the warm-up task that drives it.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use common::ReadinessState;
use feature_detector::DetectorAdapter;
use tokio::task::JoinHandle;

const WARMING_UP: u8 = 0;
const READY: u8 = 1;
const FAILED: u8 = 2;

/// Process-wide readiness flag.
///
/// One writer (the warm-up task), many readers. Only the first transition
/// out of `WarmingUp` takes effect.
#[derive(Debug)]
pub struct ReadinessGate {
    state: AtomicU8,
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadinessGate {
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(WARMING_UP),
        }
    }

    pub fn status(&self) -> ReadinessState {
        match self.state.load(Ordering::Acquire) {
            READY => ReadinessState::Ready,
            FAILED => ReadinessState::Failed,
            _ => ReadinessState::WarmingUp,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state.load(Ordering::Acquire) == READY
    }

    /// Returns false if the gate had already left `WarmingUp`.
    pub fn mark_ready(&self) -> bool {
        self.transition(READY)
    }

    /// Returns false if the gate had already left `WarmingUp`.
    pub fn mark_failed(&self) -> bool {
        self.transition(FAILED)
    }

    fn transition(&self, to: u8) -> bool {
        self.state
            .compare_exchange(WARMING_UP, to, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }
}

/// Run the detector warm-up once in the background and record the outcome.
pub fn spawn_warmup(detector: Arc<DetectorAdapter>, gate: Arc<ReadinessGate>) -> JoinHandle<()> {
    tokio::spawn(async move {
        tracing::info!(detector = detector.detector_name(), "Warming up detector");
        match detector.warmup().await {
            Ok(()) => {
                gate.mark_ready();
                tracing::info!("Service ready");
            }
            Err(e) => {
                gate.mark_failed();
                tracing::error!(error = %e, "Detector warm-up failed; service will not accept images");
            }
        }
    })
}
