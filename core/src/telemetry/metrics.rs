use serde::Serialize;
use std::sync::Mutex;

pub struct MetricsRecorder {
    inner: Mutex<Metrics>,
}

#[derive(Default)]
struct Metrics {
    frames_processed: u64,
    frames_malformed: u64,
    commands_dispatched: u64,
    commands_suppressed: u64,
    actuator_failures: u64,
    observers_dropped: u64,
    reconnects: u64,
}

/// Point-in-time copy of the pipeline counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub frames_processed: u64,
    pub frames_malformed: u64,
    pub commands_dispatched: u64,
    pub commands_suppressed: u64,
    pub actuator_failures: u64,
    pub observers_dropped: u64,
    pub reconnects: u64,
}

impl MetricsRecorder {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Metrics::default()),
        }
    }

    fn update(&self, apply: impl FnOnce(&mut Metrics)) {
        if let Ok(mut metrics) = self.inner.lock() {
            apply(&mut metrics);
        }
    }

    pub fn record_processed(&self) {
        self.update(|m| m.frames_processed += 1);
    }

    pub fn record_malformed(&self) {
        self.update(|m| m.frames_malformed += 1);
    }

    pub fn record_dispatched(&self) {
        self.update(|m| m.commands_dispatched += 1);
    }

    pub fn record_suppressed(&self) {
        self.update(|m| m.commands_suppressed += 1);
    }

    pub fn record_actuator_failure(&self) {
        self.update(|m| m.actuator_failures += 1);
    }

    pub fn record_observers_dropped(&self, count: usize) {
        self.update(|m| m.observers_dropped += count as u64);
    }

    pub fn record_reconnect(&self) {
        self.update(|m| m.reconnects += 1);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        if let Ok(m) = self.inner.lock() {
            MetricsSnapshot {
                frames_processed: m.frames_processed,
                frames_malformed: m.frames_malformed,
                commands_dispatched: m.commands_dispatched,
                commands_suppressed: m.commands_suppressed,
                actuator_failures: m.actuator_failures,
                observers_dropped: m.observers_dropped,
                reconnects: m.reconnects,
            }
        } else {
            MetricsSnapshot::default()
        }
    }
}

impl Default for MetricsRecorder {
    fn default() -> Self {
        Self::new()
    }
}
