//! Minimum-dwell countdowns for gated screens.

use std::fmt;

/// Countdown that keeps a "Continue" action disabled for a minimum dwell time.
///
/// A gate belongs to exactly one screen. Leaving the screen cancels it: a
/// cancelled gate never opens and never runs its callback. Dropping the gate
/// has the same effect.
pub struct DwellGate {
    opens_at_ms: i64,
    cancelled: bool,
    on_open: Option<Box<dyn FnOnce()>>,
}

impl DwellGate {
    /// Arms a gate at `now_ms` that opens after `min_seconds`.
    pub fn arm(now_ms: i64, min_seconds: u32) -> Self {
        Self {
            opens_at_ms: now_ms + i64::from(min_seconds) * 1000,
            cancelled: false,
            on_open: None,
        }
    }

    /// Registers a callback run once, the first time [`DwellGate::poll`] sees the gate open.
    pub fn on_open(&mut self, callback: impl FnOnce() + 'static) {
        self.on_open = Some(Box::new(callback));
    }

    /// Whether the dwell time has elapsed and the gate is still live.
    pub fn is_open(&self, now_ms: i64) -> bool {
        !self.cancelled && now_ms >= self.opens_at_ms
    }

    /// Whole seconds left before the gate opens, rounded up.
    pub fn remaining_seconds(&self, now_ms: i64) -> u32 {
        if self.cancelled {
            return 0;
        }
        let remaining_ms = (self.opens_at_ms - now_ms).max(0);
        u32::try_from((remaining_ms + 999) / 1000).unwrap_or(u32::MAX)
    }

    /// Fires the registered callback if the gate has opened.
    pub fn poll(&mut self, now_ms: i64) -> bool {
        let open = self.is_open(now_ms);
        if open {
            if let Some(callback) = self.on_open.take() {
                callback();
            }
        }
        open
    }

    /// Disarms the gate and drops its callback.
    pub fn cancel(&mut self) {
        self.cancelled = true;
        self.on_open = None;
    }

    /// Whether [`DwellGate::cancel`] was called.
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

impl fmt::Debug for DwellGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DwellGate")
            .field("opens_at_ms", &self.opens_at_ms)
            .field("cancelled", &self.cancelled)
            .field("has_callback", &self.on_open.is_some())
            .finish()
    }
}
