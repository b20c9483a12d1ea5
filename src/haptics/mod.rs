//! Haptic feedback for phase changes.
//!
//! Vibration is fire-and-forget: the session never waits for it and never
//! learns whether it worked.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tracing::debug;

/// Trait for haptic feedback implementations.
pub trait Haptics: Send + Sync {
    /// Vibrates for `duration`.
    fn vibrate(&self, duration: Duration);
}

/// Haptics for a terminal: rings the terminal bell.
#[derive(Debug, Default)]
pub struct TerminalHaptics {
    enabled: bool,
}

impl TerminalHaptics {
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl Haptics for TerminalHaptics {
    fn vibrate(&self, duration: Duration) {
        debug!("Vibrate for {}ms", duration.as_millis());
        if !self.enabled {
            return;
        }

        let mut stderr = std::io::stderr();
        if let Err(e) = stderr.write_all(b"\x07").and_then(|()| stderr.flush()) {
            debug!("Terminal bell failed: {}", e);
        }
    }
}

/// Mock haptics for testing.
#[derive(Debug, Default)]
pub struct MockHaptics {
    vibrations: Mutex<Vec<Duration>>,
    muted: AtomicBool,
}

impl MockHaptics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every vibration requested so far.
    #[must_use]
    pub fn vibrations(&self) -> Vec<Duration> {
        self.vibrations.lock().unwrap().clone()
    }

    #[must_use]
    pub fn vibration_count(&self) -> usize {
        self.vibrations.lock().unwrap().len()
    }

    /// Stops recording, as a device without a vibrator would.
    pub fn set_muted(&self, muted: bool) {
        self.muted.store(muted, Ordering::SeqCst);
    }
}

impl Haptics for MockHaptics {
    fn vibrate(&self, duration: Duration) {
        if self.muted.load(Ordering::SeqCst) {
            return;
        }
        self.vibrations.lock().unwrap().push(duration);
    }
}
