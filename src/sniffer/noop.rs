//! Non-macOS (noop) capture adapter.
//!
//! This exists so the crate (and binary) can compile on other targets
//! without pulling in the AppKit/CoreGraphics dependencies. It captures
//! nothing and idles until cancelled.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::warn;

use crate::lifecycle::LifecycleController;
use crate::sniffer::types::Hooks;
use crate::sniffer::{CancelHandle, SnifferConfig, SnifferError};

/// A sniffer that never observes events.
pub struct NoopSniffer {
    _config: SnifferConfig,
    hooks: Hooks,
    cancel: CancelHandle,
    _lifecycle: Arc<LifecycleController>,
}

impl NoopSniffer {
    pub fn new(
        config: SnifferConfig,
        cancel: CancelHandle,
        lifecycle: Arc<LifecycleController>,
    ) -> Self {
        Self {
            _config: config,
            hooks: Hooks::default(),
            cancel,
            _lifecycle: lifecycle,
        }
    }

    /// The hook slots; replace them before calling [`NoopSniffer::run`].
    pub fn hooks_mut(&mut self) -> &mut Hooks {
        &mut self.hooks
    }

    /// Handle for stopping the loop from another thread.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Stop the loop. Idempotent; safe before `run()` has started.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Block until cancelled. No events are ever delivered on this platform.
    pub fn run(&mut self) -> Result<(), SnifferError> {
        warn!("global event capture is not supported on this platform; idling");
        while !self.cancel.is_cancelled() {
            thread::sleep(Duration::from_millis(100));
        }
        Ok(())
    }
}

/// There is no input-monitoring permission gate on this platform.
pub fn check_permission() -> bool {
    true
}
