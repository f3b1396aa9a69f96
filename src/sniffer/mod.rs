//! Event capture and window resolution.
//!
//! This module provides the platform-specific capture adapters plus the
//! platform-neutral engine, translator and resolver they share.

pub mod engine;
pub mod keymap;
pub mod types;
pub mod window;

#[cfg(target_os = "macos")]
pub mod macos;

#[cfg(not(target_os = "macos"))]
pub mod noop;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

// Re-export commonly used types
pub use engine::{Engine, FORCE_SCREEN_CHANGE, WAIT_ANIMATION};
pub use types::{Hooks, KeyEvent, Location, Modifier, RawEvent, RawEventKind, WindowContext};
pub use window::{resolve, WindowQuery, WindowRecord};

#[cfg(target_os = "macos")]
pub use macos::{check_permission, MacSniffer};

/// Platform-agnostic sniffer type alias
#[cfg(target_os = "macos")]
pub type Sniffer = MacSniffer;

#[cfg(not(target_os = "macos"))]
pub use noop::{check_permission, NoopSniffer};

/// Platform-agnostic sniffer type alias
#[cfg(not(target_os = "macos"))]
pub type Sniffer = NoopSniffer;

/// Which event sources the global monitor subscribes to.
#[derive(Debug, Clone)]
pub struct SnifferConfig {
    pub capture_keyboard: bool,
    pub capture_mouse: bool,
}

impl Default for SnifferConfig {
    fn default() -> Self {
        Self {
            capture_keyboard: true,
            capture_mouse: true,
        }
    }
}

/// One-way cancellation latch for the capture loop.
///
/// Cloned handles share the same latch. Cancelling is idempotent and safe at
/// any time: before `run()`, during it, after it, and from other threads
/// (signal delivery is asynchronous by nature).
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Errors that can occur while running the capture loop.
#[derive(Debug)]
pub enum SnifferError {
    /// The run loop and global monitor must live on the main thread
    NotMainThread,
    /// The OS refused the global monitor (usually missing permission)
    MonitorInstallFailed,
    /// The per-event handler failed; the loop was stopped rather than retried
    Handler(String),
}

impl std::fmt::Display for SnifferError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SnifferError::NotMainThread => {
                write!(f, "capture loop must run on the main thread")
            }
            SnifferError::MonitorInstallFailed => {
                write!(f, "failed to install global event monitor")
            }
            SnifferError::Handler(msg) => write!(f, "event handler failed: {msg}"),
        }
    }
}

impl std::error::Error for SnifferError {}
