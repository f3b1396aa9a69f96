//! Activity Sniffer - desktop interaction capture with window context.
//!
//! This library observes a user's interaction with the desktop — keystrokes,
//! mouse clicks, scrolls and movement, plus the identity and geometry of the
//! foreground window — and streams them as discrete, normalized events to
//! registered consumer hooks. What consumers do with the stream (persist it,
//! aggregate it, forward it) is their business; the engine's job is to never
//! lose an event, never block the input path, and shut down cleanly.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       Activity Sniffer                       │
//! ├──────────────────────────────────────────────────────────────┤
//! │  ┌──────────┐   ┌──────────┐   ┌───────────┐   ┌──────────┐  │
//! │  │  OS      │──▶│  Engine  │──▶│ Keymap /  │──▶│ Consumer │  │
//! │  │ adapter  │   │ (loop)   │   │ Resolver  │   │  hooks   │  │
//! │  └──────────┘   └──────────┘   └───────────┘   └──────────┘  │
//! │       │                                                      │
//! │       ▼                                                      │
//! │  ┌───────────┐      signals / power notifications            │
//! │  │ Lifecycle │◀─────────────────────────────────             │
//! │  └───────────┘                                               │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use activity_sniffer::{
//!     CancelHandle, Config, FileLock, LifecycleController, Sniffer, SnifferConfig,
//! };
//!
//! let config = Config::default();
//! let cancel = CancelHandle::new();
//! let lock = FileLock::new(config.lock_path());
//! let lifecycle = Arc::new(LifecycleController::new(Box::new(lock), cancel.clone()));
//!
//! let mut sniffer = Sniffer::new(SnifferConfig::default(), cancel, lifecycle);
//! sniffer.hooks_mut().key_hook = Box::new(|key| println!("{}", key.symbol));
//!
//! // Blocks until cancelled (must run on the main thread on macOS).
//! sniffer.run().expect("capture loop failed");
//! ```

pub mod config;
pub mod lifecycle;
pub mod lock;
pub mod sniffer;

// Re-export key types at crate root for convenience
pub use config::{Config, ConfigError, SourceConfig};
pub use lifecycle::LifecycleController;
pub use lock::{FileLock, InstanceLock, LockError};
pub use sniffer::{
    check_permission, CancelHandle, Hooks, KeyEvent, Modifier, Sniffer, SnifferConfig,
    SnifferError, WindowContext,
};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
