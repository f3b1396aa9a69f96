//! Process lifecycle: signals, power-state notifications, shutdown.
//!
//! The controller owns the single-instance lock handle and the cancellation
//! latch of the capture loop, and turns OS notifications and process signals
//! into the right combination of "release the lock", "stop the loop" and
//! "exit". All state it needs is passed in at construction; the platform
//! adapter forwards notifications into the entry points below.
//!
//! Termination policy: window-close-driven termination requests are always
//! vetoed. Real termination arrives as an interrupt or terminate signal,
//! which releases the lock, stops the loop, and hard-exits with a non-zero
//! status — the event-loop runtime does not reliably unwind otherwise. The
//! lock release that precedes the exit is the only cleanup that path runs.

use std::sync::Arc;

use tracing::{debug, info};

use crate::lock::InstanceLock;
use crate::sniffer::CancelHandle;

/// Callable invoked on wake to let the surrounding application re-anchor on
/// whatever is now foregrounded.
pub type StartCurrentProcess = Box<dyn Fn() + Send + Sync>;

pub struct LifecycleController {
    lock: Box<dyn InstanceLock>,
    cancel: CancelHandle,
    start_current_process: StartCurrentProcess,
}

impl LifecycleController {
    pub fn new(lock: Box<dyn InstanceLock>, cancel: CancelHandle) -> Self {
        Self {
            lock,
            cancel,
            start_current_process: Box::new(|| {}),
        }
    }

    /// Install the wake re-anchor callable. Expected before `run()`.
    pub fn set_start_current_process(&mut self, hook: StartCurrentProcess) {
        self.start_current_process = hook;
    }

    /// Install handlers for interrupt and terminate signals.
    ///
    /// The handler releases the lock, stops the loop, then exits the process
    /// with status 1.
    pub fn install_signal_handlers(self: &Arc<Self>) -> Result<(), ctrlc::Error> {
        let controller = Arc::clone(self);
        ctrlc::set_handler(move || {
            debug!("got termination signal");
            controller.handle_termination_signal();
            std::process::exit(1);
        })
    }

    /// Signal-path shutdown: release the lock and stop the capture loop.
    ///
    /// Kept separate from the process exit so the sequence is observable in
    /// tests.
    pub fn handle_termination_signal(&self) {
        self.release_lock();
        self.cancel.cancel();
    }

    /// Release the single-instance lock if it is still held.
    ///
    /// Called on every exit path, often more than once; only the first call
    /// after an acquire has an effect.
    pub fn release_lock(&self) {
        if self.lock.is_locked() {
            self.lock.release();
            info!("released instance lock");
        }
    }

    /// System is about to sleep. Informational only.
    pub fn on_sleep(&self) {
        info!("received sleep");
    }

    /// System woke up; re-anchor on the now-foregrounded process.
    pub fn on_wake(&self) {
        info!("received wake");
        (self.start_current_process)();
    }

    /// Screens went to sleep. Informational only.
    pub fn on_screens_sleep(&self) {
        info!("received screen sleep");
    }

    /// Screens woke up; re-anchor on the now-foregrounded process.
    pub fn on_screens_wake(&self) {
        info!("received screen wake");
        (self.start_current_process)();
    }

    /// The system is powering off.
    ///
    /// Treated as a termination request, which we veto here and leave to the
    /// OS to escalate into a real terminate signal. The loop keeps running.
    pub fn on_power_off(&self) {
        info!("received power off");
        self.should_terminate();
    }

    /// Answer to "should the application terminate?" — always no.
    ///
    /// This fires on window-close too, not just real shutdown; signal
    /// handling owns actual termination.
    pub fn should_terminate(&self) -> bool {
        info!("termination requested, deferring to signal handling");
        false
    }

    /// The process is about to lose foreground status and may be torn down
    /// without running normal shutdown code. Release the lock eagerly.
    pub fn on_will_resign_active(&self) {
        info!("received will resign active");
        self.release_lock();
    }

    /// Last guaranteed callback before the process image is gone.
    pub fn on_will_terminate(&self) {
        info!("received will terminate");
        self.release_lock();
    }
}

impl std::fmt::Debug for LifecycleController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LifecycleController")
            .field("locked", &self.lock.is_locked())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
