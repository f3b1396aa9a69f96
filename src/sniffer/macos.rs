//! macOS capture adapter: NSEvent global monitor + CGWindow list.
//!
//! All platform translation lives here. Raw AppKit events become
//! [`RawEvent`]s at the monitor boundary and are fed synchronously into the
//! platform-neutral [`Engine`]; workspace notifications are forwarded into
//! the [`LifecycleController`]. Requires Input Monitoring permission.
//!
//! The loop runs on the main thread: AppKit delivers global-monitor events
//! and workspace notifications there.

use std::cell::RefCell;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use block2::StackBlock;
use core_foundation::array::{CFArray, CFArrayRef};
use core_foundation::base::TCFType;
use core_foundation::dictionary::CFDictionary;
use core_foundation::number::CFNumber;
use core_foundation::runloop::{kCFRunLoopCommonModes, CFRunLoop};
use core_foundation::string::CFString;
use objc2::rc::Retained;
use objc2::runtime::AnyObject;
use objc2::{class, msg_send, MainThreadMarker};
use objc2_app_kit::{NSApplication, NSApplicationActivationPolicy, NSEvent, NSWorkspace};
use objc2_foundation::{NSNotification, NSNotificationCenter, NSObject, NSPoint, NSString};
use tracing::info;

use crate::lifecycle::LifecycleController;
use crate::sniffer::engine::Engine;
use crate::sniffer::types::{Hooks, Location, RawEvent, RawEventKind};
use crate::sniffer::window::{WindowQuery, WindowRecord};
use crate::sniffer::{CancelHandle, SnifferConfig, SnifferError};

type CFAny = core_foundation::base::CFType;

#[link(name = "CoreGraphics", kind = "framework")]
extern "C" {
    fn CGWindowListCopyWindowInfo(option: u32, relative_to_window: u32) -> CFArrayRef;
}

#[link(name = "ApplicationServices", kind = "framework")]
extern "C" {
    fn CGPreflightListenEventAccess() -> bool;
}

// CGWindow list options
#[allow(non_upper_case_globals)]
const kCGWindowListOptionOnScreenOnly: u32 = 1 << 0;
#[allow(non_upper_case_globals)]
const kCGWindowListExcludeDesktopElements: u32 = 1 << 4;

// NSEventType values; the monitor mask is 1 << type.
const NSEVENT_TYPE_LEFT_MOUSE_DOWN: usize = 1;
const NSEVENT_TYPE_LEFT_MOUSE_UP: usize = 2;
const NSEVENT_TYPE_RIGHT_MOUSE_DOWN: usize = 3;
const NSEVENT_TYPE_RIGHT_MOUSE_UP: usize = 4;
const NSEVENT_TYPE_MOUSE_MOVED: usize = 5;
const NSEVENT_TYPE_KEY_DOWN: usize = 10;
const NSEVENT_TYPE_KEY_UP: usize = 11;
const NSEVENT_TYPE_FLAGS_CHANGED: usize = 12;
const NSEVENT_TYPE_SCROLL_WHEEL: usize = 22;

// Workspace notification names
const WORKSPACE_WILL_SLEEP: &str = "NSWorkspaceWillSleepNotification";
const WORKSPACE_DID_WAKE: &str = "NSWorkspaceDidWakeNotification";
const WORKSPACE_WILL_POWER_OFF: &str = "NSWorkspaceWillPowerOffNotification";
const WORKSPACE_SCREENS_DID_SLEEP: &str = "NSWorkspaceScreensDidSleepNotification";
const WORKSPACE_SCREENS_DID_WAKE: &str = "NSWorkspaceScreensDidWakeNotification";

// Application notifications are posted on the default center.
const APP_WILL_RESIGN_ACTIVE: &str = "NSApplicationWillResignActiveNotification";
const APP_WILL_TERMINATE: &str = "NSApplicationWillTerminateNotification";

/// Check whether the process may observe global input events.
pub fn check_permission() -> bool {
    unsafe { CGPreflightListenEventAccess() }
}

/// Activation state and window enumeration backed by AppKit + CGWindow.
struct MacWindowQuery;

impl WindowQuery for MacWindowQuery {
    fn active_application(&self) -> Option<String> {
        let workspace = unsafe { NSWorkspace::sharedWorkspace() };
        let apps = unsafe { workspace.runningApplications() };
        for app in apps.iter() {
            // Only one application can be active at a time.
            if unsafe { app.isActive() } {
                return unsafe { app.localizedName() }.map(|name| name.to_string());
            }
        }
        None
    }

    fn list_windows(&self) -> Vec<WindowRecord> {
        let mut records = Vec::new();
        unsafe {
            let options = kCGWindowListOptionOnScreenOnly | kCGWindowListExcludeDesktopElements;
            let list_ptr = CGWindowListCopyWindowInfo(options, 0);
            if list_ptr.is_null() {
                return records;
            }
            let list: CFArray<CFDictionary<CFString, CFAny>> =
                CFArray::wrap_under_create_rule(list_ptr as *const _);

            for i in 0..list.len() {
                let Some(dict) = list.get(i) else { continue };

                let owner_name = match dict
                    .find(&CFString::from_static_string("kCGWindowOwnerName"))
                    .and_then(|v| v.downcast::<CFString>())
                {
                    Some(name) => name.to_string(),
                    None => continue,
                };

                // Absent title key means the window publishes no name.
                let title = dict
                    .find(&CFString::from_static_string("kCGWindowName"))
                    .and_then(|v| v.downcast::<CFString>())
                    .map(|s| s.to_string())
                    .unwrap_or_default();

                let layer = dict
                    .find(&CFString::from_static_string("kCGWindowLayer"))
                    .and_then(|v| v.downcast::<CFNumber>())
                    .and_then(|n| n.to_i32())
                    .unwrap_or(0);

                let (x, y, width, height) = dict
                    .find(&CFString::from_static_string("kCGWindowBounds"))
                    .and_then(|v| v.downcast::<CFDictionary<CFString, CFAny>>())
                    .map(|bounds| {
                        let field = |key: &'static str| {
                            bounds
                                .find(&CFString::from_static_string(key))
                                .and_then(|n| n.downcast::<CFNumber>())
                                .and_then(|n| n.to_f64())
                                .unwrap_or(0.0)
                        };
                        (field("X"), field("Y"), field("Width"), field("Height"))
                    })
                    .unwrap_or((0.0, 0.0, 0.0, 0.0));

                records.push(WindowRecord {
                    owner_name,
                    title,
                    layer,
                    x,
                    y,
                    width,
                    height,
                });
            }
        }
        records
    }
}

/// Translate one AppKit event into the neutral model.
///
/// Returns `None` for event types outside the subscribed mask.
unsafe fn translate_event(event: &NSEvent) -> Option<RawEvent> {
    let loc: NSPoint = msg_send![class!(NSEvent), mouseLocation];
    let location = Location { x: loc.x, y: loc.y };

    let ty: usize = msg_send![event, r#type];
    let kind = match ty {
        NSEVENT_TYPE_KEY_DOWN => {
            let keycode: u16 = msg_send![event, keyCode];
            let flags: usize = msg_send![event, modifierFlags];
            let chars: Option<Retained<NSString>> = msg_send![event, charactersIgnoringModifiers];
            let is_repeat: bool = msg_send![event, isARepeat];
            RawEventKind::KeyDown {
                keycode,
                flags: flags as u64,
                character: chars.map(|s| s.to_string()).unwrap_or_default(),
                is_repeat,
            }
        }
        NSEVENT_TYPE_KEY_UP => RawEventKind::KeyUp,
        NSEVENT_TYPE_FLAGS_CHANGED => RawEventKind::FlagsChanged,
        NSEVENT_TYPE_LEFT_MOUSE_DOWN => RawEventKind::LeftMouseDown,
        NSEVENT_TYPE_LEFT_MOUSE_UP => RawEventKind::LeftMouseUp,
        NSEVENT_TYPE_RIGHT_MOUSE_DOWN => RawEventKind::RightMouseDown,
        NSEVENT_TYPE_RIGHT_MOUSE_UP => RawEventKind::RightMouseUp,
        NSEVENT_TYPE_MOUSE_MOVED => RawEventKind::MouseMoved,
        NSEVENT_TYPE_SCROLL_WHEEL => {
            let delta_x: f64 = msg_send![event, deltaX];
            let delta_y: f64 = msg_send![event, deltaY];
            RawEventKind::ScrollWheel { delta_x, delta_y }
        }
        _ => return None,
    };
    Some(RawEvent::new(kind, location))
}

/// Build the global monitor mask from the source configuration.
fn monitor_mask(config: &SnifferConfig) -> usize {
    let mut mask = 0usize;
    if config.capture_keyboard {
        mask |= 1 << NSEVENT_TYPE_KEY_DOWN;
        mask |= 1 << NSEVENT_TYPE_KEY_UP;
        mask |= 1 << NSEVENT_TYPE_FLAGS_CHANGED;
    }
    if config.capture_mouse {
        mask |= 1 << NSEVENT_TYPE_LEFT_MOUSE_DOWN;
        mask |= 1 << NSEVENT_TYPE_LEFT_MOUSE_UP;
        mask |= 1 << NSEVENT_TYPE_RIGHT_MOUSE_DOWN;
        mask |= 1 << NSEVENT_TYPE_RIGHT_MOUSE_UP;
        mask |= 1 << NSEVENT_TYPE_MOUSE_MOVED;
        mask |= 1 << NSEVENT_TYPE_SCROLL_WHEEL;
    }
    mask
}

/// Retained notification-center observer tokens; removed when the loop exits.
struct ObserverTokens {
    workspace: Vec<Retained<NSObject>>,
    default: Vec<Retained<NSObject>>,
}

/// Register block observers forwarding system notifications into the
/// lifecycle controller.
fn register_observers(lifecycle: &Arc<LifecycleController>) -> ObserverTokens {
    unsafe fn add_observer(
        center: &NSNotificationCenter,
        name: &str,
        lifecycle: &Arc<LifecycleController>,
        entry: fn(&LifecycleController),
    ) -> Retained<NSObject> {
        let lifecycle = Arc::clone(lifecycle);
        let block = StackBlock::new(move |_note: *mut NSNotification| {
            entry(&lifecycle);
        })
        .copy();
        let name = NSString::from_str(name);
        msg_send![
            center,
            addObserverForName: &*name,
            object: std::ptr::null::<NSObject>(),
            queue: std::ptr::null::<NSObject>(),
            usingBlock: &*block
        ]
    }

    let workspace_entries: [(&str, fn(&LifecycleController)); 5] = [
        (WORKSPACE_WILL_SLEEP, LifecycleController::on_sleep),
        (WORKSPACE_DID_WAKE, LifecycleController::on_wake),
        (WORKSPACE_WILL_POWER_OFF, LifecycleController::on_power_off),
        (WORKSPACE_SCREENS_DID_SLEEP, LifecycleController::on_screens_sleep),
        (WORKSPACE_SCREENS_DID_WAKE, LifecycleController::on_screens_wake),
    ];
    let default_entries: [(&str, fn(&LifecycleController)); 2] = [
        (APP_WILL_RESIGN_ACTIVE, LifecycleController::on_will_resign_active),
        (APP_WILL_TERMINATE, LifecycleController::on_will_terminate),
    ];

    unsafe {
        let workspace_center = NSWorkspace::sharedWorkspace().notificationCenter();
        let default_center = NSNotificationCenter::defaultCenter();

        ObserverTokens {
            workspace: workspace_entries
                .iter()
                .map(|(name, entry)| add_observer(&workspace_center, name, lifecycle, *entry))
                .collect(),
            default: default_entries
                .iter()
                .map(|(name, entry)| add_observer(&default_center, name, lifecycle, *entry))
                .collect(),
        }
    }
}

fn remove_observers(tokens: ObserverTokens) {
    unsafe {
        let workspace_center = NSWorkspace::sharedWorkspace().notificationCenter();
        for token in tokens.workspace {
            let _: () = msg_send![&*workspace_center, removeObserver: &*token];
        }
        let default_center = NSNotificationCenter::defaultCenter();
        for token in tokens.default {
            let _: () = msg_send![&*default_center, removeObserver: &*token];
        }
    }
}

/// The macOS sniffer: one global monitor, one run loop, one engine.
pub struct MacSniffer {
    config: SnifferConfig,
    hooks: Hooks,
    cancel: CancelHandle,
    lifecycle: Arc<LifecycleController>,
}

impl MacSniffer {
    pub fn new(
        config: SnifferConfig,
        cancel: CancelHandle,
        lifecycle: Arc<LifecycleController>,
    ) -> Self {
        Self {
            config,
            hooks: Hooks::default(),
            cancel,
            lifecycle,
        }
    }

    /// The hook slots; replace them before calling [`MacSniffer::run`].
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

    /// Install the monitor and observers, then block until cancelled.
    ///
    /// Must be called on the main thread. An unexpected failure inside the
    /// per-event handler stops the loop and is returned; it is not retried,
    /// since the same event stream would fail again.
    pub fn run(&mut self) -> Result<(), SnifferError> {
        let mtm = MainThreadMarker::new().ok_or(SnifferError::NotMainThread)?;
        if self.cancel.is_cancelled() {
            return Ok(());
        }

        // Background process: no dock icon, no menu bar.
        let app = NSApplication::sharedApplication(mtm);
        let _: bool = unsafe {
            msg_send![&*app, setActivationPolicy: NSApplicationActivationPolicy::Prohibited]
        };

        let observers = register_observers(&self.lifecycle);

        let engine = Rc::new(RefCell::new(Engine::new(
            std::mem::take(&mut self.hooks),
            MacWindowQuery,
        )));
        let fatal: Rc<RefCell<Option<String>>> = Rc::new(RefCell::new(None));

        let handler = {
            let engine = engine.clone();
            let fatal = fatal.clone();
            let cancel = self.cancel.clone();
            StackBlock::new(move |event: *mut NSEvent| {
                let raw = unsafe {
                    match event.as_ref() {
                        Some(event) => translate_event(event),
                        None => None,
                    }
                };
                let Some(raw) = raw else { return };
                let outcome = catch_unwind(AssertUnwindSafe(|| {
                    engine.borrow_mut().handle(&raw);
                }));
                if let Err(panic) = outcome {
                    *fatal.borrow_mut() = Some(panic_message(panic));
                    cancel.cancel();
                }
            })
            .copy()
        };

        let mask = monitor_mask(&self.config);
        let monitor: Option<Retained<AnyObject>> = unsafe {
            msg_send![
                class!(NSEvent),
                addGlobalMonitorForEventsMatchingMask: mask,
                handler: &*handler
            ]
        };
        let Some(monitor) = monitor else {
            remove_observers(observers);
            return Err(SnifferError::MonitorInstallFailed);
        };
        info!("global event monitor installed");

        // Block between events inside the run loop's own wait primitive,
        // surfacing every 100ms to check the cancellation latch.
        while !self.cancel.is_cancelled() && fatal.borrow().is_none() {
            CFRunLoop::run_in_mode(
                unsafe { kCFRunLoopCommonModes },
                Duration::from_millis(100),
                false,
            );
        }

        unsafe {
            let _: () = msg_send![class!(NSEvent), removeMonitor: &*monitor];
        }
        remove_observers(observers);
        info!("capture loop stopped");

        match fatal.borrow_mut().take() {
            Some(message) => Err(SnifferError::Handler(message)),
            None => Ok(()),
        }
    }
}

fn panic_message(panic: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "event handler panicked".to_string()
    }
}
