//! Demonstration of the activity sniffer hook API.
//!
//! This example shows how to:
//! 1. Check for Input Monitoring permission
//! 2. Create a sniffer and register consumer hooks
//! 3. Receive normalized key, mouse and window-context events
//!
//! Run with: cargo run --example sniff_demo
//!
//! Note: Requires Input Monitoring permission on macOS.
//! Grant permission in System Preferences > Security & Privacy > Privacy

use std::sync::Arc;

use activity_sniffer::{
    check_permission, CancelHandle, FileLock, LifecycleController, Sniffer, SnifferConfig,
};

fn main() {
    println!("Activity Sniffer - Capture Demo");
    println!("===============================");
    println!();

    print!("Checking Input Monitoring permission... ");
    if check_permission() {
        println!("OK");
    } else {
        println!("FAILED");
        println!();
        println!("Please grant Input Monitoring permission:");
        println!("1. Open System Preferences");
        println!("2. Go to Security & Privacy > Privacy > Input Monitoring");
        println!("3. Add this application");
        println!("4. Restart this demo");
        return;
    }
    println!();

    let lock = FileLock::new(std::env::temp_dir().join("activity-sniffer-demo.pid"));
    let cancel = CancelHandle::new();
    let lifecycle = Arc::new(LifecycleController::new(Box::new(lock), cancel.clone()));

    let mut sniffer = Sniffer::new(SnifferConfig::default(), cancel, lifecycle.clone());

    let hooks = sniffer.hooks_mut();
    hooks.key_hook = Box::new(|key| {
        let modifiers: Vec<&str> = key.modifiers.iter().map(|m| m.as_str()).collect();
        println!(
            "  key: {} (code {}, mods [{}]{})",
            key.symbol,
            key.keycode,
            modifiers.join("+"),
            if key.is_repeat { ", repeat" } else { "" }
        );
    });
    hooks.mouse_button_hook = Box::new(|button, x, y| {
        println!("  button {button} at ({x:.0}, {y:.0})");
    });
    hooks.screen_hook = Box::new(|ctx| {
        println!(
            "  window: {} \"{}\" ({}x{} at {},{})",
            ctx.owner_name, ctx.title, ctx.width, ctx.height, ctx.x, ctx.y
        );
    });
    // Mouse moves are left on the default no-op hook to keep the output readable.

    // Stop on Ctrl+C; the sniffer unwinds normally from run().
    let stop = sniffer.cancel_handle();
    ctrlc::set_handler(move || {
        stop.cancel();
    })
    .expect("Error setting Ctrl+C handler");

    println!("Capturing. Type, click and switch windows; Ctrl+C to stop.");
    println!();

    if let Err(e) = sniffer.run() {
        eprintln!("Capture failed: {e}");
    }

    lifecycle.release_lock();
    println!();
    println!("Demo complete!");
}
