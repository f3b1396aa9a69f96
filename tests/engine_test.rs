//! Integration tests driving the capture engine end to end with a scripted
//! window query, checking hook ordering and the resolution throttle across a
//! realistic event sequence.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use activity_sniffer::sniffer::{
    Engine, Hooks, Location, RawEvent, RawEventKind, WindowQuery, WindowRecord,
    FORCE_SCREEN_CHANGE,
};

/// Scripted desktop: a fixed active application owning one titled window and
/// one untitled overlay earlier in enumeration order.
struct ScriptedDesktop {
    active: String,
    enumerations: Arc<AtomicUsize>,
}

impl ScriptedDesktop {
    fn new(active: &str) -> (Self, Arc<AtomicUsize>) {
        let enumerations = Arc::new(AtomicUsize::new(0));
        (
            Self {
                active: active.to_string(),
                enumerations: enumerations.clone(),
            },
            enumerations,
        )
    }
}

impl WindowQuery for ScriptedDesktop {
    fn active_application(&self) -> Option<String> {
        Some(self.active.clone())
    }

    fn list_windows(&self) -> Vec<WindowRecord> {
        self.enumerations.fetch_add(1, Ordering::SeqCst);
        vec![
            WindowRecord {
                owner_name: self.active.clone(),
                title: String::new(),
                layer: 25,
                x: 0.0,
                y: 0.0,
                width: 30.0,
                height: 30.0,
            },
            WindowRecord {
                owner_name: self.active.clone(),
                title: "Document".into(),
                layer: 0,
                x: 40.0,
                y: 50.0,
                width: 800.0,
                height: 600.0,
            },
        ]
    }
}

/// Hooks that append a readable trace entry per invocation, preserving the
/// exact interleaving the engine produced.
fn tracing_hooks(trace: &Arc<Mutex<Vec<String>>>) -> Hooks {
    let mut hooks = Hooks::default();

    let log = trace.clone();
    hooks.key_hook = Box::new(move |key| {
        log.lock().unwrap().push(format!("key:{}", key.symbol));
    });

    let log = trace.clone();
    hooks.mouse_button_hook = Box::new(move |button, x, y| {
        log.lock().unwrap().push(format!("button:{button}@{x},{y}"));
    });

    let log = trace.clone();
    hooks.mouse_move_hook = Box::new(move |x, y| {
        log.lock().unwrap().push(format!("move:{x},{y}"));
    });

    let log = trace.clone();
    hooks.screen_hook = Box::new(move |ctx| {
        log.lock()
            .unwrap()
            .push(format!("window:{}/{}", ctx.owner_name, ctx.title));
    });

    hooks
}

fn event(kind: RawEventKind, x: f64, y: f64) -> RawEvent {
    RawEvent::new(kind, Location { x, y })
}

fn key_down(keycode: u16, character: &str) -> RawEventKind {
    RawEventKind::KeyDown {
        keycode,
        flags: 0,
        character: character.into(),
        is_repeat: false,
    }
}

#[test]
fn session_stream_produces_ordered_hook_calls() {
    let (desktop, _) = ScriptedDesktop::new("TextEdit");
    let trace = Arc::new(Mutex::new(Vec::new()));
    let mut engine = Engine::new(tracing_hooks(&trace), desktop);

    let t0 = Instant::now();
    let mut t = t0;
    let mut step = |engine: &mut Engine<ScriptedDesktop>, kind: RawEventKind, x: f64, y: f64| {
        t += Duration::from_millis(200);
        engine.handle_at(&event(kind, x, y), t);
    };

    // Click into the document, type "hi", press Enter, scroll down.
    step(&mut engine, RawEventKind::LeftMouseDown, 100.0, 200.0);
    step(&mut engine, RawEventKind::LeftMouseUp, 100.0, 200.0);
    step(&mut engine, key_down(4, "h"), 100.0, 200.0);
    step(&mut engine, RawEventKind::KeyUp, 100.0, 200.0);
    step(&mut engine, key_down(34, "i"), 100.0, 200.0);
    step(&mut engine, RawEventKind::KeyUp, 100.0, 200.0);
    step(&mut engine, key_down(36, "\r"), 100.0, 200.0);
    step(&mut engine, RawEventKind::KeyUp, 100.0, 200.0);
    step(
        &mut engine,
        RawEventKind::ScrollWheel {
            delta_x: 0.0,
            delta_y: -2.0,
        },
        100.0,
        200.0,
    );

    let trace = trace.lock().unwrap();
    assert_eq!(
        *trace,
        vec![
            // The click resolves the window first, then the button fires;
            // the titled, normal-layer record wins over the earlier overlay.
            "window:TextEdit/Document".to_string(),
            "button:1@100,200".to_string(),
            "key:h".to_string(),
            "key:i".to_string(),
            "key:Enter".to_string(),
            "button:5@100,200".to_string(),
        ]
    );
}

#[test]
fn window_enumeration_is_throttled_under_steady_movement() {
    let (desktop, enumerations) = ScriptedDesktop::new("Safari");
    let trace = Arc::new(Mutex::new(Vec::new()));
    let mut engine = Engine::new(tracing_hooks(&trace), desktop);

    // A minute of mouse movement at 10 events per second.
    let t0 = Instant::now();
    for i in 0..600u64 {
        let now = t0 + Duration::from_millis(100 * i);
        engine.handle_at(&event(RawEventKind::MouseMoved, i as f64, 0.0), now);
    }

    // 60 seconds / 10-second throttle: five expiries, no more.
    let calls = enumerations.load(Ordering::SeqCst);
    assert_eq!(calls, 5);
    assert_eq!(
        trace
            .lock()
            .unwrap()
            .iter()
            .filter(|line| line.starts_with("window:"))
            .count(),
        5
    );
}

#[test]
fn modifier_chord_forces_a_fresh_resolution() {
    let (desktop, enumerations) = ScriptedDesktop::new("Safari");
    let trace = Arc::new(Mutex::new(Vec::new()));
    let mut engine = Engine::new(tracing_hooks(&trace), desktop);

    let t0 = Instant::now();
    // Cmd goes down (app switch chord) one second in: resolves immediately.
    engine.handle_at(&event(RawEventKind::FlagsChanged, 0.0, 0.0), t0 + Duration::from_secs(1));
    assert_eq!(enumerations.load(Ordering::SeqCst), 1);

    // The next event after the switch animation settles resolves again,
    // long before the regular throttle would have expired.
    engine.handle_at(
        &event(RawEventKind::MouseMoved, 1.0, 1.0),
        t0 + Duration::from_secs(3),
    );
    assert_eq!(enumerations.load(Ordering::SeqCst), 2);

    // But a key-up never does, no matter how stale the context is.
    engine.handle_at(
        &event(RawEventKind::KeyUp, 1.0, 1.0),
        t0 + Duration::from_secs(3) + FORCE_SCREEN_CHANGE * 2,
    );
    assert_eq!(enumerations.load(Ordering::SeqCst), 2);
}

#[test]
fn dual_axis_scroll_fires_a_single_horizontal_action() {
    let (desktop, _) = ScriptedDesktop::new("Safari");
    let trace = Arc::new(Mutex::new(Vec::new()));
    let mut engine = Engine::new(tracing_hooks(&trace), desktop);

    engine.handle_at(
        &event(
            RawEventKind::ScrollWheel {
                delta_x: 1.5,
                delta_y: 4.0,
            },
            10.0,
            20.0,
        ),
        Instant::now(),
    );

    assert_eq!(*trace.lock().unwrap(), vec!["button:6@10,20".to_string()]);
}
