//! Activity Sniffer CLI
//!
//! Captures keystrokes, mouse input and foreground window context, and logs
//! the normalized stream as JSON lines.

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use crossbeam_channel::{bounded, Receiver, Sender};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use activity_sniffer::{
    check_permission, CancelHandle, Config, FileLock, Hooks, InstanceLock, LifecycleController,
    Sniffer, SnifferConfig, SourceConfig, VERSION,
};

#[derive(Parser)]
#[command(name = "activity-sniffer")]
#[command(version = VERSION)]
#[command(about = "Desktop activity sniffer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start capturing input events and window context
    Run {
        /// Input sources to capture (keyboard, mouse, or all)
        #[arg(long, default_value = "all")]
        sources: String,

        /// Override the data directory (lock file location)
        #[arg(long)]
        data_dir: Option<PathBuf>,
    },

    /// Show permission, lock and configuration state
    Status,

    /// Show configuration
    Config,
}

/// One normalized record handed to the consumer thread.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ActivityRecord {
    Key {
        at: DateTime<Utc>,
        keycode: u16,
        modifiers: Vec<String>,
        symbol: String,
        is_repeat: bool,
    },
    Button {
        at: DateTime<Utc>,
        button: u8,
        x: f64,
        y: f64,
    },
    Pointer {
        at: DateTime<Utc>,
        x: f64,
        y: f64,
    },
    Window {
        at: DateTime<Utc>,
        owner: String,
        title: String,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { sources, data_dir } => cmd_run(&sources, data_dir),
        Commands::Status => cmd_status(),
        Commands::Config => cmd_config(),
    }
}

fn cmd_run(sources: &str, data_dir: Option<PathBuf>) {
    println!("Activity Sniffer v{VERSION}");
    println!();

    if !check_permission() {
        eprintln!("Error: Input Monitoring permission not granted.");
        eprintln!();
        eprintln!("To grant permission:");
        eprintln!("1. Open System Preferences > Security & Privacy > Privacy");
        eprintln!("2. Select 'Input Monitoring' in the left sidebar");
        eprintln!("3. Add this application to the allowed list");
        eprintln!("4. Restart the application");
        std::process::exit(1);
    }

    let source_config = SourceConfig::from_csv(sources);
    if !source_config.any_enabled() {
        eprintln!("Error: At least one source must be enabled (keyboard or mouse)");
        std::process::exit(1);
    }

    let mut config = Config::load().unwrap_or_default();
    config.sources = source_config;
    if let Some(dir) = data_dir {
        config.data_path = dir;
    }
    if let Err(e) = config.ensure_directories() {
        eprintln!("Warning: Could not create directories: {e}");
    }

    // Another instance holding the lock is surfaced before the loop starts.
    let lock = FileLock::new(config.lock_path());
    if let Err(e) = lock.acquire() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }

    let cancel = CancelHandle::new();
    let mut controller = LifecycleController::new(Box::new(lock), cancel.clone());
    controller.set_start_current_process(Box::new(|| {
        info!("re-anchoring on the foreground process");
    }));
    let controller = Arc::new(controller);

    if let Err(e) = controller.install_signal_handlers() {
        eprintln!("Error setting signal handlers: {e}");
        controller.release_lock();
        std::process::exit(1);
    }

    let (sender, receiver) = bounded::<ActivityRecord>(10_000);
    let consumer = thread::spawn(move || consume(receiver));

    let sniffer_config = SnifferConfig {
        capture_keyboard: config.sources.keyboard,
        capture_mouse: config.sources.mouse,
    };
    let mut sniffer = Sniffer::new(sniffer_config, cancel, Arc::clone(&controller));
    install_hooks(sniffer.hooks_mut(), &sender);
    drop(sender);

    println!("Capturing. Press Ctrl+C to stop.");
    println!();

    let outcome = sniffer.run();

    controller.release_lock();
    drop(sniffer);
    let _ = consumer.join();

    if let Err(e) = outcome {
        error!("capture loop failed: {e}");
        std::process::exit(1);
    }
    info!("capture finished");
}

/// Wire the engine's hook slots to the consumer channel.
///
/// Hooks run on the capture thread and must not block: a full channel drops
/// the record instead of waiting.
fn install_hooks(hooks: &mut Hooks, sender: &Sender<ActivityRecord>) {
    let tx = sender.clone();
    hooks.key_hook = Box::new(move |key| {
        let _ = tx.try_send(ActivityRecord::Key {
            at: Utc::now(),
            keycode: key.keycode,
            modifiers: key.modifiers.iter().map(|m| m.to_string()).collect(),
            symbol: key.symbol.clone(),
            is_repeat: key.is_repeat,
        });
    });

    let tx = sender.clone();
    hooks.mouse_button_hook = Box::new(move |button, x, y| {
        let _ = tx.try_send(ActivityRecord::Button {
            at: Utc::now(),
            button,
            x,
            y,
        });
    });

    let tx = sender.clone();
    hooks.mouse_move_hook = Box::new(move |x, y| {
        let _ = tx.try_send(ActivityRecord::Pointer {
            at: Utc::now(),
            x,
            y,
        });
    });

    let tx = sender.clone();
    hooks.screen_hook = Box::new(move |ctx| {
        let _ = tx.try_send(ActivityRecord::Window {
            at: Utc::now(),
            owner: ctx.owner_name.clone(),
            title: ctx.title.clone(),
            x: ctx.x,
            y: ctx.y,
            width: ctx.width,
            height: ctx.height,
        });
    });
}

/// Drain the record channel and log each record as a JSON line.
fn consume(receiver: Receiver<ActivityRecord>) {
    for record in receiver.iter() {
        match serde_json::to_string(&record) {
            Ok(line) => match record {
                // Pointer traffic is high-volume; keep it below the default level
                ActivityRecord::Pointer { .. } => debug!(target: "activity", "{line}"),
                _ => info!(target: "activity", "{line}"),
            },
            Err(e) => error!("could not serialize record: {e}"),
        }
    }
}

fn cmd_status() {
    let config = Config::load().unwrap_or_default();

    println!("Activity Sniffer Status");
    println!("=======================");
    println!();

    let has_permission = check_permission();
    println!(
        "Input Monitoring Permission: {}",
        if has_permission { "Granted" } else { "Not Granted" }
    );
    println!();

    println!("Configuration:");
    println!(
        "  Keyboard capture: {}",
        if config.sources.keyboard { "enabled" } else { "disabled" }
    );
    println!(
        "  Mouse capture: {}",
        if config.sources.mouse { "enabled" } else { "disabled" }
    );
    println!("  Data path: {:?}", config.data_path);
    println!();

    if config.lock_path().exists() {
        println!("Lock file present at {:?} (an instance may be running)", config.lock_path());
    } else {
        println!("No lock file; no instance is running.");
    }
}

fn cmd_config() {
    let config = Config::load().unwrap_or_default();

    println!("Configuration");
    println!("=============");
    println!();
    println!("Config file: {:?}", Config::config_path());
    println!();
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "Error".to_string())
    );
}
