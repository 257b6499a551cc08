//! recordify - Main entry point
//!
//! Runs a recording session against the simulated desktop and logs what
//! the orchestrator saw.

mod args;

use args::Args;
use clap::Parser;
use log::{debug, error, info, warn};
use recordify_core::clock::SystemClock;
use recordify_core::config::Config;
use recordify_core::input::MouseButton;
use recordify_core::providers::{FileStorage, SimulatedPlatform};
use recordify_core::session::{Collaborators, SessionEvent, SessionOrchestrator};
use std::sync::Arc;
use std::time::Instant;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load configuration before logging so its level can seed the filter
    let (mut config, load_error) = match args.load_config() {
        Ok(cfg) => (cfg, None),
        Err(e) => (Config::default(), Some(e)),
    };
    args.apply(&mut config);

    env_logger::Builder::new()
        .parse_filters(&std::env::var("RECORDIFY_LOG").unwrap_or_else(|_| config.logging.level.clone()))
        .init();

    info!("recordify v{}", env!("CARGO_PKG_VERSION"));
    match load_error {
        Some(e) => warn!("Failed to load config: {}, using defaults", e),
        None => info!("Loaded configuration from {:?}", args.config),
    }

    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(e);
    }
    let duration = args.run_duration().map_err(|e| {
        error!("{}", e);
        e
    })?;

    let platform = SimulatedPlatform::new();
    let storage = Arc::new(FileStorage::new(config.storage.root.clone()));
    let collaborators = Collaborators::simulated(platform.clone(), storage, Arc::new(SystemClock));
    let mut session = SessionOrchestrator::with_settings(collaborators, config.reader.clone());
    session.set_storage_prefixes(&config.storage.preset_dir, &config.storage.annotation_export);
    if let Some(threads) = args.threads {
        session.set_thread_count(threads)?;
    }
    session.set_event_callback(|event| match event {
        SessionEvent::FrameCaptured(n) => debug!("Frame {}", n),
        SessionEvent::ErrorOccurred { code, message } => warn!("Session error [{}]: {}", code, message),
        other => info!("Session event: {:?}", other),
    });

    session.initialize()?;
    session.start_capture(config.recording.clone())?;
    session.enable_keyboard_overlay(true);
    session.enable_cursor_trail(true);
    if let Err(e) = session.start_drawing_mode() {
        warn!("Drawing mode unavailable: {}", e);
    }
    if args.record_actions {
        session.start_action_recording();
    }

    let deadline = Instant::now()
        .checked_add(duration)
        .ok_or_else(|| format!("Duration of {}s is too long", args.duration))?;
    let interval = session.reader().update_interval();
    let mut tick: u64 = 0;
    while Instant::now() < deadline && session.is_capturing() {
        simulate_user(&platform, tick);
        session.update();
        tick += 1;
        std::thread::sleep(interval);
    }

    if args.record_actions {
        session.stop_action_recording();
        match session.save_actions(&config.storage.action_script) {
            Ok(count) => info!("Saved {} actions to {}", count, config.storage.action_script),
            Err(e) => warn!("Failed to save actions: {}", e),
        }
    }

    if session.is_capturing() {
        session.stop_capture()?;
    }
    let stats = session.capture_stats();
    info!("Final stats: {}", stats);
    info!(
        "{} annotations, {} buffered frames",
        session.writer().annotation_count(),
        session.recent_frames(usize::MAX).len()
    );
    session.shutdown();

    Ok(())
}

/// Scripted pointer and keyboard activity for the simulated desktop
fn simulate_user(platform: &SimulatedPlatform, tick: u64) {
    let angle = tick as f32 * 0.05;
    let x = 960 + (angle.cos() * 300.0) as i32;
    let y = 540 + (angle.sin() * 200.0) as i32;
    platform.move_mouse(x, y);

    match tick % 120 {
        30 => platform.set_button(MouseButton::Left, true),
        32 => platform.set_button(MouseButton::Left, false),
        90 => platform.type_text("hello"),
        _ => {}
    }
}
