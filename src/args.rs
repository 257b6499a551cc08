use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use recordify_core::config;

#[derive(Parser, Debug)]
#[command(name = "recordify")]
#[command(author = "Recordify Team")]
#[command(version)]
#[command(about = "Screen recording and annotation session demo", long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "recordify.toml")]
    pub config: PathBuf,

    /// Frames per second, overrides [recording].fps
    #[arg(long)]
    pub fps: Option<f32>,

    /// Seconds to record
    #[arg(short, long, default_value = "5")]
    pub duration: f32,

    /// Capture mode (fullscreen, window, region, multi-display, follow-cursor)
    #[arg(short, long)]
    pub mode: Option<config::CaptureMode>,

    /// Verbose logging
    #[arg(short, long, action)]
    pub verbose: bool,

    /// Worker threads for frame capture
    #[arg(short, long)]
    pub threads: Option<usize>,

    /// Record user actions and save them to the configured script
    #[arg(long, action)]
    pub record_actions: bool,
}

impl Args {
    pub fn load_config(&self) -> Result<config::Config, Box<dyn std::error::Error>> {
        config::Config::load(&self.config)
    }

    /// Recording length; rejects zero, negative, NaN and out-of-range values
    pub fn run_duration(&self) -> Result<Duration, String> {
        match Duration::try_from_secs_f32(self.duration) {
            Ok(duration) if !duration.is_zero() => Ok(duration),
            Ok(_) => Err("Duration must be a positive number of seconds".to_string()),
            Err(e) => Err(format!("Invalid duration {}: {}", self.duration, e)),
        }
    }

    /// Fold CLI overrides into the loaded config
    pub fn apply(&self, config: &mut config::Config) {
        if let Some(fps) = self.fps {
            config.recording.fps = fps;
        }
        if let Some(mode) = self.mode {
            config.recording.mode = mode;
        }
        if self.verbose {
            config.logging.level = "debug".to_string();
        }
    }
}
