//! recordify-core - screen recording and annotation coordination
//!
//! A `Reader` samples input, displays, windows and the cursor; a `Writer`
//! draws shapes, text and annotations onto an overlay canvas; the
//! `SessionOrchestrator` ties both to a capture state machine and a frame
//! worker pool. Pixels, rendering, OCR and export stay behind the traits
//! in `providers`.

pub mod capture;
pub mod clock;
pub mod config;
pub mod cursor_overlay;
pub mod display;
pub mod geometry;
pub mod input;
pub mod providers;
pub mod reader;
pub mod session;
pub mod storage;
pub mod writer;

// Re-exports
pub use config::{CaptureMode, CaptureQuality, Config, RecordingConfig};
pub use geometry::{Point, Rectangle, Size};
pub use reader::{Reader, ReaderError, ReaderEvent, ReaderSettings};
pub use session::{
    CaptureState, CaptureStats, Collaborators, ErrorCode, InteractionMode, SessionError, SessionEvent,
    SessionOrchestrator,
};
pub use writer::{Annotation, Writer, WriterError};
