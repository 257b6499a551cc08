//! Collaborator boundaries
//!
//! Platform query, rendering, overlay, OCR and export are owned by the
//! host. The core talks to them through these traits; the in-crate
//! implementations are simulated or no-op and exist for the demo binary
//! and tests.

pub mod content;
pub mod platform;
pub mod render;

pub use crate::capture::{CaptureProvider, PixelBuffer, SyntheticCapture};
pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use crate::storage::{FileStorage, MemoryStorage, Storage};
pub use content::{ExportProvider, NullExporter, NullOcr, OcrProvider};
pub use platform::{KeyEvent, KeyboardSample, MouseSample, PlatformQuery, SimulatedPlatform};
pub use render::{NullOverlay, NullRenderer, OverlayProvider, RenderCall, RenderProvider};
