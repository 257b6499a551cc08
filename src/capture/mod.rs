//! Screen capture
//!
//! Frame data, the pixel capture provider boundary and xxhash change
//! detection.

pub mod capturer;
pub mod frame;
pub mod hasher;

pub use capturer::{CaptureProvider, PixelBuffer, SyntheticCapture};
pub use frame::{ColorStats, FrameStats, ScreenCapture};
pub use hasher::{Hasher, HasherConfig};
