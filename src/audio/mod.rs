// Audio module - file decoding, resampling, and fixed-length windowing

pub mod loader;
pub mod resample;
pub mod windower;

// Re-export commonly used types for convenience
pub use loader::{load_waveform, Waveform};
pub use windower::{Segment, Windower};
