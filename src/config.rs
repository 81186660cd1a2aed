//! Configuration for the classification service
//!
//! Pipeline parameters (sample rate, windowing, target shape, class table)
//! are compile-time constants: the pretrained model was trained against
//! them and changing any one silently breaks predictions. Deployment
//! settings (bind address, paths, limits) live in [`ServiceConfig`], which
//! loads from a JSON file and can be overridden from the environment.

use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Sample rate every waveform is resampled to before analysis
pub const SAMPLE_RATE: u32 = 22_050;

/// Nominal segment duration in milliseconds
pub const WINDOW_MS: u32 = 5_000;

/// Overlap between consecutive segments in milliseconds
pub const OVERLAP_MS: u32 = 2_500;

/// Spectrogram shape (mel rows, time columns) expected by the model
pub const TARGET_SHAPE: (usize, usize) = (64, 108);

/// Number of output classes
pub const NUM_CLASSES: usize = 4;

/// Class index to species name
pub const CLASS_NAMES: [&str; NUM_CLASSES] = [
    "AtlanticCanary",
    "Sooty-headedBulbul",
    "ZebraDove",
    "MoustachedBabbler",
];

/// File extensions accepted by `/predict` (compared lower-cased)
pub const ALLOWED_EXTENSIONS: [&str; 4] = ["wav", "mp3", "flac", "ogg"];

/// Largest batch handed to the classifier in one forward pass
pub const MAX_BATCH: usize = 32;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";
pub const DEFAULT_UPLOAD_DIR: &str = "uploads";
pub const DEFAULT_MODEL_PATH: &str = "model.onnx";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

pub const ENV_BIND_ADDR: &str = "BIRDCALL_ADDR";
pub const ENV_UPLOAD_DIR: &str = "BIRDCALL_UPLOAD_DIR";
pub const ENV_MODEL_PATH: &str = "BIRDCALL_MODEL";

/// Deployment configuration for the HTTP service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Address the HTTP listener binds to
    pub bind_addr: SocketAddr,
    /// Scratch directory for uploaded files (removed after each request)
    pub upload_dir: PathBuf,
    /// Path to the ONNX export of the classifier
    pub model_path: PathBuf,
    /// Maximum accepted request body size in bytes
    pub max_upload_bytes: usize,
    /// Intra-op threads given to the inference session
    pub inference_threads: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 5000)),
            upload_dir: PathBuf::from(DEFAULT_UPLOAD_DIR),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            inference_threads: 1,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from JSON file
    ///
    /// Missing or malformed files fall back to defaults with a warning,
    /// so a bare checkout starts without any config present.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Self {
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => {
                    log::info!("[Config] Loaded configuration from {:?}", path.as_ref());
                    config
                }
                Err(err) => {
                    log::warn!(
                        "[Config] Failed to parse JSON from {:?}: {}. Using defaults.",
                        path.as_ref(),
                        err
                    );
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!(
                    "[Config] Failed to read config file {:?}: {}. Using defaults.",
                    path.as_ref(),
                    err
                );
                Self::default()
            }
        }
    }

    /// Apply `BIRDCALL_*` environment overrides from the process environment
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup
    ///
    /// Unparseable addresses are ignored with a warning and keep the
    /// previous value.
    pub fn with_overrides_from<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_BIND_ADDR) {
            match raw.parse() {
                Ok(addr) => self.bind_addr = addr,
                Err(err) => log::warn!(
                    "[Config] Ignoring {}={:?}: {}",
                    ENV_BIND_ADDR,
                    raw,
                    err
                ),
            }
        }
        if let Some(dir) = lookup(ENV_UPLOAD_DIR) {
            self.upload_dir = PathBuf::from(dir);
        }
        if let Some(model) = lookup(ENV_MODEL_PATH) {
            self.model_path = PathBuf::from(model);
        }
        self
    }
}
