//! Loop detection subsystem for skill execution.
//!
//! Keeps an in-memory step log per session and runs deterministic depth,
//! cycle, pattern and duration checks against it.

mod checks;
mod config;
mod detector;
mod hash;
mod types;

pub use self::config::LoopDetectorConfig;
pub use detector::LoopDetector;
pub use hash::{hash_input, INPUT_HASH_LEN};
pub use types::{ExecutionStep, LoopCheckResult, LoopType};
