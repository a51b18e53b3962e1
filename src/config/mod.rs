//! Configuration management
//!
//! Flat key/value settings with JSON persistence: the symbol/dump roots,
//! their backup shares, the WinDbg install directory and the instance cap.

pub mod settings;

pub use settings::{Settings, parse_string_map};
