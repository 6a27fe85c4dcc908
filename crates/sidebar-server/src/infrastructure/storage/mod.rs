//! Storage infrastructure: configuration file persistence.
//!
//! The `config` sub-module reads and writes the TOML file that tunes refresh
//! timing, logging and the demo's default protocol version, and falls back to
//! defaults when the file does not exist yet.

pub mod config;
