//! Infrastructure layer for the sidebar engine.
//!
//! Contains adapters around the application layer: the in-memory recording
//! transport and configuration file storage.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `sidebar_core`, but MUST NOT be imported by the `application` layer.

pub mod recording;
pub mod storage;
