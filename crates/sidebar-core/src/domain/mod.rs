//! Domain entities for the sidebar engine.
//!
//! This module contains pure state logic with no async or I/O dependencies.
//!
//! # What lives here? (for beginners)
//!
//! The rendering engine in `sidebar-server` decides *when* packets go out.
//! The rules about *what* a board looks like live here so they can be tested
//! without a runtime:
//!
//! - how an objective is named and how each row's team/entry ids derive
//!   from it ([`objective`]),
//! - the ordered table of rows, the 15-row ceiling, slot identity and the
//!   descending score assignment done by a full refresh ([`lines`]),
//! - the validation errors raised before any state changes ([`error`]).

pub mod error;
pub mod lines;
pub mod objective;
