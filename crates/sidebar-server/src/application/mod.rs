//! Application layer: the sidebar rendering engine.
//!
//! # What is the "application" layer? (for beginners)
//!
//! In Clean Architecture the *application* layer sits between the domain
//! (pure rules in `sidebar_core`) and the infrastructure (host connections,
//! configuration files).
//!
//! Code in this layer:
//!
//! - **Orchestrates** the pure line table and the packet codec to fulfil a
//!   user goal (e.g., "show this board to that player").
//! - **Depends on abstractions** ([`ports::PacketTransport`],
//!   [`ports::VersionResolver`], [`sidebar_core::TextRenderer`]) rather than
//!   concrete implementations, so the host can plug in its own connections.
//! - **Contains no socket or file I/O**.
//!
//! # Sub-modules
//!
//! - **`board`**    – One objective with its lines: title modes, full and
//!   single-line refresh, removal, reordering, viewer add/remove, destroy.
//! - **`viewers`**  – Per-board viewer membership and per-viewer fan-out.
//! - **`content`**  – Per-viewer content, visibility and number-format
//!   providers.
//! - **`title`**    – Fixed, animated and per-viewer title modes.
//! - **`tasks`**    – Cancellable periodic tasks on the Tokio runtime.
//! - **`registry`** – Owner of live boards; weak handles for tasks.
//! - **`pager`**    – Several boards rotated through one viewer set.
//! - **`ports`**    – Traits the host implements.
//! - **`error`**    – [`error::BoardError`].

pub mod board;
pub mod content;
pub mod error;
pub mod pager;
pub mod ports;
pub mod registry;
pub mod tasks;
pub mod title;
pub mod viewers;
