//! # Folio Architecture
//!
//! Folio remembers where a reader left off in each document and keeps that
//! position in step across devices. It is a library that happens to have a
//! CLI client; the same core can sit behind a native reader's page view.
//!
//! ## Layers
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  CLI Layer (main.rs, args.rs, print.rs)                     │
//! │  - Parses arguments, formats output, handles terminal I/O   │
//! │  - The ONLY place that knows about stdout/stderr/exit codes │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  API Layer (api.rs)                                         │
//! │  - Thin facade over commands, resolves relative paths       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Command Layer (commands/*.rs)                              │
//! │  - One operation each, returns CmdResult                    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │  Core                                                       │
//! │  reconcile ── session                                       │
//! │     │  └──── identity   (file tokens that survive renames)  │
//! │     ├─────── store      (authoritative local records)       │
//! │     └─────── remote     (best-effort cross-device mirror)   │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Who Wins
//!
//! The local store is the source of truth and is applied the moment a
//! document opens. The mirror only ever *offers* a different page, and only
//! when its entry is strictly newer than the local record. See
//! [`reconcile`] for the full lifecycle.
//!
//! ## No I/O Assumptions in Core
//!
//! From `api.rs` inward, code never writes to stdout/stderr and never exits
//! the process. Diagnostics go through the `log` facade; the binary decides
//! where they end up.
//!
//! ## Module Overview
//!
//! - [`api`]: The API facade
//! - [`commands`]: One module per user operation
//! - [`reconcile`]: Open/close lifecycle, merge decision, library sweep
//! - [`session`]: Live reading position and display preferences
//! - [`identity`]: Durable document identity
//! - [`store`]: Local record storage
//! - [`remote`]: Remote mirror and background dispatch
//! - [`model`]: Persisted types
//! - [`config`]: Configuration management
//! - [`error`]: Error types

pub mod api;
pub mod commands;
pub mod config;
pub mod error;
pub mod identity;
pub mod model;
pub mod reconcile;
pub mod remote;
pub mod session;
pub mod store;

#[cfg(test)]
pub(crate) mod test_utils;
