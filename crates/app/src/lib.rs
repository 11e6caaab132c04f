//! # plotter-app
//!
//! Application layer: the plotter session engine and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement:
//!   - `Transport`: open a link, yielding a `LineReader` and a `LineWriter`
//! - Provide the **session engine** (`PlotterSession`): connection lifecycle,
//!   emulation, command dispatch, workspace enforcement, position refresh
//! - Run the **receive loop** that decodes device replies for a live link
//! - Provide **in-process infrastructure** that doesn't need IO: the state
//!   store and the terminal log bus
//! - Translate **UI intents** (millimeters) into engine calls (micrometers)
//!
//! ## Dependency rule
//! Depends on `plotter-domain` only (plus `tokio` for channels and tasks).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod intent;
pub mod log_bus;
pub mod ports;
pub mod services;
pub mod state_store;
