//! # plotter-domain
//!
//! Pure domain model for driving an HPGL-class pen plotter.
//!
//! ## Responsibilities
//! - Foundational types: error conventions, timestamps, unit conversion
//! - Define **Positions** (integer micrometers) and the **Workspace** guard
//! - Define **DeviceState** (position, pen, motor) and connection **Mode**
//! - Define **SessionConfig** (serial framing for one connection)
//! - Define **Commands** (tagged HPGL statements) and their wire encoding
//! - Decode **position reports** sent back by the device
//! - Define **CommandRecord** entries for the terminal log
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod time;
pub mod units;

pub mod command;
pub mod command_record;
pub mod device_state;
pub mod mode;
pub mod position;
pub mod report;
pub mod session_config;
pub mod workspace;
