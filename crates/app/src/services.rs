//! Application services.
//!
//! The session engine accepts its transport via a generic parameter
//! (constructor injection), keeping this layer decoupled from concrete adapters.

mod receive_loop;
pub mod session_engine;

pub use session_engine::{PlotterSession, SessionOptions};
