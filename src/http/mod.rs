//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, middleware stack)
//!     → interceptor.rs (timing, outcome capture, record per round trip)
//!     → handlers.rs (track_event / health / contact)
//!     → telemetry::sink (one JSON line per record)
//!     → Send response to client
//! ```

pub mod handlers;
pub mod interceptor;
pub mod server;

pub use server::{AppState, HttpServer, RuntimeOptions, ServerError};
