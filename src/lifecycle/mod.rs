//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Open append log → Start listeners
//!
//! Shutdown (shutdown.rs):
//!     SIGTERM/SIGINT → Stop accepting → Drain in-flight requests → Exit
//! ```
//!
//! # Design Decisions
//! - Ordered startup: config first, then the sink, then listeners, so a
//!   bad destination path fails before the port is taken
//! - Ordered shutdown: stop accept, drain, close
//! - In-flight requests finish their appends before the process exits

pub mod shutdown;

pub use shutdown::Shutdown;
