//! Process-wide tracing setup shared by the binaries.

pub mod subscriber;

pub use subscriber::{DEFAULT_FILTER, init, init_with};
