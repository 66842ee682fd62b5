//! Cross-messenger message types + the outbound messaging port.

pub mod port;
pub mod types;
