//! Supported chips.

pub mod mcp23x17;
