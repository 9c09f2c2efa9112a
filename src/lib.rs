//! Driver core for the Microchip MCP23x17 16-bit GPIO expander acting as a cascaded
//! interrupt controller.
//!
//! The driver keeps a shadow copy of the chip registers so that pin operations only cost
//! one bus write, batches interrupt configuration changes into a single commit, and
//! classifies fired pins from the captured `INTF`/`INTCAP` registers when the expander's
//! interrupt line asserts.
//!
//! ```ignore
//! use port_expander_irq::{Config, Mcp23x17};
//!
//! let expander = Mcp23x17::probe_mcp23017(i2c, false, false, false, &Config::default())?;
//! let parts = expander.split();
//! let mut led = parts.gpa0.into_output()?;
//! led.set_high()?;
//! ```
#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![warn(missing_docs)]

mod common;
mod config;
pub mod dev;
mod error;
mod isr;
mod mutex;
mod pin;

pub use common::mode;
pub use common::trigger;
pub use common::Direction;
pub use common::GpioChip;
pub use common::GpioChipInfo;
pub use common::InterruptType;
pub use common::IrqBatch;
pub use common::IrqChip;
pub use config::{ArrayConfig, Config};
pub use error::{CommitErrors, Error, ProbeStep};
pub use isr::{ExtIPin, Handled, IrqDomain, IrqHandler, IrqThread, LinearIrqDomain, PinIrqWakers};
pub use mutex::PortMutex;
pub use pin::Pin;

pub(crate) use common::PortDriver;
pub(crate) use common::PortDriverIrq;
pub(crate) use common::PortDriverTotemPole;

pub use dev::mcp23x17::IrqBusLock;
pub use dev::mcp23x17::Mcp23s17Array;
pub use dev::mcp23x17::Mcp23x17;
pub use dev::mcp23x17::Parts;
#[cfg(feature = "std")]
pub use dev::mcp23x17::SyncMcp23x17;
