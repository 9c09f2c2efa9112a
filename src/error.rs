use core::fmt;

use crate::dev::mcp23x17::Reg;

/// Errors of the expander driver, generic over the bus error `E`.
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum Error<E> {
    /// A bus transfer failed.  Never retried by the driver.
    #[error("bus transfer failed: {0:?}")]
    Transport(E),
    /// Pin index outside `0..16`.
    #[error("pin {0} out of range")]
    InvalidPin(u8),
    /// Trigger flags that name none of the supported triggers.
    #[error("unsupported interrupt trigger flags {0:#x}")]
    InvalidTrigger(u32),
    /// Burst read range that runs past the register map.
    #[error("register range {start:?}+{count} runs past the register map")]
    RegisterRange {
        /// First register of the range.
        start: Reg,
        /// Number of registers requested.
        count: usize,
    },
    /// Hardware address or present mask outside the chip's address space.
    #[error("hardware address {0:#x} out of range")]
    InvalidAddress(u32),
    /// Interrupt delivery requested on a chip without the interrupt-controller role.
    #[error("chip is not configured as interrupt controller")]
    NoIrqController,
    /// Bring-up failed; the chip was not published.
    #[error("probe failed at {step}: {cause:?}")]
    Probe {
        /// Step that failed.
        step: ProbeStep,
        /// Bus error of the failed step.
        cause: E,
    },
    /// Some of the interrupt configuration writes of a commit failed.
    #[error("{0}")]
    Commit(CommitErrors<E>),
}

impl<E> Error<E> {
    pub(crate) fn probe(step: ProbeStep) -> impl FnOnce(Error<E>) -> Error<E> {
        move |e| match e {
            Error::Transport(cause) => Error::Probe { step, cause },
            other => other,
        }
    }
}

impl<E: fmt::Debug> embedded_hal::digital::Error for Error<E> {
    fn kind(&self) -> embedded_hal::digital::ErrorKind {
        embedded_hal::digital::ErrorKind::Other
    }
}

/// Bring-up step, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeStep {
    /// Reading `IOCON`.
    ReadIocon,
    /// Writing the corrected `IOCON`.
    WriteIocon,
    /// Writing the pull-up mask to `GPPU`.
    Pullups,
    /// Loading the register cache.
    LoadCache,
    /// Clearing `IPOL`.
    ClearPolarity,
    /// Clearing `GPINTEN`.
    ClearIrqEnable,
}

impl fmt::Display for ProbeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ProbeStep::ReadIocon => "IOCON read",
            ProbeStep::WriteIocon => "IOCON write",
            ProbeStep::Pullups => "GPPU write",
            ProbeStep::LoadCache => "register cache load",
            ProbeStep::ClearPolarity => "IPOL clear",
            ProbeStep::ClearIrqEnable => "GPINTEN clear",
        };
        f.write_str(s)
    }
}

/// Failed writes of one interrupt configuration commit.
///
/// A `None` entry was written successfully.
#[derive(Debug, PartialEq)]
pub struct CommitErrors<E> {
    /// Result of the `GPINTEN` write.
    pub gpinten: Option<E>,
    /// Result of the `DEFVAL` write.
    pub defval: Option<E>,
    /// Result of the `INTCON` write.
    pub intcon: Option<E>,
}

impl<E> CommitErrors<E> {
    /// Number of writes that failed.
    pub fn failed(&self) -> usize {
        [self.gpinten.is_some(), self.defval.is_some(), self.intcon.is_some()]
            .into_iter()
            .filter(|f| *f)
            .count()
    }
}

impl<E: fmt::Debug> fmt::Display for CommitErrors<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "interrupt config commit failed ({} of 3 writes)", self.failed())?;
        for (name, err) in [("GPINTEN", &self.gpinten), ("DEFVAL", &self.defval), ("INTCON", &self.intcon)] {
            if let Some(err) = err {
                write!(f, "; {name}: {err:?}")?;
            }
        }
        Ok(())
    }
}
