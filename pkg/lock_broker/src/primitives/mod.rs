//! The two lock primitives behind the directory's entries.
//!
//! Both primitives are modeled as a tagged variant rather than a trait
//! object so the acquire path branches on the tag and never pays for a
//! virtual call on the hot path.

mod rw_exclusion;
mod shared;

pub use rw_exclusion::RwExclusion;
pub use shared::SharedExclusion;

use std::time::Duration;

use crate::cancel::CancelToken;
use crate::error::{BrokerError, Result};

/// The two admission modes a caller may request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Read,
    Write,
}

impl Mode {
    pub fn other(self) -> Mode {
        match self {
            Mode::Read => Mode::Write,
            Mode::Write => Mode::Read,
        }
    }
}

/// The concrete lock primitive an entry owns, selected by `TokenKind` at
/// entry-creation time.
pub enum Primitive {
    Ordinary(RwExclusion),
    Shared(SharedExclusion),
}

impl Primitive {
    pub fn ordinary() -> Self {
        Primitive::Ordinary(RwExclusion::new())
    }

    pub fn shared() -> Self {
        Primitive::Shared(SharedExclusion::new())
    }

    pub fn acquire(&self, mode: Mode) {
        match self {
            Primitive::Ordinary(p) => p.acquire(mode),
            Primitive::Shared(p) => p.acquire(mode),
        }
    }

    pub fn try_acquire(&self, mode: Mode) -> bool {
        match self {
            Primitive::Ordinary(p) => p.try_acquire(mode),
            Primitive::Shared(p) => p.try_acquire(mode),
        }
    }

    pub fn acquire_timeout(&self, mode: Mode, timeout: Duration) -> Result<()> {
        let acquired = match self {
            Primitive::Ordinary(p) => p.acquire_timeout(mode, timeout),
            Primitive::Shared(p) => p.acquire_timeout(mode, timeout),
        };
        if acquired {
            Ok(())
        } else {
            Err(BrokerError::TimedOut(timeout))
        }
    }

    pub fn acquire_interruptible(&self, mode: Mode, cancel: &CancelToken) -> Result<()> {
        let acquired = match self {
            Primitive::Ordinary(p) => p.acquire_interruptible(mode, cancel),
            Primitive::Shared(p) => p.acquire_interruptible(mode, cancel),
        };
        if acquired {
            Ok(())
        } else {
            Err(BrokerError::Interrupted)
        }
    }

    pub fn release(&self, mode: Mode) {
        match self {
            Primitive::Ordinary(p) => p.release(mode),
            Primitive::Shared(p) => p.release(mode),
        }
    }
}
