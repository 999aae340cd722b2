//! Turning drawings and jog commands into Scribit motion programs.
//!
//! The pieces, roughly from the bottom up:
//!
//! - [`Carousel`] tracks the commanded carousel angle, and makes sure that
//!   automated pen changes only ever rotate counter-clockwise.
//! - [`ProgramBuilder`] assembles motion programs out of blocks (setup,
//!   cord moves, carousel moves, pen selection, homing, dwells).
//! - [`sampler`] turns curves into dense polylines.
//! - [`drawing`] runs a whole graphic through the above, producing a
//!   calibration program and a drawing program.
//! - [`ProgramCache`] and [`JogSession`] serve the discrete jog commands.

use std::sync::{Mutex, MutexGuard, PoisonError};

use scribit_geom::ConfigError;
use scribit_protocol::{CommandId, ProtocolError};

pub mod cache;
pub mod carousel;
pub mod drawing;
pub mod program;
pub mod sampler;
pub mod session;

pub use cache::ProgramCache;
pub use carousel::{Carousel, HOME_ANGLE};
pub use drawing::{convert, DrawingConfig, FitTransform, PenStroke, Programs};
pub use program::ProgramBuilder;
pub use sampler::{sample_uniform, Curve, Stroke};
pub use session::JogSession;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("nothing to draw: {0}")]
    DegenerateInput(&'static str),
    #[error("unknown command {0:?}")]
    UnknownCommand(String),
    #[error("{0} depends on the carousel angle, so it can't come from the cache")]
    DynamicCommand(CommandId),
    #[error("{0} doesn't depend on the carousel angle, so it comes from the cache")]
    StaticCommand(CommandId),
    #[error("no program has been generated for {0} yet")]
    NotGenerated(CommandId),
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Error::InvalidConfiguration(e.to_string())
    }
}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        match e {
            ProtocolError::UnknownCommand(name) => Error::UnknownCommand(name),
            e => Error::InvalidConfiguration(e.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

// None of our critical sections can leave the protected data half-written, so
// a poisoned lock is still safe to use.
pub(crate) fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
