//! The pending error slot and its translator.
//!
//! Object-model slots report failure the way C extension functions do: they record
//! an exception in a single per-runtime slot and return a failure marker. The
//! subscript dispatchers observe the marker, take the recorded exception out of the
//! slot and turn it into a [`RunError::Propagated`]. The slot is owned by the
//! [`Runtime`](crate::Runtime), so it is scoped to whichever thread drives that runtime.

use crate::exception::{ExcType, RunError, SimpleException};

/// Failure marker returned by object-model slots.
///
/// Only [`PendingError::set`] can construct one, so a slot cannot report failure
/// without recording an exception first.
#[derive(Debug, PartialEq, Eq)]
#[must_use = "a raised error must be returned to the dispatcher"]
pub struct Raised(());

/// Result type for object-model slots: success value or the [`Raised`] marker.
pub type SlotResult<T> = Result<T, Raised>;

/// Single-slot error state shared by all slots invoked through one runtime.
#[derive(Debug, Default)]
pub struct PendingError {
    slot: Option<SimpleException>,
}

impl PendingError {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `exc` as the pending error, replacing any earlier one, and returns the failure marker.
    pub fn set(&mut self, exc: SimpleException) -> Raised {
        self.slot = Some(exc);
        Raised(())
    }

    /// Records an exception of `exc_type` with message `msg`.
    pub fn set_msg(&mut self, exc_type: ExcType, msg: impl Into<String>) -> Raised {
        self.set(SimpleException::new_msg(exc_type, msg))
    }

    /// Type of the pending error, if any.
    #[must_use]
    pub fn occurred(&self) -> Option<ExcType> {
        self.slot.as_ref().map(SimpleException::exc_type)
    }

    #[must_use]
    pub fn is_set(&self) -> bool {
        self.slot.is_some()
    }

    /// Takes the pending error out of the slot, leaving it empty.
    pub fn fetch(&mut self) -> Option<SimpleException> {
        self.slot.take()
    }

    /// Converts the pending error into a propagating [`RunError`] and clears the slot.
    ///
    /// The recorded type and message are kept verbatim. A failure reported with an
    /// empty slot becomes a `SystemError` rather than an invented domain message.
    pub fn translate(&mut self, _raised: Raised) -> RunError {
        let exc = self
            .fetch()
            .unwrap_or_else(|| SimpleException::new_msg(ExcType::SystemError, "error return without exception set"));
        RunError::Propagated(exc)
    }
}
