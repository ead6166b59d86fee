use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

/// Result type alias for operations that can produce a runtime error.
pub type RunResult<T> = Result<T, RunError>;

/// Exception types raised by the subscript layer and the object-model slots it calls.
///
/// Uses strum derives for automatic `Display`, `FromStr`, and `Into<&'static str>` implementations.
/// The string representation matches the variant name exactly (e.g., `IndexError` -> "IndexError").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize, Deserialize)]
pub enum ExcType {
    /// primary exception class - matches any exception in isinstance checks.
    Exception,

    // --- LookupError hierarchy ---
    /// Intermediate class for lookup errors.
    LookupError,
    /// Subclass of LookupError.
    IndexError,
    /// Subclass of LookupError.
    KeyError,

    // --- ArithmeticError hierarchy ---
    ArithmeticError,
    /// Subclass of ArithmeticError.
    OverflowError,

    TypeError,
    ValueError,
    MemoryError,
    /// Internal inconsistency, e.g. a slot reporting failure without recording an error.
    SystemError,
}

impl ExcType {
    /// Checks if this exception type is a subclass of another exception type.
    ///
    /// Returns true if `self` would be caught by `except handler_type:`.
    #[must_use]
    pub fn is_subclass_of(self, handler_type: Self) -> bool {
        if self == handler_type {
            return true;
        }
        match handler_type {
            // MemoryError derives from BaseException in spirit: resource exhaustion is never caught here
            Self::Exception => !matches!(self, Self::MemoryError),
            Self::LookupError => matches!(self, Self::KeyError | Self::IndexError),
            Self::ArithmeticError => matches!(self, Self::OverflowError),
            _ => false,
        }
    }

    /// Creates a TypeError with the given message.
    #[must_use]
    pub(crate) fn type_error(msg: impl Into<String>) -> RunError {
        RunError::TypeMismatch(SimpleException::new_msg(Self::TypeError, msg))
    }

    /// Creates a TypeError for reading an item from a type with no subscript capability.
    ///
    /// Format: `TypeError: '{type}' object is unsubscriptable`
    #[must_use]
    pub(crate) fn type_error_unsubscriptable(type_name: &str) -> RunError {
        Self::type_error(format!("'{type_name}' object is unsubscriptable"))
    }

    /// Creates a TypeError for an index-like key on a sequence type without an item slot.
    #[must_use]
    pub(crate) fn type_error_no_indexing(type_name: &str) -> RunError {
        Self::type_error(format!("'{type_name}' object does not support indexing"))
    }

    /// Creates a TypeError for item assignment on types that don't support it.
    ///
    /// Format: `TypeError: '{type}' object does not support item assignment`
    #[must_use]
    pub(crate) fn type_error_no_assignment(type_name: &str) -> RunError {
        Self::type_error(format!("'{type_name}' object does not support item assignment"))
    }

    /// Creates a TypeError for item deletion on types that don't support it.
    ///
    /// Format: `TypeError: '{type}' object does not support item deletion`
    #[must_use]
    pub(crate) fn type_error_no_deletion(type_name: &str) -> RunError {
        Self::type_error(format!("'{type_name}' object does not support item deletion"))
    }

    /// Creates a TypeError for a non-index key used against a sequence.
    ///
    /// Format: `TypeError: sequence index must be integer, not '{key type}'`
    #[must_use]
    pub(crate) fn type_error_sequence_index(key_type: &str) -> RunError {
        Self::type_error(format!("sequence index must be integer, not '{key_type}'"))
    }

    /// Creates an IndexError for an index-like value too large for a native index.
    ///
    /// Format: `IndexError: cannot fit 'int' into an index-sized integer`
    #[must_use]
    pub(crate) fn index_error_overflow(key_type: &str) -> RunError {
        RunError::IndexOutOfRange(SimpleException::new_msg(
            Self::IndexError,
            format!("cannot fit '{key_type}' into an index-sized integer"),
        ))
    }
}

/// A raised exception: its type plus the optional message argument.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SimpleException {
    exc_type: ExcType,
    arg: Option<String>,
}

impl SimpleException {
    #[must_use]
    pub fn new(exc_type: ExcType, arg: Option<String>) -> Self {
        Self { exc_type, arg }
    }

    #[must_use]
    pub fn new_msg(exc_type: ExcType, msg: impl Into<String>) -> Self {
        Self::new(exc_type, Some(msg.into()))
    }

    #[must_use]
    pub fn exc_type(&self) -> ExcType {
        self.exc_type
    }

    #[must_use]
    pub fn arg(&self) -> Option<&str> {
        self.arg.as_deref()
    }
}

impl Display for SimpleException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let type_str: &'static str = self.exc_type.into();
        match &self.arg {
            Some(arg) if !arg.is_empty() => write!(f, "{type_str}: {arg}"),
            _ => f.write_str(type_str),
        }
    }
}

/// The failure categories a subscript operation can end in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Index normalization or native-index conversion failed.
    IndexOutOfRange,
    /// The key type does not fit the target's capabilities, or the target has none.
    TypeMismatch,
    /// A collaborator slot recorded the error; its type and message are kept verbatim.
    PropagatedFailure,
    /// A configured resource limit was exceeded.
    ResourceExhausted,
}

/// Error returned by every public subscript entry point.
///
/// Every variant is fatal to the operation that produced it. The caller decides
/// whether to catch it (see [`ExcType::is_subclass_of`]) or let it unwind its unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    /// Raised by this layer while normalizing or converting an index.
    IndexOutOfRange(SimpleException),
    /// Raised by this layer when the key or target type cannot serve the operation.
    TypeMismatch(SimpleException),
    /// Translated from the pending error slot after a collaborator failed.
    Propagated(SimpleException),
    /// Resource limit exceeded; callers should not catch this.
    Uncatchable(SimpleException),
}

impl RunError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::IndexOutOfRange(_) => ErrorKind::IndexOutOfRange,
            Self::TypeMismatch(_) => ErrorKind::TypeMismatch,
            Self::Propagated(_) => ErrorKind::PropagatedFailure,
            Self::Uncatchable(_) => ErrorKind::ResourceExhausted,
        }
    }

    /// Returns the underlying exception regardless of how it was raised.
    #[must_use]
    pub fn exception(&self) -> &SimpleException {
        match self {
            Self::IndexOutOfRange(exc) | Self::TypeMismatch(exc) | Self::Propagated(exc) | Self::Uncatchable(exc) => {
                exc
            }
        }
    }

    #[must_use]
    pub fn into_exception(self) -> SimpleException {
        match self {
            Self::IndexOutOfRange(exc) | Self::TypeMismatch(exc) | Self::Propagated(exc) | Self::Uncatchable(exc) => {
                exc
            }
        }
    }

    #[must_use]
    pub fn exc_type(&self) -> ExcType {
        self.exception().exc_type()
    }

    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.exception().arg()
    }
}

impl Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        Display::fmt(self.exception(), f)
    }
}

impl std::error::Error for RunError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_error_catches_index_and_key_errors() {
        assert!(ExcType::IndexError.is_subclass_of(ExcType::LookupError));
        assert!(ExcType::KeyError.is_subclass_of(ExcType::LookupError));
        assert!(!ExcType::TypeError.is_subclass_of(ExcType::LookupError));
        assert!(ExcType::TypeError.is_subclass_of(ExcType::Exception));
        assert!(!ExcType::MemoryError.is_subclass_of(ExcType::Exception));
    }

    #[test]
    fn display_matches_python_traceback_line() {
        let err = RunError::IndexOutOfRange(SimpleException::new_msg(ExcType::IndexError, "list index out of range"));
        assert_eq!(err.to_string(), "IndexError: list index out of range");
        assert_eq!(err.kind(), ErrorKind::IndexOutOfRange);

        let bare = SimpleException::new(ExcType::KeyError, None);
        assert_eq!(bare.to_string(), "KeyError");
    }

    #[test]
    fn exc_type_parses_from_name() {
        let parsed: ExcType = "TypeError".parse().unwrap();
        assert_eq!(parsed, ExcType::TypeError);
    }
}
