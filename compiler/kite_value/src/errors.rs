//! Evaluation errors and control-flow signals.
//!
//! # Structured Error Categories
//!
//! `EvalErrorKind` is the typed taxonomy callers match on. Factory functions
//! (`undefined_symbol`, `index_out_of_range`, ...) are the public way to build
//! errors; they fill both `kind` and `message`.
//!
//! # Control Flow
//!
//! `break`, `continue` and `return` are not errors. They travel in
//! [`ControlAction`] next to `Error`, so `?` carries all four out of nested
//! evaluation and each construct consumes only the signals it owns.

use std::fmt;

use kite_ir::Position;

use crate::value::Value;

/// Why a run was interrupted.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum InterruptReason {
    /// The host (or the run itself) cancelled execution.
    Cancelled,
    /// The configured step budget was exhausted.
    StepBudget,
}

impl fmt::Display for InterruptReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cancelled => write!(f, "execution cancelled"),
            Self::StepBudget => write!(f, "step budget exceeded"),
        }
    }
}

/// Typed error category.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EvalErrorKind {
    /// A tree shape the evaluator refuses (e.g. `select` on a non-identifier).
    SyntaxRejection,
    UndefinedSymbol {
        name: String,
    },
    InvalidOperation,
    IndexOutOfRange {
        index: i64,
        len: usize,
    },
    ArgumentCountMismatch {
        expected: usize,
        got: usize,
    },
    ArgumentTypeMismatch {
        expected: String,
        got: String,
    },
    TypeConversionFailure {
        from: String,
        to: String,
    },
    /// Cancellation or budget exhaustion. Never caught by `try`.
    Interrupted {
        reason: InterruptReason,
    },
    /// Raised by a script `throw`.
    Thrown,
    /// Returned by a host function.
    Host,
    /// A host function panicked and the panic was recovered.
    Panic,
}

/// Evaluation error.
#[derive(Clone, Debug, PartialEq)]
pub struct EvalError {
    pub kind: EvalErrorKind,
    /// Human-readable message, without position.
    pub message: String,
    /// Position of the innermost node the error escaped from.
    pub pos: Option<Position>,
}

impl EvalError {
    /// Create an error with an explicit kind and message.
    pub fn new(kind: EvalErrorKind, message: impl Into<String>) -> Self {
        EvalError {
            kind,
            message: message.into(),
            pos: None,
        }
    }

    /// Attach a position unless one is already present.
    ///
    /// Errors are tagged once, by the innermost node they leave.
    #[must_use]
    pub fn tag(mut self, pos: Position) -> Self {
        if self.pos.is_none() && pos.is_known() {
            self.pos = Some(pos);
        }
        self
    }

    /// Whether this error ends the run regardless of `try`.
    #[inline]
    pub fn is_interrupted(&self) -> bool {
        matches!(self.kind, EvalErrorKind::Interrupted { .. })
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.pos {
            Some(pos) => write!(f, "{pos}: {}", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for EvalError {}

/// Non-local exits produced while evaluating.
#[derive(Clone, Debug)]
pub enum ControlAction {
    Break,
    Continue,
    Return(Value),
    Error(EvalError),
}

impl ControlAction {
    /// Tag a carried error with `pos`; signals pass unchanged.
    #[must_use]
    pub fn tag(self, pos: Position) -> Self {
        match self {
            ControlAction::Error(e) => ControlAction::Error(e.tag(pos)),
            other => other,
        }
    }

    /// Whether this is an interrupt error.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, ControlAction::Error(e) if e.is_interrupted())
    }
}

impl From<EvalError> for ControlAction {
    #[inline]
    fn from(e: EvalError) -> Self {
        ControlAction::Error(e)
    }
}

/// Result of evaluating an expression or statement.
pub type EvalResult<T = Value> = Result<T, ControlAction>;

// Factories

#[cold]
pub fn syntax_rejection(message: impl Into<String>) -> EvalError {
    EvalError::new(EvalErrorKind::SyntaxRejection, message)
}

#[cold]
pub fn undefined_symbol(name: &str) -> EvalError {
    EvalError::new(
        EvalErrorKind::UndefinedSymbol {
            name: name.to_string(),
        },
        format!("undefined symbol '{name}'"),
    )
}

#[cold]
pub fn undefined_type(name: &str) -> EvalError {
    EvalError::new(
        EvalErrorKind::UndefinedSymbol {
            name: name.to_string(),
        },
        format!("undefined type '{name}'"),
    )
}

#[cold]
pub fn invalid_operation(message: impl Into<String>) -> EvalError {
    EvalError::new(EvalErrorKind::InvalidOperation, message)
}

#[cold]
pub fn index_out_of_range(index: i64, len: usize) -> EvalError {
    EvalError::new(
        EvalErrorKind::IndexOutOfRange { index, len },
        format!("index {index} out of range (len {len})"),
    )
}

#[cold]
pub fn argument_count_mismatch(expected: usize, got: usize) -> EvalError {
    let word = if expected == 1 { "argument" } else { "arguments" };
    EvalError::new(
        EvalErrorKind::ArgumentCountMismatch { expected, got },
        format!("function wants {expected} {word} but received {got}"),
    )
}

#[cold]
pub fn argument_type_mismatch(expected: &str, got: &str) -> EvalError {
    EvalError::new(
        EvalErrorKind::ArgumentTypeMismatch {
            expected: expected.to_string(),
            got: got.to_string(),
        },
        format!("function wants argument type {expected} but received type {got}"),
    )
}

#[cold]
pub fn type_conversion_failure(from: &str, to: &str) -> EvalError {
    EvalError::new(
        EvalErrorKind::TypeConversionFailure {
            from: from.to_string(),
            to: to.to_string(),
        },
        format!("type {from} cannot be converted to type {to}"),
    )
}

#[cold]
pub fn interrupted(reason: InterruptReason) -> EvalError {
    EvalError::new(EvalErrorKind::Interrupted { reason }, reason.to_string())
}

#[cold]
pub fn thrown(message: impl Into<String>) -> EvalError {
    EvalError::new(EvalErrorKind::Thrown, message)
}

#[cold]
pub fn host_error(message: impl Into<String>) -> EvalError {
    EvalError::new(EvalErrorKind::Host, message)
}

#[cold]
pub fn host_panic(function: &str, payload: &str) -> EvalError {
    EvalError::new(
        EvalErrorKind::Panic,
        format!("function {function} panicked: {payload}"),
    )
}

// Common invalid operations

#[cold]
pub fn division_by_zero() -> EvalError {
    invalid_operation("integer divide by zero")
}

#[cold]
pub fn not_callable(type_name: &str) -> EvalError {
    invalid_operation(format!("cannot call type {type_name}"))
}

#[cold]
pub fn unhashable_key(type_name: &str) -> EvalError {
    invalid_operation(format!("unhashable map key type {type_name}"))
}

#[cold]
pub fn nil_dereference() -> EvalError {
    invalid_operation("invalid memory address or nil pointer dereference")
}

#[cold]
pub fn send_on_closed_channel() -> EvalError {
    invalid_operation("send on closed channel")
}

#[cold]
pub fn no_member(type_name: &str, member: &str) -> EvalError {
    invalid_operation(format!("no member named '{member}' for {type_name}"))
}

#[cold]
pub fn unexported_member(member: &str) -> EvalError {
    invalid_operation(format!("cannot access unexported member '{member}'"))
}

#[cold]
pub fn invalid_assignment_target() -> EvalError {
    invalid_operation("invalid assignment target")
}

#[cold]
pub fn unsupported_operand(op: &str, type_name: &str) -> EvalError {
    invalid_operation(format!("operator {op} not supported for type {type_name}"))
}

#[cfg(test)]
mod tests;
