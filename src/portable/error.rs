//! Parse errors
//!
//! Parsing itself never fails: malformed input is folded into the tree as
//! `ERROR` tokens and erroneous nodes. A [`ParseError`] only describes why the
//! engine stopped early (a budget, a limit or a broken grammar). It is kept on
//! the resulting tree as its stop reason.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reason a parse was cut short
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParseError {
    /// Input exceeds the configured size limit
    InputTooLarge {
        /// Size of the input in bytes
        input_size: usize,
        /// Configured maximum
        max_size: usize,
    },

    /// Rule nesting exceeded the configured depth
    RecursionLimitExceeded {
        /// Depth reached
        depth: usize,
        /// Configured maximum
        max_depth: usize,
    },

    /// Operation budget exhausted
    OperationLimitExceeded {
        /// Operations performed
        operations: usize,
        /// Configured maximum
        max_operations: usize,
    },

    /// A rule was invoked past the configured byte offset
    ByteOffsetLimitExceeded {
        /// Offset reached
        offset: usize,
        /// Configured maximum
        max_offset: usize,
    },

    /// Wall clock budget exhausted
    TimeoutExceeded {
        /// Elapsed time in milliseconds
        elapsed_ms: u64,
        /// Configured timeout in milliseconds
        timeout_ms: u64,
    },

    /// The grammar is not usable by the engine
    InvalidGrammar {
        /// What is wrong with it
        reason: String,
    },

    /// Internal inconsistency
    Internal {
        /// Description
        message: String,
    },
}

impl ParseError {
    /// Budget errors are expected under load; the others point at a bug
    pub fn is_budget(&self) -> bool {
        matches!(
            self,
            ParseError::InputTooLarge { .. }
                | ParseError::RecursionLimitExceeded { .. }
                | ParseError::OperationLimitExceeded { .. }
                | ParseError::ByteOffsetLimitExceeded { .. }
                | ParseError::TimeoutExceeded { .. }
        )
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::InputTooLarge {
                input_size,
                max_size,
            } => {
                write!(
                    f,
                    "Input too large: {} bytes exceeds limit of {} bytes",
                    input_size, max_size
                )
            }
            ParseError::RecursionLimitExceeded { depth, max_depth } => {
                write!(
                    f,
                    "Recursion limit exceeded: depth {} exceeds limit of {}",
                    depth, max_depth
                )
            }
            ParseError::OperationLimitExceeded {
                operations,
                max_operations,
            } => {
                write!(
                    f,
                    "Operation limit exceeded: {} operations exceeds limit of {}",
                    operations, max_operations
                )
            }
            ParseError::ByteOffsetLimitExceeded { offset, max_offset } => {
                write!(
                    f,
                    "Byte offset limit exceeded: offset {} exceeds limit of {}",
                    offset, max_offset
                )
            }
            ParseError::TimeoutExceeded {
                elapsed_ms,
                timeout_ms,
            } => {
                write!(
                    f,
                    "Timeout exceeded: {}ms exceeds limit of {}ms",
                    elapsed_ms, timeout_ms
                )
            }
            ParseError::InvalidGrammar { reason } => {
                write!(f, "Invalid grammar: {}", reason)
            }
            ParseError::Internal { message } => {
                write!(f, "Internal error: {}", message)
            }
        }
    }
}

impl std::error::Error for ParseError {}
