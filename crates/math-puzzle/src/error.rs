//! Error types for puzzle moves and puzzle construction.

use thiserror::Error;

/// Why a single combine was rejected.
///
/// Every variant is a move-legality failure. The solver treats all of them
/// as a dead branch; interactive callers show them to the player.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CombineError {
    #[error("division by zero")]
    DivideByZero,

    #[error("{dividend} is not evenly divisible by {divisor}")]
    NonIntegerResult { dividend: i32, divisor: i32 },

    #[error("result {value} is outside [-999, 999]")]
    OutOfRange { value: i64 },

    #[error("unknown operator code '{code}'")]
    InvalidOperatorCode { code: String },

    #[error("piece index {index} is out of range ({len} pieces)")]
    PieceIndexOutOfRange { index: usize, len: usize },

    #[error("operator index {index} is out of range ({len} operators)")]
    OperatorIndexOutOfRange { index: usize, len: usize },

    #[error("cannot combine piece {index} with itself")]
    SameOperand { index: usize },

    #[error("only one piece remains")]
    TerminalState,
}

/// Why a puzzle could not be constructed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PuzzleError {
    #[error("a puzzle needs at least one piece")]
    NoPieces,

    #[error("{count} pieces exceeds the maximum of 10")]
    TooManyPieces { count: usize },

    #[error("{count} operators exceeds the maximum of 10")]
    TooManyOperators { count: usize },

    #[error("piece {value} is outside [-999, 999]")]
    PieceOutOfRange { value: i32 },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error(transparent)]
    Combine(#[from] CombineError),
}

/// Convenience alias for construction results.
pub type Result<T> = std::result::Result<T, PuzzleError>;
