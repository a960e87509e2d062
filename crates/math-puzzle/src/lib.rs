//! Arithmetic combine-the-pieces puzzles.
//!
//! A puzzle is a handful of integer pieces, a pool of binary operators and
//! a goal. Pieces are combined two at a time until one is left; the puzzle
//! is won if that piece equals the goal. This crate models the puzzle
//! state, exhaustively solves it, and generates random puzzles that the
//! solver has checked.

pub mod error;
pub mod generator;
pub mod operator;
pub mod puzzle;
pub mod solver;

// Re-export main types
pub use error::{CombineError, PuzzleError};
pub use generator::{generate_solvable, survey, GeneratedPuzzle, GeneratorConfig, SurveyReport};
pub use operator::Operator;
pub use puzzle::{
    Move, PuzzleDescription, PuzzleState, MAX_OPS, MAX_PIECES, MAX_PIECE_SIZE, MIN_PIECE_SIZE,
};
pub use solver::{solve, solve_with_config, verify_solution, SolverConfig, SolverResult};
