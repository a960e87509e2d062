//! Random puzzle generation.
//!
//! All randomness comes from a caller-supplied [`Rng`], so a seeded
//! generator reproduces the same puzzles (and the same solver verdicts).

use rand::Rng;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::PuzzleError;
use crate::operator::Operator;
use crate::puzzle::{Move, PuzzleState, MAX_PIECES, MAX_PIECE_SIZE};
use crate::solver::{solve_with_config, SolverConfig};

/// Parameters for random puzzles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratorConfig {
    /// Lowest goal (inclusive)
    pub min_goal: i32,
    /// Highest goal (exclusive)
    pub max_goal: i32,
    pub num_pieces: usize,
    /// Pieces are drawn from `1..=max_piece`
    pub max_piece: i32,
    /// How many puzzles to try before accepting one that was not shown to
    /// be solvable
    pub max_attempts: usize,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            min_goal: 20,
            max_goal: 70,
            num_pieces: 5,
            max_piece: 6,
            max_attempts: 20,
        }
    }
}

impl GeneratorConfig {
    pub fn validate(&self) -> Result<(), PuzzleError> {
        if self.min_goal >= self.max_goal {
            return Err(PuzzleError::InvalidConfiguration {
                message: format!(
                    "goal range [{}, {}) is empty",
                    self.min_goal, self.max_goal
                ),
            });
        }
        if self.num_pieces == 0 || self.num_pieces > MAX_PIECES {
            return Err(PuzzleError::InvalidConfiguration {
                message: format!(
                    "piece count {} must be between 1 and {MAX_PIECES}",
                    self.num_pieces
                ),
            });
        }
        if self.max_piece < 1 || self.max_piece > MAX_PIECE_SIZE {
            return Err(PuzzleError::InvalidConfiguration {
                message: format!(
                    "max piece {} must be between 1 and {MAX_PIECE_SIZE}",
                    self.max_piece
                ),
            });
        }
        Ok(())
    }
}

impl PuzzleState {
    /// A random puzzle with the default operators, all reusable.
    ///
    /// The goal is uniform in `[min_goal, max_goal)` and each piece is
    /// uniform in `[1, max_piece]`.
    pub fn random<R: Rng + ?Sized>(
        config: &GeneratorConfig,
        rng: &mut R,
    ) -> Result<Self, PuzzleError> {
        config.validate()?;
        let goal = rng.random_range(config.min_goal..config.max_goal);
        let pieces: Vec<i32> = (0..config.num_pieces)
            .map(|_| rng.random_range(1..=config.max_piece))
            .collect();
        PuzzleState::new(pieces, Operator::DEFAULTS, goal, true)
    }
}

/// A generated puzzle and what the solver said about it
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedPuzzle {
    pub puzzle: PuzzleState,
    /// Whether the solver proved the puzzle solvable
    pub verified: bool,
    pub attempts: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub solution: Option<Vec<Move>>,
}

/// Generate puzzles until the solver finds one solvable.
///
/// After `max_attempts` failures the last rejected puzzle is returned with
/// `verified == false`, so generation always terminates. With
/// `max_attempts == 0` a single unchecked puzzle is returned.
pub fn generate_solvable<R: Rng + ?Sized>(
    config: &GeneratorConfig,
    solver_config: &SolverConfig,
    rng: &mut R,
) -> Result<GeneratedPuzzle, PuzzleError> {
    config.validate()?;

    let mut last_rejected = None;
    for attempt in 1..=config.max_attempts {
        let puzzle = PuzzleState::random(config, rng)?;
        let result = solve_with_config(&puzzle, solver_config);

        if let Some(solution) = result.solution {
            debug!(attempt, %puzzle, "generated solvable puzzle");
            return Ok(GeneratedPuzzle {
                puzzle,
                verified: true,
                attempts: attempt,
                solution: Some(solution),
            });
        }
        debug!(
            attempt,
            %puzzle,
            inconclusive = !result.search_exhausted,
            "rejected puzzle"
        );
        last_rejected = Some(puzzle);
    }

    warn!(
        attempts = config.max_attempts,
        "no solvable puzzle found; accepting an unverified one"
    );
    let puzzle = match last_rejected {
        Some(puzzle) => puzzle,
        None => PuzzleState::random(config, rng)?,
    };
    Ok(GeneratedPuzzle {
        puzzle,
        verified: false,
        attempts: config.max_attempts,
        solution: None,
    })
}

/// How many random puzzles turned out to be solvable
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SurveyReport {
    pub tried: usize,
    pub solvable: usize,
    /// Searches cut short by the solver budget
    pub inconclusive: usize,
}

impl SurveyReport {
    pub fn solvable_percent(&self) -> f64 {
        if self.tried == 0 {
            0.0
        } else {
            self.solvable as f64 / self.tried as f64 * 100.0
        }
    }
}

/// Roll `reps` random puzzles and count the solvable ones.
pub fn survey<R: Rng + ?Sized>(
    config: &GeneratorConfig,
    solver_config: &SolverConfig,
    reps: usize,
    rng: &mut R,
) -> Result<SurveyReport, PuzzleError> {
    let mut report = SurveyReport::default();
    for rep in 0..reps {
        let puzzle = PuzzleState::random(config, rng)?;
        let result = solve_with_config(&puzzle, solver_config);
        debug!(rep, solvable = result.is_solvable(), "survey roll");

        report.tried += 1;
        if result.is_solvable() {
            report.solvable += 1;
        } else if result.is_inconclusive() {
            report.inconclusive += 1;
        }
    }
    Ok(report)
}
