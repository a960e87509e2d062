//! Exhaustive depth-first solver.
//!
//! Every branch works on its own [`PuzzleState`] snapshot obtained from
//! [`PuzzleState::after_combine`], so backtracking needs no undo. Illegal
//! combines (division by zero, fractions, out-of-range results) prune the
//! branch and the search moves on to the next candidate.
//!
//! Candidates are tried in a fixed order: ascending first index, then
//! ascending second index, then ascending operator index, the direct move
//! before its mirror. The mirror is only tried for non-commutative
//! operators. The first solution found is returned; it is not necessarily
//! the shortest.

use std::collections::HashSet;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::error::CombineError;
use crate::puzzle::{Move, Operators, Pieces, PuzzleState};

/// Configuration for the solver
#[derive(Debug, Clone, Default)]
pub struct SolverConfig {
    /// Give up after this much wall-clock time
    pub timeout: Option<Duration>,
    /// Give up after visiting this many positions
    pub max_nodes: Option<usize>,
    /// Remember fully explored dead positions and skip them when they are
    /// reached again by a different move order
    pub memoize_dead_states: bool,
}

impl SolverConfig {
    /// No budget and no memoization.
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_max_nodes(mut self, max_nodes: usize) -> Self {
        self.max_nodes = Some(max_nodes);
        self
    }

    pub fn with_memoization(mut self, enabled: bool) -> Self {
        self.memoize_dead_states = enabled;
        self
    }
}

/// Result of the solver search
#[derive(Debug, Clone)]
pub struct SolverResult {
    /// Moves that win the puzzle, in the order they are applied
    pub solution: Option<Vec<Move>>,
    /// Whether the search finished without running out of budget
    pub search_exhausted: bool,
    /// Number of positions visited
    pub nodes_explored: usize,
    /// Time elapsed in milliseconds
    pub time_elapsed_ms: u64,
}

impl SolverResult {
    pub fn is_solvable(&self) -> bool {
        self.solution.is_some()
    }

    /// The budget ran out before the puzzle was solved or proven unsolvable.
    pub fn is_inconclusive(&self) -> bool {
        self.solution.is_none() && !self.search_exhausted
    }
}

enum Outcome {
    /// Winning moves from this position, last move first
    Solved(Vec<Move>),
    Dead,
    OutOfBudget,
}

struct Search<'a> {
    config: &'a SolverConfig,
    deadline: Option<Instant>,
    nodes: usize,
    dead: HashSet<(Pieces, Operators)>,
}

impl Search<'_> {
    fn budget_spent(&self) -> bool {
        if let Some(max_nodes) = self.config.max_nodes {
            if self.nodes >= max_nodes {
                return true;
            }
        }
        self.deadline.is_some_and(|deadline| Instant::now() > deadline)
    }

    fn explore(&mut self, state: &PuzzleState) -> Outcome {
        self.nodes += 1;

        if state.is_terminal() {
            return if state.is_won() {
                Outcome::Solved(Vec::new())
            } else {
                Outcome::Dead
            };
        }

        if self.budget_spent() {
            return Outcome::OutOfBudget;
        }

        let key = self
            .config
            .memoize_dead_states
            .then(|| state.canonical_key());
        if let Some(key) = &key {
            if self.dead.contains(key) {
                return Outcome::Dead;
            }
        }

        let num_pieces = state.num_pieces();
        for i in 0..num_pieces {
            for j in (i + 1)..num_pieces {
                for (k, op) in state.operators().iter().enumerate() {
                    let direct = Move::new(i, j, k);
                    let mirror = (!op.is_commutative()).then(|| direct.mirrored());

                    for mv in std::iter::once(direct).chain(mirror) {
                        let next = match state.after_combine(mv) {
                            Ok(next) => next,
                            Err(e) => {
                                trace!(%mv, error = %e, "pruned");
                                continue;
                            }
                        };

                        match self.explore(&next) {
                            Outcome::Solved(mut moves) => {
                                moves.push(mv);
                                return Outcome::Solved(moves);
                            }
                            Outcome::Dead => {}
                            Outcome::OutOfBudget => return Outcome::OutOfBudget,
                        }
                    }
                }
            }
        }

        if let Some(key) = key {
            self.dead.insert(key);
        }
        Outcome::Dead
    }
}

/// Find a winning move sequence, or `None` if the puzzle has no solution.
///
/// The caller's state is not modified. Applying the returned moves in order
/// with [`PuzzleState::combine`] ends in a won state. An already won state
/// yields an empty sequence.
pub fn solve(state: &PuzzleState) -> Option<Vec<Move>> {
    solve_with_config(state, &SolverConfig::unbounded()).solution
}

/// Search with an optional time/node budget.
///
/// When the budget runs out the result carries no solution and
/// `search_exhausted` is false; that means "unknown", not "unsolvable".
pub fn solve_with_config(state: &PuzzleState, config: &SolverConfig) -> SolverResult {
    let start_time = Instant::now();
    debug!(%state, ?config, "solving");

    let mut search = Search {
        config,
        // A timeout too large to represent means no deadline.
        deadline: config
            .timeout
            .and_then(|timeout| start_time.checked_add(timeout)),
        nodes: 0,
        dead: HashSet::new(),
    };

    let (solution, search_exhausted) = match search.explore(state) {
        Outcome::Solved(mut moves) => {
            moves.reverse();
            (Some(moves), true)
        }
        Outcome::Dead => (None, true),
        Outcome::OutOfBudget => (None, false),
    };

    let result = SolverResult {
        solution,
        search_exhausted,
        nodes_explored: search.nodes,
        time_elapsed_ms: start_time.elapsed().as_millis() as u64,
    };
    debug!(
        solvable = result.is_solvable(),
        exhausted = result.search_exhausted,
        nodes = result.nodes_explored,
        elapsed_ms = result.time_elapsed_ms,
        "search finished"
    );
    result
}

/// Replay `moves` against a copy of `state` and report whether the puzzle
/// ends won. An illegal move in the sequence is returned as an error.
pub fn verify_solution(state: &PuzzleState, moves: &[Move]) -> Result<bool, CombineError> {
    let mut replay = state.clone();
    for &mv in moves {
        replay.apply(mv)?;
    }
    Ok(replay.is_won())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::Operator;

    fn state(pieces: &[i32], ops: &[Operator], goal: i32) -> PuzzleState {
        PuzzleState::new(pieces.iter().copied(), ops.iter().copied(), goal, true).unwrap()
    }

    #[test]
    fn test_single_addition() {
        let s = state(&[2, 3], &[Operator::Plus], 5);
        assert_eq!(solve(&s), Some(vec![Move::new(0, 1, 0)]));
    }

    #[test]
    fn test_unreachable_goal() {
        let s = state(&[2, 3], &[Operator::Plus], 6);
        assert_eq!(solve(&s), None);
    }

    #[test]
    fn test_illegal_mirror_is_pruned() {
        let s = state(&[4, 2], &[Operator::Divide], 2);
        assert_eq!(solve(&s), Some(vec![Move::new(0, 1, 0)]));
    }

    #[test]
    fn test_mirror_found_for_non_commutative() {
        let s = state(&[2, 8], &[Operator::Divide], 4);
        assert_eq!(solve(&s), Some(vec![Move::new(1, 0, 0)]));
    }

    #[test]
    fn test_commutative_mirror_is_skipped() {
        // Only (0, 1, 0) is tried at the root; the mirror would be redundant.
        let s = state(&[2, 3], &[Operator::Plus], 6);
        let result = solve_with_config(&s, &SolverConfig::unbounded());
        assert_eq!(result.nodes_explored, 2);

        let s = state(&[2, 3], &[Operator::Minus], 6);
        let result = solve_with_config(&s, &SolverConfig::unbounded());
        assert_eq!(result.nodes_explored, 3);
    }

    #[test]
    fn test_already_won() {
        let s = state(&[5], &[Operator::Plus, Operator::Times], 5);
        assert_eq!(solve(&s), Some(vec![]));
    }

    #[test]
    fn test_terminal_but_lost() {
        let s = state(&[4], &[Operator::Plus], 5);
        assert_eq!(solve(&s), None);
    }

    #[test]
    fn test_enumeration_order_is_stable() {
        let s = state(&[1, 2, 3], &[Operator::Plus], 6);
        let expected = Some(vec![Move::new(0, 1, 0), Move::new(0, 1, 0)]);
        assert_eq!(solve(&s), expected);
        assert_eq!(solve(&s), expected);
    }

    #[test]
    fn test_solve_does_not_mutate_input() {
        let s = state(&[3, 4, 5, 6], &Operator::DEFAULTS, 24);
        let snapshot = s.clone();
        let _ = solve(&s);
        assert_eq!(s, snapshot);
    }

    #[test]
    fn test_single_use_operators() {
        let s = PuzzleState::new([2, 3, 4], [Operator::Plus, Operator::Times], 14, false).unwrap();
        let moves = solve(&s).expect("2 * (3 + 4)");
        assert_eq!(moves.len(), 2);
        assert_eq!(verify_solution(&s, &moves), Ok(true));

        // Each operator only once, so 2 + 3 + 4 is out of reach.
        let s = PuzzleState::new([2, 3, 4], [Operator::Plus, Operator::Times], 9, false).unwrap();
        assert_eq!(solve(&s), None);
    }

    #[test]
    fn test_no_operators() {
        let s = state(&[1, 2], &[], 3);
        assert_eq!(solve(&s), None);
    }

    #[test]
    fn test_solution_replays() {
        let s = state(&[6, 6, 5, 2, 1], &Operator::DEFAULTS, 47);
        let moves = solve(&s).expect("solvable");
        assert_eq!(moves.len(), 4);
        assert_eq!(verify_solution(&s, &moves), Ok(true));
    }

    #[test]
    fn test_node_budget_is_inconclusive() {
        let s = state(&[1, 1, 1, 1], &Operator::DEFAULTS, 999);
        let result = solve_with_config(&s, &SolverConfig::unbounded().with_max_nodes(1));
        assert!(result.is_inconclusive());
        assert!(!result.search_exhausted);
        assert_eq!(result.nodes_explored, 1);
    }

    #[test]
    fn test_unrepresentable_timeout_means_no_deadline() {
        let s = state(&[2, 3], &[Operator::Plus], 5);
        let result = solve_with_config(
            &s,
            &SolverConfig::unbounded().with_timeout(Duration::MAX),
        );
        assert_eq!(result.solution, Some(vec![Move::new(0, 1, 0)]));
        assert!(result.search_exhausted);
    }

    #[test]
    fn test_budget_large_enough_to_finish() {
        let s = state(&[2, 3], &[Operator::Plus], 5);
        let result = solve_with_config(&s, &SolverConfig::unbounded().with_max_nodes(2));
        assert_eq!(result.solution, Some(vec![Move::new(0, 1, 0)]));
        assert!(result.search_exhausted);
    }

    #[test]
    fn test_memoization_prunes_without_changing_answer() {
        let s = state(&[1, 1, 1, 1], &Operator::DEFAULTS, 999);

        let plain = solve_with_config(&s, &SolverConfig::unbounded());
        let memo = solve_with_config(&s, &SolverConfig::unbounded().with_memoization(true));

        assert_eq!(plain.solution, None);
        assert_eq!(memo.solution, None);
        assert!(plain.search_exhausted && memo.search_exhausted);
        assert!(memo.nodes_explored < plain.nodes_explored);
    }

    #[test]
    fn test_verify_solution_rejects_illegal_replay() {
        let s = state(&[4, 2], &[Operator::Divide], 2);
        assert_eq!(
            verify_solution(&s, &[Move::new(1, 0, 0)]),
            Err(CombineError::NonIntegerResult {
                dividend: 2,
                divisor: 4
            })
        );
        assert_eq!(verify_solution(&s, &[]), Ok(false));
    }
}
