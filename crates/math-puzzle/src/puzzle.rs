//! Puzzle state: the pieces left, the operator pool, and the goal.
//!
//! A state is changed one move at a time. [`PuzzleState::combine`] mutates
//! in place for interactive callers; [`PuzzleState::after_combine`] leaves
//! the receiver alone and returns an independent copy, which is what the
//! solver uses to give every branch its own snapshot.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::{CombineError, PuzzleError};
use crate::operator::Operator;

/// Maximum number of pieces in a puzzle
pub const MAX_PIECES: usize = 10;
/// Maximum number of operators in a puzzle
pub const MAX_OPS: usize = 10;
/// Largest value a piece may take
pub const MAX_PIECE_SIZE: i32 = 999;
/// Smallest value a piece may take
pub const MIN_PIECE_SIZE: i32 = -999;

pub type Pieces = SmallVec<[i32; MAX_PIECES]>;
pub type Operators = SmallVec<[Operator; MAX_OPS]>;

/// One combine: `pieces[first_index] op pieces[second_index]`.
///
/// Indices are positions in the state the move was generated against and
/// mean nothing for any other state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Move {
    pub first_index: usize,
    pub second_index: usize,
    pub op_index: usize,
}

impl Move {
    pub fn new(first_index: usize, second_index: usize, op_index: usize) -> Self {
        Self {
            first_index,
            second_index,
            op_index,
        }
    }

    /// The same move with the operands swapped
    pub fn mirrored(self) -> Self {
        Self {
            first_index: self.second_index,
            second_index: self.first_index,
            op_index: self.op_index,
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {})",
            self.first_index, self.second_index, self.op_index
        )
    }
}

/// A puzzle position.
///
/// Deserialization goes through [`PuzzleState::new`], so a state read from
/// JSON satisfies the same bounds as one built in code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "PuzzleDescription")]
pub struct PuzzleState {
    pieces: Pieces,
    operators: Operators,
    goal: i32,
    ops_reusable: bool,
}

/// Unvalidated wire form of a [`PuzzleState`].
///
/// `operators` defaults to [`Operator::DEFAULTS`] and `opsReusable` to
/// `true` when absent.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PuzzleDescription {
    pub goal: i32,
    pub pieces: Vec<i32>,
    #[serde(default = "default_operators")]
    pub operators: Vec<Operator>,
    #[serde(default = "default_reusable")]
    pub ops_reusable: bool,
}

fn default_operators() -> Vec<Operator> {
    Operator::DEFAULTS.to_vec()
}

fn default_reusable() -> bool {
    true
}

impl TryFrom<PuzzleDescription> for PuzzleState {
    type Error = PuzzleError;

    fn try_from(desc: PuzzleDescription) -> Result<Self, Self::Error> {
        PuzzleState::new(desc.pieces, desc.operators, desc.goal, desc.ops_reusable)
    }
}

impl PuzzleState {
    /// Build a state from explicit parts.
    ///
    /// Fails if there are no pieces, too many pieces or operators, or a
    /// piece outside the allowed range.
    pub fn new(
        pieces: impl IntoIterator<Item = i32>,
        operators: impl IntoIterator<Item = Operator>,
        goal: i32,
        ops_reusable: bool,
    ) -> Result<Self, PuzzleError> {
        let pieces: Vec<i32> = pieces.into_iter().collect();
        let operators: Vec<Operator> = operators.into_iter().collect();

        if pieces.is_empty() {
            return Err(PuzzleError::NoPieces);
        }
        if pieces.len() > MAX_PIECES {
            return Err(PuzzleError::TooManyPieces {
                count: pieces.len(),
            });
        }
        if operators.len() > MAX_OPS {
            return Err(PuzzleError::TooManyOperators {
                count: operators.len(),
            });
        }
        if let Some(&value) = pieces
            .iter()
            .find(|&&p| !(MIN_PIECE_SIZE..=MAX_PIECE_SIZE).contains(&p))
        {
            return Err(PuzzleError::PieceOutOfRange { value });
        }

        Ok(Self {
            pieces: Pieces::from_vec(pieces),
            operators: Operators::from_vec(operators),
            goal,
            ops_reusable,
        })
    }

    /// Build a state that uses the default operator set, all reusable.
    pub fn with_default_ops(
        pieces: impl IntoIterator<Item = i32>,
        goal: i32,
    ) -> Result<Self, PuzzleError> {
        Self::new(pieces, Operator::DEFAULTS, goal, true)
    }

    pub fn num_pieces(&self) -> usize {
        self.pieces.len()
    }

    pub fn num_ops(&self) -> usize {
        self.operators.len()
    }

    pub fn goal(&self) -> i32 {
        self.goal
    }

    pub fn ops_reusable(&self) -> bool {
        self.ops_reusable
    }

    pub fn pieces(&self) -> &[i32] {
        &self.pieces
    }

    pub fn operators(&self) -> &[Operator] {
        &self.operators
    }

    pub fn piece_at(&self, index: usize) -> Option<i32> {
        self.pieces.get(index).copied()
    }

    pub fn op_at(&self, index: usize) -> Option<Operator> {
        self.operators.get(index).copied()
    }

    /// Exactly one piece is left
    pub fn is_terminal(&self) -> bool {
        self.pieces.len() == 1
    }

    /// Terminal, and the last piece is the goal
    pub fn is_won(&self) -> bool {
        self.is_terminal() && self.pieces[0] == self.goal
    }

    /// Resolve a move to its operands and operator, rejecting malformed
    /// indices before anything is evaluated.
    fn operands(
        &self,
        first_index: usize,
        second_index: usize,
        op_index: usize,
    ) -> Result<(i32, i32, Operator), CombineError> {
        if self.is_terminal() {
            return Err(CombineError::TerminalState);
        }
        let len = self.pieces.len();
        for index in [first_index, second_index] {
            if index >= len {
                return Err(CombineError::PieceIndexOutOfRange { index, len });
            }
        }
        if first_index == second_index {
            return Err(CombineError::SameOperand { index: first_index });
        }
        let op = self
            .op_at(op_index)
            .ok_or(CombineError::OperatorIndexOutOfRange {
                index: op_index,
                len: self.operators.len(),
            })?;

        Ok((self.pieces[first_index], self.pieces[second_index], op))
    }

    /// Combine two pieces in place and return the new piece.
    ///
    /// The result takes the slot of the second operand and the first
    /// operand is removed. A consumed operator is removed when operators
    /// are not reusable. On error nothing changes.
    pub fn combine(
        &mut self,
        first_index: usize,
        second_index: usize,
        op_index: usize,
    ) -> Result<i32, CombineError> {
        let (a, b, op) = self.operands(first_index, second_index, op_index)?;
        let result = op.evaluate(a, b)?;

        self.pieces[second_index] = result;
        self.pieces.remove(first_index);
        if !self.ops_reusable {
            self.operators.remove(op_index);
        }
        Ok(result)
    }

    /// [`combine`](Self::combine) taking a [`Move`].
    pub fn apply(&mut self, mv: Move) -> Result<i32, CombineError> {
        self.combine(mv.first_index, mv.second_index, mv.op_index)
    }

    /// A copy of this state with `mv` applied. `self` is never modified.
    pub fn after_combine(&self, mv: Move) -> Result<PuzzleState, CombineError> {
        let mut next = self.clone();
        next.apply(mv)?;
        Ok(next)
    }

    /// Human-readable form of a move against this state, e.g. `4 ÷ 2 = 2`.
    pub fn describe_move(&self, mv: Move) -> String {
        match self.operands(mv.first_index, mv.second_index, mv.op_index) {
            Ok((a, b, op)) => match op.evaluate(a, b) {
                Ok(result) => format!("{a} {op} {b} = {result}"),
                Err(e) => format!("{a} {op} {b} ({e})"),
            },
            Err(e) => format!("move {mv} ({e})"),
        }
    }

    /// Order-independent encoding of the position. Two states with equal
    /// keys (and the same goal) are either both solvable or both not.
    pub(crate) fn canonical_key(&self) -> (Pieces, Operators) {
        let mut pieces = self.pieces.clone();
        pieces.sort_unstable();
        let mut operators = self.operators.clone();
        operators.sort_unstable();
        (pieces, operators)
    }
}

impl fmt::Display for PuzzleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pieces: Vec<String> = self.pieces.iter().map(|p| p.to_string()).collect();
        let ops: Vec<&str> = self.operators.iter().map(|op| op.symbol()).collect();
        write!(
            f,
            "pieces [{}]  ops [{}]{}  goal {}",
            pieces.join(", "),
            ops.join(" "),
            if self.ops_reusable { "" } else { " (single use)" },
            self.goal
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(pieces: &[i32], ops: &[Operator], goal: i32, reusable: bool) -> PuzzleState {
        PuzzleState::new(pieces.iter().copied(), ops.iter().copied(), goal, reusable).unwrap()
    }

    #[test]
    fn test_combine_replaces_second_operand() {
        let mut s = state(&[1, 2, 3], &[Operator::Plus], 6, true);
        assert_eq!(s.combine(0, 2, 0), Ok(4));
        assert_eq!(s.pieces(), &[2, 4]);
        assert_eq!(s.num_ops(), 1);

        let mut s = state(&[1, 2, 3], &[Operator::Minus], 6, true);
        assert_eq!(s.combine(2, 0, 0), Ok(2));
        assert_eq!(s.pieces(), &[2, 2]);
    }

    #[test]
    fn test_single_use_operators_are_consumed() {
        let mut s = state(
            &[2, 3, 4],
            &[Operator::Plus, Operator::Times],
            20,
            false,
        );
        assert_eq!(s.combine(0, 1, 0), Ok(5));
        assert_eq!(s.operators(), &[Operator::Times]);
        assert_eq!(s.combine(0, 1, 0), Ok(20));
        assert!(s.operators().is_empty());
        assert!(s.is_won());
    }

    #[test]
    fn test_failed_combine_leaves_state_untouched() {
        let mut s = state(&[7, 0, 2], &[Operator::Divide], 1, false);
        let before = s.clone();

        assert_eq!(s.combine(0, 1, 0), Err(CombineError::DivideByZero));
        assert_eq!(s, before);
        assert!(matches!(
            s.combine(0, 2, 0),
            Err(CombineError::NonIntegerResult { .. })
        ));
        assert_eq!(s, before);
    }

    #[test]
    fn test_out_of_range_is_atomic() {
        let mut s = state(&[999, 999], &[Operator::Times], 0, true);
        let before = s.clone();
        assert_eq!(
            s.combine(0, 1, 0),
            Err(CombineError::OutOfRange { value: 998_001 })
        );
        assert_eq!(s, before);
    }

    #[test]
    fn test_malformed_moves() {
        let mut s = state(&[1, 2], &[Operator::Plus], 3, true);
        assert_eq!(
            s.combine(0, 2, 0),
            Err(CombineError::PieceIndexOutOfRange { index: 2, len: 2 })
        );
        assert_eq!(
            s.combine(1, 1, 0),
            Err(CombineError::SameOperand { index: 1 })
        );
        assert_eq!(
            s.combine(0, 1, 1),
            Err(CombineError::OperatorIndexOutOfRange { index: 1, len: 1 })
        );

        s.combine(0, 1, 0).unwrap();
        assert!(s.is_terminal());
        assert_eq!(s.combine(0, 0, 0), Err(CombineError::TerminalState));
    }

    #[test]
    fn test_after_combine_is_pure() {
        let s = state(&[4, 2, 9], &[Operator::Divide], 2, false);
        let snapshot = s.clone();

        let next = s.after_combine(Move::new(0, 1, 0)).unwrap();
        assert_eq!(s, snapshot);
        assert_eq!(next.pieces(), &[2, 9]);
        assert!(next.operators().is_empty());

        assert!(s.after_combine(Move::new(1, 0, 0)).is_err());
        assert_eq!(s, snapshot);
    }

    #[test]
    fn test_terminal_and_won() {
        let won = state(&[5], &[Operator::Plus], 5, true);
        assert!(won.is_terminal());
        assert!(won.is_won());

        let lost = state(&[4], &[], 5, true);
        assert!(lost.is_terminal());
        assert!(!lost.is_won());

        let open = state(&[2, 3], &[Operator::Plus], 5, true);
        assert!(!open.is_terminal());
        assert!(!open.is_won());
    }

    #[test]
    fn test_construction_bounds() {
        assert_eq!(
            PuzzleState::new(Vec::<i32>::new(), [Operator::Plus], 1, true),
            Err(PuzzleError::NoPieces)
        );
        assert_eq!(
            PuzzleState::new(vec![1; 11], [Operator::Plus], 1, true),
            Err(PuzzleError::TooManyPieces { count: 11 })
        );
        assert_eq!(
            PuzzleState::new([1, 2], vec![Operator::Plus; 11], 1, true),
            Err(PuzzleError::TooManyOperators { count: 11 })
        );
        assert_eq!(
            PuzzleState::new([1, 1000], [Operator::Plus], 1, true),
            Err(PuzzleError::PieceOutOfRange { value: 1000 })
        );
        assert!(PuzzleState::new(vec![-999; 10], vec![Operator::Root; 10], 1, true).is_ok());
    }

    #[test]
    fn test_accessors() {
        let s = state(&[3, 8], &[Operator::Minus, Operator::Root], -5, true);
        assert_eq!(s.num_pieces(), 2);
        assert_eq!(s.num_ops(), 2);
        assert_eq!(s.goal(), -5);
        assert_eq!(s.piece_at(1), Some(8));
        assert_eq!(s.piece_at(2), None);
        assert_eq!(s.op_at(1), Some(Operator::Root));
        assert_eq!(s.op_at(2), None);
        assert!(s.ops_reusable());
    }

    #[test]
    fn test_describe_move() {
        let s = state(&[4, 2], &[Operator::Divide], 2, true);
        assert_eq!(s.describe_move(Move::new(0, 1, 0)), "4 ÷ 2 = 2");
        assert_eq!(
            s.describe_move(Move::new(1, 0, 0)),
            "2 ÷ 4 (2 is not evenly divisible by 4)"
        );
        assert_eq!(
            s.to_string(),
            "pieces [4, 2]  ops [÷]  goal 2"
        );
    }

    #[test]
    fn test_canonical_key_ignores_order() {
        let a = state(&[3, 1, 2], &[Operator::Times, Operator::Plus], 6, false);
        let b = state(&[2, 3, 1], &[Operator::Plus, Operator::Times], 6, false);
        assert_eq!(a.canonical_key(), b.canonical_key());
    }

    #[test]
    fn test_deserialize_validates() {
        let s: PuzzleState =
            serde_json::from_str(r#"{"goal": 10, "pieces": [2, 5]}"#).unwrap();
        assert_eq!(s.operators(), &Operator::DEFAULTS);
        assert!(s.ops_reusable());

        let s: PuzzleState = serde_json::from_str(
            r#"{"goal": 1, "pieces": [4, 2], "operators": ["/"], "opsReusable": false}"#,
        )
        .unwrap();
        assert_eq!(s.operators(), &[Operator::Divide]);
        assert!(!s.ops_reusable());

        let err = serde_json::from_str::<PuzzleState>(r#"{"goal": 1, "pieces": []}"#);
        assert!(err.is_err());
    }

    #[test]
    fn test_serialize_round_trips_through_validation() {
        let s = state(&[4, 2], &[Operator::Divide, Operator::Plus], 2, false);
        let json = serde_json::to_string(&s).unwrap();
        assert_eq!(
            json,
            r#"{"pieces":[4,2],"operators":["/","+"],"goal":2,"opsReusable":false}"#
        );
        let back: PuzzleState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, s);
    }

    #[test]
    fn test_mirrored_move() {
        assert_eq!(Move::new(0, 2, 1).mirrored(), Move::new(2, 0, 1));
    }
}
