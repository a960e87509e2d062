//! Binary operators that combine two pieces into one.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::CombineError;
use crate::puzzle::{MAX_PIECE_SIZE, MIN_PIECE_SIZE};

/// A binary arithmetic operator.
///
/// Serialized by its ASCII code (`"+"`, `"-"`, `"*"`, `"/"`, `"^"`,
/// `"root"`, `"%"`); a few spelled-out aliases are accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Operator {
    #[serde(rename = "+", alias = "plus")]
    Plus,
    #[serde(rename = "-", alias = "minus")]
    Minus,
    #[serde(rename = "*", alias = "times")]
    Times,
    #[serde(rename = "/", alias = "divide")]
    Divide,
    #[serde(rename = "^", alias = "exponent")]
    Exponent,
    #[serde(rename = "root")]
    Root,
    #[serde(rename = "%", alias = "modulo")]
    Modulo,
}

impl Operator {
    pub const ALL: [Operator; 7] = [
        Operator::Plus,
        Operator::Minus,
        Operator::Times,
        Operator::Divide,
        Operator::Exponent,
        Operator::Root,
        Operator::Modulo,
    ];

    /// The operators a randomly generated puzzle starts with.
    pub const DEFAULTS: [Operator; 5] = [
        Operator::Plus,
        Operator::Minus,
        Operator::Times,
        Operator::Divide,
        Operator::Exponent,
    ];

    /// Display glyph
    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Plus => "+",
            Operator::Minus => "−",
            Operator::Times => "×",
            Operator::Divide => "÷",
            Operator::Exponent => "^",
            Operator::Root => "√",
            Operator::Modulo => "%",
        }
    }

    /// ASCII code, the inverse of [`Operator::from_str`].
    pub fn code(self) -> &'static str {
        match self {
            Operator::Plus => "+",
            Operator::Minus => "-",
            Operator::Times => "*",
            Operator::Divide => "/",
            Operator::Exponent => "^",
            Operator::Root => "root",
            Operator::Modulo => "%",
        }
    }

    /// Whether swapping the operands can never change the outcome.
    pub fn is_commutative(self) -> bool {
        matches!(self, Operator::Plus | Operator::Times)
    }

    /// Apply the operator to `a` and `b`.
    ///
    /// Arithmetic is done in `i64` so that `+`, `-` and `*` on in-range
    /// pieces cannot overflow before the range check. `^` and `root` go
    /// through `f64` and truncate toward zero; a non-integer root is
    /// truncated rather than rejected.
    pub fn evaluate(self, a: i32, b: i32) -> Result<i32, CombineError> {
        let (wide_a, wide_b) = (i64::from(a), i64::from(b));

        let value = match self {
            Operator::Plus => wide_a + wide_b,
            Operator::Minus => wide_a - wide_b,
            Operator::Times => wide_a * wide_b,
            Operator::Divide => {
                if b == 0 {
                    return Err(CombineError::DivideByZero);
                }
                if wide_a % wide_b != 0 {
                    return Err(CombineError::NonIntegerResult {
                        dividend: a,
                        divisor: b,
                    });
                }
                wide_a / wide_b
            }
            Operator::Exponent => truncate(f64::from(a).powi(b)),
            Operator::Root => truncate(f64::from(a).powf(1.0 / f64::from(b))),
            Operator::Modulo => {
                if b == 0 {
                    return Err(CombineError::DivideByZero);
                }
                wide_a % wide_b
            }
        };

        if !(i64::from(MIN_PIECE_SIZE)..=i64::from(MAX_PIECE_SIZE)).contains(&value) {
            return Err(CombineError::OutOfRange { value });
        }
        // In range, so the narrowing cannot fail.
        Ok(value as i32)
    }
}

/// Float to integer with truncation toward zero. Saturates at the `i64`
/// limits and maps NaN to zero.
fn truncate(value: f64) -> i64 {
    value as i64
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Operator {
    type Err = CombineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let op = match s.trim().to_ascii_lowercase().as_str() {
            "+" | "plus" => Operator::Plus,
            "-" | "−" | "minus" => Operator::Minus,
            "*" | "x" | "×" | "times" => Operator::Times,
            "/" | "÷" | "divide" => Operator::Divide,
            "^" | "**" | "exponent" => Operator::Exponent,
            "root" | "√" => Operator::Root,
            "%" | "mod" | "modulo" => Operator::Modulo,
            other => {
                return Err(CombineError::InvalidOperatorCode {
                    code: other.to_string(),
                })
            }
        };
        Ok(op)
    }
}
