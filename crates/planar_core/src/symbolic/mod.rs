//! Exact symbolic layer: rationals, canonical expressions, parsing,
//! differentiation, evaluation and the polynomial system solver.

mod calculus;
mod eval;
mod expr;
mod parse;
pub mod poly;
mod rational;
pub mod solve;

pub use expr::{Expr, Function};
pub use parse::parse;
pub use rational::Rational;
