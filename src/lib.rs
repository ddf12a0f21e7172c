//! Parser for a small LaTeX math subset that produces canonical expressions
//! for a symbolic engine.
//!
//! Supported input: decimal numbers, single-letter variables, `+ - * /`,
//! parentheses, `^{...}` exponents, `\frac{a}{b}`, `\sum_{k=1}^{n}{body}`,
//! `\integral_{a}^{b}{f dx}` and `\sin{...}`, `\cos{...}`, `\tan{...}`.
//! Blanks between tokens are ignored.
//!
//! Parsing yields an [`Expression`] tree. Rendering it gives canonical text
//! with explicit operators and parenthesized exponents, together with the
//! set of variables it mentions, ready for any [`SymbolicEngine`].
//!
//! # Example
//!
//! ```rust
//! use latex_sym::*;
//!
//! let parsed = Expression::parse("\\frac{1}{2} + 3x^{2}").unwrap();
//! let canonical = parsed.canonicalize();
//! assert_eq!(canonical.text, "(1)/(2)+3*x**(2)");
//! assert_eq!(canonical.variables.to_names(), ["x"]);
//!
//! let x = [1.0, 2.0];
//! let bindings = Bindings::new().with('x', &x);
//! let mut registers = Registers::new(2);
//! let output = parsed.evaluate(&bindings, &mut registers).unwrap();
//! assert_eq!(&output, &[3.5, 12.5]);
//! ```

mod engine;
mod evaluate;
mod expression;
mod parse;
mod render;
mod symbols;

/// Uses the [`pest`] parsing expression grammar language.
///
/// ```text
#[doc = include_str!("grammar.pest")]
/// ```
pub mod grammar_doc {}

pub use engine::SymbolicEngine;
pub use evaluate::*;
pub use expression::*;
pub use parse::{ParseError, ParseOptions, Parsed, Rule};
pub use render::Canonical;
pub use symbols::SymbolTable;

pub trait FloatExt: num_traits::Float + std::str::FromStr + Send + Sync {}
impl FloatExt for f32 {}
impl FloatExt for f64 {}
