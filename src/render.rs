use std::fmt;

use crate::engine::SymbolicEngine;
use crate::expression::{BinaryOperator, Expression};
use crate::symbols::SymbolTable;

use log::debug;

/// Canonical text of an expression plus the variables it mentions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Canonical {
    pub text: String,
    pub variables: SymbolTable,
}

impl Canonical {
    /// Hand the canonical text and variable names to `engine`.
    pub fn simplify_with<E: SymbolicEngine>(&self, engine: &E) -> Result<E::Output, E::Error> {
        engine.simplify(&self.text, &self.variables.to_names())
    }
}

impl Expression {
    /// Renders the canonical text, recording every variable in `symbols`.
    ///
    /// Children are rendered before their parent; operators are explicit and
    /// exponents, fraction operands and function arguments are parenthesized.
    pub fn render(&self, symbols: &mut SymbolTable) -> String {
        match self {
            Self::Number(number) => number.to_string(),
            Self::Variable(variable) => {
                symbols.insert(variable.name);
                variable.to_string()
            }
            Self::Negation(inner) => format!("-{}", inner.render(symbols)),
            Self::Chain(chain) => {
                let mut text = chain.first.render(symbols);
                for (op, operand) in &chain.rest {
                    // `a/(b/c)` must not read as `a/b/c`.
                    let operand = match operand {
                        Expression::Fraction { .. } if *op == BinaryOperator::Div => {
                            render_parenthesized(operand, symbols)
                        }
                        _ => operand.render(symbols),
                    };
                    text.push(op.symbol());
                    text.push_str(&operand);
                }
                text
            }
            Self::Power { base, exponent } => {
                let base = render_base(base, symbols);
                let exponent = render_parenthesized(exponent, symbols);
                format!("{base}**{exponent}")
            }
            Self::Fraction {
                numerator,
                denominator,
            } => {
                let numerator = render_parenthesized(numerator, symbols);
                let denominator = render_parenthesized(denominator, symbols);
                format!("{numerator}/{denominator}")
            }
            Self::Sum {
                variable,
                lower,
                upper,
                body,
            } => {
                symbols.insert(*variable);
                let body = body.render(symbols);
                format!("reduce(lambda {variable}: {body}, [{lower},{upper}])")
            }
            Self::Integral {
                lower,
                upper,
                integrand,
                variable,
            } => {
                let lower = lower.render(symbols);
                let upper = upper.render(symbols);
                let integrand = integrand.render(symbols);
                symbols.insert(*variable);
                format!("integrate({integrand}, ({variable}, {lower}, {upper}))")
            }
            Self::Trig { function, argument } => {
                let argument = render_parenthesized(argument, symbols);
                format!("{}{argument}", function.name())
            }
            Self::Group { inner, .. } => format!("({})", inner.render(symbols)),
        }
    }

    /// Renders into a fresh [`SymbolTable`].
    pub fn canonicalize(&self) -> Canonical {
        let mut variables = SymbolTable::new();
        let text = self.render(&mut variables);
        debug!("canonical form {text:?}, {} variable(s)", variables.len());
        Canonical { text, variables }
    }
}

/// Groups already render their own parentheses; anything else is wrapped.
fn render_parenthesized(expression: &Expression, symbols: &mut SymbolTable) -> String {
    match expression {
        Expression::Group { .. } => expression.render(symbols),
        other => format!("({})", other.render(symbols)),
    }
}

/// A power base that would not bind tighter than `**` on its own is wrapped.
fn render_base(base: &Expression, symbols: &mut SymbolTable) -> String {
    let bare = match base {
        Expression::Number(number) => !number.negative,
        Expression::Variable(variable) => !variable.negative,
        Expression::Negation(_)
        | Expression::Chain(_)
        | Expression::Power { .. }
        | Expression::Fraction { .. } => false,
        Expression::Sum { .. }
        | Expression::Integral { .. }
        | Expression::Trig { .. }
        | Expression::Group { .. } => true,
    };
    if bare {
        base.render(symbols)
    } else {
        format!("({})", base.render(symbols))
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(&mut SymbolTable::new()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::{NumberLiteral, VariableRef};

    fn canonical(input: &str) -> String {
        Expression::parse(input).unwrap().canonicalize().text
    }

    #[test]
    fn number_literals_render_verbatim() {
        for literal in ["3", "-2.5", "0.125", "10.0"] {
            assert_eq!(canonical(literal), literal);
        }
    }

    #[test]
    fn implicit_and_explicit_products_agree() {
        assert_eq!(canonical("3x"), "3*x");
        assert_eq!(canonical("3*x"), "3*x");
        assert_eq!(canonical("3x^{2}"), "3*x**(2)");
    }

    #[test]
    fn chains_fold_left_to_right() {
        assert_eq!(canonical("2+3*4"), "2+3*4");
        assert_eq!(canonical("8 / 4 * 3"), "8/4*3");
        assert_eq!(canonical("1 - 2 + 3x"), "1-2+3*x");
    }

    #[test]
    fn exponent_is_parenthesized() {
        assert_eq!(canonical("2*3^{2}"), "2*3**(2)");
        assert_eq!(canonical("(x+1)^{y-1}"), "(x+1)**(y-1)");
    }

    #[test]
    fn groups() {
        assert_eq!(canonical("(2+x)*3"), "(2+x)*3");
        assert_eq!(canonical("((x))"), "((x))");
    }

    #[test]
    fn domain_forms() {
        assert_eq!(canonical("\\frac{2}{2^{8}}"), "(2)/(2**(8))");
        assert_eq!(canonical("\\sin{x}+\\tan{2y}"), "sin(x)+tan(2*y)");
        assert_eq!(
            canonical("\\sum_{x=1}^{3}{x^{2}}"),
            "reduce(lambda x: x**(2), [1,3])"
        );
        assert_eq!(
            canonical("\\integral_{0}^{a}{x^{2} dx}"),
            "integrate(x**(2), (x, 0, a))"
        );
    }

    #[test]
    fn leading_minus() {
        assert_eq!(canonical("-x+y"), "-x+y");
        assert_eq!(canonical("-(x+y)"), "-(x+y)");
        assert_eq!(canonical("-x^{2}"), "-x**(2)");
        assert_eq!(canonical("2*-x^{2}"), "2*-x**(2)");
    }

    #[test]
    fn collects_variables() {
        let result = Expression::parse("x+x+y").unwrap().canonicalize();
        assert_eq!(result.variables.to_names(), ["x", "y"]);

        let result = Expression::parse("\\sum_{x=1}^{3}{x^{2}}")
            .unwrap()
            .canonicalize();
        assert_eq!(result.variables.to_names(), ["x"]);

        let result = Expression::parse("\\integral_{a}^{b}{t dt}")
            .unwrap()
            .canonicalize();
        assert_eq!(result.variables.to_names(), ["a", "b", "t"]);
    }

    #[test]
    fn separate_renders_do_not_share_symbols() {
        let first = Expression::parse("x").unwrap().canonicalize();
        let second = Expression::parse("y").unwrap().canonicalize();
        assert_eq!(first.variables.to_names(), ["x"]);
        assert_eq!(second.variables.to_names(), ["y"]);
    }

    #[test]
    fn hand_built_operands_are_parenthesized() {
        let tree = Expression::Power {
            base: Box::new(Expression::Variable(VariableRef {
                negative: false,
                name: 'x',
            })),
            exponent: Box::new(Expression::Number(NumberLiteral::from_text("3").unwrap())),
        };
        assert_eq!(tree.to_string(), "x**(3)");

        let negative = Expression::Number(NumberLiteral::from_text("-2").unwrap());
        let tree = Expression::Power {
            base: Box::new(negative.clone()),
            exponent: Box::new(negative),
        };
        assert_eq!(tree.to_string(), "(-2)**(-2)");
    }

    #[test]
    fn power_base_is_parenthesized_when_needed() {
        assert_eq!(canonical("\\frac{2}{3}^{2}"), "((2)/(3))**(2)");
        assert_eq!(canonical("\\sin{x}^{2}"), "sin(x)**(2)");
        assert_eq!(canonical("(x+1)^{2}"), "(x+1)**(2)");
        assert_eq!(
            canonical("\\sum_{k=1}^{3}{k}^{2}"),
            "reduce(lambda k: k, [1,3])**(2)"
        );
    }

    #[test]
    fn divisor_fraction_is_parenthesized() {
        assert_eq!(canonical("x/\\frac{1}{2}"), "x/((1)/(2))");
        assert_eq!(canonical("x*\\frac{1}{2}"), "x*(1)/(2)");
    }
}
