use crate::expression::{
    BinaryChain, BinaryOperator, Delimiter, Expression, NumberLiteral, OperatorClass,
    TrigFunction, VariableRef,
};
use crate::symbols::SymbolTable;

use log::{debug, trace};
use pest::error::InputLocation;
use pest::iterators::{Pair, Pairs};
use pest::Parser;
use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "grammar.pest"] // relative to project `src`
struct ExpressionParser;

/// Control sequences that start a domain form.
const DOMAIN_FORMS: [&str; 6] = ["\\frac", "\\sum", "\\integral", "\\sin", "\\cos", "\\tan"];

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// No prefix of the input is an expression.
    #[error("no expression matches the input at position {position}")]
    ParseFailure {
        position: usize,
        #[source]
        source: Box<pest::error::Error<Rule>>,
    },

    /// The input fails at a backslash sequence that is not a known form.
    #[error("unknown control sequence `{name}` at position {position}")]
    UnknownDomainForm { name: String, position: usize },

    /// A prefix matched, but full consumption was required.
    #[error("parsed `{matched}` but `{remainder}` was left unconsumed")]
    IncompleteConsumption { matched: String, remainder: String },

    /// A sum or integral rebinds the variable of an enclosing one.
    #[error("`{name}` at position {position} is already bound by an enclosing sum or integral")]
    ShadowedBinding { name: char, position: usize },
}

#[derive(Clone, Copy, Debug)]
pub struct ParseOptions {
    /// Report [`ParseError::IncompleteConsumption`] when input is left over.
    pub require_eof: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self { require_eof: true }
    }
}

/// A successful match: the tree plus how much of the input it covers.
#[derive(Clone, Debug)]
pub struct Parsed<'i> {
    pub tree: Expression,
    /// The input text the tree was built from.
    pub matched: &'i str,
    /// Unconsumed input, with leading blanks skipped.
    pub remainder: &'i str,
}

impl Expression {
    /// Parse `input`, which must be consumed completely.
    pub fn parse(input: &str) -> Result<Self, ParseError> {
        Self::parse_with(input, ParseOptions::default()).map(|parsed| parsed.tree)
    }

    /// Parse the longest expression at the start of `input`, returning
    /// whatever follows it as the remainder.
    pub fn parse_prefix(input: &str) -> Result<Parsed<'_>, ParseError> {
        Self::parse_with(input, ParseOptions { require_eof: false })
    }

    pub fn parse_with(input: &str, options: ParseOptions) -> Result<Parsed<'_>, ParseError> {
        let (pair, remainder) = match_expression(input, options)?;
        let matched = pair.as_str();
        let tree = TreeBuilder::default().expression(pair)?;
        debug!("parsed {matched:?}, remainder {remainder:?}");
        Ok(Parsed {
            tree,
            matched,
            remainder,
        })
    }

    /// Distinct variable names in `input`, including the binding variables
    /// of sums and integrals, without building a tree.
    pub fn parse_variable_names(input: &str) -> Result<SymbolTable, ParseError> {
        let (pair, _) = match_expression(input, ParseOptions::default())?;
        Ok(pair
            .into_inner()
            .flatten()
            .filter(|p| matches!(p.as_rule(), Rule::variable | Rule::letter))
            .map(|p| letter(p.as_str()))
            .collect())
    }
}

fn match_expression(
    input: &str,
    options: ParseOptions,
) -> Result<(Pair<'_, Rule>, &str), ParseError> {
    let mut pairs = ExpressionParser::parse(Rule::calculation, input)
        .map_err(|error| match_failure(input, error))?;
    let pair = child(&mut pairs);
    let remainder = skip_blanks(&input[pair.as_span().end()..]);
    if options.require_eof && !remainder.is_empty() {
        return Err(ParseError::IncompleteConsumption {
            matched: pair.as_str().to_string(),
            remainder: remainder.to_string(),
        });
    }
    Ok((pair, remainder))
}

fn match_failure(input: &str, error: pest::error::Error<Rule>) -> ParseError {
    let position = match error.location {
        InputLocation::Pos(pos) => pos,
        InputLocation::Span((start, _)) => start,
    };
    let rest = input.get(position..).unwrap_or_default();
    let skipped = rest.len() - skip_blanks(rest).len();
    if let Some(sequence) = skip_blanks(rest).strip_prefix('\\') {
        let name_len = sequence
            .find(|c: char| !c.is_ascii_alphabetic())
            .unwrap_or(sequence.len());
        let name = format!("\\{}", &sequence[..name_len]);
        if !DOMAIN_FORMS.contains(&name.as_str()) {
            return ParseError::UnknownDomainForm {
                name,
                position: position + skipped,
            };
        }
    }
    ParseError::ParseFailure {
        position,
        source: Box::new(error),
    }
}

fn skip_blanks(text: &str) -> &str {
    text.trim_start_matches([' ', '\t', '\r', '\n'])
}

fn child<'i>(pairs: &mut Pairs<'i, Rule>) -> Pair<'i, Rule> {
    pairs.next().expect("grammar guarantees this child")
}

fn letter(text: &str) -> char {
    text.chars().last().expect("grammar guarantees a letter")
}

fn number_literal(text: &str) -> NumberLiteral {
    NumberLiteral::from_text(text).expect("grammar only admits decimal literals")
}

fn variable_ref(text: &str) -> VariableRef {
    VariableRef {
        negative: text.starts_with('-'),
        name: letter(text),
    }
}

fn operator(pair: &Pair<Rule>) -> BinaryOperator {
    match pair.as_str() {
        "+" => BinaryOperator::Add,
        "-" => BinaryOperator::Sub,
        "*" => BinaryOperator::Mul,
        "/" => BinaryOperator::Div,
        x => unreachable!("Unexpected operator {x:?}"),
    }
}

/// Applies a leading unary minus.
///
/// In front of an additive chain the minus belongs to the first operand, so
/// the tree means what `-a+b` means as text.
fn negate(expression: Expression) -> Expression {
    match expression {
        Expression::Chain(mut chain) if chain.class() == OperatorClass::Additive => {
            *chain.first = negate(*chain.first);
            Expression::Chain(chain)
        }
        other => Expression::Negation(Box::new(other)),
    }
}

/// Builds `base ** exponent`. A signed literal base is unsigned and the
/// power negated instead, matching how `-x**(2)` reads.
fn power(base: Expression, exponent: Expression) -> Expression {
    let (negative, base) = match base {
        Expression::Number(n) if n.negative => (true, Expression::Number(n.unsigned())),
        Expression::Variable(v) if v.negative => (
            true,
            Expression::Variable(VariableRef {
                negative: false,
                ..v
            }),
        ),
        other => (false, other),
    };
    let power = Expression::Power {
        base: Box::new(base),
        exponent: Box::new(exponent),
    };
    if negative {
        Expression::Negation(Box::new(power))
    } else {
        power
    }
}

/// Turns matched pairs into an [`Expression`], tracking which variables are
/// bound by enclosing sums and integrals.
#[derive(Default)]
struct TreeBuilder {
    bound: Vec<char>,
}

impl TreeBuilder {
    fn expression(&mut self, pair: Pair<Rule>) -> Result<Expression, ParseError> {
        let mut inner = pair.into_inner();
        let first = child(&mut inner);
        if first.as_rule() == Rule::neg {
            Ok(negate(self.term(child(&mut inner))?))
        } else {
            self.term(first)
        }
    }

    fn term(&mut self, pair: Pair<Rule>) -> Result<Expression, ParseError> {
        trace!("building {:?} from {:?}", pair.as_rule(), pair.as_str());
        match pair.as_rule() {
            Rule::expression => self.expression(pair),
            Rule::additive | Rule::multiplicative => self.chain(pair),
            Rule::implicit_product => {
                let (number, factor) = self.implicit_product(pair)?;
                Ok(Expression::Chain(BinaryChain::new(
                    number,
                    vec![(BinaryOperator::Mul, factor)],
                )))
            }
            Rule::power => {
                let mut inner = pair.into_inner();
                let base = self.term(child(&mut inner))?;
                match inner.next() {
                    Some(exponent) => Ok(power(base, self.term(exponent)?)),
                    None => Ok(base),
                }
            }
            Rule::paren_group => self.group(pair, Delimiter::Paren),
            Rule::brace_group => self.group(pair, Delimiter::Brace),
            Rule::fraction => {
                let mut inner = pair.into_inner();
                let numerator = self.term(child(&mut inner))?;
                let denominator = self.term(child(&mut inner))?;
                Ok(Expression::Fraction {
                    numerator: Box::new(numerator),
                    denominator: Box::new(denominator),
                })
            }
            Rule::sum => self.sum(pair),
            Rule::integral => self.integral(pair),
            Rule::trig => {
                let mut inner = pair.into_inner();
                let function = match child(&mut inner).as_str() {
                    "\\sin" => TrigFunction::Sin,
                    "\\cos" => TrigFunction::Cos,
                    "\\tan" => TrigFunction::Tan,
                    x => unreachable!("Unexpected trig function {x:?}"),
                };
                let argument = self.term(child(&mut inner))?;
                Ok(Expression::Trig {
                    function,
                    argument: Box::new(argument),
                })
            }
            Rule::variable => Ok(Expression::Variable(variable_ref(pair.as_str()))),
            Rule::number => Ok(Expression::Number(number_literal(pair.as_str()))),
            x => unreachable!("Unexpected primary rule {x:?}"),
        }
    }

    fn chain(&mut self, pair: Pair<Rule>) -> Result<Expression, ParseError> {
        // Implicit products inside `*`/`/` chains are spliced in, so `6/3x`
        // folds as `6/3*x`.
        let splice = pair.as_rule() == Rule::multiplicative;
        let mut inner = pair.into_inner();

        let head = child(&mut inner);
        if inner.peek().is_none() {
            return self.term(head);
        }
        let (first, mut rest) = if splice && head.as_rule() == Rule::implicit_product {
            let (number, factor) = self.implicit_product(head)?;
            (number, vec![(BinaryOperator::Mul, factor)])
        } else {
            (self.term(head)?, vec![])
        };

        while let Some(op) = inner.next() {
            let op = operator(&op);
            let operand = child(&mut inner);
            if splice && operand.as_rule() == Rule::implicit_product {
                let (number, factor) = self.implicit_product(operand)?;
                rest.push((op, number));
                rest.push((BinaryOperator::Mul, factor));
            } else {
                rest.push((op, self.term(operand)?));
            }
        }
        Ok(Expression::Chain(BinaryChain::new(first, rest)))
    }

    /// Splits `3x` (or `3x^{2}`) into the number and the variable factor.
    fn implicit_product(
        &mut self,
        pair: Pair<Rule>,
    ) -> Result<(Expression, Expression), ParseError> {
        let mut inner = pair.into_inner();
        let mut adjacent = child(&mut inner).into_inner();
        let number = Expression::Number(number_literal(child(&mut adjacent).as_str()));
        let mut factor = Expression::Variable(variable_ref(child(&mut adjacent).as_str()));
        if let Some(exponent) = inner.next() {
            factor = power(factor, self.term(exponent)?);
        }
        Ok((number, factor))
    }

    fn group(&mut self, pair: Pair<Rule>, delimiter: Delimiter) -> Result<Expression, ParseError> {
        let inner = self.expression(child(&mut pair.into_inner()))?;
        Ok(Expression::Group {
            delimiter,
            inner: Box::new(inner),
        })
    }

    fn sum(&mut self, pair: Pair<Rule>) -> Result<Expression, ParseError> {
        let mut inner = pair.into_inner();
        let variable = self.bind(&child(&mut inner))?;
        let lower = number_literal(child(&mut inner).as_str());
        let upper = number_literal(child(&mut inner).as_str());
        let body = child(&mut inner);
        let body = self.expression(child(&mut body.into_inner()));
        self.bound.pop();
        Ok(Expression::Sum {
            variable,
            lower,
            upper,
            body: Box::new(body?),
        })
    }

    fn integral(&mut self, pair: Pair<Rule>) -> Result<Expression, ParseError> {
        let mut inner = pair.into_inner();
        let lower = self.expression(child(&mut inner))?;
        let upper = self.expression(child(&mut inner))?;
        let integrand = child(&mut inner);
        let variable = self.bind(&child(&mut inner))?;
        let integrand = self.expression(integrand);
        self.bound.pop();
        Ok(Expression::Integral {
            lower: Box::new(lower),
            upper: Box::new(upper),
            integrand: Box::new(integrand?),
            variable,
        })
    }

    fn bind(&mut self, pair: &Pair<Rule>) -> Result<char, ParseError> {
        let name = letter(pair.as_str());
        if self.bound.contains(&name) {
            return Err(ParseError::ShadowedBinding {
                name,
                position: pair.as_span().start(),
            });
        }
        self.bound.push(name);
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(text: &str) -> Expression {
        Expression::Number(NumberLiteral::from_text(text).unwrap())
    }

    fn var(name: char) -> Expression {
        Expression::Variable(VariableRef {
            negative: false,
            name,
        })
    }

    fn brace(inner: Expression) -> Expression {
        Expression::Group {
            delimiter: Delimiter::Brace,
            inner: Box::new(inner),
        }
    }

    #[test]
    fn parse_variable_names() {
        let vars = Expression::parse_variable_names("x + -y + 2z").unwrap();
        assert_eq!(vars.to_names(), ["x", "y", "z"]);

        let vars = Expression::parse_variable_names("\\sum_{k=1}^{3}{k}").unwrap();
        assert_eq!(vars.to_names(), ["k"]);
    }

    #[test]
    fn implicit_product_is_a_product() {
        let tree = Expression::parse("3x").unwrap();
        assert_eq!(
            tree,
            Expression::Chain(BinaryChain::new(
                num("3"),
                vec![(BinaryOperator::Mul, var('x'))]
            ))
        );
    }

    #[test]
    fn implicit_product_requires_adjacency() {
        let parsed = Expression::parse_prefix("3 x").unwrap();
        assert_eq!(parsed.tree, num("3"));
        assert_eq!(parsed.remainder, "x");
    }

    #[test]
    fn number_then_minus_is_subtraction() {
        let tree = Expression::parse("3-x").unwrap();
        assert_eq!(
            tree,
            Expression::Chain(BinaryChain::new(
                num("3"),
                vec![(BinaryOperator::Sub, var('x'))]
            ))
        );
    }

    #[test]
    fn implicit_product_splices_into_chain() {
        let tree = Expression::parse("6/3x").unwrap();
        assert_eq!(
            tree,
            Expression::Chain(BinaryChain::new(
                num("6"),
                vec![
                    (BinaryOperator::Div, num("3")),
                    (BinaryOperator::Mul, var('x')),
                ]
            ))
        );
    }

    #[test]
    fn implicit_product_exponent_binds_to_letter() {
        let tree = Expression::parse("3x^{2}").unwrap();
        let squared = Expression::Power {
            base: Box::new(var('x')),
            exponent: Box::new(brace(num("2"))),
        };
        assert_eq!(
            tree,
            Expression::Chain(BinaryChain::new(
                num("3"),
                vec![(BinaryOperator::Mul, squared)]
            ))
        );
    }

    #[test]
    fn leading_minus_negates_first_term() {
        let tree = Expression::parse("-x+y").unwrap();
        assert_eq!(
            tree,
            Expression::Chain(BinaryChain::new(
                Expression::Negation(Box::new(var('x'))),
                vec![(BinaryOperator::Add, var('y'))]
            ))
        );
    }

    #[test]
    fn signed_power_base_negates_power() {
        let tree = Expression::parse("2+-x^{2}").unwrap();
        let Expression::Chain(chain) = tree else {
            panic!("expected chain");
        };
        assert_eq!(
            chain.rest[0].1,
            Expression::Negation(Box::new(Expression::Power {
                base: Box::new(var('x')),
                exponent: Box::new(brace(num("2"))),
            }))
        );
    }

    #[test]
    fn whitespace_between_tokens() {
        let tree = Expression::parse("  2 * ( x + 1 ) ").unwrap();
        assert_eq!(tree, Expression::parse("2*(x+1)").unwrap());
    }

    #[test]
    fn domain_forms() {
        let tree = Expression::parse("\\frac{1}{x}").unwrap();
        assert!(matches!(tree, Expression::Fraction { .. }));

        let tree = Expression::parse("\\cos{x}").unwrap();
        assert!(matches!(
            tree,
            Expression::Trig {
                function: TrigFunction::Cos,
                ..
            }
        ));

        let tree = Expression::parse("\\integral_{0}^{1}{x^{2} dx}").unwrap();
        let Expression::Integral {
            variable,
            integrand,
            ..
        } = tree
        else {
            panic!("expected integral");
        };
        assert_eq!(variable, 'x');
        assert!(matches!(*integrand, Expression::Power { .. }));
    }

    #[test]
    fn domain_forms_take_exponents() {
        let tree = Expression::parse("\\frac{2}{3}^{2}").unwrap();
        let Expression::Power { base, exponent } = tree else {
            panic!("expected power");
        };
        assert!(matches!(*base, Expression::Fraction { .. }));
        assert_eq!(*exponent, brace(num("2")));

        let tree = Expression::parse("\\sin{x}^{2}").unwrap();
        let Expression::Power { base, .. } = tree else {
            panic!("expected power");
        };
        assert!(matches!(
            *base,
            Expression::Trig {
                function: TrigFunction::Sin,
                ..
            }
        ));
    }

    #[test]
    fn deeply_nested_groups() {
        let depth = 40;
        let input = format!("{}x{}", "(".repeat(depth), ")".repeat(depth));
        let mut tree = Expression::parse(&input).unwrap();
        for _ in 0..depth {
            let Expression::Group { delimiter, inner } = tree else {
                panic!("expected group");
            };
            assert_eq!(delimiter, Delimiter::Paren);
            tree = *inner;
        }
        assert_eq!(tree, var('x'));

        let input = format!("{}1{}", "\\frac{1}{".repeat(depth), "}".repeat(depth));
        assert!(Expression::parse(&input).is_ok());
    }

    #[test]
    fn single_operands_are_not_chains() {
        assert_eq!(Expression::parse("x").unwrap(), var('x'));
        assert_eq!(
            Expression::parse("-x").unwrap(),
            Expression::Negation(Box::new(var('x')))
        );
    }

    #[test]
    fn sum_body_is_unwrapped() {
        let tree = Expression::parse("\\sum_{n=0}^{4}{n}").unwrap();
        assert_eq!(
            tree,
            Expression::Sum {
                variable: 'n',
                lower: NumberLiteral::from_text("0").unwrap(),
                upper: NumberLiteral::from_text("4").unwrap(),
                body: Box::new(var('n')),
            }
        );
    }

    #[test]
    fn partial_parse() {
        let parsed = Expression::parse_prefix("2+x)").unwrap();
        assert_eq!(parsed.matched, "2+x");
        assert_eq!(parsed.remainder, ")");

        match Expression::parse("2+x)") {
            Err(ParseError::IncompleteConsumption { matched, remainder }) => {
                assert_eq!(matched, "2+x");
                assert_eq!(remainder, ")");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn trailing_blanks_are_consumed() {
        let parsed = Expression::parse_prefix("x+1   ").unwrap();
        assert_eq!(parsed.remainder, "");
    }

    #[test]
    fn parse_failure_reports_position() {
        match Expression::parse("*2") {
            Err(ParseError::ParseFailure { position, .. }) => assert_eq!(position, 0),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn unknown_domain_form() {
        match Expression::parse("\\sqrt{2}") {
            Err(ParseError::UnknownDomainForm { name, position }) => {
                assert_eq!(name, "\\sqrt");
                assert_eq!(position, 0);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn malformed_known_form_is_a_parse_failure() {
        assert!(matches!(
            Expression::parse("\\frac{1}"),
            Err(ParseError::ParseFailure { .. })
        ));
    }

    #[test]
    fn integrand_number_swallows_differential() {
        // `2d` commits as an implicit product; there is no retry.
        assert!(Expression::parse("\\integral_{0}^{1}{2dx}").is_err());
        assert!(Expression::parse("\\integral_{0}^{1}{2 dx}").is_ok());
    }

    #[test]
    fn nested_sum_cannot_rebind() {
        match Expression::parse("\\sum_{k=1}^{2}{\\sum_{k=1}^{2}{k}}") {
            Err(ParseError::ShadowedBinding { name, .. }) => assert_eq!(name, 'k'),
            other => panic!("unexpected {other:?}"),
        }
        assert!(Expression::parse("\\sum_{k=1}^{2}{\\sum_{j=1}^{2}{k*j}}").is_ok());
        assert!(Expression::parse("\\sum_{k=1}^{2}{k}+\\sum_{k=1}^{2}{k}").is_ok());
    }

    #[test]
    fn integral_cannot_rebind_sum_variable() {
        assert!(matches!(
            Expression::parse("\\sum_{x=1}^{2}{\\integral_{0}^{1}{x dx}}"),
            Err(ParseError::ShadowedBinding { name: 'x', .. })
        ));
    }
}
