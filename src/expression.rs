use std::fmt;

/// Parsed expression tree.
///
/// Every composite variant owns its children. Trees are built once per parse
/// and never mutated afterwards.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Expression {
    // Literals.
    Number(NumberLiteral),
    Variable(VariableRef),

    // Unary minus in front of a whole expression.
    Negation(Box<Expression>),

    // `a + b - c` or `a * b / c`, folded left to right.
    Chain(BinaryChain),

    /// `base ^ {exponent}`. The exponent always renders parenthesized.
    Power {
        base: Box<Expression>,
        exponent: Box<Expression>,
    },

    /// `\frac{numerator}{denominator}`.
    Fraction {
        numerator: Box<Expression>,
        denominator: Box<Expression>,
    },

    /// `\sum_{variable=lower}^{upper}{body}`, summed over the closed integer
    /// range `[lower, upper]`.
    Sum {
        variable: char,
        lower: NumberLiteral,
        upper: NumberLiteral,
        body: Box<Expression>,
    },

    /// `\integral_{lower}^{upper}{integrand d variable}`.
    Integral {
        lower: Box<Expression>,
        upper: Box<Expression>,
        integrand: Box<Expression>,
        variable: char,
    },

    /// `\sin{argument}`, `\cos{argument}` or `\tan{argument}`.
    Trig {
        function: TrigFunction,
        argument: Box<Expression>,
    },

    // Explicit grouping. Purely structural.
    Group {
        delimiter: Delimiter,
        inner: Box<Expression>,
    },
}

/// A decimal literal such as `3`, `-2.5` or `0.125`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NumberLiteral {
    pub negative: bool,
    /// Non-empty run of decimal digits before the point.
    pub integer: String,
    /// Non-empty run of decimal digits after the point, if any.
    pub fraction: Option<String>,
}

impl NumberLiteral {
    /// Splits literal text like `-2.5` into its parts.
    ///
    /// Returns `None` unless `text` is an optional `-`, at least one digit,
    /// and optionally a `.` followed by at least one digit.
    pub fn from_text(text: &str) -> Option<Self> {
        let (negative, unsigned) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };
        let (integer, fraction) = match unsigned.split_once('.') {
            Some((integer, fraction)) => (integer, Some(fraction)),
            None => (unsigned, None),
        };
        let is_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
        if !is_digits(integer) || !fraction.map_or(true, is_digits) {
            return None;
        }
        Some(Self {
            negative,
            integer: integer.to_string(),
            fraction: fraction.map(str::to_string),
        })
    }

    /// The value as an integer, if the literal has no non-zero fractional
    /// digits and fits in an `i64`.
    pub fn as_integer(&self) -> Option<i64> {
        if let Some(fraction) = &self.fraction {
            if fraction.bytes().any(|b| b != b'0') {
                return None;
            }
        }
        let magnitude: i64 = self.integer.parse().ok()?;
        Some(if self.negative { -magnitude } else { magnitude })
    }

    pub(crate) fn unsigned(&self) -> Self {
        Self {
            negative: false,
            ..self.clone()
        }
    }
}

impl fmt::Display for NumberLiteral {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            f.write_str("-")?;
        }
        f.write_str(&self.integer)?;
        if let Some(fraction) = &self.fraction {
            write!(f, ".{fraction}")?;
        }
        Ok(())
    }
}

/// A single-letter variable, optionally negated (`x`, `-y`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VariableRef {
    pub negative: bool,
    pub name: char,
}

impl fmt::Display for VariableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.negative {
            f.write_str("-")?;
        }
        write!(f, "{}", self.name)
    }
}

/// One or more operators of the same class applied left to right.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BinaryChain {
    pub first: Box<Expression>,
    pub rest: Vec<(BinaryOperator, Expression)>,
}

impl BinaryChain {
    pub fn new(first: Expression, rest: Vec<(BinaryOperator, Expression)>) -> Self {
        debug_assert!(!rest.is_empty(), "chain without operators");
        debug_assert!(
            rest.windows(2).all(|w| w[0].0.class() == w[1].0.class()),
            "chain mixes operator classes"
        );
        Self {
            first: Box::new(first),
            rest,
        }
    }

    pub fn class(&self) -> OperatorClass {
        self.rest
            .first()
            .map_or(OperatorClass::Multiplicative, |(op, _)| op.class())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperatorClass {
    Additive,
    Multiplicative,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOperator {
    pub fn symbol(self) -> char {
        match self {
            Self::Add => '+',
            Self::Sub => '-',
            Self::Mul => '*',
            Self::Div => '/',
        }
    }

    pub fn class(self) -> OperatorClass {
        match self {
            Self::Add | Self::Sub => OperatorClass::Additive,
            Self::Mul | Self::Div => OperatorClass::Multiplicative,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrigFunction {
    Sin,
    Cos,
    Tan,
}

impl TrigFunction {
    /// Function name without the leading backslash.
    pub fn name(self) -> &'static str {
        match self {
            Self::Sin => "sin",
            Self::Cos => "cos",
            Self::Tan => "tan",
        }
    }
}

/// Which punctuation delimited a [`Expression::Group`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Delimiter {
    Paren,
    Brace,
}
