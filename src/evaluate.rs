use std::borrow::Cow;
use std::collections::BTreeMap;

use crate::expression::{BinaryOperator, Expression, NumberLiteral, TrigFunction, VariableRef};
use crate::FloatExt;

use num_traits::NumCast;

#[cfg(feature = "rayon")]
use rayon::prelude::{
    IndexedParallelIterator, IntoParallelRefIterator, ParallelExtend, ParallelIterator,
};

/// Number of panels for Simpson's rule when evaluating integrals. Even.
pub const SIMPSON_PANELS: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EvaluateError {
    #[error("variable `{0}` has no binding")]
    UnboundVariable(char),

    #[error("binding for `{name}` has {actual} values, expected {expected}")]
    BindingLength {
        name: char,
        actual: usize,
        expected: usize,
    },

    #[error("sum bound `{0}` is not an integer")]
    NonIntegerBound(String),

    #[error("`{0}` is not representable as a float")]
    InvalidLiteral(String),
}

/// Input data: one column of values per variable name.
#[derive(Clone, Debug)]
pub struct Bindings<'a, T: Clone> {
    columns: BTreeMap<char, Cow<'a, [T]>>,
}

impl<'a, T: Clone> Bindings<'a, T> {
    pub fn new() -> Self {
        Self {
            columns: BTreeMap::new(),
        }
    }

    /// Builder form of [`Bindings::insert`].
    pub fn with(mut self, name: char, values: &'a [T]) -> Self {
        self.insert(name, values);
        self
    }

    pub fn insert(&mut self, name: char, values: &'a [T]) {
        self.columns.insert(name, Cow::Borrowed(values));
    }

    pub fn get(&self, name: char) -> Option<&[T]> {
        self.columns.get(&name).map(|column| column.as_ref())
    }

    /// Everything in `self`, plus `name` bound to `values`.
    fn scoped(&self, name: char, values: Vec<T>) -> Bindings<'_, T> {
        let mut columns: BTreeMap<char, Cow<'_, [T]>> = self
            .columns
            .iter()
            .map(|(name, column)| (*name, Cow::Borrowed(column.as_ref())))
            .collect();
        columns.insert(name, Cow::Owned(values));
        Bindings { columns }
    }
}

impl<'a, T: Clone> Default for Bindings<'a, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl Expression {
    pub fn evaluate_without_vars<T: FloatExt>(
        &self,
        registers: &mut Registers<T>,
    ) -> Result<Vec<T>, EvaluateError> {
        self.evaluate(&Bindings::new(), registers)
    }

    /// Calculates the results of the expression component-wise.
    ///
    /// Sums and integrals bind their variable for the duration of the body,
    /// hiding any column of the same name in `bindings`.
    pub fn evaluate<T: FloatExt>(
        &self,
        bindings: &Bindings<T>,
        registers: &mut Registers<T>,
    ) -> Result<Vec<T>, EvaluateError> {
        validate_bindings(bindings, registers.register_length)?;
        self.evaluate_recursive(bindings, registers)
    }

    fn evaluate_recursive<T: FloatExt>(
        &self,
        bindings: &Bindings<T>,
        registers: &mut Registers<T>,
    ) -> Result<Vec<T>, EvaluateError> {
        match self {
            Self::Number(number) => {
                let value = literal_value(number)?;
                Ok(fill(value, registers))
            }
            // This branch should only be taken if the variable is not the
            // operand of some other operation.
            Self::Variable(variable) => {
                let values = bindings
                    .get(variable.name)
                    .ok_or(EvaluateError::UnboundVariable(variable.name))?;
                let mut output = registers.allocate();
                if variable.negative {
                    output.extend(values.iter().map(|v| -*v));
                } else {
                    output.extend_from_slice(values);
                }
                Ok(output)
            }
            Self::Negation(only) => evaluate_unary_op(|only| -only, only, bindings, registers),
            Self::Chain(chain) => {
                let mut acc = Operand::evaluate(&chain.first, bindings, registers)?;
                for (op, operand) in &chain.rest {
                    let rhs = Operand::evaluate(operand, bindings, registers)?;
                    let output = apply_binary_op(
                        binary_op(*op),
                        acc.values(),
                        rhs.values(),
                        registers,
                    );
                    acc.recycle(registers);
                    rhs.recycle(registers);
                    acc = Operand::Register(output);
                }
                Ok(acc.into_register(registers))
            }
            Self::Power { base, exponent } => {
                evaluate_binary_op(|b, e| b.powf(e), base, exponent, bindings, registers)
            }
            Self::Fraction {
                numerator,
                denominator,
            } => evaluate_binary_op(|n, d| n / d, numerator, denominator, bindings, registers),
            Self::Sum {
                variable,
                lower,
                upper,
                body,
            } => evaluate_sum(*variable, lower, upper, body, bindings, registers),
            Self::Integral {
                lower,
                upper,
                integrand,
                variable,
            } => evaluate_integral(*variable, lower, upper, integrand, bindings, registers),
            Self::Trig { function, argument } => {
                let op: fn(T) -> T = match function {
                    TrigFunction::Sin => T::sin,
                    TrigFunction::Cos => T::cos,
                    TrigFunction::Tan => T::tan,
                };
                evaluate_unary_op(op, argument, bindings, registers)
            }
            Self::Group { inner, .. } => inner.evaluate_recursive(bindings, registers),
        }
    }
}

fn validate_bindings<T: Clone>(
    bindings: &Bindings<T>,
    expected: usize,
) -> Result<(), EvaluateError> {
    for (name, column) in bindings.columns.iter() {
        if column.len() != expected {
            return Err(EvaluateError::BindingLength {
                name: *name,
                actual: column.len(),
                expected,
            });
        }
    }
    Ok(())
}

fn binary_op<T: FloatExt>(op: BinaryOperator) -> fn(T, T) -> T {
    match op {
        BinaryOperator::Add => |lhs, rhs| lhs + rhs,
        BinaryOperator::Sub => |lhs, rhs| lhs - rhs,
        BinaryOperator::Mul => |lhs, rhs| lhs * rhs,
        BinaryOperator::Div => |lhs, rhs| lhs / rhs,
    }
}

fn literal_value<T: FloatExt>(number: &NumberLiteral) -> Result<T, EvaluateError> {
    let text = number.to_string();
    text.parse().map_err(|_| EvaluateError::InvalidLiteral(text))
}

fn constant<T: FloatExt, N: NumCast + ToString + Copy>(n: N) -> Result<T, EvaluateError> {
    num_traits::cast(n).ok_or_else(|| EvaluateError::InvalidLiteral(n.to_string()))
}

fn fill<T: FloatExt>(value: T, registers: &mut Registers<T>) -> Vec<T> {
    let mut output = registers.allocate();
    output.extend(std::iter::repeat(value).take(registers.register_length));
    output
}

/// Operand values, either borrowed straight from the bindings or computed
/// into a register.
enum Operand<'b, T> {
    Bound(&'b [T]),
    Register(Vec<T>),
}

impl<'b, T: FloatExt> Operand<'b, T> {
    // Before doing recursive evaluation, we check first if we already have
    // input values in our bindings. This avoids unnecessary copies.
    fn evaluate(
        expression: &Expression,
        bindings: &'b Bindings<T>,
        registers: &mut Registers<T>,
    ) -> Result<Self, EvaluateError> {
        match expression {
            Expression::Variable(VariableRef {
                negative: false,
                name,
            }) => bindings
                .get(*name)
                .map(Operand::Bound)
                .ok_or(EvaluateError::UnboundVariable(*name)),
            _ => expression
                .evaluate_recursive(bindings, registers)
                .map(Operand::Register),
        }
    }

    fn values(&self) -> &[T] {
        match self {
            Self::Bound(values) => values,
            Self::Register(register) => register,
        }
    }

    fn recycle(self, registers: &mut Registers<T>) {
        if let Self::Register(register) = self {
            registers.recycle(register);
        }
    }

    fn into_register(self, registers: &mut Registers<T>) -> Vec<T> {
        match self {
            Self::Bound(values) => {
                let mut output = registers.allocate();
                output.extend_from_slice(values);
                output
            }
            Self::Register(register) => register,
        }
    }
}

fn evaluate_binary_op<T: FloatExt>(
    op: fn(T, T) -> T,
    lhs: &Expression,
    rhs: &Expression,
    bindings: &Bindings<T>,
    registers: &mut Registers<T>,
) -> Result<Vec<T>, EvaluateError> {
    let lhs = Operand::evaluate(lhs, bindings, registers)?;
    let rhs = Operand::evaluate(rhs, bindings, registers)?;
    let output = apply_binary_op(op, lhs.values(), rhs.values(), registers);
    lhs.recycle(registers);
    rhs.recycle(registers);
    Ok(output)
}

fn apply_binary_op<T: FloatExt>(
    op: fn(T, T) -> T,
    lhs_values: &[T],
    rhs_values: &[T],
    registers: &mut Registers<T>,
) -> Vec<T> {
    // Allocate this output register as lazily as possible.
    let mut output = registers.allocate();

    #[cfg(feature = "rayon")]
    {
        output.par_extend(
            lhs_values
                .par_iter()
                .zip(rhs_values.par_iter())
                .map(|(lhs, rhs)| op(*lhs, *rhs)),
        );
    }
    #[cfg(not(feature = "rayon"))]
    {
        output.extend(
            lhs_values
                .iter()
                .zip(rhs_values.iter())
                .map(|(lhs, rhs)| op(*lhs, *rhs)),
        );
    }
    output
}

fn evaluate_unary_op<T: FloatExt>(
    op: fn(T) -> T,
    only: &Expression,
    bindings: &Bindings<T>,
    registers: &mut Registers<T>,
) -> Result<Vec<T>, EvaluateError> {
    let only = Operand::evaluate(only, bindings, registers)?;
    let only_values = only.values();
    let mut output = registers.allocate();

    #[cfg(feature = "rayon")]
    {
        output.par_extend(only_values.par_iter().map(|only| op(*only)));
    }
    #[cfg(not(feature = "rayon"))]
    {
        output.extend(only_values.iter().map(|only| op(*only)));
    }

    only.recycle(registers);
    Ok(output)
}

fn evaluate_sum<T: FloatExt>(
    variable: char,
    lower: &NumberLiteral,
    upper: &NumberLiteral,
    body: &Expression,
    bindings: &Bindings<T>,
    registers: &mut Registers<T>,
) -> Result<Vec<T>, EvaluateError> {
    let bound = |literal: &NumberLiteral| {
        literal
            .as_integer()
            .ok_or_else(|| EvaluateError::NonIntegerBound(literal.to_string()))
    };
    let (lower, upper) = (bound(lower)?, bound(upper)?);

    let mut total = fill(T::zero(), registers);
    for index in lower..=upper {
        let index = vec![constant::<T, _>(index)?; registers.register_length];
        let scope = bindings.scoped(variable, index);
        let term = body.evaluate_recursive(&scope, registers)?;
        for (total, term) in total.iter_mut().zip(term.iter()) {
            *total = *total + *term;
        }
        registers.recycle(term);
    }
    Ok(total)
}

/// Composite Simpson's rule over `[lower, upper]`, per element.
fn evaluate_integral<T: FloatExt>(
    variable: char,
    lower: &Expression,
    upper: &Expression,
    integrand: &Expression,
    bindings: &Bindings<T>,
    registers: &mut Registers<T>,
) -> Result<Vec<T>, EvaluateError> {
    let lower = Operand::evaluate(lower, bindings, registers)?;
    let upper = Operand::evaluate(upper, bindings, registers)?;
    let panels: T = constant(SIMPSON_PANELS)?;
    let steps: Vec<T> = lower
        .values()
        .iter()
        .zip(upper.values().iter())
        .map(|(a, b)| (*b - *a) / panels)
        .collect();

    let mut total = fill(T::zero(), registers);
    for node in 0..=SIMPSON_PANELS {
        let weight: T = if node == 0 || node == SIMPSON_PANELS {
            T::one()
        } else if node % 2 == 1 {
            constant(4)?
        } else {
            constant(2)?
        };
        let offset: T = constant(node)?;
        let points = lower
            .values()
            .iter()
            .zip(steps.iter())
            .map(|(a, h)| *a + offset * *h)
            .collect();
        let scope = bindings.scoped(variable, points);
        let values = integrand.evaluate_recursive(&scope, registers)?;
        for (total, value) in total.iter_mut().zip(values.iter()) {
            *total = *total + weight * *value;
        }
        registers.recycle(values);
    }

    let three: T = constant(3)?;
    for (total, h) in total.iter_mut().zip(steps.iter()) {
        *total = *total * *h / three;
    }
    lower.recycle(registers);
    upper.recycle(registers);
    Ok(total)
}

/// Scratch space for calculations. Can be reused across evaluations with the
/// same data binding length.
///
/// Attempts to minimize allocations by recycling registers after intermediate
/// calculations have finished.
pub struct Registers<T> {
    num_allocations: usize,
    registers: Vec<Vec<T>>,
    register_length: usize,
}

impl<T> Registers<T> {
    pub fn new(register_length: usize) -> Self {
        Self {
            num_allocations: 0,
            registers: vec![],
            register_length,
        }
    }

    fn recycle(&mut self, mut used: Vec<T>) {
        used.clear();
        self.registers.push(used);
    }

    fn allocate(&mut self) -> Vec<T> {
        self.registers.pop().unwrap_or_else(|| {
            self.num_allocations += 1;
            Vec::with_capacity(self.register_length)
        })
    }

    pub fn num_allocations(&self) -> usize {
        self.num_allocations
    }

    pub fn register_length(&self) -> usize {
        self.register_length
    }
}
