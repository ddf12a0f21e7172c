/// A symbolic simplification backend.
///
/// Receives the canonical text produced by [`Expression::canonicalize`] and
/// the names of every variable in it. The parser never inspects the result.
///
/// [`Expression::canonicalize`]: crate::Expression::canonicalize
pub trait SymbolicEngine {
    type Output;
    type Error: std::error::Error + Send + Sync + 'static;

    fn simplify(&self, expression: &str, variables: &[String]) -> Result<Self::Output, Self::Error>;
}

impl<E: SymbolicEngine + ?Sized> SymbolicEngine for &E {
    type Output = E::Output;
    type Error = E::Error;

    fn simplify(&self, expression: &str, variables: &[String]) -> Result<Self::Output, Self::Error> {
        (**self).simplify(expression, variables)
    }
}
