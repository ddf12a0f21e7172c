//! Simplification backends selectable from the command line.

use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::process::Command;

use latex_sym::SymbolicEngine;
use log::debug;

/// Returns the canonical text unchanged.
pub struct Passthrough;

impl SymbolicEngine for Passthrough {
    type Output = String;
    type Error = Infallible;

    fn simplify(&self, expression: &str, _variables: &[String]) -> Result<String, Infallible> {
        Ok(expression.to_string())
    }
}

/// Runs `sympy.simplify` in a Python subprocess.
pub struct Sympy {
    python: PathBuf,
}

#[derive(Debug, thiserror::Error)]
pub enum SympyError {
    #[error("failed to run {python}")]
    Spawn {
        python: String,
        #[source]
        source: std::io::Error,
    },
    #[error("python exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
}

impl Sympy {
    pub fn new(python: impl AsRef<Path>) -> Self {
        Self {
            python: python.as_ref().to_path_buf(),
        }
    }
}

impl SymbolicEngine for Sympy {
    type Output = String;
    type Error = SympyError;

    fn simplify(&self, expression: &str, variables: &[String]) -> Result<String, SympyError> {
        let script = sympy_script(expression, variables);
        debug!("running sympy script:\n{script}");
        let output = Command::new(&self.python)
            .arg("-c")
            .arg(&script)
            .output()
            .map_err(|source| SympyError::Spawn {
                python: self.python.display().to_string(),
                source,
            })?;
        if !output.status.success() {
            return Err(SympyError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Python source that declares every variable as a sympy symbol and prints
/// the simplified expression.
///
/// The expression reaches sympy as a string literal, so `sympify` reads its
/// numbers as exact integers and `(1)/(3)` stays a rational.
///
/// `reduce(f, [lo, hi])` is defined as the sum of `f(k)` for `k` in the
/// closed range, which is what canonical sums render to.
pub fn sympy_script(expression: &str, variables: &[String]) -> String {
    let mut script = String::from(
        "from sympy import *\n\
         def reduce(f, bounds):\n    \
             return Add(*[f(k) for k in range(int(bounds[0]), int(bounds[1]) + 1)])\n",
    );
    let mut names = String::from("{'reduce': reduce");
    for name in variables {
        // Names are single ASCII letters, so they are valid identifiers.
        script.push_str(&format!("{name} = Symbol('{name}')\n"));
        names.push_str(&format!(", '{name}': {name}"));
    }
    names.push('}');
    // Canonical text never contains quotes or backslashes.
    script.push_str(&format!(
        "print(simplify(sympify({expression:?}, locals={names})))\n"
    ));
    script
}
