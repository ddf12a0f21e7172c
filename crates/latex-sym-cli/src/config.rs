//! Command-line configuration.
//!
//! Every flag can also be set through a `LATEXSYM_*` environment variable;
//! explicit flags win.

use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, ValueEnum};

/// Parse a LaTeX math expression and print its canonical form
#[derive(Debug, Parser)]
#[command(
    name = "latexsym",
    version,
    about = "Parse a LaTeX math expression into a canonical, simplifiable form",
    after_help = r#"
Examples:
  latexsym '3x + 2'
  latexsym '\sum_{k=1}^{4}{k^{2}}' --engine sympy
  latexsym '\integral_{0}^{a}{x dx}' --bind a=1,2,3

Environment Variables:
  LATEXSYM_PARTIAL=1           Accept input with trailing unparsed text
  LATEXSYM_ENGINE=sympy        Simplification backend (none, sympy)
  LATEXSYM_PYTHON=python3      Interpreter used by the sympy backend
  LATEXSYM_LOG_LEVEL=debug     Log level (error, warn, info, debug, trace)
"#
)]
pub struct Cli {
    /// Expression to parse
    #[arg(allow_hyphen_values = true)]
    pub expression: String,

    /// Do not require the whole input to be consumed
    #[arg(long, env = "LATEXSYM_PARTIAL")]
    pub partial: bool,

    /// Simplification backend
    #[arg(long, value_enum, env = "LATEXSYM_ENGINE", default_value = "none")]
    pub engine: EngineKind,

    /// Python interpreter for the sympy backend
    #[arg(long, env = "LATEXSYM_PYTHON", default_value = "python3")]
    pub python: PathBuf,

    /// Evaluate numerically with a variable bound to comma-separated values
    /// (repeatable, e.g. `--bind x=1,2,3`)
    #[arg(long, value_name = "NAME=VALUES")]
    pub bind: Vec<Binding>,

    /// Evaluate numerically even without bindings
    #[arg(long)]
    pub evaluate: bool,

    /// Set log level
    #[arg(long, value_enum, env = "LATEXSYM_LOG_LEVEL", default_value = "warn")]
    pub log_level: LogLevel,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum EngineKind {
    /// Print the canonical text unchanged
    None,
    /// Simplify with sympy in a Python subprocess
    Sympy,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// One `NAME=VALUES` argument.
#[derive(Clone, Debug, PartialEq)]
pub struct Binding {
    pub name: char,
    pub values: Vec<f64>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BindingError {
    #[error("expected NAME=VALUES")]
    MissingEquals,
    #[error("`{0}` is not a single letter")]
    BadName(String),
    #[error("`{0}` is not a number")]
    BadValue(String),
}

impl FromStr for Binding {
    type Err = BindingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, values) = s.split_once('=').ok_or(BindingError::MissingEquals)?;
        let name = name.trim();
        let mut chars = name.chars();
        let name = match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_alphabetic() => c,
            _ => return Err(BindingError::BadName(name.to_string())),
        };
        let values = values
            .split(',')
            .map(|v| {
                let v = v.trim();
                v.parse::<f64>()
                    .map_err(|_| BindingError::BadValue(v.to_string()))
            })
            .collect::<Result<_, _>>()?;
        Ok(Self { name, values })
    }
}
